//! IAM roles and policies.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{SynthError, SynthResult};
use crate::id::LogicalId;
use crate::naming::validate_name;
use crate::stack::Stack;
use crate::template::{TemplateResource, get_att, reference};

pub const POLICY_DOCUMENT_VERSION: &str = "2012-10-17";

static IAM_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9+=,.@_-]{1,64}$").expect("iam name pattern"));

/// Statement effect. Statements here are additive; nothing in the stacks
/// declares a deny.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

/// A service allowed to assume a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePrincipal(String);

impl ServicePrincipal {
    pub fn new(service: &str) -> Self {
        Self(service.to_string())
    }

    pub fn service(&self) -> &str {
        &self.0
    }
}

/// One policy statement: actions allowed on resource patterns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    pub effect: Effect,
    pub action: Vec<String>,
    pub resource: Vec<String>,
}

impl PolicyStatement {
    pub fn allow(actions: &[&str], resources: &[&str]) -> Self {
        Self {
            sid: None,
            effect: Effect::Allow,
            action: actions.iter().map(|a| a.to_string()).collect(),
            resource: resources.iter().map(|r| r.to_string()).collect(),
        }
    }

    pub fn with_sid(mut self, sid: &str) -> Self {
        self.sid = Some(sid.to_string());
        self
    }
}

/// An identity-policy document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<PolicyStatement>,
}

impl PolicyDocument {
    pub fn new(statements: Vec<PolicyStatement>) -> Self {
        Self {
            version: POLICY_DOCUMENT_VERSION.to_string(),
            statement: statements,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RoleProps {
    pub role_name: String,
    pub assumed_by: ServicePrincipal,
    /// ARNs of managed policies to attach directly.
    pub managed_policy_arns: Vec<String>,
}

/// Handle to a declared role.
#[derive(Debug, Clone)]
pub struct Role {
    logical_id: LogicalId,
    role_name: String,
}

impl Role {
    pub fn new(stack: &mut Stack, id: &str, props: RoleProps) -> SynthResult<Role> {
        validate_name(
            "role",
            &IAM_NAME,
            "1-64 characters from [A-Za-z0-9+=,.@_-]",
            &props.role_name,
        )?;
        let logical_id = LogicalId::new(id)?;

        let assume_document = json!({
            "Version": POLICY_DOCUMENT_VERSION,
            "Statement": [{
                "Action": "sts:AssumeRole",
                "Effect": "Allow",
                "Principal": { "Service": props.assumed_by.service() },
            }],
        });

        let mut properties = json!({
            "RoleName": props.role_name,
            "AssumeRolePolicyDocument": assume_document,
        });
        if !props.managed_policy_arns.is_empty() {
            properties["ManagedPolicyArns"] = json!(props.managed_policy_arns);
        }

        stack.add_resource(
            logical_id.clone(),
            TemplateResource {
                resource_type: "AWS::IAM::Role".to_string(),
                properties,
                depends_on: Vec::new(),
                deletion_policy: None,
            },
        )?;

        Ok(Role {
            logical_id,
            role_name: props.role_name,
        })
    }

    pub fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }

    pub fn role_name(&self) -> &str {
        &self.role_name
    }

    /// The role ARN, resolved at deploy time.
    pub fn arn(&self) -> Value {
        get_att(&self.logical_id, "Arn")
    }

    /// The role name, resolved at deploy time.
    pub fn name_ref(&self) -> Value {
        reference(&self.logical_id)
    }
}

#[derive(Debug, Clone)]
pub struct PolicyProps {
    pub policy_name: String,
    pub document: PolicyDocument,
    /// Roles the policy attaches to.
    pub roles: Vec<Role>,
}

/// Handle to a declared inline policy.
#[derive(Debug, Clone)]
pub struct Policy {
    logical_id: LogicalId,
}

impl Policy {
    pub fn new(stack: &mut Stack, id: &str, props: PolicyProps) -> SynthResult<Policy> {
        validate_name(
            "policy",
            &IAM_NAME,
            "1-64 characters from [A-Za-z0-9+=,.@_-]",
            &props.policy_name,
        )?;
        if props.document.statement.is_empty() {
            return Err(SynthError::InvalidProperty {
                resource: props.policy_name,
                message: "policy document has no statements".to_string(),
            });
        }
        if props.roles.is_empty() {
            return Err(SynthError::InvalidProperty {
                resource: props.policy_name,
                message: "policy attaches to no roles".to_string(),
            });
        }
        let logical_id = LogicalId::new(id)?;

        let roles: Vec<Value> = props.roles.iter().map(Role::name_ref).collect();
        let properties = json!({
            "PolicyName": props.policy_name,
            "PolicyDocument": serde_json::to_value(&props.document)?,
            "Roles": roles,
        });

        stack.add_resource(
            logical_id.clone(),
            TemplateResource {
                resource_type: "AWS::IAM::Policy".to_string(),
                properties,
                depends_on: Vec::new(),
                deletion_policy: None,
            },
        )?;

        Ok(Policy { logical_id })
    }

    pub fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }
}

#[cfg(test)]
mod tests {
    use crate::stack::Environment;

    use super::*;

    fn test_stack() -> Stack {
        Stack::new("TestStack", Environment::new("123456789012", "eu-west-1")).unwrap()
    }

    #[test]
    fn test_policy_document_serializes_with_platform_casing() {
        let document = PolicyDocument::new(vec![
            PolicyStatement::allow(&["sts:AssumeRole"], &["arn:aws:iam::*:role/deploy-*"])
                .with_sid("assumerole"),
        ]);

        let value = serde_json::to_value(&document).unwrap();
        assert_eq!(value["Version"], "2012-10-17");
        assert_eq!(value["Statement"][0]["Sid"], "assumerole");
        assert_eq!(value["Statement"][0]["Effect"], "Allow");
        assert_eq!(value["Statement"][0]["Action"][0], "sts:AssumeRole");
        assert_eq!(
            value["Statement"][0]["Resource"][0],
            "arn:aws:iam::*:role/deploy-*"
        );
    }

    #[test]
    fn test_statement_without_sid_omits_the_field() {
        let statement = PolicyStatement::allow(&["ssm:GetParameter"], &["*"]);
        let value = serde_json::to_value(&statement).unwrap();
        assert!(value.get("Sid").is_none());
    }

    #[test]
    fn test_role_declares_assume_document_and_managed_policies() {
        let mut stack = test_stack();
        let role = Role::new(
            &mut stack,
            "BuildRole",
            RoleProps {
                role_name: "BuildRole".to_string(),
                assumed_by: ServicePrincipal::new("codebuild.amazonaws.com"),
                managed_policy_arns: vec!["arn:aws:iam::aws:policy/ReadOnlyAccess".to_string()],
            },
        )
        .unwrap();

        let resource = stack.resource("BuildRole").unwrap();
        assert_eq!(resource.resource_type, "AWS::IAM::Role");
        let principal =
            &resource.properties["AssumeRolePolicyDocument"]["Statement"][0]["Principal"];
        assert_eq!(principal["Service"], "codebuild.amazonaws.com");
        assert_eq!(
            resource.properties["ManagedPolicyArns"][0],
            "arn:aws:iam::aws:policy/ReadOnlyAccess"
        );
        assert_eq!(
            role.arn(),
            serde_json::json!({ "Fn::GetAtt": ["BuildRole", "Arn"] })
        );
    }

    #[test]
    fn test_empty_policy_document_is_rejected() {
        let mut stack = test_stack();
        let role = Role::new(
            &mut stack,
            "BuildRole",
            RoleProps {
                role_name: "BuildRole".to_string(),
                assumed_by: ServicePrincipal::new("codebuild.amazonaws.com"),
                managed_policy_arns: Vec::new(),
            },
        )
        .unwrap();

        let result = Policy::new(
            &mut stack,
            "EmptyPolicy",
            PolicyProps {
                policy_name: "EmptyPolicy".to_string(),
                document: PolicyDocument::new(Vec::new()),
                roles: vec![role],
            },
        );
        assert!(matches!(
            result.unwrap_err(),
            SynthError::InvalidProperty { .. }
        ));
    }
}
