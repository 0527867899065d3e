//! Stacks and target environments.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::asset::ImageAsset;
use crate::error::{SynthError, SynthResult};
use crate::id::LogicalId;
use crate::naming::validate_name;
use crate::template::{TEMPLATE_FORMAT_VERSION, Template, TemplateResource};

static STACK_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9-]{0,127}$").expect("stack name pattern"));

/// The account and region a stack deploys into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub account: String,
    pub region: String,
}

impl Environment {
    pub fn new(account: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            region: region.into(),
        }
    }

    /// Concrete ARN for a resource in this environment.
    pub fn arn(&self, service: &str, resource: &str) -> String {
        format!(
            "arn:aws:{}:{}:{}:{}",
            service, self.region, self.account, resource
        )
    }
}

/// A named, independently deployable collection of declared resources.
///
/// Resources register themselves under a logical id at construction time;
/// the stack rejects duplicate ids. Nothing mutates a resource after
/// registration.
#[derive(Debug, Clone)]
pub struct Stack {
    name: String,
    description: Option<String>,
    env: Environment,
    resources: BTreeMap<LogicalId, TemplateResource>,
    assets: Vec<ImageAsset>,
}

impl Stack {
    pub fn new(name: &str, env: Environment) -> SynthResult<Self> {
        validate_name(
            "stack",
            &STACK_NAME,
            "letters, digits and hyphens, starting with a letter",
            name,
        )?;
        Ok(Self {
            name: name.to_string(),
            description: None,
            env,
            resources: BTreeMap::new(),
            assets: Vec::new(),
        })
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Register a rendered resource as a child of this stack.
    pub fn add_resource(&mut self, id: LogicalId, resource: TemplateResource) -> SynthResult<()> {
        if self.resources.contains_key(&id) {
            return Err(SynthError::DuplicateLogicalId {
                stack: self.name.clone(),
                id: id.to_string(),
            });
        }
        self.resources.insert(id, resource);
        Ok(())
    }

    pub fn add_asset(&mut self, asset: ImageAsset) {
        self.assets.push(asset);
    }

    pub fn assets(&self) -> &[ImageAsset] {
        &self.assets
    }

    /// Look up a registered resource by logical id.
    pub fn resource(&self, id: &str) -> Option<&TemplateResource> {
        let id = LogicalId::new(id).ok()?;
        self.resources.get(&id)
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    /// Produce the template for this stack.
    pub fn render(&self) -> Template {
        Template {
            format_version: TEMPLATE_FORMAT_VERSION.to_string(),
            description: self.description.clone(),
            resources: self
                .resources
                .iter()
                .map(|(id, resource)| (id.to_string(), resource.clone()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn test_env() -> Environment {
        Environment::new("123456789012", "eu-west-1")
    }

    fn dummy_resource() -> TemplateResource {
        TemplateResource {
            resource_type: "AWS::SNS::Topic".to_string(),
            properties: json!({ "TopicName": "t" }),
            depends_on: Vec::new(),
            deletion_policy: None,
        }
    }

    #[test]
    fn test_environment_formats_arns() {
        let arn = test_env().arn("codecommit", "my-repo");
        assert_eq!(arn, "arn:aws:codecommit:eu-west-1:123456789012:my-repo");
    }

    #[test]
    fn test_duplicate_logical_id_is_rejected() {
        let mut stack = Stack::new("TestStack", test_env()).unwrap();
        let id = LogicalId::new("Topic").unwrap();
        stack.add_resource(id.clone(), dummy_resource()).unwrap();

        let result = stack.add_resource(id, dummy_resource());
        assert!(matches!(
            result.unwrap_err(),
            SynthError::DuplicateLogicalId { .. }
        ));
    }

    #[test]
    fn test_invalid_stack_name_is_rejected() {
        let result = Stack::new("9bad name", test_env());
        assert!(matches!(
            result.unwrap_err(),
            SynthError::InvalidResourceName { kind: "stack", .. }
        ));
    }

    #[test]
    fn test_render_carries_description_and_format_version() {
        let mut stack = Stack::new("TestStack", test_env())
            .unwrap()
            .with_description("a stack");
        stack
            .add_resource(LogicalId::new("Topic").unwrap(), dummy_resource())
            .unwrap();

        let template = stack.render();
        assert_eq!(template.format_version, TEMPLATE_FORMAT_VERSION);
        assert_eq!(template.description.as_deref(), Some("a stack"));
        assert_eq!(template.resources.len(), 1);
    }
}
