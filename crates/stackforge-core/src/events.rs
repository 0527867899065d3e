//! Event rules and their targets.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::codepipeline::Pipeline;
use crate::error::{SynthError, SynthResult};
use crate::iam::Role;
use crate::id::LogicalId;
use crate::naming::validate_name;
use crate::sns::Topic;
use crate::stack::Stack;
use crate::template::TemplateResource;

static RULE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._-]{1,64}$").expect("rule name pattern"));

/// Predicate an incoming event must match before the rule dispatches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPattern {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub source: Vec<String>,
    #[serde(rename = "detail-type", skip_serializing_if = "Vec::is_empty", default)]
    pub detail_type: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub resources: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub detail: BTreeMap<String, Value>,
}

impl EventPattern {
    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
            && self.detail_type.is_empty()
            && self.resources.is_empty()
            && self.detail.is_empty()
    }
}

/// One dispatch target of a rule. Every target receives a matching event
/// independently; there is no ordering between targets.
#[derive(Debug, Clone)]
pub struct RuleTarget {
    pub id: String,
    pub arn: Value,
    pub role_arn: Option<Value>,
    pub input: Option<String>,
}

impl RuleTarget {
    /// Start a pipeline execution, assuming the given event role.
    pub fn pipeline(pipeline: &Pipeline, event_role: &Role) -> Self {
        Self {
            id: "Pipeline".to_string(),
            arn: Value::String(pipeline.arn().to_string()),
            role_arn: Some(event_role.arn()),
            input: None,
        }
    }

    /// Publish a fixed text message to a topic.
    pub fn topic(topic: &Topic, message: &str) -> Self {
        Self {
            id: "Topic".to_string(),
            arn: topic.arn_ref(),
            role_arn: None,
            // Target input is the JSON-encoded payload the target receives.
            input: Some(Value::String(message.to_string()).to_string()),
        }
    }

    fn render(&self) -> Value {
        let mut target = json!({
            "Arn": self.arn,
            "Id": self.id,
        });
        if let Some(role_arn) = &self.role_arn {
            target["RoleArn"] = role_arn.clone();
        }
        if let Some(input) = &self.input {
            target["Input"] = Value::String(input.clone());
        }
        target
    }
}

#[derive(Debug, Clone)]
pub struct RuleProps {
    pub rule_name: String,
    pub pattern: EventPattern,
    pub targets: Vec<RuleTarget>,
}

/// Handle to a declared event rule.
#[derive(Debug, Clone)]
pub struct Rule {
    logical_id: LogicalId,
}

impl Rule {
    pub fn new(stack: &mut Stack, id: &str, props: RuleProps) -> SynthResult<Rule> {
        validate_name(
            "rule",
            &RULE_NAME,
            "1-64 characters from [A-Za-z0-9._-]",
            &props.rule_name,
        )?;
        if props.pattern.is_empty() {
            return Err(SynthError::InvalidProperty {
                resource: props.rule_name,
                message: "event pattern matches nothing".to_string(),
            });
        }
        if props.targets.is_empty() {
            return Err(SynthError::InvalidProperty {
                resource: props.rule_name,
                message: "rule has no targets".to_string(),
            });
        }
        let mut seen = Vec::new();
        for target in &props.targets {
            if seen.contains(&target.id.as_str()) {
                return Err(SynthError::InvalidProperty {
                    resource: props.rule_name,
                    message: format!("duplicate target id: {}", target.id),
                });
            }
            seen.push(target.id.as_str());
        }
        let logical_id = LogicalId::new(id)?;

        let targets: Vec<Value> = props.targets.iter().map(RuleTarget::render).collect();
        let properties = json!({
            "Name": props.rule_name,
            "State": "ENABLED",
            "EventPattern": serde_json::to_value(&props.pattern)?,
            "Targets": targets,
        });

        stack.add_resource(
            logical_id.clone(),
            TemplateResource {
                resource_type: "AWS::Events::Rule".to_string(),
                properties,
                depends_on: Vec::new(),
                deletion_policy: None,
            },
        )?;

        Ok(Rule { logical_id })
    }

    pub fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }
}

#[cfg(test)]
mod tests {
    use crate::sns::TopicProps;
    use crate::stack::Environment;

    use super::*;

    fn test_stack() -> Stack {
        Stack::new("TestStack", Environment::new("123456789012", "eu-west-1")).unwrap()
    }

    fn branch_pattern() -> EventPattern {
        EventPattern {
            source: vec!["aws.codecommit".to_string()],
            detail_type: vec!["CodeCommit Repository State Change".to_string()],
            resources: vec!["arn:aws:codecommit:eu-west-1:123456789012:repo".to_string()],
            detail: BTreeMap::from([("referenceType".to_string(), json!(["branch"]))]),
        }
    }

    #[test]
    fn test_event_pattern_serializes_detail_type_with_hyphen() {
        let value = serde_json::to_value(branch_pattern()).unwrap();
        assert_eq!(value["detail-type"][0], "CodeCommit Repository State Change");
        assert_eq!(value["detail"]["referenceType"][0], "branch");
    }

    #[test]
    fn test_rule_requires_at_least_one_target() {
        let mut stack = test_stack();
        let result = Rule::new(
            &mut stack,
            "CommitRule",
            RuleProps {
                rule_name: "CommitRule".to_string(),
                pattern: branch_pattern(),
                targets: Vec::new(),
            },
        );
        assert!(matches!(
            result.unwrap_err(),
            SynthError::InvalidProperty { .. }
        ));
    }

    #[test]
    fn test_rule_rejects_empty_pattern() {
        let mut stack = test_stack();
        let topic = Topic::new(
            &mut stack,
            "Topic",
            TopicProps {
                topic_name: "commits".to_string(),
                display_name: "commits".to_string(),
            },
        )
        .unwrap();

        let result = Rule::new(
            &mut stack,
            "CommitRule",
            RuleProps {
                rule_name: "CommitRule".to_string(),
                pattern: EventPattern::default(),
                targets: vec![RuleTarget::topic(&topic, "hi")],
            },
        );
        assert!(matches!(
            result.unwrap_err(),
            SynthError::InvalidProperty { .. }
        ));
    }

    #[test]
    fn test_topic_target_json_encodes_its_input() {
        let mut stack = test_stack();
        let topic = Topic::new(
            &mut stack,
            "Topic",
            TopicProps {
                topic_name: "commits".to_string(),
                display_name: "commits".to_string(),
            },
        )
        .unwrap();

        Rule::new(
            &mut stack,
            "CommitRule",
            RuleProps {
                rule_name: "CommitRule".to_string(),
                pattern: branch_pattern(),
                targets: vec![RuleTarget::topic(&topic, "a commit happened")],
            },
        )
        .unwrap();

        let rule = stack.resource("CommitRule").unwrap();
        assert_eq!(
            rule.properties["Targets"][0]["Input"],
            "\"a commit happened\""
        );
        assert_eq!(rule.properties["Targets"][0]["Arn"], json!({ "Ref": "Topic" }));
    }
}
