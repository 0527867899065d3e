//! Notification topics.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Value, json};

use crate::error::SynthResult;
use crate::id::LogicalId;
use crate::naming::validate_name;
use crate::stack::Stack;
use crate::template::{TemplateResource, reference};

static TOPIC_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,256}$").expect("topic name pattern"));

#[derive(Debug, Clone)]
pub struct TopicProps {
    pub topic_name: String,
    pub display_name: String,
}

/// Handle to a declared topic.
#[derive(Debug, Clone)]
pub struct Topic {
    logical_id: LogicalId,
    topic_name: String,
}

impl Topic {
    pub fn new(stack: &mut Stack, id: &str, props: TopicProps) -> SynthResult<Topic> {
        validate_name(
            "topic",
            &TOPIC_NAME,
            "1-256 characters from [A-Za-z0-9_-]",
            &props.topic_name,
        )?;
        let logical_id = LogicalId::new(id)?;

        stack.add_resource(
            logical_id.clone(),
            TemplateResource {
                resource_type: "AWS::SNS::Topic".to_string(),
                properties: json!({
                    "TopicName": props.topic_name,
                    "DisplayName": props.display_name,
                }),
                depends_on: Vec::new(),
                deletion_policy: None,
            },
        )?;

        Ok(Topic {
            logical_id,
            topic_name: props.topic_name,
        })
    }

    pub fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }

    pub fn topic_name(&self) -> &str {
        &self.topic_name
    }

    /// The topic ARN, resolved at deploy time.
    pub fn arn_ref(&self) -> Value {
        reference(&self.logical_id)
    }
}
