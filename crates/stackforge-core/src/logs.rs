//! Log groups.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::SynthResult;
use crate::id::LogicalId;
use crate::naming::validate_name;
use crate::stack::Stack;
use crate::template::{DeletionPolicy, TemplateResource, reference};

static LOG_GROUP_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_/.#-]{1,512}$").expect("log group name pattern"));

/// Supported retention periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetentionDays {
    OneDay,
    OneWeek,
    OneMonth,
    ThreeMonths,
    OneYear,
}

impl RetentionDays {
    pub fn days(self) -> u32 {
        match self {
            RetentionDays::OneDay => 1,
            RetentionDays::OneWeek => 7,
            RetentionDays::OneMonth => 30,
            RetentionDays::ThreeMonths => 90,
            RetentionDays::OneYear => 365,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogGroupProps {
    pub log_group_name: String,
    pub retention: RetentionDays,
    pub removal_policy: DeletionPolicy,
}

/// Handle to a declared log group.
#[derive(Debug, Clone)]
pub struct LogGroup {
    logical_id: LogicalId,
    log_group_name: String,
}

impl LogGroup {
    pub fn new(stack: &mut Stack, id: &str, props: LogGroupProps) -> SynthResult<LogGroup> {
        validate_name(
            "log group",
            &LOG_GROUP_NAME,
            "1-512 characters from [A-Za-z0-9_/.#-]",
            &props.log_group_name,
        )?;
        let logical_id = LogicalId::new(id)?;

        stack.add_resource(
            logical_id.clone(),
            TemplateResource {
                resource_type: "AWS::Logs::LogGroup".to_string(),
                properties: json!({
                    "LogGroupName": props.log_group_name,
                    "RetentionInDays": props.retention.days(),
                }),
                depends_on: Vec::new(),
                deletion_policy: Some(props.removal_policy),
            },
        )?;

        Ok(LogGroup {
            logical_id,
            log_group_name: props.log_group_name,
        })
    }

    pub fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }

    pub fn name(&self) -> &str {
        &self.log_group_name
    }

    pub fn name_ref(&self) -> Value {
        reference(&self.logical_id)
    }
}
