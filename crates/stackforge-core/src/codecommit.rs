//! Source repository references.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Value, json};

use crate::error::SynthResult;
use crate::events::EventPattern;
use crate::naming::validate_name;
use crate::stack::Stack;

static REPOSITORY_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._-]{1,100}$").expect("repository name pattern"));

/// Read-only handle to an existing source repository.
///
/// The repository itself lives outside the stacks; referencing it emits no
/// resource, only a concrete ARN for the stack's environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRef {
    name: String,
    arn: String,
}

impl RepositoryRef {
    pub fn from_name(stack: &Stack, name: &str) -> SynthResult<Self> {
        validate_name(
            "repository",
            &REPOSITORY_NAME,
            "1-100 characters from [A-Za-z0-9._-]",
            name,
        )?;
        Ok(Self {
            name: name.to_string(),
            arn: stack.env().arn("codecommit", name),
        })
    }

    pub fn repository_name(&self) -> &str {
        &self.name
    }

    pub fn arn(&self) -> &str {
        &self.arn
    }

    /// Event pattern matching commits pushed to this repository.
    ///
    /// `branches` narrows the match to specific reference names;
    /// `extra_detail` entries are merged over the defaults.
    pub fn on_commit(
        &self,
        branches: &[&str],
        extra_detail: BTreeMap<String, Value>,
    ) -> EventPattern {
        let mut detail = BTreeMap::from([(
            "event".to_string(),
            json!(["referenceCreated", "referenceUpdated"]),
        )]);
        if !branches.is_empty() {
            detail.insert("referenceName".to_string(), json!(branches));
        }
        detail.extend(extra_detail);

        EventPattern {
            source: vec!["aws.codecommit".to_string()],
            detail_type: vec!["CodeCommit Repository State Change".to_string()],
            resources: vec![self.arn.clone()],
            detail,
        }
    }
}
