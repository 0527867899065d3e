//! Object-storage buckets.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Value, json};

use crate::error::SynthResult;
use crate::id::LogicalId;
use crate::naming::validate_name;
use crate::stack::Stack;
use crate::template::{DeletionPolicy, TemplateResource, reference};

static BUCKET_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9.-]{1,61}[a-z0-9]$").expect("bucket name pattern"));

#[derive(Debug, Clone)]
pub struct BucketProps {
    pub bucket_name: String,
    pub removal_policy: DeletionPolicy,
}

/// Handle to a declared bucket.
#[derive(Debug, Clone)]
pub struct Bucket {
    logical_id: LogicalId,
    bucket_name: String,
}

impl Bucket {
    pub fn new(stack: &mut Stack, id: &str, props: BucketProps) -> SynthResult<Bucket> {
        validate_name(
            "bucket",
            &BUCKET_NAME,
            "3-63 lowercase characters from [a-z0-9.-], starting and ending alphanumeric",
            &props.bucket_name,
        )?;
        let logical_id = LogicalId::new(id)?;

        stack.add_resource(
            logical_id.clone(),
            TemplateResource {
                resource_type: "AWS::S3::Bucket".to_string(),
                properties: json!({ "BucketName": props.bucket_name }),
                depends_on: Vec::new(),
                deletion_policy: Some(props.removal_policy),
            },
        )?;

        Ok(Bucket {
            logical_id,
            bucket_name: props.bucket_name,
        })
    }

    pub fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }

    pub fn bucket_name(&self) -> &str {
        &self.bucket_name
    }

    pub fn name_ref(&self) -> Value {
        reference(&self.logical_id)
    }

    /// Bucket ARN. Bucket ARNs carry no account or region segment.
    pub fn arn(&self) -> String {
        format!("arn:aws:s3:::{}", self.bucket_name)
    }

    /// ARN pattern for objects under this bucket.
    pub fn object_arn(&self, pattern: &str) -> String {
        format!("arn:aws:s3:::{}/{}", self.bucket_name, pattern)
    }
}
