//! Managed build projects.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::SynthResult;
use crate::iam::Role;
use crate::id::LogicalId;
use crate::logs::LogGroup;
use crate::naming::validate_name;
use crate::s3::Bucket;
use crate::stack::Stack;
use crate::template::TemplateResource;

static PROJECT_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]{0,254}$").expect("project name pattern")
});

/// Managed build images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildImage {
    /// Amazon Linux 2 ARM standard image, generation 2.
    AmazonLinux2Arm2,
    /// Amazon Linux 2 ARM standard image, generation 3.
    AmazonLinux2Arm3,
    /// x86_64 standard image, generation 7.
    Standard7,
}

impl BuildImage {
    pub fn image_id(self) -> &'static str {
        match self {
            BuildImage::AmazonLinux2Arm2 => "aws/codebuild/amazonlinux2-aarch64-standard:2.0",
            BuildImage::AmazonLinux2Arm3 => "aws/codebuild/amazonlinux2-aarch64-standard:3.0",
            BuildImage::Standard7 => "aws/codebuild/standard:7.0",
        }
    }

    pub fn environment_type(self) -> &'static str {
        match self {
            BuildImage::AmazonLinux2Arm2 | BuildImage::AmazonLinux2Arm3 => "ARM_CONTAINER",
            BuildImage::Standard7 => "LINUX_CONTAINER",
        }
    }

    pub fn compute_type(self) -> &'static str {
        "BUILD_GENERAL1_SMALL"
    }
}

/// Build definition shipped inside the source, referenced by file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSpec(String);

impl BuildSpec {
    pub fn from_source_filename(filename: &str) -> Self {
        Self(filename.to_string())
    }

    pub fn filename(&self) -> &str {
        &self.0
    }
}

/// GitHub source location for a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubSource {
    pub owner: String,
    pub repo: String,
}

impl GitHubSource {
    pub fn new(owner: &str, repo: &str) -> Self {
        Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
        }
    }

    pub fn location(&self) -> String {
        format!("https://github.com/{}/{}.git", self.owner, self.repo)
    }
}

/// Build logs routed into a log group.
#[derive(Debug, Clone)]
pub struct CloudWatchLogging {
    pub log_group: LogGroup,
    pub stream_prefix: Option<String>,
}

/// Build artifacts uploaded to a bucket.
#[derive(Debug, Clone)]
pub struct S3Artifacts {
    pub bucket: Bucket,
    pub path: String,
    /// Namespace the artifact under its build id.
    pub include_build_id: bool,
    pub name: String,
    pub package_zip: bool,
}

#[derive(Debug, Clone)]
pub struct ProjectProps {
    pub project_name: String,
    pub source: GitHubSource,
    pub build_spec: BuildSpec,
    pub build_image: BuildImage,
    pub privileged: bool,
    pub service_role: Role,
    pub logging: CloudWatchLogging,
    pub artifacts: S3Artifacts,
}

/// Handle to a declared build project.
#[derive(Debug, Clone)]
pub struct Project {
    logical_id: LogicalId,
    project_name: String,
    arn: String,
}

impl Project {
    pub fn new(stack: &mut Stack, id: &str, props: ProjectProps) -> SynthResult<Project> {
        validate_name(
            "project",
            &PROJECT_NAME,
            "1-255 characters from [A-Za-z0-9_-], starting alphanumeric",
            &props.project_name,
        )?;
        let logical_id = LogicalId::new(id)?;
        let arn = stack
            .env()
            .arn("codebuild", &format!("project/{}", props.project_name));

        let mut logs_config = json!({
            "Status": "ENABLED",
            "GroupName": props.logging.log_group.name_ref(),
        });
        if let Some(prefix) = &props.logging.stream_prefix {
            logs_config["StreamName"] = json!(prefix);
        }

        let properties = json!({
            "Name": props.project_name,
            "ServiceRole": props.service_role.arn(),
            "Source": {
                "Type": "GITHUB",
                "Location": props.source.location(),
                "BuildSpec": props.build_spec.filename(),
            },
            "Environment": {
                "Type": props.build_image.environment_type(),
                "ComputeType": props.build_image.compute_type(),
                "Image": props.build_image.image_id(),
                "PrivilegedMode": props.privileged,
            },
            "LogsConfig": { "CloudWatchLogs": logs_config },
            "Artifacts": {
                "Type": "S3",
                "Location": props.artifacts.bucket.bucket_name(),
                "Path": props.artifacts.path,
                "NamespaceType": if props.artifacts.include_build_id { "BUILD_ID" } else { "NONE" },
                "Name": props.artifacts.name,
                "Packaging": if props.artifacts.package_zip { "ZIP" } else { "NONE" },
            },
        });

        stack.add_resource(
            logical_id.clone(),
            TemplateResource {
                resource_type: "AWS::CodeBuild::Project".to_string(),
                properties,
                depends_on: vec![props.artifacts.bucket.logical_id().to_string()],
                deletion_policy: None,
            },
        )?;

        Ok(Project {
            logical_id,
            project_name: props.project_name,
            arn,
        })
    }

    pub fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    pub fn arn(&self) -> &str {
        &self.arn
    }
}
