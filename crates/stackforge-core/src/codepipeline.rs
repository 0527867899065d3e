//! Delivery pipelines.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Value, json};

use crate::codebuild::Project;
use crate::codecommit::RepositoryRef;
use crate::error::{SynthError, SynthResult};
use crate::iam::Role;
use crate::id::LogicalId;
use crate::naming::validate_name;
use crate::s3::Bucket;
use crate::stack::Stack;
use crate::template::TemplateResource;

static PIPELINE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._@-]{1,100}$").expect("pipeline name pattern"));

static ARTIFACT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,100}$").expect("artifact name pattern"));

/// A named artifact handed between actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineArtifact(String);

impl PipelineArtifact {
    pub fn new(name: &str) -> SynthResult<Self> {
        validate_name(
            "artifact",
            &ARTIFACT_NAME,
            "1-100 characters from [A-Za-z0-9_-]",
            name,
        )?;
        Ok(Self(name.to_string()))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

/// An action inside a stage.
#[derive(Debug, Clone)]
pub enum Action {
    /// Check out a repository branch into an output artifact. The trigger
    /// is event-driven; polling stays disabled.
    CodeCommitSource {
        action_name: String,
        repository_name: String,
        branch: String,
        output: PipelineArtifact,
    },
    /// Run a build project over an input artifact.
    CodeBuild {
        action_name: String,
        project_name: String,
        input: PipelineArtifact,
        outputs: Vec<PipelineArtifact>,
    },
}

impl Action {
    pub fn code_commit_source(
        action_name: &str,
        repository: &RepositoryRef,
        branch: &str,
        output: PipelineArtifact,
    ) -> Self {
        Action::CodeCommitSource {
            action_name: action_name.to_string(),
            repository_name: repository.repository_name().to_string(),
            branch: branch.to_string(),
            output,
        }
    }

    pub fn code_build(
        action_name: &str,
        project: &Project,
        input: PipelineArtifact,
        outputs: Vec<PipelineArtifact>,
    ) -> Self {
        Action::CodeBuild {
            action_name: action_name.to_string(),
            project_name: project.project_name().to_string(),
            input,
            outputs,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Action::CodeCommitSource { action_name, .. } => action_name,
            Action::CodeBuild { action_name, .. } => action_name,
        }
    }

    fn render(&self) -> Value {
        match self {
            Action::CodeCommitSource {
                action_name,
                repository_name,
                branch,
                output,
            } => json!({
                "Name": action_name,
                "ActionTypeId": {
                    "Category": "Source",
                    "Owner": "AWS",
                    "Provider": "CodeCommit",
                    "Version": "1",
                },
                "Configuration": {
                    "RepositoryName": repository_name,
                    "BranchName": branch,
                    "PollForSourceChanges": false,
                },
                "OutputArtifacts": [{ "Name": output.name() }],
                "RunOrder": 1,
            }),
            Action::CodeBuild {
                action_name,
                project_name,
                input,
                outputs,
            } => {
                let outputs: Vec<Value> =
                    outputs.iter().map(|a| json!({ "Name": a.name() })).collect();
                json!({
                    "Name": action_name,
                    "ActionTypeId": {
                        "Category": "Build",
                        "Owner": "AWS",
                        "Provider": "CodeBuild",
                        "Version": "1",
                    },
                    "Configuration": { "ProjectName": project_name },
                    "InputArtifacts": [{ "Name": input.name() }],
                    "OutputArtifacts": outputs,
                    "RunOrder": 1,
                })
            }
        }
    }
}

/// An ordered unit of work. Stage order is execution order: every action
/// of a stage runs only after all prior stages' actions complete.
#[derive(Debug, Clone)]
pub struct StageDef {
    pub name: String,
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone)]
pub struct PipelineProps {
    pub pipeline_name: String,
    pub stages: Vec<StageDef>,
    pub artifact_bucket: Bucket,
    pub role: Role,
}

/// Handle to a declared pipeline.
#[derive(Debug, Clone)]
pub struct Pipeline {
    logical_id: LogicalId,
    pipeline_name: String,
    arn: String,
}

impl Pipeline {
    pub fn new(stack: &mut Stack, id: &str, props: PipelineProps) -> SynthResult<Pipeline> {
        validate_name(
            "pipeline",
            &PIPELINE_NAME,
            "1-100 characters from [A-Za-z0-9._@-]",
            &props.pipeline_name,
        )?;
        if props.stages.is_empty() {
            return Err(SynthError::InvalidProperty {
                resource: props.pipeline_name,
                message: "pipeline has no stages".to_string(),
            });
        }
        let mut seen = Vec::new();
        for stage in &props.stages {
            if stage.actions.is_empty() {
                return Err(SynthError::InvalidProperty {
                    resource: props.pipeline_name,
                    message: format!("stage '{}' has no actions", stage.name),
                });
            }
            if seen.contains(&stage.name.as_str()) {
                return Err(SynthError::InvalidProperty {
                    resource: props.pipeline_name,
                    message: format!("duplicate stage name: {}", stage.name),
                });
            }
            seen.push(stage.name.as_str());
        }
        let logical_id = LogicalId::new(id)?;
        let arn = stack.env().arn("codepipeline", &props.pipeline_name);

        let stages: Vec<Value> = props
            .stages
            .iter()
            .map(|stage| {
                let actions: Vec<Value> = stage.actions.iter().map(Action::render).collect();
                json!({ "Name": stage.name, "Actions": actions })
            })
            .collect();

        let properties = json!({
            "Name": props.pipeline_name,
            "RoleArn": props.role.arn(),
            "ArtifactStore": {
                "Type": "S3",
                "Location": props.artifact_bucket.bucket_name(),
            },
            "Stages": stages,
        });

        stack.add_resource(
            logical_id.clone(),
            TemplateResource {
                resource_type: "AWS::CodePipeline::Pipeline".to_string(),
                properties,
                depends_on: vec![props.artifact_bucket.logical_id().to_string()],
                deletion_policy: None,
            },
        )?;

        Ok(Pipeline {
            logical_id,
            pipeline_name: props.pipeline_name,
            arn,
        })
    }

    pub fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }

    pub fn pipeline_name(&self) -> &str {
        &self.pipeline_name
    }

    pub fn arn(&self) -> &str {
        &self.arn
    }
}
