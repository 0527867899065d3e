//! The delivery pipeline stack.

use std::collections::BTreeMap;

use serde_json::json;
use stackforge_core::codebuild::{
    BuildImage, BuildSpec, CloudWatchLogging, GitHubSource, Project, ProjectProps, S3Artifacts,
};
use stackforge_core::codecommit::RepositoryRef;
use stackforge_core::codepipeline::{Action, Pipeline, PipelineArtifact, PipelineProps, StageDef};
use stackforge_core::events::{Rule, RuleProps, RuleTarget};
use stackforge_core::iam::{
    Policy, PolicyDocument, PolicyProps, PolicyStatement, Role, RoleProps, ServicePrincipal,
};
use stackforge_core::logs::{LogGroup, LogGroupProps, RetentionDays};
use stackforge_core::s3::{Bucket, BucketProps};
use stackforge_core::sns::{Topic, TopicProps};
use stackforge_core::template::DeletionPolicy;
use stackforge_core::{Environment, Stack, SynthResult};
use tracing::debug;

pub const PIPELINE_STACK_NAME: &str = "PipelineStack";

/// Inputs for the pipeline stack. The defaults describe this repository.
#[derive(Debug, Clone)]
pub struct PipelineStackProps {
    /// Source repository the pipeline checks out.
    pub repository_name: String,
    /// GitHub mirror the build project pulls from.
    pub github_owner: String,
    pub github_repo: String,
    /// Branch whose commits trigger the pipeline.
    pub branch: String,
    pub artifact_bucket_name: String,
}

impl Default for PipelineStackProps {
    fn default() -> Self {
        Self {
            repository_name: "stackforge".to_string(),
            github_owner: "stackforge-dev".to_string(),
            github_repo: "stackforge".to_string(),
            branch: "main".to_string(),
            artifact_bucket_name: "stackforge-applications".to_string(),
        }
    }
}

/// Declare the stack that delivers this repository: build role, build log
/// group, artifact bucket, build project, the two-stage pipeline, and the
/// commit rule fanning out to the pipeline and the notification topic.
pub fn pipeline_stack(env: &Environment, props: &PipelineStackProps) -> SynthResult<Stack> {
    let mut stack = Stack::new(PIPELINE_STACK_NAME, env.clone())?
        .with_description("Continuous delivery pipeline for the stackforge repository");

    let repo = RepositoryRef::from_name(&stack, &props.repository_name)?;
    let build_role = build_role(&mut stack)?;

    // Custom log group so a retention policy applies to build logs.
    let log_group = LogGroup::new(
        &mut stack,
        "CodeBuildLogGroup",
        LogGroupProps {
            log_group_name: "CodeBuildLogGroup".to_string(),
            retention: RetentionDays::OneDay,
            removal_policy: DeletionPolicy::Delete,
        },
    )?;

    let bucket = Bucket::new(
        &mut stack,
        "ApplicationsBucket",
        BucketProps {
            bucket_name: props.artifact_bucket_name.clone(),
            removal_policy: DeletionPolicy::Delete,
        },
    )?;

    let project = Project::new(
        &mut stack,
        "CodeBuildProject",
        ProjectProps {
            project_name: "CodeBuildProject".to_string(),
            source: GitHubSource::new(&props.github_owner, &props.github_repo),
            build_spec: BuildSpec::from_source_filename("buildspec.yml"),
            build_image: BuildImage::AmazonLinux2Arm2,
            privileged: true,
            service_role: build_role.clone(),
            logging: CloudWatchLogging {
                log_group,
                stream_prefix: Some("aws/codebuild/".to_string()),
            },
            artifacts: S3Artifacts {
                bucket: bucket.clone(),
                path: props.repository_name.clone(),
                include_build_id: true,
                name: "build.zip".to_string(),
                package_zip: true,
            },
        },
    )?;

    let pipeline_role = pipeline_role(&mut stack, &bucket, &project, &repo)?;

    let source_artifact = PipelineArtifact::new("SourceArtifact")?;
    let pipeline = Pipeline::new(
        &mut stack,
        "Pipeline",
        PipelineProps {
            pipeline_name: "Pipeline".to_string(),
            stages: vec![
                StageDef {
                    name: "Source".to_string(),
                    actions: vec![Action::code_commit_source(
                        "Source",
                        &repo,
                        &props.branch,
                        source_artifact.clone(),
                    )],
                },
                StageDef {
                    name: "Build".to_string(),
                    actions: vec![Action::code_build(
                        "Build",
                        &project,
                        source_artifact,
                        Vec::new(),
                    )],
                },
            ],
            artifact_bucket: bucket,
            role: pipeline_role,
        },
    )?;

    let topic = Topic::new(
        &mut stack,
        "CodeCommitSnsTopic",
        TopicProps {
            topic_name: "CodeCommitSnsTopic".to_string(),
            display_name: "CodeCommitSnsTopic".to_string(),
        },
    )?;

    // Notify the admin when someone commits to the watched branch.
    let message = format!(
        "A commit was made to the {} branch of the {} repository",
        props.branch,
        repo.repository_name()
    );
    let pattern = repo.on_commit(
        &[props.branch.as_str()],
        BTreeMap::from([("referenceType".to_string(), json!(["branch"]))]),
    );
    Rule::new(
        &mut stack,
        "MainBranchCommitRule",
        RuleProps {
            rule_name: "MainBranchCommitRule".to_string(),
            pattern,
            targets: vec![
                RuleTarget::topic(&topic, &message),
                RuleTarget::pipeline(&pipeline, &build_role),
            ],
        },
    )?;

    debug!(
        stack = stack.name(),
        resources = stack.resource_count(),
        "declared pipeline stack"
    );
    Ok(stack)
}

fn build_role(stack: &mut Stack) -> SynthResult<Role> {
    let role = Role::new(
        stack,
        "CodeBuildRole",
        RoleProps {
            role_name: "CodeBuildRole".to_string(),
            assumed_by: ServicePrincipal::new("codebuild.amazonaws.com"),
            managed_policy_arns: Vec::new(),
        },
    )?;

    Policy::new(
        stack,
        "CodeBuildPolicy",
        PolicyProps {
            policy_name: "CodeBuildPolicy".to_string(),
            document: PolicyDocument::new(vec![
                PolicyStatement::allow(
                    &["sts:AssumeRole", "iam:PassRole"],
                    &["arn:aws:iam::*:role/deploy-*"],
                )
                .with_sid("assumerole"),
                PolicyStatement::allow(&["ssm:GetParameters", "ssm:GetParameter"], &["*"]),
                PolicyStatement::allow(
                    &[
                        "logs:CreateLogStream",
                        "logs:CreateLogGroup",
                        "logs:PutLogEvents",
                    ],
                    &["*"],
                ),
            ]),
            roles: vec![role.clone()],
        },
    )?;

    Ok(role)
}

fn pipeline_role(
    stack: &mut Stack,
    bucket: &Bucket,
    project: &Project,
    repo: &RepositoryRef,
) -> SynthResult<Role> {
    let role = Role::new(
        stack,
        "PipelineRole",
        RoleProps {
            role_name: "PipelineRole".to_string(),
            assumed_by: ServicePrincipal::new("codepipeline.amazonaws.com"),
            managed_policy_arns: Vec::new(),
        },
    )?;

    Policy::new(
        stack,
        "PipelinePolicy",
        PolicyProps {
            policy_name: "PipelinePolicy".to_string(),
            document: PolicyDocument::new(vec![
                PolicyStatement::allow(
                    &[
                        "s3:GetObject",
                        "s3:GetObjectVersion",
                        "s3:GetBucketVersioning",
                        "s3:PutObject",
                    ],
                    &[bucket.arn().as_str(), bucket.object_arn("*").as_str()],
                ),
                PolicyStatement::allow(
                    &["codebuild:StartBuild", "codebuild:BatchGetBuilds"],
                    &[project.arn()],
                ),
                PolicyStatement::allow(
                    &[
                        "codecommit:GetBranch",
                        "codecommit:GetCommit",
                        "codecommit:UploadArchive",
                        "codecommit:GetUploadArchiveStatus",
                        "codecommit:CancelUploadArchive",
                    ],
                    &[repo.arn()],
                ),
            ]),
            roles: vec![role.clone()],
        },
    )?;

    Ok(role)
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;

    fn synthesized() -> Value {
        let stack = pipeline_stack(
            &Environment::new("123456789012", "eu-west-1"),
            &PipelineStackProps::default(),
        )
        .unwrap();
        serde_json::to_value(stack.render()).unwrap()
    }

    fn resources_of_type<'a>(template: &'a Value, resource_type: &str) -> Vec<&'a Value> {
        template["Resources"]
            .as_object()
            .unwrap()
            .values()
            .filter(|r| r["Type"] == resource_type)
            .collect()
    }

    #[test]
    fn test_exactly_one_commit_rule_fanning_out_to_pipeline_and_topic() {
        let template = synthesized();
        let rules = resources_of_type(&template, "AWS::Events::Rule");
        assert_eq!(rules.len(), 1);

        let pattern = &rules[0]["Properties"]["EventPattern"];
        assert_eq!(pattern["detail"]["referenceType"], serde_json::json!(["branch"]));
        assert_eq!(pattern["detail"]["referenceName"], serde_json::json!(["main"]));
        assert_eq!(pattern["source"][0], "aws.codecommit");

        let targets = rules[0]["Properties"]["Targets"].as_array().unwrap();
        assert_eq!(targets.len(), 2);

        let pipeline_target = targets.iter().find(|t| t["Id"] == "Pipeline").unwrap();
        assert_eq!(
            pipeline_target["Arn"],
            "arn:aws:codepipeline:eu-west-1:123456789012:Pipeline"
        );
        assert!(pipeline_target.get("RoleArn").is_some());

        let topic_target = targets.iter().find(|t| t["Id"] == "Topic").unwrap();
        assert_eq!(topic_target["Arn"], serde_json::json!({ "Ref": "CodeCommitSnsTopic" }));
        let input = topic_target["Input"].as_str().unwrap();
        assert!(input.contains("main branch"));
        assert!(input.contains("stackforge repository"));
    }

    #[test]
    fn test_build_role_policy_has_exactly_three_allow_statements() {
        let template = synthesized();
        let policy = &template["Resources"]["CodeBuildPolicy"];
        assert_eq!(policy["Type"], "AWS::IAM::Policy");

        let statements = policy["Properties"]["PolicyDocument"]["Statement"]
            .as_array()
            .unwrap();
        assert_eq!(statements.len(), 3);
        for statement in statements {
            assert_eq!(statement["Effect"], "Allow");
        }

        assert_eq!(statements[0]["Sid"], "assumerole");
        assert_eq!(
            statements[0]["Action"],
            serde_json::json!(["sts:AssumeRole", "iam:PassRole"])
        );
        assert_eq!(
            statements[0]["Resource"],
            serde_json::json!(["arn:aws:iam::*:role/deploy-*"])
        );
        assert_eq!(
            statements[1]["Action"],
            serde_json::json!(["ssm:GetParameters", "ssm:GetParameter"])
        );
        assert_eq!(
            statements[2]["Action"],
            serde_json::json!([
                "logs:CreateLogStream",
                "logs:CreateLogGroup",
                "logs:PutLogEvents"
            ])
        );
        assert_eq!(statements[1]["Resource"], serde_json::json!(["*"]));
        assert_eq!(statements[2]["Resource"], serde_json::json!(["*"]));
    }

    #[test]
    fn test_pipeline_runs_source_then_build() {
        let template = synthesized();
        let pipeline = &template["Resources"]["Pipeline"];
        assert_eq!(pipeline["Type"], "AWS::CodePipeline::Pipeline");

        let stages = pipeline["Properties"]["Stages"].as_array().unwrap();
        assert_eq!(stages.len(), 2);
        assert_eq!(stages[0]["Name"], "Source");
        assert_eq!(stages[1]["Name"], "Build");

        let source = &stages[0]["Actions"][0];
        assert_eq!(source["Configuration"]["RepositoryName"], "stackforge");
        assert_eq!(source["Configuration"]["BranchName"], "main");
        assert_eq!(source["Configuration"]["PollForSourceChanges"], false);
        assert_eq!(source["OutputArtifacts"][0]["Name"], "SourceArtifact");

        let build = &stages[1]["Actions"][0];
        assert_eq!(build["Configuration"]["ProjectName"], "CodeBuildProject");
        assert_eq!(build["InputArtifacts"][0]["Name"], "SourceArtifact");

        assert_eq!(
            pipeline["Properties"]["ArtifactStore"]["Location"],
            "stackforge-applications"
        );
    }

    #[test]
    fn test_build_project_uses_privileged_arm_image_with_source_buildspec() {
        let template = synthesized();
        let project = &template["Resources"]["CodeBuildProject"];
        assert_eq!(project["Type"], "AWS::CodeBuild::Project");

        let environment = &project["Properties"]["Environment"];
        assert_eq!(environment["Type"], "ARM_CONTAINER");
        assert_eq!(environment["PrivilegedMode"], true);
        assert_eq!(
            environment["Image"],
            "aws/codebuild/amazonlinux2-aarch64-standard:2.0"
        );

        assert_eq!(project["Properties"]["Source"]["BuildSpec"], "buildspec.yml");
        assert_eq!(project["Properties"]["Artifacts"]["Path"], "stackforge");
        assert_eq!(project["Properties"]["Artifacts"]["Name"], "build.zip");
    }

    #[test]
    fn test_build_log_group_retention_is_one_day() {
        let template = synthesized();
        let log_group = &template["Resources"]["CodeBuildLogGroup"];
        assert_eq!(log_group["Type"], "AWS::Logs::LogGroup");
        assert_eq!(log_group["Properties"]["RetentionInDays"], 1);
        assert_eq!(log_group["DeletionPolicy"], "Delete");
    }
}
