//! The greeter function stack.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use stackforge_core::iam::{Role, RoleProps, ServicePrincipal};
use stackforge_core::lambda::{
    Architecture, DockerImageCode, DockerImageFunction, DockerImageFunctionProps, Tracing,
};
use stackforge_core::logs::{LogGroup, LogGroupProps, RetentionDays};
use stackforge_core::template::DeletionPolicy;
use stackforge_core::{Environment, Stack, SynthResult};
use tracing::debug;

pub const FUNCTION_STACK_NAME: &str = "GreeterStack";

/// Inputs for the function stack. Only the image build context varies;
/// the runtime configuration is fixed.
#[derive(Debug, Clone)]
pub struct FunctionStackProps {
    pub image_context: PathBuf,
}

impl FunctionStackProps {
    pub fn new(image_context: impl Into<PathBuf>) -> Self {
        Self {
            image_context: image_context.into(),
        }
    }
}

/// Declare the stack holding the containerized greeter function and its
/// execution role and log group.
pub fn function_stack(env: &Environment, props: &FunctionStackProps) -> SynthResult<Stack> {
    let mut stack = Stack::new(FUNCTION_STACK_NAME, env.clone())?
        .with_description("Containerized greeter function");

    let role = Role::new(
        &mut stack,
        "GreeterExecutionRole",
        RoleProps {
            role_name: "GreeterExecutionRole".to_string(),
            assumed_by: ServicePrincipal::new("lambda.amazonaws.com"),
            managed_policy_arns: vec![
                "arn:aws:iam::aws:policy/service-role/AWSLambdaBasicExecutionRole".to_string(),
                "arn:aws:iam::aws:policy/AWSXRayDaemonWriteAccess".to_string(),
            ],
        },
    )?;

    let function = DockerImageFunction::new(
        &mut stack,
        "GreeterFunction",
        DockerImageFunctionProps {
            function_name: "greeter".to_string(),
            description: Some(
                "An example of a Rust function built from a container image".to_string(),
            ),
            code: DockerImageCode::from_image_asset(&props.image_context)?,
            role,
            architecture: Architecture::Arm64,
            memory_size: 128,
            timeout: Duration::from_secs(3),
            tracing: Tracing::Active,
            environment: BTreeMap::from([(
                "CARGO_BUILD_TARGET".to_string(),
                "aarch64-unknown-linux-gnu".to_string(),
            )]),
        },
    )?;

    LogGroup::new(
        &mut stack,
        "GreeterLogGroup",
        LogGroupProps {
            log_group_name: format!("/aws/lambda/{}", function.function_name()),
            retention: RetentionDays::OneDay,
            removal_policy: DeletionPolicy::Delete,
        },
    )?;

    debug!(
        stack = stack.name(),
        resources = stack.resource_count(),
        "declared function stack"
    );
    Ok(stack)
}
