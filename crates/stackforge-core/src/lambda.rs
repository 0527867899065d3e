//! Containerized serverless functions.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde_json::json;

use crate::asset::ImageAsset;
use crate::error::{SynthError, SynthResult};
use crate::iam::Role;
use crate::id::LogicalId;
use crate::naming::validate_name;
use crate::stack::Stack;
use crate::template::{TemplateResource, reference};

static FUNCTION_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("function name pattern"));

const MIN_MEMORY_MB: u32 = 128;
const MAX_MEMORY_MB: u32 = 10_240;
const MAX_TIMEOUT: Duration = Duration::from_secs(900);

/// Instruction-set architecture the function runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Architecture {
    Arm64,
    X86_64,
}

impl Architecture {
    pub fn value(self) -> &'static str {
        match self {
            Architecture::Arm64 => "arm64",
            Architecture::X86_64 => "x86_64",
        }
    }
}

/// Request tracing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tracing {
    Active,
    PassThrough,
    Disabled,
}

impl Tracing {
    fn mode(self) -> Option<&'static str> {
        match self {
            Tracing::Active => Some("Active"),
            Tracing::PassThrough => Some("PassThrough"),
            Tracing::Disabled => None,
        }
    }
}

/// Function executable sourced from a local image build context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerImageCode {
    asset: ImageAsset,
}

impl DockerImageCode {
    pub fn from_image_asset(context: &Path) -> SynthResult<Self> {
        Ok(Self {
            asset: ImageAsset::from_context(context)?,
        })
    }

    pub fn asset(&self) -> &ImageAsset {
        &self.asset
    }
}

#[derive(Debug, Clone)]
pub struct DockerImageFunctionProps {
    pub function_name: String,
    pub description: Option<String>,
    pub code: DockerImageCode,
    pub role: Role,
    pub architecture: Architecture,
    pub memory_size: u32,
    pub timeout: Duration,
    pub tracing: Tracing,
    pub environment: BTreeMap<String, String>,
}

/// Handle to a declared containerized function.
#[derive(Debug, Clone)]
pub struct DockerImageFunction {
    logical_id: LogicalId,
    function_name: String,
}

impl DockerImageFunction {
    pub fn new(
        stack: &mut Stack,
        id: &str,
        props: DockerImageFunctionProps,
    ) -> SynthResult<DockerImageFunction> {
        validate_name(
            "function",
            &FUNCTION_NAME,
            "1-64 characters from [A-Za-z0-9_-]",
            &props.function_name,
        )?;
        if props.memory_size < MIN_MEMORY_MB || props.memory_size > MAX_MEMORY_MB {
            return Err(SynthError::InvalidProperty {
                resource: props.function_name,
                message: format!(
                    "memory must be {MIN_MEMORY_MB}-{MAX_MEMORY_MB} MB, got {}",
                    props.memory_size
                ),
            });
        }
        if props.timeout.is_zero() || props.timeout > MAX_TIMEOUT {
            return Err(SynthError::InvalidProperty {
                resource: props.function_name,
                message: format!(
                    "timeout must be 1-{} seconds, got {}",
                    MAX_TIMEOUT.as_secs(),
                    props.timeout.as_secs()
                ),
            });
        }
        let logical_id = LogicalId::new(id)?;

        let image_uri = props.code.asset().image_uri(stack.env());
        let mut properties = json!({
            "FunctionName": props.function_name,
            "PackageType": "Image",
            "Code": { "ImageUri": image_uri },
            "Role": props.role.arn(),
            "Architectures": [props.architecture.value()],
            "MemorySize": props.memory_size,
            "Timeout": props.timeout.as_secs(),
        });
        if let Some(description) = &props.description {
            properties["Description"] = json!(description);
        }
        if let Some(mode) = props.tracing.mode() {
            properties["TracingConfig"] = json!({ "Mode": mode });
        }
        if !props.environment.is_empty() {
            properties["Environment"] = json!({ "Variables": props.environment });
        }

        stack.add_asset(props.code.asset().clone());
        stack.add_resource(
            logical_id.clone(),
            TemplateResource {
                resource_type: "AWS::Lambda::Function".to_string(),
                properties,
                depends_on: Vec::new(),
                deletion_policy: None,
            },
        )?;

        Ok(DockerImageFunction {
            logical_id,
            function_name: props.function_name,
        })
    }

    pub fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }

    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    pub fn name_ref(&self) -> serde_json::Value {
        reference(&self.logical_id)
    }
}
