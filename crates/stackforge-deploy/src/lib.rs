//! Stack declarations for the stackforge application.
//!
//! Two declarative units compose into one deployable application: the
//! delivery pipeline for this repository and the containerized greeter
//! function. Everything here is synthesis-time only; once the templates
//! are written, the external platform owns the resource lifecycle.

pub mod function;
pub mod pipeline;

pub use function::{FunctionStackProps, function_stack};
pub use pipeline::{PipelineStackProps, pipeline_stack};

use stackforge_core::{App, Environment, SynthResult};

#[derive(Debug, Clone)]
pub struct ApplicationProps {
    pub pipeline: PipelineStackProps,
    pub function: FunctionStackProps,
}

/// Assemble the whole application: the pipeline stack and the greeter
/// function stack, in that order.
pub fn application(env: &Environment, props: &ApplicationProps) -> SynthResult<App> {
    let mut app = App::new();
    app.add_stack(pipeline_stack(env, &props.pipeline)?)?;
    app.add_stack(function_stack(env, &props.function)?)?;
    Ok(app)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use stackforge_core::Environment;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_application_declares_both_stacks_in_order() {
        let context = tempdir().unwrap();
        fs::write(context.path().join("Dockerfile"), "FROM scratch\n").unwrap();

        let app = application(
            &Environment::new("123456789012", "eu-west-1"),
            &ApplicationProps {
                pipeline: PipelineStackProps::default(),
                function: FunctionStackProps::new(context.path()),
            },
        )
        .unwrap();

        assert_eq!(app.stack_names(), vec!["PipelineStack", "GreeterStack"]);
    }

    #[test]
    fn test_resynthesis_with_unchanged_inputs_is_byte_identical() {
        let context = tempdir().unwrap();
        fs::write(context.path().join("Dockerfile"), "FROM scratch\n").unwrap();

        let env = Environment::new("123456789012", "eu-west-1");
        let props = ApplicationProps {
            pipeline: PipelineStackProps::default(),
            function: FunctionStackProps::new(context.path()),
        };

        let first = application(&env, &props).unwrap().synth().unwrap();
        let second = application(&env, &props).unwrap().synth().unwrap();

        for stack in ["PipelineStack", "GreeterStack"] {
            assert_eq!(first.template(stack).unwrap(), second.template(stack).unwrap());
        }
        assert_eq!(
            serde_json::to_string(first.manifest()).unwrap(),
            serde_json::to_string(second.manifest()).unwrap()
        );
    }
}
