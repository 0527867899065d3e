//! stackforge synthesis CLI.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use stackforge_core::Environment;
use stackforge_deploy::{ApplicationProps, FunctionStackProps, PipelineStackProps, application};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stackforge")]
#[command(about = "Synthesize deployment templates for the stackforge stacks", long_about = None)]
struct Cli {
    /// Target account id
    #[arg(long, env = "STACKFORGE_ACCOUNT")]
    account: String,

    /// Target region
    #[arg(long, env = "STACKFORGE_REGION")]
    region: String,

    /// Image build context for the greeter function
    #[arg(long, default_value = "crates/stackforge-greeter")]
    image_context: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize stack templates into an output directory
    Synth {
        /// Output directory for templates and the assembly manifest
        #[arg(long, default_value = "out")]
        out_dir: PathBuf,
        /// Only emit the named stack
        #[arg(long)]
        stack: Option<String>,
    },
    /// List the stacks this application defines
    Ls,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let env = Environment::new(&cli.account, &cli.region);
    let props = ApplicationProps {
        pipeline: PipelineStackProps::default(),
        function: FunctionStackProps::new(&cli.image_context),
    };

    match cli.command {
        Commands::Synth { out_dir, stack } => {
            let app = application(&env, &props).context("failed to declare stacks")?;
            let assembly = app.synth().context("synthesis failed")?;
            match stack {
                Some(name) => {
                    let path = assembly
                        .write_stack_to(&out_dir, &name)
                        .with_context(|| format!("failed to write stack '{name}'"))?;
                    info!(template = %path.display(), "wrote template");
                }
                None => {
                    let written = assembly
                        .write_to(&out_dir)
                        .context("failed to write assembly")?;
                    for path in &written {
                        info!(file = %path.display(), "wrote");
                    }
                }
            }
        }
        Commands::Ls => {
            let app = application(&env, &props).context("failed to declare stacks")?;
            for name in app.stack_names() {
                println!("{name}");
            }
        }
    }

    Ok(())
}
