//! Container entry point wiring the greeter to the runtime adapter.

use lambda_runtime::{Error, LambdaEvent, service_fn};
use serde_json::Value;
use stackforge_greeter::{greeting, parse_event};
use tracing::info;
use tracing_subscriber::EnvFilter;

async fn handle_request(event: LambdaEvent<Value>) -> Result<Value, Error> {
    info!("Running handler...");
    let event = parse_event(event.payload).map_err(|error| Error::from(error.to_string()))?;
    info!("{}", greeting(&event));
    Ok(Value::Null)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    lambda_runtime::run(service_fn(handle_request)).await
}
