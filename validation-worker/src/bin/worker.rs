//! Validation worker
//!
//! Reads JSON requests from stdin and writes JSON responses to stdout.
//! Logs go to stderr.

use invoice_validation::ValidationEngine;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;
use validation_worker::{serve_lines, LogFormat, WorkerConfig, WorkerHandle};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = WorkerConfig::from_env()?;
    init_tracing(config.log_format);

    info!(
        service = %config.service_name,
        version = %config.service_version,
        mailbox = config.mailbox_capacity,
        "Starting validation worker"
    );

    let engine = ValidationEngine::new(config.engine.clone())?;
    let (handle, actor) = WorkerHandle::spawn(engine, config.mailbox_capacity);

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    serve_lines(stdin, tokio::io::stdout(), &handle).await?;

    handle.shutdown().await?;
    actor.await?;

    info!("Validation worker stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::from_default_env().add_directive(Level::INFO.into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}
