//! Boot: logging init, config load, pipeline resolution, router creation.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::conf::LogpipeConfig;
use crate::parser::PipelineMetrics;
use crate::pipeline::{LineSource, NormalizedRecord, Registry};
use crate::service::{spawn_flush_job, RecordSink, StreamRouter};

/// Everything `serve` needs, produced by [`boot`].
pub struct Runtime {
    pub config: LogpipeConfig,
    pub router: Arc<StreamRouter>,
    /// Stream that receives untagged input lines.
    pub default_tag: String,
    pub records: mpsc::UnboundedReceiver<NormalizedRecord>,
    pub flush_job: JoinHandle<()>,
}

/// Initialise the tracing / logging subsystem. Stdout carries records, so
/// diagnostics go to stderr.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "logpipe=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Load config and assemble the runtime around it.
pub async fn boot() -> anyhow::Result<Runtime> {
    info!("Starting logpipe v{}", env!("CARGO_PKG_VERSION"));

    let config = LogpipeConfig::load().context("Failed to load configuration")?;
    info!(
        "Flush settings: timeout={}ms, interval={}ms",
        config.flush.timeout_ms, config.flush.interval_ms
    );

    assemble(config)
}

/// Resolve every configured log type, register one stream per type and
/// start the timeout flush job. Must run inside a tokio runtime.
pub fn assemble(config: LogpipeConfig) -> anyhow::Result<Runtime> {
    let registry = Registry::builtin().context("Failed to register built-in log types")?;
    info!("Registered {} built-in log types", registry.len());

    let metrics = Arc::new(PipelineMetrics::new());
    let router = Arc::new(StreamRouter::new(metrics.clone(), config.flush.timeout()));
    let (tx, records) = mpsc::unbounded_channel();
    let sink: Arc<dyn RecordSink> = Arc::new(tx);

    for entry in &config.log_types {
        let receiver = registry
            .resolve(entry, metrics.clone())
            .with_context(|| format!("Failed to build log type `{}`", entry.name))?;
        info!(
            name = %entry.name,
            log_type = %entry.log_type,
            paths = ?receiver.include_paths(),
            multiline = receiver.processor().is_multiline(),
            "Log type ready"
        );
        router.attach(Arc::new(receiver), sink.clone())?;
    }
    drop(sink);

    let default_tag = config
        .log_types
        .first()
        .map(|entry| entry.name.clone())
        .context("No log types configured")?;

    let flush_job = spawn_flush_job(router.clone(), config.flush.interval());

    Ok(Runtime {
        config,
        router,
        default_tag,
        records,
        flush_job,
    })
}
