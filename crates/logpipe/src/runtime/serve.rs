//! Serve: feed stdin through the stream router and write records to stdout.

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::boot::Runtime;
use super::stop::shutdown_signal;
use crate::pipeline::NormalizedRecord;
use crate::service::StreamRouter;

/// Read `tag<TAB>line` input until EOF or a shutdown signal, then flush
/// every stream and report the metrics snapshot.
pub async fn serve(runtime: Runtime) -> anyhow::Result<()> {
    let Runtime {
        router,
        default_tag,
        records,
        flush_job,
        ..
    } = runtime;

    let writer = tokio::spawn(write_records(records));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    info!("logpipe is ready, reading lines from stdin (default stream: {})", default_tag);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line.context("Failed to read stdin")? {
                    Some(line) => route_line(&router, &default_tag, line),
                    None => {
                        info!("stdin closed");
                        break;
                    }
                }
            }
            _ = &mut shutdown => break,
        }
    }

    flush_job.abort();
    let flushed = router.shutdown();
    let written = writer.await.context("Record writer task failed")??;

    let snapshot = router.metrics().snapshot();
    info!(flushed, written, "Shutdown complete");
    info!("Metrics: {}", serde_json::to_string(&snapshot)?);
    Ok(())
}

fn route_line(router: &StreamRouter, default_tag: &str, line: String) {
    let (tag, line) = match split_tagged(&line, |tag| router.contains(tag)) {
        Some((tag, rest)) => (tag.to_string(), rest.to_string()),
        None => (default_tag.to_string(), line),
    };
    if let Err(e) = router.push_line(&tag, line) {
        warn!("Dropping input line: {}", e);
    }
}

/// Split off a leading `tag\t` when the tag names a known stream. Anything
/// else, including continuation lines that start with a tab, is untagged.
fn split_tagged(line: &str, is_known: impl Fn(&str) -> bool) -> Option<(&str, &str)> {
    line.split_once('\t')
        .filter(|(tag, _)| !tag.is_empty() && is_known(tag))
}

async fn write_records(mut records: mpsc::UnboundedReceiver<NormalizedRecord>) -> anyhow::Result<u64> {
    let mut stdout = tokio::io::stdout();
    let mut written: u64 = 0;

    while let Some(record) = records.recv().await {
        let mut buf = serde_json::to_vec(&record)?;
        buf.push(b'\n');
        stdout.write_all(&buf).await?;
        stdout.flush().await?;
        written = written.saturating_add(1);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known(tag: &str) -> bool {
        matches!(tag, "kafka" | "web")
    }

    #[test]
    fn test_split_known_tag() {
        assert_eq!(
            split_tagged("kafka\t[2022-01-26 18:25:21,107] INFO hi", known),
            Some(("kafka", "[2022-01-26 18:25:21,107] INFO hi"))
        );
    }

    #[test]
    fn test_continuation_line_is_untagged() {
        assert_eq!(split_tagged("\tat org.example.Main.run(Main.java:10)", known), None);
        assert_eq!(split_tagged("unknown\tvalue", known), None);
        assert_eq!(split_tagged("no tab here", known), None);
    }
}
