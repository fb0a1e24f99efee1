use anyhow::{bail, Result};
use pdu_client::device::PduStatusClient;
use pdu_collector::{
    observability,
    sinks::CsvSnapshotWriter,
    sources::{pdu_poll::poll_once, Clock, SystemClock, TIMESTAMP_SKEW_SECS},
};
use std::env;

/// Runs a single tick against a PDU and prints the CSV it would append.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    observability::init_tracing_stderr();

    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        bail!("usage: pdu_once <pdu_base_url>");
    }

    let client = PduStatusClient::new(args[1].trim_end_matches('/'))?;
    let timestamp = SystemClock.now_unix() - TIMESTAMP_SKEW_SECS;

    let snapshot = match poll_once(&client, timestamp).await {
        Ok(snapshot) => snapshot,
        Err(kind) => {
            tracing::error!(url = %client.url(), timestamp, error = %kind, "single tick failed");
            bail!("values for timestamp {timestamp} failed: {kind}");
        }
    };

    let mut writer = CsvSnapshotWriter::new(std::io::stdout().lock())?;
    writer.append(&snapshot)?;
    drop(writer.close()?);

    Ok(())
}
