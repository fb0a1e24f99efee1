use anyhow::Result;
use pdu_client::{device::PduStatusClient, domain::Snapshot};
use pdu_collector::{
    config::AppConfig,
    observability,
    pipeline::Pipeline,
    sinks::CsvFileSink,
    sources::PduPollSource,
    transform,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;

    let client = PduStatusClient::new(&cfg.base_url)?;
    let sink = CsvFileSink::create(&cfg.output_path)?;
    let stats = sink.stats();

    // Ctrl-C ends the polling loop; the sink then closes the file.
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            return;
        }
        on_interrupt.cancel();
    });

    tracing::info!(
        url = %client.url(),
        output = %cfg.output_path.display(),
        frequency_secs = cfg.frequency.as_secs(),
        "starting PDU monitoring"
    );

    let pipeline: Pipeline<_, Snapshot, _> = Pipeline {
        source: PduPollSource::new(client, cfg.frequency, cancel),
        transforms: vec![Arc::new(transform::SnapshotValidation::default())],
        sink,
    };

    pipeline.run().await?;

    tracing::info!(
        ticks_persisted = stats.ticks_persisted(),
        rows_written = stats.rows_written(),
        failed_ticks = stats.failed_ticks(),
        "PDU monitoring has been interrupted"
    );

    Ok(())
}
