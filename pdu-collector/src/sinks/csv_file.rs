use std::{
    fs::File,
    io::Write,
    path::Path,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::SystemTime,
};

use futures::StreamExt;
use pdu_client::domain::{Measurement, OutletReading, Snapshot};

use crate::pipeline::{Envelope, PipelineError, Sink};

/// Column names, written once as the first line of the output.
pub const CSV_HEADER: [&str; 6] = [
    "timestamp",
    "output-id",
    "voltage",
    "current",
    "active-power",
    "power-factor",
];

/// On-disk projection of one reading. Measurements keep the device's text.
#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
struct PersistedRow<'a> {
    timestamp: i64,
    output_id: u32,
    voltage: &'a Measurement,
    current: &'a Measurement,
    active_power: &'a Measurement,
    power_factor: &'a Measurement,
}

impl<'a> PersistedRow<'a> {
    fn new(timestamp: i64, r: &'a OutletReading) -> Self {
        Self {
            timestamp,
            output_id: r.outlet_id,
            voltage: &r.voltage,
            current: &r.current,
            active_power: &r.active_power,
            power_factor: &r.power_factor,
        }
    }
}

/// Append-only CSV stream of snapshot rows.
///
/// The header goes out when the writer is created; after that rows can only
/// be appended.
pub struct CsvSnapshotWriter<W: Write> {
    inner: csv::Writer<W>,
}

impl CsvSnapshotWriter<File> {
    /// Create (or truncate) `path` and write the header.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, csv::Error> {
        let file = File::create(path)?;
        Self::new(file)
    }
}

impl<W: Write> CsvSnapshotWriter<W> {
    pub fn new(writer: W) -> Result<Self, csv::Error> {
        let mut inner = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        inner.write_record(CSV_HEADER)?;
        inner.flush()?;
        Ok(Self { inner })
    }

    /// Write one row per reading, in snapshot order, and flush. Returns the row count.
    pub fn append(&mut self, snapshot: &Snapshot) -> Result<usize, csv::Error> {
        for reading in &snapshot.readings {
            self.inner
                .serialize(PersistedRow::new(snapshot.timestamp, reading))?;
        }
        self.inner.flush()?;
        Ok(snapshot.readings.len())
    }

    pub fn close(self) -> Result<W, csv::Error> {
        self.inner
            .into_inner()
            .map_err(|e| csv::Error::from(e.into_error()))
    }
}

/// Per-run counters kept by [`CsvFileSink`].
#[derive(Debug, Default)]
pub struct SinkStats {
    ticks_persisted: AtomicU64,
    rows_written: AtomicU64,
    failed_ticks: AtomicU64,
}

impl SinkStats {
    pub fn ticks_persisted(&self) -> u64 {
        self.ticks_persisted.load(Ordering::Relaxed)
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written.load(Ordering::Relaxed)
    }

    pub fn failed_ticks(&self) -> u64 {
        self.failed_ticks.load(Ordering::Relaxed)
    }
}

/// Persists snapshots to a CSV file for the lifetime of one pipeline run.
///
/// Tick failures arriving from upstream are logged once each and skipped.
/// The writer is closed when the input stream ends.
pub struct CsvFileSink<W: Write + Send> {
    writer: Mutex<Option<CsvSnapshotWriter<W>>>,
    stats: Arc<SinkStats>,
}

impl CsvFileSink<File> {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let writer = CsvSnapshotWriter::create(path).map_err(|e| {
            PipelineError::Sink(format!("failed to create {}: {e}", path.display()))
        })?;
        tracing::info!(path = %path.display(), "output file created");
        Ok(Self::new(writer))
    }
}

impl<W: Write + Send> CsvFileSink<W> {
    pub fn new(writer: CsvSnapshotWriter<W>) -> Self {
        Self {
            writer: Mutex::new(Some(writer)),
            stats: Arc::new(SinkStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<SinkStats> {
        Arc::clone(&self.stats)
    }

    fn append(&self, snapshot: &Snapshot) -> Result<usize, PipelineError> {
        let mut guard = self
            .writer
            .lock()
            .map_err(|_| PipelineError::Sink("CSV writer lock poisoned".to_string()))?;
        let writer = guard
            .as_mut()
            .ok_or_else(|| PipelineError::Sink("CSV writer already closed".to_string()))?;
        writer
            .append(snapshot)
            .map_err(|e| PipelineError::Sink(format!("failed to append rows: {e}")))
    }

    fn close(&self) -> Result<(), PipelineError> {
        let writer = self
            .writer
            .lock()
            .map_err(|_| PipelineError::Sink("CSV writer lock poisoned".to_string()))?
            .take();
        if let Some(writer) = writer {
            writer
                .close()
                .map_err(|e| PipelineError::Sink(format!("failed to close output: {e}")))?;
            tracing::debug!("output file closed");
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl<W> Sink<Snapshot> for CsvFileSink<W>
where
    W: Write + Send + 'static,
{
    async fn run<S>(&self, mut input: S) -> Result<(), PipelineError>
    where
        S: futures::Stream<Item = Result<Envelope<Snapshot>, PipelineError>> + Send + Unpin + 'static,
    {
        while let Some(item) = input.next().await {
            let env = match item {
                Ok(env) => env,
                Err(PipelineError::Tick(failure)) => {
                    self.stats.failed_ticks.fetch_add(1, Ordering::Relaxed);
                    failure.log();
                    continue;
                }
                Err(e) => {
                    tracing::error!(error = %e, "error in upstream pipeline for CsvFileSink");
                    continue;
                }
            };

            let rows = self.append(&env.payload)?;
            self.stats.ticks_persisted.fetch_add(1, Ordering::Relaxed);
            self.stats.rows_written.fetch_add(rows as u64, Ordering::Relaxed);

            let elapsed = SystemTime::now()
                .duration_since(env.received_at)
                .unwrap_or_default();
            tracing::info!(
                timestamp = env.payload.timestamp,
                rows,
                elapsed_secs = elapsed.as_secs(),
                "values for timestamp {} written to the file",
                env.payload.timestamp
            );
        }

        self.close()
    }
}
