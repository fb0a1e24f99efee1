use std::time::SystemTime;

use pdu_client::domain::Snapshot;

use crate::{
    failure::{TickFailure, TickFailureKind},
    pipeline::{Envelope, PipelineError, Transform},
};

/// Pure validation of a `Snapshot` before it is persisted.
///
/// Rules:
/// - outlet ids must be unique and run contiguously from 0 in ascending order.
pub fn validate_snapshot(env: Envelope<Snapshot>) -> Result<Envelope<Snapshot>, PipelineError> {
    let snap = &env.payload;

    if !snap.has_contiguous_outlets() {
        let ids: Vec<u32> = snap.readings.iter().map(|r| r.outlet_id).collect();
        let elapsed = SystemTime::now()
            .duration_since(env.received_at)
            .unwrap_or_default();
        return Err(TickFailure::new(
            snap.timestamp,
            elapsed,
            TickFailureKind::Rejected(format!("outlet ids {ids:?} are not contiguous from 0")),
        )
        .into());
    }

    Ok(env)
}

#[derive(Clone, Default)]
pub struct SnapshotValidation;

#[async_trait::async_trait]
impl Transform<Snapshot, Snapshot> for SnapshotValidation {
    async fn apply(&self, input: Envelope<Snapshot>) -> Result<Envelope<Snapshot>, PipelineError> {
        validate_snapshot(input)
    }
}
