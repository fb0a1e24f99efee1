use std::{
    sync::Arc,
    time::{Duration, Instant, SystemTime},
};

use pdu_client::{
    device::{extract_snapshot, StatusFetcher},
    domain::Snapshot,
};
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;

use crate::{
    failure::{TickFailure, TickFailureKind},
    pipeline::{Envelope, EnvelopeStream, PipelineError, Source},
};

/// Seconds subtracted from the tick clock reading.
///
/// The status request takes about 1.7s on average to come back, so the
/// reading is closer to "now - 1" than to the moment the request was sent.
pub const TIMESTAMP_SKEW_SECS: i64 = 1;

/// Wall clock in whole Unix seconds.
pub trait Clock: Send + Sync {
    fn now_unix(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> i64 {
        OffsetDateTime::now_utc().unix_timestamp()
    }
}

/// Fixed-delay polling of a PDU.
///
/// Each tick reads the clock, fetches the status once, extracts a snapshot and
/// yields it (or the tick's failure). The next tick starts `frequency` after
/// the consumer has taken the item, so the effective period is
/// `frequency + fetch latency`. The stream ends once `cancel` fires, either at
/// the top of a tick, during an in-flight fetch (the tick is dropped) or
/// during the sleep.
pub struct PduPollSource<F> {
    fetcher: Arc<F>,
    clock: Arc<dyn Clock>,
    frequency: Duration,
    cancel: CancellationToken,
}

impl<F> PduPollSource<F>
where
    F: StatusFetcher + 'static,
{
    pub fn new(fetcher: F, frequency: Duration, cancel: CancellationToken) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            clock: Arc::new(SystemClock),
            frequency,
            cancel,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// One fetch + extract attempt stamped with `timestamp`.
pub async fn poll_once<F>(fetcher: &F, timestamp: i64) -> Result<Snapshot, TickFailureKind>
where
    F: StatusFetcher + ?Sized,
{
    let body = fetcher.fetch().await?;
    Ok(extract_snapshot(timestamp, &body)?)
}

#[async_trait::async_trait]
impl<F> Source<Snapshot> for PduPollSource<F>
where
    F: StatusFetcher + 'static,
{
    async fn stream(&self) -> EnvelopeStream<Snapshot> {
        let fetcher = Arc::clone(&self.fetcher);
        let clock = Arc::clone(&self.clock);
        let frequency = self.frequency;
        let cancel = self.cancel.clone();

        let s = async_stream::stream! {
            loop {
                if cancel.is_cancelled() {
                    break;
                }

                let started = Instant::now();
                let received_at = SystemTime::now();
                let timestamp = clock.now_unix() - TIMESTAMP_SKEW_SECS;

                let attempt = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        tracing::info!(timestamp, "tick abandoned, monitoring cancelled");
                        break;
                    }
                    res = poll_once(fetcher.as_ref(), timestamp) => res,
                };

                match attempt {
                    Ok(snapshot) => {
                        yield Ok(Envelope {
                            payload: snapshot,
                            received_at,
                        });
                    }
                    Err(kind) => {
                        let failure = TickFailure::new(timestamp, started.elapsed(), kind);
                        yield Err(PipelineError::Tick(failure));
                    }
                }

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(frequency) => {}
                }
            }
        };

        Box::pin(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use pdu_client::device::FetchError;
    use std::{collections::VecDeque, sync::Mutex};

    struct FixedClock(i64);

    impl Clock for FixedClock {
        fn now_unix(&self) -> i64 {
            self.0
        }
    }

    /// Replays canned responses and cancels once they run out.
    struct Scripted {
        replies: Mutex<VecDeque<Result<String, FetchError>>>,
        cancel: CancellationToken,
    }

    #[async_trait::async_trait]
    impl StatusFetcher for Scripted {
        async fn fetch(&self) -> Result<String, FetchError> {
            let mut replies = self.replies.lock().unwrap();
            let reply = replies.pop_front().unwrap_or(Err(FetchError::Timeout));
            if replies.is_empty() {
                self.cancel.cancel();
            }
            reply
        }
    }

    /// Never answers.
    struct Hung;

    #[async_trait::async_trait]
    impl StatusFetcher for Hung {
        async fn fetch(&self) -> Result<String, FetchError> {
            std::future::pending().await
        }
    }

    const ONE_OUTLET: &str = r#"{"sensor_values":[{},{"values":[[{"v":230.1},{"v":0.42},{"v":50},{"v":0},{"v":96.5},{"v":0},{"v":97},{"v":0.99}]]}]}"#;

    fn scripted(
        replies: Vec<Result<String, FetchError>>,
        cancel: &CancellationToken,
    ) -> Scripted {
        Scripted {
            replies: Mutex::new(replies.into()),
            cancel: cancel.clone(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn timestamp_is_clock_minus_skew() {
        let cancel = CancellationToken::new();
        let source = PduPollSource::new(
            scripted(vec![Ok(ONE_OUTLET.to_string())], &cancel),
            Duration::from_secs(5),
            cancel.clone(),
        )
        .with_clock(Arc::new(FixedClock(1001)));

        let items: Vec<_> = source.stream().await.collect().await;
        assert_eq!(items.len(), 1);
        let env = items.into_iter().next().unwrap().unwrap();
        assert_eq!(env.payload.timestamp, 1000);
        assert_eq!(env.payload.readings[0].voltage.to_string(), "230.1");
    }

    #[tokio::test(start_paused = true)]
    async fn failures_are_yielded_and_polling_continues() {
        let cancel = CancellationToken::new();
        let source = PduPollSource::new(
            scripted(
                vec![
                    Err(FetchError::Status {
                        code: 500,
                        reason: "Internal Server Error".into(),
                    }),
                    Ok("not json".to_string()),
                    Ok(ONE_OUTLET.to_string()),
                ],
                &cancel,
            ),
            Duration::from_secs(5),
            cancel.clone(),
        )
        .with_clock(Arc::new(FixedClock(42)));

        let started = tokio::time::Instant::now();
        let items: Vec<_> = source.stream().await.collect().await;

        assert_eq!(items.len(), 3);
        assert!(matches!(
            &items[0],
            Err(PipelineError::Tick(TickFailure {
                timestamp: 41,
                kind: TickFailureKind::Fetch(FetchError::Status { code: 500, .. }),
                ..
            }))
        ));
        assert!(matches!(
            &items[1],
            Err(PipelineError::Tick(TickFailure {
                kind: TickFailureKind::Parse(_),
                ..
            }))
        ));
        assert!(items[2].is_ok());
        // Two sleeps between three ticks; cancellation cuts the third.
        assert_eq!(started.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_abandons_in_flight_fetch() {
        let cancel = CancellationToken::new();
        let source = PduPollSource::new(Hung, Duration::from_secs(5), cancel.clone());
        let mut stream = source.stream().await;

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            canceller.cancel();
        });

        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn already_cancelled_source_yields_nothing() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let source = PduPollSource::new(Hung, Duration::from_secs(5), cancel);
        let items: Vec<_> = source.stream().await.collect().await;
        assert!(items.is_empty());
    }
}
