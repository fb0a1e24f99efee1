use std::{pin::Pin, sync::Arc, time::SystemTime};

use futures::{Stream, StreamExt};

use crate::failure::TickFailure;

#[derive(Debug, Clone)]
pub struct Envelope<T> {
    pub payload: T,
    /// Wall-clock start of the tick that produced `payload`.
    pub received_at: SystemTime,
}

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Tick(#[from] TickFailure),
    #[error("sink error: {0}")]
    Sink(String),
}

#[async_trait::async_trait]
pub trait Source<T>: Send + Sync {
    async fn stream(&self) -> EnvelopeStream<T>;
}

#[async_trait::async_trait]
pub trait Transform<I, O>: Send + Sync {
    async fn apply(&self, input: Envelope<I>) -> Result<Envelope<O>, PipelineError>;
}

#[async_trait::async_trait]
pub trait Sink<T>: Send + Sync {
    async fn run<S>(&self, input: S) -> Result<(), PipelineError>
    where
        S: Stream<Item = Result<Envelope<T>, PipelineError>> + Send + Unpin + 'static;
}

pub type EnvelopeStream<T> = Pin<Box<dyn Stream<Item = Result<Envelope<T>, PipelineError>> + Send>>;

/// Source -> transforms (in order) -> sink, pulled one item at a time.
///
/// Items are pulled by the sink, so the source does not produce the next
/// item until the previous one has been handled.
pub struct Pipeline<S, T, K> {
    pub source: S,
    pub transforms: Vec<Arc<dyn Transform<T, T> + Send + Sync>>, // same-type transforms chain
    pub sink: K,
}

impl<T, S, K> Pipeline<S, T, K>
where
    T: Send + 'static,
    S: Source<T> + Send + Sync + 'static,
    K: Sink<T> + Send + Sync + 'static,
{
    pub async fn run(self) -> Result<(), PipelineError> {
        let Self {
            source,
            transforms,
            sink,
        } = self;

        let stream = transforms
            .into_iter()
            .fold(source.stream().await, |stream, t| {
                let chained: EnvelopeStream<T> = Box::pin(stream.then(move |item| {
                    let t = Arc::clone(&t);
                    async move {
                        match item {
                            Ok(env) => t.apply(env).await,
                            // Upstream errors skip the transform untouched.
                            Err(e) => Err(e),
                        }
                    }
                }));
                chained
            });

        sink.run(stream).await
    }
}
