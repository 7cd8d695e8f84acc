//! Fan-out/fan-in aggregation.
//!
//! An [`Aggregator`] runs one producer task per source, funnels every emitted
//! item into a single bounded channel and hands the receiving end to the
//! caller as an [`ItemStream`].
//!
//! ## Guarantees
//!
//! - No item loss: a producer facing a full channel waits for the consumer.
//! - Items from the same source arrive in emission order; items from
//!   different sources interleave in arrival order.
//! - The channel is closed by the completion tracker, and only once every
//!   producer task has been joined. Producers never close it.
//! - A producer failure contributes whatever it emitted so far and never
//!   affects its siblings.
//! - Dropping the stream cancels every producer of that run.

mod stream;
mod tracker;

pub use stream::ItemStream;
pub use tracker::RunPhase;

use crate::producer::Producer;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Default capacity of the shared channel between producers and consumer.
pub const DEFAULT_BUFFER_SIZE: usize = 64;

/// Runs a producer over a set of sources concurrently and merges the results.
///
/// Runs are independent: every call to [`aggregate`](Self::aggregate) gets its
/// own channel, tasks, tracker and cancellation token.
pub struct Aggregator<P> {
    producer: Arc<P>,
    buffer_size: usize,
}

impl<P> Clone for Aggregator<P> {
    fn clone(&self) -> Self {
        Self {
            producer: Arc::clone(&self.producer),
            buffer_size: self.buffer_size,
        }
    }
}

impl<P: Producer> Aggregator<P> {
    pub fn new(producer: P) -> Self {
        Self::from_shared(Arc::new(producer))
    }

    pub const fn from_shared(producer: Arc<P>) -> Self {
        Self {
            producer,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Sets the capacity of the shared channel. Values below 1 are raised
    /// to 1.
    #[must_use]
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    /// Starts a run over `sources` and returns its stream.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn aggregate<I, S>(&self, sources: I) -> ItemStream
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aggregate_with(sources, &CancellationToken::new())
    }

    /// Like [`aggregate`](Self::aggregate), but the run is also cancelled when
    /// `parent` is.
    pub fn aggregate_with<I, S>(&self, sources: I, parent: &CancellationToken) -> ItemStream
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let sources: Vec<String> = sources.into_iter().map(Into::into).collect();
        let cancel = parent.child_token();
        let (tx, rx) = mpsc::channel(self.buffer_size);
        let (phase_tx, phase_rx) = watch::channel(RunPhase::Idle);

        tracing::info!(
            sources = ?sources,
            buffer_size = self.buffer_size,
            "Starting aggregation"
        );

        tracker::spawn_run(&self.producer, sources, tx, &cancel, phase_tx);

        ItemStream::new(rx, phase_rx, cancel)
    }
}
