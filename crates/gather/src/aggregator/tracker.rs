use crate::{
    Item, Result,
    producer::{Emitter, Producer},
};
use std::{sync::Arc, time::Instant};
use tokio::{
    sync::{mpsc, watch},
    task::JoinSet,
};
use tokio_util::sync::CancellationToken;

/// Lifecycle of one aggregation run.
///
/// `Idle → Dispatching → Draining → Closed`. Only the completion tracker
/// advances the phase, and `Closed` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunPhase {
    /// Nothing started yet.
    Idle,
    /// Producer tasks are being spawned.
    Dispatching,
    /// Items are flowing; `remaining` producers have not finished.
    Draining { remaining: usize },
    /// Every producer finished and the shared channel is closed.
    Closed,
}

impl RunPhase {
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }
}

/// Outcome of one producer task, reported to the tracker when joined.
struct ProducerReport {
    source: String,
    result: Result<usize>,
    emitted: usize,
    elapsed: core::time::Duration,
}

impl ProducerReport {
    fn log(&self) {
        match &self.result {
            Ok(count) => {
                tracing::info!(
                    source = %self.source,
                    count,
                    elapsed = ?self.elapsed,
                    "Producer finished"
                );
            }
            Err(e) if e.is_cancellation() => {
                tracing::debug!(
                    source = %self.source,
                    emitted = self.emitted,
                    "Producer stopped early: {e}"
                );
            }
            Err(e) => {
                tracing::warn!(
                    source = %self.source,
                    emitted = self.emitted,
                    "Producer failed, contributing {} items: {e}",
                    self.emitted
                );
            }
        }
    }
}

/// Starts one producer task per source plus the completion tracker.
///
/// Each producer gets its own [`Emitter`] over a clone of `tx`. The `tx`
/// passed in moves into the tracker, which drops it only after every producer
/// has been joined; that drop is what closes the channel.
pub(crate) fn spawn_run<P: Producer>(
    producer: &Arc<P>,
    sources: Vec<String>,
    tx: mpsc::Sender<Item>,
    cancel: &CancellationToken,
    phase: watch::Sender<RunPhase>,
) {
    phase.send_replace(RunPhase::Dispatching);

    let mut producers = JoinSet::new();
    for source in sources {
        let producer = Arc::clone(producer);
        let mut emitter = Emitter::new(tx.clone(), cancel.clone());

        producers.spawn(async move {
            let start = Instant::now();
            let result = producer.produce(&source, &mut emitter).await;
            ProducerReport {
                source,
                result,
                emitted: emitter.emitted(),
                elapsed: start.elapsed(),
            }
        });
    }

    phase.send_replace(RunPhase::Draining {
        remaining: producers.len(),
    });

    tokio::spawn(track_completion(producers, tx, phase));
}

/// Join barrier for a run: waits until every producer has finished exactly
/// once, then closes the channel.
async fn track_completion(
    mut producers: JoinSet<ProducerReport>,
    tx: mpsc::Sender<Item>,
    phase: watch::Sender<RunPhase>,
) {
    let start = Instant::now();
    let mut remaining = producers.len();

    while let Some(joined) = producers.join_next().await {
        remaining -= 1;
        match joined {
            Ok(report) => report.log(),
            Err(e) => tracing::error!("Producer task did not complete: {e}"),
        }
        phase.send_replace(RunPhase::Draining { remaining });
    }

    // Producers hold clones of `tx` only for the lifetime of their task, so
    // this is the last sender. Publish `Closed` first so a consumer that sees
    // end-of-stream also sees the terminal phase.
    phase.send_replace(RunPhase::Closed);
    drop(tx);

    tracing::info!(elapsed = ?start.elapsed(), "All produced, stream closed");
}
