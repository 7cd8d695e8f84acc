use super::RunPhase;
use crate::Item;
use futures::Stream;
use pin_project_lite::pin_project;
use std::{
    pin::Pin,
    task::{Context, Poll},
};
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};

pin_project! {
    /// The consumer side of an aggregation run.
    ///
    /// Yields items in arrival order and ends once the completion tracker has
    /// closed the shared channel. Dropping the stream before it ends cancels
    /// the run, so every producer stops at its next emission or delay point.
    #[must_use = "streams do nothing unless polled"]
    pub struct ItemStream {
        #[pin]
        inner: ReceiverStream<Item>,
        phase: watch::Receiver<RunPhase>,
        _cancel_on_drop: DropGuard,
    }
}

impl ItemStream {
    pub(crate) fn new(
        rx: mpsc::Receiver<Item>,
        phase: watch::Receiver<RunPhase>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            inner: ReceiverStream::new(rx),
            phase,
            _cancel_on_drop: cancel.drop_guard(),
        }
    }

    /// Current phase of the run.
    pub fn phase(&self) -> RunPhase {
        *self.phase.borrow()
    }

    /// A receiver that observes every phase transition of the run.
    pub fn watch_phase(&self) -> watch::Receiver<RunPhase> {
        self.phase.clone()
    }
}

impl Stream for ItemStream {
    type Item = Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Item>> {
        self.project().inner.poll_next(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
