use crate::{Error, Item, Result};
use core::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// A producer's handle onto the shared output channel.
///
/// Each producer task owns exactly one `Emitter`, so items written through it
/// keep the producer's emission order. Every suspension point (waiting for
/// channel capacity, sleeping between items) is raced against the run's
/// [`CancellationToken`], which lets a producer stop promptly once the
/// consumer is gone.
pub struct Emitter {
    tx: mpsc::Sender<Item>,
    cancel: CancellationToken,
    emitted: usize,
}

impl Emitter {
    pub const fn new(tx: mpsc::Sender<Item>, cancel: CancellationToken) -> Self {
        Self {
            tx,
            cancel,
            emitted: 0,
        }
    }

    /// Hands `item` to the consumer, waiting for channel capacity if needed.
    ///
    /// Items are never dropped: a full channel suspends the caller instead.
    ///
    /// # Errors
    ///
    /// - [`Error::RequestCancelled`] if the run is cancelled first.
    /// - [`Error::ChannelError`] if the consumer side has been dropped.
    pub async fn emit(&mut self, item: Item) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::RequestCancelled);
        }

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(Error::RequestCancelled),
            sent = self.tx.send(item) => match sent {
                Ok(()) => {
                    self.emitted += 1;
                    Ok(())
                }
                Err(_) => Err(Error::ChannelError {
                    context: "consumer dropped before item was delivered".to_string(),
                }),
            },
        }
    }

    /// Waits `delay` before the next emission.
    ///
    /// A zero delay returns immediately without touching the timer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RequestCancelled`] if the run is cancelled while
    /// waiting.
    pub async fn pause(&self, delay: Duration) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::RequestCancelled);
        }
        if delay.is_zero() {
            return Ok(());
        }

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(Error::RequestCancelled),
            () = tokio::time::sleep(delay) => Ok(()),
        }
    }

    /// Number of items successfully handed to the channel so far.
    pub const fn emitted(&self) -> usize {
        self.emitted
    }

    pub const fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }
}
