use crate::server::telemetry::{
    decrement_streams_inflight, increment_streams_inflight, record_items_per_stream,
    record_stream_duration,
};
use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Instant,
};

/// Marks one aggregation stream as in flight for as long as it lives.
///
/// The guard travels inside the response body, so it is dropped when the body
/// finishes, errors out or the client disconnects. Shutdown waits on the
/// shared counter reaching zero.
pub struct InflightGuard {
    inflight: Arc<AtomicUsize>,
    start: Instant,
    items: u64,
}

impl InflightGuard {
    pub fn new(inflight: Arc<AtomicUsize>) -> Self {
        inflight.fetch_add(1, Ordering::AcqRel);
        increment_streams_inflight();
        Self {
            inflight,
            start: Instant::now(),
            items: 0,
        }
    }

    pub const fn record_item(&mut self) {
        self.items += 1;
    }

    pub const fn items(&self) -> u64 {
        self.items
    }
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.inflight.fetch_sub(1, Ordering::AcqRel);
        decrement_streams_inflight();

        let elapsed = self.start.elapsed();
        record_stream_duration(elapsed.as_secs_f64() * 1_000.0);
        record_items_per_stream(self.items as f64);
        tracing::info!(items = self.items, elapsed = ?elapsed, "Finished aggregated stream");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_while_alive() {
        let inflight = Arc::new(AtomicUsize::new(0));

        let mut first = InflightGuard::new(Arc::clone(&inflight));
        let second = InflightGuard::new(Arc::clone(&inflight));
        assert_eq!(inflight.load(Ordering::Acquire), 2);

        first.record_item();
        assert_eq!(first.items(), 1);

        drop(first);
        assert_eq!(inflight.load(Ordering::Acquire), 1);
        drop(second);
        assert_eq!(inflight.load(Ordering::Acquire), 0);
    }
}
