//! Item producers.
//!
//! A producer turns a source identifier into a finite sequence of [`Item`]s,
//! handing each one to an [`Emitter`] as soon as it exists. Two
//! implementations share the [`Producer`] contract:
//!
//! - [`LocalProducer`] - generates items in-process with a per-item delay.
//! - [`RemoteProducer`] - fetches a complete item array from a peer exposing
//!   the single-source endpoint and re-emits it item by item.
//!
//! [`collect`] drives any producer to completion and returns the full
//! sequence, which is how the non-streaming path reuses the same generation
//! logic as the aggregating one.

mod emitter;
mod local;
mod remote;

pub use emitter::Emitter;
pub use local::LocalProducer;
pub use remote::RemoteProducer;

use crate::{Error, Item, Result};
use core::{ops::Range, time::Duration};
use rand::Rng;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Channel capacity used by [`collect`].
pub const COLLECT_BUFFER_SIZE: usize = 64;

/// Something that can emit the items of one source.
///
/// Implementations must be cheap to share: the aggregator wraps a single
/// producer in an `Arc` and calls it once per source from concurrent tasks.
pub trait Producer: Send + Sync + 'static {
    /// Emits every item of `source` through `emitter` and returns how many
    /// were emitted.
    ///
    /// # Errors
    ///
    /// Returns an error if the run is cancelled or the items cannot be
    /// obtained. The aggregator treats any error as "this source contributes
    /// what it already emitted" and keeps going.
    fn produce(
        &self,
        source: &str,
        emitter: &mut Emitter,
    ) -> impl Future<Output = Result<usize>> + Send;
}

/// Describes one producer invocation: which source, how many items and how
/// long to wait before each one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProducerPlan {
    pub source: String,
    pub count: usize,
    pub delay: Duration,
}

impl ProducerPlan {
    pub fn new(source: impl Into<String>, count: usize, delay: Duration) -> Self {
        Self {
            source: source.into(),
            count,
            delay,
        }
    }
}

/// Ranges from which each invocation's item count and per-item delay are
/// drawn.
///
/// Both ranges are half-open. An empty range (`start == end`) pins the value
/// to `start`, which is how tests get deterministic plans.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProducerSettings {
    count_range: Range<usize>,
    delay_range: Range<Duration>,
}

impl Default for ProducerSettings {
    fn default() -> Self {
        Self {
            count_range: 50..100,
            delay_range: Duration::from_millis(10)..Duration::from_millis(20),
        }
    }
}

impl ProducerSettings {
    /// Builds validated settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if either range is inverted.
    pub fn new(count_range: Range<usize>, delay_range: Range<Duration>) -> Result<Self> {
        if count_range.start > count_range.end {
            return Err(Error::InvalidConfig {
                reason: format!(
                    "item count range {}..{} is inverted",
                    count_range.start, count_range.end
                ),
            });
        }
        if delay_range.start > delay_range.end {
            return Err(Error::InvalidConfig {
                reason: format!(
                    "delay range {:?}..{:?} is inverted",
                    delay_range.start, delay_range.end
                ),
            });
        }
        Ok(Self {
            count_range,
            delay_range,
        })
    }

    /// Settings that always produce `count` items spaced by `delay`.
    pub const fn fixed(count: usize, delay: Duration) -> Self {
        Self {
            count_range: count..count,
            delay_range: delay..delay,
        }
    }

    /// Draws a plan for `source` from the thread-local RNG.
    pub fn plan(&self, source: &str) -> ProducerPlan {
        self.plan_with(source, &mut rand::rng())
    }

    /// Draws a plan for `source` from `rng`.
    pub fn plan_with<R: Rng + ?Sized>(&self, source: &str, rng: &mut R) -> ProducerPlan {
        let count = if self.count_range.is_empty() {
            self.count_range.start
        } else {
            rng.random_range(self.count_range.clone())
        };
        let delay = if self.delay_range.is_empty() {
            self.delay_range.start
        } else {
            rng.random_range(self.delay_range.clone())
        };
        ProducerPlan::new(source, count, delay)
    }
}

/// Emits the items described by `plan`, in order.
///
/// Item `i` (1-based) is emitted `delay` after item `i - 1` with identifier
/// `"<source>_<i>"`. A zero count returns immediately.
///
/// # Errors
///
/// Stops at the first failed pause or emission (cancellation or a dropped
/// consumer) and returns that error.
pub async fn generate(plan: &ProducerPlan, emitter: &mut Emitter) -> Result<usize> {
    for index in 1..=plan.count {
        emitter.pause(plan.delay).await?;
        let item = Item::for_source(&plan.source, index);
        tracing::trace!(
            source = %plan.source,
            id = item.id(),
            delay = ?plan.delay,
            "Produced item"
        );
        emitter.emit(item).await?;
    }
    Ok(plan.count)
}

/// Runs `producer` for `source` to completion and returns every item it
/// emitted, in emission order.
///
/// # Errors
///
/// Propagates the producer's error. Items emitted before the failure are
/// discarded.
pub async fn collect<P>(producer: &P, source: &str, cancel: CancellationToken) -> Result<Vec<Item>>
where
    P: Producer,
{
    let (tx, mut rx) = mpsc::channel(COLLECT_BUFFER_SIZE);
    let mut emitter = Emitter::new(tx, cancel);

    let produce = async move {
        // The emitter is dropped when this block ends, which closes `rx`.
        producer.produce(source, &mut emitter).await
    };
    let drain = async move {
        let mut items = Vec::new();
        while let Some(item) = rx.recv().await {
            items.push(item);
        }
        items
    };

    let (produced, items) = tokio::join!(produce, drain);
    produced?;
    Ok(items)
}

/// Producer chosen at runtime.
pub enum SourceProducer {
    Local(LocalProducer),
    Remote(RemoteProducer),
}

impl Producer for SourceProducer {
    async fn produce(&self, source: &str, emitter: &mut Emitter) -> Result<usize> {
        match self {
            Self::Local(local) => local.produce(source, emitter).await,
            Self::Remote(remote) => remote.produce(source, emitter).await,
        }
    }
}

impl From<LocalProducer> for SourceProducer {
    fn from(producer: LocalProducer) -> Self {
        Self::Local(producer)
    }
}

impl From<RemoteProducer> for SourceProducer {
    fn from(producer: RemoteProducer) -> Self {
        Self::Remote(producer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn default_settings_match_service_defaults() {
        assert_eq!(
            ProducerSettings::default(),
            ProducerSettings::new(50..100, Duration::from_millis(10)..Duration::from_millis(20))
                .unwrap()
        );
    }

    #[test]
    fn inverted_ranges_are_rejected() {
        assert!(matches!(
            ProducerSettings::new(10..5, Duration::ZERO..Duration::ZERO),
            Err(Error::InvalidConfig { .. })
        ));
        assert!(matches!(
            ProducerSettings::new(0..1, Duration::from_millis(5)..Duration::from_millis(1)),
            Err(Error::InvalidConfig { .. })
        ));
    }

    #[test]
    fn plans_stay_within_ranges() {
        let settings = ProducerSettings::default();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..1_000 {
            let plan = settings.plan_with("sourceA", &mut rng);
            assert_eq!(plan.source, "sourceA");
            assert!((50..100).contains(&plan.count));
            assert!(plan.delay >= Duration::from_millis(10));
            assert!(plan.delay < Duration::from_millis(20));
        }
    }

    #[test]
    fn fixed_settings_pin_the_plan() {
        let settings = ProducerSettings::fixed(3, Duration::from_millis(7));
        let plan = settings.plan("s");
        assert_eq!(plan, ProducerPlan::new("s", 3, Duration::from_millis(7)));
    }

    #[tokio::test]
    async fn generate_emits_count_items_in_order() {
        for count in [0, 1, 2, 17] {
            let (tx, mut rx) = mpsc::channel(32);
            let mut emitter = Emitter::new(tx, CancellationToken::new());
            let plan = ProducerPlan::new("src", count, Duration::ZERO);

            assert_eq!(generate(&plan, &mut emitter).await, Ok(count));
            drop(emitter);

            let mut ids = Vec::new();
            while let Some(item) = rx.recv().await {
                ids.push(item.id().to_string());
            }
            let expected: Vec<String> = (1..=count).map(|i| format!("src_{i}")).collect();
            assert_eq!(ids, expected);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn generate_waits_before_each_item() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut emitter = Emitter::new(tx, CancellationToken::new());
        let plan = ProducerPlan::new("src", 3, Duration::from_millis(10));
        let start = tokio::time::Instant::now();

        generate(&plan, &mut emitter).await.unwrap();

        assert!(start.elapsed() >= Duration::from_millis(30));
        assert_eq!(rx.recv().await.unwrap().id(), "src_1");
    }

    #[tokio::test]
    async fn generate_stops_when_cancelled() {
        let (tx, _rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut emitter = Emitter::new(tx, cancel);
        let plan = ProducerPlan::new("src", 5, Duration::ZERO);

        assert_eq!(
            generate(&plan, &mut emitter).await,
            Err(Error::RequestCancelled)
        );
        assert_eq!(emitter.emitted(), 0);
    }

    #[tokio::test]
    async fn collect_returns_full_sequence_beyond_buffer_size() {
        let count = COLLECT_BUFFER_SIZE * 3;
        let producer = LocalProducer::new(ProducerSettings::fixed(count, Duration::ZERO));

        let items = collect(&producer, "big", CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(items.len(), count);
        assert_eq!(items.first().unwrap().id(), "big_1");
        assert_eq!(items.last().unwrap().id(), format!("big_{count}"));
    }

    #[tokio::test]
    async fn collect_through_source_producer() {
        let producer = SourceProducer::from(LocalProducer::new(ProducerSettings::fixed(
            2,
            Duration::ZERO,
        )));
        let items = collect(&producer, "s", CancellationToken::new())
            .await
            .unwrap();
        let ids: Vec<&str> = items.iter().map(Item::id).collect();
        assert_eq!(ids, ["s_1", "s_2"]);
    }
}
