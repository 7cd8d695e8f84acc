//! Concurrent fan-out/fan-in aggregation.
//!
//! `gather` dispatches one [`Producer`] task per source, merges everything
//! they emit into a single channel and exposes it as an incremental
//! [`ItemStream`]. Items become available to the consumer as soon as any
//! producer emits them; nothing is buffered beyond the shared channel.
//!
//! ```no_run
//! use core::time::Duration;
//! use futures::StreamExt;
//! use gather::{Aggregator, LocalProducer, ProducerSettings};
//!
//! # async fn run() {
//! let producer = LocalProducer::new(ProducerSettings::fixed(3, Duration::from_millis(10)));
//! let aggregator = Aggregator::new(producer);
//!
//! let mut stream = aggregator.aggregate(["sourceA", "sourceB"]);
//! while let Some(item) = stream.next().await {
//!     println!("{}", item.id());
//! }
//! # }
//! ```

mod aggregator;
mod error;
mod item;
mod producer;

pub use aggregator::{Aggregator, DEFAULT_BUFFER_SIZE, ItemStream, RunPhase};
pub use error::{Error, Result};
pub use item::{Item, PLACEHOLDER_DESCRIPTION};
pub use producer::{
    COLLECT_BUFFER_SIZE, Emitter, LocalProducer, Producer, ProducerPlan, ProducerSettings,
    RemoteProducer, SourceProducer, collect, generate,
};
