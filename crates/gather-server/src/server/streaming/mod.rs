//! Streaming side of the aggregating endpoint.
//!
//! - [`sink`] - turns an [`ItemStream`](gather::ItemStream) into an HTTP body,
//!   one JSON document per line, written as items arrive.
//! - [`guard`] - tracks a stream's lifetime for draining and telemetry.

pub mod guard;
pub mod sink;
