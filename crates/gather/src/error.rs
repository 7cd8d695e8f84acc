//! Error types for the aggregation engine.
//!
//! This module defines the central `Error` enum shared by producers, the
//! aggregator and the HTTP service built on top of them. None of these errors
//! abort a whole aggregation run: producer failures are absorbed by the
//! completion tracker and reported through logs.
//!
//! ## Error Cases
//! - `Fetch`: A remote producer could not reach its peer or got a non-success
//!   status back.
//! - `Decode`: A remote peer answered with a payload that is not a JSON array
//!   of items.
//! - `RequestCancelled`: The run was cancelled (client disconnect or
//!   shutdown).
//! - `ChannelError`: The consumer side of the shared channel went away.
//! - `InvalidConfig`: Producer or aggregator settings are out of bounds.
//! - `Serialization`: An item could not be encoded for the transport.
//! - `ServiceShutdown`: A request arrived while the service was shutting down.

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the aggregation engine.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// The remote peer could not be reached or rejected the request.
    #[error("Fetch error: {context}")]
    Fetch { context: String },

    /// The remote payload could not be decoded into items.
    #[error("Decode error: {context}")]
    Decode { context: String },

    /// The run was cancelled before the producer finished.
    #[error("Request cancelled")]
    RequestCancelled,

    /// Internal channel failure (e.g. the consumer was dropped).
    #[error("Channel error: {context}")]
    ChannelError { context: String },

    /// Settings were rejected during validation.
    #[error("Invalid config: {reason}")]
    InvalidConfig { reason: String },

    /// An item could not be serialized for the transport.
    #[error("Serialization error: {context}")]
    Serialization { context: String },

    /// The service is in the process of shutting down.
    #[error("Service is shutting down")]
    ServiceShutdown,
}

impl Error {
    /// Returns `true` when the error only means the run stopped early because
    /// nobody is listening anymore.
    pub const fn is_cancellation(&self) -> bool {
        matches!(self, Self::RequestCancelled | Self::ChannelError { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            context: err.to_string(),
        }
    }
}
