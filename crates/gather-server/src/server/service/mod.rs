//! HTTP service implementation.
//!
//! This module contains the client-facing routes and the shared state behind
//! them. Each aggregating request starts an independent run of the engine and
//! streams its items back as they are produced; the single-source route
//! generates one source to completion and returns it as a JSON array.
//!
//! ## Structure
//!
//! - [`handler`] - route handlers, router and shutdown (`AggService`).
//! - [`error`] - mapping of engine errors to HTTP responses.

pub mod error;
pub mod handler;
