//! Route handlers for the aggregation service.
//!
//! [`AggService`] owns everything a request needs: the configured sources,
//! the aggregator for `/agg`, a local producer for `/task/{source}` and the
//! server-wide shutdown token every run is linked to.

use super::error::ApiError;
use crate::server::{
    config::{ProducerKind, ServerConfig},
    streaming::{
        guard::InflightGuard,
        sink::{encode_line, ndjson_body},
    },
    telemetry::increment_requests,
};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use core::time::Duration;
use gather::{Aggregator, Error, Item, LocalProducer, RemoteProducer, SourceProducer};
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Instant,
};
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

/// Shared state behind every route.
#[derive(Clone)]
pub struct AggService {
    config: Arc<ServerConfig>,
    aggregator: Aggregator<SourceProducer>,
    local: Arc<LocalProducer>,
    shutdown_token: CancellationToken,
    accepting: Arc<AtomicBool>,
    inflight: Arc<AtomicUsize>,
}

impl AggService {
    /// Builds the service and the producer selected by `config.producer`.
    ///
    /// # Errors
    ///
    /// Fails if the remote producer's HTTP client cannot be created.
    pub fn new(config: ServerConfig) -> anyhow::Result<Self> {
        let local = LocalProducer::new(config.producer_settings.clone());

        let producer = match config.producer {
            ProducerKind::Local => SourceProducer::Local(local.clone()),
            ProducerKind::Remote => SourceProducer::Remote(RemoteProducer::new(
                &config.peer_url,
                config.fetch_timeout,
            )?),
        };
        let aggregator = Aggregator::new(producer).with_buffer_size(config.stream_buffer_size);

        Ok(Self {
            config: Arc::new(config),
            aggregator,
            local: Arc::new(local),
            shutdown_token: CancellationToken::new(),
            accepting: Arc::new(AtomicBool::new(true)),
            inflight: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/agg", get(aggregate))
            .route("/tasks", get(aggregate))
            .route("/task/{source}", get(task))
            .layer(TraceLayer::new_for_http())
            .with_state(self.clone())
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Number of aggregation streams currently being written.
    pub fn inflight(&self) -> usize {
        self.inflight.load(Ordering::Acquire)
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::Acquire)
    }

    /// Gracefully shuts the service down.
    ///
    /// - Refuses new aggregations (they get `503`).
    /// - Waits up to the configured timeout for in-flight streams to finish.
    /// - Cancels the shutdown token so any remaining producers stop.
    ///
    /// The single-source route keeps serving while streams drain, since a
    /// self-delegating `/agg` depends on it.
    pub async fn shutdown(&self) {
        tracing::info!("Refusing new aggregations");
        self.accepting.store(false, Ordering::Release);

        tracing::info!("Draining in-flight streams ({} active)", self.inflight());
        let drained = timeout(self.config.shutdown_timeout, async {
            while self.inflight() > 0 {
                sleep(Duration::from_millis(100)).await;
            }
        })
        .await;

        match drained {
            Ok(()) => tracing::debug!("All in-flight streams drained"),
            Err(_) => tracing::warn!(
                "Graceful drain timed out ({} streams still active)",
                self.inflight()
            ),
        }

        tracing::debug!("Cancelling remaining producers via shutdown token");
        self.shutdown_token.cancel();
    }
}

/// `GET /agg`, `GET /tasks`: streams every configured source's items as
/// newline-delimited JSON, in arrival order.
///
/// The `202 Accepted` status and headers are sent before the first item.
async fn aggregate(State(service): State<AggService>) -> Result<Response, ApiError> {
    if !service.is_accepting() {
        return Err(Error::ServiceShutdown.into());
    }
    increment_requests();

    let stream = service
        .aggregator
        .aggregate_with(service.config.sources.iter().cloned(), &service.shutdown_token);
    let guard = InflightGuard::new(Arc::clone(&service.inflight));

    Ok((
        StatusCode::ACCEPTED,
        [(header::CONTENT_TYPE, "application/json")],
        ndjson_body(stream, guard, encode_line),
    )
        .into_response())
}

/// `GET /task/{source}`: generates all items of `source` locally and returns
/// them as one JSON array.
async fn task(
    State(service): State<AggService>,
    Path(source): Path<String>,
) -> Result<Json<Vec<Item>>, ApiError> {
    increment_requests();
    let start = Instant::now();

    let items = gather::collect(
        service.local.as_ref(),
        &source,
        service.shutdown_token.child_token(),
    )
    .await?;

    tracing::info!(
        source,
        count = items.len(),
        elapsed = ?start.elapsed(),
        "Finished producing items"
    );
    Ok(Json(items))
}
