use super::{Emitter, Producer};
use crate::{Error, Item, Result};
use core::time::Duration;
use reqwest::Url;

/// Delegates item generation to a peer exposing `GET /task/{source}`.
///
/// The peer answers with the complete item array in one response. This
/// producer performs a single fetch per invocation (no retries), decodes the
/// array and then re-emits each item individually, so downstream consumers
/// see the same contract as with a [`LocalProducer`](super::LocalProducer).
#[derive(Clone, Debug)]
pub struct RemoteProducer {
    client: reqwest::Client,
    base_url: Url,
}

impl RemoteProducer {
    /// Creates a producer targeting `base_url` (e.g. `http://127.0.0.1:8080`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `base_url` is not an absolute URL
    /// that can carry a path, or the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| Error::InvalidConfig {
            reason: format!("invalid peer URL {base_url:?}: {e}"),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(Error::InvalidConfig {
                reason: format!("peer URL {base_url} cannot carry a path"),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::InvalidConfig {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self { client, base_url })
    }

    /// URL of the single-source endpoint for `source`.
    ///
    /// `source` becomes exactly one percent-encoded path segment, so names
    /// that differ only by characters like `%` or `/` never alias on the peer.
    pub fn task_url(&self, source: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidConfig {
                reason: format!("peer URL {} cannot carry a path", self.base_url),
            })?
            .pop_if_empty()
            .push("task")
            .push(source);
        Ok(url)
    }

    /// Fetches and decodes the full item array of `source`.
    ///
    /// # Errors
    ///
    /// - [`Error::Fetch`] on transport failure or a non-success status.
    /// - [`Error::Decode`] if the body is not a JSON array of items.
    pub async fn fetch(&self, source: &str) -> Result<Vec<Item>> {
        let url = self.task_url(source)?;

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::Fetch {
                context: format!("GET {url}: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Fetch {
                context: format!("GET {url} returned {status}"),
            });
        }

        let body = response.bytes().await.map_err(|e| Error::Fetch {
            context: format!("reading body of {url}: {e}"),
        })?;

        serde_json::from_slice(&body).map_err(|e| Error::Decode {
            context: format!("body of {url}: {e}"),
        })
    }
}

impl Producer for RemoteProducer {
    async fn produce(&self, source: &str, emitter: &mut Emitter) -> Result<usize> {
        let cancel = emitter.cancellation_token().clone();

        let items = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Error::RequestCancelled),
            fetched = self.fetch(source) => fetched?,
        };

        let count = items.len();
        tracing::debug!(source, count, "Fetched items from peer");

        for item in items {
            emitter.emit(item).await?;
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::producer::collect;
    use axum::{Json, Router, extract::Path, http::StatusCode, routing::get};
    use tokio::net::TcpListener;
    use tokio_util::sync::CancellationToken;

    async fn spawn_peer(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn producer(base_url: &str) -> RemoteProducer {
        RemoteProducer::new(base_url, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn task_url_appends_one_segment() {
        for base in ["http://peer:8080", "http://peer:8080/"] {
            assert_eq!(
                producer(base).task_url("sourceA").unwrap().as_str(),
                "http://peer:8080/task/sourceA"
            );
        }
        assert_eq!(
            producer("http://peer:8080/api/").task_url("s").unwrap().as_str(),
            "http://peer:8080/api/task/s"
        );
    }

    #[test]
    fn task_url_encodes_reserved_characters() {
        let producer = producer("http://peer:8080");
        assert_eq!(
            producer.task_url("a%41").unwrap().as_str(),
            "http://peer:8080/task/a%2541"
        );
        assert_ne!(producer.task_url("a%41").unwrap(), producer.task_url("aA").unwrap());
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        for base in ["not a url", "mailto:peer@example.com"] {
            assert!(matches!(
                RemoteProducer::new(base, Duration::from_secs(1)),
                Err(Error::InvalidConfig { .. })
            ));
        }
    }

    #[tokio::test]
    async fn sources_differing_by_encoded_character_stay_distinct() {
        let app = Router::new().route(
            "/task/{source}",
            get(|Path(source): Path<String>| async move {
                Json(vec![Item::for_source(&source, 1)])
            }),
        );
        let base_url = spawn_peer(app).await;
        let producer = producer(&base_url);

        let plain = collect(&producer, "aA", CancellationToken::new())
            .await
            .unwrap();
        let encoded = collect(&producer, "a%41", CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(plain[0].id(), "aA_1");
        assert_eq!(encoded[0].id(), "a%41_1");
    }

    #[tokio::test]
    async fn reemits_peer_items_in_order() {
        let app = Router::new().route(
            "/task/{source}",
            get(|Path(source): Path<String>| async move {
                Json(vec![
                    Item::for_source(&source, 1),
                    Item::for_source(&source, 2),
                    Item::for_source(&source, 3),
                ])
            }),
        );
        let base_url = spawn_peer(app).await;

        let items = collect(&producer(&base_url), "sourceB", CancellationToken::new())
            .await
            .unwrap();

        let ids: Vec<&str> = items.iter().map(Item::id).collect();
        assert_eq!(ids, ["sourceB_1", "sourceB_2", "sourceB_3"]);
    }

    #[tokio::test]
    async fn malformed_payload_is_a_decode_error() {
        let app = Router::new().route("/task/{source}", get(|| async { "not json" }));
        let base_url = spawn_peer(app).await;

        let err = collect(&producer(&base_url), "s", CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Decode { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn error_status_is_a_fetch_error() {
        let app = Router::new().route(
            "/task/{source}",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let base_url = spawn_peer(app).await;

        let err = producer(&base_url).fetch("s").await.unwrap_err();
        assert!(matches!(err, Error::Fetch { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn unreachable_peer_is_a_fetch_error() {
        // Bind then drop to get a port nothing listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = producer(&format!("http://{addr}"))
            .fetch("s")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Fetch { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn cancelled_before_fetch_completes() {
        let app = Router::new().route(
            "/task/{source}",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Json(Vec::<Item>::new())
            }),
        );
        let base_url = spawn_peer(app).await;
        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let err = collect(&producer(&base_url), "s", cancel)
            .await
            .unwrap_err();
        assert_eq!(err, Error::RequestCancelled);
    }
}
