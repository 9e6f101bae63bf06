//! Client for the hosted realtime database's REST API.
//!
//! One-shot operations map to `GET`/`PUT`/`PATCH`/`POST`/`DELETE` on
//! `{base}/{path}.json`. Listeners open a Server-Sent Events stream on the same
//! URL and keep a local mirror of the location, delivering the mirror each
//! time an event changes it. Conditional writes use the database's ETag
//! support.

mod sse;

use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use icyxr_core::store::SubscriptionSender;
use icyxr_core::{Child, Query, RealtimeStore, StoreError, StorePath, Subscription};
use reqwest::header::{ACCEPT, ETAG, IF_MATCH};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::RealtimeConfig;
use crate::tree::{self, ChildTracker};

use self::sse::{Applied, SseParser};

/// Header asking the database to return an ETag with a read.
const ETAG_REQUEST_HEADER: &str = "X-Firebase-ETag";

/// A [`RealtimeStore`] backed by the hosted database.
///
/// Cheap to clone; clones share one HTTP connection pool.
#[derive(Clone)]
pub struct RestStore {
    inner: Arc<RestStoreInner>,
}

struct RestStoreInner {
    client: Client,
    base: Url,
    auth: Option<SecretString>,
    timeout: Duration,
}

impl std::fmt::Debug for RestStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestStore")
            .field("base", &self.inner.base.as_str())
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct PushResponse {
    name: String,
}

impl RestStore {
    /// Create a client for the configured database.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unavailable` if the HTTP client cannot be built.
    pub fn new(config: &RealtimeConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .connect_timeout(config.timeout)
            .user_agent(concat!("icyxr-realtime/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StoreError::Unavailable(format!("HTTP client: {e}")))?;

        Ok(Self {
            inner: Arc::new(RestStoreInner {
                client,
                base: config.database_url.clone(),
                auth: config.auth_token.clone(),
                timeout: config.timeout,
            }),
        })
    }

    /// URL of the JSON document at `path`, with auth and query parameters.
    fn endpoint(&self, path: &StorePath, query: Option<&Query>) -> Result<Url, StoreError> {
        let mut url = self.inner.base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                StoreError::Unavailable("database URL cannot be a base".to_owned())
            })?;
            segments.pop_if_empty();
            match path.segments().split_last() {
                None => {
                    segments.push(".json");
                }
                Some((last, parents)) => {
                    segments.extend(parents);
                    segments.push(&format!("{last}.json"));
                }
            }
        }

        if let Some(query) = query {
            url.query_pairs_mut()
                .append_pair("orderBy", &Value::from(query.order_by_child.as_str()).to_string())
                .append_pair("equalTo", &query.equal_to.to_string());
        }
        if let Some(auth) = &self.inner.auth {
            url.query_pairs_mut().append_pair("auth", auth.expose_secret());
        }
        Ok(url)
    }

    /// Send a one-shot request and fail on any non-success status.
    async fn execute(&self, request: RequestBuilder, path: &StorePath) -> Result<Response, StoreError> {
        let response = request
            .timeout(self.inner.timeout)
            .send()
            .await
            .map_err(|e| unavailable(path, &e))?;
        check_status(response, path).await
    }

    async fn read_json(response: Response, path: &StorePath) -> Result<Option<Value>, StoreError> {
        let value: Value = response.json().await.map_err(|e| unavailable(path, &e))?;
        Ok(tree::normalize(value))
    }

    /// Open an event stream on `path` and mirror it into a subscription.
    async fn open_stream(
        &self,
        path: &StorePath,
        query: Option<Query>,
    ) -> Result<Subscription<Option<Value>>, StoreError> {
        let url = self.endpoint(path, query.as_ref())?;
        let response = self
            .inner
            .client
            .get(url)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| unavailable(path, &e))?;
        let response = check_status(response, path).await?;

        let (tx, subscription) = Subscription::channel();
        tokio::spawn(mirror_stream(response, path.to_string(), query, tx));
        Ok(subscription)
    }
}

fn unavailable(path: &StorePath, error: &reqwest::Error) -> StoreError {
    StoreError::Unavailable(format!("{path}: {error}"))
}

async fn check_status(response: Response, path: &StorePath) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Unavailable(format!(
        "{path}: {status} {}",
        body.trim()
    )))
}

/// Read an event stream until the consumer stops listening or the stream
/// fails, delivering the mirrored value each time it changes.
///
/// Returning drops `tx`, which ends the subscription.
async fn mirror_stream(
    response: Response,
    label: String,
    query: Option<Query>,
    tx: SubscriptionSender<Option<Value>>,
) {
    let mut bytes = pin!(response.bytes_stream());
    let mut parser = SseParser::default();
    let mut mirror = Value::Null;
    let mut last: Option<Option<Value>> = None;

    loop {
        let chunk = tokio::select! {
            () = tx.closed() => {
                debug!(path = %label, "listener stopped");
                return;
            }
            chunk = bytes.next() => chunk,
        };

        let chunk = match chunk {
            Some(Ok(chunk)) => chunk,
            Some(Err(e)) => {
                warn!(path = %label, error = %e, "event stream failed");
                return;
            }
            None => {
                warn!(path = %label, "event stream closed by server");
                return;
            }
        };

        for event in parser.feed(&chunk) {
            match sse::apply_event(&mut mirror, &event, &label) {
                Ok(Applied::Ignored) => {}
                Ok(Applied::Changed) => {
                    let root = tree::value_at(&mirror, &[]);
                    let current = match &query {
                        Some(query) => query.filter(root),
                        None => root.cloned(),
                    };
                    if last.as_ref() == Some(&current) {
                        continue;
                    }
                    last = Some(current.clone());
                    if !tx.send(current) {
                        return;
                    }
                }
                Err(e) => {
                    warn!(path = %label, error = %e, "listener ended");
                    return;
                }
            }
        }
    }
}

impl RealtimeStore for RestStore {
    async fn get(&self, path: &StorePath) -> Result<Option<Value>, StoreError> {
        let url = self.endpoint(path, None)?;
        let response = self.execute(self.inner.client.get(url), path).await?;
        Self::read_json(response, path).await
    }

    async fn set(&self, path: &StorePath, value: Value) -> Result<(), StoreError> {
        let url = self.endpoint(path, None)?;
        self.execute(self.inner.client.put(url).json(&value), path)
            .await?;
        Ok(())
    }

    async fn update(&self, path: &StorePath, fields: Map<String, Value>) -> Result<(), StoreError> {
        if fields.is_empty() {
            return Ok(());
        }
        let url = self.endpoint(path, None)?;
        self.execute(self.inner.client.patch(url).json(&fields), path)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, path, value), fields(path = %path))]
    async fn push(&self, path: &StorePath, value: Value) -> Result<String, StoreError> {
        let url = self.endpoint(path, None)?;
        let response = self
            .execute(self.inner.client.post(url).json(&value), path)
            .await?;
        let created: PushResponse = response.json().await.map_err(|e| unavailable(path, &e))?;
        debug!(key = %created.name, "appended child");
        Ok(created.name)
    }

    async fn remove(&self, path: &StorePath) -> Result<(), StoreError> {
        let url = self.endpoint(path, None)?;
        self.execute(self.inner.client.delete(url), path).await?;
        Ok(())
    }

    #[instrument(skip(self, path, expected, new), fields(path = %path))]
    async fn compare_and_set(
        &self,
        path: &StorePath,
        expected: Option<Value>,
        new: Value,
    ) -> Result<bool, StoreError> {
        let url = self.endpoint(path, None)?;
        let response = self
            .execute(
                self.inner.client.get(url.clone()).header(ETAG_REQUEST_HEADER, "true"),
                path,
            )
            .await?;
        let etag = response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
            .ok_or_else(|| StoreError::Unavailable(format!("{path}: no ETag in response")))?;
        let current = Self::read_json(response, path).await?;

        if current != expected.and_then(tree::normalize) {
            debug!("current value differs from expected");
            return Ok(false);
        }

        let response = self
            .inner
            .client
            .put(url)
            .header(IF_MATCH, etag)
            .json(&new)
            .timeout(self.inner.timeout)
            .send()
            .await
            .map_err(|e| unavailable(path, &e))?;
        if response.status() == StatusCode::PRECONDITION_FAILED {
            debug!("lost conditional write");
            return Ok(false);
        }
        check_status(response, path).await?;
        Ok(true)
    }

    async fn subscribe_value(
        &self,
        path: &StorePath,
    ) -> Result<Subscription<Option<Value>>, StoreError> {
        self.open_stream(path, None).await
    }

    async fn subscribe_children_added(
        &self,
        path: &StorePath,
    ) -> Result<Subscription<Child>, StoreError> {
        let mut snapshots = self.open_stream(path, None).await?;
        let (tx, subscription) = Subscription::channel();

        tokio::spawn(async move {
            let mut tracker = ChildTracker::default();
            loop {
                let snapshot = tokio::select! {
                    () = tx.closed() => return,
                    snapshot = snapshots.next() => snapshot,
                };
                let Some(snapshot) = snapshot else {
                    return;
                };
                if !tracker
                    .added(snapshot.as_ref())
                    .into_iter()
                    .all(|child| tx.send(child))
                {
                    return;
                }
            }
        });

        Ok(subscription)
    }

    async fn subscribe_query(
        &self,
        path: &StorePath,
        query: Query,
    ) -> Result<Subscription<Option<Value>>, StoreError> {
        self.open_stream(path, Some(query)).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn store(url: &str, token: Option<&str>) -> RestStore {
        let mut config = RealtimeConfig::for_url(url).unwrap();
        config.auth_token = token.map(SecretString::from);
        RestStore::new(&config).unwrap()
    }

    #[test]
    fn test_endpoint_for_document() {
        let store = store("https://icyxr-default-rtdb.firebaseio.com", None);
        let path = StorePath::parse("LiveSupportChats/-N1/status").unwrap();
        assert_eq!(
            store.endpoint(&path, None).unwrap().as_str(),
            "https://icyxr-default-rtdb.firebaseio.com/LiveSupportChats/-N1/status.json"
        );
    }

    #[test]
    fn test_endpoint_for_root_keeps_base_path() {
        let store = store("http://127.0.0.1:9000/ns/", None);
        assert_eq!(
            store.endpoint(&StorePath::root(), None).unwrap().as_str(),
            "http://127.0.0.1:9000/ns/.json"
        );
    }

    #[test]
    fn test_endpoint_with_query_and_auth() {
        let store = store("https://db.test", Some("k3Jd8sL2pQ9xZ7vB4nM1wR6t"));
        let query = Query::child_equals("status", "waiting");
        let url = store
            .endpoint(&StorePath::parse("LiveSupportChats").unwrap(), Some(&query))
            .unwrap();

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            [
                ("orderBy".to_owned(), "\"status\"".to_owned()),
                ("equalTo".to_owned(), "\"waiting\"".to_owned()),
                ("auth".to_owned(), "k3Jd8sL2pQ9xZ7vB4nM1wR6t".to_owned()),
            ]
        );
    }

    #[test]
    fn test_debug_hides_token() {
        let store = store("https://db.test", Some("k3Jd8sL2pQ9xZ7vB4nM1wR6t"));
        assert!(!format!("{store:?}").contains("k3Jd8sL2"));
    }
}
