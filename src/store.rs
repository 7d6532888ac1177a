//! Client for the remote entry store.
//!
//! The store is an opaque HTTP service exposing four JSON endpoints:
//!
//! - `GET /api/today` -> `{date, content}`
//! - `GET /api/entries` -> `{entries: [date, ...]}`
//! - `GET /api/entry/{date}` -> `{date, content}` or `{error}` with a non-2xx status
//! - `POST /api/save` with `{date, content}` -> `{}` or `{error}` with a non-2xx status

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::{DeserializeOwned, IgnoredAny};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::diary_entry::{DiaryEntry, EntryIndex, ErrorBody};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid store URL `{url}`")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),
    #[error("request to {endpoint} failed")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} returned {status}: {message}")]
    Status {
        endpoint: String,
        status: StatusCode,
        message: String,
    },
    #[error("unexpected response body from {endpoint}")]
    Decode {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Read/write access to diary entries.
#[async_trait]
pub trait EntryStore: Send + Sync + 'static {
    /// Today's date according to the store, with whatever content it holds.
    async fn today(&self) -> Result<DiaryEntry>;

    /// Dates that have content, in the store's order.
    async fn entries(&self) -> Result<EntryIndex>;

    async fn entry(&self, date: NaiveDate) -> Result<DiaryEntry>;

    /// Overwrites the content stored for `entry.date`.
    async fn save(&self, entry: &DiaryEntry) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct HttpEntryStore {
    client: Client,
    base_url: Url,
}

impl HttpEntryStore {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalized).map_err(|source| StoreError::InvalidUrl {
            url: base_url.to_string(),
            source,
        })?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(StoreError::Client)?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|source| StoreError::InvalidUrl {
                url: format!("{}{}", self.base_url, path),
                source,
            })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.endpoint(path)?;
        debug!(%url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| StoreError::Transport {
                endpoint: path.to_string(),
                source,
            })?;
        read_json(path, response).await
    }
}

async fn read_json<T: DeserializeOwned>(endpoint: &str, response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string(),
        };
        return Err(StoreError::Status {
            endpoint: endpoint.to_string(),
            status,
            message,
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|source| StoreError::Decode {
            endpoint: endpoint.to_string(),
            source,
        })
}

#[async_trait]
impl EntryStore for HttpEntryStore {
    async fn today(&self) -> Result<DiaryEntry> {
        self.get("api/today").await
    }

    async fn entries(&self) -> Result<EntryIndex> {
        self.get("api/entries").await
    }

    async fn entry(&self, date: NaiveDate) -> Result<DiaryEntry> {
        self.get(&format!("api/entry/{}", date.format("%Y-%m-%d")))
            .await
    }

    async fn save(&self, entry: &DiaryEntry) -> Result<()> {
        const PATH: &str = "api/save";
        let url = self.endpoint(PATH)?;
        debug!(%url, date = %entry.date, bytes = entry.content.len(), "POST");
        let response = self
            .client
            .post(url)
            .json(entry)
            .send()
            .await
            .map_err(|source| StoreError::Transport {
                endpoint: PATH.to_string(),
                source,
            })?;
        read_json::<IgnoredAny>(PATH, response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::{Path, State},
        http::StatusCode as AxumStatus,
        routing::{get, post},
        Json, Router,
    };
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    type Saved = Arc<Mutex<Vec<Value>>>;

    async fn today() -> Json<Value> {
        Json(json!({"date": "2024-01-15", "content": "Hello"}))
    }

    async fn entries() -> Json<Value> {
        Json(json!({"entries": ["2024-01-15", "2024-01-10"]}))
    }

    async fn entry(Path(date): Path<String>) -> (AxumStatus, Json<Value>) {
        if date == "2024-01-10" {
            (
                AxumStatus::OK,
                Json(json!({"date": date, "content": "older"})),
            )
        } else {
            (
                AxumStatus::NOT_FOUND,
                Json(json!({"error": "Entry not found"})),
            )
        }
    }

    async fn save(State(saved): State<Saved>, Json(body): Json<Value>) -> (AxumStatus, Json<Value>) {
        if body["content"] == "boom" {
            return (
                AxumStatus::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "db down"})),
            );
        }
        saved.lock().unwrap().push(body);
        (AxumStatus::OK, Json(json!({})))
    }

    async fn spawn_server() -> (String, Saved) {
        let saved: Saved = Arc::default();
        let app = Router::new()
            .route("/api/today", get(today))
            .route("/api/entries", get(entries))
            .route("/api/entry/{date}", get(entry))
            .route("/api/save", post(save))
            .with_state(saved.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), saved)
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[tokio::test]
    async fn reads_today_and_index() {
        let (url, _) = spawn_server().await;
        let store = HttpEntryStore::new(&url, Duration::from_secs(5)).unwrap();

        let entry = store.today().await.unwrap();
        assert_eq!(entry, DiaryEntry::new(date("2024-01-15"), "Hello"));

        let index = store.entries().await.unwrap();
        assert_eq!(index.entries, vec![date("2024-01-15"), date("2024-01-10")]);
    }

    #[tokio::test]
    async fn missing_entry_surfaces_server_message() {
        let (url, _) = spawn_server().await;
        let store = HttpEntryStore::new(&format!("{url}/"), Duration::from_secs(5)).unwrap();

        let found = store.entry(date("2024-01-10")).await.unwrap();
        assert_eq!(found.content, "older");

        match store.entry(date("2024-01-11")).await {
            Err(StoreError::Status {
                status, message, ..
            }) => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(message, "Entry not found");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn save_posts_date_and_content() {
        let (url, saved) = spawn_server().await;
        let store = HttpEntryStore::new(&url, Duration::from_secs(5)).unwrap();

        store
            .save(&DiaryEntry::new(date("2024-01-15"), "Hello world"))
            .await
            .unwrap();
        assert_eq!(
            saved.lock().unwrap().clone(),
            vec![json!({"date": "2024-01-15", "content": "Hello world"})]
        );

        let err = store
            .save(&DiaryEntry::new(date("2024-01-15"), "boom"))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "api/save returned 500 Internal Server Error: db down"
        );
    }

    #[tokio::test]
    async fn unreachable_store_is_a_transport_fault() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let store = HttpEntryStore::new(&format!("http://{addr}"), Duration::from_secs(5)).unwrap();
        assert!(matches!(
            store.today().await,
            Err(StoreError::Transport { .. })
        ));
    }

    #[test]
    fn rejects_malformed_base_url() {
        assert!(matches!(
            HttpEntryStore::new("not a url", Duration::from_secs(1)),
            Err(StoreError::InvalidUrl { .. })
        ));
    }
}
