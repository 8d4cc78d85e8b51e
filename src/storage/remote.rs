//! HTTP storage backend.
//!
//! Talks to a user-supplied server:
//!
//! | call | request |
//! |---|---|
//! | save | `POST {base}/conversations` |
//! | list | `GET {base}/conversations` |
//! | get | `GET {base}/conversations/{id}` |
//! | delete | `DELETE {base}/conversations/{id}` |
//!
//! Documents travel as `{ id, title, format, content, sourceApp?, savedAt }`
//! where `content` is the formatter output, so the server stores exactly what
//! a local file would contain. 404 on get/delete means not found; any other
//! non-success status is an error.

use crate::config::RemoteConfig;
use crate::core::{Format, SaveOptions, Thread, ThreadDescriptor};
use crate::error::{Error, Result};
use crate::format::formatter_for;
use crate::storage::traits::{ThreadStore, sort_newest_first};
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::Url;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Longest error body kept in [`Error::Remote`].
const ERROR_BODY_LIMIT: usize = 240;

/// Storage on a remote HTTP endpoint.
#[derive(Debug, Clone)]
pub struct RemoteStore {
    collection_url: Url,
    api_key: Option<String>,
    client: Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentOut<'a> {
    id: &'a str,
    title: &'a str,
    format: Format,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_app: Option<&'a str>,
    saved_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct DocumentIn {
    format: Format,
    content: String,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct SaveAck {
    remote_url: Option<String>,
    saved_at: Option<DateTime<Utc>>,
}

impl RemoteStore {
    /// Create a store for the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is missing or invalid, or the HTTP client
    /// cannot be built.
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        if !config.is_enabled() {
            return Err(Error::Config("remote store url is not set".to_string()));
        }

        let base = config.url.trim().trim_end_matches('/');
        let collection_url = Url::parse(&format!("{base}/conversations"))
            .map_err(|e| Error::Config(format!("invalid remote url '{base}': {e}")))?;
        if collection_url.cannot_be_a_base() {
            return Err(Error::Config(format!("remote url '{base}' cannot be a base")));
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms.max(1)))
            .build()?;

        Ok(Self {
            collection_url,
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            client,
        })
    }

    /// URL of a single thread; the id is percent-encoded as one path segment.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection URL cannot take path segments.
    pub fn thread_url(&self, id: &str) -> Result<Url> {
        let mut url = self.collection_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::Config("remote url cannot be a base".to_string()))?
            .push(id);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }
}

impl ThreadStore for RemoteStore {
    fn save(&self, thread: &Thread, options: &SaveOptions) -> Result<ThreadDescriptor> {
        let saved_at = Utc::now();
        let body = DocumentOut {
            id: &thread.id,
            title: thread.title(),
            format: options.format,
            content: formatter_for(options.format).serialize(thread, options)?,
            source_app: thread.metadata.source_app.as_deref(),
            saved_at,
        };

        let response = self
            .authorize(self.client.post(self.collection_url.clone()))
            .json(&body)
            .send()?;
        let response = ensure_success(response)?;

        // The server may echo where it put the thread; an empty body is fine.
        let ack: SaveAck = response
            .text()
            .ok()
            .and_then(|text| serde_json::from_str(&text).ok())
            .unwrap_or_default();

        let remote_url = match ack.remote_url {
            Some(url) => url,
            None => self.thread_url(&thread.id)?.to_string(),
        };
        debug!(id = %thread.id, %remote_url, "saved thread remotely");

        Ok(ThreadDescriptor::remote(
            thread,
            remote_url,
            options.format,
            ack.saved_at.unwrap_or(saved_at),
        ))
    }

    fn list(&self) -> Result<Vec<ThreadDescriptor>> {
        let response = self
            .authorize(self.client.get(self.collection_url.clone()))
            .send()?;
        let mut descriptors: Vec<ThreadDescriptor> = ensure_success(response)?.json()?;

        for descriptor in &mut descriptors {
            descriptor.file_path = None;
            if descriptor.remote_url.is_none() {
                descriptor.remote_url = Some(self.thread_url(&descriptor.id)?.to_string());
            }
        }
        sort_newest_first(&mut descriptors);
        Ok(descriptors)
    }

    fn get(&self, id: &str) -> Result<Option<Thread>> {
        let response = self
            .authorize(self.client.get(self.thread_url(id)?))
            .send()?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let document: DocumentIn = ensure_success(response)?.json()?;
        formatter_for(document.format)
            .deserialize(&document.content)
            .map(Some)
    }

    fn delete(&self, id: &str) -> Result<bool> {
        let response = self
            .authorize(self.client.delete(self.thread_url(id)?))
            .send()?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }

        ensure_success(response)?;
        debug!(%id, "deleted remote thread");
        Ok(true)
    }
}

/// Turn a non-success response into [`Error::Remote`].
fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().unwrap_or_default();
    Err(Error::Remote {
        status: status.as_u16(),
        body: body.chars().take(ERROR_BODY_LIMIT).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Message, Role};
    use httpmock::prelude::*;
    use serde_json::json;

    fn store_for(server: &MockServer) -> RemoteStore {
        RemoteStore::new(&RemoteConfig {
            url: server.base_url(),
            api_key: Some("test-key".to_string()),
            timeout_ms: 5_000,
        })
        .unwrap()
    }

    fn demo_thread() -> Thread {
        let mut thread = Thread::new("Remote demo", vec![Message::new(Role::User, "hi")]);
        thread.id = "abc-123".to_string();
        thread
    }

    #[test]
    fn requires_url() {
        let err = RemoteStore::new(&RemoteConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn thread_url_percent_encodes_id() {
        let store = RemoteStore::new(&RemoteConfig {
            url: "http://localhost:9/api/".to_string(),
            ..RemoteConfig::default()
        })
        .unwrap();
        let url = store.thread_url("a b/c").unwrap();
        assert_eq!(url.as_str(), "http://localhost:9/api/conversations/a%20b%2Fc");
    }

    #[test]
    fn save_posts_document() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/conversations")
                .header("authorization", "Bearer test-key")
                .json_body_includes(
                    json!({"id": "abc-123", "title": "Remote demo", "format": "json"}).to_string(),
                );
            then.status(201);
        });

        let store = store_for(&server);
        let descriptor = store.save(&demo_thread(), &SaveOptions::default()).unwrap();

        mock.assert();
        assert!(descriptor.file_path.is_none());
        assert_eq!(
            descriptor.remote_url.unwrap(),
            format!("{}/conversations/abc-123", server.base_url())
        );
    }

    #[test]
    fn save_uses_remote_url_from_ack() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/conversations");
            then.status(200)
                .json_body(json!({"remoteUrl": "https://cdn.example.test/t/abc-123"}));
        });

        let descriptor = store_for(&server)
            .save(&demo_thread(), &SaveOptions::default())
            .unwrap();
        assert_eq!(
            descriptor.remote_url.as_deref(),
            Some("https://cdn.example.test/t/abc-123")
        );
    }

    #[test]
    fn get_parses_document_content() {
        let thread = demo_thread();
        let content = formatter_for(Format::Json)
            .serialize(&thread, &SaveOptions::default())
            .unwrap();

        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/conversations/abc-123");
            then.status(200)
                .json_body(json!({"format": "json", "content": content}));
        });

        let loaded = store_for(&server).get("abc-123").unwrap().unwrap();
        assert_eq!(loaded, thread);
    }

    #[test]
    fn get_404_is_not_found() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/conversations/missing");
            then.status(404);
        });

        assert!(store_for(&server).get("missing").unwrap().is_none());
    }

    #[test]
    fn get_500_is_an_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/conversations/broken");
            then.status(500).body("database on fire");
        });

        let err = store_for(&server).get("broken").unwrap_err();
        match err {
            Error::Remote { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "database on fire");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn list_sorts_and_fills_urls() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/conversations");
            then.status(200).json_body(json!([
                {"id": "old", "title": "Old", "format": "json", "savedAt": "2026-01-01T00:00:00Z"},
                {"id": "new", "title": "New", "format": "markdown", "savedAt": "2026-02-01T00:00:00Z",
                 "remoteUrl": "https://elsewhere.test/new"}
            ]));
        });

        let listed = store_for(&server).list().unwrap();
        assert_eq!(listed[0].id, "new");
        assert_eq!(listed[0].remote_url.as_deref(), Some("https://elsewhere.test/new"));
        assert_eq!(listed[1].id, "old");
        assert_eq!(
            listed[1].remote_url.as_deref().unwrap(),
            format!("{}/conversations/old", server.base_url())
        );
    }

    #[test]
    fn delete_maps_statuses() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(DELETE).path("/conversations/present");
            then.status(204);
        });
        server.mock(|when, then| {
            when.method(DELETE).path("/conversations/absent");
            then.status(404);
        });
        server.mock(|when, then| {
            when.method(DELETE).path("/conversations/locked");
            then.status(403);
        });

        let store = store_for(&server);
        assert!(store.delete("present").unwrap());
        assert!(!store.delete("absent").unwrap());
        assert!(store.delete("locked").is_err());
    }
}
