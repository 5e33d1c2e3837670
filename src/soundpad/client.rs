//! HTTP client for the Soundpad helper's local API

use crate::soundpad::server::SoundpadServer;
use crate::utils::error::AspError;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct SoundpadClient {
    client: Client,
    base_url: String,
}

impl SoundpadClient {
    pub fn new(port: u16) -> Self {
        Self::with_base_url(format!("http://127.0.0.1:{}", port))
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether the helper answers `/status` with a success code
    pub async fn status(&self) -> Result<bool, AspError> {
        let response = self
            .client
            .get(format!("{}/status", self.base_url))
            .send()
            .await?;
        debug!("Soundpad status: {}", response.status());
        Ok(response.status().is_success())
    }

    /// Ask the helper to add `path` to the Soundpad library
    pub async fn add_sound(&self, path: &Path) -> Result<(), AspError> {
        let response = self
            .client
            .post(format!("{}/add", self.base_url))
            .json(&json!({ "path": path.to_string_lossy() }))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            info!("Added {} to Soundpad", path.display());
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(AspError::Soundpad(describe_failure(status, &body)))
    }
}

fn describe_failure(status: StatusCode, body: &str) -> String {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("detail")
                .or_else(|| v.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string());

    match status {
        StatusCode::BAD_REQUEST => format!("Invalid file: {}", detail),
        StatusCode::SERVICE_UNAVAILABLE => "Soundpad is not running".to_string(),
        other => format!("Server error ({}): {}", other.as_u16(), detail),
    }
}

/// Poll `/status`, starting the helper between failed polls
pub async fn ensure_running(
    client: &SoundpadClient,
    server: &SoundpadServer,
    retries: u32,
    delay: Duration,
) -> Result<(), AspError> {
    for attempt in 1..=retries {
        match client.status().await {
            Ok(true) => return Ok(()),
            Ok(false) => debug!("Soundpad server not ready (attempt {})", attempt),
            Err(e) => debug!("Soundpad server unreachable (attempt {}): {}", attempt, e),
        }
        if let Err(e) = server.start().await {
            warn!("Could not start Soundpad server: {}", e);
        }
        tokio::time::sleep(delay).await;
    }

    Err(AspError::Soundpad(
        "Soundpad server unavailable after retries".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode as HttpStatus;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use std::path::PathBuf;

    async fn spawn_stub(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_failure_messages() {
        assert_eq!(
            describe_failure(StatusCode::BAD_REQUEST, r#"{"detail":"not audio"}"#),
            "Invalid file: not audio"
        );
        assert_eq!(
            describe_failure(StatusCode::SERVICE_UNAVAILABLE, ""),
            "Soundpad is not running"
        );
        assert_eq!(
            describe_failure(StatusCode::INTERNAL_SERVER_ERROR, r#"{"message":"boom"}"#),
            "Server error (500): boom"
        );
        assert_eq!(
            describe_failure(StatusCode::NOT_FOUND, "plain"),
            "Server error (404): plain"
        );
    }

    #[tokio::test]
    async fn test_status_and_add() {
        let router = Router::new()
            .route("/status", get(|| async { Json(json!({"ok": true})) }))
            .route(
                "/add",
                post(|Json(body): Json<Value>| async move {
                    if body["path"].as_str().unwrap_or_default().ends_with(".mp3") {
                        (HttpStatus::OK, Json(json!({"ok": true})))
                    } else {
                        (HttpStatus::BAD_REQUEST, Json(json!({"detail": "unsupported"})))
                    }
                }),
            );
        let client = SoundpadClient::with_base_url(spawn_stub(router).await);

        assert!(client.status().await.unwrap());
        client.add_sound(&PathBuf::from("/music/a.mp3")).await.unwrap();

        let err = client.add_sound(&PathBuf::from("/music/a.txt")).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid file: unsupported");
    }

    #[tokio::test]
    async fn test_ensure_running_gives_up() {
        // Nothing listens on the stub's port once the listener is dropped
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = SoundpadClient::new(port);
        let server = SoundpadServer::new(Some(PathBuf::from("/nonexistent/asp-server")));
        let err = ensure_running(&client, &server, 2, Duration::from_millis(10))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Soundpad server unavailable after retries");
    }
}
