//! Local image proxy
//!
//! Thumbnails are fetched through `GET /api/proxy?url=<remote>` so a local UI
//! can display them without cross-origin restrictions.

use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use reqwest::Client;
use serde::Deserialize;
use std::net::SocketAddr;
use tracing::{error, info};

pub use crate::utils::config::DEFAULT_PROXY_PORT;

const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";

#[derive(Debug, Deserialize)]
struct ProxyQuery {
    url: Option<String>,
}

pub fn router() -> Router {
    Router::new()
        .route("/api/proxy", get(proxy_image))
        .with_state(Client::new())
}

async fn proxy_image(State(client): State<Client>, Query(query): Query<ProxyQuery>) -> Response {
    let Some(url) = query.url.filter(|u| !u.trim().is_empty()) else {
        return (StatusCode::BAD_REQUEST, "Missing URL parameter").into_response();
    };

    let upstream = match client.get(&url).send().await.and_then(|r| r.error_for_status()) {
        Ok(response) => response,
        Err(e) => {
            error!("Proxy fetch of {} failed: {}", url, e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Error fetching image").into_response();
        }
    };

    let content_type = upstream
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string();

    (
        [
            (header::CONTENT_TYPE, content_type),
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*".to_string()),
        ],
        Body::from_stream(upstream.bytes_stream()),
    )
        .into_response()
}

/// Serve the proxy on `127.0.0.1:<port>` until the task is dropped
pub async fn serve(port: u16) -> Result<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind image proxy on {}", addr))?;
    info!("Image proxy listening on http://{}", addr);
    axum::serve(listener, router())
        .await
        .context("Image proxy server failed")?;
    Ok(())
}

/// The local URL that serves `url` through the proxy
pub fn proxied_image_url(port: u16, url: &str) -> String {
    let base = format!("http://127.0.0.1:{}/api/proxy", port);
    match reqwest::Url::parse_with_params(&base, &[("url", url)]) {
        Ok(target) => target.to_string(),
        Err(_) => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderMap;

    async fn spawn(router: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    #[test]
    fn test_proxied_url_is_encoded() {
        assert_eq!(
            proxied_image_url(8855, "https://i.ytimg.com/vi/x/hq.jpg?a=1&b=2"),
            "http://127.0.0.1:8855/api/proxy?url=https%3A%2F%2Fi.ytimg.com%2Fvi%2Fx%2Fhq.jpg%3Fa%3D1%26b%3D2"
        );
    }

    #[tokio::test]
    async fn test_missing_url_is_bad_request() {
        let addr = spawn(router()).await;
        let response = reqwest::get(format!("http://{}/api/proxy", addr)).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        assert_eq!(response.text().await.unwrap(), "Missing URL parameter");
    }

    #[tokio::test]
    async fn test_forwards_body_and_content_type() {
        let upstream = spawn(Router::new().route(
            "/thumb.png",
            get(|| async {
                let mut headers = HeaderMap::new();
                headers.insert(header::CONTENT_TYPE, "image/png".parse().unwrap());
                (headers, "PNGDATA")
            }),
        ))
        .await;
        let addr = spawn(router()).await;

        let remote = format!("http://{}/thumb.png", upstream);
        let response = reqwest::get(proxied_image_url(addr.port(), &remote)).await.unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "image/png");
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
        assert_eq!(response.text().await.unwrap(), "PNGDATA");
    }

    #[tokio::test]
    async fn test_upstream_failure_is_server_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let dead = listener.local_addr().unwrap();
        drop(listener);
        let addr = spawn(router()).await;

        let remote = format!("http://{}/gone.jpg", dead);
        let response = reqwest::get(proxied_image_url(addr.port(), &remote)).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.text().await.unwrap(), "Error fetching image");
    }
}
