//! Background-removal capability.
//!
//! The engine only needs `bytes -> bytes-with-alpha`; everything behind that
//! (rembg server, local model, test double) implements [`Segmenter`].

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum SegmentError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("segmenter returned an empty body")]
    EmptyResponse,
}

#[async_trait]
pub trait Segmenter: Send + Sync {
    /// Name for logging.
    fn name(&self) -> &str;

    /// Return an encoded image whose alpha channel marks the foreground.
    async fn remove_background(&self, image: &[u8]) -> Result<Vec<u8>, SegmentError>;
}

/// Segmenter backed by a rembg-compatible HTTP endpoint
/// (`rembg s` exposes `POST /api/remove`).
pub struct HttpSegmenter {
    client: reqwest::Client,
    url: String,
}

impl HttpSegmenter {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl Segmenter for HttpSegmenter {
    fn name(&self) -> &str {
        "http"
    }

    async fn remove_background(&self, image: &[u8]) -> Result<Vec<u8>, SegmentError> {
        let part = Part::bytes(image.to_vec()).file_name("image");
        let form = Form::new().part("file", part);

        debug!(url = %self.url, bytes = image.len(), "sending image to segmenter");

        let resp = self.client.post(&self.url).multipart(form).send().await?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status, body = %text, "segmenter API error");
            return Err(SegmentError::Api {
                status,
                message: text,
            });
        }

        let body = resp.bytes().await?;
        if body.is_empty() {
            return Err(SegmentError::EmptyResponse);
        }
        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn returns_response_body_on_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/remove"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3]))
            .mount(&server)
            .await;

        let seg = HttpSegmenter::new(format!("{}/api/remove", server.uri()));
        let out = seg.remove_background(b"photo").await.expect("segment");
        assert_eq!(out, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn non_success_status_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model crashed"))
            .mount(&server)
            .await;

        let seg = HttpSegmenter::new(format!("{}/api/remove", server.uri()));
        match seg.remove_background(b"photo").await {
            Err(SegmentError::Api { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "model crashed");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_body_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let seg = HttpSegmenter::new(server.uri());
        assert!(matches!(
            seg.remove_background(b"photo").await,
            Err(SegmentError::EmptyResponse)
        ));
    }
}
