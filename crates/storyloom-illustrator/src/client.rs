//! HTTP client for the illustration service.
//!
//! `POST {base}/generate-scene` takes a JSON scene request and answers with the
//! encoded image; an optional caption comes back in the `x-caption` header.
//! `POST {base}/generate-cover` answers with a JSON envelope carrying the
//! title and the URL of a cover the service already stored.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use storyloom_core::error::DomainError;
use storyloom_core::ports::{
    CoverGenerator, CoverRequest, GeneratedCover, GeneratedImage, ImageAsset, ImageGenerator,
    SceneImageRequest,
};
use tracing::{debug, warn};

/// Default per-request timeout. Image generation is slow.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

const CAPTION_HEADER: &str = "x-caption";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScenePayload<'a> {
    style: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    prior_summary: Option<&'a str>,
    user_prompt: &'a str,
    ending: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CoverPayload<'a> {
    story_summary: &'a str,
    style: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoverResponse {
    success: bool,
    title: Option<String>,
    image_url: Option<String>,
    #[serde(default)]
    message: String,
}

fn unavailable(context: &str, e: impl std::fmt::Display) -> DomainError {
    DomainError::GenerationUnavailable(format!("{context}: {e}"))
}

/// Client for the illustration service.
#[derive(Debug, Clone)]
pub struct HttpIllustrator {
    client: Client,
    base_url: String,
}

impl HttpIllustrator {
    /// Creates a client for the service at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, DomainError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::Infrastructure(format!("http client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post<T: Serialize + Sync>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<Response, DomainError> {
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .json(body)
            .send()
            .await
            .map_err(|e| unavailable(path, e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            warn!(%path, %status, "illustration service rejected request");
            return Err(unavailable(path, format!("{status}: {error_text}")));
        }
        Ok(response)
    }
}

#[async_trait]
impl ImageGenerator for HttpIllustrator {
    async fn generate_scene(
        &self,
        request: &SceneImageRequest,
    ) -> Result<GeneratedImage, DomainError> {
        let payload = ScenePayload {
            style: &request.style,
            prior_summary: request.prior_summary.as_deref(),
            user_prompt: &request.user_prompt,
            ending: request.ending,
        };
        let response = self.post("/generate-scene", &payload).await?;

        let caption = response
            .headers()
            .get(CAPTION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| unavailable("/generate-scene", e))?
            .to_vec();

        debug!(size = bytes.len(), "scene image received");
        Ok(GeneratedImage { bytes, caption })
    }
}

#[async_trait]
impl CoverGenerator for HttpIllustrator {
    async fn generate_cover(&self, request: &CoverRequest) -> Result<GeneratedCover, DomainError> {
        let payload = CoverPayload {
            story_summary: &request.story_summary,
            style: &request.style,
        };
        let body: CoverResponse = self
            .post("/generate-cover", &payload)
            .await?
            .json()
            .await
            .map_err(|e| unavailable("/generate-cover", e))?;

        if !body.success {
            return Err(unavailable("/generate-cover", body.message));
        }
        match (body.title, body.image_url) {
            (Some(title), Some(url)) => Ok(GeneratedCover {
                title,
                cover: ImageAsset::Url(url),
            }),
            _ => Err(unavailable(
                "/generate-cover",
                "response is missing the title or image url",
            )),
        }
    }
}
