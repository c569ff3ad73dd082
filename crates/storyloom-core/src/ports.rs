//! Collaborator ports: illustration services, blob storage and tokenization.
//!
//! Implementations report failures as `DomainError`. Callers in the engine
//! translate any illustration failure into `DomainError::GenerationUnavailable`
//! so a failed call is always retryable and never replaced by placeholder
//! content.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Input for a single scene illustration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SceneImageRequest {
    /// Drawing style prompt fragment.
    pub style: String,
    /// Summary of the accepted story so far, if any turn was accepted.
    pub prior_summary: Option<String>,
    /// The player's prompt for this turn.
    pub user_prompt: String,
    /// Whether this is a closing scene built from an ending card.
    pub ending: bool,
}

/// A generated scene illustration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    /// Encoded image bytes.
    pub bytes: Vec<u8>,
    /// Optional caption produced alongside the image.
    pub caption: Option<String>,
}

/// Generates one illustration per turn.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Produces an illustration for `request`.
    async fn generate_scene(
        &self,
        request: &SceneImageRequest,
    ) -> Result<GeneratedImage, DomainError>;
}

/// Input for the title and cover of a finished story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoverRequest {
    /// Accepted prompts joined and truncated to the summary budget.
    pub story_summary: String,
    /// Drawing style prompt fragment.
    pub style: String,
}

/// A cover image: raw bytes to upload, or an already persisted asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageAsset {
    /// Encoded bytes that still need uploading.
    Bytes(Vec<u8>),
    /// Public URL of an asset the service already stored.
    Url(String),
}

impl ImageAsset {
    /// Returns `true` when the asset carries no usable content.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Bytes(bytes) => bytes.is_empty(),
            Self::Url(url) => url.trim().is_empty(),
        }
    }
}

/// A generated title and cover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedCover {
    /// Book title.
    pub title: String,
    /// Cover image.
    pub cover: ImageAsset,
}

/// Generates the title and cover of a book.
#[async_trait]
pub trait CoverGenerator: Send + Sync {
    /// Produces a title and cover for `request`.
    async fn generate_cover(&self, request: &CoverRequest) -> Result<GeneratedCover, DomainError>;
}

/// Object storage for published images.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Writes `bytes` under `key`, overwriting any existing object.
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), DomainError>;

    /// Reads the object under `key`.
    ///
    /// Returns `DomainError::NotFound` when no such object exists.
    async fn get(&self, key: &str) -> Result<Vec<u8>, DomainError>;

    /// Public URL clients can fetch `key` from.
    fn public_url(&self, key: &str) -> String;
}

/// A single analyzed token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Surface form of the token.
    pub morpheme: String,
    /// Part-of-speech tag, if the tokenizer provides one.
    pub part_of_speech: String,
}

/// Splits text into tokens. Must be deterministic.
pub trait Tokenizer: Send + Sync {
    /// Analyzes `text` into tokens in reading order.
    fn analyze(&self, text: &str) -> Vec<Token>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_asset_emptiness() {
        assert!(ImageAsset::Bytes(Vec::new()).is_empty());
        assert!(ImageAsset::Url("  ".to_owned()).is_empty());
        assert!(!ImageAsset::Bytes(vec![0x89]).is_empty());
        assert!(!ImageAsset::Url("https://cdn.example/cover.png".to_owned()).is_empty());
    }
}
