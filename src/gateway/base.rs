//! Provider trait and request/response model for the AI gateway
//!
//! This module defines the Provider trait that generation backends
//! implement, along with the content types sent to them. The shapes
//! mirror the Gemini REST API (`contents` / `parts`), which keeps the
//! concrete provider's conversion layer thin.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One entry of a generation request
///
/// Roles follow the provider convention: `"user"` or `"model"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    /// Role of the content producer
    pub role: String,
    /// Ordered parts making up this entry
    pub parts: Vec<Part>,
}

impl Content {
    /// Creates a user entry with a single text part
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![Part::text(text)],
        }
    }

    /// Creates a model entry with a single text part
    pub fn model_text(text: impl Into<String>) -> Self {
        Self {
            role: "model".to_string(),
            parts: vec![Part::text(text)],
        }
    }

    /// Creates a user entry from arbitrary parts
    pub fn user_parts(parts: Vec<Part>) -> Self {
        Self {
            role: "user".to_string(),
            parts,
        }
    }
}

/// One part of a content entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Part {
    /// Plain text
    Text(String),
    /// Inline binary data (base64) with its mime type
    #[serde(rename_all = "camelCase")]
    InlineData {
        /// Mime type of the data, e.g. `image/png`
        mime_type: String,
        /// Base64-encoded payload
        data: String,
    },
    /// Reference to an externally hosted asset, e.g. a YouTube URL
    #[serde(rename_all = "camelCase")]
    FileData {
        /// URI the provider should fetch
        file_uri: String,
    },
}

impl Part {
    /// Creates a text part
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Creates an inline-data part
    pub fn inline_data(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self::InlineData {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Creates a file-reference part
    pub fn file_data(file_uri: impl Into<String>) -> Self {
        Self::FileData {
            file_uri: file_uri.into(),
        }
    }
}

/// Normalized result of a generation call
#[derive(Debug, Clone)]
pub struct GenerateResponse {
    /// Concatenated text of the first candidate; empty when the model
    /// returned no content (treated as "nothing to say", not an error)
    pub text: String,
}

impl GenerateResponse {
    /// Creates a response holding the given text
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Whether the model produced no text at all
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Generation backend abstraction
///
/// Implementations translate the request model into exactly one call to
/// an external generation service and normalize result and failure
/// shapes into `Result<GenerateResponse>` / `Result<String>`.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Issues a single non-streaming generation call
    async fn generate(&self, contents: &[Content]) -> Result<GenerateResponse>;

    /// Issues a streaming generation call and concatenates all non-empty
    /// text chunks in arrival order
    async fn generate_streaming(&self, contents: &[Content]) -> Result<String>;

    /// Whether the provider holds credentials and can be called at all
    fn is_configured(&self) -> bool;
}
