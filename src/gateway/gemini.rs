//! Gemini provider implementation
//!
//! This module implements the Provider trait against the Gemini REST API,
//! covering single-shot generation and SSE streaming. The `api_base`
//! override in the config lets tests point the provider at a mock server.

use crate::config::GeminiConfig;
use crate::error::{NotescribeError, Result};
use crate::gateway::base::{Content, GenerateResponse, Provider};

use async_trait::async_trait;
use bytes::BytesMut;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Gemini API provider
///
/// Calls `models/{model}:generateContent` for single-shot requests and
/// `models/{model}:streamGenerateContent?alt=sse` for streaming ones.
/// Provider calls carry no client timeout; only log delivery is bounded.
pub struct GeminiProvider {
    client: Client,
    config: GeminiConfig,
}

/// Request body for the generateContent endpoints
#[derive(Debug, Serialize)]
struct GeminiRequest<'a> {
    contents: &'a [Content],
}

/// Response body from generateContent
#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiProvider {
    /// Create a new Gemini provider instance
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent("notescribe-server/0.3.0")
            .build()
            .map_err(|e| {
                NotescribeError::Provider(format!("Failed to create HTTP client: {}", e))
            })?;

        tracing::info!(
            "Initialized Gemini provider: model={}, configured={}",
            config.model,
            config.api_key.is_some()
        );

        Ok(Self { client, config })
    }

    /// Get the configured model name
    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn api_base(&self) -> &str {
        self.config.api_base.as_deref().unwrap_or(DEFAULT_API_BASE)
    }

    /// Build the URL for a generation method, requiring credentials
    fn endpoint(&self, method: &str, sse: bool) -> Result<String> {
        let key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| NotescribeError::MissingCredentials("gemini".to_string()))?;
        let alt = if sse { "alt=sse&" } else { "" };
        Ok(format!(
            "{}/v1beta/models/{}:{}?{}key={}",
            self.api_base(),
            self.config.model,
            method,
            alt,
            key
        ))
    }

    /// Concatenate the text parts of the first candidate
    ///
    /// A response with no candidates or no text parts yields an empty
    /// string; callers decide whether that is acceptable.
    fn extract_text(response: GeminiResponse) -> String {
        response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }

    /// Extract the text chunk from one SSE `data:` line, if any
    fn parse_sse_data(line: &str) -> Option<String> {
        let payload = line.strip_prefix("data:")?.trim();
        if payload.is_empty() || payload == "[DONE]" {
            return None;
        }
        let response: GeminiResponse = serde_json::from_str(payload).ok()?;
        let text = Self::extract_text(response);
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    async fn generate(&self, contents: &[Content]) -> Result<GenerateResponse> {
        let url = self.endpoint("generateContent", false)?;

        tracing::debug!("Sending Gemini request: {} content entries", contents.len());

        let response = self
            .client
            .post(&url)
            .json(&GeminiRequest { contents })
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Gemini request failed: {}", e);
                NotescribeError::Provider(format!("Gemini request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Gemini returned error {}: {}", status, error_text);
            return Err(NotescribeError::Provider(format!(
                "Gemini returned error {}: {}",
                status, error_text
            ))
            .into());
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse Gemini response: {}", e);
            NotescribeError::Provider(format!("Failed to parse Gemini response: {}", e))
        })?;

        Ok(GenerateResponse::new(Self::extract_text(gemini_response)))
    }

    async fn generate_streaming(&self, contents: &[Content]) -> Result<String> {
        let url = self.endpoint("streamGenerateContent", true)?;

        tracing::debug!(
            "Sending streaming Gemini request: {} content entries",
            contents.len()
        );

        let response = self
            .client
            .post(&url)
            .json(&GeminiRequest { contents })
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Gemini streaming request failed: {}", e);
                NotescribeError::Provider(format!("Gemini streaming request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Gemini returned error {}: {}", status, error_text);
            return Err(NotescribeError::Provider(format!(
                "Gemini returned error {}: {}",
                status, error_text
            ))
            .into());
        }

        // Accumulate the body and process complete SSE lines as they arrive,
        // concatenating text chunks in arrival order.
        let mut buffer = BytesMut::new();
        let mut collected = String::new();
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                NotescribeError::Provider(format!("Gemini stream interrupted: {}", e))
            })?;
            buffer.extend_from_slice(&chunk);

            while let Some(newline) = buffer.iter().position(|&b| b == b'\n') {
                let line = buffer.split_to(newline + 1);
                let line = String::from_utf8_lossy(&line);
                if let Some(text) = Self::parse_sse_data(line.trim_end()) {
                    collected.push_str(&text);
                }
            }
        }

        // A final data line without a trailing newline
        if !buffer.is_empty() {
            let line = String::from_utf8_lossy(&buffer);
            if let Some(text) = Self::parse_sse_data(line.trim_end()) {
                collected.push_str(&text);
            }
        }

        tracing::debug!("Gemini stream finished: {} chars collected", collected.len());
        Ok(collected)
    }

    fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_with_key() -> GeminiProvider {
        GeminiProvider::new(GeminiConfig {
            model: "gemini-2.0-flash".to_string(),
            api_key: Some("test-key".to_string()),
            api_base: Some("http://localhost:4010".to_string()),
        })
        .unwrap()
    }

    #[test]
    fn test_provider_creation() {
        let provider = GeminiProvider::new(GeminiConfig::default());
        assert!(provider.is_ok());
        assert!(!provider.unwrap().is_configured());
    }

    #[test]
    fn test_endpoint_uses_api_base_override() {
        let provider = provider_with_key();
        let url = provider.endpoint("generateContent", false).unwrap();
        assert_eq!(
            url,
            "http://localhost:4010/v1beta/models/gemini-2.0-flash:generateContent?key=test-key"
        );
    }

    #[test]
    fn test_endpoint_sse_variant() {
        let provider = provider_with_key();
        let url = provider.endpoint("streamGenerateContent", true).unwrap();
        assert!(url.contains(":streamGenerateContent?alt=sse&key=test-key"));
    }

    #[test]
    fn test_endpoint_without_key_is_missing_credentials() {
        let provider = GeminiProvider::new(GeminiConfig::default()).unwrap();
        let err = provider.endpoint("generateContent", false).unwrap_err();
        let err = err.downcast::<NotescribeError>().unwrap();
        assert!(matches!(err, NotescribeError::MissingCredentials(_)));
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let response: GeminiResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Hello, "},{"text":"world"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(GeminiProvider::extract_text(response), "Hello, world");
    }

    #[test]
    fn test_extract_text_empty_candidates() {
        let response: GeminiResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert_eq!(GeminiProvider::extract_text(response), "");

        let response: GeminiResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(GeminiProvider::extract_text(response), "");
    }

    #[test]
    fn test_parse_sse_data_line() {
        let line = r#"data: {"candidates":[{"content":{"parts":[{"text":"chunk"}]}}]}"#;
        assert_eq!(GeminiProvider::parse_sse_data(line), Some("chunk".to_string()));
    }

    #[test]
    fn test_parse_sse_ignores_non_data_lines() {
        assert_eq!(GeminiProvider::parse_sse_data(""), None);
        assert_eq!(GeminiProvider::parse_sse_data(": keep-alive"), None);
        assert_eq!(GeminiProvider::parse_sse_data("data: [DONE]"), None);
        assert_eq!(GeminiProvider::parse_sse_data("data: not json"), None);
    }
}
