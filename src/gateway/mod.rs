//! AI gateway for the Notescribe backend
//!
//! This module contains the provider abstraction and the Gateway facade
//! that translates domain-level requests (chat reply, title generation,
//! image description, document Q&A, video analysis) into exactly one
//! provider call each, normalizing the heterogeneous result and failure
//! shapes into a single success/failure contract.

pub mod base;
pub mod gemini;

pub use base::{Content, GenerateResponse, Part, Provider};
pub use gemini::GeminiProvider;

use crate::error::{NotescribeError, Result};
use crate::session::Turn;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::path::Path;
use std::sync::Arc;

/// Title returned whenever title generation cannot or should not run
///
/// Clients treat this exact string as "no title yet", so it must stay
/// distinguishable from generated titles.
pub const FALLBACK_TITLE: &str = "New Chat";

/// Maximum length of a generated title, ellipsis included
const TITLE_MAX_CHARS: usize = 40;

/// How many leading turns are handed to the title prompt
const TITLE_CONTEXT_TURNS: usize = 3;

/// Character budget for document text in a Q&A prompt
const DOCUMENT_CHAR_BUDGET: usize = 20_000;

/// Prompt used when an image request carries none
const DEFAULT_IMAGE_PROMPT: &str = "Describe this image in detail.";

/// Domain-level facade over a generation provider
///
/// Stateless apart from the provider handle; every operation performs at
/// most one provider call. Title generation favors availability (a bad
/// title is harmless), while chat reply and document Q&A surface their
/// failures so callers can discard broken session state.
#[derive(Clone)]
pub struct Gateway {
    provider: Arc<dyn Provider>,
}

impl Gateway {
    /// Creates a gateway over the given provider
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }

    /// Whether the underlying provider holds credentials
    pub fn is_configured(&self) -> bool {
        self.provider.is_configured()
    }

    /// Generates a reply for a conversation whose last turn is the
    /// user's new question
    ///
    /// Returns the reply text and the updated history (input plus one
    /// model turn) for the session store to persist. An empty model
    /// response is not an error; the reply is simply empty. On any
    /// provider failure the caller must drop the session.
    pub async fn generate_reply(&self, history: &[Turn]) -> Result<(String, Vec<Turn>)> {
        let contents = turns_to_contents(history);
        let response = self.provider.generate(&contents).await?;

        let reply = response.text;
        let mut updated = history.to_vec();
        updated.push(Turn::model(reply.clone()));
        Ok((reply, updated))
    }

    /// Generates a conversation title, never failing the caller
    ///
    /// Requires at least two prior turns and uses only the first three
    /// as context. Missing credentials, provider errors, and empty
    /// responses all yield the fixed fallback title.
    pub async fn generate_title(&self, history: &[Turn]) -> String {
        if history.len() < 2 {
            return FALLBACK_TITLE.to_string();
        }
        if !self.provider.is_configured() {
            tracing::debug!("Title generation skipped: provider not configured");
            return FALLBACK_TITLE.to_string();
        }

        let mut prompt = String::from(
            "Generate a concise title (at most 40 characters, no quotes) \
             for the following conversation. Reply with the title only.\n\n",
        );
        for turn in history.iter().take(TITLE_CONTEXT_TURNS) {
            let speaker = match turn.role {
                crate::session::Role::User => "User",
                crate::session::Role::Model => "Assistant",
            };
            prompt.push_str(&format!("{}: {}\n", speaker, turn.text));
        }

        match self.provider.generate(&[Content::user_text(prompt)]).await {
            Ok(response) if !response.is_empty() => clean_title(&response.text),
            Ok(_) => {
                tracing::debug!("Title generation returned empty response, using fallback");
                FALLBACK_TITLE.to_string()
            }
            Err(e) => {
                tracing::warn!("Title generation failed, using fallback: {}", e);
                FALLBACK_TITLE.to_string()
            }
        }
    }

    /// Describes an already-uploaded image asset
    ///
    /// The path must reference an existing file inside `uploads_root`.
    /// The asset is inlined into a streaming generation call and all
    /// streamed text chunks are concatenated in arrival order.
    pub async fn describe_image(
        &self,
        uploads_root: &Path,
        asset_path: &Path,
        prompt: Option<&str>,
    ) -> Result<String> {
        let uploads_root = uploads_root.canonicalize().map_err(|e| {
            NotescribeError::Workspace(format!("uploads directory unavailable: {}", e))
        })?;
        let asset_path = asset_path.canonicalize().map_err(|_| {
            NotescribeError::NotFound(format!("image asset not found: {}", asset_path.display()))
        })?;
        if !asset_path.starts_with(&uploads_root) {
            return Err(
                NotescribeError::PathOutsideWorkspace(asset_path.display().to_string()).into(),
            );
        }

        let bytes = std::fs::read(&asset_path)?;
        let mime = sniff_image_mime(&bytes)?;
        let prompt = prompt
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(DEFAULT_IMAGE_PROMPT);

        let contents = vec![Content::user_parts(vec![
            Part::inline_data(mime, BASE64.encode(&bytes)),
            Part::text(prompt),
        ])];

        self.provider.generate_streaming(&contents).await
    }

    /// Answers a question over extracted document text
    ///
    /// The document is truncated to a fixed character budget before
    /// inclusion in the prompt. Unlike title generation, every failure
    /// here is surfaced to the caller.
    pub async fn answer_over_document(&self, extracted_text: &str, question: &str) -> Result<String> {
        if !self.provider.is_configured() {
            return Err(NotescribeError::MissingCredentials("gemini".to_string()).into());
        }
        if extracted_text.trim().is_empty() {
            return Err(NotescribeError::InvalidInput("document text is empty".to_string()).into());
        }
        if question.trim().is_empty() {
            return Err(NotescribeError::InvalidInput("question is empty".to_string()).into());
        }

        let truncated = truncate_chars(extracted_text, DOCUMENT_CHAR_BUDGET);
        let prompt = format!(
            "Answer the question using only the document text below.\n\n\
             Document:\n{}\n\nQuestion: {}",
            truncated, question
        );

        let response = self.provider.generate(&[Content::user_text(prompt)]).await?;
        if response.is_empty() {
            return Err(
                NotescribeError::Provider("provider returned no answer".to_string()).into(),
            );
        }
        Ok(response.text)
    }

    /// Analyzes a video the provider can fetch itself (YouTube URL)
    ///
    /// The URL is passed as a file reference alongside the prompt text.
    pub async fn analyze_video(&self, video_url: &str, prompt: &str) -> Result<String> {
        if !self.provider.is_configured() {
            return Err(NotescribeError::MissingCredentials("gemini".to_string()).into());
        }

        let contents = vec![Content::user_parts(vec![
            Part::file_data(video_url),
            Part::text(prompt),
        ])];

        let response = self.provider.generate(&contents).await?;
        if response.is_empty() {
            return Err(
                NotescribeError::Provider("provider returned no analysis".to_string()).into(),
            );
        }
        Ok(response.text)
    }
}

/// Convert session turns into provider content entries
fn turns_to_contents(history: &[Turn]) -> Vec<Content> {
    history
        .iter()
        .map(|turn| match turn.role {
            crate::session::Role::User => Content::user_text(&turn.text),
            crate::session::Role::Model => Content::model_text(&turn.text),
        })
        .collect()
}

/// Enforce the title output constraints
///
/// Removes quote characters, collapses whitespace runs to single spaces,
/// and truncates to at most 40 characters ending in `...` when exceeded.
fn clean_title(raw: &str) -> String {
    let unquoted: String = raw.chars().filter(|c| *c != '"' && *c != '\'').collect();
    let collapsed = unquoted.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.is_empty() {
        return FALLBACK_TITLE.to_string();
    }
    if collapsed.chars().count() <= TITLE_MAX_CHARS {
        return collapsed;
    }

    let mut truncated: String = collapsed.chars().take(TITLE_MAX_CHARS - 3).collect();
    truncated.push_str("...");
    truncated
}

/// Truncate a string to at most `budget` characters on a char boundary
fn truncate_chars(text: &str, budget: usize) -> &str {
    match text.char_indices().nth(budget) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Determine the mime type of an image from its bytes
fn sniff_image_mime(bytes: &[u8]) -> Result<&'static str> {
    let format = image::guess_format(bytes)
        .map_err(|e| NotescribeError::InvalidInput(format!("unrecognized image data: {}", e)))?;
    Ok(match format {
        image::ImageFormat::Png => "image/png",
        image::ImageFormat::Jpeg => "image/jpeg",
        image::ImageFormat::Gif => "image/gif",
        image::ImageFormat::WebP => "image/webp",
        image::ImageFormat::Bmp => "image/bmp",
        image::ImageFormat::Tiff => "image/tiff",
        _ => "application/octet-stream",
    })
}
