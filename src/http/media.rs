//! Image, PDF, YouTube, and scrape endpoints
//!
//! These handlers are thin adapters: validate the request, call the
//! gateway or fetch the page, shape the JSON envelope. Image assets must
//! be uploaded first and are only ever read back out of the uploads
//! namespace inside the workspace.

use super::{ApiResult, AppState};
use crate::error::NotescribeError;

use axum::extract::{Multipart, State};
use axum::Json;
use bytes::Bytes;
use regex::Regex;
use select::document::Document;
use select::predicate::{Attr, Name};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

const SCRAPE_TIMEOUT_SECS: u64 = 10;

const DEFAULT_YOUTUBE_PROMPT: &str = "Summarize this video and list its key points.";

const EXTRACT_CODE_PROMPT: &str = "Extract every code snippet shown or described in this video. \
     Reply with each snippet in its own fenced code block, followed by \
     step-by-step instructions for using them.";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub status: String,
    pub file_name: String,
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct ImageProcessRequest {
    pub image_url: String,
    #[serde(default)]
    pub prompt_text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ImageProcessResponse {
    pub status: String,
    pub response: String,
}

#[derive(Debug, Serialize)]
pub struct ExtractTextResponse {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct PdfAskRequest {
    pub pdf_text: String,
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct PdfAskResponse {
    pub answer: String,
}

#[derive(Debug, Deserialize)]
pub struct YoutubeRequest {
    pub youtube_url: String,
    #[serde(default)]
    pub prompt: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct YoutubeAnalyzeResponse {
    pub analysis: String,
}

#[derive(Debug, Serialize)]
pub struct ExtractCodeResponse {
    pub extracted_code: Vec<String>,
    pub instructions: String,
}

#[derive(Debug, Deserialize)]
pub struct ScrapeRequest {
    pub url: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ScrapeResponse {
    pub title: String,
    pub description: String,
    pub text: String,
    pub main_content: String,
}

/// POST /api/image/upload
///
/// Stores the uploaded image under the workspace uploads namespace with
/// a unique name and returns the name to use with /api/image/process.
pub async fn image_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let (original_name, data) = read_file_field(multipart).await?;

    if image::guess_format(&data).is_err() {
        return Err(
            NotescribeError::InvalidInput("uploaded data is not a recognized image".to_string())
                .into(),
        );
    }

    // Client-supplied names are untrusted; keep only the final component
    let base = std::path::Path::new(&original_name)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "upload".to_string());
    let stored_name = format!("{}-{}", Uuid::new_v4(), base);

    let uploads = state.workspace.uploads_dir()?;
    let target = uploads.join(&stored_name);
    tokio::fs::write(&target, &data).await?;
    tracing::info!("Stored image asset {} ({} bytes)", stored_name, data.len());

    Ok(Json(UploadResponse {
        status: "ok".to_string(),
        file_name: stored_name,
        path: target.display().to_string(),
    }))
}

/// POST /api/image/process
pub async fn image_process(
    State(state): State<AppState>,
    Json(request): Json<ImageProcessRequest>,
) -> ApiResult<Json<ImageProcessResponse>> {
    let name = request
        .image_url
        .strip_prefix("file://")
        .unwrap_or(&request.image_url);
    if name.trim().is_empty() {
        return Err(NotescribeError::InvalidInput("image_url is empty".to_string()).into());
    }

    let uploads = state.workspace.uploads_dir()?;
    let asset = uploads.join(name);
    let response = state
        .gateway
        .describe_image(&uploads, &asset, request.prompt_text.as_deref())
        .await?;

    Ok(Json(ImageProcessResponse {
        status: "success".to_string(),
        response,
    }))
}

/// POST /api/pdf/extract-text
pub async fn pdf_extract_text(
    State(_state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<ExtractTextResponse>> {
    let (_name, data) = read_file_field(multipart).await?;

    let text = pdf_extract::extract_text_from_mem(&data).map_err(|e| {
        NotescribeError::InvalidInput(format!("failed to extract PDF text: {}", e))
    })?;

    Ok(Json(ExtractTextResponse { text }))
}

/// POST /api/pdf/ask
pub async fn pdf_ask(
    State(state): State<AppState>,
    Json(request): Json<PdfAskRequest>,
) -> ApiResult<Json<PdfAskResponse>> {
    let answer = state
        .gateway
        .answer_over_document(&request.pdf_text, &request.question)
        .await?;
    Ok(Json(PdfAskResponse { answer }))
}

/// POST /api/youtube/analyze
pub async fn youtube_analyze(
    State(state): State<AppState>,
    Json(request): Json<YoutubeRequest>,
) -> ApiResult<Json<YoutubeAnalyzeResponse>> {
    validate_youtube_url(&request.youtube_url)?;
    let prompt = request.prompt.as_deref().unwrap_or(DEFAULT_YOUTUBE_PROMPT);
    let analysis = state
        .gateway
        .analyze_video(&request.youtube_url, prompt)
        .await?;
    Ok(Json(YoutubeAnalyzeResponse { analysis }))
}

/// POST /api/youtube/extract-code
pub async fn youtube_extract_code(
    State(state): State<AppState>,
    Json(request): Json<YoutubeRequest>,
) -> ApiResult<Json<ExtractCodeResponse>> {
    validate_youtube_url(&request.youtube_url)?;
    let raw = state
        .gateway
        .analyze_video(&request.youtube_url, EXTRACT_CODE_PROMPT)
        .await?;

    let (extracted_code, instructions) = split_code_blocks(&raw);
    Ok(Json(ExtractCodeResponse {
        extracted_code,
        instructions,
    }))
}

/// POST /api/scrape
pub async fn scrape(
    State(_state): State<AppState>,
    Json(request): Json<ScrapeRequest>,
) -> ApiResult<Json<ScrapeResponse>> {
    let url = Url::parse(&request.url)
        .map_err(|e| NotescribeError::InvalidInput(format!("malformed URL: {}", e)))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(
            NotescribeError::InvalidInput(format!("unsupported scheme: {}", url.scheme())).into(),
        );
    }

    let html = fetch_html(url.as_str()).await?;
    Ok(Json(parse_page(&html)))
}

/// Pull the first file field out of a multipart request
async fn read_file_field(mut multipart: Multipart) -> ApiResult<(String, Bytes)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| NotescribeError::InvalidInput(format!("malformed multipart body: {}", e)))?
    {
        if field.name() == Some("file") {
            let name = field.file_name().unwrap_or("upload").to_string();
            let data = field.bytes().await.map_err(|e| {
                NotescribeError::InvalidInput(format!("failed to read upload: {}", e))
            })?;
            if data.is_empty() {
                return Err(
                    NotescribeError::InvalidInput("uploaded file is empty".to_string()).into(),
                );
            }
            return Ok((name, data));
        }
    }
    Err(NotescribeError::InvalidInput("missing 'file' field".to_string()).into())
}

/// Check that a URL points at YouTube
fn validate_youtube_url(raw: &str) -> crate::error::Result<()> {
    let url = Url::parse(raw)
        .map_err(|e| NotescribeError::InvalidInput(format!("malformed URL: {}", e)))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(
            NotescribeError::InvalidInput(format!("unsupported scheme: {}", url.scheme())).into(),
        );
    }
    let host = url.host_str().unwrap_or_default();
    let is_youtube = host == "youtu.be"
        || host == "youtube.com"
        || host.ends_with(".youtube.com");
    if !is_youtube {
        return Err(NotescribeError::InvalidInput(format!("not a YouTube URL: {}", raw)).into());
    }
    Ok(())
}

/// Split model output into fenced code blocks and the surrounding prose
fn split_code_blocks(text: &str) -> (Vec<String>, String) {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    let fence = FENCE.get_or_init(|| {
        Regex::new(r"(?s)```[a-zA-Z0-9_+\-]*\n(.*?)```").expect("fence regex is valid")
    });

    let blocks: Vec<String> = fence
        .captures_iter(text)
        .map(|cap| cap[1].trim().to_string())
        .filter(|block| !block.is_empty())
        .collect();

    let instructions = fence.replace_all(text, "").trim().to_string();
    (blocks, instructions)
}

async fn fetch_html(url: &str) -> crate::error::Result<String> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(SCRAPE_TIMEOUT_SECS))
        .build()?;

    let response = client
        .get(url)
        .header("User-Agent", "Mozilla/5.0 (Windows NT 10.0; Win64; x64)")
        .header(
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        )
        .header("Accept-Language", "en-US,en;q=0.5")
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(NotescribeError::Provider(format!(
            "unable to fetch url: {}; status: {}",
            url,
            response.status()
        ))
        .into());
    }
    Ok(response.text().await?)
}

/// Extract title, meta description, body text, and main content
fn parse_page(html: &str) -> ScrapeResponse {
    let document = Document::from(html);

    let title = document
        .find(Name("title"))
        .next()
        .map(|n| collapse_whitespace(&n.text()))
        .unwrap_or_default();

    let description = document
        .find(Name("meta"))
        .filter(|n| n.attr("name") == Some("description"))
        .filter_map(|n| n.attr("content"))
        .next()
        .map(|s| collapse_whitespace(s))
        .unwrap_or_default();

    let text = document
        .find(Name("body"))
        .next()
        .map(|n| collapse_whitespace(&n.text()))
        .unwrap_or_default();

    let main_content = find_main_content(&document)
        .map(|t| collapse_whitespace(&t))
        .unwrap_or_else(|| text.clone());

    ScrapeResponse {
        title,
        description,
        text,
        main_content,
    }
}

/// Locate the page's main content by well-known ids, then semantic tags
fn find_main_content(document: &Document) -> Option<String> {
    const CONTENT_IDS: &[&str] = &["content", "main-content", "main_content"];
    for id in CONTENT_IDS {
        if let Some(node) = document.find(Attr("id", *id)).next() {
            return Some(node.text());
        }
    }
    if let Some(node) = document.find(Name("article")).next() {
        return Some(node.text());
    }
    if let Some(node) = document.find(Name("main")).next() {
        return Some(node.text());
    }
    None
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_youtube_url_accepts_known_hosts() {
        assert!(validate_youtube_url("https://www.youtube.com/watch?v=abc").is_ok());
        assert!(validate_youtube_url("https://youtube.com/watch?v=abc").is_ok());
        assert!(validate_youtube_url("https://youtu.be/abc").is_ok());
        assert!(validate_youtube_url("https://m.youtube.com/watch?v=abc").is_ok());
    }

    #[test]
    fn test_validate_youtube_url_rejects_others() {
        assert!(validate_youtube_url("https://example.com/watch?v=abc").is_err());
        assert!(validate_youtube_url("https://notyoutube.com/x").is_err());
        assert!(validate_youtube_url("ftp://youtube.com/x").is_err());
        assert!(validate_youtube_url("not a url").is_err());
    }

    #[test]
    fn test_split_code_blocks_extracts_fences() {
        let text = "Intro.\n```python\nprint('hi')\n```\nThen run it.\n```\nmake build\n```\nDone.";
        let (blocks, instructions) = split_code_blocks(text);
        assert_eq!(blocks, vec!["print('hi')", "make build"]);
        assert!(instructions.contains("Intro."));
        assert!(instructions.contains("Then run it."));
        assert!(!instructions.contains("print"));
    }

    #[test]
    fn test_split_code_blocks_without_fences() {
        let (blocks, instructions) = split_code_blocks("No code here at all.");
        assert!(blocks.is_empty());
        assert_eq!(instructions, "No code here at all.");
    }

    #[test]
    fn test_parse_page_extracts_fields() {
        let html = r#"<html><head>
            <title>  My   Page </title>
            <meta name="description" content="A test page">
            </head><body>
            <nav>Menu</nav>
            <main><p>Main body text.</p></main>
            </body></html>"#;
        let page = parse_page(html);
        assert_eq!(page.title, "My Page");
        assert_eq!(page.description, "A test page");
        assert!(page.text.contains("Main body text."));
        assert_eq!(page.main_content, "Main body text.");
    }

    #[test]
    fn test_parse_page_prefers_content_id() {
        let html = r#"<html><body>
            <div id="content"><p>The article.</p></div>
            <main>Fallback main.</main>
            </body></html>"#;
        let page = parse_page(html);
        assert_eq!(page.main_content, "The article.");
    }

    #[test]
    fn test_parse_page_missing_everything() {
        let page = parse_page("<html><body></body></html>");
        assert_eq!(page.title, "");
        assert_eq!(page.description, "");
        assert_eq!(page.main_content, "");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a \n b\t\tc "), "a b c");
    }
}
