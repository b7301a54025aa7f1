//! Image-based title repair.
//!
//! When a vendor returns a product without a title, the orchestrator sends
//! the primary image to a multimodal model and asks for a marketplace title,
//! description and category. [`GeminiVision`] is the production analyzer.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use listport_core::Platform;
use regex::Regex;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::error::ScraperError;
use crate::http::{read_body, with_deadline, BROWSER_USER_AGENT};

pub const DEFAULT_VISION_MODEL: &str = "gemini-2.5-flash";

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/";

const VISION_TIMEOUT: Duration = Duration::from_secs(30);
const IMAGE_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Marketplace title limit; longer titles are cut to 62 chars plus `...`.
pub const MAX_TITLE_CHARS: usize = 65;

const ACCEPTED_MIME_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

static FIELD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""(title|description|category)"\s*:\s*"((?:[^"\\]|\\.)*)""#).expect("valid regex")
});

/// What the model inferred from a product image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisionAnalysis {
    pub title: String,
    pub description: String,
    pub category: Option<String>,
}

/// Produces a title and description from a product image.
#[async_trait]
pub trait VisionAnalyzer: Send + Sync {
    async fn analyze_image(
        &self,
        image_url: &str,
        platform: Platform,
        cancel: &CancellationToken,
    ) -> Result<VisionAnalysis, ScraperError>;
}

/// [`VisionAnalyzer`] backed by the Gemini `generateContent` API.
pub struct GeminiVision {
    client: Client,
    api_key: String,
    endpoint: Url,
}

impl GeminiVision {
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(api_key: &str, model: &str) -> Result<Self, ScraperError> {
        Self::with_base_url(api_key, model, DEFAULT_BASE_URL)
    }

    /// Creates an analyzer with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the client cannot be built, or
    /// [`ScraperError::Vision`] if `base_url` or `model` do not form a URL.
    pub fn with_base_url(
        api_key: &str,
        model: &str,
        base_url: &str,
    ) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .user_agent(BROWSER_USER_AGENT)
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let endpoint = Url::parse(&normalised)
            .and_then(|base| base.join(&format!("v1beta/models/{model}:generateContent")))
            .map_err(|e| ScraperError::Vision(format!("invalid Gemini endpoint: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            endpoint,
        })
    }

    /// Downloads the image and returns `(mime type, base64 data)`.
    async fn fetch_image(
        &self,
        image_url: &str,
        cancel: &CancellationToken,
    ) -> Result<(String, String), ScraperError> {
        let fetch_err = |reason: String| ScraperError::ImageFetch {
            url: image_url.to_owned(),
            reason,
        };

        with_deadline("product image fetch", IMAGE_FETCH_TIMEOUT, cancel, async {
            let response = self
                .client
                .get(image_url)
                .send()
                .await
                .map_err(|e| fetch_err(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(fetch_err(format!("HTTP {status}")));
            }

            let mime = mime_for(
                response
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok()),
            );
            let bytes = response
                .bytes()
                .await
                .map_err(|e| fetch_err(e.to_string()))?;
            Ok((mime.to_string(), STANDARD.encode(&bytes)))
        })
        .await
    }
}

#[async_trait]
impl VisionAnalyzer for GeminiVision {
    async fn analyze_image(
        &self,
        image_url: &str,
        platform: Platform,
        cancel: &CancellationToken,
    ) -> Result<VisionAnalysis, ScraperError> {
        let (mime_type, data) = self.fetch_image(image_url, cancel).await?;

        let request = json!({
            "contents": [{
                "parts": [
                    { "text": build_prompt(platform) },
                    { "inlineData": { "mimeType": mime_type, "data": data } }
                ]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "OBJECT",
                    "properties": {
                        "title": { "type": "STRING" },
                        "description": { "type": "STRING" },
                        "category": { "type": "STRING" }
                    },
                    "required": ["title", "description"]
                },
                "temperature": 0.5,
                "maxOutputTokens": 2048
            }
        });

        tracing::info!(image_url, platform = %platform, "requesting vision analysis");

        let body = with_deadline("Gemini vision request", VISION_TIMEOUT, cancel, async {
            let response = self
                .client
                .post(self.endpoint.clone())
                .header("x-goog-api-key", &self.api_key)
                .json(&request)
                .send()
                .await?;
            read_body("Gemini", response).await
        })
        .await?;

        let response: GenerateContentResponse =
            serde_json::from_str(&body).map_err(|e| ScraperError::Deserialize {
                context: "Gemini generateContent response".to_string(),
                source: e,
            })?;
        let text = response
            .first_text()
            .ok_or_else(|| ScraperError::Vision("Gemini Vision returned no content".to_string()))?;

        let analysis = parse_analysis(text)?;
        tracing::info!(title = %analysis.title, "vision analysis produced a title");
        Ok(analysis)
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()?
            .text
            .as_deref()
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawAnalysis {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    category: Option<String>,
}

fn build_prompt(platform: Platform) -> String {
    let marketplace = platform.display_name();
    format!(
        "You are an expert e-commerce copywriter. Analyze this product image from {marketplace} \
         and write a listing for it.\n\n\
         Return a JSON object with:\n\
         - \"title\": a concise, search-friendly product title of at most {MAX_TITLE_CHARS} characters\n\
         - \"description\": two short paragraphs of marketing copy covering what the product is, \
         its visible features and materials, and who it is for\n\
         - \"category\": the most specific product category that fits\n\n\
         Describe only what is visible in the image. Do not invent brand names, \
         specifications or certifications."
    )
}

/// Accepted image MIME type for a `Content-Type` header, defaulting to JPEG.
fn mime_for(content_type: Option<&str>) -> &'static str {
    let essence = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .unwrap_or_default();
    ACCEPTED_MIME_TYPES
        .iter()
        .find(|accepted| **accepted == essence)
        .copied()
        .unwrap_or("image/jpeg")
}

/// Parses model output into a [`VisionAnalysis`].
///
/// Strict JSON first; if the output was cut off mid-object, individual
/// string fields are salvaged with a regex.
fn parse_analysis(text: &str) -> Result<VisionAnalysis, ScraperError> {
    let trimmed = strip_code_fence(text);

    let raw = serde_json::from_str::<RawAnalysis>(trimmed).unwrap_or_else(|_| {
        tracing::debug!("vision output is not valid JSON, salvaging fields");
        salvage_fields(trimmed)
    });

    let title = raw
        .title
        .map(|t| t.trim().to_owned())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ScraperError::Vision("Failed to parse Gemini Vision response".to_string()))?;

    Ok(VisionAnalysis {
        title: clamp_title(&title),
        description: raw.description.map(|d| d.trim().to_owned()).unwrap_or_default(),
        category: raw
            .category
            .map(|c| c.trim().to_owned())
            .filter(|c| !c.is_empty()),
    })
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map_or(trimmed, |rest| rest.trim_end_matches("```").trim())
}

fn salvage_fields(text: &str) -> RawAnalysis {
    let mut raw = RawAnalysis::default();
    for caps in FIELD_RE.captures_iter(text) {
        let value = unescape(&caps[2]);
        let slot = match &caps[1] {
            "title" => &mut raw.title,
            "description" => &mut raw.description,
            _ => &mut raw.category,
        };
        if slot.is_none() {
            *slot = Some(value);
        }
    }
    raw
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

fn clamp_title(title: &str) -> String {
    if title.chars().count() <= MAX_TITLE_CHARS {
        return title.to_owned();
    }
    let cut: String = title.chars().take(MAX_TITLE_CHARS - 3).collect();
    format!("{}...", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_strict_json() {
        let analysis = parse_analysis(
            r#"{"title": "Ceramic Pour-Over Coffee Dripper", "description": "Brews a clean cup.", "category": "Kitchen"}"#,
        )
        .unwrap();
        assert_eq!(analysis.title, "Ceramic Pour-Over Coffee Dripper");
        assert_eq!(analysis.description, "Brews a clean cup.");
        assert_eq!(analysis.category.as_deref(), Some("Kitchen"));
    }

    #[test]
    fn parses_fenced_json() {
        let analysis =
            parse_analysis("```json\n{\"title\": \"Desk Lamp\", \"description\": \"Bright.\"}\n```")
                .unwrap();
        assert_eq!(analysis.title, "Desk Lamp");
        assert!(analysis.category.is_none());
    }

    #[test]
    fn salvages_truncated_output() {
        let text = r#"{"title": "Wireless \"Pro\" Earbuds", "description": "Line one.\nLine two"#;
        let cut = r#"{"title": "Wireless \"Pro\" Earbuds", "description": "Line one.\nLine two", "categ"#;
        let analysis = parse_analysis(cut).unwrap();
        assert_eq!(analysis.title, "Wireless \"Pro\" Earbuds");
        assert_eq!(analysis.description, "Line one.\nLine two");

        // An unterminated description is dropped, the title still survives.
        let analysis = parse_analysis(text).unwrap();
        assert_eq!(analysis.title, "Wireless \"Pro\" Earbuds");
        assert!(analysis.description.is_empty());
    }

    #[test]
    fn missing_title_is_an_error() {
        let err = parse_analysis(r#"{"description": "No title here"}"#).unwrap_err();
        assert_eq!(
            err.to_string(),
            "vision analysis error: Failed to parse Gemini Vision response"
        );
        assert!(parse_analysis("not json at all").is_err());
    }

    #[test]
    fn long_titles_are_clamped() {
        let long = "A".repeat(80);
        let analysis = parse_analysis(&format!(r#"{{"title": "{long}"}}"#)).unwrap();
        assert_eq!(analysis.title.chars().count(), MAX_TITLE_CHARS);
        assert!(analysis.title.ends_with("..."));

        let exact = "B".repeat(MAX_TITLE_CHARS);
        assert_eq!(clamp_title(&exact), exact);
    }

    #[test]
    fn mime_type_is_restricted_to_known_image_types() {
        assert_eq!(mime_for(Some("image/png")), "image/png");
        assert_eq!(mime_for(Some("image/webp; charset=binary")), "image/webp");
        assert_eq!(mime_for(Some("IMAGE/GIF")), "image/gif");
        assert_eq!(mime_for(Some("image/avif")), "image/jpeg");
        assert_eq!(mime_for(Some("text/html")), "image/jpeg");
        assert_eq!(mime_for(None), "image/jpeg");
    }

    #[test]
    fn prompt_names_the_marketplace_and_limit() {
        let prompt = build_prompt(Platform::AliExpress);
        assert!(prompt.contains("AliExpress"));
        assert!(prompt.contains("65 characters"));
        assert!(build_prompt(Platform::Amazon).contains("Amazon"));
    }

    #[test]
    fn endpoint_includes_model() {
        let vision =
            GeminiVision::with_base_url("k", DEFAULT_VISION_MODEL, "http://localhost:9").unwrap();
        assert_eq!(
            vision.endpoint.as_str(),
            "http://localhost:9/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }
}
