use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::settings::Settings;

/// Failures from either backend capability. `Display` text is shown to the
/// user as-is in an error toast.
#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("could not reach the page, check the network or the URL")]
    Network(#[source] reqwest::Error),
    #[error("the page returned status {0}")]
    HttpStatus(u16),
    #[error("no readable content found at that address")]
    Extraction,
    #[error("summary request failed: {0}")]
    Api(String),
    #[error("the model returned an empty result")]
    EmptyAnswer,
    #[error("unexpected error: {0}")]
    Internal(String),
}

/// The two capabilities the view depends on. Kept behind a trait so the view
/// treats the backend as opaque and tests can substitute their own.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Fetch a URL and extract its main textual content.
    async fn fetch_content(&self, url: &str) -> Result<String, SummaryError>;

    /// Produce a markdown summary of `content`, optionally steered by a
    /// prompt script.
    async fn generate_summary(
        &self,
        content: &str,
        script: Option<&str>,
    ) -> Result<String, SummaryError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Deserialize)]
struct MessageContent {
    content: String,
}

/// Client for an OpenAI-compatible chat-completions endpoint. Built from a
/// snapshot of the current settings at submission time.
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    path: String,
}

impl OpenAiClient {
    pub fn from_settings(settings: &Settings) -> Self {
        OpenAiClient {
            http: reqwest::Client::new(),
            api_key: settings.api_key.clone(),
            model: settings.api_model.clone(),
            base_url: settings.api_url.clone(),
            path: settings.api_path.clone(),
        }
    }

    fn endpoint(&self) -> String {
        join_endpoint(&self.base_url, &self.path)
    }
}

#[async_trait]
impl Backend for OpenAiClient {
    async fn fetch_content(&self, url: &str) -> Result<String, SummaryError> {
        tracing::info!(url, "fetching page content");

        let res = self
            .http
            .get(url)
            .send()
            .await
            .map_err(SummaryError::Network)?;

        if !res.status().is_success() {
            return Err(SummaryError::HttpStatus(res.status().as_u16()));
        }

        let body = res.text().await.map_err(SummaryError::Network)?;

        // HTML parsing is CPU-bound; keep it off the async threads
        let cleaned = tokio::task::spawn_blocking(move || {
            let text = html2text::from_read(body.as_bytes(), body.len());
            clean_content(&text)
        })
        .await
        .map_err(|e| SummaryError::Internal(e.to_string()))?;

        if cleaned.is_empty() {
            return Err(SummaryError::Extraction);
        }

        Ok(cleaned)
    }

    async fn generate_summary(
        &self,
        content: &str,
        script: Option<&str>,
    ) -> Result<String, SummaryError> {
        let system = script.unwrap_or(crate::settings::DEFAULT_PROMPT);

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content,
                },
            ],
            temperature: 0.5,
        };

        let endpoint = self.endpoint();
        tracing::info!(endpoint, model = %self.model, "requesting summary");

        let res = self
            .http
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| SummaryError::Api(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let detail = res.text().await.unwrap_or_default();
            tracing::warn!(%status, detail, "summary API rejected the request");
            return Err(SummaryError::Api(format!("API returned status {}", status.as_u16())));
        }

        let parsed: ChatResponse = res
            .json()
            .await
            .map_err(|e| SummaryError::Api(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(SummaryError::EmptyAnswer)
    }
}

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static REF_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\d+\]").unwrap());

/// Tidy up html2text output: drop stray markup, drop footnote-reference lines
/// like `[3]: https://...`, and collapse runs of blank lines.
pub fn clean_content(content: &str) -> String {
    let without_tags = TAG_RE.replace_all(content, "");

    let mut result = String::new();
    let mut last_blank = true;

    for line in without_tags.lines() {
        let trimmed = line.trim();

        if trimmed.contains('[') && REF_RE.is_match(trimmed) {
            continue;
        }

        let blank = trimmed.is_empty();
        if blank && last_blank {
            continue;
        }

        if !result.is_empty() {
            result.push('\n');
        }
        result.push_str(trimmed);
        last_blank = blank;
    }

    result.trim().to_string()
}

fn join_endpoint(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_content_strips_markup() {
        let cleaned = clean_content("Hello <b>world</b>\n<div class=\"x\">more</div>");
        assert_eq!(cleaned, "Hello world\nmore");
    }

    #[test]
    fn clean_content_drops_reference_lines() {
        let cleaned = clean_content("A paragraph.\n[1]: https://example.com\nAnother one.");
        assert_eq!(cleaned, "A paragraph.\nAnother one.");
    }

    #[test]
    fn clean_content_collapses_blank_runs() {
        let cleaned = clean_content("first\n\n\n\nsecond\n\nthird");
        assert_eq!(cleaned, "first\n\nsecond\n\nthird");
    }

    #[test]
    fn clean_content_of_whitespace_is_empty() {
        assert_eq!(clean_content("  \n\t\n  "), "");
    }

    #[test]
    fn endpoint_join_handles_trailing_slash() {
        assert_eq!(
            join_endpoint("https://api.openai.com/", "/v1/chat/completions"),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            join_endpoint("https://api.openai.com", "/v1/chat/completions"),
            "https://api.openai.com/v1/chat/completions"
        );
    }
}
