use thiserror::Error;

use crate::api::{Backend, SummaryError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Url,
    Text,
}

/// One summarization attempt, built from whatever the user typed. Discarded
/// after the result or error is shown.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub mode: InputMode,
    pub input: String,
    pub script: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub original_content: String,
    pub summary_markdown: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("enter a valid URL starting with http or https")]
    InvalidUrl,
    #[error("enter some text to summarize")]
    EmptyText,
    #[error("select a prompt before summarizing")]
    NoScript,
}

/// Check the drafts for the active mode. On success the returned request is
/// ready to hand to [`run`]; on failure no backend call may be made.
pub fn validate(
    mode: InputMode,
    url: &str,
    text: &str,
    script: Option<&str>,
    script_required: bool,
) -> Result<Request, ValidationError> {
    if script_required && script.is_none() {
        return Err(ValidationError::NoScript);
    }

    let input = match mode {
        InputMode::Url => {
            if !url.starts_with("http") {
                return Err(ValidationError::InvalidUrl);
            }
            url.to_string()
        }
        InputMode::Text => {
            if text.trim().is_empty() {
                return Err(ValidationError::EmptyText);
            }
            text.to_string()
        }
    };

    Ok(Request {
        mode,
        input,
        script: script.map(str::to_string),
    })
}

/// The two-step sequence: fetch (URL mode only), then summarize. The second
/// call starts only after the first resolves; a failure in either aborts the
/// attempt with no partial result.
pub async fn run(backend: &dyn Backend, request: Request) -> Result<Outcome, SummaryError> {
    let original_content = match request.mode {
        InputMode::Url => backend.fetch_content(&request.input).await?,
        InputMode::Text => request.input,
    };

    let summary_markdown = backend
        .generate_summary(&original_content, request.script.as_deref())
        .await?;

    Ok(Outcome {
        original_content,
        summary_markdown,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    #[derive(Default)]
    struct MockBackend {
        fetch_calls: AtomicUsize,
        summary_calls: AtomicUsize,
        fetch_result: Option<String>,
        summary_result: Option<String>,
    }

    impl MockBackend {
        fn resolving(fetched: &str, summary: &str) -> Self {
            MockBackend {
                fetch_result: Some(fetched.to_string()),
                summary_result: Some(summary.to_string()),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl Backend for MockBackend {
        async fn fetch_content(&self, _url: &str) -> Result<String, SummaryError> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            self.fetch_result
                .clone()
                .ok_or(SummaryError::HttpStatus(500))
        }

        async fn generate_summary(
            &self,
            _content: &str,
            _script: Option<&str>,
        ) -> Result<String, SummaryError> {
            self.summary_calls.fetch_add(1, Ordering::SeqCst);
            self.summary_result
                .clone()
                .ok_or(SummaryError::Api("boom".to_string()))
        }
    }

    fn url_request(url: &str) -> Request {
        validate(InputMode::Url, url, "", Some("prompt"), true).unwrap()
    }

    #[test]
    fn url_without_scheme_is_rejected() {
        let err = validate(InputMode::Url, "example.com", "", None, false).unwrap_err();
        assert_eq!(err, ValidationError::InvalidUrl);
    }

    #[test]
    fn empty_url_is_rejected() {
        let err = validate(InputMode::Url, "", "", None, false).unwrap_err();
        assert_eq!(err, ValidationError::InvalidUrl);
    }

    #[test]
    fn whitespace_text_is_rejected() {
        let err = validate(InputMode::Text, "", "   \n\t ", None, false).unwrap_err();
        assert_eq!(err, ValidationError::EmptyText);
    }

    #[test]
    fn missing_script_is_rejected_when_required() {
        let err = validate(InputMode::Url, "https://example.com", "", None, true).unwrap_err();
        assert_eq!(err, ValidationError::NoScript);
    }

    #[test]
    fn script_is_optional_when_selection_disabled() {
        let request = validate(InputMode::Url, "https://example.com", "", None, false).unwrap();
        assert_eq!(request.script, None);
    }

    #[tokio::test]
    async fn url_mode_fetches_then_summarizes() {
        let backend = MockBackend::resolving("Hello world", "**Hi**");

        let outcome = run(&backend, url_request("https://example.com"))
            .await
            .unwrap();

        assert_eq!(outcome.original_content, "Hello world");
        assert_eq!(outcome.summary_markdown, "**Hi**");
        assert_eq!(backend.fetch_calls.load(Ordering::SeqCst), 1);
        assert_eq!(backend.summary_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn text_mode_skips_the_fetch() {
        let backend = MockBackend::resolving("unused", "summary");
        let request = validate(InputMode::Text, "", "typed content", Some("p"), true).unwrap();

        let outcome = run(&backend, request).await.unwrap();

        assert_eq!(outcome.original_content, "typed content");
        assert_eq!(outcome.summary_markdown, "summary");
        assert_eq!(backend.fetch_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fetch_failure_prevents_the_summary_call() {
        let backend = MockBackend {
            summary_result: Some("never used".to_string()),
            ..Default::default()
        };

        let err = run(&backend, url_request("https://example.com"))
            .await
            .unwrap_err();

        assert!(matches!(err, SummaryError::HttpStatus(500)));
        assert_eq!(backend.summary_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn summary_failure_surfaces_the_error() {
        let backend = MockBackend {
            fetch_result: Some("content".to_string()),
            ..Default::default()
        };

        let err = run(&backend, url_request("https://example.com"))
            .await
            .unwrap_err();

        assert!(matches!(err, SummaryError::Api(_)));
    }
}
