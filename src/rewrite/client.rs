//! Rewrite API Client
//!
//! Direct HTTP client for an OpenAI-compatible chat completions endpoint.
//! Uses reqwest instead of third-party wrapper crates for stability and
//! full control over timeouts and error handling.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Model used when REDLINE_MODEL is not set
pub const DEFAULT_MODEL: &str = "gpt-4.1";
/// Endpoint used when REDLINE_BASE_URL is not set
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Response bound per call: the longest acceptable chunk plus margin
const MAX_RESPONSE_TOKENS: u32 = 2000;
/// Low randomness keeps repeated rewrites of identical input near-identical
const TEMPERATURE: f64 = 0.3;

const PROOFREAD_INSTRUCTION: &str = "\
You are an expert proofreader and editor. Your task is to:

1. Correct spelling, grammar, and punctuation errors
2. Improve sentence structure and clarity
3. Ensure consistent style and tone
4. Fix any awkward phrasing
5. Maintain the original meaning and intent
6. Preserve the original formatting and structure

Rules:
- Only make necessary corrections and improvements
- Do not change the fundamental meaning or style unless there are clear errors
- Maintain the same paragraph structure
- If the text is already well-written, make minimal or no changes
- Return only the corrected text, no explanations or comments
- Preserve any intentional formatting like line breaks";

const SUGGESTIONS_INSTRUCTION: &str = "\
You are an expert proofreader. Proofread the text and return your response in JSON format with:
- \"corrected\": the corrected version of the text
- \"suggestions\": an array of objects with \"original\", \"corrected\", and \"reason\" for each change

Only suggest necessary corrections for grammar, spelling, punctuation, and clarity.
Maintain the original meaning and style. If no changes are needed, return the original text with an empty suggestions array.";

#[derive(Error, Debug)]
pub enum RewriteError {
    #[error("OPENAI_API_KEY is not set")]
    MissingApiKey,
    #[error("rewrite HTTP error: {0}")]
    Http(String),
    #[error("rewrite call failed ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("deserialization error: {0}")]
    Deserialize(String),
}

impl Serialize for RewriteError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl From<reqwest::Error> for RewriteError {
    fn from(e: reqwest::Error) -> Self {
        RewriteError::Http(e.to_string())
    }
}

/// Chat completion response, reduced to the fields we read
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// One suggested change from the structured rewrite mode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub original: String,
    pub corrected: String,
    pub reason: String,
}

/// Result of the structured rewrite mode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewriteSuggestions {
    #[serde(default)]
    pub corrected: String,
    #[serde(default)]
    pub suggestions: Vec<Suggestion>,
}

/// Rewrite API configuration, sourced from the environment
#[derive(Debug, Clone)]
pub struct RewriteConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl RewriteConfig {
    /// Read configuration from the environment.
    ///
    /// A missing or empty OPENAI_API_KEY is fatal: processing must not
    /// start without a credential.
    pub fn from_env() -> Result<Self, RewriteError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or(RewriteError::MissingApiKey)?;
        let model =
            std::env::var("REDLINE_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let base_url =
            std::env::var("REDLINE_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Ok(Self {
            api_key,
            model,
            base_url,
        })
    }
}

/// Rewrite HTTP client
#[derive(Clone)]
pub struct RewriteClient {
    http: Client,
    config: RewriteConfig,
}

impl RewriteClient {
    pub fn new(config: RewriteConfig) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { http, config }
    }

    pub fn from_env() -> Result<Self, RewriteError> {
        Ok(Self::new(RewriteConfig::from_env()?))
    }

    /// Rewrite a chunk of text.
    ///
    /// Empty or missing completion content returns the input unchanged: a
    /// proofreading pass must never replace user text with nothing. Call
    /// failures are returned as errors for the caller to absorb.
    pub async fn rewrite(&self, text: &str) -> Result<String, RewriteError> {
        let body = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": PROOFREAD_INSTRUCTION },
                { "role": "user", "content": format!("Please proofread and improve this text:\n\n{}", text) },
            ],
            "temperature": TEMPERATURE,
            "max_tokens": MAX_RESPONSE_TOKENS,
        });

        match self.send_chat(body).await? {
            Some(content) if !content.trim().is_empty() => Ok(content.trim().to_string()),
            _ => {
                warn!("Rewrite returned empty content, keeping original text");
                Ok(text.to_string())
            }
        }
    }

    /// Rewrite a text and return the corrected version with per-change
    /// suggestions (structured JSON mode).
    pub async fn rewrite_with_suggestions(
        &self,
        text: &str,
    ) -> Result<RewriteSuggestions, RewriteError> {
        let body = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": SUGGESTIONS_INSTRUCTION },
                { "role": "user", "content": format!("Proofread this text: {}", text) },
            ],
            "response_format": { "type": "json_object" },
            "temperature": TEMPERATURE,
            "max_tokens": MAX_RESPONSE_TOKENS,
        });

        let content = self.send_chat(body).await?.unwrap_or_default();
        if content.trim().is_empty() {
            warn!("Structured rewrite returned empty content, keeping original text");
            return Ok(RewriteSuggestions {
                corrected: text.to_string(),
                suggestions: Vec::new(),
            });
        }

        let mut parsed: RewriteSuggestions = serde_json::from_str(&content)
            .map_err(|e| RewriteError::Deserialize(format!("{}: {}", e, content)))?;
        if parsed.corrected.trim().is_empty() {
            parsed.corrected = text.to_string();
        }
        Ok(parsed)
    }

    /// Issue one chat completion call and return the first choice's content
    async fn send_chat(&self, body: Value) -> Result<Option<String>, RewriteError> {
        debug!(model = %self.config.model, "Issuing rewrite call");
        let resp = self
            .http
            .post(format!(
                "{}/chat/completions",
                self.config.base_url.trim_end_matches('/')
            ))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            error!(status = %status, body = %text, "Rewrite HTTP error");
            return Err(RewriteError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| RewriteError::Deserialize(e.to_string()))?;
        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env_requires_key() {
        // Single test touching the key to avoid races with parallel tests
        std::env::remove_var("OPENAI_API_KEY");
        assert!(matches!(
            RewriteConfig::from_env(),
            Err(RewriteError::MissingApiKey)
        ));

        std::env::set_var("OPENAI_API_KEY", "   ");
        assert!(matches!(
            RewriteConfig::from_env(),
            Err(RewriteError::MissingApiKey)
        ));

        std::env::set_var("OPENAI_API_KEY", "sk-test");
        let config = RewriteConfig::from_env().unwrap();
        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        std::env::remove_var("OPENAI_API_KEY");
    }

    #[test]
    fn test_suggestions_parse_defaults() {
        let parsed: RewriteSuggestions = serde_json::from_str("{}").unwrap();
        assert!(parsed.corrected.is_empty());
        assert!(parsed.suggestions.is_empty());

        let parsed: RewriteSuggestions = serde_json::from_str(
            r#"{"corrected": "The cat.", "suggestions": [{"original": "Teh", "corrected": "The", "reason": "spelling"}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.corrected, "The cat.");
        assert_eq!(parsed.suggestions.len(), 1);
    }
}
