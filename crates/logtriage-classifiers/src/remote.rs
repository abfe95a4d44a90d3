//! Remote LLM classifier (last-resort tier)
//!
//! Talks to any OpenAI-compatible `/chat/completions` endpoint. The model is
//! asked to answer with exactly one category wrapped in `<category>` tags.
//! Transport errors, non-2xx statuses, and unusable answers are all errors: this
//! tier never invents a label.

use crate::classifier::{ClassificationMetadata, Classifier, ClassifierTier, TierMatch};
use logtriage_core::{Error, Result, UNCLASSIFIED_LABEL};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

/// Confidence attached to every remote answer; the remote model is treated as
/// authoritative when it succeeds
pub const REMOTE_CONFIDENCE: f32 = 1.0;

/// Settings for the remote classifier
#[derive(Debug, Clone)]
pub struct RemoteSettings {
    /// API base URL, without the `/chat/completions` suffix
    pub base_url: String,

    /// Model identifier
    pub model: String,

    /// Bearer token, if the endpoint requires one
    pub api_key: Option<String>,

    /// Categories the model may choose from
    pub categories: Vec<String>,

    pub temperature: f32,

    /// Transport-level timeout; the router enforces its own per-record deadline
    pub request_timeout: Duration,
}

/// Remote LLM classifier
pub struct RemoteClassifier {
    name: String,
    settings: RemoteSettings,
    endpoint: String,
    http_client: reqwest::Client,
    extractor: CategoryExtractor,
}

impl RemoteClassifier {
    /// Create a new remote classifier with a pooled HTTP client
    pub fn new(name: impl Into<String>, settings: RemoteSettings) -> Result<Self> {
        if settings.categories.is_empty() {
            return Err(Error::config("Remote classifier needs at least one category"));
        }

        let http_client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        let endpoint = format!("{}/chat/completions", settings.base_url.trim_end_matches('/'));

        Ok(Self {
            name: name.into(),
            settings,
            endpoint,
            http_client,
            extractor: CategoryExtractor::new()?,
        })
    }

    fn build_prompt(&self, message: &str) -> String {
        let categories = self
            .settings
            .categories
            .iter()
            .map(|c| format!("({})", c))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "Classify the log message into one of these categories: {}.\n\
             If you can't figure out a category, use \"{}\".\n\
             Put the category inside <category> </category> tags.\n\
             Log message: {}",
            categories, UNCLASSIFIED_LABEL, message
        )
    }

    async fn complete(&self, prompt: String) -> Result<String> {
        let body = ChatRequest {
            model: &self.settings.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.settings.temperature,
        };

        let mut request = self.http_client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.settings.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::remote(format!(
                "HTTP {}: {}",
                status.as_u16(),
                truncate(&text, 200)
            )));
        }

        let completion: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::remote(format!("Malformed response body: {}", e)))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::remote("Response contained no choices"))
    }

    fn transport_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Timeout(self.settings.request_timeout.as_millis() as u64)
        } else {
            Error::remote(format!("Request failed: {}", e))
        }
    }
}

#[async_trait::async_trait]
impl Classifier for RemoteClassifier {
    async fn classify(&self, text: &str) -> Result<Option<TierMatch>> {
        let start = Instant::now();

        let content = self.complete(self.build_prompt(text)).await?;
        let label = self.extractor.extract(&content)
            .ok_or_else(|| Error::remote(format!("Unusable answer: {:?}", truncate(&content, 200))))?;

        debug!(classifier = %self.name, label = %label, "Remote classification");

        Ok(Some(TierMatch {
            label,
            score: REMOTE_CONFIDENCE,
            metadata: ClassificationMetadata {
                model: Some(self.settings.model.clone()),
                ..Default::default()
            },
            latency_us: start.elapsed().as_micros() as u64,
        }))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn tier(&self) -> ClassifierTier {
        ClassifierTier::Remote
    }
}

/// Pulls the category out of a model answer
///
/// Reasoning blocks (`<think>...</think>`, or an unterminated `<think>`) are
/// dropped. The contents of the first `<category>` tag win; otherwise the first
/// non-empty line is used.
#[derive(Debug, Clone)]
pub struct CategoryExtractor {
    reasoning: Regex,
    tagged: Regex,
}

impl CategoryExtractor {
    pub fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| Error::config(format!("Invalid answer pattern {:?}: {}", pattern, e)))
        };
        Ok(Self {
            reasoning: compile(r"(?s)<think>.*?(?:</think>|$)")?,
            tagged: compile(r"(?s)<category>(.*?)</category>")?,
        })
    }

    pub fn extract(&self, content: &str) -> Option<String> {
        let visible = self.reasoning.replace_all(content, "");

        let candidate = match self.tagged.captures(&visible) {
            Some(caps) => caps.get(1).map_or("", |m| m.as_str()),
            None => visible.lines().map(str::trim).find(|l| !l.is_empty())?,
        };

        let label = candidate.trim_matches(|c: char| c == '"' || c == '\'' || c == '.' || c.is_whitespace());
        if label.is_empty() {
            None
        } else {
            Some(label.to_string())
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}
