//! Completion backends.
//!
//! The runner only sees the [`CompletionClient`] trait. [`HttpCompletionClient`]
//! speaks the OpenAI chat-completions wire format, which covers OpenAI, Ollama,
//! vLLM, Groq, OpenRouter and most hosted gateways, plus the Anthropic
//! messages API.

use crate::error::{Result, SecbenchError};
use crate::types::{Question, TokenUsage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::time::Duration;

pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a cybersecurity expert. Answer only with the correct letter choices.";

pub const DEFAULT_INSTRUCTION: &str =
    "Select ALL correct answers. Respond ONLY with letters A-D.\nFormat: ANSWER: AC";

const ANTHROPIC_VERSION: &str = "2023-06-01";
// The messages API rejects requests without max_tokens.
const ANTHROPIC_DEFAULT_MAX_TOKENS: u32 = 4096;

/// Optional sampling parameters. Only the ones that are set reach the wire.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct SamplingParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
}

impl SamplingParams {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// The parameters that are set, in declaration order.
    pub fn entries(&self) -> Vec<(&'static str, Value)> {
        let mut out = Vec::new();
        if let Some(v) = self.temperature {
            out.push(("temperature", json!(v)));
        }
        if let Some(v) = self.max_tokens {
            out.push(("max_tokens", json!(v)));
        }
        if let Some(v) = self.top_p {
            out.push(("top_p", json!(v)));
        }
        if let Some(v) = self.top_k {
            out.push(("top_k", json!(v)));
        }
        if let Some(v) = self.frequency_penalty {
            out.push(("frequency_penalty", json!(v)));
        }
        if let Some(v) = self.presence_penalty {
            out.push(("presence_penalty", json!(v)));
        }
        out
    }
}

impl fmt::Display for SamplingParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .entries()
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

/// A single chat request: one system turn and one user turn.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub system_prompt: String,
    pub user_prompt: String,
    pub params: SamplingParams,
}

impl CompletionRequest {
    pub fn for_question(
        question: &Question,
        instruction: &str,
        system_prompt: &str,
        model: &str,
        params: SamplingParams,
    ) -> Self {
        Self {
            model: model.to_string(),
            system_prompt: system_prompt.to_string(),
            user_prompt: build_user_prompt(question, instruction),
            params,
        }
    }
}

pub fn build_user_prompt(question: &Question, instruction: &str) -> String {
    let mut prompt = format!("{}\n{}", question.question, instruction);
    if !question.choices.is_empty() {
        prompt.push_str("\nChoices:\n");
        prompt.push_str(&question.choices);
    }
    prompt
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Completion {
    /// `None` when the backend answered without any text content.
    pub text: Option<String>,
    pub usage: TokenUsage,
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    OpenAiChat,
    AnthropicMessages,
}

/// Where and how to reach a backend.
#[derive(Clone)]
pub struct BackendSettings {
    pub provider: String,
    pub api_base: Option<String>,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl fmt::Debug for BackendSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendSettings")
            .field("provider", &self.provider)
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl BackendSettings {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            api_base: None,
            api_key: None,
            timeout: Duration::from_secs(120),
        }
    }

    pub fn wire_format(&self) -> WireFormat {
        match self.provider.to_ascii_lowercase().as_str() {
            "anthropic" => WireFormat::AnthropicMessages,
            _ => WireFormat::OpenAiChat,
        }
    }

    fn base_url(&self) -> Result<String> {
        if let Some(base) = self.api_base.as_deref().filter(|b| !b.trim().is_empty()) {
            return Ok(base.trim().trim_end_matches('/').to_string());
        }
        default_base_url(&self.provider)
            .map(String::from)
            .ok_or_else(|| {
                SecbenchError::Completion(format!(
                    "no API base configured for backend '{}' (set {}_API_BASE)",
                    self.provider,
                    self.provider.to_ascii_uppercase()
                ))
            })
    }

    /// Full request URL for this backend.
    pub fn endpoint_url(&self) -> Result<String> {
        let base = self.base_url()?;
        let url = match self.wire_format() {
            WireFormat::AnthropicMessages => format!("{}/messages", versioned(&base)),
            WireFormat::OpenAiChat if self.provider.eq_ignore_ascii_case("ollama") => {
                format!("{}/chat/completions", versioned(&base))
            }
            WireFormat::OpenAiChat => format!("{base}/chat/completions"),
        };
        Ok(url)
    }
}

fn default_base_url(provider: &str) -> Option<&'static str> {
    match provider.to_ascii_lowercase().as_str() {
        "openai" => Some("https://api.openai.com/v1"),
        "anthropic" => Some("https://api.anthropic.com/v1"),
        "ollama" => Some("http://localhost:11434/v1"),
        "groq" => Some("https://api.groq.com/openai/v1"),
        "openrouter" => Some("https://openrouter.ai/api/v1"),
        "deepseek" => Some("https://api.deepseek.com/v1"),
        "mistral" => Some("https://api.mistral.ai/v1"),
        "xai" => Some("https://api.x.ai/v1"),
        _ => None,
    }
}

fn versioned(base: &str) -> String {
    if base.ends_with("/v1") {
        base.to_string()
    } else {
        format!("{base}/v1")
    }
}

pub struct HttpCompletionClient {
    settings: BackendSettings,
    url: String,
    client: reqwest::Client,
}

impl HttpCompletionClient {
    pub fn new(settings: BackendSettings) -> Result<Self> {
        let url = settings.endpoint_url()?;
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;
        Ok(Self {
            settings,
            url,
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn openai_body(&self, request: &CompletionRequest) -> Value {
        let mut body = Map::new();
        body.insert("model".into(), json!(request.model));
        body.insert(
            "messages".into(),
            json!([
                {"role": "system", "content": request.system_prompt},
                {"role": "user", "content": request.user_prompt},
            ]),
        );
        for (key, value) in request.params.entries() {
            body.insert(key.into(), value);
        }
        Value::Object(body)
    }

    fn anthropic_body(&self, request: &CompletionRequest) -> Value {
        let mut body = Map::new();
        body.insert("model".into(), json!(request.model));
        body.insert("system".into(), json!(request.system_prompt));
        body.insert(
            "messages".into(),
            json!([{"role": "user", "content": request.user_prompt}]),
        );
        body.insert(
            "max_tokens".into(),
            json!(request
                .params
                .max_tokens
                .unwrap_or(ANTHROPIC_DEFAULT_MAX_TOKENS)),
        );
        for (key, value) in request.params.entries() {
            match key {
                "temperature" | "top_p" | "top_k" => {
                    body.insert(key.into(), value);
                }
                "max_tokens" => {}
                _ => tracing::debug!(param = key, "parameter not supported by anthropic, skipped"),
            }
        }
        Value::Object(body)
    }

    async fn send(&self, body: &Value) -> Result<Value> {
        let mut req = self.client.post(&self.url).json(body);
        match self.settings.wire_format() {
            WireFormat::OpenAiChat => {
                if let Some(key) = &self.settings.api_key {
                    req = req.bearer_auth(key);
                }
            }
            WireFormat::AnthropicMessages => {
                req = req.header("anthropic-version", ANTHROPIC_VERSION);
                if let Some(key) = &self.settings.api_key {
                    req = req.header("x-api-key", key);
                }
            }
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(SecbenchError::Completion(format!(
                "{status} from {}: {}",
                self.url,
                truncate(&text, 300)
            )));
        }
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        match self.settings.wire_format() {
            WireFormat::OpenAiChat => {
                let json = self.send(&self.openai_body(request)).await?;
                Ok(parse_openai_response(&json))
            }
            WireFormat::AnthropicMessages => {
                let json = self.send(&self.anthropic_body(request)).await?;
                Ok(parse_anthropic_response(&json))
            }
        }
    }
}

fn parse_openai_response(json: &Value) -> Completion {
    let text = json
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .map(String::from);
    let usage = json.get("usage");
    Completion {
        text,
        usage: TokenUsage {
            input_tokens: usage_field(usage, "prompt_tokens"),
            output_tokens: usage_field(usage, "completion_tokens"),
        },
    }
}

fn parse_anthropic_response(json: &Value) -> Completion {
    let parts: Vec<&str> = json
        .get("content")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|block| block.get("text").and_then(Value::as_str))
        .collect();
    let usage = json.get("usage");
    Completion {
        text: if parts.is_empty() {
            None
        } else {
            Some(parts.concat())
        },
        usage: TokenUsage {
            input_tokens: usage_field(usage, "input_tokens"),
            output_tokens: usage_field(usage, "output_tokens"),
        },
    }
}

fn usage_field(usage: Option<&Value>, name: &str) -> u64 {
    usage
        .and_then(|u| u.get(name))
        .and_then(Value::as_u64)
        .unwrap_or(0)
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_prompt_includes_choices_when_present() {
        let q = Question::new("Which port does SSH use?", "A: 21\nB: 22", "B");
        let prompt = build_user_prompt(&q, "Answer with letters.");
        assert_eq!(
            prompt,
            "Which port does SSH use?\nAnswer with letters.\nChoices:\nA: 21\nB: 22"
        );

        let bare = Question::new("Pick one", "", "A");
        assert_eq!(build_user_prompt(&bare, "Go"), "Pick one\nGo");
    }

    #[test]
    fn only_set_params_are_listed() {
        let params = SamplingParams {
            temperature: Some(0.0),
            top_k: Some(40),
            ..Default::default()
        };
        let keys: Vec<&str> = params.entries().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["temperature", "top_k"]);
        assert_eq!(params.to_string(), "temperature=0.0, top_k=40");
        assert!(SamplingParams::default().is_empty());
        assert!(SamplingParams::default().entries().is_empty());
    }

    #[test]
    fn endpoint_urls_per_provider() {
        let mut s = BackendSettings::new("openai");
        assert_eq!(
            s.endpoint_url().unwrap(),
            "https://api.openai.com/v1/chat/completions"
        );

        s = BackendSettings::new("ollama");
        s.api_base = Some("http://gpu-box:11434/".into());
        assert_eq!(
            s.endpoint_url().unwrap(),
            "http://gpu-box:11434/v1/chat/completions"
        );

        s = BackendSettings::new("anthropic");
        assert_eq!(
            s.endpoint_url().unwrap(),
            "https://api.anthropic.com/v1/messages"
        );

        s = BackendSettings::new("vllm");
        assert!(s.endpoint_url().is_err());
        s.api_base = Some("http://127.0.0.1:8000/v1".into());
        assert_eq!(
            s.endpoint_url().unwrap(),
            "http://127.0.0.1:8000/v1/chat/completions"
        );
    }

    #[test]
    fn debug_output_redacts_key() {
        let mut s = BackendSettings::new("openai");
        s.api_key = Some("sk-secret".into());
        let dbg = format!("{s:?}");
        assert!(!dbg.contains("sk-secret"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn parses_openai_and_anthropic_payloads() {
        let openai = json!({
            "choices": [{"message": {"content": "ANSWER: B"}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3}
        });
        let c = parse_openai_response(&openai);
        assert_eq!(c.text.as_deref(), Some("ANSWER: B"));
        assert_eq!(c.usage.input_tokens, 12);
        assert_eq!(c.usage.output_tokens, 3);

        let no_usage = parse_openai_response(&json!({"choices": [{"message": {"content": null}}]}));
        assert_eq!(no_usage.text, None);
        assert_eq!(no_usage.usage, TokenUsage::default());

        let anthropic = json!({
            "content": [{"type": "text", "text": "ANSWER: "}, {"type": "text", "text": "CD"}],
            "usage": {"input_tokens": 20, "output_tokens": 4}
        });
        let c = parse_anthropic_response(&anthropic);
        assert_eq!(c.text.as_deref(), Some("ANSWER: CD"));
        assert_eq!(c.usage.output_tokens, 4);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("hi", 10), "hi");
    }
}
