use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const DEFAULT_LLM_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_LLM_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_LLM_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_LLM_MAX_TOKENS: u32 = 500;
pub const DEFAULT_LLM_TIMEOUT: Duration = Duration::from_secs(30);

/// Key shipped in the sample env file; treated as no key at all.
const PLACEHOLDER_API_KEY: &str = "gsk_YOUR_GROQ_API_KEY_HERE";

#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("language model API key is not configured")]
    MissingCredential,
    #[error("language model request timed out after {}s - please try again", .0.as_secs())]
    Timeout(Duration),
    #[error("language model transport error: {0}")]
    Transport(String),
    #[error("language model API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("language model reply was malformed: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_LLM_BASE_URL.to_string(),
            model: DEFAULT_LLM_MODEL.to_string(),
            api_key: None,
            temperature: DEFAULT_LLM_TEMPERATURE,
            max_tokens: DEFAULT_LLM_MAX_TOKENS,
            timeout: DEFAULT_LLM_TIMEOUT,
        }
    }
}

impl LlmSettings {
    /// Usable key, if any. Blank and placeholder keys do not count.
    #[must_use]
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty() && *key != PLACEHOLDER_API_KEY)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
}

/// A chat model that turns a system + user message pair into reply text.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;

    fn model_name(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionReply {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatErrorEnvelope {
    error: ChatErrorBody,
}

#[derive(Debug, Deserialize)]
struct ChatErrorBody {
    message: String,
}

/// Client for any OpenAI-compatible `chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiCompatClient {
    settings: LlmSettings,
    http: reqwest::Client,
}

impl OpenAiCompatClient {
    #[must_use]
    pub fn new(settings: LlmSettings) -> Self {
        Self {
            settings,
            http: reqwest::Client::new(),
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &LlmSettings {
        &self.settings
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompatClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let token = self
            .settings
            .credential()
            .ok_or(CompletionError::MissingCredential)?;
        let body = ChatCompletionBody {
            model: &self.settings.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        let response = self
            .http
            .post(self.endpoint())
            .timeout(self.settings.timeout)
            .header("authorization", format!("Bearer {token}"))
            .json(&body)
            .send()
            .await
            .map_err(|error| {
                if error.is_timeout() {
                    CompletionError::Timeout(self.settings.timeout)
                } else {
                    CompletionError::Transport(error.to_string())
                }
            })?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|error| CompletionError::Transport(error.to_string()))?;
        if !status.is_success() {
            let message = serde_json::from_slice::<ChatErrorEnvelope>(&bytes).map_or_else(
                |_| {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                },
                |envelope| envelope.error.message,
            );
            return Err(CompletionError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let reply: ChatCompletionReply = serde_json::from_slice(&bytes)
            .map_err(|error| CompletionError::MalformedResponse(error.to_string()))?;
        reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                CompletionError::MalformedResponse("reply has no choices[0].message.content".into())
            })
    }

    fn model_name(&self) -> &str {
        &self.settings.model
    }
}
