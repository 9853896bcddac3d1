use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::LlmSettings;
use crate::errors::LlmError;

/// One chat-completion call: a system/user message pair plus its limits.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub max_tokens: u32,
    pub timeout: Duration,
}

/// Trait for LLM providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a completion for a system/user prompt pair
    async fn generate_completion(&self, request: CompletionRequest) -> Result<String, LlmError>;
}

/// OpenAI-compatible chat completion structures
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize, Clone)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

/// DeepSeek chat-completions provider
pub struct DeepSeekProvider {
    api_key: String,
    api_url: String,
    model: String,
    temperature: f32,
    client: Client,
}

impl DeepSeekProvider {
    pub fn new(api_key: String, settings: &LlmSettings) -> Self {
        Self {
            api_key,
            api_url: settings.api_url.clone(),
            model: settings.model.clone(),
            temperature: settings.temperature,
            client: Client::new(),
        }
    }

    async fn call_api(&self, body: &ChatRequest, timeout: Duration) -> Result<ChatResponse, LlmError> {
        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status();

        if status == 429 {
            return Err(LlmError::RateLimited);
        }

        if !status.is_success() {
            let error_text = response.text().await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LlmError::ApiError(format!("HTTP {}: {}", status, error_text)));
        }

        response.json::<ChatResponse>()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::InvalidResponse(e.to_string())
                }
            })
    }
}

#[async_trait]
impl LlmProvider for DeepSeekProvider {
    async fn generate_completion(&self, request: CompletionRequest) -> Result<String, LlmError> {
        info!(
            "Requesting LLM completion (model: {}, max_tokens: {}, timeout: {:?})",
            self.model, request.max_tokens, request.timeout
        );

        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage { role: "system", content: request.system_prompt },
                ChatMessage { role: "user", content: request.user_prompt },
            ],
            max_tokens: request.max_tokens,
            temperature: self.temperature,
        };

        let response = self.call_api(&body, request.timeout).await?;

        let content = response.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("No choices in response".to_string()))?;

        if let Some(usage) = response.usage {
            info!("LLM completion generated. Tokens: {} prompt + {} completion = {} total",
                  usage.prompt_tokens, usage.completion_tokens, usage.total_tokens);
        }

        Ok(content)
    }
}

/// Optional LLM backend. Without a credential every call is `Disabled`.
#[derive(Clone)]
pub struct LlmService {
    provider: Option<Arc<dyn LlmProvider>>,
}

impl LlmService {
    pub fn new(settings: &LlmSettings) -> Self {
        let provider = match settings.api_key.as_deref().map(str::trim) {
            Some(key) if settings.has_credential() => {
                info!("Initializing LLM service (model: {})", settings.model);
                let provider: Arc<dyn LlmProvider> =
                    Arc::new(DeepSeekProvider::new(key.to_string(), settings));
                Some(provider)
            }
            _ => {
                warn!("DEEPSEEK_API_KEY not configured. AI analysis runs in fallback mode.");
                None
            }
        };

        Self { provider }
    }

    pub fn with_provider(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider: Some(provider) }
    }

    pub fn disabled() -> Self {
        Self { provider: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    pub async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        let provider = self.provider.as_ref()
            .ok_or(LlmError::Disabled)?;

        provider.generate_completion(request).await.map_err(|e| {
            error!("LLM completion failed: {}", e);
            e
        })
    }
}
