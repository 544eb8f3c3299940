use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, error, instrument};

use crate::config::ValidatedConfig;
use crate::error::RemoteCompletionError;

/// Sampling parameters for one completion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            max_tokens: 1500,
            temperature: 0.7,
        }
    }
}

// Structures matching Azure OpenAI's chat/completions endpoint
#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize, Debug)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Deserialize, Debug)]
struct ResponseMessage {
    content: Option<String>,
}

// Azure wraps failures as {"error": {"code": ..., "message": ...}}
#[derive(Deserialize, Debug)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize, Debug)]
struct ErrorBody {
    code: Option<serde_json::Value>,
    message: Option<String>,
}

/// Thin wrapper over one Azure OpenAI chat-completion call. No retries.
pub struct CompletionClient {
    http: Client,
    target: RwLock<ValidatedConfig>,
}

impl CompletionClient {
    pub fn new(config: &ValidatedConfig) -> Self {
        Self::with_http_client(Client::new(), config)
    }

    pub fn with_http_client(http: Client, config: &ValidatedConfig) -> Self {
        Self {
            http,
            target: RwLock::new(config.clone()),
        }
    }

    /// Points subsequent calls at a new deployment. Calls already in flight
    /// keep the target they started with.
    pub async fn reconfigure(&self, config: &ValidatedConfig) {
        *self.target.write().await = config.clone();
        debug!(config = ?config.get(), "Completion client reconfigured");
    }

    pub async fn target(&self) -> ValidatedConfig {
        self.target.read().await.clone()
    }

    #[instrument(skip(self, system_prompt, user_message), fields(user_message_len = user_message.len()))]
    pub async fn complete(
        &self,
        system_prompt: &str,
        user_message: &str,
        options: CompletionOptions,
    ) -> Result<String, RemoteCompletionError> {
        let target = self.target().await;
        let url = completions_url(&target);

        let request_payload = ChatCompletionRequest {
            model: &target.deployment_name,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_message,
                },
            ],
            max_tokens: options.max_tokens,
            temperature: options.temperature,
        };

        debug!(%url, deployment = %target.deployment_name, "Sending chat completion request");

        let response = self
            .http
            .post(&url)
            .query(&[("api-version", target.api_version.as_str())])
            .header("api-key", &target.api_key)
            .json(&request_payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let err = provider_error(status.as_u16(), &error_body);
            error!(%status, error = %err, "Azure OpenAI request failed");
            return Err(err);
        }

        let body = response.text().await?;
        let parsed: ChatCompletionResponse = serde_json::from_str(&body)
            .map_err(|e| RemoteCompletionError::Malformed(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .unwrap_or_default();

        debug!(response_len = content.len(), "Received chat completion");
        Ok(content)
    }
}

fn completions_url(config: &ValidatedConfig) -> String {
    format!(
        "{}/openai/deployments/{}/chat/completions",
        config.endpoint.trim_end_matches('/'),
        config.deployment_name
    )
}

fn provider_error(status: u16, body: &str) -> RemoteCompletionError {
    let (code, message) = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => (
            envelope.error.code.map(|c| match c {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            }),
            envelope.error.message,
        ),
        Err(_) => (None, None),
    };

    let message = message.unwrap_or_else(|| {
        if body.trim().is_empty() {
            "Unknown error".to_string()
        } else {
            body.trim().to_string()
        }
    });

    RemoteCompletionError::Provider {
        status,
        code,
        message,
    }
}
