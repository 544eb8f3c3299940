// Chat logic shared by the web UI and the terminal chat: the response
// orchestrator (remote model first, canned fallback otherwise) and the
// service that records each turn in the message log.

use std::sync::Arc;

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use crate::config::{AzureOpenAIConfig, ConfigStore, RedactedConfig};
use crate::error::{ConfigError, FieldError, ValidationError};
use crate::fallback::fallback;
use crate::llm_interaction::{CompletionClient, CompletionOptions};
use crate::message_log::{Message, MessageLog, Role};

pub const SYSTEM_PROMPT: &str = "\
You are a specialized Private Equity research analyst and assistant. Your role is to provide comprehensive, professional analysis on PE-related topics including:

- Company analysis and PE involvement history
- Market intelligence and investment opportunities
- Financial performance analysis and benchmarking
- Deal sourcing and acquisition targets
- Due diligence insights and risk assessment
- Sector-specific PE trends and valuations

Provide detailed, data-driven responses with specific metrics, multiples, and market insights where relevant. Structure your responses professionally with clear headings, bullet points, and actionable insights. Focus on practical information that PE professionals would find valuable for investment decisions.

IMPORTANT: Do NOT use markdown formatting in your responses. Avoid using **bold**, *italic*, ### headers, or any markdown symbols. Use plain text with hyphens (-) for lists and simple text formatting. Keep responses clean and readable without any markdown clutter.

If asked about non-PE topics, still provide helpful information but try to relate it back to PE investment considerations when possible.";

/// Returned when the model answers with nothing.
pub const EMPTY_COMPLETION_REPLY: &str =
    "I apologize, but I couldn't generate a response. Please try asking your question again.";

const TEST_PROMPT: &str =
    "Hello, this is a test message. Please respond with 'Connection successful'.";
const TEST_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    /// A completion client is configured.
    Ready,
    /// No usable client; every answer comes from the fallback table.
    Degraded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionTest {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
}

/// Picks between the remote model and the canned fallback for each query.
pub struct ResponseOrchestrator {
    config: Arc<ConfigStore>,
    client: RwLock<Option<Arc<CompletionClient>>>,
}

impl ResponseOrchestrator {
    pub async fn new(config: Arc<ConfigStore>) -> Self {
        let client = match config.validated().await {
            Some(valid) => {
                info!("Azure OpenAI client initialized");
                Some(Arc::new(CompletionClient::new(&valid)))
            }
            None => {
                warn!("Azure OpenAI client not configured. Using fallback responses.");
                None
            }
        };
        Self::with_client(config, client)
    }

    /// Uses a pre-built client, e.g. one with a custom `reqwest::Client`.
    pub fn with_client(config: Arc<ConfigStore>, client: Option<Arc<CompletionClient>>) -> Self {
        Self {
            config,
            client: RwLock::new(client),
        }
    }

    pub async fn state(&self) -> OrchestratorState {
        if self.client.read().await.is_some() {
            OrchestratorState::Ready
        } else {
            OrchestratorState::Degraded
        }
    }

    pub fn config(&self) -> &Arc<ConfigStore> {
        &self.config
    }

    async fn client(&self) -> Option<Arc<CompletionClient>> {
        self.client.read().await.clone()
    }

    /// Always returns text. Remote failures are logged and answered from the
    /// fallback table for this call only.
    #[instrument(skip(self, query), fields(query_len = query.len()))]
    pub async fn generate_response(&self, query: &str) -> String {
        let Some(client) = self.client().await else {
            return fallback(query).to_string();
        };

        match client
            .complete(SYSTEM_PROMPT, query, CompletionOptions::default())
            .await
        {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => EMPTY_COMPLETION_REPLY.to_string(),
            Err(e) => {
                warn!(
                    error = %e,
                    status = ?e.status(),
                    code = ?e.code(),
                    "Azure OpenAI API error, answering from fallback"
                );
                fallback(query).to_string()
            }
        }
    }

    /// Validates and stores a new configuration, then points the client at it.
    pub async fn apply_config(&self, candidate: AzureOpenAIConfig) -> Result<RedactedConfig, ConfigError> {
        let valid = self.config.update(candidate).await?;

        // Point the client at whatever the store holds now, which may already
        // be a later update than ours.
        let mut slot = self.client.write().await;
        let live = self.config.validated().await.unwrap_or_else(|| valid.clone());
        match slot.clone() {
            Some(client) => client.reconfigure(&live).await,
            None => {
                info!("Azure OpenAI client initialized from updated configuration");
                *slot = Some(Arc::new(CompletionClient::new(&live)));
            }
        }
        Ok(valid.redacted())
    }

    /// One real completion against the current configuration.
    pub async fn test_connection(&self) -> ConnectionTest {
        let Some(client) = self.client().await else {
            return ConnectionTest {
                success: false,
                message: "Azure OpenAI is not configured - using fallback responses".to_string(),
                response: None,
            };
        };

        match client
            .complete(SYSTEM_PROMPT, TEST_PROMPT, CompletionOptions::default())
            .await
        {
            Ok(text) => ConnectionTest {
                success: true,
                message: "Azure OpenAI connection test successful".to_string(),
                response: Some(preview(&text)),
            },
            Err(e) => {
                warn!(error = %e, "Azure OpenAI connection test failed");
                ConnectionTest {
                    success: false,
                    message: format!("Azure OpenAI connection test failed: {e}"),
                    response: None,
                }
            }
        }
    }
}

fn preview(text: &str) -> String {
    let mut out: String = text.chars().take(TEST_PREVIEW_CHARS).collect();
    out.push_str("...");
    out
}

/// The two records produced by one chat turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    pub user_message: Message,
    pub assistant_message: Message,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigStatus {
    pub configured: bool,
    pub config: RedactedConfig,
}

/// Entry point for chat turns and configuration admin.
pub struct ChatService {
    orchestrator: ResponseOrchestrator,
    log: MessageLog,
}

impl ChatService {
    pub fn new(orchestrator: ResponseOrchestrator, log: MessageLog) -> Self {
        Self { orchestrator, log }
    }

    pub fn orchestrator(&self) -> &ResponseOrchestrator {
        &self.orchestrator
    }

    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    pub async fn submit_query(&self, session_id: &str, text: &str) -> Result<Turn, ValidationError> {
        let mut errors = Vec::new();
        if text.trim().is_empty() {
            errors.push(FieldError::new("message", "Message cannot be empty"));
        }
        if session_id.trim().is_empty() {
            errors.push(FieldError::new("sessionId", "Session ID is required"));
        }
        if !errors.is_empty() {
            return Err(ValidationError { errors });
        }

        let user_message = self.log.append(session_id, Role::User, text).await;
        let answer = self.orchestrator.generate_response(text).await;
        let assistant_message = self.log.append(session_id, Role::Assistant, answer).await;

        Ok(Turn {
            user_message,
            assistant_message,
        })
    }

    pub async fn history(&self, session_id: &str) -> Vec<Message> {
        self.log.list_by_session(session_id).await
    }

    pub async fn config_status(&self) -> ConfigStatus {
        let store = self.orchestrator.config();
        ConfigStatus {
            configured: store.is_configured().await,
            config: store.redacted().await,
        }
    }

    pub async fn set_config(&self, candidate: AzureOpenAIConfig) -> Result<RedactedConfig, ConfigError> {
        self.orchestrator.apply_config(candidate).await
    }

    pub async fn test_config(&self) -> ConnectionTest {
        self.orchestrator.test_connection().await
    }
}

/// Interactive terminal chat over stdin/stdout. Ends on EOF, `exit` or `quit`.
pub async fn run_terminal_chat(service: &ChatService, session_id: &str) -> anyhow::Result<()> {
    info!(session_id, "Starting terminal chat...");
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    stdout
        .write_all(b"PE research assistant. Type 'exit' to quit.\n> ")
        .await?;
    stdout.flush().await?;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }
        if !line.is_empty() {
            let turn = service.submit_query(session_id, line).await?;
            stdout
                .write_all(format!("\n{}\n\n", turn.assistant_message.content).as_bytes())
                .await?;
        }
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
    }
    Ok(())
}
