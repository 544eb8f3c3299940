pub mod chat;
pub mod config;
pub mod constants;
pub mod error;
pub mod fallback;
pub mod llm_interaction;
pub mod message_log;
pub mod web_server;

use std::path::PathBuf;
use std::sync::Arc;

use chat::{ChatService, ResponseOrchestrator};
use config::{standard_sources, ConfigStore};
use message_log::MessageLog;

/// Builds the chat service from the standard configuration chain.
pub async fn build_chat_service(config_file: impl Into<PathBuf>) -> ChatService {
    let config_file = config_file.into();
    let store = Arc::new(ConfigStore::load(&standard_sources(&config_file), config_file));
    let orchestrator = ResponseOrchestrator::new(store).await;
    ChatService::new(orchestrator, MessageLog::new())
}
