use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, post},
    serve, Json, Router,
};
use minijinja::{path_loader, Environment};
use minijinja_autoreload::AutoReloader;
use serde::Deserialize;
use std::{net::SocketAddr, sync::Arc};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{error, info};

use crate::chat::{ChatService, ConfigStatus, ConnectionTest, Turn};
use crate::config::{AzureOpenAIConfig, RedactedConfig};
use crate::constants;
use crate::error::{ApiError, ValidationError};
use crate::message_log::Message;

// Shared application state
#[derive(Clone)]
pub struct AppState {
    templates: Arc<AutoReloader>,
    chat: Arc<ChatService>,
}

impl AppState {
    pub fn new(chat: Arc<ChatService>) -> Self {
        Self {
            templates: Arc::new(create_minijinja_env(constants::TEMPLATES_DIR.clone())),
            chat,
        }
    }
}

// Minijinja Environment setup
fn create_minijinja_env(templates_dir: String) -> AutoReloader {
    AutoReloader::new(move |notifier| {
        let mut env = Environment::new();
        env.set_loader(path_loader(&templates_dir));
        notifier.watch_path(&templates_dir, true);
        Ok(env)
    })
}

async fn index_handler(State(state): State<AppState>) -> Result<Html<String>, (StatusCode, Html<String>)> {
    let configured = state.chat.config_status().await.configured;
    state
        .templates
        .acquire_env()
        .and_then(|env| {
            env.get_template("index.html").and_then(|tmpl| {
                tmpl.render(minijinja::context! {
                    title => "PE Research Assistant",
                    configured => configured,
                })
            })
        })
        .map(Html)
        .map_err(|e| {
            error!("Failed to get or render template: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(format!("Internal Server Error: {}", e)),
            )
        })
}

// Missing fields become empty strings so they are reported per field.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest {
    #[serde(default)]
    message: String,
    #[serde(default)]
    session_id: String,
}

const CHAT_FIELDS: &[&str] = &["message", "sessionId"];
const CONFIG_FIELDS: &[&str] = &["apiKey", "endpoint", "apiVersion", "deploymentName"];

async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<Turn>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        ApiError::invalid_request(ValidationError::from_json_rejection(&rejection, CHAT_FIELDS))
    })?;
    let turn = state
        .chat
        .submit_query(&request.session_id, &request.message)
        .await
        .map_err(ApiError::invalid_request)?;
    Ok(Json(turn))
}

#[derive(Debug, serde::Serialize)]
struct HistoryResponse {
    messages: Vec<Message>,
}

async fn history_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Json<HistoryResponse> {
    Json(HistoryResponse {
        messages: state.chat.history(&session_id).await,
    })
}

async fn get_config_handler(State(state): State<AppState>) -> Json<ConfigStatus> {
    Json(state.chat.config_status().await)
}

#[derive(Debug, serde::Serialize)]
struct ConfigUpdated {
    message: &'static str,
    config: RedactedConfig,
}

async fn set_config_handler(
    State(state): State<AppState>,
    payload: Result<Json<AzureOpenAIConfig>, JsonRejection>,
) -> Result<Json<ConfigUpdated>, ApiError> {
    let Json(candidate) = payload.map_err(|rejection| {
        ApiError::invalid_configuration(ValidationError::from_json_rejection(
            &rejection,
            CONFIG_FIELDS,
        ))
    })?;
    let config = state.chat.set_config(candidate).await?;
    Ok(Json(ConfigUpdated {
        message: "Azure OpenAI configuration updated successfully",
        config,
    }))
}

async fn test_config_handler(State(state): State<AppState>) -> Json<ConnectionTest> {
    Json(state.chat.test_config().await)
}

/// The full application router. Split out so tests can drive it directly.
pub fn router(state: AppState) -> Router {
    // Serve static files from the `static` directory
    let static_files_service = ServeDir::new(constants::STATIC_DIR.as_str()).not_found_service(
        tower::service_fn(|_: axum::extract::Request| async {
            Ok::<_, std::convert::Infallible>((StatusCode::NOT_FOUND, "Not Found").into_response())
        }),
    );

    Router::new()
        .route("/", get(index_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/chat/:session_id", get(history_handler))
        .route("/api/azure-config", get(get_config_handler).post(set_config_handler))
        .route("/api/azure-config/test", post(test_config_handler))
        .nest_service("/static", static_files_service)
        .with_state(state)
        .layer(TraceLayer::new_for_http()) // Add request logging
}

pub async fn start_web_server(port: u16, chat: Arc<ChatService>) -> Result<()> {
    let app = router(AppState::new(chat));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Web server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context(format!("Failed to bind to address {}", addr))?;

    serve(listener, app.into_make_service())
        .await
        .context("Web server failed")?;

    Ok(())
}
