use pe_research::config::AzureOpenAIConfig;
use pe_research::error::RemoteCompletionError;
use pe_research::llm_interaction::{CompletionClient, CompletionOptions};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const COMPLETIONS_PATH: &str = "/openai/deployments/gpt-4o/chat/completions";

fn config_for(server: &MockServer) -> AzureOpenAIConfig {
    AzureOpenAIConfig {
        api_key: "test-key".to_string(),
        endpoint: server.uri(),
        api_version: "2024-02-15-preview".to_string(),
        deployment_name: "gpt-4o".to_string(),
    }
}

fn completion_body(content: serde_json::Value) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [
            { "index": 0, "finish_reason": "stop", "message": { "role": "assistant", "content": content } }
        ]
    })
}

#[tokio::test]
async fn test_complete_sends_azure_request_and_returns_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .and(query_param("api-version", "2024-02-15-preview"))
        .and(header("api-key", "test-key"))
        .and(body_partial_json(json!({
            "model": "gpt-4o",
            "max_tokens": 1500,
            "messages": [
                { "role": "system", "content": "system prompt" },
                { "role": "user", "content": "Analyze Slack" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(json!("Slack analysis"))))
        .expect(1)
        .mount(&server)
        .await;

    let client = CompletionClient::new(&config_for(&server).validate().unwrap());
    let text = client
        .complete("system prompt", "Analyze Slack", CompletionOptions::default())
        .await
        .unwrap();
    assert_eq!(text, "Slack analysis");
}

#[tokio::test]
async fn test_null_content_and_missing_choices_are_empty() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(json!(null))))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let client = CompletionClient::new(&config_for(&server).validate().unwrap());
    let options = CompletionOptions::default();
    assert_eq!(client.complete("s", "u", options).await.unwrap(), "");
    assert_eq!(client.complete("s", "u", options).await.unwrap(), "");
}

#[tokio::test]
async fn test_provider_error_carries_status_and_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "code": "401", "message": "Access denied due to invalid subscription key." }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = CompletionClient::new(&config_for(&server).validate().unwrap());
    let err = client
        .complete("s", "u", CompletionOptions::default())
        .await
        .unwrap_err();

    assert!(err.is_auth_failure());
    assert_eq!(err.status(), Some(401));
    assert_eq!(err.code(), Some("401"));
    assert!(err.to_string().contains("invalid subscription key"));
}

#[tokio::test]
async fn test_malformed_body_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
        .mount(&server)
        .await;

    let client = CompletionClient::new(&config_for(&server).validate().unwrap());
    let err = client
        .complete("s", "u", CompletionOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteCompletionError::Malformed(_)));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_transport_error() {
    let config = AzureOpenAIConfig {
        api_key: "k".to_string(),
        // Port 9 (discard) on localhost is not listening.
        endpoint: "http://127.0.0.1:9".to_string(),
        api_version: "2024-02-15-preview".to_string(),
        deployment_name: "gpt-4o".to_string(),
    };
    let client = CompletionClient::new(&config.validate().unwrap());
    let err = client
        .complete("s", "u", CompletionOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteCompletionError::Transport(_)));
}

#[tokio::test]
async fn test_reconfigure_switches_deployment() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/deployments/gpt-4o-mini/chat/completions"))
        .and(query_param("api-version", "2024-12-01-preview"))
        .and(header("api-key", "new-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(json!("from mini"))))
        .expect(1)
        .mount(&server)
        .await;

    let client = CompletionClient::new(&config_for(&server).validate().unwrap());
    let updated = AzureOpenAIConfig {
        api_key: "new-key".to_string(),
        api_version: "2024-12-01-preview".to_string(),
        deployment_name: "gpt-4o-mini".to_string(),
        ..config_for(&server)
    };
    client.reconfigure(&updated.validate().unwrap()).await;

    let text = client
        .complete("s", "u", CompletionOptions::default())
        .await
        .unwrap();
    assert_eq!(text, "from mini");
}
