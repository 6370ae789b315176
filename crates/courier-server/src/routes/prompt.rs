use axum::{
    extract::State, http::StatusCode, response::IntoResponse, response::Response, routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error};

use courier::orchestrator::Orchestrator;
use courier::providers::factory;
use courier::session::sse::SseToolHost;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct PromptRequest {
    query: String,
}

#[derive(Debug, Serialize)]
struct PromptResponse {
    response: String,
}

/// Any failure while handling a prompt; rendered as a 500 with a detail body
struct PromptFailure(String);

impl IntoResponse for PromptFailure {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "detail": self.0 })),
        )
            .into_response()
    }
}

async fn prompt_handler(
    State(state): State<AppState>,
    Json(request): Json<PromptRequest>,
) -> Result<Json<PromptResponse>, PromptFailure> {
    debug!(query = %request.query, "processing prompt");

    let provider = factory::get_provider(state.provider_config.clone())
        .map_err(|e| PromptFailure(e.to_string()))?;
    let tool_host = SseToolHost::new(state.tool_host_url.clone());

    let mut orchestrator = Orchestrator::new(provider, Box::new(tool_host));
    if let Some(prompt) = &state.system_prompt {
        orchestrator = orchestrator.with_system_prompt(prompt.clone());
    }

    match orchestrator.process_query(&request.query).await {
        Ok(response) => Ok(Json(PromptResponse { response })),
        Err(e) => {
            error!("Error processing query: {}", e);
            Err(PromptFailure(e.to_string()))
        }
    }
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/prompt", post(prompt_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use courier::providers::configs::{AnthropicProviderConfig, ProviderConfig};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    fn test_state(tool_host_url: &str) -> AppState {
        AppState {
            provider_config: ProviderConfig::Anthropic(AnthropicProviderConfig {
                host: "https://api.anthropic.com".to_string(),
                api_key: "test-key".to_string(),
                model: "claude-3-5-sonnet-20241022".to_string(),
                temperature: None,
                max_tokens: None,
            }),
            tool_host_url: tool_host_url.to_string(),
            system_prompt: None,
        }
    }

    // Minimal in-process tool host: answers the handshake and an empty
    // tools/list over the session protocol.
    async fn spawn_tool_host() -> String {
        use axum::extract::State as HostState;
        use axum::response::sse::{Event, Sse};
        use axum::routing::{get, post as host_post};
        use serde_json::json;
        use std::sync::{Arc, Mutex};
        use tokio::sync::mpsc;
        use tokio_stream::wrappers::ReceiverStream;
        use tokio_stream::StreamExt;

        type Outbox = Arc<Mutex<Option<mpsc::Sender<Event>>>>;

        async fn sse_handler(
            HostState(outbox): HostState<Outbox>,
        ) -> Sse<impl futures::Stream<Item = Result<Event, std::convert::Infallible>>> {
            let (tx, rx) = mpsc::channel(16);
            tx.send(Event::default().event("endpoint").data("/messages"))
                .await
                .unwrap();
            *outbox.lock().unwrap() = Some(tx);
            Sse::new(ReceiverStream::new(rx).map(Ok))
        }

        async fn messages_handler(
            HostState(outbox): HostState<Outbox>,
            Json(body): Json<Value>,
        ) -> StatusCode {
            let id = body["id"].clone();
            let result = match body["method"].as_str().unwrap_or_default() {
                "initialize" => Some(json!({
                    "protocolVersion": "2024-11-05",
                    "capabilities": {"tools": {}},
                    "serverInfo": {"name": "test-tool-host", "version": "0.0.0"}
                })),
                "tools/list" => Some(json!({"tools": []})),
                _ => None,
            };
            if let Some(result) = result {
                let tx = outbox.lock().unwrap().clone();
                if let Some(tx) = tx {
                    let reply = json!({"jsonrpc": "2.0", "id": id, "result": result});
                    let _ = tx
                        .send(Event::default().event("message").data(reply.to_string()))
                        .await;
                }
            }
            StatusCode::ACCEPTED
        }

        let outbox: Outbox = Arc::default();
        let app = Router::new()
            .route("/sse", get(sse_handler))
            .route("/messages", host_post(messages_handler))
            .with_state(outbox);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{addr}/sse")
    }

    #[tokio::test]
    async fn test_prompt_round_trip() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let model_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "msg_123",
                "type": "message",
                "role": "assistant",
                "content": [{"type": "text", "text": "4"}],
                "model": "claude-3-5-sonnet-20241022",
                "stop_reason": "end_turn",
                "usage": {"input_tokens": 12, "output_tokens": 1}
            })))
            .mount(&model_server)
            .await;

        let tool_host_url = spawn_tool_host().await;
        let mut state = test_state(&tool_host_url);
        if let ProviderConfig::Anthropic(ref mut config) = state.provider_config {
            config.host = model_server.uri();
        }

        let app = routes(state);
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/prompt")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"query": "What is 2+2?"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["response"], "4");
    }

    #[tokio::test]
    async fn test_unreachable_tool_host_returns_detail() {
        // Bind and immediately drop a listener so the port is free but closed.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let app = routes(test_state(&format!("http://{addr}/sse")));
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/prompt")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"query": "hello"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert!(json["detail"].is_string());
    }

    #[tokio::test]
    async fn test_malformed_body_is_rejected() {
        let app = routes(test_state("http://127.0.0.1:9/sse"));
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/prompt")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"not_query": "hello"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
