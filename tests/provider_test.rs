//! Provider wire formats, error mapping and post-processing, tested against
//! local mock HTTP servers.

use std::sync::Arc;
use std::time::Duration;

use gitpop::error::GenerationError;
use gitpop::llm::backends::list_local_models;
use gitpop::llm::http::Transport;
use gitpop::llm::{Endpoints, GenerationRequest, ProviderConfig, ProviderKind, ProviderRegistry};
use serde_json::json;
use tokio_test::assert_ok;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DIFF: &str = "diff --git a/a.py b/a.py\n@@ -1 +1 @@\n-return 1\n+return 2\n";

fn endpoints(server: &MockServer) -> Endpoints {
    Endpoints {
        local: server.uri(),
        gemini: format!("{}/v1beta", server.uri()),
        anthropic: format!("{}/v1/messages", server.uri()),
    }
}

async fn generate(config: &ProviderConfig) -> Result<String, GenerationError> {
    ProviderRegistry::new()
        .generate(GenerationRequest {
            diff_text: DIFF,
            config,
        })
        .await
}

fn openai_reply(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}, "finish_reason": "stop"}]
    })
}

// =============================================================================
// WIRE FORMATS
// =============================================================================

#[tokio::test]
async fn test_local_uses_ollama_generate_without_streaming() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({"model": "llama3.2", "stream": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "llama3.2",
            "response": "fix(core): handle edge case",
            "done": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = ProviderConfig::new(ProviderKind::Local).with_endpoints(endpoints(&server));
    let message = generate(&config).await.expect("generation failed");
    assert_eq!(message, "fix(core): handle edge case");
}

#[tokio::test]
async fn test_openai_compatible_sends_bearer_and_system_prompt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({"model": "gpt-4o-mini"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_reply("feat: add login")))
        .expect(1)
        .mount(&server)
        .await;

    let config = ProviderConfig::new(ProviderKind::OpenAiCompatible {
        base_url: format!("{}/v1", server.uri()),
    })
    .with_credential("sk-test");

    assert_eq!(generate(&config).await.unwrap(), "feat: add login");

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = requests[0].body_json().unwrap();
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["role"], "user");
    assert!(body["messages"][1]["content"].as_str().unwrap().contains("+return 2"));
}

#[tokio::test]
async fn test_custom_endpoint_suffix_not_duplicated() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_reply("chore: bump deps")))
        .expect(1)
        .mount(&server)
        .await;

    let config = ProviderConfig::new(ProviderKind::Custom {
        base_url: format!("{}/v1/chat/completions", server.uri()),
    })
    .with_model("qwen2.5-coder")
    .with_credential("key");

    assert_eq!(generate(&config).await.unwrap(), "chore: bump deps");
}

#[tokio::test]
async fn test_gemini_sends_key_in_header_not_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
        .and(header("x-goog-api-key", "g-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": "docs: update readme"}]}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = ProviderConfig::new(ProviderKind::Gemini)
        .with_credential("g-key")
        .with_endpoints(endpoints(&server));

    assert_eq!(generate(&config).await.unwrap(), "docs: update readme");

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].url.query().is_none());
    assert!(!requests[0].url.as_str().contains("g-key"));
}

#[tokio::test]
async fn test_claude_uses_messages_api_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "sk-ant"))
        .and(header("anthropic-version", "2023-06-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{"type": "text", "text": "refactor(db): split pool setup"}],
            "stop_reason": "end_turn"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = ProviderConfig::new(ProviderKind::Claude)
        .with_credential("sk-ant")
        .with_endpoints(endpoints(&server));

    assert_eq!(generate(&config).await.unwrap(), "refactor(db): split pool setup");

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = requests[0].body_json().unwrap();
    assert!(body["system"].as_str().unwrap().contains("Conventional Commits"));
    assert_eq!(body["messages"][0]["role"], "user");
}

// =============================================================================
// POST-PROCESSING
// =============================================================================

#[tokio::test]
async fn test_fenced_and_chatty_reply_is_cleaned() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": "Here is your commit message:\n```\n**feat(ui): add dark mode**\n\nAdds a theme toggle.\n```\nLet me know if you need changes."
        })))
        .mount(&server)
        .await;

    let config = ProviderConfig::new(ProviderKind::Local).with_endpoints(endpoints(&server));
    assert_eq!(
        generate(&config).await.unwrap(),
        "feat(ui): add dark mode\n\nAdds a theme toggle."
    );
}

#[tokio::test]
async fn test_blank_reply_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": "  \n "})))
        .mount(&server)
        .await;

    let config = ProviderConfig::new(ProviderKind::Local).with_endpoints(endpoints(&server));
    assert!(matches!(
        generate(&config).await,
        Err(GenerationError::MalformedResponse { .. })
    ));
}

#[tokio::test]
async fn test_unparseable_body_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let config = ProviderConfig::new(ProviderKind::Claude)
        .with_credential("sk-ant")
        .with_endpoints(endpoints(&server));
    assert!(matches!(
        generate(&config).await,
        Err(GenerationError::MalformedResponse { .. })
    ));
}

// =============================================================================
// ERROR MAPPING
// =============================================================================

#[tokio::test]
async fn test_unauthorized_is_auth_error_without_leaking_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Incorrect API key provided: sk-leaky", "type": "invalid_request_error"}
        })))
        .mount(&server)
        .await;

    let config = ProviderConfig::new(ProviderKind::OpenAiCompatible {
        base_url: format!("{}/v1", server.uri()),
    })
    .with_credential("sk-leaky");

    let err = generate(&config).await.unwrap_err();
    assert!(matches!(err, GenerationError::ProviderAuthError { .. }));
    assert!(!err.to_string().contains("sk-leaky"));
    assert!(!format!("{:?}", err).contains("sk-leaky"));
}

#[tokio::test]
async fn test_missing_key_never_reaches_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = ProviderConfig::new(ProviderKind::Gemini).with_endpoints(endpoints(&server));
    assert!(matches!(
        generate(&config).await,
        Err(GenerationError::ProviderAuthError { .. })
    ));
}

#[tokio::test]
async fn test_too_many_requests_is_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "type": "error",
            "error": {"type": "rate_limit_error", "message": "slow down"}
        })))
        .mount(&server)
        .await;

    let config = ProviderConfig::new(ProviderKind::Claude)
        .with_credential("sk-ant")
        .with_endpoints(endpoints(&server));
    assert_eq!(
        generate(&config).await,
        Err(GenerationError::ProviderRateLimited {
            provider: "Claude".to_string()
        })
    );
}

#[tokio::test]
async fn test_server_error_is_provider_failed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "model 'nope' not found"})))
        .mount(&server)
        .await;

    let config = ProviderConfig::new(ProviderKind::Local)
        .with_model("nope")
        .with_endpoints(endpoints(&server));
    match generate(&config).await {
        Err(GenerationError::ProviderFailed { detail, .. }) => {
            assert!(detail.contains("model 'nope' not found"));
        }
        other => panic!("expected ProviderFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_slow_provider_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"response": "feat: late"}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let config = ProviderConfig::new(ProviderKind::Local)
        .with_endpoints(endpoints(&server))
        .with_timeout(Duration::from_secs(1));
    assert!(matches!(
        generate(&config).await,
        Err(GenerationError::ProviderTimeout { seconds: 1, .. })
    ));
}

#[tokio::test]
async fn test_local_with_nothing_listening_is_unreachable() {
    // Bind then drop a listener to get a port nothing is serving.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let config = ProviderConfig::new(ProviderKind::Local).with_endpoints(Endpoints {
        local: format!("http://127.0.0.1:{}", port),
        ..Endpoints::default()
    });

    let started = std::time::Instant::now();
    let result = generate(&config).await;
    assert!(matches!(
        result,
        Err(GenerationError::ProviderUnreachable { .. })
    ));
    assert!(started.elapsed() < Duration::from_secs(10));
}

// =============================================================================
// CONCURRENCY
// =============================================================================

#[tokio::test]
async fn test_second_generation_is_rejected_while_first_runs() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"response": "feat: first"}))
                .set_delay(Duration::from_millis(500)),
        )
        .expect(2)
        .mount(&server)
        .await;

    let registry = Arc::new(ProviderRegistry::new());
    let config = Arc::new(ProviderConfig::new(ProviderKind::Local).with_endpoints(endpoints(&server)));

    let first = {
        let registry = Arc::clone(&registry);
        let config = Arc::clone(&config);
        tokio::spawn(async move {
            registry
                .generate(GenerationRequest {
                    diff_text: DIFF,
                    config: &config,
                })
                .await
        })
    };

    // Give the first call time to take the lock and send its request.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let second = registry
        .generate(GenerationRequest {
            diff_text: DIFF,
            config: &config,
        })
        .await;
    assert_eq!(second, Err(GenerationError::GenerationInProgress));

    let first = first.await.unwrap();
    assert_eq!(first.as_deref(), Ok("feat: first"));

    // Free again once the first call finished.
    let third = registry
        .generate(GenerationRequest {
            diff_text: DIFF,
            config: &config,
        })
        .await;
    assert_ok!(&third);
}

// =============================================================================
// LOCAL MODEL LISTING
// =============================================================================

#[tokio::test]
async fn test_list_local_models() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [
                {"name": "llama3.2:latest", "size": 1},
                {"name": "qwen2.5-coder:7b", "size": 2}
            ]
        })))
        .mount(&server)
        .await;

    let transport = Transport::new(Duration::from_secs(5)).unwrap();
    let models = list_local_models(&transport, &server.uri()).await.unwrap();
    assert_eq!(models, vec!["llama3.2:latest".to_string(), "qwen2.5-coder:7b".to_string()]);
}
