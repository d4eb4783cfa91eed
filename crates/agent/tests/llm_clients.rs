use loanscout_agent::llm::{GeminiClient, LlmClient, OllamaClient, OpenAiClient};
use loanscout_agent::CompletionRequest;
use mockito::Matcher;
use reqwest::Client;
use serde_json::json;

fn request() -> CompletionRequest {
    CompletionRequest {
        prompt: "5 milyon 48 ay konut kredisi".to_string(),
        temperature: 0.1,
        max_tokens: 1000,
        json_mode: true,
    }
}

#[tokio::test]
async fn gemini_sends_key_header_and_json_mime_type() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/models/gemini-2.5-flash:generateContent")
        .match_header("x-goog-api-key", "test-key")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex("5 milyon 48 ay konut kredisi".to_string()),
            Matcher::PartialJson(json!({
                "generationConfig": {
                    "maxOutputTokens": 1000,
                    "responseMimeType": "application/json"
                }
            })),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"candidates": [{"content": {"parts": [{"text": "{\"success\": true}"}]}}]}"#,
        )
        .create_async()
        .await;

    let client = GeminiClient::new(
        Client::new(),
        server.url(),
        "gemini-2.5-flash".to_string(),
        "test-key".to_string().into(),
    );
    let text = client.complete(&request()).await.expect("gemini responds");

    assert_eq!(text, r#"{"success": true}"#);
    mock.assert_async().await;
}

#[tokio::test]
async fn gemini_error_status_is_reported() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/models/gemini-2.5-flash:generateContent")
        .with_status(403)
        .with_body(r#"{"error": {"message": "API key not valid"}}"#)
        .create_async()
        .await;

    let client = GeminiClient::new(
        Client::new(),
        server.url(),
        "gemini-2.5-flash".to_string(),
        "bad-key".to_string().into(),
    );
    let error = client.complete(&request()).await.expect_err("403 fails");

    let message = error.to_string();
    assert!(message.contains("403"));
    assert!(!message.contains("bad-key"));
}

#[tokio::test]
async fn openai_uses_bearer_auth_and_json_response_format() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer sk-test")
        .match_body(Matcher::PartialJson(json!({
            "model": "gpt-4o-mini",
            "response_format": { "type": "json_object" },
            "stream": false
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"choices": [{"message": {"role": "assistant", "content": "{}"}}]}"#)
        .create_async()
        .await;

    let client = OpenAiClient::new(
        Client::new(),
        server.url(),
        "gpt-4o-mini".to_string(),
        "sk-test".to_string().into(),
    );
    let text = client.complete(&request()).await.expect("openai responds");

    assert_eq!(text, "{}");
    mock.assert_async().await;
}

#[tokio::test]
async fn ollama_requests_json_format_without_streaming() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/generate")
        .match_body(Matcher::PartialJson(json!({
            "model": "llama3.1",
            "format": "json",
            "stream": false
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"response": "{\"success\": false}", "done": true}"#)
        .create_async()
        .await;

    let client = OllamaClient::new(Client::new(), server.url(), "llama3.1".to_string());
    let text = client.complete(&request()).await.expect("ollama responds");

    assert_eq!(text, r#"{"success": false}"#);
    mock.assert_async().await;
}
