//! HTTP transport tests: envelope in, single text content block out,
//! HTTP 200 on every command outcome.

use std::sync::Arc;

use iteratr_core::journal::memory::MemoryJournal;
use iteratr_core::Store;
use mcp_server::McpServer;
use serde_json::{json, Value};

async fn start_server() -> (mcp_server::ServerHandle, String) {
    let store = Store::new(Arc::new(MemoryJournal::new()));
    let handle = McpServer::new(store, "http-test")
        .start("127.0.0.1", 0)
        .await
        .expect("server starts on an ephemeral port");
    let url = format!("http://127.0.0.1:{}/mcp", handle.port());
    (handle, url)
}

async fn call_tool(client: &reqwest::Client, url: &str, body: Value) -> (u16, String) {
    let response = client
        .post(url)
        .json(&body)
        .send()
        .await
        .expect("request succeeds");
    let status = response.status().as_u16();
    let envelope: Value = response.json().await.expect("response is JSON");
    let text = envelope["content"][0]["text"]
        .as_str()
        .expect("single text content block")
        .to_string();
    assert_eq!(envelope["content"][0]["type"], "text");
    (status, text)
}

#[tokio::test]
async fn add_list_and_complete_over_http() {
    let (handle, url) = start_server().await;
    let client = reqwest::Client::new();

    let (status, text) = call_tool(
        &client,
        &url,
        json!({"name": "task-add", "arguments": {"tasks": [{"content": "A"}, {"content": "B"}]}}),
    )
    .await;
    assert_eq!(status, 200);
    assert!(text.contains("Added 2 task(s):"));

    let (status, text) = call_tool(&client, &url, json!({"name": "task-list"})).await;
    assert_eq!(status, 200);
    assert!(text.contains("Remaining:\n  [TAS-1] A\n  [TAS-2] B"));

    // Command errors still ride on HTTP 200
    let (status, text) =
        call_tool(&client, &url, json!({"name": "session-complete", "arguments": {}})).await;
    assert_eq!(status, 200);
    assert!(text.starts_with("error:"));
    assert!(text.contains("not in terminal state"));

    handle.stop().await;
}

#[tokio::test]
async fn missing_name_is_an_error_payload() {
    let (handle, url) = start_server().await;
    let client = reqwest::Client::new();

    let (status, text) = call_tool(&client, &url, json!({"arguments": {}})).await;
    assert_eq!(status, 200);
    assert!(text.starts_with("error:"));
    assert!(text.contains("name"));

    handle.stop().await;
}

#[tokio::test]
async fn concurrent_requests_are_safe() {
    let (handle, url) = start_server().await;
    let client = reqwest::Client::new();

    // Seed one task, then hammer reads concurrently
    call_tool(
        &client,
        &url,
        json!({"name": "task-add", "arguments": {"tasks": [{"content": "shared"}]}}),
    )
    .await;

    let mut requests = Vec::new();
    for _ in 0..16 {
        let client = client.clone();
        let url = url.clone();
        requests.push(tokio::spawn(async move {
            call_tool(&client, &url, json!({"name": "task-list"})).await
        }));
    }
    for request in requests {
        let (status, text) = request.await.unwrap();
        assert_eq!(status, 200);
        assert!(text.contains("[TAS-1] shared"));
    }

    handle.stop().await;
}

#[tokio::test]
async fn health_endpoint_responds() {
    let (handle, url) = start_server().await;
    let health_url = url.replace("/mcp", "/health");

    let body = reqwest::get(&health_url)
        .await
        .expect("health request succeeds")
        .text()
        .await
        .unwrap();
    assert_eq!(body, "OK");

    handle.stop().await;
}
