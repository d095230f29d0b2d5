//! MCP stdio transport integration tests.
//!
//! Feeds protocol traffic through `McpServer::serve` and inspects what comes
//! back on the output side.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use athena_mcp::aws::MockAwsClient;
use athena_mcp::config::ExecutionContext;
use athena_mcp::mcp::McpServer;
use athena_mcp::query::PollPolicy;
use athena_mcp::tools::ToolDispatcher;
use serde_json::{json, Value};
use tokio::io::BufReader;

fn server() -> McpServer {
    McpServer::new(ToolDispatcher::new(
        Arc::new(ExecutionContext::default()),
        Arc::new(MockAwsClient::demo()),
        PollPolicy::new(Duration::from_millis(1), 60),
    ))
}

async fn run_session(input: &str) -> Vec<Value> {
    let mut reader = BufReader::new(Cursor::new(input.as_bytes().to_vec()));
    let mut output = Vec::new();

    server().serve(&mut reader, &mut output).await.unwrap();

    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn test_ping_roundtrip_exact_bytes() {
    let mock = tokio_test::io::Builder::new()
        .read(b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n")
        .write(b"{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{}}\n")
        .read(b"{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n")
        .build();
    let (read_half, mut write_half) = tokio::io::split(mock);
    let mut read_half = BufReader::new(read_half);

    server()
        .serve(&mut read_half, &mut write_half)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_full_session() {
    let input = [
        json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {
            "protocolVersion": "2024-11-05",
            "capabilities": {},
            "clientInfo": {"name": "integration", "version": "1.0"}
        }}),
        json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
        json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
        json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call", "params": {
            "name": "query_athena",
            "arguments": {"query": "SELECT region, orders FROM orders"}
        }}),
        json!({"jsonrpc": "2.0", "id": 4, "method": "tools/call", "params": {
            "name": "no_such_tool",
            "arguments": {}
        }}),
    ]
    .iter()
    .map(|v| v.to_string())
    .collect::<Vec<_>>()
    .join("\n");

    let responses = run_session(&input).await;

    // The notification gets no response.
    let ids: Vec<&Value> = responses.iter().map(|r| &r["id"]).collect();
    assert_eq!(ids, vec![&json!(1), &json!(2), &json!(3), &json!(4)]);

    assert_eq!(responses[0]["result"]["serverInfo"]["name"], "athena-mcp");
    assert_eq!(responses[1]["result"]["tools"].as_array().unwrap().len(), 7);

    let content = &responses[2]["result"]["content"];
    assert_eq!(content[0]["type"], "text");
    let result_set: Value = serde_json::from_str(content[0]["text"].as_str().unwrap()).unwrap();
    assert_eq!(result_set["Rows"].as_array().unwrap().len(), 3);

    assert_eq!(responses[3]["error"]["code"], -32603);
    assert_eq!(responses[3]["error"]["message"], "Unknown tool: no_such_tool");
}

#[tokio::test]
async fn test_invalid_json_gets_parse_error_and_session_continues() {
    let input = "{not json}\n{\"jsonrpc\":\"2.0\",\"id\":9,\"method\":\"ping\"}\n";

    let responses = run_session(input).await;

    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["error"]["code"], -32700);
    assert_eq!(responses[0]["id"], Value::Null);
    assert_eq!(responses[1]["id"], 9);
}

#[tokio::test]
async fn test_json_that_is_not_a_request_gets_invalid_request() {
    let input = concat!(
        "{\"id\":1}\n",
        "[{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"ping\"}]\n",
        "{\"jsonrpc\":\"2.0\",\"id\":3,\"method\":\"ping\"}\n",
    );

    let responses = run_session(input).await;

    assert_eq!(responses.len(), 3);
    assert_eq!(responses[0]["error"]["code"], -32600);
    assert_eq!(responses[0]["id"], 1);
    assert_eq!(responses[1]["error"]["code"], -32600);
    assert_eq!(responses[1]["id"], Value::Null);
    assert_eq!(responses[2]["result"], json!({}));
}

#[tokio::test]
async fn test_content_length_framing_is_echoed() {
    let body = r#"{"jsonrpc":"2.0","id":7,"method":"ping"}"#;
    let input = format!("Content-Length: {}\r\n\r\n{}", body.len(), body);

    let mut reader = BufReader::new(Cursor::new(input.into_bytes()));
    let mut output = Vec::new();
    server().serve(&mut reader, &mut output).await.unwrap();

    let output = String::from_utf8(output).unwrap();
    let (header, payload) = output.split_once("\r\n\r\n").unwrap();
    assert_eq!(header, format!("Content-Length: {}", payload.len()));

    let response: Value = serde_json::from_str(payload).unwrap();
    assert_eq!(response["id"], 7);
    assert_eq!(response["result"], json!({}));
}
