//! Live AWS smoke tests.
//!
//! These use the real AWS CLI and the credentials in the environment.
//! Set ATHENA_LIVE_TEST=1 to run them.

use std::sync::Arc;

use athena_mcp::aws::AwsCliClient;
use athena_mcp::config::{EnvSource, ExecutionContext};
use athena_mcp::query::PollPolicy;
use athena_mcp::tools::ToolDispatcher;
use serde_json::{json, Value};

/// Helper to build a dispatcher against real AWS, if enabled.
fn live_dispatcher() -> Option<ToolDispatcher> {
    std::env::var("ATHENA_LIVE_TEST").ok()?;
    let ctx = ExecutionContext::from_source(&EnvSource).ok()?;
    let client = AwsCliClient::new("aws", &ctx);
    Some(ToolDispatcher::new(
        Arc::new(ctx),
        Arc::new(client),
        PollPolicy::default(),
    ))
}

#[tokio::test]
async fn test_live_select_one() {
    let Some(dispatcher) = live_dispatcher() else {
        eprintln!("Skipping test: ATHENA_LIVE_TEST not set");
        return;
    };

    let response = dispatcher
        .call("query_athena", json!({"query": "SELECT 1 AS one"}))
        .await
        .unwrap();
    let result_set: Value = serde_json::from_str(response.first_text().unwrap()).unwrap();

    assert_eq!(
        result_set["ResultSetMetadata"]["ColumnInfo"][0]["Name"],
        "one"
    );
}

#[tokio::test]
async fn test_live_list_databases() {
    let Some(dispatcher) = live_dispatcher() else {
        eprintln!("Skipping test: ATHENA_LIVE_TEST not set");
        return;
    };

    let response = dispatcher
        .call("list_athena_databases", json!({}))
        .await
        .unwrap();
    let databases: Value = serde_json::from_str(response.first_text().unwrap()).unwrap();

    assert!(databases.is_array());
}
