//! Query lifecycle integration tests.
//!
//! Drives the executor through scripted status sequences.

use std::time::Duration;

use athena_mcp::aws::{MockAwsClient, MockCall, QueryExecutionHandle, QueryStatus, StatusReport};
use athena_mcp::config::{ExecutionContext, MapSource};
use athena_mcp::error::AthenaError;
use athena_mcp::query::{PollPolicy, QueryExecutor, QueryRequest};
use pretty_assertions::assert_eq;
use serde_json::json;

fn quick() -> PollPolicy {
    PollPolicy::new(Duration::from_millis(1), 60)
}

#[tokio::test]
async fn test_select_one_scenario() {
    let payload = json!({
        "ResultSetMetadata": {"ColumnInfo": [{"Name": "_col0", "Type": "integer"}]},
        "Rows": [
            {"Data": [{"VarCharValue": "_col0"}]},
            {"Data": [{"VarCharValue": "1"}]}
        ]
    });
    let client = MockAwsClient::new()
        .with_execution_id("abc")
        .with_statuses([
            QueryStatus::Queued,
            QueryStatus::Running,
            QueryStatus::Succeeded,
        ])
        .with_result_set(payload.clone());

    let outcome = QueryExecutor::new(&client, quick())
        .execute(&QueryRequest::new("SELECT 1"), &ExecutionContext::default())
        .await
        .unwrap();

    assert_eq!(outcome.result_set, payload);

    let handle = QueryExecutionHandle::new("abc");
    let calls = client.calls();
    assert_eq!(calls.len(), 5);
    assert!(matches!(calls[0], MockCall::StartQuery(_)));
    assert_eq!(calls[1..4].to_vec(), vec![MockCall::GetStatus(handle.clone()); 3]);
    assert_eq!(calls[4], MockCall::GetResults(handle));
}

#[tokio::test]
async fn test_syntax_error_scenario() {
    let client = MockAwsClient::new().with_statuses([StatusReport::new(QueryStatus::Failed)
        .with_reason("SYNTAX_ERROR")]);

    let err = QueryExecutor::new(&client, quick())
        .execute(&QueryRequest::new("SELECT bad"), &ExecutionContext::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AthenaError::ExecutionFailed { reason: Some(ref r), .. } if r == "SYNTAX_ERROR"
    ));
    assert_eq!(client.call_count("get_query_results"), 0);
}

#[tokio::test]
async fn test_poll_count_never_exceeds_bound() {
    for max_attempts in [1, 2, 7, 60] {
        let client = MockAwsClient::new().with_statuses([QueryStatus::Running]);
        let policy = PollPolicy::new(Duration::from_millis(1), max_attempts);

        let err = QueryExecutor::new(&client, policy)
            .execute(&QueryRequest::new("SELECT 1"), &ExecutionContext::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AthenaError::Timeout { .. }), "{err}");
        assert_eq!(
            client.call_count("get_query_execution"),
            max_attempts as usize
        );
    }
}

#[tokio::test]
async fn test_success_on_last_allowed_poll() {
    let mut script = vec![StatusReport::new(QueryStatus::Queued); 59];
    script.push(StatusReport::new(QueryStatus::Succeeded));
    let client = MockAwsClient::new().with_statuses(script);

    let outcome = QueryExecutor::new(&client, quick())
        .execute(&QueryRequest::new("SELECT 1"), &ExecutionContext::default())
        .await
        .unwrap();

    assert_eq!(outcome.status_checks, 60);
}

#[tokio::test]
async fn test_no_polls_after_terminal_status() {
    let client = MockAwsClient::new().with_statuses([
        QueryStatus::Running,
        QueryStatus::Cancelled,
        QueryStatus::Running,
        QueryStatus::Succeeded,
    ]);

    let err = QueryExecutor::new(&client, quick())
        .execute(&QueryRequest::new("SELECT 1"), &ExecutionContext::default())
        .await
        .unwrap_err();

    assert_eq!(err.category(), "Query Failed");
    assert_eq!(client.call_count("get_query_execution"), 2);
}

#[tokio::test]
async fn test_result_fetch_failure_is_external_error() {
    let client = MockAwsClient::new().failing("get_query_results", "InternalServerException");

    let err = QueryExecutor::new(&client, quick())
        .execute(&QueryRequest::new("SELECT 1"), &ExecutionContext::default())
        .await
        .unwrap_err();

    assert!(matches!(err, AthenaError::ExternalCall(_)));
    assert!(err.to_string().contains("InternalServerException"));
}

#[tokio::test]
async fn test_context_defaults_flow_into_submission() {
    let ctx = ExecutionContext::from_source(
        &MapSource::new()
            .with("ATHENA_DATABASE", "analytics")
            .with("ATHENA_WORKGROUP", "reporting"),
    )
    .unwrap();
    let client = MockAwsClient::new();

    QueryExecutor::new(&client, quick())
        .execute(&QueryRequest::new("SELECT 1"), &ctx)
        .await
        .unwrap();

    match &client.calls()[0] {
        MockCall::StartQuery(request) => {
            assert_eq!(request.database, "analytics");
            assert_eq!(request.workgroup, "reporting");
            assert_eq!(request.output_location, None);
        }
        other => panic!("Expected StartQuery, got {other:?}"),
    }
}
