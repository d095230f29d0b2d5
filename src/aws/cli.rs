//! AWS CLI backed client.
//!
//! Runs the `aws` executable with an explicit argument vector (never through
//! a shell) and parses its JSON output.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio::process::Command;
use tracing::debug;

use super::{
    AwsClient, ListObjectsRequest, QueryExecutionHandle, QueryStatus, StartQueryRequest,
    StatusReport,
};
use crate::config::ExecutionContext;
use crate::error::{AthenaError, Result};

/// Client that shells out to the AWS CLI.
pub struct AwsCliClient {
    program: PathBuf,
    env: HashMap<OsString, OsString>,
}

impl AwsCliClient {
    /// Creates a client for the given executable.
    ///
    /// The subprocess environment is derived from `ctx` and the current
    /// process environment once, here.
    pub fn new(program: impl Into<PathBuf>, ctx: &ExecutionContext) -> Self {
        Self {
            program: program.into(),
            env: ctx.subprocess_env(std::env::vars_os()),
        }
    }

    /// Returns the executable this client runs.
    pub fn program(&self) -> &Path {
        &self.program
    }

    async fn run(&self, args: Vec<String>) -> Result<Value> {
        let operation = args
            .iter()
            .take(2)
            .cloned()
            .collect::<Vec<_>>()
            .join(" ");
        debug!("Running aws {}", operation);

        let output = Command::new(&self.program)
            .args(&args)
            .args(["--output", "json"])
            .env_clear()
            .envs(&self.env)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| map_spawn_error(e, &self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            return Err(AthenaError::external(if stderr.is_empty() {
                format!("aws {operation} exited with {}", output.status)
            } else {
                format!("aws {operation} failed: {stderr}")
            }));
        }

        parse_output(&operation, &output.stdout)
    }
}

#[async_trait]
impl AwsClient for AwsCliClient {
    async fn start_query_execution(
        &self,
        request: &StartQueryRequest,
    ) -> Result<QueryExecutionHandle> {
        let response = self.run(start_query_args(request)?).await?;
        parse_start_response(response)
    }

    async fn get_query_execution(&self, handle: &QueryExecutionHandle) -> Result<StatusReport> {
        let response = self
            .run(strings(&[
                "athena",
                "get-query-execution",
                "--query-execution-id",
                handle.as_str(),
            ]))
            .await?;
        parse_status_response(response)
    }

    async fn get_query_results(&self, handle: &QueryExecutionHandle) -> Result<Value> {
        let response = self.run(query_results_args(handle)).await?;
        take_field(response, "ResultSet")
    }

    async fn list_databases(&self, catalog: &str) -> Result<Value> {
        let response = self.run(list_databases_args(catalog)).await?;
        take_field(response, "DatabaseList")
    }

    async fn list_table_names(&self, catalog: &str, database: &str) -> Result<Vec<String>> {
        let response = self.run(list_tables_args(catalog, database)).await?;
        parse_table_names(response)
    }

    async fn get_table_metadata(
        &self,
        catalog: &str,
        database: &str,
        table: &str,
    ) -> Result<Value> {
        let response = self
            .run(strings(&[
                "athena",
                "get-table-metadata",
                "--catalog-name",
                catalog,
                "--database-name",
                database,
                "--table-name",
                table,
            ]))
            .await?;
        take_field(response, "TableMetadata")
    }

    async fn list_buckets(&self) -> Result<Value> {
        let response = self.run(strings(&["s3api", "list-buckets"])).await?;
        take_field(response, "Buckets")
    }

    async fn list_objects(&self, request: &ListObjectsRequest) -> Result<Vec<Value>> {
        let response = self.run(list_objects_args(request)).await?;
        parse_contents(response)
    }
}

fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

/// Arguments for a paginated operation, limited to the first service page.
///
/// Without `--no-paginate` the CLI follows `NextToken` and merges pages.
fn single_page(args: &[&str]) -> Vec<String> {
    let mut args = strings(args);
    args.push("--no-paginate".to_string());
    args
}

fn query_results_args(handle: &QueryExecutionHandle) -> Vec<String> {
    single_page(&[
        "athena",
        "get-query-results",
        "--query-execution-id",
        handle.as_str(),
    ])
}

fn list_databases_args(catalog: &str) -> Vec<String> {
    single_page(&["athena", "list-databases", "--catalog-name", catalog])
}

fn list_tables_args(catalog: &str, database: &str) -> Vec<String> {
    single_page(&[
        "athena",
        "list-table-metadata",
        "--catalog-name",
        catalog,
        "--database-name",
        database,
    ])
}

/// Builds the `start-query-execution` argument vector.
///
/// The query is attached with `=` so text starting with `-` (a leading SQL
/// comment) is not mistaken for an option.
fn start_query_args(request: &StartQueryRequest) -> Result<Vec<String>> {
    let context = serde_json::json!({ "Database": request.database });

    let mut args = vec![
        "athena".to_string(),
        "start-query-execution".to_string(),
        format!("--query-string={}", request.query),
        "--query-execution-context".to_string(),
        serde_json::to_string(&context)?,
        "--work-group".to_string(),
        request.workgroup.clone(),
    ];

    if let Some(location) = &request.output_location {
        let result_config = serde_json::json!({ "OutputLocation": location });
        args.push("--result-configuration".to_string());
        args.push(serde_json::to_string(&result_config)?);
    }

    Ok(args)
}

fn list_objects_args(request: &ListObjectsRequest) -> Vec<String> {
    let mut args = vec![
        "s3api".to_string(),
        "list-objects-v2".to_string(),
        "--bucket".to_string(),
        request.bucket.clone(),
        "--max-items".to_string(),
        request.max_items.to_string(),
    ];

    if let Some(prefix) = request.prefix.as_deref().filter(|p| !p.is_empty()) {
        args.push(format!("--prefix={prefix}"));
    }

    args
}

fn map_spawn_error(error: std::io::Error, program: &Path) -> AthenaError {
    if error.kind() == std::io::ErrorKind::NotFound {
        AthenaError::external(format!(
            "AWS CLI not found at '{}'. Install it or set [aws] cli_path.",
            program.display()
        ))
    } else {
        AthenaError::external(format!(
            "Failed to run '{}': {error}",
            program.display()
        ))
    }
}

fn parse_output(operation: &str, stdout: &[u8]) -> Result<Value> {
    if stdout.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }

    serde_json::from_slice(stdout).map_err(|e| {
        AthenaError::external(format!("Unparseable output from aws {operation}: {e}"))
    })
}

fn take_field(mut response: Value, field: &str) -> Result<Value> {
    match response.get_mut(field).map(Value::take) {
        Some(value) => Ok(value),
        None => Err(AthenaError::external(format!(
            "AWS response is missing '{field}'"
        ))),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StartResponse {
    query_execution_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StatusResponse {
    query_execution: QueryExecution,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct QueryExecution {
    status: ExecutionStatus,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ExecutionStatus {
    state: String,
    #[serde(default)]
    state_change_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TableListResponse {
    #[serde(default)]
    table_metadata_list: Vec<TableName>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TableName {
    name: String,
}

fn parse_start_response(response: Value) -> Result<QueryExecutionHandle> {
    let parsed: StartResponse = serde_json::from_value(response).map_err(|e| {
        AthenaError::external(format!("Unexpected start-query-execution response: {e}"))
    })?;
    Ok(QueryExecutionHandle::new(parsed.query_execution_id))
}

fn parse_status_response(response: Value) -> Result<StatusReport> {
    let parsed: StatusResponse = serde_json::from_value(response).map_err(|e| {
        AthenaError::external(format!("Unexpected get-query-execution response: {e}"))
    })?;
    let status = parsed.query_execution.status;

    let state = QueryStatus::parse(&status.state).ok_or_else(|| {
        AthenaError::external(format!("Unrecognized query state '{}'", status.state))
    })?;

    Ok(StatusReport {
        status: state,
        reason: status.state_change_reason,
    })
}

fn parse_table_names(response: Value) -> Result<Vec<String>> {
    let parsed: TableListResponse = serde_json::from_value(response).map_err(|e| {
        AthenaError::external(format!("Unexpected list-table-metadata response: {e}"))
    })?;
    Ok(parsed
        .table_metadata_list
        .into_iter()
        .map(|t| t.name)
        .collect())
}

fn parse_contents(response: Value) -> Result<Vec<Value>> {
    match response.get("Contents") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items.clone()),
        Some(other) => Err(AthenaError::external(format!(
            "Unexpected 'Contents' in list-objects-v2 response: {other}"
        ))),
    }
}
