//! Query submission, polling, and result retrieval.
//!
//! Athena runs queries asynchronously: a submission returns an execution id,
//! the execution moves through QUEUED and RUNNING, and results can only be
//! fetched once it reports SUCCEEDED. [`QueryExecutor`] drives one query
//! through that lifecycle and returns all of the result page or nothing.

use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::aws::{AwsClient, QueryExecutionHandle, QueryStatus, StartQueryRequest};
use crate::config::{ExecutionContext, QueryConfig};
use crate::error::{AthenaError, Result};

/// How often and how long to wait for a query to finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay before each status check.
    pub interval: Duration,
    /// Status checks allowed before the query counts as timed out.
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: 60,
        }
    }
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }
}

impl From<&QueryConfig> for PollPolicy {
    fn from(config: &QueryConfig) -> Self {
        Self::new(config.poll_interval(), config.max_poll_attempts)
    }
}

/// A query to run, with optional overrides of the context defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryRequest {
    pub query: String,
    pub database: Option<String>,
    pub workgroup: Option<String>,
    pub output_location: Option<String>,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn with_workgroup(mut self, workgroup: impl Into<String>) -> Self {
        self.workgroup = Some(workgroup.into());
        self
    }

    pub fn with_output_location(mut self, location: impl Into<String>) -> Self {
        self.output_location = Some(location.into());
        self
    }

    /// Fills unset fields from `ctx` and validates the query text.
    ///
    /// The SQL itself is not checked; Athena reports syntax errors as a
    /// FAILED execution.
    pub fn resolve(&self, ctx: &ExecutionContext) -> Result<StartQueryRequest> {
        if self.query.trim().is_empty() {
            return Err(AthenaError::argument("query must not be empty"));
        }

        Ok(StartQueryRequest {
            query: self.query.clone(),
            database: self
                .database
                .clone()
                .unwrap_or_else(|| ctx.database.clone()),
            workgroup: self
                .workgroup
                .clone()
                .unwrap_or_else(|| ctx.workgroup.clone()),
            output_location: self
                .output_location
                .clone()
                .or_else(|| ctx.output_location.clone()),
        })
    }
}

/// Successful query execution outcome.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    /// The Athena execution id.
    pub execution_id: QueryExecutionHandle,
    /// The first result page, exactly as Athena returned it.
    pub result_set: Value,
    /// Number of status checks made.
    pub status_checks: u32,
    /// Wall-clock time from submission to results.
    pub elapsed: Duration,
}

/// Runs queries through the Athena execution lifecycle.
pub struct QueryExecutor<'a> {
    client: &'a dyn AwsClient,
    policy: PollPolicy,
}

impl<'a> QueryExecutor<'a> {
    /// Creates a new query executor.
    pub fn new(client: &'a dyn AwsClient, policy: PollPolicy) -> Self {
        Self { client, policy }
    }

    /// Submits `request`, waits for a terminal state, and fetches the results.
    ///
    /// Fails with `Timeout` when the query is still queued or running after
    /// `max_attempts` status checks, and with `ExecutionFailed` when Athena
    /// reports FAILED or CANCELLED. No call is retried.
    pub async fn execute(
        &self,
        request: &QueryRequest,
        ctx: &ExecutionContext,
    ) -> Result<QueryOutcome> {
        let start_request = request.resolve(ctx)?;
        let started = Instant::now();

        let handle = self
            .client
            .start_query_execution(&start_request)
            .await
            .map_err(|e| with_context(e, "Failed to start query"))?;
        info!(
            execution_id = %handle,
            database = %start_request.database,
            workgroup = %start_request.workgroup,
            "Query submitted"
        );

        for attempt in 1..=self.policy.max_attempts {
            tokio::time::sleep(self.policy.interval).await;

            let report = self
                .client
                .get_query_execution(&handle)
                .await
                .map_err(|e| with_context(e, &format!("Failed to check status of {handle}")))?;
            debug!(execution_id = %handle, attempt, status = %report.status, "Polled query");

            if !report.status.is_terminal() {
                continue;
            }

            if report.status == QueryStatus::Succeeded {
                let result_set = self
                    .client
                    .get_query_results(&handle)
                    .await
                    .map_err(|e| with_context(e, &format!("Failed to fetch results of {handle}")))?;
                let elapsed = started.elapsed();
                info!(
                    execution_id = %handle,
                    status_checks = attempt,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Query succeeded"
                );
                return Ok(QueryOutcome {
                    execution_id: handle,
                    result_set,
                    status_checks: attempt,
                    elapsed,
                });
            }

            warn!(
                execution_id = %handle,
                status = %report.status,
                reason = report.reason.as_deref().unwrap_or(""),
                "Query did not succeed"
            );
            return Err(AthenaError::ExecutionFailed {
                status: report.status.to_string(),
                reason: report.reason,
            });
        }

        warn!(
            execution_id = %handle,
            attempts = self.policy.max_attempts,
            "Query still running, giving up"
        );
        Err(AthenaError::Timeout {
            execution_id: handle.to_string(),
            attempts: self.policy.max_attempts,
        })
    }
}

/// Prefixes external call errors with the lifecycle step that failed.
fn with_context(error: AthenaError, step: &str) -> AthenaError {
    match error {
        AthenaError::ExternalCall(msg) => AthenaError::ExternalCall(format!("{step}: {msg}")),
        other => other,
    }
}
