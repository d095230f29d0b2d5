//! AWS service abstraction for athena-mcp.
//!
//! Provides a trait-based interface over the Athena and S3 calls the server
//! needs, so the AWS CLI backend and the in-memory mock can be used
//! interchangeably.

mod cli;
mod mock;
mod types;

pub use cli::AwsCliClient;
pub use mock::{MockAwsClient, MockCall};
pub use types::{
    ListObjectsRequest, QueryExecutionHandle, QueryStatus, StartQueryRequest, StatusReport,
};

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Trait defining the Athena and S3 calls used by the tools.
///
/// Payloads the tools pass through untouched are returned as raw JSON.
#[async_trait]
pub trait AwsClient: Send + Sync {
    /// Submits a query and returns its execution handle.
    async fn start_query_execution(&self, request: &StartQueryRequest)
        -> Result<QueryExecutionHandle>;

    /// Fetches the current status of a query execution.
    async fn get_query_execution(&self, handle: &QueryExecutionHandle) -> Result<StatusReport>;

    /// Fetches the first page of results (`ResultSet`) of a succeeded query.
    async fn get_query_results(&self, handle: &QueryExecutionHandle) -> Result<Value>;

    /// Lists the databases of a catalog (`DatabaseList`).
    async fn list_databases(&self, catalog: &str) -> Result<Value>;

    /// Lists the table names of a database.
    async fn list_table_names(&self, catalog: &str, database: &str) -> Result<Vec<String>>;

    /// Fetches the metadata of one table (`TableMetadata`).
    async fn get_table_metadata(&self, catalog: &str, database: &str, table: &str)
        -> Result<Value>;

    /// Lists the buckets visible to the caller (`Buckets`).
    async fn list_buckets(&self) -> Result<Value>;

    /// Lists the objects under a prefix (`Contents`), at most one page.
    async fn list_objects(&self, request: &ListObjectsRequest) -> Result<Vec<Value>>;
}
