//! Mock AWS client for testing.
//!
//! Serves scripted query statuses and in-memory catalog/bucket contents, and
//! records every call so tests can assert on what was sent.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{
    AwsClient, ListObjectsRequest, QueryExecutionHandle, QueryStatus, StartQueryRequest,
    StatusReport,
};
use crate::error::{AthenaError, Result};

/// A call received by [`MockAwsClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    StartQuery(StartQueryRequest),
    GetStatus(QueryExecutionHandle),
    GetResults(QueryExecutionHandle),
    ListDatabases {
        catalog: String,
    },
    ListTables {
        catalog: String,
        database: String,
    },
    DescribeTable {
        catalog: String,
        database: String,
        table: String,
    },
    ListBuckets,
    ListObjects(ListObjectsRequest),
}

impl MockCall {
    /// Returns the client method name this call corresponds to.
    pub fn method(&self) -> &'static str {
        match self {
            Self::StartQuery(_) => "start_query_execution",
            Self::GetStatus(_) => "get_query_execution",
            Self::GetResults(_) => "get_query_results",
            Self::ListDatabases { .. } => "list_databases",
            Self::ListTables { .. } => "list_table_names",
            Self::DescribeTable { .. } => "get_table_metadata",
            Self::ListBuckets => "list_buckets",
            Self::ListObjects(_) => "list_objects",
        }
    }
}

/// A mock AWS client backed by in-memory data.
///
/// Status reports are served in order; the last one repeats once the script
/// runs out. An empty script reports SUCCEEDED.
#[derive(Debug)]
pub struct MockAwsClient {
    execution_id: String,
    statuses: Mutex<VecDeque<StatusReport>>,
    result_set: Value,
    databases: Vec<Value>,
    tables: HashMap<String, Vec<String>>,
    table_metadata: HashMap<(String, String), Value>,
    buckets: Vec<Value>,
    objects: HashMap<String, Vec<Value>>,
    ignore_max_items: bool,
    failures: HashMap<&'static str, String>,
    calls: Mutex<Vec<MockCall>>,
}

impl Default for MockAwsClient {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockAwsClient {
    /// Creates an empty mock whose queries succeed immediately.
    pub fn new() -> Self {
        Self {
            execution_id: "mock-execution-id".to_string(),
            statuses: Mutex::new(VecDeque::new()),
            result_set: json!({"ResultSetMetadata": {"ColumnInfo": []}, "Rows": []}),
            databases: Vec::new(),
            tables: HashMap::new(),
            table_metadata: HashMap::new(),
            buckets: Vec::new(),
            objects: HashMap::new(),
            ignore_max_items: false,
            failures: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Creates a mock populated with a small sample lake, used by `--mock`.
    pub fn demo() -> Self {
        Self::new()
            .with_result_set(json!({
                "Rows": [
                    {"Data": [{"VarCharValue": "region"}, {"VarCharValue": "orders"}]},
                    {"Data": [{"VarCharValue": "emea"}, {"VarCharValue": "1204"}]},
                    {"Data": [{"VarCharValue": "apac"}, {"VarCharValue": "877"}]}
                ],
                "ResultSetMetadata": {
                    "ColumnInfo": [
                        {"Name": "region", "Type": "varchar"},
                        {"Name": "orders", "Type": "bigint"}
                    ]
                }
            }))
            .with_database("default", &["orders", "customers"])
            .with_table_metadata(
                "default",
                "orders",
                json!({
                    "Name": "orders",
                    "TableType": "EXTERNAL_TABLE",
                    "Columns": [
                        {"Name": "order_id", "Type": "string"},
                        {"Name": "region", "Type": "string"},
                        {"Name": "amount", "Type": "double"}
                    ],
                    "PartitionKeys": [{"Name": "dt", "Type": "string"}]
                }),
            )
            .with_bucket(
                "demo-lake",
                vec![
                    json!({"Key": "orders/dt=2024-01-01/part-0.parquet", "Size": 1048576}),
                    json!({"Key": "orders/dt=2024-01-02/part-0.parquet", "Size": 998244}),
                    json!({"Key": "customers/part-0.parquet", "Size": 52311}),
                ],
            )
    }

    /// Sets the execution id returned on submission.
    pub fn with_execution_id(mut self, id: impl Into<String>) -> Self {
        self.execution_id = id.into();
        self
    }

    /// Scripts the status reports served by successive status calls.
    pub fn with_statuses<I, S>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<StatusReport>,
    {
        *self.statuses.get_mut().unwrap_or_else(PoisonError::into_inner) =
            statuses.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the `ResultSet` returned for succeeded queries.
    pub fn with_result_set(mut self, result_set: Value) -> Self {
        self.result_set = result_set;
        self
    }

    /// Adds a database and its tables.
    pub fn with_database(mut self, name: &str, tables: &[&str]) -> Self {
        self.databases.push(json!({"Name": name}));
        self.tables.insert(
            name.to_string(),
            tables.iter().map(|t| t.to_string()).collect(),
        );
        self
    }

    /// Sets the metadata returned for one table.
    pub fn with_table_metadata(mut self, database: &str, table: &str, metadata: Value) -> Self {
        self.table_metadata
            .insert((database.to_string(), table.to_string()), metadata);
        self
    }

    /// Adds a bucket and its objects. Objects need a `Key` for prefix filtering.
    pub fn with_bucket(mut self, name: &str, objects: Vec<Value>) -> Self {
        self.buckets.push(json!({"Name": name}));
        self.objects.insert(name.to_string(), objects);
        self
    }

    /// Makes object listings return every match regardless of `max_items`.
    pub fn ignoring_max_items(mut self) -> Self {
        self.ignore_max_items = true;
        self
    }

    /// Makes every call to `method` fail with `message`.
    ///
    /// `method` is an [`AwsClient`] method name such as `"get_query_execution"`.
    pub fn failing(mut self, method: &'static str, message: impl Into<String>) -> Self {
        self.failures.insert(method, message.into());
        self
    }

    /// Returns every call received so far, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.calls).clone()
    }

    /// Returns how many calls went to `method`.
    pub fn call_count(&self, method: &str) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|c| c.method() == method)
            .count()
    }

    fn record(&self, call: MockCall) -> Result<()> {
        let method = call.method();
        lock(&self.calls).push(call);
        match self.failures.get(method) {
            Some(message) => Err(AthenaError::external(message.clone())),
            None => Ok(()),
        }
    }

    fn next_status(&self) -> StatusReport {
        let mut statuses = lock(&self.statuses);
        if statuses.len() > 1 {
            statuses.pop_front().unwrap_or_else(|| QueryStatus::Succeeded.into())
        } else {
            statuses
                .front()
                .cloned()
                .unwrap_or_else(|| QueryStatus::Succeeded.into())
        }
    }
}

#[async_trait]
impl AwsClient for MockAwsClient {
    async fn start_query_execution(
        &self,
        request: &StartQueryRequest,
    ) -> Result<QueryExecutionHandle> {
        self.record(MockCall::StartQuery(request.clone()))?;
        Ok(QueryExecutionHandle::new(self.execution_id.clone()))
    }

    async fn get_query_execution(&self, handle: &QueryExecutionHandle) -> Result<StatusReport> {
        self.record(MockCall::GetStatus(handle.clone()))?;
        Ok(self.next_status())
    }

    async fn get_query_results(&self, handle: &QueryExecutionHandle) -> Result<Value> {
        self.record(MockCall::GetResults(handle.clone()))?;
        Ok(self.result_set.clone())
    }

    async fn list_databases(&self, catalog: &str) -> Result<Value> {
        self.record(MockCall::ListDatabases {
            catalog: catalog.to_string(),
        })?;
        Ok(Value::Array(self.databases.clone()))
    }

    async fn list_table_names(&self, catalog: &str, database: &str) -> Result<Vec<String>> {
        self.record(MockCall::ListTables {
            catalog: catalog.to_string(),
            database: database.to_string(),
        })?;
        self.tables.get(database).cloned().ok_or_else(|| {
            AthenaError::external(format!(
                "An error occurred (MetadataException): Database {database} not found"
            ))
        })
    }

    async fn get_table_metadata(
        &self,
        catalog: &str,
        database: &str,
        table: &str,
    ) -> Result<Value> {
        self.record(MockCall::DescribeTable {
            catalog: catalog.to_string(),
            database: database.to_string(),
            table: table.to_string(),
        })?;
        self.table_metadata
            .get(&(database.to_string(), table.to_string()))
            .cloned()
            .ok_or_else(|| {
                AthenaError::external(format!(
                    "An error occurred (MetadataException): Table {table} not found in {database}"
                ))
            })
    }

    async fn list_buckets(&self) -> Result<Value> {
        self.record(MockCall::ListBuckets)?;
        Ok(Value::Array(self.buckets.clone()))
    }

    async fn list_objects(&self, request: &ListObjectsRequest) -> Result<Vec<Value>> {
        self.record(MockCall::ListObjects(request.clone()))?;

        let objects = self.objects.get(&request.bucket).ok_or_else(|| {
            AthenaError::external(format!(
                "An error occurred (NoSuchBucket): The specified bucket {} does not exist",
                request.bucket
            ))
        })?;

        let prefix = request.prefix.as_deref().unwrap_or("");
        let matching = objects.iter().filter(|o| {
            o.get("Key")
                .and_then(Value::as_str)
                .is_some_and(|k| k.starts_with(prefix))
        });

        let limit = if self.ignore_max_items {
            usize::MAX
        } else {
            request.max_items as usize
        };

        Ok(matching.take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_status_script_repeats_last_entry() {
        let client = MockAwsClient::new().with_statuses([QueryStatus::Queued, QueryStatus::Running]);
        let handle = QueryExecutionHandle::new("h");

        let seen: Vec<QueryStatus> = [0; 4]
            .iter()
            .map(|_| client.next_status().status)
            .collect();
        assert_eq!(
            seen,
            vec![
                QueryStatus::Queued,
                QueryStatus::Running,
                QueryStatus::Running,
                QueryStatus::Running
            ]
        );

        client.get_query_execution(&handle).await.unwrap();
        assert_eq!(client.call_count("get_query_execution"), 1);
    }

    #[tokio::test]
    async fn test_default_matches_new() {
        let client = MockAwsClient::default();
        let request = StartQueryRequest {
            query: "SELECT 1".to_string(),
            database: "default".to_string(),
            workgroup: "primary".to_string(),
            output_location: None,
        };

        let handle = client.start_query_execution(&request).await.unwrap();
        assert_eq!(handle.as_str(), "mock-execution-id");

        let results = client.get_query_results(&handle).await.unwrap();
        assert_eq!(results, MockAwsClient::new().result_set);
    }

    #[tokio::test]
    async fn test_failure_injection_still_records_call() {
        let client = MockAwsClient::new().failing("list_buckets", "ExpiredToken");

        let err = client.list_buckets().await.unwrap_err();
        assert_eq!(err.to_string(), "AWS CLI error: ExpiredToken");
        assert_eq!(client.calls(), vec![MockCall::ListBuckets]);
    }

    #[tokio::test]
    async fn test_list_objects_filters_prefix() {
        let client = MockAwsClient::demo();
        let objects = client
            .list_objects(&ListObjectsRequest {
                bucket: "demo-lake".to_string(),
                prefix: Some("orders/".to_string()),
                max_items: 100,
            })
            .await
            .unwrap();
        assert_eq!(objects.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_table_is_external_error() {
        let client = MockAwsClient::demo();
        let err = client
            .get_table_metadata("AwsDataCatalog", "default", "missing")
            .await
            .unwrap_err();
        assert!(matches!(err, AthenaError::ExternalCall(_)));
    }
}
