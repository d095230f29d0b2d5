//! Catalog and storage listing operations.
//!
//! Each operation is a single AWS call reshaped for display. Nothing here
//! polls or retries.

use serde_json::Value;
use tracing::debug;

use crate::aws::{AwsClient, ListObjectsRequest};
use crate::config::{ContextSummary, ExecutionContext};
use crate::error::{AthenaError, Result};

/// Default cap on listed objects.
pub const DEFAULT_MAX_KEYS: u32 = 100;

/// Table names of one database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableList {
    pub database: String,
    pub tables: Vec<String>,
}

impl TableList {
    /// Renders the list as a bulleted block of text.
    pub fn to_text(&self) -> String {
        let bullets: Vec<String> = self.tables.iter().map(|t| format!("- {t}")).collect();
        format!(
            "Tables in database \"{}\":\n{}",
            self.database,
            bullets.join("\n")
        )
    }
}

/// Lists the databases of the context's catalog.
pub async fn list_databases(client: &dyn AwsClient, ctx: &ExecutionContext) -> Result<Value> {
    debug!(catalog = %ctx.catalog, "Listing databases");
    client.list_databases(&ctx.catalog).await
}

/// Lists table names in `database`, or in the context's default database.
pub async fn list_tables(
    client: &dyn AwsClient,
    ctx: &ExecutionContext,
    database: Option<&str>,
) -> Result<TableList> {
    let database = database.unwrap_or(&ctx.database);
    if database.is_empty() {
        return Err(AthenaError::argument(
            "Database name is required but not provided or configured",
        ));
    }

    debug!(catalog = %ctx.catalog, database, "Listing tables");
    let tables = client
        .list_table_names(&ctx.catalog, database)
        .await
        .map_err(|e| match e {
            AthenaError::ExternalCall(msg) => {
                AthenaError::external(format!("Failed to list Athena tables: {msg}"))
            }
            other => other,
        })?;

    Ok(TableList {
        database: database.to_string(),
        tables,
    })
}

/// Fetches the schema metadata of one table.
pub async fn describe_table(
    client: &dyn AwsClient,
    ctx: &ExecutionContext,
    table: &str,
    database: Option<&str>,
) -> Result<Value> {
    if table.is_empty() {
        return Err(AthenaError::argument("table must not be empty"));
    }
    let database = database.unwrap_or(&ctx.database);

    debug!(catalog = %ctx.catalog, database, table, "Describing table");
    client.get_table_metadata(&ctx.catalog, database, table).await
}

/// Lists the buckets visible to the configured identity.
pub async fn list_buckets(client: &dyn AwsClient) -> Result<Value> {
    client.list_buckets().await
}

/// Lists at most `max_keys` objects of `bucket` under `prefix`.
pub async fn list_objects(
    client: &dyn AwsClient,
    bucket: &str,
    prefix: Option<&str>,
    max_keys: Option<u32>,
) -> Result<Vec<Value>> {
    if bucket.is_empty() {
        return Err(AthenaError::argument("bucket must not be empty"));
    }
    let max_keys = max_keys.unwrap_or(DEFAULT_MAX_KEYS);
    if max_keys == 0 {
        return Err(AthenaError::argument("max_keys must be at least 1"));
    }

    let request = ListObjectsRequest {
        bucket: bucket.to_string(),
        prefix: prefix.filter(|p| !p.is_empty()).map(String::from),
        max_items: max_keys,
    };
    debug!(bucket, prefix = ?request.prefix, max_keys, "Listing objects");

    let mut objects = client.list_objects(&request).await?;
    objects.truncate(max_keys as usize);
    Ok(objects)
}

/// Reports the active configuration without any secret values.
pub fn aws_config(ctx: &ExecutionContext) -> ContextSummary {
    ctx.summary()
}
