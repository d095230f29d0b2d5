//! Tool dispatch for athena-mcp.
//!
//! Maps a tool name and its JSON arguments to the query executor or a
//! metadata operation, and wraps the result in a single text content block.

mod definitions;

pub use definitions::{
    get_tool_definitions, DescribeAthenaTableInput, ListAthenaTablesInput, ListS3ObjectsInput,
    QueryAthenaInput, ToolDefinition, ToolName,
};

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::aws::AwsClient;
use crate::config::ExecutionContext;
use crate::error::{AthenaError, Result};
use crate::metadata;
use crate::query::{PollPolicy, QueryExecutor, QueryRequest};

/// One block of tool output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text { text: String },
}

/// The result of a successful tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub content: Vec<ContentBlock>,
}

impl ToolResponse {
    /// A response holding one text block.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }

    /// A response holding `value` as pretty-printed JSON.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        Ok(Self::text(serde_json::to_string_pretty(value)?))
    }

    /// Returns the text of the first block.
    pub fn first_text(&self) -> Option<&str> {
        self.content.first().map(|block| match block {
            ContentBlock::Text { text } => text.as_str(),
        })
    }
}

/// Routes tool calls to their handlers.
pub struct ToolDispatcher {
    ctx: Arc<ExecutionContext>,
    client: Arc<dyn AwsClient>,
    policy: PollPolicy,
}

impl ToolDispatcher {
    pub fn new(ctx: Arc<ExecutionContext>, client: Arc<dyn AwsClient>, policy: PollPolicy) -> Self {
        Self {
            ctx,
            client,
            policy,
        }
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.ctx
    }

    /// Runs the tool `name` with `arguments`.
    ///
    /// Unknown names fail with `UnknownOperation` before anything else runs.
    /// Arguments that do not match the tool's schema fail with `Argument`.
    pub async fn call(&self, name: &str, arguments: Value) -> Result<ToolResponse> {
        let tool =
            ToolName::parse(name).ok_or_else(|| AthenaError::UnknownOperation(name.to_string()))?;
        info!(tool = tool.as_str(), "Calling tool");

        let client = self.client.as_ref();
        let ctx = self.ctx.as_ref();

        match tool {
            ToolName::QueryAthena => {
                let input: QueryAthenaInput = parse_arguments(tool, arguments)?;
                let request = QueryRequest {
                    query: input.query,
                    database: input.database,
                    workgroup: input.workgroup,
                    output_location: input.output_location,
                };
                let outcome = QueryExecutor::new(client, self.policy)
                    .execute(&request, ctx)
                    .await?;
                debug!(
                    execution_id = %outcome.execution_id,
                    elapsed_ms = outcome.elapsed.as_millis() as u64,
                    "Returning result set"
                );
                ToolResponse::json(&outcome.result_set)
            }
            ToolName::ListAthenaDatabases => {
                ToolResponse::json(&metadata::list_databases(client, ctx).await?)
            }
            ToolName::ListAthenaTables => {
                let input: ListAthenaTablesInput = parse_arguments(tool, arguments)?;
                let list = metadata::list_tables(client, ctx, input.database.as_deref()).await?;
                Ok(ToolResponse::text(list.to_text()))
            }
            ToolName::DescribeAthenaTable => {
                let input: DescribeAthenaTableInput = parse_arguments(tool, arguments)?;
                let table =
                    metadata::describe_table(client, ctx, &input.table, input.database.as_deref())
                        .await?;
                ToolResponse::json(&table)
            }
            ToolName::ListS3Buckets => ToolResponse::json(&metadata::list_buckets(client).await?),
            ToolName::ListS3Objects => {
                let input: ListS3ObjectsInput = parse_arguments(tool, arguments)?;
                let objects = metadata::list_objects(
                    client,
                    &input.bucket,
                    input.prefix.as_deref(),
                    input.max_keys,
                )
                .await?;
                ToolResponse::json(&objects)
            }
            ToolName::GetAwsConfig => ToolResponse::json(&metadata::aws_config(ctx)),
        }
    }
}

/// Deserializes tool arguments; a missing or null argument object counts as empty.
fn parse_arguments<T: DeserializeOwned>(tool: ToolName, arguments: Value) -> Result<T> {
    let arguments = match arguments {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };
    serde_json::from_value(arguments)
        .map_err(|e| AthenaError::argument(format!("{}: {e}", tool.as_str())))
}
