//! Tool definitions and argument types.
//!
//! The JSON schemas here are what MCP clients see from `tools/list`; the
//! input structs are what `tools/call` arguments deserialize into.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Number};

/// Tool definition advertised to MCP clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// Every tool the server exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    QueryAthena,
    ListAthenaDatabases,
    ListAthenaTables,
    DescribeAthenaTable,
    ListS3Buckets,
    ListS3Objects,
    GetAwsConfig,
}

impl ToolName {
    pub const ALL: [ToolName; 7] = [
        Self::QueryAthena,
        Self::ListAthenaDatabases,
        Self::ListAthenaTables,
        Self::DescribeAthenaTable,
        Self::ListS3Buckets,
        Self::ListS3Objects,
        Self::GetAwsConfig,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QueryAthena => "query_athena",
            Self::ListAthenaDatabases => "list_athena_databases",
            Self::ListAthenaTables => "list_athena_tables",
            Self::DescribeAthenaTable => "describe_athena_table",
            Self::ListS3Buckets => "list_s3_buckets",
            Self::ListS3Objects => "list_s3_objects",
            Self::GetAwsConfig => "get_aws_config",
        }
    }

    /// Parses a tool name; names are case-sensitive.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

/// Arguments of `query_athena`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryAthenaInput {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workgroup: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_location: Option<String>,
}

/// Arguments of `list_athena_tables`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListAthenaTablesInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

/// Arguments of `describe_athena_table`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescribeAthenaTableInput {
    pub table: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

/// Arguments of `list_s3_objects`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListS3ObjectsInput {
    pub bucket: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_max_keys",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_keys: Option<u32>,
}

/// Accepts `max_keys` as any JSON number with an integral value (`25` or `25.0`).
fn deserialize_max_keys<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let Some(number) = Option::<Number>::deserialize(deserializer)? else {
        return Ok(None);
    };

    let value = match number.as_u64() {
        Some(v) => v,
        None => match number.as_f64() {
            Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= u32::MAX as f64 => f as u64,
            _ => {
                return Err(D::Error::custom(format!(
                    "max_keys must be a non-negative integer, got {number}"
                )))
            }
        },
    };

    u32::try_from(value)
        .map(Some)
        .map_err(|_| D::Error::custom(format!("max_keys {value} is too large")))
}

/// Returns the tool definitions advertised through `tools/list`.
pub fn get_tool_definitions() -> Vec<ToolDefinition> {
    ToolName::ALL.iter().map(|t| definition(*t)).collect()
}

fn definition(tool: ToolName) -> ToolDefinition {
    let (description, input_schema) = match tool {
        ToolName::QueryAthena => (
            "Execute an SQL query on S3 data using AWS Athena. Waits for the query to \
             finish and returns the first page of results.",
            json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The SQL query to execute"
                    },
                    "database": {
                        "type": "string",
                        "description": "The Athena database name (optional, defaults to the configured database)"
                    },
                    "workgroup": {
                        "type": "string",
                        "description": "The Athena workgroup (optional, defaults to the configured workgroup)"
                    },
                    "output_location": {
                        "type": "string",
                        "description": "S3 location for query results (required if not set in workgroup)"
                    }
                },
                "required": ["query"]
            }),
        ),
        ToolName::ListAthenaDatabases => (
            "List available Athena databases",
            json!({"type": "object", "properties": {}}),
        ),
        ToolName::ListAthenaTables => (
            "List tables in an Athena database",
            json!({
                "type": "object",
                "properties": {
                    "database": {
                        "type": "string",
                        "description": "The database name (defaults to the configured database)"
                    }
                }
            }),
        ),
        ToolName::DescribeAthenaTable => (
            "Describe the schema of an Athena table",
            json!({
                "type": "object",
                "properties": {
                    "table": {
                        "type": "string",
                        "description": "The table name"
                    },
                    "database": {
                        "type": "string",
                        "description": "The database name (defaults to the configured database)"
                    }
                },
                "required": ["table"]
            }),
        ),
        ToolName::ListS3Buckets => (
            "List available S3 buckets",
            json!({"type": "object", "properties": {}}),
        ),
        ToolName::ListS3Objects => (
            "List objects in an S3 bucket",
            json!({
                "type": "object",
                "properties": {
                    "bucket": {
                        "type": "string",
                        "description": "The S3 bucket name"
                    },
                    "prefix": {
                        "type": "string",
                        "description": "Optional prefix to filter objects"
                    },
                    "max_keys": {
                        "type": "number",
                        "description": "Maximum number of objects to return (default: 100)"
                    }
                },
                "required": ["bucket"]
            }),
        ),
        ToolName::GetAwsConfig => (
            "Get current AWS configuration and Athena settings",
            json!({"type": "object", "properties": {}}),
        ),
    };

    ToolDefinition {
        name: tool.as_str().to_string(),
        description: description.to_string(),
        input_schema,
    }
}
