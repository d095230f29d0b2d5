//! Request and status types for Athena and S3 calls.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of one query execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryExecutionHandle(String);

impl QueryExecutionHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryExecutionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// State of an Athena query execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QueryStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl QueryStatus {
    /// Returns the state as Athena spells it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "QUEUED",
            Self::Running => "RUNNING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Parses a state string reported by Athena.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "QUEUED" => Some(Self::Queued),
            "RUNNING" => Some(Self::Running),
            "SUCCEEDED" => Some(Self::Succeeded),
            "FAILED" => Some(Self::Failed),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// True for states after which no further transition happens.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One status observation of a query execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub status: QueryStatus,
    /// Athena's `StateChangeReason`, usually only set on failure.
    pub reason: Option<String>,
}

impl StatusReport {
    pub fn new(status: QueryStatus) -> Self {
        Self {
            status,
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

impl From<QueryStatus> for StatusReport {
    fn from(status: QueryStatus) -> Self {
        Self::new(status)
    }
}

/// Parameters of a query submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartQueryRequest {
    pub query: String,
    pub database: String,
    pub workgroup: String,
    pub output_location: Option<String>,
}

/// Parameters of an S3 object listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListObjectsRequest {
    pub bucket: String,
    pub prefix: Option<String>,
    pub max_items: u32,
}
