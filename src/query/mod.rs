//! Query execution for athena-mcp.
//!
//! This module owns the asynchronous Athena lifecycle: submission, status
//! polling, and result retrieval.

pub mod executor;

pub use executor::{PollPolicy, QueryExecutor, QueryOutcome, QueryRequest};
