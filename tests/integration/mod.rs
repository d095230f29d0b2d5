//! Integration tests for athena-mcp.

pub mod dispatch_test;
pub mod live_test;
pub mod query_lifecycle_test;
pub mod stdio_test;
