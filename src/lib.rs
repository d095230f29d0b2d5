//! athena-mcp - An MCP server for querying S3 data with AWS Athena.
//!
//! This library exposes the core modules for use in integration tests.

pub mod aws;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod mcp;
pub mod metadata;
pub mod query;
pub mod tools;
