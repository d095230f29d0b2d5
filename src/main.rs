//! athena-mcp - An MCP server for querying S3 data with AWS Athena.

use std::sync::Arc;

use anyhow::Context;
use athena_mcp::aws::{AwsCliClient, AwsClient, MockAwsClient};
use athena_mcp::cli::Cli;
use athena_mcp::config::{Config, EnvSource, ExecutionContext};
use athena_mcp::logging;
use athena_mcp::mcp::McpServer;
use athena_mcp::tools::ToolDispatcher;
use tokio::io::BufReader;
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse_args();

    match cli.log_file.as_deref() {
        Some(path) if path.as_os_str() == "-" => {
            logging::init_file_logging(&logging::default_log_path())
        }
        Some(path) => logging::init_file_logging(path),
        None => logging::init_stderr_logging(),
    }

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // A missing .env is fine; the environment may already be set.
    if let Ok(path) = dotenvy::dotenv() {
        info!("Loaded environment from {}", path.display());
    }

    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let config = Config::load_from_file(&config_path)?;

    let ctx = Arc::new(
        ExecutionContext::from_source(&EnvSource).context("Failed to resolve AWS settings")?,
    );
    let policy = cli.poll_policy(&config);

    let client: Arc<dyn AwsClient> = if cli.mock {
        info!("Using in-memory mock instead of AWS");
        Arc::new(MockAwsClient::demo())
    } else {
        let aws = AwsCliClient::new(cli.aws_cli_path(&config), &ctx);
        info!("Using AWS CLI at {}", aws.program().display());
        Arc::new(aws)
    };

    info!(
        region = %ctx.region,
        workgroup = %ctx.workgroup,
        poll_interval_ms = policy.interval.as_millis() as u64,
        max_poll_attempts = policy.max_attempts,
        "athena-mcp server running on stdio"
    );

    let server = McpServer::new(ToolDispatcher::new(ctx, client, policy));
    let mut stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();

    server
        .serve(&mut stdin, &mut stdout)
        .await
        .context("stdio transport failed")?;

    info!("athena-mcp server shutting down");
    Ok(())
}
