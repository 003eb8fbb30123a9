mod cli;
mod error;
mod logging;
mod output;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use quoteflow_core::{AlphaVantageFetcher, Pipeline, PipelineConfig, ReqwestHttpClient, Warehouse};
use tracing::info;

use crate::cli::Cli;
use crate::error::CliError;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(error.exit_code())
        }
    }
}

async fn run() -> Result<ExitCode, CliError> {
    let cli = Cli::parse();
    logging::init(cli.log_format);

    let mut config = PipelineConfig::from_env()?;
    if let Some(symbols) = cli.symbols.as_deref() {
        config = config.with_symbols(symbols)?;
    }
    if let Some(db_path) = cli.db_path.clone() {
        config.warehouse.db_path = db_path;
    }

    let warehouse = Warehouse::open(config.warehouse.clone())?;
    if cli.init_schema {
        warehouse.ensure_schema()?;
        info!(db_path = %warehouse.db_path().display(), "schema ready");
    }

    let fetcher = AlphaVantageFetcher::new(
        Arc::new(ReqwestHttpClient::new()),
        config.provider.clone(),
    );
    let summary = Pipeline::new(config, fetcher, Arc::new(warehouse))
        .run()
        .await;

    if cli.summary || cli.pretty {
        output::render_summary(&summary, cli.pretty)?;
    }

    if cli.strict && !summary.is_clean() {
        return Err(CliError::StrictModeViolation {
            skipped: summary.skipped(),
            failed: summary.failed(),
        });
    }

    Ok(ExitCode::SUCCESS)
}
