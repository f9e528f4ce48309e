//! # Rendered News Extract
//!
//! Extracts headline records from a client-side rendered news listing,
//! derives simple title metrics, and persists the result to local files and,
//! optionally, to a BigQuery table.
//!
//! ## Features
//!
//! - Renders the target page in headless Chrome before reading it
//! - Uses fixed CSS selectors, or asks an LLM to find them in the rendered markup
//! - Keeps going when single fields or single articles cannot be read
//! - Computes word count, character count and capitalized words per title
//! - Writes raw JSON, processed JSON and processed CSV
//! - Appends processed rows to BigQuery as a best-effort mirror
//!
//! ## Usage
//!
//! ```sh
//! rendered_news_extract --url https://www.yogonet.com/international/ -o ./output
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Render**: Load the page in Chrome and snapshot the rendered DOM
//! 2. **Selectors**: Resolve the CSS selectors (static or LLM-inferred)
//! 3. **Extract**: Read up to N article containers into records
//! 4. **Metrics**: Enrich each record with title metrics
//! 5. **Persist**: Write files, then mirror into the warehouse
//!
//! ## Exit status
//!
//! `0` success, `1` no articles, `2` browser or render failure, `3` local
//! write failure, `4` invalid input. Warehouse failures never change it.

use clap::Parser;
use std::process::ExitCode;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod browser;
mod cli;
mod errors;
mod extract;
mod metrics;
mod models;
mod outputs;
mod persist;
mod pipeline;
mod render;
mod selectors;
mod utils;
mod warehouse;

use api::AwfulClient;
use browser::{BrowserConfig, ChromeSession};
use cli::Cli;
use errors::PipelineError;
use persist::{Destination, WarehouseTarget};
use pipeline::{PipelineConfig, PipelineContext, RunSummary, reprocess_raw};
use render::parse_target_url;
use selectors::SelectorStrategy;
use utils::ensure_writable_dir;
use warehouse::bigquery::{BigQueryWarehouse, Credentials};

#[tokio::main(flavor = "current_thread")]
#[instrument]
async fn main() -> ExitCode {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = Instant::now();
    info!("rendered_news_extract starting up");

    let args = Cli::parse();
    debug!(?args.url, ?args.output_dir, ?args.selector_strategy, "Parsed CLI arguments");

    let outcome = run(&args).await;
    let elapsed_ms = start_time.elapsed().as_millis() as u64;

    match outcome {
        Ok(summary) => {
            info!(
                kept = summary.kept,
                files = summary.persisted.files.len(),
                warehouse = ?summary.persisted.warehouse,
                elapsed_ms,
                "Finished"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, exit_status = e.exit_status(), elapsed_ms, "Run failed");
            ExitCode::from(e.exit_status())
        }
    }
}

async fn run(args: &Cli) -> Result<RunSummary, PipelineError> {
    // Fail fast on a bad output directory, before any browser is started.
    ensure_writable_dir(&args.output_dir)
        .await
        .map_err(|e| PipelineError::LocalPersistence {
            path: args.output_dir.display().to_string(),
            cause: e.to_string(),
        })?;

    let destination = Destination {
        output_dir: args.output_dir.clone(),
        warehouse: args.gcp_project.as_ref().map(|_| WarehouseTarget {
            dataset: args.bq_dataset.clone(),
            table: args.bq_table.clone(),
        }),
    };
    let warehouse = connect_warehouse(args).await;

    if let Some(path) = &args.from_raw {
        info!(path = %path.display(), "Reprocessing saved raw batch");
        return reprocess_raw(path, &destination, warehouse.as_ref()).await;
    }

    let url = parse_target_url(&args.url)?;
    let inference = load_inference_client(args).await;

    let browser_config = BrowserConfig::new(args.headless, args.chrome_options.as_deref());
    let session = ChromeSession::launch(&browser_config)
        .map_err(|e| PipelineError::Browser(e.to_string()))?;

    let config = PipelineConfig {
        url,
        max_articles: args.max_articles,
        strategy: args.selector_strategy,
        settle_timeout: Duration::from_secs(args.settle_timeout_secs),
        settle_delay: Duration::from_millis(args.settle_delay_ms),
        inference_timeout: Duration::from_secs(args.llm_timeout_secs),
        destination,
    };

    // The context owns the session; Chrome is shut down when it drops.
    let context = PipelineContext::new(session, inference, warehouse);
    context.run(&config).await
}

/// Load the LLM client when selectors are to be inferred.
///
/// A client that cannot be loaded is not fatal: selector resolution falls
/// back to the static selectors.
async fn load_inference_client(args: &Cli) -> Option<AwfulClient> {
    if args.selector_strategy != SelectorStrategy::Inferred {
        return None;
    }
    match AwfulClient::load(args.llm_config.as_deref(), &args.llm_template).await {
        Ok(client) => Some(client),
        Err(e) => {
            warn!(error = %e, "Could not load LLM client; static selectors will be used");
            None
        }
    }
}

/// Connect to BigQuery when a project is configured.
async fn connect_warehouse(args: &Cli) -> Option<BigQueryWarehouse> {
    let project = args.gcp_project.as_deref()?;
    let credentials =
        Credentials::from_sources(args.access_token.as_deref(), args.credentials.as_deref());
    let connected = BigQueryWarehouse::connect(project, &args.bq_location, credentials).await;
    match connected {
        Ok(warehouse) => Some(warehouse),
        Err(e) => {
            error!(error = %e, %project, "BigQuery unavailable; results will only be written locally");
            None
        }
    }
}
