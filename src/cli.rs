//! Command-line interface definitions.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Every option can also be provided through the environment variable named
//! next to it.

use crate::selectors::SelectorStrategy;
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for one extraction run.
///
/// # Examples
///
/// ```sh
/// # Default listing, static selectors, files under ./output
/// rendered_news_extract
///
/// # Let the LLM find the selectors on another page, show the browser
/// rendered_news_extract --url https://example.com/news --selector-strategy inferred --headless false
///
/// # Mirror into BigQuery
/// GOOGLE_CLOUD_PROJECT=my-project rendered_news_extract --credentials /app/credentials/service_account.json
///
/// # Recompute metrics for a saved raw batch, no browser
/// rendered_news_extract --from-raw output/scraped_data.json
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Page to extract articles from
    #[arg(
        short,
        long,
        env = "TARGET_URL",
        default_value = "https://www.yogonet.com/international/"
    )]
    pub url: String,

    /// Maximum number of article containers to examine
    #[arg(short = 'n', long, env = "MAX_ARTICLES", default_value_t = 10)]
    pub max_articles: usize,

    /// Run Chrome without a window
    #[arg(long, env = "HEADLESS", default_value_t = true, action = clap::ArgAction::Set)]
    pub headless: bool,

    /// Extra Chrome flags, whitespace separated; replaces the default flags
    #[arg(long, env = "CHROME_OPTIONS")]
    pub chrome_options: Option<String>,

    /// Seconds to wait for the page to render
    #[arg(long, env = "SETTLE_TIMEOUT_SECS", default_value_t = 10)]
    pub settle_timeout_secs: u64,

    /// Milliseconds to wait after the page has rendered
    #[arg(long, env = "SETTLE_DELAY_MS", default_value_t = 3000)]
    pub settle_delay_ms: u64,

    /// Where the CSS selectors come from
    #[arg(short, long, env = "SELECTOR_STRATEGY", value_enum, default_value_t = SelectorStrategy::Static)]
    pub selector_strategy: SelectorStrategy,

    /// Optional path to the LLM client config.yaml
    #[arg(short = 'c', long, env = "LLM_CONFIG")]
    pub llm_config: Option<PathBuf>,

    /// Chat template used for selector inference
    #[arg(long, env = "LLM_TEMPLATE", default_value = "selector_finder")]
    pub llm_template: String,

    /// Seconds to wait for the selector inference call
    #[arg(long, env = "LLM_TIMEOUT_SECS", default_value_t = 60)]
    pub llm_timeout_secs: u64,

    /// Output directory for the JSON and CSV files
    #[arg(short, long, env = "OUTPUT_DIR", default_value = "output")]
    pub output_dir: PathBuf,

    /// Google Cloud project; enables the BigQuery load when set
    #[arg(long, env = "GOOGLE_CLOUD_PROJECT")]
    pub gcp_project: Option<String>,

    /// BigQuery dataset
    #[arg(long, env = "BIGQUERY_DATASET_ID", default_value = "yogonet_news")]
    pub bq_dataset: String,

    /// BigQuery table
    #[arg(long, env = "BIGQUERY_TABLE_ID", default_value = "scraped_articles")]
    pub bq_table: String,

    /// Location for a newly created BigQuery dataset
    #[arg(long, env = "BIGQUERY_LOCATION", default_value = "US")]
    pub bq_location: String,

    /// service_account or authorized_user credentials file for BigQuery;
    /// application default credentials are used when neither this nor a token is set
    #[arg(long, env = "GOOGLE_APPLICATION_CREDENTIALS")]
    pub credentials: Option<PathBuf>,

    /// OAuth access token for BigQuery; wins over --credentials
    #[arg(long, env = "GOOGLE_OAUTH_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Reprocess a saved raw JSON file instead of rendering the page
    #[arg(long, value_name = "PATH")]
    pub from_raw: Option<PathBuf>,
}
