//! Run orchestration.
//!
//! A run renders the target page, resolves selectors, extracts articles,
//! computes title metrics and persists the result. Collaborators are handed
//! in through [`PipelineContext`], so every stage can run against fakes.

use crate::api::AskAsync;
use crate::browser::BrowsingSession;
use crate::errors::PipelineError;
use crate::extract::extract;
use crate::metrics::{ProcessedRecords, process, process_records};
use crate::models::ProcessedArticle;
use crate::outputs::json::read_records;
use crate::persist::{Destination, PersistResult, persist, persist_pass_through};
use crate::render::{SettlePolicy, acquire};
use crate::selectors::{SelectorStrategy, resolve, static_selectors};
use crate::warehouse::Warehouse;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{error, info, instrument};
use url::Url;

/// Settings for one run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub url: Url,
    pub max_articles: usize,
    pub strategy: SelectorStrategy,
    /// Upper bound on waiting for the page to render.
    pub settle_timeout: Duration,
    /// Fixed delay once the page has rendered.
    pub settle_delay: Duration,
    /// Upper bound on the selector inference call.
    pub inference_timeout: Duration,
    pub destination: Destination,
}

impl PipelineConfig {
    /// Settle policy for this run.
    ///
    /// With static selectors the page is ready once an article container
    /// shows up. Inferred selectors are unknown before the page is read, so
    /// only `body` can be waited for.
    pub fn settle_policy(&self) -> SettlePolicy {
        let wait_for = match self.strategy {
            SelectorStrategy::Static => static_selectors().article,
            SelectorStrategy::Inferred => "body".to_string(),
        };
        SettlePolicy {
            wait_for,
            timeout: self.settle_timeout,
            delay: self.settle_delay,
        }
    }
}

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Elements matched by the article selector, or records read from a raw file.
    pub candidates: usize,
    pub kept: usize,
    pub discarded: usize,
    pub persisted: PersistResult,
}

/// The collaborators of a run.
///
/// The browsing session is owned for the lifetime of the context and released
/// when the context is dropped.
pub struct PipelineContext<S, A, W> {
    session: S,
    inference: Option<A>,
    warehouse: Option<W>,
}

impl<S, A, W> PipelineContext<S, A, W>
where
    S: BrowsingSession,
    A: AskAsync<Response = String>,
    W: Warehouse,
{
    pub fn new(session: S, inference: Option<A>, warehouse: Option<W>) -> Self {
        Self {
            session,
            inference,
            warehouse,
        }
    }

    /// Run the whole pipeline once.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::Render`] if the page cannot be rendered
    /// - [`PipelineError::NoArticles`] if no candidate yields a titled article
    /// - [`PipelineError::LocalPersistence`] if output files cannot be written
    #[instrument(level = "info", skip_all, fields(url = %config.url, max_articles = config.max_articles))]
    pub async fn run(&self, config: &PipelineConfig) -> Result<RunSummary, PipelineError> {
        let started = Instant::now();

        info!(stage = "render", "Stage started");
        let document = acquire(&self.session, &config.url, &config.settle_policy()).await?;

        info!(stage = "selectors", "Stage started");
        let selectors = resolve(
            &document,
            config.strategy,
            self.inference.as_ref(),
            config.inference_timeout,
        )
        .await;

        info!(stage = "extract", "Stage started");
        let extraction = extract(&document, &selectors, config.max_articles);
        if extraction.articles.is_empty() {
            error!(
                candidates = extraction.candidates,
                discarded = extraction.discarded,
                "No articles extracted"
            );
            return Err(PipelineError::NoArticles);
        }

        info!(stage = "metrics", "Stage started");
        let processed = process(&extraction.articles);
        log_metrics(&processed);

        info!(stage = "persist", "Stage started");
        let persisted = persist(
            &extraction.articles,
            &processed,
            &config.destination,
            self.warehouse.as_ref(),
        )
        .await?;

        let summary = RunSummary {
            candidates: extraction.candidates,
            kept: extraction.articles.len(),
            discarded: extraction.discarded,
            persisted,
        };
        info!(
            candidates = summary.candidates,
            kept = summary.kept,
            discarded = summary.discarded,
            warehouse = ?summary.persisted.warehouse,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Run complete"
        );
        Ok(summary)
    }
}

fn log_metrics(processed: &[ProcessedArticle]) {
    for row in processed {
        info!(
            title = %row.article.title,
            word_count = row.metrics.title_word_count,
            char_count = row.metrics.title_char_count,
            capital_words = ?row.metrics.title_capital_words,
            "Title metrics"
        );
    }
}

/// Reprocess a raw-article file saved by an earlier run.
///
/// No page is rendered. The records go through metrics and persistence just
/// like freshly extracted ones.
///
/// # Errors
///
/// - [`PipelineError::RawInput`] if `path` cannot be read as a JSON array
/// - [`PipelineError::NoArticles`] if the file holds no records
/// - [`PipelineError::LocalPersistence`] if output files cannot be written
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn reprocess_raw<W: Warehouse>(
    path: &Path,
    destination: &Destination,
    warehouse: Option<&W>,
) -> Result<RunSummary, PipelineError> {
    let records = read_records(path)
        .await
        .map_err(|e| PipelineError::RawInput {
            path: path.display().to_string(),
            cause: e.to_string(),
        })?;
    if records.is_empty() {
        error!("Raw input holds no records");
        return Err(PipelineError::NoArticles);
    }
    let candidates = records.len();

    let (kept, persisted) = match process_records(records) {
        ProcessedRecords::Enriched(processed) => {
            log_metrics(&processed);
            let raw: Vec<_> = processed.iter().map(|p| &p.article).collect();
            let persisted = persist(&raw, &processed, destination, warehouse).await?;
            (processed.len(), persisted)
        }
        ProcessedRecords::PassThrough(records) => {
            let persisted = persist_pass_through(&records, destination).await?;
            (records.len(), persisted)
        }
    };

    info!(candidates, kept, warehouse = ?persisted.warehouse, "Reprocessing complete");
    Ok(RunSummary {
        candidates,
        kept,
        discarded: 0,
        persisted,
    })
}
