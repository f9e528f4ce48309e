//! Title metrics.
//!
//! Enriches articles with word count, character count and the capitalized
//! words of the title. Everything here is a pure function of its input.

use crate::extract::ingestion_timestamp;
use crate::models::{Article, ProcessedArticle, TitleMetrics};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{error, info, instrument, warn};

/// An uppercase letter followed by letters or apostrophes, between word boundaries.
static CAPITALIZED_WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Z][a-zA-Z']*\b").expect("capitalized word pattern is valid")
});

/// Capitalized words of `text`, in order, duplicates kept.
///
/// Sentence-initial words count too, so `"Rep. Dina Titus"` yields
/// `["Rep", "Dina", "Titus"]`.
pub fn capitalized_words(text: &str) -> Vec<String> {
    CAPITALIZED_WORD
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Compute the metrics of one title.
pub fn title_metrics(title: &str) -> TitleMetrics {
    TitleMetrics {
        title_word_count: title.split_whitespace().count(),
        title_char_count: title.chars().count(),
        title_capital_words: capitalized_words(title),
    }
}

/// Enrich every article of `batch` with its title metrics. Order is kept.
#[instrument(level = "info", skip_all, fields(count = batch.len()))]
pub fn process(batch: &[Article]) -> Vec<ProcessedArticle> {
    if batch.is_empty() {
        warn!("No articles to process");
        return Vec::new();
    }

    let processed: Vec<ProcessedArticle> = batch
        .iter()
        .map(|article| ProcessedArticle {
            metrics: title_metrics(&article.title),
            article: article.clone(),
        })
        .collect();

    info!(count = processed.len(), "Processed articles");
    processed
}

/// Result of processing loosely typed records.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessedRecords {
    /// Records carried a title column and were enriched.
    Enriched(Vec<ProcessedArticle>),
    /// No record carried a title; the records are returned untouched.
    PassThrough(Vec<Value>),
}

fn field_text(record: &Map<String, Value>, key: &str) -> Option<String> {
    match record.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Process records loaded from a raw-article file.
///
/// The title column is required structurally: when not a single record has a
/// `title` key, the condition is logged and the records pass through without
/// metric fields. A record that merely lacks its own title is processed with
/// an empty one. A record without a timestamp is stamped now.
#[instrument(level = "info", skip_all, fields(count = records.len()))]
pub fn process_records(records: Vec<Value>) -> ProcessedRecords {
    let has_title_column = records
        .iter()
        .any(|r| r.as_object().is_some_and(|o| o.contains_key("title")));
    if !records.is_empty() && !has_title_column {
        error!("No 'title' column found in the data; passing records through");
        return ProcessedRecords::PassThrough(records);
    }

    let articles: Vec<Article> = records
        .iter()
        .map(|record| {
            let empty = Map::new();
            let object = record.as_object().unwrap_or(&empty);
            Article {
                title: field_text(object, "title").unwrap_or_default(),
                kicker: field_text(object, "kicker").unwrap_or_default(),
                image_url: field_text(object, "image_url").unwrap_or_default(),
                link: field_text(object, "link").unwrap_or_default(),
                ingestion_timestamp: field_text(object, "ingestion_timestamp")
                    .unwrap_or_else(ingestion_timestamp),
            }
        })
        .collect();

    ProcessedRecords::Enriched(process(&articles))
}
