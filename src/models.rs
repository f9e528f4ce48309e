//! Data models for the extraction pipeline.
//!
//! This module defines the records that flow between pipeline stages:
//! - [`SelectorSet`]: where to find an article container and its fields
//! - [`Article`]: a raw record as extracted from the rendered page
//! - [`TitleMetrics`]: metrics derived from an article title
//! - [`ProcessedArticle`]: an [`Article`] enriched with its [`TitleMetrics`]
//!
//! Field names are snake_case on the wire; they double as the JSON keys of the
//! output files and the column names of the warehouse table.

use serde::{Deserialize, Serialize};

/// The five CSS selectors used to locate articles and their fields.
///
/// `article` and `title` are mandatory. `kicker`, `image` and `link` may be
/// empty, in which case the matching field is simply left empty.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SelectorSet {
    /// Matches each article container.
    pub article: String,
    /// Matches the headline inside a container.
    pub title: String,
    /// Matches the short line above the headline.
    pub kicker: String,
    /// Matches the article image; its `src` is read.
    pub image: String,
    /// Matches the article link; its `href` is read.
    pub link: String,
}

impl SelectorSet {
    /// Whether the mandatory selectors are present.
    pub fn is_usable(&self) -> bool {
        !self.article.trim().is_empty() && !self.title.trim().is_empty()
    }
}

/// A raw article as extracted from one candidate container.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Article {
    /// The headline, trimmed. Never empty for an emitted record.
    pub title: String,
    /// The text above the headline, or empty.
    #[serde(default)]
    pub kicker: String,
    /// Absolute URL of the article image, or empty.
    #[serde(default)]
    pub image_url: String,
    /// Absolute URL of the full article, or empty.
    #[serde(default)]
    pub link: String,
    /// RFC 3339 instant at which the record was extracted.
    pub ingestion_timestamp: String,
}

/// Metrics derived from an article title.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TitleMetrics {
    /// Number of whitespace-delimited tokens.
    pub title_word_count: usize,
    /// Number of characters, spaces and punctuation included.
    pub title_char_count: usize,
    /// Capitalized words in order of appearance, duplicates kept.
    pub title_capital_words: Vec<String>,
}

/// An [`Article`] together with its derived [`TitleMetrics`].
///
/// Both halves are flattened so the serialized record is the raw article's
/// fields followed by the metric fields.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProcessedArticle {
    #[serde(flatten)]
    pub article: Article,
    #[serde(flatten)]
    pub metrics: TitleMetrics,
}
