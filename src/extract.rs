//! Article extraction from a rendered document.
//!
//! Every candidate container is handled on its own. The title is the only
//! mandatory field: a candidate without a readable, non-empty title is
//! discarded and extraction moves on. Kicker, image and link are looked up
//! independently of each other and default to an empty string when their
//! element or attribute is missing.

use crate::models::{Article, SelectorSet};
use crate::render::{ElementHandle, RenderedDocument};
use chrono::{SecondsFormat, Utc};
use tracing::{debug, info, instrument};

/// The articles extracted from one page, plus the counts behind them.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Extracted articles in document order.
    pub articles: Vec<Article>,
    /// Elements matched by the article selector.
    pub candidates: usize,
    /// Candidates actually examined, at most `max_articles`.
    pub considered: usize,
    /// Examined candidates dropped for lack of a title.
    pub discarded: usize,
}

/// Field lookups for one candidate. `None` means the lookup found nothing.
#[derive(Debug, Default)]
struct CandidateFields {
    title: Option<String>,
    kicker: Option<String>,
    image_url: Option<String>,
    link: Option<String>,
}

impl CandidateFields {
    /// Merge the lookups into an [`Article`], applying the empty-string
    /// defaults. Returns `None` when there is no usable title.
    fn into_article(self, ingestion_timestamp: String) -> Option<Article> {
        let title = self.title.filter(|t| !t.is_empty())?;
        Some(Article {
            title,
            kicker: self.kicker.unwrap_or_default(),
            image_url: self.image_url.unwrap_or_default(),
            link: self.link.unwrap_or_default(),
            ingestion_timestamp,
        })
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Look up every field of one candidate `container`.
///
/// `resolve` turns a raw `href`/`src` into an absolute URL.
fn read_candidate<E, F>(container: &E, selectors: &SelectorSet, resolve: F) -> CandidateFields
where
    E: ElementHandle,
    F: Fn(&str) -> String,
{
    let Some(title_el) = container.find_first(&selectors.title) else {
        return CandidateFields::default();
    };
    let title = non_empty(title_el.text());

    // The headline anchor's own target wins over the dedicated link element.
    let link = title_el
        .attribute("href")
        .and_then(non_empty)
        .or_else(|| {
            container
                .find_first(&selectors.link)
                .and_then(|el| el.attribute("href"))
                .and_then(non_empty)
        })
        .map(|href| resolve(&href));

    let kicker = container
        .find_first(&selectors.kicker)
        .map(|el| el.text());

    let image_url = container
        .find_first(&selectors.image)
        .and_then(|el| el.attribute("src"))
        .and_then(non_empty)
        .map(|src| resolve(&src));

    CandidateFields {
        title,
        kicker,
        image_url,
        link,
    }
}

/// Current instant as an RFC 3339 UTC timestamp with microseconds.
pub fn ingestion_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Extract up to `max_articles` articles from `document`.
///
/// Candidates are the elements matching `selectors.article`, in document
/// order; only the first `max_articles` are examined. The result never holds
/// more than `min(max_articles, candidates)` articles, and never one with an
/// empty title.
#[instrument(level = "info", skip_all, fields(article = %selectors.article, max_articles = max_articles))]
pub fn extract(
    document: &RenderedDocument,
    selectors: &SelectorSet,
    max_articles: usize,
) -> Extraction {
    let containers = document.find_all(&selectors.article);
    let candidates = containers.len();
    info!(candidates, "Found article containers");

    let mut extraction = Extraction {
        candidates,
        ..Extraction::default()
    };

    for (index, container) in containers.iter().take(max_articles).enumerate() {
        extraction.considered += 1;
        let fields = read_candidate(container, selectors, |raw| document.resolve_url(raw));
        match fields.into_article(ingestion_timestamp()) {
            Some(article) => {
                debug!(index, title = %article.title, "Extracted article");
                extraction.articles.push(article);
            }
            None => {
                debug!(index, "Candidate has no title; discarded");
                extraction.discarded += 1;
            }
        }
    }

    info!(
        candidates,
        considered = extraction.considered,
        kept = extraction.articles.len(),
        discarded = extraction.discarded,
        "Extraction complete"
    );
    extraction
}
