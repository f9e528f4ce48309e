//! Rendered page acquisition and DOM queries.
//!
//! [`acquire`] drives a [`BrowsingSession`] to the target URL, lets
//! client-side rendering settle, and snapshots the resulting markup into a
//! [`RenderedDocument`]. Everything downstream queries that snapshot through
//! the [`ElementHandle`] capability, which keeps extraction independent of any
//! particular browser library and testable against plain HTML.

use crate::browser::BrowsingSession;
use crate::errors::PipelineError;
use crate::utils::collapse_whitespace;
use scraper::{ElementRef, Html, Selector};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};
use url::Url;

/// How long to let a page render before snapshotting it.
#[derive(Debug, Clone)]
pub struct SettlePolicy {
    /// Selector that must be present before the page counts as rendered.
    pub wait_for: String,
    /// Upper bound on waiting for `wait_for`.
    pub timeout: Duration,
    /// Extra fixed delay after `wait_for` is satisfied.
    pub delay: Duration,
}

/// Check that `raw` is a non-empty absolute URL.
pub fn parse_target_url(raw: &str) -> Result<Url, PipelineError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PipelineError::InvalidUrl {
            url: raw.to_string(),
            reason: "empty".to_string(),
        });
    }
    let url = Url::parse(trimmed).map_err(|e| PipelineError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(PipelineError::InvalidUrl {
            url: raw.to_string(),
            reason: "not a hierarchical URL".to_string(),
        });
    }
    Ok(url)
}

/// Navigate `session` to `url`, wait for the page to settle and snapshot it.
///
/// # Errors
///
/// Returns [`PipelineError::Render`] when navigation, the settle wait, or
/// reading the rendered markup fails. Nothing of a half-rendered page is kept.
#[instrument(level = "info", skip_all, fields(%url, wait_for = %policy.wait_for))]
pub async fn acquire<S: BrowsingSession>(
    session: &S,
    url: &Url,
    policy: &SettlePolicy,
) -> Result<RenderedDocument, PipelineError> {
    let t0 = Instant::now();
    let render_failure = |cause: String| PipelineError::Render {
        url: url.to_string(),
        cause,
    };

    session
        .navigate(url.as_str())
        .map_err(|e| render_failure(e.to_string()))?;
    session
        .wait_for(&policy.wait_for, policy.timeout)
        .map_err(|e| render_failure(e.to_string()))?;
    if !policy.delay.is_zero() {
        debug!(delay = ?policy.delay, "Letting client-side rendering settle");
        tokio::time::sleep(policy.delay).await;
    }

    let title = session.title().unwrap_or_else(|e| {
        warn!(error = %e, "Could not read page title");
        String::new()
    });
    let markup = session
        .page_source()
        .map_err(|e| render_failure(e.to_string()))?;

    info!(
        page_title = %title,
        bytes = markup.len(),
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "Page rendered"
    );
    Ok(RenderedDocument::from_markup(url.clone(), title, &markup))
}

/// A snapshot of a rendered page.
pub struct RenderedDocument {
    url: Url,
    title: String,
    html: Html,
}

impl RenderedDocument {
    /// Parse rendered `markup` fetched from `url`.
    pub fn from_markup(url: Url, title: impl Into<String>, markup: &str) -> Self {
        Self {
            url,
            title: title.into(),
            html: Html::parse_document(markup),
        }
    }

    /// The URL the page was rendered from.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The rendered page title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Serialized markup of the `<body>` element, or of the whole document
    /// when there is no body.
    pub fn body_markup(&self) -> String {
        let body = Selector::parse("body").ok().and_then(|s| {
            self.html
                .select(&s)
                .next()
                .map(|el| el.html())
        });
        body.unwrap_or_else(|| self.html.root_element().html())
    }

    /// All elements matching `selector`, in document order.
    ///
    /// A selector that does not parse matches nothing.
    pub fn find_all(&self, selector: &str) -> Vec<Element<'_>> {
        match compile(selector) {
            Some(compiled) => self
                .html
                .select(&compiled)
                .map(|inner| Element { inner })
                .collect(),
            None => Vec::new(),
        }
    }

    /// Resolve a possibly relative `href`/`src` value against the page URL.
    ///
    /// Values that cannot be resolved are returned unchanged.
    pub fn resolve_url(&self, raw: &str) -> String {
        let raw = raw.trim();
        self.url
            .join(raw)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| raw.to_string())
    }
}

/// The operations extraction performs on a DOM element.
pub trait ElementHandle: Sized {
    /// Visible text with whitespace runs collapsed and the ends trimmed.
    fn text(&self) -> String;

    /// Raw value of attribute `name`, if present.
    fn attribute(&self, name: &str) -> Option<String>;

    /// First descendant matching `selector`, if any.
    fn find_first(&self, selector: &str) -> Option<Self>;
}

/// An element of a [`RenderedDocument`].
#[derive(Debug, Clone, Copy)]
pub struct Element<'a> {
    inner: ElementRef<'a>,
}

impl ElementHandle for Element<'_> {
    fn text(&self) -> String {
        collapse_whitespace(&self.inner.text().collect::<String>())
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.inner.value().attr(name).map(str::to_string)
    }

    fn find_first(&self, selector: &str) -> Option<Self> {
        let compiled = compile(selector)?;
        self.inner.select(&compiled).next().map(|inner| Element { inner })
    }
}

fn compile(selector: &str) -> Option<Selector> {
    let selector = selector.trim();
    if selector.is_empty() {
        return None;
    }
    match Selector::parse(selector) {
        Ok(compiled) => Some(compiled),
        Err(e) => {
            debug!(%selector, error = %e, "Selector does not parse");
            None
        }
    }
}

/// Whether `selector` is non-empty and parses as CSS.
pub fn is_valid_selector(selector: &str) -> bool {
    !selector.trim().is_empty() && Selector::parse(selector.trim()).is_ok()
}
