//! Selector resolution.
//!
//! Produces the [`SelectorSet`] for a run, either the static set tuned to the
//! default listing page or one inferred by an LLM from a sample of the
//! rendered markup.
//!
//! # Fallback contract
//!
//! [`resolve`] never fails. The model's answer is untrusted text: it is
//! searched for an embedded JSON object, decoded, and validated as a whole.
//! A failed call, a timeout, a missing key, an empty mandatory selector or a
//! selector that is not valid CSS all discard the answer entirely and return
//! [`static_selectors`]. A partially valid answer is never merged.

use crate::api::AskAsync;
use crate::errors::InferenceError;
use crate::models::SelectorSet;
use crate::render::{RenderedDocument, is_valid_selector};
use crate::utils::{truncate_chars, truncate_for_log};
use clap::ValueEnum;
use serde::{Deserialize, Deserializer};
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Maximum number of markup characters sent to the model.
pub const SAMPLE_CHARS: usize = 10_000;

/// How the [`SelectorSet`] for a run is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SelectorStrategy {
    /// The fixed selectors of [`static_selectors`].
    Static,
    /// Ask the LLM, falling back to the static selectors.
    Inferred,
}

/// Selectors tuned to the default international news listing.
///
/// The link is read from the headline anchor itself.
pub fn static_selectors() -> SelectorSet {
    SelectorSet {
        article: "div.slot.noticia".to_string(),
        title: "h2.titulo a".to_string(),
        kicker: "div.volanta".to_string(),
        image: "div.imagen img".to_string(),
        link: "h2.titulo a".to_string(),
    }
}

/// Shape of the JSON object the model is asked to return.
#[derive(Debug, Deserialize)]
struct InferredSelectors {
    #[serde(rename = "article_selector", alias = "article")]
    article: String,
    #[serde(rename = "title_selector", alias = "title")]
    title: String,
    #[serde(rename = "kicker_selector", alias = "kicker", deserialize_with = "null_as_empty")]
    kicker: String,
    #[serde(rename = "image_selector", alias = "image", deserialize_with = "null_as_empty")]
    image: String,
    #[serde(rename = "link_selector", alias = "link", deserialize_with = "null_as_empty")]
    link: String,
}

/// An optional selector the model reports as absent with `null`. The key
/// itself must still be present.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Build the instruction sent to the model for `body_markup`.
///
/// Only the first [`SAMPLE_CHARS`] characters of the markup are included.
pub fn build_prompt(body_markup: &str) -> String {
    let sample = truncate_chars(body_markup, SAMPLE_CHARS);
    format!(
        "Analyze this HTML from a news listing page and identify CSS selectors for the following elements:\n\
         \n\
         1. Article container: the element that contains each news article\n\
         2. Title: the title or headline of each article\n\
         3. Kicker: the text above the main headline (a category or short summary)\n\
         4. Image: the main image of the article\n\
         5. Link: the element whose href is the URL of the full article\n\
         \n\
         Title, kicker, image and link selectors are applied inside each article container.\n\
         Format your response as a JSON object with exactly these keys: \
         \"article_selector\", \"title_selector\", \"kicker_selector\", \"image_selector\", \"link_selector\"\n\
         \n\
         Here's the sample HTML:\n\
         {sample}\n"
    )
}

/// Decode and validate a model answer.
///
/// The JSON object is taken to span from the first `{` to the last `}` of
/// `response`, which tolerates prose or code fences around it.
pub fn parse_selector_response(response: &str) -> Result<SelectorSet, InferenceError> {
    let start = response.find('{').ok_or(InferenceError::NoJsonObject)?;
    let end = response.rfind('}').ok_or(InferenceError::NoJsonObject)?;
    if end < start {
        return Err(InferenceError::NoJsonObject);
    }

    let decoded: InferredSelectors = serde_json::from_str(&response[start..=end])?;
    let selectors = SelectorSet {
        article: decoded.article.trim().to_string(),
        title: decoded.title.trim().to_string(),
        kicker: decoded.kicker.trim().to_string(),
        image: decoded.image.trim().to_string(),
        link: decoded.link.trim().to_string(),
    };
    validate(&selectors)?;
    Ok(selectors)
}

fn validate(selectors: &SelectorSet) -> Result<(), InferenceError> {
    if !selectors.is_usable() {
        let key = if selectors.article.trim().is_empty() {
            "article"
        } else {
            "title"
        };
        return Err(InferenceError::EmptySelector { key });
    }

    let fields = [
        ("article", &selectors.article),
        ("title", &selectors.title),
        ("kicker", &selectors.kicker),
        ("image", &selectors.image),
        ("link", &selectors.link),
    ];
    for (key, selector) in fields {
        if !selector.is_empty() && !is_valid_selector(selector) {
            return Err(InferenceError::InvalidSelector {
                key,
                selector: selector.clone(),
            });
        }
    }
    Ok(())
}

/// Ask `client` for selectors matching `document`.
async fn infer<A>(
    document: &RenderedDocument,
    client: &A,
    timeout: Duration,
) -> Result<SelectorSet, InferenceError>
where
    A: AskAsync<Response = String>,
{
    let prompt = build_prompt(&document.body_markup());
    info!(
        url = %document.url(),
        page_title = %document.title(),
        prompt_chars = prompt.chars().count(),
        "Asking model for selectors"
    );
    let answer = tokio::time::timeout(timeout, client.ask(&prompt))
        .await
        .map_err(|_| InferenceError::Timeout(timeout))?
        .map_err(|e| InferenceError::Call(e.to_string()))?;

    parse_selector_response(&answer).inspect_err(|e| {
        warn!(
            error = %e,
            response_preview = %truncate_for_log(&answer, 300),
            "Model returned unusable selectors"
        );
    })
}

/// Resolve the selectors for this run.
///
/// With [`SelectorStrategy::Inferred`] exactly one request is sent to
/// `client`. When `client` is `None`, or anything about the answer is wrong,
/// the static selectors are returned.
#[instrument(level = "info", skip_all, fields(?strategy))]
pub async fn resolve<A>(
    document: &RenderedDocument,
    strategy: SelectorStrategy,
    client: Option<&A>,
    timeout: Duration,
) -> SelectorSet
where
    A: AskAsync<Response = String>,
{
    if strategy == SelectorStrategy::Static {
        info!("Using static selectors");
        return static_selectors();
    }

    let outcome = match client {
        Some(client) => infer(document, client, timeout).await,
        None => Err(InferenceError::Unavailable),
    };

    match outcome {
        Ok(selectors) => {
            info!(?selectors, "Model identified selectors");
            selectors
        }
        Err(e) => {
            warn!(error = %e, "Selector inference failed; falling back to static selectors");
            static_selectors()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tests::ScriptedAsk;
    use url::Url;

    fn document() -> RenderedDocument {
        RenderedDocument::from_markup(
            Url::parse("https://www.example.com/").unwrap(),
            "News",
            r#"<html><body><div class="item"><h2>Headline</h2></div></body></html>"#,
        )
    }

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn test_static_selectors_are_documented_defaults() {
        let selectors = static_selectors();
        assert_eq!(selectors.article, "div.slot.noticia");
        assert_eq!(selectors.title, "h2.titulo a");
        assert_eq!(selectors.kicker, "div.volanta");
        assert_eq!(selectors.image, "div.imagen img");
        assert_eq!(selectors.link, "h2.titulo a");
        assert!(validate(&selectors).is_ok());
    }

    #[test]
    fn test_parse_response_with_surrounding_prose() {
        let response = r#"Sure! Here are the selectors:
```json
{"article_selector": "div.item", "title_selector": "h2", "kicker_selector": "h5",
 "image_selector": "img", "link_selector": "a"}
```
Let me know if you need anything else."#;

        let selectors = parse_selector_response(response).unwrap();
        assert_eq!(selectors.article, "div.item");
        assert_eq!(selectors.title, "h2");
        assert_eq!(selectors.kicker, "h5");
        assert_eq!(selectors.image, "img");
        assert_eq!(selectors.link, "a");
    }

    #[test]
    fn test_parse_response_accepts_bare_keys() {
        let response =
            r#"{"article": "li.story", "title": "h3", "kicker": "", "image": "", "link": "h3 a"}"#;
        let selectors = parse_selector_response(response).unwrap();
        assert_eq!(selectors.article, "li.story");
        assert_eq!(selectors.kicker, "");
    }

    #[test]
    fn test_parse_response_accepts_null_optional_selectors() {
        let response = r#"{"article_selector": "article.card", "title_selector": "h3 a",
                           "kicker_selector": null, "image_selector": null,
                           "link_selector": "h3 a"}"#;
        let selectors = parse_selector_response(response).unwrap();
        assert_eq!(selectors.article, "article.card");
        assert_eq!(selectors.kicker, "");
        assert_eq!(selectors.image, "");
        assert_eq!(selectors.link, "h3 a");
    }

    #[test]
    fn test_parse_response_rejects_null_title() {
        let response = r#"{"article_selector": "article.card", "title_selector": null,
                           "kicker_selector": "", "image_selector": "", "link_selector": ""}"#;
        assert!(matches!(
            parse_selector_response(response),
            Err(InferenceError::Decode(_))
        ));
    }

    #[test]
    fn test_parse_response_rejects_missing_optional_key() {
        let response = r#"{"article_selector": "article.card", "title_selector": "h3 a",
                           "image_selector": "img", "link_selector": "h3 a"}"#;
        assert!(matches!(
            parse_selector_response(response),
            Err(InferenceError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_inferred_answer_with_null_kicker_is_used() {
        let client = ScriptedAsk::answering(
            r#"{"article_selector": "div.item", "title_selector": "h2",
                "kicker_selector": null, "image_selector": null, "link_selector": null}"#,
        );
        let selectors =
            resolve(&document(), SelectorStrategy::Inferred, Some(&client), TIMEOUT).await;
        assert_eq!(selectors.article, "div.item");
        assert_eq!(selectors.kicker, "");
    }

    #[test]
    fn test_parse_response_rejects_missing_key() {
        let response = r#"{"article_selector": "div.item", "title_selector": "h2"}"#;
        assert!(matches!(
            parse_selector_response(response),
            Err(InferenceError::Decode(_))
        ));
    }

    #[test]
    fn test_parse_response_rejects_non_json() {
        assert!(matches!(
            parse_selector_response("I could not find any articles."),
            Err(InferenceError::NoJsonObject)
        ));
        assert!(matches!(
            parse_selector_response("} backwards {"),
            Err(InferenceError::NoJsonObject)
        ));
        assert!(matches!(
            parse_selector_response("{not json at all}"),
            Err(InferenceError::Decode(_))
        ));
    }

    #[test]
    fn test_parse_response_rejects_empty_title() {
        let response = r#"{"article_selector": "div.item", "title_selector": "  ",
            "kicker_selector": "h5", "image_selector": "img", "link_selector": "a"}"#;
        assert!(matches!(
            parse_selector_response(response),
            Err(InferenceError::EmptySelector { key: "title" })
        ));
    }

    #[test]
    fn test_parse_response_rejects_invalid_css() {
        let response = r#"{"article_selector": "div.item", "title_selector": "h2",
            "kicker_selector": "h5[", "image_selector": "img", "link_selector": "a"}"#;
        assert!(matches!(
            parse_selector_response(response),
            Err(InferenceError::InvalidSelector { key: "kicker", .. })
        ));
    }

    #[test]
    fn test_prompt_sample_is_bounded() {
        let markup = format!("<body>{}</body>", "x".repeat(SAMPLE_CHARS * 2));
        let prompt = build_prompt(&markup);
        assert!(prompt.contains("article_selector"));
        assert!(prompt.contains("<body>xxx"));
        assert!(!prompt.contains("</body>"));
        assert!(prompt.chars().count() < SAMPLE_CHARS + 1_000);
    }

    #[tokio::test]
    async fn test_static_strategy_never_calls_model() {
        let client = ScriptedAsk::answering("{}");
        let selectors = resolve(&document(), SelectorStrategy::Static, Some(&client), TIMEOUT).await;
        assert_eq!(selectors, static_selectors());
        assert!(client.prompts.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_inferred_strategy_uses_model_answer() {
        let client = ScriptedAsk::answering(
            r#"{"article_selector": "div.item", "title_selector": "h2",
                "kicker_selector": "h5", "image_selector": "img", "link_selector": "a"}"#,
        );
        let selectors =
            resolve(&document(), SelectorStrategy::Inferred, Some(&client), TIMEOUT).await;

        assert_eq!(selectors.article, "div.item");
        assert_eq!(client.prompts.borrow().len(), 1);
        assert!(client.prompts.borrow()[0].contains(r#"<div class="item">"#));
    }

    #[tokio::test]
    async fn test_malformed_answer_falls_back_to_static() {
        let client = ScriptedAsk::answering("```json\n{\"article_selector\": \"div.item\",\n```");
        let selectors =
            resolve(&document(), SelectorStrategy::Inferred, Some(&client), TIMEOUT).await;
        assert_eq!(selectors, static_selectors());
    }

    #[tokio::test]
    async fn test_call_failure_falls_back_to_static() {
        let client = ScriptedAsk::failing("429 Too Many Requests");
        let selectors =
            resolve(&document(), SelectorStrategy::Inferred, Some(&client), TIMEOUT).await;
        assert_eq!(selectors, static_selectors());
        assert_eq!(client.prompts.borrow().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_client_falls_back_to_static() {
        let selectors = resolve::<ScriptedAsk>(
            &document(),
            SelectorStrategy::Inferred,
            None,
            TIMEOUT,
        )
        .await;
        assert_eq!(selectors, static_selectors());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_model_times_out_to_static() {
        let mut client = ScriptedAsk::answering(
            r#"{"article_selector": "div.item", "title_selector": "h2",
                "kicker_selector": "h5", "image_selector": "img", "link_selector": "a"}"#,
        );
        client.delay = Duration::from_secs(120);
        let selectors = resolve(
            &document(),
            SelectorStrategy::Inferred,
            Some(&client),
            Duration::from_secs(60),
        )
        .await;
        assert_eq!(selectors, static_selectors());
    }
}
