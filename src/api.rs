//! LLM API interaction for selector inference.
//!
//! This module provides the inference collaborator used by the selector
//! resolver. It is a trait-based seam so the resolver can be exercised
//! against scripted responses in tests.
//!
//! # Architecture
//!
//! - [`AskAsync`]: core trait defining async LLM interaction
//! - [`AwfulClient`]: owns the `awful_aj` configuration and chat template
//!   and forwards prompts to `awful_aj::api::ask`
//!
//! There is no retry layer. One failed or malformed answer is enough for the
//! resolver to fall back to its static selectors, so a second round trip
//! would only add latency and cost.
//!
//! # Model parameters
//!
//! Endpoint, API key, model name, temperature and token limit live in the
//! `awful_aj` `config.yaml`. The system prompt lives in the chat template
//! (`templates/selector_finder.yaml` in this repository).

use awful_aj::api::ask;
use awful_aj::{config, config::AwfulJadeConfig, config_dir, template, template::ChatTemplate};
use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Trait for async LLM interaction.
///
/// Implementors of this trait can send text to an LLM and receive a response.
pub trait AskAsync {
    /// The type of response returned by the LLM.
    type Response;

    /// Send text to the LLM and receive a response.
    ///
    /// # Arguments
    ///
    /// * `text` - The input text to send to the LLM
    ///
    /// # Returns
    ///
    /// The LLM's response, or an error if the request failed.
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>>;
}

/// An `awful_aj` backed LLM client.
pub struct AwfulClient {
    /// LLM configuration (API keys, endpoints, model settings).
    config: AwfulJadeConfig,
    /// The chat template defining the conversation structure.
    template: ChatTemplate,
    /// Name the template was loaded under, for logs.
    template_name: String,
}

impl fmt::Debug for AwfulClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwfulClient")
            .field("template", &self.template_name)
            .finish()
    }
}

impl AwfulClient {
    /// Load the client configuration and chat template.
    ///
    /// # Arguments
    ///
    /// * `config_path` - Path to `config.yaml`; defaults to the one in the
    ///   `awful_aj` configuration directory
    /// * `template_name` - Name of the chat template to load
    ///
    /// # Errors
    ///
    /// Returns an error if either file is missing or does not parse.
    #[instrument(level = "info", skip_all, fields(%template_name))]
    pub async fn load(
        config_path: Option<&Path>,
        template_name: &str,
    ) -> Result<Self, Box<dyn Error>> {
        let config_path: PathBuf = match config_path {
            Some(path) => path.to_path_buf(),
            None => config_dir()?.join("config.yaml"),
        };
        let config_path_str = config_path
            .to_str()
            .ok_or_else(|| format!("not a valid config filename: {}", config_path.display()))?;
        let config = config::load_config(config_path_str)?;
        info!(config_path = %config_path_str, "Loaded LLM configuration");

        let template = template::load_template(template_name).await?;
        info!("Loaded template");

        Ok(Self {
            config,
            template,
            template_name: template_name.to_string(),
        })
    }
}

impl AskAsync for AwfulClient {
    type Response = String;

    #[instrument(level = "info", skip_all, fields(prompt_chars = text.len()))]
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        let t0 = Instant::now();
        let res = ask(&self.config, text.to_string(), &self.template, None, None).await;
        let dt = t0.elapsed();

        match &res {
            Ok(_) => info!(elapsed_ms = dt.as_millis() as u64, "API call succeeded"),
            Err(e) => warn!(elapsed_ms = dt.as_millis() as u64, error = %e, "API call failed"),
        }
        res
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::time::Duration;

    /// An [`AskAsync`] that replays a scripted answer and records prompts.
    pub(crate) struct ScriptedAsk {
        pub answer: Result<String, String>,
        pub delay: Duration,
        pub prompts: RefCell<Vec<String>>,
    }

    impl ScriptedAsk {
        pub(crate) fn answering(answer: &str) -> Self {
            Self {
                answer: Ok(answer.to_string()),
                delay: Duration::ZERO,
                prompts: RefCell::new(Vec::new()),
            }
        }

        pub(crate) fn failing(message: &str) -> Self {
            Self {
                answer: Err(message.to_string()),
                delay: Duration::ZERO,
                prompts: RefCell::new(Vec::new()),
            }
        }
    }

    impl AskAsync for ScriptedAsk {
        type Response = String;

        async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
            self.prompts.borrow_mut().push(text.to_string());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.answer.clone().map_err(|e| e.into())
        }
    }

    #[tokio::test]
    async fn test_scripted_ask_records_prompt() {
        let client = ScriptedAsk::answering("{}");
        let answer = client.ask("hello").await.unwrap();
        assert_eq!(answer, "{}");
        assert_eq!(client.prompts.borrow().as_slice(), ["hello"]);
    }
}
