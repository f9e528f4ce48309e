//! Error types for the extraction pipeline.
//!
//! Only whole-run blockers are represented by [`PipelineError`]. Failures
//! below batch granularity (a field, a candidate, the selector inference
//! call, the warehouse mirror) are recovered where they happen and show up in
//! logs and counts instead.

use thiserror::Error;

/// A failure that aborts the run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid target URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("browser could not be started: {0}")]
    Browser(String),

    #[error("failed to render {url}: {cause}")]
    Render { url: String, cause: String },

    #[error("no articles were extracted")]
    NoArticles,

    #[error("failed to write {path}: {cause}")]
    LocalPersistence { path: String, cause: String },

    #[error("failed to read raw input {path}: {cause}")]
    RawInput { path: String, cause: String },
}

impl PipelineError {
    /// Process exit status for this failure. Zero is reserved for success.
    pub fn exit_status(&self) -> u8 {
        match self {
            PipelineError::NoArticles => 1,
            PipelineError::Browser(_) | PipelineError::Render { .. } => 2,
            PipelineError::LocalPersistence { .. } => 3,
            PipelineError::InvalidUrl { .. } | PipelineError::RawInput { .. } => 4,
        }
    }
}

/// A failure talking to the analytics warehouse. Always recovered.
#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error("warehouse credentials unavailable: {0}")]
    Credentials(String),

    #[error("warehouse request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("warehouse rejected {operation} with status {status}: {body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("warehouse rejected {count} row(s): {detail}")]
    RowsRejected { count: usize, detail: String },

    #[error("could not read credentials file {path}: {cause}")]
    CredentialsFile { path: String, cause: String },
}

/// Why selector inference fell back to the static selectors. Always recovered.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("no inference client configured")]
    Unavailable,

    #[error("inference call failed: {0}")]
    Call(String),

    #[error("inference call timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("response contains no JSON object")]
    NoJsonObject,

    #[error("response JSON did not decode: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("selector {key} is empty")]
    EmptySelector { key: &'static str },

    #[error("selector {key} ({selector:?}) is not valid CSS")]
    InvalidSelector { key: &'static str, selector: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct_per_class() {
        let render = PipelineError::Render {
            url: "https://example.com".to_string(),
            cause: "timeout".to_string(),
        };
        let local = PipelineError::LocalPersistence {
            path: "output/scraped_data.json".to_string(),
            cause: "read-only file system".to_string(),
        };

        assert_eq!(PipelineError::NoArticles.exit_status(), 1);
        assert_eq!(render.exit_status(), 2);
        assert_eq!(local.exit_status(), 3);
    }

    #[test]
    fn test_render_error_message_names_url() {
        let err = PipelineError::Render {
            url: "https://example.com/news".to_string(),
            cause: "navigation timeout".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "failed to render https://example.com/news: navigation timeout"
        );
    }
}
