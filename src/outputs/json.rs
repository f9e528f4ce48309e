//! JSON output generation.
//!
//! Article lists are written as pretty-printed UTF-8 JSON arrays, with
//! non-ASCII text kept as-is.

use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Serialize `value` to `path` as pretty-printed JSON.
///
/// The parent directory must already exist. An existing file is replaced.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_json<T>(path: &Path, value: &T) -> Result<(), Box<dyn Error>>
where
    T: Serialize + ?Sized,
{
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).await?;
    info!(path = %path.display(), "Wrote JSON");
    Ok(())
}

/// Load a JSON array of records, as written by [`write_json`] for raw articles.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn read_records(path: &Path) -> Result<Vec<Value>, Box<dyn Error>> {
    let text = fs::read_to_string(path).await?;
    let records: Vec<Value> = serde_json::from_str(&text)?;
    info!(count = records.len(), "Loaded records");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Article;

    #[tokio::test]
    async fn test_write_then_read_records() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("scraped_data.json");
        let articles = vec![Article {
            title: "Año récord para el juego online".to_string(),
            kicker: "LATAM".to_string(),
            image_url: String::new(),
            link: "https://example.com/a".to_string(),
            ingestion_timestamp: "2025-05-06T14:30:00.000000Z".to_string(),
        }];

        write_json(&path, &articles).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("Año récord"));
        assert!(text.starts_with("[\n"));

        let records = read_records(&path).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["kicker"], "LATAM");
    }

    #[tokio::test]
    async fn test_read_records_rejects_non_array() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bad.json");
        std::fs::write(&path, r#"{"title": "not a list"}"#).unwrap();
        assert!(read_records(&path).await.is_err());
    }

    #[tokio::test]
    async fn test_write_into_missing_dir_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("missing").join("out.json");
        assert!(write_json(&path, &Vec::<Article>::new()).await.is_err());
    }
}
