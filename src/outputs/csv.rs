//! Delimited tabular output for processed articles.
//!
//! One header row, then one row per article. The capitalized-words list does
//! not fit a single cell natively, so it is stored as a JSON array string
//! (`["Rep","Dina"]`) and decoded again by [`read_processed_csv`].

use crate::models::{Article, ProcessedArticle, TitleMetrics};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Column layout of `processed_data.csv`.
#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    title: String,
    kicker: String,
    image_url: String,
    link: String,
    ingestion_timestamp: String,
    title_word_count: usize,
    title_char_count: usize,
    title_capital_words: String,
}

impl CsvRow {
    fn from_processed(processed: &ProcessedArticle) -> Result<Self, serde_json::Error> {
        let article = &processed.article;
        Ok(Self {
            title: article.title.clone(),
            kicker: article.kicker.clone(),
            image_url: article.image_url.clone(),
            link: article.link.clone(),
            ingestion_timestamp: article.ingestion_timestamp.clone(),
            title_word_count: processed.metrics.title_word_count,
            title_char_count: processed.metrics.title_char_count,
            title_capital_words: serde_json::to_string(&processed.metrics.title_capital_words)?,
        })
    }

    fn into_processed(self) -> Result<ProcessedArticle, serde_json::Error> {
        let title_capital_words = if self.title_capital_words.trim().is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(&self.title_capital_words)?
        };
        Ok(ProcessedArticle {
            article: Article {
                title: self.title,
                kicker: self.kicker,
                image_url: self.image_url,
                link: self.link,
                ingestion_timestamp: self.ingestion_timestamp,
            },
            metrics: TitleMetrics {
                title_word_count: self.title_word_count,
                title_char_count: self.title_char_count,
                title_capital_words,
            },
        })
    }
}

/// Header row of `processed_data.csv`, in column order.
pub const COLUMNS: [&str; 8] = [
    "title",
    "kicker",
    "image_url",
    "link",
    "ingestion_timestamp",
    "title_word_count",
    "title_char_count",
    "title_capital_words",
];

/// Encode `articles` as CSV bytes, header included even for an empty batch.
fn to_csv_bytes(articles: &[ProcessedArticle]) -> Result<Vec<u8>, Box<dyn Error>> {
    let mut writer = ::csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(COLUMNS)?;
    for processed in articles {
        writer.serialize(CsvRow::from_processed(processed)?)?;
    }
    let bytes = writer.into_inner().map_err(|e| e.to_string())?;
    Ok(bytes)
}

/// Write `articles` to `path` as CSV.
#[instrument(level = "info", skip_all, fields(path = %path.display(), count = articles.len()))]
pub async fn write_processed_csv(
    path: &Path,
    articles: &[ProcessedArticle],
) -> Result<(), Box<dyn Error>> {
    let bytes = to_csv_bytes(articles)?;
    fs::write(path, bytes).await?;
    info!(path = %path.display(), "Wrote CSV");
    Ok(())
}

/// Read a file written by [`write_processed_csv`].
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn read_processed_csv(path: &Path) -> Result<Vec<ProcessedArticle>, Box<dyn Error>> {
    let bytes = fs::read(path).await?;
    let mut reader = ::csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(bytes.as_slice());

    let mut articles = Vec::new();
    for row in reader.deserialize::<CsvRow>() {
        articles.push(row?.into_processed()?);
    }
    Ok(articles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::process;

    fn article(title: &str, kicker: &str) -> Article {
        Article {
            title: title.to_string(),
            kicker: kicker.to_string(),
            image_url: "https://img.example.com/a.jpg".to_string(),
            link: "https://example.com/news/1".to_string(),
            ingestion_timestamp: "2025-05-06T14:30:00.123456Z".to_string(),
        }
    }

    #[tokio::test]
    async fn test_round_trip_reproduces_every_field() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("processed_data.csv");
        let processed = process(&[
            article(
                "Rep. Dina Titus Revives Push to Eliminate Federal Sports Betting Tax",
                "EFFORT SEEKS TO LEVEL PLAYING FIELD",
            ),
            article("\"Quoted\", with commas, and O'Brien", ""),
            article("all lowercase headline", "line one\nline two"),
        ]);

        write_processed_csv(&path, &processed).await.unwrap();
        let read_back = read_processed_csv(&path).await.unwrap();

        assert_eq!(read_back, processed);
    }

    #[tokio::test]
    async fn test_header_row() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("processed_data.csv");
        write_processed_csv(&path, &process(&[article("One Two", "")]))
            .await
            .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let header = text.lines().next().unwrap();
        assert_eq!(header, COLUMNS.join(","));
        assert!(text.contains(r#""[""One"",""Two""]""#));
    }

    #[tokio::test]
    async fn test_empty_batch_writes_header_only() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("processed_data.csv");
        write_processed_csv(&path, &[]).await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 1);
        assert!(read_processed_csv(&path).await.unwrap().is_empty());
    }
}
