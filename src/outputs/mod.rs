//! Output file generation.
//!
//! This module contains the writers (and matching readers) for the files a
//! run leaves in its output directory:
//!
//! # Submodules
//!
//! - [`json`]: raw and processed article lists as pretty-printed JSON
//! - [`csv`]: processed articles as a delimited table
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── scraped_data.json     # raw articles
//! ├── processed_data.json   # articles with title metrics
//! └── processed_data.csv    # same, one row per article
//! ```

pub mod csv;
pub mod json;

/// File name of the raw article list.
pub const RAW_JSON: &str = "scraped_data.json";
/// File name of the processed article list.
pub const PROCESSED_JSON: &str = "processed_data.json";
/// File name of the processed article table.
pub const PROCESSED_CSV: &str = "processed_data.csv";
