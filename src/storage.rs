//! JSON export of research reports.

use crate::research::ResearchReport;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("io error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Writes research reports into one directory
pub struct ReportStore {
    dir: PathBuf,
}

impl ReportStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Save a report as pretty JSON and return the file written
    pub fn save(&self, report: &ResearchReport) -> Result<PathBuf, StorageError> {
        let path = self.dir.join(report_file_name(&report.query, report.timestamp));
        let io_error = |source| StorageError::Io {
            path: path.clone(),
            source,
        };

        std::fs::create_dir_all(&self.dir).map_err(io_error)?;
        let json = serde_json::to_vec_pretty(report)?;
        std::fs::write(&path, json).map_err(io_error)?;

        tracing::info!(path = %path.display(), "research report saved");
        Ok(path)
    }

    /// Load a previously saved report
    pub fn load(&self, path: &Path) -> Result<ResearchReport, StorageError> {
        let data = std::fs::read(path).map_err(|source| StorageError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_slice(&data)?)
    }
}

/// `research_<topic>_<YYYYmmdd_HHMMSS>.json`, with the topic reduced to a
/// filesystem-safe slug
pub fn report_file_name(topic: &str, timestamp: DateTime<Utc>) -> String {
    format!(
        "research_{}_{}.json",
        slugify(topic),
        timestamp.format("%Y%m%d_%H%M%S")
    )
}

fn slugify(topic: &str) -> String {
    let slug = topic
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase();
    let slug: String = slug.chars().take(60).collect();
    if slug.is_empty() {
        "topic".to_string()
    } else {
        slug
    }
}
