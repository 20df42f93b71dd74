use std::path::PathBuf;

use thiserror::Error;

use cald_schema::SchemaError;

/// Failure while producing a report.
#[derive(Error, Debug)]
pub enum ReportError {
    /// A file could not be read or written.
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A document is not valid JSON.
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The docset configuration is unusable.
    #[error("docset configuration error: {0}")]
    Config(String),

    /// A docset glob pattern is malformed.
    #[error("invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// CSV output failed.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// GEXF output failed.
    #[error("xml error: {0}")]
    Xml(String),

    /// A docset names an entity the registry lacks.
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl ReportError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
