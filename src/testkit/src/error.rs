use std::path::PathBuf;

use datafusion::arrow::error::ArrowError;
use datafusion::error::DataFusionError;

/// Failures raised while building, clearing, or stopping an engine context.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("engine operation failed: {0}")]
    DataFusion(#[from] DataFusionError),
}

/// Failures raised by fixture `load`/`unload` calls.
///
/// These are never caught by the harness beyond rollback bookkeeping;
/// they propagate and fail the enclosing test.
#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("failed to read fixture file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("search index returned {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("search index request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("wide-column session could not be opened: {0}")]
    CassandraConnect(#[from] scylla::transport::errors::NewSessionError),

    #[error("wide-column statement failed: {0}")]
    CassandraStatement(#[from] scylla::transport::errors::QueryError),

    #[error("relational statement batch failed: {0}")]
    Mysql(#[from] sqlx::Error),
}

/// Failures surfaced by the suite lifecycle hooks.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("suite harness has not been started")]
    NotStarted,

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Fixture(#[from] FixtureError),
}

/// Failures raised by the row-set comparator.
#[derive(Debug, thiserror::Error)]
pub enum CompareError {
    #[error("failed to collect result set: {0}")]
    Collect(#[from] DataFusionError),

    #[error("failed to render rows as JSON: {0}")]
    Render(#[from] ArrowError),

    #[error("failed to decode rendered rows: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("expected rows must be JSON objects, got: {0}")]
    ExpectedNotObject(String),

    #[error("row sets differ ({detail})\nactual:   {actual}\nexpected: {expected}")]
    Mismatch {
        detail: String,
        actual: String,
        expected: String,
    },
}
