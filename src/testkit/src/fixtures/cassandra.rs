//! Fixture for the wide-column store.

use std::path::PathBuf;

use async_trait::async_trait;
use scylla::SessionBuilder;

use common::config::CassandraConfig;

use crate::error::FixtureError;

use super::{Fixture, read_file};

/// Executes CQL statement files against a wide-column cluster.
///
/// Statements are separated by `;`; blank fragments are skipped. Every
/// call opens a fresh session against the configured host and runs the
/// statements one by one, so the first failing statement aborts the
/// rest of that call. There is no batching and no retry.
///
/// ```rust,ignore
/// let fixture = CassandraFixture::new(
///     "cassandra.docker",
///     resource_path!("tests/resources/setup.cql"),
///     resource_path!("tests/resources/teardown.cql"),
/// );
/// ```
pub struct CassandraFixture {
    host: String,
    setup_file: PathBuf,
    teardown_file: PathBuf,
}

impl CassandraFixture {
    pub fn new(
        host: impl Into<String>,
        setup_file: impl Into<PathBuf>,
        teardown_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            host: host.into(),
            setup_file: setup_file.into(),
            teardown_file: teardown_file.into(),
        }
    }

    pub fn from_config(
        config: &CassandraConfig,
        setup_file: impl Into<PathBuf>,
        teardown_file: impl Into<PathBuf>,
    ) -> Self {
        Self::new(config.host.clone(), setup_file, teardown_file)
    }

    async fn execute(&self, statements: &str) -> Result<(), FixtureError> {
        let session = SessionBuilder::new()
            .known_node(&self.host)
            .build()
            .await?;

        for statement in statements.split(';') {
            let statement = statement.trim();
            if statement.is_empty() {
                continue;
            }
            session.query_unpaged(statement, ()).await?;
        }

        Ok(())
    }
}

#[async_trait]
impl Fixture for CassandraFixture {
    async fn load(&self) -> Result<(), FixtureError> {
        let statements = read_file(&self.setup_file).await?;
        self.execute(&statements).await
    }

    async fn unload(&self) -> Result<(), FixtureError> {
        let statements = read_file(&self.teardown_file).await?;
        self.execute(&statements).await
    }
}
