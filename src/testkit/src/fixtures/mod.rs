//! Fixtures load a known dataset into an external store before a test
//! and remove it afterwards.
//!
//! A fixture is declared once with the endpoint and the statement files
//! it owns, then either wired into a [`crate::harness::SuiteHarness`]
//! (hook-style use) or run around a single block with [`with_fixture`] /
//! [`with_fixtures`], which guarantee the unload on both the success and
//! the error path.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::FixtureError;

pub mod cassandra;
pub mod elastic;
pub mod mysql;

pub use cassandra::CassandraFixture;
pub use elastic::ElasticFixture;
pub use mysql::MysqlFixture;

#[async_trait]
pub trait Fixture: Send + Sync {
    /// Load the associated dataset into the backing store.
    async fn load(&self) -> Result<(), FixtureError>;

    /// Remove the dataset that `load` put into the backing store.
    async fn unload(&self) -> Result<(), FixtureError>;
}

/// Read the full contents of a statement/document file into memory.
pub async fn read_file(path: &Path) -> Result<String, FixtureError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| FixtureError::ReadFile {
            path: path.to_path_buf(),
            source,
        })
}

/// Run `body` with the fixture loaded, unloading it again afterwards on
/// both the success and the error path.
pub async fn with_fixture<T, Fut>(fixture: &dyn Fixture, body: Fut) -> Result<T, FixtureError>
where
    Fut: Future<Output = T>,
{
    fixture.load().await?;
    let value = body.await;
    fixture.unload().await?;
    Ok(value)
}

/// Run `body` with all fixtures loaded in declaration order.
///
/// If a load fails, the fixtures already loaded are unloaded best-effort
/// before the error propagates. After the body, every fixture is
/// unloaded in reverse order regardless of earlier unload failures; the
/// first unload error wins.
pub async fn with_fixtures<T, Fut>(
    fixtures: &[Arc<dyn Fixture>],
    body: Fut,
) -> Result<T, FixtureError>
where
    Fut: Future<Output = T>,
{
    for (loaded, fixture) in fixtures.iter().enumerate() {
        if let Err(err) = fixture.load().await {
            for fixture in fixtures[..loaded].iter().rev() {
                if let Err(unload_err) = fixture.unload().await {
                    log::warn!("Unload after failed load also failed: {unload_err}");
                }
            }
            return Err(err);
        }
    }

    let value = body.await;

    let mut first_err: Option<FixtureError> = None;
    for fixture in fixtures.iter().rev() {
        if let Err(err) = fixture.unload().await {
            first_err.get_or_insert(err);
        }
    }

    match first_err {
        Some(err) => Err(err),
        None => Ok(value),
    }
}

/// Resolve a path relative to the calling crate's manifest directory.
///
/// Statement and document files live next to the tests that declare
/// them; this keeps fixture declarations independent of the working
/// directory the test runner happens to use.
#[macro_export]
macro_rules! resource_path {
    ($relative:expr) => {
        ::std::path::PathBuf::from(::std::concat!(
            ::std::env!("CARGO_MANIFEST_DIR"),
            "/",
            $relative
        ))
    };
}
