//! Suite lifecycle management.
//!
//! A [`SuiteHarness`] wraps one test suite: it acquires an engine
//! context when the suite starts, loads suite-scoped fixtures, fires
//! per-test fixtures around every test, and releases everything when
//! the suite finishes. The two policies differ only in how the context
//! is acquired and released; fixture handling is identical.

use std::sync::Arc;

use crate::context::{ContextFactory, EngineContext, LocalContextFactory};
use crate::error::HarnessError;
use crate::fixtures::Fixture;
use crate::registry::ContextRegistry;

/// On-disk artifacts the embedded metastore leaves behind in the working
/// directory. Removed best-effort when a per-suite context shuts down.
pub const EMBEDDED_METASTORE_DIR: &str = "metastore_db";
pub const EMBEDDED_METASTORE_LOG: &str = "metastore.log";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextPolicy {
    /// A dedicated context per suite, stopped when the suite finishes.
    /// Starting under this policy also evicts any lingering shared
    /// context so the two policies never keep two contexts alive.
    PerSuite,
    /// One context cached in the registry and reused by every suite
    /// requesting the same factory kind. Finishing a suite only clears
    /// the context's cached state; the context itself stays alive.
    Shared,
}

pub struct SuiteHarness {
    registry: Arc<ContextRegistry>,
    factory: Arc<dyn ContextFactory>,
    policy: ContextPolicy,
    suite_fixtures: Vec<Arc<dyn Fixture>>,
    test_fixtures: Vec<Arc<dyn Fixture>>,
    context: Option<Arc<dyn EngineContext>>,
}

impl SuiteHarness {
    pub fn builder() -> SuiteHarnessBuilder {
        SuiteHarnessBuilder::new()
    }

    /// Suite setup: acquire a context per policy, then load suite
    /// fixtures in declaration order.
    ///
    /// When a fixture fails to load, the ones already loaded are
    /// unloaded best-effort before the error propagates, so a half-set-up
    /// suite does not leak data into the stores.
    pub async fn start(&mut self) -> Result<(), HarnessError> {
        let context = match self.policy {
            ContextPolicy::PerSuite => self.registry.acquire_fresh(self.factory.as_ref()).await?,
            ContextPolicy::Shared => self.registry.acquire_shared(self.factory.as_ref()).await?,
        };
        self.context = Some(context);

        load_all(&self.suite_fixtures).await?;
        Ok(())
    }

    /// Suite teardown. Every step runs even when an earlier one fails;
    /// the first error is reported after all of them had their chance.
    pub async fn finish(&mut self) -> Result<(), HarnessError> {
        let context = self.context.take().ok_or(HarnessError::NotStarted)?;
        let mut first_err: Option<HarnessError> = None;

        match self.policy {
            ContextPolicy::PerSuite => {
                if let Err(err) = context.stop().await {
                    first_err.get_or_insert(err.into());
                }
                remove_metastore_artifacts();
            }
            ContextPolicy::Shared => {
                if let Err(err) = context.clear_cache().await {
                    first_err.get_or_insert(err.into());
                }
            }
        }

        if let Err(err) = unload_all(&self.suite_fixtures).await {
            first_err.get_or_insert(err);
        }

        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Load per-test fixtures; call before every individual test.
    pub async fn before_each(&self) -> Result<(), HarnessError> {
        load_all(&self.test_fixtures).await
    }

    /// Unload per-test fixtures; call after every individual test.
    pub async fn after_each(&self) -> Result<(), HarnessError> {
        unload_all(&self.test_fixtures).await
    }

    /// The live context of this suite.
    pub fn context(&self) -> Result<&Arc<dyn EngineContext>, HarnessError> {
        self.context.as_ref().ok_or(HarnessError::NotStarted)
    }

    pub fn policy(&self) -> ContextPolicy {
        self.policy
    }
}

/// Load fixtures in order, rolling the already-loaded ones back if one
/// of them fails.
async fn load_all(fixtures: &[Arc<dyn Fixture>]) -> Result<(), HarnessError> {
    for (loaded, fixture) in fixtures.iter().enumerate() {
        if let Err(err) = fixture.load().await {
            for fixture in fixtures[..loaded].iter().rev() {
                if let Err(unload_err) = fixture.unload().await {
                    log::warn!("Rollback unload failed: {unload_err}");
                }
            }
            return Err(err.into());
        }
    }
    Ok(())
}

/// Unload fixtures in reverse load order, attempting every one of them
/// before reporting the first failure.
async fn unload_all(fixtures: &[Arc<dyn Fixture>]) -> Result<(), HarnessError> {
    let mut first_err: Option<HarnessError> = None;
    for fixture in fixtures.iter().rev() {
        if let Err(err) = fixture.unload().await {
            first_err.get_or_insert(err.into());
        }
    }
    match first_err {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn remove_metastore_artifacts() {
    if let Err(err) = std::fs::remove_dir_all(EMBEDDED_METASTORE_DIR) {
        if err.kind() != std::io::ErrorKind::NotFound {
            log::debug!("Could not remove {EMBEDDED_METASTORE_DIR}: {err}");
        }
    }
    if let Err(err) = std::fs::remove_file(EMBEDDED_METASTORE_LOG) {
        if err.kind() != std::io::ErrorKind::NotFound {
            log::debug!("Could not remove {EMBEDDED_METASTORE_LOG}: {err}");
        }
    }
}

pub struct SuiteHarnessBuilder {
    registry: Option<Arc<ContextRegistry>>,
    factory: Option<Arc<dyn ContextFactory>>,
    policy: ContextPolicy,
    suite_fixtures: Vec<Arc<dyn Fixture>>,
    test_fixtures: Vec<Arc<dyn Fixture>>,
}

impl SuiteHarnessBuilder {
    pub fn new() -> Self {
        Self {
            registry: None,
            factory: None,
            policy: ContextPolicy::PerSuite,
            suite_fixtures: Vec::new(),
            test_fixtures: Vec::new(),
        }
    }

    /// Use a dedicated registry instead of the process-wide one.
    pub fn registry(mut self, registry: Arc<ContextRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn factory(mut self, factory: impl ContextFactory + 'static) -> Self {
        self.factory = Some(Arc::new(factory));
        self
    }

    /// Reuse one long-lived context across suites of the same kind.
    pub fn shared(mut self) -> Self {
        self.policy = ContextPolicy::Shared;
        self
    }

    /// Dedicated context per suite (the default).
    pub fn per_suite(mut self) -> Self {
        self.policy = ContextPolicy::PerSuite;
        self
    }

    /// Fixture loaded once before any test of the suite and unloaded
    /// after all of them.
    pub fn suite_fixture(mut self, fixture: impl Fixture + 'static) -> Self {
        self.suite_fixtures.push(Arc::new(fixture));
        self
    }

    /// Fixture loaded/unloaded around every individual test.
    pub fn test_fixture(mut self, fixture: impl Fixture + 'static) -> Self {
        self.test_fixtures.push(Arc::new(fixture));
        self
    }

    pub fn build(self) -> SuiteHarness {
        SuiteHarness {
            registry: self.registry.unwrap_or_else(ContextRegistry::global),
            factory: self
                .factory
                .unwrap_or_else(|| Arc::new(LocalContextFactory::default())),
            policy: self.policy,
            suite_fixtures: self.suite_fixtures,
            test_fixtures: self.test_fixtures,
            context: None,
        }
    }
}

impl Default for SuiteHarnessBuilder {
    fn default() -> Self {
        Self::new()
    }
}
