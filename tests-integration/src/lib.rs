//! Common test utilities and helpers for integration tests

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use common::config::EngineConfig;
use testkit::context::{ContextFactory, EngineContext, LocalEngineContext};
use testkit::error::{EngineError, FixtureError};
use testkit::fixtures::Fixture;

/// Initialize test logging
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Write a statement file into `dir` and hand back its path
pub fn write_statement_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("Failed to write statement file");
    path
}

/// Context factory that counts how many contexts it built.
///
/// Clones share the counter, so two suites can be handed "the same"
/// factory while the test keeps a single view of the build count.
#[derive(Clone)]
pub struct CountingFactory {
    kind: String,
    config: EngineConfig,
    builds: Arc<AtomicUsize>,
}

impl CountingFactory {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            config: EngineConfig::default(),
            builds: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContextFactory for CountingFactory {
    fn kind(&self) -> &str {
        &self.kind
    }

    async fn build(&self) -> Result<Arc<dyn EngineContext>, EngineError> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(LocalEngineContext::new(&self.config)))
    }
}

/// Fixture that records its load/unload calls into a shared log,
/// optionally failing the load.
pub struct RecordingFixture {
    name: String,
    log: Arc<Mutex<Vec<String>>>,
    fail_load: bool,
}

impl RecordingFixture {
    pub fn new(name: impl Into<String>, log: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            name: name.into(),
            log,
            fail_load: false,
        }
    }

    pub fn failing_load(name: impl Into<String>, log: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            name: name.into(),
            log,
            fail_load: true,
        }
    }
}

#[async_trait]
impl Fixture for RecordingFixture {
    async fn load(&self) -> Result<(), FixtureError> {
        self.log.lock().unwrap().push(format!("{}:load", self.name));
        if self.fail_load {
            return Err(FixtureError::UnexpectedStatus {
                status: 500,
                body: "injected load failure".to_string(),
            });
        }
        Ok(())
    }

    async fn unload(&self) -> Result<(), FixtureError> {
        self.log.lock().unwrap().push(format!("{}:unload", self.name));
        Ok(())
    }
}
