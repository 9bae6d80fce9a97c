//! Engine context abstraction and the local DataFusion implementation.
//!
//! A context is the long-lived handle test suites run their queries
//! through. Suites never build one directly; they declare a
//! [`ContextFactory`] and let the harness decide (per policy) whether a
//! fresh context is started or a shared one is reused.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use datafusion::prelude::{DataFrame, SessionConfig, SessionContext};

use common::config::EngineConfig;

use crate::error::EngineError;

/// A live processing context.
#[async_trait]
pub trait EngineContext: Send + Sync {
    /// The underlying engine session.
    fn session(&self) -> &SessionContext;

    /// Drop cached state (registered tables) while keeping the context
    /// usable. The shared policy invokes this between suites.
    async fn clear_cache(&self) -> Result<(), EngineError>;

    /// Terminate the context. Idempotent; using the context afterwards
    /// is a caller error.
    async fn stop(&self) -> Result<(), EngineError>;

    fn is_stopped(&self) -> bool;
}

/// Builds engine contexts of one particular kind.
///
/// The `kind` string is the identity the shared-context slot matches on:
/// a suite requesting the kind currently held reuses the live context,
/// any other kind forces a replacement.
#[async_trait]
pub trait ContextFactory: Send + Sync {
    fn kind(&self) -> &str;

    async fn build(&self) -> Result<Arc<dyn EngineContext>, EngineError>;
}

/// In-process DataFusion context.
pub struct LocalEngineContext {
    session: SessionContext,
    stopped: AtomicBool,
}

impl LocalEngineContext {
    pub fn new(config: &EngineConfig) -> Self {
        let mut session_config = SessionConfig::new().with_batch_size(config.batch_size);
        if let Some(partitions) = config.target_partitions {
            session_config = session_config.with_target_partitions(partitions);
        }

        Self {
            session: SessionContext::new_with_config(session_config),
            stopped: AtomicBool::new(false),
        }
    }

    /// Run a query and hand back the lazy result frame.
    pub async fn sql(&self, query: &str) -> Result<DataFrame, EngineError> {
        Ok(self.session.sql(query).await?)
    }

    /// True when `name` resolves to a table in the session catalog.
    pub fn has_table(&self, name: &str) -> bool {
        self.session.table_exist(name).unwrap_or(false)
    }

    /// Drop a table from the session catalog if present.
    pub async fn drop_table(&self, name: &str) -> Result<(), EngineError> {
        self.session
            .sql(&format!("DROP TABLE IF EXISTS {name}"))
            .await?
            .collect()
            .await?;
        Ok(())
    }

    fn deregister_all_tables(&self) -> Result<(), EngineError> {
        let config = self.session.copied_config();
        let catalog_name = config.options().catalog.default_catalog.clone();
        let schema_name = config.options().catalog.default_schema.clone();

        let Some(catalog) = self.session.catalog(&catalog_name) else {
            return Ok(());
        };
        let Some(schema) = catalog.schema(&schema_name) else {
            return Ok(());
        };

        for table in schema.table_names() {
            self.session.deregister_table(table.as_str())?;
        }

        Ok(())
    }
}

#[async_trait]
impl EngineContext for LocalEngineContext {
    fn session(&self) -> &SessionContext {
        &self.session
    }

    async fn clear_cache(&self) -> Result<(), EngineError> {
        self.deregister_all_tables()
    }

    async fn stop(&self) -> Result<(), EngineError> {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        log::info!("Stopping local engine context");
        self.deregister_all_tables()
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Factory for [`LocalEngineContext`].
///
/// Suites that tune the engine differently should also give their
/// factory a distinct kind, otherwise the shared policy will happily
/// hand them a context built with someone else's tuning.
pub struct LocalContextFactory {
    kind: String,
    config: EngineConfig,
}

impl LocalContextFactory {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            kind: "local".to_string(),
            config,
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }
}

impl Default for LocalContextFactory {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[async_trait]
impl ContextFactory for LocalContextFactory {
    fn kind(&self) -> &str {
        &self.kind
    }

    async fn build(&self) -> Result<Arc<dyn EngineContext>, EngineError> {
        log::info!("Starting local engine context of kind {:?}", self.kind);
        Ok(Arc::new(LocalEngineContext::new(&self.config)))
    }
}
