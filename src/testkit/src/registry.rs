//! The process-wide shared-context slot, made explicit.
//!
//! The slot holds at most one live context together with the kind that
//! built it. Both lifecycle policies go through the registry, which is
//! how the "at most one context alive per registry" invariant is kept:
//! a per-suite start evicts whatever is cached, a shared start either
//! reuses or replaces it.
//!
//! Harnesses default to [`ContextRegistry::global`], but every harness
//! accepts its own registry instance, so concurrent test runners can
//! stay isolated instead of fighting over hidden global state.

use std::sync::Arc;

use once_cell::sync::Lazy;
use tokio::sync::Mutex;

use crate::context::{ContextFactory, EngineContext};
use crate::error::EngineError;

static GLOBAL: Lazy<Arc<ContextRegistry>> = Lazy::new(|| Arc::new(ContextRegistry::new()));

struct Slot {
    kind: String,
    context: Arc<dyn EngineContext>,
}

pub struct ContextRegistry {
    slot: Mutex<Option<Slot>>,
}

impl ContextRegistry {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// The default registry shared by every harness in the process.
    pub fn global() -> Arc<ContextRegistry> {
        Arc::clone(&GLOBAL)
    }

    /// Stop and clear whatever the slot holds.
    pub async fn evict(&self) -> Result<(), EngineError> {
        let mut slot = self.slot.lock().await;
        Self::stop_entry(&mut slot).await
    }

    /// Per-suite policy: evict any shared context, then build a brand-new
    /// one owned by the caller. The fresh context is NOT stored in the
    /// slot; the caller stops it when its suite finishes.
    pub async fn acquire_fresh(
        &self,
        factory: &dyn ContextFactory,
    ) -> Result<Arc<dyn EngineContext>, EngineError> {
        let mut slot = self.slot.lock().await;
        Self::stop_entry(&mut slot).await?;

        log::info!("Starting a dedicated context of kind {:?}", factory.kind());
        factory.build().await
    }

    /// Shared policy: reuse the held context when the kind matches,
    /// otherwise stop it (if any) and store a newly built one.
    pub async fn acquire_shared(
        &self,
        factory: &dyn ContextFactory,
    ) -> Result<Arc<dyn EngineContext>, EngineError> {
        let mut slot = self.slot.lock().await;

        if let Some(entry) = slot.as_ref() {
            if entry.kind == factory.kind() {
                log::info!("Reusing the shared context of kind {:?}", entry.kind);
                return Ok(Arc::clone(&entry.context));
            }
        }

        Self::stop_entry(&mut slot).await?;

        log::info!("Starting a new shared context of kind {:?}", factory.kind());
        let context = factory.build().await?;
        *slot = Some(Slot {
            kind: factory.kind().to_string(),
            context: Arc::clone(&context),
        });

        Ok(context)
    }

    /// Kind of the context currently held, if any.
    pub async fn held_kind(&self) -> Option<String> {
        self.slot.lock().await.as_ref().map(|entry| entry.kind.clone())
    }

    async fn stop_entry(slot: &mut Option<Slot>) -> Result<(), EngineError> {
        if let Some(entry) = slot.take() {
            log::info!("Stopping the previous shared context of kind {:?}", entry.kind);
            entry.context.stop().await?;
        }
        Ok(())
    }
}

impl Default for ContextRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::LocalContextFactory;

    #[tokio::test]
    async fn test_shared_acquire_reuses_same_kind() {
        let registry = ContextRegistry::new();
        let factory = LocalContextFactory::default();

        let first = registry.acquire_shared(&factory).await.unwrap();
        let second = registry.acquire_shared(&factory).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.held_kind().await.as_deref(), Some("local"));
    }

    #[tokio::test]
    async fn test_shared_acquire_replaces_on_kind_change() {
        let registry = ContextRegistry::new();
        let first = registry
            .acquire_shared(&LocalContextFactory::default())
            .await
            .unwrap();

        let tuned = LocalContextFactory::default().with_kind("tuned");
        let second = registry.acquire_shared(&tuned).await.unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert!(first.is_stopped());
        assert!(!second.is_stopped());
        assert_eq!(registry.held_kind().await.as_deref(), Some("tuned"));
    }

    #[tokio::test]
    async fn test_fresh_acquire_evicts_shared_slot() {
        let registry = ContextRegistry::new();
        let shared = registry
            .acquire_shared(&LocalContextFactory::default())
            .await
            .unwrap();

        let fresh = registry
            .acquire_fresh(&LocalContextFactory::default())
            .await
            .unwrap();

        assert!(shared.is_stopped());
        assert!(!fresh.is_stopped());
        // The dedicated context must not be cached for reuse
        assert_eq!(registry.held_kind().await, None);
    }

    #[tokio::test]
    async fn test_evict_clears_slot() {
        let registry = ContextRegistry::new();
        let shared = registry
            .acquire_shared(&LocalContextFactory::default())
            .await
            .unwrap();

        registry.evict().await.unwrap();

        assert!(shared.is_stopped());
        assert_eq!(registry.held_kind().await, None);
    }
}
