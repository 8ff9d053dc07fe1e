//! Optional process-wide registry slot.
//!
//! Prefer passing a [`Registry`] explicitly. This slot exists for callers that
//! cannot thread one through; it accepts a single finalized registry for the
//! life of the process.

use std::sync::{PoisonError, RwLock};

use tracing::info;

use super::Registry;
use crate::ExtrasError;

static INSTALLED: RwLock<Option<Registry>> = RwLock::new(None);

/// Installs `registry` for the rest of the process.
pub fn install(registry: Registry) -> Result<(), ExtrasError> {
    let mut slot = INSTALLED.write().unwrap_or_else(PoisonError::into_inner);
    if slot.is_some() {
        return Err(ExtrasError::AlreadyInstalled);
    }
    info!(?registry, "installed process-wide extras registry");
    *slot = Some(registry);
    Ok(())
}

/// The installed registry.
pub fn get() -> Result<Registry, ExtrasError> {
    INSTALLED
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .ok_or(ExtrasError::NotInstalled)
}

/// The installed registry, or an empty one.
pub fn get_or_empty() -> Registry {
    get().unwrap_or_default()
}

/// Empties the slot so the next test can install its own registry.
#[cfg(any(test, feature = "test-utils"))]
pub fn clear_for_testing() {
    let mut slot = INSTALLED.write().unwrap_or_else(PoisonError::into_inner);
    if slot.take().is_some() {
        tracing::warn!("cleared process-wide extras registry");
    }
}
