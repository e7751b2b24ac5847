//! Initialize-once runner handle for request-driven serving.
//!
//! Loading a model is expensive and must happen at most once, even when the
//! first requests arrive concurrently. The handle wraps a
//! `tokio::sync::OnceCell`: every caller awaits the same initialization,
//! exactly one loader runs, and a failed load leaves the cell empty so a
//! later request may retry. The handle is meant to be injected into request
//! handlers instead of living in module-global state.

use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::error::InferError;

pub struct LazyRunner<R> {
    cell: OnceCell<Arc<R>>,
}

impl<R> Default for LazyRunner<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> LazyRunner<R> {
    pub fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// Get the runner, loading it on first use.
    ///
    /// Concurrent first calls race on the cell, not on the loader: only one
    /// invocation of `load` ever runs to completion.
    pub async fn get_or_load<F>(&self, load: F) -> Result<Arc<R>, InferError>
    where
        F: FnOnce() -> Result<R, InferError>,
    {
        self.cell
            .get_or_try_init(|| async { load().map(Arc::new) })
            .await
            .cloned()
    }

    /// The runner, if some earlier call already loaded it.
    pub fn get(&self) -> Option<Arc<R>> {
        self.cell.get().cloned()
    }
}
