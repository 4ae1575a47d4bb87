//! The latest validation result, shared between the driver and the HTTP layer.

use std::sync::Arc;
use tokio::sync::RwLock;
use tollgate_license::ValidationResult;

/// Holds the most recent result. Publishing swaps a whole `Arc`, so readers
/// see either the previous result or the new one, never a mix.
#[derive(Debug, Clone, Default)]
pub struct ResultStore {
    inner: Arc<RwLock<Option<Arc<ValidationResult>>>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn publish(&self, result: Arc<ValidationResult>) {
        *self.inner.write().await = Some(result);
    }

    /// `None` until the first cycle completes.
    pub async fn latest(&self) -> Option<Arc<ValidationResult>> {
        self.inner.read().await.clone()
    }
}
