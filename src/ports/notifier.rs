//! Operator notification port trait.

use async_trait::async_trait;

#[async_trait]
pub trait NotifierPort: Send + Sync {
    /// Deliver a human-readable message, best-effort. Implementations log
    /// and swallow transport failures; this never raises to the caller and
    /// must never block the pipeline beyond the send itself.
    async fn send(&self, message: &str);
}
