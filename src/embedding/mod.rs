//! Text-to-vector embedding pipeline.
//!
//! Provides the [`EmbeddingProvider`] trait and a remote HTTP implementation.
//! The provider is created via [`create_provider`] from configuration.

pub mod remote;

use crate::error::ServiceError;

/// Reference embedding dimensionality. Deployments may configure another; the
/// value is fixed for the lifetime of a deployment either way.
pub const EMBEDDING_DIM: usize = 768;

/// Trait for embedding text into vectors.
///
/// Implementations produce vectors of exactly `dimensions()` length. Empty or
/// whitespace-only input embeds to the zero vector without touching the remote
/// model; a remote failure for non-empty text is
/// [`ServiceError::EmbeddingUnavailable`]. All methods are synchronous;
/// callers in async contexts should use `tokio::task::spawn_blocking`.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text string into a vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError>;

    /// Return the number of dimensions this provider produces.
    fn dimensions(&self) -> usize {
        EMBEDDING_DIM
    }
}

/// Create an embedding provider from config.
///
/// Currently only `"remote"` is supported (OpenAI-compatible embeddings API).
pub fn create_provider(
    config: &crate::config::EmbeddingConfig,
) -> anyhow::Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "remote" => {
            let provider = remote::RemoteEmbeddingProvider::new(config)?;
            Ok(Box::new(provider))
        }
        other => anyhow::bail!("unknown embedding provider: {other}. Supported: remote"),
    }
}
