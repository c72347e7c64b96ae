//! Embedding generation for the intent store, behind a pluggable trait so
//! the store is not hard-coded to one provider (§4.C).

use std::sync::Arc;

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use crate::error::{Error, Result};

/// Produces a vector embedding for a piece of text. Implementations may call
/// out to a local model or a remote API; the store only depends on this
/// trait, never on a concrete provider.
#[async_trait]
pub trait EmbeddingFn: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// The dimensionality of vectors this implementation produces. Used by
    /// the store to validate persisted snapshots against the configured
    /// embedding function at load time.
    fn dimensions(&self) -> usize;
}

/// Local embedding generation via fastembed's multilingual-e5-small model
/// (384 dimensions). The model auto-downloads to the local cache on first
/// use.
#[derive(Clone)]
pub struct FastEmbedFn {
    model: Arc<TextEmbedding>,
}

impl FastEmbedFn {
    pub fn new() -> Result<Self> {
        let model = TextEmbedding::try_new(
            InitOptions::new(EmbeddingModel::MultilingualE5Small).with_show_download_progress(true),
        )
        .map_err(|e| Error::Internal(format!("failed to initialize embedding model: {}", e)))?;

        Ok(FastEmbedFn { model: Arc::new(model) })
    }
}

#[async_trait]
impl EmbeddingFn for FastEmbedFn {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let model = self.model.clone();
        let text = text.to_string();

        tokio::task::spawn_blocking(move || {
            let embeddings = model
                .embed(vec![text], None)
                .map_err(|e| Error::Internal(format!("embedding error: {}", e)))?;
            embeddings
                .into_iter()
                .next()
                .ok_or_else(|| Error::Internal("embedding model returned no vectors".to_string()))
        })
        .await
        .map_err(|e| Error::Internal(format!("embedding task panicked: {}", e)))?
    }

    fn dimensions(&self) -> usize {
        384
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubEmbedFn {
        dims: usize,
    }

    #[async_trait]
    impl EmbeddingFn for StubEmbedFn {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let mut v = vec![0.0_f32; self.dims];
            for (i, b) in text.bytes().enumerate() {
                v[i % self.dims] += b as f32;
            }
            Ok(v)
        }

        fn dimensions(&self) -> usize {
            self.dims
        }
    }

    #[tokio::test]
    async fn stub_embed_fn_is_deterministic() {
        let f = StubEmbedFn { dims: 8 };
        let a = f.embed("hello world").await.unwrap();
        let b = f.embed("hello world").await.unwrap();
        assert_eq!(a, b);
    }
}
