use crate::error::{Result, VectorStoreError};
use crate::vector::normalize_in_place;
use async_trait::async_trait;
use sha2::{Digest, Sha256};

/// Capability that turns text into a fixed-dimension vector.
///
/// The database never depends on a concrete model. Implementations may call
/// out to a local runtime or a remote API; failures surface as
/// [`VectorStoreError::EmbeddingError`].
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    /// Length of every vector this model produces
    fn dimension(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, preserving order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }
}

/// Deterministic bag-of-tokens embedding.
///
/// Each whitespace token is hashed with SHA-256; the first four bytes pick a
/// dimension and a sign. The result is L2-normalized. Useful for tests and
/// offline setups where no learned model is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashEmbeddingModel {
    dimension: usize,
}

impl HashEmbeddingModel {
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(VectorStoreError::invalid_config(
                "embedding dimension must be > 0",
            ));
        }
        Ok(Self { dimension })
    }

    /// Synchronous variant of [`EmbeddingModel::embed`].
    #[must_use]
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in text.split_whitespace() {
            let h = stable_hash32(token);
            let idx = (h & 0x7fff_ffff) as usize % self.dimension;
            vector[idx] += if h & 1 == 0 { 1.0 } else { -1.0 };
        }
        normalize_in_place(&mut vector);
        vector
    }
}

#[async_trait]
impl EmbeddingModel for HashEmbeddingModel {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }
}

fn stable_hash32(token: &str) -> i32 {
    let digest = Sha256::digest(token.as_bytes());
    i32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]])
}
