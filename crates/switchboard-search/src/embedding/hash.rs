//! FNV-1a feature-hashing embedder
//!
//! Deterministic and dependency-free. Captures lexical overlap only, which
//! makes it the default for development and the provider used in tests.

use async_trait::async_trait;
use switchboard_core::tokenize;

use super::EmbeddingProvider;
use crate::error::SearchResult;

/// FNV-1a offset basis (64-bit).
const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;

/// FNV-1a prime (64-bit).
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// Hash-based embedder: each lowercase token adds a signed unit to one dimension
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0_f32; self.dimension];
        for token in tokenize(text) {
            let hash = fnv1a_hash(token.as_bytes());
            let index = (hash % self.dimension as u64) as usize;
            let sign = if (hash >> 63) == 1 { 1.0 } else { -1.0 };
            embedding[index] += sign;
        }
        l2_normalize(embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn encode(&self, texts: &[String]) -> SearchResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_sync(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "fnv1a-hash"
    }
}

fn fnv1a_hash(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET;
    for &byte in bytes {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

fn l2_normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}
