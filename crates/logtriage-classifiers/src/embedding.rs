//! Text embedders for the semantic tier
//!
//! [`Embedder`] is the seam between the semantic classifier and whatever model
//! turns text into vectors. [`HashingEmbedder`] is a deterministic, model-free
//! implementation (signed feature hashing over word tokens) used for offline
//! runs and tests; the candle-backed [`crate::model_loader::BertEmbedder`] is the
//! production implementation.

use logtriage_core::{Error, Result};
use sha2::{Digest, Sha256};

/// Turns text into a fixed-dimension vector
///
/// Implementations are loaded once and shared; `embed` must be safe to call
/// concurrently and must not mutate shared state.
pub trait Embedder: Send + Sync {
    /// Embed a single text
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Output dimension
    fn dimension(&self) -> usize;

    /// Model identifier for logs and metadata
    fn name(&self) -> &str;
}

/// Deterministic feature-hashing embedder
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
    name: String,
}

impl HashingEmbedder {
    pub const DEFAULT_DIMENSION: usize = 256;

    /// Create an embedder with the given output dimension
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::config("Hashing embedder dimension must be positive"));
        }
        Ok(Self {
            dimension,
            name: format!("hashing-{}", dimension),
        })
    }

    fn bucket(&self, token: &str) -> (usize, f32) {
        let digest = Sha256::digest(token.as_bytes());
        let mut index_bytes = [0u8; 8];
        index_bytes.copy_from_slice(&digest[..8]);
        let index = (u64::from_le_bytes(index_bytes) % self.dimension as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        (index, sign)
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self {
            dimension: Self::DEFAULT_DIMENSION,
            name: format!("hashing-{}", Self::DEFAULT_DIMENSION),
        }
    }
}

impl Embedder for HashingEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimension];

        for token in tokenize(text) {
            let (index, sign) = self.bucket(&token);
            vector[index] += sign;
        }

        l2_normalize(&mut vector);
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Lowercased word tokens with digit runs collapsed, so `User123` and `User7`
/// land in the same bucket
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| {
            let mut token = String::with_capacity(t.len());
            let mut last_digit = false;
            for c in t.chars() {
                if c.is_ascii_digit() {
                    if !last_digit {
                        token.push('0');
                    }
                    last_digit = true;
                } else {
                    token.extend(c.to_lowercase());
                    last_digit = false;
                }
            }
            token
        })
}

/// Scale `vector` to unit length in place; the zero vector is left untouched
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        vector.iter_mut().for_each(|x| *x /= norm);
    }
}

/// Cosine similarity; 0.0 when either side is the zero vector
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a <= f32::EPSILON || norm_b <= f32::EPSILON {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
