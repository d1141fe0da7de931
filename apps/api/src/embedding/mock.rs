//! Deterministic embedder for tests: a hashed bag-of-words, L2-normalized, with a call log.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{EmbeddingError, EmbeddingGenerator};

pub struct MockEmbedder {
    dimension: usize,
    fail: bool,
    inputs: Mutex<Vec<String>>,
}

impl MockEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            fail: false,
            inputs: Mutex::new(Vec::new()),
        }
    }

    /// An embedder whose every call fails like an unreachable model endpoint.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(8)
        }
    }

    pub fn call_count(&self) -> usize {
        self.inputs.lock().unwrap().len()
    }

    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmbeddingGenerator for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.inputs.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(EmbeddingError::Api {
                status: 500,
                message: "mock embedder failure".to_string(),
            });
        }

        let mut vector = vec![0.0_f32; self.dimension];
        for word in text.split_whitespace() {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            vector[(hasher.finish() as usize) % self.dimension] += 1.0;
        }
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(vector)
    }
}
