use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{InferenceEngine, TensorBuffer};
use crate::error::Result;

/// First-call-cached kernel: the first `run` acquires a lock, delegates
/// to an inner engine, and memoizes the output; every later call returns
/// a clone of the memoized buffer without touching the inner engine.
/// Used for warm-up and for deterministic tests that want a fixed output
/// regardless of input.
pub struct CachedInferenceEngine {
    inner: Arc<dyn InferenceEngine>,
    memo: Mutex<Option<TensorBuffer>>,
}

impl CachedInferenceEngine {
    pub fn new(inner: Arc<dyn InferenceEngine>) -> Self {
        Self { inner, memo: Mutex::new(None) }
    }
}

#[async_trait]
impl InferenceEngine for CachedInferenceEngine {
    async fn run(&self, input: TensorBuffer) -> Result<TensorBuffer> {
        let mut memo = self.memo.lock().await;
        if let Some(cached) = memo.as_ref() {
            return Ok(cached.clone());
        }
        let output = self.inner.run(input).await?;
        *memo = Some(output.clone());
        Ok(output)
    }

    fn current_max_capacity(&self) -> usize {
        self.inner.current_max_capacity()
    }

    async fn increment_parallelism(&self) {
        self.inner.increment_parallelism().await;
    }

    async fn decrement_parallelism(&self) {
        self.inner.decrement_parallelism().await;
    }

    fn dispose(&self) {
        self.inner.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::null::NullInferenceEngine;

    #[tokio::test]
    async fn second_call_returns_memoized_output() {
        let null = Arc::new(NullInferenceEngine::new(None, vec![1, 2, 2]));
        let cached = CachedInferenceEngine::new(null);

        let a = cached.run(TensorBuffer::new(vec![0.0; 4], vec![1, 2, 2])).await.unwrap();
        let b = cached.run(TensorBuffer::new(vec![9.0; 4], vec![1, 2, 2])).await.unwrap();
        assert_eq!(a, b);
    }
}
