use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{InferenceEngine, TensorBuffer};
use crate::error::{Result, SpeedReaderError};

/// Validates the input shape against a declared expected shape (if any)
/// and returns a zero buffer of a declared output shape. Used for
/// pipeline tests that exercise detector/recognizer postprocessing
/// against a known output without loading real model weights.
pub struct NullInferenceEngine {
    expected_input_shape: Option<Vec<usize>>,
    output_shape: Vec<usize>,
    capacity: AtomicUsize,
}

impl NullInferenceEngine {
    pub fn new(expected_input_shape: Option<Vec<usize>>, output_shape: Vec<usize>) -> Self {
        Self { expected_input_shape, output_shape, capacity: AtomicUsize::new(1) }
    }
}

#[async_trait]
impl InferenceEngine for NullInferenceEngine {
    async fn run(&self, input: TensorBuffer) -> Result<TensorBuffer> {
        if let Some(expected) = &self.expected_input_shape {
            if expected != &input.shape {
                return Err(SpeedReaderError::invalid_input(format!(
                    "expected input shape {:?}, got {:?}",
                    expected, input.shape
                )));
            }
        }
        let count: usize = self.output_shape.iter().product();
        Ok(TensorBuffer::new(vec![0.0; count], self.output_shape.clone()))
    }

    fn current_max_capacity(&self) -> usize {
        self.capacity.load(Ordering::SeqCst)
    }

    async fn increment_parallelism(&self) {
        self.capacity.fetch_add(1, Ordering::SeqCst);
    }

    async fn decrement_parallelism(&self) {
        let mut current = self.capacity.load(Ordering::SeqCst);
        while current > 1 {
            match self.capacity.compare_exchange(
                current,
                current - 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
    }

    fn dispose(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_mismatched_input_shape() {
        let engine = NullInferenceEngine::new(Some(vec![1, 3, 640, 640]), vec![1, 1, 640, 640]);
        let result = engine.run(TensorBuffer::new(vec![0.0; 3 * 640 * 640], vec![1, 3, 100, 100])).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn returns_zero_buffer_of_declared_shape() {
        let engine = NullInferenceEngine::new(None, vec![1, 1, 4, 4]);
        let output = engine.run(TensorBuffer::new(vec![1.0; 16], vec![1, 1, 4, 4])).await.unwrap();
        assert_eq!(output.shape, vec![1, 1, 4, 4]);
        assert!(output.data.iter().all(|&v| v == 0.0));
    }
}
