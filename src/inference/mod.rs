//! Inference engine façade (C5): a thread-safe `run` over opaque tensor
//! buffers, plus a `current_max_capacity` counter the adaptive controller
//! (C6) can grow or shrink. Three kernel variants implement the same
//! capability trait: a real ONNX-backed kernel, a first-call-cached kernel
//! for warm-up and deterministic tests, and a null kernel for pipeline
//! tests that never need real model weights.

pub mod cached;
pub mod null;
pub mod real;

use async_trait::async_trait;

use crate::error::Result;

/// A tensor buffer paired with its shape, the unit the façade moves
/// between stages and the underlying runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorBuffer {
    pub data: Vec<f32>,
    pub shape: Vec<usize>,
}

impl TensorBuffer {
    pub fn new(data: Vec<f32>, shape: Vec<usize>) -> Self {
        Self { data, shape }
    }

    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }
}

/// Capability interface for the three engine variants. Implementers may
/// pick a tagged enum or a trait object; this crate uses a trait object
/// (`Arc<dyn InferenceEngine>`) since per-job dispatch overhead is
/// negligible next to an inference call.
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    /// Runs one inference call. May suspend while waiting for a
    /// concurrency permit. Safe to call from multiple concurrent tasks.
    async fn run(&self, input: TensorBuffer) -> Result<TensorBuffer>;

    /// Current concurrency ceiling. Monotonic within a controller epoch;
    /// changes only via `increment_parallelism`/`decrement_parallelism`.
    fn current_max_capacity(&self) -> usize;

    /// Grows the concurrency ceiling by one. Never suspends.
    async fn increment_parallelism(&self);

    /// Shrinks the concurrency ceiling by one, never below 1. Suspends
    /// until an outstanding permit is returned.
    async fn decrement_parallelism(&self);

    /// Releases kernel resources (session handles, thread pools).
    fn dispose(&self);
}

pub use cached::CachedInferenceEngine;
pub use null::NullInferenceEngine;
pub use real::RealInferenceEngine;
