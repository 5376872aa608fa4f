use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use ndarray::ArrayD;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;

use super::{InferenceEngine, TensorBuffer};
use crate::error::{Result, SpeedReaderError};

/// Wraps an ONNX Runtime session behind a counting semaphore that gates
/// concurrent calls. Capacity changes are implemented on top of
/// `tokio::sync::Semaphore`: increment adds a permit, decrement acquires
/// and permanently forgets one (so it suspends exactly when an
/// outstanding permit needs to be returned first, matching spec).
///
/// Thread pinning to one CPU per L2 cache, highest-frequency cores first,
/// is a reference-design nicety that requires a platform-specific
/// topology probe this crate does not vendor a dependency for; threads
/// are instead sized from `num_cpus::get()` and left unpinned. See
/// DESIGN.md.
pub struct RealInferenceEngine {
    session: Arc<Session>,
    semaphore: Arc<tokio::sync::Semaphore>,
    capacity: AtomicUsize,
    input_name: String,
}

impl RealInferenceEngine {
    pub fn from_bytes(model_bytes: &[u8], num_threads: usize) -> Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level2)?
            .with_intra_threads(num_threads)?
            .with_inter_threads(1)?
            .commit_from_memory(model_bytes)?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "input".to_string());

        tracing::info!(num_threads, %input_name, "loaded inference session");

        Ok(Self {
            session: Arc::new(session),
            semaphore: Arc::new(tokio::sync::Semaphore::new(num_threads.max(1))),
            capacity: AtomicUsize::new(num_threads.max(1)),
            input_name,
        })
    }

    /// Default thread count: one per CPU, capped at 4.
    pub fn default_thread_count() -> usize {
        num_cpus::get().min(4)
    }
}

#[async_trait]
impl InferenceEngine for RealInferenceEngine {
    async fn run(&self, input: TensorBuffer) -> Result<TensorBuffer> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| SpeedReaderError::Cancelled)?;

        let session = self.session.clone();
        let input_name = self.input_name.clone();

        tokio::task::spawn_blocking(move || run_session(&session, &input_name, input))
            .await
            .map_err(|e| SpeedReaderError::InferenceFailure(e.to_string()))?
    }

    fn current_max_capacity(&self) -> usize {
        self.capacity.load(Ordering::SeqCst)
    }

    async fn increment_parallelism(&self) {
        self.semaphore.add_permits(1);
        self.capacity.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(new_capacity = self.current_max_capacity(), "incremented parallelism");
    }

    async fn decrement_parallelism(&self) {
        if self.capacity.load(Ordering::SeqCst) <= 1 {
            return;
        }
        if let Ok(permit) = self.semaphore.clone().acquire_owned().await {
            permit.forget();
            self.capacity.fetch_sub(1, Ordering::SeqCst);
            tracing::debug!(new_capacity = self.current_max_capacity(), "decremented parallelism");
        }
    }

    fn dispose(&self) {
        tracing::info!("disposing inference session");
    }
}

fn run_session(session: &Session, input_name: &str, input: TensorBuffer) -> Result<TensorBuffer> {
    let array = ArrayD::from_shape_vec(input.shape.clone(), input.data)
        .map_err(|e| SpeedReaderError::invalid_input(e.to_string()))?;
    let tensor = Tensor::from_array(array)?;

    let outputs = session.run(ort::inputs![input_name => tensor])?;
    let (_, first_output) = outputs
        .iter()
        .next()
        .ok_or_else(|| SpeedReaderError::InferenceFailure("session produced no outputs".into()))?;

    let view = first_output.try_extract_array::<f32>()?;
    let shape = view.shape().to_vec();
    let data = view.iter().copied().collect();

    Ok(TensorBuffer::new(data, shape))
}
