use std::sync::Arc;

use image::RgbImage;
use tokio::sync::oneshot;

use crate::error::SpeedReaderError;
use crate::result::OcrResult;

use super::viz::VisualizationBuilder;

/// Carries one in-flight job's payload between pipeline stages. `payload`
/// is `Err` once any stage has failed the job; later stages then skip
/// their work and simply forward the error, so a fault surfaces exactly
/// once, on the job's own awaiter, without blocking sibling jobs.
pub struct Envelope<T> {
    pub seq: u64,
    pub viz: Arc<dyn VisualizationBuilder>,
    pub result_tx: oneshot::Sender<std::result::Result<Vec<OcrResult>, SpeedReaderError>>,
    pub payload: std::result::Result<T, SpeedReaderError>,
}

/// Stage-0 payload: the caller's original image.
pub type SubmittedJob = Envelope<Arc<RgbImage>>;
