//! Adaptive parallelism controller (C6): a sensor of job durations and
//! concurrency, and a gradient-ascent tuner that drives an inference
//! engine's concurrency ceiling toward the sweet spot.

pub mod sensor;
pub mod tuner;

pub use sensor::{JobToken, Sensor, Summary};
pub use tuner::Controller;
