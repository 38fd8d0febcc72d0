use thiserror::Error;

use crate::audio::graph::ElementId;

/// Failures raised by the in-process audio graph.
///
/// None of these reach a caller of `AnalyzerSession::poll`; the session turns
/// them into outcomes and warnings.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AudioGraphError {
    #[error("media element {0} is already captured by a source node")]
    SourceAlreadyCaptured(ElementId),
    #[error("audio context is closed")]
    ContextClosed,
    #[error("fft size {0} must be a power of two between 32 and 32768")]
    InvalidFftSize(usize),
    #[error("decibel range is empty: min {min} must be below max {max}")]
    InvalidDecibelRange { min: f32, max: f32 },
    #[error("smoothing time constant {0} must lie within [0, 1]")]
    InvalidSmoothing(f32),
    #[error("audio analysis is disabled")]
    AnalysisDisabled,
}

pub type GraphResult<T> = std::result::Result<T, AudioGraphError>;
