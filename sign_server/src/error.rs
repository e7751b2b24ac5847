//! Error taxonomy for the inference core.
//!
//! Shape and emptiness failures are per-call and recoverable; a missing
//! model artifact at load time is fatal and keeps the runner unusable.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum InferError {
    /// Landmark or feature input has the wrong dimension.
    #[error("bad input shape: expected {expected}, got {got}")]
    InputShape { expected: String, got: String },

    /// Zero frames or vectors supplied where at least one is required.
    #[error("empty input: at least one frame is required")]
    EmptyInput,

    /// Weights or label file absent at load time.
    #[error("model artifact missing: {}", .0.display())]
    ModelArtifactMissing(PathBuf),

    /// The upstream pose estimator found no hand; skip the frame.
    #[error("no hand detected")]
    NoDetection,

    /// Recorded sample count below the minimum; the model was not invoked.
    #[error("clip too short: {got} frames, need at least {min}")]
    ClipTooShort { got: usize, min: usize },

    /// Failure inside the ONNX execution plan.
    #[error("model execution failed: {0}")]
    Model(String),
}

impl From<tract_onnx::prelude::TractError> for InferError {
    fn from(e: tract_onnx::prelude::TractError) -> Self {
        Self::Model(e.to_string())
    }
}

impl InferError {
    pub fn shape(expected: impl Into<String>, got: impl Into<String>) -> Self {
        Self::InputShape {
            expected: expected.into(),
            got: got.into(),
        }
    }

    /// Whether the caller can carry on with the next frame or request.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::ModelArtifactMissing(_) | Self::Model(_))
    }
}
