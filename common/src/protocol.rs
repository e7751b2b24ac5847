//! Wire-level data model: landmark frames going in, predictions coming out.
//!
use serde::{Deserialize, Serialize};

/// Number of keypoints the hand-pose estimator emits per detection.
pub const LANDMARK_COUNT: usize = 21;

/// Flattened feature dimension, `LANDMARK_COUNT` points times (x, y, z).
pub const FEATURE_DIM: usize = LANDMARK_COUNT * 3;

/// One hand skeleton sample at a single time instant.
///
/// Always holds exactly 21 points. A frame where the estimator saw no hand
/// is never represented here; callers skip such frames instead.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct LandmarkFrame {
    points: [[f32; 3]; LANDMARK_COUNT],
}

impl LandmarkFrame {
    pub fn new(points: [[f32; 3]; LANDMARK_COUNT]) -> Self {
        Self { points }
    }

    /// Build a frame from a flat `[x0, y0, z0, x1, ...]` slice.
    ///
    /// Returns `None` unless the slice has exactly 63 values.
    pub fn from_flat(values: &[f32]) -> Option<Self> {
        if values.len() != FEATURE_DIM {
            return None;
        }
        let mut points = [[0.0_f32; 3]; LANDMARK_COUNT];
        for (point, chunk) in points.iter_mut().zip(values.chunks_exact(3)) {
            point.copy_from_slice(chunk);
        }
        Some(Self { points })
    }

    pub fn points(&self) -> &[[f32; 3]; LANDMARK_COUNT] {
        &self.points
    }

    /// Flatten back to 63 scalars in ascending point order.
    pub fn to_flat(&self) -> Vec<f32> {
        self.points.iter().flatten().copied().collect()
    }
}

/// Single-label prediction with a confidence proxy.
///
/// `margin` is the gap between the top-1 and top-2 class scores.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Verdict {
    pub label: String,
    pub confidence: f32,
    pub margin: f32,
}

/// One (label, score) entry of a ranked prediction.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ScoredLabel {
    pub label: String,
    pub score: f32,
}

/// Top-K prediction for a recorded clip.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RankedPredictions {
    /// Ranked best-first; softmax scores, so they sum to at most 1.
    pub top: Vec<ScoredLabel>,
    /// Number of frames the caller recorded.
    pub raw_frames: usize,
    /// Number of frames actually fed to the model after temporal shaping.
    pub used_frames: usize,
}
