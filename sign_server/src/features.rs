//! Landmark-to-feature normalization.
//!
//! Raw hand landmarks arrive in the estimator's normalized image
//! coordinates. Classifiers are trained on wrist-centered, scale-invariant
//! vectors, so every frame is translated by the wrist point and divided by a
//! scale reference before it reaches a model.

use common::protocol::{LandmarkFrame, FEATURE_DIM, LANDMARK_COUNT};

use crate::error::InferError;

/// Floor for the normalization scale to avoid exploding values on
/// degenerate (near-zero-size) detections.
const SCALE_EPS: f32 = 1.0e-6;

/// Landmark index of the middle-finger base joint.
const MIDDLE_MCP: usize = 9;

/// Which distance anchors the scale normalization.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScaleRef {
    /// Maximum wrist-to-point distance over all 21 points. Used by the
    /// static-pose path.
    MaxNorm,
    /// Wrist-to-middle-MCP distance. Used by the temporal path.
    MiddleMcp,
}

/// Convert one landmark frame into a 63-length feature vector.
///
/// Stateless and idempotent: normalizing an already-normalized frame again
/// with the same [`ScaleRef`] reproduces it, since the reference distance of
/// the output is exactly 1.
pub fn landmarks_to_feature(frame: &LandmarkFrame, scale_ref: ScaleRef) -> Vec<f32> {
    let points = frame.points();
    let wrist = points[0];

    let mut centered = [[0.0_f32; 3]; LANDMARK_COUNT];
    for (out, point) in centered.iter_mut().zip(points.iter()) {
        for c in 0..3 {
            out[c] = point[c] - wrist[c];
        }
    }

    let scale = match scale_ref {
        ScaleRef::MaxNorm => centered
            .iter()
            .map(norm)
            .fold(0.0_f32, f32::max),
        ScaleRef::MiddleMcp => norm(&centered[MIDDLE_MCP]),
    }
    .max(SCALE_EPS);

    let mut feature = Vec::with_capacity(FEATURE_DIM);
    for point in centered.iter() {
        for c in 0..3 {
            feature.push(point[c] / scale);
        }
    }

    feature
}

/// Normalize a whole sequence of flat 63-vectors frame by frame.
///
/// Every row must already be a valid flat landmark frame; a malformed row
/// fails the whole call with [`InferError::InputShape`].
pub fn normalize_sequence(
    rows: &[Vec<f32>],
    scale_ref: ScaleRef,
) -> Result<Vec<Vec<f32>>, InferError> {
    if rows.is_empty() {
        return Err(InferError::EmptyInput);
    }

    rows.iter()
        .map(|row| {
            let frame = LandmarkFrame::from_flat(row).ok_or_else(|| {
                InferError::shape(format!("[T, {FEATURE_DIM}]"), format!("row of {}", row.len()))
            })?;
            Ok(landmarks_to_feature(&frame, scale_ref))
        })
        .collect()
}

/// Reject features that are not exactly 63 scalars.
pub fn ensure_feature_dim(feature: &[f32]) -> Result<(), InferError> {
    if feature.len() != FEATURE_DIM {
        return Err(InferError::shape(
            FEATURE_DIM.to_string(),
            feature.len().to_string(),
        ));
    }
    Ok(())
}

fn norm(point: &[f32; 3]) -> f32 {
    (point[0] * point[0] + point[1] * point[1] + point[2] * point[2]).sqrt()
}
