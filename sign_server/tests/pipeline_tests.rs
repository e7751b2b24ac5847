//! End-to-end checks of the capture-to-tensor pipeline, without model
//! artifacts: everything up to the forward pass.

use common::protocol::{LandmarkFrame, FEATURE_DIM, LANDMARK_COUNT};
use image::RgbImage;
use sign_server::{
    clip::ClipPreprocessor,
    error::InferError,
    features::{self, ScaleRef},
    sequence,
    session::{CapturePhase, CaptureSession},
    smoother::{PredictionSmoother, Smoothed},
};

fn wiggly_hand(t: usize) -> LandmarkFrame {
    let mut points = [[0.0_f32; 3]; LANDMARK_COUNT];
    for (i, point) in points.iter_mut().enumerate() {
        let phase = (t as f32) * 0.1 + (i as f32) * 0.3;
        *point = [
            0.5 + 0.1 * phase.sin(),
            0.5 + 0.1 * phase.cos(),
            0.01 * (i as f32),
        ];
    }
    LandmarkFrame::new(points)
}

#[test]
fn test_recorded_sequence_reaches_model_shape() {
    let mut session: CaptureSession<Vec<f32>> = CaptureSession::new(10, 200);
    session.start();

    // 38 detected frames, interleaved with misses that are simply skipped.
    for t in 0..50 {
        if t % 4 == 3 {
            continue; // no hand this frame
        }
        let feature = features::landmarks_to_feature(&wiggly_hand(t), ScaleRef::MiddleMcp);
        session.push(feature);
    }
    assert_eq!(session.phase(), CapturePhase::Recording);

    let capture = session.finish().unwrap();
    assert_eq!(capture.len(), 38);

    let normalized = features::normalize_sequence(&capture, ScaleRef::MiddleMcp).unwrap();
    let shaped = sequence::crop_or_pad(normalized, 24);
    assert_eq!(shaped.len(), 24);
    assert!(shaped.iter().all(|row| row.len() == FEATURE_DIM));
    // Wrist stays pinned to the origin through the whole pipeline.
    assert!(shaped.iter().all(|row| row[..3] == [0.0, 0.0, 0.0]));
}

#[test]
fn test_short_capture_never_reaches_the_model() {
    let mut session: CaptureSession<Vec<f32>> = CaptureSession::new(10, 200);
    session.start();
    for t in 0..9 {
        session.push(features::landmarks_to_feature(
            &wiggly_hand(t),
            ScaleRef::MiddleMcp,
        ));
    }
    assert!(matches!(
        session.finish(),
        Err(InferError::ClipTooShort { got: 9, min: 10 })
    ));
}

#[test]
fn test_long_video_capture_shapes_to_clip_tensor() {
    let preproc = ClipPreprocessor::new(32, 16);

    // A deliberately oversized capture, as a slow signer would produce.
    let frames: Vec<RgbImage> = (0..500)
        .map(|i| RgbImage::from_pixel(48, 64, image::Rgb([(i % 256) as u8, 30, 200])))
        .collect();

    let tensor = preproc.preprocess(&frames).unwrap();
    assert_eq!(tensor.shape(), &[1, 3, 16, 32, 32]);
    let view = tensor.to_array_view::<f32>().unwrap();
    assert!(view.iter().all(|v| (-1.0..=1.0).contains(v)));
}

#[test]
fn test_live_loop_smoothing_scenario() {
    let mut smoother = PredictionSmoother::default();

    // Early frames: window warming up.
    for _ in 0..6 {
        assert!(matches!(
            smoother.push("A", 0.9),
            Smoothed::Warming { .. }
        ));
    }

    // Window full and confident: the majority letter is shown.
    assert_eq!(smoother.push("A", 0.9), Smoothed::Stable("A".into()));

    // A flickering frame does not flip the display.
    assert_eq!(smoother.push("B", 0.9), Smoothed::Stable("A".into()));

    // Confidence collapse blanks the display even with a full window.
    assert_eq!(smoother.push("A", 0.05), Smoothed::NotConfident);
}
