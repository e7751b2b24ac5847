//! Pixel-level preprocessing for the 3D-CNN runner.
//!
//! Turns a recorded list of RGB frames into the `(1, 3, T, S, S)` tensor the
//! video model was trained on. Frames must already be in RGB channel order;
//! converting from a camera-native order is the decoder's job.

use image::{imageops, RgbImage};
use tract_onnx::prelude::*;

use crate::{error::InferError, sequence};

/// Square spatial size the video model expects.
pub const DEFAULT_CLIP_SIZE: u32 = 224;

/// Temporal length the video model expects.
pub const DEFAULT_CLIP_LEN: usize = 64;

/// Resizes, crops, rescales and temporally shapes raw frames.
#[derive(Clone, Copy, Debug)]
pub struct ClipPreprocessor {
    size: u32,
    clip_len: usize,
}

impl Default for ClipPreprocessor {
    fn default() -> Self {
        Self {
            size: DEFAULT_CLIP_SIZE,
            clip_len: DEFAULT_CLIP_LEN,
        }
    }
}

impl ClipPreprocessor {
    pub fn new(size: u32, clip_len: usize) -> Self {
        Self { size, clip_len }
    }

    pub fn clip_len(&self) -> usize {
        self.clip_len
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Produce the model input tensor with pixel values in `[-1, 1]`.
    ///
    /// Zero input frames is a distinct failure, never a zero-filled tensor.
    pub fn preprocess(&self, frames: &[RgbImage]) -> Result<Tensor, InferError> {
        if frames.is_empty() {
            return Err(InferError::EmptyInput);
        }

        let cropped: Vec<RgbImage> = frames.iter().map(|f| self.square_crop(f)).collect();
        let shaped = sequence::sample_evenly(cropped, self.clip_len);

        let size = self.size as usize;
        let tensor: Tensor = tract_ndarray::Array5::from_shape_fn(
            (1, 3, self.clip_len, size, size),
            |(_, c, t, y, x)| {
                let v = shaped[t][(x as u32, y as u32)][c] as f32;
                (v / 255.0) * 2.0 - 1.0
            },
        )
        .into();

        Ok(tensor)
    }

    /// Isotropic resize so the shorter side equals `size`, then center crop.
    fn square_crop(&self, frame: &RgbImage) -> RgbImage {
        let (w, h) = frame.dimensions();
        if w == self.size && h == self.size {
            return frame.clone();
        }

        let scale = self.size as f32 / w.min(h).max(1) as f32;
        let new_w = ((w as f32 * scale).round() as u32).max(self.size);
        let new_h = ((h as f32 * scale).round() as u32).max(self.size);
        let resized = imageops::resize(frame, new_w, new_h, imageops::FilterType::Triangle);

        let x = (new_w - self.size) / 2;
        let y = (new_h - self.size) / 2;
        imageops::crop_imm(&resized, x, y, self.size, self.size).to_image()
    }
}
