//! Capture state machine for the live front ends.
//!
//! One synchronous transition per loop iteration:
//! `Idle -> Recording -> (stop) -> scoring -> Idle`. The session only
//! buffers; invoking a runner on the finished capture is the caller's step.

use crate::error::InferError;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CapturePhase {
    Idle,
    Recording,
}

/// Result of pushing one sample while recording.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CapturePush {
    /// Not recording; the sample was dropped.
    Ignored,
    /// Buffered; carries the current sample count.
    Buffered(usize),
    /// The frame cap was hit; the capture should be finished now.
    Full,
}

/// Accumulates samples between a start and a stop keypress.
pub struct CaptureSession<T> {
    phase: CapturePhase,
    buf: Vec<T>,
    min_len: usize,
    max_len: usize,
}

impl<T> CaptureSession<T> {
    pub fn new(min_len: usize, max_len: usize) -> Self {
        Self {
            phase: CapturePhase::Idle,
            buf: Vec::new(),
            min_len,
            max_len,
        }
    }

    pub fn phase(&self) -> CapturePhase {
        self.phase
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Begin a fresh recording, discarding any previous buffer.
    pub fn start(&mut self) {
        self.buf.clear();
        self.phase = CapturePhase::Recording;
    }

    /// Buffer one sample. Samples arriving while idle are ignored, which is
    /// how "no hand detected" frames are skipped by the live loops.
    pub fn push(&mut self, sample: T) -> CapturePush {
        if self.phase != CapturePhase::Recording {
            return CapturePush::Ignored;
        }
        if self.buf.len() >= self.max_len {
            return CapturePush::Full;
        }
        self.buf.push(sample);
        if self.buf.len() == self.max_len {
            CapturePush::Full
        } else {
            CapturePush::Buffered(self.buf.len())
        }
    }

    /// Stop recording and hand the capture over for scoring.
    ///
    /// Captures below the minimum length are rejected without touching a
    /// model; the session returns to idle either way.
    pub fn finish(&mut self) -> Result<Vec<T>, InferError> {
        self.phase = CapturePhase::Idle;
        let got = self.buf.len();
        if got < self.min_len {
            self.buf.clear();
            return Err(InferError::ClipTooShort {
                got,
                min: self.min_len,
            });
        }
        Ok(std::mem::take(&mut self.buf))
    }

    /// Drop the capture and return to idle without scoring.
    pub fn abort(&mut self) {
        self.buf.clear();
        self.phase = CapturePhase::Idle;
    }
}
