//! Majority-vote smoothing over a live stream of per-frame predictions.
//!
//! A single frame's prediction flickers; the display should not. The
//! smoother keeps the last N predicted labels in a rolling window and only
//! reports a label once the window is full, the majority agrees, and the
//! latest raw prediction is confident enough.

use std::collections::VecDeque;

/// Window length before any stable label is reported.
pub const DEFAULT_WINDOW: usize = 7;

/// Minimum top1-top2 margin for the vote to be shown.
pub const DEFAULT_MARGIN_THRESHOLD: f32 = 0.25;

/// Outcome of pushing one raw prediction.
#[derive(Clone, Debug, PartialEq)]
pub enum Smoothed {
    /// Fewer than N predictions seen so far.
    Warming { have: usize, need: usize },
    /// Window full, but the latest margin is below the threshold.
    NotConfident,
    /// Majority label over the window, margin-gated.
    Stable(String),
}

pub struct PredictionSmoother {
    window: VecDeque<String>,
    capacity: usize,
    margin_threshold: f32,
    last_margin: f32,
}

impl Default for PredictionSmoother {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW, DEFAULT_MARGIN_THRESHOLD)
    }
}

impl PredictionSmoother {
    pub fn new(capacity: usize, margin_threshold: f32) -> Self {
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
            margin_threshold,
            last_margin: 0.0,
        }
    }

    /// Push one raw per-frame prediction and get the smoothed view.
    pub fn push(&mut self, label: impl Into<String>, margin: f32) -> Smoothed {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(label.into());
        self.last_margin = margin;

        if self.window.len() < self.capacity {
            return Smoothed::Warming {
                have: self.window.len(),
                need: self.capacity,
            };
        }
        if self.last_margin < self.margin_threshold {
            return Smoothed::NotConfident;
        }

        Smoothed::Stable(self.majority())
    }

    /// Forget all buffered predictions, e.g. when the hand leaves the frame.
    pub fn reset(&mut self) {
        self.window.clear();
        self.last_margin = 0.0;
    }

    pub fn last_margin(&self) -> f32 {
        self.last_margin
    }

    /// Most frequent label in the window; on a tie the most recently
    /// inserted contender wins, which keeps the result deterministic.
    fn majority(&self) -> String {
        let mut best_label: Option<&String> = None;
        let mut best_count = 0;
        for label in self.window.iter() {
            let count = self.window.iter().filter(|l| *l == label).count();
            if count >= best_count {
                best_count = count;
                best_label = Some(label);
            }
        }
        best_label.cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_warming_up_before_window_full() {
        let mut smoother = PredictionSmoother::new(7, 0.25);
        for i in 0..6 {
            let out = smoother.push("A", 0.9);
            assert_eq!(
                out,
                Smoothed::Warming {
                    have: i + 1,
                    need: 7
                }
            );
        }
    }

    #[test]
    fn test_unanimous_window_is_stable() {
        let mut smoother = PredictionSmoother::new(7, 0.25);
        let mut out = Smoothed::NotConfident;
        for _ in 0..7 {
            out = smoother.push("B", 0.5);
        }
        assert_eq!(out, Smoothed::Stable("B".into()));
    }

    #[test]
    fn test_low_margin_suppresses_vote() {
        let mut smoother = PredictionSmoother::new(3, 0.25);
        smoother.push("A", 0.9);
        smoother.push("A", 0.9);
        // Window fills here, but the latest raw margin is weak.
        assert_eq!(smoother.push("A", 0.1), Smoothed::NotConfident);
        // Confidence returns, so does the vote.
        assert_eq!(smoother.push("A", 0.4), Smoothed::Stable("A".into()));
    }

    #[test]
    fn test_majority_over_noise() {
        let mut smoother = PredictionSmoother::new(5, 0.25);
        for label in ["A", "A", "B", "A", "C"] {
            smoother.push(label, 0.9);
        }
        assert_eq!(smoother.push("A", 0.9), Smoothed::Stable("A".into()));
    }

    #[test]
    fn test_tie_breaks_to_most_recent() {
        let mut smoother = PredictionSmoother::new(4, 0.0);
        smoother.push("A", 0.9);
        smoother.push("A", 0.9);
        smoother.push("B", 0.9);
        // Window: A A B B, tie between A and B; B appeared last.
        assert_eq!(smoother.push("B", 0.9), Smoothed::Stable("B".into()));
    }

    #[test]
    fn test_reset_clears_window() {
        let mut smoother = PredictionSmoother::new(2, 0.0);
        smoother.push("A", 0.9);
        smoother.push("A", 0.9);
        smoother.reset();
        assert!(matches!(
            smoother.push("A", 0.9),
            Smoothed::Warming { have: 1, need: 2 }
        ));
    }

    #[test]
    fn test_eviction_keeps_capacity() {
        let mut smoother = PredictionSmoother::new(3, 0.0);
        for _ in 0..3 {
            smoother.push("A", 0.9);
        }
        // Three Bs push every A out.
        smoother.push("B", 0.9);
        smoother.push("B", 0.9);
        assert_eq!(smoother.push("B", 0.9), Smoothed::Stable("B".into()));
    }
}
