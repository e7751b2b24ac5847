//! ONNX-backed inference runners for the three classifier families.
//!
//! All models run through tract; each runner owns its `SimplePlan`, applies
//! the matching preprocessing, and decodes raw outputs into the shared
//! prediction types. Weights and vocabulary are read-only after load and
//! can be shared freely across concurrent calls.

use std::path::Path;

use common::protocol::{LandmarkFrame, RankedPredictions, ScoredLabel, Verdict, FEATURE_DIM};
use image::RgbImage;
use itertools::Itertools;
use ndarray::s;
use smallvec::SmallVec;
use tract_onnx::prelude::*;

use crate::{
    clip::ClipPreprocessor,
    error::InferError,
    features::{self, ScaleRef},
    labels::LabelVocab,
    sequence,
};

pub type NnModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;
pub type NnOut = SmallVec<[Arc<Tensor>; 4]>;

/// Default number of ranked predictions returned by the dynamic runner.
pub const DEFAULT_TOP_K: usize = 10;

/// Default minimum frame count before the dynamic runner will score a clip.
pub const DEFAULT_MIN_FRAMES: usize = 10;

/// Default temporal length of the sequence model.
pub const DEFAULT_SEQ_LEN: usize = 24;

/// Load an ONNX artifact into a runnable plan with a pinned input shape.
fn load_plan(path: &Path, input_shape: TVec<usize>) -> Result<NnModel, InferError> {
    if !path.exists() {
        return Err(InferError::ModelArtifactMissing(path.to_path_buf()));
    }
    let input_fact = InferenceFact::dt_shape(f32::datum_type(), input_shape);
    let model = tract_onnx::onnx()
        .model_for_path(path)?
        .with_input_fact(0, input_fact)?
        .into_optimized()?
        .into_runnable()?;
    log::info!("Loaded model from {}", path.display());

    Ok(model)
}

/// Numerically stable softmax.
pub fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.iter().map(|e| e / sum).collect()
}

/// Gap between the two largest scores; 0 when fewer than two classes.
pub fn top_margin(scores: &[f32]) -> f32 {
    if scores.len() < 2 {
        return 0.0;
    }
    let mut top1 = f32::NEG_INFINITY;
    let mut top2 = f32::NEG_INFINITY;
    for &s in scores {
        if s > top1 {
            top2 = top1;
            top1 = s;
        } else if s > top2 {
            top2 = s;
        }
    }
    top1 - top2
}

/// Softmax restricted to `allowed` class indices.
///
/// Returned pairs carry the original full-vocabulary indices, so callers
/// can map scores back to labels without any re-indexing. Indices beyond
/// the logits are dropped.
pub fn subset_softmax(logits: &[f32], allowed: &[usize]) -> Vec<(usize, f32)> {
    let in_range: Vec<usize> = allowed
        .iter()
        .copied()
        .filter(|&i| i < logits.len())
        .collect();
    let subset: Vec<f32> = in_range.iter().map(|&i| logits[i]).collect();
    in_range.into_iter().zip(softmax(&subset)).collect()
}

/// Best-first (index, score) ranking of at most `k` entries.
pub fn rank_top_k(scored: impl IntoIterator<Item = (usize, f32)>, k: usize) -> Vec<(usize, f32)> {
    scored
        .into_iter()
        .sorted_by(|a, b| b.1.partial_cmp(&a.1).unwrap())
        .take(k)
        .collect()
}

fn argmax(scores: &[f32]) -> usize {
    scores
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Collapse per-timestep logits `(1, C, T)` to per-class logits.
///
/// The video model emits one logit row per retained timestep; they are
/// max-pooled across time. A plain `(1, C)` output passes through.
pub fn pool_logits(raw: tract_ndarray::ArrayViewD<f32>) -> Result<Vec<f32>, InferError> {
    match raw.ndim() {
        2 => Ok(raw.iter().cloned().collect()),
        3 => {
            let classes = raw.shape()[1];
            let steps = raw.shape()[2];
            let mut pooled = vec![f32::NEG_INFINITY; classes];
            for c in 0..classes {
                for t in 0..steps {
                    pooled[c] = pooled[c].max(raw[[0, c, t]]);
                }
            }
            Ok(pooled)
        }
        ndim => Err(InferError::shape("(1, C) or (1, C, T)", format!("rank {ndim}"))),
    }
}

/// Gate a recorded clip on its frame count before any model work.
///
/// Zero frames is its own failure; exactly `min` frames is accepted.
pub fn ensure_min_frames(got: usize, min: usize) -> Result<(), InferError> {
    if got == 0 {
        return Err(InferError::EmptyInput);
    }
    if got < min {
        return Err(InferError::ClipTooShort { got, min });
    }
    Ok(())
}

/// Decode pooled per-class logits into ranked labels.
///
/// With an allowlist, softmax runs only over the allowed classes and the
/// ranked entries map back to full-vocabulary labels. An allowlist that
/// resolves to no scorable class falls back to full-vocabulary scoring;
/// the vocabulary may list more classes than the model head emits, and
/// entries beyond the head cannot be scored.
pub fn decode_ranked(
    logits: &[f32],
    vocab: &LabelVocab,
    allow: Option<&[String]>,
    top_k: usize,
) -> Vec<ScoredLabel> {
    let allowed = allow
        .and_then(|labels| vocab.resolve_allowlist(labels))
        .map(|mut indices| {
            indices.retain(|&i| i < logits.len());
            indices
        })
        .filter(|indices| !indices.is_empty());
    let scored: Vec<(usize, f32)> = match allowed {
        Some(indices) => subset_softmax(logits, &indices),
        None => softmax(logits).into_iter().enumerate().collect(),
    };

    rank_top_k(scored, top_k)
        .into_iter()
        .map(|(idx, score)| ScoredLabel {
            label: vocab.label(idx),
            score,
        })
        .collect()
}

/// Run a plan over a single flat feature vector, returning per-class values.
fn run_flat(model: &NnModel, feature: &[f32]) -> Result<Vec<f32>, InferError> {
    features::ensure_feature_dim(feature)?;
    let tensor: Tensor =
        tract_ndarray::Array2::from_shape_fn((1, FEATURE_DIM), |(_, i)| feature[i]).into();
    let raw: NnOut = model.run(tvec!(tensor))?;
    let scores = raw[0].to_array_view::<f32>()?.slice(s![0, ..]).to_vec();
    Ok(scores)
}

/// Capability interface over the two classical classifier families.
///
/// A margin-based classifier emits arbitrary-scale decision scores, a
/// probability-based one emits calibrated probabilities; both expose the
/// same `(class index, confidence, margin)` triple.
pub trait ScoreMargin: Send + Sync {
    fn score_and_margin(&self, feature: &[f32]) -> Result<(usize, f32, f32), InferError>;
}

/// Which decoding a static classifier artifact needs.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ClassifierKind {
    /// Decision-function outputs, e.g. a margin-based SVM.
    DecisionFunction,
    /// Native class probabilities, e.g. an MLP with a softmax head.
    Probability,
}

/// Margin-based classifier: margin comes from the raw decision scores and
/// the confidence from a softmax pseudo-probability over them.
pub struct MarginClassifier {
    model: NnModel,
}

impl ScoreMargin for MarginClassifier {
    fn score_and_margin(&self, feature: &[f32]) -> Result<(usize, f32, f32), InferError> {
        let scores = run_flat(&self.model, feature)?;
        let margin = top_margin(&scores);
        let probs = softmax(&scores);
        let idx = argmax(&scores);
        Ok((idx, probs[idx], margin))
    }
}

/// Probability classifier: outputs are used as-is for both confidence and
/// margin.
pub struct ProbClassifier {
    model: NnModel,
}

impl ScoreMargin for ProbClassifier {
    fn score_and_margin(&self, feature: &[f32]) -> Result<(usize, f32, f32), InferError> {
        let probs = run_flat(&self.model, feature)?;
        let margin = top_margin(&probs);
        let idx = argmax(&probs);
        Ok((idx, probs[idx], margin))
    }
}

/// Static-pose runner: one normalized landmark frame in, one letter out.
pub struct StaticRunner {
    scorer: Box<dyn ScoreMargin>,
    vocab: LabelVocab,
}

impl StaticRunner {
    pub fn load(weights: &Path, vocab: LabelVocab, kind: ClassifierKind) -> Result<Self, InferError> {
        let model = load_plan(weights, tvec!(1, FEATURE_DIM))?;
        let scorer: Box<dyn ScoreMargin> = match kind {
            ClassifierKind::DecisionFunction => Box::new(MarginClassifier { model }),
            ClassifierKind::Probability => Box::new(ProbClassifier { model }),
        };
        Ok(Self::from_parts(scorer, vocab))
    }

    pub fn from_parts(scorer: Box<dyn ScoreMargin>, vocab: LabelVocab) -> Self {
        Self { scorer, vocab }
    }

    /// Score an already-normalized 63-length feature vector.
    pub fn predict_feature(&self, feature: &[f32]) -> Result<Verdict, InferError> {
        features::ensure_feature_dim(feature)?;
        let (idx, confidence, margin) = self.scorer.score_and_margin(feature)?;
        Ok(Verdict {
            label: self.vocab.label(idx),
            confidence,
            margin,
        })
    }

    /// Normalize a raw landmark frame and score it.
    pub fn predict_landmarks(&self, frame: &LandmarkFrame) -> Result<Verdict, InferError> {
        let feature = features::landmarks_to_feature(frame, ScaleRef::MaxNorm);
        self.predict_feature(&feature)
    }

    pub fn vocab(&self) -> &LabelVocab {
        &self.vocab
    }
}

/// Temporal runner: a variable-length landmark sequence in, one sign out.
pub struct TemporalRunner {
    model: NnModel,
    vocab: LabelVocab,
    seq_len: usize,
}

impl TemporalRunner {
    pub fn load(weights: &Path, vocab: LabelVocab, seq_len: usize) -> Result<Self, InferError> {
        let model = load_plan(weights, tvec!(1, seq_len, FEATURE_DIM))?;
        Ok(Self {
            model,
            vocab,
            seq_len,
        })
    }

    /// Normalize, shape to the model length and score a landmark sequence.
    ///
    /// Rows are flat 63-vectors; any malformed row fails the call.
    pub fn predict(&self, rows: &[Vec<f32>]) -> Result<Verdict, InferError> {
        let normalized = features::normalize_sequence(rows, ScaleRef::MiddleMcp)?;
        let shaped = sequence::crop_or_pad(normalized, self.seq_len);

        let tensor: Tensor = tract_ndarray::Array3::from_shape_fn(
            (1, self.seq_len, FEATURE_DIM),
            |(_, t, i)| shaped[t][i],
        )
        .into();
        let raw: NnOut = self.model.run(tvec!(tensor))?;
        let logits = raw[0].to_array_view::<f32>()?.slice(s![0, ..]).to_vec();

        let probs = softmax(&logits);
        let idx = argmax(&probs);
        Ok(Verdict {
            label: self.vocab.label(idx),
            confidence: probs[idx],
            margin: top_margin(&probs),
        })
    }

    pub fn seq_len(&self) -> usize {
        self.seq_len
    }
}

/// Dynamic runner: a recorded video clip in, ranked signs out.
pub struct DynamicRunner {
    model: NnModel,
    vocab: LabelVocab,
    preproc: ClipPreprocessor,
    min_frames: usize,
    top_k: usize,
}

impl DynamicRunner {
    pub fn load(
        weights: &Path,
        vocab: LabelVocab,
        preproc: ClipPreprocessor,
        min_frames: usize,
        top_k: usize,
    ) -> Result<Self, InferError> {
        let size = preproc.size() as usize;
        let model = load_plan(weights, tvec!(1, 3, preproc.clip_len(), size, size))?;
        Ok(Self {
            model,
            vocab,
            preproc,
            min_frames,
            top_k,
        })
    }

    /// Score a recorded clip, optionally restricted to an allowlist.
    ///
    /// An allowlist that resolves to no known label falls back to
    /// full-vocabulary scoring. Exactly `min_frames` frames is accepted;
    /// fewer is a [`InferError::ClipTooShort`].
    pub fn predict(
        &self,
        frames: &[RgbImage],
        allow: Option<&[String]>,
    ) -> Result<RankedPredictions, InferError> {
        ensure_min_frames(frames.len(), self.min_frames)?;

        let tensor = self.preproc.preprocess(frames)?;
        let raw: NnOut = self.model.run(tvec!(tensor))?;
        let logits = pool_logits(raw[0].to_array_view::<f32>()?)?;

        let top = decode_ranked(&logits, &self.vocab, allow, self.top_k);

        Ok(RankedPredictions {
            top,
            raw_frames: frames.len(),
            used_frames: self.preproc.clip_len(),
        })
    }

    pub fn min_frames(&self) -> usize {
        self.min_frames
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::labels::LabelVocab;

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[1.0, 2.0, 3.0]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);
    }

    #[test]
    fn test_softmax_handles_large_logits() {
        let probs = softmax(&[1000.0, 999.0]);
        assert!(probs.iter().all(|p| p.is_finite()));
        assert!(probs[0] > probs[1]);
    }

    #[test]
    fn test_top_margin() {
        assert!((top_margin(&[0.1, 0.7, 0.2]) - 0.5).abs() < 1e-6);
        assert_eq!(top_margin(&[0.9]), 0.0);
        assert_eq!(top_margin(&[]), 0.0);
    }

    #[test]
    fn test_subset_softmax_keeps_full_indices() {
        let logits = [5.0, 0.0, 4.0, 1.0];
        let scored = subset_softmax(&logits, &[1, 3]);
        assert_eq!(scored.len(), 2);
        assert_eq!(scored[0].0, 1);
        assert_eq!(scored[1].0, 3);
        // Class 3 outscores class 1, and the subset renormalizes to 1.
        assert!(scored[1].1 > scored[0].1);
        let sum: f32 = scored.iter().map(|(_, p)| p).sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_subset_softmax_drops_out_of_range_indices() {
        let logits = [2.0, 1.0];
        let scored = subset_softmax(&logits, &[1, 5]);
        assert_eq!(scored.len(), 1);
        assert_eq!(scored[0].0, 1);
        assert!((scored[0].1 - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_min_frames_boundary() {
        assert!(ensure_min_frames(10, 10).is_ok());
        assert!(matches!(
            ensure_min_frames(9, 10),
            Err(InferError::ClipTooShort { got: 9, min: 10 })
        ));
        assert!(matches!(ensure_min_frames(0, 10), Err(InferError::EmptyInput)));
    }

    #[test]
    fn test_decode_ranked_honors_allowlist() {
        let vocab = LabelVocab::parse("0 hello\n1 yes\n2 no\n", None);
        // Unrestricted argmax is "hello", which the allowlist excludes.
        let logits = [10.0, 0.5, 1.5];
        let allow = vec!["YES".to_string(), "no".to_string()];

        let top = decode_ranked(&logits, &vocab, Some(&allow), 5);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].label, "no");
        assert_eq!(top[1].label, "yes");
        assert!(top.iter().all(|s| s.label == "yes" || s.label == "no"));
        // Subset scores renormalize to 1.
        let sum: f32 = top.iter().map(|s| s.score).sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_decode_ranked_falls_back_on_unknown_allowlist() {
        let vocab = LabelVocab::parse("0 hello\n1 yes\n", None);
        let allow = vec!["bogus".to_string()];
        let top = decode_ranked(&[0.0, 3.0], &vocab, Some(&allow), 1);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].label, "yes");
    }

    #[test]
    fn test_decode_ranked_ignores_labels_beyond_model_head() {
        // The vocabulary lists a class the two-logit head cannot score.
        let vocab = LabelVocab::parse("0 hello\n1 yes\n2 no\n", None);
        let allow = vec!["no".to_string()];
        let top = decode_ranked(&[0.0, 3.0], &vocab, Some(&allow), 3);
        assert_eq!(top[0].label, "yes");
    }

    #[test]
    fn test_rank_top_k() {
        let ranked = rank_top_k(vec![(0, 0.1), (1, 0.6), (2, 0.3)], 2);
        assert_eq!(ranked, vec![(1, 0.6), (2, 0.3)]);
    }

    #[test]
    fn test_pool_logits_max_over_time() {
        let arr = tract_ndarray::Array3::from_shape_fn((1, 2, 3), |(_, c, t)| {
            (c * 10 + t) as f32
        })
        .into_dyn();
        let pooled = pool_logits(arr.view()).unwrap();
        assert_eq!(pooled, vec![2.0, 12.0]);
    }

    #[test]
    fn test_pool_logits_passthrough_2d() {
        let arr = tract_ndarray::Array2::from_shape_vec((1, 3), vec![0.5, 1.5, -1.0])
            .unwrap()
            .into_dyn();
        assert_eq!(pool_logits(arr.view()).unwrap(), vec![0.5, 1.5, -1.0]);
    }

    #[test]
    fn test_pool_logits_rejects_bad_rank() {
        let arr = tract_ndarray::Array1::from_vec(vec![1.0]).into_dyn();
        assert!(matches!(
            pool_logits(arr.view()),
            Err(InferError::InputShape { .. })
        ));
    }

    struct FixedScorer;

    impl ScoreMargin for FixedScorer {
        fn score_and_margin(&self, _feature: &[f32]) -> Result<(usize, f32, f32), InferError> {
            Ok((1, 0.8, 0.6))
        }
    }

    #[test]
    fn test_static_runner_rejects_malformed_feature() {
        let vocab = LabelVocab::parse("0 A\n1 B\n", None);
        let runner = StaticRunner::from_parts(Box::new(FixedScorer), vocab);

        let err = runner.predict_feature(&[0.0; 62]).unwrap_err();
        assert!(matches!(err, InferError::InputShape { .. }));

        let verdict = runner.predict_feature(&[0.0; 63]).unwrap();
        assert_eq!(verdict.label, "B");
        assert!((verdict.margin - 0.6).abs() < 1e-6);
    }
}
