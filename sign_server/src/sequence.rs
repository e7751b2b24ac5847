//! Temporal shaping of variable-length captures to a fixed model length.
//!
//! Two distinct policies, for two distinct callers:
//!
//! * [`crop_or_pad`] keeps the most recent window, for live inference;
//! * [`sample_evenly`] summarizes the whole capture, for recorded clips.
//!
//! Short input is handled the same way by both: the final element is
//! repeated, modeling "holding the final pose".

/// Truncate to the most recent `target` elements, or pad by repeating the
/// last element. Returns the input unchanged when it is already `target`
/// long. Empty input comes back empty; callers gate that beforehand.
pub fn crop_or_pad<T: Clone>(mut items: Vec<T>, target: usize) -> Vec<T> {
    let len = items.len();
    if len == target || len == 0 || target == 0 {
        items.truncate(target.min(len));
        return items;
    }
    if len > target {
        return items.split_off(len - target);
    }
    let last = items[len - 1].clone();
    items.resize(target, last);
    items
}

/// Pick `target` elements evenly spaced across the whole input.
///
/// Index positions are linearly interpolated over `[0, len - 1]` inclusive
/// and rounded to the nearest integer, so every output element is drawn
/// from the input. Short input falls back to repeat-last padding.
pub fn sample_evenly<T: Clone>(items: Vec<T>, target: usize) -> Vec<T> {
    let len = items.len();
    if len <= target || len == 0 || target == 0 {
        return crop_or_pad(items, target);
    }
    let step = (len - 1) as f32 / (target - 1).max(1) as f32;
    (0..target)
        .map(|k| {
            let idx = ((k as f32 * step).round() as usize).min(len - 1);
            items[idx].clone()
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_exact_length_is_untouched() {
        let seq: Vec<u32> = (0..24).collect();
        assert_eq!(crop_or_pad(seq.clone(), 24), seq);
        assert_eq!(sample_evenly(seq.clone(), 24), seq);
    }

    #[test]
    fn test_pad_repeats_last() {
        let seq = vec![1, 2, 3];
        let shaped = crop_or_pad(seq, 7);
        assert_eq!(shaped.len(), 7);
        assert_eq!(shaped, vec![1, 2, 3, 3, 3, 3, 3]);
    }

    #[test]
    fn test_crop_keeps_most_recent() {
        let seq: Vec<u32> = (0..100).collect();
        let shaped = crop_or_pad(seq, 24);
        assert_eq!(shaped.len(), 24);
        assert_eq!(shaped[0], 76);
        assert_eq!(shaped[23], 99);
    }

    #[test]
    fn test_sample_spans_whole_input() {
        let seq: Vec<u32> = (0..100).collect();
        let sampled = sample_evenly(seq.clone(), 10);
        assert_eq!(sampled.len(), 10);
        // First and last are the capture's endpoints.
        assert_eq!(sampled[0], 0);
        assert_eq!(sampled[9], 99);
        // Nothing synthesized, and order is preserved.
        for pair in sampled.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(seq.contains(&pair[0]));
        }
    }

    #[test]
    fn test_sample_short_input_pads() {
        let sampled = sample_evenly(vec![5, 6], 4);
        assert_eq!(sampled, vec![5, 6, 6, 6]);
    }

    #[test]
    fn test_single_element_target() {
        assert_eq!(sample_evenly(vec![1, 2, 3, 4], 1), vec![1]);
        assert_eq!(crop_or_pad(vec![1, 2, 3, 4], 1), vec![4]);
    }
}
