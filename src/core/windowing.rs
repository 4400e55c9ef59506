//! Stride-1 sliding windows over a day's feature series.
//!
//! A series of `T` slots yields `max(0, T - L + 1)` windows of length `L`,
//! each overlapping its predecessor by `L - 1` slots.

use crate::core::features::{FeatureVector, Frame};
use serde::{Deserialize, Serialize};

/// A contiguous run of feature frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Window {
    /// Index of the last slot covered by this window
    pub end_index: usize,
    /// Frames in time order
    pub frames: Vec<Frame>,
}

impl Window {
    /// Index of the first slot covered by this window.
    pub fn start_index(&self) -> usize {
        self.end_index + 1 - self.frames.len()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Mean of the last `tail` frames.
    pub fn tail_mean(&self, tail: usize) -> Frame {
        let tail = tail.clamp(1, self.frames.len().max(1));
        let mut mean = [0.0; crate::core::features::FEATURE_DIM];
        for frame in &self.frames[self.frames.len() - tail..] {
            for (m, v) in mean.iter_mut().zip(frame) {
                *m += v;
            }
        }
        for m in mean.iter_mut() {
            *m /= tail as f64;
        }
        mean
    }
}

/// Slice a feature series into overlapping windows of `length` slots.
///
/// Returns no windows when the series is shorter than `length` (or when
/// `length` is zero); callers treat that as insufficient data.
pub fn build_windows(series: &[FeatureVector], length: usize) -> Vec<Window> {
    if length == 0 || series.len() < length {
        return Vec::new();
    }

    let frames: Vec<Frame> = series.iter().map(|v| v.to_frame()).collect();
    frames
        .windows(length)
        .enumerate()
        .map(|(start, slice)| Window {
            end_index: start + length - 1,
            frames: slice.to_vec(),
        })
        .collect()
}

/// Number of windows a series of `slots` produces.
pub fn window_count(slots: usize, length: usize) -> usize {
    if length == 0 {
        return 0;
    }
    (slots + 1).saturating_sub(length)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(len: usize) -> Vec<FeatureVector> {
        (0..len)
            .map(|i| FeatureVector {
                stress: i as f64,
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn test_window_counts() {
        assert_eq!(build_windows(&series(30), 24).len(), 7);
        assert_eq!(build_windows(&series(24), 24).len(), 1);
        assert!(build_windows(&series(10), 24).is_empty());
        assert!(build_windows(&series(10), 0).is_empty());
        assert_eq!(window_count(30, 24), 7);
        assert_eq!(window_count(10, 24), 0);
        assert_eq!(window_count(144, 24), 121);
    }

    #[test]
    fn test_window_layout() {
        let windows = build_windows(&series(30), 24);
        for (i, w) in windows.iter().enumerate() {
            assert_eq!(w.len(), 24);
            assert_eq!(w.start_index(), i);
            assert_eq!(w.end_index, i + 23);
            assert_eq!(w.frames[0][0], i as f64);
            assert_eq!(w.frames[23][0], (i + 23) as f64);
        }
    }

    #[test]
    fn test_tail_mean() {
        let windows = build_windows(&series(5), 5);
        let mean = windows[0].tail_mean(3);
        assert_eq!(mean[0], 3.0);
        assert_eq!(windows[0].tail_mean(1)[0], 4.0);
        // tail longer than the window uses every frame
        assert_eq!(windows[0].tail_mean(10)[0], 2.0);
    }
}
