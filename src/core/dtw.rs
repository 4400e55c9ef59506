//! Dynamic time warping over multivariate frame sequences.
//!
//! Alignment is constrained to a Sakoe-Chiba band of `radius` slots so two
//! windows may shift against each other by a few slots but no further. The
//! local cost is squared Euclidean distance between frames; the returned
//! distance is the square root of the cheapest accumulated cost.

use crate::core::features::{Frame, FEATURE_DIM};

/// Squared Euclidean distance between two frames.
fn local_cost(a: &Frame, b: &Frame) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Whether cell (i, j) lies inside the band.
///
/// The band is widened by the length difference so the end cell stays reachable.
fn in_band(i: usize, j: usize, radius: usize, len_diff: usize) -> bool {
    i.abs_diff(j) <= radius + len_diff
}

/// Accumulated cost matrix, `(n + 1) x (m + 1)`, row-major, with an infinite border.
fn accumulated_cost(a: &[Frame], b: &[Frame], radius: usize) -> Vec<f64> {
    let (n, m) = (a.len(), b.len());
    let width = m + 1;
    let len_diff = n.abs_diff(m);
    let mut acc = vec![f64::INFINITY; (n + 1) * width];
    acc[0] = 0.0;

    for i in 1..=n {
        for j in 1..=m {
            if !in_band(i - 1, j - 1, radius, len_diff) {
                continue;
            }
            let best = acc[(i - 1) * width + (j - 1)]
                .min(acc[(i - 1) * width + j])
                .min(acc[i * width + (j - 1)]);
            acc[i * width + j] = local_cost(&a[i - 1], &b[j - 1]) + best;
        }
    }

    acc
}

/// Band-constrained DTW distance. Infinite if either sequence is empty.
pub fn dtw_distance(a: &[Frame], b: &[Frame], radius: usize) -> f64 {
    if a.is_empty() || b.is_empty() {
        return f64::INFINITY;
    }
    let acc = accumulated_cost(a, b, radius);
    acc[a.len() * (b.len() + 1) + b.len()].sqrt()
}

/// DTW distance together with the optimal warping path.
///
/// The path is a list of `(index into a, index into b)` pairs from `(0, 0)` to
/// `(n - 1, m - 1)`. Ties during backtracking prefer the diagonal step.
pub fn dtw_path(a: &[Frame], b: &[Frame], radius: usize) -> (f64, Vec<(usize, usize)>) {
    if a.is_empty() || b.is_empty() {
        return (f64::INFINITY, Vec::new());
    }

    let (n, m) = (a.len(), b.len());
    let width = m + 1;
    let acc = accumulated_cost(a, b, radius);

    let mut path = Vec::with_capacity(n + m);
    let (mut i, mut j) = (n, m);
    while i > 0 && j > 0 {
        path.push((i - 1, j - 1));
        if i == 1 && j == 1 {
            break;
        }
        let diag = acc[(i - 1) * width + (j - 1)];
        let up = acc[(i - 1) * width + j];
        let left = acc[i * width + (j - 1)];
        if diag <= up && diag <= left {
            i -= 1;
            j -= 1;
        } else if up <= left {
            i -= 1;
        } else {
            j -= 1;
        }
    }
    path.reverse();

    (acc[n * width + m].sqrt(), path)
}

/// DTW barycenter averaging.
///
/// Starting from `initial`, each pass aligns every member to the current
/// barycenter and replaces each barycenter frame with the mean of the member
/// frames aligned to it. Returns `initial` unchanged when there are no members.
pub fn dba_barycenter(
    initial: &[Frame],
    members: &[&[Frame]],
    radius: usize,
    iterations: usize,
) -> Vec<Frame> {
    let mut barycenter = initial.to_vec();
    if members.is_empty() || barycenter.is_empty() {
        return barycenter;
    }

    for _ in 0..iterations.max(1) {
        let mut sums = vec![[0.0; FEATURE_DIM]; barycenter.len()];
        let mut counts = vec![0usize; barycenter.len()];

        for member in members {
            let (_, path) = dtw_path(&barycenter, member, radius);
            for (bi, mi) in path {
                for (s, v) in sums[bi].iter_mut().zip(&member[mi]) {
                    *s += v;
                }
                counts[bi] += 1;
            }
        }

        let updated: Vec<Frame> = sums
            .iter()
            .zip(&counts)
            .zip(&barycenter)
            .map(|((sum, &count), previous)| {
                if count == 0 {
                    *previous
                } else {
                    let mut frame = *sum;
                    for v in frame.iter_mut() {
                        *v /= count as f64;
                    }
                    frame
                }
            })
            .collect();

        if updated == barycenter {
            break;
        }
        barycenter = updated;
    }

    barycenter
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(values: &[f64]) -> Vec<Frame> {
        values.iter().map(|&v| [v, 0.0, 0.0, 0.0, 0.0]).collect()
    }

    fn euclidean(a: &[Frame], b: &[Frame]) -> f64 {
        a.iter()
            .zip(b)
            .map(|(x, y)| local_cost(x, y))
            .sum::<f64>()
            .sqrt()
    }

    #[test]
    fn test_identical_sequences_have_zero_distance() {
        let a = ramp(&[0.0, 0.2, 0.4, 0.6]);
        assert_eq!(dtw_distance(&a, &a, 2), 0.0);
        let (d, path) = dtw_path(&a, &a, 2);
        assert_eq!(d, 0.0);
        assert_eq!(path, vec![(0, 0), (1, 1), (2, 2), (3, 3)]);
    }

    #[test]
    fn test_zero_radius_is_euclidean() {
        let a = ramp(&[0.0, 0.5, 1.0, 0.5]);
        let b = ramp(&[0.1, 0.3, 0.9, 0.9]);
        assert!((dtw_distance(&a, &b, 0) - euclidean(&a, &b)).abs() < 1e-12);
    }

    #[test]
    fn test_warping_absorbs_small_shift() {
        let a = ramp(&[0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0]);
        let b = ramp(&[0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0]);
        assert!(euclidean(&a, &b) > 0.9);
        assert_eq!(dtw_distance(&a, &b, 2), 0.0);
    }

    #[test]
    fn test_band_limits_warping() {
        let a = ramp(&[0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0]);
        let b = ramp(&[0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
        let narrow = dtw_distance(&a, &b, 1);
        let wide = dtw_distance(&a, &b, 7);
        assert!(narrow > wide);
        assert!(dtw_distance(&a, &b, 7) <= euclidean(&a, &b));
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = ramp(&[0.3, 0.1, 0.7, 0.2, 0.9]);
        let b = ramp(&[0.2, 0.8, 0.1, 0.4, 0.4]);
        assert!((dtw_distance(&a, &b, 2) - dtw_distance(&b, &a, 2)).abs() < 1e-12);
    }

    #[test]
    fn test_path_endpoints() {
        let a = ramp(&[0.3, 0.1, 0.7, 0.2, 0.9, 0.5]);
        let b = ramp(&[0.2, 0.8, 0.1, 0.4, 0.4, 0.0]);
        let (d, path) = dtw_path(&a, &b, 2);
        assert_eq!(path.first(), Some(&(0, 0)));
        assert_eq!(path.last(), Some(&(5, 5)));
        assert!((d - dtw_distance(&a, &b, 2)).abs() < 1e-12);
        for pair in path.windows(2) {
            let (i0, j0) = pair[0];
            let (i1, j1) = pair[1];
            assert!(i1 - i0 <= 1 && j1 - j0 <= 1 && (i1, j1) != (i0, j0));
            assert!(i1.abs_diff(j1) <= 2);
        }
    }

    #[test]
    fn test_empty_sequences() {
        let a = ramp(&[0.1]);
        assert!(dtw_distance(&a, &[], 2).is_infinite());
        assert!(dtw_path(&[], &a, 2).1.is_empty());
    }

    #[test]
    fn test_barycenter_of_identical_members() {
        let a = ramp(&[0.1, 0.5, 0.9, 0.5]);
        let start = ramp(&[0.0, 0.0, 0.0, 0.0]);
        let members: Vec<&[Frame]> = vec![&a, &a, &a];
        let bary = dba_barycenter(&start, &members, 0, 3);
        for (x, y) in bary.iter().zip(&a) {
            assert!((x[0] - y[0]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_barycenter_without_members_keeps_initial() {
        let start = ramp(&[0.4, 0.2]);
        assert_eq!(dba_barycenter(&start, &[], 2, 5), start);
    }

    #[test]
    fn test_barycenter_averages_levels() {
        let low = ramp(&[0.0; 6]);
        let high = ramp(&[1.0; 6]);
        let members: Vec<&[Frame]> = vec![&low, &high];
        let bary = dba_barycenter(&low, &members, 2, 5);
        for frame in &bary {
            assert!((frame[0] - 0.5).abs() < 1e-12);
        }
    }
}
