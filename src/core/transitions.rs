//! Empirical Markov transition matrices over a state-label sequence.
//!
//! For horizon `s`, every pair `(label[i], label[i + s])` is counted and each
//! row is normalised. A row with no departures becomes an absorbing self-loop,
//! so every row always sums to one.

use serde::{Deserialize, Serialize};

/// Row-stochastic `K x K` matrix for a fixed step horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionMatrix {
    /// Window-steps ahead this matrix describes
    pub horizon: usize,
    /// `probabilities[i][j]` = P(state j after `horizon` steps | state i now)
    pub probabilities: Vec<Vec<f64>>,
}

impl TransitionMatrix {
    /// Identity matrix (every state absorbing).
    pub fn identity(states: usize, horizon: usize) -> Self {
        let probabilities = (0..states)
            .map(|i| (0..states).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
            .collect();
        Self {
            horizon,
            probabilities,
        }
    }

    /// Estimate the matrix for `horizon` from a label sequence.
    ///
    /// Labels outside `0..states` are ignored.
    pub fn estimate(labels: &[usize], states: usize, horizon: usize) -> Self {
        let mut counts = vec![vec![0.0; states]; states];
        if horizon > 0 && labels.len() > horizon {
            for (&from, &to) in labels.iter().zip(&labels[horizon..]) {
                if from < states && to < states {
                    counts[from][to] += 1.0;
                }
            }
        }

        for (i, row) in counts.iter_mut().enumerate() {
            let total: f64 = row.iter().sum();
            if total > 0.0 {
                for p in row.iter_mut() {
                    *p /= total;
                }
            } else {
                row[i] = 1.0;
            }
        }

        Self {
            horizon,
            probabilities: counts,
        }
    }

    pub fn states(&self) -> usize {
        self.probabilities.len()
    }

    pub fn row(&self, state: usize) -> Option<&[f64]> {
        self.probabilities.get(state).map(|r| r.as_slice())
    }

    /// Most likely destination from `state`; ties go to the lowest state id.
    pub fn most_likely(&self, state: usize) -> Option<(usize, f64)> {
        let row = self.row(state)?;
        let mut best = (0, f64::NEG_INFINITY);
        for (j, &p) in row.iter().enumerate() {
            if p > best.1 {
                best = (j, p);
            }
        }
        Some(best)
    }

    /// Matrix product `self * other`.
    pub fn multiply(&self, other: &TransitionMatrix) -> TransitionMatrix {
        let n = self.states();
        let probabilities = (0..n)
            .map(|i| {
                (0..n)
                    .map(|j| {
                        (0..n)
                            .map(|k| self.probabilities[i][k] * other.probabilities[k][j])
                            .sum()
                    })
                    .collect()
            })
            .collect();
        TransitionMatrix {
            horizon: self.horizon + other.horizon,
            probabilities,
        }
    }

    /// `self` raised to the `exponent`-th power by repeated squaring.
    pub fn power(&self, exponent: usize) -> TransitionMatrix {
        let mut result = TransitionMatrix::identity(self.states(), 0);
        let mut base = self.clone();
        let mut e = exponent;
        while e > 0 {
            if e & 1 == 1 {
                result = result.multiply(&base);
            }
            base = base.multiply(&base);
            e >>= 1;
        }
        result
    }

    /// Whether every row sums to one within `tolerance`.
    pub fn is_row_stochastic(&self, tolerance: f64) -> bool {
        self.probabilities
            .iter()
            .all(|row| (row.iter().sum::<f64>() - 1.0).abs() <= tolerance)
    }
}

/// Estimate one matrix per horizon, in the order given.
pub fn estimate_transitions(
    labels: &[usize],
    states: usize,
    horizons: &[usize],
) -> Vec<TransitionMatrix> {
    horizons
        .iter()
        .map(|&h| TransitionMatrix::estimate(labels, states, h))
        .collect()
}
