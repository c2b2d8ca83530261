//! Feature-width reconciliation between the batch matrix and a model
//!
//! A model expects exactly `expected` inputs. The batch may carry more or
//! fewer. Under [`AlignmentPolicy::Strict`] a mismatch rejects the model for
//! the batch; under [`AlignmentPolicy::Lossy`] rows are zero-padded or
//! truncated. Padding is a compatibility shim, not an imputation: the slot
//! a zero lands in no longer means what the model was trained on.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// How to treat a width mismatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentPolicy {
    /// Reject the model for this batch
    #[default]
    Strict,
    /// Pad with zeros or truncate trailing columns
    Lossy,
}

/// What alignment did (or refused to do) for one model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AlignmentOutcome {
    Exact,
    Padded { available: usize, expected: usize },
    Truncated { available: usize, expected: usize },
    Rejected { available: usize, expected: usize },
}

impl AlignmentOutcome {
    /// Decide how a matrix of width `available` maps onto `expected`
    pub fn plan(available: usize, expected: usize, policy: AlignmentPolicy) -> Self {
        if available == expected {
            return AlignmentOutcome::Exact;
        }
        match policy {
            AlignmentPolicy::Strict => AlignmentOutcome::Rejected { available, expected },
            AlignmentPolicy::Lossy if available < expected => {
                AlignmentOutcome::Padded { available, expected }
            }
            AlignmentPolicy::Lossy => AlignmentOutcome::Truncated { available, expected },
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, AlignmentOutcome::Rejected { .. })
    }
}

/// Fit a single row to `expected` columns. Rows already at that width are
/// borrowed untouched.
pub fn align_row(row: &[f64], expected: usize) -> Cow<'_, [f64]> {
    if row.len() == expected {
        Cow::Borrowed(row)
    } else if row.len() > expected {
        Cow::Borrowed(&row[..expected])
    } else {
        let mut padded = Vec::with_capacity(expected);
        padded.extend_from_slice(row);
        padded.resize(expected, 0.0);
        Cow::Owned(padded)
    }
}

/// Align a whole feature matrix of width `available` to `expected` columns.
///
/// Returns the outcome and, unless rejected, the aligned rows.
pub fn align_features(
    matrix: &[Vec<f64>],
    available: usize,
    expected: usize,
    policy: AlignmentPolicy,
    label: &str,
) -> (AlignmentOutcome, Option<Vec<Vec<f64>>>) {
    let outcome = AlignmentOutcome::plan(available, expected, policy);
    match outcome {
        AlignmentOutcome::Exact => {
            debug!("{label}: feature width {available} matches");
        }
        AlignmentOutcome::Padded { .. } => {
            warn!(
                "{label}: model expects {expected} features, batch has {available}; padding {} zero column(s)",
                expected - available
            );
        }
        AlignmentOutcome::Truncated { .. } => {
            warn!(
                "{label}: model expects {expected} features, batch has {available}; dropping {} trailing column(s)",
                available - expected
            );
        }
        AlignmentOutcome::Rejected { .. } => {
            warn!(
                "{label}: model expects {expected} features, batch has {available}; skipping model (enable lossy alignment to pad/truncate)"
            );
            return (outcome, None);
        }
    }

    let aligned = matrix
        .iter()
        .map(|row| align_row(row, expected).into_owned())
        .collect();
    (outcome, Some(aligned))
}
