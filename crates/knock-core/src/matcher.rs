use std::fmt;

use serde::Serialize;

use crate::constants::ALLOWED_ERROR_MS;
use crate::sequence::DurationSequence;

/// Scale-invariant rhythm comparison.
///
/// The entered knock is stretched by `scale = sum(stored) / sum(entered)` and
/// every rescaled gap must land within `tolerance_ms` of the stored gap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Matcher {
    tolerance_ms: u64,
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new(ALLOWED_ERROR_MS)
    }
}

/// One gap of a comparison: stored value, entered value, entered after rescaling,
/// and the absolute deviation between stored and rescaled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct GapReport {
    pub stored: u64,
    pub entered: u64,
    pub scaled: u64,
    pub deviation: u64,
}

/// Reason a candidate knock was not accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Mismatch {
    LengthMismatch { stored: usize, entered: usize },
    ZeroDuration,
    OutOfTolerance { index: usize, deviation: u64 },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mismatch::LengthMismatch { stored, entered } => {
                write!(f, "expected {stored} gaps, got {entered}")
            }
            Mismatch::ZeroDuration => write!(f, "entered knock has zero total length"),
            Mismatch::OutOfTolerance { index, deviation } => {
                write!(f, "gap {index} off by {deviation}ms")
            }
        }
    }
}

/// Full result of comparing a candidate against a stored pattern.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Comparison {
    /// `None` when the comparison stopped before rescaling.
    pub scale: Option<f64>,
    pub gaps: Vec<GapReport>,
    /// First reason for rejection, `None` on a match.
    pub mismatch: Option<Mismatch>,
}

impl Comparison {
    pub fn is_match(&self) -> bool {
        self.mismatch.is_none()
    }

    fn rejected(mismatch: Mismatch) -> Self {
        Self {
            scale: None,
            gaps: Vec::new(),
            mismatch: Some(mismatch),
        }
    }
}

impl Matcher {
    pub fn new(tolerance_ms: u64) -> Self {
        Self { tolerance_ms }
    }

    pub fn tolerance_ms(&self) -> u64 {
        self.tolerance_ms
    }

    pub fn matches(&self, stored: &DurationSequence, entered: &DurationSequence) -> bool {
        self.compare(stored, entered).is_match()
    }

    /// Compare every gap and report the first failure. All gaps are reported
    /// even after a failure so callers can show the whole picture.
    pub fn compare(&self, stored: &DurationSequence, entered: &DurationSequence) -> Comparison {
        tracing::debug!(stored = %stored, entered = %entered, "comparing knock");

        if stored.len() != entered.len() {
            tracing::debug!("patterns not same number of taps");
            return Comparison::rejected(Mismatch::LengthMismatch {
                stored: stored.len(),
                entered: entered.len(),
            });
        }

        let entered_total = entered.total();
        if entered_total == 0 {
            return Comparison::rejected(Mismatch::ZeroDuration);
        }
        let scale = stored.total() as f64 / entered_total as f64;

        let mut mismatch = None;
        let gaps = stored
            .gaps()
            .iter()
            .zip(entered.gaps())
            .enumerate()
            .map(|(index, (&stored, &entered))| {
                // f64 -> u64 casts saturate; gaps are never negative
                let scaled = (scale * entered as f64).round() as u64;
                let deviation = stored.abs_diff(scaled);
                tracing::trace!(stored, entered, scaled, "gap");
                if deviation > self.tolerance_ms && mismatch.is_none() {
                    mismatch = Some(Mismatch::OutOfTolerance { index, deviation });
                }
                GapReport {
                    stored,
                    entered,
                    scaled,
                    deviation,
                }
            })
            .collect();

        Comparison {
            scale: Some(scale),
            gaps,
            mismatch,
        }
    }
}
