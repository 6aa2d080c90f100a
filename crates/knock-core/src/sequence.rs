use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::MIN_TAPS;
use crate::error::KnockError;

/// Ordered gaps between consecutive taps of one capture session, in milliseconds.
///
/// Serialized for storage as comma-joined decimal integers (`"812,640,905"`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DurationSequence {
    gaps: Vec<u64>,
}

impl DurationSequence {
    pub fn new(gaps: Vec<u64>) -> Self {
        Self { gaps }
    }

    /// Build a sequence from measured tap gaps. Sub-millisecond remainders are dropped.
    pub fn from_durations<I>(durations: I) -> Self
    where
        I: IntoIterator<Item = Duration>,
    {
        let gaps = durations
            .into_iter()
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .collect();
        Self { gaps }
    }

    pub fn gaps(&self) -> &[u64] {
        &self.gaps
    }

    pub fn len(&self) -> usize {
        self.gaps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gaps.is_empty()
    }

    /// Number of taps that produced this sequence.
    pub fn tap_count(&self) -> usize {
        if self.gaps.is_empty() {
            0
        } else {
            self.gaps.len() + 1
        }
    }

    /// Sum of all gaps. Widened so that long knocks cannot overflow.
    pub fn total(&self) -> u128 {
        self.gaps.iter().map(|&g| u128::from(g)).sum()
    }

    /// Accept the sequence as a knock, or reject a session with fewer than two taps.
    pub fn validate(self) -> Result<Self, KnockError> {
        if self.gaps.len() + 1 < MIN_TAPS {
            return Err(KnockError::InvalidSession {
                taps: self.tap_count(),
            });
        }
        Ok(self)
    }
}

impl From<Vec<u64>> for DurationSequence {
    fn from(gaps: Vec<u64>) -> Self {
        Self::new(gaps)
    }
}

impl fmt::Display for DurationSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, gap) in self.gaps.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{gap}")?;
        }
        Ok(())
    }
}

/// Why a stored pattern string could not be read back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseError {
    Empty,
    InvalidGap { index: usize, field: String },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Empty => write!(f, "empty pattern"),
            ParseError::InvalidGap { index, field } => {
                write!(f, "gap {index} is not a millisecond count: '{field}'")
            }
        }
    }
}

impl std::error::Error for ParseError {}

impl FromStr for DurationSequence {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseError::Empty);
        }
        s.split(',')
            .enumerate()
            .map(|(index, field)| {
                // u64::from_str accepts a leading '+', the stored format never has one
                if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(ParseError::InvalidGap {
                        index,
                        field: field.to_string(),
                    });
                }
                field.parse::<u64>().map_err(|_| ParseError::InvalidGap {
                    index,
                    field: field.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self::new)
    }
}
