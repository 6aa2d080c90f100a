use std::fmt;

use crate::matcher::Mismatch;
use crate::sequence::ParseError;

/// Recoverable knock failures. Each one ends the current attempt and the
/// caller re-arms capture; none of them is fatal.
#[derive(Clone, Debug, PartialEq)]
pub enum KnockError {
    /// The capture session ended with fewer than two taps.
    InvalidSession { taps: usize },
    /// A pattern was required but none is stored.
    NotFound,
    /// The stored pattern could not be parsed.
    MalformedData(ParseError),
    /// The entered knock does not fit the stored pattern.
    NonMatch(Mismatch),
}

impl KnockError {
    /// Whether another knock could succeed. A missing or corrupt pattern
    /// will not fix itself by knocking again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            KnockError::InvalidSession { .. } | KnockError::NonMatch(_)
        )
    }
}

impl fmt::Display for KnockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KnockError::InvalidSession { taps } => {
                write!(f, "pattern invalid: {taps} tap(s), need at least 2")
            }
            KnockError::NotFound => write!(f, "no pattern recorded"),
            KnockError::MalformedData(e) => write!(f, "stored pattern is malformed: {e}"),
            KnockError::NonMatch(m) => write!(f, "pattern incorrect: {m}"),
        }
    }
}

impl std::error::Error for KnockError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            KnockError::MalformedData(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ParseError> for KnockError {
    fn from(e: ParseError) -> Self {
        KnockError::MalformedData(e)
    }
}

impl From<Mismatch> for KnockError {
    fn from(m: Mismatch) -> Self {
        KnockError::NonMatch(m)
    }
}

pub type Result<T> = std::result::Result<T, KnockError>;
