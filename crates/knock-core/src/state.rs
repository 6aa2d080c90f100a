use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::KnockError;
use crate::sequence::DurationSequence;

/// Two-state lock. A fresh install with no recorded knock is unlocked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LockState {
    #[default]
    Unlocked,
    Locked,
}

impl LockState {
    pub fn as_str(self) -> &'static str {
        match self {
            LockState::Unlocked => "unlocked",
            LockState::Locked => "locked",
        }
    }
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LockState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unlocked" => Ok(LockState::Unlocked),
            "locked" => Ok(LockState::Locked),
            other => Err(format!("unknown lock state '{other}'")),
        }
    }
}

/// Outcome of handing one finished capture session to the lock.
#[derive(Clone, Debug, PartialEq)]
pub enum Transition {
    /// The knock was recorded and the lock engaged.
    Locked(DurationSequence),
    /// The knock matched and the lock released.
    Unlocked,
    /// The attempt failed; state is unchanged and capture should re-arm.
    Rejected(KnockError),
}

impl Transition {
    /// Whether the front end should start a fresh capture session.
    pub fn rearm(&self) -> bool {
        match self {
            Transition::Rejected(e) => e.is_retryable(),
            _ => false,
        }
    }
}
