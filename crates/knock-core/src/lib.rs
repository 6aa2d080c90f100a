//! Secret-knock rhythm engine.
//!
//! A knock is the list of gaps between consecutive taps. Patterns are compared
//! after rescaling the entered knock to the total length of the stored one, so
//! tempo may drift while the relative rhythm must hold.
//!
//! Zero I/O — capture and persistence live in the sibling crates.

pub mod constants;
pub mod error;
pub mod matcher;
pub mod sequence;
pub mod state;

pub use constants::{ALLOWED_ERROR_MS, IDLE_TIMEOUT_MS, LOCK_STATE_KEY, MIN_TAPS, PATTERN_KEY};
pub use error::{KnockError, Result};
pub use matcher::{Comparison, GapReport, Matcher, Mismatch};
pub use sequence::{DurationSequence, ParseError};
pub use state::{LockState, Transition};
