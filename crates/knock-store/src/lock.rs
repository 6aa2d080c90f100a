use knock_core::{DurationSequence, KnockError, LOCK_STATE_KEY, LockState, Transition};

use crate::error::{Result, StoreError};
use crate::kv::KeyValueStore;
use crate::pattern::PatternStore;

/// The two-state lock driven by finished capture sessions.
///
/// Unlocked + valid knock records the pattern and locks. Locked + matching
/// knock unlocks, clearing the pattern unless `retain_on_unlock` is set.
/// Every other combination is a [`Transition::Rejected`] that leaves the
/// state untouched. Only storage faults come back as `Err`, and they leave
/// the in-memory state untouched too.
///
/// Writes are ordered so an interrupted transition never persists `locked`
/// without a pattern: the pattern goes in before the lock engages, and the
/// lock disengages before the pattern is cleared.
pub struct Lock<S> {
    patterns: PatternStore<S>,
    state: LockState,
    retain_on_unlock: bool,
}

impl<S: KeyValueStore> Lock<S> {
    /// Restore the lock from storage. Without a persisted state the lock is
    /// engaged exactly when a pattern is present.
    pub fn open(patterns: PatternStore<S>, retain_on_unlock: bool) -> Result<Self> {
        let persisted = patterns.kv().get(LOCK_STATE_KEY)?;
        let state = match persisted.as_deref().map(str::parse::<LockState>) {
            Some(Ok(state)) => state,
            Some(Err(e)) => {
                tracing::warn!("ignoring persisted lock state: {e}");
                Self::derived_state(&patterns)?
            }
            None => Self::derived_state(&patterns)?,
        };
        tracing::debug!(%state, "lock opened");

        Ok(Self {
            patterns,
            state,
            retain_on_unlock,
        })
    }

    fn derived_state(patterns: &PatternStore<S>) -> Result<LockState> {
        Ok(if patterns.contains()? {
            LockState::Locked
        } else {
            LockState::Unlocked
        })
    }

    pub fn state(&self) -> LockState {
        self.state
    }

    pub fn is_locked(&self) -> bool {
        self.state == LockState::Locked
    }

    pub fn patterns(&self) -> &PatternStore<S> {
        &self.patterns
    }

    /// Hand a finished capture session to the lock.
    pub fn submit(&mut self, capture: DurationSequence) -> Result<Transition> {
        let capture = match capture.validate() {
            Ok(capture) => capture,
            Err(e) => {
                tracing::info!("pattern invalid");
                return Ok(Transition::Rejected(e));
            }
        };

        match self.state {
            LockState::Unlocked => self.activate(capture),
            LockState::Locked => self.try_deactivate(&capture),
        }
    }

    fn activate(&mut self, capture: DurationSequence) -> Result<Transition> {
        self.patterns.store(&capture)?;
        self.persist_state(LockState::Locked)?;
        self.state = LockState::Locked;
        tracing::info!("lock activated");
        Ok(Transition::Locked(capture))
    }

    fn try_deactivate(&mut self, capture: &DurationSequence) -> Result<Transition> {
        let comparison = match self.patterns.compare(capture) {
            Ok(comparison) => comparison,
            Err(StoreError::Knock(e)) => {
                tracing::warn!("cannot unlock: {e}");
                return Ok(Transition::Rejected(e));
            }
            Err(e) => return Err(e),
        };

        if let Some(mismatch) = comparison.mismatch {
            tracing::info!("pattern incorrect: {mismatch}");
            return Ok(Transition::Rejected(KnockError::NonMatch(mismatch)));
        }

        self.persist_state(LockState::Unlocked)?;
        if !self.retain_on_unlock {
            self.patterns.clear()?;
        }
        self.state = LockState::Unlocked;
        tracing::info!("lock deactivated");
        Ok(Transition::Unlocked)
    }

    /// Engage the lock again with the pattern kept from a previous unlock.
    pub fn relock(&mut self) -> Result<Transition> {
        match self.patterns.retrieve() {
            Ok(pattern) => {
                self.persist_state(LockState::Locked)?;
                self.state = LockState::Locked;
                tracing::info!("lock activated with retained pattern");
                Ok(Transition::Locked(pattern))
            }
            Err(StoreError::Knock(e)) => Ok(Transition::Rejected(e)),
            Err(e) => Err(e),
        }
    }

    /// Deactivate unconditionally, forgetting the pattern.
    pub fn reset(&mut self) -> Result<()> {
        self.persist_state(LockState::Unlocked)?;
        self.patterns.clear()?;
        self.state = LockState::Unlocked;
        tracing::info!("lock reset");
        Ok(())
    }

    fn persist_state(&mut self, state: LockState) -> Result<()> {
        self.patterns.kv_mut().set(LOCK_STATE_KEY, state.as_str())
    }
}
