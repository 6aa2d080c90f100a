use knock_core::{Comparison, DurationSequence, KnockError, Matcher, PATTERN_KEY};

use crate::error::Result;
use crate::kv::KeyValueStore;

/// Owner of the single recorded knock.
///
/// The pattern lives under [`PATTERN_KEY`] as comma-joined milliseconds.
/// Every recording replaces it; deactivating the lock removes it.
pub struct PatternStore<S> {
    kv: S,
    matcher: Matcher,
}

impl<S: KeyValueStore> PatternStore<S> {
    pub fn new(kv: S) -> Self {
        Self::with_matcher(kv, Matcher::default())
    }

    pub fn with_matcher(kv: S, matcher: Matcher) -> Self {
        Self { kv, matcher }
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub fn kv(&self) -> &S {
        &self.kv
    }

    pub fn kv_mut(&mut self) -> &mut S {
        &mut self.kv
    }

    pub fn store(&mut self, sequence: &DurationSequence) -> Result<()> {
        self.kv.set(PATTERN_KEY, &sequence.to_string())?;
        tracing::info!(gaps = sequence.len(), "pattern stored");
        Ok(())
    }

    pub fn clear(&mut self) -> Result<()> {
        self.kv.remove(PATTERN_KEY)?;
        tracing::info!("pattern cleared");
        Ok(())
    }

    /// Whether any value sits under the pattern key, parseable or not.
    pub fn contains(&self) -> Result<bool> {
        Ok(self.kv.get(PATTERN_KEY)?.is_some())
    }

    /// Read back the stored knock.
    ///
    /// Fails with [`KnockError::NotFound`] when nothing is stored and
    /// [`KnockError::MalformedData`] when the value does not parse.
    pub fn retrieve(&self) -> Result<DurationSequence> {
        let raw = self.kv.get(PATTERN_KEY)?.ok_or(KnockError::NotFound)?;
        let sequence = raw
            .parse::<DurationSequence>()
            .map_err(KnockError::from)?;
        tracing::debug!(pattern = %sequence, "retrieved pattern");
        Ok(sequence)
    }

    pub fn compare(&self, candidate: &DurationSequence) -> Result<Comparison> {
        let stored = self.retrieve()?;
        Ok(self.matcher.compare(&stored, candidate))
    }

    pub fn matches(&self, candidate: &DurationSequence) -> Result<bool> {
        Ok(self.compare(candidate)?.is_match())
    }
}
