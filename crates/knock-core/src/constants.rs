/// Quiet time after the most recent tap that closes a capture session (ms).
pub const IDLE_TIMEOUT_MS: u64 = 1500;

/// Largest per-gap deviation accepted after rescaling (ms, inclusive).
pub const ALLOWED_ERROR_MS: u64 = 100;

/// Fewest taps that form a usable knock (one gap).
pub const MIN_TAPS: usize = 2;

/// Key under which the recorded pattern is persisted.
pub const PATTERN_KEY: &str = "durations";

/// Key under which the lock state is persisted.
pub const LOCK_STATE_KEY: &str = "lock_state";
