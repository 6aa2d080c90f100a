//! The lock screen: owns the lock, arms capture sessions and reacts to them.
//!
//! All lock mutation happens on the task driving [`Screen::run`]. Capture
//! timing happens on the collector's own task.

use std::io::{BufRead, Write};

use anyhow::{Result, anyhow};
use knock_core::{KnockError, LockState, Transition};
use knock_store::{KeyValueStore, Lock};

use crate::collector::{TapCollector, TapSurface};

/// How a screen run ended.
#[derive(Debug, PartialEq)]
pub enum Outcome {
    /// The lock changed state.
    Done(LockState),
    /// The tap surface closed before a knock was accepted.
    InputEnded,
    /// Knocking again cannot help (no or corrupt stored pattern).
    Stopped(KnockError),
}

pub struct Screen<S> {
    lock: Lock<S>,
    collector: TapCollector,
    surface: TapSurface,
}

impl<S: KeyValueStore> Screen<S> {
    pub fn new(lock: Lock<S>, collector: TapCollector) -> Self {
        Self {
            lock,
            collector,
            surface: TapSurface::new(),
        }
    }

    /// Drive the lock until it changes state. Taps come from whoever holds
    /// a clone of the screen's surface.
    #[cfg(test)]
    pub async fn run<W: Write>(&mut self, out: &mut W) -> Result<Outcome> {
        self.drive(out, |_| {}).await
    }

    /// Drive the lock with one tap per line of `input`. End of input closes
    /// the surface.
    pub async fn run_with_input<R, W>(&mut self, input: R, out: &mut W) -> Result<Outcome>
    where
        R: BufRead + Send + 'static,
        W: Write,
    {
        self.drive(out, |surface| feed_lines(input, surface.clone()))
            .await
    }

    async fn drive<W: Write>(
        &mut self,
        out: &mut W,
        on_armed: impl FnOnce(&TapSurface),
    ) -> Result<Outcome> {
        writeln!(out, "{}", prompt(self.lock.state()))?;
        out.flush()?;

        let mut session = self.collector.start(&self.surface);
        on_armed(&self.surface);

        loop {
            let capture = session
                .finished()
                .await
                .ok_or_else(|| anyhow!("capture task stopped unexpectedly"))?;

            tracing::debug!(taps = capture.taps, "submitting capture");
            let transition = self.lock.submit(capture.sequence)?;
            let rearm = transition.rearm();
            match transition {
                Transition::Locked(pattern) => {
                    writeln!(out, "lock activated ({} taps)", pattern.tap_count())?;
                    return Ok(Outcome::Done(LockState::Locked));
                }
                Transition::Unlocked => {
                    writeln!(out, "lock deactivated")?;
                    return Ok(Outcome::Done(LockState::Unlocked));
                }
                Transition::Rejected(e) if !rearm => {
                    return Ok(Outcome::Stopped(e));
                }
                Transition::Rejected(e) => {
                    writeln!(out, "{e}")?;
                    out.flush()?;
                    if capture.surface_closed {
                        return Ok(Outcome::InputEnded);
                    }
                    session = self.collector.start(&self.surface);
                }
            }
        }
    }
}

fn prompt(state: LockState) -> String {
    match state {
        LockState::Unlocked => "tap your knock to record it (one tap per line)".to_string(),
        LockState::Locked => "knock to unlock (one tap per line)".to_string(),
    }
}

/// Tap the surface once per input line on a plain thread, so a blocked read
/// never holds up runtime shutdown.
fn feed_lines<R: BufRead + Send + 'static>(input: R, surface: TapSurface) {
    std::thread::spawn(move || {
        for line in input.lines() {
            match line {
                Ok(_) => surface.tap(),
                Err(e) => {
                    tracing::warn!("failed to read tap input: {e}");
                    break;
                }
            }
        }
        surface.close();
    });
}
