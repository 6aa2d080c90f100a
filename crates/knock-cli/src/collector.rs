//! Tap capture: turns taps on a surface into one duration sequence per session.
//!
//! Taps are published on a [`TapSurface`]. A [`CaptureSession`] subscribes to
//! the surface and times gaps on its own task; the finished sequence comes
//! back over a one-shot channel to whoever owns the session. Dropping the
//! session aborts the timing task, and so does arming the next one: a
//! collector never has more than one session timing taps.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use knock_core::DurationSequence;
use tokio::sync::{broadcast, oneshot};
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::{self, Instant};

/// Taps buffered per subscriber before the slowest one starts losing them.
const TAP_BUFFER: usize = 64;

#[derive(Clone, Copy, Debug)]
enum Signal {
    Tap,
    Closed,
}

/// The designated surface taps land on.
///
/// Taps made while no session is armed are dropped. Once closed, no further
/// taps will ever arrive; sessions finish with whatever they collected.
#[derive(Clone)]
pub struct TapSurface {
    tx: broadcast::Sender<Signal>,
    closed: Arc<AtomicBool>,
}

impl Default for TapSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl TapSurface {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(TAP_BUFFER);
        Self {
            tx,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn tap(&self) {
        if self.is_closed() {
            return;
        }
        // Err only means nobody is listening
        if self.tx.send(Signal::Tap).is_err() {
            tracing::trace!("tap with no capture armed");
        }
    }

    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            let _ = self.tx.send(Signal::Closed);
            tracing::debug!("tap surface closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Number of armed capture sessions listening to this surface.
    #[cfg(test)]
    pub fn listeners(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Result of one capture session.
#[derive(Clone, Debug, PartialEq)]
pub struct Capture {
    pub sequence: DurationSequence,
    pub taps: usize,
    /// The session ended because the surface closed, not on the idle timer.
    pub surface_closed: bool,
}

/// Arms capture sessions with a fixed idle timeout.
#[derive(Debug)]
pub struct TapCollector {
    idle_timeout: Duration,
    /// Timing task of the most recently armed session.
    current: Option<AbortHandle>,
}

impl TapCollector {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            idle_timeout,
            current: None,
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Arm a new session on `surface`, aborting the one armed before it.
    /// Must be called inside a tokio runtime.
    pub fn start(&mut self, surface: &TapSurface) -> CaptureSession {
        if let Some(previous) = self.current.take() {
            if !previous.is_finished() {
                tracing::debug!("superseding active capture session");
            }
            previous.abort();
        }

        // Subscribe before checking the flag so a concurrent close is still seen.
        let rx = surface.tx.subscribe();
        let already_closed = surface.is_closed();
        let (done_tx, done_rx) = oneshot::channel();

        let idle_timeout = self.idle_timeout;
        let handle = tokio::spawn(async move {
            let capture = collect(rx, already_closed, idle_timeout).await;
            // The owner may have gone away; then nobody wants the result.
            let _ = done_tx.send(capture);
        });

        self.current = Some(handle.abort_handle());
        CaptureSession {
            result: done_rx,
            handle,
        }
    }
}

/// One armed, one-shot capture. Not restartable.
pub struct CaptureSession {
    result: oneshot::Receiver<Capture>,
    handle: JoinHandle<()>,
}

impl CaptureSession {
    /// Wait for the session to finish. Yields `None` if the timing task died.
    pub async fn finished(&mut self) -> Option<Capture> {
        (&mut self.result).await.ok()
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn collect(
    mut rx: broadcast::Receiver<Signal>,
    already_closed: bool,
    idle_timeout: Duration,
) -> Capture {
    let mut gaps = Vec::new();
    let mut last_tap: Option<Instant> = None;
    let mut taps = 0usize;
    let mut surface_closed = already_closed;

    while !surface_closed {
        // The idle timer only runs once the first tap has landed.
        let received = match last_tap {
            None => rx.recv().await,
            Some(_) => match time::timeout(idle_timeout, rx.recv()).await {
                Ok(received) => received,
                Err(_) => {
                    tracing::debug!(taps, "capture idle, finishing");
                    break;
                }
            },
        };

        match received {
            Ok(Signal::Tap) => {
                let now = Instant::now();
                if let Some(prev) = last_tap {
                    gaps.push(now.duration_since(prev));
                }
                last_tap = Some(now);
                taps += 1;
                tracing::debug!(taps, "tap");
            }
            Ok(Signal::Closed) | Err(broadcast::error::RecvError::Closed) => {
                surface_closed = true;
            }
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                // The gaps around the missed taps are unknowable.
                tracing::warn!(missed, "capture fell behind, discarding session");
                gaps.clear();
                break;
            }
        }
    }

    let sequence = DurationSequence::from_durations(gaps);
    tracing::debug!(pattern = %sequence, taps, surface_closed, "capture finished");
    Capture {
        sequence,
        taps,
        surface_closed,
    }
}
