//! Cancellable waits.
//!
//! Every pause the controller takes (command durations, retry delays,
//! per-frame waits) goes through a `Pacer` so a raised `StopSignal` ends it
//! promptly. With a virtual clock the pause only advances simulated time.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use clawpick_traits::clock::{Clock, MonotonicClock};
use crossbeam_channel as xch;

use crate::error::PickError;

/// Latched cancellation flag shared between the controller and whoever
/// requests shutdown (signal handler, tests). Cloning shares the flag.
#[derive(Debug, Clone)]
pub struct StopSignal {
    raised: Arc<AtomicBool>,
    tx: xch::Sender<()>,
    rx: xch::Receiver<()>,
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl StopSignal {
    pub fn new() -> Self {
        let (tx, rx) = xch::bounded(1);
        Self {
            raised: Arc::new(AtomicBool::new(false)),
            tx,
            rx,
        }
    }

    /// Request cancellation. Idempotent.
    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
        // A full channel already holds a wake-up.
        let _ = self.tx.try_send(());
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }

    /// Block for up to `d`; returns true if cancellation was requested.
    fn wait_timeout(&self, d: Duration) -> bool {
        if self.is_raised() {
            return true;
        }
        // Woken or timed out, the flag is the source of truth.
        let _ = self.rx.recv_timeout(d);
        self.is_raised()
    }
}

/// Clock plus stop signal; the only way the controller waits.
#[derive(Clone)]
pub struct Pacer {
    clock: Arc<dyn Clock + Send + Sync>,
    stop: StopSignal,
}

impl std::fmt::Debug for Pacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pacer")
            .field("virtual_clock", &self.clock.is_virtual())
            .field("stop_raised", &self.stop.is_raised())
            .finish()
    }
}

impl Default for Pacer {
    fn default() -> Self {
        Self::realtime(StopSignal::new())
    }
}

impl Pacer {
    pub fn new(clock: Arc<dyn Clock + Send + Sync>, stop: StopSignal) -> Self {
        Self { clock, stop }
    }

    pub fn realtime(stop: StopSignal) -> Self {
        Self::new(Arc::new(MonotonicClock::new()), stop)
    }

    #[inline]
    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    pub fn clock(&self) -> &Arc<dyn Clock + Send + Sync> {
        &self.clock
    }

    pub fn stop_signal(&self) -> &StopSignal {
        &self.stop
    }

    /// `Err(Cancelled)` once the stop signal has been raised.
    pub fn check(&self) -> Result<(), PickError> {
        if self.stop.is_raised() {
            Err(PickError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Wait for `d` unless cancelled first.
    pub fn wait(&self, d: Duration) -> Result<(), PickError> {
        self.check()?;
        if d.is_zero() {
            return Ok(());
        }
        if self.clock.is_virtual() {
            self.clock.sleep(d);
            return self.check();
        }
        if self.stop.wait_timeout(d) {
            Err(PickError::Cancelled)
        } else {
            Ok(())
        }
    }
}
