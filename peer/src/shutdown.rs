use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, OnceLock,
    },
    thread::sleep,
    time::{Duration, Instant},
};

/// longest stretch [`Shutdown::sleep`] goes without looking at the flag.
const POLL_SLICE: Duration = Duration::from_millis(20);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShutdownReason {
    RoundsComplete,
    Interrupted,
    PeerClosed,
    Failed,
}

/// cooperative cancellation shared by every loop in a session. the flag only ever goes from
/// unset to set, and the first reason given is the one that sticks.
#[derive(Clone, Debug, Default)]
pub struct Shutdown {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    triggered: AtomicBool,
    reason: OnceLock<ShutdownReason>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// returns true for the call that actually started the shutdown.
    pub fn trigger(&self, reason: ShutdownReason) -> bool {
        let first = self.inner.reason.set(reason).is_ok();
        self.inner.triggered.store(true, Ordering::Release);
        first
    }

    pub fn is_triggered(&self) -> bool {
        self.inner.triggered.load(Ordering::Acquire)
    }

    pub fn reason(&self) -> Option<ShutdownReason> {
        self.inner.reason.get().copied()
    }

    /// sleeps for `duration` unless shutdown is triggered first. returns false if it was.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_triggered() {
                return false;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return true;
            }
            sleep(remaining.min(POLL_SLICE));
        }
    }
}
