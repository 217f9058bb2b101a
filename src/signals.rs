//! Signal-to-supervisor bridge.
//!
//! Handlers do only async-signal-safe work: bump an atomic counter. The
//! supervisor observes cancellation by polling between waits. A second
//! signal while shutdown is already in progress exits immediately without
//! the summary; that is the safety valve when a subprocess hangs.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

#[cfg(unix)]
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};

static SIGNAL_COUNT: AtomicU32 = AtomicU32::new(0);

#[cfg(unix)]
extern "C" fn handle_cancel(_sig: i32) {
    let prior = SIGNAL_COUNT.fetch_add(1, Ordering::SeqCst);
    if prior >= 1 {
        // Shutdown already in progress; bail out without the summary.
        unsafe { libc::_exit(130) }
    }
}

/// Cooperative cancellation handle polled by the supervisor. Signal-backed
/// when produced by install_signal_handlers; tests construct detached flags.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    local: Arc<AtomicU32>,
    signal_backed: bool,
}

impl CancelFlag {
    /// A flag not wired to process signals (tests, embedding).
    pub fn new() -> CancelFlag {
        CancelFlag {
            local: Arc::new(AtomicU32::new(0)),
            signal_backed: false,
        }
    }

    pub fn cancel(&self) {
        self.local.store(1, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        if self.local.load(Ordering::SeqCst) != 0 {
            return true;
        }
        self.signal_backed && SIGNAL_COUNT.load(Ordering::SeqCst) > 0
    }
}

/// Install INT/TERM/HUP handlers and return the signal-backed flag. Must be
/// installed before the supervisor enters its tick loop.
#[cfg(unix)]
pub fn install_signal_handlers() -> nix::Result<CancelFlag> {
    let action = SigAction::new(
        SigHandler::Handler(handle_cancel),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    unsafe {
        signal::sigaction(Signal::SIGINT, &action)?;
        signal::sigaction(Signal::SIGTERM, &action)?;
        signal::sigaction(Signal::SIGHUP, &action)?;
    }
    Ok(CancelFlag {
        local: Arc::new(AtomicU32::new(0)),
        signal_backed: true,
    })
}
