//! Lifecycle control: the one-way run/stop flag and its signal wiring.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use signal_hook::consts::signal::{SIGINT, SIGTERM};
use signal_hook::flag;

use crate::traits::{CaptureError, Result};

/// Shared run/stop state for the capture loop.
///
/// Starts in the running state. A termination request flips it to stopping
/// exactly once; the flag never resets. A single atomic suffices because
/// the only legal transition is one-way: the asynchronous signal handler is
/// the writer, the loop the reader, and repeated requests are no-ops.
#[derive(Debug, Clone, Default)]
pub struct RunState {
    stopping: Arc<AtomicBool>,
}

impl RunState {
    /// Create a new state in the running condition.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the capture loop should continue. Read once per iteration.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.stopping.load(Ordering::Relaxed)
    }

    /// Request cooperative shutdown. Idempotent.
    pub fn request_stop(&self) {
        self.stopping.store(true, Ordering::Relaxed);
    }

    /// Install SIGINT/SIGTERM handlers that flip this state.
    ///
    /// The handler performs only the atomic flag write - no I/O and no
    /// logging, avoiding reentrancy hazards inside the signal context.
    /// User-visible shutdown logging happens in the loop once it observes
    /// the flag.
    pub fn register_signal_handlers(&self) -> Result<()> {
        flag::register(SIGINT, Arc::clone(&self.stopping))
            .map_err(CaptureError::SignalSetup)?;
        flag::register(SIGTERM, Arc::clone(&self.stopping))
            .map_err(CaptureError::SignalSetup)?;
        Ok(())
    }
}
