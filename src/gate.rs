//! Frame rate gate: decides, per captured frame, whether to forward it.
//!
//! The gate decouples the camera's native capture cadence from the fixed
//! downstream emission cadence. Decisions are based strictly on elapsed
//! wall-clock time, never on frame count.

use std::time::{Duration, Instant};

/// Divisor applied to the frame interval to derive the re-poll delay after
/// a dropped frame. Larger values poll more often (lower added latency,
/// more CPU); smaller values the reverse.
const DEFAULT_POLL_DIVISOR: u32 = 10;

/// Outcome of a gate decision for one captured frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Emit the frame to the sink.
    Forward,
    /// Discard the frame; the emission interval has not yet elapsed.
    Drop,
}

/// Stateful rate-limiting filter.
///
/// Forwards a frame when at least one frame interval (`1 / framerate`) has
/// elapsed since the last forwarded frame. The first decision is always
/// [`GateDecision::Forward`].
#[derive(Debug)]
pub struct FrameRateGate {
    interval: Duration,
    poll_delay: Duration,
    last_emission: Option<Instant>,
}

impl FrameRateGate {
    /// Create a gate for the given target framerate in frames per second.
    ///
    /// `framerate` must be positive and finite (guaranteed by configuration
    /// validation); other values collapse the interval to zero and the gate
    /// forwards every frame.
    #[must_use]
    pub fn new(framerate: f64) -> Self {
        let interval = Duration::try_from_secs_f64(1.0 / framerate).unwrap_or_default();
        Self {
            interval,
            poll_delay: interval / DEFAULT_POLL_DIVISOR,
            last_emission: None,
        }
    }

    /// Override the re-poll delay divisor.
    #[must_use]
    pub fn with_poll_divisor(mut self, divisor: u32) -> Self {
        self.poll_delay = self.interval / divisor.max(1);
        self
    }

    /// Decide whether the frame captured at `now` is forwarded or dropped.
    ///
    /// On [`GateDecision::Forward`] the emission timestamp advances to
    /// `now`. A `now` earlier than the last emission (clock irregularity)
    /// counts as "not yet due": it never forwards and never rewinds the
    /// emission timestamp.
    pub fn decide(&mut self, now: Instant) -> GateDecision {
        match self.last_emission {
            Some(last) if now.saturating_duration_since(last) < self.interval => {
                GateDecision::Drop
            }
            _ => {
                self.last_emission = Some(now);
                GateDecision::Forward
            }
        }
    }

    /// Minimum spacing between two forwarded frames.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// How long the caller should wait after a drop before re-polling the
    /// device. A fixed fraction of the interval, bounding CPU use without
    /// materially delaying the next deadline.
    #[must_use]
    pub const fn poll_delay(&self) -> Duration {
        self.poll_delay
    }
}
