//! Capture loop driver: pulls frames, gates them, and emits accepted ones.

use std::io::Write;

use crate::gate::{FrameRateGate, GateDecision};
use crate::lifecycle::RunState;
use crate::sink::FrameSink;
use crate::traits::{CaptureStream, Clock, Result};

/// Counters accumulated over one run of the capture loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Frames produced by the device.
    pub produced: u64,
    /// Frames forwarded to the sink.
    pub forwarded: u64,
    /// Frames dropped by the rate gate.
    pub dropped: u64,
}

/// Run the capture loop until a stop is requested or a fatal error occurs.
///
/// Each iteration requests one frame, asks the gate whether to forward it,
/// writes and flushes forwarded frames, then re-checks [`RunState`]. Exactly
/// one buffer slot is in flight: the frame is fully written before the next
/// one is requested. The driver is the sole writer to the sink.
///
/// A sink error halts the loop immediately without requesting further
/// frames. A termination request takes effect at the next iteration
/// boundary, never mid-frame.
pub fn run_capture_loop<S, W, C>(
    stream: &mut S,
    gate: &mut FrameRateGate,
    sink: &mut FrameSink<W>,
    run_state: &RunState,
    clock: &C,
) -> Result<LoopStats>
where
    S: CaptureStream,
    W: Write,
    C: Clock,
{
    let mut buf = Vec::new();
    let mut stats = LoopStats::default();

    while run_state.is_running() {
        let info = stream.next_frame(&mut buf)?;
        stats.produced += 1;

        match gate.decide(clock.now()) {
            GateDecision::Forward => {
                sink.write_frame(&buf)?;
                stats.forwarded += 1;
                tracing::debug!(
                    sequence = info.sequence,
                    bytes = info.bytes_used,
                    "frame forwarded"
                );
            }
            GateDecision::Drop => {
                stats.dropped += 1;
                // Throttle re-polling so a fast device does not spin the CPU
                // between emission deadlines.
                clock.sleep(gate.poll_delay());
            }
        }
    }

    tracing::info!(
        produced = stats.produced,
        forwarded = stats.forwarded,
        dropped = stats.dropped,
        "stop requested, capture loop exiting"
    );
    Ok(stats)
}
