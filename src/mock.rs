//! Mock device and clock for testing without hardware.
//!
//! [`MockCamera`] produces synthetic JPEG-framed payloads on a fixed frame
//! period against a [`MockClock`], so gate and loop timing can be tested
//! deterministically: "blocking" on the device and sleeping both advance
//! virtual time instead of the real clock.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::traits::{
    CameraDevice, CaptureError, CaptureStream, Clock, DeviceCapabilities, Format, FourCC,
    FrameInfo, Result,
};

/// JPEG start-of-image marker.
pub const JPEG_SOI: [u8; 2] = [0xff, 0xd8];
/// JPEG end-of-image marker.
pub const JPEG_EOI: [u8; 2] = [0xff, 0xd9];

/// Virtual monotonic clock for deterministic timing tests.
///
/// Single-threaded by design; share it between a [`MockCamera`] and the
/// capture loop via [`Rc`].
#[derive(Debug)]
pub struct MockClock {
    current: Cell<Instant>,
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MockClock {
    /// Create a clock anchored at the current real instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: Cell::new(Instant::now()),
        }
    }

    /// Advance virtual time by `duration`.
    pub fn advance(&self, duration: Duration) {
        self.current.set(self.current.get() + duration);
    }

    /// Move virtual time forward to `instant`; never moves backwards.
    pub fn advance_to(&self, instant: Instant) {
        if instant > self.current.get() {
            self.current.set(instant);
        }
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.current.get()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

impl Clock for Rc<MockClock> {
    fn now(&self) -> Instant {
        self.as_ref().now()
    }

    fn sleep(&self, duration: Duration) {
        self.as_ref().sleep(duration);
    }
}

/// Mock camera producing opaque JPEG blobs at a fixed frame period.
pub struct MockCamera {
    capabilities: DeviceCapabilities,
    format: Format,
    clock: Rc<MockClock>,
    frame_period: Duration,
    payload_len: usize,
    fail_after: Option<u32>,
    frames_produced: u32,
}

impl MockCamera {
    /// Create a mock camera driven by the given virtual clock.
    #[must_use]
    pub fn new(clock: Rc<MockClock>) -> Self {
        Self {
            capabilities: DeviceCapabilities {
                driver: "mock".to_owned(),
                card: "Mock Camera".to_owned(),
                bus_info: "mock:0".to_owned(),
                can_capture: true,
                can_stream: true,
            },
            format: Format::new(640, 480, FourCC::MJPG),
            clock,
            frame_period: Duration::from_millis(33),
            payload_len: 64,
            fail_after: None,
            frames_produced: 0,
        }
    }

    /// Set the simulated native capture period.
    #[must_use]
    pub const fn with_frame_period(mut self, period: Duration) -> Self {
        self.frame_period = period;
        self
    }

    /// Set the filler payload length between the JPEG markers.
    #[must_use]
    pub const fn with_payload_len(mut self, len: usize) -> Self {
        self.payload_len = len;
        self
    }

    /// Make the stream fail after producing `count` frames.
    #[must_use]
    pub const fn failing_after(mut self, count: u32) -> Self {
        self.fail_after = Some(count);
        self
    }

    /// Number of frames the device has produced so far.
    #[must_use]
    pub const fn frames_produced(&self) -> u32 {
        self.frames_produced
    }
}

impl CameraDevice for MockCamera {
    type Stream<'a> = MockStream<'a>;

    fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    fn format(&self) -> Result<Format> {
        Ok(self.format.clone())
    }

    fn create_stream(&mut self, _buffer_count: u32) -> Result<Self::Stream<'_>> {
        let start = self.clock.now();
        Ok(MockStream {
            device: self,
            start,
        })
    }
}

/// Mock capture stream; frame N becomes ready at `start + (N + 1) * period`.
pub struct MockStream<'a> {
    device: &'a mut MockCamera,
    start: Instant,
}

impl CaptureStream for MockStream<'_> {
    fn next_frame(&mut self, buf: &mut Vec<u8>) -> Result<FrameInfo> {
        if let Some(limit) = self.device.fail_after {
            if self.device.frames_produced >= limit {
                return Err(CaptureError::Capture("simulated device failure".to_owned()));
            }
        }

        let sequence = self.device.frames_produced;
        let ready_at = self.start + self.device.frame_period * (sequence + 1);
        // Block (in virtual time) until the device's next frame is due.
        self.device.clock.advance_to(ready_at);
        self.device.frames_produced += 1;

        buf.clear();
        buf.extend_from_slice(&JPEG_SOI);
        buf.extend_from_slice(&sequence.to_be_bytes());
        buf.resize(buf.len() + self.device.payload_len, 0xa5);
        buf.extend_from_slice(&JPEG_EOI);

        Ok(FrameInfo {
            sequence,
            timestamp: ready_at.duration_since(self.start),
            bytes_used: buf.len(),
        })
    }
}

/// Split a concatenated JPEG stream on its start/end-of-image markers and
/// return the embedded sequence number of each frame.
///
/// Test helper mirroring what a downstream consumer of the undelimited
/// stream has to do.
#[must_use]
pub fn decode_sequences(stream: &[u8]) -> Vec<u32> {
    let mut sequences = Vec::new();
    let mut rest = stream;

    while rest.len() >= 8 && rest.get(..2) == Some(JPEG_SOI.as_slice()) {
        if let Some(seq_bytes) = rest.get(2..6) {
            let mut seq = [0u8; 4];
            seq.copy_from_slice(seq_bytes);
            sequences.push(u32::from_be_bytes(seq));
        }
        // Skip ahead to the byte after the closing marker.
        let Some(end) = rest
            .windows(2)
            .skip(2)
            .position(|pair| pair == JPEG_EOI.as_slice())
            .map(|pos| pos + 4)
        else {
            break;
        };
        rest = rest.get(end..).unwrap_or_default();
    }

    sequences
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_camera_creation() {
        let clock = Rc::new(MockClock::new());
        let device = MockCamera::new(clock);
        assert_eq!(device.capabilities().driver, "mock");
        assert!(device.capabilities().can_capture);
        assert!(device.capabilities().can_stream);
    }

    #[test]
    fn test_format_reports_mjpg() {
        let clock = Rc::new(MockClock::new());
        let device = MockCamera::new(clock);
        let format = device.format().expect("format should succeed");
        assert_eq!(format.width, 640);
        assert_eq!(format.height, 480);
        assert_eq!(format.fourcc, FourCC::MJPG);
    }

    #[test]
    fn test_frames_carry_jpeg_markers_and_sequence() {
        let clock = Rc::new(MockClock::new());
        let mut device = MockCamera::new(Rc::clone(&clock)).with_payload_len(16);
        let mut stream = device.create_stream(1).expect("create_stream should succeed");

        let mut buf = Vec::new();
        let info = stream.next_frame(&mut buf).expect("next_frame should succeed");

        assert_eq!(info.sequence, 0);
        assert_eq!(info.bytes_used, buf.len());
        assert_eq!(buf.get(..2), Some(JPEG_SOI.as_slice()));
        assert_eq!(buf.get(buf.len() - 2..), Some(JPEG_EOI.as_slice()));
        assert_eq!(decode_sequences(&buf), vec![0]);
    }

    #[test]
    fn test_next_frame_advances_virtual_time_by_period() {
        let clock = Rc::new(MockClock::new());
        let start = clock.now();
        let mut device = MockCamera::new(Rc::clone(&clock))
            .with_frame_period(Duration::from_millis(20));
        let mut stream = device.create_stream(1).expect("create_stream should succeed");

        let mut buf = Vec::new();
        stream.next_frame(&mut buf).expect("next_frame should succeed");
        assert_eq!(clock.now().duration_since(start), Duration::from_millis(20));
        stream.next_frame(&mut buf).expect("next_frame should succeed");
        assert_eq!(clock.now().duration_since(start), Duration::from_millis(40));
    }

    #[test]
    fn test_device_does_not_outpace_elapsed_sleep() {
        let clock = Rc::new(MockClock::new());
        let start = clock.now();
        let mut device = MockCamera::new(Rc::clone(&clock))
            .with_frame_period(Duration::from_millis(20));
        let mut stream = device.create_stream(1).expect("create_stream should succeed");

        let mut buf = Vec::new();
        stream.next_frame(&mut buf).expect("next_frame should succeed");
        // Caller slept past the next frame's ready time; capture does not
        // rewind the clock.
        clock.advance(Duration::from_millis(50));
        stream.next_frame(&mut buf).expect("next_frame should succeed");
        assert_eq!(clock.now().duration_since(start), Duration::from_millis(70));
    }

    #[test]
    fn test_failure_injection() {
        let clock = Rc::new(MockClock::new());
        let mut device = MockCamera::new(clock).failing_after(2);
        let mut stream = device.create_stream(1).expect("create_stream should succeed");

        let mut buf = Vec::new();
        stream.next_frame(&mut buf).expect("first frame should succeed");
        stream.next_frame(&mut buf).expect("second frame should succeed");
        let err = stream.next_frame(&mut buf).expect_err("third frame should fail");
        assert!(matches!(err, CaptureError::Capture(_)));
    }

    #[test]
    fn test_decode_sequences_splits_concatenated_stream() {
        let clock = Rc::new(MockClock::new());
        let mut device = MockCamera::new(clock).with_payload_len(8);
        let mut stream = device.create_stream(1).expect("create_stream should succeed");

        let mut output = Vec::new();
        let mut buf = Vec::new();
        for _ in 0..3 {
            stream.next_frame(&mut buf).expect("next_frame should succeed");
            output.extend_from_slice(&buf);
        }

        assert_eq!(decode_sequences(&output), vec![0, 1, 2]);
    }
}
