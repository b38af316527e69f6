//! Core traits and types for the camera capture abstraction.

use std::time::{Duration, Instant};

/// Pixel format representation (e.g., MJPG, YUYV).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    /// Create a new `FourCC` from a 4-byte array.
    #[must_use]
    pub const fn new(code: &[u8; 4]) -> Self {
        Self(*code)
    }

    /// MJPEG pixel format (Motion JPEG) - the only format the streamer emits.
    pub const MJPG: Self = Self::new(b"MJPG");
    /// JPEG pixel format, reported by some drivers instead of MJPG.
    pub const JPEG: Self = Self::new(b"JPEG");
}

impl From<v4l::FourCC> for FourCC {
    fn from(fourcc: v4l::FourCC) -> Self {
        Self(fourcc.repr)
    }
}

impl From<FourCC> for v4l::FourCC {
    fn from(fourcc: FourCC) -> Self {
        Self::new(&fourcc.0)
    }
}

/// Video format specification.
///
/// For compressed formats such as MJPG the stride and frame size are chosen
/// by the driver; a requested format carries zero for both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Format {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Pixel format.
    pub fourcc: FourCC,
    /// Bytes per line (stride), zero for compressed formats.
    pub stride: u32,
    /// Maximum frame size in bytes, zero until the driver reports one.
    pub size: u32,
}

impl Format {
    /// Create a new format request.
    #[must_use]
    pub const fn new(width: u32, height: u32, fourcc: FourCC) -> Self {
        Self {
            width,
            height,
            fourcc,
            stride: 0,
            size: 0,
        }
    }
}

/// Device capability flags.
#[derive(Debug, Clone, Default)]
pub struct DeviceCapabilities {
    /// Driver name.
    pub driver: String,
    /// Card/device name.
    pub card: String,
    /// Bus information.
    pub bus_info: String,
    /// Whether the device can capture video.
    pub can_capture: bool,
    /// Whether the device supports streaming.
    pub can_stream: bool,
}

/// Metadata for a captured frame. The frame bytes themselves live in the
/// caller-owned buffer passed to [`CaptureStream::next_frame`].
#[derive(Debug, Clone, Copy)]
pub struct FrameInfo {
    /// Frame sequence number assigned by the device.
    pub sequence: u32,
    /// Capture timestamp.
    pub timestamp: Duration,
    /// Bytes of encoded frame data placed in the caller's buffer.
    pub bytes_used: usize,
}

/// Error type for capture and streaming operations.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// Failed to open the camera device.
    #[error("failed to open camera device: {0}")]
    DeviceOpen(String),
    /// Device opened but could not be configured for capture.
    #[error("failed to configure camera: {0}")]
    DeviceConfig(String),
    /// Error while streaming frames from the device.
    #[error("capture stream error: {0}")]
    Capture(String),
    /// The output sink rejected a write or flush. Fatal; the capture loop
    /// halts without requesting further frames.
    #[error("failed to write frame to sink: {0}")]
    SinkWrite(#[source] std::io::Error),
    /// Signal handler registration failed at startup.
    #[error("failed to install signal handlers: {0}")]
    SignalSetup(#[source] std::io::Error),
}

/// Result type for capture operations.
pub type Result<T> = std::result::Result<T, CaptureError>;

/// Abstraction over camera device operations.
pub trait CameraDevice {
    /// The stream type returned by `create_stream`.
    type Stream<'a>: CaptureStream
    where
        Self: 'a;

    /// Get device capabilities.
    fn capabilities(&self) -> &DeviceCapabilities;

    /// Get the currently active format.
    fn format(&self) -> Result<Format>;

    /// Create a capture stream with the specified number of buffers.
    fn create_stream(&mut self, buffer_count: u32) -> Result<Self::Stream<'_>>;
}

/// Abstraction over capture stream operations.
pub trait CaptureStream {
    /// Capture the next encoded frame into `buf`, replacing its contents.
    ///
    /// The device may reuse backing storage between calls, so the caller
    /// must fully consume `buf` before requesting the next frame. Blocks
    /// until the device produces a frame.
    fn next_frame(&mut self, buf: &mut Vec<u8>) -> Result<FrameInfo>;
}

/// Monotonic time source used by the rate gate and the capture loop.
///
/// Production code uses [`MonotonicClock`]; tests substitute a virtual
/// clock so gate timing can be exercised without real sleeps.
pub trait Clock {
    /// Current monotonic clock reading.
    fn now(&self) -> Instant;

    /// Block the calling thread for approximately `duration`.
    fn sleep(&self, duration: Duration);
}

/// System clock backed by [`Instant::now`] and [`std::thread::sleep`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
