//! Pi-MJPEG-Stream: bounded-rate JPEG frame streaming from a V4L2 camera
//!
//! This library captures JPEG-encoded frames from a camera, filters them
//! through a wall-clock rate gate, and writes the accepted frames to an
//! output byte sink as an undelimited concatenation. Trait-based seams over
//! the device and the clock enable both production use with real hardware
//! and deterministic testing with mock devices.

pub mod capture;
pub mod config;
pub mod device;
pub mod gate;
pub mod lifecycle;
pub mod mock;
pub mod sink;
pub mod traits;

pub use capture::{run_capture_loop, LoopStats};
pub use config::CaptureConfig;
pub use device::V4L2Device;
pub use gate::{FrameRateGate, GateDecision};
pub use lifecycle::RunState;
pub use sink::FrameSink;
pub use traits::{
    CameraDevice, CaptureError, CaptureStream, Clock, DeviceCapabilities, Format, FourCC,
    FrameInfo, MonotonicClock, Result,
};
