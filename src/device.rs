//! V4L2 device implementation using the v4l crate.

use v4l::buffer::Type;
use v4l::control::{Control, Value};
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream as V4lCaptureStream;
use v4l::video::capture::Parameters;
use v4l::video::Capture;
use v4l::Device;

use crate::config::{
    AwbMode, CaptureConfig, DrcLevel, ExposureMode, ImageEffect, MeteringMode, StereoMode,
};
use crate::traits::{
    CameraDevice, CaptureError, CaptureStream, DeviceCapabilities, Format, FourCC, FrameInfo,
    Result,
};
use std::time::Duration;

/// V4L2 control IDs used by the configuration mapping.
///
/// Values are fixed by the V4L2 ABI (`videodev2.h`).
mod cid {
    pub const BRIGHTNESS: u32 = 0x0098_0900;
    pub const CONTRAST: u32 = 0x0098_0901;
    pub const SATURATION: u32 = 0x0098_0902;
    pub const HFLIP: u32 = 0x0098_0914;
    pub const VFLIP: u32 = 0x0098_0915;
    pub const SHARPNESS: u32 = 0x0098_091b;
    pub const COLORFX: u32 = 0x0098_091f;
    pub const ROTATE: u32 = 0x0098_0922;
    pub const COLORFX_CBCR: u32 = 0x0098_092a;
    pub const EXPOSURE_AUTO: u32 = 0x009a_0901;
    pub const EXPOSURE_ABSOLUTE: u32 = 0x009a_0902;
    pub const AUTO_EXPOSURE_BIAS: u32 = 0x009a_0913;
    pub const AUTO_N_PRESET_WHITE_BALANCE: u32 = 0x009a_0914;
    pub const IMAGE_STABILIZATION: u32 = 0x009a_0916;
    pub const ISO_SENSITIVITY: u32 = 0x009a_0917;
    pub const EXPOSURE_METERING: u32 = 0x009a_0919;
    pub const SCENE_MODE: u32 = 0x009a_091a;
    pub const WIDE_DYNAMIC_RANGE: u32 = 0x009a_0921;
    pub const JPEG_COMPRESSION_QUALITY: u32 = 0x009d_0903;
}

/// `V4L2_EXPOSURE_MANUAL` from the exposure-auto menu.
const EXPOSURE_MANUAL: i64 = 1;
/// `V4L2_COLORFX_SET_CBCR` from the color-effect menu.
const COLORFX_SET_CBCR: i64 = 15;

/// V4L2 device implementation wrapping the v4l crate.
pub struct V4L2Device {
    device: Device,
    capabilities: DeviceCapabilities,
}

impl V4L2Device {
    /// Open a V4L2 device by index (e.g., 0 for /dev/video0).
    pub fn open(index: u32) -> Result<Self> {
        let device = Device::new(index as usize)
            .map_err(|err| CaptureError::DeviceOpen(err.to_string()))?;

        let caps = device
            .query_caps()
            .map_err(|err| CaptureError::DeviceOpen(err.to_string()))?;

        let capabilities = DeviceCapabilities {
            driver: caps.driver,
            card: caps.card,
            bus_info: caps.bus,
            can_capture: caps
                .capabilities
                .contains(v4l::capability::Flags::VIDEO_CAPTURE),
            can_stream: caps.capabilities.contains(v4l::capability::Flags::STREAMING),
        };

        Ok(Self {
            device,
            capabilities,
        })
    }

    /// Apply the capture configuration to the driver.
    ///
    /// The MJPG format and the frame interval are required: failure here is
    /// fatal. Imaging controls are best effort - drivers expose different
    /// control sets, so an unsupported control is logged and skipped rather
    /// than aborting capture.
    pub fn configure(&mut self, config: &CaptureConfig) -> Result<Format> {
        let requested = Format::new(config.width, config.height, FourCC::MJPG);
        let actual = self.set_format(&requested)?;
        if actual.width != config.width || actual.height != config.height {
            tracing::warn!(
                requested_width = config.width,
                requested_height = config.height,
                actual_width = actual.width,
                actual_height = actual.height,
                "driver adjusted capture resolution"
            );
        }

        // The gate enforces the emission rate; asking the driver for a
        // matching capture rate just avoids producing frames that will be
        // dropped anyway.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let fps = config.framerate.ceil() as u32;
        if let Err(err) = self.device.set_params(&Parameters::with_fps(fps.max(1))) {
            tracing::warn!(%err, "driver rejected frame interval, relying on the gate alone");
        }

        self.apply_controls(config);
        Ok(actual)
    }

    fn apply_controls(&self, config: &CaptureConfig) {
        self.try_set_control(
            "jpeg quality",
            cid::JPEG_COMPRESSION_QUALITY,
            Value::Integer(i64::from(config.quality)),
        );

        if config.rotation != 0 {
            self.try_set_control(
                "rotate",
                cid::ROTATE,
                Value::Integer(i64::from(config.rotation)),
            );
        }
        if config.hflip {
            self.try_set_control("hflip", cid::HFLIP, Value::Boolean(true));
        }
        if config.vflip {
            self.try_set_control("vflip", cid::VFLIP, Value::Boolean(true));
        }

        if let Some(brightness) = config.brightness {
            self.try_set_control(
                "brightness",
                cid::BRIGHTNESS,
                Value::Integer(i64::from(brightness)),
            );
        }
        if let Some(contrast) = config.contrast {
            self.try_set_control(
                "contrast",
                cid::CONTRAST,
                Value::Integer(i64::from(contrast)),
            );
        }
        if let Some(saturation) = config.saturation {
            self.try_set_control(
                "saturation",
                cid::SATURATION,
                Value::Integer(i64::from(saturation)),
            );
        }
        if let Some(sharpness) = config.sharpness {
            self.try_set_control(
                "sharpness",
                cid::SHARPNESS,
                Value::Integer(i64::from(sharpness)),
            );
        }

        if let Some(iso) = config.iso {
            self.try_set_control(
                "iso",
                cid::ISO_SENSITIVITY,
                Value::Integer(i64::from(iso)),
            );
        }
        if let Some(ev) = config.ev {
            self.try_set_control(
                "ev compensation",
                cid::AUTO_EXPOSURE_BIAS,
                Value::Integer(i64::from(ev)),
            );
        }
        if let Some(shutter_us) = config.shutter {
            // EXPOSURE_ABSOLUTE is in 100us units and requires manual mode.
            self.try_set_control(
                "manual exposure",
                cid::EXPOSURE_AUTO,
                Value::Integer(EXPOSURE_MANUAL),
            );
            self.try_set_control(
                "shutter",
                cid::EXPOSURE_ABSOLUTE,
                Value::Integer(i64::from(shutter_us / 100)),
            );
        }

        if let Some(scene) = scene_mode(config.exposure) {
            self.try_set_control("exposure mode", cid::SCENE_MODE, Value::Integer(scene));
        }
        self.try_set_control(
            "white balance",
            cid::AUTO_N_PRESET_WHITE_BALANCE,
            Value::Integer(awb_preset(config.awb)),
        );
        self.try_set_control(
            "metering",
            cid::EXPOSURE_METERING,
            Value::Integer(metering_mode(config.metering)),
        );
        if config.vstab {
            self.try_set_control(
                "video stabilization",
                cid::IMAGE_STABILIZATION,
                Value::Boolean(true),
            );
        }
        if config.drc != DrcLevel::Off {
            self.try_set_control(
                "dynamic range compression",
                cid::WIDE_DYNAMIC_RANGE,
                Value::Boolean(true),
            );
        }

        if let Some(colfx) = config.colfx {
            self.try_set_control(
                "color effect",
                cid::COLORFX,
                Value::Integer(COLORFX_SET_CBCR),
            );
            self.try_set_control(
                "color effect cbcr",
                cid::COLORFX_CBCR,
                Value::Integer((i64::from(colfx.u) << 8) | i64::from(colfx.v)),
            );
        } else if let Some(colorfx) = color_effect(config.imxfx) {
            self.try_set_control("image effect", cid::COLORFX, Value::Integer(colorfx));
        } else if config.imxfx != ImageEffect::None {
            tracing::warn!(effect = ?config.imxfx, "image effect has no V4L2 mapping, ignored");
        }

        if config.zoom.is_some() {
            tracing::warn!("zoom requires driver selection support, not applied");
        }
        if config.stereo != StereoMode::None {
            tracing::warn!(mode = ?config.stereo, "stereo mode not supported by this driver, ignored");
        }
    }

    fn try_set_control(&self, name: &str, id: u32, value: Value) {
        if let Err(err) = self.device.set_control(Control { id, value }) {
            tracing::warn!(control = name, %err, "driver rejected control, continuing");
        }
    }

    fn set_format(&mut self, format: &Format) -> Result<Format> {
        let mut fmt = self
            .device
            .format()
            .map_err(|err| CaptureError::DeviceConfig(err.to_string()))?;

        fmt.width = format.width;
        fmt.height = format.height;
        fmt.fourcc = format.fourcc.into();

        let fmt = self
            .device
            .set_format(&fmt)
            .map_err(|err| CaptureError::DeviceConfig(err.to_string()))?;

        Ok(Format {
            width: fmt.width,
            height: fmt.height,
            fourcc: FourCC::from(fmt.fourcc),
            stride: fmt.stride,
            size: fmt.size,
        })
    }
}

/// Map an exposure mode onto the `V4L2_CID_SCENE_MODE` menu where one
/// exists. `None` leaves the driver default in place.
fn scene_mode(mode: ExposureMode) -> Option<i64> {
    match mode {
        ExposureMode::Night | ExposureMode::Nightpreview => Some(8),
        ExposureMode::Backlight => Some(1),
        ExposureMode::Spotlight => Some(10),
        ExposureMode::Sports | ExposureMode::Antishake => Some(11),
        ExposureMode::Snow | ExposureMode::Beach => Some(2),
        ExposureMode::Fireworks => Some(6),
        ExposureMode::Off
        | ExposureMode::Auto
        | ExposureMode::Verylong
        | ExposureMode::Fixedfps => None,
    }
}

/// Map an AWB mode onto the `V4L2_CID_AUTO_N_PRESET_WHITE_BALANCE` menu.
fn awb_preset(mode: AwbMode) -> i64 {
    match mode {
        AwbMode::Off => 0,
        AwbMode::Auto => 1,
        AwbMode::Tungsten | AwbMode::Incandescent => 2,
        AwbMode::Fluorescent => 3,
        AwbMode::Horizon => 5,
        AwbMode::Sunlight => 6,
        AwbMode::Flash => 7,
        AwbMode::Cloudy => 8,
        AwbMode::Shade => 9,
    }
}

/// Map a metering mode onto the `V4L2_CID_EXPOSURE_METERING` menu.
fn metering_mode(mode: MeteringMode) -> i64 {
    match mode {
        MeteringMode::Average => 0,
        MeteringMode::Backlit => 1,
        MeteringMode::Spot => 2,
        MeteringMode::Matrix => 3,
    }
}

/// Map an image effect onto the `V4L2_CID_COLORFX` menu where one exists.
fn color_effect(effect: ImageEffect) -> Option<i64> {
    match effect {
        ImageEffect::None => Some(0),
        ImageEffect::Negative => Some(3),
        ImageEffect::Solarize => Some(13),
        ImageEffect::Sketch => Some(5),
        ImageEffect::Emboss => Some(4),
        _ => None,
    }
}

impl CameraDevice for V4L2Device {
    type Stream<'a> = V4L2Stream<'a>;

    fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    fn format(&self) -> Result<Format> {
        let fmt = self
            .device
            .format()
            .map_err(|err| CaptureError::DeviceConfig(err.to_string()))?;

        Ok(Format {
            width: fmt.width,
            height: fmt.height,
            fourcc: FourCC::from(fmt.fourcc),
            stride: fmt.stride,
            size: fmt.size,
        })
    }

    fn create_stream(&mut self, buffer_count: u32) -> Result<Self::Stream<'_>> {
        let stream = Stream::with_buffers(&self.device, Type::VideoCapture, buffer_count)
            .map_err(|err| CaptureError::DeviceConfig(err.to_string()))?;

        Ok(V4L2Stream { stream })
    }
}

/// V4L2 capture stream wrapping mmap-based streaming.
pub struct V4L2Stream<'a> {
    stream: Stream<'a>,
}

impl CaptureStream for V4L2Stream<'_> {
    fn next_frame(&mut self, buf: &mut Vec<u8>) -> Result<FrameInfo> {
        let (data, meta) = self
            .stream
            .next()
            .map_err(|err| CaptureError::Capture(err.to_string()))?;

        // Compressed frames fill only bytesused of the mapped buffer.
        let bytes_used = (meta.bytesused as usize).min(data.len());
        buf.clear();
        buf.extend_from_slice(data.get(..bytes_used).unwrap_or(data));

        // Safe conversions: V4L2 timestamps are always non-negative in practice
        #[allow(clippy::cast_sign_loss)]
        let secs = meta.timestamp.sec.max(0) as u64;
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let nanos = (meta.timestamp.usec.max(0) as u32).saturating_mul(1000);

        Ok(FrameInfo {
            sequence: meta.sequence,
            timestamp: Duration::new(secs, nanos),
            bytes_used,
        })
    }
}
