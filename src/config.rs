//! Capture configuration: CLI surface and validation.
//!
//! All range checks run inside clap value parsers, so invalid input is
//! rejected with a usage line on stderr before any device is touched. Once
//! parsed, the configuration is immutable.

use clap::{Parser, ValueEnum};

/// Upper bound on the target framerate, frames per second.
const MAX_FRAMERATE: f64 = 90.0;

/// Validated, immutable capture parameters.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "pi-mjpeg-stream",
    version,
    about = "Continuously captures JPEGs from the camera and writes them to standard output"
)]
pub struct CaptureConfig {
    /// Capture width, in pixels.
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(64..=3280))]
    pub width: u32,

    /// Capture height, in pixels.
    #[arg(short = 'H', long, value_parser = clap::value_parser!(u32).range(64..=2464))]
    pub height: u32,

    /// Target number of emitted frames per second.
    #[arg(short = 'r', long, value_parser = parse_framerate)]
    pub framerate: f64,

    /// JPEG quality factor.
    #[arg(short, long, default_value_t = 85, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: u8,

    /// V4L2 device index (0 for /dev/video0).
    #[arg(short, long, default_value_t = 0)]
    pub device: u32,

    /// Rotate the image by 0, 90, 180 or 270 degrees.
    #[arg(long, default_value = "0", value_parser = parse_rotation)]
    pub rotation: u16,

    /// Flip the image horizontally.
    #[arg(long)]
    pub hflip: bool,

    /// Flip the image vertically.
    #[arg(long)]
    pub vflip: bool,

    /// Zoom rectangle as x,y,width,height with each component in [0, 1].
    #[arg(long, value_parser = parse_zoom)]
    pub zoom: Option<ZoomRect>,

    /// Image brightness (0 to 100).
    #[arg(long, value_parser = clap::value_parser!(i32).range(0..=100))]
    pub brightness: Option<i32>,

    /// Image contrast (-100 to 100).
    #[arg(long, value_parser = clap::value_parser!(i32).range(-100..=100), allow_negative_numbers = true)]
    pub contrast: Option<i32>,

    /// Image saturation (-100 to 100).
    #[arg(long, value_parser = clap::value_parser!(i32).range(-100..=100), allow_negative_numbers = true)]
    pub saturation: Option<i32>,

    /// Image sharpness (-100 to 100).
    #[arg(long, value_parser = clap::value_parser!(i32).range(-100..=100), allow_negative_numbers = true)]
    pub sharpness: Option<i32>,

    /// Capture ISO (100 to 800).
    #[arg(long, value_parser = clap::value_parser!(u32).range(100..=800))]
    pub iso: Option<u32>,

    /// Exposure compensation (-25 to 25).
    #[arg(long, value_parser = clap::value_parser!(i32).range(-25..=25), allow_negative_numbers = true)]
    pub ev: Option<i32>,

    /// Shutter speed, in microseconds (0 to 6000000).
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=6_000_000))]
    pub shutter: Option<u32>,

    /// Exposure mode.
    #[arg(long, value_enum, default_value = "auto")]
    pub exposure: ExposureMode,

    /// Automatic white balance mode.
    #[arg(long, value_enum, default_value = "auto")]
    pub awb: AwbMode,

    /// Metering mode.
    #[arg(long, value_enum, default_value = "average")]
    pub metering: MeteringMode,

    /// Dynamic range compression level.
    #[arg(long, value_enum, default_value = "off")]
    pub drc: DrcLevel,

    /// Turn on video stabilization.
    #[arg(long)]
    pub vstab: bool,

    /// Image effect.
    #[arg(long, value_enum, default_value = "none")]
    pub imxfx: ImageEffect,

    /// Color effect as U:V, each component 0 to 255 (e.g. 128:128).
    #[arg(long, value_parser = parse_colfx)]
    pub colfx: Option<ColorEffect>,

    /// Capture mode: repeated stills or the video port.
    #[arg(long, value_enum, default_value = "video")]
    pub mode: CaptureMode,

    /// Stereoscopic capture mode.
    #[arg(long, value_enum, default_value = "none")]
    pub stereo: StereoMode,

    /// Increase log verbosity.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Normalized zoom rectangle; all components in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomRect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Rectangle width.
    pub width: f64,
    /// Rectangle height.
    pub height: f64,
}

/// Fixed U/V chroma pair applied as a color effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorEffect {
    /// Blue-difference chroma value.
    pub u: u8,
    /// Red-difference chroma value.
    pub v: u8,
}

/// Exposure mode selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[allow(missing_docs)]
pub enum ExposureMode {
    Off,
    Auto,
    Night,
    Nightpreview,
    Backlight,
    Spotlight,
    Sports,
    Snow,
    Beach,
    Verylong,
    Fixedfps,
    Antishake,
    Fireworks,
}

/// Automatic white balance mode selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[allow(missing_docs)]
pub enum AwbMode {
    Off,
    Auto,
    Sunlight,
    Cloudy,
    Shade,
    Tungsten,
    Fluorescent,
    Incandescent,
    Flash,
    Horizon,
}

/// Metering mode selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[allow(missing_docs)]
pub enum MeteringMode {
    Average,
    Spot,
    Backlit,
    Matrix,
}

/// Dynamic range compression level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[allow(missing_docs)]
pub enum DrcLevel {
    Off,
    Low,
    Medium,
    High,
}

/// Image effect selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[allow(missing_docs)]
pub enum ImageEffect {
    None,
    Negative,
    Solarize,
    Sketch,
    Denoise,
    Emboss,
    Oilpaint,
    Hatch,
    Gpen,
    Pastel,
    Watercolor,
    Film,
    Blur,
    Saturation,
    Colorswap,
    Washedout,
    Posterise,
    Colorpoint,
    Colorbalance,
    Cartoon,
    Deinterlace1,
    Deinterlace2,
}

/// Whether frames come from repeated still captures or the video port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CaptureMode {
    /// Repeated still captures; one buffer in flight.
    Stills,
    /// Continuous video-port capture.
    Video,
}

impl CaptureMode {
    /// Number of driver buffers to queue for this mode.
    #[must_use]
    pub const fn buffer_count(self) -> u32 {
        match self {
            Self::Stills => 1,
            Self::Video => 4,
        }
    }
}

/// Stereoscopic capture arrangement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[allow(missing_docs)]
pub enum StereoMode {
    None,
    SideBySide,
    TopBottom,
}

fn parse_framerate(s: &str) -> Result<f64, String> {
    let framerate: f64 = s
        .parse()
        .map_err(|err| format!("invalid framerate: {err}"))?;
    if !framerate.is_finite() || framerate <= 0.0 {
        return Err("framerate must be positive".to_owned());
    }
    if framerate > MAX_FRAMERATE {
        return Err(format!("framerate must be at most {MAX_FRAMERATE}"));
    }
    Ok(framerate)
}

fn parse_rotation(s: &str) -> Result<u16, String> {
    match s {
        "0" => Ok(0),
        "90" => Ok(90),
        "180" => Ok(180),
        "270" => Ok(270),
        _ => Err("rotation must be one of 0, 90, 180, 270".to_owned()),
    }
}

fn parse_zoom(s: &str) -> Result<ZoomRect, String> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != 4 {
        return Err("zoom must be four comma-separated values".to_owned());
    }

    let mut components = [0.0f64; 4];
    for (slot, part) in components.iter_mut().zip(&parts) {
        let value: f64 = part
            .trim()
            .parse()
            .map_err(|err| format!("invalid zoom component {part:?}: {err}"))?;
        if !(0.0..=1.0).contains(&value) {
            return Err(format!("zoom component {value} out of range [0, 1]"));
        }
        *slot = value;
    }

    let [x, y, width, height] = components;
    Ok(ZoomRect {
        x,
        y,
        width,
        height,
    })
}

fn parse_colfx(s: &str) -> Result<ColorEffect, String> {
    let (u, v) = s
        .split_once(':')
        .ok_or_else(|| "color effect must be U:V (e.g. 128:128)".to_owned())?;
    let u: u8 = u
        .trim()
        .parse()
        .map_err(|err| format!("invalid U component: {err}"))?;
    let v: u8 = v
        .trim()
        .parse()
        .map_err(|err| format!("invalid V component: {err}"))?;
    Ok(ColorEffect { u, v })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CaptureConfig, clap::Error> {
        let mut argv = vec!["pi-mjpeg-stream"];
        argv.extend_from_slice(args);
        CaptureConfig::try_parse_from(argv)
    }

    fn parse_minimal_with(extra: &[&str]) -> Result<CaptureConfig, clap::Error> {
        let mut args = vec!["-w", "1280", "-H", "720", "-r", "15"];
        args.extend_from_slice(extra);
        parse(&args)
    }

    #[test]
    fn test_minimal_arguments_accepted() {
        let config = parse_minimal_with(&[]).expect("minimal config should parse");
        assert_eq!(config.width, 1280);
        assert_eq!(config.height, 720);
        assert!((config.framerate - 15.0).abs() < f64::EPSILON);
        assert_eq!(config.quality, 85);
        assert_eq!(config.mode, CaptureMode::Video);
    }

    #[test]
    fn test_required_arguments_enforced() {
        assert!(parse(&["-w", "1280", "-H", "720"]).is_err());
        assert!(parse(&[]).is_err());
    }

    #[test]
    fn test_width_and_height_bounds() {
        assert!(parse_minimal_with(&[]).is_ok());
        assert!(parse(&["-w", "63", "-H", "720", "-r", "15"]).is_err());
        assert!(parse(&["-w", "1280", "-H", "2465", "-r", "15"]).is_err());
    }

    #[test]
    fn test_framerate_must_be_positive_and_bounded() {
        assert!(parse(&["-w", "640", "-H", "480", "-r", "0"]).is_err());
        assert!(parse(&["-w", "640", "-H", "480", "-r", "-5"]).is_err());
        assert!(parse(&["-w", "640", "-H", "480", "-r", "90.5"]).is_err());
        assert!(parse(&["-w", "640", "-H", "480", "-r", "0.5"]).is_ok());
    }

    #[test]
    fn test_quality_zero_rejected() {
        assert!(parse_minimal_with(&["-q", "0"]).is_err());
        assert!(parse_minimal_with(&["-q", "1"]).is_ok());
        assert!(parse_minimal_with(&["-q", "100"]).is_ok());
        assert!(parse_minimal_with(&["-q", "101"]).is_err());
    }

    #[test]
    fn test_zoom_components_within_unit_range() {
        let config = parse_minimal_with(&["--zoom", "0.1,0.2,0.3,0.9"])
            .expect("in-range zoom should parse");
        let zoom = config.zoom.expect("zoom should be set");
        assert!((zoom.x - 0.1).abs() < f64::EPSILON);
        assert!((zoom.height - 0.9).abs() < f64::EPSILON);

        assert!(parse_minimal_with(&["--zoom", "1.5,0,0,1"]).is_err());
        assert!(parse_minimal_with(&["--zoom", "0.1,0.2,0.3"]).is_err());
        assert!(parse_minimal_with(&["--zoom", "a,b,c,d"]).is_err());
    }

    #[test]
    fn test_color_effect_pair() {
        let config =
            parse_minimal_with(&["--colfx", "128:128"]).expect("colfx should parse");
        assert_eq!(config.colfx, Some(ColorEffect { u: 128, v: 128 }));

        assert!(parse_minimal_with(&["--colfx", "300:0"]).is_err());
        assert!(parse_minimal_with(&["--colfx", "128"]).is_err());
    }

    #[test]
    fn test_rotation_choices() {
        assert_eq!(
            parse_minimal_with(&["--rotation", "270"])
                .expect("rotation should parse")
                .rotation,
            270
        );
        assert!(parse_minimal_with(&["--rotation", "45"]).is_err());
    }

    #[test]
    fn test_imaging_parameter_ranges() {
        assert!(parse_minimal_with(&["--brightness", "100"]).is_ok());
        assert!(parse_minimal_with(&["--brightness", "101"]).is_err());
        assert!(parse_minimal_with(&["--contrast", "-100"]).is_ok());
        assert!(parse_minimal_with(&["--contrast", "-101"]).is_err());
        assert!(parse_minimal_with(&["--iso", "99"]).is_err());
        assert!(parse_minimal_with(&["--ev", "-25"]).is_ok());
        assert!(parse_minimal_with(&["--ev", "26"]).is_err());
        assert!(parse_minimal_with(&["--shutter", "6000000"]).is_ok());
        assert!(parse_minimal_with(&["--shutter", "6000001"]).is_err());
    }

    #[test]
    fn test_enumerated_modes() {
        let config = parse_minimal_with(&[
            "--exposure",
            "night",
            "--awb",
            "cloudy",
            "--metering",
            "spot",
            "--drc",
            "high",
            "--imxfx",
            "negative",
            "--mode",
            "stills",
            "--stereo",
            "side-by-side",
        ])
        .expect("enumerated modes should parse");

        assert_eq!(config.exposure, ExposureMode::Night);
        assert_eq!(config.awb, AwbMode::Cloudy);
        assert_eq!(config.metering, MeteringMode::Spot);
        assert_eq!(config.drc, DrcLevel::High);
        assert_eq!(config.imxfx, ImageEffect::Negative);
        assert_eq!(config.mode, CaptureMode::Stills);
        assert_eq!(config.stereo, StereoMode::SideBySide);

        assert!(parse_minimal_with(&["--exposure", "dim"]).is_err());
    }

    #[test]
    fn test_vstab_flag() {
        assert!(!parse_minimal_with(&[]).expect("default should parse").vstab);
        assert!(
            parse_minimal_with(&["--vstab"])
                .expect("vstab flag should parse")
                .vstab
        );
    }

    #[test]
    fn test_deinterlace_effects_accepted() {
        assert_eq!(
            parse_minimal_with(&["--imxfx", "deinterlace1"])
                .expect("deinterlace1 should parse")
                .imxfx,
            ImageEffect::Deinterlace1
        );
        assert_eq!(
            parse_minimal_with(&["--imxfx", "deinterlace2"])
                .expect("deinterlace2 should parse")
                .imxfx,
            ImageEffect::Deinterlace2
        );
    }

    #[test]
    fn test_buffer_count_per_mode() {
        assert_eq!(CaptureMode::Stills.buffer_count(), 1);
        assert_eq!(CaptureMode::Video.buffer_count(), 4);
    }
}
