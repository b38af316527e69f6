//! Pi-mjpeg-stream binary: camera to stdout JPEG streaming.

use std::io::{self, Write};

use clap::Parser;

use pi_mjpeg_stream::{
    run_capture_loop, CameraDevice, CaptureConfig, FrameRateGate, FrameSink, MonotonicClock,
    Result, RunState, V4L2Device,
};

fn main() {
    let config = CaptureConfig::parse();
    init_logging(config.verbose);

    if let Err(err) = run(&config) {
        tracing::error!(%err, "fatal error");
        std::process::exit(1);
    }
}

/// Route logs to stderr; stdout carries the frame stream.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(config: &CaptureConfig) -> Result<()> {
    let run_state = RunState::new();
    run_state.register_signal_handlers()?;

    let mut device = V4L2Device::open(config.device)?;
    tracing::info!(
        card = %device.capabilities().card,
        driver = %device.capabilities().driver,
        "camera opened"
    );

    let format = device.configure(config)?;
    tracing::info!(
        width = format.width,
        height = format.height,
        framerate = config.framerate,
        "capture configured"
    );

    let mut gate = FrameRateGate::new(config.framerate);
    let mut stream = device.create_stream(config.mode.buffer_count())?;

    let stdout = io::stdout();
    let mut sink = FrameSink::new(stdout.lock());

    let stats = run_capture_loop(
        &mut stream,
        &mut gate,
        &mut sink,
        &run_state,
        &MonotonicClock,
    )?;

    // The flush paired with the last frame already happened; this only
    // settles stdio before exit.
    let _ = io::stdout().flush();
    tracing::info!(
        forwarded = stats.forwarded,
        dropped = stats.dropped,
        "shutdown complete"
    );
    Ok(())
}
