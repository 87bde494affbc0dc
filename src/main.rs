use anyhow::Result;
use clap::Parser;
use dualcam::config::{
    CameraConfig, CaptureConfig, OverlayConfig, StreamConfig, StreamerConfig,
};
use dualcam::{app, camera, NoopAnnotator};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "dualcam")]
#[command(about = "Stream two cameras over HTTP as MJPEG with a live FPS overlay")]
#[command(version)]
#[command(long_about = "Serves each camera as an infinite multipart/x-mixed-replace \
JPEG stream (/cam0, /cam1), a JSON frame-rate snapshot (/stats) and a viewer page (/). \
Camera devices may be given as an index (0 for /dev/video0), a device path, or \
`pattern[:fps]` for a synthetic source that needs no hardware.")]
struct Args {
    /// Camera 0 device identifier
    #[arg(long, default_value_t = dualcam::config::default_cam0_device())]
    cam0: String,

    /// Camera 1 device identifier
    #[arg(long, default_value_t = dualcam::config::default_cam1_device())]
    cam1: String,

    /// Frame width shared by both cameras
    #[arg(long, default_value_t = 640)]
    width: u32,

    /// Frame height shared by both cameras
    #[arg(long, default_value_t = 360)]
    height: u32,

    /// Address to bind the HTTP server to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// JPEG quality for streamed frames (1-100)
    #[arg(long, default_value_t = 95)]
    jpeg_quality: u8,

    /// Number of frame intervals averaged into the FPS value
    #[arg(long, default_value_t = 30)]
    fps_window: usize,

    /// Upper bound on a single camera read, in milliseconds
    #[arg(long, default_value_t = 1000)]
    read_timeout_ms: u64,

    /// TrueType font used for the FPS overlay
    #[arg(long, default_value = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf")]
    font_path: String,

    /// Font size for the FPS overlay
    #[arg(long, default_value_t = 24.0)]
    font_size: f32,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Validate configuration and exit
    #[arg(long, help = "Validate the arguments and exit without opening cameras")]
    validate_config: bool,

    /// Print the effective configuration and exit
    #[arg(long, help = "Print the effective configuration as JSON and exit")]
    print_config: bool,
}

impl Args {
    fn to_config(&self) -> StreamerConfig {
        StreamerConfig {
            cameras: vec![
                CameraConfig {
                    id: "cam0".to_string(),
                    device: self.cam0.clone(),
                },
                CameraConfig {
                    id: "cam1".to_string(),
                    device: self.cam1.clone(),
                },
            ],
            capture: CaptureConfig {
                resolution: (self.width, self.height),
                read_timeout_ms: self.read_timeout_ms,
                fps_window: self.fps_window,
            },
            overlay: OverlayConfig {
                font_path: self.font_path.clone(),
                font_size: self.font_size,
            },
            stream: StreamConfig {
                ip: self.host.clone(),
                port: self.port,
                jpeg_quality: self.jpeg_quality,
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = args.to_config();

    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    init_logging(&args)?;

    info!("Starting dualcam v{}", env!("CARGO_PKG_VERSION"));

    if args.validate_config {
        match config.validate() {
            Ok(()) => {
                info!("Configuration validation successful");
                println!("✓ Configuration is valid");
                return Ok(());
            }
            Err(e) => {
                error!("Configuration validation failed: {}", e);
                eprintln!("✗ Configuration validation failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    let reason = app::run(config, Arc::new(NoopAnnotator), camera::open_source)
        .await
        .map_err(|e| {
            error!("Dualcam failed: {}", e);
            e
        })?;

    info!("Dualcam stopped: {:?}", reason);
    Ok(())
}

fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("dualcam={}", log_level)));

    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_args_match_default_config() {
        let args = Args::parse_from(["dualcam"]);
        let config = args.to_config();
        let defaults = StreamerConfig::default();

        assert_eq!(config.cameras[0].device, defaults.cameras[0].device);
        assert_eq!(config.cameras[1].device, defaults.cameras[1].device);
        assert_eq!(config.capture.resolution, (640, 360));
        assert_eq!(config.stream.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.stream.jpeg_quality, 95);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_args_override_devices_and_bind() {
        let args = Args::parse_from([
            "dualcam", "--cam0", "/dev/video4", "--cam1", "pattern:15", "--width", "320",
            "--height", "240", "--host", "127.0.0.1", "--port", "9000",
        ]);
        let config = args.to_config();

        assert_eq!(config.cameras[0].device, "/dev/video4");
        assert_eq!(config.cameras[1].device, "pattern:15");
        assert_eq!(config.capture.resolution, (320, 240));
        assert_eq!(config.stream.bind_address(), "127.0.0.1:9000");
    }
}
