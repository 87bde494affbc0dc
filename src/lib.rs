pub mod annotate;
pub mod app;
pub mod camera;
pub mod config;
pub mod error;
pub mod frame;
pub mod overlay;
pub mod rate_meter;
pub mod streaming;

pub use annotate::{annotate_or_passthrough, FrameAnnotator, NoopAnnotator};
pub use app::{build_server, open_cameras, run, ShutdownReason, SourceOpener};
pub use camera::{open_source, DeviceId, FrameSource, SourceSettings, TestPatternSource};
pub use config::StreamerConfig;
pub use error::{AnnotationError, CameraError, Result, StreamError, StreamerError};
pub use frame::{encode_jpeg, Frame};
pub use overlay::RateOverlay;
pub use rate_meter::RateMeter;
pub use streaming::{StatsSnapshot, StreamServer, StreamServerBuilder};
