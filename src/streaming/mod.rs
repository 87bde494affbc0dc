mod encoder;
mod handlers;
mod server;
mod session;
mod stats;
#[cfg(test)]
mod tests;

pub use encoder::{multipart_chunk, FrameSkip, StreamEncoder, BOUNDARY, STREAM_CONTENT_TYPE};
pub use server::{CameraChannel, ServerState, StreamServer, StreamServerBuilder};
pub use session::StreamSession;
pub use stats::{round_rate, StatsSnapshot};
