use thiserror::Error;

#[derive(Error, Debug)]
pub enum StreamerError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Failed to open camera {camera} ({device}): {source}")]
    CameraOpen {
        camera: usize,
        device: String,
        #[source]
        source: CameraError,
    },

    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),
}

/// Failures raised by a camera source
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Failed to open device {device}: {details}")]
    DeviceOpen { device: String, details: String },

    #[error("Pipeline error: {details}")]
    Pipeline { details: String },

    #[error("No frame available within {timeout_ms}ms")]
    ReadTimeout { timeout_ms: u64 },

    #[error("Frame decode failed: {details}")]
    Decode { details: String },

    #[error("Camera support not available in this build")]
    NotAvailable,
}

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Failed to bind {address}: {source}")]
    BindFailed {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {details}")]
    Server { details: String },

    #[error("JPEG encoding failed: {details}")]
    Encode { details: String },
}

#[derive(Error, Debug)]
pub enum AnnotationError {
    #[error("Annotator failed: {details}")]
    Failed { details: String },

    #[error("Annotator returned {actual:?} for a {expected:?} frame")]
    Malformed {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("Annotator panicked")]
    Panicked,
}

impl StreamerError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StreamerError>;
