use crate::{
    annotate::{FrameAnnotator, NoopAnnotator},
    camera::FrameSource,
    config::StreamConfig,
    error::{Result, StreamError, StreamerError},
    overlay::RateOverlay,
    rate_meter::RateMeter,
};
use axum::{extract::State, routing::get, Router};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use super::handlers::{index_handler, mjpeg_stream_handler, stats_handler};

/// One physical camera and its rate meter, shared by all of its sessions
pub struct CameraChannel {
    pub id: String,
    pub source: Arc<dyn FrameSource>,
    pub meter: Arc<RateMeter>,
    pub(crate) viewers: AtomicUsize,
}

impl CameraChannel {
    pub fn new(id: impl Into<String>, source: Arc<dyn FrameSource>, fps_window: usize) -> Self {
        Self {
            id: id.into(),
            source,
            meter: Arc::new(RateMeter::new(fps_window)),
            viewers: AtomicUsize::new(0),
        }
    }

    /// Number of clients currently streaming this camera
    pub fn active_viewers(&self) -> usize {
        self.viewers.load(Ordering::Relaxed)
    }
}

/// Shared state for the Axum server
#[derive(Clone)]
pub struct ServerState {
    pub(crate) cameras: Arc<Vec<Arc<CameraChannel>>>,
    pub(crate) annotator: Arc<dyn FrameAnnotator>,
    pub(crate) overlay: Arc<RateOverlay>,
    pub(crate) jpeg_quality: u8,
}

/// MJPEG streaming server: one multipart route per camera, `/stats` and `/`
pub struct StreamServer {
    pub(crate) config: StreamConfig,
    pub(crate) state: ServerState,
}

impl StreamServer {
    /// Cameras served by this server, in route order
    pub fn cameras(&self) -> &[Arc<CameraChannel>] {
        &self.state.cameras
    }

    /// Build the router. Camera routes are registered per configured camera.
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .route("/", get(index_handler))
            .route("/stats", get(stats_handler));

        for (index, camera) in self.state.cameras.iter().enumerate() {
            let path = format!("/{}", camera.id);
            router = router.route(
                &path,
                get(move |State(state): State<ServerState>| async move {
                    mjpeg_stream_handler(state, index)
                }),
            );
        }

        router.with_state(self.state.clone())
    }

    /// Bind the configured address
    pub async fn bind(&self) -> Result<TcpListener> {
        let addr = self.config.bind_address();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| StreamError::BindFailed {
                address: addr.clone(),
                source: e,
            })?;

        info!("MJPEG server listening on {}", addr);
        Ok(listener)
    }

    /// Serve on an already bound listener until the server fails
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let routes: Vec<String> = self
            .state
            .cameras
            .iter()
            .map(|camera| format!("/{}", camera.id))
            .collect();
        info!("Serving camera routes {:?}, /stats and /", routes);

        axum::serve(listener, self.router())
            .await
            .map_err(|e| StreamError::Server {
                details: format!("Server error: {}", e),
            })?;

        Ok(())
    }

    /// Bind and serve
    pub async fn start(&self) -> Result<()> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }
}

/// Stream server builder for configuration
pub struct StreamServerBuilder {
    config: Option<StreamConfig>,
    cameras: Vec<Arc<CameraChannel>>,
    annotator: Option<Arc<dyn FrameAnnotator>>,
    overlay: Option<Arc<RateOverlay>>,
}

impl StreamServerBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            cameras: Vec::new(),
            annotator: None,
            overlay: None,
        }
    }

    /// Set the stream configuration
    pub fn config(mut self, config: StreamConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Add a camera; routes follow insertion order
    pub fn camera(mut self, camera: CameraChannel) -> Self {
        self.cameras.push(Arc::new(camera));
        self
    }

    /// Set the frame annotator (defaults to passthrough)
    pub fn annotator(mut self, annotator: Arc<dyn FrameAnnotator>) -> Self {
        self.annotator = Some(annotator);
        self
    }

    /// Set the FPS overlay renderer (defaults to disabled)
    pub fn overlay(mut self, overlay: RateOverlay) -> Self {
        self.overlay = Some(Arc::new(overlay));
        self
    }

    /// Build the stream server
    pub fn build(self) -> Result<StreamServer> {
        let config = self.config.ok_or_else(|| {
            StreamerError::Stream(StreamError::Server {
                details: "Stream configuration is required".to_string(),
            })
        })?;

        if self.cameras.is_empty() {
            return Err(StreamerError::Stream(StreamError::Server {
                details: "At least one camera is required".to_string(),
            }));
        }

        let state = ServerState {
            cameras: Arc::new(self.cameras),
            annotator: self.annotator.unwrap_or_else(|| Arc::new(NoopAnnotator)),
            overlay: self
                .overlay
                .unwrap_or_else(|| Arc::new(RateOverlay::disabled())),
            jpeg_quality: config.jpeg_quality,
        };

        Ok(StreamServer { config, state })
    }
}

impl Default for StreamServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
