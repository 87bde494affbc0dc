use super::startup::{build_server, SourceOpener};
use crate::annotate::FrameAnnotator;
use crate::config::StreamerConfig;
use crate::error::Result;
use std::sync::Arc;
use tokio::signal;
use tracing::info;

/// Why the process is exiting
#[derive(Debug, Clone, PartialEq)]
pub enum ShutdownReason {
    Signal(String),
    ServerStopped,
}

/// Open the cameras, bind the listener and serve until a shutdown signal.
///
/// Streams are infinite, so shutdown does not wait for open connections.
pub async fn run(
    config: StreamerConfig,
    annotator: Arc<dyn FrameAnnotator>,
    mut opener: impl SourceOpener,
) -> Result<ShutdownReason> {
    let server = build_server(&config, annotator, &mut opener)?;
    let listener = server.bind().await?;

    info!(
        "Dualcam streaming {} camera(s) on http://{}/",
        server.cameras().len(),
        config.stream.bind_address()
    );

    tokio::select! {
        result = server.serve(listener) => {
            result?;
            Ok(ShutdownReason::ServerStopped)
        }
        reason = shutdown_signal() => {
            info!("Shutdown initiated: {:?}", reason);
            Ok(reason)
        }
    }
}

/// Resolve on SIGINT, or SIGTERM on Unix
async fn shutdown_signal() -> ShutdownReason {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => ShutdownReason::Signal("SIGINT".to_string()),
            Err(e) => {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending().await
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                ShutdownReason::Signal("SIGTERM".to_string())
            }
            Err(e) => {
                tracing::error!("Failed to register SIGTERM handler: {}", e);
                std::future::pending().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<ShutdownReason>();

    tokio::select! {
        reason = ctrl_c => reason,
        reason = terminate => reason,
    }
}
