use super::*;
use crate::annotate::FrameAnnotator;
use crate::camera::{FrameSource, TestPatternSource};
use crate::config::StreamConfig;
use crate::error::{AnnotationError, CameraError};
use crate::frame::Frame;
use crate::overlay::RateOverlay;
use crate::rate_meter::RateMeter;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use futures::StreamExt;
use image::{Rgb, RgbImage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::timeout;
use tower::ServiceExt;

const PART_HEADER: &[u8] = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n";

/// Fails the first `fail_first` reads, then succeeds forever
struct FlakySource {
    fail_first: usize,
    reads: AtomicUsize,
}

impl FlakySource {
    fn new(fail_first: usize) -> Self {
        Self {
            fail_first,
            reads: AtomicUsize::new(0),
        }
    }
}

impl FrameSource for FlakySource {
    fn read_frame(&self) -> Result<Frame, CameraError> {
        let read = self.reads.fetch_add(1, Ordering::SeqCst);
        if read < self.fail_first {
            return Err(CameraError::ReadTimeout { timeout_ms: 1 });
        }
        Ok(Frame::new(read as u64, RgbImage::from_pixel(16, 12, Rgb([40, 80, 120]))))
    }

    fn resolution(&self) -> (u32, u32) {
        (16, 12)
    }
}

/// Produces frames that cannot be encoded
struct EmptyFrameSource;

impl FrameSource for EmptyFrameSource {
    fn read_frame(&self) -> Result<Frame, CameraError> {
        Ok(Frame::new(0, RgbImage::new(0, 0)))
    }

    fn resolution(&self) -> (u32, u32) {
        (0, 0)
    }
}

fn failing_annotator() -> Arc<dyn FrameAnnotator> {
    Arc::new(|_: &RgbImage| -> Result<RgbImage, AnnotationError> {
        Err(AnnotationError::Failed {
            details: "detector offline".to_string(),
        })
    })
}

fn create_test_encoder(source: Arc<dyn FrameSource>, annotator: Arc<dyn FrameAnnotator>) -> StreamEncoder {
    StreamEncoder::new(
        "cam0",
        source,
        annotator,
        Arc::new(RateMeter::new(30)),
        Arc::new(RateOverlay::disabled()),
        80,
    )
}

fn create_test_server() -> StreamServer {
    StreamServerBuilder::new()
        .config(StreamConfig {
            ip: "127.0.0.1".to_string(),
            port: 8080,
            jpeg_quality: 80,
        })
        .camera(CameraChannel::new(
            "cam0",
            Arc::new(TestPatternSource::new(32, 24, 200)),
            30,
        ))
        .camera(CameraChannel::new(
            "cam1",
            Arc::new(TestPatternSource::new(32, 24, 200)),
            30,
        ))
        .build()
        .unwrap()
}

fn assert_multipart_jpeg(chunk: &[u8]) {
    assert!(chunk.starts_with(PART_HEADER));
    assert!(chunk.ends_with(b"\xFF\xD9\r\n"));
    assert_eq!(&chunk[PART_HEADER.len()..PART_HEADER.len() + 2], &[0xFF, 0xD8]);
}

async fn get(router: axum::Router, uri: &str) -> axum::response::Response {
    router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

#[test]
fn test_multipart_chunk_framing() {
    let chunk = multipart_chunk(&[0xFF, 0xD8, 0x01, 0xFF, 0xD9]);

    let mut expected = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n".to_vec();
    expected.extend_from_slice(&[0xFF, 0xD8, 0x01, 0xFF, 0xD9]);
    expected.extend_from_slice(b"\r\n");
    assert_eq!(chunk.as_ref(), expected.as_slice());

    assert_eq!(BOUNDARY, "frame");
    assert_eq!(STREAM_CONTENT_TYPE, "multipart/x-mixed-replace; boundary=frame");
}

#[test]
fn test_read_failures_never_end_the_loop() {
    let source = Arc::new(FlakySource::new(25));
    let encoder = create_test_encoder(source.clone(), Arc::new(crate::annotate::NoopAnnotator));

    for _ in 0..25 {
        assert!(matches!(encoder.encode_next(), Err(FrameSkip::Capture(_))));
    }

    let chunk = encoder.encode_next().unwrap();
    assert_multipart_jpeg(&chunk);
}

#[tokio::test]
async fn test_stream_survives_read_failures_and_failing_annotator() {
    let source = Arc::new(FlakySource::new(40));
    let camera = Arc::new(CameraChannel::new("cam0", source.clone(), 30));
    let encoder = Arc::new(create_test_encoder(source.clone(), failing_annotator()));

    let session = StreamSession::open(Arc::clone(&camera));
    let mut stream = Box::pin(encoder.into_stream(session));

    for _ in 0..5 {
        let chunk = timeout(Duration::from_secs(5), stream.next())
            .await
            .expect("chunk within timeout")
            .expect("stream still open")
            .unwrap();
        assert_multipart_jpeg(&chunk);
    }

    // 40 failed reads were retried before the first of five frames
    assert_eq!(source.reads.load(Ordering::SeqCst), 45);
    assert_eq!(camera.active_viewers(), 1);

    drop(stream);
    assert_eq!(camera.active_viewers(), 0);
}

#[test]
fn test_failing_annotator_never_drops_frames() {
    let source = Arc::new(FlakySource::new(0));
    let encoder = create_test_encoder(source.clone(), failing_annotator());

    let emitted = (0..10).filter(|_| encoder.encode_next().is_ok()).count();

    assert_eq!(emitted, 10);
    assert_eq!(source.reads.load(Ordering::SeqCst), 10);
}

#[test]
fn test_encode_failure_skips_frame() {
    let encoder = create_test_encoder(Arc::new(EmptyFrameSource), Arc::new(crate::annotate::NoopAnnotator));
    assert!(matches!(encoder.encode_next(), Err(FrameSkip::Encode(_))));
}

#[test]
fn test_meter_ticks_once_per_captured_frame() {
    let meter = Arc::new(RateMeter::new(30));
    let encoder = StreamEncoder::new(
        "cam1",
        Arc::new(FlakySource::new(3)),
        Arc::new(crate::annotate::NoopAnnotator),
        Arc::clone(&meter),
        Arc::new(RateOverlay::disabled()),
        80,
    );

    for _ in 0..8 {
        let _ = encoder.encode_next();
    }

    // Three failed reads, five frames, four deltas
    assert_eq!(meter.samples(), 4);
    assert_eq!(encoder.label(), "cam1");
}

#[test]
fn test_round_rate() {
    assert_eq!(round_rate(33.333333), 33.33);
    assert_eq!(round_rate(29.996), 30.0);
    assert_eq!(round_rate(0.0), 0.0);
}

#[test]
fn test_stats_snapshot_keys() {
    let server = create_test_server();
    let start = Instant::now();
    for i in 0..5u32 {
        server.cameras()[0]
            .meter
            .tick_at(start + Duration::from_millis(30) * i);
    }

    let snapshot = StatsSnapshot::capture(server.cameras().iter().map(|c| c.as_ref()));

    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot.rate("cam0"), Some(33.33));
    assert_eq!(snapshot.rate("cam1"), Some(0.0));
    assert_eq!(snapshot.rate("cam2"), None);
}

#[test]
fn test_builder_validation() {
    let result = StreamServerBuilder::new()
        .camera(CameraChannel::new("cam0", Arc::new(FlakySource::new(0)), 30))
        .build();
    assert!(result.is_err());

    let result = StreamServerBuilder::new()
        .config(StreamConfig {
            ip: "127.0.0.1".to_string(),
            port: 8080,
            jpeg_quality: 80,
        })
        .build();
    assert!(result.is_err());
}

#[tokio::test]
async fn test_stats_endpoint_json() {
    let server = create_test_server();
    let start = Instant::now();
    for i in 0..5u32 {
        server.cameras()[1]
            .meter
            .tick_at(start + Duration::from_millis(40) * i);
    }

    let response = get(server.router(), "/stats").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json["cam0_fps"], 0.0);
    assert_eq!(json["cam1_fps"], 25.0);
    assert_eq!(json.as_object().unwrap().len(), 2);
}

#[tokio::test]
async fn test_index_page_embeds_cameras_and_poller() {
    let server = create_test_server();

    let response = get(server.router(), "/").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(body.to_vec()).unwrap();

    assert!(html.contains(r#"<img src="/cam0""#));
    assert!(html.contains(r#"<img src="/cam1""#));
    assert!(html.contains("fetch('/stats'"));
    assert!(html.contains("setInterval(poll, 1000)"));
    assert!(html.contains("j.cam1_fps.toFixed(1)"));
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let server = create_test_server();
    let response = get(server.router(), "/cam7").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_client_disconnect_after_five_chunks() {
    let server = create_test_server();
    let router = server.router();
    let cam0 = Arc::clone(&server.cameras()[0]);

    let response = get(router.clone(), "/cam0").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "multipart/x-mixed-replace; boundary=frame"
    );
    assert_eq!(cam0.active_viewers(), 1);

    let mut body = response.into_body().into_data_stream();
    for _ in 0..5 {
        let chunk = timeout(Duration::from_secs(5), body.next())
            .await
            .expect("chunk within timeout")
            .expect("stream still open")
            .unwrap();
        assert_multipart_jpeg(&chunk);
    }

    // Client goes away
    drop(body);
    assert_eq!(cam0.active_viewers(), 0);

    // The other camera is unaffected
    let response = get(router, "/cam1").await;
    let mut body = response.into_body().into_data_stream();
    let chunk = timeout(Duration::from_secs(5), body.next())
        .await
        .expect("cam1 chunk within timeout")
        .unwrap()
        .unwrap();
    assert_multipart_jpeg(&chunk);
}

#[test]
fn test_two_pattern_cameras_report_thirty_fps() {
    let cameras: Vec<Arc<CameraChannel>> = ["cam0", "cam1"]
        .iter()
        .map(|id| {
            Arc::new(CameraChannel::new(
                *id,
                Arc::new(TestPatternSource::new(32, 24, 30)),
                30,
            ))
        })
        .collect();

    let workers: Vec<_> = cameras
        .iter()
        .map(|camera| {
            let encoder = StreamEncoder::new(
                camera.id.clone(),
                Arc::clone(&camera.source),
                Arc::new(crate::annotate::NoopAnnotator),
                Arc::clone(&camera.meter),
                Arc::new(RateOverlay::disabled()),
                80,
            );
            std::thread::spawn(move || {
                let start = Instant::now();
                while start.elapsed() < Duration::from_secs(3) {
                    encoder.encode_next().unwrap();
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    let snapshot = StatsSnapshot::capture(cameras.iter().map(|c| c.as_ref()));
    for id in ["cam0", "cam1"] {
        let rate = snapshot.rate(id).unwrap();
        // Pacing runs on real sleeps, so allow for scheduler jitter
        assert!((rate - 30.0).abs() <= 30.0 * 0.15, "{} rate was {}", id, rate);
    }
}

#[tokio::test]
async fn test_stats_available_while_streaming() {
    let server = create_test_server();
    let router = server.router();

    let response = get(router.clone(), "/cam0").await;
    let mut stream = response.into_body().into_data_stream();
    for _ in 0..3 {
        stream.next().await.unwrap().unwrap();
    }

    let response = timeout(Duration::from_secs(1), get(router, "/stats"))
        .await
        .expect("stats must not block on an active stream");
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert!(json["cam0_fps"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn test_concurrent_clients_on_one_camera() {
    let server = create_test_server();
    let router = server.router();
    let cam0 = Arc::clone(&server.cameras()[0]);

    let first = get(router.clone(), "/cam0").await;
    let second = get(router, "/cam0").await;
    assert_eq!(cam0.active_viewers(), 2);

    let mut first = first.into_body().into_data_stream();
    let mut second = second.into_body().into_data_stream();
    for _ in 0..2 {
        assert_multipart_jpeg(&first.next().await.unwrap().unwrap());
        assert_multipart_jpeg(&second.next().await.unwrap().unwrap());
    }

    drop(first);
    assert_eq!(cam0.active_viewers(), 1);
}

#[tokio::test]
async fn test_real_listener_streams_and_reports_stats() {
    let server = create_test_server();
    let cam0 = Arc::clone(&server.cameras()[0]);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let _ = server.serve(listener).await;
    });

    let mut client = tokio::net::TcpStream::connect(addr).await.unwrap();
    client
        .write_all(b"GET /cam0 HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();

    let mut received = Vec::new();
    let mut buf = [0u8; 8192];
    timeout(Duration::from_secs(10), async {
        while count_parts(&received) < 5 {
            let n = client.read(&mut buf).await.unwrap();
            assert!(n > 0, "server closed the stream early");
            received.extend_from_slice(&buf[..n]);
        }
    })
    .await
    .expect("five parts within timeout");

    let head = String::from_utf8_lossy(&received);
    assert!(head.contains("multipart/x-mixed-replace; boundary=frame"));
    drop(client);

    // The session ends once the next write hits the closed socket
    timeout(Duration::from_secs(10), async {
        while cam0.active_viewers() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("session should end after disconnect");

    let mut client = tokio::net::TcpStream::connect(addr).await.unwrap();
    client
        .write_all(b"GET /stats HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = Vec::new();
    timeout(Duration::from_secs(5), client.read_to_end(&mut response))
        .await
        .unwrap()
        .unwrap();

    let response = String::from_utf8(response).unwrap();
    let (_, body) = response.split_once("\r\n\r\n").unwrap();
    let json: serde_json::Value = serde_json::from_str(body).unwrap();
    assert!(json["cam0_fps"].as_f64().unwrap() > 0.0);
    assert!(json["cam1_fps"].is_number());
}

fn count_parts(data: &[u8]) -> usize {
    data.windows(PART_HEADER.len())
        .filter(|window| *window == PART_HEADER)
        .count()
}
