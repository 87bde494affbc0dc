use super::encoder::{StreamEncoder, STREAM_CONTENT_TYPE};
use super::server::ServerState;
use super::session::StreamSession;
use super::stats::StatsSnapshot;
use axum::{
    body::Body,
    extract::State,
    http::header,
    response::{Html, IntoResponse, Response},
    Json,
};
use std::sync::Arc;

/// Infinite multipart response for the camera at `index`
pub fn mjpeg_stream_handler(state: ServerState, index: usize) -> Response {
    let camera = Arc::clone(&state.cameras[index]);

    let encoder = Arc::new(StreamEncoder::new(
        camera.id.clone(),
        Arc::clone(&camera.source),
        Arc::clone(&state.annotator),
        Arc::clone(&camera.meter),
        Arc::clone(&state.overlay),
        state.jpeg_quality,
    ));
    let session = StreamSession::open(camera);

    (
        [
            (header::CONTENT_TYPE, STREAM_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache, private"),
            (header::PRAGMA, "no-cache"),
        ],
        Body::from_stream(encoder.into_stream(session)),
    )
        .into_response()
}

/// Snapshot of every camera's smoothed frame rate
pub async fn stats_handler(State(state): State<ServerState>) -> impl IntoResponse {
    let snapshot = StatsSnapshot::capture(state.cameras.iter().map(|camera| camera.as_ref()));
    (
        [(header::CACHE_CONTROL, "no-store")],
        Json(snapshot),
    )
}

/// Viewer page with one image per camera and a one-second `/stats` poller
pub async fn index_handler(State(state): State<ServerState>) -> Html<String> {
    let ids: Vec<&str> = state.cameras.iter().map(|camera| camera.id.as_str()).collect();
    Html(render_index_page(&ids))
}

pub(crate) fn render_index_page(camera_ids: &[&str]) -> String {
    let cards: String = camera_ids
        .iter()
        .map(|id| {
            format!(
                r#"  <div class="card">
    <h3>{id}</h3>
    <div class="meta">FPS: <span id="fps-{id}">--</span></div>
    <img src="/{id}" alt="{id} stream" />
  </div>
"#,
                id = id
            )
        })
        .collect();

    let updates: String = camera_ids
        .iter()
        .map(|id| {
            format!(
                "      if (typeof j.{id}_fps === 'number') document.getElementById('fps-{id}').textContent = j.{id}_fps.toFixed(1);\n",
                id = id
            )
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Dualcam Live</title>
<style>
  :root {{ color-scheme: dark; }}
  body {{ margin: 0; background: #111; color: #eee; font-family: system-ui, sans-serif; }}
  .wrap {{ display: flex; flex-wrap: wrap; gap: 12px; padding: 12px; }}
  .card {{ background: #1c1c1c; padding: 10px; border-radius: 10px; box-shadow: 0 2px 8px #0008; }}
  h3 {{ margin: 0 0 6px 0; font-weight: 600; font-size: 16px; }}
  .meta {{ font-size: 13px; opacity: 0.85; margin-bottom: 6px; }}
  img {{ max-width: 46vw; height: auto; display: block; border-radius: 6px; }}
  @media (max-width: 800px) {{ img {{ max-width: 100vw; }} }}
</style>
</head>
<body>
<div class="wrap">
{cards}</div>
<script>
  async function poll() {{
    try {{
      const r = await fetch('/stats', {{cache: 'no-store'}});
      const j = await r.json();
{updates}    }} catch (e) {{ /* next poll retries */ }}
  }}
  setInterval(poll, 1000);
  poll();
</script>
</body>
</html>
"#,
        cards = cards,
        updates = updates,
    )
}
