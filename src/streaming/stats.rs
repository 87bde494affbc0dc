use super::server::CameraChannel;
use serde::Serialize;
use std::collections::BTreeMap;

/// Round a rate to the two decimals reported by `/stats`
pub fn round_rate(rate: f64) -> f64 {
    (rate * 100.0).round() / 100.0
}

/// Current smoothed rate of every camera, keyed `"<camera>_fps"`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct StatsSnapshot {
    rates: BTreeMap<String, f64>,
}

impl StatsSnapshot {
    /// Read each camera's meter independently; no cross-camera consistency
    pub fn capture<'a>(cameras: impl IntoIterator<Item = &'a CameraChannel>) -> Self {
        let rates = cameras
            .into_iter()
            .map(|camera| {
                (
                    format!("{}_fps", camera.id),
                    round_rate(camera.meter.current_rate()),
                )
            })
            .collect();

        Self { rates }
    }

    pub fn rate(&self, camera: &str) -> Option<f64> {
        self.rates.get(&format!("{}_fps", camera)).copied()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}
