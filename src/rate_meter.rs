use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Instant;

/// Default number of inter-frame deltas averaged per meter
pub const DEFAULT_WINDOW: usize = 30;

/// Moving-average frame rate for one stream.
///
/// Every stream session for a camera ticks the same meter, and the stats
/// endpoint reads it concurrently; a single mutex guards the history and
/// the derived rate.
#[derive(Debug)]
pub struct RateMeter {
    state: Mutex<MeterState>,
}

#[derive(Debug)]
struct MeterState {
    capacity: usize,
    deltas: VecDeque<f64>,
    last_tick: Option<Instant>,
    rate: f64,
}

impl RateMeter {
    /// Create a meter averaging over the last `capacity` deltas
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(MeterState {
                capacity,
                deltas: VecDeque::with_capacity(capacity),
                last_tick: None,
                rate: 0.0,
            }),
        }
    }

    /// Record a frame now and return the smoothed rate
    pub fn tick(&self) -> f64 {
        self.tick_at(Instant::now())
    }

    /// Record a frame at `now` and return the smoothed rate.
    ///
    /// The first tick only stores the timestamp. A timestamp earlier than
    /// the previous one counts as a zero delta.
    pub fn tick_at(&self, now: Instant) -> f64 {
        let mut state = self.state.lock();

        if let Some(previous) = state.last_tick {
            let delta = now.saturating_duration_since(previous).as_secs_f64();
            if state.deltas.len() == state.capacity {
                state.deltas.pop_front();
            }
            state.deltas.push_back(delta);

            let sum: f64 = state.deltas.iter().sum();
            state.rate = if sum > 0.0 {
                state.deltas.len() as f64 / sum
            } else {
                0.0
            };
        }

        state.last_tick = Some(now);
        state.rate
    }

    /// Current smoothed rate without recording a frame
    pub fn current_rate(&self) -> f64 {
        self.state.lock().rate
    }

    pub fn capacity(&self) -> usize {
        self.state.lock().capacity
    }

    /// Number of deltas currently retained
    pub fn samples(&self) -> usize {
        self.state.lock().deltas.len()
    }
}

impl Default for RateMeter {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}
