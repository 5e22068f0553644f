use adsorption_common::{DensityGrid, FrameSnapshot, SimulationConfig, TimeSeriesSample};

/// A single adsorbed molecule. Never mutated once created.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdsorptionEvent {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// The molecules adsorbed during one frame.
///
/// `events` holds `min(count, max_events_per_frame)` sampled positions. Each of
/// them stands for `weight` molecules, so `events.len() as f64 * weight == count`
/// up to rounding. Below the cap the weight is exactly 1.
#[derive(Debug, Clone)]
pub struct EventBatch {
    pub frame: u32,
    pub count: u128,
    pub weight: f64,
    pub events: Vec<AdsorptionEvent>,
}

impl EventBatch {
    /// True when every molecule of the frame has its own event.
    pub fn is_exact(&self) -> bool {
        self.events.len() as u128 == self.count
    }
}

/// Append-only record of every adsorption in the current run.
#[derive(Debug, Default)]
pub struct PointCloud {
    batches: Vec<EventBatch>,
    total: u128,
}

impl PointCloud {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total adsorbed molecule count.
    pub fn len(&self) -> u128 {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Appends a frame's batch. Batches must arrive in frame order.
    pub fn push_batch(&mut self, batch: EventBatch) {
        debug_assert!(self.batches.last().map_or(true, |b| b.frame < batch.frame));
        self.total = self.total.saturating_add(batch.count);
        self.batches.push(batch);
    }

    pub fn batches(&self) -> &[EventBatch] {
        &self.batches
    }

    pub fn last_batch(&self) -> Option<&EventBatch> {
        self.batches.last()
    }

    /// Number of events actually held in memory.
    pub fn materialized_len(&self) -> usize {
        self.batches.iter().map(|b| b.events.len()).sum()
    }

    /// Every held event with the weight it carries, in append order.
    pub fn weighted_events(&self) -> impl Iterator<Item = (&AdsorptionEvent, f64)> + '_ {
        self.batches
            .iter()
            .flat_map(|b| b.events.iter().map(move |e| (e, b.weight)))
    }
}

/// State owned by a single run. Created fresh by every start and handed to the
/// deposition, sampling and rasterization stages in turn.
#[derive(Debug)]
pub struct RunState {
    pub cloud: PointCloud,
    /// Density grid of the most recent frame.
    pub grid: DensityGrid,
    pub frames: Vec<FrameSnapshot>,
    pub time_series: Vec<TimeSeriesSample>,
    /// Last whole second recorded into the time series.
    pub current_second: u32,
    /// Frames completed so far; also the index of the next frame.
    pub frames_completed: u32,
}

impl RunState {
    pub fn new(config: &SimulationConfig) -> Self {
        let n_frames = config.timing.n_frames as usize;
        Self {
            cloud: PointCloud::new(),
            grid: DensityGrid::new(
                config.grid.bins_x,
                config.grid.bins_y,
                config.surface.length_mm,
                config.surface.width_mm,
            ),
            frames: Vec::with_capacity(n_frames),
            time_series: Vec::new(),
            current_second: 0,
            frames_completed: 0,
        }
    }
}
