use serde::{Serialize, Deserialize};
use crate::config::{SurfaceGeometry, TimingConfig};
use crate::density::DensityGrid;
use crate::params::{DepositionRates, SimulationParameters};

/// Status shown once all output artifacts have been generated.
pub const COMPLETED_MESSAGE: &str =
    "✅ Simulation completed. GIF, heatmap, adsorption and resistance graphs generated.";

/// The rasterized state of the surface after one frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameSnapshot {
    /// Zero-based frame index.
    pub frame: u32,
    /// Simulated seconds elapsed once this frame completed.
    pub elapsed_s: f64,
    /// Total adsorbed molecules up to and including this frame.
    pub total_adsorbed: u128,
    pub grid: DensityGrid,
}

/// Coverage and resistance recorded at a whole-second boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesSample {
    /// Whole seconds elapsed, starting at 1.
    pub time_s: u32,
    pub total_adsorbed: u128,
    /// Fraction of available sites occupied, clamped to [0, 1].
    pub coverage: f64,
    pub resistance_ohm: f64,
    /// Frame that crossed this boundary.
    pub frame: u32,
}

/// Everything one run produces, in the form consumed by the visualizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub parameters: SimulationParameters,
    pub rates: DepositionRates,
    pub surface: SurfaceGeometry,
    pub timing: TimingConfig,
    pub frames: Vec<FrameSnapshot>,
    pub time_series: Vec<TimeSeriesSample>,
}

impl RunRecord {
    /// Grid of the last frame, if the run produced any frames.
    pub fn final_grid(&self) -> Option<&DensityGrid> {
        self.frames.last().map(|f| &f.grid)
    }

    pub fn surface_label(&self) -> &str {
        self.parameters.morphology.label()
    }
}
