use serde::{Deserialize, Serialize};
use anyhow::Result;
use std::path::Path;

/// Surface dimensions in millimeters. Fixed for the lifetime of a run.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
pub struct SurfaceGeometry {
    #[serde(default = "default_length_mm")]
    pub length_mm: f64,
    #[serde(default = "default_width_mm")]
    pub width_mm: f64,
    #[serde(default = "default_thickness_mm")]
    pub thickness_mm: f64,
}

// Configuration for timing
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct TimingConfig {
    #[serde(default = "default_total_time_s")]
    pub total_time_s: f64,
    #[serde(default = "default_n_frames")]
    pub n_frames: u32,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterMode {
    /// Rebuild the density grid from the whole point cloud every frame.
    Full,
    /// Add only the newest batch to the previous frame's grid.
    Incremental,
}

// Histogram resolution over the surface
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct GridConfig {
    #[serde(default = "default_bins")]
    pub bins_x: u32,
    #[serde(default = "default_bins")]
    pub bins_y: u32,
    #[serde(default = "default_raster_mode")]
    pub raster_mode: RasterMode,
}

// Conversion constants for the flow and sensor models
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct PhysicsConfig {
    /// mol/s per SCCM at standard conditions.
    #[serde(default = "default_sccm_to_mol_per_s")]
    pub sccm_to_mol_per_s: f64,
    #[serde(default = "default_avogadro")]
    pub avogadro: f64,
    /// Total adsorption sites; coverage saturates at this count.
    #[serde(default = "default_max_sites")]
    pub max_sites: f64,
}

// Run-level settings
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RunConfig {
    /// Fixed RNG seed. Positions are drawn from OS entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Upper bound on events held in memory per frame. Larger frames are
    /// represented by this many weighted events.
    #[serde(default = "default_max_events_per_frame")]
    pub max_events_per_frame: u64,
}

// Configuration for output settings, loaded from config.toml
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_base_filename")]
    pub base_filename: String,
    pub format: Option<String>, // Output format: "json", "bincode", "messagepack"
    #[serde(default = "default_true")]
    pub save_time_series: bool,
    #[serde(default = "default_true")]
    pub save_final_grid: bool,
    #[serde(default)]
    pub save_positions: bool,
}

// Main simulation configuration structure, loaded from config.toml.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct SimulationConfig {
    #[serde(default)]
    pub surface: SurfaceGeometry,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub physics: PhysicsConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Default for SurfaceGeometry {
    fn default() -> Self {
        SurfaceGeometry {
            length_mm: default_length_mm(),
            width_mm: default_width_mm(),
            thickness_mm: default_thickness_mm(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            total_time_s: default_total_time_s(),
            n_frames: default_n_frames(),
        }
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig {
            bins_x: default_bins(),
            bins_y: default_bins(),
            raster_mode: default_raster_mode(),
        }
    }
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        PhysicsConfig {
            sccm_to_mol_per_s: default_sccm_to_mol_per_s(),
            avogadro: default_avogadro(),
            max_sites: default_max_sites(),
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            seed: None,
            max_events_per_frame: default_max_events_per_frame(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            base_filename: default_base_filename(),
            format: None,
            save_time_series: true,
            save_final_grid: true,
            save_positions: false,
        }
    }
}

impl TimingConfig {
    /// Simulated seconds covered by one frame.
    pub fn frame_duration_s(&self) -> f64 {
        self.total_time_s / self.n_frames as f64
    }

    /// Elapsed simulated time once frame `frame_index` (zero-based) has completed.
    /// Multiplying before dividing keeps whole-second boundaries exact.
    pub fn elapsed_after_frame(&self, frame_index: u32) -> f64 {
        self.total_time_s * (frame_index as f64 + 1.0) / self.n_frames as f64
    }
}

impl SimulationConfig {
    /// Loads the simulation configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path_ref.display(), e))?;
        let config = Self::from_toml_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Invalid config '{}': {}", path_ref.display(), e))?;
        Ok(config)
    }

    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(config_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let s = &self.surface;
        if !(s.length_mm > 0.0 && s.width_mm > 0.0 && s.thickness_mm > 0.0) {
            anyhow::bail!("surface dimensions must be positive.");
        }
        if self.timing.n_frames == 0 {
            anyhow::bail!("n_frames must be greater than 0.");
        }
        if !(self.timing.total_time_s > 0.0) {
            anyhow::bail!("total_time_s must be positive.");
        }
        if self.grid.bins_x == 0 || self.grid.bins_y == 0 {
            anyhow::bail!("grid bins must be greater than 0.");
        }
        if !(self.physics.max_sites > 0.0) {
            anyhow::bail!("max_sites must be positive.");
        }
        if self.run.max_events_per_frame == 0 {
            anyhow::bail!("max_events_per_frame must be greater than 0.");
        }
        Ok(())
    }
}

fn default_length_mm() -> f64 {
    10.0
}

fn default_width_mm() -> f64 {
    10.0
}

fn default_thickness_mm() -> f64 {
    2.0
}

fn default_total_time_s() -> f64 {
    10.0
}

fn default_n_frames() -> u32 {
    50
}

fn default_bins() -> u32 {
    50
}

fn default_raster_mode() -> RasterMode {
    RasterMode::Full
}

fn default_sccm_to_mol_per_s() -> f64 {
    7.45e-7
}

fn default_avogadro() -> f64 {
    6.022e23
}

fn default_max_sites() -> f64 {
    1e6
}

fn default_max_events_per_frame() -> u64 {
    100_000
}

fn default_base_filename() -> String {
    "adsorption".to_string()
}

fn default_true() -> bool {
    true
}
