pub mod config;
pub mod density;
pub mod params;
pub mod snapshot;

// Re-export key types for easier use by dependent crates
pub use config::{SimulationConfig, SurfaceGeometry, TimingConfig, GridConfig, PhysicsConfig, RunConfig, OutputConfig, RasterMode};
pub use density::DensityGrid;
pub use params::{resolve_inputs, DepositionRates, Morphology, RawInputs, SimulationParameters, ValidationError, VALIDATION_MESSAGE};
pub use snapshot::{FrameSnapshot, RunRecord, TimeSeriesSample, COMPLETED_MESSAGE};
