use crate::aggregate;
use crate::deposition;
use crate::grid;
use crate::run_state::{PointCloud, RunState};
use adsorption_common::{
    DepositionRates, FrameSnapshot, RasterMode, RunRecord, SimulationConfig, SimulationParameters,
};
use anyhow::Result;
use log::{debug, info, trace};
use rand::prelude::*;

/// Lifecycle of the deposition engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No run in progress.
    Idle,
    /// Iterating frames of a run.
    Running,
}

/// Runs the frame loop: deposition, time-series sampling and rasterization.
pub struct AdsorptionSimulation {
    config: SimulationConfig,
    /// Source of adsorption positions.
    pub rng: StdRng,
    phase: Phase,
    parameters: Option<SimulationParameters>,
    rates: Option<DepositionRates>,
    /// State of the current (or most recent) run.
    state: RunState,
}

impl AdsorptionSimulation {
    /// Creates an idle simulation. Seeds the RNG from `run.seed` when set.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        let rng = match config.run.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let state = RunState::new(&config);

        Ok(Self {
            config,
            rng,
            phase: Phase::Idle,
            parameters: None,
            rates: None,
            state,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Starts a new run with validated parameters, discarding any previous run.
    pub fn start(&mut self, parameters: SimulationParameters) -> Result<()> {
        if self.phase == Phase::Running {
            anyhow::bail!("A simulation run is already in progress.");
        }

        let frame_duration = self.config.timing.frame_duration_s();
        let rates = parameters.deposition_rates(&self.config.physics, frame_duration);
        info!(
            "Starting run: surface '{}' (x{}), {} frames of {:.3} s, {} molecules per frame",
            parameters.morphology.label(),
            rates.multiplier,
            self.config.timing.n_frames,
            frame_duration,
            rates.effective_count
        );
        debug!("Parameters: {:#?}", parameters);
        debug!("Deposition rates: {:#?}", rates);

        self.state = RunState::new(&self.config);
        self.parameters = Some(parameters);
        self.rates = Some(rates);
        self.phase = Phase::Running;
        Ok(())
    }

    /// Advances the run by one frame and returns that frame's snapshot.
    pub fn step(&mut self) -> Result<&FrameSnapshot> {
        if self.phase != Phase::Running {
            anyhow::bail!("No simulation run in progress.");
        }
        let (Some(parameters), Some(rates)) = (self.parameters.as_ref(), self.rates.as_ref()) else {
            anyhow::bail!("Run started without resolved parameters.");
        };

        let frame = self.state.frames_completed;

        // --- 1. Deposition ---
        deposition::deposit_frame(
            &mut self.state,
            frame,
            rates.effective_count,
            &self.config.surface,
            self.config.run.max_events_per_frame,
            &mut self.rng,
        )?;

        // --- 2. Time-series sampling ---
        let elapsed_s = self.config.timing.elapsed_after_frame(frame);
        aggregate::record_sample(
            &mut self.state,
            frame,
            elapsed_s,
            parameters,
            self.config.physics.max_sites,
        );

        // --- 3. Rasterization ---
        match self.config.grid.raster_mode {
            RasterMode::Full => grid::rasterize(&self.state.cloud, &mut self.state.grid),
            RasterMode::Incremental => {
                if let Some(batch) = self.state.cloud.last_batch() {
                    grid::accumulate_batch(&mut self.state.grid, batch);
                }
            }
        }

        self.state.frames.push(FrameSnapshot {
            frame,
            elapsed_s,
            total_adsorbed: self.state.cloud.len(),
            grid: self.state.grid.clone(),
        });
        self.state.frames_completed += 1;
        trace!(
            "Frame [{}/{}] ({:.1} s) | Adsorbed: {}",
            frame + 1,
            self.config.timing.n_frames,
            elapsed_s,
            self.state.cloud.len()
        );

        if self.state.frames_completed >= self.config.timing.n_frames {
            self.phase = Phase::Idle;
            info!(
                "Run finished after {} frames: {} molecules adsorbed, {} samples recorded.",
                self.state.frames_completed,
                self.state.cloud.len(),
                self.state.time_series.len()
            );
        }

        self.state
            .frames
            .last()
            .ok_or_else(|| anyhow::anyhow!("Frame snapshot missing after step."))
    }

    /// Runs all frames for `parameters`, calling `on_frame` after each one.
    pub fn run<F>(&mut self, parameters: SimulationParameters, mut on_frame: F) -> Result<RunRecord>
    where
        F: FnMut(&FrameSnapshot),
    {
        self.start(parameters)?;
        while self.phase() == Phase::Running {
            let snapshot = self.step()?;
            on_frame(snapshot);
        }
        self.record()
    }

    /// Packages the results of the completed run.
    pub fn record(&self) -> Result<RunRecord> {
        if self.phase == Phase::Running {
            anyhow::bail!("Run still in progress.");
        }
        let (Some(parameters), Some(rates)) = (self.parameters.clone(), self.rates) else {
            anyhow::bail!("No run has been started.");
        };

        Ok(RunRecord {
            parameters,
            rates,
            surface: self.config.surface,
            timing: self.config.timing.clone(),
            frames: self.state.frames.clone(),
            time_series: self.state.time_series.clone(),
        })
    }

    /// Point cloud of the current or most recent run.
    pub fn point_cloud(&self) -> &PointCloud {
        &self.state.cloud
    }

    /// The simulation configuration: surface, timing, grid and physics constants.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adsorption_common::{resolve_inputs, Morphology, RawInputs};
    use approx::assert_relative_eq;

    fn seeded_config(seed: u64) -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.run.seed = Some(seed);
        config.run.max_events_per_frame = 1_000;
        config
    }

    fn inputs(surface: &str, flow: &str, stick: &str, r0: &str, k: &str) -> SimulationParameters {
        resolve_inputs(&RawInputs {
            surface: surface.to_string(),
            flow_rate: flow.to_string(),
            sticking_coefficient: stick.to_string(),
            baseline_resistance: r0.to_string(),
            sensitivity: k.to_string(),
        })
        .unwrap()
    }

    #[test]
    fn phases_follow_the_run() {
        let mut sim = AdsorptionSimulation::new(seeded_config(1)).unwrap();
        assert_eq!(sim.phase(), Phase::Idle);
        assert!(sim.step().is_err());
        assert!(sim.record().is_err());

        let params = inputs("nanoflake", "1e-15", "1", "1000", "2");
        sim.start(params.clone()).unwrap();
        assert_eq!(sim.phase(), Phase::Running);
        assert!(sim.start(params).is_err());

        for _ in 0..49 {
            sim.step().unwrap();
        }
        assert_eq!(sim.phase(), Phase::Running);
        sim.step().unwrap();
        assert_eq!(sim.phase(), Phase::Idle);
        assert!(sim.step().is_err());
    }

    #[test]
    fn cloud_length_is_sum_of_frame_counts() {
        let mut sim = AdsorptionSimulation::new(seeded_config(7)).unwrap();
        let params = inputs("nanoparticle", "1e-15", "1", "1000", "2");
        let rates = params.deposition_rates(&sim.config().physics, 0.2);
        assert_eq!(rates.effective_count, 71);

        let mut frames_seen = 0;
        let record = sim.run(params, |_| frames_seen += 1).unwrap();

        assert_eq!(frames_seen, 50);
        assert_eq!(record.frames.len(), 50);
        assert_eq!(sim.point_cloud().len(), 50 * 71);
        assert_eq!(sim.point_cloud().materialized_len(), 50 * 71);
        for (event, _) in sim.point_cloud().weighted_events() {
            assert!((0.0..=10.0).contains(&event.x));
            assert!((0.0..=10.0).contains(&event.y));
            assert_eq!(event.z, 2.0);
        }

        let final_grid = record.final_grid().unwrap();
        assert_eq!(final_grid.counts.len(), 2_500);
        assert_eq!(final_grid.total(), (50 * 71) as f64);
    }

    #[test]
    fn time_series_has_one_sample_per_second() {
        let mut sim = AdsorptionSimulation::new(seeded_config(11)).unwrap();
        let params = inputs("nanorod", "2e-15", "0.8", "250", "3");
        let record = sim.run(params, |_| {}).unwrap();

        let series = &record.time_series;
        assert_eq!(series.len(), 10);
        for (i, sample) in series.iter().enumerate() {
            assert_eq!(sample.time_s, i as u32 + 1);
            assert_eq!(sample.frame, 5 * i as u32 + 4);
            let expected = 250.0 * (3.0 * (sample.total_adsorbed as f64 / 1e6).min(1.0)).exp();
            assert_relative_eq!(sample.resistance_ohm, expected, max_relative = 1e-12);
        }
        assert!(series.windows(2).all(|w| w[0].total_adsorbed <= w[1].total_adsorbed));
        assert_eq!(series[9].total_adsorbed, sim.point_cloud().len());
    }

    #[test]
    fn reference_scenario_saturates_coverage() {
        let mut sim = AdsorptionSimulation::new(seeded_config(3)).unwrap();
        let params = inputs("nanorod", "500", "0.5", "1000", "2");
        let effective = params.deposition_rates(&sim.config().physics, 0.2).effective_count;
        let record = sim.run(params, |_| {}).unwrap();

        let first = record.time_series[0];
        assert_eq!(first.time_s, 1);
        assert_eq!(first.frame, 4);
        assert_eq!(first.total_adsorbed, 5 * effective);
        assert_eq!(first.coverage, 1.0);
        assert_relative_eq!(first.resistance_ohm, 7389.056098930650, max_relative = 1e-9);

        assert_eq!(sim.point_cloud().len(), 50 * effective);
        // Each frame is capped at 1000 sampled positions.
        assert_eq!(sim.point_cloud().materialized_len(), 50 * 1_000);
        let total = record.final_grid().unwrap().total();
        assert_relative_eq!(total, (50 * effective) as f64, max_relative = 1e-9);
    }

    #[test]
    fn zero_flow_keeps_baseline_resistance() {
        let mut sim = AdsorptionSimulation::new(seeded_config(5)).unwrap();
        let params = inputs("nanorod", "0", "1", "1000", "2");
        let record = sim.run(params, |_| {}).unwrap();

        assert!(sim.point_cloud().is_empty());
        assert_eq!(record.frames.len(), 50);
        assert!(record.frames.iter().all(|f| f.grid.total() == 0.0));
        assert_eq!(record.time_series.len(), 10);
        assert!(record.time_series.iter().all(|s| s.resistance_ohm == 1000.0));
    }

    #[test]
    fn incremental_raster_matches_full() {
        let params = SimulationParameters::new(
            Morphology::Unrecognized("nanowire".to_string()),
            3e-15,
            0.9,
            1000.0,
            2.0,
        )
        .unwrap();

        let full_config = seeded_config(21);
        let mut incremental_config = seeded_config(21);
        incremental_config.grid.raster_mode = RasterMode::Incremental;

        let full = AdsorptionSimulation::new(full_config)
            .unwrap()
            .run(params.clone(), |_| {})
            .unwrap();
        let incremental = AdsorptionSimulation::new(incremental_config)
            .unwrap()
            .run(params, |_| {})
            .unwrap();

        for (a, b) in full.frames.iter().zip(&incremental.frames) {
            assert_eq!(a.total_adsorbed, b.total_adsorbed);
            assert_eq!(a.grid.total(), b.grid.total());
        }
        assert_eq!(full.final_grid(), incremental.final_grid());
    }

    #[test]
    fn restarting_resets_run_state() {
        let mut sim = AdsorptionSimulation::new(seeded_config(2)).unwrap();
        let params = inputs("nanoflake", "1e-15", "1", "1000", "2");
        sim.run(params.clone(), |_| {}).unwrap();
        let first_total = sim.point_cloud().len();

        let record = sim.run(params, |_| {}).unwrap();
        assert_eq!(sim.point_cloud().len(), first_total);
        assert_eq!(record.frames.len(), 50);
        assert_eq!(record.time_series.len(), 10);
    }
}
