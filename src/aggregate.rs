use crate::run_state::RunState;
use adsorption_common::{SimulationParameters, TimeSeriesSample};
use log::info;

/// Fraction of the available sites occupied, saturating at 1.
pub fn coverage(total_adsorbed: u128, max_sites: f64) -> f64 {
    (total_adsorbed as f64 / max_sites).min(1.0)
}

/// Exponential sensor response: `R0 * exp(k * coverage)`.
pub fn resistance(baseline_ohm: f64, sensitivity: f64, coverage: f64) -> f64 {
    baseline_ohm * (sensitivity * coverage).exp()
}

/// Records a sample when `elapsed_s` reaches the next whole second.
///
/// The second counter only ever advances by one, so each boundary is recorded
/// exactly once, by the first frame that reaches it.
pub fn record_sample(
    state: &mut RunState,
    frame: u32,
    elapsed_s: f64,
    params: &SimulationParameters,
    max_sites: f64,
) -> Option<TimeSeriesSample> {
    if elapsed_s < (state.current_second + 1) as f64 {
        return None;
    }
    state.current_second += 1;

    let total_adsorbed = state.cloud.len();
    let coverage = coverage(total_adsorbed, max_sites);
    let sample = TimeSeriesSample {
        time_s: state.current_second,
        total_adsorbed,
        coverage,
        resistance_ohm: resistance(params.baseline_resistance_ohm, params.sensitivity, coverage),
        frame,
    };

    info!(
        "t = {} s | Adsorbed: {} | Coverage: {:.4} | Resistance: {:.2} Ohm",
        sample.time_s, sample.total_adsorbed, sample.coverage, sample.resistance_ohm
    );
    state.time_series.push(sample);
    Some(sample)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run_state::EventBatch;
    use adsorption_common::{Morphology, SimulationConfig};
    use approx::assert_relative_eq;

    fn params() -> SimulationParameters {
        SimulationParameters::new(Morphology::Rod, 500.0, 0.5, 1000.0, 2.0).unwrap()
    }

    fn add_molecules(state: &mut RunState, frame: u32, count: u128) {
        state.cloud.push_batch(EventBatch { frame, count, weight: 1.0, events: Vec::new() });
    }

    #[test]
    fn coverage_saturates() {
        assert_eq!(coverage(0, 1e6), 0.0);
        assert_eq!(coverage(250_000, 1e6), 0.25);
        assert_eq!(coverage(1_000_000, 1e6), 1.0);
        assert_eq!(coverage(u128::MAX, 1e6), 1.0);
    }

    #[test]
    fn resistance_follows_exponential_response() {
        assert_eq!(resistance(1000.0, 2.0, 0.0), 1000.0);
        assert_relative_eq!(resistance(1000.0, 2.0, 1.0), 7389.056098930650, max_relative = 1e-12);
        assert_relative_eq!(resistance(50.0, -1.0, 0.5), 50.0 * (-0.5f64).exp(), max_relative = 1e-12);
    }

    #[test]
    fn each_second_is_recorded_once() {
        let mut state = RunState::new(&SimulationConfig::default());
        let p = params();

        // 0.2 s frames: only frames 4 and 9 cross a boundary.
        let mut recorded = Vec::new();
        for frame in 0..10u32 {
            add_molecules(&mut state, frame, 100_000);
            let elapsed = 0.2 * (frame + 1) as f64;
            if let Some(s) = record_sample(&mut state, frame, elapsed, &p, 1e6) {
                recorded.push(s);
            }
        }
        // Re-checking an already passed boundary records nothing.
        assert!(record_sample(&mut state, 9, 2.0, &p, 1e6).is_none());

        assert_eq!(recorded.len(), 2);
        assert_eq!((recorded[0].time_s, recorded[0].frame), (1, 4));
        assert_eq!((recorded[1].time_s, recorded[1].frame), (2, 9));
        assert_eq!(recorded[0].total_adsorbed, 500_000);
        assert_eq!(recorded[1].total_adsorbed, 1_000_000);
        assert_relative_eq!(recorded[0].resistance_ohm, 1000.0 * 1.0f64.exp(), max_relative = 1e-12);
        assert_eq!(state.time_series, recorded);
    }

    #[test]
    fn long_frame_advances_one_second_at_a_time() {
        let mut state = RunState::new(&SimulationConfig::default());
        let p = params();
        // A frame ending at 3.5 s still only records second 1.
        let s = record_sample(&mut state, 0, 3.5, &p, 1e6).unwrap();
        assert_eq!(s.time_s, 1);
        assert_eq!(state.current_second, 1);
    }
}
