//! Parameter resolution: turns the raw user inputs into validated simulation
//! parameters and the per-frame deposition budget derived from them.

use crate::config::PhysicsConfig;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;

/// Message shown to the user whenever the inputs cannot be resolved.
pub const VALIDATION_MESSAGE: &str = "Please enter valid inputs.";

/// Raised when a numeric input does not parse or the sticking coefficient is
/// outside [0, 1]. Carries no field-level detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationError;

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(VALIDATION_MESSAGE)
    }
}

impl Error for ValidationError {}

/// Surface morphology class and its adsorption-rate multiplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Morphology {
    Rod,
    Flake,
    Particle,
    /// Any selection outside the known set. Keeps the label for display.
    Unrecognized(String),
}

impl Morphology {
    /// Looks up a surface selection. Unknown labels are not an error.
    pub fn from_label(label: &str) -> Self {
        match label {
            "nanorod" | "rod" => Morphology::Rod,
            "nanoflake" | "flake" => Morphology::Flake,
            "nanoparticle" | "particle" => Morphology::Particle,
            other => Morphology::Unrecognized(other.to_string()),
        }
    }

    pub fn multiplier(&self) -> f64 {
        match self {
            Morphology::Rod => 2.0,
            Morphology::Flake => 1.2,
            Morphology::Particle => 0.8,
            Morphology::Unrecognized(_) => 1.0,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Morphology::Rod => "nanorod",
            Morphology::Flake => "nanoflake",
            Morphology::Particle => "nanoparticle",
            Morphology::Unrecognized(label) => label,
        }
    }
}

/// Raw form inputs as typed by the user.
#[derive(Debug, Clone, Default)]
pub struct RawInputs {
    pub surface: String,
    pub flow_rate: String,
    pub sticking_coefficient: String,
    pub baseline_resistance: String,
    pub sensitivity: String,
}

/// Validated user parameters for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationParameters {
    pub morphology: Morphology,
    /// Gas flow rate in SCCM. Zero and negative values are passed through.
    pub flow_rate_sccm: f64,
    pub sticking_coefficient: f64,
    pub baseline_resistance_ohm: f64,
    pub sensitivity: f64,
}

impl SimulationParameters {
    /// Builds parameters from already-parsed values, applying the range check.
    pub fn new(
        morphology: Morphology,
        flow_rate_sccm: f64,
        sticking_coefficient: f64,
        baseline_resistance_ohm: f64,
        sensitivity: f64,
    ) -> Result<Self, ValidationError> {
        // NaN fails this check too.
        if !(0.0..=1.0).contains(&sticking_coefficient) {
            return Err(ValidationError);
        }
        Ok(Self {
            morphology,
            flow_rate_sccm,
            sticking_coefficient,
            baseline_resistance_ohm,
            sensitivity,
        })
    }

    /// Per-frame molecule budget for this parameter set.
    pub fn deposition_rates(&self, physics: &PhysicsConfig, frame_duration_s: f64) -> DepositionRates {
        let molar_flow = self.flow_rate_sccm * physics.sccm_to_mol_per_s;
        let molecule_flow = molar_flow * physics.avogadro;
        let per_frame_budget = to_count(molecule_flow * frame_duration_s * self.sticking_coefficient);
        let multiplier = self.morphology.multiplier();
        let effective_count = to_count(per_frame_budget as f64 * multiplier);

        DepositionRates {
            molar_flow,
            molecule_flow,
            per_frame_budget,
            multiplier,
            effective_count,
        }
    }
}

/// Constants derived from the parameters, fixed for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepositionRates {
    /// mol/s
    pub molar_flow: f64,
    /// molecules/s
    pub molecule_flow: f64,
    pub per_frame_budget: u128,
    pub multiplier: f64,
    /// Molecules adsorbed in every frame.
    pub effective_count: u128,
}

/// Floors a real amount to a molecule count. Negative and NaN amounts give 0,
/// amounts beyond `u128::MAX` saturate.
fn to_count(amount: f64) -> u128 {
    amount.floor() as u128
}

fn parse_real(input: &str) -> Result<f64, ValidationError> {
    input.trim().parse::<f64>().map_err(|_| ValidationError)
}

/// Parses and validates the raw inputs. Any failure yields the same error.
pub fn resolve_inputs(raw: &RawInputs) -> Result<SimulationParameters, ValidationError> {
    let flow_rate = parse_real(&raw.flow_rate)?;
    let sticking = parse_real(&raw.sticking_coefficient)?;
    let baseline = parse_real(&raw.baseline_resistance)?;
    let sensitivity = parse_real(&raw.sensitivity)?;

    SimulationParameters::new(
        Morphology::from_label(&raw.surface),
        flow_rate,
        sticking,
        baseline,
        sensitivity,
    )
}
