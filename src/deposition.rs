use crate::run_state::{AdsorptionEvent, EventBatch, RunState};
use adsorption_common::SurfaceGeometry;
use anyhow::Result;
use log::trace;
use rand::distr::Uniform;
use rand::Rng;

/// Deposits one frame's molecules onto the surface.
///
/// Positions are uniform over `[0, length) x [0, width)` with z fixed at the
/// surface thickness. At most `max_events` positions are drawn; above that the
/// batch is weighted so it still accounts for all `count` molecules.
pub fn deposit_frame<R: Rng>(
    state: &mut RunState,
    frame: u32,
    count: u128,
    surface: &SurfaceGeometry,
    max_events: u64,
    rng: &mut R,
) -> Result<()> {
    let materialized = count.min(max_events as u128) as usize;
    let weight = if materialized == 0 || count == materialized as u128 {
        1.0
    } else {
        count as f64 / materialized as f64
    };

    let dist_x = Uniform::new(0.0f64, surface.length_mm)?;
    let dist_y = Uniform::new(0.0f64, surface.width_mm)?;

    // Each coordinate is drawn independently.
    let events: Vec<AdsorptionEvent> = (0..materialized)
        .map(|_| AdsorptionEvent {
            x: rng.sample(dist_x),
            y: rng.sample(dist_y),
            z: surface.thickness_mm,
        })
        .collect();

    trace!(
        "Frame {}: {} molecules adsorbed ({} sampled, weight {:.3e})",
        frame, count, materialized, weight
    );

    state.cloud.push_batch(EventBatch { frame, count, weight, events });
    Ok(())
}
