use crate::run_state::{AdsorptionEvent, EventBatch, PointCloud};
use adsorption_common::DensityGrid;

/// Bin index of `coord` along an axis of `bins` equal bins over `[0, extent]`.
///
/// Bins are half-open except the last, which also holds `coord == extent`.
/// Coordinates outside the range fall in no bin.
#[inline(always)]
pub fn bin_index(coord: f64, extent: f64, bins: u32) -> Option<u32> {
    if bins == 0 || !(0.0..=extent).contains(&coord) {
        return None;
    }
    let idx = (coord * (bins as f64 / extent)).floor() as u32;
    // Clamp to the last bin to close its upper edge
    Some(idx.min(bins - 1))
}

/// Grid cell of an event's (x, y) position.
#[inline(always)]
pub fn bin_event(grid: &DensityGrid, event: &AdsorptionEvent) -> Option<(u32, u32)> {
    let ix = bin_index(event.x, grid.extent_x, grid.bins_x)?;
    let iy = bin_index(event.y, grid.extent_y, grid.bins_y)?;
    Some((ix, iy))
}

/// Adds one frame's events to the grid.
pub fn accumulate_batch(grid: &mut DensityGrid, batch: &EventBatch) {
    for event in &batch.events {
        if let Some((ix, iy)) = bin_event(grid, event) {
            grid.add(ix, iy, batch.weight);
        }
    }
}

/// Rebuilds the grid from the whole point cloud.
pub fn rasterize(cloud: &PointCloud, grid: &mut DensityGrid) {
    grid.clear();
    for batch in cloud.batches() {
        accumulate_batch(grid, batch);
    }
}
