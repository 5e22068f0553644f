use serde::{Deserialize, Serialize};

/// 2D histogram of adsorbed molecules over the surface's (x, y) extent.
///
/// Counts are stored row-major: bin `(ix, iy)` lives at `iy * bins_x + ix`,
/// with `iy = 0` at y = 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityGrid {
    pub bins_x: u32,
    pub bins_y: u32,
    pub extent_x: f64,
    pub extent_y: f64,
    pub counts: Vec<f64>,
}

impl DensityGrid {
    /// Creates an empty grid spanning `[0, extent_x] x [0, extent_y]`.
    pub fn new(bins_x: u32, bins_y: u32, extent_x: f64, extent_y: f64) -> Self {
        Self {
            bins_x,
            bins_y,
            extent_x,
            extent_y,
            counts: vec![0.0; bins_x as usize * bins_y as usize],
        }
    }

    #[inline(always)]
    pub fn index(&self, ix: u32, iy: u32) -> usize {
        iy as usize * self.bins_x as usize + ix as usize
    }

    pub fn get(&self, ix: u32, iy: u32) -> f64 {
        self.counts[self.index(ix, iy)]
    }

    pub fn add(&mut self, ix: u32, iy: u32, weight: f64) {
        let idx = self.index(ix, iy);
        self.counts[idx] += weight;
    }

    pub fn clear(&mut self) {
        self.counts.iter_mut().for_each(|c| *c = 0.0);
    }

    /// Sum over all bins.
    pub fn total(&self) -> f64 {
        self.counts.iter().sum()
    }

    /// Largest bin count, 0 for an empty grid.
    pub fn max(&self) -> f64 {
        self.counts.iter().copied().fold(0.0, f64::max)
    }

    /// Width and height of a single bin.
    pub fn bin_size(&self) -> (f64, f64) {
        (
            self.extent_x / self.bins_x as f64,
            self.extent_y / self.bins_y as f64,
        )
    }

    /// Rows from y = 0 upwards, each ordered by x.
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.counts.chunks(self.bins_x.max(1) as usize)
    }
}
