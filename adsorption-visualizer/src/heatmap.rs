//! Heatmap rendering of density grids.
//!
//! Counts are mapped through a "hot" colormap (black, red, yellow, white),
//! scaled between the grid's minimum and maximum. Images put y = 0 at the
//! bottom, matching the surface coordinates.

use adsorption_common::DensityGrid;
use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use palette::{FromColor, LinSrgb, Mix, Srgb};
use plotters::prelude::*;
use plotters_bitmap::BitMapBackend;

/// Color stops of the hot colormap, in linear RGB.
const HOT_STOPS: [(f32, (f32, f32, f32)); 4] = [
    (0.0, (0.0, 0.0, 0.0)),
    (0.365, (1.0, 0.0, 0.0)),
    (0.746, (1.0, 1.0, 0.0)),
    (1.0, (1.0, 1.0, 1.0)),
];

/// Colormap lookup for a value in [0, 1]. Values outside are clamped.
pub fn hot(t: f64) -> [u8; 3] {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) as f32 };
    let upper = HOT_STOPS
        .iter()
        .position(|&(pos, _)| pos >= t)
        .unwrap_or(HOT_STOPS.len() - 1)
        .max(1);
    let (p0, (r0, g0, b0)) = HOT_STOPS[upper - 1];
    let (p1, (r1, g1, b1)) = HOT_STOPS[upper];

    let factor = ((t - p0) / (p1 - p0)).clamp(0.0, 1.0);
    let mixed = LinSrgb::new(r0, g0, b0).mix(LinSrgb::new(r1, g1, b1), factor);
    let rgb: Srgb<u8> = Srgb::from_color(mixed).into_format();
    [rgb.red, rgb.green, rgb.blue]
}

/// Color scale bounds of a grid: its smallest and largest count.
pub fn value_range(grid: &DensityGrid) -> (f64, f64) {
    let min = grid.counts.iter().copied().fold(f64::INFINITY, f64::min);
    let max = grid.max();
    if min.is_finite() { (min, max) } else { (0.0, 0.0) }
}

fn normalize(count: f64, (min, max): (f64, f64)) -> f64 {
    if max > min { (count - min) / (max - min) } else { 0.0 }
}

/// Renders the grid as an image with `scale` pixels per bin.
pub fn grid_to_image(grid: &DensityGrid, scale: u32) -> RgbImage {
    let scale = scale.max(1);
    let range = value_range(grid);
    RgbImage::from_fn(grid.bins_x * scale, grid.bins_y * scale, |px, py| {
        let ix = px / scale;
        // Flip rows so the first bin row is at the bottom.
        let iy = grid.bins_y - 1 - py / scale;
        Rgb(hot(normalize(grid.get(ix, iy), range)))
    })
}

/// Renders a frame with a title, axes in millimeters and a color bar.
pub fn render_annotated_frame(grid: &DensityGrid, title: &str, width: u32, height: u32) -> Result<RgbImage> {
    let mut buffer = vec![0u8; width as usize * height as usize * 3];
    let range = value_range(grid);
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&WHITE)?;
        let colorbar_width = (width / 6).max(60);
        let (map_area, bar_area) = root.split_horizontally(width.saturating_sub(colorbar_width));

        let mut chart = ChartBuilder::on(&map_area)
            .caption(title, ("sans-serif", 18))
            .margin(10)
            .x_label_area_size(35)
            .y_label_area_size(45)
            .build_cartesian_2d(0.0..grid.extent_x, 0.0..grid.extent_y)?;
        chart
            .configure_mesh()
            .disable_mesh()
            .x_desc("X (mm)")
            .y_desc("Y (mm)")
            .draw()?;

        let (bin_w, bin_h) = grid.bin_size();
        chart.draw_series((0..grid.bins_y).flat_map(|iy| {
            (0..grid.bins_x).map(move |ix| {
                let [r, g, b] = hot(normalize(grid.get(ix, iy), range));
                let x0 = ix as f64 * bin_w;
                let y0 = iy as f64 * bin_h;
                Rectangle::new([(x0, y0), (x0 + bin_w, y0 + bin_h)], RGBColor(r, g, b).filled())
            })
        }))?;

        // Color bar spanning the grid's value range.
        let (lo, hi) = if range.1 > range.0 { range } else { (range.0, range.0 + 1.0) };
        let mut bar = ChartBuilder::on(&bar_area)
            .margin_top(40)
            .margin_bottom(45)
            .margin_right(5)
            .y_label_area_size(colorbar_width.saturating_sub(25))
            .build_cartesian_2d(0.0..1.0, lo..hi)?;
        bar.configure_mesh()
            .disable_mesh()
            .disable_x_axis()
            .y_desc("Adsorbed Molecule Count")
            .y_label_formatter(&|v| format!("{:.1e}", v))
            .draw()?;
        let steps = 64;
        bar.draw_series((0..steps).map(|i| {
            let y0 = lo + (hi - lo) * i as f64 / steps as f64;
            let y1 = lo + (hi - lo) * (i + 1) as f64 / steps as f64;
            let [r, g, b] = hot((i as f64 + 0.5) / steps as f64);
            Rectangle::new([(0.0, y0), (1.0, y1)], RGBColor(r, g, b).filled())
        }))?;

        root.present()?;
    }
    RgbImage::from_raw(width, height, buffer).context("Frame buffer size mismatch")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hot_colormap_endpoints() {
        assert_eq!(hot(0.0), [0, 0, 0]);
        assert_eq!(hot(1.0), [255, 255, 255]);
        assert_eq!(hot(0.365), [255, 0, 0]);
        assert_eq!(hot(0.746), [255, 255, 0]);
        assert_eq!(hot(-3.0), hot(0.0));
        assert_eq!(hot(f64::NAN), hot(0.0));
    }

    #[test]
    fn hot_colormap_is_monotone_in_brightness() {
        let brightness = |t: f64| hot(t).iter().map(|&c| c as u32).sum::<u32>();
        let mut previous = 0;
        for i in 0..=100 {
            let b = brightness(i as f64 / 100.0);
            assert!(b >= previous);
            previous = b;
        }
    }

    #[test]
    fn image_puts_low_y_at_the_bottom() {
        let mut grid = DensityGrid::new(3, 2, 3.0, 2.0);
        grid.add(0, 0, 4.0); // bottom-left bin at the maximum
        let image = grid_to_image(&grid, 2);

        assert_eq!(image.dimensions(), (6, 4));
        assert_eq!(image.get_pixel(0, 3).0, [255, 255, 255]);
        assert_eq!(image.get_pixel(1, 2).0, [255, 255, 255]);
        assert_eq!(image.get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(image.get_pixel(5, 3).0, [0, 0, 0]);
    }

    #[test]
    fn empty_grid_renders_black() {
        let grid = DensityGrid::new(4, 4, 1.0, 1.0);
        assert_eq!(value_range(&grid), (0.0, 0.0));
        let image = grid_to_image(&grid, 1);
        assert!(image.pixels().all(|p| p.0 == [0, 0, 0]));
    }
}
