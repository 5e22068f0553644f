use crate::run_state::PointCloud;
use adsorption_common::{DensityGrid, OutputConfig, RunRecord, TimeSeriesSample};
use anyhow::{Context, Result};
use log::{error, info, warn};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Serialization format of the run record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
    Json,
    Bincode,
    MessagePack,
}

impl RecordFormat {
    /// Reads the configured format name. Unknown names fall back to JSON.
    pub fn from_config(name: Option<&str>) -> Self {
        match name.unwrap_or("json") {
            "json" => RecordFormat::Json,
            "bincode" => RecordFormat::Bincode,
            "messagepack" => RecordFormat::MessagePack,
            other => {
                error!("Unknown output format: {}. Using JSON instead.", other);
                RecordFormat::Json
            }
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            RecordFormat::Json => "json",
            RecordFormat::Bincode => "bin",
            RecordFormat::MessagePack => "msgpack",
        }
    }
}

/// Writes the run record in the configured format and returns its path.
pub fn save_run_record(record: &RunRecord, output: &OutputConfig, dir: &Path) -> Result<PathBuf> {
    let format = RecordFormat::from_config(output.format.as_deref());
    let path = dir.join(format!("{}_run.{}", output.base_filename, format.extension()));
    let file = File::create(&path)
        .with_context(|| format!("Error creating run record file '{}'", path.display()))?;
    let mut writer = BufWriter::new(file);

    match format {
        RecordFormat::Json => serde_json::to_writer(&mut writer, record)
            .context("Error serializing run record to JSON")?,
        RecordFormat::Bincode => bincode::serialize_into(&mut writer, record)
            .context("Error serializing run record to bincode")?,
        RecordFormat::MessagePack => rmp_serde::encode::write(&mut writer, record)
            .context("Error serializing run record to MessagePack")?,
    }
    writer.flush()?;

    info!("Run record saved to {} ({} frames)", path.display(), record.frames.len());
    Ok(path)
}

/// One row per recorded second.
pub fn write_time_series_csv(samples: &[TimeSeriesSample], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Error creating CSV file '{}'", path.display()))?;
    writer.write_record(["time_s", "adsorbed_molecules", "coverage", "resistance_ohm"])?;
    for s in samples {
        writer.write_record(&[
            s.time_s.to_string(),
            s.total_adsorbed.to_string(),
            format!("{:.6}", s.coverage),
            format!("{:.6}", s.resistance_ohm),
        ])?;
    }
    writer.flush()?;
    info!("Time series saved to {}", path.display());
    Ok(())
}

/// Grid counts, one row per y bin starting at y = 0.
pub fn write_grid_csv(grid: &DensityGrid, path: &Path) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Error creating CSV file '{}'", path.display()))?;
    for row in grid.rows() {
        writer.write_record(row.iter().map(|c| c.to_string()))?;
    }
    writer.flush()?;
    info!("Final density grid saved to {}", path.display());
    Ok(())
}

/// Every materialized event with the molecule weight it represents.
pub fn write_positions_csv(cloud: &PointCloud, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Error creating CSV file '{}'", path.display()))?;
    if cloud.batches().iter().any(|b| !b.is_exact()) {
        warn!("Some frames exceeded max_events_per_frame; exported positions are a weighted sample.");
    }
    writer.write_record(["x_mm", "y_mm", "z_mm", "weight"])?;
    for (event, weight) in cloud.weighted_events() {
        writer.write_record(&[
            format!("{:.4}", event.x),
            format!("{:.4}", event.y),
            format!("{:.4}", event.z),
            weight.to_string(),
        ])?;
    }
    writer.flush()?;
    info!("{} positions saved to {}", cloud.materialized_len(), path.display());
    Ok(())
}

/// Writes the record and the CSV exports enabled in `output`.
pub fn save_all(record: &RunRecord, cloud: &PointCloud, output: &OutputConfig, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory '{}'", dir.display()))?;
    let record_path = save_run_record(record, output, dir)?;

    if output.save_time_series {
        let path = dir.join(format!("{}_time_series.csv", output.base_filename));
        write_time_series_csv(&record.time_series, &path)?;
    }
    if output.save_final_grid {
        if let Some(grid) = record.final_grid() {
            let path = dir.join(format!("{}_final_grid.csv", output.base_filename));
            write_grid_csv(grid, &path)?;
        }
    }
    if output.save_positions {
        let path = dir.join(format!("{}_positions.csv", output.base_filename));
        write_positions_csv(cloud, &path)?;
    } else {
        info!("Skipping saving positions as per config.");
    }
    Ok(record_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::AdsorptionSimulation;
    use adsorption_common::{Morphology, SimulationConfig, SimulationParameters};

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("adsorption-engine-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn small_run() -> (RunRecord, AdsorptionSimulation) {
        let mut config = SimulationConfig::default();
        config.run.seed = Some(17);
        let mut sim = AdsorptionSimulation::new(config).unwrap();
        let params = SimulationParameters::new(Morphology::Rod, 1e-15, 1.0, 1000.0, 2.0).unwrap();
        let record = sim.run(params, |_| {}).unwrap();
        (record, sim)
    }

    #[test]
    fn format_names() {
        assert_eq!(RecordFormat::from_config(None), RecordFormat::Json);
        assert_eq!(RecordFormat::from_config(Some("bincode")).extension(), "bin");
        assert_eq!(RecordFormat::from_config(Some("messagepack")), RecordFormat::MessagePack);
        assert_eq!(RecordFormat::from_config(Some("yaml")), RecordFormat::Json);
    }

    #[test]
    fn json_record_reads_back() {
        let (record, _) = small_run();
        let dir = scratch_dir("json");
        let path = save_run_record(&record, &OutputConfig::default(), &dir).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let loaded: RunRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(loaded.frames.len(), 50);
        assert_eq!(loaded.time_series.len(), 10);
        for (a, b) in loaded.time_series.iter().zip(&record.time_series) {
            assert_eq!((a.time_s, a.total_adsorbed), (b.time_s, b.total_adsorbed));
            assert!((a.resistance_ohm - b.resistance_ohm).abs() < 1e-9);
        }
        // Integer-valued counts survive the text round trip exactly.
        assert_eq!(loaded.final_grid(), record.final_grid());
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn csv_exports_have_expected_shape() {
        let (record, sim) = small_run();
        let dir = scratch_dir("csv");
        let mut output = OutputConfig::default();
        output.save_positions = true;
        output.format = Some("bincode".to_string());
        save_all(&record, sim.point_cloud(), &output, &dir).unwrap();

        let series = std::fs::read_to_string(dir.join("adsorption_time_series.csv")).unwrap();
        let lines: Vec<&str> = series.lines().collect();
        assert_eq!(lines.len(), 11);
        assert_eq!(lines[0], "time_s,adsorbed_molecules,coverage,resistance_ohm");
        assert!(lines[1].starts_with("1,"));

        let grid = std::fs::read_to_string(dir.join("adsorption_final_grid.csv")).unwrap();
        assert_eq!(grid.lines().count(), 50);
        assert!(grid.lines().all(|l| l.split(',').count() == 50));

        let positions = std::fs::read_to_string(dir.join("adsorption_positions.csv")).unwrap();
        assert_eq!(positions.lines().count() - 1, sim.point_cloud().materialized_len());
        assert!(dir.join("adsorption_run.bin").exists());
        std::fs::remove_dir_all(dir).ok();
    }
}
