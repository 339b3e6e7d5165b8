// This file is part of Metropolis-Calibration.
// Copyright © 2022, 2023, 2024, 2025 André de Palma, Lucas Javaudin
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Output files written during a calibration run.
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{error, info};
use serde_derive::Serialize;

use super::json::{write_compressed_json, write_json};
use crate::calibration::{CalibrationObserver, ProgressReport};
use crate::network::{RoadNetwork, SpeedGraph};
use crate::parameters::SavingFormat;
use crate::units::NonNegativeNum;

/// Width of the bins of the ratio histograms.
const HISTOGRAM_BIN_WIDTH: f64 = 0.02;
/// Range of the ratio histograms.
const HISTOGRAM_RANGE: [f64; 2] = [0.0, 20.0];

/// Histogram of a set of ratios.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Histogram {
    /// Lower bound of the first bin.
    pub min: f64,
    /// Width of the bins.
    pub bin_width: f64,
    /// Share of the ratios in each bin, in percent.
    pub shares: Vec<f64>,
    /// Number of ratios.
    pub count: usize,
    /// Number of ratios outside of the histogram range.
    pub nb_outside: usize,
}

impl Histogram {
    /// Computes the histogram of the given ratios.
    pub fn new(ratios: &[NonNegativeNum], bin_width: f64, range: [f64; 2]) -> Self {
        let [min, max] = range;
        let nb_bins = ((max - min) / bin_width).round() as usize;
        let mut counts = vec![0usize; nb_bins];
        let mut nb_outside = 0;
        for ratio in ratios {
            let bin = ((ratio.value() - min) / bin_width).floor();
            if bin < 0.0 || bin as usize >= nb_bins {
                nb_outside += 1;
            } else {
                counts[bin as usize] += 1;
            }
        }
        let count = ratios.len();
        let shares = counts
            .into_iter()
            .map(|c| {
                if count > 0 {
                    100.0 * c as f64 / count as f64
                } else {
                    0.0
                }
            })
            .collect();
        Histogram {
            min,
            bin_width,
            shares,
            count,
            nb_outside,
        }
    }
}

/// A [CalibrationObserver] writing the exports to files.
///
/// - Ratios are written to `{output_dir}/diff/diff{label}.json`.
/// - Histograms are written to `{output_dir}/plot/histogram_{label}.json`.
/// - Speeds are written to `{output_dir}/link_speeds{label}.json(.zst)`.
/// - Progress reports are logged and appended to `{output_dir}/progress.jsonl`, one JSON object
///   per line.
#[derive(Debug)]
pub struct FileOutput<'a> {
    network: &'a RoadNetwork,
    output_dir: PathBuf,
    saving_format: SavingFormat,
    progress_writer: BufWriter<File>,
}

impl<'a> FileOutput<'a> {
    /// Creates a FileOutput, creating the output directories if needed.
    pub fn new(
        network: &'a RoadNetwork,
        output_dir: &Path,
        saving_format: SavingFormat,
    ) -> Result<Self> {
        for subdir in ["diff", "plot"] {
            let dir = output_dir.join(subdir);
            fs::create_dir_all(&dir)
                .with_context(|| format!("Cannot create output directory `{dir:?}`"))?;
        }
        let progress_filename = output_dir.join("progress.jsonl");
        let progress_file = File::create(&progress_filename)
            .with_context(|| format!("Unable to create file `{progress_filename:?}`"))?;
        Ok(FileOutput {
            network,
            output_dir: output_dir.to_path_buf(),
            saving_format,
            progress_writer: BufWriter::new(progress_file),
        })
    }

    fn write_report(&mut self, report: &ProgressReport) -> Result<()> {
        serde_json::to_writer(&mut self.progress_writer, report)?;
        self.progress_writer.write_all(b"\n")?;
        Ok(())
    }

    /// Writes the link speeds, in the configured format, with name `link_speeds{label}`.
    pub fn save_speeds(&self, speeds: &SpeedGraph, label: &str) -> Result<PathBuf> {
        let records = speeds.to_records(self.network);
        let name = format!("link_speeds{label}");
        match self.saving_format {
            SavingFormat::JSON => write_json(records, &self.output_dir, &name),
            SavingFormat::ZstdJSON => write_compressed_json(records, &self.output_dir, &name),
        }
    }
}

impl CalibrationObserver for FileOutput<'_> {
    fn progress(&mut self, report: &ProgressReport) {
        info!("Iteration {}", report.iteration);
        info!(
            "Worst trip: {} (cost: {})",
            report.worst_trip, report.worst_cost
        );
        match report.global_cost {
            Some(cost) => info!("Global cost: {cost}"),
            None => info!("Global cost: not available yet"),
        }
        if let Err(e) = self.write_report(report) {
            error!("Failed to write the progress report: {e:?}");
        }
    }

    fn export_ratios(&mut self, ratios: &[NonNegativeNum], label: &str) -> Result<()> {
        write_json(ratios, &self.output_dir.join("diff"), &format!("diff{label}"))?;
        Ok(())
    }

    fn plot_ratios(&mut self, ratios: &[NonNegativeNum], label: &str) -> Result<()> {
        let histogram = Histogram::new(ratios, HISTOGRAM_BIN_WIDTH, HISTOGRAM_RANGE);
        write_json(
            histogram,
            &self.output_dir.join("plot"),
            &format!("histogram_{label}"),
        )?;
        Ok(())
    }

    fn checkpoint_speeds(&mut self, speeds: &SpeedGraph, label: &str) -> Result<()> {
        let filename = self.save_speeds(speeds, label)?;
        info!("Link speeds saved to `{filename:?}`");
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.progress_writer
            .flush()
            .context("Unable to write the progress reports")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::tests::line_network;

    fn num(x: f64) -> NonNegativeNum {
        NonNegativeNum::try_from(x).unwrap()
    }

    #[test]
    fn histogram_test() {
        let ratios = [num(0.0), num(0.01), num(1.01), num(1.015), num(25.0)];
        let histogram = Histogram::new(&ratios, HISTOGRAM_BIN_WIDTH, HISTOGRAM_RANGE);
        assert_eq!(histogram.shares.len(), 1000);
        assert_eq!(histogram.count, 5);
        assert_eq!(histogram.nb_outside, 1);
        assert_eq!(histogram.shares[0], 40.0);
        assert_eq!(histogram.shares[50], 40.0);
        assert_eq!(histogram.shares.iter().sum::<f64>(), 80.0);
        let empty = Histogram::new(&[], HISTOGRAM_BIN_WIDTH, HISTOGRAM_RANGE);
        assert!(empty.shares.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn progress_file_test() {
        let network = line_network();
        let dir = std::env::temp_dir().join(format!("calibration_progress_{}", std::process::id()));
        let mut output = FileOutput::new(&network, &dir, SavingFormat::JSON).unwrap();
        for iteration in [10, 20, 30] {
            output.progress(&ProgressReport {
                iteration,
                worst_trip: 3,
                worst_cost: num(0.5),
                global_cost: (iteration > 10).then(|| num(0.1)),
            });
        }
        output.finish().unwrap();
        let content = fs::read_to_string(dir.join("progress.jsonl")).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["iteration"].as_u64(), Some(10));
        assert!(lines[0]["global_cost"].is_null());
        assert_eq!(lines[2]["global_cost"].as_f64(), Some(0.1));
        fs::remove_dir_all(&dir).unwrap();
    }
}
