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

//! Metropolis-Calibration: calibration of time-dependent link speeds from observed trips.
//!
//! The link speeds of a road network are iteratively rescaled so that the durations of the
//! fastest paths match the durations of observed trips.
#![doc(html_no_source)]

pub mod calibration;
pub mod errors;
pub mod io;
pub mod logging;
pub mod network;
pub mod parameters;
pub mod progress_bar;
pub mod routing;
pub mod trip;
pub mod units;

use std::env;
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
// Dependencies only used in the bins.
use clap as _;
use log::{error, info, log_enabled};

use crate::calibration::CalibrationLoop;
use crate::io::json::{read_json, write_json};
use crate::io::FileOutput;
use crate::network::{LinkSpeedRecord, RoadNetwork, RoadNetworkInput, SpeedGraph};
use crate::parameters::Parameters;
use crate::progress_bar::Spinner;
use crate::trip::{Trip, TripPool};

/// Reads the input files, runs the calibration and stores the results in the output directory.
///
/// This function takes as argument the path to the `parameters.json` file.
pub fn run_calibration(path: &Path) -> Result<()> {
    let res = run_calibration_imp(path, None::<std::io::Empty>);
    handle_error(res)
}

/// Reads the input files, runs the calibration and stores the results in the output directory.
///
/// This function takes as argument the path to the `parameters.json` file and a writer for the
/// logs.
pub fn run_calibration_with_writer<W: std::io::Write + Send + 'static>(
    path: &Path,
    writer: W,
) -> Result<()> {
    let res = run_calibration_imp(path, Some(writer));
    handle_error(res)
}

fn handle_error(res: Result<()>) -> Result<()> {
    if let Err(err) = res {
        if log_enabled!(log::Level::Error) {
            // Use the `error` macro so that the error is logged to all the loggers.
            error!("{err:?}");
            Ok(())
        } else {
            // Return the error so that it is printed to console.
            Err(anyhow!(err))
        }
    } else {
        Ok(())
    }
}

fn record_time<T>(func: impl FnOnce() -> Result<T>) -> Result<(T, Duration)> {
    let now = Instant::now();
    let result = func()?;
    Ok((result, now.elapsed()))
}

fn run_calibration_imp<W: std::io::Write + Send + 'static>(
    path: &Path,
    writer: Option<W>,
) -> Result<()> {
    println!(
        "
        Metropolis-Calibration v{}
        Copyright (C) 2022-2025 André de Palma, Lucas Javaudin
        This program comes with ABSOLUTELY NO WARRANTY.
        This is free software, and you are welcome to redistribute it
        under certain conditions; see `https://www.gnu.org/licenses/' for details.
        ",
        env!("CARGO_PKG_VERSION")
    );
    let params = Parameters::from_path(path)?;

    // Set the working directory to the directory of the `parameters.json` file so that the input
    // paths can be interpreted as being relative to this file.
    if let Some(parent_dir) = path.parent() {
        // Fix a bug when trying to set the current directory from an empty path.
        if parent_dir.to_str().map(|s| !s.is_empty()).unwrap_or(true) {
            env::set_current_dir(parent_dir)
                .with_context(|| format!("Failed to set working directory to `{parent_dir:?}`"))?;
        }
    }

    // Create output directory if it does not exists yet.
    std::fs::create_dir_all(&params.output_directory).with_context(|| {
        format!(
            "Failed to create output directory `{:?}`",
            params.output_directory
        )
    })?;

    logging::initialize_logging(&params.output_directory, writer)?;

    let mut spinner = Spinner::new("Reading input files");
    let ((network, trips, speeds), reading_time) = record_time(|| read_inputs(&params))?;
    spinner.finish();
    info!("Input files read in {reading_time:?}");

    let mut output = FileOutput::new(&network, &params.output_directory, params.saving_format)?;
    let calibration = CalibrationLoop::new(
        &network,
        &trips,
        speeds,
        params.calibration.clone(),
        &mut output,
    )?;
    let (speeds, summary) = calibration.run()?;

    info!("Saving results");
    let filename = output.save_speeds(&speeds, "")?;
    info!("Calibrated link speeds saved to `{filename:?}`");
    write_json(&summary, &params.output_directory, "summary")?;
    info!(
        "Cost: {} -> {} ({} iterations, {:?})",
        summary.initial_cost, summary.final_cost, summary.iterations, summary.running_time
    );
    info!("Done");
    Ok(())
}

fn read_inputs(params: &Parameters) -> Result<(RoadNetwork, TripPool, SpeedGraph)> {
    let files = &params.input_files;
    let network_input: RoadNetworkInput = read_json(&files.network)?;
    let network = RoadNetwork::from_input(network_input)
        .with_context(|| format!("Invalid road network `{:?}`", files.network))?;
    let trips: Vec<Trip> = read_json(&files.trips)?;
    let trips = TripPool::new(trips, &network)
        .with_context(|| format!("Invalid trips `{:?}`", files.trips))?;
    let speeds = if let Some(speeds_file) = &files.speeds {
        let records: Vec<LinkSpeedRecord> = read_json(speeds_file)?;
        SpeedGraph::from_records(
            &network,
            params.dt,
            params.horizon,
            params.min_speed,
            records,
        )
        .with_context(|| format!("Invalid link speeds `{speeds_file:?}`"))?
    } else {
        SpeedGraph::free_flow(&network, params.dt, params.horizon, params.min_speed)
    };
    Ok((network, trips, speeds))
}
