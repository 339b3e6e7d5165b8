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

//! Iterative calibration of the link speeds.
//!
//! At each iteration, a trip is selected (at random with probability `epsilon2`, otherwise the
//! trip whose modeled duration is the farthest from its observed duration), the speeds of the
//! links of its fastest path are rescaled so that its modeled duration gets closer to the
//! observed one and its ratio is updated.
//! The run stops when the global cost, computed on a rolling sample of random trips, is below the
//! tolerance or when the maximum number of iterations is reached.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;

use crate::errors::CalibrationError;
use crate::logging::{send_warning_at_most_n_times, send_warning_at_most_once, WarningType};
use crate::network::{RoadNetwork, SpeedGraph};
use crate::parameters::CalibrationParameters;
use crate::progress_bar::CalibrationProgressBar;
use crate::trip::{TripIndex, TripPool};
use crate::units::{Distribution, NonNegativeNum};

mod evaluation;
mod observer;
mod random_sample;
mod rescale;
mod results;
mod worst_trip;

pub use self::evaluation::{DurationComparison, PathEvaluator};
pub use self::observer::{CalibrationObserver, NoOutput, ProgressReport};
pub use self::random_sample::{CostFunction, RandomSample};
pub use self::rescale::{LinkRescaler, RescaleOutcome};
pub use self::results::{CalibrationSummary, IterationRecord, TerminationReason};
pub use self::worst_trip::WorstTripIndex;

/// Label of the exports made before the first iteration.
pub const INITIAL_LABEL: &str = "Initial";

/// State of a [CalibrationLoop].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Terminated(TerminationReason),
}

#[derive(Clone, Copy, Debug, Default)]
struct Counters {
    nb_explorations: u64,
    nb_not_improved: u64,
    nb_speed_updates: u64,
    nb_clamped: u64,
}

/// Calibration algorithm.
///
/// The CalibrationLoop owns the [SpeedGraph] during the run and gives it back at the end.
pub struct CalibrationLoop<'a, O> {
    parameters: CalibrationParameters,
    speeds: SpeedGraph,
    evaluator: PathEvaluator<'a>,
    rescaler: LinkRescaler,
    worst_trips: WorstTripIndex,
    sample: RandomSample,
    rng: XorShiftRng,
    observer: O,
    cancel_flag: Option<Arc<AtomicBool>>,
    state: LoopState,
    iteration: u64,
    counters: Counters,
    initial_cost: NonNegativeNum,
    initial_ratios: Option<Distribution<NonNegativeNum>>,
    running_time: Duration,
    progress_bar: CalibrationProgressBar,
}

impl<'a, O: CalibrationObserver> CalibrationLoop<'a, O> {
    /// Creates a new CalibrationLoop, computing the initial ratio of every trip.
    ///
    /// Returns [CalibrationError::NoPath] if a trip cannot be routed.
    pub fn new(
        network: &'a RoadNetwork,
        trips: &'a TripPool,
        speeds: SpeedGraph,
        parameters: CalibrationParameters,
        observer: O,
    ) -> Result<Self, CalibrationError> {
        let mut evaluator = PathEvaluator::new(network, trips);
        info!("Computing the initial ratios of {} trips", trips.len());
        let ratios = trips
            .indices()
            .map(|idx| evaluator.evaluate(idx, &speeds).map(|c| c.ratio))
            .collect::<Result<Vec<_>, _>>()?;
        let initial_ratios = Distribution::from_iterator(ratios.iter().copied());
        let initial_cost = parameters
            .cost_function
            .apply(ratios.iter().copied())
            .unwrap_or_default();
        let worst_trips = WorstTripIndex::new(ratios)?;
        let sample = RandomSample::new(
            trips.len(),
            parameters.check_horizon,
            parameters.cost_function,
        )?;
        Ok(CalibrationLoop {
            rescaler: LinkRescaler::new(parameters.epsilon1),
            rng: XorShiftRng::seed_from_u64(parameters.random_seed),
            progress_bar: CalibrationProgressBar::new(parameters.max_iterations),
            parameters,
            speeds,
            evaluator,
            worst_trips,
            sample,
            observer,
            cancel_flag: None,
            state: LoopState::Running,
            iteration: 0,
            counters: Counters::default(),
            initial_cost,
            initial_ratios,
            running_time: Duration::ZERO,
        })
    }

    /// Sets a flag that stops the run when it is set to `true`.
    ///
    /// The flag is checked once per iteration.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel_flag = Some(flag);
        self
    }

    /// Returns the current state of the loop.
    pub const fn state(&self) -> LoopState {
        self.state
    }

    /// Returns the number of iterations run so far.
    pub const fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Returns the current speeds.
    pub const fn speeds(&self) -> &SpeedGraph {
        &self.speeds
    }

    /// Returns the current ratios of all trips.
    pub const fn worst_trip_index(&self) -> &WorstTripIndex {
        &self.worst_trips
    }

    /// Returns the rolling sample of random trips.
    pub const fn random_sample(&self) -> &RandomSample {
        &self.sample
    }

    /// Returns the current global cost.
    pub fn global_cost(&self) -> NonNegativeNum {
        self.sample.cost()
    }

    fn global_cost_opt(&self) -> Option<NonNegativeNum> {
        (!self.sample.is_empty()).then(|| self.sample.cost())
    }

    /// Returns the reason why the run should stop now, if any.
    fn termination_reason(&self, deadline: Option<Instant>) -> Option<TerminationReason> {
        if self.sample.cost() < NonNegativeNum::from(self.parameters.tolerance) {
            Some(TerminationReason::Converged)
        } else if self.iteration >= self.parameters.max_iterations {
            Some(TerminationReason::MaxIteration)
        } else if self
            .cancel_flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
        {
            Some(TerminationReason::Cancelled)
        } else if deadline.is_some_and(|d| Instant::now() >= d) {
            Some(TerminationReason::DeadlineReached)
        } else {
            None
        }
    }

    /// Selects the trip of the next iteration.
    ///
    /// Returns the trip and `true` if it was drawn at random.
    fn select_trip(&mut self) -> (TripIndex, bool) {
        let u: f64 = self.rng.gen();
        // Strict comparison: `u` can be 0, and `epsilon2 = 0` must never explore.
        if u < self.parameters.epsilon2.value() {
            (self.sample.next_random(&mut self.rng), true)
        } else {
            (self.worst_trips.worst(), false)
        }
    }

    /// Runs one iteration of the algorithm.
    ///
    /// The termination conditions are not checked.
    pub fn step(&mut self) -> Result<IterationRecord, CalibrationError> {
        self.iteration += 1;
        let (trip_idx, explored) = self.select_trip();
        let before = self.evaluator.evaluate(trip_idx, &self.speeds)?;
        if explored {
            self.counters.nb_explorations += 1;
            self.sample.add_recorded_ratio(before.ratio);
        }
        let global_cost = self.sample.cost();
        let factor = self.rescaler.factor(before.ratio);
        let trip = self.evaluator.trips().get(trip_idx)?;
        let rescale = self
            .rescaler
            .apply(&mut self.speeds, trip, &before.path, factor)?;
        self.counters.nb_speed_updates += rescale.nb_updated as u64;
        if rescale.nb_clamped > 0 {
            self.counters.nb_clamped += rescale.nb_clamped as u64;
            send_warning_at_most_once(
                WarningType::SpeedClamped,
                &format!(
                    "Some speeds were clamped to the minimum speed ({})",
                    self.speeds.min_speed()
                ),
            );
        }
        let after = self.evaluator.evaluate(trip_idx, &self.speeds)?;
        let improved = after.deviation() < before.deviation();
        if !improved {
            self.counters.nb_not_improved += 1;
            self.report_not_improved(trip_idx, &before, &after);
        }
        self.worst_trips.update(trip_idx, after.ratio)?;
        self.notify();
        Ok(IterationRecord {
            iteration: self.iteration,
            trip: trip_idx,
            explored,
            ratio_before: before.ratio,
            ratio_after: after.ratio,
            factor,
            improved,
            global_cost,
            rescale,
        })
    }

    fn report_not_improved(
        &self,
        trip_idx: TripIndex,
        before: &DurationComparison,
        after: &DurationComparison,
    ) {
        let network = self.evaluator.network();
        let trip_id = self
            .evaluator
            .trips()
            .get(trip_idx)
            .map(|t| t.id)
            .unwrap_or_default();
        let path: Vec<_> = before
            .path
            .iter()
            .map(|&e| network.original_edge_id_of(e))
            .collect();
        let message = format!(
            "Ratio of trip {trip_id} did not improve: {} -> {} \
            (path: {path:?}, duration: {}, distance: {})",
            before.ratio, after.ratio, before.path_duration, before.path_distance
        );
        if !send_warning_at_most_n_times(
            WarningType::RatioNotImproved,
            &message,
            self.parameters.max_not_improved_warnings,
        ) {
            debug!("{message}");
        }
    }

    fn worst_trip_id(&self) -> u64 {
        self.evaluator
            .trips()
            .get(self.worst_trips.worst())
            .map(|t| t.id)
            .unwrap_or_default()
    }

    /// Sends progress reports and export requests to the observer when needed.
    fn notify(&mut self) {
        let iteration = self.iteration;
        let is_due = |interval: u64| interval > 0 && iteration % interval == 0;
        self.progress_bar.set_position(iteration);
        if is_due(self.parameters.progress_interval) {
            let report = ProgressReport {
                iteration,
                worst_trip: self.worst_trip_id(),
                worst_cost: self.worst_trips.worst_cost(),
                global_cost: self.global_cost_opt(),
            };
            let msg = match report.global_cost {
                Some(cost) => format!("cost: {cost}"),
                None => format!("sample: {}/{}", self.sample.len(), self.parameters.check_horizon),
            };
            self.progress_bar.set(iteration, msg);
            self.progress_bar.suspend(|| {
                debug!(
                    "Iteration {iteration}: worst trip {} (cost {}), global cost {:?}",
                    report.worst_trip, report.worst_cost, report.global_cost
                );
                self.observer.progress(&report);
            });
        }
        if is_due(self.parameters.snapshot_interval) {
            self.snapshot(&iteration.to_string());
        }
        if is_due(self.parameters.checkpoint_interval) {
            let label = format!("_{iteration}");
            if let Err(e) = self.observer.checkpoint_speeds(&self.speeds, &label) {
                error!("Failed to save the speeds at iteration {iteration}: {e:?}");
            }
        }
    }

    fn snapshot(&mut self, label: &str) {
        if let Err(e) = self
            .observer
            .export_ratios(self.worst_trips.ratios(), label)
        {
            error!("Failed to export the ratios ({label}): {e:?}");
        }
        let sample_ratios = self.sample.ratios();
        if let Err(e) = self.observer.plot_ratios(&sample_ratios, label) {
            error!("Failed to plot the ratios ({label}): {e:?}");
        }
    }

    /// Runs iterations until a termination condition is met and returns the reason why the run
    /// stopped.
    ///
    /// If the loop is already terminated, nothing is done.
    pub fn run_iterations(&mut self) -> Result<TerminationReason, CalibrationError> {
        if let LoopState::Terminated(reason) = self.state {
            return Ok(reason);
        }
        let start = Instant::now();
        let deadline = self
            .parameters
            .max_running_time
            .map(|t| start + Duration::from_secs_f64(t.value()));
        info!(
            "Starting calibration with {} trips (max. {} iterations)",
            self.worst_trips.len(),
            self.parameters.max_iterations
        );
        if self.iteration == 0 {
            // The sample is still empty so the initial snapshot shows the ratios of all trips.
            if let Err(e) = self
                .observer
                .export_ratios(self.worst_trips.ratios(), INITIAL_LABEL)
            {
                error!("Failed to export the ratios ({INITIAL_LABEL}): {e:?}");
            }
            if let Err(e) = self
                .observer
                .plot_ratios(self.worst_trips.ratios(), INITIAL_LABEL)
            {
                error!("Failed to plot the ratios ({INITIAL_LABEL}): {e:?}");
            }
        }
        let reason = loop {
            if let Some(reason) = self.termination_reason(deadline) {
                break reason;
            }
            if let Err(e) = self.step() {
                self.running_time += start.elapsed();
                self.progress_bar.finish();
                return Err(e);
            }
        };
        self.running_time += start.elapsed();
        self.state = LoopState::Terminated(reason);
        self.progress_bar.finish();
        if let Err(e) = self.observer.finish() {
            error!("Failed to finalize the outputs: {e:?}");
        }
        info!(
            "Calibration stopped after {} iterations because {reason}",
            self.iteration
        );
        if self.counters.nb_not_improved > 0 {
            warn!(
                "The ratio did not improve in {} iterations",
                self.counters.nb_not_improved
            );
        }
        Ok(reason)
    }

    /// Returns a summary of the run.
    ///
    /// Returns `None` if the loop is not terminated.
    pub fn summary(&self) -> Option<CalibrationSummary> {
        match self.state {
            LoopState::Terminated(reason) => Some(self.build_summary(reason)),
            LoopState::Running => None,
        }
    }

    fn build_summary(&self, termination: TerminationReason) -> CalibrationSummary {
        let cost_function = self.parameters.cost_function;
        CalibrationSummary {
            iterations: self.iteration,
            termination,
            initial_cost: self.initial_cost,
            final_cost: cost_function
                .apply(self.worst_trips.ratios().iter().copied())
                .unwrap_or_default(),
            final_global_cost: self.global_cost_opt(),
            final_worst_trip: self.worst_trip_id(),
            final_worst_cost: self.worst_trips.worst_cost(),
            nb_explorations: self.counters.nb_explorations,
            nb_not_improved: self.counters.nb_not_improved,
            nb_speed_updates: self.counters.nb_speed_updates,
            nb_clamped: self.counters.nb_clamped,
            initial_ratios: self.initial_ratios.clone(),
            final_ratios: Distribution::from_iterator(self.worst_trips.ratios().iter().copied()),
            running_time: self.running_time,
        }
    }

    /// Returns the speeds, consuming the loop.
    pub fn into_speeds(self) -> SpeedGraph {
        self.speeds
    }

    /// Runs iterations until a termination condition is met.
    ///
    /// Returns the calibrated speeds and a summary of the run.
    pub fn run(mut self) -> Result<(SpeedGraph, CalibrationSummary), CalibrationError> {
        let reason = self.run_iterations()?;
        let summary = self.build_summary(reason);
        Ok((self.speeds, summary))
    }
}
