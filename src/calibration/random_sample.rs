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

//! Rolling sample of the ratios of randomly drawn trips.
use std::collections::VecDeque;

use rand::Rng;
use serde_derive::{Deserialize, Serialize};

use crate::errors::CalibrationError;
use crate::trip::{trip_index, TripIndex};
use crate::units::NonNegativeNum;

/// Statistic used to aggregate a sample of ratios into a global cost.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum CostFunction {
    /// Mean of `|ratio - 1|`.
    #[default]
    MeanAbsoluteDeviation,
    /// Square root of the mean of `(ratio - 1)^2`.
    RootMeanSquareDeviation,
    /// Maximum of `|ratio - 1|`.
    MaxAbsoluteDeviation,
}

impl CostFunction {
    /// Computes the cost of the given ratios.
    ///
    /// Returns `None` if there is no ratio.
    pub fn apply(&self, ratios: impl Iterator<Item = NonNegativeNum>) -> Option<NonNegativeNum> {
        let mut count = 0;
        let mut acc = 0.0f64;
        for dev in ratios.map(NonNegativeNum::deviation_from_one) {
            count += 1;
            match self {
                Self::MeanAbsoluteDeviation => acc += dev.value(),
                Self::RootMeanSquareDeviation => acc += dev.value().powi(2),
                Self::MaxAbsoluteDeviation => acc = acc.max(dev.value()),
            }
        }
        if count == 0 {
            return None;
        }
        let cost = match self {
            Self::MeanAbsoluteDeviation => acc / count as f64,
            Self::RootMeanSquareDeviation => (acc / count as f64).sqrt(),
            Self::MaxAbsoluteDeviation => acc,
        };
        Some(NonNegativeNum::new_unchecked(cost))
    }
}

/// Uniform draws from the trip pool and bounded record of the ratios of the drawn trips.
///
/// The global cost is computed on the recorded ratios; it is equal to [NonNegativeNum::MAX] until
/// a first ratio is recorded.
#[derive(Clone, Debug)]
pub struct RandomSample {
    nb_trips: usize,
    check_horizon: usize,
    cost_function: CostFunction,
    buffer: VecDeque<NonNegativeNum>,
}

impl RandomSample {
    /// Creates an empty sample for a pool of `nb_trips` trips.
    ///
    /// Returns an error if the pool is empty or if `check_horizon` is zero.
    pub fn new(
        nb_trips: usize,
        check_horizon: usize,
        cost_function: CostFunction,
    ) -> Result<Self, CalibrationError> {
        if nb_trips == 0 {
            return Err(CalibrationError::EmptyTripPool);
        }
        if check_horizon == 0 {
            return Err(CalibrationError::InvalidParameter(
                "`check_horizon` must be positive".to_owned(),
            ));
        }
        Ok(RandomSample {
            nb_trips,
            check_horizon,
            cost_function,
            buffer: VecDeque::with_capacity(check_horizon),
        })
    }

    /// Draws a trip uniformly at random from the pool.
    pub fn next_random<R: Rng>(&self, rng: &mut R) -> TripIndex {
        trip_index(rng.gen_range(0..self.nb_trips))
    }

    /// Records the ratio of a drawn trip, evicting the oldest ratio if the sample is full.
    pub fn add_recorded_ratio(&mut self, ratio: NonNegativeNum) {
        while self.buffer.len() >= self.check_horizon {
            self.buffer.pop_front();
        }
        self.buffer.push_back(ratio);
    }

    /// Returns the global cost of the recorded ratios.
    ///
    /// Returns [NonNegativeNum::MAX] while the sample is empty.
    pub fn cost(&self) -> NonNegativeNum {
        self.cost_function
            .apply(self.buffer.iter().copied())
            .unwrap_or(NonNegativeNum::MAX)
    }

    /// Returns `true` if `check_horizon` ratios have been recorded.
    pub fn is_full(&self) -> bool {
        self.buffer.len() >= self.check_horizon
    }

    /// Returns the number of recorded ratios.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns `true` if no ratio has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Returns the recorded ratios, from the oldest to the newest.
    pub fn ratios(&self) -> Vec<NonNegativeNum> {
        self.buffer.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_xorshift::XorShiftRng;

    use super::*;

    fn num(x: f64) -> NonNegativeNum {
        NonNegativeNum::try_from(x).unwrap()
    }

    #[test]
    fn cost_function_test() {
        let ratios = [num(0.5), num(1.0), num(1.25), num(1.25)];
        let mad = CostFunction::MeanAbsoluteDeviation
            .apply(ratios.iter().copied())
            .unwrap();
        assert_eq!(mad.value(), 0.25);
        let rmsd = CostFunction::RootMeanSquareDeviation
            .apply(ratios.iter().copied())
            .unwrap();
        assert!((rmsd.value() - (0.375f64 / 4.).sqrt()).abs() < 1e-12);
        let max = CostFunction::MaxAbsoluteDeviation
            .apply(ratios.iter().copied())
            .unwrap();
        assert_eq!(max.value(), 0.5);
        assert!(CostFunction::default().apply(std::iter::empty()).is_none());
    }

    #[test]
    fn bounded_buffer_test() {
        let mut sample = RandomSample::new(10, 3, CostFunction::MaxAbsoluteDeviation).unwrap();
        assert!(sample.is_empty());
        assert_eq!(sample.cost(), NonNegativeNum::MAX);
        sample.add_recorded_ratio(num(2.0));
        assert_eq!(sample.cost().value(), 1.0);
        sample.add_recorded_ratio(num(1.1));
        assert!(!sample.is_full());
        assert_eq!(sample.cost().value(), 1.0);
        sample.add_recorded_ratio(num(0.9));
        assert!(sample.is_full());
        assert_eq!(sample.cost().value(), 1.0);
        // The oldest ratio (2.0) is evicted first.
        sample.add_recorded_ratio(num(1.0));
        assert_eq!(sample.len(), 3);
        assert_eq!(sample.ratios(), vec![num(1.1), num(0.9), num(1.0)]);
        assert!((sample.cost().value() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn partial_sample_cost_test() {
        let mut sample = RandomSample::new(10, 5, CostFunction::MeanAbsoluteDeviation).unwrap();
        sample.add_recorded_ratio(num(1.0));
        assert_eq!(sample.len(), 1);
        assert_eq!(sample.cost().value(), 0.0);
        sample.add_recorded_ratio(num(1.5));
        assert_eq!(sample.cost().value(), 0.25);
    }

    #[test]
    fn zero_check_horizon_test() {
        assert!(matches!(
            RandomSample::new(10, 0, CostFunction::default()),
            Err(CalibrationError::InvalidParameter(_))
        ));
    }

    #[test]
    fn next_random_test() {
        let sample = RandomSample::new(4, 2, CostFunction::default()).unwrap();
        let mut rng = XorShiftRng::seed_from_u64(7);
        let draws: Vec<_> = (0..100).map(|_| sample.next_random(&mut rng)).collect();
        assert!(draws.iter().all(|idx| idx.index() < 4));
        let mut rng = XorShiftRng::seed_from_u64(7);
        let again: Vec<_> = (0..100).map(|_| sample.next_random(&mut rng)).collect();
        assert_eq!(draws, again);
        assert!(RandomSample::new(0, 2, CostFunction::default()).is_err());
    }
}
