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

//! Index of the trip with the worst fit.
use std::cmp::Reverse;

use hashbrown::hash_map::DefaultHashBuilder;
use priority_queue::PriorityQueue;

use crate::errors::CalibrationError;
use crate::trip::{trip_index, TripIndex};
use crate::units::NonNegativeNum;

/// Current ratio of every trip of the pool, with fast access to the trip whose ratio is the
/// farthest from one.
///
/// When two trips have the same deviation, the trip with the smallest index is the worst.
#[derive(Clone, Debug)]
pub struct WorstTripIndex {
    ratios: Vec<NonNegativeNum>,
    queue: PriorityQueue<TripIndex, (NonNegativeNum, Reverse<TripIndex>), DefaultHashBuilder>,
}

impl WorstTripIndex {
    /// Creates a WorstTripIndex from the ratios of all the trips, in index order.
    pub fn new(ratios: Vec<NonNegativeNum>) -> Result<Self, CalibrationError> {
        if ratios.is_empty() {
            return Err(CalibrationError::EmptyTripPool);
        }
        let mut queue = PriorityQueue::with_capacity_and_default_hasher(ratios.len());
        for (i, ratio) in ratios.iter().enumerate() {
            let idx = trip_index(i);
            queue.push(idx, (ratio.deviation_from_one(), Reverse(idx)));
        }
        Ok(WorstTripIndex { ratios, queue })
    }

    /// Replaces the ratio of a trip.
    ///
    /// Returns [CalibrationError::UnknownTrip] if the trip is not in the index.
    pub fn update(
        &mut self,
        trip: TripIndex,
        ratio: NonNegativeNum,
    ) -> Result<(), CalibrationError> {
        let slot = self
            .ratios
            .get_mut(trip.index())
            .ok_or(CalibrationError::UnknownTrip(trip.index()))?;
        *slot = ratio;
        let old = self
            .queue
            .change_priority(&trip, (ratio.deviation_from_one(), Reverse(trip)));
        debug_assert!(old.is_some());
        Ok(())
    }

    /// Returns the trip whose ratio is the farthest from one.
    pub fn worst(&self) -> TripIndex {
        // The index is never empty.
        self.queue
            .peek()
            .map(|(&idx, _)| idx)
            .unwrap_or_default()
    }

    /// Returns the absolute deviation from one of the ratio of the worst trip.
    pub fn worst_cost(&self) -> NonNegativeNum {
        self.queue
            .peek()
            .map(|(_, &(deviation, _))| deviation)
            .unwrap_or_default()
    }

    /// Returns the current ratio of a trip.
    pub fn ratio(&self, trip: TripIndex) -> Option<NonNegativeNum> {
        self.ratios.get(trip.index()).copied()
    }

    /// Returns the current ratios of all trips, in index order.
    pub fn ratios(&self) -> &[NonNegativeNum] {
        &self.ratios
    }

    /// Returns the number of trips in the index.
    pub fn len(&self) -> usize {
        self.ratios.len()
    }

    /// Returns `true` if the index has no trip.
    pub fn is_empty(&self) -> bool {
        self.ratios.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(x: f64) -> NonNegativeNum {
        NonNegativeNum::try_from(x).unwrap()
    }

    #[test]
    fn worst_trip_test() {
        let mut index = WorstTripIndex::new(vec![num(1.1), num(0.6), num(1.3)]).unwrap();
        assert_eq!(index.worst(), trip_index(1));
        assert!((index.worst_cost().value() - 0.4).abs() < 1e-12);
        index.update(trip_index(1), num(1.0)).unwrap();
        assert_eq!(index.worst(), trip_index(2));
        index.update(trip_index(2), num(0.95)).unwrap();
        assert_eq!(index.worst(), trip_index(0));
        assert_eq!(index.ratio(trip_index(2)), Some(num(0.95)));
        assert_eq!(index.ratios(), &[num(1.1), num(1.0), num(0.95)]);
        assert_eq!(
            index.update(trip_index(3), num(1.0)),
            Err(CalibrationError::UnknownTrip(3))
        );
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn tie_test() {
        // Ratios 1.5 and 0.5 have the same deviation: the first trip wins.
        let mut index = WorstTripIndex::new(vec![num(1.0), num(1.5), num(0.5)]).unwrap();
        assert_eq!(index.worst(), trip_index(1));
        index.update(trip_index(1), num(1.0)).unwrap();
        assert_eq!(index.worst(), trip_index(2));
        index.update(trip_index(1), num(0.5)).unwrap();
        assert_eq!(index.worst(), trip_index(1));
    }

    #[test]
    fn empty_test() {
        assert_eq!(
            WorstTripIndex::new(Vec::new()).unwrap_err(),
            CalibrationError::EmptyTripPool
        );
    }
}
