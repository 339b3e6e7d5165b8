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

//! Min-priority queue with a decrease-key operation.
use std::cmp::Reverse;
use std::hash::Hash;

use hashbrown::hash_map::DefaultHashBuilder;
use priority_queue::PriorityQueue;

/// A priority queue where the item with the smallest value is popped first.
#[derive(Clone, Debug)]
pub struct MinQueue<K: Hash + Eq, V: Ord> {
    queue: PriorityQueue<K, Reverse<V>, DefaultHashBuilder>,
}

impl<K: Hash + Eq, V: Ord> Default for MinQueue<K, V> {
    fn default() -> Self {
        MinQueue {
            queue: PriorityQueue::with_default_hasher(),
        }
    }
}

impl<K: Hash + Eq, V: Ord> MinQueue<K, V> {
    /// Removes all the items from the queue.
    pub fn reset(&mut self) {
        self.queue.clear();
    }

    /// Inserts a new item in the queue.
    pub fn push(&mut self, key: K, value: V) {
        self.queue.push(key, Reverse(value));
    }

    /// Decreases the value of an item, or inserts the item if it is not in the queue.
    ///
    /// Nothing happens if the item is already in the queue with a smaller value.
    pub fn decrease_value(&mut self, key: K, value: V) {
        // Decreasing the value = increasing the priority.
        self.queue.push_increase(key, Reverse(value));
    }

    /// Pops the item with the smallest value.
    pub fn pop(&mut self) -> Option<(K, V)> {
        self.queue.pop().map(|(k, rev_v)| (k, rev_v.0))
    }

    /// Returns the item with the smallest value, without removing it.
    pub fn peek(&self) -> Option<(&K, &V)> {
        self.queue.peek().map(|(k, rev_v)| (k, &rev_v.0))
    }

    /// Returns `true` if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_queue_test() {
        let mut queue = MinQueue::default();
        queue.push('a', 3);
        queue.push('b', 2);
        assert_eq!(queue.peek(), Some((&'b', &2)));
        queue.decrease_value('a', 1);
        // Increasing the value has no effect.
        queue.decrease_value('b', 5);
        assert_eq!(queue.pop(), Some(('a', 1)));
        assert_eq!(queue.pop(), Some(('b', 2)));
        assert_eq!(queue.pop(), None);
        assert!(queue.is_empty());
        queue.push('c', 5);
        queue.reset();
        assert_eq!(queue.peek(), None);
    }
}
