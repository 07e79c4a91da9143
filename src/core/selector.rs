use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// Default number of candidates kept through selection
pub const DEFAULT_TOP_K: usize = 100;

/// Scores below this never enter the working set
pub const DEFAULT_MIN_SCORE: f64 = 0.05;

/// Ordering key: higher score is better, earlier arrival breaks ties
#[derive(Debug, Clone, Copy)]
struct RankKey {
    score: f64,
    arrival: u64,
}

impl PartialEq for RankKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RankKey {}

impl Ord for RankKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.arrival.cmp(&self.arrival))
    }
}

impl PartialOrd for RankKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Heap entry; only the key takes part in comparisons
#[derive(Debug)]
struct Entry<T> {
    key: RankKey,
    payload: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<T> Eq for Entry<T> {}

impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A payload that made the cut
#[derive(Debug, Clone)]
pub struct Selected<T> {
    pub score: f64,
    /// Position in the offered stream, 0-based
    pub arrival: u64,
    pub payload: T,
}

/// Keeps the `k` best-scoring payloads of an unbounded stream.
///
/// Backed by a min-heap of at most `k` entries so the current worst is
/// always at the top: O(N log K) time and O(K) space.
#[derive(Debug)]
pub struct TopKSelector<T> {
    k: usize,
    min_score: f64,
    heap: BinaryHeap<Reverse<Entry<T>>>,
    arrivals: u64,
}

impl<T> TopKSelector<T> {
    pub fn new(k: usize, min_score: f64) -> Self {
        Self {
            k,
            min_score,
            heap: BinaryHeap::with_capacity(k.min(4096)),
            arrivals: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Number of payloads offered so far
    pub fn offered(&self) -> u64 {
        self.arrivals
    }

    /// Lowest score currently retained
    pub fn threshold(&self) -> Option<f64> {
        self.heap.peek().map(|Reverse(entry)| entry.key.score)
    }

    /// Offer a payload; returns whether it is (for now) in the working set
    pub fn offer(&mut self, score: f64, payload: T) -> bool {
        let arrival = self.arrivals;
        self.arrivals += 1;

        if self.k == 0 || !score.is_finite() || score < self.min_score {
            return false;
        }

        let entry = Entry {
            key: RankKey { score, arrival },
            payload,
        };

        if self.heap.len() < self.k {
            self.heap.push(Reverse(entry));
            return true;
        }

        // Replace the current minimum only on a strictly greater score
        match self.heap.peek_mut() {
            Some(mut worst) if score > worst.0.key.score => {
                *worst = Reverse(entry);
                true
            }
            _ => false,
        }
    }

    /// Drain the working set, best first
    pub fn into_sorted_vec(self) -> Vec<Selected<T>> {
        // Ascending order of Reverse<Entry> is descending order of Entry
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|Reverse(entry)| Selected {
                score: entry.key.score,
                arrival: entry.key.arrival,
                payload: entry.payload,
            })
            .collect()
    }
}
