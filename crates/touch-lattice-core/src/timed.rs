//! Time-stamped sample buffer.
//!
//! Used by flick (per-frame movement samples) and tap (recently released
//! pointer positions) to look back over a short time window.

use std::time::{Duration, Instant};

/// An append-only sequence of samples with monotonically increasing timestamps.
#[derive(Debug, Clone)]
pub struct TimedSequence<T> {
    samples: Vec<(Instant, T)>,
}

impl<T> Default for TimedSequence<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimedSequence<T> {
    /// Create an empty sequence.
    pub fn new() -> Self {
        Self {
            samples: Vec::new(),
        }
    }

    /// Append a sample taken at `time`.
    pub fn add(&mut self, item: T, time: Instant) {
        debug_assert!(
            self.samples.last().is_none_or(|(last, _)| *last <= time),
            "timed samples must be appended in order"
        );
        self.samples.push((time, item));
    }

    /// Drop every sample.
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True if there are no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples strictly later than `time`, oldest first.
    pub fn later_than(&self, time: Instant) -> impl Iterator<Item = &T> {
        self.samples[self.split_index(time)..]
            .iter()
            .map(|(_, item)| item)
    }

    /// Samples strictly later than `time` plus the timestamp of the oldest
    /// one returned (`time` itself when nothing qualifies).
    pub fn later_than_with_start(&self, time: Instant) -> (Vec<&T>, Instant) {
        let index = self.split_index(time);
        let start = self.samples.get(index).map_or(time, |(t, _)| *t);
        (self.samples[index..].iter().map(|(_, item)| item).collect(), start)
    }

    /// Samples within `window` before `now`.
    pub fn within(&self, now: Instant, window: Duration) -> impl Iterator<Item = &T> {
        let index = match now.checked_sub(window) {
            Some(cutoff) => self.split_index(cutoff),
            None => 0,
        };
        self.samples[index..].iter().map(|(_, item)| item)
    }

    /// Drop samples at or before `time`.
    pub fn prune(&mut self, time: Instant) {
        let index = self.split_index(time);
        self.samples.drain(..index);
    }

    fn split_index(&self, time: Instant) -> usize {
        self.samples.partition_point(|(t, _)| *t <= time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(base: Instant, millis: u64) -> Instant {
        base + Duration::from_millis(millis)
    }

    #[test]
    fn test_later_than_is_strict_and_ordered() {
        let base = Instant::now();
        let mut seq = TimedSequence::new();
        for i in 0..5u64 {
            seq.add(i, ms(base, i * 10));
        }

        let later: Vec<_> = seq.later_than(ms(base, 20)).copied().collect();
        assert_eq!(later, vec![3, 4]);
        assert_eq!(seq.later_than(ms(base, 40)).count(), 0);
        assert_eq!(seq.len(), 5);
    }

    #[test]
    fn test_later_than_with_start() {
        let base = Instant::now();
        let mut seq = TimedSequence::new();
        seq.add("a", ms(base, 0));
        seq.add("b", ms(base, 50));
        seq.add("c", ms(base, 90));

        let (items, start) = seq.later_than_with_start(ms(base, 10));
        assert_eq!(items, vec![&"b", &"c"]);
        assert_eq!(start, ms(base, 50));

        let (items, start) = seq.later_than_with_start(ms(base, 100));
        assert!(items.is_empty());
        assert_eq!(start, ms(base, 100));
    }

    #[test]
    fn test_within_window() {
        let base = Instant::now() + Duration::from_secs(10);
        let mut seq = TimedSequence::new();
        seq.add(1, ms(base, 0));
        seq.add(2, ms(base, 80));
        seq.add(3, ms(base, 150));

        let recent: Vec<_> = seq
            .within(ms(base, 150), Duration::from_millis(100))
            .copied()
            .collect();
        assert_eq!(recent, vec![2, 3]);
    }

    #[test]
    fn test_prune_and_clear() {
        let base = Instant::now();
        let mut seq = TimedSequence::new();
        seq.add(1, ms(base, 5));
        seq.add(2, ms(base, 10));
        seq.prune(ms(base, 5));
        assert_eq!(seq.later_than(base).count(), 1);
        seq.clear();
        assert!(seq.is_empty());
    }
}
