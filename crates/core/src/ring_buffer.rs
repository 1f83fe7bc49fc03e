//! Fixed-capacity history buffers.
//!
//! [`RingBuffer`] is a FIFO that evicts its oldest element on overflow.
//! [`MetricStore`] keeps one ring buffer per `(slot, category)` series.

use std::collections::{btree_map, vec_deque, BTreeMap, VecDeque};

use crate::sample::{Category, Sample, Slot};

/// Default number of samples retained per series (5 minutes at 5 s).
pub const DEFAULT_CAPACITY: usize = 60;

/// Bounded FIFO buffer.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an item, returning the evicted oldest item if the buffer was full.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.items.len() == self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    pub fn latest(&self) -> Option<&T> {
        self.items.back()
    }

    /// Oldest to newest.
    pub fn iter(&self) -> vec_deque::Iter<'_, T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Per-series sample history keyed by `(slot, category)`.
///
/// Backed by a `BTreeMap` so iteration (and therefore export) order is
/// stable across requests.
#[derive(Debug, Clone)]
pub struct MetricStore {
    series: BTreeMap<(Slot, Category), RingBuffer<Sample>>,
    capacity: usize,
}

impl MetricStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            series: BTreeMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Append a sample to its series, evicting the oldest one on overflow.
    pub fn record(&mut self, sample: Sample) -> Option<Sample> {
        let capacity = self.capacity;
        self.series
            .entry((sample.slot(), sample.category()))
            .or_insert_with(|| RingBuffer::new(capacity))
            .push(sample)
    }

    pub fn latest(&self, slot: Slot, category: Category) -> Option<&Sample> {
        self.series.get(&(slot, category)).and_then(RingBuffer::latest)
    }

    pub fn series(&self, slot: Slot, category: Category) -> Option<&RingBuffer<Sample>> {
        self.series.get(&(slot, category))
    }

    /// Mean value over the retained samples of a series.
    pub fn average(&self, slot: Slot, category: Category) -> Option<f64> {
        let buffer = self.series.get(&(slot, category))?;
        if buffer.is_empty() {
            return None;
        }
        let sum: f64 = buffer.iter().map(Sample::value).sum();
        Some(sum / buffer.len() as f64)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, (Slot, Category), RingBuffer<Sample>> {
        self.series.iter()
    }

    /// Number of series (not samples) held.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::sample::SampleSource;

    fn sample_at(secs: i64, value: f64) -> Sample {
        let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::seconds(secs);
        Sample::new(Slot::Blue, Category::Latency, value, ts, SampleSource::Poll)
    }

    #[test]
    fn push_below_capacity_evicts_nothing() {
        let mut buf = RingBuffer::new(3);
        assert_eq!(buf.push(1), None);
        assert_eq!(buf.push(2), None);
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn push_past_capacity_evicts_oldest() {
        let mut buf = RingBuffer::new(3);
        for i in 1..=3 {
            buf.push(i);
        }
        assert_eq!(buf.push(4), Some(1));
        assert_eq!(buf.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
        assert_eq!(buf.latest(), Some(&4));
    }

    #[test]
    fn zero_capacity_is_clamped_to_one() {
        let mut buf = RingBuffer::new(0);
        assert_eq!(buf.capacity(), 1);
        buf.push("a");
        assert_eq!(buf.push("b"), Some("a"));
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn never_exceeds_capacity_and_keeps_most_recent_in_order() {
        for capacity in [1usize, 5, 60] {
            for ticks in [0usize, 1, 4, 5, 6, 61, 200] {
                let mut store = MetricStore::new(capacity);
                for t in 0..ticks {
                    store.record(sample_at(t as i64, t as f64));
                }
                let Some(series) = store.series(Slot::Blue, Category::Latency) else {
                    assert_eq!(ticks, 0);
                    continue;
                };
                assert!(series.len() <= capacity);
                assert_eq!(series.len(), ticks.min(capacity));

                let values: Vec<f64> = series.iter().map(Sample::value).collect();
                let expected: Vec<f64> = (ticks - ticks.min(capacity)..ticks)
                    .map(|t| t as f64)
                    .collect();
                assert_eq!(values, expected);
                assert!(series
                    .iter()
                    .zip(series.iter().skip(1))
                    .all(|(a, b)| a.timestamp() < b.timestamp()));
            }
        }
    }

    #[test]
    fn series_are_isolated_by_slot_and_category() {
        let mut store = MetricStore::new(2);
        let now = Utc::now();
        store.record(Sample::new(Slot::Blue, Category::Latency, 10.0, now, SampleSource::Poll));
        store.record(Sample::new(Slot::Green, Category::Latency, 20.0, now, SampleSource::Poll));
        store.record(Sample::flag(Slot::Blue, Category::Health, true, now, SampleSource::Poll));

        assert_eq!(store.len(), 3);
        assert_eq!(store.latest(Slot::Blue, Category::Latency).unwrap().value(), 10.0);
        assert_eq!(store.latest(Slot::Green, Category::Latency).unwrap().value(), 20.0);
        assert!(store.latest(Slot::Green, Category::Health).is_none());
    }

    #[test]
    fn average_covers_only_retained_samples() {
        let mut store = MetricStore::new(2);
        store.record(sample_at(0, 100.0));
        store.record(sample_at(1, 10.0));
        store.record(sample_at(2, 20.0));
        assert_eq!(store.average(Slot::Blue, Category::Latency), Some(15.0));
        assert_eq!(store.average(Slot::Green, Category::Latency), None);
    }

    #[test]
    fn iteration_order_is_stable() {
        let mut store = MetricStore::new(4);
        let now = Utc::now();
        store.record(Sample::new(Slot::Game, Category::Fps, 60.0, now, SampleSource::Stream));
        store.record(Sample::new(Slot::Green, Category::Health, 1.0, now, SampleSource::Poll));
        store.record(Sample::new(Slot::Blue, Category::Latency, 3.0, now, SampleSource::Poll));
        store.record(Sample::new(Slot::Blue, Category::Health, 1.0, now, SampleSource::Poll));

        let keys: Vec<_> = store.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            keys,
            vec![
                (Slot::Blue, Category::Health),
                (Slot::Blue, Category::Latency),
                (Slot::Green, Category::Health),
                (Slot::Game, Category::Fps),
            ]
        );
    }
}
