//! Half-open, fixed-step ranges of timestamps.

use crate::error::ConfigError;
use usagegen_core::Timestamp;

/// The timestamps `start, start + step, ...` strictly below `end`.
///
/// A window is a plain value: every call to `iter()` starts over from
/// `start`, so the same window always yields the same sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: Timestamp,
    end: Timestamp,
    step: i64,
}

impl TimeWindow {
    /// Fails with `ConfigError::NonPositiveStep` if `step <= 0`.
    /// `start >= end` is allowed and yields no timestamps.
    pub fn new(start: Timestamp, end: Timestamp, step: i64) -> Result<Self, ConfigError> {
        if step <= 0 {
            return Err(ConfigError::NonPositiveStep(step));
        }
        Ok(Self { start, end, step })
    }

    pub fn start(&self) -> Timestamp {
        self.start
    }

    pub fn end(&self) -> Timestamp {
        self.end
    }

    pub fn step(&self) -> i64 {
        self.step
    }

    pub fn iter(&self) -> TimeWindowIter {
        TimeWindowIter {
            next: Some(self.start),
            end: self.end,
            step: self.step,
        }
    }

    /// Number of timestamps in the window
    pub fn len(&self) -> usize {
        remaining(self.start, self.end, self.step)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

impl IntoIterator for &TimeWindow {
    type Item = Timestamp;
    type IntoIter = TimeWindowIter;

    fn into_iter(self) -> TimeWindowIter {
        self.iter()
    }
}

fn remaining(from: Timestamp, end: Timestamp, step: i64) -> usize {
    if from >= end {
        return 0;
    }
    let span = end as i128 - from as i128;
    let count = (span - 1) / step as i128 + 1;
    usize::try_from(count).unwrap_or(usize::MAX)
}

/// Lazy iterator over a `TimeWindow`
#[derive(Debug, Clone)]
pub struct TimeWindowIter {
    next: Option<Timestamp>,
    end: Timestamp,
    step: i64,
}

impl Iterator for TimeWindowIter {
    type Item = Timestamp;

    fn next(&mut self) -> Option<Timestamp> {
        let current = self.next?;
        if current >= self.end {
            self.next = None;
            return None;
        }
        // Overflow ends the sequence
        self.next = current.checked_add(self.step);
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self
            .next
            .map_or(0, |next| remaining(next, self.end, self.step));
        (n, Some(n))
    }
}

impl ExactSizeIterator for TimeWindowIter {}

impl std::iter::FusedIterator for TimeWindowIter {}
