//! Sets of token types stored as sorted, non-overlapping inclusive ranges.

use std::fmt;

use super::{EOF, EPSILON};

/// Inclusive range of token types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    pub a: i32,
    pub b: i32,
}

impl Interval {
    pub fn new(a: i32, b: i32) -> Self {
        Self { a, b }
    }

    pub fn contains(&self, value: i32) -> bool {
        value >= self.a && value <= self.b
    }

    pub fn len(&self) -> usize {
        (self.b - self.a + 1) as usize
    }
}

/// Set of token types.
///
/// Intervals are kept sorted by start and merged whenever they touch, so
/// two sets with the same members always compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct IntervalSet {
    intervals: Vec<Interval>,
}

impl IntervalSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set holding every value in `a..=b`.
    pub fn of(a: i32, b: i32) -> Self {
        let mut set = Self::new();
        set.add_range(a, b);
        set
    }

    /// Set holding exactly `value`.
    pub fn single(value: i32) -> Self {
        Self::of(value, value)
    }

    pub fn add(&mut self, value: i32) {
        self.add_range(value, value);
    }

    /// Add `a..=b`, merging with any interval it overlaps or touches.
    pub fn add_range(&mut self, a: i32, b: i32) {
        if b < a {
            return;
        }
        let mut merged = Interval::new(a, b);
        let mut result = Vec::with_capacity(self.intervals.len() + 1);
        let mut inserted = false;

        for interval in &self.intervals {
            if interval.b.saturating_add(1) < merged.a {
                result.push(*interval);
            } else if merged.b.saturating_add(1) < interval.a {
                if !inserted {
                    result.push(merged);
                    inserted = true;
                }
                result.push(*interval);
            } else {
                merged = Interval::new(merged.a.min(interval.a), merged.b.max(interval.b));
            }
        }
        if !inserted {
            result.push(merged);
        }
        self.intervals = result;
    }

    pub fn add_set(&mut self, other: &IntervalSet) {
        for interval in &other.intervals {
            self.add_range(interval.a, interval.b);
        }
    }

    pub fn contains(&self, value: i32) -> bool {
        self.intervals
            .binary_search_by(|interval| {
                if interval.b < value {
                    std::cmp::Ordering::Less
                } else if interval.a > value {
                    std::cmp::Ordering::Greater
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok()
    }

    /// Members of `vocabulary` not in this set.
    pub fn complement(&self, vocabulary: &IntervalSet) -> IntervalSet {
        let mut result = IntervalSet::new();
        for range in &vocabulary.intervals {
            let mut next = range.a;
            for interval in &self.intervals {
                if interval.b < next || interval.a > range.b {
                    continue;
                }
                if interval.a > next {
                    result.add_range(next, interval.a - 1);
                }
                next = interval.b.saturating_add(1);
                if next > range.b {
                    break;
                }
            }
            if next <= range.b {
                result.add_range(next, range.b);
            }
        }
        result
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.intervals.iter().map(Interval::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// The only member, if the set has exactly one.
    pub fn singleton(&self) -> Option<i32> {
        match self.intervals.as_slice() {
            [only] if only.a == only.b => Some(only.a),
            _ => None,
        }
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    /// Members in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        self.intervals.iter().flat_map(|interval| interval.a..=interval.b)
    }

    pub fn to_vec(&self) -> Vec<i32> {
        self.iter().collect()
    }
}

impl FromIterator<i32> for IntervalSet {
    fn from_iter<I: IntoIterator<Item = i32>>(iter: I) -> Self {
        let mut set = IntervalSet::new();
        for value in iter {
            set.add(value);
        }
        set
    }
}

fn write_element(f: &mut fmt::Formatter<'_>, value: i32) -> fmt::Result {
    match value {
        EOF => write!(f, "<EOF>"),
        EPSILON => write!(f, "<EPSILON>"),
        _ => write!(f, "{value}"),
    }
}

impl fmt::Display for IntervalSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "{{}}");
        }
        let braces = self.len() > 1;
        if braces {
            write!(f, "{{")?;
        }
        for (i, interval) in self.intervals.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write_element(f, interval.a)?;
            if interval.b != interval.a {
                write!(f, "..")?;
                write_element(f, interval.b)?;
            }
        }
        if braces {
            write!(f, "}}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn test_add_merges_adjacent_and_overlapping() {
        let mut set = IntervalSet::new();
        set.add(5);
        set.add(1);
        set.add_range(2, 3);
        set.add(4);
        set.add_range(10, 12);

        assert_eq!(
            set.intervals(),
            &[Interval::new(1, 5), Interval::new(10, 12)]
        );
        assert_eq!(set.len(), 8);
    }

    #[rstest]
    #[case(0, false)]
    #[case(1, true)]
    #[case(5, true)]
    #[case(7, false)]
    #[case(11, true)]
    #[case(13, false)]
    fn test_contains(#[case] value: i32, #[case] expected: bool) {
        let mut set = IntervalSet::of(1, 5);
        set.add_range(10, 12);
        assert_eq!(set.contains(value), expected);
    }

    #[test]
    fn test_complement_against_vocabulary() {
        let mut set = IntervalSet::single(2);
        set.add_range(5, 6);

        let complement = set.complement(&IntervalSet::of(1, 7));
        assert_eq!(complement.to_vec(), vec![1, 3, 4, 7]);
    }

    #[test]
    fn test_complement_of_empty_is_vocabulary() {
        let vocabulary = IntervalSet::of(1, 4);
        assert_eq!(IntervalSet::new().complement(&vocabulary), vocabulary);
    }

    #[test]
    fn test_singleton() {
        assert_eq!(IntervalSet::single(9).singleton(), Some(9));
        assert_eq!(IntervalSet::of(1, 2).singleton(), None);
        assert_eq!(IntervalSet::new().singleton(), None);
    }

    #[test]
    fn test_epsilon_is_a_regular_member() {
        let mut set = IntervalSet::single(EPSILON);
        set.add(3);
        assert!(set.contains(EPSILON));
        assert!(!set.contains(EOF));
        assert_eq!(set.to_string(), "{<EPSILON>, 3}");
    }

    #[test]
    fn test_from_iterator() {
        let set: IntervalSet = [4, 2, 3, 9].into_iter().collect();
        assert_eq!(set.to_string(), "{2..4, 9}");
    }
}
