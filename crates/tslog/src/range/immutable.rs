//! Immutable sorted ranges over shared element storage.

use std::sync::Arc;

use crate::range::{empty, Cursor, Element, Order, Range, SortedRange, SortedRangeRef};

/// A sorted, deduplicated range backed by a window into shared storage.
///
/// Partition results are further windows over the same allocation; no
/// elements are copied. Callers constructing one directly are responsible
/// for supplying storage that is already sorted and deduplicated.
pub(crate) struct ImmutableRange<T: Element> {
    elements: Arc<[T]>,
    start: usize,
    end: usize,
}

impl<T: Element> ImmutableRange<T> {
    /// Wraps an already-sorted, deduplicated vector, substituting the
    /// canonical empty range for an empty one.
    pub(crate) fn from_sorted(sorted: Vec<T>) -> SortedRangeRef<T> {
        let end = sorted.len();
        Self::over(sorted.into(), 0, end)
    }

    /// Wraps the `[start, end)` window of `elements`, substituting the
    /// canonical empty range for a zero-length window.
    pub(crate) fn over(elements: Arc<[T]>, start: usize, end: usize) -> SortedRangeRef<T> {
        if start >= end {
            empty()
        } else {
            Arc::new(Self {
                elements,
                start,
                end,
            })
        }
    }

    fn slice(&self) -> &[T] {
        &self.elements[self.start..self.end]
    }
}

impl<T: Element> Range<T> for ImmutableRange<T> {
    fn limit(&self) -> usize {
        self.end - self.start
    }

    fn first(&self) -> Option<T> {
        self.slice().first().cloned()
    }

    fn last(&self) -> Option<T> {
        self.slice().last().cloned()
    }
}

impl<T: Element> SortedRange<T> for ImmutableRange<T> {
    fn open(&self) -> Box<dyn Cursor<T>> {
        Box::new(SliceCursor::new(
            Arc::clone(&self.elements),
            self.start,
            self.end,
        ))
    }

    fn partition(&self, pivot: &T, order: Order<T>) -> (SortedRangeRef<T>, SortedRangeRef<T>) {
        // Binary search for the smallest index whose element no longer
        // sorts before the pivot under `order`. With the strict order the
        // pivot itself lands on the right side, with the inclusive order on
        // the left.
        let split = self.start + self.slice().partition_point(|e| order(e, pivot));
        (
            Self::over(Arc::clone(&self.elements), self.start, split),
            Self::over(Arc::clone(&self.elements), split, self.end),
        )
    }
}

/// Forward cursor over a window of shared storage.
pub(crate) struct SliceCursor<T: Element> {
    elements: Arc<[T]>,
    next: usize,
    end: usize,
}

impl<T: Element> SliceCursor<T> {
    pub(crate) fn new(elements: Arc<[T]>, next: usize, end: usize) -> Self {
        Self {
            elements,
            next,
            end,
        }
    }
}

impl<T: Element> Cursor<T> for SliceCursor<T> {
    fn next(&mut self) -> Option<T> {
        if self.next < self.end {
            let e = self.elements[self.next].clone();
            self.next += 1;
            Some(e)
        } else {
            None
        }
    }

    fn fill(&mut self, buffer: &mut Vec<T>, max: usize) -> usize {
        let take = max.min(self.end - self.next);
        buffer.extend_from_slice(&self.elements[self.next..self.next + take]);
        self.next += take;
        take
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::{as_vec, less, less_or_equal};

    fn immutable(values: &[i64]) -> SortedRangeRef<i64> {
        ImmutableRange::from_sorted(values.to_vec())
    }

    fn slices(
        pair: (SortedRangeRef<i64>, SortedRangeRef<i64>),
    ) -> (Vec<i64>, Vec<i64>) {
        (as_vec(pair.0.as_ref()), as_vec(pair.1.as_ref()))
    }

    #[test]
    fn test_empty_is_canonical() {
        let r = immutable(&[]);
        assert_eq!(r.limit(), 0);
        assert_eq!(r.first(), None);
        assert_eq!(r.last(), None);
    }

    #[test]
    fn test_first_last_limit() {
        let r = immutable(&[0, 1, 3, 4, 5]);
        assert_eq!(r.limit(), 5);
        assert_eq!(r.first(), Some(0));
        assert_eq!(r.last(), Some(5));
    }

    #[test]
    fn test_cursor_iterates_in_order() {
        let r = immutable(&[0, 1, 3, 4, 5]);
        let mut cursor = r.open();
        let mut got = Vec::new();
        while let Some(e) = cursor.next() {
            got.push(e);
        }
        assert_eq!(got, vec![0, 1, 3, 4, 5]);
        assert_eq!(cursor.next(), None);
    }

    #[test]
    fn test_cursor_fill_bulk() {
        let r = immutable(&[0, 1, 3, 4, 5]);
        let mut cursor = r.open();
        let mut buffer = Vec::new();
        assert_eq!(cursor.fill(&mut buffer, 3), 3);
        assert_eq!(buffer, vec![0, 1, 3]);
        assert_eq!(cursor.fill(&mut buffer, 10), 2);
        assert_eq!(buffer, vec![0, 1, 3, 4, 5]);
        assert_eq!(cursor.fill(&mut buffer, 10), 0);
    }

    #[test]
    fn test_partition_less_pivot_present() {
        let r = immutable(&[0, 1, 3, 4, 5]);
        let (left, right) = slices(r.partition(&1, less));
        assert_eq!(left, vec![0]);
        assert_eq!(right, vec![1, 3, 4, 5]);
    }

    #[test]
    fn test_partition_less_or_equal_pivot_present() {
        let r = immutable(&[0, 1, 3, 4, 5]);
        let (left, right) = slices(r.partition(&1, less_or_equal));
        assert_eq!(left, vec![0, 1]);
        assert_eq!(right, vec![3, 4, 5]);
    }

    #[test]
    fn test_partition_pivot_absent() {
        let r = immutable(&[0, 1, 3, 4]);
        let (left, right) = slices(r.partition(&2, less));
        assert_eq!(left, vec![0, 1]);
        assert_eq!(right, vec![3, 4]);

        let (left, right) = slices(r.partition(&2, less_or_equal));
        assert_eq!(left, vec![0, 1]);
        assert_eq!(right, vec![3, 4]);
    }

    #[test]
    fn test_partition_before_first_and_after_last() {
        let r = immutable(&[0, 1, 3, 4]);

        let (left, right) = r.partition(&0, less);
        assert_eq!(left.limit(), 0);
        assert_eq!(as_vec(right.as_ref()), vec![0, 1, 3, 4]);

        let (left, right) = r.partition(&4, less_or_equal);
        assert_eq!(as_vec(left.as_ref()), vec![0, 1, 3, 4]);
        assert_eq!(right.limit(), 0);
    }

    #[test]
    fn test_partition_empty() {
        let r = immutable(&[]);
        let (left, right) = r.partition(&2, less);
        assert_eq!(left.limit(), 0);
        assert_eq!(right.limit(), 0);
    }

    #[test]
    fn test_partition_shares_storage() {
        let r = immutable(&[0, 1, 3, 4, 5]);
        let (_, right) = r.partition(&3, less);
        // Repartitioning a partition keeps slicing the same allocation.
        let (inner_left, inner_right) = slices(right.partition(&4, less));
        assert_eq!(inner_left, vec![3]);
        assert_eq!(inner_right, vec![4, 5]);
    }
}
