//! The writable head of the log.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Result, TslError};
use crate::range::immutable::ImmutableRange;
use crate::range::mergeable::MergeableRange;
use crate::range::unsorted::UnsortedRange;
use crate::range::{Element, Range, SortedRangeRef};

/// A range that writers extend until it is frozen into a sorted range.
///
/// Elements that keep the intrinsic order extend a sorted tail directly;
/// out-of-order arrivals spill into an [`UnsortedRange`] that is only
/// sorted when the frozen range is first read. Freezing is idempotent: the
/// first call caches a sorted range and later calls return the same
/// handle.
///
/// # Example
///
/// ```rust,ignore
/// let range = MutableRange::new();
/// range.add(&[2i64, 0, 1])?;
/// let sorted = range.freeze();
/// assert!(range.add(&[3]).is_err());
/// ```
pub struct MutableRange<T: Element> {
    inner: Mutex<MutableState<T>>,
}

struct MutableState<T: Element> {
    first: Option<T>,
    last: Option<T>,
    sorted: Vec<T>,
    spill: Arc<UnsortedRange<T>>,
    frozen: Option<SortedRangeRef<T>>,
}

impl<T: Element> MutableState<T> {
    fn push(&mut self, e: T) {
        if self.sorted.is_empty() {
            self.first = Some(e.clone());
            self.last = Some(e.clone());
            self.sorted.push(e);
            return;
        }

        if self.first.as_ref().is_some_and(|first| e.less(first)) {
            self.first = Some(e.clone());
        }

        // The sorted tail stays strictly increasing: only elements beyond
        // the current last extend it, everything else spills. Duplicates of
        // the last element spill too and are collapsed at merge time.
        let extends_tail = self.last.as_ref().is_some_and(|last| last.less(&e));
        if extends_tail {
            self.last = Some(e.clone());
            self.sorted.push(e);
        } else {
            self.spill.add(e);
        }
    }
}

impl<T: Element> MutableRange<T> {
    /// Creates an empty mutable range.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MutableState {
                first: None,
                last: None,
                sorted: Vec::new(),
                spill: Arc::new(UnsortedRange::new()),
                frozen: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MutableState<T>> {
        self.inner.lock().unwrap_or_else(|err| err.into_inner())
    }

    /// Adds elements to the range.
    ///
    /// # Errors
    ///
    /// Returns [`TslError::AlreadyFrozen`] if the range has been frozen.
    pub fn add(&self, elements: &[T]) -> Result<()> {
        let mut state = self.lock();
        if state.frozen.is_some() {
            return Err(TslError::AlreadyFrozen);
        }
        for e in elements {
            state.push(e.clone());
        }
        Ok(())
    }

    /// Freezes the range, returning a sorted view of its contents.
    ///
    /// If every element arrived in order the result is an immutable range
    /// over the sorted tail; otherwise it is a lazily-merged range over the
    /// tail and the frozen spillover. Idempotent: every call returns the
    /// same handle.
    pub fn freeze(&self) -> SortedRangeRef<T> {
        let mut state = self.lock();
        if state.frozen.is_none() {
            let sorted = std::mem::take(&mut state.sorted);
            let tail = ImmutableRange::from_sorted(sorted);
            let frozen = if state.spill.limit() > 0 {
                Arc::new(MergeableRange::with_unsorted(
                    tail,
                    Arc::clone(&state.spill),
                )) as SortedRangeRef<T>
            } else {
                tail
            };
            state.frozen = Some(frozen);
        }
        state.frozen.clone().expect("frozen range cached above")
    }
}

impl<T: Element> Default for MutableRange<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element> Range<T> for MutableRange<T> {
    fn limit(&self) -> usize {
        let state = self.lock();
        match &state.frozen {
            Some(frozen) => frozen.limit(),
            None => state.sorted.len() + state.spill.limit(),
        }
    }

    fn first(&self) -> Option<T> {
        self.lock().first.clone()
    }

    fn last(&self) -> Option<T> {
        self.lock().last.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::{as_vec, less, less_or_equal};

    fn frozen_slice(values: &[i64]) -> Vec<i64> {
        let range = MutableRange::new();
        range.add(values).unwrap();
        as_vec(range.freeze().as_ref())
    }

    #[test]
    fn test_empty() {
        assert_eq!(frozen_slice(&[]), Vec::<i64>::new());
    }

    #[test]
    fn test_single() {
        assert_eq!(frozen_slice(&[0]), vec![0]);
    }

    #[test]
    fn test_duplicated() {
        assert_eq!(frozen_slice(&[0, 0]), vec![0]);
    }

    #[test]
    fn test_in_order_pair() {
        assert_eq!(frozen_slice(&[0, 1]), vec![0, 1]);
    }

    #[test]
    fn test_reversed_pair() {
        assert_eq!(frozen_slice(&[1, 0]), vec![0, 1]);
    }

    #[test]
    fn test_permuted_triple() {
        assert_eq!(frozen_slice(&[2, 0, 1]), vec![0, 1, 2]);
    }

    #[test]
    fn test_reversed_triple() {
        assert_eq!(frozen_slice(&[2, 1, 0]), vec![0, 1, 2]);
    }

    #[test]
    fn test_interleaved_quintuple() {
        assert_eq!(frozen_slice(&[0, 2, 1, 4, 3]), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_mostly_sorted_with_noise() {
        assert_eq!(
            frozen_slice(&[0, 2, 3, 4, 6, 6, 3, 2, 1, 5, 7]),
            vec![0, 1, 2, 3, 4, 5, 6, 7]
        );
    }

    #[test]
    fn test_extent_tracking() {
        let range = MutableRange::new();
        range.add(&[5, 2, 9, 2]).unwrap();
        assert_eq!(range.first(), Some(2));
        assert_eq!(range.last(), Some(9));
        assert_eq!(range.limit(), 4);
    }

    #[test]
    fn test_add_after_freeze_fails() {
        let range = MutableRange::new();
        range.add(&[1, 2]).unwrap();
        range.freeze();
        let err = range.add(&[3]).unwrap_err();
        assert!(matches!(err, TslError::AlreadyFrozen));
    }

    #[test]
    fn test_freeze_is_idempotent() {
        let range = MutableRange::new();
        range.add(&[3, 1, 2]).unwrap();
        let a = range.freeze();
        let b = range.freeze();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_freeze_in_order_input_is_immutable() {
        // No spillover: the frozen range is exact immediately.
        let range = MutableRange::new();
        range.add(&[1, 2, 3]).unwrap();
        let frozen = range.freeze();
        assert_eq!(frozen.limit(), 3);
        assert_eq!(range.limit(), 3);
    }

    #[test]
    fn test_limit_shrinks_after_merge_of_duplicates() {
        let range = MutableRange::new();
        range.add(&[1, 2, 2, 2]).unwrap();
        let frozen = range.freeze();
        // Two duplicates spilled; the limit is an upper bound until the
        // lazy merge collapses them.
        assert_eq!(frozen.limit(), 4);
        assert_eq!(as_vec(frozen.as_ref()), vec![1, 2]);
        assert_eq!(frozen.limit(), 2);
    }

    #[test]
    fn test_frozen_partition_less() {
        let range = MutableRange::new();
        range.add(&[1, 0]).unwrap();
        let (left, right) = range.freeze().partition(&1, less);
        assert_eq!(as_vec(left.as_ref()), vec![0]);
        assert_eq!(as_vec(right.as_ref()), vec![1]);
    }

    #[test]
    fn test_frozen_partition_less_or_equal() {
        let range = MutableRange::new();
        range.add(&[1, 0]).unwrap();
        let (left, right) = range.freeze().partition(&1, less_or_equal);
        assert_eq!(as_vec(left.as_ref()), vec![0, 1]);
        assert_eq!(right.limit(), 0);
    }

    #[test]
    fn test_frozen_partition_out_of_order_input() {
        let range = MutableRange::new();
        range.add(&[1, 0, 3, 2]).unwrap();
        let frozen = range.freeze();

        let (left, right) = frozen.partition(&2, less_or_equal);
        assert_eq!(as_vec(left.as_ref()), vec![0, 1, 2]);
        assert_eq!(as_vec(right.as_ref()), vec![3]);

        let (left, right) = frozen.partition(&2, less);
        assert_eq!(as_vec(left.as_ref()), vec![0, 1]);
        assert_eq!(as_vec(right.as_ref()), vec![2, 3]);
    }
}
