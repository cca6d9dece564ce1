//! The merge operator over sorted ranges.

use std::sync::Arc;

use crate::range::disjoint::{regroup, DisjointRange};
use crate::range::mergeable::MergeableRange;
use crate::range::{less, less_or_equal, or_empty, Element, SortedRangeRef};

/// Merges two sorted ranges into one whose elements are the deduplicated
/// union of both; where an element of `a` equals an element of `b`, the
/// element from `b` is retained.
///
/// When the extents do not overlap the inputs are concatenated into a
/// disjoint range and stream without per-element comparisons. Otherwise
/// each input is split around the other's boundary so that only the
/// overlapping slices enter a lazy two-way merge, with the non-overlapping
/// prefix and suffix streaming directly.
pub fn merge<T: Element>(a: SortedRangeRef<T>, b: SortedRangeRef<T>) -> SortedRangeRef<T> {
    if a.limit() == 0 {
        return b;
    }
    if b.limit() == 0 {
        return a;
    }

    let a_last = a.last().expect("non-empty range has a last element");
    let b_first = b.first().expect("non-empty range has a first element");
    if a_last.less(&b_first) {
        return Arc::new(DisjointRange::new(vec![a, b]));
    }

    // Overlapping extents. p1 sorts strictly before everything in b, p4
    // strictly after everything in a; only (p2, p3) need merging.
    let (p1, p2) = a.partition(&b_first, less);
    let (p3, p4) = b.partition(&a_last, less_or_equal);
    let m23 = or_empty(Arc::new(MergeableRange::new(p2, p3)));

    regroup(
        [p1, m23, p4]
            .into_iter()
            .filter(|part| part.limit() > 0)
            .collect(),
    )
}
