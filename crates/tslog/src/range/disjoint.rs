//! Concatenations of non-overlapping sorted ranges.

use std::sync::Arc;

use crate::range::{empty, Cursor, Element, Order, Range, SortedRange, SortedRangeRef};

/// A sequence of sorted ranges whose extents do not overlap, in extent
/// order.
///
/// Iteration runs each segment's cursor to exhaustion before opening the
/// next, so no per-element comparison is needed to pick the source -
/// the fast path [`merge`](crate::range::merge) takes when its inputs'
/// extents are strictly ordered.
#[derive(Clone)]
pub(crate) struct DisjointRange<T: Element> {
    first: T,
    last: T,
    segments: Arc<[SortedRangeRef<T>]>,
}

impl<T: Element> DisjointRange<T> {
    /// Wraps non-empty segments whose extents are strictly ordered.
    pub(crate) fn new(segments: Vec<SortedRangeRef<T>>) -> Self {
        let first = segments
            .first()
            .and_then(|s| s.first())
            .expect("disjoint range requires a non-empty leading segment");
        let last = segments
            .last()
            .and_then(|s| s.last())
            .expect("disjoint range requires a non-empty trailing segment");
        Self {
            first,
            last,
            segments: segments.into(),
        }
    }
}

/// Collapses a segment list to its canonical shape: no segments is the
/// empty range, a single segment stands alone, anything longer forms a
/// disjoint range.
pub(crate) fn regroup<T: Element>(segments: Vec<SortedRangeRef<T>>) -> SortedRangeRef<T> {
    match segments.len() {
        0 => empty(),
        1 => segments.into_iter().next().expect("length checked"),
        _ => Arc::new(DisjointRange::new(segments)),
    }
}

impl<T: Element> Range<T> for DisjointRange<T> {
    fn limit(&self) -> usize {
        self.segments.iter().map(|s| s.limit()).sum()
    }

    fn first(&self) -> Option<T> {
        Some(self.first.clone())
    }

    fn last(&self) -> Option<T> {
        Some(self.last.clone())
    }
}

impl<T: Element> SortedRange<T> for DisjointRange<T> {
    fn open(&self) -> Box<dyn Cursor<T>> {
        Box::new(DisjointCursor {
            current: self.segments.first().map(|s| s.open()),
            segments: Arc::clone(&self.segments),
            index: 0,
        })
    }

    fn partition(&self, pivot: &T, order: Order<T>) -> (SortedRangeRef<T>, SortedRangeRef<T>) {
        if !order(&self.first, pivot) {
            return (empty(), Arc::new(self.clone()));
        }
        if order(&self.last, pivot) {
            return (Arc::new(self.clone()), empty());
        }

        let mut left = Vec::new();
        let mut right = Vec::new();
        for (i, segment) in self.segments.iter().enumerate() {
            let seg_last = segment.last().expect("disjoint segments are never empty");
            if order(&seg_last, pivot) {
                left.push(Arc::clone(segment));
                continue;
            }
            let seg_first = segment.first().expect("disjoint segments are never empty");
            if order(&seg_first, pivot) {
                // This segment's extent straddles the pivot: split it and
                // route the halves to either side.
                let (p1, p2) = segment.partition(pivot, order);
                if p1.limit() > 0 {
                    left.push(p1);
                }
                if p2.limit() > 0 {
                    right.push(p2);
                }
            } else {
                // The pivot falls in the gap before this segment.
                right.push(Arc::clone(segment));
            }
            right.extend(self.segments[i + 1..].iter().cloned());
            break;
        }
        (regroup(left), regroup(right))
    }
}

/// Cursor chaining the segment cursors in extent order.
struct DisjointCursor<T: Element> {
    segments: Arc<[SortedRangeRef<T>]>,
    index: usize,
    current: Option<Box<dyn Cursor<T>>>,
}

impl<T: Element> DisjointCursor<T> {
    fn advance_segment(&mut self) {
        self.index += 1;
        self.current = self.segments.get(self.index).map(|s| s.open());
    }
}

impl<T: Element> Cursor<T> for DisjointCursor<T> {
    fn next(&mut self) -> Option<T> {
        while let Some(cursor) = self.current.as_mut() {
            if let Some(e) = cursor.next() {
                return Some(e);
            }
            self.advance_segment();
        }
        None
    }

    fn fill(&mut self, buffer: &mut Vec<T>, max: usize) -> usize {
        let mut filled = 0;
        while filled < max {
            let Some(cursor) = self.current.as_mut() else {
                break;
            };
            filled += cursor.fill(buffer, max - filled);
            if filled < max {
                self.advance_segment();
            }
        }
        filled
    }
}
