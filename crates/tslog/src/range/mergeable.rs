//! Lazily-merged sorted ranges with shared, concurrent cursors.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::range::immutable::{ImmutableRange, SliceCursor};
use crate::range::unsorted::UnsortedRange;
use crate::range::{or_empty, Cursor, Element, Order, Range, SortedRange, SortedRangeRef};

/// A possibly incomplete two-way merge of sorted inputs.
///
/// The merged, deduplicated output materializes in a shared buffer on
/// demand: each cursor step that runs past the published prefix advances
/// the merge by one element under the write lock, while reads of the
/// prefix take the read lock only. Once both inputs are exhausted the
/// input references are dropped and the range behaves like an immutable
/// one, sharing its buffer with cursors and partitions.
///
/// A freeze-produced mergeable range starts with an unsorted right arm;
/// the arm incurs its one-shot sort when the first cursor is opened or the
/// range is first partitioned.
pub(crate) struct MergeableRange<T: Element> {
    first: Option<T>,
    last: Option<T>,
    limit: usize,
    state: Arc<RwLock<MergeState<T>>>,
}

struct MergeState<T: Element> {
    /// Merged output. `buf[..nx]` is stable and visible to readers; at most
    /// one further provisional element beyond `nx` may still be replaced by
    /// a later equal arrival.
    buf: Vec<T>,
    /// Published length of the merged prefix.
    nx: usize,
    left: Option<SortedRangeRef<T>>,
    right: Option<SortedRangeRef<T>>,
    /// Right arm awaiting its one-shot sort, for freeze-produced ranges.
    spill: Option<Arc<UnsortedRange<T>>>,
    lx: Option<PeekCursor<T>>,
    rx: Option<PeekCursor<T>>,
    /// Set at completion; the whole output, shared zero-copy thereafter.
    merged: Option<Arc<[T]>>,
}

impl<T: Element> MergeState<T> {
    /// The elements readers may currently observe.
    fn published(&self) -> &[T] {
        match &self.merged {
            Some(merged) => merged,
            None => &self.buf[..self.nx],
        }
    }

    /// Sorts the spillover arm if it has not been sorted yet.
    fn ensure_sorted(&mut self) {
        if self.left.is_some() && self.right.is_none() {
            let spill = self
                .spill
                .take()
                .expect("unsorted arm present until first sort");
            let right = spill.freeze();
            self.rx = Some(PeekCursor::new(right.open()));
            self.right = Some(right);
        }
    }

    /// Advances the merge far enough to publish at least one more element
    /// or detect the end of both inputs.
    fn merge_one(&mut self) {
        if self.left.is_none() {
            return;
        }
        let lx = self.lx.as_mut().expect("left cursor live while merging");
        let rx = self.rx.as_mut().expect("right cursor live while merging");

        self.nx = self.buf.len();
        while self.nx == self.buf.len() {
            let side = match (lx.peek(), rx.peek()) {
                (None, None) => break,
                (Some(_), None) => Side::Left,
                (None, Some(_)) => Side::Right,
                (Some(l), Some(r)) => {
                    if l.less(r) {
                        Side::Left
                    } else if r.less(l) {
                        Side::Right
                    } else {
                        Side::Both
                    }
                }
            };
            let e = match side {
                Side::Left => lx.next(),
                Side::Right => rx.next(),
                Side::Both => {
                    // Equal under the intrinsic order: the right arm is the
                    // newer input and wins.
                    lx.next();
                    rx.next()
                }
            }
            .expect("peeked arm yields an element");

            match self.buf.last().map(|prev| prev.less(&e)) {
                None => {
                    self.buf.push(e);
                    self.nx = self.buf.len();
                }
                Some(true) => self.buf.push(e),
                Some(false) => {
                    // Collides with the provisional element: the later
                    // write replaces it without advancing.
                    let prev = self.buf.last_mut().expect("non-empty buffer");
                    *prev = e;
                }
            }
        }

        if lx.peek().is_none() && rx.peek().is_none() {
            self.nx = self.buf.len();
            self.merged = Some(std::mem::take(&mut self.buf).into());
            self.left = None;
            self.right = None;
            self.lx = None;
            self.rx = None;
            self.spill = None;
        }
    }
}

enum Side {
    Left,
    Right,
    Both,
}

impl<T: Element> MergeableRange<T> {
    /// Wraps two sorted arms. The left arm is considered older; equal
    /// elements resolve in favor of the right arm.
    pub(crate) fn new(left: SortedRangeRef<T>, right: SortedRangeRef<T>) -> Self {
        let limit = left.limit() + right.limit();
        let first = min_first(left.first(), right.first());
        let last = max_last(left.last(), right.last());
        let lx = PeekCursor::new(left.open());
        let rx = PeekCursor::new(right.open());
        Self {
            first,
            last,
            limit,
            state: Arc::new(RwLock::new(MergeState {
                buf: Vec::with_capacity(limit),
                nx: 0,
                left: Some(left),
                right: Some(right),
                spill: None,
                lx: Some(lx),
                rx: Some(rx),
                merged: None,
            })),
        }
    }

    /// Wraps a sorted left arm and a still-unsorted spillover; the
    /// spillover's sort is deferred until the range is first read or
    /// partitioned.
    pub(crate) fn with_unsorted(left: SortedRangeRef<T>, spill: Arc<UnsortedRange<T>>) -> Self {
        let limit = left.limit() + spill.limit();
        let first = min_first(left.first(), spill.first());
        let last = max_last(left.last(), spill.last());
        let lx = PeekCursor::new(left.open());
        Self {
            first,
            last,
            limit,
            state: Arc::new(RwLock::new(MergeState {
                buf: Vec::with_capacity(limit),
                nx: 0,
                left: Some(left),
                right: None,
                spill: Some(spill),
                lx: Some(lx),
                rx: None,
                merged: None,
            })),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, MergeState<T>> {
        self.state.read().unwrap_or_else(|err| err.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, MergeState<T>> {
        self.state.write().unwrap_or_else(|err| err.into_inner())
    }
}

fn min_first<T: Element>(a: Option<T>, b: Option<T>) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(if b.less(&a) { b } else { a }),
        (a, b) => a.or(b),
    }
}

fn max_last<T: Element>(a: Option<T>, b: Option<T>) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(if a.less(&b) { b } else { a }),
        (a, b) => a.or(b),
    }
}

impl<T: Element> Range<T> for MergeableRange<T> {
    fn limit(&self) -> usize {
        match &self.read().merged {
            Some(merged) => merged.len(),
            None => self.limit,
        }
    }

    fn first(&self) -> Option<T> {
        self.first.clone()
    }

    fn last(&self) -> Option<T> {
        self.last.clone()
    }
}

impl<T: Element> SortedRange<T> for MergeableRange<T> {
    fn open(&self) -> Box<dyn Cursor<T>> {
        let mut state = self.write();
        state.ensure_sorted();
        if let Some(merged) = &state.merged {
            let end = merged.len();
            return Box::new(SliceCursor::new(Arc::clone(merged), 0, end));
        }
        Box::new(MergeableCursor {
            state: Arc::clone(&self.state),
            pos: 0,
        })
    }

    fn partition(&self, pivot: &T, order: Order<T>) -> (SortedRangeRef<T>, SortedRangeRef<T>) {
        {
            let mut state = self.write();
            state.ensure_sorted();
        }

        let state = self.read();
        if let Some(merged) = state.merged.clone() {
            drop(state);
            // Materialized: a plain binary-search split of the buffer.
            let split = merged.partition_point(|e| order(e, pivot));
            let end = merged.len();
            return (
                ImmutableRange::over(Arc::clone(&merged), 0, split),
                ImmutableRange::over(merged, split, end),
            );
        }
        let left = Arc::clone(state.left.as_ref().expect("left arm live while merging"));
        let right = Arc::clone(state.right.as_ref().expect("right arm live while merging"));
        drop(state);

        // Partition each arm independently and rewrap: the merge stays
        // lazy across the split.
        let (l1, l2) = left.partition(pivot, order);
        let (r1, r2) = right.partition(pivot, order);
        (
            or_empty(Arc::new(MergeableRange::new(l1, r1))),
            or_empty(Arc::new(MergeableRange::new(l2, r2))),
        )
    }
}

/// Cursor over the merged prefix of a [`MergeableRange`], advancing the
/// merge when it runs past the published elements.
struct MergeableCursor<T: Element> {
    state: Arc<RwLock<MergeState<T>>>,
    pos: usize,
}

impl<T: Element> Cursor<T> for MergeableCursor<T> {
    fn next(&mut self) -> Option<T> {
        {
            let state = self.state.read().unwrap_or_else(|err| err.into_inner());
            if let Some(e) = state.published().get(self.pos) {
                let e = e.clone();
                self.pos += 1;
                return Some(e);
            }
        }

        {
            let mut state = self.state.write().unwrap_or_else(|err| err.into_inner());
            state.merge_one();
        }

        let state = self.state.read().unwrap_or_else(|err| err.into_inner());
        let e = state.published().get(self.pos)?.clone();
        self.pos += 1;
        Some(e)
    }

    fn fill(&mut self, buffer: &mut Vec<T>, max: usize) -> usize {
        // Bulk-copy whatever is already merged, then fall back to advancing
        // the merge element by element.
        let mut filled = {
            let state = self.state.read().unwrap_or_else(|err| err.into_inner());
            let published = state.published();
            let take = max.min(published.len().saturating_sub(self.pos));
            buffer.extend_from_slice(&published[self.pos..self.pos + take]);
            self.pos += take;
            take
        };

        while filled < max {
            match self.next() {
                Some(e) => {
                    buffer.push(e);
                    filled += 1;
                }
                None => break,
            }
        }
        filled
    }
}

/// One-step lookahead over an arm of the merge.
struct PeekCursor<T: Element> {
    underlying: Box<dyn Cursor<T>>,
    peeked: Option<T>,
    done: bool,
}

impl<T: Element> PeekCursor<T> {
    fn new(underlying: Box<dyn Cursor<T>>) -> Self {
        Self {
            underlying,
            peeked: None,
            done: false,
        }
    }

    fn advance(&mut self) {
        if !self.done && self.peeked.is_none() {
            self.peeked = self.underlying.next();
            self.done = self.peeked.is_none();
        }
    }

    fn peek(&mut self) -> Option<&T> {
        self.advance();
        self.peeked.as_ref()
    }

    fn next(&mut self) -> Option<T> {
        self.advance();
        self.peeked.take()
    }
}
