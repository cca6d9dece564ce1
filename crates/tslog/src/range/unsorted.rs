//! Append-only spillover buffer with a one-shot sort on freeze.

use std::cmp::Ordering;
use std::sync::{Mutex, MutexGuard};

use crate::range::immutable::ImmutableRange;
use crate::range::{Element, SortedRangeRef};

/// Collects out-of-order arrivals until frozen into a sorted range.
///
/// Adds are cheap appends under a mutex while running `first`/`last` are
/// maintained. `freeze` performs a single stable sort followed by a
/// keep-last deduplication pass, so the latest write among equal elements
/// survives, and caches the resulting range. Adding after freeze is a
/// programming error.
pub(crate) struct UnsortedRange<T: Element> {
    inner: Mutex<UnsortedState<T>>,
}

struct UnsortedState<T: Element> {
    first: Option<T>,
    last: Option<T>,
    elements: Vec<T>,
    frozen: Option<SortedRangeRef<T>>,
}

impl<T: Element> UnsortedRange<T> {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(UnsortedState {
                first: None,
                last: None,
                elements: Vec::new(),
                frozen: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, UnsortedState<T>> {
        self.inner.lock().unwrap_or_else(|err| err.into_inner())
    }

    /// Appends one element, updating the running extent.
    ///
    /// # Panics
    ///
    /// Panics if the range has been frozen.
    pub(crate) fn add(&self, e: T) {
        let mut state = self.lock();
        assert!(
            state.frozen.is_none(),
            "add on a frozen unsorted range"
        );

        if state.first.as_ref().map_or(true, |first| e.less(first)) {
            state.first = Some(e.clone());
        }
        // Keep the latest write among equal elements as the extent's last,
        // matching the keep-last rule applied at freeze.
        if state.last.as_ref().map_or(true, |last| !e.less(last)) {
            state.last = Some(e.clone());
        }
        state.elements.push(e);
    }

    pub(crate) fn limit(&self) -> usize {
        let state = self.lock();
        match &state.frozen {
            Some(frozen) => frozen.limit(),
            None => state.elements.len(),
        }
    }

    pub(crate) fn first(&self) -> Option<T> {
        let state = self.lock();
        match &state.frozen {
            Some(frozen) => frozen.first(),
            None => state.first.clone(),
        }
    }

    pub(crate) fn last(&self) -> Option<T> {
        let state = self.lock();
        match &state.frozen {
            Some(frozen) => frozen.last(),
            None => state.last.clone(),
        }
    }

    /// Sorts and deduplicates the buffered elements into an immutable
    /// range, caching the result. Idempotent.
    pub(crate) fn freeze(&self) -> SortedRangeRef<T> {
        let mut state = self.lock();
        if state.frozen.is_none() {
            let mut elements = std::mem::take(&mut state.elements);
            elements.sort_by(compare);
            dedup_keep_last(&mut elements);
            state.frozen = Some(ImmutableRange::from_sorted(elements));
        }
        state.frozen.clone().expect("frozen range cached above")
    }
}

fn compare<T: Element>(a: &T, b: &T) -> Ordering {
    if a.less(b) {
        Ordering::Less
    } else if b.less(a) {
        Ordering::Greater
    } else {
        Ordering::Equal
    }
}

/// Collapses runs of equal elements in place, keeping the last of each run.
///
/// Combined with the stable sort above this preserves "last write wins" for
/// equal keys, consistent with merge's right-hand preference.
fn dedup_keep_last<T: Element>(elements: &mut Vec<T>) {
    if elements.len() < 2 {
        return;
    }
    let mut kept = 0;
    for i in 0..elements.len() {
        let e = elements[i].clone();
        if kept > 0 && !elements[kept - 1].less(&e) {
            kept -= 1;
        }
        elements[kept] = e;
        kept += 1;
    }
    elements.truncate(kept);
}
