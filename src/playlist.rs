//! Cursor over the catalog implementing the endless slideshow order.

use rand::Rng;
use tracing::debug;

use crate::catalog::Catalog;

/// How the cursor behaves when it wraps past the end of the catalog.
#[derive(Debug, Clone, Copy)]
pub struct PassPolicy {
    pub shuffle: bool,
    /// Reshuffle once this many passes have completed.
    pub reshuffle_after: u32,
}

/// Result of [`Cursor::advance`].
#[derive(Debug)]
pub enum Advance<T> {
    /// `item` was prepared from the record at `index`.
    Shown { index: usize, item: T },
    /// A full lap produced nothing usable.
    Exhausted,
}

/// Tracks the current and next position in a [`Catalog`].
///
/// `next` may sit at -1 after a back request so the following advance lands
/// on the last record; it never goes lower.
#[derive(Debug, Clone, Default)]
pub struct Cursor {
    next: isize,
    current: usize,
    passes: u32,
}

impl Cursor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the record on screen.
    #[must_use]
    pub const fn current(&self) -> usize {
        self.current
    }

    /// Raw (possibly -1 or past-the-end) position of the next record.
    #[must_use]
    pub const fn next_position(&self) -> isize {
        self.next
    }

    #[must_use]
    pub const fn passes(&self) -> u32 {
        self.passes
    }

    /// Restart from the beginning (after a catalog rebuild).
    pub fn reset(&mut self) {
        self.next = 0;
        self.current = 0;
        self.passes = 0;
    }

    /// Step back one picture: undo the pending advance and one more.
    pub fn back(&mut self) {
        self.next = (self.next - 2).max(-1);
    }

    /// Show the current picture again on the next advance.
    pub fn replay(&mut self) {
        self.next = (self.next - 1).max(-1);
    }

    /// Clear pairings pointing at the picture on screen and at the jump
    /// target so both can be paired afresh.
    pub fn refresh_pairings(&self, catalog: &mut Catalog) {
        let len = catalog.len();
        if len == 0 {
            return;
        }
        let target = wrap(self.next + 1, len);
        for index in [self.current % len, target] {
            catalog.clear_pairings_referencing(index);
        }
    }

    /// Keep the cursor consistent after the record at `index` was removed.
    /// The record that slid into `index` is shown next.
    pub fn removed(&mut self, index: usize) {
        self.next = index as isize;
        self.current = index.saturating_sub(1);
    }

    /// Move to the next usable record.
    ///
    /// `prepare` is called with successive indices until it returns `Some`.
    /// Wrapping past the end starts a new pass: pairings are cleared and,
    /// when shuffling, the catalog is reshuffled every
    /// `policy.reshuffle_after` passes.
    pub fn advance<T, R, F>(
        &mut self,
        catalog: &mut Catalog,
        policy: PassPolicy,
        rng: &mut R,
        mut prepare: F,
    ) -> Advance<T>
    where
        R: Rng + ?Sized,
        F: FnMut(&mut Catalog, usize) -> Option<T>,
    {
        let mut attempts = 0;
        loop {
            let len = catalog.len();
            if len == 0 || attempts >= len {
                return Advance::Exhausted;
            }
            if self.next >= len as isize {
                self.start_pass(catalog, policy, rng);
            }

            let index = wrap(self.next, len);
            let found = prepare(catalog, index);
            self.next += 1;
            attempts += 1;
            match found {
                Some(item) => {
                    self.current = index;
                    return Advance::Shown { index, item };
                }
                None => debug!(index, "skipping unusable picture"),
            }
        }
    }

    fn start_pass<R: Rng + ?Sized>(&mut self, catalog: &mut Catalog, policy: PassPolicy, rng: &mut R) {
        self.passes += 1;
        self.next = 0;
        if policy.shuffle && self.passes >= policy.reshuffle_after {
            debug!(passes = self.passes, "reshuffling catalog");
            self.passes = 0;
            catalog.reshuffle(rng);
        } else {
            catalog.clear_pairings();
        }
    }
}

#[inline]
fn wrap(position: isize, len: usize) -> usize {
    position.rem_euclid(len as isize) as usize
}
