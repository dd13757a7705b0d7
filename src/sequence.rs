//! Cache-line padded atomic sequence counter
//!
//! The `Sequence` is the only state shared between producers and consumers:
//! the cursor, every consumer's progress counter and the multi-producer
//! claim counter are all instances of it. Each one owns its cache line pair
//! outright so independent counters never false-share.

use std::sync::atomic::{ AtomicI64, Ordering };

use crate::constants::INITIAL_CURSOR_VALUE;

/// Cache-line padded 64-bit sequence counter
///
/// Uses 128-byte alignment plus explicit filler so a `Sequence` occupies a
/// full adjacent-line prefetch pair exclusively. Loads are acquire and
/// stores are release: a `get()` used for a gating decision observes every
/// slot write that happened before the corresponding `set()`.
#[repr(align(128))]
pub struct Sequence {
    value: AtomicI64,
    /// Padding to fill out the alignment unit
    _padding: [u8; 120],
}

static_assertions::const_assert_eq!(std::mem::size_of::<Sequence>(), 128);
static_assertions::const_assert_eq!(std::mem::align_of::<Sequence>(), 128);

impl Sequence {
    /// Create a sequence with the given initial value
    pub fn new(initial_value: i64) -> Self {
        Self {
            value: AtomicI64::new(initial_value),
            _padding: [0; 120],
        }
    }

    /// Current value (acquire)
    #[inline]
    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Acquire)
    }

    /// Set the value (release), making prior writes visible to observers
    #[inline]
    pub fn set(&self, value: i64) {
        self.value.store(value, Ordering::Release);
    }

    /// Atomically replace `expected` with `new_value`
    ///
    /// Returns true if the exchange happened.
    #[inline]
    pub fn compare_and_set(&self, expected: i64, new_value: i64) -> bool {
        self.value
            .compare_exchange(expected, new_value, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Atomically add `delta`, returning the previous value
    #[inline]
    pub fn fetch_add(&self, delta: i64) -> i64 {
        self.value.fetch_add(delta, Ordering::AcqRel)
    }

    /// Atomically add 1, returning the new value
    #[inline]
    pub fn increment_and_get(&self) -> i64 {
        self.fetch_add(1) + 1
    }

    /// Atomically add `delta`, returning the new value
    #[inline]
    pub fn add_and_get(&self, delta: i64) -> i64 {
        self.fetch_add(delta) + delta
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new(INITIAL_CURSOR_VALUE)
    }
}

impl std::fmt::Debug for Sequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Sequence").field(&self.get()).finish()
    }
}
