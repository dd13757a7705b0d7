//! Claim strategies used by publishers to reserve sequences
//!
//! A claim strategy hands out slot ranges to producers while honouring the
//! wrap bound: no claim may run further than one buffer length ahead of the
//! slowest gating consumer. The single-producer variant keeps its counter
//! in plain padded memory; the multi-producer variants coordinate through
//! atomics and serialise publication onto the cursor.

use std::cell::UnsafeCell;
use std::sync::atomic::{ AtomicI64, Ordering };
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::constants::{
    DEFAULT_PENDING_BUFFER_SIZE,
    INITIAL_CURSOR_VALUE,
    PUBLISH_RATE_LIMIT_RETRIES,
};
use crate::error::{ Result, VortexError };
use crate::sequence::Sequence;
use crate::utils::minimum_sequence;

/// Strategy contract for claiming sequences on behalf of event publishers
pub trait ClaimStrategy: Send + Sync {
    /// Size of the underlying slot buffer
    fn buffer_size(&self) -> usize;

    /// The currently claimed (reserved) sequence
    fn sequence(&self) -> i64;

    /// Whether the buffer can absorb `available_capacity` more claims
    /// without overrunning the dependent sequences
    fn has_available_capacity(
        &self,
        available_capacity: usize,
        dependent_sequences: &[Arc<Sequence>]
    ) -> bool;

    /// Claim the next sequence, holding the caller up until the claimed
    /// slot is free of the dependent sequences
    fn increment_and_get(&self, dependent_sequences: &[Arc<Sequence>]) -> i64;

    /// Claim a batch of `delta` sequences, returning the last of the batch
    fn increment_and_get_batch(
        &self,
        delta: usize,
        dependent_sequences: &[Arc<Sequence>]
    ) -> i64;

    /// Move the claim counter to a specific sequence, holding the caller up
    /// until the slot is free
    fn set_sequence(&self, sequence: i64, dependent_sequences: &[Arc<Sequence>]);

    /// Atomically check capacity and claim `delta` sequences
    ///
    /// Fails with [`VortexError::InsufficientCapacity`] instead of blocking
    /// when fewer than `available_capacity` slots remain.
    fn check_and_increment(
        &self,
        available_capacity: usize,
        delta: usize,
        gating_sequences: &[Arc<Sequence>]
    ) -> Result<i64>;

    /// Serialise publishers so the cursor only ever exposes contiguous,
    /// fully published sequences
    fn serialise_publishing(&self, sequence: i64, cursor: &Sequence, batch_size: usize);
}

fn validate_buffer_size(buffer_size: usize) -> Result<()> {
    if buffer_size == 0 || !buffer_size.is_power_of_two() {
        return Err(VortexError::out_of_range(format!(
            "buffer size must be a power of 2, was: {buffer_size}"
        )));
    }
    Ok(())
}

/// Poll the dependent sequences until `wrap_point` no longer overruns them.
///
/// Waiters on the dependents are never signalled; the producer simply polls
/// with minimal sleeps.
fn spin_until_clear(wrap_point: i64, dependent_sequences: &[Arc<Sequence>]) -> i64 {
    let mut min_sequence;
    loop {
        min_sequence = minimum_sequence(dependent_sequences);
        if wrap_point <= min_sequence {
            return min_sequence;
        }
        thread::sleep(Duration::from_nanos(1));
    }
}

/// Cache-line padded plain counter for the single-producer fast path
#[repr(align(128))]
struct PaddedCell {
    value: UnsafeCell<i64>,
    _padding: [u8; 120],
}

impl PaddedCell {
    fn new(initial_value: i64) -> Self {
        Self {
            value: UnsafeCell::new(initial_value),
            _padding: [0; 120],
        }
    }

    /// SAFETY: callers must be the single claiming thread; see the
    /// `SingleProducerClaimStrategy` contract.
    unsafe fn get(&self) -> i64 {
        *self.value.get()
    }

    /// SAFETY: as for `get`.
    unsafe fn set(&self, value: i64) {
        *self.value.get() = value;
    }
}

/// Optimised strategy for a single publisher thread claiming sequences
///
/// The claim counter is deliberately non-atomic: with exactly one claiming
/// thread there is no other writer, and publication ordering is provided by
/// the cursor store in `serialise_publishing`.
///
/// This strategy must **not** be used when multiple threads publish
/// concurrently on the same sequencer.
pub struct SingleProducerClaimStrategy {
    buffer_size: usize,
    min_gating_sequence: PaddedCell,
    claim_sequence: PaddedCell,
}

// SAFETY: the unsynchronized fields are only touched by the claim-side
// methods, which the type contract restricts to one publisher thread. All
// cross-thread communication goes through the cursor and the gating
// sequences, which are atomic.
unsafe impl Sync for SingleProducerClaimStrategy {}

impl SingleProducerClaimStrategy {
    /// Create a new single-producer claim strategy for the given buffer size
    pub fn new(buffer_size: usize) -> Result<Self> {
        validate_buffer_size(buffer_size)?;
        Ok(Self {
            buffer_size,
            min_gating_sequence: PaddedCell::new(INITIAL_CURSOR_VALUE),
            claim_sequence: PaddedCell::new(INITIAL_CURSOR_VALUE),
        })
    }

    fn wait_for_free_slot(&self, sequence: i64, dependent_sequences: &[Arc<Sequence>]) {
        let wrap_point = sequence - self.buffer_size as i64;

        // SAFETY: single claiming thread (type contract).
        unsafe {
            if wrap_point > self.min_gating_sequence.get() {
                let min_sequence = spin_until_clear(wrap_point, dependent_sequences);
                self.min_gating_sequence.set(min_sequence);
            }
        }
    }
}

impl ClaimStrategy for SingleProducerClaimStrategy {
    fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    fn sequence(&self) -> i64 {
        // SAFETY: single claiming thread (type contract).
        unsafe { self.claim_sequence.get() }
    }

    fn has_available_capacity(
        &self,
        available_capacity: usize,
        dependent_sequences: &[Arc<Sequence>]
    ) -> bool {
        // SAFETY: single claiming thread (type contract).
        unsafe {
            let wrap_point =
                self.claim_sequence.get() + available_capacity as i64 - self.buffer_size as i64;

            if wrap_point > self.min_gating_sequence.get() {
                let min_sequence = minimum_sequence(dependent_sequences);
                self.min_gating_sequence.set(min_sequence);

                if wrap_point > min_sequence {
                    return false;
                }
            }
        }

        true
    }

    fn increment_and_get(&self, dependent_sequences: &[Arc<Sequence>]) -> i64 {
        // SAFETY: single claiming thread (type contract).
        let next_sequence = unsafe {
            let next = self.claim_sequence.get() + 1;
            self.claim_sequence.set(next);
            next
        };
        self.wait_for_free_slot(next_sequence, dependent_sequences);
        next_sequence
    }

    fn increment_and_get_batch(
        &self,
        delta: usize,
        dependent_sequences: &[Arc<Sequence>]
    ) -> i64 {
        // SAFETY: single claiming thread (type contract).
        let next_sequence = unsafe {
            let next = self.claim_sequence.get() + delta as i64;
            self.claim_sequence.set(next);
            next
        };
        self.wait_for_free_slot(next_sequence, dependent_sequences);
        next_sequence
    }

    fn set_sequence(&self, sequence: i64, dependent_sequences: &[Arc<Sequence>]) {
        // SAFETY: single claiming thread (type contract).
        unsafe {
            self.claim_sequence.set(sequence);
        }
        self.wait_for_free_slot(sequence, dependent_sequences);
    }

    fn check_and_increment(
        &self,
        available_capacity: usize,
        delta: usize,
        gating_sequences: &[Arc<Sequence>]
    ) -> Result<i64> {
        if !self.has_available_capacity(available_capacity, gating_sequences) {
            return Err(VortexError::InsufficientCapacity);
        }

        Ok(self.increment_and_get_batch(delta, gating_sequences))
    }

    fn serialise_publishing(&self, sequence: i64, cursor: &Sequence, _batch_size: usize) {
        // Single writer: the release store is the whole publication protocol.
        cursor.set(sequence);
    }
}

/// Shared claim state of the multi-producer strategies
struct MultiProducerCore {
    buffer_size: usize,
    claim_sequence: Sequence,
    /// Cached minimum of the gating sequences; advisory, refreshed before
    /// any blocking decision
    min_gating_sequence: Sequence,
}

impl MultiProducerCore {
    fn new(buffer_size: usize) -> Result<Self> {
        validate_buffer_size(buffer_size)?;
        Ok(Self {
            buffer_size,
            claim_sequence: Sequence::default(),
            min_gating_sequence: Sequence::default(),
        })
    }

    fn has_available_capacity_from(
        &self,
        sequence: i64,
        available_capacity: usize,
        dependent_sequences: &[Arc<Sequence>]
    ) -> bool {
        let wrap_point = sequence + available_capacity as i64 - self.buffer_size as i64;

        if wrap_point > self.min_gating_sequence.get() {
            let min_sequence = minimum_sequence(dependent_sequences);
            self.min_gating_sequence.set(min_sequence);

            if wrap_point > min_sequence {
                return false;
            }
        }

        true
    }

    fn increment_and_get(&self, dependent_sequences: &[Arc<Sequence>]) -> i64 {
        let next_sequence = self.claim_sequence.increment_and_get();
        self.wait_for_free_slot(next_sequence, dependent_sequences);
        next_sequence
    }

    fn increment_and_get_batch(
        &self,
        delta: usize,
        dependent_sequences: &[Arc<Sequence>]
    ) -> i64 {
        let next_sequence = self.claim_sequence.add_and_get(delta as i64);
        self.wait_for_free_slot(next_sequence, dependent_sequences);
        next_sequence
    }

    fn set_sequence(&self, sequence: i64, dependent_sequences: &[Arc<Sequence>]) {
        self.claim_sequence.set(sequence);
        self.wait_for_free_slot(sequence, dependent_sequences);
    }

    fn check_and_increment(
        &self,
        available_capacity: usize,
        delta: usize,
        gating_sequences: &[Arc<Sequence>]
    ) -> Result<i64> {
        loop {
            let sequence = self.claim_sequence.get();
            if !self.has_available_capacity_from(sequence, available_capacity, gating_sequences) {
                return Err(VortexError::InsufficientCapacity);
            }

            let next_sequence = sequence + delta as i64;
            if self.claim_sequence.compare_and_set(sequence, next_sequence) {
                return Ok(next_sequence);
            }
        }
    }

    fn wait_for_free_slot(&self, sequence: i64, dependent_sequences: &[Arc<Sequence>]) {
        let wrap_point = sequence - self.buffer_size as i64;

        if wrap_point > self.min_gating_sequence.get() {
            let min_sequence = spin_until_clear(wrap_point, dependent_sequences);
            self.min_gating_sequence.set(min_sequence);
        }
    }
}

/// Strategy for concurrently publishing threads
///
/// Claims are handed out with an atomic fetch-add; publication is
/// serialised through a pending-publication ring so the cursor only ever
/// advances through contiguous, fully written slots. A fast producer that
/// finds its predecessor already recorded in the pending ring carries that
/// publication forward with its own CAS.
pub struct MultiProducerClaimStrategy {
    core: MultiProducerCore,
    pending_publication: Box<[AtomicI64]>,
    pending_mask: i64,
}

impl MultiProducerClaimStrategy {
    /// Create a strategy with the default pending publication ring size
    pub fn new(buffer_size: usize) -> Result<Self> {
        Self::with_pending_buffer_size(buffer_size, DEFAULT_PENDING_BUFFER_SIZE)
    }

    /// Create a strategy with an explicit pending publication ring size
    ///
    /// `pending_buffer_size` bounds how many sequences may sit between a
    /// publisher's claim and the cursor; it must be a power of 2 and at
    /// least the worst-case in-flight claim span.
    pub fn with_pending_buffer_size(
        buffer_size: usize,
        pending_buffer_size: usize
    ) -> Result<Self> {
        if pending_buffer_size == 0 || !pending_buffer_size.is_power_of_two() {
            return Err(VortexError::out_of_range(format!(
                "pending buffer size must be a power of 2, was: {pending_buffer_size}"
            )));
        }

        let pending_publication = (0..pending_buffer_size)
            .map(|_| AtomicI64::new(INITIAL_CURSOR_VALUE))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Ok(Self {
            core: MultiProducerCore::new(buffer_size)?,
            pending_publication,
            pending_mask: pending_buffer_size as i64 - 1,
        })
    }

    #[inline]
    fn pending_entry(&self, sequence: i64) -> &AtomicI64 {
        &self.pending_publication[(sequence & self.pending_mask) as usize]
    }
}

impl ClaimStrategy for MultiProducerClaimStrategy {
    fn buffer_size(&self) -> usize {
        self.core.buffer_size
    }

    fn sequence(&self) -> i64 {
        self.core.claim_sequence.get()
    }

    fn has_available_capacity(
        &self,
        available_capacity: usize,
        dependent_sequences: &[Arc<Sequence>]
    ) -> bool {
        self.core.has_available_capacity_from(
            self.core.claim_sequence.get(),
            available_capacity,
            dependent_sequences
        )
    }

    fn increment_and_get(&self, dependent_sequences: &[Arc<Sequence>]) -> i64 {
        self.core.increment_and_get(dependent_sequences)
    }

    fn increment_and_get_batch(
        &self,
        delta: usize,
        dependent_sequences: &[Arc<Sequence>]
    ) -> i64 {
        self.core.increment_and_get_batch(delta, dependent_sequences)
    }

    fn set_sequence(&self, sequence: i64, dependent_sequences: &[Arc<Sequence>]) {
        self.core.set_sequence(sequence, dependent_sequences);
    }

    fn check_and_increment(
        &self,
        available_capacity: usize,
        delta: usize,
        gating_sequences: &[Arc<Sequence>]
    ) -> Result<i64> {
        self.core.check_and_increment(available_capacity, delta, gating_sequences)
    }

    fn serialise_publishing(&self, sequence: i64, cursor: &Sequence, batch_size: usize) {
        // Rate limit so a runaway publisher cannot lap the pending ring.
        let mut counter = PUBLISH_RATE_LIMIT_RETRIES;
        while sequence - cursor.get() > self.pending_publication.len() as i64 {
            counter -= 1;
            if counter == 0 {
                thread::yield_now();
                counter = PUBLISH_RATE_LIMIT_RETRIES;
            } else {
                std::hint::spin_loop();
            }
        }

        // Record the whole batch in the pending ring. Release stores: a
        // carrier advancing the cursor over these entries must also hand
        // the slot writes to consumers.
        let expected_sequence = sequence - batch_size as i64;
        for pending_sequence in expected_sequence + 1..sequence {
            self.pending_entry(pending_sequence).store(pending_sequence, Ordering::Release);
        }
        self.pending_entry(sequence).store(sequence, Ordering::Release);

        let cursor_sequence = cursor.get();
        if cursor_sequence >= sequence {
            return;
        }

        // Advance the cursor one sequence at a time while each next pending
        // entry is the sequence we expect; stop on CAS failure (someone
        // else is carrying) or on a pending-entry mismatch (not yet
        // published). The first step is always inside our own just
        // published batch.
        let mut expected = expected_sequence.max(cursor_sequence);
        let mut next = expected + 1;
        while cursor.compare_and_set(expected, next) {
            expected = next;
            next += 1;
            if self.pending_entry(next).load(Ordering::Acquire) != next {
                break;
            }
        }
    }
}

/// Multi-producer strategy that trades the pending ring for in-order
/// publication
///
/// Suitable when contention is low: each publisher busy-spins until the
/// cursor reaches the end of the previous batch, then stores its own.
pub struct MultiProducerLowContentionClaimStrategy {
    core: MultiProducerCore,
}

impl MultiProducerLowContentionClaimStrategy {
    /// Create a low-contention multi-producer claim strategy
    pub fn new(buffer_size: usize) -> Result<Self> {
        Ok(Self {
            core: MultiProducerCore::new(buffer_size)?,
        })
    }
}

impl ClaimStrategy for MultiProducerLowContentionClaimStrategy {
    fn buffer_size(&self) -> usize {
        self.core.buffer_size
    }

    fn sequence(&self) -> i64 {
        self.core.claim_sequence.get()
    }

    fn has_available_capacity(
        &self,
        available_capacity: usize,
        dependent_sequences: &[Arc<Sequence>]
    ) -> bool {
        self.core.has_available_capacity_from(
            self.core.claim_sequence.get(),
            available_capacity,
            dependent_sequences
        )
    }

    fn increment_and_get(&self, dependent_sequences: &[Arc<Sequence>]) -> i64 {
        self.core.increment_and_get(dependent_sequences)
    }

    fn increment_and_get_batch(
        &self,
        delta: usize,
        dependent_sequences: &[Arc<Sequence>]
    ) -> i64 {
        self.core.increment_and_get_batch(delta, dependent_sequences)
    }

    fn set_sequence(&self, sequence: i64, dependent_sequences: &[Arc<Sequence>]) {
        self.core.set_sequence(sequence, dependent_sequences);
    }

    fn check_and_increment(
        &self,
        available_capacity: usize,
        delta: usize,
        gating_sequences: &[Arc<Sequence>]
    ) -> Result<i64> {
        self.core.check_and_increment(available_capacity, delta, gating_sequences)
    }

    fn serialise_publishing(&self, sequence: i64, cursor: &Sequence, batch_size: usize) {
        let expected_sequence = sequence - batch_size as i64;
        while expected_sequence != cursor.get() {
            std::hint::spin_loop();
        }

        cursor.set(sequence);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Barrier;

    const BUFFER_SIZE: usize = 8;

    fn one_dependent() -> Vec<Arc<Sequence>> {
        vec![Arc::new(Sequence::default())]
    }

    mod single_producer {
        use super::*;

        #[test]
        fn test_rejects_non_power_of_two_buffer() {
            assert!(matches!(
                SingleProducerClaimStrategy::new(3),
                Err(VortexError::OutOfRange(_))
            ));
            assert!(matches!(
                SingleProducerClaimStrategy::new(0),
                Err(VortexError::OutOfRange(_))
            ));
        }

        #[test]
        fn test_reports_buffer_size_and_initial_sequence() {
            let strategy = SingleProducerClaimStrategy::new(BUFFER_SIZE).unwrap();
            assert_eq!(strategy.buffer_size(), BUFFER_SIZE);
            assert_eq!(strategy.sequence(), INITIAL_CURSOR_VALUE);
        }

        #[test]
        fn test_claims_are_strictly_increasing() {
            let strategy = SingleProducerClaimStrategy::new(BUFFER_SIZE).unwrap();
            let dependents = one_dependent();
            dependents[0].set(100);

            let mut previous = INITIAL_CURSOR_VALUE;
            for _ in 0..20 {
                let claimed = strategy.increment_and_get(&dependents);
                assert!(claimed > previous);
                previous = claimed;
            }
        }

        #[test]
        fn test_claims_batch() {
            let strategy = SingleProducerClaimStrategy::new(BUFFER_SIZE).unwrap();
            let dependents = one_dependent();

            assert_eq!(strategy.increment_and_get_batch(5, &dependents), 4);
            assert_eq!(strategy.sequence(), 4);
        }

        #[test]
        fn test_set_sequence_moves_claim() {
            let strategy = SingleProducerClaimStrategy::new(BUFFER_SIZE).unwrap();
            let dependents = one_dependent();

            strategy.set_sequence(5, &dependents);
            assert_eq!(strategy.sequence(), 5);
        }

        #[test]
        fn test_no_capacity_when_buffer_is_full() {
            let strategy = SingleProducerClaimStrategy::new(BUFFER_SIZE).unwrap();
            let dependents = one_dependent();

            assert!(strategy.has_available_capacity(1, &dependents));
            strategy.set_sequence(BUFFER_SIZE as i64 - 1, &dependents);
            assert!(!strategy.has_available_capacity(1, &dependents));
        }

        #[test]
        fn test_check_and_increment_fails_without_capacity() {
            let strategy = SingleProducerClaimStrategy::new(BUFFER_SIZE).unwrap();
            let dependents = one_dependent();

            assert!(matches!(
                strategy.check_and_increment(BUFFER_SIZE + 1, 1, &dependents),
                Err(VortexError::InsufficientCapacity)
            ));
            assert_eq!(strategy.check_and_increment(4, 4, &dependents).unwrap(), 3);
        }

        #[test]
        fn test_serialise_publishing_stores_cursor() {
            let strategy = SingleProducerClaimStrategy::new(BUFFER_SIZE).unwrap();
            let cursor = Sequence::default();

            let sequence = strategy.increment_and_get(&one_dependent());
            strategy.serialise_publishing(sequence, &cursor, 1);
            assert_eq!(cursor.get(), sequence);
        }

        #[test]
        fn test_holds_publisher_at_wrap_point_until_consumer_advances() {
            let strategy = Arc::new(SingleProducerClaimStrategy::new(BUFFER_SIZE).unwrap());
            let dependents = one_dependent();
            strategy.set_sequence(BUFFER_SIZE as i64 - 1, &dependents);

            let done = Arc::new(AtomicBool::new(false));

            crossbeam::thread::scope(|scope| {
                let publisher = {
                    let strategy = Arc::clone(&strategy);
                    let dependents = dependents.clone();
                    let done = Arc::clone(&done);
                    scope.spawn(move |_| {
                        let claimed = strategy.increment_and_get(&dependents);
                        done.store(true, Ordering::Release);
                        claimed
                    })
                };

                thread::sleep(Duration::from_millis(100));
                assert!(!done.load(Ordering::Acquire));

                dependents[0].set(0);

                assert_eq!(publisher.join().unwrap(), BUFFER_SIZE as i64);
            })
            .unwrap();

            assert_eq!(strategy.sequence(), BUFFER_SIZE as i64);
        }

        proptest::proptest! {
            #[test]
            fn prop_batch_claims_accumulate(deltas in proptest::collection::vec(1usize..8, 1..16)) {
                let strategy = SingleProducerClaimStrategy::new(1024).unwrap();
                let dependents = one_dependent();
                dependents[0].set(i64::MAX / 2);

                let mut expected = INITIAL_CURSOR_VALUE;
                for delta in deltas {
                    expected += delta as i64;
                    proptest::prop_assert_eq!(
                        strategy.increment_and_get_batch(delta, &dependents),
                        expected
                    );
                }
            }
        }
    }

    mod multi_producer {
        use super::*;

        #[test]
        fn test_rejects_non_power_of_two_sizes() {
            assert!(matches!(
                MultiProducerClaimStrategy::with_pending_buffer_size(1024, 129),
                Err(VortexError::OutOfRange(_))
            ));
            assert!(matches!(
                MultiProducerClaimStrategy::new(3),
                Err(VortexError::OutOfRange(_))
            ));
        }

        #[test]
        fn test_reports_buffer_size_and_initial_sequence() {
            let strategy = MultiProducerClaimStrategy::new(BUFFER_SIZE).unwrap();
            assert_eq!(strategy.buffer_size(), BUFFER_SIZE);
            assert_eq!(strategy.sequence(), INITIAL_CURSOR_VALUE);
        }

        #[test]
        fn test_claims_initial_sequence() {
            let strategy = MultiProducerClaimStrategy::new(BUFFER_SIZE).unwrap();
            let dependents = one_dependent();

            assert_eq!(strategy.increment_and_get(&dependents), 0);
            assert_eq!(strategy.sequence(), 0);
        }

        #[test]
        fn test_claims_initial_batch() {
            let strategy = MultiProducerClaimStrategy::new(BUFFER_SIZE).unwrap();
            let dependents = one_dependent();

            assert_eq!(strategy.increment_and_get_batch(5, &dependents), 4);
            assert_eq!(strategy.sequence(), 4);
        }

        #[test]
        fn test_set_sequence_moves_claim() {
            let strategy = MultiProducerClaimStrategy::new(BUFFER_SIZE).unwrap();
            let dependents = one_dependent();

            strategy.set_sequence(5, &dependents);
            assert_eq!(strategy.sequence(), 5);
        }

        #[test]
        fn test_no_capacity_when_buffer_is_full() {
            let strategy = MultiProducerClaimStrategy::new(BUFFER_SIZE).unwrap();
            let dependents = one_dependent();

            assert!(strategy.has_available_capacity(1, &dependents));
            strategy.set_sequence(BUFFER_SIZE as i64 - 1, &dependents);
            assert!(!strategy.has_available_capacity(1, &dependents));
        }

        #[test]
        fn test_check_and_increment_fails_without_capacity() {
            let strategy = MultiProducerClaimStrategy::new(BUFFER_SIZE).unwrap();
            let dependents = one_dependent();

            assert!(matches!(
                strategy.check_and_increment(BUFFER_SIZE + 1, 1, &dependents),
                Err(VortexError::InsufficientCapacity)
            ));
        }

        #[test]
        fn test_check_and_increment_hands_out_every_slot() {
            let strategy = MultiProducerClaimStrategy::new(BUFFER_SIZE).unwrap();
            let dependents = one_dependent();

            for expected in 0..BUFFER_SIZE as i64 {
                assert_eq!(
                    strategy.check_and_increment(1, 1, &dependents).unwrap(),
                    expected
                );
            }
        }

        #[test]
        fn test_check_and_increment_batched() {
            let strategy = MultiProducerClaimStrategy::new(BUFFER_SIZE).unwrap();
            let dependents = one_dependent();

            assert_eq!(strategy.check_and_increment(4, 4, &dependents).unwrap(), 3);
            assert_eq!(strategy.check_and_increment(4, 4, &dependents).unwrap(), 7);
        }

        #[test]
        fn test_holds_claim_at_wrap_point_until_consumer_advances() {
            let strategy = Arc::new(MultiProducerClaimStrategy::new(BUFFER_SIZE).unwrap());
            let dependents = one_dependent();
            strategy.set_sequence(BUFFER_SIZE as i64 - 1, &dependents);

            let done = Arc::new(AtomicBool::new(false));

            crossbeam::thread::scope(|scope| {
                let publisher = {
                    let strategy = Arc::clone(&strategy);
                    let dependents = dependents.clone();
                    let done = Arc::clone(&done);
                    scope.spawn(move |_| {
                        let claimed = strategy.increment_and_get(&dependents);
                        done.store(true, Ordering::Release);
                        claimed
                    })
                };

                thread::sleep(Duration::from_millis(100));
                assert!(!done.load(Ordering::Acquire));

                dependents[0].set(0);

                assert_eq!(publisher.join().unwrap(), BUFFER_SIZE as i64);
            })
            .unwrap();

            assert_eq!(strategy.sequence(), BUFFER_SIZE as i64);
        }

        #[test]
        fn test_serialise_publishing_advances_cursor() {
            let strategy = MultiProducerClaimStrategy::new(BUFFER_SIZE).unwrap();
            let cursor = Sequence::default();

            let sequence = strategy.increment_and_get(&one_dependent());
            strategy.serialise_publishing(sequence, &cursor, 1);
            assert_eq!(cursor.get(), sequence);
        }

        #[test]
        fn test_out_of_order_publication_is_carried_forward() {
            let strategy = MultiProducerClaimStrategy::new(BUFFER_SIZE).unwrap();
            let dependents = one_dependent();
            let cursor = Sequence::default();

            let first = strategy.increment_and_get(&dependents);
            let second = strategy.increment_and_get(&dependents);

            // The later claim publishes first: the cursor must not move.
            strategy.serialise_publishing(second, &cursor, 1);
            assert_eq!(cursor.get(), INITIAL_CURSOR_VALUE);

            // Publishing the earlier claim carries both onto the cursor.
            strategy.serialise_publishing(first, &cursor, 1);
            assert_eq!(cursor.get(), second);
        }

        #[test]
        fn test_only_claims_whats_available_under_contention() {
            for _ in 0..100 {
                let num_threads = BUFFER_SIZE * 2;
                let strategy = MultiProducerClaimStrategy::new(BUFFER_SIZE).unwrap();
                let dependents = one_dependent();
                let start = Barrier::new(num_threads);
                let claimed: Vec<AtomicI64> =
                    (0..num_threads).map(|_| AtomicI64::new(0)).collect();

                crossbeam::thread::scope(|scope| {
                    for _ in 0..num_threads {
                        scope.spawn(|_| {
                            start.wait();
                            if let Ok(next) = strategy.check_and_increment(1, 1, &dependents) {
                                claimed[next as usize].fetch_add(1, Ordering::SeqCst);
                            }
                        });
                    }
                })
                .unwrap();

                for slot in claimed.iter().take(BUFFER_SIZE) {
                    assert_eq!(slot.load(Ordering::SeqCst), 1);
                }
                for slot in claimed.iter().skip(BUFFER_SIZE) {
                    assert_eq!(slot.load(Ordering::SeqCst), 0);
                }
            }
        }

        #[test]
        fn test_two_publishers_with_batches_serialise_onto_cursor() {
            let strategy = MultiProducerClaimStrategy::new(BUFFER_SIZE).unwrap();
            let cursor = Sequence::default();
            let dependents: Vec<Arc<Sequence>> = Vec::new();

            const ITERATIONS: usize = 1_000;
            const BATCH_SIZE: usize = 44;

            crossbeam::thread::scope(|scope| {
                for _ in 0..2 {
                    scope.spawn(|_| {
                        for _ in 0..ITERATIONS {
                            let sequence =
                                strategy.increment_and_get_batch(BATCH_SIZE, &dependents);
                            strategy.serialise_publishing(sequence, &cursor, BATCH_SIZE);
                        }
                    });
                }
            })
            .unwrap();

            assert_eq!(cursor.get(), (2 * ITERATIONS * BATCH_SIZE) as i64 - 1);
        }
    }

    mod multi_producer_low_contention {
        use super::*;

        #[test]
        fn test_serialises_in_claim_order() {
            let strategy = MultiProducerLowContentionClaimStrategy::new(BUFFER_SIZE).unwrap();
            let dependents = one_dependent();
            let cursor = Arc::new(Sequence::default());

            let first = strategy.increment_and_get(&dependents);
            let second = strategy.increment_and_get(&dependents);

            crossbeam::thread::scope(|scope| {
                let trailing = {
                    let cursor = Arc::clone(&cursor);
                    let strategy = &strategy;
                    scope.spawn(move |_| {
                        strategy.serialise_publishing(second, &cursor, 1);
                    })
                };

                thread::sleep(Duration::from_millis(10));
                assert_eq!(cursor.get(), INITIAL_CURSOR_VALUE);

                strategy.serialise_publishing(first, &cursor, 1);
                trailing.join().unwrap();
            })
            .unwrap();

            assert_eq!(cursor.get(), second);
        }

        #[test]
        fn test_shares_claim_semantics() {
            let strategy = MultiProducerLowContentionClaimStrategy::new(BUFFER_SIZE).unwrap();
            let dependents = one_dependent();

            assert_eq!(strategy.increment_and_get(&dependents), 0);
            assert_eq!(strategy.increment_and_get_batch(3, &dependents), 3);
            assert!(matches!(
                strategy.check_and_increment(BUFFER_SIZE + 1, 1, &dependents),
                Err(VortexError::InsufficientCapacity)
            ));
        }
    }
}
