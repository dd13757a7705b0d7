//! Ring based store of reusable event slots
//!
//! The ring buffer owns a fixed, power-of-two array of pre-constructed
//! events and the [`Sequencer`] that coordinates access to it. Slots are
//! reused, never resized; `sequence & (N - 1)` maps a sequence onto its
//! slot.
//!
//! Slot ownership is logical, not enforced by locks:
//! - between claim and publish, the claiming producer has exclusive mutable
//!   access to the slot;
//! - once published, consumers whose barrier has released the sequence may
//!   read it;
//! - the slot becomes writable again only after every gating consumer has
//!   moved past it, which the claim strategies guarantee via the wrap bound.

use std::cell::UnsafeCell;
use std::sync::Arc;

use crate::barrier::SequenceBarrier;
use crate::claim_strategy::ClaimStrategy;
use crate::error::{ Result, VortexError };
use crate::sequence::Sequence;
use crate::sequencer::{ BatchDescriptor, Sequencer };
use crate::wait_strategy::WaitStrategy;

/// Ring based store of reusable entries exchanged between publishers and
/// event processors
pub struct RingBuffer<E> {
    sequencer: Sequencer,
    index_mask: i64,
    entries: Box<[UnsafeCell<E>]>,
}

// SAFETY: slots are only ever accessed under the sequence protocol
// described in the module docs: a producer writes a slot only between
// claiming and publishing its sequence, and consumers read it only after
// their barrier has observed the publication. The sequence counters
// involved are all release/acquire atomics, so slot accesses never race.
unsafe impl<E: Send> Send for RingBuffer<E> {}
unsafe impl<E: Send + Sync> Sync for RingBuffer<E> {}

impl<E: Default> RingBuffer<E> {
    /// Construct a ring buffer over the given strategies, pre-constructing
    /// every slot with `E::default()`
    pub fn new(
        claim_strategy: Box<dyn ClaimStrategy>,
        wait_strategy: Arc<dyn WaitStrategy>
    ) -> Result<Self> {
        let buffer_size = claim_strategy.buffer_size();
        if buffer_size == 0 || !buffer_size.is_power_of_two() {
            return Err(VortexError::out_of_range(format!(
                "buffer size must be a power of 2, was: {buffer_size}"
            )));
        }

        let entries = (0..buffer_size)
            .map(|_| UnsafeCell::new(E::default()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Ok(Self {
            sequencer: Sequencer::new(claim_strategy, wait_strategy),
            index_mask: buffer_size as i64 - 1,
            entries,
        })
    }
}

impl<E> RingBuffer<E> {
    /// Get the event stored for the given sequence
    ///
    /// The caller must only pass sequences its barrier (or its own claim)
    /// has released; the slot of an unpublished foreign sequence may be
    /// mid-write.
    #[inline]
    pub fn get(&self, sequence: i64) -> &E {
        // SAFETY: index is masked into bounds; shared access is covered by
        // the slot ownership protocol (see type-level SAFETY note).
        unsafe { &*self.entries[(sequence & self.index_mask) as usize].get() }
    }

    /// Get exclusive access to the event slot for a claimed sequence
    ///
    /// # Safety
    ///
    /// The caller must have claimed `sequence` from this ring buffer's
    /// sequencer and not yet published it. Within that window the claim
    /// protocol guarantees no other thread touches the slot.
    #[inline]
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn get_mut(&self, sequence: i64) -> &mut E {
        &mut *self.entries[(sequence & self.index_mask) as usize].get()
    }

    /// The embedded sequencer
    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    // Sequencer delegation, so a ring buffer can be used as the single
    // coordination handle the way the sequencer alone can.

    /// See [`Sequencer::set_gating_sequences`]
    pub fn set_gating_sequences(&self, sequences: Vec<Arc<Sequence>>) {
        self.sequencer.set_gating_sequences(sequences);
    }

    /// See [`Sequencer::new_barrier`]
    pub fn new_barrier(&self, sequences_to_track: Vec<Arc<Sequence>>) -> SequenceBarrier {
        self.sequencer.new_barrier(sequences_to_track)
    }

    /// See [`Sequencer::new_batch_descriptor`]
    pub fn new_batch_descriptor(&self, size: usize) -> BatchDescriptor {
        self.sequencer.new_batch_descriptor(size)
    }

    /// The capacity of the ring
    pub fn buffer_size(&self) -> usize {
        self.sequencer.buffer_size()
    }

    /// See [`Sequencer::get_cursor`]
    pub fn get_cursor(&self) -> i64 {
        self.sequencer.get_cursor()
    }

    /// See [`Sequencer::has_available_capacity`]
    pub fn has_available_capacity(&self, available_capacity: usize) -> bool {
        self.sequencer.has_available_capacity(available_capacity)
    }

    /// See [`Sequencer::remaining_capacity`]
    pub fn remaining_capacity(&self) -> i64 {
        self.sequencer.remaining_capacity()
    }

    /// See [`Sequencer::next`]
    pub fn next(&self) -> Result<i64> {
        self.sequencer.next()
    }

    /// See [`Sequencer::try_next`]
    pub fn try_next(&self, available_capacity: usize) -> Result<i64> {
        self.sequencer.try_next(available_capacity)
    }

    /// See [`Sequencer::next_batch`]
    pub fn next_batch(&self, batch_descriptor: BatchDescriptor) -> Result<BatchDescriptor> {
        self.sequencer.next_batch(batch_descriptor)
    }

    /// See [`Sequencer::claim`]
    pub fn claim(&self, sequence: i64) -> Result<i64> {
        self.sequencer.claim(sequence)
    }

    /// See [`Sequencer::publish`]
    pub fn publish(&self, sequence: i64) {
        self.sequencer.publish(sequence);
    }

    /// See [`Sequencer::publish_batch`]
    pub fn publish_batch(&self, batch_descriptor: &BatchDescriptor) {
        self.sequencer.publish_batch(batch_descriptor);
    }

    /// See [`Sequencer::force_publish`]
    pub fn force_publish(&self, sequence: i64) {
        self.sequencer.force_publish(sequence);
    }
}
