//! Coordinator for claiming and publishing sequences
//!
//! The `Sequencer` ties a claim strategy, a wait strategy, the publisher
//! cursor and the gating-sequence set together. Producers talk to it to
//! claim and publish; consumers get their barriers from it.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::barrier::SequenceBarrier;
use crate::claim_strategy::ClaimStrategy;
use crate::constants::INITIAL_CURSOR_VALUE;
use crate::error::{ Result, VortexError };
use crate::sequence::Sequence;
use crate::utils::minimum_sequence;
use crate::wait_strategy::WaitStrategy;

/// Records a batch of sequences claimed via a [`Sequencer`]
#[derive(Debug, Clone)]
pub struct BatchDescriptor {
    size: usize,
    end: i64,
}

impl BatchDescriptor {
    /// Create a holder for a batch of `size` sequences
    pub(crate) fn new(size: usize) -> Self {
        Self {
            size,
            end: INITIAL_CURSOR_VALUE,
        }
    }

    /// The last sequence in the batch
    pub fn end(&self) -> i64 {
        self.end
    }

    /// The number of sequences in the batch
    pub fn size(&self) -> usize {
        self.size
    }

    /// The first sequence in the batch
    pub fn start(&self) -> i64 {
        self.end - (self.size as i64 - 1)
    }

    pub(crate) fn set_end(&mut self, end: i64) {
        self.end = end;
    }
}

/// Coordinator for claiming sequences while tracking dependent consumers
pub struct Sequencer {
    cursor: Arc<Sequence>,
    /// Consumer sequences bounding how far publishers may run ahead
    gating_sequences: RwLock<Vec<Arc<Sequence>>>,
    claim_strategy: Box<dyn ClaimStrategy>,
    wait_strategy: Arc<dyn WaitStrategy>,
}

impl Sequencer {
    /// Construct a sequencer with the selected strategies
    pub fn new(
        claim_strategy: Box<dyn ClaimStrategy>,
        wait_strategy: Arc<dyn WaitStrategy>
    ) -> Self {
        Self {
            cursor: Arc::new(Sequence::default()),
            gating_sequences: RwLock::new(Vec::new()),
            claim_strategy,
            wait_strategy,
        }
    }

    /// Set the sequences that gate publishers to prevent the buffer
    /// wrapping over unconsumed slots
    ///
    /// Must be called before any sequence is claimed; claiming without
    /// gating sequences fails with [`VortexError::OutOfRange`].
    pub fn set_gating_sequences(&self, sequences: Vec<Arc<Sequence>>) {
        *self.gating_sequences.write() = sequences;
    }

    /// Create a barrier gated on the cursor and the given sequences
    pub fn new_barrier(&self, sequences_to_track: Vec<Arc<Sequence>>) -> SequenceBarrier {
        SequenceBarrier::new(
            Arc::clone(&self.wait_strategy),
            Arc::clone(&self.cursor),
            sequences_to_track
        )
    }

    /// Create a batch descriptor clamped to the buffer size
    pub fn new_batch_descriptor(&self, size: usize) -> BatchDescriptor {
        BatchDescriptor::new(size.min(self.buffer_size()))
    }

    /// The capacity of the underlying slot buffer
    pub fn buffer_size(&self) -> usize {
        self.claim_strategy.buffer_size()
    }

    /// Value of the cursor for events that have been published
    pub fn get_cursor(&self) -> i64 {
        self.cursor.get()
    }

    /// The cursor sequence itself, shared by identity
    pub fn cursor_sequence(&self) -> Arc<Sequence> {
        Arc::clone(&self.cursor)
    }

    /// Whether the buffer has capacity for `available_capacity` more claims
    ///
    /// Concurrent method; the response is only an indication.
    pub fn has_available_capacity(&self, available_capacity: usize) -> bool {
        let gating = self.gating_sequences.read();
        self.claim_strategy.has_available_capacity(available_capacity, &gating)
    }

    /// Slots remaining before publishers would wrap over the slowest
    /// gating consumer
    pub fn remaining_capacity(&self) -> i64 {
        let gating = self.gating_sequences.read();
        let consumed = minimum_sequence(&gating);
        let produced = self.cursor.get();
        self.buffer_size() as i64 - (produced - consumed)
    }

    /// Claim the next sequence for publishing
    pub fn next(&self) -> Result<i64> {
        let gating = self.checked_gating_sequences()?;
        Ok(self.claim_strategy.increment_and_get(&gating))
    }

    /// Attempt to claim the next sequence without blocking
    ///
    /// Succeeds only if at least `available_capacity` slots are free.
    pub fn try_next(&self, available_capacity: usize) -> Result<i64> {
        let gating = self.checked_gating_sequences()?;
        if available_capacity < 1 {
            return Err(VortexError::out_of_range(
                "available capacity must be greater than 0"
            ));
        }

        self.claim_strategy.check_and_increment(available_capacity, 1, &gating)
    }

    /// Claim the next batch of sequences, filling in the batch end
    pub fn next_batch(&self, mut batch_descriptor: BatchDescriptor) -> Result<BatchDescriptor> {
        let gating = self.checked_gating_sequences()?;
        let sequence =
            self.claim_strategy.increment_and_get_batch(batch_descriptor.size(), &gating);
        batch_descriptor.set_end(sequence);
        Ok(batch_descriptor)
    }

    /// Claim a specific sequence; only valid with a single publisher
    pub fn claim(&self, sequence: i64) -> Result<i64> {
        let gating = self.checked_gating_sequences()?;
        self.claim_strategy.set_sequence(sequence, &gating);
        Ok(sequence)
    }

    /// Publish an event, making it visible to event processors
    pub fn publish(&self, sequence: i64) {
        self.publish_with_batch_size(sequence, 1);
    }

    /// Publish a claimed batch of events in sequence
    pub fn publish_batch(&self, batch_descriptor: &BatchDescriptor) {
        self.publish_with_batch_size(batch_descriptor.end(), batch_descriptor.size());
    }

    /// Publish `batch_size` events ending at `sequence`
    pub fn publish_with_batch_size(&self, sequence: i64, batch_size: usize) {
        self.claim_strategy.serialise_publishing(sequence, &self.cursor, batch_size);
        self.wait_strategy.signal_all_when_blocking();
    }

    /// Force the cursor to a sequence
    ///
    /// Only use when a single publisher exists.
    pub fn force_publish(&self, sequence: i64) {
        self.cursor.set(sequence);
        self.wait_strategy.signal_all_when_blocking();
    }

    fn checked_gating_sequences(
        &self
    ) -> Result<parking_lot::RwLockReadGuard<'_, Vec<Arc<Sequence>>>> {
        let gating = self.gating_sequences.read();
        if gating.is_empty() {
            return Err(VortexError::out_of_range(
                "gating sequences must be set before claiming sequences"
            ));
        }
        Ok(gating)
    }
}
