//! Coordination barrier between the publisher cursor and dependent consumers
//!
//! Every consumer waits on exactly one `SequenceBarrier`. The barrier folds
//! the publisher cursor, a snapshot of upstream consumer sequences and an
//! alert flag into a single `wait_for` contract.

use std::sync::atomic::{ AtomicBool, Ordering };
use std::sync::Arc;
use std::time::Duration;

use crate::error::{ Result, VortexError };
use crate::sequence::Sequence;
use crate::wait_strategy::WaitStrategy;

/// Coordination barrier for tracking the publisher cursor and the sequences
/// of dependent event processors
pub struct SequenceBarrier {
    wait_strategy: Arc<dyn WaitStrategy>,
    cursor: Arc<Sequence>,
    /// Upstream sequences this barrier must not pass; fixed at construction
    dependents: Box<[Arc<Sequence>]>,
    alerted: AtomicBool,
}

impl SequenceBarrier {
    /// Create a barrier over the given cursor and dependent snapshot
    pub fn new(
        wait_strategy: Arc<dyn WaitStrategy>,
        cursor: Arc<Sequence>,
        dependents: Vec<Arc<Sequence>>
    ) -> Self {
        Self {
            wait_strategy,
            cursor,
            dependents: dependents.into_boxed_slice(),
            alerted: AtomicBool::new(false),
        }
    }

    /// Wait for the given sequence to be available for consumption
    ///
    /// Returns the highest available sequence, which may be greater than
    /// the requested one. Fails with [`VortexError::Alerted`] if the
    /// barrier has been alerted.
    pub fn wait_for(&self, sequence: i64) -> Result<i64> {
        self.check_alert()?;
        self.wait_strategy.wait_for(sequence, &self.cursor, &self.dependents, self)
    }

    /// Wait for the given sequence with a timeout
    ///
    /// On timeout the best known sequence is returned, possibly still less
    /// than the requested one.
    pub fn wait_for_timeout(&self, sequence: i64, timeout: Duration) -> Result<i64> {
        self.check_alert()?;
        self.wait_strategy.wait_for_timeout(
            sequence,
            &self.cursor,
            &self.dependents,
            self,
            timeout
        )
    }

    /// Current value of the publisher cursor
    pub fn get_cursor(&self) -> i64 {
        self.cursor.get()
    }

    /// The current alert status of the barrier
    pub fn is_alerted(&self) -> bool {
        self.alerted.load(Ordering::Acquire)
    }

    /// Alert waiting event processors of a status change and stay in this
    /// state until cleared
    pub fn alert(&self) {
        tracing::trace!("sequence barrier alerted");
        self.alerted.store(true, Ordering::Release);
        self.wait_strategy.signal_all_when_blocking();
    }

    /// Clear the current alert status
    pub fn clear_alert(&self) {
        self.alerted.store(false, Ordering::Release);
    }

    /// Fail with [`VortexError::Alerted`] if an alert has been raised
    pub fn check_alert(&self) -> Result<()> {
        if self.is_alerted() {
            Err(VortexError::Alerted)
        } else {
            Ok(())
        }
    }
}
