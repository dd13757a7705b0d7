//! Event processors: the consumer side of the engine
//!
//! A [`BatchEventProcessor`] owns one consumer's loop: wait on the barrier,
//! deliver every available event to the handler in sequence order, publish
//! progress, repeat until halted.

use std::sync::atomic::{ AtomicBool, Ordering };
use std::sync::Arc;

use parking_lot::Mutex;

use crate::barrier::SequenceBarrier;
use crate::error::{ Result, VortexError };
use crate::event::{ EventHandler, ExceptionHandler, FatalExceptionHandler };
use crate::ring_buffer::RingBuffer;
use crate::sequence::Sequence;
use crate::sequencer::Sequencer;

/// A driver that waits for events to become available for consumption
///
/// An event processor is associated with one thread of execution.
pub trait EventProcessor: Send + Sync {
    /// The sequence this processor publishes its progress through
    fn sequence(&self) -> Arc<Sequence>;

    /// Signal the processor to stop at the next clean break
    fn halt(&self);

    /// Run the processing loop until halted
    fn run(&self) -> Result<()>;
}

/// Convenience processor handling the batching semantics of consuming
/// entries from a ring buffer and delegating to an [`EventHandler`]
///
/// The handler's `on_start`/`on_shutdown` hooks are invoked just after the
/// thread enters `run` and just before it leaves.
pub struct BatchEventProcessor<E> {
    running: AtomicBool,
    exception_handler: Mutex<Arc<dyn ExceptionHandler>>,
    ring_buffer: Arc<RingBuffer<E>>,
    sequence_barrier: SequenceBarrier,
    event_handler: Mutex<Box<dyn EventHandler<E>>>,
    sequence: Arc<Sequence>,
}

impl<E: Send + Sync> BatchEventProcessor<E> {
    /// Create a processor over the given barrier and handler
    pub fn new(
        ring_buffer: Arc<RingBuffer<E>>,
        sequence_barrier: SequenceBarrier,
        event_handler: Box<dyn EventHandler<E>>
    ) -> Self {
        Self {
            running: AtomicBool::new(false),
            exception_handler: Mutex::new(Arc::new(FatalExceptionHandler)),
            ring_buffer,
            sequence_barrier,
            event_handler: Mutex::new(event_handler),
            sequence: Arc::new(Sequence::default()),
        }
    }

    /// Replace the handler for failures propagated out of the event handler
    pub fn set_exception_handler(&self, exception_handler: Arc<dyn ExceptionHandler>) {
        *self.exception_handler.lock() = exception_handler;
    }

    fn notify_start(&self, event_handler: &mut dyn EventHandler<E>) {
        tracing::trace!("event processor starting");
        if let Err(error) = event_handler.on_start() {
            self.exception_handler.lock().handle_on_start_exception(error);
        }
    }

    fn notify_shutdown(&self, event_handler: &mut dyn EventHandler<E>) {
        tracing::trace!("event processor shutting down");
        if let Err(error) = event_handler.on_shutdown() {
            self.exception_handler.lock().handle_on_shutdown_exception(error);
        }
    }
}

impl<E: Send + Sync> EventProcessor for BatchEventProcessor<E> {
    fn sequence(&self) -> Arc<Sequence> {
        Arc::clone(&self.sequence)
    }

    fn halt(&self) {
        tracing::debug!("halting event processor");
        self.running.store(false, Ordering::Release);
        self.sequence_barrier.alert();
    }

    /// It is ok to have another thread rerun this method after a halt().
    fn run(&self) -> Result<()> {
        if
            self.running
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
        {
            return Err(VortexError::illegal_state("event processor is already running"));
        }

        self.sequence_barrier.clear_alert();

        let mut event_handler = self.event_handler.lock();
        self.notify_start(&mut **event_handler);

        let mut result = Ok(());
        let mut next_sequence = self.sequence.get() + 1;

        'event_loop: loop {
            match self.sequence_barrier.wait_for(next_sequence) {
                Ok(available_sequence) => {
                    while next_sequence <= available_sequence {
                        let event = self.ring_buffer.get(next_sequence);
                        let end_of_batch = next_sequence == available_sequence;

                        if
                            let Err(error) =
                                event_handler.on_event(event, next_sequence, end_of_batch)
                        {
                            let verdict = self.exception_handler
                                .lock()
                                .handle_event_exception(error, next_sequence);

                            // The failing event counts as consumed; there
                            // is no rewind.
                            self.sequence.set(next_sequence);
                            next_sequence += 1;

                            match verdict {
                                Ok(()) => {
                                    continue 'event_loop;
                                }
                                Err(fatal) => {
                                    result = Err(fatal);
                                    break 'event_loop;
                                }
                            }
                        }

                        next_sequence += 1;
                    }

                    self.sequence.set(available_sequence);
                }
                Err(VortexError::Alerted) => {
                    if !self.running.load(Ordering::Acquire) {
                        break 'event_loop;
                    }
                }
                Err(error) => {
                    result = Err(error);
                    break 'event_loop;
                }
            }
        }

        self.notify_shutdown(&mut **event_handler);
        self.running.store(false, Ordering::Release);

        result
    }
}

/// Processor that only tracks the publisher cursor
///
/// Its sequence is the sequencer's cursor shared by identity, so gating on
/// it never holds publishers back. Useful to satisfy the non-empty gating
/// precondition when no real consumer exists.
pub struct NoOpEventProcessor {
    sequence: Arc<Sequence>,
}

impl NoOpEventProcessor {
    /// Construct a processor that simply follows the given sequencer
    pub fn new(sequencer: &Sequencer) -> Self {
        Self {
            sequence: sequencer.cursor_sequence(),
        }
    }
}

impl EventProcessor for NoOpEventProcessor {
    fn sequence(&self) -> Arc<Sequence> {
        Arc::clone(&self.sequence)
    }

    fn halt(&self) {}

    fn run(&self) -> Result<()> {
        Ok(())
    }
}
