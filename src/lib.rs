//! Vortex - High-performance inter-thread event exchange engine
//!
//! Vortex moves events between threads through a fixed-capacity,
//! pre-allocated ring buffer in the style of the LMAX Disruptor. Producers
//! claim contiguous, monotonically increasing sequence numbers; consumers
//! observe published events in sequence order and can be arranged in
//! dependency chains without per-event queue traffic.
//!
//! ## Key Features
//!
//! - **Pre-allocated slots**: events are constructed once and reused
//! - **Lock-free coordination**: cache-padded sequence counters, no
//!   per-slot locks
//! - **Claim strategies**: single-producer and multi-producer, with wrap
//!   protection against the slowest consumer
//! - **Wait strategies**: blocking, sleeping and busy-spin trade-offs
//! - **Batching**: producers claim and publish ranges; consumers receive
//!   end-of-batch hints
//!
//! ## Example Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use std::thread;
//! use vortex::{
//!     BatchEventProcessor, EventProcessor, RingBuffer,
//!     SingleProducerClaimStrategy, SleepingWaitStrategy,
//! };
//!
//! #[derive(Default)]
//! struct ValueEvent {
//!     value: i64,
//! }
//!
//! struct PrintingHandler;
//!
//! impl vortex::EventHandler<ValueEvent> for PrintingHandler {
//!     fn on_event(&mut self, event: &ValueEvent, sequence: i64, end_of_batch: bool) -> anyhow::Result<()> {
//!         println!("{} @ {} (end of batch: {})", event.value, sequence, end_of_batch);
//!         Ok(())
//!     }
//! }
//!
//! # fn main() -> vortex::Result<()> {
//! let ring_buffer = Arc::new(RingBuffer::<ValueEvent>::new(
//!     Box::new(SingleProducerClaimStrategy::new(1024)?),
//!     Arc::new(SleepingWaitStrategy::new()),
//! )?);
//!
//! let processor = Arc::new(BatchEventProcessor::new(
//!     Arc::clone(&ring_buffer),
//!     ring_buffer.new_barrier(Vec::new()),
//!     Box::new(PrintingHandler),
//! ));
//! ring_buffer.set_gating_sequences(vec![processor.sequence()]);
//!
//! let consumer = {
//!     let processor = Arc::clone(&processor);
//!     thread::spawn(move || processor.run())
//! };
//!
//! let sequence = ring_buffer.next()?;
//! // SAFETY: the sequence was claimed above and is not yet published.
//! unsafe {
//!     ring_buffer.get_mut(sequence).value = 2701;
//! }
//! ring_buffer.publish(sequence);
//!
//! processor.halt();
//! consumer.join().unwrap()?;
//! # Ok(())
//! # }
//! ```

pub mod barrier;
pub mod claim_strategy;
pub mod constants;
pub mod error;
pub mod event;
pub mod processor;
pub mod ring_buffer;
pub mod sequence;
pub mod sequencer;
pub mod utils;
pub mod wait_strategy;

// Re-export main components
pub use barrier::SequenceBarrier;
pub use claim_strategy::{
    ClaimStrategy,
    MultiProducerClaimStrategy,
    MultiProducerLowContentionClaimStrategy,
    SingleProducerClaimStrategy,
};
pub use constants::INITIAL_CURSOR_VALUE;
pub use error::{ Result, VortexError };
pub use event::{
    AggregateEventHandler,
    EventHandler,
    ExceptionHandler,
    FatalExceptionHandler,
};
pub use processor::{ BatchEventProcessor, EventProcessor, NoOpEventProcessor };
pub use ring_buffer::RingBuffer;
pub use sequence::Sequence;
pub use sequencer::{ BatchDescriptor, Sequencer };
pub use wait_strategy::{
    BlockingWaitStrategy,
    BusySpinWaitStrategy,
    SleepingWaitStrategy,
    WaitStrategy,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
