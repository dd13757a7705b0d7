//! Event handler and exception handler interfaces
//!
//! Event handlers are the user-facing edge of a consumer: the batch event
//! processor hands every published event to one, in sequence order, with an
//! end-of-batch hint. Failures raised by a handler are routed to an
//! exception handler whose verdict decides whether the consumer survives.

use crate::error::{ Result, VortexError };

/// Callback interface for processing events as they become available
///
/// Implement `on_start`/`on_shutdown` as well to be notified just after the
/// processor thread starts and just before it shuts down.
pub trait EventHandler<E>: Send {
    /// Called when a publisher has published an event
    ///
    /// `end_of_batch` indicates this is the last event of the contiguous
    /// range delivered in this iteration; a good moment to flush.
    fn on_event(&mut self, event: &E, sequence: i64, end_of_batch: bool) -> anyhow::Result<()>;

    /// Called once on the processor thread before the first event
    fn on_start(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called once just before the processor thread shuts down
    fn on_shutdown(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// An aggregate collection of event handlers called in sequence
pub struct AggregateEventHandler<E> {
    event_handlers: Vec<Box<dyn EventHandler<E>>>,
}

impl<E> AggregateEventHandler<E> {
    /// Construct an aggregate over handlers to be called in order
    pub fn new(event_handlers: Vec<Box<dyn EventHandler<E>>>) -> Self {
        Self { event_handlers }
    }
}

impl<E> EventHandler<E> for AggregateEventHandler<E> {
    fn on_event(&mut self, event: &E, sequence: i64, end_of_batch: bool) -> anyhow::Result<()> {
        for event_handler in &mut self.event_handlers {
            event_handler.on_event(event, sequence, end_of_batch)?;
        }
        Ok(())
    }

    fn on_start(&mut self) -> anyhow::Result<()> {
        for event_handler in &mut self.event_handlers {
            event_handler.on_start()?;
        }
        Ok(())
    }

    fn on_shutdown(&mut self) -> anyhow::Result<()> {
        for event_handler in &mut self.event_handlers {
            event_handler.on_shutdown()?;
        }
        Ok(())
    }
}

/// Callback handler for uncaught failures in the event processing cycle
pub trait ExceptionHandler: Send + Sync {
    /// Strategy for handling a failure raised while processing an event
    ///
    /// Returning an error suspends further processing by the batch event
    /// processor; returning `Ok(())` lets it continue with the next event.
    fn handle_event_exception(&self, error: anyhow::Error, sequence: i64) -> Result<()>;

    /// Notification of a failure during the start hook
    fn handle_on_start_exception(&self, error: anyhow::Error);

    /// Notification of a failure during the shutdown hook
    fn handle_on_shutdown_exception(&self, error: anyhow::Error);
}

/// Default exception handler: event failures are terminal
pub struct FatalExceptionHandler;

impl ExceptionHandler for FatalExceptionHandler {
    fn handle_event_exception(&self, error: anyhow::Error, sequence: i64) -> Result<()> {
        tracing::error!(sequence, error = %error, "fatal unhandled exception while processing event");
        Err(VortexError::Handler {
            sequence,
            source: error,
        })
    }

    fn handle_on_start_exception(&self, error: anyhow::Error) {
        tracing::warn!(error = %error, "exception during on_start");
    }

    fn handle_on_shutdown_exception(&self, error: anyhow::Error) {
        tracing::warn!(error = %error, "exception during on_shutdown");
    }
}
