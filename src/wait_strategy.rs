//! Wait strategies for consumers waiting on a sequence barrier
//!
//! A wait strategy decides how a consumer burns time until the sequence it
//! wants becomes observable. Each variant trades latency against CPU usage:
//! busy spinning for the lowest latency, sleeping as a compromise, and
//! blocking on a condition variable when CPU is more precious than wake-up
//! time.

use std::sync::atomic::{ AtomicUsize, Ordering };
use std::sync::Arc;
use std::thread;
use std::time::{ Duration, Instant };

use parking_lot::{ Condvar, Mutex };

use crate::barrier::SequenceBarrier;
use crate::constants::{ SLEEPING_RETRIES, SLEEPING_SPIN_THRESHOLD };
use crate::error::Result;
use crate::sequence::Sequence;
use crate::utils::minimum_sequence;

/// Strategy employed to make consumers wait on the publisher cursor
///
/// The returned sequence may be greater than the requested one: it is the
/// highest sequence known observable to the caller, the minimum of the
/// cursor and the dependent sequences when both constrain it.
pub trait WaitStrategy: Send + Sync {
    /// Wait until `sequence` is available, or the barrier is alerted
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependents: &[Arc<Sequence>],
        barrier: &SequenceBarrier
    ) -> Result<i64>;

    /// Wait until `sequence` is available, giving up after `timeout`
    ///
    /// On timeout the current best known sequence is returned, which may
    /// still be less than the requested one; the caller must recheck.
    fn wait_for_timeout(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependents: &[Arc<Sequence>],
        barrier: &SequenceBarrier,
        timeout: Duration
    ) -> Result<i64>;

    /// Signal waiting consumers that the cursor has advanced
    ///
    /// Called by producers after a successful publish. Only the blocking
    /// strategy has anything to do here.
    fn signal_all_when_blocking(&self);
}

/// Decrements the waiter count when a blocked consumer leaves the lock,
/// alert or not
struct WaiterGuard<'a> {
    num_waiters: &'a AtomicUsize,
}

impl<'a> WaiterGuard<'a> {
    fn new(num_waiters: &'a AtomicUsize) -> Self {
        num_waiters.fetch_add(1, Ordering::Relaxed);
        Self { num_waiters }
    }
}

impl Drop for WaiterGuard<'_> {
    fn drop(&mut self) {
        self.num_waiters.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Blocking strategy using a lock and condition variable
///
/// This strategy can be used when throughput and low latency are not as
/// important as CPU resource.
pub struct BlockingWaitStrategy {
    lock: Mutex<()>,
    processor_notify_condition: Condvar,
    num_waiters: AtomicUsize,
}

impl BlockingWaitStrategy {
    /// Create a new blocking wait strategy
    pub fn new() -> Self {
        Self {
            lock: Mutex::new(()),
            processor_notify_condition: Condvar::new(),
            num_waiters: AtomicUsize::new(0),
        }
    }

    fn spin_on_dependents(
        &self,
        sequence: i64,
        dependents: &[Arc<Sequence>],
        barrier: &SequenceBarrier,
        deadline: Option<Instant>
    ) -> Result<i64> {
        let mut available_sequence;
        loop {
            available_sequence = minimum_sequence(dependents);
            if available_sequence >= sequence {
                break;
            }
            barrier.check_alert()?;
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    break;
                }
            }
            std::hint::spin_loop();
        }
        Ok(available_sequence)
    }
}

impl Default for BlockingWaitStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitStrategy for BlockingWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependents: &[Arc<Sequence>],
        barrier: &SequenceBarrier
    ) -> Result<i64> {
        let mut available_sequence = cursor.get();
        if available_sequence < sequence {
            let mut guard = self.lock.lock();
            let _waiter = WaiterGuard::new(&self.num_waiters);

            loop {
                available_sequence = cursor.get();
                if available_sequence >= sequence {
                    break;
                }
                barrier.check_alert()?;
                self.processor_notify_condition.wait(&mut guard);
            }
        }

        if !dependents.is_empty() {
            available_sequence = self.spin_on_dependents(sequence, dependents, barrier, None)?;
        }

        Ok(available_sequence)
    }

    fn wait_for_timeout(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependents: &[Arc<Sequence>],
        barrier: &SequenceBarrier,
        timeout: Duration
    ) -> Result<i64> {
        let deadline = Instant::now() + timeout;

        let mut available_sequence = cursor.get();
        if available_sequence < sequence {
            let mut guard = self.lock.lock();
            let _waiter = WaiterGuard::new(&self.num_waiters);

            loop {
                available_sequence = cursor.get();
                if available_sequence >= sequence {
                    break;
                }
                barrier.check_alert()?;

                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                if
                    self.processor_notify_condition
                        .wait_for(&mut guard, deadline - now)
                        .timed_out()
                {
                    available_sequence = cursor.get();
                    break;
                }
            }
        }

        if !dependents.is_empty() {
            available_sequence = self.spin_on_dependents(
                sequence,
                dependents,
                barrier,
                Some(deadline)
            )?;
        }

        Ok(available_sequence)
    }

    fn signal_all_when_blocking(&self) {
        if self.num_waiters.load(Ordering::Relaxed) != 0 {
            let _guard = self.lock.lock();
            self.processor_notify_condition.notify_all();
        }
    }
}

/// Sleeping strategy that spins first, then yields, then sleeps for the
/// minimum interval the OS will allow
///
/// A good compromise between performance and CPU resource. Latency spikes
/// can occur after quiet periods.
pub struct SleepingWaitStrategy {
    retries: u32,
}

impl SleepingWaitStrategy {
    /// Create a new sleeping wait strategy with the default retry budget
    pub fn new() -> Self {
        Self::with_retries(SLEEPING_RETRIES)
    }

    /// Create a new sleeping wait strategy with a custom retry budget
    pub fn with_retries(retries: u32) -> Self {
        Self { retries }
    }

    fn apply_wait_method(&self, barrier: &SequenceBarrier, counter: u32) -> Result<u32> {
        barrier.check_alert()?;

        if counter > SLEEPING_SPIN_THRESHOLD {
            std::hint::spin_loop();
            Ok(counter - 1)
        } else if counter > 0 {
            thread::yield_now();
            Ok(counter - 1)
        } else {
            thread::sleep(Duration::from_nanos(1));
            Ok(counter)
        }
    }
}

impl Default for SleepingWaitStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitStrategy for SleepingWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependents: &[Arc<Sequence>],
        barrier: &SequenceBarrier
    ) -> Result<i64> {
        let mut counter = self.retries;
        let mut available_sequence;

        if dependents.is_empty() {
            loop {
                available_sequence = cursor.get();
                if available_sequence >= sequence {
                    break;
                }
                counter = self.apply_wait_method(barrier, counter)?;
            }
        } else {
            loop {
                available_sequence = minimum_sequence(dependents);
                if available_sequence >= sequence {
                    break;
                }
                counter = self.apply_wait_method(barrier, counter)?;
            }
        }

        Ok(available_sequence)
    }

    fn wait_for_timeout(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependents: &[Arc<Sequence>],
        barrier: &SequenceBarrier,
        timeout: Duration
    ) -> Result<i64> {
        let start = Instant::now();
        let mut counter = self.retries;
        let mut available_sequence;

        if dependents.is_empty() {
            loop {
                available_sequence = cursor.get();
                if available_sequence >= sequence || start.elapsed() > timeout {
                    break;
                }
                counter = self.apply_wait_method(barrier, counter)?;
            }
        } else {
            loop {
                available_sequence = minimum_sequence(dependents);
                if available_sequence >= sequence || start.elapsed() > timeout {
                    break;
                }
                counter = self.apply_wait_method(barrier, counter)?;
            }
        }

        Ok(available_sequence)
    }

    fn signal_all_when_blocking(&self) {}
}

/// Busy-spin strategy for the lowest latency at the cost of a core
pub struct BusySpinWaitStrategy;

impl BusySpinWaitStrategy {
    /// Create a new busy spin wait strategy
    pub fn new() -> Self {
        Self
    }
}

impl Default for BusySpinWaitStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitStrategy for BusySpinWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependents: &[Arc<Sequence>],
        barrier: &SequenceBarrier
    ) -> Result<i64> {
        let mut available_sequence;

        if dependents.is_empty() {
            loop {
                available_sequence = cursor.get();
                if available_sequence >= sequence {
                    break;
                }
                barrier.check_alert()?;
                std::hint::spin_loop();
            }
        } else {
            loop {
                available_sequence = minimum_sequence(dependents);
                if available_sequence >= sequence {
                    break;
                }
                barrier.check_alert()?;
                std::hint::spin_loop();
            }
        }

        Ok(available_sequence)
    }

    fn wait_for_timeout(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependents: &[Arc<Sequence>],
        barrier: &SequenceBarrier,
        timeout: Duration
    ) -> Result<i64> {
        let start = Instant::now();
        let mut available_sequence;

        if dependents.is_empty() {
            loop {
                available_sequence = cursor.get();
                if available_sequence >= sequence || start.elapsed() > timeout {
                    break;
                }
                barrier.check_alert()?;
                std::hint::spin_loop();
            }
        } else {
            loop {
                available_sequence = minimum_sequence(dependents);
                if available_sequence >= sequence || start.elapsed() > timeout {
                    break;
                }
                barrier.check_alert()?;
                std::hint::spin_loop();
            }
        }

        Ok(available_sequence)
    }

    fn signal_all_when_blocking(&self) {}
}
