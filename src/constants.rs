//! Vortex tuning constants and configuration
//!
//! This module contains the tuning constants and default configuration
//! values used throughout the Vortex engine.

/// Initial value of every sequence counter before anything is published
pub const INITIAL_CURSOR_VALUE: i64 = -1;

/// Cache line size for alignment optimizations (64 bytes on most modern CPUs)
pub const CACHE_LINE_SIZE: usize = 64;

/// Alignment used for padded sequence counters
///
/// Two cache lines, because modern Intel CPUs prefetch adjacent cache line
/// pairs and a single line of padding still allows false sharing.
pub const SEQUENCE_ALIGNMENT: usize = 128;

/// Default size of the multi-producer pending publication ring (must be a
/// power of 2)
///
/// Must be at least as large as the worst-case span of sequences any
/// producer can have in flight between claim and publish. Sizing it too
/// small makes the publication serialiser spin forever; that is a
/// configuration error, not a runtime policy.
pub const DEFAULT_PENDING_BUFFER_SIZE: usize = 1024;

/// Spin budget of the sleeping wait strategy before it starts yielding
pub const SLEEPING_SPIN_THRESHOLD: u32 = 100;

/// Total retry budget of the sleeping wait strategy before it falls back to
/// nanosecond sleeps
pub const SLEEPING_RETRIES: u32 = 200;

/// Spin iterations between yields while the multi-producer publication
/// serialiser waits for room in the pending ring
pub const PUBLISH_RATE_LIMIT_RETRIES: u32 = 1000;

/// Validate that all constants are properly configured
pub fn validate_constants() -> Result<(), &'static str> {
    if !DEFAULT_PENDING_BUFFER_SIZE.is_power_of_two() {
        return Err("DEFAULT_PENDING_BUFFER_SIZE must be a power of 2");
    }

    if !CACHE_LINE_SIZE.is_power_of_two() || !SEQUENCE_ALIGNMENT.is_power_of_two() {
        return Err("cache geometry constants must be powers of 2");
    }

    if SEQUENCE_ALIGNMENT < CACHE_LINE_SIZE {
        return Err("SEQUENCE_ALIGNMENT must cover at least one cache line");
    }

    if SLEEPING_RETRIES <= SLEEPING_SPIN_THRESHOLD {
        return Err("SLEEPING_RETRIES must leave room for the yield phase");
    }

    if PUBLISH_RATE_LIMIT_RETRIES == 0 {
        return Err("PUBLISH_RATE_LIMIT_RETRIES must be greater than 0");
    }

    Ok(())
}
