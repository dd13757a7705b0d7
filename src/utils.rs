//! Shared helpers for sequence bookkeeping

use std::sync::Arc;

use crate::sequence::Sequence;

/// Get the minimum value from a set of sequences
///
/// Returns `i64::MAX` when the set is empty, so an empty dependent set
/// never constrains a gating decision.
pub fn minimum_sequence(sequences: &[Arc<Sequence>]) -> i64 {
    let mut minimum = i64::MAX;
    for sequence in sequences {
        minimum = minimum.min(sequence.get());
    }
    minimum
}
