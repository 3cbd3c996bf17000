//! Candidate selection.

/// Pick the first candidate `accept` takes, in list order.
///
/// Lists are ordered most capable first by hand, and each candidate checks
/// its own hardware requirements inside `accept`. The first acceptance wins
/// and later candidates are never asked. There is deliberately no scoring
/// or comparison between candidates; reordering the list is the only way
/// to change the outcome.
pub fn select<T: Copy>(candidates: &[T], mut accept: impl FnMut(T) -> bool) -> Option<T> {
    for &candidate in candidates {
        if accept(candidate) {
            return Some(candidate);
        }
    }
    None
}
