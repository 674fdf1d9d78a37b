//! Monotonic sequence numbers used for time priority
//!
//! Wall-clock timestamps can collide, so resting orders are ranked by a
//! sequence number drawn from a [`SequenceGenerator`] instead.

use std::sync::atomic::{AtomicU64, Ordering};

/// Hands out strictly increasing sequence numbers, starting at 1
#[derive(Debug, Default)]
pub struct SequenceGenerator {
    last: AtomicU64,
}

impl SequenceGenerator {
    /// Create a generator whose first value is 1
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the next sequence number
    pub fn next(&self) -> u64 {
        self.last.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_sequence_is_monotonic() {
        let seq = SequenceGenerator::new();
        assert_eq!(seq.next(), 1);
        assert_eq!(seq.next(), 2);
        assert_eq!(seq.next(), 3);
    }

    #[test]
    fn test_sequence_unique_across_threads() {
        let seq = Arc::new(SequenceGenerator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let seq = seq.clone();
                thread::spawn(move || (0..250).map(|_| seq.next()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for value in handle.join().unwrap() {
                assert!(seen.insert(value));
            }
        }
        assert_eq!(seen.len(), 1000);
        assert_eq!(seq.next(), 1001);
    }
}
