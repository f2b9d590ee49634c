//! Per-connection sequence continuity tracking

/// A break in sequence continuity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceGap {
    pub expected: u16,
    pub observed: u16,
}

impl std::fmt::Display for SequenceGap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "expected {}, observed {}", self.expected, self.observed)
    }
}

/// Tracks the last sequence number seen on one connection
///
/// The first observation only sets the baseline. Sequence numbers wrap from
/// `u16::MAX` to 0.
#[derive(Debug, Clone, Default)]
pub struct SequenceTracker {
    last: Option<u16>,
}

impl SequenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sequence number, returning the gap if it did not follow the previous one
    pub fn observe(&mut self, sequence: u16) -> Option<SequenceGap> {
        let gap = self.last.and_then(|last| {
            let expected = last.wrapping_add(1);
            (sequence != expected).then_some(SequenceGap {
                expected,
                observed: sequence,
            })
        });
        self.last = Some(sequence);
        gap
    }

    pub fn last(&self) -> Option<u16> {
        self.last
    }
}
