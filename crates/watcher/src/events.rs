//! Pending change bookkeeping for the debouncer

use bundlewatch_core::change::ChangeKind;

/// A change waiting for the debounce window to close
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingChange {
    /// Most recently observed kind
    pub kind: ChangeKind,
    /// Order in which the path was first seen
    pub seq: u64,
    /// Number of raw notifications folded into this change
    pub occurrence_count: u32,
}

impl PendingChange {
    pub fn new(kind: ChangeKind, seq: u64) -> Self {
        Self {
            kind,
            seq,
            occurrence_count: 1,
        }
    }

    /// Fold in another notification for the same path
    pub fn update(&mut self, kind: ChangeKind) {
        self.kind = kind;
        self.occurrence_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_keeps_first_sighting() {
        let mut pending = PendingChange::new(ChangeKind::Create, 7);
        pending.update(ChangeKind::Update);
        pending.update(ChangeKind::Delete);

        assert_eq!(pending.kind, ChangeKind::Delete);
        assert_eq!(pending.seq, 7);
        assert_eq!(pending.occurrence_count, 3);
    }
}
