use std::collections::{HashMap, HashSet, VecDeque};

use starbridge_types::primitives::{ContentHash, WitnessSignature};

/// A body waiting for enough signatures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEntry {
    pub body: Vec<u8>,
    /// Distinct signatures in first-arrival order.
    pub signatures: Vec<WitnessSignature>,
}

impl PendingEntry {
    /// Add the signatures we have not seen yet. Returns how many were new.
    fn absorb(&mut self, signatures: &[WitnessSignature]) -> usize {
        let mut added = 0;
        for sig in signatures {
            if !self.signatures.contains(sig) {
                self.signatures.push(sig.clone());
                added += 1;
            }
        }
        added
    }
}

/// Result of merging an envelope into the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Merge {
    /// This hash was already handed to submission; the envelope is ignored.
    AlreadyForwarded,
    /// The entry was created or extended and is still below quorum.
    Pending {
        /// Signatures this envelope contributed.
        added: usize,
        /// Distinct signatures now held for the hash.
        total: usize,
        /// Entry dropped to make room, if the table was full.
        evicted: Option<ContentHash>,
    },
    /// The hash reached quorum. It is out of the table and marked forwarded.
    Ready {
        /// Signatures this envelope contributed.
        added: usize,
        entry: PendingEntry,
    },
}

/// Dedup and merge table keyed by body content hash.
///
/// Owned by exactly one collector, so it takes `&mut self` and holds no locks.
/// Forwarded hashes are remembered for the life of the table. Only bodies below
/// quorum take up capacity, so a body that arrives complete never evicts another.
pub struct PendingTable {
    entries: HashMap<ContentHash, PendingEntry>,
    /// Insertion order of pending hashes, oldest first.
    order: VecDeque<ContentHash>,
    forwarded: HashSet<ContentHash>,
    max_pending: usize,
    quorum: usize,
}

impl PendingTable {
    pub fn new(max_pending: usize, quorum: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            forwarded: HashSet::new(),
            max_pending: max_pending.max(1),
            quorum: quorum.max(1),
        }
    }

    /// Merge `signatures` for `body` into the entry for `hash`.
    pub fn merge(
        &mut self,
        hash: ContentHash,
        body: &[u8],
        signatures: &[WitnessSignature],
    ) -> Merge {
        if self.forwarded.contains(&hash) {
            return Merge::AlreadyForwarded;
        }

        if let Some(entry) = self.entries.get_mut(&hash) {
            let added = entry.absorb(signatures);
            let total = entry.signatures.len();
            if total >= self.quorum {
                return match self.take_for_forward(&hash) {
                    Some(entry) => Merge::Ready { added, entry },
                    None => Merge::AlreadyForwarded,
                };
            }
            return Merge::Pending {
                added,
                total,
                evicted: None,
            };
        }

        let mut entry = PendingEntry {
            body: body.to_vec(),
            signatures: Vec::new(),
        };
        let added = entry.absorb(signatures);
        let total = entry.signatures.len();
        if total >= self.quorum {
            self.forwarded.insert(hash);
            return Merge::Ready { added, entry };
        }

        let evicted = if self.entries.len() >= self.max_pending {
            self.evict_oldest()
        } else {
            None
        };
        self.entries.insert(hash, entry);
        self.order.push_back(hash);

        Merge::Pending {
            added,
            total,
            evicted,
        }
    }

    /// Remove the entry for `hash` and mark it forwarded.
    fn take_for_forward(&mut self, hash: &ContentHash) -> Option<PendingEntry> {
        let entry = self.entries.remove(hash)?;
        self.order.retain(|h| h != hash);
        self.forwarded.insert(*hash);
        Some(entry)
    }

    fn evict_oldest(&mut self) -> Option<ContentHash> {
        while let Some(hash) = self.order.pop_front() {
            if self.entries.remove(&hash).is_some() {
                return Some(hash);
            }
        }
        None
    }

    /// Number of bodies still waiting for quorum.
    pub fn pending_len(&self) -> usize {
        self.entries.len()
    }

    pub fn forwarded_len(&self) -> usize {
        self.forwarded.len()
    }
}

#[cfg(test)]
impl PendingTable {
    fn get(&self, hash: &ContentHash) -> Option<&PendingEntry> {
        self.entries.get(hash)
    }

    fn is_forwarded(&self, hash: &ContentHash) -> bool {
        self.forwarded.contains(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(n: u8) -> ContentHash {
        [n; 32]
    }

    #[test]
    fn test_merge_unions_signatures_in_arrival_order() {
        let mut table = PendingTable::new(16, 4);
        let h = hash(1);
        assert_eq!(
            table.merge(h, b"body", &[vec![1], vec![2]]),
            Merge::Pending {
                added: 2,
                total: 2,
                evicted: None
            }
        );
        assert_eq!(
            table.merge(h, b"body", &[vec![2], vec![3]]),
            Merge::Pending {
                added: 1,
                total: 3,
                evicted: None
            }
        );
        assert_eq!(
            table.get(&h).unwrap().signatures,
            vec![vec![1], vec![2], vec![3]]
        );
        assert_eq!(table.pending_len(), 1);
    }

    #[test]
    fn test_duplicate_signatures_within_one_envelope() {
        let mut table = PendingTable::new(16, 2);
        let merge = table.merge(hash(1), b"body", &[vec![7], vec![7], vec![7]]);
        assert_eq!(
            merge,
            Merge::Pending {
                added: 1,
                total: 1,
                evicted: None
            }
        );
    }

    #[test]
    fn test_quorum_moves_entry_out_and_marks_forwarded() {
        let mut table = PendingTable::new(16, 2);
        let h = hash(1);
        table.merge(h, b"body", &[vec![1]]);
        match table.merge(h, b"body", &[vec![1], vec![2]]) {
            Merge::Ready { added, entry } => {
                assert_eq!(added, 1);
                assert_eq!(entry.body, b"body");
                assert_eq!(entry.signatures, vec![vec![1], vec![2]]);
            }
            other => panic!("expected ready, got {:?}", other),
        }
        assert!(table.is_forwarded(&h));
        assert_eq!(table.pending_len(), 0);

        assert_eq!(table.merge(h, b"body", &[vec![9]]), Merge::AlreadyForwarded);
        assert_eq!(table.forwarded_len(), 1);
    }

    #[test]
    fn test_eviction_drops_oldest_pending() {
        let mut table = PendingTable::new(2, 2);
        table.merge(hash(1), b"a", &[vec![1]]);
        table.merge(hash(2), b"b", &[vec![1]]);
        let merge = table.merge(hash(3), b"c", &[vec![1]]);
        assert_eq!(
            merge,
            Merge::Pending {
                added: 1,
                total: 1,
                evicted: Some(hash(1))
            }
        );
        assert!(table.get(&hash(1)).is_none());
        assert_eq!(table.pending_len(), 2);
    }

    #[test]
    fn test_eviction_skips_forwarded_entries() {
        let mut table = PendingTable::new(2, 2);
        table.merge(hash(1), b"a", &[vec![1]]);
        table.merge(hash(2), b"b", &[vec![1]]);
        assert!(matches!(
            table.merge(hash(1), b"a", &[vec![2]]),
            Merge::Ready { .. }
        ));
        // Room again, nothing evicted.
        let merge = table.merge(hash(3), b"c", &[vec![1]]);
        assert!(matches!(merge, Merge::Pending { evicted: None, .. }));
        let merge = table.merge(hash(4), b"d", &[vec![1]]);
        assert!(matches!(merge, Merge::Pending { evicted: Some(h), .. } if h == hash(2)));
        // A forwarded hash stays forwarded even when the table churns.
        assert_eq!(table.merge(hash(1), b"a", &[vec![3]]), Merge::AlreadyForwarded);
    }

    #[test]
    fn test_complete_arrival_does_not_evict_pending_body() {
        let mut table = PendingTable::new(1, 2);
        table.merge(hash(1), b"a", &[vec![1]]);

        let merge = table.merge(hash(2), b"b", &[vec![8], vec![9]]);
        assert!(matches!(merge, Merge::Ready { added: 2, .. }));
        assert_eq!(table.pending_len(), 1);
        assert!(table.is_forwarded(&hash(2)));

        // The older body kept its signature and completes with one more.
        assert!(matches!(
            table.merge(hash(1), b"a", &[vec![2]]),
            Merge::Ready { added: 1, .. }
        ));
    }
}
