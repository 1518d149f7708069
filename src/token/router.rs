// Wed Jan 14 2026 - Alex

use crate::transport::wire::BatchBuffer;
use crate::transport::Rank;
use crate::utils::HashComputer;
use bytes::Bytes;

#[derive(Debug, PartialEq, Eq)]
pub enum Routed {
    /// The key is owned by this rank; apply it directly.
    Local,
    /// Appended to the owner's batch, nothing to send yet.
    Buffered,
    /// The owner's batch was full and has been cut; send it.
    Flushed { dest: Rank, batch: Bytes },
}

/// Maps keys to owner ranks and keeps one outgoing batch per remote owner.
pub struct KeyRouter {
    owners: Vec<Rank>,
    me: Rank,
    batches: Vec<BatchBuffer>,
}

impl KeyRouter {
    pub fn new(owners: Vec<Rank>, me: Rank, capacity: usize) -> Self {
        assert!(!owners.is_empty(), "router needs at least one owner");
        let batches = owners.iter().map(|_| BatchBuffer::new(capacity)).collect();
        Self {
            owners,
            me,
            batches,
        }
    }

    /// Position of the key's owner in the owner list. Identical on every rank.
    pub fn owner_slot(&self, key: &[u8]) -> usize {
        HashComputer::bucket(key, self.owners.len())
    }

    pub fn owner_of(&self, key: &[u8]) -> Rank {
        self.owners[self.owner_slot(key)]
    }

    pub fn route(&mut self, key: &[u8]) -> Routed {
        let slot = self.owner_slot(key);
        let dest = self.owners[slot];
        if dest == self.me {
            return Routed::Local;
        }
        match self.batches[slot].push_token(key) {
            Some(batch) => Routed::Flushed { dest, batch },
            None => Routed::Buffered,
        }
    }

    /// Cuts every non-empty batch.
    pub fn drain(&mut self) -> Vec<(Rank, Bytes)> {
        self.owners
            .iter()
            .zip(self.batches.iter_mut())
            .filter(|(_, batch)| !batch.is_empty())
            .map(|(&dest, batch)| (dest, batch.take()))
            .collect()
    }

    /// Final batches for every remote owner, each terminated by an
    /// end-of-stream marker from `sender`. Owners that never received a token
    /// still get their marker.
    pub fn finish(&mut self, sender: Rank) -> Vec<(Rank, Bytes)> {
        let mut out = Vec::with_capacity(self.owners.len());
        for (&dest, batch) in self.owners.iter().zip(self.batches.iter_mut()) {
            if dest == self.me {
                continue;
            }
            if let Some(full) = batch.push_marker(sender) {
                out.push((dest, full));
            }
            out.push((dest, batch.take()));
        }
        out
    }

    pub fn pending_bytes(&self) -> usize {
        self.batches.iter().map(|b| b.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::wire::{Entry, TokenReader};

    fn decode(batch: &[u8]) -> Vec<Entry<&[u8]>> {
        TokenReader::new(batch)
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn test_routing_is_identical_on_every_rank() {
        let owners = vec![3, 4, 5, 6];
        let routers: Vec<_> = owners
            .iter()
            .map(|&me| KeyRouter::new(owners.clone(), me, 64))
            .collect();
        for word in ["apple", "banana", "cherry", "date", "elderberry", "fig"] {
            let first = routers[0].owner_of(word.as_bytes());
            assert!(owners.contains(&first));
            for router in &routers {
                assert_eq!(router.owner_of(word.as_bytes()), first);
            }
        }
    }

    #[test]
    fn test_single_owner_is_always_local() {
        let mut router = KeyRouter::new(vec![0], 0, 64);
        assert_eq!(router.route(b"anything"), Routed::Local);
        assert!(router.finish(0).is_empty());
    }

    #[test]
    fn test_batch_flushes_at_capacity() {
        // rank 0 owns nothing, every key goes to rank 1
        let mut router = KeyRouter::new(vec![1], 0, 12);
        assert_eq!(router.route(b"abcd"), Routed::Buffered);
        assert_eq!(router.route(b"efgh"), Routed::Buffered);
        match router.route(b"ijkl") {
            Routed::Flushed { dest, batch } => {
                assert_eq!(dest, 1);
                assert_eq!(decode(&batch), vec![Entry::Data(&b"abcd"[..]), Entry::Data(&b"efgh"[..])]);
            }
            other => panic!("expected flush, got {:?}", other),
        }
        assert_eq!(router.pending_bytes(), 5);
    }

    #[test]
    fn test_finish_sends_marker_to_every_remote_owner() {
        let mut router = KeyRouter::new(vec![0, 1, 2], 1, 64);
        let key = (0..100u32)
            .map(|i| format!("w{}", i))
            .find(|w| router.owner_of(w.as_bytes()) == 2)
            .unwrap();
        assert_eq!(router.route(key.as_bytes()), Routed::Buffered);

        let batches = router.finish(1);
        let dests: Vec<_> = batches.iter().map(|(d, _)| *d).collect();
        assert_eq!(dests, vec![0, 2]);
        assert_eq!(decode(&batches[0].1), vec![Entry::EndOfStream { sender: 1 }]);
        assert_eq!(
            decode(&batches[1].1),
            vec![Entry::Data(key.as_bytes()), Entry::EndOfStream { sender: 1 }]
        );
    }

    #[test]
    fn test_drain_skips_empty_batches() {
        let mut router = KeyRouter::new(vec![1, 2], 0, 64);
        assert!(router.drain().is_empty());
        router.route(b"x");
        let drained = router.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(router.pending_bytes(), 0);
    }
}
