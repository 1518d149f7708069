// Tue Jan 15 2026 - Alex

/// Stable digests used for key ownership.
///
/// Every rank must agree on the owner of a key without exchanging any state, so
/// the digest has to be a pure function of the key bytes: no per-process seeds,
/// no platform-dependent word size.
pub struct HashComputer;

impl HashComputer {
    /// Compute FNV-1a hash (64-bit)
    pub fn fnv1a_64(data: &[u8]) -> u64 {
        const FNV_PRIME: u64 = 0x00000100000001B3;
        const FNV_OFFSET: u64 = 0xcbf29ce484222325;

        let mut hash = FNV_OFFSET;
        for byte in data {
            hash ^= *byte as u64;
            hash = hash.wrapping_mul(FNV_PRIME);
        }
        hash
    }

    /// Bucket `data` into one of `buckets` slots.
    pub fn bucket(data: &[u8], buckets: usize) -> usize {
        debug_assert!(buckets > 0);
        (Self::fnv1a_64(data) % buckets as u64) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fnv1a_known_vectors() {
        assert_eq!(HashComputer::fnv1a_64(b""), 0xcbf29ce484222325);
        assert_eq!(HashComputer::fnv1a_64(b"a"), 0xaf63dc4c8601ec8c);
    }

    #[test]
    fn test_bucket_in_range() {
        for n in 1..17 {
            for word in ["the", "quick", "brown", "fox", "z"] {
                assert!(HashComputer::bucket(word.as_bytes(), n) < n);
            }
        }
    }
}
