//! Property-Based Tests for CRV Invariants
//!
//! These tests check that the revocation-vector invariants hold for
//! arbitrary inputs:
//! 1. MONOTONICITY: merging a delta never clears a bit or shrinks a vector
//! 2. ORDER INDEPENDENCE: the merged state depends only on the set of deltas
//! 3. CANONICAL ENCODING: equal vectors compress to equal bytes, so the
//!    commitment hash over compressed bytes is well defined

use proptest::prelude::*;
use revocation_core::{
    Crv, CrvCodec, HashAlgorithm, KeyPair, RevocationDigest, RunLengthCodec,
    SignedRevocationDigest,
};

fn delta_strategy() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(0u64..512, 0..24)
}

fn merge_all(deltas: &[Vec<u64>]) -> Crv {
    deltas
        .iter()
        .fold(Crv::default(), |acc, d| acc.union(&Crv::from_positions(d)))
}

// =============================================================================
// INVARIANT 1: MONOTONICITY - bits are never cleared
// =============================================================================

proptest! {
    /// Every intermediate state is a subset of the next one
    #[test]
    fn prop_union_never_clears_bits(
        deltas in prop::collection::vec(delta_strategy(), 1..12),
    ) {
        let mut current = Crv::default();

        for delta in &deltas {
            let next = current.union(&Crv::from_positions(delta));

            prop_assert!(current.is_subset_of(&next), "merge cleared a bit");
            prop_assert!(next.capacity() >= current.capacity(), "merge shrank the vector");

            current = next;
        }
    }

    /// The merged vector holds exactly the positions named by some delta
    #[test]
    fn prop_union_is_exact(
        deltas in prop::collection::vec(delta_strategy(), 1..12),
    ) {
        let merged = merge_all(&deltas);

        let mut expected: Vec<u64> = deltas.iter().flatten().copied().collect();
        expected.sort_unstable();
        expected.dedup();

        prop_assert_eq!(merged.positions().collect::<Vec<_>>(), expected);
    }

    /// Re-applying a delta already merged is a no-op
    #[test]
    fn prop_union_is_idempotent(positions in delta_strategy()) {
        let crv = Crv::from_positions(&positions);
        prop_assert_eq!(crv.union(&crv), crv);
    }
}

// =============================================================================
// INVARIANT 2: ORDER INDEPENDENCE
// =============================================================================

proptest! {
    /// Any interleaving of the same deltas reaches the same state
    #[test]
    fn prop_merge_order_independent(
        deltas in prop::collection::vec(delta_strategy(), 1..10),
        seed in any::<u64>(),
    ) {
        let forward = merge_all(&deltas);

        let mut reordered = deltas.clone();
        reordered.reverse();
        let k = (seed % reordered.len() as u64) as usize;
        reordered.rotate_left(k);

        prop_assert_eq!(merge_all(&reordered), forward);
    }
}

// =============================================================================
// INVARIANT 3: CANONICAL ENCODING
// =============================================================================

proptest! {
    /// Decoding recovers the vector, capacity included
    #[test]
    fn prop_codec_recovers_vector(
        positions in delta_strategy(),
        extra in 0u64..64,
    ) {
        let mut crv = Crv::from_positions(&positions);
        crv.grow(crv.capacity() + extra);

        let decoded = RunLengthCodec.decompress(&RunLengthCodec.compress(&crv)).unwrap();
        prop_assert_eq!(decoded, crv);
    }

    /// Vectors built in different orders compress to identical bytes
    #[test]
    fn prop_codec_output_is_canonical(positions in delta_strategy()) {
        let mut shuffled = positions.clone();
        shuffled.reverse();

        let a = RunLengthCodec.compress(&Crv::from_positions(&positions));
        let b = RunLengthCodec.compress(&Crv::from_positions(&shuffled));
        prop_assert_eq!(&a, &b);

        // Re-encoding decoded bytes never changes them
        let again = RunLengthCodec.compress(&RunLengthCodec.decompress(&a).unwrap());
        prop_assert_eq!(again, a);
    }

    /// Arbitrary bytes either fail to decode or decode to a vector whose
    /// encoding is those exact bytes
    #[test]
    fn prop_codec_accepts_only_canonical_input(
        bytes in prop::collection::vec(any::<u8>(), 0..32),
    ) {
        if let Ok(crv) = RunLengthCodec.decompress(&bytes) {
            prop_assert_eq!(RunLengthCodec.compress(&crv), bytes);
        }
    }
}

// =============================================================================
// Attestation over merged state
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// An attestation over any merged state verifies and decodes back to it
    #[test]
    fn prop_attestation_carries_merged_state(
        deltas in prop::collection::vec(delta_strategy(), 1..5),
    ) {
        let log_key = KeyPair::generate("log-prop");
        let merged = merge_all(&deltas);
        let last = Crv::from_positions(deltas.last().unwrap());

        let crv_bytes = RunLengthCodec.compress(&merged);
        let delta_bytes = RunLengthCodec.compress(&last);
        let digest = RevocationDigest::compute(
            "ca-prop",
            "Let's-Revoke",
            0,
            HashAlgorithm::Sha256,
            &crv_bytes,
            &delta_bytes,
        );
        let srd = SignedRevocationDigest::issue(&log_key, digest, crv_bytes, delta_bytes).unwrap();

        prop_assert!(srd.verify(&log_key.public_key()).is_ok());
        prop_assert_eq!(srd.decode_crv(&RunLengthCodec).unwrap(), merged);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_vectors() {
        let first = Crv::new(8).union(&Crv::from_positions(&[1, 3]));
        assert_eq!(first.to_string(), "00001010");

        let second = first.union(&Crv::from_positions(&[4, 5, 7]));
        assert_eq!(second.to_string(), "10111010");
    }

    #[test]
    fn test_larger_delta_grows_bucket() {
        let bucket = Crv::from_positions(&[1, 3]);
        let merged = bucket.union(&Crv::from_positions(&[12]));

        assert_eq!(merged.capacity(), 16);
        assert!(merged.is_set(1) && merged.is_set(3) && merged.is_set(12));
    }
}
