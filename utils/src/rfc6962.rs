//! RFC 6962 Merkle Tree Hashing, §2.1.
//!
//! The hash function itself (SHA-256) is assumed by contract (spec §1);
//! this module only implements the domain-separated combination rules
//! and the recursive `MTH` algorithm used both for whole-tree roots and
//! for recomputing a single subtree tile's root from its leaf hashes.

use sha2::{Digest, Sha256};

const LEAF_PREFIX: u8 = 0x00;
const NODE_PREFIX: u8 = 0x01;

/// `HASH(0x00 || leaf_data)`.
pub fn leaf_hash(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update([LEAF_PREFIX]);
    hasher.update(data);
    hasher.finalize().into()
}

/// `HASH(0x01 || left || right)`.
pub fn node_hash(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update([NODE_PREFIX]);
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

/// The hash of the empty tree, `HASH()` with no input (RFC 6962 §2.1).
pub fn empty_root() -> [u8; 32] {
    Sha256::new().finalize().into()
}

/// `MTH` — the Merkle Tree Hash of an ordered list of leaf hashes,
/// recursing by splitting at the largest power of two strictly smaller
/// than the list length. Works for any `n`, including non-powers-of-two,
/// which is what makes it usable both for whole-tree roots (arbitrary
/// `tree_size`) and for partial subtree tiles (the last tile of a tree
/// is usually not full).
pub fn merkle_tree_hash(leaf_hashes: &[[u8; 32]]) -> [u8; 32] {
    match leaf_hashes {
        [] => empty_root(),
        [single] => *single,
        _ => {
            let split = largest_power_of_two_smaller_than(leaf_hashes.len());
            let left = merkle_tree_hash(&leaf_hashes[..split]);
            let right = merkle_tree_hash(&leaf_hashes[split..]);
            node_hash(&left, &right)
        }
    }
}

fn largest_power_of_two_smaller_than(n: usize) -> usize {
    debug_assert!(n > 1);
    let mut split = 1usize;
    while split * 2 < n {
        split *= 2;
    }
    split
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tree_hash_matches_rfc6962_test_vector() {
        // RFC 6962 §2.1: the empty tree's hash is SHA-256 of the empty string.
        assert_eq!(
            hex::encode(empty_root()),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn single_leaf_root_is_the_leaf_hash() {
        let leaf = leaf_hash(b"hello");
        assert_eq!(merkle_tree_hash(&[leaf]), leaf);
    }

    #[test]
    fn splits_at_largest_power_of_two_below_n() {
        assert_eq!(largest_power_of_two_smaller_than(2), 1);
        assert_eq!(largest_power_of_two_smaller_than(3), 2);
        assert_eq!(largest_power_of_two_smaller_than(4), 2);
        assert_eq!(largest_power_of_two_smaller_than(5), 4);
        assert_eq!(largest_power_of_two_smaller_than(8), 4);
        assert_eq!(largest_power_of_two_smaller_than(9), 8);
    }

    #[test]
    fn root_is_deterministic_regardless_of_grouping() {
        let leaves: Vec<_> = (0u8..7).map(|i| leaf_hash(&[i])).collect();
        let root_a = merkle_tree_hash(&leaves);
        let root_b = merkle_tree_hash(&leaves.clone());
        assert_eq!(root_a, root_b);
    }
}
