//! Sorted-pair binary Merkle tree.
//!
//! Internal nodes: `SHA256(min(a, b) || max(a, b))` with byte-wise ordering.
//! Leaves are sorted before building, so the root depends only on the leaf
//! set. A trailing unpaired node is promoted to the next level unchanged
//! (no padding, no self-duplication).

use sha2::{Digest, Sha256};
use tracing::debug;

use craftdrop_core::{short_hex, Entitlement, Hash};

use crate::leaf::entitlement_leaf;
use crate::{MerkleError, Result};

/// Levels at least this wide are hashed on the rayon pool when the
/// `parallel` feature is enabled.
#[cfg(feature = "parallel")]
const PARALLEL_THRESHOLD: usize = 1024;

/// A Merkle proof: sibling hashes from the leaf level upward.
///
/// No direction bits are carried; the sorted-pair rule makes them
/// unnecessary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MerkleProof {
    pub siblings: Vec<Hash>,
}

impl MerkleProof {
    pub fn new(siblings: Vec<Hash>) -> Self {
        Self { siblings }
    }

    /// Concatenated sibling bytes, the form the verifier receives
    pub fn to_bytes(&self) -> Vec<u8> {
        self.siblings.concat()
    }

    /// Split a concatenated proof back into 32-byte siblings
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() % 32 != 0 {
            return Err(MerkleError::InvalidProofLength(bytes.len()));
        }
        let siblings = bytes
            .chunks_exact(32)
            .map(|chunk| {
                let mut h = [0u8; 32];
                h.copy_from_slice(chunk);
                h
            })
            .collect();
        Ok(Self { siblings })
    }

    pub fn len(&self) -> usize {
        self.siblings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.siblings.is_empty()
    }
}

/// A binary Merkle tree over a sorted leaf set.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    /// All nodes stored level by level, bottom-up. `layers[0]` = sorted leaves.
    layers: Vec<Vec<Hash>>,
}

/// Hash two nodes into their parent, smaller operand first.
pub fn hash_pair(a: &Hash, b: &Hash) -> Hash {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let mut hasher = Sha256::new();
    hasher.update(lo);
    hasher.update(hi);
    hasher.finalize().into()
}

fn next_level(prev: &[Hash]) -> Vec<Hash> {
    let combine = |pair: &[Hash]| match pair {
        [a, b] => hash_pair(a, b),
        [odd] => *odd,
        _ => unreachable!("chunks(2) yields one or two nodes"),
    };

    #[cfg(feature = "parallel")]
    if prev.len() >= PARALLEL_THRESHOLD {
        use rayon::prelude::*;
        return prev.par_chunks(2).map(combine).collect();
    }

    prev.chunks(2).map(combine).collect()
}

impl MerkleTree {
    /// Build a tree from pre-hashed leaves.
    ///
    /// Leaves are sorted first; callers may pass them in any order.
    pub fn from_leaves(mut leaves: Vec<Hash>) -> Result<Self> {
        if leaves.is_empty() {
            return Err(MerkleError::EmptyTree);
        }
        leaves.sort_unstable();

        let mut layers = vec![leaves];
        while let Some(prev) = layers.last().filter(|l| l.len() > 1) {
            let next = next_level(prev);
            layers.push(next);
        }

        let tree = Self { layers };
        debug!(
            "Built merkle tree: {} leaves, depth {}, root {}",
            tree.leaf_count(),
            tree.depth(),
            short_hex(&tree.root())
        );
        Ok(tree)
    }

    /// Build a tree from entitlements, hashing each into a leaf.
    pub fn from_entitlements(entitlements: &[Entitlement]) -> Result<Self> {
        Self::from_leaves(entitlements.iter().map(entitlement_leaf).collect())
    }

    /// The Merkle root
    pub fn root(&self) -> Hash {
        // from_leaves guarantees a non-empty top layer
        self.layers[self.layers.len() - 1][0]
    }

    /// Sorted leaf layer
    pub fn leaves(&self) -> &[Hash] {
        &self.layers[0]
    }

    /// Number of leaves
    pub fn leaf_count(&self) -> usize {
        self.layers[0].len()
    }

    /// Number of hashing levels above the leaves
    pub fn depth(&self) -> usize {
        self.layers.len() - 1
    }

    /// Proof for the leaf at `leaf_index` in sorted order.
    ///
    /// Levels where the node was promoted without a sibling contribute
    /// nothing to the proof.
    pub fn proof(&self, leaf_index: usize) -> Option<MerkleProof> {
        if leaf_index >= self.leaf_count() {
            return None;
        }

        let mut siblings = Vec::with_capacity(self.depth());
        let mut idx = leaf_index;

        for layer in &self.layers[..self.depth()] {
            let sibling_idx = idx ^ 1;
            if let Some(sibling) = layer.get(sibling_idx) {
                siblings.push(*sibling);
            }
            idx /= 2;
        }

        Some(MerkleProof { siblings })
    }

    /// Proof for a specific leaf hash.
    pub fn proof_for_leaf(&self, leaf: &Hash) -> Result<MerkleProof> {
        let idx = self
            .layers[0]
            .binary_search(leaf)
            .map_err(|_| MerkleError::NotFound)?;
        self.proof(idx).ok_or(MerkleError::NotFound)
    }

    /// Fold a proof from `leaf` and compare with `root`.
    pub fn verify(root: &Hash, leaf: &Hash, proof: &MerkleProof) -> bool {
        let computed = proof
            .siblings
            .iter()
            .fold(*leaf, |current, sibling| hash_pair(&current, sibling));
        computed == *root
    }

    /// Verify a proof given as concatenated bytes.
    ///
    /// A length that is not a multiple of 32 never verifies.
    pub fn verify_bytes(root: &Hash, leaf: &Hash, proof: &[u8]) -> bool {
        match MerkleProof::from_bytes(proof) {
            Ok(p) => Self::verify(root, leaf, &p),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode_leaf;

    fn h(n: u8) -> Hash {
        let mut out = [0u8; 32];
        out[0] = n;
        out
    }

    fn leaves(n: u8) -> Vec<Hash> {
        (0..n).map(|i| encode_leaf(1, &[i; 32], 100 + i as u64)).collect()
    }

    #[test]
    fn test_hash_pair_is_commutative() {
        let a = h(1);
        let b = h(2);
        assert_eq!(hash_pair(&a, &b), hash_pair(&b, &a));

        let mut expected = Sha256::new();
        expected.update(a);
        expected.update(b);
        let expected: Hash = expected.finalize().into();
        assert_eq!(hash_pair(&b, &a), expected);
    }

    #[test]
    fn test_empty_tree_rejected() {
        assert_eq!(MerkleTree::from_leaves(vec![]).unwrap_err(), MerkleError::EmptyTree);
    }

    #[test]
    fn test_single_leaf() {
        let leaf = h(7);
        let tree = MerkleTree::from_leaves(vec![leaf]).unwrap();
        assert_eq!(tree.root(), leaf);
        assert_eq!(tree.depth(), 0);

        let proof = tree.proof(0).unwrap();
        assert!(proof.is_empty());
        assert!(MerkleTree::verify(&tree.root(), &leaf, &proof));
    }

    #[test]
    fn test_known_root() {
        let alice = encode_leaf(1, &[1u8; 32], 1500);
        let bob = encode_leaf(1, &[2u8; 32], 2000);
        let tree = MerkleTree::from_leaves(vec![alice, bob]).unwrap();
        assert_eq!(
            hex::encode(tree.root()),
            "19207b530b52c38409539fd3246390333640c53adff7aa1c608c32892660c9c4"
        );

        let proof = tree.proof_for_leaf(&alice).unwrap();
        assert_eq!(proof.siblings, vec![bob]);
    }

    #[test]
    fn test_order_independent_root() {
        let forward = leaves(7);
        let mut reversed = forward.clone();
        reversed.reverse();

        let a = MerkleTree::from_leaves(forward).unwrap();
        let b = MerkleTree::from_leaves(reversed).unwrap();
        assert_eq!(a.root(), b.root());
    }

    #[test]
    fn test_odd_node_promoted() {
        let tree = MerkleTree::from_leaves(vec![h(1), h(2), h(3)]).unwrap();
        let expected = hash_pair(&hash_pair(&h(1), &h(2)), &h(3));
        assert_eq!(tree.root(), expected);

        // The promoted leaf has a single sibling: the hash of the pair
        let proof = tree.proof_for_leaf(&h(3)).unwrap();
        assert_eq!(proof.siblings, vec![hash_pair(&h(1), &h(2))]);
    }

    #[test]
    fn test_every_leaf_verifies() {
        for n in 1..=17u8 {
            let ls = leaves(n);
            let tree = MerkleTree::from_leaves(ls.clone()).unwrap();
            for leaf in &ls {
                let proof = tree.proof_for_leaf(leaf).unwrap();
                assert!(MerkleTree::verify(&tree.root(), leaf, &proof), "n={}", n);
                assert!(MerkleTree::verify_bytes(&tree.root(), leaf, &proof.to_bytes()));
            }
        }
    }

    #[test]
    fn test_tampered_proof_fails() {
        let ls = leaves(5);
        let tree = MerkleTree::from_leaves(ls.clone()).unwrap();
        let mut proof = tree.proof_for_leaf(&ls[0]).unwrap();
        proof.siblings[0][0] ^= 0xFF;
        assert!(!MerkleTree::verify(&tree.root(), &ls[0], &proof));
    }

    #[test]
    fn test_wrong_leaf_fails() {
        let ls = leaves(4);
        let tree = MerkleTree::from_leaves(ls.clone()).unwrap();
        let proof = tree.proof_for_leaf(&ls[0]).unwrap();
        let forged = encode_leaf(1, &[0u8; 32], 999_999);
        assert!(!MerkleTree::verify(&tree.root(), &forged, &proof));
    }

    #[test]
    fn test_proof_for_missing_leaf() {
        let tree = MerkleTree::from_leaves(leaves(3)).unwrap();
        assert_eq!(tree.proof_for_leaf(&h(0xEE)).unwrap_err(), MerkleError::NotFound);
        assert!(tree.proof(3).is_none());
    }

    #[test]
    fn test_proof_bytes_length_checked() {
        assert_eq!(
            MerkleProof::from_bytes(&[0u8; 33]).unwrap_err(),
            MerkleError::InvalidProofLength(33)
        );
        let root = h(1);
        assert!(!MerkleTree::verify_bytes(&root, &root, &[0u8; 31]));
        // Empty proof: the leaf must equal the root
        assert!(MerkleTree::verify_bytes(&root, &root, &[]));
    }

    #[test]
    fn test_from_entitlements() {
        let entries = vec![
            Entitlement::new(1, [2u8; 32], 2000),
            Entitlement::new(1, [1u8; 32], 1500),
        ];
        let tree = MerkleTree::from_entitlements(&entries).unwrap();
        assert_eq!(
            hex::encode(tree.root()),
            "19207b530b52c38409539fd3246390333640c53adff7aa1c608c32892660c9c4"
        );
    }

    #[test]
    fn test_proof_length_is_logarithmic() {
        let tree = MerkleTree::from_leaves(leaves(16)).unwrap();
        assert_eq!(tree.depth(), 4);
        assert_eq!(tree.proof(5).unwrap().len(), 4);
    }
}
