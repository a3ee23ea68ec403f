//! Distribution snapshot: root plus per-recipient (amount, proof).
//!
//! Artifact shape (JSON):
//!
//! ```json
//! {
//!   "merkle_root": "<64 hex chars>",
//!   "leaves": {
//!     "<base58 recipient>": { "amount": "<base units>", "proof": ["<64 hex chars>", ...] }
//!   }
//! }
//! ```
//!
//! The phase is not stored in the artifact; it is supplied on load and
//! every entry is re-verified against the root under that phase.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use craftdrop_core::{
    decode_hash, decode_pubkey, encode_hash, encode_pubkey, short_hex, Hash, Phase, PublicKey,
};
use craftdrop_merkle::{encode_leaf, MerkleProof, MerkleTree};

use crate::source::{merge_entitlements, EntitlementSource};
use crate::{DistributionError, Result};

/// One recipient's claimable amount and inclusion proof
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotEntry {
    pub amount: u64,
    pub proof: MerkleProof,
}

/// Immutable per-phase distribution
#[derive(Debug, Clone)]
pub struct DistributionSnapshot {
    phase: Phase,
    root: Hash,
    entries: HashMap<PublicKey, SnapshotEntry>,
}

// === Persistence types (private, for JSON serialization) ===

#[derive(Serialize, Deserialize)]
struct SnapshotFile {
    merkle_root: String,
    leaves: BTreeMap<String, LeafState>,
}

#[derive(Serialize, Deserialize)]
struct LeafState {
    amount: String,
    proof: Vec<String>,
}

impl DistributionSnapshot {
    /// Build the snapshot for one phase.
    ///
    /// Duplicate recipients are summed before leaf encoding. Zero amounts
    /// are dropped: the verifier refuses to pay them.
    pub fn build(phase: Phase, entries: &[(PublicKey, u64)]) -> Result<Self> {
        let zero_rows = entries.iter().filter(|(_, amount)| *amount == 0).count();
        if zero_rows > 0 {
            warn!("Dropping {} zero-amount entitlements for phase {}", zero_rows, phase);
        }
        let merged = merge_entitlements(entries.iter().copied().filter(|(_, amount)| *amount > 0))?;
        if merged.is_empty() {
            return Err(DistributionError::EmptyDistribution);
        }

        let leaves: Vec<(PublicKey, u64, Hash)> = merged
            .into_iter()
            .map(|(recipient, amount)| (recipient, amount, encode_leaf(phase, &recipient, amount)))
            .collect();

        let tree = MerkleTree::from_leaves(leaves.iter().map(|(_, _, leaf)| *leaf).collect())?;
        let root = tree.root();

        let mut map = HashMap::with_capacity(leaves.len());
        for (recipient, amount, leaf) in &leaves {
            let proof = tree.proof_for_leaf(leaf)?;
            map.insert(*recipient, SnapshotEntry { amount: *amount, proof });
        }

        let snapshot = Self {
            phase,
            root,
            entries: map,
        };
        info!(
            "Built distribution for phase {}: {} recipients, total {}, root {}",
            phase,
            snapshot.len(),
            snapshot.total(),
            short_hex(&root)
        );
        Ok(snapshot)
    }

    /// Build from a parsed entitlement source.
    pub fn from_source(phase: Phase, source: &EntitlementSource) -> Result<Self> {
        Self::build(phase, &source.entries)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn root(&self) -> Hash {
        self.root
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all amounts
    pub fn total(&self) -> u128 {
        self.entries.values().map(|e| e.amount as u128).sum()
    }

    /// Recipients in key order
    pub fn recipients(&self) -> Vec<PublicKey> {
        let mut keys: Vec<PublicKey> = self.entries.keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    /// Amount and proof for a recipient
    pub fn lookup(&self, recipient: &PublicKey) -> Result<&SnapshotEntry> {
        self.entries
            .get(recipient)
            .ok_or_else(|| DistributionError::NotFound(encode_pubkey(recipient)))
    }

    /// Leaf hash for a recipient's entry
    pub fn leaf_for(&self, recipient: &PublicKey) -> Result<Hash> {
        let entry = self.lookup(recipient)?;
        Ok(encode_leaf(self.phase, recipient, entry.amount))
    }

    /// Fold the recipient's stored proof and compare with the root.
    pub fn verify_entry(&self, recipient: &PublicKey) -> bool {
        match self.lookup(recipient) {
            Ok(entry) => {
                let leaf = encode_leaf(self.phase, recipient, entry.amount);
                MerkleTree::verify(&self.root, &leaf, &entry.proof)
            }
            Err(_) => false,
        }
    }

    fn to_file(&self) -> SnapshotFile {
        let leaves = self
            .entries
            .iter()
            .map(|(recipient, entry)| {
                let state = LeafState {
                    amount: entry.amount.to_string(),
                    proof: entry.proof.siblings.iter().map(encode_hash).collect(),
                };
                (encode_pubkey(recipient), state)
            })
            .collect();

        SnapshotFile {
            merkle_root: encode_hash(&self.root),
            leaves,
        }
    }

    fn from_file(phase: Phase, file: SnapshotFile) -> Result<Self> {
        let parse = |e: craftdrop_core::CoreError| DistributionError::Parse(e.to_string());

        let root = decode_hash(&file.merkle_root).map_err(parse)?;
        if file.leaves.is_empty() {
            return Err(DistributionError::EmptyDistribution);
        }

        let mut entries = HashMap::with_capacity(file.leaves.len());
        for (address, state) in file.leaves {
            let recipient = decode_pubkey(&address).map_err(parse)?;
            let amount: u64 = state.amount.trim().parse().map_err(|_| {
                DistributionError::Parse(format!("invalid amount {:?} for {}", state.amount, address))
            })?;
            let siblings = state
                .proof
                .iter()
                .map(|h| decode_hash(h))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(parse)?;
            if amount == 0 {
                return Err(DistributionError::InconsistentSnapshot(format!(
                    "zero amount for {}",
                    address
                )));
            }
            let proof = MerkleProof::new(siblings);

            let leaf = encode_leaf(phase, &recipient, amount);
            if !MerkleTree::verify(&root, &leaf, &proof) {
                return Err(DistributionError::InconsistentSnapshot(format!(
                    "proof for {} does not reach root {}",
                    address,
                    short_hex(&root)
                )));
            }

            entries.insert(recipient, SnapshotEntry { amount, proof });
        }

        Ok(Self {
            phase,
            root,
            entries,
        })
    }

    /// Serialize to the JSON artifact.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.to_file()).map_err(|e| DistributionError::Parse(e.to_string()))
    }

    /// Parse a JSON artifact for `phase`, re-verifying every entry.
    pub fn from_json(phase: Phase, json: &str) -> Result<Self> {
        let file: SnapshotFile =
            serde_json::from_str(json).map_err(|e| DistributionError::Parse(e.to_string()))?;
        Self::from_file(phase, file)
    }

    /// Write the artifact.
    ///
    /// Uses atomic write (tmp + rename) so readers never see a partial file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let json = self.to_json()?;
        let tmp_path = path.with_extension("json.tmp");
        {
            let mut file = std::fs::File::create(&tmp_path)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }
        if let Err(e) = std::fs::rename(&tmp_path, path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        info!(
            "Saved phase {} distribution ({} recipients) to {}",
            self.phase,
            self.len(),
            path.display()
        );
        Ok(())
    }

    /// Load an artifact for `phase`, re-verifying every entry.
    pub fn load(phase: Phase, path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let snapshot = Self::from_json(phase, &contents)?;
        debug!(
            "Loaded phase {} distribution: {} recipients, root {} from {}",
            phase,
            snapshot.len(),
            short_hex(&snapshot.root),
            path.display()
        );
        Ok(snapshot)
    }
}
