use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A transfer record. No identity beyond its field values; the order of
/// transactions inside a block is part of the block's hashed content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub recipient: String,
    pub amount: u64,
}

/// One entry in the chain. Blocks are built only by [`crate::Ledger`] and
/// never mutated afterwards.
///
/// Field order is the canonical serialization order; reordering fields here
/// changes every block hash.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// 1-based position in the chain.
    pub index: u64,
    /// Seconds since the Unix epoch at creation time.
    pub timestamp: f64,
    pub transactions: Vec<Transaction>,
    pub proof: u64,
    /// Hex digest of the predecessor, or the genesis sentinel.
    pub previous_hash: String,
}

/// Lowercase hex SHA-256 over the canonical JSON form of the block.
///
/// Canonical means: compact separators, fields in declaration order. Two
/// in-memory blocks with the same logical content always produce the same
/// digest; any field difference (including transaction order) produces a
/// different one.
pub fn hash_block(block: &Block) -> String {
    let bytes = serde_json::to_vec(block).expect("block serializes to JSON");
    hex::encode(Sha256::digest(&bytes))
}
