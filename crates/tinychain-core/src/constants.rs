/// Proof stored in the genesis block.
pub const GENESIS_PROOF: u64 = 100;

/// Sentinel `previous_hash` for the genesis block. Never a real digest:
/// real hashes are 64 hex characters.
pub const GENESIS_PREVIOUS_HASH: &str = "1";

/// Default difficulty: required count of leading '0' hex characters in the
/// proof digest (4 chars = 16 zero bits).
pub const POW_DIFFICULTY: usize = 4;

pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
