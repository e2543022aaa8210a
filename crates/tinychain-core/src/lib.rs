//! Core ledger types and algorithms: blocks, hashing, proof-of-work,
//! chain validation, and longest-valid-chain conflict resolution.
//! No networking lives here; the node crate wires this into HTTP.

pub mod block;
pub mod consensus;
pub mod constants;
pub mod error;
pub mod ledger;
pub mod pow;
pub mod validate;

pub use block::{hash_block, Block, Transaction};
pub use consensus::{parse_peer_addr, resolve, ChainSnapshot};
pub use error::LedgerError;
pub use ledger::Ledger;
pub use pow::{MineOutcome, ProofOfWork};
pub use validate::Validator;
