use crate::block::{hash_block, Block};
use crate::pow::ProofOfWork;
use tracing::debug;

/// Checks an arbitrary candidate chain for internal consistency.
#[derive(Clone, Copy, Debug, Default)]
pub struct Validator {
    pow: ProofOfWork,
}

impl Validator {
    pub fn new(pow: ProofOfWork) -> Self {
        Self { pow }
    }

    /// Linear scan over adjacent pairs: each block must link to the hash of
    /// its predecessor and carry a proof valid against the predecessor's.
    /// The genesis block has no predecessor and is not checked on its own.
    /// Chains with fewer than two blocks are trivially valid.
    pub fn is_valid_chain(&self, chain: &[Block]) -> bool {
        for pair in chain.windows(2) {
            let (prev, curr) = (&pair[0], &pair[1]);
            if curr.previous_hash != hash_block(prev) {
                debug!(index = curr.index, "broken hash link");
                return false;
            }
            if !self.pow.verify(prev.proof, curr.proof) {
                debug!(index = curr.index, "invalid proof of work");
                return false;
            }
        }
        true
    }
}
