use crate::constants::POW_DIFFICULTY;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicBool, Ordering};

/// How often the search loop polls the cancellation flag.
const CANCEL_POLL_INTERVAL: u64 = 1024;

/// Result of a cancellable mining attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MineOutcome {
    Found(u64),
    Cancelled,
}

/// The puzzle: find `proof` such that sha256("{last_proof}{proof}") starts
/// with `difficulty` leading '0' hex characters.
#[derive(Clone, Copy, Debug)]
pub struct ProofOfWork {
    difficulty: usize,
}

impl Default for ProofOfWork {
    fn default() -> Self {
        Self::new(POW_DIFFICULTY)
    }
}

impl ProofOfWork {
    pub fn new(difficulty: usize) -> Self {
        Self { difficulty }
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    /// True iff the digest of the decimal concatenation (no separator) meets
    /// the difficulty target.
    pub fn verify(&self, last_proof: u64, proof: u64) -> bool {
        let guess = format!("{last_proof}{proof}");
        let digest = Sha256::digest(guess.as_bytes());
        leading_zero_hex_chars(&digest) >= self.difficulty
    }

    /// Sequential search from candidate 0 upward. Deterministic: the same
    /// `last_proof` always yields the same proof. Expected tries at the
    /// default difficulty: 65536.
    pub fn mine(&self, last_proof: u64) -> u64 {
        let mut proof = 0u64;
        while !self.verify(last_proof, proof) {
            proof += 1;
        }
        proof
    }

    /// Same search as [`mine`](Self::mine), but abandons the attempt once
    /// `cancel` is observed set. Returns [`MineOutcome::Cancelled`] in that
    /// case; otherwise the found proof, identical to what `mine` would return.
    pub fn mine_cancellable(&self, last_proof: u64, cancel: &AtomicBool) -> MineOutcome {
        let mut proof = 0u64;
        loop {
            if proof % CANCEL_POLL_INTERVAL == 0 && cancel.load(Ordering::Relaxed) {
                return MineOutcome::Cancelled;
            }
            if self.verify(last_proof, proof) {
                return MineOutcome::Found(proof);
            }
            proof += 1;
        }
    }
}

/// Count of leading '0' characters in the hex rendering of `digest`,
/// i.e. leading zero nibbles.
fn leading_zero_hex_chars(digest: &[u8]) -> usize {
    let mut total = 0;
    for byte in digest {
        if *byte == 0 {
            total += 2;
        } else {
            if byte >> 4 == 0 {
                total += 1;
            }
            break;
        }
    }
    total
}
