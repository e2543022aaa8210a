use crate::block::{hash_block, Block, Transaction};
use crate::constants::{GENESIS_PREVIOUS_HASH, GENESIS_PROOF};
use crate::error::LedgerError;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

/// The chain plus the pool of transactions awaiting the next block.
///
/// The chain is append-only and always holds at least the genesis block.
/// [`create_block`](Ledger::create_block) is a non-verifying append: it does
/// not check the supplied proof, that is the mining workflow's job. External
/// consistency is checked with [`crate::Validator`].
pub struct Ledger {
    chain: Vec<Block>,
    pending: Vec<Transaction>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    /// A fresh ledger: genesis block only, empty pending pool.
    pub fn new() -> Self {
        let genesis = Block {
            index: 1,
            timestamp: unix_now(),
            transactions: Vec::new(),
            proof: GENESIS_PROOF,
            previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
        };
        Self {
            chain: vec![genesis],
            pending: Vec::new(),
        }
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        // invariant: never true, the genesis block is always present
        self.chain.is_empty()
    }

    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    pub fn last_block(&self) -> &Block {
        self.chain.last().expect("chain holds at least the genesis block")
    }

    /// Queue a transaction for the next mined block. Returns the index of the
    /// block it is *expected* to land in (advisory: holds only if no other
    /// block is mined in between).
    ///
    /// Rejects empty sender/recipient without touching the pool.
    pub fn submit_transaction(
        &mut self,
        sender: &str,
        recipient: &str,
        amount: u64,
    ) -> Result<u64, LedgerError> {
        if sender.is_empty() {
            return Err(LedgerError::EmptyField("sender"));
        }
        if recipient.is_empty() {
            return Err(LedgerError::EmptyField("recipient"));
        }
        self.pending.push(Transaction {
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            amount,
        });
        Ok(self.last_block().index + 1)
    }

    /// Append a new block carrying the current pending pool.
    ///
    /// The pool is snapshotted into the block and replaced with a fresh empty
    /// one, so later submissions cannot alias into an already-created block.
    /// `previous_hash` is used verbatim when supplied ([`Some`]), otherwise
    /// computed from the current last block. The proof is stored unchecked.
    pub fn create_block(&mut self, proof: u64, previous_hash: Option<String>) -> Block {
        let previous_hash = previous_hash.unwrap_or_else(|| hash_block(self.last_block()));
        let block = Block {
            index: self.chain.len() as u64 + 1,
            timestamp: unix_now(),
            transactions: std::mem::take(&mut self.pending),
            proof,
            previous_hash,
        };
        info!(index = block.index, tx_count = block.transactions.len(), "block created");
        self.chain.push(block.clone());
        block
    }

    /// Wholesale chain swap, used only by conflict resolution. Readers never
    /// observe a partially replaced chain because the swap is a single move.
    pub fn replace_chain(&mut self, chain: Vec<Block>) {
        info!(old_len = self.chain.len(), new_len = chain.len(), "chain replaced");
        self.chain = chain;
    }
}

fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_invariant() {
        let ledger = Ledger::new();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.last_block().index, 1);
        assert_eq!(ledger.last_block().proof, GENESIS_PROOF);
        assert_eq!(ledger.last_block().previous_hash, GENESIS_PREVIOUS_HASH);
        assert!(ledger.last_block().transactions.is_empty());
        assert!(ledger.pending().is_empty());
        assert!(!ledger.is_empty());
    }

    #[test]
    fn submit_returns_expected_index() {
        let mut ledger = Ledger::new();
        assert_eq!(ledger.submit_transaction("A", "B", 5), Ok(2));
        assert_eq!(ledger.submit_transaction("B", "C", 3), Ok(2));
        assert_eq!(ledger.pending().len(), 2);
    }

    #[test]
    fn submit_rejects_empty_fields_without_mutation() {
        let mut ledger = Ledger::new();
        assert_eq!(
            ledger.submit_transaction("", "B", 5),
            Err(LedgerError::EmptyField("sender"))
        );
        assert_eq!(
            ledger.submit_transaction("A", "", 5),
            Err(LedgerError::EmptyField("recipient"))
        );
        assert!(ledger.pending().is_empty());
    }

    #[test]
    fn create_block_links_to_predecessor() {
        let mut ledger = Ledger::new();
        let genesis_hash = hash_block(ledger.last_block());
        let block = ledger.create_block(35293, None);
        assert_eq!(block.index, 2);
        assert_eq!(block.previous_hash, genesis_hash);
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.last_block(), &block);
    }

    #[test]
    fn create_block_uses_supplied_previous_hash_verbatim() {
        let mut ledger = Ledger::new();
        // an explicit value is used even when it is falsy-looking; the
        // presence check is Option-based, not value-based
        let block = ledger.create_block(35293, Some(String::new()));
        assert_eq!(block.previous_hash, "");
    }

    #[test]
    fn pending_pool_snapshot_isolation() {
        let mut ledger = Ledger::new();
        ledger.submit_transaction("A", "B", 5).unwrap();
        ledger.submit_transaction("C", "D", 7).unwrap();
        let block = ledger.create_block(35293, None);

        assert_eq!(block.transactions.len(), 2);
        assert_eq!(block.transactions[0].sender, "A");
        assert_eq!(block.transactions[1].sender, "C");
        assert!(ledger.pending().is_empty());

        // later submissions do not leak into the created block
        ledger.submit_transaction("E", "F", 9).unwrap();
        assert_eq!(ledger.last_block().transactions.len(), 2);
        assert_eq!(ledger.pending().len(), 1);
    }

    #[test]
    fn replace_chain_swaps_wholesale() {
        let mut ledger = Ledger::new();
        let mut other = Ledger::new();
        other.create_block(35293, None);
        other.create_block(35089, None);
        let replacement = other.chain().to_vec();

        ledger.replace_chain(replacement.clone());
        assert_eq!(ledger.chain(), &replacement[..]);
        assert_eq!(ledger.len(), 3);
    }
}
