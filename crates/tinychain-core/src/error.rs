use thiserror::Error;

/// Errors the core can reject an operation with. None of these leave the
/// ledger in an inconsistent state: a rejected operation performs no mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("transaction field `{0}` must not be empty")]
    EmptyField(&'static str),

    #[error("invalid peer address `{0}`, expected host:port")]
    InvalidPeerAddress(String),
}
