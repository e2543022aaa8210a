use crate::block::Block;
use crate::error::LedgerError;
use crate::ledger::Ledger;
use crate::validate::Validator;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// What a peer reports for its chain: the payload of `GET /chain`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub chain: Vec<Block>,
    pub length: usize,
}

impl ChainSnapshot {
    pub fn of(ledger: &Ledger) -> Self {
        Self {
            chain: ledger.chain().to_vec(),
            length: ledger.len(),
        }
    }
}

/// Canonicalize a peer address to `host:port`. Accepts a bare `host:port` or
/// an `http(s)://host:port[/path]` URL.
pub fn parse_peer_addr(input: &str) -> Result<String, LedgerError> {
    let trimmed = input.trim();
    let rest = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"))
        .unwrap_or(trimmed);
    let authority = rest.split('/').next().unwrap_or("");
    let invalid = || LedgerError::InvalidPeerAddress(input.to_string());
    let (host, port) = authority.rsplit_once(':').ok_or_else(invalid)?;
    if host.is_empty() || port.parse::<u16>().is_err() {
        return Err(invalid());
    }
    Ok(format!("{host}:{port}"))
}

/// Longest-valid-chain conflict resolution.
///
/// Fetches each peer's snapshot through `fetch` (in the peer set's sorted
/// order), keeps the longest one that validates, and on success swaps it into
/// the ledger, returning `true`. A `None` fetch means the peer is
/// unavailable and is skipped; an invalid chain is skipped the same way.
/// Ties on length keep the earlier peer, i.e. the lexicographically smallest
/// address, which makes resolution deterministic for a given set of
/// responses.
pub fn resolve<F>(
    ledger: &mut Ledger,
    validator: &Validator,
    peers: &BTreeSet<String>,
    mut fetch: F,
) -> bool
where
    F: FnMut(&str) -> Option<ChainSnapshot>,
{
    let mut best_length = ledger.len();
    let mut best_chain: Option<Vec<Block>> = None;

    for peer in peers {
        let Some(snapshot) = fetch(peer) else {
            debug!(%peer, "peer unavailable, skipping");
            continue;
        };
        if snapshot.length <= best_length {
            debug!(%peer, length = snapshot.length, "peer chain not longer, skipping");
            continue;
        }
        if !validator.is_valid_chain(&snapshot.chain) {
            debug!(%peer, "peer chain invalid, skipping");
            continue;
        }
        best_length = snapshot.length;
        best_chain = Some(snapshot.chain);
    }

    match best_chain {
        Some(chain) => {
            info!(new_length = best_length, "adopting longer valid chain");
            ledger.replace_chain(chain);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pow::ProofOfWork;
    use std::collections::HashMap;

    fn mined_ledger(blocks: usize) -> Ledger {
        let pow = ProofOfWork::default();
        let mut ledger = Ledger::new();
        for _ in 0..blocks {
            let proof = pow.mine(ledger.last_block().proof);
            ledger.create_block(proof, None);
        }
        ledger
    }

    fn peers(addrs: &[&str]) -> BTreeSet<String> {
        addrs.iter().map(|a| a.to_string()).collect()
    }

    fn lookup<'a>(
        map: HashMap<&'a str, ChainSnapshot>,
    ) -> impl FnMut(&str) -> Option<ChainSnapshot> + use<'a> {
        move |addr| map.get(addr).cloned()
    }

    #[test]
    fn longer_valid_chain_replaces_local() {
        let mut local = mined_ledger(2); // length 3
        let remote = mined_ledger(4); // length 5
        let expected = remote.chain().to_vec();
        let responses = HashMap::from([("peer:1", ChainSnapshot::of(&remote))]);

        let replaced = resolve(
            &mut local,
            &Validator::default(),
            &peers(&["peer:1"]),
            lookup(responses),
        );
        assert!(replaced);
        assert_eq!(local.chain(), &expected[..]);
    }

    #[test]
    fn shorter_chain_is_rejected() {
        let mut local = mined_ledger(2);
        let before = local.chain().to_vec();
        let responses = HashMap::from([("peer:1", ChainSnapshot::of(&mined_ledger(1)))]);

        let replaced = resolve(
            &mut local,
            &Validator::default(),
            &peers(&["peer:1"]),
            lookup(responses),
        );
        assert!(!replaced);
        assert_eq!(local.chain(), &before[..]);
    }

    #[test]
    fn equal_length_chain_is_rejected() {
        let mut local = mined_ledger(2);
        let before = local.chain().to_vec();
        let responses = HashMap::from([("peer:1", ChainSnapshot::of(&mined_ledger(2)))]);

        let replaced = resolve(
            &mut local,
            &Validator::default(),
            &peers(&["peer:1"]),
            lookup(responses),
        );
        assert!(!replaced);
        assert_eq!(local.chain(), &before[..]);
    }

    #[test]
    fn invalid_longer_chain_is_rejected() {
        let mut local = mined_ledger(2);
        let before = local.chain().to_vec();
        let mut snapshot = ChainSnapshot::of(&mined_ledger(4));
        snapshot.chain[2].proof += 1;
        let responses = HashMap::from([("peer:1", snapshot)]);

        let replaced = resolve(
            &mut local,
            &Validator::default(),
            &peers(&["peer:1"]),
            lookup(responses),
        );
        assert!(!replaced);
        assert_eq!(local.chain(), &before[..]);
    }

    #[test]
    fn unreachable_peers_are_skipped() {
        let mut local = mined_ledger(1);
        let remote = mined_ledger(3);
        let expected = remote.chain().to_vec();
        let responses = HashMap::from([("b:2", ChainSnapshot::of(&remote))]);

        let replaced = resolve(
            &mut local,
            &Validator::default(),
            &peers(&["a:1", "b:2", "c:3"]),
            lookup(responses),
        );
        assert!(replaced);
        assert_eq!(local.chain(), &expected[..]);
    }

    #[test]
    fn tie_keeps_lexicographically_smallest_peer() {
        let mut local = Ledger::new();
        let first = mined_ledger(3);
        let second = mined_ledger(3);
        let expected = first.chain().to_vec();
        assert_ne!(first.chain(), second.chain()); // timestamps differ
        let responses = HashMap::from([
            ("a:1", ChainSnapshot::of(&first)),
            ("b:2", ChainSnapshot::of(&second)),
        ]);

        let replaced = resolve(
            &mut local,
            &Validator::default(),
            &peers(&["b:2", "a:1"]),
            lookup(responses),
        );
        assert!(replaced);
        assert_eq!(local.chain(), &expected[..]);
    }

    #[test]
    fn parse_peer_addr_canonicalizes() {
        assert_eq!(parse_peer_addr("192.168.0.3:5050").unwrap(), "192.168.0.3:5050");
        assert_eq!(parse_peer_addr("http://192.168.0.3:5050").unwrap(), "192.168.0.3:5050");
        assert_eq!(parse_peer_addr("https://node.example:8080/chain").unwrap(), "node.example:8080");
        assert_eq!(parse_peer_addr("  http://localhost:3000  ").unwrap(), "localhost:3000");
    }

    #[test]
    fn parse_peer_addr_rejects_malformed() {
        for bad in ["", "localhost", "http://localhost", ":8080", "host:notaport", "host:99999"] {
            assert!(parse_peer_addr(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn peer_set_collapses_duplicates_and_sorts() {
        let mut set = BTreeSet::new();
        for addr in ["b:2", "a:1", "b:2"] {
            set.insert(parse_peer_addr(addr).unwrap());
        }
        let ordered: Vec<_> = set.iter().cloned().collect();
        assert_eq!(ordered, vec!["a:1", "b:2"]);
    }
}
