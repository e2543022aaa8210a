//! HTTP node wrapping the core ledger: transaction submission, mining,
//! chain reads, peer registration, and conflict resolution.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeSet, HashMap},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tinychain_core::{
    consensus, hash_block, ChainSnapshot, Ledger, LedgerError, MineOutcome, ProofOfWork,
    Transaction, Validator,
};
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

/// Sender recorded on the reward transaction injected before each mined block.
const REWARD_SENDER: &str = "0";
const REWARD_AMOUNT: u64 = 1;

/// Everything a request handler needs, passed explicitly via axum state.
/// The ledger and peer set are the only shared mutable resources; each sits
/// behind its own lock, and neither lock is ever held across network I/O or
/// the mining search.
pub struct NodeState {
    ledger: Mutex<Ledger>,
    peers: Mutex<BTreeSet<String>>,
    node_id: String,
    pow: ProofOfWork,
    validator: Validator,
    client: reqwest::Client,
    /// Set by a successful conflict resolution to abandon an in-flight
    /// mining attempt whose tip was replaced out from under it.
    mining_cancelled: AtomicBool,
    peer_timeout: Duration,
}

#[derive(Clone)]
pub struct AppState {
    inner: Arc<NodeState>,
}

impl AppState {
    pub fn new(difficulty: usize, peer_timeout: Duration) -> Self {
        let pow = ProofOfWork::new(difficulty);
        Self {
            inner: Arc::new(NodeState {
                ledger: Mutex::new(Ledger::new()),
                peers: Mutex::new(BTreeSet::new()),
                node_id: hex::encode(rand::random::<[u8; 16]>()),
                pow,
                validator: Validator::new(pow),
                client: reqwest::Client::new(),
                mining_cancelled: AtomicBool::new(false),
                peer_timeout,
            }),
        }
    }

    pub fn node_id(&self) -> &str {
        &self.inner.node_id
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/transactions/new", post(submit_transaction))
        .route("/mine", get(mine))
        .route("/chain", get(read_chain))
        .route("/nodes/register", post(register_peers))
        .route("/nodes/resolve", get(resolve_conflicts))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// JSON error body with a matching status code. Validation failures map to
/// 400 and refuse the mutation entirely.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, message: message.into() }
    }

    fn conflict(message: impl Into<String>) -> Self {
        Self { status: StatusCode::CONFLICT, message: message.into() }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self { status: StatusCode::INTERNAL_SERVER_ERROR, message: message.into() }
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

#[derive(Deserialize)]
struct TxIn {
    sender: String,
    recipient: String,
    amount: u64,
}

#[derive(Serialize)]
struct SubmitResponse {
    message: String,
    index: u64,
}

async fn submit_transaction(
    State(state): State<AppState>,
    Json(tx): Json<TxIn>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let mut ledger = state.inner.ledger.lock().await;
    let index = ledger.submit_transaction(&tx.sender, &tx.recipient, tx.amount)?;
    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            message: format!("Transaction will be added to block {index}"),
            index,
        }),
    ))
}

#[derive(Serialize)]
struct MineResponse {
    message: String,
    index: u64,
    transactions: Vec<Transaction>,
    proof: u64,
    previous_hash: String,
}

/// One full mine-and-append cycle. The proof search runs on a blocking
/// worker with the ledger lock released; if the tip moved while searching
/// (another mine call or a chain replacement), the stale proof is discarded
/// with a 409 instead of appending a block that would not validate.
async fn mine(State(state): State<AppState>) -> Result<Json<MineResponse>, ApiError> {
    let (last_proof, tip_hash) = {
        let ledger = state.inner.ledger.lock().await;
        (ledger.last_block().proof, hash_block(ledger.last_block()))
    };

    state.inner.mining_cancelled.store(false, Ordering::Relaxed);
    let pow = state.inner.pow;
    let inner = state.inner.clone();
    let outcome =
        tokio::task::spawn_blocking(move || pow.mine_cancellable(last_proof, &inner.mining_cancelled))
            .await
            .map_err(|_| ApiError::internal("mining task failed"))?;

    let proof = match outcome {
        MineOutcome::Found(proof) => proof,
        MineOutcome::Cancelled => return Err(ApiError::conflict("mining cancelled")),
    };

    let mut ledger = state.inner.ledger.lock().await;
    if hash_block(ledger.last_block()) != tip_hash {
        return Err(ApiError::conflict("chain advanced during mining, proof discarded"));
    }

    // the miner's reward rides in the block it mined
    ledger.submit_transaction(REWARD_SENDER, &state.inner.node_id, REWARD_AMOUNT)?;
    let block = ledger.create_block(proof, None);

    Ok(Json(MineResponse {
        message: "New block forged".to_string(),
        index: block.index,
        transactions: block.transactions,
        proof: block.proof,
        previous_hash: block.previous_hash,
    }))
}

async fn read_chain(State(state): State<AppState>) -> Json<ChainSnapshot> {
    let ledger = state.inner.ledger.lock().await;
    Json(ChainSnapshot::of(&ledger))
}

#[derive(Deserialize)]
struct RegisterRequest {
    nodes: Vec<String>,
}

#[derive(Serialize)]
struct RegisterResponse {
    message: String,
    total_nodes: Vec<String>,
}

async fn register_peers(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    if req.nodes.is_empty() {
        return Err(ApiError::bad_request("no peer addresses supplied"));
    }
    // parse everything up front so a bad address rejects the whole request
    let parsed = req
        .nodes
        .iter()
        .map(|addr| consensus::parse_peer_addr(addr))
        .collect::<Result<Vec<_>, _>>()?;

    let mut peers = state.inner.peers.lock().await;
    peers.extend(parsed);
    Ok(Json(RegisterResponse {
        message: "New peers have been added".to_string(),
        total_nodes: peers.iter().cloned().collect(),
    }))
}

#[derive(Serialize)]
struct ResolveResponse {
    message: String,
    replaced: bool,
    chain: Vec<tinychain_core::Block>,
}

/// Longest-valid-chain resolution against every registered peer. Peer
/// chains are fetched concurrently with a per-peer timeout before the
/// ledger lock is taken; only the final compare-and-swap runs under it.
async fn resolve_conflicts(State(state): State<AppState>) -> Json<ResolveResponse> {
    let peers = state.inner.peers.lock().await.clone();

    let mut fetches = tokio::task::JoinSet::new();
    for peer in peers.iter().cloned() {
        let client = state.inner.client.clone();
        let timeout = state.inner.peer_timeout;
        fetches.spawn(async move {
            let snapshot = fetch_remote_chain(&client, &peer, timeout).await;
            (peer, snapshot)
        });
    }
    let mut responses: HashMap<String, ChainSnapshot> = HashMap::new();
    while let Some(joined) = fetches.join_next().await {
        if let Ok((peer, Some(snapshot))) = joined {
            responses.insert(peer, snapshot);
        }
    }

    let mut ledger = state.inner.ledger.lock().await;
    let replaced = consensus::resolve(&mut ledger, &state.inner.validator, &peers, |addr| {
        responses.get(addr).cloned()
    });
    if replaced {
        // an in-flight mining attempt is now working on a dead tip
        state.inner.mining_cancelled.store(true, Ordering::Relaxed);
    }

    let message = if replaced {
        "Our chain was replaced".to_string()
    } else {
        "Our chain is authoritative".to_string()
    };
    Json(ResolveResponse {
        message,
        replaced,
        chain: ledger.chain().to_vec(),
    })
}

/// `GET http://{peer}/chain`. Any transport failure, timeout, non-success
/// status, or undecodable body counts as "peer unavailable" and yields
/// `None`; resolution carries on with the remaining peers.
async fn fetch_remote_chain(
    client: &reqwest::Client,
    peer: &str,
    timeout: Duration,
) -> Option<ChainSnapshot> {
    let url = format!("http://{peer}/chain");
    let response = match client.get(&url).timeout(timeout).send().await {
        Ok(response) => response,
        Err(err) => {
            debug!(%peer, %err, "peer fetch failed");
            return None;
        }
    };
    if !response.status().is_success() {
        debug!(%peer, status = %response.status(), "peer returned non-success");
        return None;
    }
    match response.json::<ChainSnapshot>().await {
        Ok(snapshot) => {
            info!(%peer, length = snapshot.length, "fetched peer chain");
            Some(snapshot)
        }
        Err(err) => {
            debug!(%peer, %err, "peer chain payload undecodable");
            None
        }
    }
}
