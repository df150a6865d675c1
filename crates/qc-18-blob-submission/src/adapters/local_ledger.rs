//! # Local Ledger
//!
//! In-process stand-in for a blob-carrying ledger. Implements the broadcast,
//! query and trusted-root ports so the submission lifecycle can run end to
//! end without a network.
//!
//! ## Lifecycle
//!
//! ```text
//! broadcast ──CheckTx──► mempool ──commit_block──► block N
//!     │                                              ├── results tree (leaf per tx)
//!     └── rejected: nonzero code, not stored         └── root recorded for height N
//! ```
//!
//! - `Sync` broadcasts return after CheckTx; the tx stays `Pending` until
//!   the next commit.
//! - `Block` broadcasts commit immediately.
//!
//! ## Retention
//!
//! Blocks, results, roots, tx locations and tamper marks are kept for the
//! lifetime of the ledger, which is meant to live for one test or one local
//! session. The LRU cache bounds only the number of *built* results trees
//! (`max_cached_trees`); it is a rebuild-cost cache, and a miss rebuilds the
//! tree from the retained results.
//!
//! ## Locking
//!
//! The duplicate and balance checks of CheckTx run under the same write
//! guard as the mempool insert. The state lock is never held across an
//! `.await`.

use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lru::LruCache;
use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::algorithms::merkle::{results_leaf, MerkleTree};
use crate::algorithms::shares;
use crate::application::assembler;
use crate::config::SubmissionConfig;
use crate::domain::{
    codes, emit_for_message, Address, BlobError, BlobTx, BroadcastFailure, BroadcastMode,
    BroadcastResponse, CheckTxError, Hash, InclusionError, InclusionProof, RawEvent,
    SignerAccount, TxHash, TxResponse, TxResult,
};
use crate::ports::{Broadcaster, TrustedRootSource, TxQueryChannel};

/// Ways the ledger can misreport a committed transaction. Test hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tamper {
    /// Serve a different result than the one committed.
    Result,
    /// Corrupt the first sibling of the proof path.
    Path,
    /// Claim a different results root in the proof.
    Root,
}

/// Summary of a committed block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedBlock {
    /// Height assigned to the block.
    pub height: u64,
    /// Transactions included.
    pub tx_count: usize,
    /// Root over the block's results leaves.
    pub results_root: Hash,
}

#[derive(Debug, Clone, Copy)]
struct TxLocation {
    height: u64,
    index: usize,
}

struct PendingTx {
    tx_hash: TxHash,
    tx: BlobTx,
}

struct LedgerState {
    height: u64,
    balances: HashMap<Address, u64>,
    mempool: Vec<PendingTx>,
    pending: HashSet<TxHash>,
    locations: HashMap<TxHash, TxLocation>,
    blocks: HashMap<u64, Vec<(TxHash, TxResult)>>,
    roots: HashMap<u64, Hash>,
    trees: LruCache<u64, MerkleTree>,
    tampered: HashMap<TxHash, Tamper>,
    offline: bool,
}

impl LedgerState {
    fn is_known(&self, tx_hash: &TxHash) -> bool {
        self.pending.contains(tx_hash) || self.locations.contains_key(tx_hash)
    }

    /// Fees already promised by `signer`'s transactions in the mempool.
    fn pending_spend(&self, signer: &Address) -> u64 {
        self.mempool
            .iter()
            .filter(|p| p.tx.tx.body.msg.signer == *signer)
            .map(|p| p.tx.tx.body.fee.amount)
            .fold(0u64, u64::saturating_add)
    }

    fn tree_for(&mut self, height: u64) -> Result<&MerkleTree, bincode::Error> {
        if !self.trees.contains(&height) {
            let leaves = self
                .blocks
                .get(&height)
                .map(|txs| {
                    txs.iter()
                        .map(|(hash, result)| results_leaf(hash, result))
                        .collect::<Result<Vec<_>, _>>()
                })
                .transpose()?
                .unwrap_or_default();
            debug!("[qc-18] Rebuilding results tree for height {}", height);
            self.trees.put(height, MerkleTree::build(leaves));
        }
        // Present: inserted above if it was missing.
        Ok(self.trees.get(&height).ok_or_else(|| {
            Box::new(bincode::ErrorKind::Custom("results tree evicted".into()))
        })?)
    }
}

/// In-process ledger.
pub struct LocalLedger {
    config: SubmissionConfig,
    state: RwLock<LedgerState>,
}

impl LocalLedger {
    /// Empty ledger at height 0 with no funded accounts.
    pub fn new(config: SubmissionConfig) -> Self {
        let cache = NonZeroUsize::new(config.max_cached_trees).unwrap_or(NonZeroUsize::MIN);
        Self {
            config,
            state: RwLock::new(LedgerState {
                height: 0,
                balances: HashMap::new(),
                mempool: Vec::new(),
                pending: HashSet::new(),
                locations: HashMap::new(),
                blocks: HashMap::new(),
                roots: HashMap::new(),
                trees: LruCache::new(cache),
                tampered: HashMap::new(),
                offline: false,
            }),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &SubmissionConfig {
        &self.config
    }

    /// Credit `amount` to `address`.
    pub fn fund(&self, address: Address, amount: u64) {
        let mut state = self.state.write();
        let balance = state.balances.entry(address).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    /// Committed balance of `address`.
    pub fn balance(&self, address: &Address) -> u64 {
        self.state.read().balances.get(address).copied().unwrap_or(0)
    }

    /// Height of the last committed block.
    pub fn height(&self) -> u64 {
        self.state.read().height
    }

    /// Transactions waiting in the mempool.
    pub fn pending_count(&self) -> usize {
        self.state.read().mempool.len()
    }

    /// Simulate a connectivity loss on every port.
    pub fn set_offline(&self, offline: bool) {
        self.state.write().offline = offline;
    }

    /// Misreport `tx_hash` on subsequent queries.
    pub fn tamper(&self, tx_hash: TxHash, how: Tamper) {
        self.state.write().tampered.insert(tx_hash, how);
    }

    /// Validate transaction bytes the way the ledger's mempool would,
    /// without admitting them.
    pub fn check_tx(&self, tx_bytes: &[u8]) -> Result<(TxHash, BlobTx), CheckTxError> {
        let (tx_hash, tx) = self.check_stateless(tx_bytes)?;
        self.check_against(&self.state.read(), &tx_hash, &tx)?;
        Ok((tx_hash, tx))
    }

    /// CheckTx and mempool insertion as one step.
    ///
    /// Duplicate and balance checks run under the same write guard as the
    /// insert, so concurrent broadcasts cannot both pass them.
    fn admit(&self, tx_bytes: &[u8]) -> Result<TxHash, CheckTxError> {
        let (tx_hash, tx) = self.check_stateless(tx_bytes)?;

        let mut state = self.state.write();
        self.check_against(&state, &tx_hash, &tx)?;
        state.pending.insert(tx_hash);
        state.mempool.push(PendingTx { tx_hash, tx });
        Ok(tx_hash)
    }

    /// Checks that depend only on the transaction bytes.
    fn check_stateless(&self, tx_bytes: &[u8]) -> Result<(TxHash, BlobTx), CheckTxError> {
        let tx = BlobTx::decode(tx_bytes).map_err(|e| CheckTxError::Malformed(e.to_string()))?;
        let tx_hash = TxHash::digest(tx_bytes);

        tx.tx.verify_signature()?;

        let msg = &tx.tx.body.msg;
        msg.validate_basic()?;

        if tx.blobs.len() != msg.blob_count() {
            return Err(CheckTxError::Malformed(format!(
                "{} blobs attached for {} declared",
                tx.blobs.len(),
                msg.blob_count()
            )));
        }

        let mut total_shares = 0usize;
        for (index, blob) in tx.blobs.iter().enumerate() {
            let blob_err = |source: BlobError| CheckTxError::Blob { index, source };

            blob.namespace().validate().map_err(blob_err)?;
            if blob.size() == 0 {
                return Err(blob_err(BlobError::EmptyBlob));
            }
            if blob.size() > self.config.max_blob_size {
                return Err(blob_err(BlobError::BlobTooLarge {
                    size: blob.size(),
                    max: self.config.max_blob_size,
                }));
            }
            let encoded = shares::encode(blob).map_err(blob_err)?;

            let mismatch = |field| CheckTxError::BlobMismatch { index, field };
            if *blob.namespace() != msg.namespaces[index] {
                return Err(mismatch("namespace"));
            }
            if u32::try_from(blob.size()).ok() != Some(msg.blob_sizes[index]) {
                return Err(mismatch("size"));
            }
            if blob.share_version() != msg.share_versions[index] {
                return Err(mismatch("share version"));
            }
            if encoded.share_commitment() != msg.share_commitments[index] {
                return Err(mismatch("share commitment"));
            }

            total_shares += encoded.share_count();
        }

        let body = &tx.tx.body;
        let required_gas = assembler::estimate_gas(total_shares, &self.config);
        if body.gas_limit < required_gas {
            return Err(CheckTxError::OutOfGas {
                limit: body.gas_limit,
                required: required_gas,
            });
        }

        Ok((tx_hash, tx))
    }

    /// Duplicate and fee checks against current ledger state. The balance
    /// is net of fees already promised by the signer's pending txs.
    fn check_against(
        &self,
        state: &LedgerState,
        tx_hash: &TxHash,
        tx: &BlobTx,
    ) -> Result<(), CheckTxError> {
        if state.is_known(tx_hash) {
            return Err(CheckTxError::AlreadyKnown);
        }

        let body = &tx.tx.body;
        let signer = body.msg.signer;
        let balance = state
            .balances
            .get(&signer)
            .copied()
            .unwrap_or(0)
            .saturating_sub(state.pending_spend(&signer));
        assembler::check_fee(
            &SignerAccount {
                address: signer,
                balance,
            },
            &body.fee,
            body.gas_limit,
            &self.config,
        )?;
        Ok(())
    }

    /// Execute the mempool into a new block and record its results root.
    pub fn commit_block(&self) -> Result<CommittedBlock, bincode::Error> {
        let mut state = self.state.write();
        let height = state.height + 1;
        let pending = std::mem::take(&mut state.mempool);

        let mut results = Vec::with_capacity(pending.len());
        for PendingTx { tx_hash, tx } in pending {
            state.pending.remove(&tx_hash);
            let result = Self::deliver(&mut state, &tx, &self.config);
            results.push((tx_hash, result));
        }

        let leaves = results
            .iter()
            .map(|(hash, result)| results_leaf(hash, result))
            .collect::<Result<Vec<_>, _>>()?;
        let tree = MerkleTree::build(leaves);
        let results_root = tree.root();

        for (index, (tx_hash, _)) in results.iter().enumerate() {
            state.locations.insert(*tx_hash, TxLocation { height, index });
        }

        let tx_count = results.len();
        state.blocks.insert(height, results);
        state.roots.insert(height, results_root);
        state.trees.put(height, tree);
        state.height = height;

        info!(
            "[qc-18] Committed block {} with {} txs (results root {})",
            height,
            tx_count,
            hex::encode(&results_root[..8])
        );

        Ok(CommittedBlock {
            height,
            tx_count,
            results_root,
        })
    }

    /// Charge the fee and produce the execution result.
    fn deliver(state: &mut LedgerState, tx: &BlobTx, config: &SubmissionConfig) -> TxResult {
        let body = &tx.tx.body;
        let balance = state.balances.get(&body.msg.signer).copied().unwrap_or(0);

        if balance < body.fee.amount {
            return TxResult {
                code: codes::INSUFFICIENT_BALANCE,
                log: format!("balance {} below fee {}", balance, body.fee),
                events: Vec::new(),
                gas_used: 0,
            };
        }
        state
            .balances
            .insert(body.msg.signer, balance - body.fee.amount);

        let total_shares = tx.blobs.iter().map(|b| shares::shares_needed(b.size())).sum();
        TxResult {
            code: codes::OK,
            log: String::new(),
            events: emit_for_message(&body.msg)
                .iter()
                .map(|event| event.to_raw())
                .collect::<Vec<RawEvent>>(),
            gas_used: assembler::estimate_gas(total_shares, config),
        }
    }

    /// Commit a block every `interval` until the handle is aborted.
    pub fn spawn_block_producer(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let ledger = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                if let Err(e) = ledger.commit_block() {
                    warn!("[qc-18] Block production failed: {}", e);
                }
            }
        })
    }

    fn response_for(&self, tx_hash: &TxHash, prove: bool) -> Result<TxResponse, InclusionError> {
        let mut state = self.state.write();
        if state.offline {
            return Err(InclusionError::Transport("ledger offline".into()));
        }
        if state.pending.contains(tx_hash) {
            return Err(InclusionError::Pending { tx_hash: *tx_hash });
        }

        let location = state
            .locations
            .get(tx_hash)
            .copied()
            .ok_or(InclusionError::NotFound { tx_hash: *tx_hash })?;

        let mut result = state
            .blocks
            .get(&location.height)
            .and_then(|txs| txs.get(location.index))
            .map(|(_, result)| result.clone())
            .ok_or(InclusionError::NotFound { tx_hash: *tx_hash })?;

        let index = u32::try_from(location.index)
            .map_err(|_| InclusionError::Transport("tx index overflow".into()))?;

        let mut proof = if prove {
            let tree = state
                .tree_for(location.height)
                .map_err(|e| InclusionError::Transport(e.to_string()))?;
            let path = tree
                .proof(location.index)
                .map_err(|e| InclusionError::Transport(e.to_string()))?;
            Some(InclusionProof {
                tx_hash: *tx_hash,
                height: location.height,
                index,
                path,
                root: tree.root(),
            })
        } else {
            None
        };

        match state.tampered.get(tx_hash) {
            Some(Tamper::Result) => {
                result.code = codes::OK;
                result.log = "forged".into();
                result.gas_used = result.gas_used.wrapping_add(1);
            }
            Some(Tamper::Path) => {
                if let Some(node) = proof.as_mut().and_then(|p| p.path.first_mut()) {
                    node.hash[0] ^= 0xFF;
                }
            }
            Some(Tamper::Root) => {
                if let Some(p) = proof.as_mut() {
                    p.root[0] ^= 0xFF;
                }
            }
            None => {}
        }

        Ok(TxResponse {
            tx_hash: *tx_hash,
            height: location.height,
            index,
            result,
            proof,
        })
    }
}

impl Default for LocalLedger {
    fn default() -> Self {
        Self::new(SubmissionConfig::default())
    }
}

#[async_trait]
impl Broadcaster for LocalLedger {
    async fn broadcast(
        &self,
        tx_bytes: Vec<u8>,
        mode: BroadcastMode,
    ) -> Result<BroadcastResponse, BroadcastFailure> {
        if self.state.read().offline {
            return Err(BroadcastFailure::new("ledger offline"));
        }

        let tx_hash = match self.admit(&tx_bytes) {
            Ok(tx_hash) => tx_hash,
            Err(e) => {
                let tx_hash = TxHash::digest(&tx_bytes);
                warn!("[qc-18] CheckTx rejected {}: {}", tx_hash, e);
                return Ok(BroadcastResponse {
                    tx_hash,
                    code: e.code(),
                    log: e.to_string(),
                    height: None,
                    events: Vec::new(),
                    gas_used: 0,
                });
            }
        };
        debug!("[qc-18] Accepted {} into mempool", tx_hash);

        match mode {
            BroadcastMode::Sync => Ok(BroadcastResponse {
                tx_hash,
                code: codes::OK,
                log: String::new(),
                height: None,
                events: Vec::new(),
                gas_used: 0,
            }),
            BroadcastMode::Block => {
                self.commit_block()
                    .map_err(|e| BroadcastFailure::new(e.to_string()))?;
                // A concurrent producer may have committed it first.
                let state = self.state.read();
                let (height, (_, result)) = state
                    .locations
                    .get(&tx_hash)
                    .and_then(|loc| {
                        let committed = state.blocks.get(&loc.height)?.get(loc.index)?;
                        Some((loc.height, committed))
                    })
                    .ok_or_else(|| BroadcastFailure::new("committed tx missing from block"))?;

                Ok(BroadcastResponse {
                    tx_hash,
                    code: result.code,
                    log: result.log.clone(),
                    height: Some(height),
                    events: result.events.clone(),
                    gas_used: result.gas_used,
                })
            }
        }
    }

    async fn account_balance(
        &self,
        address: &Address,
        denom: &str,
    ) -> Result<u64, BroadcastFailure> {
        let state = self.state.read();
        if state.offline {
            return Err(BroadcastFailure::new("ledger offline"));
        }
        if denom != self.config.fee_denom {
            return Ok(0);
        }
        Ok(state.balances.get(address).copied().unwrap_or(0))
    }
}

#[async_trait]
impl TxQueryChannel for LocalLedger {
    async fn query_tx(&self, tx_hash: &TxHash, prove: bool) -> Result<TxResponse, InclusionError> {
        self.response_for(tx_hash, prove)
    }
}

#[async_trait]
impl TrustedRootSource for LocalLedger {
    async fn results_root(&self, height: u64) -> Result<Hash, InclusionError> {
        let state = self.state.read();
        if state.offline {
            return Err(InclusionError::Transport("ledger offline".into()));
        }
        state
            .roots
            .get(&height)
            .copied()
            .ok_or(InclusionError::UnknownHeight { height })
    }
}
