use crate::core::{
    find_block, next_difficulty, should_replace, CancelToken, Chain, MineOutcome,
};
use crate::error::{NodeError, Result};
use crate::network::peer::PeerSet;
use crate::network::wire;
use log::{debug, error, info, warn};
use std::net::{SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::Duration;

/// Default pause between local mining cycles on a mining node.
pub const DEFAULT_MINE_INTERVAL: Duration = Duration::from_secs(5);

const PEER_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Events consumed by the merge task, the only writer of chain state.
pub enum SyncEvent {
    /// A whole-chain snapshot received from a peer.
    PeerChain { from: String, chain: Chain },
    /// A candidate chain produced by the local mining task.
    MinedChain { chain: Chain },
    /// Stop the merge task.
    Shutdown,
}

enum MinerCommand {
    /// Run one mine cycle immediately, carrying this payload.
    Mine(Vec<u8>),
    Shutdown,
}

/// Copy-on-replace handle to the authoritative chain. Readers take cheap
/// `Arc` snapshots; the merge task is the only caller of [`replace`], and
/// every replacement bumps the generation counter so in-flight work can tell
/// it has gone stale.
///
/// [`replace`]: SharedChain::replace
#[derive(Clone)]
pub struct SharedChain {
    chain: Arc<RwLock<Arc<Chain>>>,
    generation: Arc<AtomicU64>,
}

impl SharedChain {
    fn new(chain: Chain) -> SharedChain {
        SharedChain {
            chain: Arc::new(RwLock::new(Arc::new(chain))),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// A consistent snapshot of the current chain.
    pub fn snapshot(&self) -> Arc<Chain> {
        Arc::clone(
            &self
                .chain
                .read()
                .expect("Failed to acquire read lock on chain - this should never happen"),
        )
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn replace(&self, chain: Chain) {
        let mut guard = self
            .chain
            .write()
            .expect("Failed to acquire write lock on chain - this should never happen");
        *guard = Arc::new(chain);
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

type ActiveSearch = Arc<RwLock<Option<CancelToken>>>;

/// The node engine: owns the authoritative chain and serializes every update
/// to it through one merge task, drives local mining, and fans adopted chains
/// out to peers.
pub struct SyncCoordinator {
    chain: SharedChain,
    peers: Arc<PeerSet>,
    events_tx: Sender<SyncEvent>,
    miner_tx: Sender<MinerCommand>,
    active_search: ActiveSearch,
    shutting_down: Arc<AtomicBool>,
}

impl SyncCoordinator {
    /// Spawn the merge, mining and broadcast tasks around a fresh genesis
    /// chain. With `mining` enabled the mining task ticks every
    /// `mine_interval`; otherwise it only mines submitted payloads.
    pub fn start(mining: bool, mine_interval: Duration) -> Arc<SyncCoordinator> {
        let chain = SharedChain::new(Chain::genesis());
        let peers = Arc::new(PeerSet::new());
        let (events_tx, events_rx) = mpsc::channel();
        let (miner_tx, miner_rx) = mpsc::channel();
        let (changed_tx, changed_rx) = mpsc::channel::<Arc<Vec<u8>>>();
        let active_search: ActiveSearch = Arc::new(RwLock::new(None));
        let shutting_down = Arc::new(AtomicBool::new(false));

        {
            let chain = chain.clone();
            let active_search = Arc::clone(&active_search);
            let miner_tx = miner_tx.clone();
            thread::spawn(move || {
                merge_loop(events_rx, chain, changed_tx, active_search, miner_tx)
            });
        }

        {
            let chain = chain.clone();
            let events_tx = events_tx.clone();
            let active_search = Arc::clone(&active_search);
            let shutting_down = Arc::clone(&shutting_down);
            thread::spawn(move || {
                miner_loop(
                    miner_rx,
                    chain,
                    events_tx,
                    active_search,
                    shutting_down,
                    mining,
                    mine_interval,
                )
            });
        }

        {
            let peers = Arc::clone(&peers);
            thread::spawn(move || broadcast_loop(changed_rx, peers));
        }

        if mining {
            info!("node started with mining enabled");
        } else {
            info!("node started without mining");
        }

        Arc::new(SyncCoordinator {
            chain,
            peers,
            events_tx,
            miner_tx,
            active_search,
            shutting_down,
        })
    }

    /// Read-only snapshot of the authoritative chain.
    pub fn chain_snapshot(&self) -> Arc<Chain> {
        self.chain.snapshot()
    }

    /// Hand a candidate chain to the merge task. Used by peer readers and by
    /// anything else that obtained a chain out of band.
    pub fn submit_chain(&self, from: &str, chain: Chain) {
        let event = SyncEvent::PeerChain {
            from: from.to_string(),
            chain,
        };
        let _ = self.events_tx.send(event);
    }

    /// Trigger an immediate mine cycle carrying `payload`.
    pub fn submit_payload(&self, payload: Vec<u8>) {
        let _ = self.miner_tx.send(MinerCommand::Mine(payload));
    }

    /// Dial a peer by address, register it, and seed it with our chain.
    pub fn add_peer(&self, addr: &str) -> Result<()> {
        let socket_addr = addr
            .parse::<SocketAddr>()
            .map_err(|e| NodeError::Config(format!("Invalid peer address {addr}: {e}")))?;
        let stream = TcpStream::connect_timeout(&socket_addr, PEER_CONNECT_TIMEOUT)
            .map_err(|e| NodeError::Network(format!("Failed to connect to {addr}: {e}")))?;
        self.register_peer(stream, addr.to_string())
    }

    /// Register an already-accepted inbound connection.
    pub fn accept_peer(&self, stream: TcpStream, label: String) -> Result<()> {
        self.register_peer(stream, label)
    }

    fn register_peer(&self, stream: TcpStream, label: String) -> Result<()> {
        Arc::clone(&self.peers).register(stream, label.clone(), self.events_tx.clone())?;

        // Seed the new peer so it can converge without waiting for our next
        // state change.
        let encoded = wire::encode_snapshot(&self.chain.snapshot())?;
        self.peers.send_to(&label, Arc::new(encoded));
        Ok(())
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Stop all tasks and disconnect every peer.
    pub fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
        if let Some(token) = self
            .active_search
            .read()
            .expect("Failed to acquire read lock on active search - this should never happen")
            .as_ref()
        {
            token.cancel();
        }
        let _ = self.miner_tx.send(MinerCommand::Shutdown);
        let _ = self.events_tx.send(SyncEvent::Shutdown);
        self.peers.clear();
    }
}

/// The sole writer of the authoritative chain. Candidates arrive one at a
/// time and are applied in receipt order; no two merges ever overlap.
fn merge_loop(
    events: Receiver<SyncEvent>,
    chain: SharedChain,
    changed_tx: Sender<Arc<Vec<u8>>>,
    active_search: ActiveSearch,
    miner_tx: Sender<MinerCommand>,
) {
    for event in events {
        match event {
            SyncEvent::PeerChain { from, chain: candidate } => {
                if let Err(e) = candidate.validate() {
                    warn!("discarding invalid chain from {from}: {e}");
                    continue;
                }
                let current = chain.snapshot();
                if should_replace(&current, &candidate) {
                    info!(
                        "adopting chain of {} blocks (weight {}) from {from}",
                        candidate.len(),
                        candidate.cumulative_weight()
                    );
                    adopt(&chain, candidate, &changed_tx, &active_search);
                } else {
                    debug!("keeping current chain over candidate from {from}");
                }
            }
            SyncEvent::MinedChain { chain: candidate } => {
                if let Err(e) = candidate.validate() {
                    // Our own miner produced garbage; that is a local bug, not
                    // remote data. Halt the mining subsystem, keep the node up.
                    let violation = NodeError::InternalInvariant(format!(
                        "locally mined chain failed validation: {e}"
                    ));
                    error!("{violation}; halting the mining task");
                    let _ = miner_tx.send(MinerCommand::Shutdown);
                    continue;
                }
                let current = chain.snapshot();
                if should_replace(&current, &candidate) {
                    if let Some(tip) = candidate.tip() {
                        info!(
                            "mined block {} (chain weight {})",
                            tip.get_index(),
                            candidate.cumulative_weight()
                        );
                    }
                    adopt(&chain, candidate, &changed_tx, &active_search);
                } else {
                    // A heavier chain arrived while this block was in flight.
                    debug!("discarding stale locally mined block");
                }
            }
            SyncEvent::Shutdown => break,
        }
    }
    debug!("merge task stopped");
}

fn adopt(
    chain: &SharedChain,
    candidate: Chain,
    changed_tx: &Sender<Arc<Vec<u8>>>,
    active_search: &ActiveSearch,
) {
    let encoded = wire::encode_snapshot(&candidate);
    chain.replace(candidate);

    // Any in-flight search now extends a stale tip; cancel it so the mining
    // task restarts against the new one.
    if let Some(token) = active_search
        .read()
        .expect("Failed to acquire read lock on active search - this should never happen")
        .as_ref()
    {
        token.cancel();
    }

    match encoded {
        Ok(bytes) => {
            let _ = changed_tx.send(Arc::new(bytes));
        }
        Err(e) => error!("failed to encode snapshot for broadcast: {e}"),
    }
}

/// The mining task. On mining nodes the command channel's receive timeout
/// doubles as the periodic mine timer; submitted payloads mine immediately on
/// any node.
fn miner_loop(
    commands: Receiver<MinerCommand>,
    chain: SharedChain,
    events_tx: Sender<SyncEvent>,
    active_search: ActiveSearch,
    shutting_down: Arc<AtomicBool>,
    periodic: bool,
    interval: Duration,
) {
    loop {
        let payload = if periodic {
            match commands.recv_timeout(interval) {
                Ok(MinerCommand::Mine(payload)) => payload,
                Ok(MinerCommand::Shutdown) => break,
                Err(RecvTimeoutError::Timeout) => Vec::new(),
                Err(RecvTimeoutError::Disconnected) => break,
            }
        } else {
            match commands.recv() {
                Ok(MinerCommand::Mine(payload)) => payload,
                Ok(MinerCommand::Shutdown) | Err(_) => break,
            }
        };

        mine_one(&chain, &events_tx, &active_search, &shutting_down, &payload);
    }
    debug!("mining task stopped");
}

/// One mine cycle: search against the current tip, restarting whenever an
/// adoption makes the search stale, until a block is found or the node shuts
/// down.
fn mine_one(
    chain: &SharedChain,
    events_tx: &Sender<SyncEvent>,
    active_search: &ActiveSearch,
    shutting_down: &Arc<AtomicBool>,
    payload: &[u8],
) {
    loop {
        if shutting_down.load(Ordering::SeqCst) {
            return;
        }

        let snapshot = chain.snapshot();
        let generation = chain.generation();
        let Some(tip) = snapshot.tip() else {
            error!("authoritative chain has no tip; skipping mine cycle");
            return;
        };
        let target = match next_difficulty(&snapshot) {
            Ok(target) => target,
            Err(e) => {
                error!("cannot derive mining difficulty: {e}");
                return;
            }
        };

        let token = CancelToken::new();
        *active_search
            .write()
            .expect("Failed to acquire write lock on active search - this should never happen") =
            Some(token.clone());

        // An adoption may have slipped in between taking the snapshot and
        // registering the token; it would have cancelled a token we had not
        // published yet, so check the generation before burning CPU.
        if chain.generation() != generation {
            continue;
        }

        let outcome = find_block(tip, target, payload, &token);

        *active_search
            .write()
            .expect("Failed to acquire write lock on active search - this should never happen") =
            None;

        match outcome {
            MineOutcome::Mined(block) => {
                let candidate = snapshot.extended_with(block);
                let _ = events_tx.send(SyncEvent::MinedChain { chain: candidate });
                return;
            }
            MineOutcome::Cancelled => {
                debug!("mining search went stale, restarting against the new tip");
            }
        }
    }
}

/// Fan-out task: pushes every adopted snapshot into each peer's bounded
/// outbound queue. Actual socket writes happen on the per-peer writer
/// threads, so one slow peer cannot hold up the rest.
fn broadcast_loop(changed: Receiver<Arc<Vec<u8>>>, peers: Arc<PeerSet>) {
    for snapshot in changed {
        peers.broadcast(&snapshot);
    }
    debug!("broadcast task stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testnet::test_utils::{mined_chain, wait_until};
    use std::time::Duration;

    #[test]
    fn test_candidates_merge_in_receipt_order() {
        let coordinator = SyncCoordinator::start(false, DEFAULT_MINE_INTERVAL);

        let lighter = mined_chain(2, 2); // weight 12
        let heavier = mined_chain(3, 2); // weight 16

        coordinator.submit_chain("peer-a", lighter.clone());
        coordinator.submit_chain("peer-b", heavier.clone());

        assert!(wait_until(Duration::from_secs(5), || {
            *coordinator.chain_snapshot() == heavier
        }));

        // A lighter chain arriving later must not displace the heavier one.
        coordinator.submit_chain("peer-a", lighter);
        std::thread::sleep(Duration::from_millis(200));
        assert_eq!(*coordinator.chain_snapshot(), heavier);

        coordinator.shutdown();
    }

    #[test]
    fn test_invalid_candidate_leaves_state_untouched() {
        let coordinator = SyncCoordinator::start(false, DEFAULT_MINE_INTERVAL);

        let chain = mined_chain(2, 1);
        let mut blocks = chain.blocks().to_vec();
        blocks.swap(1, 2);
        coordinator.submit_chain("peer-a", Chain::from_blocks(blocks));

        std::thread::sleep(Duration::from_millis(200));
        assert_eq!(*coordinator.chain_snapshot(), Chain::genesis());

        coordinator.shutdown();
    }

    #[test]
    fn test_submitted_payload_gets_mined() {
        let coordinator = SyncCoordinator::start(false, DEFAULT_MINE_INTERVAL);

        coordinator.submit_payload(b"operator data".to_vec());

        assert!(wait_until(Duration::from_secs(10), || {
            coordinator.chain_snapshot().len() == 2
        }));

        let snapshot = coordinator.chain_snapshot();
        let tip = snapshot.tip().expect("chain has a tip");
        assert_eq!(tip.get_payload(), b"operator data");
        assert!(snapshot.validate().is_ok());

        coordinator.shutdown();
    }

    #[test]
    fn test_mining_node_grows_its_chain() {
        let coordinator = SyncCoordinator::start(true, Duration::from_millis(50));

        assert!(wait_until(Duration::from_secs(15), || {
            coordinator.chain_snapshot().len() >= 4
        }));
        assert!(coordinator.chain_snapshot().validate().is_ok());

        coordinator.shutdown();
    }
}
