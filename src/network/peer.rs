use crate::error::{NodeError, Result};
use crate::network::wire;
use crate::sync::SyncEvent;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::net::{Shutdown, TcpStream};
use std::sync::mpsc::{sync_channel, Receiver, Sender, SyncSender, TrySendError};
use std::sync::{Arc, RwLock};
use std::thread;

// Outbound snapshots queued per peer before we start dropping. Each snapshot
// is a whole chain and supersedes anything queued before it.
const OUTBOUND_QUEUE_DEPTH: usize = 8;

struct PeerHandle {
    outbound: SyncSender<Arc<Vec<u8>>>,
    // Kept so removing the peer can unblock its reader thread.
    stream: TcpStream,
}

/// Registry of live peer connections. Each peer gets one reader thread that
/// feeds decoded snapshots into the coordinator's event queue, and one writer
/// thread that drains a bounded outbound queue. A transport failure on either
/// side removes that peer and nothing else.
pub struct PeerSet {
    peers: RwLock<HashMap<String, PeerHandle>>,
}

impl Default for PeerSet {
    fn default() -> Self {
        Self::new()
    }
}

impl PeerSet {
    pub fn new() -> PeerSet {
        PeerSet {
            peers: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.peers
            .read()
            .expect("Failed to acquire read lock on peers - this should never happen")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_known(&self, label: &str) -> bool {
        self.peers
            .read()
            .expect("Failed to acquire read lock on peers - this should never happen")
            .contains_key(label)
    }

    /// Take ownership of a connected stream and spawn its reader and writer
    /// threads. Decoded snapshots flow into `events`.
    pub fn register(
        self: Arc<Self>,
        stream: TcpStream,
        label: String,
        events: Sender<SyncEvent>,
    ) -> Result<()> {
        let reader_stream = stream
            .try_clone()
            .map_err(|e| NodeError::Network(format!("Failed to split stream to {label}: {e}")))?;
        let keeper_stream = stream
            .try_clone()
            .map_err(|e| NodeError::Network(format!("Failed to split stream to {label}: {e}")))?;

        let (outbound_tx, outbound_rx) = sync_channel(OUTBOUND_QUEUE_DEPTH);

        {
            let mut peers = self
                .peers
                .write()
                .expect("Failed to acquire write lock on peers - this should never happen");
            if peers.contains_key(&label) {
                return Err(NodeError::Network(format!("Peer {label} already connected")));
            }
            peers.insert(
                label.clone(),
                PeerHandle {
                    outbound: outbound_tx,
                    stream: keeper_stream,
                },
            );
        }

        let registry = Arc::clone(&self);
        let writer_label = label.clone();
        thread::spawn(move || writer_loop(stream, outbound_rx, writer_label, registry));

        let registry = Arc::clone(&self);
        let reader_label = label.clone();
        thread::spawn(move || reader_loop(reader_stream, reader_label, events, registry));

        info!("connected to peer {label}");
        Ok(())
    }

    /// Drop a peer and close its socket, unblocking its threads.
    pub fn remove(&self, label: &str) {
        let handle = self
            .peers
            .write()
            .expect("Failed to acquire write lock on peers - this should never happen")
            .remove(label);
        if let Some(handle) = handle {
            let _ = handle.stream.shutdown(Shutdown::Both);
            info!("disconnected from peer {label}");
        }
    }

    /// Disconnect every peer.
    pub fn clear(&self) {
        let mut peers = self
            .peers
            .write()
            .expect("Failed to acquire write lock on peers - this should never happen");
        for (label, handle) in peers.drain() {
            let _ = handle.stream.shutdown(Shutdown::Both);
            debug!("disconnected from peer {label}");
        }
    }

    /// Queue a snapshot for one peer, dropping it if the peer is unknown or
    /// its queue is full.
    pub fn send_to(&self, label: &str, snapshot: Arc<Vec<u8>>) {
        let peers = self
            .peers
            .read()
            .expect("Failed to acquire read lock on peers - this should never happen");
        if let Some(handle) = peers.get(label) {
            if handle.outbound.try_send(snapshot).is_err() {
                warn!("could not queue snapshot for peer {label}");
            }
        }
    }

    /// Fan a snapshot out to every connected peer. A peer with a full queue
    /// misses this snapshot but never delays the others.
    pub fn broadcast(&self, snapshot: &Arc<Vec<u8>>) {
        let peers = self
            .peers
            .read()
            .expect("Failed to acquire read lock on peers - this should never happen");
        for (label, handle) in peers.iter() {
            match handle.outbound.try_send(Arc::clone(snapshot)) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!("peer {label} is lagging, dropping snapshot for it");
                }
                // Writer already gone; its cleanup removes the peer.
                Err(TrySendError::Disconnected(_)) => {}
            }
        }
    }
}

fn reader_loop(
    mut stream: TcpStream,
    label: String,
    events: Sender<SyncEvent>,
    registry: Arc<PeerSet>,
) {
    loop {
        match wire::read_snapshot(&mut stream) {
            Ok(chain) => {
                debug!("received {}-block snapshot from {label}", chain.len());
                let event = SyncEvent::PeerChain {
                    from: label.clone(),
                    chain,
                };
                if events.send(event).is_err() {
                    // Coordinator is gone; nothing left to deliver to.
                    break;
                }
            }
            Err(e) => {
                warn!("closing connection to {label}: {e}");
                break;
            }
        }
    }
    registry.remove(&label);
    let _ = stream.shutdown(Shutdown::Both);
}

fn writer_loop(
    mut stream: TcpStream,
    outbound: Receiver<Arc<Vec<u8>>>,
    label: String,
    registry: Arc<PeerSet>,
) {
    for snapshot in outbound {
        if let Err(e) = wire::write_frame(&mut stream, &snapshot) {
            warn!("write to peer {label} failed: {e}");
            break;
        }
    }
    registry.remove(&label);
    let _ = stream.shutdown(Shutdown::Both);
}
