use crate::core::block::{leading_zero_bits, Block};
use crate::utils::{now_secs, sha256_digest};
use log::debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation signal for an in-flight proof-of-work search.
/// Cloning shares the flag; cancelling any clone stops the search.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Result of a proof-of-work search.
#[derive(Debug, Clone)]
pub enum MineOutcome {
    /// A block satisfying the difficulty target.
    Mined(Block),
    /// The search was cancelled before a qualifying nonce was found.
    Cancelled,
}

/// Search for a block extending `tip` whose hash clears `difficulty` leading
/// zero bits, carrying `payload`.
///
/// Nonces are enumerated as a little-endian `u64` counter starting at zero;
/// the first qualifying block is returned. The token is polled between nonce
/// attempts, so a cancelled search returns [`MineOutcome::Cancelled`]
/// promptly. The search space is otherwise unbounded: a target that no nonce
/// can reach keeps the search running until it is cancelled.
pub fn find_block(
    tip: &Block,
    difficulty: u32,
    payload: &[u8],
    cancel: &CancelToken,
) -> MineOutcome {
    let index = tip.get_index() + 1;
    let previous_hash = *tip.get_hash();
    let timestamp = now_secs();

    // index, previous hash, timestamp and payload are fixed for the whole
    // search; only the trailing nonce bytes change per attempt.
    let mut input = Block::hash_prefix(index, &previous_hash, &timestamp, payload);
    let nonce_offset = input.len();
    input.extend_from_slice(&0u64.to_le_bytes());

    let mut nonce: u64 = 0;
    loop {
        if cancel.is_cancelled() {
            debug!("mining search for block {index} cancelled after {nonce} attempts");
            return MineOutcome::Cancelled;
        }

        let nonce_bytes = nonce.to_le_bytes();
        input[nonce_offset..].copy_from_slice(&nonce_bytes);
        let hash = sha256_digest(&input);

        if leading_zero_bits(&hash) >= difficulty {
            debug!("mined block {index} at difficulty {difficulty} after {nonce} attempts");
            return MineOutcome::Mined(Block::from_parts(
                index,
                hash,
                previous_hash,
                timestamp,
                payload.to_vec(),
                difficulty,
                nonce_bytes.to_vec(),
            ));
        }

        nonce += 1;
    }
}
