//! Test utilities for chain and node testing

use crate::core::{find_block, CancelToken, Chain, MineOutcome};
use std::time::{Duration, Instant};

/// Genesis plus `extra_blocks` blocks mined at a fixed difficulty with empty
/// payloads.
pub fn mined_chain(extra_blocks: usize, difficulty: u32) -> Chain {
    let mut chain = Chain::genesis();
    for _ in 0..extra_blocks {
        chain = extend_mined(&chain, difficulty, b"");
    }
    chain
}

/// Mine one block on top of `chain` and return the extended copy.
pub fn extend_mined(chain: &Chain, difficulty: u32, payload: &[u8]) -> Chain {
    let tip = chain.tip().expect("test chains always have a tip");
    match find_block(tip, difficulty, payload, &CancelToken::new()) {
        MineOutcome::Mined(block) => chain.extended_with(block),
        MineOutcome::Cancelled => unreachable!("nothing cancels the test search"),
    }
}

/// Poll `condition` until it holds or `timeout` elapses.
pub fn wait_until<F: Fn() -> bool>(timeout: Duration, condition: F) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    condition()
}
