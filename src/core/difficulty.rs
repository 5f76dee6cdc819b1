use crate::core::block::Block;
use crate::core::chain::Chain;
use crate::error::{NodeError, Result};
use log::info;

/// How often a block should be found, in seconds.
pub const BLOCK_GENERATION_INTERVAL_SECS: i64 = 10;
/// How many blocks between difficulty adjustments.
pub const DIFFICULTY_ADJUSTMENT_INTERVAL: usize = 2;

/// Difficulty the *next* block should carry, derived from chain history.
///
/// Off adjustment boundaries the latest block's difficulty is kept. On a
/// boundary the interval is compared against the expected generation time and
/// the interval-start difficulty moves one step up, one step down (never
/// below zero), or not at all.
pub fn next_difficulty(chain: &Chain) -> Result<u32> {
    let latest = chain.tip().ok_or(NodeError::EmptyChain)?;
    if latest.get_index() % (DIFFICULTY_ADJUSTMENT_INTERVAL as u32) != 0 {
        return Ok(latest.get_difficulty());
    }
    Ok(adjusted_difficulty(chain, latest))
}

fn adjusted_difficulty(chain: &Chain, latest: &Block) -> u32 {
    let blocks = chain.blocks();
    let Some(start) = blocks.len().checked_sub(DIFFICULTY_ADJUSTMENT_INTERVAL) else {
        // Not enough history for a full interval; nothing to compare against.
        return latest.get_difficulty();
    };
    let interval_start = &blocks[start];

    let expected = BLOCK_GENERATION_INTERVAL_SECS * DIFFICULTY_ADJUSTMENT_INTERVAL as i64;
    // Full signed duration between the interval endpoints. Reading a wrapping
    // sub-field of the timestamp here would blind the retarget to anything
    // longer than a minute.
    let actual = (*latest.get_timestamp() - *interval_start.get_timestamp()).num_seconds();
    let base = interval_start.get_difficulty();

    if actual < expected / 2 {
        info!("interval took {actual}s, expected {expected}s: difficulty up");
        base + 1
    } else if actual > expected * 2 {
        info!("interval took {actual}s, expected {expected}s: difficulty down");
        base.saturating_sub(1)
    } else {
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::block::HASH_LEN;
    use crate::utils::now_secs;
    use chrono::Duration;

    fn block_at(index: u32, difficulty: u32, seconds_offset: i64) -> Block {
        Block::new(
            index,
            [0u8; HASH_LEN],
            now_secs() + Duration::seconds(seconds_offset),
            Vec::new(),
            difficulty,
            Vec::new(),
        )
    }

    fn two_block_chain(interval_secs: i64, base_difficulty: u32) -> Chain {
        Chain::from_blocks(vec![
            block_at(1, base_difficulty, 0),
            block_at(2, base_difficulty, interval_secs),
        ])
    }

    #[test]
    fn test_empty_chain_errors() {
        let result = next_difficulty(&Chain::from_blocks(Vec::new()));
        assert!(matches!(result, Err(NodeError::EmptyChain)));
    }

    #[test]
    fn test_off_boundary_keeps_latest_difficulty() {
        let chain = Chain::from_blocks(vec![block_at(1, 3, 0)]);
        assert_eq!(next_difficulty(&chain).unwrap(), 3);

        let chain = Chain::from_blocks(vec![
            block_at(1, 2, 0),
            block_at(2, 2, 10),
            block_at(3, 5, 20),
        ]);
        assert_eq!(next_difficulty(&chain).unwrap(), 5);
    }

    #[test]
    fn test_fast_interval_raises_difficulty() {
        // 5s for a 20s-expected interval: below half, difficulty goes up.
        assert_eq!(next_difficulty(&two_block_chain(5, 2)).unwrap(), 3);
    }

    #[test]
    fn test_slow_interval_lowers_difficulty() {
        // 50s for a 20s-expected interval: above double, difficulty goes down.
        assert_eq!(next_difficulty(&two_block_chain(50, 2)).unwrap(), 1);
    }

    #[test]
    fn test_moderate_interval_keeps_difficulty() {
        // 15s sits inside the [half, double] band.
        assert_eq!(next_difficulty(&two_block_chain(15, 2)).unwrap(), 2);
    }

    #[test]
    fn test_difficulty_never_drops_below_zero() {
        assert_eq!(next_difficulty(&two_block_chain(50, 0)).unwrap(), 0);
    }
}
