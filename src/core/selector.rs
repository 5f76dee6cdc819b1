use crate::core::chain::Chain;
use log::debug;

/// Decide whether `candidate` should replace `current` as the authoritative
/// chain. `current` is assumed valid.
///
/// An invalid candidate never wins. Otherwise the chain with the strictly
/// greater cumulative weight wins; ties keep the currently held chain. Weight,
/// not block count, is the yardstick: a short chain of high difficulty can
/// outweigh a long chain of low difficulty.
pub fn should_replace(current: &Chain, candidate: &Chain) -> bool {
    if let Err(e) = candidate.validate() {
        debug!("candidate chain rejected: {e}");
        return false;
    }

    let current_weight = current.cumulative_weight();
    let candidate_weight = candidate.cumulative_weight();
    debug!(
        "chain selection: current weight {current_weight} ({} blocks), candidate weight {candidate_weight} ({} blocks)",
        current.len(),
        candidate.len()
    );

    candidate_weight > current_weight
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::block::{Block, HASH_LEN};
    use crate::core::chain::genesis_block;
    use crate::testnet::test_utils::mined_chain;
    use crate::utils::now_secs;

    #[test]
    fn test_equal_weight_keeps_current_even_if_candidate_is_longer() {
        // Genesis (difficulty 2) + 2 blocks at difficulty 2: weight 12, 3 blocks.
        let current = mined_chain(2, 2);
        // Genesis + 4 blocks at difficulty 1: weight 12 as well, but 5 blocks.
        let candidate = mined_chain(4, 1);

        assert_eq!(current.cumulative_weight(), candidate.cumulative_weight());
        assert!(!should_replace(&current, &candidate));
    }

    #[test]
    fn test_heavier_but_shorter_candidate_wins() {
        // Weight 12 across 5 blocks.
        let current = mined_chain(4, 1);
        // Weight 16 across only 4 blocks.
        let candidate = mined_chain(3, 2);

        assert!(candidate.len() < current.len());
        assert!(should_replace(&current, &candidate));
    }

    #[test]
    fn test_invalid_candidate_never_wins() {
        let current = Chain::genesis();
        // Claims an enormous difficulty it cannot possibly satisfy, which
        // would dominate any weight comparison were it not invalid.
        let forged = Block::new(
            2,
            *genesis_block().get_hash(),
            now_secs(),
            Vec::new(),
            200,
            Vec::new(),
        );
        let candidate = current.extended_with(forged);

        assert!(candidate.cumulative_weight() > current.cumulative_weight());
        assert!(!should_replace(&current, &candidate));
    }

    #[test]
    fn test_empty_candidate_never_wins() {
        let current = Chain::genesis();
        assert!(!should_replace(&current, &Chain::from_blocks(Vec::new())));
    }
}
