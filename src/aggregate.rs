//! Group aggregation of contingency table pairs
//!
//! True mode sums each system's tables as-is. Permuted mode flips one fair
//! coin per pair and, on tails, swaps which table feeds which system for
//! that pair only (paired permutation under the exchangeability null).
//! Sums are checked: a count that overflows `u64` is a fatal
//! [`Error::CountOverflow`].

use crate::contingency::{ContingencyTable, ContingencyTablePair, SystemMode};
use crate::error::{Error, Result};
use rand::Rng;

fn accumulate(acc: &mut ContingencyTable, table: &ContingencyTable, valid_time: i64) -> Result<()> {
    *acc = acc
        .checked_add(table)
        .ok_or(Error::CountOverflow { valid_time })?;
    Ok(())
}

/// Sum every pair's tables into one overall pair (no permutation)
pub fn aggregate_true(
    pairs: &[ContingencyTablePair],
    mode: SystemMode,
) -> Result<ContingencyTablePair> {
    let mut overall = ContingencyTablePair::default();
    for pair in pairs {
        for system in 0..mode.systems() {
            accumulate(&mut overall.tables[system], &pair.tables[system], pair.valid_time)?;
        }
    }
    Ok(overall)
}

/// Sum every pair's tables with an independent per-pair label swap
///
/// Single-system runs have nothing to exchange, so they aggregate as in
/// true mode without consuming randomness.
pub fn aggregate_permuted<R: Rng + ?Sized>(
    pairs: &[ContingencyTablePair],
    mode: SystemMode,
    rng: &mut R,
) -> Result<ContingencyTablePair> {
    if mode == SystemMode::Single {
        return aggregate_true(pairs, mode);
    }

    let mut overall = ContingencyTablePair::default();
    let mut swapped = 0usize;
    for pair in pairs {
        let (first, second) = if rng.gen_bool(0.5) {
            (&pair.tables[0], &pair.tables[1])
        } else {
            swapped += 1;
            (&pair.tables[1], &pair.tables[0])
        };
        accumulate(&mut overall.tables[0], first, pair.valid_time)?;
        accumulate(&mut overall.tables[1], second, pair.valid_time)?;
    }

    tracing::trace!(
        swapped,
        pairs = pairs.len(),
        overall = %overall,
        "permuted aggregate"
    );
    Ok(overall)
}

/// Combined table over both systems, used to check count conservation
pub fn combined(pair: &ContingencyTablePair) -> Result<ContingencyTable> {
    let mut sum = pair.tables[0];
    accumulate(&mut sum, &pair.tables[1], pair.valid_time)?;
    Ok(sum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sample_pairs() -> Vec<ContingencyTablePair> {
        vec![
            ContingencyTablePair::paired(
                1,
                ContingencyTable::new(8, 2, 1, 9),
                ContingencyTable::new(1, 0, 0, 0),
            ),
            ContingencyTablePair::paired(
                2,
                ContingencyTable::new(7, 3, 2, 8),
                ContingencyTable::new(0, 2, 0, 0),
            ),
            ContingencyTablePair::paired(
                3,
                ContingencyTable::new(9, 1, 0, 10),
                ContingencyTable::new(0, 0, 3, 0),
            ),
        ]
    }

    #[test]
    fn test_true_aggregate_sums_fields() {
        let overall = aggregate_true(&sample_pairs(), SystemMode::Paired).unwrap();
        assert_eq!(overall.tables[0], ContingencyTable::new(24, 6, 3, 27));
        assert_eq!(overall.tables[1], ContingencyTable::new(1, 2, 3, 0));
    }

    #[test]
    fn test_true_aggregate_single_ignores_second_table() {
        let overall = aggregate_true(&sample_pairs(), SystemMode::Single).unwrap();
        assert_eq!(overall.tables[0], ContingencyTable::new(24, 6, 3, 27));
        assert_eq!(overall.tables[1], ContingencyTable::default());
    }

    #[test]
    fn test_true_aggregate_empty() {
        let overall = aggregate_true(&[], SystemMode::Paired).unwrap();
        assert_eq!(overall, ContingencyTablePair::default());
    }

    #[test]
    fn test_permuted_all_heads_matches_true() {
        // StepRng yielding 0 always lands below the 0.5 threshold
        let mut rng = StepRng::new(0, 0);
        let pairs = sample_pairs();
        let permuted = aggregate_permuted(&pairs, SystemMode::Paired, &mut rng).unwrap();
        assert_eq!(permuted, aggregate_true(&pairs, SystemMode::Paired).unwrap());
    }

    #[test]
    fn test_permuted_all_tails_swaps_systems() {
        let mut rng = StepRng::new(u64::MAX, 0);
        let pairs = sample_pairs();
        let permuted = aggregate_permuted(&pairs, SystemMode::Paired, &mut rng).unwrap();
        let truth = aggregate_true(&pairs, SystemMode::Paired).unwrap();
        assert_eq!(permuted.tables[0], truth.tables[1]);
        assert_eq!(permuted.tables[1], truth.tables[0]);
    }

    #[test]
    fn test_permuted_preserves_combined_counts() {
        let mut rng = StdRng::seed_from_u64(7);
        let pairs = sample_pairs();
        let truth = aggregate_true(&pairs, SystemMode::Paired).unwrap();
        for _ in 0..50 {
            let permuted = aggregate_permuted(&pairs, SystemMode::Paired, &mut rng).unwrap();
            assert_eq!(combined(&permuted).unwrap(), combined(&truth).unwrap());
        }
    }

    #[test]
    fn test_permuted_draws_vary_between_calls() {
        let mut rng = StdRng::seed_from_u64(42);
        let pairs: Vec<_> = (0..32)
            .map(|i| {
                ContingencyTablePair::paired(
                    i,
                    ContingencyTable::new(1, 0, 0, 0),
                    ContingencyTable::new(0, 1, 0, 0),
                )
            })
            .collect();
        let outcomes: Vec<u64> = (0..20)
            .map(|_| {
                aggregate_permuted(&pairs, SystemMode::Paired, &mut rng)
                    .unwrap()
                    .tables[0]
                    .hits
            })
            .collect();
        assert!(outcomes.iter().any(|&h| h != outcomes[0]));
    }

    #[test]
    fn test_permuted_single_mode_is_true_mode() {
        let mut rng = StepRng::new(u64::MAX, 0);
        let pairs = sample_pairs();
        assert_eq!(
            aggregate_permuted(&pairs, SystemMode::Single, &mut rng).unwrap(),
            aggregate_true(&pairs, SystemMode::Single).unwrap()
        );
    }

    #[test]
    fn test_true_aggregate_overflow_is_an_error() {
        let max = i64::MAX as u64;
        let pairs: Vec<_> = (1..=3)
            .map(|i| {
                ContingencyTablePair::paired(
                    i,
                    ContingencyTable::new(max, 0, 0, 0),
                    ContingencyTable::new(1, 0, 0, 0),
                )
            })
            .collect();

        // two maximal counts still fit in u64; the third does not
        assert!(aggregate_true(&pairs[..2], SystemMode::Paired).is_ok());
        assert!(matches!(
            aggregate_true(&pairs, SystemMode::Paired),
            Err(Error::CountOverflow { valid_time: 3 })
        ));
    }

    #[test]
    fn test_permuted_overflow_is_an_error() {
        // each system's true sum fits, but swapping pair 2 puts both large
        // counts into system 0
        let pairs = vec![
            ContingencyTablePair::paired(
                1,
                ContingencyTable::new(u64::MAX, 0, 0, 0),
                ContingencyTable::default(),
            ),
            ContingencyTablePair::paired(
                2,
                ContingencyTable::default(),
                ContingencyTable::new(1, 0, 0, 0),
            ),
        ];
        assert!(aggregate_true(&pairs, SystemMode::Paired).is_ok());

        let mut rng = StepRng::new(u64::MAX, 0);
        let swap_all = aggregate_permuted(&pairs, SystemMode::Paired, &mut rng).unwrap();
        assert_eq!(swap_all.tables[1].hits, u64::MAX);

        // heads for pair 1, tails for pair 2
        let mut rng = StepRng::new(0, u64::MAX);
        assert!(matches!(
            aggregate_permuted(&pairs, SystemMode::Paired, &mut rng),
            Err(Error::CountOverflow { valid_time: 2 })
        ));
    }
}
