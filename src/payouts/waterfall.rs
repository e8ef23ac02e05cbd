//! Reverse waterfall distribution for a single field
//!
//! Players are consumed from the least certain upward, one tie-group at a
//! time. Each player in the group is charged the shortfall of their own
//! certainty, moderated by the best certainty still in the pool, and that
//! loss is shared across the remaining pool in proportion to certainty.
//! The top tie-group is never charged: nobody is left above it to pay.

use super::{CertaintyPair, ContributionLedger, PayoutError};

/// One charged player and where their loss went
#[derive(Debug, Clone, PartialEq)]
pub struct Transfer {
    pub from: String,
    /// Loss charged to `from`, never positive
    pub paid_loss: f64,
    /// (receiver, portion) for every player still in the pool
    pub shares: Vec<(String, f64)>,
}

/// Raw loss of a prediction short of full certainty: zero at 100, `-stake` at 0
pub fn raw_loss(certainty: f64, stake: f64) -> f64 {
    stake * (certainty / 100.0) - stake
}

/// Loss moderation by the most certain player left in the pool
fn moderation(pool: &[CertaintyPair]) -> Option<f64> {
    pool.last().map(|best| best.certainty / 100.0)
}

/// Length of the leading run of exactly-equal certainties (at least 1 when non-empty)
pub fn tie_group_len(sorted: &[CertaintyPair]) -> usize {
    match sorted.first() {
        Some(head) => sorted
            .iter()
            .take_while(|pair| pair.certainty == head.certainty)
            .count(),
        None => 0,
    }
}

/// Walk the sorted pairs and record every transfer, in the order they happen.
pub fn transfers(
    sorted: &[CertaintyPair],
    stake: f64,
    field: &str,
) -> Result<Vec<Transfer>, PayoutError> {
    let mut out = Vec::new();
    let mut remaining = sorted;

    while !remaining.is_empty() {
        let (group, rest) = remaining.split_at(tie_group_len(remaining));
        remaining = rest;

        let Some(modifier) = moderation(remaining) else {
            break;
        };

        let pool_sum: f64 = remaining.iter().map(|pair| pair.certainty).sum();
        if pool_sum == 0.0 {
            return Err(PayoutError::DegeneratePool {
                field: field.to_string(),
            });
        }

        for current in group {
            let paid_loss = raw_loss(current.certainty, stake) * modifier;
            let payout = paid_loss.abs();

            let shares = remaining
                .iter()
                .map(|next| (next.participant.clone(), payout * (next.certainty / pool_sum)))
                .collect();

            out.push(Transfer {
                from: current.participant.clone(),
                paid_loss,
                shares,
            });
        }
    }

    Ok(out)
}

/// Build the contribution ledger for one field.
///
/// Every player in `sorted` gets an entry, empty if nothing touched them.
pub fn distribute(
    sorted: &[CertaintyPair],
    stake: f64,
    field: &str,
) -> Result<ContributionLedger, PayoutError> {
    let mut ledger: ContributionLedger = sorted
        .iter()
        .map(|pair| (pair.participant.clone(), Vec::new()))
        .collect();

    for transfer in transfers(sorted, stake, field)? {
        ledger
            .entry(transfer.from)
            .or_default()
            .push(transfer.paid_loss);
        for (receiver, portion) in transfer.shares {
            ledger.entry(receiver).or_default().push(portion);
        }
    }

    Ok(ledger)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn pairs(rows: &[(&str, f64)]) -> Vec<CertaintyPair> {
        rows.iter().map(|(n, c)| CertaintyPair::new(*n, *c)).collect()
    }

    #[test]
    fn test_raw_loss() {
        assert_eq!(raw_loss(100.0, 100.0), 0.0);
        assert_eq!(raw_loss(50.0, 100.0), -50.0);
        assert_eq!(raw_loss(0.0, 40.0), -40.0);
    }

    #[test]
    fn test_tie_group_len() {
        assert_eq!(tie_group_len(&[]), 0);
        assert_eq!(tie_group_len(&pairs(&[("a", 5.0)])), 1);
        assert_eq!(tie_group_len(&pairs(&[("a", 5.0), ("b", 6.0)])), 1);
        assert_eq!(
            tie_group_len(&pairs(&[("a", 5.0), ("b", 5.0), ("c", 5.0), ("d", 7.0)])),
            3
        );
        assert_eq!(tie_group_len(&pairs(&[("a", 5.0), ("b", 5.0)])), 2);
    }

    #[test]
    fn test_two_player_ledger() {
        let sorted = pairs(&[("Alice", 50.0), ("Bob", 100.0)]);

        let ledger = distribute(&sorted, 100.0, "win").unwrap();

        assert_eq!(ledger["Alice"], vec![-50.0]);
        assert_eq!(ledger["Bob"], vec![50.0]);
    }

    #[test]
    fn test_three_player_ledger() {
        let sorted = pairs(&[("A", 0.0), ("B", 50.0), ("C", 100.0)]);

        let ledger = distribute(&sorted, 100.0, "win").unwrap();

        assert_eq!(ledger["A"], vec![-100.0]);
        assert_eq!(ledger["B"].len(), 2);
        assert!((ledger["B"][0] - 100.0 / 3.0).abs() < EPS);
        assert_eq!(ledger["B"][1], -50.0);
        assert_eq!(ledger["C"].len(), 2);
        assert!((ledger["C"][0] - 200.0 / 3.0).abs() < EPS);
        assert_eq!(ledger["C"][1], 50.0);
    }

    #[test]
    fn test_loss_is_moderated_by_best_remaining() {
        let sorted = pairs(&[("low", 20.0), ("high", 40.0)]);

        let ledger = distribute(&sorted, 100.0, "win").unwrap();

        // -80 scaled by 40/100
        assert!((ledger["low"][0] + 32.0).abs() < EPS);
        assert!((ledger["high"][0] - 32.0).abs() < EPS);
    }

    #[test]
    fn test_top_group_is_never_charged() {
        let sorted = pairs(&[("a", 10.0), ("b", 70.0), ("c", 70.0)]);

        let moves = transfers(&sorted, 100.0, "win").unwrap();

        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].from, "a");
        assert_eq!(moves[0].shares.len(), 2);
        assert!((moves[0].shares[0].1 - moves[0].shares[1].1).abs() < EPS);
    }

    #[test]
    fn test_whole_tie_group_is_charged_against_same_pool() {
        let sorted = pairs(&[("a", 10.0), ("b", 10.0), ("c", 30.0), ("d", 60.0)]);

        let moves = transfers(&sorted, 100.0, "win").unwrap();
        let charged: Vec<&str> = moves.iter().map(|t| t.from.as_str()).collect();

        assert_eq!(charged, vec!["a", "b", "c"]);
        assert_eq!(moves[0].paid_loss, moves[1].paid_loss);
        assert_eq!(moves[0].shares, moves[1].shares);
        // c only shares with d once a and b are gone
        assert_eq!(moves[2].shares.len(), 1);
        assert_eq!(moves[2].shares[0].0, "d");
    }

    #[test]
    fn test_each_transfer_conserves_value() {
        let sorted = pairs(&[
            ("a", 0.0),
            ("b", 12.5),
            ("c", 12.5),
            ("d", 33.0),
            ("e", 61.0),
            ("f", 61.0),
            ("g", 97.0),
        ]);

        let moves = transfers(&sorted, 250.0, "win").unwrap();
        assert!(!moves.is_empty());

        for t in &moves {
            assert!(t.paid_loss <= 0.0);
            let given: f64 = t.shares.iter().map(|(_, portion)| portion).sum();
            assert!((given - t.paid_loss.abs()).abs() < 1e-9);
        }

        let ledger = distribute(&sorted, 250.0, "win").unwrap();
        let total: f64 = ledger.values().flatten().sum();
        assert!(total.abs() < 1e-9);
    }

    #[test]
    fn test_single_and_uniform_fields_are_empty() {
        let ledger = distribute(&pairs(&[("solo", 30.0)]), 100.0, "win").unwrap();
        assert_eq!(ledger.len(), 1);
        assert!(ledger["solo"].is_empty());

        let ledger =
            distribute(&pairs(&[("a", 0.0), ("b", 0.0), ("c", 0.0)]), 100.0, "win").unwrap();
        assert_eq!(ledger.len(), 3);
        assert!(ledger.values().all(|entries| entries.is_empty()));
    }

    #[test]
    fn test_zero_pool_is_rejected() {
        // Only reachable with certainties below the expected 0-100 domain
        let sorted = pairs(&[("neg", -10.0), ("a", 0.0), ("b", 0.0)]);

        let err = distribute(&sorted, 100.0, "win").unwrap_err();
        assert_eq!(
            err,
            PayoutError::DegeneratePool {
                field: "win".to_string()
            }
        );
    }
}
