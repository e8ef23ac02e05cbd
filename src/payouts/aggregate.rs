//! Collapse contribution ledgers into payouts

use super::{ContributionLedger, PayoutTable};
use std::collections::BTreeMap;

/// Sum one player's contributions. Empty yields exactly `0.0`.
pub fn sum_contributions(entries: &[f64]) -> f64 {
    // fold from +0.0 so an empty ledger never comes out as -0.0
    entries.iter().fold(0.0, |acc, value| acc + value)
}

/// player -> payout for one field
pub fn collapse(ledger: &ContributionLedger) -> BTreeMap<String, f64> {
    ledger
        .iter()
        .map(|(participant, entries)| (participant.clone(), sum_contributions(entries)))
        .collect()
}

/// Re-key per-field results by player: player -> { field: payout }.
///
/// Every player in `participants` is present with every field, defaulting to
/// `0.0` where a field's result has no entry for them.
pub fn assemble<'a>(
    participants: impl IntoIterator<Item = &'a String>,
    per_field: &[(&str, BTreeMap<String, f64>)],
) -> PayoutTable {
    participants
        .into_iter()
        .map(|participant| {
            let personal = per_field
                .iter()
                .map(|(field, payouts)| {
                    let payout = payouts.get(participant).copied().unwrap_or(0.0);
                    (field.to_string(), payout)
                })
                .collect();
            (participant.clone(), personal)
        })
        .collect()
}
