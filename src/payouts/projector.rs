//! Field projection: one field's certainties, lowest first

use super::{CertaintyPair, CertaintyTable, PayoutError};

/// Collect every player's certainty for `field`, sorted ascending.
///
/// The sort is stable, so tied players keep table order. Tie order does not
/// matter downstream since ties are always processed as one group.
pub fn project_field(
    certainties: &CertaintyTable,
    field: &str,
) -> Result<Vec<CertaintyPair>, PayoutError> {
    let mut pairs = certainties
        .iter()
        .map(|(participant, model)| {
            model
                .get(field)
                .map(|&certainty| CertaintyPair::new(participant.as_str(), certainty))
                .ok_or_else(|| PayoutError::MissingFieldValue {
                    participant: participant.clone(),
                    field: field.to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    pairs.sort_by(|a, b| a.certainty.total_cmp(&b.certainty));

    Ok(pairs)
}
