//! Payout Engine
//! Mission: Move the implied risk of unsure players onto the sure ones
//! Philosophy: Every unit lost at the bottom of the waterfall lands on someone above it
//!
//! Pipeline per outcome field:
//! - `projector`: pull each player's certainty for the field, sort ascending
//! - `waterfall`: walk tie-groups from the bottom, charging losses and sharing them upward
//! - `aggregate`: collapse each player's contributions into one payout
//!
//! Fields never interact, so they are computed in parallel with rayon.

pub mod aggregate;
pub mod projector;
pub mod waterfall;

use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// player -> { field: certainty (0-100), ... }
pub type CertaintyTable = BTreeMap<String, BTreeMap<String, f64>>;

/// player -> { field: payout, ... }
pub type PayoutTable = BTreeMap<String, BTreeMap<String, f64>>;

/// player -> signed contributions for a single field, in the order they were realized
pub type ContributionLedger = HashMap<String, Vec<f64>>;

/// One player's certainty for the field currently being processed
#[derive(Debug, Clone, PartialEq)]
pub struct CertaintyPair {
    pub participant: String,
    pub certainty: f64,
}

impl CertaintyPair {
    pub fn new(participant: impl Into<String>, certainty: f64) -> Self {
        Self {
            participant: participant.into(),
            certainty,
        }
    }
}

/// Payout engine errors
#[derive(Debug, Clone, PartialEq)]
pub enum PayoutError {
    /// A player's model has no value for a requested field
    MissingFieldValue { participant: String, field: String },
    /// Remaining pool has zero total certainty, so shares cannot be weighted
    DegeneratePool { field: String },
    /// Stake is negative or not a finite number
    InvalidStake(f64),
}

impl PayoutError {
    pub fn kind(&self) -> &'static str {
        match self {
            PayoutError::MissingFieldValue { .. } => "missing_field_value",
            PayoutError::DegeneratePool { .. } => "degenerate_pool",
            PayoutError::InvalidStake(_) => "invalid_stake",
        }
    }
}

impl std::fmt::Display for PayoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayoutError::MissingFieldValue { participant, field } => {
                write!(f, "{} has no certainty for field '{}'", participant, field)
            }
            PayoutError::DegeneratePool { field } => write!(
                f,
                "remaining pool for field '{}' has zero total certainty",
                field
            ),
            PayoutError::InvalidStake(stake) => {
                write!(f, "stake must be a non-negative number, got {}", stake)
            }
        }
    }
}

impl std::error::Error for PayoutError {}

/// Calculate every player's payout on every field.
///
/// # Arguments
/// * `certainties` - Each player's certainty per field; every player must carry every field
/// * `fields` - Fields to process, each independently
/// * `stake` - Amount at risk, shared by all players and fields
///
/// # Returns
/// A table holding every player in `certainties`, with one payout per field.
/// Nothing is returned on error.
pub fn compute_payouts(
    certainties: &CertaintyTable,
    fields: &[String],
    stake: f64,
) -> Result<PayoutTable, PayoutError> {
    if !(stake.is_finite() && stake >= 0.0) {
        return Err(PayoutError::InvalidStake(stake));
    }

    debug!(
        players = certainties.len(),
        fields = fields.len(),
        stake,
        "computing payouts"
    );

    let per_field = fields
        .par_iter()
        .map(|field| {
            field_payouts(certainties, field, stake).map(|payouts| (field.as_str(), payouts))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(aggregate::assemble(certainties.keys(), &per_field))
}

/// Run the full pipeline for one field: player -> payout
pub fn field_payouts(
    certainties: &CertaintyTable,
    field: &str,
    stake: f64,
) -> Result<BTreeMap<String, f64>, PayoutError> {
    let pairs = projector::project_field(certainties, field)?;
    let ledger = waterfall::distribute(&pairs, stake, field)?;
    Ok(aggregate::collapse(&ledger))
}
