use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One operator's totals for a ranking period. Rebuilt from scratch on every computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorAggregate {
    pub operator_id: Uuid,
    pub operator_name: String,
    pub total_revenue: Decimal,
    pub order_count: u64,
}

impl OperatorAggregate {
    /// A zeroed-out aggregate, for an operator with no orders in scope.
    pub fn empty(operator_id: Uuid, operator_name: impl Into<String>) -> Self {
        Self {
            operator_id,
            operator_name: operator_name.into(),
            total_revenue: Decimal::ZERO,
            order_count: 0,
        }
    }
}

/// A line of the leaderboard.
///
/// `score` is already rounded for display (two decimal places); the ordering was
/// decided on the unrounded value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedEntry {
    pub operator_id: Uuid,
    pub operator_name: String,
    pub total_revenue: Decimal,
    pub order_count: u64,
    pub score: Decimal,
    pub position: usize,
}

/// Where an operator stands in a computed ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum Standing {
    Ranked { position: usize, score: Decimal },
    Unranked,
}

impl Standing {
    pub fn position(&self) -> Option<usize> {
        match self {
            Standing::Ranked { position, .. } => Some(*position),
            Standing::Unranked => None,
        }
    }

    /// The operator's score; an unranked operator scores zero.
    pub fn score(&self) -> Decimal {
        match self {
            Standing::Ranked { score, .. } => *score,
            Standing::Unranked => to_display(Decimal::ZERO),
        }
    }
}

/// Rounds half away from zero and pins the scale to exactly two decimal places,
/// so `2000` renders as `2000.00`.
pub fn to_display(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}
