use crate::report::{to_display, OperatorAggregate, RankedEntry, Standing};
use rust_decimal::Decimal;
use std::cmp::Ordering;
use uuid::Uuid;

/// Orders scored operators and numbers them 1..=N.
///
/// Ties on the exact score are broken by operator name (case-insensitive), then by
/// operator id, so the same input always yields the same positions.
pub fn assign_positions(mut scored: Vec<(OperatorAggregate, Decimal)>) -> Vec<RankedEntry> {
    scored.sort_by(|(a, score_a), (b, score_b)| {
        score_b
            .cmp(score_a)
            .then_with(|| compare_names(&a.operator_name, &b.operator_name))
            .then_with(|| a.operator_id.cmp(&b.operator_id))
    });

    scored
        .into_iter()
        .enumerate()
        .map(|(index, (aggregate, score))| RankedEntry {
            operator_id: aggregate.operator_id,
            operator_name: aggregate.operator_name,
            total_revenue: aggregate.total_revenue,
            order_count: aggregate.order_count,
            score: to_display(score),
            position: index + 1,
        })
        .collect()
}

fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}

/// Looks up an operator in a computed ranking.
pub fn find_position(entries: &[RankedEntry], operator_id: Uuid) -> Standing {
    entries
        .iter()
        .find(|e| e.operator_id == operator_id)
        .map(|e| Standing::Ranked { position: e.position, score: e.score })
        .unwrap_or(Standing::Unranked)
}
