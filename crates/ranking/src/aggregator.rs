use crate::report::OperatorAggregate;
use core_types::{Operator, Order};
use rust_decimal::Decimal;
use std::collections::HashMap;
use uuid::Uuid;

/// Groups orders by operator and sums them.
///
/// Every roster operator gets exactly one aggregate, in roster order, even with no
/// orders. Orders whose operator is not on the roster are dropped. Negative amounts
/// are treated as malformed and count as zero revenue (the order itself still counts).
/// A total that would overflow saturates at `Decimal::MAX`.
pub fn aggregate(orders: &[Order], operators: &[Operator]) -> Vec<OperatorAggregate> {
    let mut aggregates: Vec<OperatorAggregate> = Vec::with_capacity(operators.len());
    let mut index: HashMap<Uuid, usize> = HashMap::with_capacity(operators.len());

    for operator in operators {
        if index.contains_key(&operator.id) {
            continue;
        }
        index.insert(operator.id, aggregates.len());
        aggregates.push(OperatorAggregate::empty(operator.id, operator.name.clone()));
    }

    let mut dropped = 0usize;
    for order in orders {
        let Some(&slot) = index.get(&order.operator_id) else {
            dropped += 1;
            continue;
        };
        let entry = &mut aggregates[slot];
        let amount = sanitize_amount(order.revenue);
        entry.total_revenue = entry.total_revenue.checked_add(amount).unwrap_or_else(|| {
            tracing::warn!(order_id = order.id, %amount, "Revenue total overflowed; capped at the maximum.");
            Decimal::MAX
        });
        entry.order_count += 1;
    }

    if dropped > 0 {
        tracing::debug!(dropped, "Orders referencing operators outside the roster were ignored.");
    }

    aggregates
}

fn sanitize_amount(amount: Decimal) -> Decimal {
    if amount.is_sign_negative() {
        tracing::warn!(%amount, "Negative order amount treated as zero.");
        Decimal::ZERO
    } else {
        amount
    }
}
