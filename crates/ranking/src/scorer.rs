use crate::report::OperatorAggregate;
use core_types::{Metric, MetricName};
use rust_decimal::Decimal;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// The raw value a metric reads from an aggregate. No cross-operator scaling.
pub fn metric_value(name: MetricName, aggregate: &OperatorAggregate) -> Decimal {
    match name {
        MetricName::Revenue => aggregate.total_revenue,
        MetricName::OrderCount => Decimal::from(aggregate.order_count),
    }
}

/// The weight as a fraction. Weights outside 0-100 are malformed and contribute nothing.
fn weight_fraction(weight: Decimal) -> Decimal {
    if weight.is_sign_negative() || weight > HUNDRED {
        tracing::warn!(%weight, "Metric weight outside 0-100 treated as zero.");
        return Decimal::ZERO;
    }
    weight / HUNDRED
}

/// The weighted sum of an operator's metric values. Zero when no metrics are configured.
/// Saturates at `Decimal::MAX` instead of overflowing.
pub fn score(aggregate: &OperatorAggregate, metrics: &[Metric]) -> Decimal {
    metrics
        .iter()
        .map(|m| {
            metric_value(m.name, aggregate)
                .checked_mul(weight_fraction(m.weight))
                .unwrap_or(Decimal::MAX)
        })
        .fold(Decimal::ZERO, saturating_sum)
}

/// Sum of all configured weights.
pub fn weights_total(metrics: &[Metric]) -> Decimal {
    metrics.iter().map(|m| m.weight).fold(Decimal::ZERO, saturating_sum)
}

fn saturating_sum(total: Decimal, value: Decimal) -> Decimal {
    total.checked_add(value).unwrap_or_else(|| {
        tracing::warn!(%total, %value, "Score overflowed; capped at the maximum.");
        if value.is_sign_negative() { Decimal::MIN } else { Decimal::MAX }
    })
}

/// Whether the weights follow the sum-to-100 convention. Advisory only; scoring never
/// depends on it.
pub fn weights_balanced(metrics: &[Metric]) -> bool {
    weights_total(metrics) == HUNDRED
}
