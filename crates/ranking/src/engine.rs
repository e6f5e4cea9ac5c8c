use crate::aggregator::aggregate;
use crate::assigner::assign_positions;
use crate::report::RankedEntry;
use crate::scorer::{score, weights_balanced, weights_total};
use core_types::{Metric, Operator, Order, ReportingPeriod};

/// A stateless calculator for the operator leaderboard.
#[derive(Debug, Default, Clone, Copy)]
pub struct RankingEngine {}

impl RankingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// The main entry point for computing a ranking.
    ///
    /// # Arguments
    ///
    /// * `orders` - The orders in scope, already restricted to the period of interest.
    /// * `metrics` - The configured metrics and weights.
    /// * `operators` - The roster. Every operator appears in the output, even with no orders.
    ///
    /// # Returns
    ///
    /// The leaderboard, best score first, positions `1..=operators.len()`.
    pub fn compute(&self, orders: &[Order], metrics: &[Metric], operators: &[Operator]) -> Vec<RankedEntry> {
        if !metrics.is_empty() && !weights_balanced(metrics) {
            tracing::warn!(total = %weights_total(metrics), "Metric weights do not sum to 100.");
        }

        let scored = aggregate(orders, operators)
            .into_iter()
            .map(|agg| {
                let s = score(&agg, metrics);
                (agg, s)
            })
            .collect();

        let ranking = assign_positions(scored);
        tracing::debug!(operators = ranking.len(), orders = orders.len(), "Ranking computed.");
        ranking
    }

    /// Restricts `orders` to `period` before computing.
    pub fn compute_for_period(
        &self,
        period: ReportingPeriod,
        orders: &[Order],
        metrics: &[Metric],
        operators: &[Operator],
    ) -> Vec<RankedEntry> {
        let in_period: Vec<Order> = orders
            .iter()
            .filter(|o| period.contains(&o.created_at))
            .cloned()
            .collect();
        self.compute(&in_period, metrics, operators)
    }
}
