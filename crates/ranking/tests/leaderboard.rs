use chrono::{TimeZone, Utc};
use core_types::{Metric, MetricName, Operator, Order, ReportingPeriod};
use proptest::prelude::*;
use ranking::{find_position, RankingEngine, Standing};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

fn operator(n: u128, name: &str) -> Operator {
    Operator { id: Uuid::from_u128(n), name: name.into() }
}

fn order(id: i64, operator: u128, revenue: Decimal) -> Order {
    Order {
        id,
        operator_id: Uuid::from_u128(operator),
        client_code: format!("CLI-{id}"),
        product: "Fundo".into(),
        volume: revenue * dec!(10),
        revenue,
        created_at: Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap(),
    }
}

fn metric(id: i64, name: MetricName, weight: Decimal) -> Metric {
    Metric { id, name, weight }
}

fn sample_orders() -> Vec<Order> {
    vec![order(1, 1, dec!(1000)), order(2, 1, dec!(500)), order(3, 2, dec!(2000))]
}

fn roster() -> Vec<Operator> {
    vec![operator(1, "Ana"), operator(2, "Bruno")]
}

#[test]
fn revenue_only_ranking() {
    let metrics = [metric(1, MetricName::Revenue, dec!(100))];
    let ranking = RankingEngine::new().compute(&sample_orders(), &metrics, &roster());

    assert_eq!(ranking[0].operator_id, Uuid::from_u128(2));
    assert_eq!(ranking[0].position, 1);
    assert_eq!(ranking[0].score.to_string(), "2000.00");
    assert_eq!(ranking[1].operator_id, Uuid::from_u128(1));
    assert_eq!(ranking[1].position, 2);
    assert_eq!(ranking[1].score.to_string(), "1500.00");
}

#[test]
fn split_revenue_and_order_count() {
    let metrics = [
        metric(1, MetricName::Revenue, dec!(50)),
        metric(2, MetricName::OrderCount, dec!(50)),
    ];
    let ranking = RankingEngine::new().compute(&sample_orders(), &metrics, &roster());

    assert_eq!(ranking[0].operator_id, Uuid::from_u128(2));
    assert_eq!(ranking[0].score.to_string(), "1000.50");
    assert_eq!(ranking[1].order_count, 2);
    assert_eq!(ranking[1].score.to_string(), "751.00");
}

#[test]
fn no_metrics_ties_at_zero_and_falls_back_to_name() {
    let ranking = RankingEngine::new().compute(&sample_orders(), &[], &roster());

    assert!(ranking.iter().all(|e| e.score.to_string() == "0.00"));
    let names: Vec<_> = ranking.iter().map(|e| e.operator_name.as_str()).collect();
    assert_eq!(names, vec!["Ana", "Bruno"]);
}

#[test]
fn idle_operator_is_listed_last() {
    let metrics = [metric(1, MetricName::Revenue, dec!(100))];
    let mut operators = roster();
    operators.push(operator(3, "Caio"));

    let ranking = RankingEngine::new().compute(&sample_orders(), &metrics, &operators);

    let last = ranking.last().unwrap();
    assert_eq!(last.operator_id, Uuid::from_u128(3));
    assert_eq!(last.position, 3);
    assert_eq!(last.total_revenue, Decimal::ZERO);
    assert_eq!(last.order_count, 0);
    assert_eq!(last.score.to_string(), "0.00");
}

#[test]
fn empty_inputs_give_empty_ranking() {
    assert!(RankingEngine::new().compute(&[], &[], &[]).is_empty());
}

#[test]
fn period_filter_excludes_other_months() {
    let metrics = [metric(1, MetricName::Revenue, dec!(100))];
    let mut orders = sample_orders();
    let mut april = order(4, 1, dec!(99999));
    april.created_at = Utc.with_ymd_and_hms(2024, 4, 30, 23, 0, 0).unwrap();
    orders.push(april);

    let may = ReportingPeriod::new(2024, 5).unwrap();
    let ranking = RankingEngine::new().compute_for_period(may, &orders, &metrics, &roster());

    assert_eq!(ranking[0].operator_id, Uuid::from_u128(2));
    assert_eq!(ranking[1].total_revenue, dec!(1500));
}

#[test]
fn current_operator_standing() {
    let metrics = [metric(1, MetricName::Revenue, dec!(100))];
    let ranking = RankingEngine::new().compute(&sample_orders(), &metrics, &roster());

    assert_eq!(
        find_position(&ranking, Uuid::from_u128(1)),
        Standing::Ranked { position: 2, score: dec!(1500.00) }
    );
    let outsider = find_position(&ranking, Uuid::from_u128(42));
    assert_eq!(outsider, Standing::Unranked);
    assert_eq!(outsider.score().to_string(), "0.00");
}

#[test]
fn oversized_revenues_do_not_break_the_ranking() {
    let huge = Decimal::MAX / dec!(2) + dec!(1);
    let mut orders = sample_orders();
    for id in [10, 11] {
        let mut oversized = order(id, 1, dec!(0));
        oversized.revenue = huge;
        orders.push(oversized);
    }
    let metrics = [metric(1, MetricName::Revenue, dec!(100))];

    let ranking = RankingEngine::new().compute(&orders, &metrics, &roster());

    assert_eq!(ranking.len(), 2);
    assert_eq!(ranking[0].operator_id, Uuid::from_u128(1));
    assert_eq!(ranking[0].total_revenue, Decimal::MAX);
    assert_eq!(ranking[1].total_revenue, dec!(2000));
}

fn arb_orders(operators: u128) -> impl Strategy<Value = Vec<Order>> {
    prop::collection::vec((1..=operators, 0u64..1_000_000u64), 0..40).prop_map(|raw| {
        raw.into_iter()
            .enumerate()
            .map(|(i, (op, cents))| order(i as i64, op, Decimal::new(cents as i64, 2)))
            .collect()
    })
}

fn arb_weight() -> impl Strategy<Value = Decimal> {
    (0u32..=100u32).prop_map(Decimal::from)
}

fn five_operators() -> Vec<Operator> {
    (1..=5u128).map(|n| operator(n, &format!("Operador {n}"))).collect()
}

proptest! {
    #[test]
    fn order_counts_add_up(orders in arb_orders(5), w1 in arb_weight(), w2 in arb_weight()) {
        let metrics = [metric(1, MetricName::Revenue, w1), metric(2, MetricName::OrderCount, w2)];
        let ranking = RankingEngine::new().compute(&orders, &metrics, &five_operators());
        let counted: u64 = ranking.iter().map(|e| e.order_count).sum();
        prop_assert_eq!(counted, orders.len() as u64);
    }

    #[test]
    fn positions_are_dense(orders in arb_orders(5), w in arb_weight()) {
        let metrics = [metric(1, MetricName::Revenue, w)];
        let ranking = RankingEngine::new().compute(&orders, &metrics, &five_operators());
        let positions: Vec<usize> = ranking.iter().map(|e| e.position).collect();
        prop_assert_eq!(positions, (1..=5).collect::<Vec<_>>());
    }

    #[test]
    fn compute_is_idempotent(orders in arb_orders(5), w1 in arb_weight(), w2 in arb_weight()) {
        let metrics = [metric(1, MetricName::Revenue, w1), metric(2, MetricName::OrderCount, w2)];
        let engine = RankingEngine::new();
        let first = engine.compute(&orders, &metrics, &five_operators());
        let second = engine.compute(&orders, &metrics, &five_operators());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn reweighting_keeps_twins_in_order(revenue in 0u64..100_000u64, count in 0usize..5, w1 in arb_weight(), w2 in arb_weight()) {
        // Operators 1 and 2 are identical on every metric; 3 sells more.
        let mut orders = Vec::new();
        for twin in [1u128, 2] {
            for i in 0..count {
                orders.push(order((twin as i64) * 100 + i as i64, twin, Decimal::from(revenue)));
            }
        }
        orders.push(order(999, 3, dec!(123456)));
        let operators = vec![operator(2, "Twin B"), operator(1, "Twin A"), operator(3, "Other")];

        let before = RankingEngine::new().compute(&orders, &[metric(1, MetricName::Revenue, w1)], &operators);
        let after = RankingEngine::new().compute(&orders, &[metric(1, MetricName::Revenue, w2)], &operators);

        let twins = |r: &[ranking::RankedEntry]| -> Vec<Uuid> {
            r.iter().filter(|e| e.operator_id != Uuid::from_u128(3)).map(|e| e.operator_id).collect()
        };
        prop_assert_eq!(twins(&before), twins(&after));
    }
}
