//! # Salesboard Ranking Engine
//!
//! The monthly operator leaderboard: orders are grouped per operator, each operator's
//! totals are turned into a weighted score, and the scored operators are ordered and
//! given positions.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** This is a pure logic crate. It has no knowledge of the hosted
//!   platform or of HTTP. It depends only on `core-types` (Layer 0).
//! - **Stateless Calculation:** `RankingEngine` takes an immutable snapshot of orders,
//!   metrics and the operator roster and returns a fresh ranking. Nothing is cached
//!   between calls, so redundant or superseded computations are harmless.
//!
//! ## Public API
//!
//! - `RankingEngine`: `compute` and `compute_for_period`.
//! - `find_position`: looks up an operator's `Standing` in a computed ranking.
//! - `OperatorAggregate`, `RankedEntry`, `Standing`: the data flowing through the pipeline.

pub mod aggregator;
pub mod assigner;
pub mod engine;
pub mod report;
pub mod scorer;

pub use assigner::find_position;
pub use engine::RankingEngine;
pub use report::{OperatorAggregate, RankedEntry, Standing};
pub use scorer::{weights_balanced, weights_total};
