use core_types::{Order, ReportingPeriod};
use ranking::{RankedEntry, Standing};
use serde::Serialize;

/// Everything the leaderboard screen shows for one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingView {
    pub period: ReportingPeriod,
    pub entries: Vec<RankedEntry>,
    /// The first three entries (fewer when the roster is smaller).
    pub podium: Vec<RankedEntry>,
    /// The caller's own standing. Admins are not on the roster and are `Unranked`.
    pub me: Standing,
}

pub const PODIUM_SIZE: usize = 3;

impl RankingView {
    pub fn new(period: ReportingPeriod, entries: Vec<RankedEntry>, me: Standing) -> Self {
        let podium = entries.iter().take(PODIUM_SIZE).cloned().collect();
        Self { period, entries, podium, me }
    }
}

/// An order as listed to users, with its owner's display name resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderListing {
    #[serde(flatten)]
    pub order: Order,
    pub operator_name: String,
}

impl OrderListing {
    /// Case-insensitive substring match on client code, product or operator name.
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        needle.is_empty()
            || [&self.order.client_code, &self.order.product, &self.operator_name]
                .iter()
                .any(|haystack| haystack.to_lowercase().contains(&needle))
    }
}

/// A rendered CSV export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    pub file_name: String,
    pub content: Vec<u8>,
    pub rows: usize,
}
