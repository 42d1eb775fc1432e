/// Filtering, sorting and summary figures over a fetched transaction list.
use chrono::NaiveDate;
use ethers::types::U256;
use serde::Serialize;

use crate::display;
use crate::state::{PriceQuote, TransactionRecord};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
}

/// Client-side history filter. Every criterion is optional; an empty query
/// returns the list unchanged apart from sorting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionQuery {
    /// Case-insensitive substring over sender, receiver, message and keyword.
    pub search: Option<String>,
    /// Inclusive lower bound in wei.
    pub min_amount: Option<U256>,
    /// Inclusive upper bound in wei.
    pub max_amount: Option<U256>,
    /// First day included, UTC.
    pub date_start: Option<NaiveDate>,
    /// Last day included, UTC. The whole day counts.
    pub date_end: Option<NaiveDate>,
    pub sort: SortOrder,
}

impl TransactionQuery {
    pub fn is_empty(&self) -> bool {
        self.search.as_deref().map_or(true, |s| s.trim().is_empty())
            && self.min_amount.is_none()
            && self.max_amount.is_none()
            && self.date_start.is_none()
            && self.date_end.is_none()
    }

    pub fn matches(&self, record: &TransactionRecord) -> bool {
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let needle = search.to_lowercase();
            let hit = [&record.from, &record.to, &record.message, &record.keyword]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        if self.min_amount.is_some_and(|min| record.amount_wei < min) {
            return false;
        }
        if self.max_amount.is_some_and(|max| record.amount_wei > max) {
            return false;
        }
        let ts = i64::try_from(record.timestamp).unwrap_or(i64::MAX);
        if let Some(start) = self.date_start.and_then(day_start) {
            if ts < start {
                return false;
            }
        }
        if let Some(next_day) = self.date_end.and_then(|d| d.succ_opt()).and_then(day_start) {
            if ts >= next_day {
                return false;
            }
        }
        true
    }

    /// Filter and sort. Equal timestamps keep their input order.
    pub fn apply(&self, records: &[TransactionRecord]) -> Vec<TransactionRecord> {
        let mut result: Vec<TransactionRecord> =
            records.iter().filter(|r| self.matches(r)).cloned().collect();
        match self.sort {
            SortOrder::Newest => result.sort_by(|a, b| b.timestamp.cmp(&a.timestamp)),
            SortOrder::Oldest => result.sort_by(|a, b| a.timestamp.cmp(&b.timestamp)),
        }
        result
    }
}

fn day_start(date: NaiveDate) -> Option<i64> {
    date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp())
}

/// Sort descending by timestamp, stable for ties.
pub fn sort_newest_first(records: &mut [TransactionRecord]) {
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransactionStats {
    pub total_transactions: usize,
    /// ETH.
    pub total_volume: f64,
    pub total_volume_usd: f64,
    /// Records sent by the given account.
    pub sent: usize,
    /// Records received by the given account.
    pub received: usize,
    /// ETH per record; zero for an empty list.
    pub average_amount: f64,
}

impl TransactionStats {
    pub fn compute(
        records: &[TransactionRecord],
        account: Option<&str>,
        price: &PriceQuote,
    ) -> Self {
        let total_wei = records
            .iter()
            .fold(U256::zero(), |acc, r| acc.saturating_add(r.amount_wei));
        let total_volume = display::wei_to_eth_f64(total_wei);

        let (sent, received) = match account {
            Some(account) => (
                records
                    .iter()
                    .filter(|r| r.from.eq_ignore_ascii_case(account))
                    .count(),
                records
                    .iter()
                    .filter(|r| r.to.eq_ignore_ascii_case(account))
                    .count(),
            ),
            None => (0, 0),
        };

        let average_amount = if records.is_empty() {
            0.0
        } else {
            total_volume / records.len() as f64
        };

        Self {
            total_transactions: records.len(),
            total_volume,
            total_volume_usd: price.value_in_usd(total_volume),
            sent,
            received,
            average_amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ME: &str = "0xAaAaAaAaAaAaAaAaAaAaAaAaAaAaAaAaAaAaAaAa";
    const YOU: &str = "0xbBbBBBBbbBBBbbbBbbBbbbbBBbBbbbbBbBbbBBbB";

    fn eth(milli: u64) -> U256 {
        U256::from(milli) * U256::exp10(15)
    }

    fn record(from: &str, to: &str, milli_eth: u64, message: &str, keyword: &str, ts: u64) -> TransactionRecord {
        TransactionRecord {
            from: from.into(),
            to: to.into(),
            amount_wei: eth(milli_eth),
            message: message.into(),
            keyword: keyword.into(),
            timestamp: ts,
        }
    }

    fn sample() -> Vec<TransactionRecord> {
        vec![
            // 2024-01-01 10:00 UTC
            record(ME, YOU, 500, "Coffee beans", "coffee", 1_704_103_200),
            // 2024-01-02 23:30 UTC
            record(YOU, ME, 1_500, "Rent share", "rent", 1_704_238_200),
            // 2024-01-03 00:00 UTC
            record(ME, YOU, 100, "Pizza night", "food", 1_704_240_000),
        ]
    }

    #[test]
    fn empty_query_sorts_newest_first() {
        let query = TransactionQuery::default();
        assert!(query.is_empty());
        let ts: Vec<u64> = query.apply(&sample()).iter().map(|r| r.timestamp).collect();
        assert_eq!(ts, vec![1_704_240_000, 1_704_238_200, 1_704_103_200]);
    }

    #[test]
    fn oldest_first_sort() {
        let query = TransactionQuery {
            sort: SortOrder::Oldest,
            ..Default::default()
        };
        assert_eq!(query.apply(&sample())[0].keyword, "coffee");
    }

    #[test]
    fn search_is_case_insensitive_across_fields() {
        let query = TransactionQuery {
            search: Some("PIZZA".into()),
            ..Default::default()
        };
        let hits = query.apply(&sample());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].keyword, "food");

        let by_address = TransactionQuery {
            search: Some("0xbbbb".into()),
            ..Default::default()
        };
        assert_eq!(by_address.apply(&sample()).len(), 3);
    }

    #[test]
    fn amount_bounds_are_inclusive() {
        let query = TransactionQuery {
            min_amount: Some(eth(500)),
            max_amount: Some(eth(1_500)),
            ..Default::default()
        };
        let keywords: Vec<String> = query.apply(&sample()).into_iter().map(|r| r.keyword).collect();
        assert_eq!(keywords, vec!["rent", "coffee"]);
    }

    #[test]
    fn date_end_includes_whole_day() {
        let query = TransactionQuery {
            date_start: NaiveDate::from_ymd_opt(2024, 1, 2),
            date_end: NaiveDate::from_ymd_opt(2024, 1, 2),
            ..Default::default()
        };
        let hits = query.apply(&sample());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].keyword, "rent");
    }

    #[test]
    fn out_of_range_timestamp_is_after_every_date() {
        let far = record(ME, YOU, 1, "far future", "far", u64::MAX);
        let until = TransactionQuery {
            date_end: NaiveDate::from_ymd_opt(2024, 1, 3),
            ..Default::default()
        };
        assert!(!until.matches(&far));

        let since = TransactionQuery {
            date_start: NaiveDate::from_ymd_opt(2024, 1, 1),
            ..Default::default()
        };
        assert!(since.matches(&far));
    }

    #[test]
    fn ties_keep_input_order() {
        let mut records = vec![
            record(ME, YOU, 1, "first", "aa", 100),
            record(ME, YOU, 1, "second", "bb", 100),
            record(ME, YOU, 1, "newest", "cc", 200),
        ];
        sort_newest_first(&mut records);
        let order: Vec<&str> = records.iter().map(|r| r.message.as_str()).collect();
        assert_eq!(order, vec!["newest", "first", "second"]);
    }

    #[test]
    fn stats_for_account() {
        let price = PriceQuote { usd: 2000.0, change_24h: 0.0 };
        let stats = TransactionStats::compute(&sample(), Some(&ME.to_lowercase()), &price);
        assert_eq!(stats.total_transactions, 3);
        assert!((stats.total_volume - 2.1).abs() < 1e-9);
        assert!((stats.total_volume_usd - 4200.0).abs() < 1e-6);
        assert_eq!(stats.sent, 2);
        assert_eq!(stats.received, 1);
        assert!((stats.average_amount - 0.7).abs() < 1e-9);
    }

    #[test]
    fn stats_for_empty_list() {
        let stats = TransactionStats::compute(&[], None, &PriceQuote::default());
        assert_eq!(stats, TransactionStats::default());
    }
}
