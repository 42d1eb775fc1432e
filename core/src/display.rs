/// Output formatting: ETH denomination conversion and display helpers.
///
/// ETH uses 18 decimal places (wei). 1 ETH = 10^18 wei.
use chrono::DateTime;
use ethers::types::U256;
use num_format::{Locale, ToFormattedString};

use crate::history::TransactionStats;
use crate::network::MarketData;
use crate::state::{PriceQuote, TransactionRecord};

pub const ETH_DECIMALS: usize = 18;
const WEI_PER_ETH: u128 = 1_000_000_000_000_000_000;

/// Convert wei to a decimal ETH string without trailing zeros.
/// Examples: 1_500_000_000_000_000_000 -> "1.5", 0 -> "0"
#[must_use]
pub fn wei_to_eth(wei: U256) -> String {
    let unit = U256::from(WEI_PER_ETH);
    let whole = wei / unit;
    let frac = wei % unit;
    if frac.is_zero() {
        return whole.to_string();
    }
    let frac = format!("{:0>width$}", frac.to_string(), width = ETH_DECIMALS);
    format!("{whole}.{}", frac.trim_end_matches('0'))
}

/// Lossy conversion for arithmetic on display values (sums, averages).
#[must_use]
pub fn wei_to_eth_f64(wei: U256) -> f64 {
    wei_to_eth(wei).parse().unwrap_or(0.0)
}

/// Parse a human-readable ETH amount string into wei.
/// Accepts: "1.5" -> 1.5e18, "1" -> 1e18, "0.0001" -> 1e14
#[must_use = "parsing result should be checked"]
pub fn parse_eth_amount(input: &str) -> Result<U256, String> {
    let input = input.trim();

    if input.is_empty() {
        return Err("Amount cannot be empty".to_string());
    }

    if input.starts_with('-') {
        return Err("Amount must be positive".to_string());
    }

    let parts: Vec<&str> = input.split('.').collect();
    if parts.len() > 2 {
        return Err("Invalid amount format. Use ETH units like '1.5' or '0.001'.".to_string());
    }

    let whole_str = if parts[0].is_empty() { "0" } else { parts[0] };
    if !whole_str.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("Invalid whole part: '{}'", parts[0]));
    }
    let whole = U256::from_dec_str(whole_str).map_err(|_| "Amount too large".to_string())?;

    let frac_wei = match parts.get(1) {
        // Trailing dot: "1." is treated as "1.0"
        Some(frac_str) if frac_str.is_empty() => U256::zero(),
        Some(frac_str) => {
            if frac_str.len() > ETH_DECIMALS {
                return Err("Too many decimal places. ETH supports up to 18.".to_string());
            }
            if !frac_str.chars().all(|c| c.is_ascii_digit()) {
                return Err(format!("Invalid fractional part: '{frac_str}'"));
            }
            let padded = format!("{:0<width$}", frac_str, width = ETH_DECIMALS);
            U256::from_dec_str(&padded)
                .map_err(|_| format!("Invalid fractional part: '{frac_str}'"))?
        }
        None => U256::zero(),
    };

    whole
        .checked_mul(U256::from(WEI_PER_ETH))
        .and_then(|w| w.checked_add(frac_wei))
        .ok_or_else(|| "Amount too large".to_string())
}

/// `0x`-prefixed hex quantity as used by JSON-RPC `value` fields.
#[must_use]
pub fn to_hex_quantity(value: U256) -> String {
    format!("{value:#x}")
}

/// Format an ETH value with a fixed number of decimals.
#[must_use]
pub fn format_eth(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return "0 ETH".to_string();
    }
    format!("{value:.decimals$} ETH")
}

/// Format a decimal balance string (as held in the session) for display.
#[must_use]
pub fn format_balance(balance: &str) -> String {
    format_eth(balance.parse().unwrap_or(0.0), 4)
}

/// Format a USD amount with thousands separators and two decimals.
#[must_use]
pub fn format_usd(value: f64) -> String {
    if !value.is_finite() {
        return "$0.00".to_string();
    }
    let cents = (value.abs() * 100.0).round() as u64;
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!(
        "{sign}${}.{:02}",
        (cents / 100).to_formatted_string(&Locale::en),
        cents % 100
    )
}

/// Signed percentage with two decimals, e.g. "+1.25%".
#[must_use]
pub fn format_change(change: f64) -> String {
    if !change.is_finite() {
        return "+0.00%".to_string();
    }
    format!("{change:+.2}%")
}

/// Format a unix timestamp (seconds) as a UTC date and time.
#[must_use]
pub fn format_date(timestamp: u64) -> String {
    match i64::try_from(timestamp).ok().and_then(|t| DateTime::from_timestamp(t, 0)) {
        Some(dt) => dt.format("%d %b %Y %H:%M UTC").to_string(),
        None => String::new(),
    }
}

/// Human-readable age of a timestamp relative to `now` (both unix seconds).
/// Falls back to the full date after a week.
#[must_use]
pub fn format_relative_time(timestamp: u64, now: u64) -> String {
    let diff = now.saturating_sub(timestamp);
    match diff {
        0..=59 => "just now".to_string(),
        60..=3_599 => format!("{} min ago", diff / 60),
        3_600..=86_399 => format!("{} hours ago", diff / 3_600),
        86_400..=604_799 => format!("{} days ago", diff / 86_400),
        _ => format_date(timestamp),
    }
}

/// Format a large number with a K/M/B suffix.
#[must_use]
pub fn format_compact_number(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let abs = value.abs();
    let (scaled, suffix) = if abs >= 1e9 {
        (value / 1e9, "B")
    } else if abs >= 1e6 {
        (value / 1e6, "M")
    } else if abs >= 1e3 {
        (value / 1e3, "K")
    } else {
        (value, "")
    };
    let s = format!("{scaled:.1}");
    let s = s.strip_suffix(".0").unwrap_or(&s);
    format!("{s}{suffix}")
}

/// Abbreviate a hash or address to `chars` characters on each end.
#[must_use]
pub fn format_tx_hash(hash: &str, chars: usize) -> String {
    if hash.len() < chars * 2 || !hash.is_ascii() {
        return hash.to_string();
    }
    format!("{}...{}", &hash[..chars], &hash[hash.len() - chars..])
}

/// Short form of an address for prompts: `0x1234...abcd`.
#[must_use]
pub fn short_address(address: &str) -> String {
    format_tx_hash(address, 6)
}

/// Format a list of transaction records for display. When `account` is
/// given, each line is tagged with its direction relative to it.
#[must_use]
pub fn format_transactions(records: &[TransactionRecord], account: Option<&str>) -> String {
    if records.is_empty() {
        return "No transactions found.".to_string();
    }

    let mut lines = Vec::with_capacity(records.len());
    for tx in records {
        let dir = match account {
            Some(a) if tx.from.eq_ignore_ascii_case(a) => "out",
            Some(a) if tx.to.eq_ignore_ascii_case(a) => "in ",
            _ => "   ",
        };
        lines.push(format!(
            "{dir}  {}  {}  {}  {:>12}  [{}]  {}",
            format_date(tx.timestamp),
            short_address(&tx.from),
            short_address(&tx.to),
            wei_to_eth(tx.amount_wei),
            tx.keyword,
            tx.message,
        ));
    }
    lines.join("\n")
}

/// Format transaction records as a JSON array.
#[must_use]
pub fn format_transactions_json(records: &[TransactionRecord]) -> String {
    let items: Vec<serde_json::Value> = records
        .iter()
        .map(|tx| {
            serde_json::json!({
                "from": tx.from,
                "to": tx.to,
                "amount_wei": tx.amount_wei.to_string(),
                "amount_eth": wei_to_eth(tx.amount_wei),
                "message": tx.message,
                "keyword": tx.keyword,
                "timestamp": tx.timestamp,
            })
        })
        .collect();
    serde_json::Value::Array(items).to_string()
}

/// Balance line with its USD value when a price is known.
#[must_use]
pub fn format_balance_with_value(balance: &str, quote: &PriceQuote) -> String {
    let eth: f64 = balance.parse().unwrap_or(0.0);
    if quote.usd > 0.0 {
        format!("{} ({})", format_eth(eth, 4), format_usd(quote.value_in_usd(eth)))
    } else {
        format_eth(eth, 4)
    }
}

/// Format balance as JSON.
#[must_use]
pub fn format_balance_json(balance: &str, quote: &PriceQuote) -> String {
    let eth: f64 = balance.parse().unwrap_or(0.0);
    serde_json::json!({
        "balance_eth": balance,
        "balance_usd": quote.value_in_usd(eth),
    })
    .to_string()
}

/// Format address as JSON.
#[must_use]
pub fn format_address_json(address: &str) -> String {
    serde_json::json!({
        "address": address,
    })
    .to_string()
}

#[must_use]
pub fn format_price(quote: &PriceQuote) -> String {
    if quote.usd <= 0.0 {
        return "ETH price unavailable".to_string();
    }
    format!("ETH {}  {} (24h)", format_usd(quote.usd), format_change(quote.change_24h))
}

#[must_use]
pub fn format_market(data: &MarketData) -> String {
    format!(
        "  Price:      {}\n  24h change: {}\n  24h high:   {}\n  24h low:    {}\n  Market cap: ${}",
        format_usd(data.price),
        format_change(data.change_24h),
        format_usd(data.high_24h),
        format_usd(data.low_24h),
        format_compact_number(data.market_cap),
    )
}

#[must_use]
pub fn format_stats(stats: &TransactionStats) -> String {
    let mut volume = format_eth(stats.total_volume, 4);
    if stats.total_volume_usd > 0.0 {
        volume = format!("{volume} ({})", format_usd(stats.total_volume_usd));
    }
    format!(
        "  Transactions: {}\n  Volume:       {}\n  Sent:         {}\n  Received:     {}\n  Average:      {}",
        stats.total_transactions,
        volume,
        stats.sent,
        stats.received,
        format_eth(stats.average_amount, 4),
    )
}
