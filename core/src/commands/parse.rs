use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;

use super::{Command, ThemeAction};
use crate::display;
use crate::export::ExportFormat;
use crate::history::{SortOrder, TransactionQuery};
use crate::state::Theme;
use crate::validate::DraftTransaction;

impl Command {
    /// Parse a command from a raw input string.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let mut words = input.split_whitespace();
        let Some(cmd) = words.next() else {
            bail!("No command entered. Type 'help' for a list of commands.");
        };
        let args: Vec<&str> = words.collect();

        match cmd.to_lowercase().as_str() {
            "connect" | "login" => Ok(Command::Connect),

            "disconnect" | "logout" => Ok(Command::Disconnect),

            "address" | "addr" => Ok(Command::Address),

            "balance" | "bal" => Ok(Command::Balance),

            "price" => Ok(Command::Price),

            "market" => Ok(Command::Market),

            "send" | "transfer" => {
                const USAGE: &str = "Usage: send <address> <amount> <keyword> <message>";
                let to = args
                    .first()
                    .ok_or_else(|| anyhow!("Missing recipient. {USAGE}"))?;
                let amount = args
                    .get(1)
                    .ok_or_else(|| anyhow!("Missing amount. {USAGE}"))?;
                let keyword = args
                    .get(2)
                    .ok_or_else(|| anyhow!("Missing keyword. {USAGE}"))?;
                if args.len() < 4 {
                    bail!("Missing message. {USAGE}");
                }
                let message = args[3..].join(" ");
                Ok(Command::Send {
                    draft: DraftTransaction::new(*to, *amount, *keyword, message),
                })
            }

            "txs" | "transactions" | "history" => Ok(Command::Transactions {
                query: parse_query(&args)?,
            }),

            "stats" => Ok(Command::Stats),

            "export" => {
                let format = args
                    .first()
                    .ok_or_else(|| anyhow!("Missing format. Usage: export <csv|json> [dir]"))?
                    .parse::<ExportFormat>()
                    .map_err(|e| anyhow!(e))?;
                let dir = args.get(1).map(PathBuf::from);
                Ok(Command::Export { format, dir })
            }

            "count" => Ok(Command::Count),

            "refresh" | "sync" => Ok(Command::Refresh),

            "theme" => {
                let action = match args.first().map(|s| s.to_lowercase()) {
                    None => ThemeAction::Show,
                    Some(arg) if arg == "toggle" => ThemeAction::Toggle,
                    Some(arg) => ThemeAction::Set(arg.parse::<Theme>().map_err(|e| anyhow!(e))?),
                };
                Ok(Command::Theme { action })
            }

            "help" | "?" => Ok(Command::Help {
                command: args.first().map(|s| s.to_string()),
            }),

            "exit" | "quit" | "q" => Ok(Command::Exit),

            other => bail!("Unknown command: '{other}'. Type 'help' for a list of commands."),
        }
    }
}

/// Free words form the search text; `--min/--max` take ETH amounts and
/// `--from/--to` take `YYYY-MM-DD` dates.
fn parse_query(args: &[&str]) -> Result<TransactionQuery> {
    let mut query = TransactionQuery::default();
    let mut search: Vec<&str> = Vec::new();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match *arg {
            "--oldest" => query.sort = SortOrder::Oldest,
            "--newest" => query.sort = SortOrder::Newest,
            "--min" | "--max" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("{arg} needs an amount in ETH"))?;
                let wei = display::parse_eth_amount(value)
                    .map_err(|e| anyhow!("Invalid amount for {arg}: '{value}' ({e})"))?;
                if *arg == "--min" {
                    query.min_amount = Some(wei);
                } else {
                    query.max_amount = Some(wei);
                }
            }
            "--from" | "--to" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("{arg} needs a date (YYYY-MM-DD)"))?;
                let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
                    .with_context(|| format!("Invalid date for {arg}: '{value}'"))?;
                if *arg == "--from" {
                    query.date_start = Some(date);
                } else {
                    query.date_end = Some(date);
                }
            }
            flag if flag.starts_with("--") => bail!("Unknown option '{flag}'"),
            word => search.push(word),
        }
    }

    if !search.is_empty() {
        query.search = Some(search.join(" "));
    }
    Ok(query)
}

#[cfg(test)]
mod tests {
    use ethers::types::U256;

    use super::*;

    const TO: &str = "0x1111111111111111111111111111111111111111";

    #[test]
    fn parse_simple_commands() {
        assert_eq!(Command::parse("connect").unwrap(), Command::Connect);
        assert_eq!(Command::parse("  BAL  ").unwrap(), Command::Balance);
        assert_eq!(Command::parse("addr").unwrap(), Command::Address);
        assert_eq!(Command::parse("q").unwrap(), Command::Exit);
        assert_eq!(Command::parse("count").unwrap(), Command::Count);
    }

    #[test]
    fn parse_empty_input() {
        let err = Command::parse("   ").unwrap_err().to_string();
        assert!(err.contains("No command entered"));
    }

    #[test]
    fn parse_unknown_command() {
        let err = Command::parse("stake 1").unwrap_err().to_string();
        assert!(err.contains("Unknown command: 'stake'"));
    }

    #[test]
    fn parse_send_joins_message() {
        let cmd = Command::parse(&format!("send {TO} 0.25 lunch thanks for the pizza")).unwrap();
        let Command::Send { draft } = cmd else {
            panic!("expected send");
        };
        assert_eq!(draft.address_to, TO);
        assert_eq!(draft.amount, "0.25");
        assert_eq!(draft.keyword, "lunch");
        assert_eq!(draft.message, "thanks for the pizza");
    }

    #[test]
    fn parse_send_missing_parts() {
        let err = Command::parse("send").unwrap_err().to_string();
        assert!(err.contains("Missing recipient"));
        let err = Command::parse(&format!("send {TO} 1 kw")).unwrap_err().to_string();
        assert!(err.contains("Missing message"));
    }

    #[test]
    fn parse_send_defers_validation() {
        // Field checks happen in the controller so every error is reported at once.
        assert!(Command::parse("send nobody abc k m").is_ok());
    }

    #[test]
    fn parse_txs_with_filters() {
        let cmd = Command::parse("txs coffee beans --min 0.1 --max 2 --from 2024-01-01 --to 2024-01-31 --oldest")
            .unwrap();
        let Command::Transactions { query } = cmd else {
            panic!("expected txs");
        };
        assert_eq!(query.search.as_deref(), Some("coffee beans"));
        assert_eq!(query.min_amount, Some(U256::from(100_000_000_000_000_000u128)));
        assert_eq!(query.max_amount, Some(U256::from(2_000_000_000_000_000_000u128)));
        assert_eq!(query.date_start, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(query.date_end, NaiveDate::from_ymd_opt(2024, 1, 31));
        assert_eq!(query.sort, SortOrder::Oldest);
    }

    #[test]
    fn parse_txs_plain() {
        let cmd = Command::parse("txs").unwrap();
        assert_eq!(
            cmd,
            Command::Transactions {
                query: TransactionQuery::default()
            }
        );
    }

    #[test]
    fn parse_txs_rejects_bad_options() {
        assert!(Command::parse("txs --min").is_err());
        assert!(Command::parse("txs --from 01/02/2024").is_err());
        assert!(Command::parse("txs --limit 5").is_err());
    }

    #[test]
    fn parse_export() {
        assert_eq!(
            Command::parse("export csv /tmp/out").unwrap(),
            Command::Export {
                format: ExportFormat::Csv,
                dir: Some(PathBuf::from("/tmp/out")),
            }
        );
        assert_eq!(
            Command::parse("export JSON").unwrap(),
            Command::Export {
                format: ExportFormat::Json,
                dir: None,
            }
        );
        assert!(Command::parse("export").is_err());
        assert!(Command::parse("export pdf").is_err());
    }

    #[test]
    fn parse_theme() {
        assert_eq!(
            Command::parse("theme").unwrap(),
            Command::Theme { action: ThemeAction::Show }
        );
        assert_eq!(
            Command::parse("theme light").unwrap(),
            Command::Theme { action: ThemeAction::Set(Theme::Light) }
        );
        assert_eq!(
            Command::parse("theme toggle").unwrap(),
            Command::Theme { action: ThemeAction::Toggle }
        );
        assert!(Command::parse("theme neon").is_err());
    }

    #[test]
    fn parse_help() {
        assert_eq!(
            Command::parse("help send").unwrap(),
            Command::Help { command: Some("send".into()) }
        );
        assert_eq!(Command::parse("?").unwrap(), Command::Help { command: None });
    }
}
