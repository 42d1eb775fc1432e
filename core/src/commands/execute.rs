use std::path::Path;

use anyhow::Result;

use super::help::help_text;
use super::{Command, ThemeAction};
use crate::controller::TransactionController;
use crate::display;
use crate::error::WalletError;
use crate::export;
use crate::history::TransactionQuery;
use crate::validate::Field;

fn require_account(controller: &TransactionController) -> Result<String> {
    controller
        .account()
        .ok_or_else(|| WalletError::NotConnected.into())
}

impl Command {
    /// Execute a command against the controller and return the output string.
    pub async fn execute(
        &self,
        controller: &TransactionController,
        json_output: bool,
    ) -> Result<String> {
        match self {
            Command::Connect => {
                let account = controller.connect().await?;
                let snapshot = controller.snapshot();
                if json_output {
                    Ok(serde_json::json!({
                        "address": account,
                        "balance_eth": snapshot.balance,
                        "transactions": snapshot.transactions.len(),
                    })
                    .to_string())
                } else {
                    Ok(format!(
                        "Connected: {account}\n  Balance: {}\n  Ledger entries: {}",
                        display::format_balance_with_value(&snapshot.balance, &snapshot.price),
                        snapshot.transactions.len(),
                    ))
                }
            }

            Command::Disconnect => {
                controller.disconnect();
                Ok("Disconnected.".to_string())
            }

            Command::Address => {
                let account = require_account(controller)?;
                if json_output {
                    Ok(display::format_address_json(&account))
                } else {
                    Ok(account)
                }
            }

            Command::Balance => {
                require_account(controller)?;
                controller.refresh_balance().await?;
                let snapshot = controller.snapshot();
                if json_output {
                    Ok(display::format_balance_json(&snapshot.balance, &snapshot.price))
                } else {
                    Ok(display::format_balance_with_value(
                        &snapshot.balance,
                        &snapshot.price,
                    ))
                }
            }

            Command::Price => {
                let quote = controller.refresh_price().await;
                if json_output {
                    Ok(serde_json::to_string(&quote)?)
                } else {
                    Ok(display::format_price(&quote))
                }
            }

            Command::Market => match controller.market_data().await {
                Some(data) if json_output => Ok(serde_json::to_string(&data)?),
                Some(data) => Ok(display::format_market(&data)),
                None if json_output => Ok("null".to_string()),
                None => Ok("Market data unavailable.".to_string()),
            },

            Command::Send { draft } => {
                require_account(controller)?;
                controller.set_draft_field(Field::AddressTo, draft.address_to.clone());
                controller.set_draft_field(Field::Amount, draft.amount.clone());
                controller.set_draft_field(Field::Keyword, draft.keyword.clone());
                controller.set_draft_field(Field::Message, draft.message.clone());
                let receipt = controller.submit_draft().await?;

                if json_output {
                    Ok(serde_json::json!({
                        "transfer_hash": receipt.transfer_hash,
                        "record_hash": receipt.record_hash,
                        "to": draft.address_to.trim(),
                        "amount_eth": draft.amount.trim(),
                        "keyword": draft.keyword.trim(),
                        "message": draft.message.trim(),
                    })
                    .to_string())
                } else {
                    Ok(format!(
                        "Transaction sent!\n  Transfer: {}\n  Record:   {}\n  Amount:   {} ETH -> {}",
                        receipt.transfer_hash,
                        receipt.record_hash,
                        draft.amount.trim(),
                        draft.address_to.trim(),
                    ))
                }
            }

            Command::Transactions { query } => {
                let account = require_account(controller)?;
                let records = controller.transactions(query);
                if json_output {
                    Ok(display::format_transactions_json(&records))
                } else if records.is_empty() && !query.is_empty() {
                    Ok("No transactions match your filters.".to_string())
                } else {
                    Ok(display::format_transactions(&records, Some(&account)))
                }
            }

            Command::Stats => {
                require_account(controller)?;
                let stats = controller.stats();
                if json_output {
                    Ok(serde_json::to_string(&stats)?)
                } else {
                    Ok(display::format_stats(&stats))
                }
            }

            Command::Export { format, dir } => {
                require_account(controller)?;
                let records = controller.transactions(&TransactionQuery::default());
                let dir = dir.as_deref().unwrap_or_else(|| Path::new("."));
                match export::export_to_file(&records, dir, "transactions", *format)? {
                    Some(path) if json_output => Ok(serde_json::json!({
                        "path": path.display().to_string(),
                        "count": records.len(),
                    })
                    .to_string()),
                    Some(path) => Ok(format!(
                        "Exported {} transactions to {}",
                        records.len(),
                        path.display()
                    )),
                    None => Ok("No transactions to export.".to_string()),
                }
            }

            Command::Count => {
                let count = controller.refresh_transaction_count().await?;
                if json_output {
                    Ok(serde_json::json!({ "transaction_count": count }).to_string())
                } else {
                    Ok(format!("Ledger transfers: {count}"))
                }
            }

            Command::Refresh => {
                require_account(controller)?;
                controller.refresh().await?;
                let snapshot = controller.snapshot();
                Ok(format!(
                    "Refreshed. Balance: {}, ledger entries: {}",
                    display::format_balance(&snapshot.balance),
                    snapshot.transactions.len(),
                ))
            }

            Command::Theme { action } => {
                let theme = match action {
                    ThemeAction::Show => controller.theme(),
                    ThemeAction::Set(theme) => {
                        controller.set_theme(*theme)?;
                        *theme
                    }
                    ThemeAction::Toggle => controller.toggle_theme()?,
                };
                if json_output {
                    Ok(serde_json::json!({ "theme": theme }).to_string())
                } else {
                    Ok(format!("Theme: {theme}"))
                }
            }

            Command::Help { command } => Ok(help_text(command.as_deref())),

            Command::Exit => Ok(String::new()),
        }
    }
}
