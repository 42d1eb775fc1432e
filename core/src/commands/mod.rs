/// Command definitions and parsing for the dashboard REPL and one-shot mode.
mod execute;
mod help;
mod parse;

pub use help::help_text;

use std::path::PathBuf;

use crate::export::ExportFormat;
use crate::history::TransactionQuery;
use crate::state::Theme;
use crate::validate::DraftTransaction;

#[derive(Debug, Clone, PartialEq)]
pub enum ThemeAction {
    Show,
    Set(Theme),
    Toggle,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Ask the wallet for account access
    Connect,
    /// Forget the connected account locally
    Disconnect,
    /// Show the connected address
    Address,
    /// Show balance and its USD value
    Balance,
    /// Show ETH price and 24h change
    Price,
    /// Show extended market figures
    Market,
    /// Transfer and record: send <to> <amount> <keyword> <message...>
    Send { draft: DraftTransaction },
    /// Show ledger history: txs [search] [--min x] [--max x] [--from date] [--to date] [--oldest]
    Transactions { query: TransactionQuery },
    /// Summary figures for the ledger
    Stats,
    /// Write history to a file: export <csv|json> [dir]
    Export {
        format: ExportFormat,
        dir: Option<PathBuf>,
    },
    /// Number of transfers recorded on the contract
    Count,
    /// Re-read balance and history
    Refresh,
    /// Show, set or toggle the theme preference
    Theme { action: ThemeAction },
    /// Print help
    Help { command: Option<String> },
    /// Exit the dashboard
    Exit,
}

impl Command {
    /// Returns a confirmation prompt if this command should ask before executing.
    pub fn confirmation_prompt(&self) -> Option<String> {
        match self {
            Command::Send { draft } => Some(format!(
                "Send {} ETH to {} and record it as [{}] \"{}\"?",
                draft.amount.trim(),
                draft.address_to.trim(),
                draft.keyword.trim(),
                draft.message.trim(),
            )),
            _ => None,
        }
    }

    /// Whether this command needs a connected account to be useful.
    pub fn requires_account(&self) -> bool {
        matches!(
            self,
            Command::Address
                | Command::Balance
                | Command::Send { .. }
                | Command::Transactions { .. }
                | Command::Stats
                | Command::Export { .. }
                | Command::Refresh
        )
    }
}
