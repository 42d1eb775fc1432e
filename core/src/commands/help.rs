#[must_use]
pub fn help_text(command: Option<&str>) -> String {
    match command {
        Some("connect") | Some("login") => {
            "connect\n  Ask the wallet for account access and load balance and history.\n  Alias: login".to_string()
        }
        Some("disconnect") | Some("logout") => {
            "disconnect\n  Forget the connected account locally.\n  The wallet keeps its authorization; revoke it there if needed.\n  Alias: logout".to_string()
        }
        Some("address") | Some("addr") => {
            "address\n  Show the connected address.\n  Alias: addr".to_string()
        }
        Some("balance") | Some("bal") => {
            "balance\n  Show the ETH balance and its USD value.\n  Alias: bal".to_string()
        }
        Some("price") => "price\n  Show the ETH price in USD and its 24h change.".to_string(),
        Some("market") => {
            "market\n  Show price, 24h change, 24h high/low and market cap.".to_string()
        }
        Some("send") | Some("transfer") => {
            "send <address> <amount> <keyword> <message>\n  Send ETH and record the transfer on the ledger contract.\n  Amount is in ETH (minimum 0.0001). Keyword needs 2+ characters,\n  message 3+. Everything after the keyword is the message.\n  Example: send 0x5FbDB2315678afecb367f032d93F642f64180aa3 0.01 coffee thanks for the beans\n  Alias: transfer".to_string()
        }
        Some("txs") | Some("transactions") | Some("history") => {
            "txs [search] [--min <eth>] [--max <eth>] [--from <date>] [--to <date>] [--oldest]\n  Show ledger history, newest first.\n  Search matches sender, receiver, message and keyword.\n  Dates are YYYY-MM-DD (UTC); --to includes the whole day.\n  Aliases: transactions, history".to_string()
        }
        Some("stats") => {
            "stats\n  Show total transfers, volume, sent/received counts and average amount.".to_string()
        }
        Some("export") => {
            "export <csv|json> [dir]\n  Write the ledger history to transactions_<date>.<ext>.\n  Default directory: current directory.".to_string()
        }
        Some("count") => {
            "count\n  Show how many transfers the ledger contract has recorded.".to_string()
        }
        Some("refresh") | Some("sync") => {
            "refresh\n  Re-read balance and history now.\n  Alias: sync".to_string()
        }
        Some("theme") => {
            "theme [dark|light|toggle]\n  Show or change the saved theme preference.".to_string()
        }
        Some("exit") | Some("quit") | Some("q") => {
            "exit\n  Exit the dashboard.\n  Aliases: quit, q".to_string()
        }
        Some(other) => format!("Unknown command: '{other}'. Type 'help' for a list."),
        None => {
            "Available commands:\n\
             \n\
             \x20 connect          Connect the wallet\n\
             \x20 disconnect       Forget the connected account\n\
             \x20 address          Show connected address\n\
             \x20 balance          Show balance\n\
             \x20 price            Show ETH price\n\
             \x20 market           Show market figures\n\
             \x20 send             Send ETH and record it on the ledger\n\
             \x20 txs              Show ledger history\n\
             \x20 stats            Show ledger statistics\n\
             \x20 export           Export history as CSV or JSON\n\
             \x20 count            Show ledger transfer count\n\
             \x20 refresh          Reload balance and history\n\
             \x20 theme            Show or change theme\n\
             \x20 help [cmd]       Show help for a command\n\
             \x20 exit             Exit the dashboard\n\
             \n\
             Type 'help <command>' for detailed help on a specific command."
                .to_string()
        }
    }
}
