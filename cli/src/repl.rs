use crate::Cli;
/// REPL shell: Reedline-based interactive dashboard session.
use anyhow::Result;
use flashet_core::commands::Command;
use flashet_core::display;
use flashet_core::TransactionController;
use reedline::{DefaultCompleter, DefaultPrompt, DefaultPromptSegment, Reedline, Signal};
use std::sync::Arc;

pub async fn run_repl(cli: &Cli) -> Result<()> {
    println!("Flashet v{}", env!("CARGO_PKG_VERSION"));

    let (controller, provider_url) = cli.build_controller()?;
    let controller = Arc::new(controller);
    println!("Provider: {provider_url}");
    println!();

    match controller.initialize().await {
        Ok(Some(account)) => {
            let snapshot = controller.snapshot();
            println!("Restored session for {account}");
            println!(
                "Balance: {}",
                display::format_balance_with_value(&snapshot.balance, &snapshot.price)
            );
        }
        Ok(None) => println!("No wallet connected. Type 'connect' to authorize an account."),
        Err(e) => eprintln!("Warning: {e}"),
    }
    let price = controller.snapshot().price;
    if price.is_available() {
        println!("{}", display::format_price(&price));
    }
    println!("Type 'help' for a list of commands.");
    println!();

    controller.start();

    let commands: Vec<String> = vec![
        "connect".into(),
        "login".into(),
        "disconnect".into(),
        "logout".into(),
        "address".into(),
        "addr".into(),
        "balance".into(),
        "bal".into(),
        "price".into(),
        "market".into(),
        "send".into(),
        "transfer".into(),
        "txs".into(),
        "transactions".into(),
        "history".into(),
        "stats".into(),
        "export".into(),
        "count".into(),
        "refresh".into(),
        "sync".into(),
        "theme".into(),
        "help".into(),
        "exit".into(),
        "quit".into(),
        "q".into(),
    ];
    let completer = Box::new(DefaultCompleter::new(commands));
    let mut line_editor = Reedline::create().with_completer(completer);

    loop {
        let prompt = build_prompt(&controller);
        match line_editor.read_line(&prompt) {
            Ok(Signal::Success(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                match Command::parse(line) {
                    Ok(Command::Exit) => {
                        println!("Goodbye.");
                        break;
                    }
                    Ok(cmd) => {
                        if cmd.requires_account() && controller.account().is_none() {
                            eprintln!("No wallet connected. Run 'connect' first.");
                            continue;
                        }
                        if let Some(prompt_msg) = cmd.confirmation_prompt() {
                            if !prompt_confirm(&prompt_msg) {
                                println!("Cancelled.");
                                continue;
                            }
                            println!("Confirm the transfer in your wallet...");
                        }
                        match cmd.execute(&controller, false).await {
                            Ok(output) => {
                                if !output.is_empty() {
                                    println!("{output}");
                                }
                            }
                            Err(e) => {
                                eprintln!("Error: {e}");
                            }
                        }
                    }
                    Err(e) => {
                        eprintln!("{e}");
                    }
                }
            }
            Ok(Signal::CtrlD) | Ok(Signal::CtrlC) => {
                println!("Goodbye.");
                break;
            }
            Err(e) => {
                eprintln!("Input error: {e}");
                break;
            }
        }
    }

    controller.shutdown().await;
    Ok(())
}

fn build_prompt(controller: &TransactionController) -> DefaultPrompt {
    let label = match controller.account() {
        Some(account) => format!("[flashet {}]", display::short_address(&account)),
        None => "[flashet]".to_string(),
    };
    DefaultPrompt::new(
        DefaultPromptSegment::Basic(label),
        DefaultPromptSegment::Empty,
    )
}

fn prompt_confirm(prompt: &str) -> bool {
    use std::io::Write;
    print!("{prompt} [y/N]: ");
    std::io::stdout().flush().ok();
    let mut input = String::new();
    std::io::stdin().read_line(&mut input).is_ok() && input.trim().eq_ignore_ascii_case("y")
}
