mod repl;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use flashet_core::commands::Command;
use flashet_core::network::{
    CoinGeckoClient, Provider, ProviderConfig, RpcClient, RpcContractGateway, RpcWalletGateway,
};
use flashet_core::{DashboardConfig, SettingsStore, TransactionController, WalletError};

#[derive(Parser)]
#[command(name = "flashet", about = "Flashet: terminal dashboard for a peer-to-peer Ethereum transfer ledger", version)]
pub(crate) struct Cli {
    /// Wallet provider: frame (default) or localhost
    #[arg(long)]
    provider: Option<String>,

    /// Custom provider URL (overrides --provider)
    #[arg(long, env = "FLASHET_PROVIDER_URL")]
    provider_url: Option<String>,

    /// Allow plain-HTTP provider URLs to non-loopback hosts
    #[arg(long)]
    insecure: bool,

    /// Address of the transfer ledger contract
    #[arg(long, env = "FLASHET_CONTRACT")]
    contract: Option<String>,

    /// Price API base URL
    #[arg(long)]
    price_api: Option<String>,

    /// Run a single command and exit
    #[arg(long)]
    cmd: Option<String>,

    /// Output in JSON format (useful with --cmd)
    #[arg(long)]
    json: bool,

    /// Data directory for config.json and settings.db
    /// (default: ~/.local/share/flashet)
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

impl Cli {
    fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => flashet_core::data_dir(),
        }
    }

    /// Load the config file and apply flag overrides on top of it.
    fn load_config(&self) -> Result<DashboardConfig> {
        let path = self.data_dir()?.join("config.json");
        let mut config = DashboardConfig::load_or_default(&path)?;

        if let Some(url) = &self.provider_url {
            config.provider = ProviderConfig {
                provider: Provider::Custom,
                custom_url: Some(url.clone()),
            };
        } else if let Some(name) = &self.provider {
            config.provider = ProviderConfig {
                provider: parse_provider(name)?,
                custom_url: None,
            };
        }
        if let Some(contract) = &self.contract {
            config.contract_address = Some(contract.clone());
        }
        if let Some(url) = &self.price_api {
            config.price_api_url = url.clone();
        }
        Ok(config)
    }

    /// Wire gateways, settings store and controller from the effective config.
    fn build_controller(&self) -> Result<(TransactionController, String)> {
        let config = self.load_config()?;
        let provider_url = config.provider.url(self.insecure)?;
        let contract_address = config.contract_address.as_deref().context(
            "No ledger contract configured. Pass --contract, set FLASHET_CONTRACT, \
             or add contract_address to config.json.",
        )?;

        let rpc = RpcClient::new(&provider_url, config.request_timeout())?;
        let wallet = RpcWalletGateway::new(rpc.clone(), config.account_poll_interval());
        let contract = RpcContractGateway::new(
            rpc,
            contract_address,
            config.confirmation_poll_interval(),
            config.confirmation_timeout(),
        )?;
        let price = CoinGeckoClient::new(&config.price_api_url, config.request_timeout())?
            .with_asset(&config.price_asset_id);

        let data_dir = self.data_dir()?;
        std::fs::create_dir_all(&data_dir).context("Failed to create data directory")?;
        let store = SettingsStore::open_at(&data_dir.join("settings.db"))?;

        log::debug!("provider {provider_url}, contract {}", contract.address());
        let controller = TransactionController::new(
            Arc::new(wallet),
            Arc::new(contract),
            Arc::new(price),
        )
        .with_store(store)
        .with_intervals(config.intervals());
        Ok((controller, provider_url))
    }
}

fn parse_provider(name: &str) -> Result<Provider> {
    match name.to_lowercase().as_str() {
        "frame" => Ok(Provider::Frame),
        "localhost" | "local" => Ok(Provider::Localhost),
        other => bail!("Unknown provider '{other}'. Use frame, localhost, or --provider-url."),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("flashet=info"))
        .init();

    let cli = Cli::parse();

    if let Some(cmd_str) = &cli.cmd {
        run_oneshot(&cli, cmd_str).await
    } else {
        repl::run_repl(&cli).await
    }
}

async fn run_oneshot(cli: &Cli, cmd_str: &str) -> Result<()> {
    let command = Command::parse(cmd_str)?;
    if command == Command::Exit {
        return Ok(());
    }
    if let Command::Help { command } = &command {
        println!("{}", flashet_core::commands::help_text(command.as_deref()));
        return Ok(());
    }

    let (controller, _) = cli.build_controller()?;
    let output = run_command(&controller, &command, cli.json).await?;
    if !output.is_empty() {
        println!("{output}");
    }

    Ok(())
}

/// Restore an authorized account without prompting, then run the command.
/// A missing provider is not fatal: commands that need an account fail
/// with `NotConnected` on their own.
async fn run_command(
    controller: &TransactionController,
    command: &Command,
    json: bool,
) -> Result<String> {
    match controller.initialize().await {
        Ok(_) => {}
        Err(WalletError::NoProvider) => log::debug!("no wallet provider reachable"),
        Err(e) => return Err(e.into()),
    }
    command.execute(controller, json).await
}
