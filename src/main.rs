use color_eyre::eyre::{
    Result,
    eyre,
};
use funk_market::{
    client,
    deployment,
    evm::EvmRuntime,
    wallets,
};
use std::path::PathBuf;
use tracing_appender::rolling;
use tracing_subscriber::{
    EnvFilter,
    fmt,
};

fn print_usage_and_exit() -> ! {
    println!(
        "Usage: funk-market [--testnet | --local] [--rpc-url <url>]\n\
         [--wallet <name>] [--wallet-dir <path>]\n\
         [--contract <address>] [--artifact <path>]\n\
         \n\
         Flags:\n\
           --testnet           Connect to the Godwoken testnet (default RPC {})\n\
           --local             Connect to a local node (default RPC {})\n\
           --rpc-url <url>     Override the RPC URL for the selected network\n\
           --wallet <name>     Keystore profile to sign with\n\
           --wallet-dir <path> Override the keystore directory (defaults to ~/.funk-market/wallets)\n\
           --contract <addr>   Bind to an existing market instead of the known testnet one\n\
           --artifact <path>   Contract build artifact used for deploys",
        client::DEFAULT_TESTNET_RPC_URL,
        client::DEFAULT_LOCAL_RPC_URL,
    );
    std::process::exit(0);
}

struct CliArgs {
    config: client::AppConfig,
    wallet: String,
    wallet_dir: Option<String>,
    artifact: Option<PathBuf>,
}

fn parse_cli_args() -> Result<CliArgs> {
    let mut args = std::env::args().skip(1);
    let mut network_flag: Option<client::NetworkTarget> = None;
    let mut custom_url: Option<String> = None;
    let mut wallet_dir: Option<String> = None;
    let mut wallet_name: Option<String> = None;
    let mut contract: Option<String> = None;
    let mut artifact: Option<PathBuf> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--testnet" => {
                if network_flag.is_some() {
                    return Err(eyre!(
                        "Multiple network flags provided; choose one of --testnet/--local"
                    ));
                }
                network_flag = Some(client::NetworkTarget::Testnet);
            }
            "--local" => {
                if network_flag.is_some() {
                    return Err(eyre!(
                        "Multiple network flags provided; choose one of --testnet/--local"
                    ));
                }
                network_flag = Some(client::NetworkTarget::LocalNode);
            }
            "--rpc-url" => {
                let url = args
                    .next()
                    .ok_or_else(|| eyre!("--rpc-url requires a URL argument"))?;
                if custom_url.is_some() {
                    return Err(eyre!("--rpc-url may only be specified once"));
                }
                if network_flag.is_none() {
                    return Err(eyre!(
                        "--rpc-url must follow a network flag (--testnet/--local)"
                    ));
                }
                custom_url = Some(url);
            }
            "--wallet-dir" => {
                let dir = args
                    .next()
                    .ok_or_else(|| eyre!("--wallet-dir requires a path argument"))?;
                if wallet_dir.is_some() {
                    return Err(eyre!("--wallet-dir may only be specified once"));
                }
                wallet_dir = Some(dir);
            }
            "--wallet" => {
                let name = args
                    .next()
                    .ok_or_else(|| eyre!("--wallet requires a wallet name"))?;
                if wallet_name.is_some() {
                    return Err(eyre!("--wallet may only be specified once"));
                }
                wallet_name = Some(name);
            }
            "--contract" => {
                let address = args
                    .next()
                    .ok_or_else(|| eyre!("--contract requires an address argument"))?;
                if contract.is_some() {
                    return Err(eyre!("--contract may only be specified once"));
                }
                contract = Some(address);
            }
            "--artifact" => {
                let path = args
                    .next()
                    .ok_or_else(|| eyre!("--artifact requires a path argument"))?;
                if artifact.is_some() {
                    return Err(eyre!("--artifact may only be specified once"));
                }
                artifact = Some(PathBuf::from(path));
            }
            "--help" | "-h" => print_usage_and_exit(),
            other => return Err(eyre!("Unknown argument: {other}")),
        }
    }

    let network = network_flag
        .ok_or_else(|| eyre!("Select a network with --testnet or --local"))?;
    let rpc_url = custom_url.unwrap_or_else(|| network.default_rpc_url().to_string());
    let wallet = wallet_name
        .ok_or_else(|| eyre!("Specify --wallet <name> to select a keystore profile"))?;

    Ok(CliArgs {
        config: client::AppConfig {
            network,
            rpc_url,
            contract,
        },
        wallet,
        wallet_dir,
        artifact,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    // Log to a file; stdout belongs to the terminal UI.
    let appender = rolling::daily(".logs", "funk-market.log");
    let (writer, _guard) = tracing_appender::non_blocking(appender);
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();
    tracing::info!("starting funk-market client");

    deployment::ensure_structure()?;
    let args = parse_cli_args()?;

    let dir = wallets::resolve_wallet_dir(args.wallet_dir.as_deref())?;
    let descriptor = wallets::find_wallet(&dir, &args.wallet)?;
    let signer = wallets::unlock_wallet(&descriptor)?;

    let runtime =
        EvmRuntime::connect(&args.config.rpc_url, signer, args.artifact).await?;
    client::run_app(runtime, &args.config).await
}
