use crate::{
    ITEM_COUNT,
    deployment::{
        DeploymentEnv,
        DeploymentRecord,
        DeploymentStore,
        compute_artifact_hash,
    },
    error::GatewayError,
    evm::EvmRuntime,
    gateway::{
        Bid,
        DeployParams,
        MarketGateway,
        Offer,
    },
    session::AccountSession,
    ui,
    view::{
        MarketSnapshot,
        TxPhase,
        TxTracker,
    },
};
use chrono::Utc;
use color_eyre::eyre::Result;
use ethers::types::{
    Address,
    U256,
};
use std::time::Duration;
use tokio::time;
use tracing::{
    error,
    info,
};

pub const DEFAULT_TESTNET_RPC_URL: &str = "https://godwoken-testnet-web3-rpc.ckbapp.dev";
pub const DEFAULT_LOCAL_RPC_URL: &str = "http://localhost:8024";

/// Market contract already live on the testnet; used when no explicit
/// address is supplied.
pub const KNOWN_MARKET_ADDRESS: &str = "0xEf948E02165551c7b9EfFCE1d5dACA0D270D5aA3";

pub const PUNK_NAMES: [&str; ITEM_COUNT as usize] =
    ["Sharon", "BalloonFace", "Don Snow", "Yso Angry"];

// The rollup's base token carries 8 decimals.
const CKB_DECIMALS: usize = 8;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum NetworkTarget {
    Testnet,
    LocalNode,
}

impl NetworkTarget {
    pub fn default_rpc_url(self) -> &'static str {
        match self {
            NetworkTarget::Testnet => DEFAULT_TESTNET_RPC_URL,
            NetworkTarget::LocalNode => DEFAULT_LOCAL_RPC_URL,
        }
    }

    pub fn deployment_env(self) -> DeploymentEnv {
        match self {
            NetworkTarget::Testnet => DeploymentEnv::Test,
            NetworkTarget::LocalNode => DeploymentEnv::Local,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub network: NetworkTarget,
    pub rpc_url: String,
    pub contract: Option<String>,
}

/// Constructor arguments of the canonical collection.
pub fn launch_params() -> DeployParams {
    DeployParams {
        name: String::from("CRYPTOFUNK"),
        symbol: String::from("☮"),
        content_hash: String::from(
            "f50027cdefc8f564d4c1fac14b5a656c5e452476e490acac827dd00e5d9b0f8e",
        ),
        item_count: ITEM_COUNT,
    }
}

#[derive(Clone, Debug)]
pub struct PunkCard {
    pub index: u64,
    pub name: &'static str,
    pub owner: Option<Address>,
    pub yours: bool,
    pub offer: Offer,
    pub bid: Bid,
}

#[derive(Clone, Debug)]
pub struct AppSnapshot {
    pub account: Address,
    pub chain_id: u64,
    pub balance_ckb: String,
    pub contract: Option<Address>,
    pub remaining: u64,
    pub punks: Vec<PunkCard>,
    pub selected: u64,
    pub last_outcome: TxPhase,
    pub status: String,
    pub errors: Vec<String>,
}

pub struct AppController {
    session: AccountSession,
    gateway: MarketGateway<EvmRuntime>,
    tracker: TxTracker,
    market: Option<MarketSnapshot>,
    selected: u64,
    status: String,
    errors: Vec<String>,
    store: DeploymentStore,
    rpc_url: String,
}

impl AppController {
    pub async fn new(runtime: EvmRuntime, config: &AppConfig) -> Result<Self> {
        let session = AccountSession::establish(&runtime).await?;
        let mut gateway = MarketGateway::new(runtime);

        let mut status = String::from("Ready");
        let requested = config.contract.clone().or_else(|| {
            (config.network == NetworkTarget::Testnet)
                .then(|| KNOWN_MARKET_ADDRESS.to_string())
        });
        if let Some(raw) = requested {
            match gateway.bind(&raw) {
                Ok(address) => {
                    info!(%address, "bound to existing market");
                    status = format!("Bound to {address:#x}");
                }
                Err(e) => {
                    error!(error = %e, "initial bind failed");
                    status = format!("Bind failed: {e}");
                }
            }
        } else {
            status = String::from("No market bound; press d to deploy or x to bind");
        }

        let store = DeploymentStore::new(config.network.deployment_env())?;
        Ok(Self {
            session,
            gateway,
            tracker: TxTracker::default(),
            market: None,
            selected: 0,
            status,
            errors: Vec::new(),
            store,
            rpc_url: config.rpc_url.clone(),
        })
    }

    /// Re-reads the full market and the account balance. Keeps the previous
    /// market snapshot when any read fails.
    pub async fn refresh(&mut self) {
        if let Err(e) = self.session.refresh_balance(self.gateway.runtime()).await {
            self.push_errors(vec![format!("balance refresh failed: {e}")]);
        }
        if !self.gateway.is_bound() {
            return;
        }
        match MarketSnapshot::fetch(&self.gateway, ITEM_COUNT).await {
            Ok(snapshot) => self.market = Some(snapshot),
            Err(e) => self.push_errors(vec![format!("refresh failed: {e}")]),
        }
    }

    pub fn snapshot(&self) -> AppSnapshot {
        let account = self.session.account();
        let mut punks = Vec::with_capacity(ITEM_COUNT as usize);
        for index in 0..ITEM_COUNT {
            let (owner, offer, bid) = match &self.market {
                Some(m) => (
                    m.owners.get(index as usize).copied().flatten(),
                    m.offers.get(index as usize).copied().unwrap_or_default(),
                    m.bids.get(index as usize).copied().unwrap_or_default(),
                ),
                None => (None, Offer::default(), Bid::default()),
            };
            punks.push(PunkCard {
                index,
                name: punk_name(index),
                yours: owner == Some(account),
                owner,
                offer,
                bid,
            });
        }
        AppSnapshot {
            account,
            chain_id: self.session.chain_id(),
            balance_ckb: format_ckb(self.session.l2_balance()),
            contract: self.gateway.address(),
            remaining: self.market.as_ref().map_or(0, |m| m.remaining),
            punks,
            selected: self.selected,
            last_outcome: self.tracker.last_outcome(),
            status: self.status.clone(),
            errors: self.errors.iter().rev().take(5).cloned().collect(),
        }
    }

    pub fn select_next(&mut self) {
        self.selected = (self.selected + 1) % ITEM_COUNT;
    }

    pub fn select_prev(&mut self) {
        self.selected = (self.selected + ITEM_COUNT - 1) % ITEM_COUNT;
    }

    pub async fn deploy(&mut self) {
        if !self.session.can_submit() {
            self.status = String::from("Cannot deploy: account has no balance");
            return;
        }
        let params = launch_params();
        let Self {
            tracker, gateway, ..
        } = self;
        match tracker.submit(gateway.deploy_and_bind(&params)).await {
            Ok(deployed) => {
                self.status = format!("Deployed market at {:#x}", deployed.address);
                self.record_deployment(&params, deployed.address, deployed.tx_hash);
                self.refresh().await;
            }
            Err(e) => {
                self.status = String::from("Deploy failed");
                self.push_errors(vec![format!("deploy error: {e}")]);
            }
        }
    }

    pub async fn bind(&mut self, raw: &str) {
        match self.gateway.bind(raw) {
            Ok(address) => {
                self.status = format!("Bound to {address:#x}");
                self.market = None;
                self.refresh().await;
            }
            Err(e) => {
                self.status = String::from("Bind failed");
                self.push_errors(vec![format!("bind error: {e}")]);
            }
        }
    }

    pub async fn claim_selected(&mut self) {
        let index = self.selected;
        let account = self.session.account();
        let Self {
            tracker, gateway, ..
        } = self;
        match tracker.submit(gateway.claim(index, account)).await {
            Ok(()) => {
                self.status = format!("Claimed {}", punk_name(index));
                self.refresh().await;
            }
            Err(e) => self.submission_failed("claim", index, e),
        }
    }

    pub async fn transfer_selected(&mut self, to: &str) {
        let recipient: Address = match to.trim().parse() {
            Ok(addr) => addr,
            Err(_) => {
                self.status = format!("Invalid recipient address: {to}");
                return;
            }
        };
        let index = self.selected;
        let account = self.session.account();
        let Self {
            tracker, gateway, ..
        } = self;
        match tracker
            .submit(gateway.transfer(recipient, index, account))
            .await
        {
            Ok(()) => {
                self.status =
                    format!("Transferred {} to {recipient:#x}", punk_name(index));
                self.refresh().await;
            }
            Err(e) => self.submission_failed("transfer", index, e),
        }
    }

    pub async fn sell_selected(&mut self, price_ckb: u64) {
        let index = self.selected;
        let account = self.session.account();
        let min_price = ckb_to_base_units(price_ckb);
        let Self {
            tracker, gateway, ..
        } = self;
        match tracker
            .submit(gateway.offer_for_sale(index, min_price, account))
            .await
        {
            Ok(()) => {
                self.status =
                    format!("Offered {} for {price_ckb} CKB", punk_name(index));
                self.refresh().await;
            }
            Err(e) => self.submission_failed("sell", index, e),
        }
    }

    pub async fn buy_selected(&mut self) {
        let index = self.selected;
        let offer = match &self.market {
            Some(m) => m.offers.get(index as usize).copied().unwrap_or_default(),
            None => Offer::default(),
        };
        if !offer.active {
            self.status = format!("{} is not for sale", punk_name(index));
            return;
        }
        let account = self.session.account();
        let Self {
            tracker, gateway, ..
        } = self;
        match tracker
            .submit(gateway.buy(index, offer.min_price, account))
            .await
        {
            Ok(()) => {
                self.status = format!("Bought {}", punk_name(index));
                self.refresh().await;
            }
            Err(e) => self.submission_failed("buy", index, e),
        }
    }

    fn record_deployment(
        &mut self,
        params: &DeployParams,
        address: Address,
        tx_hash: ethers::types::H256,
    ) {
        let artifact_hash = self
            .gateway
            .runtime()
            .artifact_file()
            .and_then(|path| compute_artifact_hash(path).ok())
            .unwrap_or_default();
        let record = DeploymentRecord {
            deployed_at: Utc::now().to_rfc3339(),
            contract_address: format!("{address:#x}"),
            deploy_tx_hash: format!("{tx_hash:#x}"),
            artifact_hash,
            network_url: self.rpc_url.clone(),
            name: params.name.clone(),
            symbol: params.symbol.clone(),
            content_hash: params.content_hash.clone(),
            item_count: params.item_count,
        };
        if let Err(e) = self.store.append(record) {
            self.push_errors(vec![format!("recording deployment: {e}")]);
        }
    }

    fn submission_failed(&mut self, op: &str, index: u64, err: GatewayError) {
        // Revert reasons come back verbatim from the contract.
        let detail = match err.revert_reason() {
            Some(reason) => reason.to_string(),
            None => err.to_string(),
        };
        self.status = format!("{op} failed for {}: {detail}", punk_name(index));
        self.push_errors(vec![format!("{op}(index={index}) error: {detail}")]);
    }

    fn push_errors(&mut self, mut items: Vec<String>) {
        if items.is_empty() {
            return;
        }
        for item in &items {
            error!("{}", item);
        }
        self.errors.append(&mut items);
        if self.errors.len() > 50 {
            let drain = self.errors.len() - 50;
            self.errors.drain(0..drain);
        }
    }
}

pub fn punk_name(index: u64) -> &'static str {
    PUNK_NAMES
        .get(index as usize)
        .copied()
        .unwrap_or("Unknown")
}

fn ckb_to_base_units(ckb: u64) -> U256 {
    U256::from(ckb) * U256::exp10(CKB_DECIMALS)
}

/// Renders a base-unit balance as CKB with four fractional digits.
pub fn format_ckb(balance: U256) -> String {
    let unit = U256::exp10(CKB_DECIMALS);
    let whole = balance / unit;
    let frac = (balance % unit) / U256::exp10(CKB_DECIMALS - 4);
    format!("{whole}.{:04}", frac.as_u64())
}

pub async fn run_app(runtime: EvmRuntime, config: &AppConfig) -> Result<()> {
    let mut controller = AppController::new(runtime, config).await?;
    controller.refresh().await;
    let mut ui_state = ui::UiState::default();

    // UI bootstrap
    ui::terminal_enter(&mut ui_state)?;
    let res = run_loop(&mut controller, &mut ui_state).await;
    ui::terminal_exit()?;
    res
}

async fn run_loop(
    controller: &mut AppController,
    ui_state: &mut ui::UiState,
) -> Result<()> {
    let mut ticker = time::interval(Duration::from_millis(2000));
    ui::draw(ui_state, &controller.snapshot())?;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => { break; }
            _ = ticker.tick() => {
                controller.refresh().await;
                ui::draw(ui_state, &controller.snapshot())?;
            }
            ev = ui::next_event(ui_state) => {
                match ev? {
                    ui::UserEvent::Quit => break,
                    ui::UserEvent::NextPunk => controller.select_next(),
                    ui::UserEvent::PrevPunk => controller.select_prev(),
                    ui::UserEvent::Refresh => controller.refresh().await,
                    ui::UserEvent::Claim => controller.claim_selected().await,
                    ui::UserEvent::Buy => controller.buy_selected().await,
                    ui::UserEvent::ConfirmDeploy => controller.deploy().await,
                    ui::UserEvent::ConfirmBind { address } => controller.bind(&address).await,
                    ui::UserEvent::ConfirmTransfer { to } => controller.transfer_selected(&to).await,
                    ui::UserEvent::ConfirmSell { price_ckb } => controller.sell_selected(price_ckb).await,
                    ui::UserEvent::OpenDeployModal
                    | ui::UserEvent::OpenBindModal
                    | ui::UserEvent::OpenTransferModal
                    | ui::UserEvent::OpenSellModal
                    | ui::UserEvent::Redraw => {
                        // UI-only update; redraw without hitting the chain
                        ui::draw(ui_state, &controller.snapshot())?;
                        continue;
                    }
                }
                ui::draw(ui_state, &controller.snapshot())?;
            }
        }
    }
    Ok(())
}
