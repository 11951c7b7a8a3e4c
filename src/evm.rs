use crate::{
    error::GatewayError,
    gateway::{Bid, DeployParams, Deployed, MarketRuntime, Offer},
    market_types::CryptoFunkMarket,
};
use async_trait::async_trait;
use ethers::{
    abi::Abi,
    contract::{ContractCall, ContractError, ContractFactory},
    middleware::SignerMiddleware,
    providers::{Http, Middleware, Provider},
    signers::{LocalWallet, Signer},
    types::{Address, Bytes, U256},
};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tracing::info;

pub type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

// Truffle artifact with abi + creation bytecode, as committed by the
// contract build.
const ARTIFACT_CANDIDATES: [&str; 2] = [
    "./build/contracts/CryptoFunkMarket.json",
    "./contracts/CryptoFunkMarket.json",
];

// Gas ceiling the rollup accepts for market transactions.
const DEFAULT_TX_GAS: u64 = 6_000_000;

#[derive(Deserialize)]
struct ContractArtifact {
    abi: Abi,
    bytecode: String,
}

/// `MarketRuntime` over an EVM JSON-RPC endpoint: HTTP provider plus a
/// local signer. The wallet signs as its own account, so submitting calls
/// verify the requested sender against it.
pub struct EvmRuntime {
    client: Arc<SignerClient>,
    account: Address,
    chain_id: u64,
    artifact_path: Option<PathBuf>,
}

impl EvmRuntime {
    pub async fn connect(
        rpc_url: &str,
        wallet: LocalWallet,
        artifact_path: Option<PathBuf>,
    ) -> Result<Self, GatewayError> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| GatewayError::Read(format!("invalid rpc url {rpc_url:?}: {e}")))?
            .interval(Duration::from_millis(500));
        let chain_id = provider.get_chainid().await.map_err(read_err)?.as_u64();
        let wallet = wallet.with_chain_id(chain_id);
        let account = wallet.address();
        let client = Arc::new(SignerMiddleware::new(provider, wallet));
        info!(%account, chain_id, rpc_url, "connected to rollup endpoint");
        Ok(Self {
            client,
            account,
            chain_id,
            artifact_path,
        })
    }

    pub fn account(&self) -> Address {
        self.account
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub async fn balance_of(&self, account: Address) -> Result<U256, GatewayError> {
        self.client
            .get_balance(account, None)
            .await
            .map_err(read_err)
    }

    fn market(&self, contract: Address) -> CryptoFunkMarket<SignerClient> {
        CryptoFunkMarket::new(contract, self.client.clone())
    }

    fn ensure_sender(&self, from: Address) -> Result<(), GatewayError> {
        if from == self.account {
            Ok(())
        } else {
            Err(GatewayError::submission(format!(
                "sender {from:#x} does not match the unlocked wallet account {:#x}",
                self.account
            )))
        }
    }

    /// Explicit artifact path if one was given, otherwise the first
    /// checked-in candidate that exists on disk.
    pub fn artifact_file(&self) -> Option<PathBuf> {
        match &self.artifact_path {
            Some(path) => Some(path.clone()),
            None => ARTIFACT_CANDIDATES
                .iter()
                .map(Path::new)
                .find(|p| p.exists())
                .map(Path::to_path_buf),
        }
    }

    fn load_artifact(&self) -> Result<ContractArtifact, GatewayError> {
        let path = self.artifact_file().ok_or_else(|| {
            GatewayError::submission(format!(
                "contract artifact not found, tried {ARTIFACT_CANDIDATES:?}"
            ))
        })?;
        let data = fs::read(&path).map_err(|e| {
            GatewayError::submission(format!("reading artifact {}: {e}", path.display()))
        })?;
        serde_json::from_slice(&data).map_err(|e| {
            GatewayError::submission(format!("parsing artifact {}: {e}", path.display()))
        })
    }
}

fn read_err(err: impl std::fmt::Display) -> GatewayError {
    GatewayError::Read(err.to_string())
}

fn read_call_err(err: ContractError<SignerClient>) -> GatewayError {
    match err.decode_revert::<String>() {
        Some(reason) => GatewayError::Read(reason),
        None => GatewayError::Read(err.to_string()),
    }
}

fn submission_err(err: ContractError<SignerClient>) -> GatewayError {
    // Reverts usually surface at gas estimation with the reason encoded;
    // forward it untouched.
    let reason = err
        .decode_revert::<String>()
        .unwrap_or_else(|| err.to_string());
    GatewayError::Submission { reason }
}

async fn send_checked(call: ContractCall<SignerClient, ()>) -> Result<(), GatewayError> {
    let pending = call.send().await.map_err(submission_err)?;
    let receipt = pending
        .await
        .map_err(|e| GatewayError::submission(e.to_string()))?;
    if let Some(receipt) = receipt {
        if receipt.status == Some(0u64.into()) {
            return Err(GatewayError::submission(format!(
                "transaction {:#x} reverted on-chain",
                receipt.transaction_hash
            )));
        }
    }
    Ok(())
}

#[async_trait]
impl MarketRuntime for EvmRuntime {
    async fn deploy(&self, params: &DeployParams) -> Result<Deployed, GatewayError> {
        let artifact = self.load_artifact()?;
        let bytecode = artifact
            .bytecode
            .parse::<Bytes>()
            .map_err(|e| GatewayError::submission(format!("artifact bytecode: {e}")))?;
        let factory = ContractFactory::new(artifact.abi, bytecode, self.client.clone());
        let deployer = factory
            .deploy((
                params.name.clone(),
                params.symbol.clone(),
                params.content_hash.clone(),
                U256::from(params.item_count),
            ))
            .map_err(submission_err)?;
        let (contract, receipt) = deployer.send_with_receipt().await.map_err(submission_err)?;
        info!(
            address = %contract.address(),
            tx = %receipt.transaction_hash,
            "market contract deployed"
        );
        Ok(Deployed {
            address: contract.address(),
            tx_hash: receipt.transaction_hash,
        })
    }

    async fn owner_of(&self, contract: Address, index: u64) -> Result<Address, GatewayError> {
        self.market(contract)
            .punk_index_to_address(U256::from(index))
            .call()
            .await
            .map_err(read_call_err)
    }

    async fn offer_of(&self, contract: Address, index: u64) -> Result<Offer, GatewayError> {
        let (active, _index, seller, min_price, _only_sell_to) = self
            .market(contract)
            .punks_offered_for_sale(U256::from(index))
            .call()
            .await
            .map_err(read_call_err)?;
        Ok(Offer {
            active,
            min_price,
            seller,
        })
    }

    async fn bid_of(&self, contract: Address, index: u64) -> Result<Bid, GatewayError> {
        let (active, _index, bidder, amount) = self
            .market(contract)
            .punk_bids(U256::from(index))
            .call()
            .await
            .map_err(read_call_err)?;
        Ok(Bid {
            active,
            amount,
            bidder,
        })
    }

    async fn remaining(&self, contract: Address) -> Result<u64, GatewayError> {
        let remaining = self
            .market(contract)
            .punks_remaining_to_assign()
            .call()
            .await
            .map_err(read_call_err)?;
        Ok(remaining.as_u64())
    }

    async fn claim(
        &self,
        contract: Address,
        index: u64,
        claimant: Address,
    ) -> Result<(), GatewayError> {
        self.ensure_sender(claimant)?;
        let call = self
            .market(contract)
            .get_punk(U256::from(index))
            .gas(DEFAULT_TX_GAS);
        send_checked(call).await
    }

    async fn transfer(
        &self,
        contract: Address,
        to: Address,
        index: u64,
        from: Address,
    ) -> Result<(), GatewayError> {
        self.ensure_sender(from)?;
        let call = self
            .market(contract)
            .transfer_punk(to, U256::from(index))
            .gas(DEFAULT_TX_GAS);
        send_checked(call).await
    }

    async fn offer_for_sale(
        &self,
        contract: Address,
        index: u64,
        min_price: U256,
        from: Address,
    ) -> Result<(), GatewayError> {
        self.ensure_sender(from)?;
        let call = self
            .market(contract)
            .offer_punk_for_sale(U256::from(index), min_price)
            .gas(DEFAULT_TX_GAS);
        send_checked(call).await
    }

    async fn buy(
        &self,
        contract: Address,
        index: u64,
        value: U256,
        from: Address,
    ) -> Result<(), GatewayError> {
        self.ensure_sender(from)?;
        let call = self
            .market(contract)
            .buy_punk(U256::from(index))
            .value(value)
            .gas(DEFAULT_TX_GAS);
        send_checked(call).await
    }
}
