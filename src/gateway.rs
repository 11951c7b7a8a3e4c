use crate::error::GatewayError;
use async_trait::async_trait;
use ethers::types::{Address, H256, U256};

/// Constructor arguments for the market contract.
#[derive(Clone, Debug)]
pub struct DeployParams {
    pub name: String,
    pub symbol: String,
    pub content_hash: String,
    pub item_count: u64,
}

/// Result of a contract-creation transaction.
#[derive(Clone, Copy, Debug)]
pub struct Deployed {
    pub address: Address,
    pub tx_hash: H256,
}

/// A punk's sale offer. Zeroed when no offer is active.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Offer {
    pub active: bool,
    pub min_price: U256,
    pub seller: Address,
}

/// A standing bid on a punk. Zeroed when no bid is active.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Bid {
    pub active: bool,
    pub amount: U256,
    pub bidder: Address,
}

/// Transport seam between the gateway and the chain. Implementations own
/// ABI encoding and signing; every method is a single remote attempt with
/// no retries. Methods take the contract address explicitly so one runtime
/// can serve any binding.
#[async_trait]
pub trait MarketRuntime: Send + Sync {
    async fn deploy(&self, params: &DeployParams) -> Result<Deployed, GatewayError>;

    async fn owner_of(&self, contract: Address, index: u64) -> Result<Address, GatewayError>;

    async fn offer_of(&self, contract: Address, index: u64) -> Result<Offer, GatewayError>;

    async fn bid_of(&self, contract: Address, index: u64) -> Result<Bid, GatewayError>;

    async fn remaining(&self, contract: Address) -> Result<u64, GatewayError>;

    async fn claim(
        &self,
        contract: Address,
        index: u64,
        claimant: Address,
    ) -> Result<(), GatewayError>;

    async fn transfer(
        &self,
        contract: Address,
        to: Address,
        index: u64,
        from: Address,
    ) -> Result<(), GatewayError>;

    async fn offer_for_sale(
        &self,
        contract: Address,
        index: u64,
        min_price: U256,
        from: Address,
    ) -> Result<(), GatewayError>;

    async fn buy(
        &self,
        contract: Address,
        index: u64,
        value: U256,
        from: Address,
    ) -> Result<(), GatewayError>;
}

/// Binding between local code and one deployed market contract. The address
/// is `None` until `bind` or `deploy_and_bind` and stable until the next
/// rebind; reads never mutate it.
pub struct MarketGateway<R> {
    runtime: R,
    address: Option<Address>,
}

impl<R> MarketGateway<R> {
    pub fn new(runtime: R) -> Self {
        Self {
            runtime,
            address: None,
        }
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    pub fn address(&self) -> Option<Address> {
        self.address
    }

    pub fn is_bound(&self) -> bool {
        self.address.is_some()
    }

    /// Associates the gateway with an already-deployed contract. Local
    /// mutation only; no network call.
    pub fn bind(&mut self, raw: &str) -> Result<Address, GatewayError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(GatewayError::Bind("empty contract address".into()));
        }
        let address = trimmed
            .parse::<Address>()
            .map_err(|e| GatewayError::Bind(format!("malformed address {trimmed:?}: {e}")))?;
        if address == Address::zero() {
            return Err(GatewayError::Bind(
                "zero address is not a deployed contract".into(),
            ));
        }
        self.address = Some(address);
        Ok(address)
    }

    fn bound(&self) -> Result<Address, GatewayError> {
        self.address
            .ok_or_else(|| GatewayError::Bind("gateway is not bound to a contract".into()))
    }
}

impl<R: MarketRuntime> MarketGateway<R> {
    /// Submits the contract-creation transaction and binds to the new
    /// address in one step, so the binding is never transiently unset.
    pub async fn deploy_and_bind(
        &mut self,
        params: &DeployParams,
    ) -> Result<Deployed, GatewayError> {
        let deployed = self.runtime.deploy(params).await?;
        self.address = Some(deployed.address);
        Ok(deployed)
    }

    /// Owner of punk `index`; `None` while the punk is unassigned.
    pub async fn owner_of(&self, index: u64) -> Result<Option<Address>, GatewayError> {
        let contract = self.bound()?;
        let owner = self.runtime.owner_of(contract, index).await?;
        if crate::is_assigned(&owner) {
            Ok(Some(owner))
        } else {
            Ok(None)
        }
    }

    pub async fn offer_of(&self, index: u64) -> Result<Offer, GatewayError> {
        let contract = self.bound()?;
        self.runtime.offer_of(contract, index).await
    }

    pub async fn bid_of(&self, index: u64) -> Result<Bid, GatewayError> {
        let contract = self.bound()?;
        self.runtime.bid_of(contract, index).await
    }

    pub async fn remaining(&self) -> Result<u64, GatewayError> {
        let contract = self.bound()?;
        self.runtime.remaining(contract).await
    }

    /// Takes ownership of unassigned punk `index` for `claimant`. The
    /// contract enforces availability; its revert reason is surfaced
    /// verbatim. No local state changes on success, callers re-read.
    pub async fn claim(&self, index: u64, claimant: Address) -> Result<(), GatewayError> {
        let contract = self.bound()?;
        self.runtime.claim(contract, index, claimant).await
    }

    pub async fn transfer(
        &self,
        to: Address,
        index: u64,
        from: Address,
    ) -> Result<(), GatewayError> {
        let contract = self.bound()?;
        self.runtime.transfer(contract, to, index, from).await
    }

    pub async fn offer_for_sale(
        &self,
        index: u64,
        min_price: U256,
        from: Address,
    ) -> Result<(), GatewayError> {
        let contract = self.bound()?;
        self.runtime
            .offer_for_sale(contract, index, min_price, from)
            .await
    }

    pub async fn buy(&self, index: u64, value: U256, from: Address) -> Result<(), GatewayError> {
        let contract = self.bound()?;
        self.runtime.buy(contract, index, value, from).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::InMemoryMarket;

    fn gateway() -> MarketGateway<InMemoryMarket> {
        MarketGateway::new(InMemoryMarket::new())
    }

    #[test]
    fn bind__parses_and_trims_hex_address() {
        let mut gw = gateway();
        let addr = gw
            .bind("  0xEf948E02165551c7b9EfFCE1d5dACA0D270D5aA3  ")
            .unwrap();
        assert_eq!(gw.address(), Some(addr));
    }

    #[test]
    fn bind__rejects_malformed_address() {
        let mut gw = gateway();
        let err = gw.bind("not-an-address").unwrap_err();
        assert!(matches!(err, GatewayError::Bind(_)));
        assert!(gw.address().is_none());
    }

    #[test]
    fn bind__rejects_zero_address() {
        let mut gw = gateway();
        let err = gw
            .bind("0x0000000000000000000000000000000000000000")
            .unwrap_err();
        assert!(matches!(err, GatewayError::Bind(_)));
    }

    #[test]
    fn bind__rebind_replaces_previous_binding() {
        let mut gw = gateway();
        let first = gw.bind("0xEf948E02165551c7b9EfFCE1d5dACA0D270D5aA3").unwrap();
        let second = gw.bind("0xC517f5b092154072EF94ddFcAA02D920e4F6aEdF").unwrap();
        assert_ne!(first, second);
        assert_eq!(gw.address(), Some(second));
    }

    #[tokio::test]
    async fn reads__require_a_binding() {
        let gw = gateway();
        let err = gw.owner_of(0).await.unwrap_err();
        assert!(matches!(err, GatewayError::Bind(_)));
    }
}
