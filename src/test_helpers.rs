use crate::{
    error::GatewayError,
    gateway::{Bid, DeployParams, Deployed, MarketRuntime, Offer},
};
use async_trait::async_trait;
use ethers::types::{Address, H256, U256};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

// Revert reasons as emitted by the market contract.
pub const ALREADY_OWNED: &str = "Punk already owned";
pub const NONE_REMAINING: &str = "No punks remaining to assign";
pub const NOT_TRANSFERER: &str = "Transferer doesn't own punk";
pub const SALE_PRICE_NOT_MET: &str = "Sale price not met";
pub const NOT_FOR_SALE: &str = "Punk not actually for sale";
pub const NOT_OFFERER: &str = "Only owner can offer punk for sale";
pub const OUT_OF_BOUNDS: &str = "Punk index out of bounds";

struct MarketState {
    item_count: u64,
    remaining: u64,
    owners: Vec<Address>,
    offers: Vec<Offer>,
    bids: Vec<Bid>,
}

impl MarketState {
    fn new(item_count: u64) -> Self {
        let n = item_count as usize;
        Self {
            item_count,
            remaining: item_count,
            owners: vec![Address::zero(); n],
            offers: vec![Offer::default(); n],
            bids: vec![Bid::default(); n],
        }
    }

    fn index(&self, index: u64) -> Result<usize, GatewayError> {
        if index < self.item_count {
            Ok(index as usize)
        } else {
            Err(GatewayError::submission(OUT_OF_BOUNDS))
        }
    }
}

struct Inner {
    markets: HashMap<Address, MarketState>,
    deploy_count: u64,
    fail_reads: bool,
}

/// In-memory stand-in for the remote contract runtime, reproducing the
/// market contract's semantics and revert reasons. Clones share state, so
/// one market can serve several gateways.
#[derive(Clone)]
pub struct InMemoryMarket {
    inner: Arc<Mutex<Inner>>,
}

impl Default for InMemoryMarket {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMarket {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                markets: HashMap::new(),
                deploy_count: 0,
                fail_reads: false,
            })),
        }
    }

    /// Makes every subsequent read fail, imitating a dropped RPC endpoint.
    pub fn fail_reads(&self, fail: bool) {
        self.inner.lock().unwrap().fail_reads = fail;
    }

    /// Test hook: records a standing bid so the bid table has content.
    pub fn place_bid(&self, contract: Address, index: u64, bidder: Address, amount: U256) {
        let mut inner = self.inner.lock().unwrap();
        let market = inner.markets.get_mut(&contract).expect("unknown contract");
        market.bids[index as usize] = Bid {
            active: true,
            amount,
            bidder,
        };
    }

    fn read<T>(
        &self,
        contract: Address,
        f: impl FnOnce(&MarketState) -> Result<T, GatewayError>,
    ) -> Result<T, GatewayError> {
        let inner = self.inner.lock().unwrap();
        if inner.fail_reads {
            return Err(GatewayError::Read("rpc endpoint unreachable".into()));
        }
        let market = inner
            .markets
            .get(&contract)
            .ok_or_else(|| GatewayError::Read(format!("no contract at {contract:#x}")))?;
        f(market)
    }

    fn write<T>(
        &self,
        contract: Address,
        f: impl FnOnce(&mut MarketState) -> Result<T, GatewayError>,
    ) -> Result<T, GatewayError> {
        let mut inner = self.inner.lock().unwrap();
        let market = inner
            .markets
            .get_mut(&contract)
            .ok_or_else(|| GatewayError::submission(format!("no contract at {contract:#x}")))?;
        f(market)
    }
}

#[async_trait]
impl MarketRuntime for InMemoryMarket {
    async fn deploy(&self, params: &DeployParams) -> Result<Deployed, GatewayError> {
        let mut inner = self.inner.lock().unwrap();
        inner.deploy_count += 1;
        let address = Address::from_low_u64_be(0xF00D_0000 + inner.deploy_count);
        inner
            .markets
            .insert(address, MarketState::new(params.item_count));
        Ok(Deployed {
            address,
            tx_hash: H256::from_low_u64_be(inner.deploy_count),
        })
    }

    async fn owner_of(&self, contract: Address, index: u64) -> Result<Address, GatewayError> {
        self.read(contract, |m| {
            let i = m.index(index).map_err(|_| GatewayError::Read(OUT_OF_BOUNDS.into()))?;
            Ok(m.owners[i])
        })
    }

    async fn offer_of(&self, contract: Address, index: u64) -> Result<Offer, GatewayError> {
        self.read(contract, |m| {
            let i = m.index(index).map_err(|_| GatewayError::Read(OUT_OF_BOUNDS.into()))?;
            Ok(m.offers[i])
        })
    }

    async fn bid_of(&self, contract: Address, index: u64) -> Result<Bid, GatewayError> {
        self.read(contract, |m| {
            let i = m.index(index).map_err(|_| GatewayError::Read(OUT_OF_BOUNDS.into()))?;
            Ok(m.bids[i])
        })
    }

    async fn remaining(&self, contract: Address) -> Result<u64, GatewayError> {
        self.read(contract, |m| Ok(m.remaining))
    }

    async fn claim(
        &self,
        contract: Address,
        index: u64,
        claimant: Address,
    ) -> Result<(), GatewayError> {
        self.write(contract, |m| {
            let i = m.index(index)?;
            if m.remaining == 0 {
                return Err(GatewayError::submission(NONE_REMAINING));
            }
            if m.owners[i] != Address::zero() {
                return Err(GatewayError::submission(ALREADY_OWNED));
            }
            m.owners[i] = claimant;
            m.remaining -= 1;
            Ok(())
        })
    }

    async fn transfer(
        &self,
        contract: Address,
        to: Address,
        index: u64,
        from: Address,
    ) -> Result<(), GatewayError> {
        self.write(contract, |m| {
            let i = m.index(index)?;
            if m.owners[i] != from {
                return Err(GatewayError::submission(NOT_TRANSFERER));
            }
            m.owners[i] = to;
            m.offers[i] = Offer::default();
            Ok(())
        })
    }

    async fn offer_for_sale(
        &self,
        contract: Address,
        index: u64,
        min_price: U256,
        from: Address,
    ) -> Result<(), GatewayError> {
        self.write(contract, |m| {
            let i = m.index(index)?;
            if m.owners[i] != from {
                return Err(GatewayError::submission(NOT_OFFERER));
            }
            m.offers[i] = Offer {
                active: true,
                min_price,
                seller: from,
            };
            Ok(())
        })
    }

    async fn buy(
        &self,
        contract: Address,
        index: u64,
        value: U256,
        from: Address,
    ) -> Result<(), GatewayError> {
        self.write(contract, |m| {
            let i = m.index(index)?;
            let offer = m.offers[i];
            if !offer.active {
                return Err(GatewayError::submission(NOT_FOR_SALE));
            }
            if value < offer.min_price {
                return Err(GatewayError::submission(SALE_PRICE_NOT_MET));
            }
            m.owners[i] = from;
            m.offers[i] = Offer::default();
            Ok(())
        })
    }
}

/// Constructor arguments of the canonical deployment.
pub fn market_params() -> DeployParams {
    DeployParams {
        name: String::from("CRYPTOFUNK"),
        symbol: String::from("☮"),
        content_hash: String::from(
            "f50027cdefc8f564d4c1fac14b5a656c5e452476e490acac827dd00e5d9b0f8e",
        ),
        item_count: 4,
    }
}

pub struct TestContext {
    runtime: InMemoryMarket,
    alice: Address,
    bob: Address,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    pub fn new() -> Self {
        Self {
            runtime: InMemoryMarket::new(),
            alice: Address::from_low_u64_be(0xA11CE),
            bob: Address::from_low_u64_be(0xB0B),
        }
    }

    pub fn runtime(&self) -> InMemoryMarket {
        self.runtime.clone()
    }

    pub fn alice(&self) -> Address {
        self.alice
    }

    pub fn bob(&self) -> Address {
        self.bob
    }
}
