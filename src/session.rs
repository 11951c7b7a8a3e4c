use crate::{error::GatewayError, evm::EvmRuntime};
use ethers::types::{Address, U256};
use tracing::info;

/// The active wallet account and its layer-2 standing. The account and
/// chain never change for the lifetime of a session; the balance can be
/// re-read.
#[derive(Clone, Copy, Debug)]
pub struct AccountSession {
    account: Address,
    chain_id: u64,
    l2_balance: U256,
}

impl AccountSession {
    pub async fn establish(runtime: &EvmRuntime) -> Result<Self, GatewayError> {
        let account = runtime.account();
        let l2_balance = runtime.balance_of(account).await?;
        let session = Self {
            account,
            chain_id: runtime.chain_id(),
            l2_balance,
        };
        info!(%account, balance = %l2_balance, "session established");
        Ok(session)
    }

    pub async fn refresh_balance(&mut self, runtime: &EvmRuntime) -> Result<(), GatewayError> {
        self.l2_balance = runtime.balance_of(self.account).await?;
        Ok(())
    }

    pub fn account(&self) -> Address {
        self.account
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn l2_balance(&self) -> U256 {
        self.l2_balance
    }

    /// A zero balance cannot fund a submission; the UI refuses to deploy
    /// in that case.
    pub fn can_submit(&self) -> bool {
        !self.l2_balance.is_zero()
    }
}
