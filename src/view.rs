use crate::{
    error::GatewayError,
    gateway::{Bid, MarketGateway, MarketRuntime, Offer},
};
use ethers::types::Address;
use futures::future::try_join_all;
use std::{future::Future, time::Duration};
use tokio::time;

/// Confirmation ceiling stated by the rollup; a submission pending longer
/// than this is abandoned as timed out.
pub const SUBMISSION_TIMEOUT: Duration = Duration::from_secs(120);

/// Full re-read of the market: three parallel tables keyed by punk index.
/// Never patched incrementally; consistent with the chain only at the
/// instant of the refresh.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MarketSnapshot {
    pub owners: Vec<Option<Address>>,
    pub offers: Vec<Offer>,
    pub bids: Vec<Bid>,
    pub remaining: u64,
}

impl MarketSnapshot {
    /// Reads owner, offer and bid for every index in `[0, item_count)`.
    /// Per-index reads are independent and issued concurrently.
    /// All-or-nothing: any failed read fails the whole refresh, and the
    /// caller keeps its previous snapshot.
    pub async fn fetch<R: MarketRuntime>(
        gateway: &MarketGateway<R>,
        item_count: u64,
    ) -> Result<Self, GatewayError> {
        let owners = try_join_all((0..item_count).map(|i| gateway.owner_of(i))).await?;
        let offers = try_join_all((0..item_count).map(|i| gateway.offer_of(i))).await?;
        let bids = try_join_all((0..item_count).map(|i| gateway.bid_of(i))).await?;
        let remaining = gateway.remaining().await?;
        Ok(Self {
            owners,
            offers,
            bids,
            remaining,
        })
    }

    pub fn item_count(&self) -> usize {
        self.owners.len()
    }
}

/// UI-facing transaction lifecycle. `Pending` covers the whole submission;
/// the terminal phases are reported through `last_outcome` while the flag
/// itself always returns to `Idle`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TxPhase {
    Idle,
    Pending,
    Success,
    Failed,
    TimedOut,
}

/// Session-scoped in-flight flag, one per controller. Advisory: it gates
/// UI-triggered submissions but does not serialize programmatic callers.
#[derive(Debug)]
pub struct TxTracker {
    phase: TxPhase,
    last: TxPhase,
    timeout: Duration,
}

impl Default for TxTracker {
    fn default() -> Self {
        Self::new(SUBMISSION_TIMEOUT)
    }
}

impl TxTracker {
    pub fn new(timeout: Duration) -> Self {
        Self {
            phase: TxPhase::Idle,
            last: TxPhase::Idle,
            timeout,
        }
    }

    pub fn phase(&self) -> TxPhase {
        self.phase
    }

    pub fn last_outcome(&self) -> TxPhase {
        self.last
    }

    pub fn in_flight(&self) -> bool {
        self.phase == TxPhase::Pending
    }

    /// Runs one submission under the lifecycle flag. The flag can never be
    /// left `Pending`: expiry of the timeout yields the `TimedOut` terminal
    /// phase and the flag drops back to `Idle` on every path.
    pub async fn submit<T, F>(&mut self, fut: F) -> Result<T, GatewayError>
    where
        F: Future<Output = Result<T, GatewayError>>,
    {
        self.phase = TxPhase::Pending;
        let res = match time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => {
                self.last = TxPhase::Success;
                Ok(value)
            }
            Ok(Err(err)) => {
                self.last = TxPhase::Failed;
                Err(err)
            }
            Err(_elapsed) => {
                self.last = TxPhase::TimedOut;
                Err(GatewayError::TimedOut)
            }
        };
        self.phase = TxPhase::Idle;
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        gateway::{DeployParams, MarketGateway},
        test_helpers::{InMemoryMarket, TestContext, market_params},
    };

    async fn deployed_gateway(item_count: u64) -> MarketGateway<InMemoryMarket> {
        let mut gw = MarketGateway::new(InMemoryMarket::new());
        let params = DeployParams {
            item_count,
            ..market_params()
        };
        gw.deploy_and_bind(&params).await.unwrap();
        gw
    }

    #[tokio::test]
    async fn refresh__produces_full_tables() {
        let gw = deployed_gateway(4).await;
        let snap = MarketSnapshot::fetch(&gw, 4).await.unwrap();
        assert_eq!(snap.owners.len(), 4);
        assert_eq!(snap.offers.len(), 4);
        assert_eq!(snap.bids.len(), 4);
        assert!(snap.owners.iter().all(Option::is_none));
        assert_eq!(snap.remaining, 4);
    }

    #[tokio::test]
    async fn refresh__failed_read_leaves_previous_snapshot_in_place() {
        let ctx = TestContext::new();
        let mut gw = MarketGateway::new(ctx.runtime());
        gw.deploy_and_bind(&market_params()).await.unwrap();
        let previous = MarketSnapshot::fetch(&gw, 4).await.unwrap();

        ctx.runtime().fail_reads(true);
        let err = MarketSnapshot::fetch(&gw, 4).await.unwrap_err();
        assert!(matches!(err, GatewayError::Read(_)));

        // the caller's snapshot is untouched by the failed refresh
        assert_eq!(previous.item_count(), 4);
        ctx.runtime().fail_reads(false);
        assert_eq!(MarketSnapshot::fetch(&gw, 4).await.unwrap(), previous);
    }

    #[tokio::test]
    async fn tracker__success_returns_flag_to_idle() {
        let mut tracker = TxTracker::default();
        assert_eq!(tracker.phase(), TxPhase::Idle);
        let res = tracker.submit(async { Ok(7u64) }).await.unwrap();
        assert_eq!(res, 7);
        assert_eq!(tracker.phase(), TxPhase::Idle);
        assert_eq!(tracker.last_outcome(), TxPhase::Success);
    }

    #[tokio::test]
    async fn tracker__failure_returns_flag_to_idle() {
        let mut tracker = TxTracker::default();
        let err = tracker
            .submit(async { Err::<(), _>(GatewayError::submission("rejected")) })
            .await
            .unwrap_err();
        assert!(err.is_submission());
        assert_eq!(tracker.phase(), TxPhase::Idle);
        assert_eq!(tracker.last_outcome(), TxPhase::Failed);
    }

    #[tokio::test]
    async fn tracker__hung_submission_times_out_instead_of_sticking_pending() {
        let mut tracker = TxTracker::new(Duration::from_millis(20));
        let err = tracker
            .submit(futures::future::pending::<Result<(), GatewayError>>())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::TimedOut));
        assert_eq!(tracker.phase(), TxPhase::Idle);
        assert_eq!(tracker.last_outcome(), TxPhase::TimedOut);
    }

    proptest::proptest! {
        #[test]
        fn refresh__table_shape_matches_any_item_count(n in 1u64..=12) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .unwrap();
            rt.block_on(async {
                let gw = deployed_gateway(n).await;
                let snap = MarketSnapshot::fetch(&gw, n).await.unwrap();
                assert_eq!(snap.owners.len() as u64, n);
                assert_eq!(snap.offers.len() as u64, n);
                assert_eq!(snap.bids.len() as u64, n);
            });
        }
    }
}
