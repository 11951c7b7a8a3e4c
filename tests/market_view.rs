#![allow(non_snake_case)]
use ethers::types::U256;
use funk_market::{
    gateway::MarketGateway,
    test_helpers::{InMemoryMarket, TestContext, market_params},
    view::MarketSnapshot,
};

async fn deployed_gateway(ctx: &TestContext) -> MarketGateway<InMemoryMarket> {
    let mut gateway = MarketGateway::new(ctx.runtime());
    gateway.deploy_and_bind(&market_params()).await.unwrap();
    gateway
}

#[tokio::test]
async fn fetch__reflects_claims_offers_and_bids() {
    let ctx = TestContext::new();
    let alice = ctx.alice();
    let bob = ctx.bob();
    let runtime = ctx.runtime();
    // given
    let gateway = deployed_gateway(&ctx).await;
    let contract = gateway.address().unwrap();
    gateway.claim(0, alice).await.unwrap();
    gateway
        .offer_for_sale(0, U256::from(2_000), alice)
        .await
        .unwrap();
    runtime.place_bid(contract, 0, bob, U256::from(1_500));

    // when
    let snapshot = MarketSnapshot::fetch(&gateway, 4).await.unwrap();

    // then
    assert_eq!(4, snapshot.item_count());
    assert_eq!(Some(alice), snapshot.owners[0]);
    assert!(snapshot.owners[1..].iter().all(Option::is_none));
    assert!(snapshot.offers[0].active);
    assert_eq!(U256::from(2_000), snapshot.offers[0].min_price);
    assert!(snapshot.bids[0].active);
    assert_eq!(bob, snapshot.bids[0].bidder);
    assert_eq!(U256::from(1_500), snapshot.bids[0].amount);
    assert_eq!(3, snapshot.remaining);
    // reads never move the binding
    assert_eq!(Some(contract), gateway.address());
}

#[tokio::test]
async fn fetch__follows_a_full_claim_and_resale_round() {
    let ctx = TestContext::new();
    let alice = ctx.alice();
    let bob = ctx.bob();
    // given a fresh market
    let gateway = deployed_gateway(&ctx).await;
    let before = MarketSnapshot::fetch(&gateway, 4).await.unwrap();
    assert_eq!(4, before.remaining);
    assert!(before.owners.iter().all(Option::is_none));

    // when alice claims, lists, and bob buys
    gateway.claim(2, alice).await.unwrap();
    gateway
        .offer_for_sale(2, U256::from(10_000), alice)
        .await
        .unwrap();
    gateway.buy(2, U256::from(10_000), bob).await.unwrap();

    // then the next refresh shows the punk with bob and no standing offer
    let after = MarketSnapshot::fetch(&gateway, 4).await.unwrap();
    assert_eq!(Some(bob), after.owners[2]);
    assert!(!after.offers[2].active);
    assert_eq!(3, after.remaining);
}

#[tokio::test]
async fn fetch__fails_whole_refresh_when_any_read_fails() {
    let ctx = TestContext::new();
    let runtime = ctx.runtime();
    // given
    let gateway = deployed_gateway(&ctx).await;
    gateway.claim(0, ctx.alice()).await.unwrap();
    let good = MarketSnapshot::fetch(&gateway, 4).await.unwrap();

    // when the endpoint drops
    runtime.fail_reads(true);
    let res = MarketSnapshot::fetch(&gateway, 4).await;

    // then no partial snapshot is produced and the old one stays valid
    assert!(res.is_err());
    assert_eq!(Some(ctx.alice()), good.owners[0]);

    // and reads recover with the endpoint
    runtime.fail_reads(false);
    let again = MarketSnapshot::fetch(&gateway, 4).await.unwrap();
    assert_eq!(good, again);
}

#[tokio::test]
async fn deploy_and_bind__starts_independent_markets() {
    let ctx = TestContext::new();
    let alice = ctx.alice();
    // given two deployments over the same runtime
    let first = deployed_gateway(&ctx).await;
    let mut second = MarketGateway::new(ctx.runtime());
    second.deploy_and_bind(&market_params()).await.unwrap();
    assert_ne!(first.address(), second.address());

    // when one market sees a claim
    first.claim(0, alice).await.unwrap();

    // then the other is untouched
    assert_eq!(Some(alice), first.owner_of(0).await.unwrap());
    assert_eq!(None, second.owner_of(0).await.unwrap());
    assert_eq!(4, second.remaining().await.unwrap());
}
