#![allow(non_snake_case)]
use funk_market::{
    gateway::MarketGateway,
    test_helpers::{
        ALREADY_OWNED, InMemoryMarket, NONE_REMAINING, OUT_OF_BOUNDS, TestContext,
        market_params,
    },
};

async fn deployed_gateway(ctx: &TestContext) -> MarketGateway<InMemoryMarket> {
    let mut gateway = MarketGateway::new(ctx.runtime());
    gateway.deploy_and_bind(&market_params()).await.unwrap();
    gateway
}

#[tokio::test]
async fn claim__assigns_punk_to_claimant() {
    let ctx = TestContext::new();
    let alice = ctx.alice();
    // given
    let gateway = deployed_gateway(&ctx).await;
    assert_eq!(4, gateway.remaining().await.unwrap());

    // when
    gateway.claim(0, alice).await.unwrap();

    // then
    assert_eq!(Some(alice), gateway.owner_of(0).await.unwrap());
    for index in 1..4 {
        assert_eq!(None, gateway.owner_of(index).await.unwrap());
    }
    assert_eq!(3, gateway.remaining().await.unwrap());
}

#[tokio::test]
async fn claim__rejects_an_already_owned_punk() {
    let ctx = TestContext::new();
    let alice = ctx.alice();
    let bob = ctx.bob();
    // given
    let gateway = deployed_gateway(&ctx).await;
    gateway.claim(2, alice).await.unwrap();

    // when
    let err = gateway.claim(2, bob).await.unwrap_err();

    // then
    assert_eq!(Some(ALREADY_OWNED), err.revert_reason());
    assert_eq!(Some(alice), gateway.owner_of(2).await.unwrap());
    assert_eq!(3, gateway.remaining().await.unwrap());
}

#[tokio::test]
async fn claim__rejects_an_out_of_bounds_index() {
    let ctx = TestContext::new();
    // given
    let gateway = deployed_gateway(&ctx).await;

    // when
    let err = gateway.claim(9, ctx.alice()).await.unwrap_err();

    // then
    assert_eq!(Some(OUT_OF_BOUNDS), err.revert_reason());
    assert_eq!(4, gateway.remaining().await.unwrap());
}

#[tokio::test]
async fn claim__fails_once_the_supply_is_exhausted() {
    let ctx = TestContext::new();
    let alice = ctx.alice();
    // given
    let gateway = deployed_gateway(&ctx).await;
    for index in 0..4 {
        gateway.claim(index, alice).await.unwrap();
    }
    assert_eq!(0, gateway.remaining().await.unwrap());

    // when
    let err = gateway.claim(1, ctx.bob()).await.unwrap_err();

    // then
    assert_eq!(Some(NONE_REMAINING), err.revert_reason());
}
