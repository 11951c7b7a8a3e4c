#![allow(non_snake_case)]
use ethers::types::U256;
use funk_market::{
    gateway::{MarketGateway, Offer},
    test_helpers::{
        InMemoryMarket, NOT_FOR_SALE, NOT_OFFERER, NOT_TRANSFERER, SALE_PRICE_NOT_MET,
        TestContext, market_params,
    },
};

async fn deployed_gateway(ctx: &TestContext) -> MarketGateway<InMemoryMarket> {
    let mut gateway = MarketGateway::new(ctx.runtime());
    gateway.deploy_and_bind(&market_params()).await.unwrap();
    gateway
}

#[tokio::test]
async fn transfer__moves_ownership() {
    let ctx = TestContext::new();
    let alice = ctx.alice();
    let bob = ctx.bob();
    // given
    let gateway = deployed_gateway(&ctx).await;
    gateway.claim(0, alice).await.unwrap();

    // when
    gateway.transfer(bob, 0, alice).await.unwrap();

    // then
    assert_eq!(Some(bob), gateway.owner_of(0).await.unwrap());
}

#[tokio::test]
async fn transfer__rejects_a_sender_who_does_not_own_the_punk() {
    let ctx = TestContext::new();
    let alice = ctx.alice();
    let bob = ctx.bob();
    // given
    let gateway = deployed_gateway(&ctx).await;
    gateway.claim(0, alice).await.unwrap();

    // when
    let err = gateway.transfer(alice, 0, bob).await.unwrap_err();

    // then
    assert_eq!(Some(NOT_TRANSFERER), err.revert_reason());
    assert_eq!(Some(alice), gateway.owner_of(0).await.unwrap());
}

#[tokio::test]
async fn transfer__clears_a_standing_offer() {
    let ctx = TestContext::new();
    let alice = ctx.alice();
    let bob = ctx.bob();
    // given
    let gateway = deployed_gateway(&ctx).await;
    gateway.claim(0, alice).await.unwrap();
    gateway
        .offer_for_sale(0, U256::from(500), alice)
        .await
        .unwrap();

    // when
    gateway.transfer(bob, 0, alice).await.unwrap();

    // then
    assert_eq!(Offer::default(), gateway.offer_of(0).await.unwrap());
}

#[tokio::test]
async fn offer_for_sale__records_the_offer() {
    let ctx = TestContext::new();
    let alice = ctx.alice();
    // given
    let gateway = deployed_gateway(&ctx).await;
    gateway.claim(3, alice).await.unwrap();

    // when
    gateway
        .offer_for_sale(3, U256::from(1_000), alice)
        .await
        .unwrap();

    // then
    let offer = gateway.offer_of(3).await.unwrap();
    assert!(offer.active);
    assert_eq!(U256::from(1_000), offer.min_price);
    assert_eq!(alice, offer.seller);
}

#[tokio::test]
async fn offer_for_sale__rejects_a_non_owner() {
    let ctx = TestContext::new();
    // given
    let gateway = deployed_gateway(&ctx).await;
    gateway.claim(3, ctx.alice()).await.unwrap();

    // when
    let err = gateway
        .offer_for_sale(3, U256::from(1_000), ctx.bob())
        .await
        .unwrap_err();

    // then
    assert_eq!(Some(NOT_OFFERER), err.revert_reason());
    assert!(!gateway.offer_of(3).await.unwrap().active);
}

#[tokio::test]
async fn buy__transfers_ownership_and_clears_the_offer() {
    let ctx = TestContext::new();
    let alice = ctx.alice();
    let bob = ctx.bob();
    // given
    let gateway = deployed_gateway(&ctx).await;
    gateway.claim(1, alice).await.unwrap();
    gateway
        .offer_for_sale(1, U256::from(750), alice)
        .await
        .unwrap();

    // when
    gateway.buy(1, U256::from(750), bob).await.unwrap();

    // then
    assert_eq!(Some(bob), gateway.owner_of(1).await.unwrap());
    assert_eq!(Offer::default(), gateway.offer_of(1).await.unwrap());
}

#[tokio::test]
async fn buy__rejects_a_payment_below_the_asking_price() {
    let ctx = TestContext::new();
    let alice = ctx.alice();
    let bob = ctx.bob();
    // given
    let gateway = deployed_gateway(&ctx).await;
    gateway.claim(1, alice).await.unwrap();
    gateway
        .offer_for_sale(1, U256::from(750), alice)
        .await
        .unwrap();

    // when
    let err = gateway.buy(1, U256::from(749), bob).await.unwrap_err();

    // then
    assert_eq!(Some(SALE_PRICE_NOT_MET), err.revert_reason());
    assert_eq!(Some(alice), gateway.owner_of(1).await.unwrap());
    assert!(gateway.offer_of(1).await.unwrap().active);
}

#[tokio::test]
async fn buy__rejects_a_punk_that_is_not_for_sale() {
    let ctx = TestContext::new();
    // given
    let gateway = deployed_gateway(&ctx).await;
    gateway.claim(1, ctx.alice()).await.unwrap();

    // when
    let err = gateway
        .buy(1, U256::from(1_000_000), ctx.bob())
        .await
        .unwrap_err();

    // then
    assert_eq!(Some(NOT_FOR_SALE), err.revert_reason());
    assert_eq!(Some(ctx.alice()), gateway.owner_of(1).await.unwrap());
}
