use ethers::types::Address;

pub mod client;

pub mod deployment;

pub mod error;

pub mod evm;

pub mod gateway;

pub mod session;

pub mod test_helpers;

pub mod ui;

pub mod view;

pub mod wallets;

pub mod market_types {
    use ethers::contract::abigen;

    abigen!(
        CryptoFunkMarket,
        r#"[
            function punksRemainingToAssign() view returns (uint256)
            function punkIndexToAddress(uint256) view returns (address)
            function punksOfferedForSale(uint256) view returns (bool isForSale, uint256 punkIndex, address seller, uint256 minValue, address onlySellTo)
            function punkBids(uint256) view returns (bool hasBid, uint256 punkIndex, address bidder, uint256 value)
            function getPunk(uint256 punkIndex)
            function transferPunk(address to, uint256 punkIndex)
            function offerPunkForSale(uint256 punkIndex, uint256 minSalePriceInWei)
            function buyPunk(uint256 punkIndex) payable
        ]"#
    );
}

/// Number of punks minted by the market contract at deploy time.
pub const ITEM_COUNT: u64 = 4;

/// The zero address marks a punk as unassigned in contract storage.
pub fn is_assigned(owner: &Address) -> bool {
    *owner != Address::zero()
}
