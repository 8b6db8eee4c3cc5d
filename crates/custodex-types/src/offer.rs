//! Offer model for the Custodex engine.
//!
//! An offer's identity is derived from its terms — see [`OfferId::derive`].
//! The remaining amount is the only mutable field; settlement shrinks it
//! until the offer closes and is deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Address, AssetId, MarketError, OfferId, Result};

/// Which side of the trade the maker takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum OfferDirection {
    Buy,
    Sell,
}

impl OfferDirection {
    /// Stable byte tag used in the identity hash.
    pub(crate) fn tag(self) -> u8 {
        match self {
            Self::Buy => 0,
            Self::Sell => 1,
        }
    }
}

impl std::fmt::Display for OfferDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// Parameters for creating a single-asset offer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OfferRequest {
    pub maker: Address,
    pub asset_contract: Address,
    pub asset_id: AssetId,
    pub amount: u128,
    pub price_per_unit: u128,
    pub direction: OfferDirection,
}

/// A live offer held by the engine.
///
/// For Buy offers the engine holds `amount * price_per_unit` in escrow for
/// the offer's lifetime. For Sell offers solvency is checked at creation
/// and again at each accept — the maker may withdraw custodied assets in
/// between, leaving the offer temporarily over-committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    pub maker: Address,
    pub asset_contract: Address,
    pub asset_id: AssetId,
    /// Remaining unfilled amount. Mutated by partial fills.
    pub amount: u128,
    pub price_per_unit: u128,
    pub direction: OfferDirection,
    /// Fillable against any asset id in the contract.
    pub is_collection: bool,
    pub created_at: DateTime<Utc>,
}

impl Offer {
    /// Build a single-asset (non-collection) offer from request parameters.
    #[must_use]
    pub fn from_request(req: OfferRequest) -> Self {
        Self {
            maker: req.maker,
            asset_contract: req.asset_contract,
            asset_id: req.asset_id,
            amount: req.amount,
            price_per_unit: req.price_per_unit,
            direction: req.direction,
            is_collection: false,
            created_at: Utc::now(),
        }
    }

    /// The content identity this offer is stored under.
    #[must_use]
    pub fn id(&self) -> OfferId {
        OfferId::derive(
            self.maker,
            self.asset_contract,
            self.asset_id,
            self.price_per_unit,
            self.direction,
            self.is_collection,
        )
    }

    /// Value of `amount` units at this offer's price.
    ///
    /// # Errors
    /// Returns `ArithmeticOverflow` if the product exceeds `u128::MAX`.
    pub fn value_of(&self, amount: u128) -> Result<u128> {
        self.price_per_unit
            .checked_mul(amount)
            .ok_or(MarketError::ArithmeticOverflow)
    }

    /// Value of the full remaining amount.
    pub fn total_value(&self) -> Result<u128> {
        self.value_of(self.amount)
    }

    #[must_use]
    pub fn is_buy(&self) -> bool {
        self.direction == OfferDirection::Buy
    }

    #[must_use]
    pub fn is_sell(&self) -> bool {
        self.direction == OfferDirection::Sell
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Offer {
    pub fn dummy_sell(
        maker: Address,
        asset_contract: Address,
        asset_id: AssetId,
        amount: u128,
        price_per_unit: u128,
    ) -> Self {
        Self {
            maker,
            asset_contract,
            asset_id,
            amount,
            price_per_unit,
            direction: OfferDirection::Sell,
            is_collection: false,
            created_at: Utc::now(),
        }
    }

    pub fn dummy_buy(
        maker: Address,
        asset_contract: Address,
        asset_id: AssetId,
        amount: u128,
        price_per_unit: u128,
    ) -> Self {
        Self {
            maker,
            asset_contract,
            asset_id,
            amount,
            price_per_unit,
            direction: OfferDirection::Buy,
            is_collection: false,
            created_at: Utc::now(),
        }
    }

    pub fn dummy_collection(
        maker: Address,
        asset_contract: Address,
        amount: u128,
        price_per_unit: u128,
    ) -> Self {
        Self {
            maker,
            asset_contract,
            asset_id: AssetId::WILDCARD,
            amount,
            price_per_unit,
            direction: OfferDirection::Buy,
            is_collection: true,
            created_at: Utc::now(),
        }
    }
}
