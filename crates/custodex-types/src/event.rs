//! Observable market events.
//!
//! One event per successful state transition — creation, cancellation, and
//! each settled fill. Failed operations emit nothing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Address, AssetId, OfferDirection, OfferId};

/// A signal emitted by the marketplace after a successful transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketEvent {
    /// A new offer was stored.
    OfferCreated {
        offer_id: OfferId,
        maker: Address,
        asset_contract: Address,
        asset_id: AssetId,
        amount: u128,
        price_per_unit: u128,
        direction: OfferDirection,
        is_collection: bool,
        at: DateTime<Utc>,
    },
    /// An offer was removed by its maker.
    OfferCancelled {
        offer_id: OfferId,
        maker: Address,
        at: DateTime<Utc>,
    },
    /// A fill settled against an offer. Collection accepts emit one per
    /// (id, amount) pair, each naming the concrete asset id filled.
    OfferSettled {
        offer_id: OfferId,
        maker: Address,
        taker: Address,
        asset_contract: Address,
        asset_id: AssetId,
        amount: u128,
        value: u128,
        /// Whether this fill exhausted the offer.
        closed: bool,
        at: DateTime<Utc>,
    },
}

impl MarketEvent {
    /// The offer this event concerns.
    #[must_use]
    pub fn offer_id(&self) -> OfferId {
        match self {
            Self::OfferCreated { offer_id, .. }
            | Self::OfferCancelled { offer_id, .. }
            | Self::OfferSettled { offer_id, .. } => *offer_id,
        }
    }
}
