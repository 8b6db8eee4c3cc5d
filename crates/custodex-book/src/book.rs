//! Content-addressed offer storage with creation and cancellation.
//!
//! At most one live offer occupies a given identity at any time. Creating
//! a second offer at an occupied identity fails instead of silently
//! overwriting — an overwrite would strand the live offer's escrow.

use std::collections::HashMap;

use custodex_ledger::DepositLedger;
use custodex_types::{
    Address, MarketError, Offer, OfferDirection, OfferId, OfferRequest, Result,
};

/// The offer store.
#[derive(Debug, Default)]
pub struct OfferBook {
    /// Live offers indexed by their content identity.
    offers: HashMap<OfferId, Offer>,
}

impl OfferBook {
    /// Create a new empty book.
    #[must_use]
    pub fn new() -> Self {
        Self {
            offers: HashMap::new(),
        }
    }

    /// Validate and store a single-asset offer.
    ///
    /// Buy offers must attach exactly `amount * price_per_unit`, which the
    /// engine then holds in escrow. Sell offers attach nothing and must be
    /// solvent in the ledger at creation time — solvency is re-checked at
    /// each accept, not reserved, so the maker stays free to withdraw.
    ///
    /// # Errors
    /// - `InvalidAssetContract` / `InvalidAmount` / `InvalidPrice` on
    ///   malformed parameters
    /// - `MissingPayment` / `UnnecessaryPayment` on escrow mismatch
    /// - `InsufficientDeposit` if a sell maker lacks the offered balance
    /// - `OfferAlreadyExists` if a live offer occupies the identity
    pub fn create_offer(
        &mut self,
        ledger: &DepositLedger,
        request: OfferRequest,
        attached_value: u128,
    ) -> Result<Offer> {
        if request.asset_contract.is_zero() {
            return Err(MarketError::InvalidAssetContract);
        }
        if request.amount == 0 {
            return Err(MarketError::InvalidAmount);
        }
        if request.price_per_unit == 0 {
            return Err(MarketError::InvalidPrice);
        }

        let offer = Offer::from_request(request);
        let escrow = offer.total_value()?;
        match offer.direction {
            OfferDirection::Buy => {
                if attached_value != escrow {
                    return Err(MarketError::MissingPayment {
                        expected: escrow,
                        attached: attached_value,
                    });
                }
            }
            OfferDirection::Sell => {
                if attached_value != 0 {
                    return Err(MarketError::UnnecessaryPayment {
                        attached: attached_value,
                    });
                }
                let available =
                    ledger.balance_of(request.maker, request.asset_contract, request.asset_id);
                if available < request.amount {
                    return Err(MarketError::InsufficientDeposit {
                        needed: request.amount,
                        available,
                    });
                }
            }
        }

        self.insert(offer)
    }

    /// Store an already-validated offer under its content identity.
    ///
    /// # Errors
    /// Returns `OfferAlreadyExists` if a live offer occupies the identity.
    pub fn insert(&mut self, offer: Offer) -> Result<Offer> {
        let offer_id = offer.id();
        if self.offers.contains_key(&offer_id) {
            return Err(MarketError::OfferAlreadyExists(offer_id));
        }
        tracing::debug!(
            offer_id = %offer_id,
            maker = %offer.maker,
            direction = %offer.direction,
            amount = offer.amount,
            price = offer.price_per_unit,
            collection = offer.is_collection,
            "Offer stored"
        );
        self.offers.insert(offer_id, offer.clone());
        Ok(offer)
    }

    /// Remove the caller's offer, returning it.
    ///
    /// A missing offer also resolves to `NotOfferCreator`: the maker of
    /// nothing is nobody.
    ///
    /// # Errors
    /// Returns `NotOfferCreator` unless a live offer exists at `offer_id`
    /// with `caller` as its maker.
    pub fn cancel(&mut self, caller: Address, offer_id: OfferId) -> Result<Offer> {
        let Some(offer) = self.offers.get(&offer_id) else {
            return Err(MarketError::NotOfferCreator);
        };
        if offer.maker != caller {
            return Err(MarketError::NotOfferCreator);
        }
        let offer = self
            .offers
            .remove(&offer_id)
            .ok_or(MarketError::NotOfferCreator)?;
        tracing::debug!(offer_id = %offer_id, maker = %caller, "Offer cancelled");
        Ok(offer)
    }

    /// Reinstate an offer snapshot taken before a failed settlement or a
    /// failed cancellation refund.
    pub fn restore(&mut self, offer: Offer) {
        self.offers.insert(offer.id(), offer);
    }

    /// Remove an offer unconditionally (settlement closing it).
    pub fn remove(&mut self, offer_id: &OfferId) -> Option<Offer> {
        self.offers.remove(offer_id)
    }

    /// Look up a live offer.
    #[must_use]
    pub fn get(&self, offer_id: &OfferId) -> Option<&Offer> {
        self.offers.get(offer_id)
    }

    /// Mutable access to a live offer (partial fills shrink the amount).
    pub fn get_mut(&mut self, offer_id: &OfferId) -> Option<&mut Offer> {
        self.offers.get_mut(offer_id)
    }

    /// Whether a live offer occupies the identity.
    #[must_use]
    pub fn contains(&self, offer_id: &OfferId) -> bool {
        self.offers.contains_key(offer_id)
    }

    /// Number of live offers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.offers.len()
    }

    /// Whether the book is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offers.is_empty()
    }

    /// Iterate all live offers.
    pub fn iter(&self) -> impl Iterator<Item = (&OfferId, &Offer)> {
        self.offers.iter()
    }

    /// Iterate the live offers of one maker.
    pub fn offers_of(&self, maker: Address) -> impl Iterator<Item = &Offer> {
        self.offers.values().filter(move |offer| offer.maker == maker)
    }
}
