//! The marketplace facade: one object composing the deposit ledger, the
//! offer book, the transfer gateways, the re-entrancy guard, the event
//! buffer, and the custody-conservation tracker.
//!
//! Asset-arrival callbacks are intentionally unauthenticated — any caller
//! may invoke them — but the credited asset-contract identity is always
//! the reporting contract's own address, never attacker-suppliable. A
//! forged delivery can only pollute a namespace under an address the
//! forger controls; a client layer must verify the real asset-contract
//! address out of band before trusting a reported balance.

use std::collections::HashMap;

use chrono::Utc;
use custodex_book::OfferBook;
use custodex_ledger::{ConservationTracker, DepositLedger};
use custodex_types::{
    Address, AssetId, AssetKind, Deposit, MarketError, MarketEvent, Offer, OfferDirection,
    OfferId, OfferRequest, Result, constants,
};

use crate::collection::{self, CollectionRequest};
use crate::engine::{self, FillParties};
use crate::gateway::{AssetTransferGateway, ValueTransferGateway};
use crate::guard::ReentrancyGuard;

/// The custodial marketplace engine.
///
/// Execution is synchronous and one operation at a time; each public
/// operation is its own unit of atomicity. Every externally-effecting
/// operation (cancel, withdraw, accept, collection-accept) holds the
/// re-entrancy guard for its full duration.
pub struct Marketplace<A, V> {
    /// The engine's own custody address — where deposited assets sit.
    address: Address,
    ledger: DepositLedger,
    book: OfferBook,
    assets: A,
    value: V,
    guard: ReentrancyGuard,
    conservation: ConservationTracker,
    events: Vec<MarketEvent>,
    /// Value held for live Buy offers.
    escrow_held: u128,
}

impl<A: AssetTransferGateway, V: ValueTransferGateway> Marketplace<A, V> {
    /// Create a marketplace custodying assets at `address`.
    pub fn new(address: Address, assets: A, value: V) -> Self {
        Self {
            address,
            ledger: DepositLedger::new(),
            book: OfferBook::new(),
            assets,
            value,
            guard: ReentrancyGuard::new(),
            conservation: ConservationTracker::new(),
            events: Vec::new(),
            escrow_held: 0,
        }
    }

    /// The engine's custody address.
    #[must_use]
    pub fn custody_address(&self) -> Address {
        self.address
    }

    // =================================================================
    // Asset-arrival callbacks
    // =================================================================

    /// A unique asset arrived in custody: credit one unit to `from`.
    ///
    /// `asset_contract` is the reporting contract's own address.
    ///
    /// # Errors
    /// - `InvalidAssetContract` on a null contract address
    /// - `DepositKindMismatch` if the record exists as batched
    pub fn on_unique_asset_received(
        &mut self,
        asset_contract: Address,
        from: Address,
        asset_id: AssetId,
    ) -> Result<()> {
        if asset_contract.is_zero() {
            return Err(MarketError::InvalidAssetContract);
        }
        self.ledger.credit(
            from,
            asset_contract,
            asset_id,
            constants::UNIQUE_UNIT,
            AssetKind::Unique,
        )?;
        self.conservation
            .record_delivery(asset_contract, asset_id, constants::UNIQUE_UNIT);
        tracing::debug!(
            contract = %asset_contract,
            owner = %from,
            asset = %asset_id,
            "Unique asset received"
        );
        Ok(())
    }

    /// A batch of assets arrived in custody: credit each (id, amount)
    /// pair to `from` as batched units.
    ///
    /// The whole delivery is validated first, so a refused pair can never
    /// leave a partially credited batch.
    ///
    /// # Errors
    /// - `InvalidAssetContract` on a null contract address
    /// - `InvalidAmounts` on mismatched or empty pair lists
    /// - `InvalidAmount` on a zero pair amount
    /// - `DepositKindMismatch` if a record exists as unique
    pub fn on_batch_asset_received(
        &mut self,
        asset_contract: Address,
        from: Address,
        asset_ids: &[AssetId],
        amounts: &[u128],
    ) -> Result<()> {
        if asset_contract.is_zero() {
            return Err(MarketError::InvalidAssetContract);
        }
        if asset_ids.is_empty() || asset_ids.len() != amounts.len() {
            return Err(MarketError::InvalidAmounts {
                reason: format!("{} ids, {} amounts", asset_ids.len(), amounts.len()),
            });
        }
        if amounts.contains(&0) {
            return Err(MarketError::InvalidAmount);
        }
        let mut planned: HashMap<AssetId, u128> = HashMap::new();
        for (asset_id, amount) in asset_ids.iter().zip(amounts) {
            let entry = planned.entry(*asset_id).or_insert(0);
            *entry = entry
                .checked_add(*amount)
                .ok_or(MarketError::ArithmeticOverflow)?;
        }
        for (asset_id, amount) in &planned {
            if let Some(kind) = self.ledger.kind_of(from, asset_contract, *asset_id) {
                if kind != AssetKind::Batched {
                    return Err(MarketError::DepositKindMismatch {
                        recorded: kind,
                        delivered: AssetKind::Batched,
                    });
                }
            }
            self.ledger
                .balance_of(from, asset_contract, *asset_id)
                .checked_add(*amount)
                .ok_or(MarketError::ArithmeticOverflow)?;
        }

        for (asset_id, amount) in asset_ids.iter().zip(amounts) {
            self.ledger
                .credit(from, asset_contract, *asset_id, *amount, AssetKind::Batched)?;
            self.conservation
                .record_delivery(asset_contract, *asset_id, *amount);
        }
        tracing::debug!(
            contract = %asset_contract,
            owner = %from,
            pairs = asset_ids.len(),
            "Batch assets received"
        );
        Ok(())
    }

    // =================================================================
    // Offer creation
    // =================================================================

    /// Create a single-asset offer; the attached value becomes escrow for
    /// Buy offers.
    pub fn create_offer(&mut self, request: OfferRequest, attached_value: u128) -> Result<OfferId> {
        if request.direction == OfferDirection::Buy {
            self.escrow_held
                .checked_add(attached_value)
                .ok_or(MarketError::ArithmeticOverflow)?;
        }
        let offer = self.book.create_offer(&self.ledger, request, attached_value)?;
        if offer.is_buy() {
            self.escrow_held += attached_value;
        }
        let offer_id = offer.id();
        self.events.push(MarketEvent::OfferCreated {
            offer_id,
            maker: offer.maker,
            asset_contract: offer.asset_contract,
            asset_id: offer.asset_id,
            amount: offer.amount,
            price_per_unit: offer.price_per_unit,
            direction: offer.direction,
            is_collection: offer.is_collection,
            at: offer.created_at,
        });
        tracing::info!(
            offer_id = %offer_id,
            maker = %offer.maker,
            direction = %offer.direction,
            amount = offer.amount,
            price = offer.price_per_unit,
            "Offer created"
        );
        Ok(offer_id)
    }

    /// Create a collection offer (Buy-only, any id in the contract).
    pub fn create_collection_offer(
        &mut self,
        request: CollectionRequest,
        attached_value: u128,
    ) -> Result<OfferId> {
        self.escrow_held
            .checked_add(attached_value)
            .ok_or(MarketError::ArithmeticOverflow)?;
        let offer = collection::create_collection_offer(&mut self.book, request, attached_value)?;
        self.escrow_held += attached_value;
        let offer_id = offer.id();
        self.events.push(MarketEvent::OfferCreated {
            offer_id,
            maker: offer.maker,
            asset_contract: offer.asset_contract,
            asset_id: offer.asset_id,
            amount: offer.amount,
            price_per_unit: offer.price_per_unit,
            direction: offer.direction,
            is_collection: true,
            at: offer.created_at,
        });
        tracing::info!(
            offer_id = %offer_id,
            maker = %offer.maker,
            amount = offer.amount,
            price = offer.price_per_unit,
            "Collection offer created"
        );
        Ok(offer_id)
    }

    // =================================================================
    // Cancellation & withdrawal
    // =================================================================

    /// Cancel the caller's offer. Buy escrow is refunded through the value
    /// gateway; sell-side custody stays in the ledger, reclaimable via
    /// [`Self::withdraw`].
    pub fn cancel_offer(&mut self, caller: Address, offer_id: OfferId) -> Result<()> {
        let _scope = self.guard.enter()?;
        let offer = self.book.cancel(caller, offer_id)?;
        if offer.is_buy() {
            let refund = match offer.total_value() {
                Ok(refund) => refund,
                Err(err) => {
                    self.book.restore(offer);
                    return Err(err);
                }
            };
            if let Err(err) = self.value.pay(offer.maker, refund) {
                self.book.restore(offer);
                return Err(engine::as_payment_failure(err));
            }
            self.escrow_held = self.escrow_held.saturating_sub(refund);
        }
        self.events.push(MarketEvent::OfferCancelled {
            offer_id,
            maker: caller,
            at: Utc::now(),
        });
        tracing::info!(offer_id = %offer_id, maker = %caller, "Offer cancelled");
        Ok(())
    }

    /// Reclaim up to the caller's deposited balance, at any time,
    /// independent of any outstanding sell offer referencing it.
    pub fn withdraw(
        &mut self,
        caller: Address,
        asset_contract: Address,
        asset_id: AssetId,
        amount: u128,
    ) -> Result<()> {
        let _scope = self.guard.enter()?;
        Self::withdraw_from_custody(
            &mut self.ledger,
            &mut self.assets,
            &mut self.conservation,
            self.address,
            caller,
            asset_contract,
            asset_id,
            amount,
        )
    }

    /// Sell-only convenience: cancel the offer and withdraw its remaining
    /// amount in one atomic operation.
    pub fn cancel_offer_and_withdraw(&mut self, caller: Address, offer_id: OfferId) -> Result<()> {
        let _scope = self.guard.enter()?;
        match self.book.get(&offer_id) {
            None => return Err(MarketError::NotOfferCreator),
            Some(offer) if offer.maker != caller => return Err(MarketError::NotOfferCreator),
            Some(offer) if offer.is_buy() => return Err(MarketError::NotSellOffer(offer_id)),
            Some(_) => {}
        }
        let offer = self.book.cancel(caller, offer_id)?;
        let withdrawn = Self::withdraw_from_custody(
            &mut self.ledger,
            &mut self.assets,
            &mut self.conservation,
            self.address,
            caller,
            offer.asset_contract,
            offer.asset_id,
            offer.amount,
        );
        if let Err(err) = withdrawn {
            self.book.restore(offer);
            return Err(err);
        }
        self.events.push(MarketEvent::OfferCancelled {
            offer_id,
            maker: caller,
            at: Utc::now(),
        });
        tracing::info!(offer_id = %offer_id, maker = %caller, "Offer cancelled and withdrawn");
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn withdraw_from_custody(
        ledger: &mut DepositLedger,
        assets: &mut A,
        conservation: &mut ConservationTracker,
        custody: Address,
        caller: Address,
        asset_contract: Address,
        asset_id: AssetId,
        amount: u128,
    ) -> Result<()> {
        if amount == 0 {
            return Err(MarketError::InvalidAmount);
        }
        let kind = ledger.debit(caller, asset_contract, asset_id, amount)?;
        if kind == AssetKind::Unique && amount != 1 {
            ledger.revert_debit(caller, asset_contract, asset_id, amount, kind);
            return Err(MarketError::InvalidAmount);
        }
        let moved = match kind {
            AssetKind::Unique => assets.move_unique(asset_contract, asset_id, custody, caller),
            AssetKind::Batched => {
                assets.move_batch(asset_contract, asset_id, custody, caller, amount)
            }
        };
        if let Err(err) = moved {
            ledger.revert_debit(caller, asset_contract, asset_id, amount, kind);
            return Err(engine::as_asset_failure(err));
        }
        conservation.record_withdrawal(asset_contract, asset_id, amount);
        tracing::info!(
            owner = %caller,
            contract = %asset_contract,
            asset = %asset_id,
            amount,
            "Withdrawal"
        );
        Ok(())
    }

    // =================================================================
    // Acceptance
    // =================================================================

    /// Fill `amount` units of a single-asset offer.
    ///
    /// For a Buy offer the caller is the seller: attach nothing, receive
    /// the escrowed value, the maker receives the asset. For a Sell offer
    /// the caller is the buyer: attach exactly `price * amount`, the
    /// maker receives the value.
    pub fn accept_offer(
        &mut self,
        caller: Address,
        offer_id: OfferId,
        amount: u128,
        attached_value: u128,
    ) -> Result<()> {
        let _scope = self.guard.enter()?;
        let (parties, asset_id, buy_side) = {
            let offer = self
                .book
                .get(&offer_id)
                .ok_or(MarketError::OfferNotFound(offer_id))?;
            if offer.is_collection {
                return Err(MarketError::InvalidOfferType(offer_id));
            }
            match offer.direction {
                OfferDirection::Buy => {
                    if attached_value != 0 {
                        return Err(MarketError::UnnecessaryPayment {
                            attached: attached_value,
                        });
                    }
                    (
                        FillParties {
                            seller: caller,
                            value_recipient: caller,
                            asset_recipient: offer.maker,
                        },
                        offer.asset_id,
                        true,
                    )
                }
                OfferDirection::Sell => {
                    let expected = offer.value_of(amount)?;
                    if attached_value != expected {
                        return Err(MarketError::MissingPayment {
                            expected,
                            attached: attached_value,
                        });
                    }
                    (
                        FillParties {
                            seller: offer.maker,
                            value_recipient: offer.maker,
                            asset_recipient: caller,
                        },
                        offer.asset_id,
                        false,
                    )
                }
            }
        };

        let receipt = engine::fill(
            &mut self.ledger,
            &mut self.book,
            &mut self.assets,
            &mut self.value,
            self.address,
            offer_id,
            parties,
            asset_id,
            amount,
        )?;

        if buy_side {
            self.escrow_held = self.escrow_held.saturating_sub(receipt.value);
        }
        self.conservation
            .record_settlement(receipt.asset_contract, receipt.asset_id, receipt.amount);
        self.events.push(MarketEvent::OfferSettled {
            offer_id,
            maker: receipt.maker,
            taker: caller,
            asset_contract: receipt.asset_contract,
            asset_id: receipt.asset_id,
            amount: receipt.amount,
            value: receipt.value,
            closed: receipt.closed,
            at: Utc::now(),
        });
        tracing::info!(
            offer_id = %offer_id,
            taker = %caller,
            amount = receipt.amount,
            value = receipt.value,
            closed = receipt.closed,
            "Offer settled"
        );
        Ok(())
    }

    /// Fill a collection offer with the caller's (id, amount) pairs as
    /// one atomic multi-asset trade.
    pub fn accept_collection_offer(
        &mut self,
        caller: Address,
        offer_id: OfferId,
        asset_ids: &[AssetId],
        amounts: &[u128],
        attached_value: u128,
    ) -> Result<()> {
        let _scope = self.guard.enter()?;
        if attached_value != 0 {
            return Err(MarketError::UnnecessaryPayment {
                attached: attached_value,
            });
        }
        let receipts = collection::accept_collection_offer(
            &mut self.ledger,
            &mut self.book,
            &mut self.assets,
            &mut self.value,
            self.address,
            offer_id,
            caller,
            asset_ids,
            amounts,
        )?;
        for receipt in &receipts {
            self.escrow_held = self.escrow_held.saturating_sub(receipt.value);
            self.conservation
                .record_settlement(receipt.asset_contract, receipt.asset_id, receipt.amount);
            self.events.push(MarketEvent::OfferSettled {
                offer_id,
                maker: receipt.maker,
                taker: caller,
                asset_contract: receipt.asset_contract,
                asset_id: receipt.asset_id,
                amount: receipt.amount,
                value: receipt.value,
                closed: receipt.closed,
                at: Utc::now(),
            });
        }
        tracing::info!(
            offer_id = %offer_id,
            taker = %caller,
            pairs = receipts.len(),
            "Collection offer settled"
        );
        Ok(())
    }

    // =================================================================
    // Read surface
    // =================================================================

    /// Derive the identity an offer with these terms occupies. Pure and
    /// deterministic.
    #[must_use]
    pub fn offer_hash(
        maker: Address,
        asset_contract: Address,
        asset_id: AssetId,
        price_per_unit: u128,
        direction: OfferDirection,
        is_collection: bool,
    ) -> OfferId {
        OfferId::derive(
            maker,
            asset_contract,
            asset_id,
            price_per_unit,
            direction,
            is_collection,
        )
    }

    /// Look up a live offer.
    #[must_use]
    pub fn offer(&self, offer_id: &OfferId) -> Option<&Offer> {
        self.book.get(offer_id)
    }

    /// Iterate all live offers.
    pub fn offers(&self) -> impl Iterator<Item = (&OfferId, &Offer)> {
        self.book.iter()
    }

    /// Custody balance for an (owner, contract, id) key.
    #[must_use]
    pub fn balance_of(&self, owner: Address, asset_contract: Address, asset_id: AssetId) -> u128 {
        self.ledger.balance_of(owner, asset_contract, asset_id)
    }

    /// Full custody record for a key, if any.
    #[must_use]
    pub fn deposit(
        &self,
        owner: Address,
        asset_contract: Address,
        asset_id: AssetId,
    ) -> Option<&Deposit> {
        self.ledger.deposit(owner, asset_contract, asset_id)
    }

    /// Value currently held for live Buy offers.
    #[must_use]
    pub fn escrowed_value(&self) -> u128 {
        self.escrow_held
    }

    /// Take every event emitted since the last drain, in order.
    pub fn drain_events(&mut self) -> Vec<MarketEvent> {
        std::mem::take(&mut self.events)
    }

    /// Events emitted since the last drain.
    #[must_use]
    pub fn events(&self) -> &[MarketEvent] {
        &self.events
    }

    /// Verify the custody-conservation invariant for a (contract, id).
    pub fn verify_custody(&self, asset_contract: Address, asset_id: AssetId) -> Result<()> {
        self.conservation.verify(
            asset_contract,
            asset_id,
            self.ledger.total_custody(asset_contract, asset_id),
        )
    }

    /// The re-entrancy guard (exposed for embedding layers and tests).
    #[must_use]
    pub fn guard(&self) -> &ReentrancyGuard {
        &self.guard
    }

    /// The asset gateway.
    #[must_use]
    pub fn assets(&self) -> &A {
        &self.assets
    }

    /// Mutable access to the asset gateway.
    pub fn assets_mut(&mut self) -> &mut A {
        &mut self.assets
    }

    /// The value gateway.
    #[must_use]
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Mutable access to the value gateway.
    pub fn value_mut(&mut self) -> &mut V {
        &mut self.value
    }
}
