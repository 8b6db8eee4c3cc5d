//! Collection offers: buy offers fillable against any asset id within a
//! contract.
//!
//! A collection offer is stored under the wildcard asset id and filled
//! with caller-supplied concrete ids, decrementing one shared remaining
//! amount cumulatively. An accept spanning several (id, amount) pairs is
//! one atomic multi-asset trade: everything is validated before anything
//! mutates, the aggregate payment runs last, and a failure anywhere
//! leaves no pair's transfer observable.

use std::collections::HashMap;

use chrono::Utc;
use custodex_book::OfferBook;
use custodex_ledger::DepositLedger;
use custodex_types::{
    Address, AssetId, AssetKind, MarketError, Offer, OfferDirection, OfferId, Result,
};
use serde::{Deserialize, Serialize};

use crate::engine::{FillReceipt, as_asset_failure, as_payment_failure, return_to_custody};
use crate::gateway::{AssetTransferGateway, ValueTransferGateway};

/// Parameters for creating a collection offer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CollectionRequest {
    pub maker: Address,
    pub asset_contract: Address,
    pub amount: u128,
    pub price_per_unit: u128,
}

/// Validate and store a collection offer.
///
/// Collection offers are Buy-only: the maker escrows the full
/// `amount * price_per_unit` and takers deliver custodied assets of their
/// choosing against it.
///
/// # Errors
/// - `InvalidAssetContract` / `InvalidAmount` / `InvalidPrice` on
///   malformed parameters
/// - `MissingPayment` if the attached value does not equal the escrow
/// - `OfferAlreadyExists` if a live collection offer occupies the identity
pub fn create_collection_offer(
    book: &mut OfferBook,
    request: CollectionRequest,
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

    let offer = Offer {
        maker: request.maker,
        asset_contract: request.asset_contract,
        asset_id: AssetId::WILDCARD,
        amount: request.amount,
        price_per_unit: request.price_per_unit,
        direction: OfferDirection::Buy,
        is_collection: true,
        created_at: Utc::now(),
    };
    let escrow = offer.total_value()?;
    if attached_value != escrow {
        return Err(MarketError::MissingPayment {
            expected: escrow,
            attached: attached_value,
        });
    }

    book.insert(offer)
}

/// Fill a collection offer with the caller's (id, amount) pairs.
///
/// The caller is the seller for every pair: their custody is debited, each
/// pair's units are handed out of custody to the offer's maker, and the
/// aggregate value is paid to the caller in one payment.
///
/// # Errors
/// - `OfferNotFound` / `InvalidOfferType` if the offer is missing or not
///   collection-flagged
/// - `InvalidAmounts` if the pair lists are mismatched or empty
/// - `InvalidAmount` on a zero pair amount, a multi-unit pair against a
///   unique deposit, or a cumulative total exceeding the offer's remainder
/// - `InsufficientDeposit` if any pair (same-id pairs accumulated) is not
///   covered by the caller's custody
/// - `AssetTransferFailed` / `PaymentFailed` on gateway refusal; all
///   bookkeeping and asset moves of this call have been rolled back
#[allow(clippy::too_many_arguments, clippy::too_many_lines)]
pub fn accept_collection_offer(
    ledger: &mut DepositLedger,
    book: &mut OfferBook,
    assets: &mut impl AssetTransferGateway,
    value: &mut impl ValueTransferGateway,
    custody: Address,
    offer_id: OfferId,
    taker: Address,
    asset_ids: &[AssetId],
    amounts: &[u128],
) -> Result<Vec<FillReceipt>> {
    let offer = book
        .get(&offer_id)
        .ok_or(MarketError::OfferNotFound(offer_id))?;
    if !offer.is_collection {
        return Err(MarketError::InvalidOfferType(offer_id));
    }
    if asset_ids.is_empty() || asset_ids.len() != amounts.len() {
        return Err(MarketError::InvalidAmounts {
            reason: format!("{} ids, {} amounts", asset_ids.len(), amounts.len()),
        });
    }
    if amounts.contains(&0) {
        return Err(MarketError::InvalidAmount);
    }

    // Validation pass: cumulative total against the remainder, and per-id
    // solvency with same-id pairs accumulated. Nothing mutates until every
    // pair is known to clear.
    let mut total: u128 = 0;
    let mut needed_per_id: HashMap<AssetId, u128> = HashMap::new();
    for (asset_id, amount) in asset_ids.iter().zip(amounts) {
        total = total
            .checked_add(*amount)
            .ok_or(MarketError::ArithmeticOverflow)?;
        let needed = needed_per_id.entry(*asset_id).or_insert(0);
        *needed = needed
            .checked_add(*amount)
            .ok_or(MarketError::ArithmeticOverflow)?;
        if ledger.kind_of(taker, offer.asset_contract, *asset_id) == Some(AssetKind::Unique)
            && *amount != 1
        {
            return Err(MarketError::InvalidAmount);
        }
    }
    if total > offer.amount {
        return Err(MarketError::InvalidAmount);
    }
    let total_value = offer.value_of(total)?;
    let maker = offer.maker;
    let asset_contract = offer.asset_contract;
    let price_per_unit = offer.price_per_unit;
    let snapshot = offer.clone();

    for (asset_id, needed) in &needed_per_id {
        let available = ledger.balance_of(taker, asset_contract, *asset_id);
        if available < *needed {
            return Err(MarketError::InsufficientDeposit {
                needed: *needed,
                available,
            });
        }
    }

    // Bookkeeping: debit every pair, then shrink the offer once by the
    // cumulative total.
    let mut debited: Vec<(AssetId, u128, AssetKind)> = Vec::with_capacity(asset_ids.len());
    for (asset_id, amount) in asset_ids.iter().zip(amounts) {
        match ledger.debit(taker, asset_contract, *asset_id, *amount) {
            Ok(kind) => debited.push((*asset_id, *amount, kind)),
            Err(err) => {
                revert_debits(ledger, taker, asset_contract, &debited);
                return Err(err);
            }
        }
    }
    let closed = match book.get_mut(&offer_id) {
        Some(live) => {
            live.amount -= total;
            live.amount == 0
        }
        None => {
            revert_debits(ledger, taker, asset_contract, &debited);
            return Err(MarketError::OfferNotFound(offer_id));
        }
    };
    if closed {
        book.remove(&offer_id);
    }

    // Asset legs: hand each pair out of custody to the maker. On refusal,
    // already-moved pairs come back before the bookkeeping rolls back.
    for (index, (asset_id, amount, kind)) in debited.iter().enumerate() {
        let moved = match kind {
            AssetKind::Unique => assets.move_unique(asset_contract, *asset_id, custody, maker),
            AssetKind::Batched => {
                assets.move_batch(asset_contract, *asset_id, custody, maker, *amount)
            }
        };
        if let Err(err) = moved {
            for (prev_id, prev_amount, prev_kind) in &debited[..index] {
                return_to_custody(
                    assets,
                    asset_contract,
                    *prev_id,
                    *prev_kind,
                    maker,
                    custody,
                    *prev_amount,
                    offer_id,
                );
            }
            revert_debits(ledger, taker, asset_contract, &debited);
            book.restore(snapshot);
            return Err(as_asset_failure(err));
        }
    }

    // Payment leg, last: one aggregate payment to the seller. A refusal
    // returns every pair to custody and restores the pre-call world.
    if let Err(err) = value.pay(taker, total_value) {
        for (asset_id, amount, kind) in &debited {
            return_to_custody(
                assets,
                asset_contract,
                *asset_id,
                *kind,
                maker,
                custody,
                *amount,
                offer_id,
            );
        }
        revert_debits(ledger, taker, asset_contract, &debited);
        book.restore(snapshot);
        return Err(as_payment_failure(err));
    }

    tracing::debug!(
        offer_id = %offer_id,
        taker = %taker,
        pairs = asset_ids.len(),
        total,
        value = total_value,
        closed,
        "Collection fill settled"
    );

    let last = debited.len() - 1;
    Ok(debited
        .into_iter()
        .enumerate()
        .map(|(index, (asset_id, amount, kind))| FillReceipt {
            offer_id,
            maker,
            asset_contract,
            asset_id,
            kind,
            amount,
            value: price_per_unit * amount,
            closed: closed && index == last,
        })
        .collect())
}

fn revert_debits(
    ledger: &mut DepositLedger,
    taker: Address,
    asset_contract: Address,
    debited: &[(AssetId, u128, AssetKind)],
) {
    for (asset_id, amount, kind) in debited {
        ledger.revert_debit(taker, asset_contract, *asset_id, *amount, *kind);
    }
}
