//! The atomic per-fill settlement algorithm.
//!
//! Shared by single-asset accepts and collection accepts. The bookkeeping
//! (ledger debit, offer shrink) is applied first, then the external legs
//! run with the payment last: asset moves can be compensated back into
//! custody through the same gateway, a completed payment cannot be clawed
//! back. A gateway refusal rolls everything back, so no partial settlement
//! is ever observable.

use custodex_book::OfferBook;
use custodex_ledger::DepositLedger;
use custodex_types::{Address, AssetId, AssetKind, MarketError, OfferId, Result};

use crate::gateway::{AssetTransferGateway, ValueTransferGateway};

/// Who stands where in a fill.
///
/// `seller` owns the debited deposit, `value_recipient` is paid
/// `price * amount`, and `asset_recipient` receives the units out of
/// custody. For a Buy offer the caller sells into it (maker receives the
/// asset); for a Sell offer the maker is the seller and the caller buys.
#[derive(Debug, Clone, Copy)]
pub struct FillParties {
    pub seller: Address,
    pub value_recipient: Address,
    pub asset_recipient: Address,
}

/// Outcome of one settled fill.
#[derive(Debug, Clone)]
pub struct FillReceipt {
    pub offer_id: OfferId,
    pub maker: Address,
    pub asset_contract: Address,
    pub asset_id: AssetId,
    pub kind: AssetKind,
    pub amount: u128,
    pub value: u128,
    /// Whether this fill exhausted the offer.
    pub closed: bool,
}

/// Settle one fill of `amount` units against the offer at `offer_id`.
///
/// The offer state machine is `Open(n) → Open(n-amount)`, or
/// `Open → Closed(deleted)` when the remainder reaches zero; a closed
/// offer cannot be reopened.
///
/// # Errors
/// - `OfferNotFound` if no live offer occupies the identity
/// - `InvalidAmount` if `amount` is zero, exceeds the remainder, or is
///   more than one unit of a unique asset
/// - `InsufficientDeposit` if the seller's custody cannot cover the fill
/// - `AssetTransferFailed` / `PaymentFailed` if a gateway refuses; all
///   bookkeeping and asset moves of this call have been rolled back
#[allow(clippy::too_many_arguments)]
pub fn fill(
    ledger: &mut DepositLedger,
    book: &mut OfferBook,
    assets: &mut impl AssetTransferGateway,
    value: &mut impl ValueTransferGateway,
    custody: Address,
    offer_id: OfferId,
    parties: FillParties,
    asset_id: AssetId,
    amount: u128,
) -> Result<FillReceipt> {
    if amount == 0 {
        return Err(MarketError::InvalidAmount);
    }

    let offer = book
        .get(&offer_id)
        .ok_or(MarketError::OfferNotFound(offer_id))?;
    if offer.amount < amount {
        return Err(MarketError::InvalidAmount);
    }
    let fill_value = offer.value_of(amount)?;
    let maker = offer.maker;
    let asset_contract = offer.asset_contract;
    let snapshot = offer.clone();

    // Bookkeeping: debit custody, shrink the offer, delete at zero.
    let kind = ledger.debit(parties.seller, asset_contract, asset_id, amount)?;
    if kind == AssetKind::Unique && amount != 1 {
        ledger.revert_debit(parties.seller, asset_contract, asset_id, amount, kind);
        return Err(MarketError::InvalidAmount);
    }
    let closed = match book.get_mut(&offer_id) {
        Some(live) => {
            live.amount -= amount;
            live.amount == 0
        }
        None => {
            ledger.revert_debit(parties.seller, asset_contract, asset_id, amount, kind);
            return Err(MarketError::OfferNotFound(offer_id));
        }
    };
    if closed {
        book.remove(&offer_id);
    }

    // Asset leg: hand the units out of custody by recorded kind.
    let moved = match kind {
        AssetKind::Unique => {
            assets.move_unique(asset_contract, asset_id, custody, parties.asset_recipient)
        }
        AssetKind::Batched => assets.move_batch(
            asset_contract,
            asset_id,
            custody,
            parties.asset_recipient,
            amount,
        ),
    };
    if let Err(err) = moved {
        ledger.revert_debit(parties.seller, asset_contract, asset_id, amount, kind);
        book.restore(snapshot);
        return Err(as_asset_failure(err));
    }

    // Payment leg, last: a refused payment has no effect of its own, so
    // returning the units to custody restores the pre-call world exactly.
    if let Err(err) = value.pay(parties.value_recipient, fill_value) {
        return_to_custody(
            assets,
            asset_contract,
            asset_id,
            kind,
            parties.asset_recipient,
            custody,
            amount,
            offer_id,
        );
        ledger.revert_debit(parties.seller, asset_contract, asset_id, amount, kind);
        book.restore(snapshot);
        return Err(as_payment_failure(err));
    }

    tracing::debug!(
        offer_id = %offer_id,
        seller = %parties.seller,
        buyer = %parties.asset_recipient,
        asset = %asset_id,
        amount,
        value = fill_value,
        closed,
        "Fill settled"
    );

    Ok(FillReceipt {
        offer_id,
        maker,
        asset_contract,
        asset_id,
        kind,
        amount,
        value: fill_value,
        closed,
    })
}

/// Compensating transfer back into custody after a failed payment leg.
#[allow(clippy::too_many_arguments)]
pub(crate) fn return_to_custody(
    assets: &mut impl AssetTransferGateway,
    asset_contract: Address,
    asset_id: AssetId,
    kind: AssetKind,
    holder: Address,
    custody: Address,
    amount: u128,
    offer_id: OfferId,
) {
    let returned = match kind {
        AssetKind::Unique => assets.move_unique(asset_contract, asset_id, holder, custody),
        AssetKind::Batched => assets.move_batch(asset_contract, asset_id, holder, custody, amount),
    };
    if returned.is_err() {
        tracing::warn!(
            offer_id = %offer_id,
            asset = %asset_id,
            amount,
            "Compensating return to custody refused"
        );
    }
}

/// Normalize a value-gateway refusal to `PaymentFailed`.
pub(crate) fn as_payment_failure(err: MarketError) -> MarketError {
    match err {
        MarketError::PaymentFailed { .. } => err,
        other => MarketError::PaymentFailed {
            reason: other.to_string(),
        },
    }
}

/// Normalize an asset-gateway refusal to `AssetTransferFailed`.
pub(crate) fn as_asset_failure(err: MarketError) -> MarketError {
    match err {
        MarketError::AssetTransferFailed { .. } => err,
        other => MarketError::AssetTransferFailed {
            reason: other.to_string(),
        },
    }
}
