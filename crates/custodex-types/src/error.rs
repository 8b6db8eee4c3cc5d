//! Error types for the Custodex engine.
//!
//! All errors use the `CX_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: validation (malformed caller input, no state change)
//! - 2xx: payment mismatch (attached value vs. required escrow)
//! - 3xx: custody (ledger balance / kind)
//! - 4xx: authorization
//! - 5xx: offer identity / lookup
//! - 6xx: downstream transfer failure
//! - 7xx: re-entrancy
//! - 8xx: invariant violation
//! - 9xx: internal

use thiserror::Error;

use crate::{AssetKind, OfferId};

/// Central error enum for all Custodex operations.
///
/// Every operation is all-or-nothing: an error means no state changed and
/// no transfer is externally observable. Nothing is retried internally.
#[derive(Debug, Error)]
pub enum MarketError {
    // =================================================================
    // Validation (1xx)
    // =================================================================
    /// The asset contract address is the null address.
    #[error("CX_ERR_100: Invalid asset contract: null address")]
    InvalidAssetContract,

    /// A zero amount, or a fill exceeding the offer's remainder.
    #[error("CX_ERR_101: Invalid amount")]
    InvalidAmount,

    /// A price of zero was supplied.
    #[error("CX_ERR_102: Invalid price")]
    InvalidPrice,

    /// The ids/amounts pair lists are mismatched or empty.
    #[error("CX_ERR_103: Invalid amounts: {reason}")]
    InvalidAmounts { reason: String },

    // =================================================================
    // Payment mismatch (2xx)
    // =================================================================
    /// Attached value does not equal the required escrow or payment.
    #[error("CX_ERR_200: Missing payment: expected {expected}, attached {attached}")]
    MissingPayment { expected: u128, attached: u128 },

    /// Value was attached to an operation that takes none.
    #[error("CX_ERR_201: Unnecessary payment: attached {attached}")]
    UnnecessaryPayment { attached: u128 },

    // =================================================================
    // Custody (3xx)
    // =================================================================
    /// The ledger lacks sufficient balance at the time of the check.
    #[error("CX_ERR_300: Insufficient deposit: need {needed}, have {available}")]
    InsufficientDeposit { needed: u128, available: u128 },

    /// A delivery reported a different asset kind than the existing record.
    #[error("CX_ERR_301: Deposit kind mismatch: recorded {recorded}, delivered {delivered}")]
    DepositKindMismatch {
        recorded: AssetKind,
        delivered: AssetKind,
    },

    // =================================================================
    // Authorization (4xx)
    // =================================================================
    /// The caller is not the offer's maker — or there is no such offer,
    /// in which case the maker resolves empty and nobody is authorized.
    #[error("CX_ERR_400: Caller is not the offer creator")]
    NotOfferCreator,

    /// The operation applies to sell offers only.
    #[error("CX_ERR_401: Not a sell offer: {0}")]
    NotSellOffer(OfferId),

    // =================================================================
    // Offer identity / lookup (5xx)
    // =================================================================
    /// A live offer already occupies this identity. Rejected outright —
    /// silently overwriting would strand the existing offer's escrow.
    #[error("CX_ERR_500: Offer already exists: {0}")]
    OfferAlreadyExists(OfferId),

    /// No live offer at this identity.
    #[error("CX_ERR_501: Offer not found: {0}")]
    OfferNotFound(OfferId),

    /// The referenced offer is not a collection offer.
    #[error("CX_ERR_502: Invalid offer type: {0} is not a collection offer")]
    InvalidOfferType(OfferId),

    // =================================================================
    // Downstream transfer failure (6xx)
    // =================================================================
    /// The value-transfer collaborator rejected a payment. All ledger and
    /// offer mutations of the failed call have been rolled back.
    #[error("CX_ERR_600: Payment failed: {reason}")]
    PaymentFailed { reason: String },

    /// The asset-transfer collaborator rejected a transfer. All ledger and
    /// offer mutations of the failed call have been rolled back.
    #[error("CX_ERR_601: Asset transfer failed: {reason}")]
    AssetTransferFailed { reason: String },

    // =================================================================
    // Re-entrancy (7xx)
    // =================================================================
    /// A guarded operation was entered while another was mid-flight.
    #[error("CX_ERR_700: Re-entrant call rejected")]
    ReentrantCall,

    // =================================================================
    // Invariant violation (8xx)
    // =================================================================
    /// Custody totals diverged from delivered - withdrawn - settled.
    #[error("CX_ERR_800: Custody invariant violation: {reason}")]
    CustodyInvariantViolation { reason: String },

    // =================================================================
    // Internal (9xx)
    // =================================================================
    /// An amount x price computation overflowed.
    #[error("CX_ERR_900: Arithmetic overflow")]
    ArithmeticOverflow,
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, MarketError>;
