//! # custodex-settlement
//!
//! The settlement plane of the Custodex engine: the atomic fill algorithm,
//! collection-offer matching, the external transfer gateways, and the
//! [`Marketplace`] facade that composes the whole engine.
//!
//! ## Fill algorithm
//!
//! Every accept — single-asset or collection — runs the same per-fill core:
//! 1. Check the fill against the offer's remaining amount
//! 2. Debit the seller's custody (checked, record removed at zero)
//! 3. Shrink the offer; delete it when the remainder reaches zero
//! 4. Hand the units out of custody through the asset gateway, using the
//!    deposit's recorded kind to pick the transfer mode
//! 5. Pay `price * amount` through the value gateway, last — a refusal
//!    here returns the units to custody and rolls back steps 2–3
//!
//! A failure at any step aborts the whole call; no partial settlement is
//! ever externally observable.
//!
//! ## Re-entrancy
//!
//! Gateways may run arbitrary external code. Every externally-effecting
//! operation holds the [`ReentrancyGuard`] for its full duration, so the
//! mid-flight ledger states (debited but not yet transferred) can never be
//! re-entered.

pub mod collection;
pub mod engine;
pub mod gateway;
pub mod guard;
pub mod marketplace;

pub use collection::CollectionRequest;
pub use engine::{FillParties, FillReceipt};
pub use gateway::{
    AssetTransferGateway, InMemoryAssetGateway, InMemoryValueGateway, ValueTransferGateway,
};
pub use guard::ReentrancyGuard;
pub use marketplace::Marketplace;
