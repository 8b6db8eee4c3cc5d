//! # custodex-types
//!
//! Shared types, errors, and constants for the **Custodex** custodial
//! matching engine.
//!
//! This crate is the leaf dependency of the workspace — every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`Address`], [`AssetId`], [`OfferId`]
//! - **Asset model**: [`AssetKind`], [`Deposit`]
//! - **Offer model**: [`Offer`], [`OfferDirection`], [`OfferRequest`]
//! - **Events**: [`MarketEvent`]
//! - **Errors**: [`MarketError`] with `CX_ERR_` prefix codes
//! - **Constants**: domain-separation tags and defaults

pub mod asset;
pub mod constants;
pub mod deposit;
pub mod error;
pub mod event;
pub mod ids;
pub mod offer;

// Re-export all primary types at crate root for ergonomic imports:
//   use custodex_types::{Address, AssetId, Offer, MarketError, ...};

pub use asset::*;
pub use deposit::*;
pub use error::*;
pub use event::*;
pub use ids::*;
pub use offer::*;

// Constants are accessed via `custodex_types::constants::FOO`
// (not re-exported to avoid name collisions).
