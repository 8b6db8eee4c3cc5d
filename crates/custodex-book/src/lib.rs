//! # custodex-book
//!
//! The offer store of the Custodex engine.
//!
//! Offers live under content-derived identities ([`custodex_types::OfferId`]),
//! so the same terms always resolve to the same slot. The book enforces the
//! at-most-one-live-offer-per-identity invariant and performs the full
//! creation validation ladder, consulting the deposit ledger for sell-side
//! solvency.

pub mod book;

pub use book::OfferBook;
