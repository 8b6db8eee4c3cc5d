//! # custodex-ledger
//!
//! The custodial balance store of the Custodex engine.
//!
//! Assets enter custody through arrival callbacks before any trade can
//! reference them (deposit-first model). This crate is the source of truth
//! for what the engine holds on whose behalf:
//!
//! 1. **`DepositLedger`**: per-(owner, contract, id) balances with checked
//!    debits and zero-balance record removal
//! 2. **`ConservationTracker`**: delivered − withdrawn − settled bookkeeping
//!    that the custody totals are verified against

pub mod conservation;
pub mod ledger;

pub use conservation::ConservationTracker;
pub use ledger::DepositLedger;
