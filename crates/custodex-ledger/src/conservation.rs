//! Custody conservation invariant checker.
//!
//! Mathematical invariant enforced over the ledger:
//! ```text
//! ∀ (contract, id): Σ over owners (balance) == delivered − withdrawn − settled
//! ```
//!
//! Settlement hands units out of custody to the buyer, so settled units
//! leave the ledger exactly like withdrawals. If this invariant ever
//! breaks, the engine's bookkeeping has lost or minted assets.

use std::collections::HashMap;

use custodex_types::{Address, AssetId, MarketError, Result};

type AssetKey = (Address, AssetId);

/// Tracks per-(contract, id) custody flow totals and validates the ledger
/// against them.
#[derive(Debug, Default)]
pub struct ConservationTracker {
    /// Units delivered into custody since genesis.
    delivered: HashMap<AssetKey, u128>,
    /// Units withdrawn by their owners since genesis.
    withdrawn: HashMap<AssetKey, u128>,
    /// Units handed to buyers through settlement since genesis.
    settled: HashMap<AssetKey, u128>,
}

impl ConservationTracker {
    /// Create a new tracker.
    #[must_use]
    pub fn new() -> Self {
        Self {
            delivered: HashMap::new(),
            withdrawn: HashMap::new(),
            settled: HashMap::new(),
        }
    }

    /// Record a delivery into custody.
    pub fn record_delivery(&mut self, asset_contract: Address, asset_id: AssetId, amount: u128) {
        *self
            .delivered
            .entry((asset_contract, asset_id))
            .or_insert(0) += amount;
    }

    /// Record a withdrawal out of custody.
    pub fn record_withdrawal(&mut self, asset_contract: Address, asset_id: AssetId, amount: u128) {
        *self
            .withdrawn
            .entry((asset_contract, asset_id))
            .or_insert(0) += amount;
    }

    /// Record units settled out of custody to a buyer.
    pub fn record_settlement(&mut self, asset_contract: Address, asset_id: AssetId, amount: u128) {
        *self.settled.entry((asset_contract, asset_id)).or_insert(0) += amount;
    }

    /// Expected custody total: delivered − withdrawn − settled.
    #[must_use]
    pub fn expected_custody(&self, asset_contract: Address, asset_id: AssetId) -> u128 {
        let key = (asset_contract, asset_id);
        let delivered = self.delivered.get(&key).copied().unwrap_or(0);
        let withdrawn = self.withdrawn.get(&key).copied().unwrap_or(0);
        let settled = self.settled.get(&key).copied().unwrap_or(0);
        delivered
            .saturating_sub(withdrawn)
            .saturating_sub(settled)
    }

    /// Verify that the actual custody total (sum of all owners' balances)
    /// matches the expected total for a (contract, id).
    ///
    /// # Errors
    /// Returns `CustodyInvariantViolation` if actual ≠ expected.
    pub fn verify(&self, asset_contract: Address, asset_id: AssetId, actual: u128) -> Result<()> {
        let expected = self.expected_custody(asset_contract, asset_id);
        if actual != expected {
            let key = (asset_contract, asset_id);
            return Err(MarketError::CustodyInvariantViolation {
                reason: format!(
                    "{asset_contract}/{asset_id}: actual custody {actual} != expected {expected} \
                     (delivered={}, withdrawn={}, settled={})",
                    self.delivered.get(&key).copied().unwrap_or(0),
                    self.withdrawn.get(&key).copied().unwrap_or(0),
                    self.settled.get(&key).copied().unwrap_or(0),
                ),
            });
        }
        Ok(())
    }

    /// Total units delivered for a (contract, id).
    #[must_use]
    pub fn total_delivered(&self, asset_contract: Address, asset_id: AssetId) -> u128 {
        self.delivered
            .get(&(asset_contract, asset_id))
            .copied()
            .unwrap_or(0)
    }

    /// Total units withdrawn for a (contract, id).
    #[must_use]
    pub fn total_withdrawn(&self, asset_contract: Address, asset_id: AssetId) -> u128 {
        self.withdrawn
            .get(&(asset_contract, asset_id))
            .copied()
            .unwrap_or(0)
    }

    /// Total units settled for a (contract, id).
    #[must_use]
    pub fn total_settled(&self, asset_contract: Address, asset_id: AssetId) -> u128 {
        self.settled
            .get(&(asset_contract, asset_id))
            .copied()
            .unwrap_or(0)
    }
}
