//! External transfer collaborators.
//!
//! The engine's own bookkeeping is the only technology it can rely on; the
//! actual movement of assets and value is delegated to these gateways. A
//! gateway must execute each transfer atomically — fully effected or fully
//! refused — and must signal failure rather than silently dropping
//! anything. Implementations must not produce side effects before their
//! own validation passes, which is what makes the engine's bookkeeping
//! rollback sufficient on failure.

use std::collections::HashMap;

use custodex_types::{Address, AssetId, MarketError, Result};

/// Moves custodied assets between parties.
pub trait AssetTransferGateway {
    /// Move the single unit of a unique asset.
    fn move_unique(
        &mut self,
        asset_contract: Address,
        asset_id: AssetId,
        from: Address,
        to: Address,
    ) -> Result<()>;

    /// Move `amount` units of a batched asset.
    fn move_batch(
        &mut self,
        asset_contract: Address,
        asset_id: AssetId,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<()>;
}

/// Pays value out of the engine.
pub trait ValueTransferGateway {
    /// Transfer `amount` of value to `to`. Any non-success aborts the
    /// operation that requested it.
    fn pay(&mut self, to: Address, amount: u128) -> Result<()>;
}

// ---------------------------------------------------------------------------
// In-memory reference gateways
// ---------------------------------------------------------------------------

/// In-memory asset gateway tracking per-(contract, id, holder) holdings.
///
/// Used by the test suites and as a reference for what a real adapter must
/// provide. Supports scripted failure injection for rollback tests.
#[derive(Debug, Default)]
pub struct InMemoryAssetGateway {
    holdings: HashMap<(Address, AssetId, Address), u128>,
    fail_next: bool,
}

impl InMemoryAssetGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed holdings for a holder (typically the engine's custody address,
    /// mirroring the physical deposit that precedes an arrival callback).
    pub fn fund(&mut self, asset_contract: Address, asset_id: AssetId, holder: Address, amount: u128) {
        *self
            .holdings
            .entry((asset_contract, asset_id, holder))
            .or_insert(0) += amount;
    }

    /// Units a holder currently has.
    #[must_use]
    pub fn holding(&self, asset_contract: Address, asset_id: AssetId, holder: Address) -> u128 {
        self.holdings
            .get(&(asset_contract, asset_id, holder))
            .copied()
            .unwrap_or(0)
    }

    /// Make the next transfer fail; the flag clears after one use.
    pub fn fail_next_transfer(&mut self) {
        self.fail_next = true;
    }

    fn transfer(
        &mut self,
        asset_contract: Address,
        asset_id: AssetId,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<()> {
        if std::mem::take(&mut self.fail_next) {
            return Err(MarketError::AssetTransferFailed {
                reason: "injected transfer failure".into(),
            });
        }
        let from_key = (asset_contract, asset_id, from);
        let held = self.holdings.get(&from_key).copied().unwrap_or(0);
        if held < amount {
            return Err(MarketError::AssetTransferFailed {
                reason: format!("{from} holds {held} of {amount} requested"),
            });
        }
        if held == amount {
            self.holdings.remove(&from_key);
        } else {
            self.holdings.insert(from_key, held - amount);
        }
        *self.holdings.entry((asset_contract, asset_id, to)).or_insert(0) += amount;
        Ok(())
    }
}

impl AssetTransferGateway for InMemoryAssetGateway {
    fn move_unique(
        &mut self,
        asset_contract: Address,
        asset_id: AssetId,
        from: Address,
        to: Address,
    ) -> Result<()> {
        self.transfer(asset_contract, asset_id, from, to, 1)
    }

    fn move_batch(
        &mut self,
        asset_contract: Address,
        asset_id: AssetId,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<()> {
        self.transfer(asset_contract, asset_id, from, to, amount)
    }
}

/// In-memory value gateway journaling every payment.
#[derive(Debug, Default)]
pub struct InMemoryValueGateway {
    received: HashMap<Address, u128>,
    journal: Vec<(Address, u128)>,
    fail_next: bool,
}

impl InMemoryValueGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total value paid to an address so far.
    #[must_use]
    pub fn received_by(&self, to: Address) -> u128 {
        self.received.get(&to).copied().unwrap_or(0)
    }

    /// Every payment in order.
    #[must_use]
    pub fn journal(&self) -> &[(Address, u128)] {
        &self.journal
    }

    /// Make the next payment fail; the flag clears after one use.
    pub fn fail_next_payment(&mut self) {
        self.fail_next = true;
    }
}

impl ValueTransferGateway for InMemoryValueGateway {
    fn pay(&mut self, to: Address, amount: u128) -> Result<()> {
        if std::mem::take(&mut self.fail_next) {
            return Err(MarketError::PaymentFailed {
                reason: "injected payment failure".into(),
            });
        }
        *self.received.entry(to).or_insert(0) += amount;
        self.journal.push((to, amount));
        Ok(())
    }
}
