//! The custodial deposit ledger.
//!
//! Tracks per-(owner, asset contract, asset id) custody balances. All
//! mutations are atomic: either the full operation succeeds or the ledger
//! is unchanged. A record whose balance reaches zero is removed, never
//! left dangling.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use custodex_types::{Address, AssetId, AssetKind, Deposit, MarketError, Result};

/// Key for one custody record.
type DepositKey = (Address, Address, AssetId);

/// The source of truth for custodied asset balances.
///
/// Records are created by asset-arrival callbacks, decreased by withdraw
/// or settlement, and never allowed to go negative (checked subtraction).
#[derive(Debug, Default)]
pub struct DepositLedger {
    /// Per-(owner, contract, id) custody records.
    deposits: HashMap<DepositKey, Deposit>,
}

impl DepositLedger {
    /// Create a new empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self {
            deposits: HashMap::new(),
        }
    }

    /// Credit `amount` units to the owner's record, creating it with `kind`
    /// if absent.
    ///
    /// A zero credit is a no-op and never creates a record. The kind is
    /// recorded at first delivery and stays fixed: a delivery reporting a
    /// different kind than the existing record is rejected.
    ///
    /// # Errors
    /// - `DepositKindMismatch` if the record exists under another kind
    /// - `ArithmeticOverflow` if the balance would exceed `u128::MAX`
    pub fn credit(
        &mut self,
        owner: Address,
        asset_contract: Address,
        asset_id: AssetId,
        amount: u128,
        kind: AssetKind,
    ) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        match self.deposits.entry((owner, asset_contract, asset_id)) {
            Entry::Occupied(mut occupied) => {
                let record = occupied.get_mut();
                if record.kind != kind {
                    return Err(MarketError::DepositKindMismatch {
                        recorded: record.kind,
                        delivered: kind,
                    });
                }
                record.balance = record
                    .balance
                    .checked_add(amount)
                    .ok_or(MarketError::ArithmeticOverflow)?;
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Deposit {
                    balance: amount,
                    kind,
                });
            }
        }
        Ok(())
    }

    /// Debit `amount` units, removing the record when it reaches zero.
    ///
    /// Returns the recorded kind so callers can select the transfer mode
    /// on the way out of custody.
    ///
    /// # Errors
    /// Returns `InsufficientDeposit` if `balance < amount`.
    pub fn debit(
        &mut self,
        owner: Address,
        asset_contract: Address,
        asset_id: AssetId,
        amount: u128,
    ) -> Result<AssetKind> {
        let key = (owner, asset_contract, asset_id);
        let Some(record) = self.deposits.get_mut(&key) else {
            return Err(MarketError::InsufficientDeposit {
                needed: amount,
                available: 0,
            });
        };
        if record.balance < amount {
            return Err(MarketError::InsufficientDeposit {
                needed: amount,
                available: record.balance,
            });
        }
        record.balance -= amount;
        let kind = record.kind;
        if record.is_zero() {
            self.deposits.remove(&key);
        }
        Ok(kind)
    }

    /// Reinstate units removed by a debit whose operation later failed.
    ///
    /// Infallible: the kind is the one returned by the reverted debit, so
    /// it can never mismatch an existing record.
    pub fn revert_debit(
        &mut self,
        owner: Address,
        asset_contract: Address,
        asset_id: AssetId,
        amount: u128,
        kind: AssetKind,
    ) {
        let record = self
            .deposits
            .entry((owner, asset_contract, asset_id))
            .or_insert_with(|| Deposit::new(kind));
        record.balance = record.balance.saturating_add(amount);
    }

    /// Balance for an (owner, contract, id) key. Zero if no record exists.
    #[must_use]
    pub fn balance_of(&self, owner: Address, asset_contract: Address, asset_id: AssetId) -> u128 {
        self.deposits
            .get(&(owner, asset_contract, asset_id))
            .map_or(0, |record| record.balance)
    }

    /// The kind recorded for an (owner, contract, id) key, if any.
    #[must_use]
    pub fn kind_of(
        &self,
        owner: Address,
        asset_contract: Address,
        asset_id: AssetId,
    ) -> Option<AssetKind> {
        self.deposits
            .get(&(owner, asset_contract, asset_id))
            .map(|record| record.kind)
    }

    /// Full custody record for a key, if any.
    #[must_use]
    pub fn deposit(
        &self,
        owner: Address,
        asset_contract: Address,
        asset_id: AssetId,
    ) -> Option<&Deposit> {
        self.deposits.get(&(owner, asset_contract, asset_id))
    }

    /// Total units held in custody for a (contract, id) across all owners.
    #[must_use]
    pub fn total_custody(&self, asset_contract: Address, asset_id: AssetId) -> u128 {
        self.deposits
            .iter()
            .filter(|((_, contract, id), _)| *contract == asset_contract && *id == asset_id)
            .fold(0u128, |acc, (_, record)| acc.saturating_add(record.balance))
    }

    /// Number of live custody records.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.deposits.len()
    }

    /// Whether the ledger holds nothing at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deposits.is_empty()
    }
}
