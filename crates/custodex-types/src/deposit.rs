//! Custodial deposit records.
//!
//! A [`Deposit`] exists only while its balance is positive — the ledger
//! removes records that reach zero rather than leaving them dangling.

use serde::{Deserialize, Serialize};

use crate::AssetKind;

/// A single custody record for an (owner, asset contract, asset id) key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposit {
    /// Units currently held in custody for the owner.
    pub balance: u128,
    /// Kind recorded at first delivery; never changes across deliveries.
    pub kind: AssetKind,
}

impl Deposit {
    /// Create an empty record of the given kind.
    #[must_use]
    pub fn new(kind: AssetKind) -> Self {
        Self { balance: 0, kind }
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.balance == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_deposit_is_zero() {
        let dep = Deposit::new(AssetKind::Unique);
        assert!(dep.is_zero());
        assert_eq!(dep.kind, AssetKind::Unique);
    }

    #[test]
    fn deposit_serde_roundtrip() {
        let dep = Deposit {
            balance: 12,
            kind: AssetKind::Batched,
        };
        let json = serde_json::to_string(&dep).unwrap();
        let back: Deposit = serde_json::from_str(&json).unwrap();
        assert_eq!(dep, back);
    }
}
