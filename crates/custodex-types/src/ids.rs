//! Identifiers used throughout Custodex.
//!
//! Accounts and asset contracts share one 20-byte [`Address`] space. Offer
//! identities are content-derived SHA-256 hashes, so the same offer terms
//! always resolve to the same [`OfferId`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::OfferDirection;

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A 20-byte account or asset-contract address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The null address. Never a valid asset contract.
    pub const ZERO: Self = Self([0u8; 20]);

    /// Build an address whose trailing 8 bytes hold `n` big-endian.
    #[must_use]
    pub fn from_low_u64(n: u64) -> Self {
        let mut bytes = [0u8; 20];
        bytes[12..].copy_from_slice(&n.to_be_bytes());
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Address {
    pub fn random() -> Self {
        use rand::Rng;
        let mut bytes = [0u8; 20];
        rand::thread_rng().fill(&mut bytes[..]);
        Self(bytes)
    }
}

// ---------------------------------------------------------------------------
// AssetId
// ---------------------------------------------------------------------------

/// Identifier of an asset within its contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct AssetId(pub u128);

impl AssetId {
    /// Sentinel meaning "any id in this contract". Collection offers are
    /// stored under it and filled against caller-supplied concrete ids.
    pub const WILDCARD: Self = Self(u128::MAX);

    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        *self == Self::WILDCARD
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_wildcard() {
            write!(f, "asset:*")
        } else {
            write!(f, "asset:{}", self.0)
        }
    }
}

// ---------------------------------------------------------------------------
// OfferId
// ---------------------------------------------------------------------------

/// Content-derived offer identity.
///
/// `SHA-256(domain_sep || maker || contract || asset_id || price || direction || collection_flag)`
///
/// The amount is deliberately excluded: partial fills mutate the remaining
/// amount without changing the lookup key. The collection flag is included,
/// so a per-id offer and a collection offer at otherwise identical terms
/// occupy distinct identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct OfferId(pub [u8; 32]);

impl OfferId {
    /// Derive the identity for the given offer terms.
    ///
    /// Pure and deterministic: every caller computes the **exact same** id
    /// for the same terms, which is what makes offers addressable without
    /// a server-assigned handle.
    #[must_use]
    pub fn derive(
        maker: Address,
        asset_contract: Address,
        asset_id: AssetId,
        price_per_unit: u128,
        direction: OfferDirection,
        is_collection: bool,
    ) -> Self {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(crate::constants::OFFER_ID_DOMAIN);
        hasher.update(maker.0);
        hasher.update(asset_contract.0);
        hasher.update(asset_id.0.to_le_bytes());
        hasher.update(price_per_unit.to_le_bytes());
        hasher.update([direction.tag()]);
        hasher.update([u8::from(is_collection)]);
        Self(hasher.finalize().into())
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for OfferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "offer:{}", hex::encode(&self.0[..8]))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
