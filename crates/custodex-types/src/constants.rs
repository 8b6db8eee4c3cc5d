//! System-wide constants for the Custodex engine.

/// Domain-separation tag for offer identity hashing.
pub const OFFER_ID_DOMAIN: &[u8] = b"custodex:offer_id:v1:";

/// Units credited for a single unique-asset delivery.
pub const UNIQUE_UNIT: u128 = 1;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "Custodex";
