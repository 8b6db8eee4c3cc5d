//! Asset classification.

use serde::{Deserialize, Serialize};

/// How units of an asset are addressed under one identifier.
///
/// Recorded at deposit time and stable for the record's lifetime; selects
/// the transfer mode on the way out of custody.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetKind {
    /// One indivisible unit per identifier.
    Unique,
    /// Multiple fungible units addressable under one identifier.
    Batched,
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unique => write!(f, "UNIQUE"),
            Self::Batched => write!(f, "BATCHED"),
        }
    }
}
