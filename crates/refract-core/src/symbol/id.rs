//! Content-addressed symbol identifiers.

use std::fmt;

use sha2::{Digest, Sha256};

/// A 20-byte opaque handle naming one documented entity.
///
/// Computed as a truncated SHA-256 over the entity's canonical qualified
/// identity, so the same entity seen from any translation unit, in any
/// order, at any concurrency, hashes to the same id. The all-zero id names
/// the global namespace.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SymbolId([u8; 20]);

impl SymbolId {
    /// The id of the global namespace.
    pub const GLOBAL: SymbolId = SymbolId([0; 20]);

    /// Compute the id for a canonical qualified-identity string.
    pub fn from_usr(usr: &str) -> Self {
        let digest = Sha256::digest(usr.as_bytes());
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest[..20]);
        Self(bytes)
    }

    /// Reconstruct an id from its raw bytes.
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_global(&self) -> bool {
        *self == Self::GLOBAL
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymbolId({self})")
    }
}
