//! # Contract Versioning Guard
//!
//! Load-time ABI compatibility checks between a native library and the
//! foreign bindings generated against it. Two layers:
//!
//! - a single contract version the foreign side compares once before any
//!   other entry point is invoked; mismatch aborts initialization,
//! - a short checksum per bound symbol, derived purely from the symbol's
//!   signature string, catching skew a version bump alone would miss
//!   (a rebuilt library loaded against stale bindings).
//!
//! Both checks are pure and deterministic: the same signature string yields
//! the same checksum on every build of every platform.

use crate::error::{BridgeError, BridgeResult};

/// ABI contract version, packed as major << 16 | minor
pub const CONTRACT_VERSION: u32 = 1u32 << 16 | 0u32; // 1.0

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Checksum of a symbol's signature string, folded to 16 bits
///
/// FNV-1a over the UTF-8 bytes, then xor-folded. Const so checksum entry
/// points compile down to returning an immediate.
pub const fn symbol_checksum(signature: &str) -> u16 {
    let bytes = signature.as_bytes();
    let mut hash = FNV_OFFSET;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
        i += 1;
    }
    // Fold 64 -> 32 -> 16
    let folded32 = ((hash >> 32) ^ hash) as u32;
    ((folded32 >> 16) ^ folded32) as u16
}

/// One symbol in a binding manifest: the name, the checksum the bindings
/// were generated against, and the checksum the loaded library reports.
#[derive(Debug, Clone, Copy)]
pub struct SymbolEntry {
    pub symbol: &'static str,
    pub expected: u16,
    pub actual: u16,
}

/// Verify a binding manifest against the loaded library
///
/// Returns the first mismatch found: the contract version first, then each
/// symbol in order. A foreign loader shim calls this once at startup and
/// aborts on `Err` before any other entry point is used. Pure and
/// side-effect-free.
pub fn verify_manifest(expected_version: u32, symbols: &[SymbolEntry]) -> BridgeResult<()> {
    if expected_version != CONTRACT_VERSION {
        return Err(BridgeError::ContractMismatch {
            symbol: "contract_version",
            expected: expected_version,
            actual: CONTRACT_VERSION,
        });
    }
    for entry in symbols {
        if entry.expected != entry.actual {
            return Err(BridgeError::ContractMismatch {
                symbol: entry.symbol,
                expected: entry.expected as u32,
                actual: entry.actual as u32,
            });
        }
    }
    Ok(())
}
