//! # Contract Guard Entry Points
//!
//! The load-time compatibility surface: one contract version plus a
//! checksum per stable symbol. A generated binding calls all of them once
//! at startup, compares against the values it was generated with, and
//! aborts on any mismatch before invoking anything else.
//!
//! Checksums are computed at compile time from the symbol's signature
//! string, so every build of the same source reports identical values.

use trestle_core::symbol_checksum;

/// Report the ABI contract version
///
/// Pure and stateless; safe to call before any other entry point.
#[no_mangle]
pub extern "C" fn trestle_contract_version() -> u32 {
    trestle_core::CONTRACT_VERSION
}

macro_rules! checksum_entry_points {
    ($($name:ident => $signature:expr;)*) => {
        $(
            /// Signature checksum for the correspondingly named entry point
            #[no_mangle]
            pub extern "C" fn $name() -> u16 {
                const CHECKSUM: u16 = symbol_checksum($signature);
                CHECKSUM
            }
        )*

        /// The stable symbols and their signatures, in declaration order
        pub const STABLE_SYMBOLS: &[(&str, &str)] = &[
            $((stringify!($name), $signature),)*
        ];
    };
}

checksum_entry_points! {
    trestle_checksum_buffer_alloc =>
        "trestle_buffer_alloc(u64, *mut CallStatus) -> ByteBuffer";
    trestle_checksum_buffer_from_bytes =>
        "trestle_buffer_from_bytes(ForeignBytes, *mut CallStatus) -> ByteBuffer";
    trestle_checksum_buffer_reserve =>
        "trestle_buffer_reserve(ByteBuffer, u64, *mut CallStatus) -> ByteBuffer";
    trestle_checksum_buffer_free =>
        "trestle_buffer_free(ByteBuffer, *mut CallStatus)";
    trestle_checksum_object_retain =>
        "trestle_object_retain(u64, *mut CallStatus) -> u64";
    trestle_checksum_object_release =>
        "trestle_object_release(u64, *mut CallStatus)";
}

#[cfg(test)]
mod tests {
    use super::*;
    use trestle_core::{verify_manifest, SymbolEntry, CONTRACT_VERSION};

    #[test]
    fn version_is_exposed_unchanged() {
        assert_eq!(trestle_contract_version(), CONTRACT_VERSION);
    }

    #[test]
    fn checksums_are_stable_across_calls() {
        assert_eq!(
            trestle_checksum_buffer_alloc(),
            trestle_checksum_buffer_alloc()
        );
        assert_eq!(
            trestle_checksum_object_retain(),
            trestle_checksum_object_retain()
        );
    }

    #[test]
    fn checksums_match_their_signatures() {
        for &(name, signature) in STABLE_SYMBOLS {
            let expected = symbol_checksum(signature);
            let actual = match name {
                "trestle_checksum_buffer_alloc" => trestle_checksum_buffer_alloc(),
                "trestle_checksum_buffer_from_bytes" => trestle_checksum_buffer_from_bytes(),
                "trestle_checksum_buffer_reserve" => trestle_checksum_buffer_reserve(),
                "trestle_checksum_buffer_free" => trestle_checksum_buffer_free(),
                "trestle_checksum_object_retain" => trestle_checksum_object_retain(),
                "trestle_checksum_object_release" => trestle_checksum_object_release(),
                other => panic!("untested symbol {}", other),
            };
            assert_eq!(actual, expected, "{}", name);
        }
    }

    #[test]
    fn symbols_have_distinct_checksums() {
        let mut seen = std::collections::HashSet::new();
        for &(_, signature) in STABLE_SYMBOLS {
            seen.insert(symbol_checksum(signature));
        }
        assert_eq!(seen.len(), STABLE_SYMBOLS.len());
    }

    #[test]
    fn loader_manifest_accepts_this_build() {
        let symbols: Vec<SymbolEntry> = STABLE_SYMBOLS
            .iter()
            .map(|&(name, signature)| SymbolEntry {
                symbol: name,
                expected: symbol_checksum(signature),
                actual: symbol_checksum(signature),
            })
            .collect();
        assert!(verify_manifest(trestle_contract_version(), &symbols).is_ok());
    }
}
