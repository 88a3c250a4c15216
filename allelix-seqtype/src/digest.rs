//! Stable sequence type identifiers.
//!
//! The identifier of a sequence type is the 64-bit FNV-1a hash of its
//! canonical variant string (see
//! [allelix_core::models::sequence_type::variants_as_string]), read as a
//! signed integer and written as `p` or `n` followed by the 19 digit
//! absolute value. The variant free sequence type is always
//! [REFERENCE_IDENTIFIER].
use std::collections::BTreeMap;

use allelix_core::models::REFERENCE_IDENTIFIER;
use allelix_core::models::sequence_type::variants_as_string;

/// Version tag of the identifier scheme.
pub const IDENTIFIER_SCHEME: &str = "fnv1a64-v1";

const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

pub fn fnv1a64(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

pub fn encode_identifier(hash: u64) -> String {
    let signed = hash as i64;
    let sign = if signed < 0 { 'n' } else { 'p' };
    format!("{sign}{:019}", signed.unsigned_abs())
}

/// Identifier of the sequence type with the given variants.
pub fn sequence_type_identifier(variants: &BTreeMap<u32, String>) -> String {
    if variants.is_empty() {
        return REFERENCE_IDENTIFIER.to_string();
    }
    encode_identifier(fnv1a64(variants_as_string(variants).as_bytes()))
}
