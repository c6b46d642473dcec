//! Canonical serialization for deterministic fingerprints.
//!
//! Configuration and path-repository fingerprints are computed by serializing
//! a value to JSON and hashing the bytes with xxh64. Hashed structures only
//! use `Vec` and `BTreeMap`, and floats are quantized to integers first, so
//! the same state always produces the same fingerprint.

use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

/// Scale applied to floats before hashing (six decimal places).
pub const FLOAT_QUANTIZATION_FACTOR: f64 = 1_000_000.0;

/// Quantize a float to an i64 for deterministic hashing.
pub fn quantize_float(value: f64) -> i64 {
    (value * FLOAT_QUANTIZATION_FACTOR).round() as i64
}

/// Serialize a value to canonical JSON bytes.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(value)
}

/// Canonical xxh64 hash of a serializable value.
pub fn canonical_hash<T: Serialize>(value: &T) -> Result<u64, serde_json::Error> {
    Ok(xxh64(&to_canonical_bytes(value)?, 0))
}

/// Canonical hash as a 16-digit hex string.
pub fn canonical_hash_hex<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    Ok(format!("{:016x}", canonical_hash(value)?))
}
