//! Canonical-JSON hashing used to decide whether the intent index needs a
//! rebuild (§3, I2/I3).

use sha2::{Digest, Sha256};

/// Serialize `value` with sorted object keys and no incidental whitespace.
///
/// `serde_json::Value`'s `Map` is backed by a `BTreeMap` (the crate's
/// default feature set, no `preserve_order`), so `Value`'s own `Serialize`
/// impl already emits keys in sorted order; `to_string` already omits
/// whitespace. This function exists as an explicit seam so the canonicalization
/// contract is named and tested independent of that implementation detail.
pub fn canonical_json(value: &serde_json::Value) -> String {
    serde_json::to_string(value).expect("Value serialization is infallible")
}

/// SHA-256 of a value's canonical JSON form, as a lowercase hex string.
pub fn config_hash(value: &serde_json::Value) -> String {
    let canonical = canonical_json(value);
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_order_does_not_affect_hash() {
        let a = json!({ "b": 1, "a": 2 });
        let b = json!({ "a": 2, "b": 1 });
        assert_eq!(config_hash(&a), config_hash(&b));
    }

    #[test]
    fn different_values_hash_differently() {
        let a = json!({ "a": 1 });
        let b = json!({ "a": 2 });
        assert_ne!(config_hash(&a), config_hash(&b));
    }

    #[test]
    fn hash_is_stable_hex_sha256_length() {
        let hash = config_hash(&json!({ "x": "y" }));
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
