//! Content hashing for ibgibs
//!
//! The gib is an upper-case SHA256 hex digest built from three partial
//! hashes: one of the `ib`, one of the JSON-encoded `rel8ns` and one of the
//! JSON-encoded `data`. Empty, null and missing `data`/`rel8ns` all hash the
//! same way, so only the meaningful content contributes to the address.

use crate::error::GibError;
use sha2::{Digest, Sha256};

use super::{Data, Rel8ns};

/// Upper-case SHA256 hex digest of `message`; the empty string hashes to "".
fn hash_to_hex(message: &str) -> String {
    if message.is_empty() {
        return String::new();
    }
    let mut hasher = Sha256::new();
    hasher.update(message.as_bytes());
    hex::encode_upper(hasher.finalize())
}

/// Compute the gib for the given `(ib, data, rel8ns)` triple.
pub fn compute_gib(ib: &str, data: Option<&Data>, rel8ns: Option<&Rel8ns>) -> Result<String, GibError> {
    let has_rel8ns = rel8ns.is_some_and(|r| r.values().any(|addrs| !addrs.is_empty()));
    let has_data = data.is_some_and(|d| !d.is_empty());

    let ib_hash = hash_to_hex(ib);

    let rel8ns_hash = match rel8ns {
        Some(r) if has_rel8ns => hash_to_hex(&serde_json::to_string(r)?),
        _ => String::new(),
    };
    let data_hash = match data {
        Some(d) if has_data => hash_to_hex(&serde_json::to_string(d)?),
        _ => String::new(),
    };

    if has_rel8ns || has_data {
        Ok(hash_to_hex(&format!("{}{}{}", ib_hash, rel8ns_hash, data_hash)))
    } else {
        Ok(hash_to_hex(&ib_hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ibgib::Address;
    use serde_json::json;

    #[test]
    fn test_gib_is_upper_hex() {
        let gib = compute_gib("hello", None, None).unwrap();
        assert_eq!(gib.len(), 64);
        assert!(gib.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn test_empty_and_missing_hash_alike() {
        let empty_data = Data::new();
        let empty_rel8ns = Rel8ns::from([("past".to_string(), Vec::<Address>::new())]);
        let bare = compute_gib("x", None, None).unwrap();
        assert_eq!(compute_gib("x", Some(&empty_data), None).unwrap(), bare);
        assert_eq!(compute_gib("x", None, Some(&empty_rel8ns)).unwrap(), bare);
    }

    #[test]
    fn test_data_changes_gib() {
        let a = json!({"text": "a"}).as_object().cloned().unwrap();
        let b = json!({"text": "b"}).as_object().cloned().unwrap();
        assert_ne!(
            compute_gib("x", Some(&a), None).unwrap(),
            compute_gib("x", Some(&b), None).unwrap()
        );
    }
}
