//! Form-hash and submission-fingerprint computation (spec §3, §6.2).
//!
//! Both reduce to "hash a canonicalized view of the input down to a short,
//! stable identifier": field/header names are sorted before hashing so the
//! result is independent of wire order, and `DefaultHasher`'s keys are
//! fixed rather than randomized per-process, so the same input hashes the
//! same way on every instance in the cluster.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use crate::model::FingerprintHeaderSelection;

/// Hash a form submission's field values, independent of field order
/// (spec §6.2 decision body's `form_hash`, used for dedup and the
/// rate limiter's form-hash keying).
pub fn form_hash(fields: &HashMap<String, String>) -> String {
    let mut names: Vec<&String> = fields.keys().collect();
    names.sort();
    let mut hasher = DefaultHasher::new();
    for name in names {
        name.hash(&mut hasher);
        fields[name].hash(&mut hasher);
    }
    hex::encode(hasher.finish().to_be_bytes())
}

/// Compute a request's submission fingerprint from a fingerprint profile's
/// header selection (spec §3 "fingerprint-header selection").
pub fn submission_fingerprint(
    headers: &HashMap<String, String>,
    form_fields: &HashMap<String, String>,
    selection: &FingerprintHeaderSelection,
) -> String {
    let mut hasher = DefaultHasher::new();
    for header in &selection.headers {
        let raw = headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(header))
            .map(|(_, v)| v.as_str())
            .unwrap_or("");
        let normalized = if selection.normalize {
            raw.to_ascii_lowercase()
        } else {
            raw.to_string()
        };
        let truncated: String = normalized.chars().take(selection.length_cap).collect();
        truncated.hash(&mut hasher);
    }
    if selection.include_field_names {
        let mut names: Vec<&String> = form_fields.keys().collect();
        names.sort();
        for name in names {
            name.hash(&mut hasher);
        }
    }
    hex::encode(hasher.finish().to_be_bytes())
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::collection::hash_map;
    use proptest::prelude::*;

    proptest! {
        /// Property: `form_hash` never depends on insertion order — building
        /// the same entries into two maps in reverse order still hashes
        /// identically.
        #[test]
        fn prop_form_hash_is_permutation_invariant(
            entries in hash_map("[a-z]{1,8}", "[a-z0-9 ]{0,16}", 0..6),
        ) {
            let pairs: Vec<(String, String)> = entries.into_iter().collect();
            let forward: HashMap<String, String> = pairs.iter().cloned().collect();
            let reversed: HashMap<String, String> = pairs.into_iter().rev().collect();
            prop_assert_eq!(form_hash(&forward), form_hash(&reversed));
        }
    }
}
