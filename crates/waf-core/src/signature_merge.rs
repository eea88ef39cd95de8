//! Attack Signature Merger: overlays a sorted signature list onto a
//! profile's defense nodes (spec §4.5).

use std::collections::HashMap;

use crate::error::{Error, ValidationIssue};
use crate::model::{AttackSignature, ScoredPattern, SignatureSection};

/// The merged per-node-kind overlay, folded into a defense node's
/// configuration via [`apply_overlay`] before the node runs (spec §4.5 "new
/// graph where each defense node is augmented with a merged overlay").
pub type Overlay = HashMap<String, SignatureSection>;

/// Merge `signatures` (already sorted by priority ascending, then id, per
/// spec §4.5 "Inputs") into a single overlay, one section per defense-node
/// kind. Returns a validation error if a field is both required and
/// forbidden across the signature set.
pub fn merge_signatures(signatures: &[&AttackSignature]) -> Result<Overlay, Error> {
    let mut overlay: Overlay = Overlay::new();

    for signature in signatures {
        for (kind, section) in &signature.sections {
            let entry = overlay.entry(kind.clone()).or_default();
            merge_section_into(entry, section);
        }
    }

    for (kind, section) in &overlay {
        for field in &section.required_fields {
            if section.forbidden_fields.contains(field) {
                return Err(Error::validation(vec![ValidationIssue::new(
                    format!("signature_merge['{kind}']"),
                    format!("field '{field}' is both required and forbidden across merged signatures"),
                )]));
            }
        }
    }

    Ok(overlay)
}

fn merge_section_into(accum: &mut SignatureSection, incoming: &SignatureSection) {
    for (key, values) in &incoming.literal_lists {
        let entry = accum.literal_lists.entry(key.clone()).or_default();
        for v in values {
            if !entry.contains(v) {
                entry.push(v.clone());
            }
        }
    }

    for (key, values) in &incoming.scored_pattern_lists {
        accum
            .scored_pattern_lists
            .entry(key.clone())
            .or_default()
            .extend(values.iter().cloned());
    }

    for (key, value) in &incoming.numeric_ceilings {
        accum
            .numeric_ceilings
            .entry(key.clone())
            .and_modify(|existing| *existing = existing.min(*value))
            .or_insert(*value);
    }

    for (key, value) in &incoming.numeric_floors {
        accum
            .numeric_floors
            .entry(key.clone())
            .and_modify(|existing| *existing = existing.max(*value))
            .or_insert(*value);
    }

    for (key, value) in &incoming.bool_flags {
        accum
            .bool_flags
            .entry(key.clone())
            .and_modify(|existing| *existing = *existing || *value)
            .or_insert(*value);
    }

    for field in &incoming.required_fields {
        if !accum.required_fields.contains(field) {
            accum.required_fields.push(field.clone());
        }
    }
    for field in &incoming.forbidden_fields {
        if !accum.forbidden_fields.contains(field) {
            accum.forbidden_fields.push(field.clone());
        }
    }

    // Fields uncovered by the typed categories: highest-priority signature
    // wins (spec §9 open question). Signatures are folded in priority-
    // ascending order, so a later write here belongs to a lower-priority
    // (i.e. higher-numeric-priority) signature and must not clobber an
    // earlier, higher-priority value.
    for (key, value) in &incoming.other {
        accum.other.entry(key.clone()).or_insert_with(|| value.clone());
    }
}

/// Fold `overlay` into a defense node's static `config`, field by field,
/// per the same type-directed rules `merge_signatures` uses across
/// signatures (spec:95 "the node's configuration \[is\] merged with any
/// signature overlay"). The node's own static value participates as just
/// another input to its field's category rule — e.g. a profile's own
/// `requests_per_minute` is itself a ceiling, so the result is the minimum
/// of the static value and the merged overlay's, not an override in
/// either direction (spec §8 scenario 4: profile config 60, overlay 25,
/// merged 25).
pub fn apply_overlay(config: &serde_json::Value, overlay: &SignatureSection) -> serde_json::Value {
    let mut object = match config {
        serde_json::Value::Object(map) => map.clone(),
        _ => serde_json::Map::new(),
    };

    for (key, values) in &overlay.literal_lists {
        let mut merged: Vec<String> = object
            .get(key)
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default();
        for v in values {
            if !merged.contains(v) {
                merged.push(v.clone());
            }
        }
        object.insert(key.clone(), serde_json::to_value(merged).unwrap());
    }

    for (key, values) in &overlay.scored_pattern_lists {
        let mut merged: Vec<ScoredPattern> = object
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();
        merged.extend(values.iter().cloned());
        object.insert(key.clone(), serde_json::to_value(merged).unwrap());
    }

    for (key, value) in &overlay.numeric_ceilings {
        let merged = match object.get(key).and_then(|v| v.as_f64()) {
            Some(existing) => existing.min(*value),
            None => *value,
        };
        object.insert(key.clone(), serde_json::json!(merged));
    }

    for (key, value) in &overlay.numeric_floors {
        let merged = match object.get(key).and_then(|v| v.as_f64()) {
            Some(existing) => existing.max(*value),
            None => *value,
        };
        object.insert(key.clone(), serde_json::json!(merged));
    }

    for (key, value) in &overlay.bool_flags {
        let merged = object.get(key).and_then(|v| v.as_bool()).unwrap_or(false) || *value;
        object.insert(key.clone(), serde_json::json!(merged));
    }

    merge_string_list_field(&mut object, "required_fields", &overlay.required_fields);
    merge_string_list_field(&mut object, "forbidden_fields", &overlay.forbidden_fields);

    for (key, value) in &overlay.other {
        object.entry(key.clone()).or_insert_with(|| value.clone());
    }

    serde_json::Value::Object(object)
}

fn merge_string_list_field(object: &mut serde_json::Map<String, serde_json::Value>, key: &str, incoming: &[String]) {
    if incoming.is_empty() {
        return;
    }
    let mut merged: Vec<String> = object
        .get(key)
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default();
    for field in incoming {
        if !merged.contains(field) {
            merged.push(field.clone());
        }
    }
    object.insert(key.to_string(), serde_json::to_value(merged).unwrap());
}

/// The cache key the signature merger may memoize under (spec §4.5: "a
/// cache key of `(profile_id, sorted_signature_ids, profile_version,
/// signature_versions)`").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MergeCacheKey {
    pub profile_id: String,
    pub sorted_signature_ids: Vec<String>,
    pub profile_version: u64,
    pub signature_versions: Vec<u64>,
}

impl MergeCacheKey {
    pub fn new(profile_id: &str, profile_version: u64, signatures: &[&AttackSignature]) -> Self {
        let mut sorted_signature_ids: Vec<String> =
            signatures.iter().map(|s| s.id.clone()).collect();
        sorted_signature_ids.sort();
        let signature_versions = signatures.iter().map(|s| s.version).collect();
        Self {
            profile_id: profile_id.to_string(),
            sorted_signature_ids,
            profile_version,
            signature_versions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ScoredPattern, Timestamps};

    fn signature(id: &str, priority: i64, section: SignatureSection) -> AttackSignature {
        let mut sections = HashMap::new();
        sections.insert("keyword_filter".to_string(), section);
        AttackSignature {
            id: id.to_string(),
            enabled: true,
            builtin: false,
            priority,
            tags: vec![],
            sections,
            version: 1,
            metadata: Timestamps::now(),
        }
    }

    #[test]
    fn literal_lists_dedup_preserving_first_occurrence() {
        let mut a = SignatureSection::default();
        a.literal_lists
            .insert("blocked_keywords".to_string(), vec!["viagra".to_string(), "casino".to_string()]);
        let mut b = SignatureSection::default();
        b.literal_lists
            .insert("blocked_keywords".to_string(), vec!["casino".to_string(), "loan".to_string()]);

        let sig_a = signature("a", 0, a);
        let sig_b = signature("b", 1, b);
        let overlay = merge_signatures(&[&sig_a, &sig_b]).unwrap();
        let merged = &overlay["keyword_filter"].literal_lists["blocked_keywords"];
        assert_eq!(merged, &vec!["viagra".to_string(), "casino".to_string(), "loan".to_string()]);
    }

    #[test]
    fn scored_pattern_lists_concatenate_without_dedup() {
        let mut a = SignatureSection::default();
        a.scored_pattern_lists.insert(
            "patterns".to_string(),
            vec![ScoredPattern {
                pattern: "%d+".to_string(),
                score: 5.0,
            }],
        );
        let mut b = SignatureSection::default();
        b.scored_pattern_lists.insert(
            "patterns".to_string(),
            vec![ScoredPattern {
                pattern: "%d+".to_string(),
                score: 3.0,
            }],
        );
        let sig_a = signature("a", 0, a);
        let sig_b = signature("b", 1, b);
        let overlay = merge_signatures(&[&sig_a, &sig_b]).unwrap();
        assert_eq!(overlay["keyword_filter"].scored_pattern_lists["patterns"].len(), 2);
    }

    #[test]
    fn numeric_ceiling_takes_minimum() {
        let mut a = SignatureSection::default();
        a.numeric_ceilings.insert("rate_limit".to_string(), 100.0);
        let mut b = SignatureSection::default();
        b.numeric_ceilings.insert("rate_limit".to_string(), 50.0);
        let sig_a = signature("a", 0, a);
        let sig_b = signature("b", 1, b);
        let overlay = merge_signatures(&[&sig_a, &sig_b]).unwrap();
        assert_eq!(overlay["keyword_filter"].numeric_ceilings["rate_limit"], 50.0);
    }

    #[test]
    fn numeric_floor_takes_maximum() {
        let mut a = SignatureSection::default();
        a.numeric_floors.insert("min_interaction_seconds".to_string(), 1.0);
        let mut b = SignatureSection::default();
        b.numeric_floors.insert("min_interaction_seconds".to_string(), 3.0);
        let sig_a = signature("a", 0, a);
        let sig_b = signature("b", 1, b);
        let overlay = merge_signatures(&[&sig_a, &sig_b]).unwrap();
        assert_eq!(overlay["keyword_filter"].numeric_floors["min_interaction_seconds"], 3.0);
    }

    #[test]
    fn required_and_forbidden_conflict_is_validation_error() {
        let mut a = SignatureSection::default();
        a.required_fields.push("email".to_string());
        let mut b = SignatureSection::default();
        b.forbidden_fields.push("email".to_string());
        let sig_a = signature("a", 0, a);
        let sig_b = signature("b", 1, b);
        assert!(merge_signatures(&[&sig_a, &sig_b]).is_err());
    }

    #[test]
    fn apply_overlay_takes_the_minimum_of_static_config_and_merged_ceiling() {
        let config = serde_json::json!({ "requests_per_minute": 60 });
        let mut overlay = SignatureSection::default();
        overlay.numeric_ceilings.insert("requests_per_minute".to_string(), 25.0);
        let merged = apply_overlay(&config, &overlay);
        assert_eq!(merged["requests_per_minute"], 25.0);
    }

    #[test]
    fn apply_overlay_unions_literal_lists_onto_existing_static_entries() {
        let config = serde_json::json!({ "blocked_keywords": ["viagra"] });
        let mut overlay = SignatureSection::default();
        overlay
            .literal_lists
            .insert("blocked_keywords".to_string(), vec!["casino".to_string(), "viagra".to_string()]);
        let merged = apply_overlay(&config, &overlay);
        assert_eq!(merged["blocked_keywords"], serde_json::json!(["viagra", "casino"]));
    }

    #[test]
    fn apply_overlay_ors_bool_flags_with_the_static_value() {
        let config = serde_json::json!({ "require_mouse_movement": false });
        let mut overlay = SignatureSection::default();
        overlay.bool_flags.insert("require_mouse_movement".to_string(), true);
        let merged = apply_overlay(&config, &overlay);
        assert_eq!(merged["require_mouse_movement"], true);
    }

    #[test]
    fn apply_overlay_leaves_untouched_fields_alone() {
        let config = serde_json::json!({ "key_by": "client_ip" });
        let overlay = SignatureSection::default();
        let merged = apply_overlay(&config, &overlay);
        assert_eq!(merged["key_by"], "client_ip");
    }
}
