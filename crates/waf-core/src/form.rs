//! Form parsing constraints (spec §6.4).
//!
//! Pure parsing over an already-buffered body; the gateway crate owns
//! streaming the body off the wire and enforcing the overall size cap
//! before handing bytes here.

use std::collections::HashMap;

use crate::error::{Error, ValidationIssue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    UrlEncoded,
    Multipart,
    Json,
}

impl ContentType {
    pub fn from_header(header: &str) -> Option<Self> {
        let base = header.split(';').next().unwrap_or("").trim();
        match base {
            "application/x-www-form-urlencoded" => Some(ContentType::UrlEncoded),
            "multipart/form-data" => Some(ContentType::Multipart),
            "application/json" => Some(ContentType::Json),
            _ => None,
        }
    }

    /// Multipart bodies carry a `boundary=...` parameter alongside the
    /// content type.
    pub fn multipart_boundary(header: &str) -> Option<String> {
        header
            .split(';')
            .skip(1)
            .find_map(|part| part.trim().strip_prefix("boundary=").map(str::to_string))
    }
}

#[derive(Debug, Clone)]
pub struct FormParseLimits {
    pub max_body_bytes: usize,
    pub max_multipart_field_bytes: usize,
    pub max_json_depth: u32,
}

impl Default for FormParseLimits {
    fn default() -> Self {
        Self {
            max_body_bytes: 10 * 1024 * 1024,
            max_multipart_field_bytes: 1024 * 1024,
            max_json_depth: 10,
        }
    }
}

/// Parse a urlencoded body into a flat field map.
pub fn parse_urlencoded(body: &[u8], limits: &FormParseLimits) -> Result<HashMap<String, String>, Error> {
    if body.len() > limits.max_body_bytes {
        return Err(body_too_large(body.len(), limits.max_body_bytes));
    }
    Ok(form_urlencoded_decode(body))
}

fn form_urlencoded_decode(body: &[u8]) -> HashMap<String, String> {
    serde_urlencoded::from_bytes::<Vec<(String, String)>>(body)
        .unwrap_or_default()
        .into_iter()
        .collect()
}

/// Parse a multipart body, enforcing the per-field size cap (spec §6.4
/// "exceeding it aborts parsing with a validation error — no partial
/// state exposed").
pub fn parse_multipart(
    body: &[u8],
    boundary: &str,
    limits: &FormParseLimits,
) -> Result<HashMap<String, String>, Error> {
    if body.len() > limits.max_body_bytes {
        return Err(body_too_large(body.len(), limits.max_body_bytes));
    }

    let delimiter = format!("--{boundary}");
    let text = String::from_utf8_lossy(body);
    let mut fields = HashMap::new();

    for part in text.split(&delimiter) {
        let part = part.trim_matches(|c| c == '\r' || c == '\n');
        if part.is_empty() || part == "--" {
            continue;
        }
        let Some((headers, content)) = part.split_once("\r\n\r\n") else {
            continue;
        };
        if content.len() > limits.max_multipart_field_bytes {
            return Err(Error::validation(vec![ValidationIssue::new(
                "body.multipart",
                format!(
                    "field exceeds per-field cap of {} bytes",
                    limits.max_multipart_field_bytes
                ),
            )]));
        }
        let Some(name) = extract_field_name(headers) else {
            continue;
        };
        let value = content.trim_end_matches("--").trim_end_matches("\r\n");
        fields.insert(name, value.to_string());
    }

    Ok(fields)
}

fn extract_field_name(headers: &str) -> Option<String> {
    headers
        .lines()
        .find(|line| line.to_ascii_lowercase().starts_with("content-disposition"))
        .and_then(|line| {
            line.split(';')
                .find_map(|part| part.trim().strip_prefix("name=\""))
                .map(|rest| rest.trim_end_matches('"').to_string())
        })
}

/// Parse a JSON body into a flat field map (top-level object keys mapped
/// to their string/scalar representations), enforcing the nesting depth
/// limit (spec §6.4 "JSON depth limit: 10 nested levels").
pub fn parse_json(body: &[u8], limits: &FormParseLimits) -> Result<HashMap<String, String>, Error> {
    if body.len() > limits.max_body_bytes {
        return Err(body_too_large(body.len(), limits.max_body_bytes));
    }
    let value: serde_json::Value = serde_json::from_slice(body).map_err(|e| {
        Error::validation(vec![ValidationIssue::new("body.json", e.to_string())])
    })?;

    if json_depth(&value) > limits.max_json_depth {
        return Err(Error::validation(vec![ValidationIssue::new(
            "body.json",
            format!("exceeds max nesting depth of {}", limits.max_json_depth),
        )]));
    }

    let mut fields = HashMap::new();
    if let serde_json::Value::Object(map) = value {
        for (key, val) in map {
            fields.insert(key, scalarize(&val));
        }
    }
    Ok(fields)
}

fn scalarize(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn json_depth(value: &serde_json::Value) -> u32 {
    match value {
        serde_json::Value::Object(map) => 1 + map.values().map(json_depth).max().unwrap_or(0),
        serde_json::Value::Array(items) => 1 + items.iter().map(json_depth).max().unwrap_or(0),
        _ => 0,
    }
}

fn body_too_large(actual: usize, max: usize) -> Error {
    Error::validation(vec![ValidationIssue::new(
        "body",
        format!("body of {actual} bytes exceeds cap of {max} bytes"),
    )])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urlencoded_round_trips_fields() {
        let fields = parse_urlencoded(b"name=alice&message=hi+there", &FormParseLimits::default()).unwrap();
        assert_eq!(fields.get("name").map(String::as_str), Some("alice"));
        assert_eq!(fields.get("message").map(String::as_str), Some("hi there"));
    }

    #[test]
    fn json_depth_limit_is_enforced() {
        let mut value = serde_json::json!("leaf");
        for _ in 0..12 {
            value = serde_json::json!({ "nested": value });
        }
        let body = serde_json::to_vec(&value).unwrap();
        assert!(parse_json(&body, &FormParseLimits::default()).is_err());
    }

    #[test]
    fn json_within_depth_limit_parses() {
        let body = br#"{"email":"a@b.com","votes":3}"#;
        let fields = parse_json(body, &FormParseLimits::default()).unwrap();
        assert_eq!(fields.get("email").map(String::as_str), Some("a@b.com"));
    }

    #[test]
    fn multipart_field_over_cap_is_rejected() {
        let boundary = "XYZ";
        let big_value = "a".repeat(2048);
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"f\"\r\n\r\n{big_value}\r\n--{boundary}--"
        );
        let limits = FormParseLimits {
            max_multipart_field_bytes: 1024,
            ..FormParseLimits::default()
        };
        assert!(parse_multipart(body.as_bytes(), boundary, &limits).is_err());
    }

    #[test]
    fn content_type_parsing_ignores_parameters() {
        assert_eq!(
            ContentType::from_header("application/json; charset=utf-8"),
            Some(ContentType::Json)
        );
        assert_eq!(
            ContentType::multipart_boundary("multipart/form-data; boundary=XYZ"),
            Some("XYZ".to_string())
        );
    }
}
