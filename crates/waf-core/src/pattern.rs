//! Signature pattern syntax compiler (spec §6.3).
//!
//! Translates the minimal pattern language signatures are authored in
//! (anchors, `%`-escaped character classes, `[...]` sets, `* + ?`
//! quantifiers) into a `regex::Regex`. Compilation happens once, at
//! cache-swap time (spec §9 "Compile patterns once at cache-swap time;
//! never recompile on the hot path") — this module only exposes the
//! translation, not a cache; [`crate::cache`] owns compiled patterns.

use crate::error::Error;

/// Translate one signature pattern into an equivalent `regex` syntax
/// string (spec §6.3's alphabet is a strict subset of `regex`'s, so this
/// is a mechanical rewrite rather than a hand-rolled matcher).
fn translate(pattern: &str) -> Result<String, String> {
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '^' | '$' => out.push(c),
            '*' | '+' | '?' => out.push(c),
            '(' | ')' => {
                out.push('\\');
                out.push(c);
            }
            '[' => {
                out.push('[');
                if chars.peek() == Some(&'^') {
                    out.push('^');
                    chars.next();
                }
                let mut closed = false;
                for inner in chars.by_ref() {
                    if inner == ']' {
                        closed = true;
                        break;
                    }
                    if inner == '\\' {
                        out.push_str("\\\\");
                    } else {
                        out.push(inner);
                    }
                }
                if !closed {
                    return Err("unterminated character class".to_string());
                }
                out.push(']');
            }
            '%' => match chars.next() {
                Some('a') => out.push_str("[A-Za-z]"),
                Some('d') => out.push_str("[0-9]"),
                Some('s') => out.push_str("\\s"),
                Some('w') => out.push_str("[A-Za-z0-9_]"),
                Some(escaped @ ('-' | '.' | '+' | '?' | '(' | ')' | '%' | '[' | ']' | '*' | '^' | '$')) => {
                    out.push('\\');
                    out.push(escaped);
                }
                Some(other) => return Err(format!("unsupported escape '%{other}'")),
                None => return Err("dangling '%' escape at end of pattern".to_string()),
            },
            '.' | '\\' | '|' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            other => out.push(other),
        }
    }

    Ok(out)
}

/// A compiled signature pattern, ready for hot-path matching.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pub source: String,
    regex: regex::Regex,
}

impl CompiledPattern {
    pub fn compile(source: &str) -> Result<Self, Error> {
        let translated = translate(source).map_err(|reason| Error::PatternCompile {
            pattern: source.to_string(),
            reason,
        })?;
        let regex = regex::Regex::new(&translated).map_err(|e| Error::PatternCompile {
            pattern: source.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    pub fn is_match(&self, haystack: &str) -> bool {
        self.regex.is_match(haystack)
    }
}

/// Compile every pattern in `sources`, logging and dropping the ones that
/// fail rather than aborting the whole cache swap (spec §6.3 "Patterns
/// that fail to compile must be logged and the containing rule skipped;
/// they must not abort request processing").
pub fn compile_all(sources: &[String]) -> Vec<CompiledPattern> {
    sources
        .iter()
        .filter_map(|source| match CompiledPattern::compile(source) {
            Ok(compiled) => Some(compiled),
            Err(err) => {
                tracing::warn!(pattern = %source, error = %err, "dropping pattern that failed to compile");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_class_matches() {
        let p = CompiledPattern::compile("^%d+$").unwrap();
        assert!(p.is_match("12345"));
        assert!(!p.is_match("12a45"));
    }

    #[test]
    fn word_class_and_anchors() {
        let p = CompiledPattern::compile("^%w+$").unwrap();
        assert!(p.is_match("hello_123"));
        assert!(!p.is_match("hello world"));
    }

    #[test]
    fn escaped_literal_dot() {
        let p = CompiledPattern::compile(r"^%d+%.%d+$").unwrap();
        assert!(p.is_match("3.14"));
        assert!(!p.is_match("314"));
    }

    #[test]
    fn character_class_set() {
        let p = CompiledPattern::compile("^[abc]+$").unwrap();
        assert!(p.is_match("aabbcc"));
        assert!(!p.is_match("abcd"));
    }

    #[test]
    fn unterminated_class_fails_to_compile() {
        assert!(CompiledPattern::compile("[abc").is_err());
    }

    #[test]
    fn compile_all_skips_bad_patterns_without_aborting() {
        let sources = vec!["^%d+$".to_string(), "[unterminated".to_string()];
        let compiled = compile_all(&sources);
        assert_eq!(compiled.len(), 1);
    }
}
