use regex::Regex;
use thiserror::Error;

use logtally_types::SearchSpec;

/// Error compiling a configured search pattern
#[derive(Error, Debug)]
#[error("invalid search pattern '{display_name}'")]
pub struct PatternError {
    pub display_name: String,
    #[source]
    pub source: regex::Error,
}

/// A compiled search pattern with its matching flags carried through
#[derive(Clone, Debug)]
pub struct CompiledPattern {
    display_name: String,
    raw: String,
    regex: Regex,
    whole_token: bool,
    case_sensitive: bool,
    capture_matches: bool,
}

impl CompiledPattern {
    /// Name used in metric paths
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Trimmed pattern text as the user configured it
    pub fn raw_pattern(&self) -> &str {
        &self.raw
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    pub fn captures_matches(&self) -> bool {
        self.capture_matches
    }

    /// Find all non-overlapping matches on one line
    ///
    /// Whole-token patterns additionally require each match to be bounded by
    /// whitespace or line start/end; unbounded candidates are dropped.
    pub fn find_matches<'t>(&self, line: &'t str) -> Vec<&'t str> {
        self.regex
            .find_iter(line)
            .filter(|m| !self.whole_token || is_whitespace_bounded(line, m.start(), m.end()))
            .map(|m| m.as_str())
            .collect()
    }
}

/// A match counts as a whole token only when its neighbours are whitespace
/// or the line boundary
fn is_whitespace_bounded(line: &str, start: usize, end: usize) -> bool {
    let before = line[..start].chars().next_back();
    let after = line[end..].chars().next();
    before.is_none_or(char::is_whitespace) && after.is_none_or(char::is_whitespace)
}

/// Compile configured search specs, preserving their order
///
/// Free-text patterns pass through as raw regular expressions; whole-token
/// patterns are escaped so the configured text matches literally. Case
/// insensitivity is applied as an `(?i)` flag on the whole pattern.
pub fn compile(specs: &[SearchSpec]) -> Result<Vec<CompiledPattern>, PatternError> {
    specs
        .iter()
        .map(|spec| {
            let raw = spec.pattern.trim().to_string();
            let body = if spec.match_whole_token {
                regex::escape(&raw)
            } else {
                raw.clone()
            };
            let source = if spec.case_sensitive {
                body
            } else {
                format!("(?i){body}")
            };

            let regex = Regex::new(&source).map_err(|source| PatternError {
                display_name: spec.display_name.clone(),
                source,
            })?;

            Ok(CompiledPattern {
                display_name: spec.display_name.clone(),
                raw,
                regex,
                whole_token: spec.match_whole_token,
                case_sensitive: spec.case_sensitive,
                capture_matches: spec.capture_matches,
            })
        })
        .collect()
}

/// Canonical capitalization for case-insensitive capture keys: first letter
/// of each whitespace-delimited word uppercased, the rest lowercased
pub fn canonical_capitalization(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for c in text.chars() {
        if c.is_whitespace() {
            at_word_start = true;
            out.push(c);
        } else if at_word_start {
            at_word_start = false;
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(pattern: &str, whole_token: bool, case_sensitive: bool) -> SearchSpec {
        SearchSpec {
            display_name: pattern.to_string(),
            pattern: pattern.to_string(),
            match_whole_token: whole_token,
            case_sensitive,
            capture_matches: false,
        }
    }

    fn compile_one(pattern: &str, whole_token: bool, case_sensitive: bool) -> CompiledPattern {
        compile(&[spec(pattern, whole_token, case_sensitive)])
            .unwrap()
            .remove(0)
    }

    #[test]
    fn test_whole_token_requires_whitespace_boundaries() {
        let p = compile_one("error", true, true);
        assert_eq!(p.find_matches("error at start"), vec!["error"]);
        assert_eq!(p.find_matches("an error occurred"), vec!["error"]);
        assert_eq!(p.find_matches("trailing error"), vec!["error"]);
        assert!(p.find_matches("preverror and errors").is_empty());
    }

    #[test]
    fn test_whole_token_matches_adjacent_tokens() {
        let p = compile_one("1", true, true);
        assert_eq!(p.find_matches("1 1"), vec!["1", "1"]);
        assert_eq!(p.find_matches("11 1"), vec!["1"]);
    }

    #[test]
    fn test_whole_token_escapes_regex_metacharacters() {
        let p = compile_one("a.b", true, true);
        assert_eq!(p.find_matches("a.b axb"), vec!["a.b"]);
    }

    #[test]
    fn test_case_insensitive_matching() {
        let p = compile_one("debug", true, false);
        assert_eq!(p.find_matches("DEBUG Debug debug").len(), 3);

        let sensitive = compile_one("debug", true, true);
        assert_eq!(sensitive.find_matches("DEBUG Debug debug").len(), 1);
    }

    #[test]
    fn test_free_text_pattern_is_raw_regex() {
        let p = compile_one(r"<\w*>", false, false);
        assert_eq!(p.find_matches("<this> and <again>"), vec!["<this>", "<again>"]);
    }

    #[test]
    fn test_non_overlapping_match_count() {
        let p = compile_one(r"\[", false, false);
        assert_eq!(p.find_matches("[a] [b] [[c]").len(), 4);
    }

    #[test]
    fn test_compile_preserves_order() {
        let compiled = compile(&[
            spec("debug", true, false),
            spec("info", true, false),
            spec("error", true, false),
        ])
        .unwrap();
        let names: Vec<_> = compiled.iter().map(|p| p.display_name()).collect();
        assert_eq!(names, vec!["debug", "info", "error"]);
    }

    #[test]
    fn test_invalid_regex_reports_display_name() {
        let err = compile(&[spec("([", false, true)]).unwrap_err();
        assert_eq!(err.display_name, "([");
    }

    #[test]
    fn test_canonical_capitalization() {
        assert_eq!(canonical_capitalization("ERROR"), "Error");
        assert_eq!(canonical_capitalization("major gc"), "Major Gc");
        assert_eq!(canonical_capitalization("<this>"), "<this>");
    }
}
