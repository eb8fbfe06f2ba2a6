//! Which alphabet letters still lack a default glyph.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// An alphabet a font can be built for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub code: String,
    pub alphabet: String,
}

impl Language {
    pub fn new(code: impl Into<String>, alphabet: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            alphabet: alphabet.into(),
        }
    }
}

/// Coverage of one alphabet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageStatus {
    pub language: String,
    pub ready: bool,
    pub required_chars: String,
    /// Uncovered characters, in alphabet order.
    pub missing_chars: String,
    pub missing_count: usize,
}

/// Check `alphabet` against the letters that have a default glyph.
pub fn language_status(language: &str, alphabet: &str, covered: &BTreeSet<String>) -> LanguageStatus {
    let mut buf = [0u8; 4];
    let missing: String = alphabet
        .chars()
        .filter(|c| !covered.contains(c.encode_utf8(&mut buf) as &str))
        .collect();
    let missing_count = missing.chars().count();
    LanguageStatus {
        language: language.to_string(),
        ready: missing_count == 0,
        required_chars: alphabet.to_string(),
        missing_chars: missing,
        missing_count,
    }
}

/// [`language_status`] for each language, in input order.
pub fn languages_status(languages: &[Language], covered: &BTreeSet<String>) -> Vec<LanguageStatus> {
    languages
        .iter()
        .map(|l| language_status(&l.code, &l.alphabet, covered))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn covered(letters: &[&str]) -> BTreeSet<String> {
        letters.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn reports_missing_in_alphabet_order() {
        let status = language_status("de", "ABCÄß", &covered(&["C", "A", "ß"]));
        assert!(!status.ready);
        assert_eq!(status.missing_chars, "BÄ");
        assert_eq!(status.missing_count, 2);
        assert_eq!(status.required_chars, "ABCÄß");
    }

    #[test]
    fn complete_alphabet_is_ready() {
        let status = language_status("en", "AB", &covered(&["A", "B", "Z"]));
        assert!(status.ready);
        assert!(status.missing_chars.is_empty());
    }

    #[test]
    fn multi_char_letters_never_cover_anything() {
        let status = language_status("x", "AB", &covered(&["AB"]));
        assert_eq!(status.missing_chars, "AB");
    }

    #[test]
    fn checks_every_language() {
        let langs = vec![Language::new("ab", "AB"), Language::new("a", "A")];
        let all = languages_status(&langs, &covered(&["A"]));
        let summary: Vec<(&str, bool)> = all.iter().map(|s| (s.language.as_str(), s.ready)).collect();
        assert_eq!(summary, vec![("ab", false), ("a", true)]);
    }
}
