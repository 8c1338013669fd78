//! Processing-language variants and per-variant storage.
//!
//! The pipeline forks on exactly one runtime choice: whether the uploaded
//! document is processed as English (character extraction, in-place
//! reconstruction) or Arabic (line extraction, translation, right-to-left
//! reconstruction). [`Language`] is that closed choice, and [`PerLanguage`]
//! holds one value per variant so lookups are exhaustive at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The pipeline variant selected in the language-choice step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Character-level extraction and English reconstruction. (default)
    #[default]
    English,
    /// Line-level extraction, translation and Arabic reconstruction.
    Arabic,
}

impl Language {
    /// Every variant, in the order the language-choice radio offers them.
    pub const ALL: [Language; 2] = [Language::English, Language::Arabic];

    /// Lowercase identifier used by the step catalog and the form data.
    pub fn as_str(self) -> &'static str {
        match self {
            Language::English => "english",
            Language::Arabic => "arabic",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no known pipeline variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown language '{0}': expected 'english' or 'arabic'")]
pub struct ParseLanguageError(pub String);

impl FromStr for Language {
    type Err = ParseLanguageError;

    /// Accepts the catalog identifiers plus the short codes the processing
    /// service uses (`en`, `ar`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "english" | "en" => Ok(Language::English),
            "arabic" | "ar" => Ok(Language::Arabic),
            _ => Err(ParseLanguageError(s.to_string())),
        }
    }
}

/// One value per [`Language`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerLanguage<T> {
    pub english: T,
    pub arabic: T,
}

impl<T> PerLanguage<T> {
    pub const fn new(english: T, arabic: T) -> Self {
        Self { english, arabic }
    }

    pub fn get(&self, language: Language) -> &T {
        match language {
            Language::English => &self.english,
            Language::Arabic => &self.arabic,
        }
    }

    /// Iterate `(language, value)` pairs in [`Language::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (Language, &T)> {
        Language::ALL.into_iter().map(move |l| (l, self.get(l)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_and_codes() {
        assert_eq!("english".parse::<Language>(), Ok(Language::English));
        assert_eq!("AR".parse::<Language>(), Ok(Language::Arabic));
        assert_eq!(" en ".parse::<Language>(), Ok(Language::English));
        assert!("french".parse::<Language>().is_err());
    }

    #[test]
    fn display_matches_catalog_identifier() {
        for lang in Language::ALL {
            assert_eq!(lang.to_string().parse::<Language>(), Ok(lang));
        }
    }

    #[test]
    fn serde_uses_lowercase() {
        let json = serde_json::to_string(&Language::Arabic).unwrap();
        assert_eq!(json, "\"arabic\"");
    }

    #[test]
    fn per_language_lookup() {
        let files = PerLanguage::new("en.pdf", "ar.pdf");
        assert_eq!(*files.get(Language::English), "en.pdf");
        assert_eq!(*files.get(Language::Arabic), "ar.pdf");
        let langs: Vec<_> = files.iter().map(|(l, _)| l).collect();
        assert_eq!(langs, Language::ALL.to_vec());
    }
}
