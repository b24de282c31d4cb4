use super::countries::{VocabularyEntry, ABBREVIATION_VOCABULARY, COUNTRY_VOCABULARY};
use itertools::Itertools;
use std::fmt;
use unidecode::unidecode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CountryCode(pub &'static str);

impl CountryCode {
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Result of matching one token. `NoMatch` orders before every country so a
/// sorted set keeps it at the front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CountryMatch {
    NoMatch,
    Country(CountryCode),
}

impl CountryMatch {
    pub fn is_match(&self) -> bool {
        matches!(self, CountryMatch::Country(_))
    }

    /// Code as written to flat exports; `NoMatch` is an empty cell.
    pub fn export_code(&self) -> &'static str {
        match self {
            CountryMatch::Country(code) => code.as_str(),
            CountryMatch::NoMatch => "",
        }
    }
}

impl fmt::Display for CountryMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CountryMatch::Country(code) => code.fmt(f),
            CountryMatch::NoMatch => f.write_str("NO_MATCH"),
        }
    }
}

/// Matches a token or short phrase against the country vocabulary. Names
/// match case-insensitively with diacritics folded and whitespace runs
/// collapsed; abbreviations only in capitals.
pub fn match_token(token: &str) -> CountryMatch {
    let ascii = unidecode(token).split_whitespace().join(" ");
    let ascii = ascii.trim_matches(|c: char| !c.is_ascii_alphanumeric());
    let ascii = ascii
        .strip_suffix("'s")
        .or_else(|| ascii.strip_suffix("'S"))
        .unwrap_or(ascii);
    if ascii.is_empty() {
        return CountryMatch::NoMatch;
    }

    if let Some(code) = find_code(&ABBREVIATION_VOCABULARY, ascii) {
        return CountryMatch::Country(CountryCode(code));
    }

    match find_code(&COUNTRY_VOCABULARY, &ascii.to_lowercase()) {
        Some(code) => CountryMatch::Country(CountryCode(code)),
        None => CountryMatch::NoMatch,
    }
}

fn find_code(vocabulary: &[VocabularyEntry], token: &str) -> Option<&'static str> {
    vocabulary
        .iter()
        .find(|entry| entry.pattern.is_match(token))
        .map(|entry| entry.code)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(token: &str) -> Option<&'static str> {
        match match_token(token) {
            CountryMatch::Country(code) => Some(code.as_str()),
            CountryMatch::NoMatch => None,
        }
    }

    #[test]
    fn names_match_regardless_of_case() {
        assert_eq!(code("Iraq"), Some("IRQ"));
        assert_eq!(code("IRAQ"), Some("IRQ"));
        assert_eq!(code("syria"), Some("SYR"));
    }

    #[test]
    fn diacritics_and_possessives_are_folded() {
        assert_eq!(code("Türkiye"), Some("TUR"));
        assert_eq!(code("Côte"), None);
        assert_eq!(code("d'Ivoire"), Some("CIV"));
        assert_eq!(code("Israel's"), Some("ISR"));
        assert_eq!(code("Pakistan’s"), Some("PAK"));
    }

    #[test]
    fn substrings_and_superstrings_do_not_match() {
        assert_eq!(code("Ira"), None);
        assert_eq!(code("Iraqi"), None);
        assert_eq!(code("Nigerian"), None);
        assert_eq!(code("Niger"), Some("NER"));
        assert_eq!(code("Nigeria"), Some("NGA"));
    }

    #[test]
    fn phrases_match_multi_word_names() {
        assert_eq!(code("Sri Lanka"), Some("LKA"));
        assert_eq!(code("Saudi Arabia"), Some("SAU"));
        assert_eq!(code("united  states"), Some("USA"));
        assert_eq!(code("North\tKorea"), Some("PRK"));
        assert_eq!(code("South Korea"), Some("KOR"));
        assert_eq!(code("South Africa"), Some("ZAF"));
        assert_eq!(code("Equatorial Guinea"), Some("GNQ"));
        assert_eq!(code("Côte d'Ivoire"), Some("CIV"));
        assert_eq!(code("Democratic Republic of the Congo"), Some("COD"));
        assert_eq!(code("New Zealand's"), Some("NZL"));
        assert_eq!(code("South Iraq"), None);
    }

    #[test]
    fn bare_korea_is_south_korea() {
        assert_eq!(code("Korea"), Some("KOR"));
    }

    #[test]
    fn abbreviations_are_case_sensitive() {
        assert_eq!(code("US"), Some("USA"));
        assert_eq!(code("us"), None);
        assert_eq!(code("UAE"), Some("ARE"));
        assert_eq!(code("car"), None);
    }

    #[test]
    fn connectors_and_empty_tokens_do_not_match() {
        for token in ["and", "the", "of", "", "–"] {
            assert_eq!(match_token(token), CountryMatch::NoMatch);
        }
    }

    #[test]
    fn no_match_sorts_first() {
        let mut matches = vec![
            CountryMatch::Country(CountryCode("SYR")),
            CountryMatch::NoMatch,
            CountryMatch::Country(CountryCode("IRQ")),
        ];
        matches.sort();
        assert_eq!(matches[0], CountryMatch::NoMatch);
        assert_eq!(matches[1].to_string(), "IRQ");
    }
}
