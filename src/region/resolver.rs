use super::matcher::{match_token, CountryMatch};
use itertools::Itertools;

/// Strips punctuation that would glue tokens to country names. Hyphens become
/// spaces so hyphenated names fall apart into their parts.
pub fn normalize(raw_text: &str) -> String {
    raw_text
        .chars()
        .filter_map(|c| match c {
            '–' | '—' | ',' | ';' | '.' | '(' | ')' => None,
            '-' => Some(' '),
            c => Some(c),
        })
        .collect()
}

/// Resolves free text into a sorted, duplicate-free list of country codes.
/// Text naming no country resolves to the single element `NoMatch`.
pub fn resolve(raw_text: &str) -> Vec<CountryMatch> {
    let normalized = normalize(raw_text);
    let matches: Vec<CountryMatch> = normalized
        .split_whitespace()
        .map(match_token)
        .unique()
        .sorted()
        .collect();

    let countries: Vec<CountryMatch> = matches.iter().copied().filter(CountryMatch::is_match).collect();
    match countries.is_empty() {
        true => vec![CountryMatch::NoMatch],
        false => countries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::matcher::CountryCode;

    fn codes(raw_text: &str) -> Vec<String> {
        resolve(raw_text).iter().map(|m| m.to_string()).collect()
    }

    #[test]
    fn normalize_strips_punctuation_and_splits_hyphens() {
        assert_eq!(normalize("Iraq, Syria; (Jordan)."), "Iraq Syria Jordan");
        assert_eq!(normalize("Guinea-Bissau"), "Guinea Bissau");
        assert_eq!(normalize("operation – Iraq"), "operation  Iraq");
    }

    #[test]
    fn resolves_dedups_and_sorts() {
        assert_eq!(codes("areas of operation – Iraq, Syria and Iraq"), vec!["IRQ", "SYR"]);
        assert_eq!(codes("Syria, Lebanon, Iraq"), vec!["IRQ", "LBN", "SYR"]);
    }

    #[test]
    fn text_without_countries_is_no_match() {
        assert_eq!(resolve(""), vec![CountryMatch::NoMatch]);
        assert_eq!(resolve("and the"), vec![CountryMatch::NoMatch]);
        assert_eq!(resolve(""), resolve("and the"));
        assert_eq!(resolve("worldwide"), vec![CountryMatch::NoMatch]);
    }

    #[test]
    fn resolution_is_deterministic() {
        let text = "primarily Afghanistan and Pakistan; some presence in Iran, India";
        assert_eq!(resolve(text), resolve(text));
        assert_eq!(codes(text), vec!["AFG", "IND", "IRN", "PAK"]);
    }

    #[test]
    fn output_has_no_duplicates_and_no_sentinel_beside_countries() {
        for text in ["Iraq Iraq iraq IRAQ", "Somalia, Kenya, Somalia and Ethiopia", "the US and the UK"] {
            let resolved = resolve(text);
            assert!(!resolved.contains(&CountryMatch::NoMatch));
            assert!(resolved.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn multi_word_names_resolve_token_by_token() {
        assert_eq!(codes("Guinea-Bissau"), vec!["GIN", "GNB"]);
        assert_eq!(
            resolve("Saudi Arabia"),
            vec![CountryMatch::Country(CountryCode("SAU"))]
        );
        assert_eq!(codes("Sri Lanka"), vec!["NO_MATCH"]);
        assert_eq!(codes("North Korea and South Korea"), vec!["KOR"]);
    }
}
