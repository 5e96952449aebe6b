//! Company-name canonicalization and the word-overlap similarity test.

/// Legal-form tokens dropped during normalization (compared before dots are removed).
const LEGAL_SUFFIXES: &[&str] = &[
    "inc", "inc.", "ltd", "ltd.", "llc", "llc.", "corp", "corp.", "co.",
];

/// Minimum token length (exclusive) that counts toward word overlap.
const MIN_OVERLAP_TOKEN_LEN: usize = 2;

/// Overlap ratio at which two names are considered the same company.
const OVERLAP_THRESHOLD: f64 = 0.5;

/// Canonicalize a company name for fuzzy comparison.
///
/// Lowercases, turns `&` into `and`, removes commas, splits on whitespace
/// and `-`, drops legal-form tokens, removes dots, and joins with single spaces.
pub fn normalize_company_name(name: &str) -> String {
    let lowered = name
        .to_lowercase()
        .replace('&', " and ")
        .replace(',', "")
        .replace('-', " ");

    lowered
        .split_whitespace()
        .filter(|token| !LEGAL_SUFFIXES.contains(token))
        .map(|token| token.replace('.', ""))
        .filter(|token| !token.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Substring containment in either direction. Empty names never match.
pub fn contains_either(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a.contains(b) || b.contains(a)
}

/// Whether two normalized names share at least half of the shorter name's words.
///
/// Only distinct tokens longer than two characters count as shared; the
/// denominator is the token count of the shorter name.
pub fn words_overlap(a: &str, b: &str) -> bool {
    let words_a: Vec<&str> = a.split_whitespace().collect();
    let words_b: Vec<&str> = b.split_whitespace().collect();

    if words_a.is_empty() || words_b.is_empty() {
        return false;
    }

    let mut shared: Vec<&str> = words_a
        .iter()
        .copied()
        .filter(|w| w.chars().count() > MIN_OVERLAP_TOKEN_LEN && words_b.contains(w))
        .collect();
    shared.sort_unstable();
    shared.dedup();

    let overlap = shared.len();
    let min_words = words_a.len().min(words_b.len());

    overlap > 0 && overlap as f64 / min_words as f64 >= OVERLAP_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_legal_suffixes_and_punctuation() {
        assert_eq!(normalize_company_name("Acme Inc."), "acme");
        assert_eq!(normalize_company_name("Acme, Ltd"), "acme");
        assert_eq!(normalize_company_name("DataVision Corp"), "datavision");
        assert_eq!(normalize_company_name("Widget Co."), "widget");
        assert_eq!(normalize_company_name("  Foo LLC  "), "foo");
    }

    #[test]
    fn commas_are_removed_not_spaced() {
        assert_eq!(normalize_company_name("Foo,Bar"), "foobar");
        assert_eq!(normalize_company_name("Foo, Bar"), "foo bar");
        assert!(contains_either(&normalize_company_name("Foo,Bar Labs"), "foobar"));
    }

    #[test]
    fn suffix_inside_a_word_is_kept() {
        assert_eq!(normalize_company_name("Incubator Labs"), "incubator labs");
        assert_eq!(normalize_company_name("Cocoa Corporation"), "cocoa corporation");
    }

    #[test]
    fn ampersand_and_hyphen() {
        assert_eq!(normalize_company_name("Smith & Wesson"), "smith and wesson");
        assert_eq!(
            normalize_company_name("Smith & Wesson"),
            normalize_company_name("Smith and Wesson")
        );
        assert_eq!(normalize_company_name("Auto-Insights"), "auto insights");
        assert_eq!(normalize_company_name("A.I. Works"), "ai works");
    }

    #[test]
    fn only_suffix_normalizes_to_empty() {
        assert_eq!(normalize_company_name("Inc."), "");
        assert!(!contains_either("", "acme"));
    }

    #[test]
    fn containment_is_bidirectional() {
        assert!(contains_either("techflow analytics", "techflow"));
        assert!(contains_either("techflow", "techflow analytics"));
        assert!(!contains_either("techflow", "dataflow"));
    }

    #[test]
    fn word_overlap_half_of_shorter_name() {
        assert!(words_overlap("cloud sync solutions", "sync cloud"));
        assert!(words_overlap("secure bank group", "secure payments"));
        assert!(!words_overlap("blue river labs", "green valley labs extra"));
    }

    #[test]
    fn short_tokens_do_not_count() {
        // "ai" is too short to count as shared
        assert!(!words_overlap("ai labs", "ai works"));
    }

    #[test]
    fn duplicate_tokens_count_once() {
        // one distinct shared word over a two-word minimum
        assert!(words_overlap("data data", "data vision"));
        assert!(!words_overlap("data data data", "data vision lab"));
    }
}
