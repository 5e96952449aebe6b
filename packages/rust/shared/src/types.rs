//! Core domain types for LeadScout: companies, the ICP, and enrichment rows.

use serde::{Deserialize, Serialize};

/// Maximum length (in characters) of a company snippet.
pub const SNIPPET_MAX_CHARS: usize = 200;

// ---------------------------------------------------------------------------
// Company
// ---------------------------------------------------------------------------

/// A lead extracted from a newsletter.
///
/// Created by extraction, then filled in by enrichment, scoring and outreach.
/// The serialized key names are the export format (`company`, `round`, `HQ`,
/// `icpScore`, ...), so downstream consumers can round-trip the JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Company {
    /// Company name; join and dedup key.
    #[serde(rename = "company", default)]
    pub name: String,
    /// Funding round, e.g. "Series A" or "Seed".
    #[serde(rename = "round", default)]
    pub funding_round: String,
    /// Funding amount as written, e.g. "$5M" or "€250K".
    #[serde(rename = "amount", default)]
    pub funding_amount: String,
    /// Free-text industry label.
    #[serde(default)]
    pub sector: String,
    /// Free-text "city, country".
    #[serde(rename = "HQ", default)]
    pub headquarters: String,
    /// Short description used for keyword matching.
    #[serde(default)]
    pub snippet: String,
    /// Website domain, set only by enrichment.
    #[serde(default)]
    pub domain: Option<String>,
    /// Employee count, set only by enrichment.
    #[serde(default)]
    pub headcount: Option<u32>,
    /// ICP match score in [0, 1].
    #[serde(rename = "icpScore", default)]
    pub icp_score: f64,
    /// Generated outreach text.
    #[serde(rename = "outreachMessage", default)]
    pub outreach_message: String,
}

impl Company {
    /// Create a company with only a name set.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Key used to collapse the same company seen in several newsletters.
    ///
    /// Case-insensitive; `.` and `,` are ignored and whitespace is collapsed,
    /// so "Acme Inc." and "acme inc" share a key.
    pub fn dedup_key(&self) -> String {
        self.name
            .to_lowercase()
            .replace(['.', ','], " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Copy domain and headcount from a matched enrichment row.
    pub fn apply_enrichment(&mut self, record: &EnrichmentRecord) {
        if !record.domain.is_empty() {
            self.domain = Some(record.domain.clone());
        }
        self.headcount = record.headcount;
    }
}

/// Truncate a snippet to [`SNIPPET_MAX_CHARS`] characters on a char boundary.
pub fn truncate_snippet(snippet: &str) -> String {
    let trimmed = snippet.trim();
    match trimmed.char_indices().nth(SNIPPET_MAX_CHARS) {
        Some((idx, _)) => trimmed[..idx].trim_end().to_string(),
        None => trimmed.to_string(),
    }
}

// ---------------------------------------------------------------------------
// ICP
// ---------------------------------------------------------------------------

/// Ideal Customer Profile, loaded once from `icp.json`.
///
/// An empty list disables the matching sub-score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Icp {
    #[serde(rename = "industry", default)]
    pub industries: Vec<String>,
    #[serde(rename = "stage", default)]
    pub stages: Vec<String>,
    #[serde(default)]
    pub size: SizeRange,
    #[serde(rename = "geo", default)]
    pub geographies: Vec<String>,
    #[serde(default)]
    pub tech_hints: Vec<String>,
}

/// Company-size window of the ICP.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SizeRange {
    #[serde(default)]
    pub min_employees: u32,
    /// `0` disables the headcount factor.
    #[serde(default)]
    pub max_employees: u32,
    /// Empty disables the funding factor.
    #[serde(default)]
    pub funding_min: String,
    /// Empty means no upper bound.
    #[serde(default)]
    pub funding_max: String,
}

// ---------------------------------------------------------------------------
// EnrichmentRecord
// ---------------------------------------------------------------------------

/// One row of the enrichment reference table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentRecord {
    pub company_name: String,
    pub domain: String,
    pub headcount: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn company_serializes_with_export_keys() {
        let company = Company {
            name: "Acme".into(),
            funding_round: "Seed".into(),
            funding_amount: "$2M".into(),
            sector: "FinTech".into(),
            headquarters: "Austin, USA".into(),
            snippet: "AI lending".into(),
            domain: Some("acme.io".into()),
            headcount: Some(12),
            icp_score: 0.75,
            outreach_message: "Hi".into(),
        };
        let json = serde_json::to_value(&company).unwrap();
        assert_eq!(json["company"], "Acme");
        assert_eq!(json["round"], "Seed");
        assert_eq!(json["amount"], "$2M");
        assert_eq!(json["HQ"], "Austin, USA");
        assert_eq!(json["headcount"], 12);
        assert_eq!(json["icpScore"], 0.75);
        assert_eq!(json["outreachMessage"], "Hi");
    }

    #[test]
    fn company_deserializes_with_missing_fields() {
        let company: Company = serde_json::from_str(r#"{"company":"Acme"}"#).unwrap();
        assert_eq!(company.name, "Acme");
        assert!(company.sector.is_empty());
        assert!(company.domain.is_none());
        assert_eq!(company.icp_score, 0.0);
    }

    #[test]
    fn dedup_key_ignores_case_and_punctuation() {
        let a = Company::named("Acme Inc.");
        let b = Company::named("acme  inc");
        assert_eq!(a.dedup_key(), b.dedup_key());
        assert_ne!(a.dedup_key(), Company::named("Acme Labs").dedup_key());
    }

    #[test]
    fn apply_enrichment_sets_domain_and_headcount() {
        let mut company = Company::named("Acme");
        company.apply_enrichment(&EnrichmentRecord {
            company_name: "Acme Inc".into(),
            domain: "acme.io".into(),
            headcount: Some(40),
        });
        assert_eq!(company.domain.as_deref(), Some("acme.io"));
        assert_eq!(company.headcount, Some(40));
    }

    #[test]
    fn apply_enrichment_skips_empty_domain() {
        let mut company = Company::named("Acme");
        company.apply_enrichment(&EnrichmentRecord {
            company_name: "Acme".into(),
            domain: String::new(),
            headcount: None,
        });
        assert!(company.domain.is_none());
        assert!(company.headcount.is_none());
    }

    #[test]
    fn snippet_truncation_respects_char_boundaries() {
        let long = "é".repeat(250);
        let cut = truncate_snippet(&long);
        assert_eq!(cut.chars().count(), SNIPPET_MAX_CHARS);
        assert_eq!(truncate_snippet("  short  "), "short");
    }

    #[test]
    fn icp_parses_config_keys() {
        let json = r#"{
            "industry": ["FinTech"],
            "stage": ["Seed"],
            "geo": ["USA"],
            "tech_hints": ["AI"],
            "size": {"min_employees": 0, "max_employees": 1000, "funding_min": "$1M", "funding_max": "$10M"}
        }"#;
        let icp: Icp = serde_json::from_str(json).unwrap();
        assert_eq!(icp.industries, vec!["FinTech"]);
        assert_eq!(icp.geographies, vec!["USA"]);
        assert_eq!(icp.size.max_employees, 1000);
        assert_eq!(icp.size.funding_max, "$10M");
    }
}
