//! Enrichment reference table and fuzzy company-name resolution.
//!
//! The table is loaded once from CSV and is read-only afterwards. A query name is
//! resolved in two passes:
//!
//! 1. case-insensitive exact name, across all rows
//! 2. a single scan in load order where each row is tested for normalized-name
//!    containment (either direction), then normalized word overlap (at least
//!    half of the shorter name); the first row passing either test wins

mod normalize;

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info, instrument};

use leadscout_shared::{Company, EnrichmentRecord, LeadScoutError, Result};

pub use normalize::{contains_either, normalize_company_name, words_overlap};

/// Header aliases for the company-name column.
const NAME_COLUMNS: &[&str] = &["company", "company_name", "name"];
/// Header aliases for the domain column.
const DOMAIN_COLUMNS: &[&str] = &["domain", "website", "url"];
/// Header aliases for the headcount column.
const HEADCOUNT_COLUMNS: &[&str] = &["headcount", "head_count", "employees", "employee_count"];

// ---------------------------------------------------------------------------
// Match rules
// ---------------------------------------------------------------------------

/// Which resolution rule produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    Exact,
    NormalizedContains,
    WordOverlap,
}

impl MatchRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::NormalizedContains => "normalized-contains",
            Self::WordOverlap => "word-overlap",
        }
    }
}

/// A resolved enrichment row plus the rule that matched it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution<'a> {
    pub record: &'a EnrichmentRecord,
    pub rule: MatchRule,
}

// ---------------------------------------------------------------------------
// Index
// ---------------------------------------------------------------------------

/// A stored row with its precomputed normalized name.
#[derive(Debug, Clone)]
struct IndexedRecord {
    record: EnrichmentRecord,
    normalized: String,
}

/// Read-only index over the enrichment table.
#[derive(Debug, Clone, Default)]
pub struct EnrichmentIndex {
    records: Vec<IndexedRecord>,
    /// Lowercased name → position of its first occurrence.
    exact: HashMap<String, usize>,
}

impl EnrichmentIndex {
    /// An index with no rows; every lookup misses.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build an index from rows in their load order.
    pub fn from_records(records: Vec<EnrichmentRecord>) -> Self {
        let mut exact = HashMap::new();
        let records: Vec<IndexedRecord> = records
            .into_iter()
            .filter(|r| !r.company_name.trim().is_empty())
            .enumerate()
            .map(|(i, record)| {
                exact
                    .entry(record.company_name.trim().to_lowercase())
                    .or_insert(i);
                IndexedRecord {
                    normalized: normalize_company_name(&record.company_name),
                    record,
                }
            })
            .collect();

        Self { records, exact }
    }

    /// Load the table from a CSV file.
    ///
    /// Fails if the file is missing, has no company-name column, or contains a
    /// malformed row. Callers that treat enrichment as optional should fall back
    /// to [`EnrichmentIndex::empty`].
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| LeadScoutError::io(path, e))?;
        let records = parse_csv(&content)?;
        info!(records = records.len(), "loaded enrichment table");
        Ok(Self::from_records(records))
    }

    /// Number of rows in the index.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Resolve a free-text company name to its best enrichment row.
    pub fn resolve(&self, name: &str) -> Option<&EnrichmentRecord> {
        self.resolve_with_rule(name).map(|r| r.record)
    }

    /// Like [`resolve`](Self::resolve), also reporting the matching rule.
    pub fn resolve_with_rule(&self, name: &str) -> Option<Resolution<'_>> {
        let query = name.trim();
        if query.is_empty() || self.records.is_empty() {
            return None;
        }

        if let Some(&i) = self.exact.get(&query.to_lowercase()) {
            return Some(self.resolution(i, MatchRule::Exact));
        }

        let normalized = normalize_company_name(query);
        if normalized.is_empty() {
            return None;
        }

        // first row in load order passing either fuzzy rule wins
        self.records
            .iter()
            .enumerate()
            .find_map(|(i, r)| {
                if contains_either(&r.normalized, &normalized) {
                    Some((i, MatchRule::NormalizedContains))
                } else if words_overlap(&normalized, &r.normalized) {
                    Some((i, MatchRule::WordOverlap))
                } else {
                    None
                }
            })
            .map(|(i, rule)| self.resolution(i, rule))
    }

    /// Resolve `company.name` and copy domain/headcount on a hit.
    ///
    /// Returns whether a row matched; a miss leaves the company untouched.
    pub fn enrich(&self, company: &mut Company) -> bool {
        match self.resolve_with_rule(&company.name) {
            Some(Resolution { record, rule }) => {
                company.apply_enrichment(record);
                debug!(
                    company = %company.name,
                    matched = %record.company_name,
                    rule = rule.as_str(),
                    "enriched company"
                );
                true
            }
            None => {
                debug!(company = %company.name, "no enrichment match");
                false
            }
        }
    }

    fn resolution(&self, i: usize, rule: MatchRule) -> Resolution<'_> {
        Resolution {
            record: &self.records[i].record,
            rule,
        }
    }
}

// ---------------------------------------------------------------------------
// CSV parsing
// ---------------------------------------------------------------------------

/// Parse enrichment rows from CSV text with aliased headers.
pub fn parse_csv(content: &str) -> Result<Vec<EnrichmentRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| LeadScoutError::Enrichment(format!("invalid CSV header: {e}")))?
        .clone();

    let name_col = find_column(&headers, NAME_COLUMNS).ok_or_else(|| {
        LeadScoutError::Enrichment(format!(
            "no company column (expected one of {})",
            NAME_COLUMNS.join(", ")
        ))
    })?;
    let domain_col = find_column(&headers, DOMAIN_COLUMNS);
    let headcount_col = find_column(&headers, HEADCOUNT_COLUMNS);

    let mut records = Vec::new();
    for (line, row) in reader.records().enumerate() {
        let row = row.map_err(|e| {
            LeadScoutError::Enrichment(format!("malformed CSV row {}: {e}", line + 2))
        })?;

        let company_name = row.get(name_col).unwrap_or_default().to_string();
        if company_name.is_empty() {
            continue;
        }

        let domain = domain_col
            .and_then(|c| row.get(c))
            .unwrap_or_default()
            .to_string();
        let headcount = headcount_col
            .and_then(|c| row.get(c))
            .and_then(parse_headcount);

        records.push(EnrichmentRecord {
            company_name,
            domain,
            headcount,
        });
    }

    Ok(records)
}

/// Locate the first header matching any alias (case-insensitive).
fn find_column(headers: &csv::StringRecord, aliases: &[&str]) -> Option<usize> {
    aliases.iter().find_map(|alias| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(alias))
    })
}

/// Parse a headcount cell; blanks and junk are treated as unknown.
fn parse_headcount(cell: &str) -> Option<u32> {
    let cleaned: String = cell.chars().filter(|c| *c != ',').collect();
    cleaned.trim().parse::<u32>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, domain: &str, headcount: Option<u32>) -> EnrichmentRecord {
        EnrichmentRecord {
            company_name: name.into(),
            domain: domain.into(),
            headcount,
        }
    }

    fn sample_index() -> EnrichmentIndex {
        EnrichmentIndex::from_records(vec![
            record("TechFlow Analytics Inc.", "techflow.ai", Some(45)),
            record("DataVision Corp", "datavision.io", Some(120)),
            record("Cloud Sync Solutions", "cloudsync.dev", Some(30)),
            record("Acme", "acme.com", Some(10)),
            record("ACME", "acme-duplicate.com", Some(99)),
        ])
    }

    #[test]
    fn exact_match_is_case_insensitive() {
        let index = sample_index();
        let hit = index.resolve_with_rule("datavision corp").unwrap();
        assert_eq!(hit.record.domain, "datavision.io");
        assert_eq!(hit.rule, MatchRule::Exact);
    }

    #[test]
    fn exact_match_prefers_first_loaded_row() {
        let index = sample_index();
        assert_eq!(index.resolve("acme").unwrap().domain, "acme.com");
    }

    #[test]
    fn normalized_containment_match() {
        let index = sample_index();
        let hit = index.resolve_with_rule("TechFlow").unwrap();
        assert_eq!(hit.record.domain, "techflow.ai");
        assert_eq!(hit.rule, MatchRule::NormalizedContains);

        let hit = index.resolve_with_rule("DataVision, Ltd.").unwrap();
        assert_eq!(hit.record.domain, "datavision.io");
        assert_eq!(hit.rule, MatchRule::NormalizedContains);
    }

    #[test]
    fn word_overlap_match() {
        let index = sample_index();
        let hit = index.resolve_with_rule("Sync Cloud Platform").unwrap();
        assert_eq!(hit.record.domain, "cloudsync.dev");
        assert_eq!(hit.rule, MatchRule::WordOverlap);
    }

    #[test]
    fn earlier_overlap_row_beats_later_containment_row() {
        // Row 0 only overlaps by words, row 1 contains the query: load order wins.
        let index = EnrichmentIndex::from_records(vec![
            record("Blue Ocean Robotics", "overlap.com", None),
            record("Ocean Robotics Labs", "contains.com", None),
        ]);
        let hit = index.resolve_with_rule("Ocean Robotics Labs Group").unwrap();
        assert_eq!(hit.record.domain, "overlap.com");
        assert_eq!(hit.rule, MatchRule::WordOverlap);
    }

    #[test]
    fn earlier_containment_row_beats_later_overlap_row() {
        let index = EnrichmentIndex::from_records(vec![
            record("Ocean Robotics Labs", "contains.com", None),
            record("Blue Ocean Robotics", "overlap.com", None),
        ]);
        let hit = index.resolve_with_rule("Ocean Robotics Labs Group").unwrap();
        assert_eq!(hit.record.domain, "contains.com");
        assert_eq!(hit.rule, MatchRule::NormalizedContains);
    }

    #[test]
    fn exact_match_beats_earlier_fuzzy_row() {
        let index = EnrichmentIndex::from_records(vec![
            record("Ocean Robotics Labs", "fuzzy.com", None),
            record("Ocean Robotics", "exact.com", None),
        ]);
        let hit = index.resolve_with_rule("ocean robotics").unwrap();
        assert_eq!(hit.record.domain, "exact.com");
        assert_eq!(hit.rule, MatchRule::Exact);
    }

    #[test]
    fn no_match_returns_none() {
        let index = sample_index();
        assert!(index.resolve("Quantum Widgets").is_none());
        assert!(index.resolve("").is_none());
        assert!(index.resolve("Inc.").is_none());
    }

    #[test]
    fn resolution_is_deterministic() {
        let index = sample_index();
        let first = index.resolve("techflow analytics").cloned();
        for _ in 0..5 {
            assert_eq!(index.resolve("techflow analytics").cloned(), first);
        }
    }

    #[test]
    fn empty_index_never_matches() {
        let index = EnrichmentIndex::empty();
        assert!(index.is_empty());
        assert!(index.resolve("Acme").is_none());
    }

    #[test]
    fn enrich_copies_fields_on_hit_only() {
        let index = sample_index();
        let mut hit = Company::named("TechFlow Analytics");
        assert!(index.enrich(&mut hit));
        assert_eq!(hit.domain.as_deref(), Some("techflow.ai"));
        assert_eq!(hit.headcount, Some(45));

        let mut miss = Company::named("Nobody Knows");
        assert!(!index.enrich(&mut miss));
        assert!(miss.domain.is_none());
        assert!(miss.headcount.is_none());
    }

    #[test]
    fn csv_with_aliased_headers() {
        let csv = "Company_Name,Website,Employees\n\
                   TechFlow Analytics,techflow.ai,45\n\
                   DataVision Corp,datavision.io,\n\
                   ,orphan.com,3\n\
                   SecureBank,securebank.nl,\"1,200\"\n";
        let records = parse_csv(csv).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].company_name, "TechFlow Analytics");
        assert_eq!(records[0].headcount, Some(45));
        assert_eq!(records[1].headcount, None);
        assert_eq!(records[2].headcount, Some(1200));
    }

    #[test]
    fn csv_without_name_column_is_rejected() {
        let err = parse_csv("domain,headcount\nacme.com,10\n").unwrap_err();
        assert!(err.to_string().contains("no company column"));
    }

    #[test]
    fn csv_domain_column_is_optional() {
        let records = parse_csv("name\nAcme\n").unwrap();
        assert_eq!(records[0].domain, "");
        assert_eq!(records[0].headcount, None);
    }

    #[test]
    fn missing_file_is_an_error() {
        let path = std::env::temp_dir().join("leadscout-no-such-table.csv");
        assert!(EnrichmentIndex::load(&path).is_err());
    }

    #[test]
    fn load_from_file() {
        let path = std::env::temp_dir().join(format!(
            "leadscout_enrichment_{}.csv",
            std::process::id()
        ));
        std::fs::write(&path, "company,domain,headcount\nAcme,acme.com,10\n").unwrap();
        let index = EnrichmentIndex::load(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(index.len(), 1);
        assert_eq!(index.resolve("ACME").unwrap().domain, "acme.com");
    }
}
