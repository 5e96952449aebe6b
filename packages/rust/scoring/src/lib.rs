//! ICP scoring: a deterministic, weighted multi-criteria match score.
//!
//! Five sub-scores, each in [0, 1], are multiplied by fixed weights and summed.
//! A sub-score whose ICP list is empty is skipped entirely (it adds neither score
//! nor weight), so a sparse ICP caps the attainable total below 1.0. The size
//! sub-score is always computed. The total is clamped to [0, 1].

mod amount;
mod icp;

use serde::Serialize;

use leadscout_shared::{Company, Icp, SizeRange};

pub use amount::parse_funding_amount;
pub use icp::{load_icp, parse_icp};

pub const INDUSTRY_WEIGHT: f64 = 0.25;
pub const STAGE_WEIGHT: f64 = 0.20;
pub const GEOGRAPHY_WEIGHT: f64 = 0.15;
pub const SIZE_WEIGHT: f64 = 0.20;
pub const TECH_WEIGHT: f64 = 0.20;

/// Industry keyword hit (no full-label containment).
const PARTIAL_INDUSTRY_SCORE: f64 = 0.6;
/// Value outside the range but within the widened window.
const NEAR_RANGE_SCORE: f64 = 0.6;
/// Size sub-score when neither headcount nor funding can be compared.
const DEFAULT_SIZE_SCORE: f64 = 0.5;
/// Widened window is `[min * LOWER_SLACK, max * UPPER_SLACK]`.
const LOWER_SLACK: f64 = 0.5;
const UPPER_SLACK: f64 = 1.5;
/// Industry keywords must be longer than this many characters.
const MIN_KEYWORD_LEN: usize = 2;

// ---------------------------------------------------------------------------
// Breakdown
// ---------------------------------------------------------------------------

/// Per-criterion sub-scores (before weighting) and the weighted total.
///
/// Disabled criteria are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub industry: Option<f64>,
    pub stage: Option<f64>,
    pub geography: Option<f64>,
    pub size: f64,
    pub tech: Option<f64>,
    pub total: f64,
}

/// Score a company against the ICP; always in [0, 1].
pub fn score(company: &Company, icp: &Icp) -> f64 {
    breakdown(company, icp).total
}

/// Compute every sub-score and the weighted total.
pub fn breakdown(company: &Company, icp: &Icp) -> ScoreBreakdown {
    let industry = (!icp.industries.is_empty())
        .then(|| industry_score(&company.sector, &icp.industries));
    let stage = (!icp.stages.is_empty()).then(|| any_contained(&company.funding_round, &icp.stages));
    let geography = (!icp.geographies.is_empty())
        .then(|| any_contained(&company.headquarters, &icp.geographies));
    let size = size_score(company, &icp.size);
    let tech = (!icp.tech_hints.is_empty()).then(|| tech_score(&company.snippet, &icp.tech_hints));

    let total = industry.unwrap_or(0.0) * INDUSTRY_WEIGHT
        + stage.unwrap_or(0.0) * STAGE_WEIGHT
        + geography.unwrap_or(0.0) * GEOGRAPHY_WEIGHT
        + size * SIZE_WEIGHT
        + tech.unwrap_or(0.0) * TECH_WEIGHT;

    ScoreBreakdown {
        industry,
        stage,
        geography,
        size,
        tech,
        total: total.clamp(0.0, 1.0),
    }
}

// ---------------------------------------------------------------------------
// Sub-scores
// ---------------------------------------------------------------------------

/// Case-insensitive containment; an empty side never matches.
fn contains_ci(haystack: &str, needle: &str) -> bool {
    let haystack = haystack.trim();
    let needle = needle.trim();
    if haystack.is_empty() || needle.is_empty() {
        return false;
    }
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// 1.0 when the field contains any target, else 0.0.
fn any_contained(field: &str, targets: &[String]) -> f64 {
    if targets.iter().any(|t| contains_ci(field, t)) {
        1.0
    } else {
        0.0
    }
}

fn industry_score(sector: &str, industries: &[String]) -> f64 {
    if sector.trim().is_empty() {
        return 0.0;
    }

    if industries
        .iter()
        .any(|i| contains_ci(sector, i) || contains_ci(i, sector))
    {
        return 1.0;
    }

    let keyword_hit = industries
        .iter()
        .flat_map(|i| i.split([' ', '-', '&']))
        .filter(|k| k.chars().count() > MIN_KEYWORD_LEN)
        .any(|k| contains_ci(sector, k));

    if keyword_hit {
        PARTIAL_INDUSTRY_SCORE
    } else {
        0.0
    }
}

fn size_score(company: &Company, size: &SizeRange) -> f64 {
    let mut factors: Vec<f64> = Vec::with_capacity(2);

    if let Some(headcount) = company.headcount {
        if size.max_employees > 0 {
            factors.push(range_factor(
                f64::from(headcount),
                f64::from(size.min_employees),
                f64::from(size.max_employees),
            ));
        }
    }

    if !company.funding_amount.trim().is_empty() && !size.funding_min.trim().is_empty() {
        let value = parse_funding_amount(&company.funding_amount);
        let min = parse_funding_amount(&size.funding_min);
        let max = if size.funding_max.trim().is_empty() {
            f64::INFINITY
        } else {
            parse_funding_amount(&size.funding_max)
        };
        factors.push(range_factor(value, min, max));
    }

    if factors.is_empty() {
        DEFAULT_SIZE_SCORE
    } else {
        factors.iter().sum::<f64>() / factors.len() as f64
    }
}

/// 1.0 inside `[min, max]`, 0.6 inside the widened window, else 0.0.
fn range_factor(value: f64, min: f64, max: f64) -> f64 {
    if value >= min && value <= max {
        1.0
    } else if value >= min * LOWER_SLACK && value <= max * UPPER_SLACK {
        NEAR_RANGE_SCORE
    } else {
        0.0
    }
}

/// Fraction of tech hints found in the snippet.
fn tech_score(snippet: &str, hints: &[String]) -> f64 {
    if snippet.trim().is_empty() || hints.is_empty() {
        return 0.0;
    }
    let matches = hints.iter().filter(|h| contains_ci(snippet, h)).count();
    matches as f64 / hints.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn acme() -> Company {
        Company {
            name: "Acme".into(),
            funding_round: "Seed".into(),
            funding_amount: "$2M".into(),
            sector: "FinTech".into(),
            headquarters: "Austin, USA".into(),
            snippet: "AI lending".into(),
            ..Default::default()
        }
    }

    fn full_icp() -> Icp {
        Icp {
            industries: strings(&["FinTech"]),
            stages: strings(&["Seed"]),
            geographies: strings(&["USA"]),
            tech_hints: strings(&["AI"]),
            size: SizeRange {
                min_employees: 0,
                max_employees: 1000,
                funding_min: "$1M".into(),
                funding_max: "$10M".into(),
            },
        }
    }

    #[test]
    fn perfect_match_scores_one() {
        let b = breakdown(&acme(), &full_icp());
        assert_eq!(b.industry, Some(1.0));
        assert_eq!(b.stage, Some(1.0));
        assert_eq!(b.geography, Some(1.0));
        assert_eq!(b.size, 1.0);
        assert_eq!(b.tech, Some(1.0));
        assert!((b.total - 1.0).abs() < EPS);
    }

    #[test]
    fn industry_containment_either_direction() {
        let industries = strings(&["Financial Technology"]);
        assert_eq!(industry_score("financial technology", &industries), 1.0);
        assert_eq!(industry_score("Technology", &industries), 1.0);
        assert_eq!(industry_score("Fintech & Lending", &strings(&["fintech"])), 1.0);
    }

    #[test]
    fn industry_keyword_partial_match() {
        // "Health" is a keyword of "Digital Health"; no full containment
        let industries = strings(&["Digital Health"]);
        assert_eq!(industry_score("Healthcare IT", &industries), PARTIAL_INDUSTRY_SCORE);
        // "AI" is too short to be a keyword
        let industries = strings(&["AI & Data-Science"]);
        assert_eq!(industry_score("AI robotics", &industries), 0.0);
        assert_eq!(industry_score("Data platforms", &industries), PARTIAL_INDUSTRY_SCORE);
        let industries = strings(&["Digital Health"]);
        assert_eq!(industry_score("Retail", &industries), 0.0);
        assert_eq!(industry_score("", &industries), 0.0);
    }

    #[test]
    fn industry_weight_contribution() {
        let icp = Icp {
            industries: strings(&["FinTech"]),
            ..Default::default()
        };
        let hit = breakdown(&acme(), &icp);
        let mut other = acme();
        other.sector = "Agriculture".into();
        let miss = breakdown(&other, &icp);
        assert!((hit.total - miss.total - INDUSTRY_WEIGHT).abs() < EPS);
        assert_eq!(miss.industry, Some(0.0));
    }

    #[test]
    fn stage_and_geo_containment() {
        let stages = strings(&["Series A"]);
        assert_eq!(any_contained("Pre-Series A", &stages), 1.0);
        assert_eq!(any_contained("series a extension", &stages), 1.0);
        assert_eq!(any_contained("Seed", &stages), 0.0);
        assert_eq!(any_contained("", &stages), 0.0);
        assert_eq!(any_contained("Berlin, Germany", &strings(&["germany"])), 1.0);
    }

    #[test]
    fn size_defaults_to_half_without_usable_data() {
        let company = Company::named("Ghost");
        let b = breakdown(&company, &Icp::default());
        assert_eq!(b.size, DEFAULT_SIZE_SCORE);
        assert!((b.total - DEFAULT_SIZE_SCORE * SIZE_WEIGHT).abs() < EPS);
    }

    #[test]
    fn headcount_factor_ranges() {
        let size = SizeRange {
            min_employees: 10,
            max_employees: 100,
            ..Default::default()
        };
        let mut company = Company::named("Acme");
        company.headcount = Some(50);
        assert_eq!(size_score(&company, &size), 1.0);
        company.headcount = Some(140);
        assert_eq!(size_score(&company, &size), NEAR_RANGE_SCORE);
        company.headcount = Some(6);
        assert_eq!(size_score(&company, &size), NEAR_RANGE_SCORE);
        company.headcount = Some(400);
        assert_eq!(size_score(&company, &size), 0.0);
    }

    #[test]
    fn headcount_ignored_when_max_is_zero() {
        let mut company = Company::named("Acme");
        company.headcount = Some(50_000);
        assert_eq!(size_score(&company, &SizeRange::default()), DEFAULT_SIZE_SCORE);
    }

    #[test]
    fn funding_factor_without_max() {
        let size = SizeRange {
            funding_min: "$1M".into(),
            ..Default::default()
        };
        let mut company = Company::named("Acme");
        company.funding_amount = "$10M".into();
        assert_eq!(size_score(&company, &size), 1.0);
        company.funding_amount = "$600K".into();
        assert_eq!(size_score(&company, &size), NEAR_RANGE_SCORE);
        company.funding_amount = "$400K".into();
        assert_eq!(size_score(&company, &size), 0.0);
        company.funding_amount = "undisclosed".into();
        assert_eq!(size_score(&company, &size), 0.0);
    }

    #[test]
    fn size_averages_both_factors() {
        let size = SizeRange {
            min_employees: 10,
            max_employees: 100,
            funding_min: "$1M".into(),
            funding_max: "$5M".into(),
        };
        let mut company = Company::named("Acme");
        company.headcount = Some(50);
        company.funding_amount = "$7M".into();
        assert!((size_score(&company, &size) - 0.8).abs() < EPS);
    }

    #[test]
    fn tech_hint_fraction() {
        let hints = strings(&["AI", "payments", "blockchain", "API"]);
        let score = tech_score("AI-powered payments API for banks", &hints);
        assert!((score - 0.75).abs() < EPS);
        assert_eq!(tech_score("", &hints), 0.0);
    }

    #[test]
    fn sparse_icp_is_not_renormalized() {
        let icp = Icp {
            stages: strings(&["Seed"]),
            ..Default::default()
        };
        let b = breakdown(&acme(), &icp);
        assert_eq!(b.industry, None);
        assert_eq!(b.geography, None);
        assert_eq!(b.tech, None);
        // stage 1.0 * 0.20 + default size 0.5 * 0.20
        assert!((b.total - 0.30).abs() < EPS);
    }

    #[test]
    fn score_always_within_unit_interval() {
        let companies = [
            Company::default(),
            acme(),
            Company {
                name: "X".into(),
                funding_amount: "$999999999M".into(),
                headcount: Some(u32::MAX),
                ..Default::default()
            },
        ];
        let icps = [Icp::default(), full_icp()];
        for company in &companies {
            for icp in &icps {
                let s = score(company, icp);
                assert!((0.0..=1.0).contains(&s), "score {s} out of range");
            }
        }
    }
}
