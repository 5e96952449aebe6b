//! Deterministic stand-ins for the two oracles.
//!
//! When extraction fails the pipeline scores a fixed demo dataset; when
//! outreach fails it fills one of five templates. The template is picked from
//! a SHA-256 of the company name, so a company always gets the same message
//! across runs and processes.

use sha2::{Digest, Sha256};

use leadscout_shared::{Company, truncate_snippet};

/// Keywords looked up (in order) in the snippet for the `{keyword}` slot.
const SNIPPET_KEYWORDS: &[&str] = &[
    "automation",
    "AI",
    "analytics",
    "platform",
    "integration",
    "optimization",
    "prediction",
    "intelligence",
    "solutions",
];

const DEFAULT_KEYWORD: &str = "innovation";

const TEMPLATE_COUNT: u64 = 5;

// ---------------------------------------------------------------------------
// Demo dataset
// ---------------------------------------------------------------------------

/// The built-in demo companies, in extraction order.
pub fn demo_companies() -> Vec<Company> {
    [
        (
            "TechFlow Analytics",
            "Series A",
            "$8M",
            "FinTech",
            "San Francisco, USA",
            "AI-powered financial analytics platform that helps banks automate risk assessment and fraud detection",
        ),
        (
            "DataVision Corp",
            "Series B",
            "$15M",
            "Business Intelligence",
            "London, UK",
            "Real-time business intelligence platform using machine learning for predictive analytics in financial services",
        ),
        (
            "CloudSync Solutions",
            "Seed",
            "$4.5M",
            "FinTech",
            "Berlin, Germany",
            "Cloud-based payment orchestration platform enabling seamless integration with multiple payment providers through single API",
        ),
        (
            "AutoInsights",
            "Series A",
            "$6M",
            "AI",
            "Munich, Germany",
            "AI-powered analytics platform for automotive manufacturers helping optimize supply chain operations and predict maintenance",
        ),
        (
            "SecureBank",
            "Series B",
            "$25M",
            "Cybersecurity",
            "Amsterdam, Netherlands",
            "Cybersecurity platform specializing in protecting financial institutions from advanced persistent threats using machine learning",
        ),
        (
            "InvestorPro",
            "Seed",
            "$7M",
            "SaaS",
            "Stockholm, Sweden",
            "Portfolio management SaaS tools for independent financial advisors featuring automated compliance reporting and client communication",
        ),
        (
            "TradingBot",
            "Pre-Series A",
            "$3.2M",
            "FinTech",
            "Copenhagen, Denmark",
            "Algorithmic trading platform for retail investors using AI to democratize sophisticated trading strategies",
        ),
    ]
    .into_iter()
    .map(|(name, round, amount, sector, hq, snippet)| Company {
        name: name.into(),
        funding_round: round.into(),
        funding_amount: amount.into(),
        sector: sector.into(),
        headquarters: hq.into(),
        snippet: truncate_snippet(snippet),
        ..Default::default()
    })
    .collect()
}

// ---------------------------------------------------------------------------
// Template outreach
// ---------------------------------------------------------------------------

/// Template-based outreach generator.
#[derive(Debug, Clone)]
pub struct TemplateOutreach {
    product_name: String,
}

impl TemplateOutreach {
    pub fn new(product_name: impl Into<String>) -> Self {
        Self {
            product_name: product_name.into(),
        }
    }

    /// Fill the template chosen for this company.
    pub fn message(&self, company: &Company) -> String {
        let name = &company.name;
        let round = &company.funding_round;
        let amount = &company.funding_amount;
        let sector = company.sector.to_lowercase();
        let keyword = snippet_keyword(&company.snippet);
        let product = &self.product_name;

        match template_index(name) {
            0 => format!(
                "Congrats on your {round}! Love how {name} is transforming {sector}.\n\
                 {product} could help scale your sales process - would love to explore how we could support your growth."
            ),
            1 => format!(
                "Exciting news about your {amount} raise! {name}'s approach to {keyword} is impressive.\n\
                 Our platform could accelerate your customer acquisition - interested in a quick chat?"
            ),
            2 => format!(
                "Just saw the announcement about {name}'s funding round. Your work in {sector} aligns perfectly with what we see in the market.\n\
                 {product} could be a great fit for your expansion plans - worth a conversation?"
            ),
            3 => format!(
                "Congratulations on securing {amount}! {name} is clearly solving a real problem in {sector}.\n\
                 We help companies like yours scale efficiently - would love to share how {product} could support your journey."
            ),
            _ => format!(
                "Amazing progress with your {round} at {name}! Your focus on {keyword} resonates with our mission.\n\
                 {product} could complement your growth strategy beautifully - open to a brief discussion?"
            ),
        }
    }
}

/// Template slot for a company name, stable across processes.
pub fn template_index(name: &str) -> usize {
    let digest = Sha256::digest(name.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(prefix) % TEMPLATE_COUNT) as usize
}

/// First known keyword found in the snippet (case-insensitive), else "innovation".
fn snippet_keyword(snippet: &str) -> &'static str {
    let lowered = snippet.to_lowercase();
    SNIPPET_KEYWORDS
        .iter()
        .find(|k| lowered.contains(&k.to_lowercase()))
        .copied()
        .unwrap_or(DEFAULT_KEYWORD)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_dataset_has_seven_named_companies() {
        let companies = demo_companies();
        assert_eq!(companies.len(), 7);
        assert_eq!(companies[0].name, "TechFlow Analytics");
        assert_eq!(companies[6].funding_round, "Pre-Series A");
        assert!(companies.iter().all(|c| c.snippet.chars().count() <= 200));
        assert!(companies.iter().all(|c| c.domain.is_none() && c.icp_score == 0.0));
    }

    #[test]
    fn template_choice_is_deterministic() {
        let writer = TemplateOutreach::new("Hikru");
        let company = demo_companies().remove(0);
        assert_eq!(writer.message(&company), writer.message(&company));
        assert_eq!(template_index("Acme"), template_index("Acme"));
        assert!(template_index("Acme") < TEMPLATE_COUNT as usize);
    }

    #[test]
    fn templates_spread_over_names() {
        let mut seen = [false; TEMPLATE_COUNT as usize];
        for i in 0..200 {
            seen[template_index(&format!("Company {i}"))] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn message_mentions_company() {
        let writer = TemplateOutreach::new("Hikru");
        for company in demo_companies() {
            let message = writer.message(&company);
            assert!(message.contains(&company.name), "{message}");
            assert_eq!(message.lines().count(), 2);
        }
    }

    #[test]
    fn keyword_lookup_is_case_insensitive_and_ordered() {
        assert_eq!(snippet_keyword("Workflow Automation for AI teams"), "automation");
        assert_eq!(snippet_keyword("An ai copilot"), "AI");
        assert_eq!(snippet_keyword("Open banking APIs"), DEFAULT_KEYWORD);
        assert_eq!(snippet_keyword(""), DEFAULT_KEYWORD);
    }
}
