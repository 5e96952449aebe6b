//! Prompt text for the extraction and outreach calls.

use leadscout_shared::{Company, Icp};

pub(crate) const EXTRACTION_SYSTEM: &str = "You extract structured company information from \
newsletter text. You answer with a JSON array only.";

pub(crate) const OUTREACH_SYSTEM: &str = "You are a sales development representative who writes \
short, personalised, conversational outreach messages.";

/// User prompt asking for a JSON array of funded companies.
pub fn extraction_prompt(newsletter: &str) -> String {
    format!(
        r#"Extract every company mentioned in the newsletter below and return ONLY a valid JSON array.
Each object must have exactly these properties:
- company: company name
- round: funding round (e.g. "Seed", "Series A", "Series B")
- amount: funding amount with currency (e.g. "$5M", "€2M")
- sector: industry the company operates in
- HQ: headquarters location ("city, country")
- snippet: brief description of the company (max 200 characters)

Use an empty string for unknown values. Return an empty array if no company is mentioned.

Example:
[{{"company":"TechCorp","round":"Series A","amount":"$5M","sector":"FinTech","HQ":"San Francisco, USA","snippet":"AI-powered financial analytics for small businesses"}}]

Newsletter:
{newsletter}"#
    )
}

/// User prompt for a two-line outreach message.
pub fn outreach_prompt(company: &Company, icp: &Icp, product_name: &str) -> String {
    format!(
        r#"Write a 2-line personalised outreach message for this company.

Company:
- Name: {name}
- Sector: {sector}
- Funding round: {round}
- Funding amount: {amount}
- Headquarters: {hq}
- Description: {snippet}
- ICP score: {score:.2}

Our target profile:
- Industries: {industries}
- Stages: {stages}
- Geography: {geos}
- Tech focus: {tech}

Line 1: acknowledge their recent funding and mention something specific about the company.
Line 2: connect how {product} could help them scale.
Be conversational, not salesy. Stay under 50 words. Avoid generic openers.
Return only the message."#,
        name = company.name,
        sector = company.sector,
        round = company.funding_round,
        amount = company.funding_amount,
        hq = company.headquarters,
        snippet = company.snippet,
        score = company.icp_score,
        industries = icp.industries.join(", "),
        stages = icp.stages.join(", "),
        geos = icp.geographies.join(", "),
        tech = icp.tech_hints.join(", "),
        product = product_name,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_prompt_embeds_text_and_keys() {
        let prompt = extraction_prompt("Acme raised $2M");
        assert!(prompt.ends_with("Acme raised $2M"));
        assert!(prompt.contains("- HQ:"));
        assert!(prompt.contains(r#"{"company":"TechCorp""#));
    }

    #[test]
    fn outreach_prompt_lists_company_and_icp() {
        let company = Company {
            name: "Acme".into(),
            sector: "FinTech".into(),
            icp_score: 0.756,
            ..Default::default()
        };
        let icp = Icp {
            industries: vec!["FinTech".into(), "SaaS".into()],
            ..Default::default()
        };
        let prompt = outreach_prompt(&company, &icp, "Hikru");
        assert!(prompt.contains("- Name: Acme"));
        assert!(prompt.contains("- ICP score: 0.76"));
        assert!(prompt.contains("- Industries: FinTech, SaaS"));
        assert!(prompt.contains("how Hikru could help"));
    }
}
