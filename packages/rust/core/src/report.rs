//! Rendering session results: JSON export, console text, HTML digest.

use std::fmt::Write;

use leadscout_shared::{Company, LeadScoutError, Result};

use crate::pipeline::{Lead, OutreachSource};
use crate::session::SessionReport;

const RULE_WIDE: usize = 80;
const RULE_NARROW: usize = 50;

const DEGRADED_NOTICE: &str = "DEGRADED OUTPUT: some results come from demo data or template \
outreach because the language model was unavailable. Review before use.";

/// Output format for a session report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
    Html,
}

impl std::str::FromStr for ReportFormat {
    type Err = LeadScoutError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "html" => Ok(Self::Html),
            other => Err(LeadScoutError::validation(format!(
                "unknown report format '{other}' (expected text, json or html)"
            ))),
        }
    }
}

/// Render `report` in the requested format.
pub fn render(report: &SessionReport, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Text => Ok(render_text(report)),
        ReportFormat::Json => render_json(&report.leads),
        ReportFormat::Html => Ok(render_html(report)),
    }
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

/// Pretty JSON array of companies, best score first.
pub fn render_json(leads: &[Lead]) -> Result<String> {
    let companies: Vec<&Company> = leads.iter().map(|l| &l.company).collect();
    let mut json = serde_json::to_string_pretty(&companies)
        .map_err(|e| LeadScoutError::Conversion(format!("failed to encode results: {e}")))?;
    json.push('\n');
    Ok(json)
}

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

/// Console report: one block per lead.
pub fn render_text(report: &SessionReport) -> String {
    let mut out = String::new();
    let wide = "=".repeat(RULE_WIDE);
    let narrow = "-".repeat(RULE_NARROW);

    let _ = writeln!(out, "{wide}");
    let _ = writeln!(out, "LEAD RESEARCH RESULTS");
    let _ = writeln!(out, "{wide}");

    if report.is_degraded() {
        let _ = writeln!(out, "\n!! {DEGRADED_NOTICE}");
    }
    if report.cancelled {
        let _ = writeln!(out, "\n!! Run was cancelled; results are partial.");
    }

    if report.leads.is_empty() {
        let _ = writeln!(
            out,
            "\nNo companies matched the ICP (minimum score {:.2}).",
            report.min_score
        );
    }

    for (i, lead) in report.leads.iter().enumerate() {
        let c = &lead.company;
        let _ = writeln!(out, "\n#{} - {} (Score: {:.2})", i + 1, c.name, c.icp_score);
        let _ = writeln!(out, "{narrow}");
        let _ = writeln!(out, "Sector: {}", c.sector);
        let _ = writeln!(out, "Round: {} | Amount: {}", c.funding_round, c.funding_amount);
        let _ = writeln!(out, "HQ: {}", c.headquarters);
        if let Some(domain) = &c.domain {
            let _ = writeln!(out, "Domain: {domain}");
        }
        if let Some(headcount) = c.headcount {
            let _ = writeln!(out, "Employees: {headcount}");
        }
        let _ = writeln!(out, "Snippet: {}", c.snippet);
        let marker = match lead.outreach_source {
            OutreachSource::Model => "",
            OutreachSource::Template => " [template]",
        };
        let _ = writeln!(out, "\nOutreach Message{marker}:");
        for line in c.outreach_message.lines() {
            let _ = writeln!(out, "   {line}");
        }
    }

    let _ = writeln!(out, "\n{wide}");
    let _ = writeln!(
        out,
        "{} lead(s) from {} newsletter(s)",
        report.leads.len(),
        report.processed_count()
    );
    if !report.warnings.is_empty() {
        let _ = writeln!(out, "\nWarnings:");
        for warning in &report.warnings {
            let _ = writeln!(out, "  - {warning}");
        }
    }
    out
}

// ---------------------------------------------------------------------------
// HTML
// ---------------------------------------------------------------------------

/// HTML digest, suitable as an e-mail body.
pub fn render_html(report: &SessionReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "<h2>Lead Research Results</h2>");

    if report.is_degraded() {
        let _ = writeln!(
            out,
            "<p style=\"background:#fff3cd;border:1px solid #e0a800;padding:8px\"><strong>{}</strong></p>",
            escape_html(DEGRADED_NOTICE)
        );
    }
    if report.cancelled {
        let _ = writeln!(out, "<p><em>Run was cancelled; results are partial.</em></p>");
    }

    if report.leads.is_empty() {
        let _ = writeln!(
            out,
            "<p>No companies matched the ICP (minimum score {:.2}).</p>",
            report.min_score
        );
        return out;
    }

    let _ = writeln!(out, "<ol>");
    for lead in &report.leads {
        let c = &lead.company;
        let name = escape_html(&c.name);
        let _ = writeln!(out, "<li>");
        match &c.domain {
            Some(domain) => {
                let _ = writeln!(
                    out,
                    "<strong><a href=\"https://{}\" target=\"_blank\">{name}</a></strong> ({}, {})<br>",
                    escape_html(domain),
                    escape_html(&c.sector),
                    escape_html(&c.headquarters)
                );
            }
            None => {
                let _ = writeln!(
                    out,
                    "<strong>{name}</strong> ({}, {})<br>",
                    escape_html(&c.sector),
                    escape_html(&c.headquarters)
                );
            }
        }
        let _ = writeln!(out, "<b>Score:</b> {:.2}<br>", c.icp_score);
        let _ = writeln!(
            out,
            "<b>Funding:</b> {} {}<br>",
            escape_html(&c.funding_round),
            escape_html(&c.funding_amount)
        );
        if let Some(headcount) = c.headcount {
            let _ = writeln!(out, "<b>Employees:</b> {headcount}<br>");
        }
        let _ = writeln!(out, "<b>Summary:</b> {}<br>", escape_html(&c.snippet));
        let marker = match lead.outreach_source {
            OutreachSource::Model => "",
            OutreachSource::Template => " <em>(template)</em>",
        };
        let outreach = escape_html(&c.outreach_message).replace('\n', "<br>");
        let _ = writeln!(out, "<b>Outreach{marker}:</b> {outreach}");
        let _ = writeln!(out, "</li>");
    }
    let _ = writeln!(out, "</ol>");
    out
}

fn escape_html(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
