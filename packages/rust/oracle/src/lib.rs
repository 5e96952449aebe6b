//! Language-model oracles consumed by the lead pipeline.
//!
//! Two fallible text generators sit behind async traits:
//! - [`ExtractionOracle`] turns newsletter text into candidate companies
//! - [`OutreachOracle`] writes a short outreach message for a scored company
//!
//! Both return `Result<_, OracleError>`; the pipeline pattern-matches the
//! error and substitutes its deterministic fallback. The bundled
//! implementations talk to any OpenAI-compatible `/chat/completions` endpoint
//! (OpenRouter by default) through [`ChatClient`].

mod client;
mod extract;
mod outreach;
mod prompts;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use leadscout_shared::{Company, Icp, truncate_snippet};

pub use client::{ChatClient, check_http_response};
pub use extract::{LlmExtractor, parse_extraction};
pub use outreach::{LlmOutreachWriter, clean_outreach_reply};
pub use prompts::{extraction_prompt, outreach_prompt};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by oracle calls.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    /// HTTP transport failure.
    #[error("oracle request failed: {0}")]
    Request(String),
    /// The call did not finish within the configured timeout.
    #[error("oracle timed out after {0}s")]
    Timeout(u64),
    /// Upstream responded with an error status.
    #[error("oracle returned non-success status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    /// Response body did not match the expected shape.
    #[error("oracle response parse error: {0}")]
    Parse(String),
    /// The model answered, but not with usable content.
    #[error("oracle refused: {0}")]
    Refused(String),
    /// The oracle is not configured (e.g. no API key).
    #[error("oracle unavailable: {0}")]
    Unavailable(String),
}

impl OracleError {
    /// Short label used in warnings and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Request(_) => "request",
            Self::Timeout(_) => "timeout",
            Self::HttpStatus { .. } => "http_status",
            Self::Parse(_) => "parse",
            Self::Refused(_) => "refused",
            Self::Unavailable(_) => "unavailable",
        }
    }
}

// ---------------------------------------------------------------------------
// Extraction record
// ---------------------------------------------------------------------------

/// One company as returned by the extraction oracle.
///
/// Key names are fixed at the boundary: `company`, `round`, `amount`,
/// `sector`, `HQ`, `snippet`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedCompany {
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub round: String,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub sector: String,
    #[serde(rename = "HQ", default)]
    pub hq: String,
    #[serde(default)]
    pub snippet: String,
}

impl ExtractedCompany {
    /// Convert into a pipeline [`Company`], trimming fields and capping the snippet.
    pub fn into_company(self) -> Company {
        Company {
            name: self.company.trim().to_string(),
            funding_round: self.round.trim().to_string(),
            funding_amount: self.amount.trim().to_string(),
            sector: self.sector.trim().to_string(),
            headquarters: self.hq.trim().to_string(),
            snippet: truncate_snippet(&self.snippet),
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Extracts candidate companies from raw newsletter text.
#[async_trait]
pub trait ExtractionOracle: Send + Sync {
    /// Return every company mentioned in `text`, in mention order.
    ///
    /// # Errors
    ///
    /// Any [`OracleError`]; callers fall back to demo data.
    async fn extract(&self, text: &str) -> Result<Vec<ExtractedCompany>, OracleError>;
}

/// Writes outreach text for a retained company.
#[async_trait]
pub trait OutreachOracle: Send + Sync {
    /// Produce a short personalised message for `company`.
    ///
    /// # Errors
    ///
    /// Any [`OracleError`]; callers fall back to a template.
    async fn write(&self, company: &Company, icp: &Icp) -> Result<String, OracleError>;
}

/// Oracle used when no model is configured; every call is `Unavailable`.
#[derive(Debug, Clone, Default)]
pub struct DisabledOracle {
    reason: String,
}

impl DisabledOracle {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl ExtractionOracle for DisabledOracle {
    async fn extract(&self, _text: &str) -> Result<Vec<ExtractedCompany>, OracleError> {
        Err(OracleError::Unavailable(self.reason.clone()))
    }
}

#[async_trait]
impl OutreachOracle for DisabledOracle {
    async fn write(&self, _company: &Company, _icp: &Icp) -> Result<String, OracleError> {
        Err(OracleError::Unavailable(self.reason.clone()))
    }
}
