//! Company extraction through the chat client.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, instrument};

use crate::client::ChatClient;
use crate::prompts::{EXTRACTION_SYSTEM, extraction_prompt};
use crate::{ExtractedCompany, ExtractionOracle, OracleError};

/// A reply wrapped in a Markdown code fence, optionally tagged `json`.
static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^```[a-zA-Z]*\s*(.*?)\s*```$").expect("valid code fence regex")
});

/// Extraction oracle backed by an OpenAI-compatible chat model.
#[derive(Debug, Clone)]
pub struct LlmExtractor {
    client: ChatClient,
}

impl LlmExtractor {
    pub fn new(client: ChatClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ExtractionOracle for LlmExtractor {
    #[instrument(skip_all, fields(model = %self.client.model(), chars = text.len()))]
    async fn extract(&self, text: &str) -> Result<Vec<ExtractedCompany>, OracleError> {
        let reply = self
            .client
            .complete(EXTRACTION_SYSTEM, &extraction_prompt(text))
            .await?;
        let companies = parse_extraction(&reply)?;
        debug!(count = companies.len(), "extraction reply parsed");
        Ok(companies)
    }
}

/// Parse a model reply into extraction records.
///
/// Strips a surrounding code fence, then parses the outermost `[...]` span.
/// A reply without any array is a refusal. Records come back as the model
/// sent them, blank names included, so the pipeline can report each one.
pub fn parse_extraction(reply: &str) -> Result<Vec<ExtractedCompany>, OracleError> {
    let trimmed = reply.trim();
    let unfenced = CODE_FENCE
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map_or(trimmed, |m| m.as_str());

    let (start, end) = match (unfenced.find('['), unfenced.rfind(']')) {
        (Some(start), Some(end)) if start < end => (start, end),
        _ => {
            let preview: String = unfenced.chars().take(80).collect();
            return Err(OracleError::Refused(format!(
                "reply contains no JSON array: {preview:?}"
            )));
        }
    };

    serde_json::from_str(&unfenced[start..=end])
        .map_err(|e| OracleError::Parse(format!("invalid extraction JSON: {e}")))
}
