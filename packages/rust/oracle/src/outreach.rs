//! Outreach-message generation through the chat client.

use async_trait::async_trait;
use tracing::instrument;

use leadscout_shared::{Company, Icp};

use crate::client::ChatClient;
use crate::prompts::{OUTREACH_SYSTEM, outreach_prompt};
use crate::{OracleError, OutreachOracle};

/// Outreach oracle backed by an OpenAI-compatible chat model.
#[derive(Debug, Clone)]
pub struct LlmOutreachWriter {
    client: ChatClient,
    product_name: String,
}

impl LlmOutreachWriter {
    pub fn new(client: ChatClient, product_name: impl Into<String>) -> Self {
        Self {
            client,
            product_name: product_name.into(),
        }
    }
}

#[async_trait]
impl OutreachOracle for LlmOutreachWriter {
    #[instrument(skip_all, fields(company = %company.name))]
    async fn write(&self, company: &Company, icp: &Icp) -> Result<String, OracleError> {
        let reply = self
            .client
            .complete(OUTREACH_SYSTEM, &outreach_prompt(company, icp, &self.product_name))
            .await?;
        clean_outreach_reply(&reply)
    }
}

/// Trim a reply and drop one pair of surrounding quotes. Empty is a refusal.
pub fn clean_outreach_reply(reply: &str) -> Result<String, OracleError> {
    let trimmed = reply.trim();
    let unquoted = [('"', '"'), ('\u{201c}', '\u{201d}'), ('\'', '\'')]
        .iter()
        .find_map(|(open, close)| {
            trimmed
                .strip_prefix(*open)
                .and_then(|rest| rest.strip_suffix(*close))
        })
        .unwrap_or(trimmed)
        .trim();

    if unquoted.is_empty() {
        return Err(OracleError::Refused("empty outreach reply".into()));
    }
    Ok(unquoted.to_string())
}
