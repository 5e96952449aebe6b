//! Lead pipeline: newsletter text → extract → enrich → score → filter →
//! outreach → rank.
//!
//! Only configuration problems (an invalid threshold) are returned as errors.
//! Every oracle failure is recovered locally with a deterministic fallback and
//! surfaced as a [`PipelineWarning`] on the outcome.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use leadscout_enrichment::EnrichmentIndex;
use leadscout_oracle::{ExtractionOracle, OracleError, OutreachOracle};
use leadscout_shared::{Company, Icp, Result, validate_min_score};

use crate::cancel::CancelToken;
use crate::fallback::{TemplateOutreach, demo_companies};

// ---------------------------------------------------------------------------
// Provenance and warnings
// ---------------------------------------------------------------------------

/// Where the candidate companies of a newsletter came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionSource {
    Model,
    DemoFallback,
}

impl ExtractionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::DemoFallback => "demo_fallback",
        }
    }
}

/// Where a lead's outreach text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutreachSource {
    Model,
    Template,
}

impl OutreachSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Template => "template",
        }
    }
}

/// A recovered problem, reported alongside the results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineWarning {
    /// The enrichment table could not be loaded; no company gets enriched.
    EnrichmentUnavailable { reason: String },
    /// Extraction failed; the demo dataset was scored instead.
    ExtractionFallback { error: String, reason: String },
    /// Outreach failed for one company; a template was used.
    OutreachFallback {
        company: String,
        error: String,
        reason: String,
    },
    /// An extracted record had no usable company name.
    CandidateDropped { position: usize },
    /// Cancellation stopped processing; `remaining` companies were skipped.
    Cancelled { remaining: usize },
    /// The run history could not be read or written.
    HistoryUnavailable { reason: String },
}

impl fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EnrichmentUnavailable { reason } => {
                write!(f, "enrichment table unavailable: {reason}")
            }
            Self::ExtractionFallback { reason, .. } => {
                write!(f, "extraction failed, using demo data: {reason}")
            }
            Self::OutreachFallback {
                company, reason, ..
            } => write!(f, "outreach for {company} failed, using template: {reason}"),
            Self::CandidateDropped { position } => {
                write!(f, "dropped extracted record #{position} without a company name")
            }
            Self::Cancelled { remaining } => {
                write!(f, "cancelled with {remaining} companies left unprocessed")
            }
            Self::HistoryUnavailable { reason } => write!(f, "run history unavailable: {reason}"),
        }
    }
}

impl PipelineWarning {
    fn extraction(err: &OracleError) -> Self {
        Self::ExtractionFallback {
            error: err.kind().to_string(),
            reason: err.to_string(),
        }
    }

    fn outreach(company: &str, err: &OracleError) -> Self {
        Self::OutreachFallback {
            company: company.to_string(),
            error: err.kind().to_string(),
            reason: err.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// A retained, scored company with its outreach provenance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lead {
    pub company: Company,
    pub outreach_source: OutreachSource,
    /// Content hash of the newsletter the lead came from, when known.
    pub newsletter_id: Option<String>,
}

/// Result of processing one newsletter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewsletterOutcome {
    /// Retained leads, best score first.
    pub leads: Vec<Lead>,
    pub warnings: Vec<PipelineWarning>,
    pub extraction_source: ExtractionSource,
    /// Number of candidate companies scored.
    pub extracted: usize,
    pub cancelled: bool,
}

impl NewsletterOutcome {
    fn cancelled_before_start() -> Self {
        Self {
            leads: Vec::new(),
            warnings: vec![PipelineWarning::Cancelled { remaining: 0 }],
            extraction_source: ExtractionSource::Model,
            extracted: 0,
            cancelled: true,
        }
    }

    /// Whether any part of the output came from a fallback.
    pub fn is_degraded(&self) -> bool {
        self.extraction_source == ExtractionSource::DemoFallback
            || self
                .leads
                .iter()
                .any(|l| l.outreach_source == OutreachSource::Template)
    }

    pub fn companies(&self) -> Vec<Company> {
        self.leads.iter().map(|l| l.company.clone()).collect()
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callback for pipeline status.
pub trait PipelineProgress: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each candidate is scored.
    fn company_scored(&self, name: &str, score: f64, kept: bool);
    /// Called after each outreach message (model or template).
    fn outreach_written(&self, name: &str, current: usize, total: usize);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl PipelineProgress for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn company_scored(&self, _name: &str, _score: f64, _kept: bool) {}
    fn outreach_written(&self, _name: &str, _current: usize, _total: usize) {}
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// The lead pipeline with its injected collaborators.
///
/// The enrichment index and ICP are shared read-only; one pipeline can serve
/// any number of newsletters.
pub struct LeadPipeline {
    index: Arc<EnrichmentIndex>,
    icp: Arc<Icp>,
    extractor: Arc<dyn ExtractionOracle>,
    outreach: Arc<dyn OutreachOracle>,
    templates: TemplateOutreach,
}

impl LeadPipeline {
    pub fn new(
        index: Arc<EnrichmentIndex>,
        icp: Arc<Icp>,
        extractor: Arc<dyn ExtractionOracle>,
        outreach: Arc<dyn OutreachOracle>,
        templates: TemplateOutreach,
    ) -> Self {
        Self {
            index,
            icp,
            extractor,
            outreach,
            templates,
        }
    }

    pub fn icp(&self) -> &Icp {
        &self.icp
    }

    pub fn index(&self) -> &EnrichmentIndex {
        &self.index
    }

    /// Process one newsletter into ranked leads scoring at least `min_score`.
    ///
    /// # Errors
    ///
    /// Only a `Config` error for a threshold outside [0, 1].
    #[instrument(skip_all, fields(chars = text.len(), min_score = min_score))]
    pub async fn process(
        &self,
        text: &str,
        min_score: f64,
        cancel: &CancelToken,
        progress: &dyn PipelineProgress,
    ) -> Result<NewsletterOutcome> {
        validate_min_score(min_score)?;

        let mut warnings = Vec::new();

        // --- Extraction ---
        progress.phase("Extracting companies");
        let Some(extraction) = cancel.run(self.extractor.extract(text)).await else {
            warn!("cancelled before extraction finished");
            return Ok(NewsletterOutcome::cancelled_before_start());
        };

        let (candidates, extraction_source) = match extraction {
            Ok(records) => {
                let mut companies = Vec::with_capacity(records.len());
                for (position, record) in records.into_iter().enumerate() {
                    let company = record.into_company();
                    if company.name.is_empty() {
                        warn!(position, "dropping extracted record without a name");
                        warnings.push(PipelineWarning::CandidateDropped { position });
                        continue;
                    }
                    companies.push(company);
                }
                (companies, ExtractionSource::Model)
            }
            Err(e) => {
                warn!(error = %e, "extraction failed, falling back to demo data");
                warnings.push(PipelineWarning::extraction(&e));
                (demo_companies(), ExtractionSource::DemoFallback)
            }
        };
        let extracted = candidates.len();
        info!(extracted, source = extraction_source.as_str(), "candidates ready");

        // --- Enrich, score, filter ---
        progress.phase("Scoring companies");
        let retained: Vec<Company> = candidates
            .into_iter()
            .filter_map(|company| {
                let company = self.score_company(company);
                let kept = company.icp_score >= min_score;
                progress.company_scored(&company.name, company.icp_score, kept);
                if !kept {
                    debug!(company = %company.name, score = company.icp_score, "below threshold");
                }
                kept.then_some(company)
            })
            .collect();

        // --- Outreach ---
        progress.phase("Writing outreach");
        let total = retained.len();
        let mut leads = Vec::with_capacity(total);
        let mut cancelled = false;

        for (i, mut company) in retained.into_iter().enumerate() {
            let Some(result) = cancel.run(self.outreach.write(&company, &self.icp)).await else {
                let remaining = total - i;
                warn!(remaining, "cancelled during outreach");
                warnings.push(PipelineWarning::Cancelled { remaining });
                cancelled = true;
                break;
            };

            let outreach_source = match result {
                Ok(message) => {
                    company.outreach_message = message;
                    OutreachSource::Model
                }
                Err(e) => {
                    warn!(company = %company.name, error = %e, "outreach failed, using template");
                    warnings.push(PipelineWarning::outreach(&company.name, &e));
                    company.outreach_message = self.templates.message(&company);
                    OutreachSource::Template
                }
            };
            progress.outreach_written(&company.name, i + 1, total);

            leads.push(Lead {
                company,
                outreach_source,
                newsletter_id: None,
            });
        }

        rank_leads(&mut leads);
        info!(extracted, retained = leads.len(), cancelled, "newsletter processed");

        Ok(NewsletterOutcome {
            leads,
            warnings,
            extraction_source,
            extracted,
            cancelled,
        })
    }

    /// Enrich a company from the index and set its ICP score.
    pub fn score_company(&self, mut company: Company) -> Company {
        self.index.enrich(&mut company);
        company.icp_score = leadscout_scoring::score(&company, &self.icp);
        company
    }
}

// ---------------------------------------------------------------------------
// Ranking
// ---------------------------------------------------------------------------

/// Stable sort by score, highest first; equal scores keep their order.
pub fn rank_leads(leads: &mut [Lead]) {
    leads.sort_by(|a, b| b.company.icp_score.total_cmp(&a.company.icp_score));
}

/// Merge leads from several newsletters.
///
/// Duplicates (by [`Company::dedup_key`]) collapse onto the highest-scoring
/// entry; on a tie the first one seen wins. The result is re-ranked.
pub fn merge_results(leads: impl IntoIterator<Item = Lead>) -> Vec<Lead> {
    let mut merged: Vec<Lead> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for lead in leads {
        let key = lead.company.dedup_key();
        match positions.get(&key) {
            Some(&idx) => {
                if lead.company.icp_score > merged[idx].company.icp_score {
                    merged[idx] = lead;
                }
            }
            None => {
                positions.insert(key, merged.len());
                merged.push(lead);
            }
        }
    }

    rank_leads(&mut merged);
    merged
}

/// Load the enrichment table, degrading to an empty index on failure.
pub fn load_enrichment_index(path: &Path) -> (EnrichmentIndex, Option<PipelineWarning>) {
    match EnrichmentIndex::load(path) {
        Ok(index) => (index, None),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "enrichment table unavailable, continuing without enrichment");
            (
                EnrichmentIndex::empty(),
                Some(PipelineWarning::EnrichmentUnavailable {
                    reason: e.to_string(),
                }),
            )
        }
    }
}
