//! Batch sessions: several newsletters through one pipeline, with run history.

use serde::Serialize;
use tracing::{info, instrument, warn};

use leadscout_newsletter::Newsletter;
use leadscout_shared::{Result, validate_min_score};
use leadscout_storage::{NewsletterRecord, RunStats, Storage};

use crate::cancel::CancelToken;
use crate::pipeline::{
    ExtractionSource, Lead, LeadPipeline, OutreachSource, PipelineProgress, PipelineWarning,
    merge_results,
};

/// Per-session knobs.
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub min_score: f64,
    /// Reprocess newsletters already recorded in the history.
    pub force: bool,
}

/// What happened to one newsletter in a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewsletterSummary {
    pub id: String,
    pub source: String,
    pub subject: String,
    /// `None` when the newsletter was skipped.
    pub extraction_source: Option<ExtractionSource>,
    pub extracted: usize,
    pub retained: usize,
    pub skipped: bool,
}

/// Merged output of a batch session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionReport {
    /// History run id; `None` when history is disabled or unavailable.
    pub run_id: Option<String>,
    pub min_score: f64,
    /// Deduplicated leads, best score first.
    pub leads: Vec<Lead>,
    pub newsletters: Vec<NewsletterSummary>,
    pub warnings: Vec<PipelineWarning>,
    pub cancelled: bool,
}

impl SessionReport {
    /// Whether any output came from demo data or templates.
    pub fn is_degraded(&self) -> bool {
        self.newsletters
            .iter()
            .any(|n| n.extraction_source == Some(ExtractionSource::DemoFallback))
            || self
                .leads
                .iter()
                .any(|l| l.outreach_source == OutreachSource::Template)
    }

    pub fn processed_count(&self) -> usize {
        self.newsletters.iter().filter(|n| !n.skipped).count()
    }
}

/// Runs newsletters sequentially through a shared pipeline.
pub struct BatchSession<'a> {
    pipeline: &'a LeadPipeline,
    history: Option<&'a Storage>,
    options: SessionOptions,
}

impl<'a> BatchSession<'a> {
    pub fn new(pipeline: &'a LeadPipeline, options: SessionOptions) -> Self {
        Self {
            pipeline,
            history: None,
            options,
        }
    }

    /// Record runs and skip already-processed newsletters using `storage`.
    pub fn with_history(mut self, storage: &'a Storage) -> Self {
        self.history = Some(storage);
        self
    }

    /// Process every newsletter and merge the results.
    ///
    /// History failures degrade to a warning and disable history for the rest
    /// of the session; they never abort it.
    #[instrument(skip_all, fields(newsletters = newsletters.len(), force = self.options.force))]
    pub async fn run(
        &self,
        newsletters: &[Newsletter],
        cancel: &CancelToken,
        progress: &dyn PipelineProgress,
    ) -> Result<SessionReport> {
        validate_min_score(self.options.min_score)?;

        let mut warnings = Vec::new();
        let mut history = self.history;
        let mut run_id = None;

        if let Some(storage) = history {
            match storage.insert_run(self.options.min_score).await {
                Ok(id) => run_id = Some(id),
                Err(e) => {
                    history = None;
                    history_failed(&mut warnings, &e);
                }
            }
        }

        let mut summaries = Vec::with_capacity(newsletters.len());
        let mut all_leads = Vec::new();
        let mut cancelled = false;

        for newsletter in newsletters {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            if !self.options.force {
                if let Some(storage) = history {
                    match storage.is_newsletter_processed(&newsletter.id).await {
                        Ok(true) => {
                            info!(source = %newsletter.source, "already processed, skipping");
                            summaries.push(summary(newsletter, None, 0, 0));
                            continue;
                        }
                        Ok(false) => {}
                        Err(e) => {
                            history = None;
                            history_failed(&mut warnings, &e);
                        }
                    }
                }
            }

            progress.phase(&format!("Processing {}", newsletter.subject));
            let outcome = self
                .pipeline
                .process(&newsletter.text, self.options.min_score, cancel, progress)
                .await?;

            summaries.push(summary(
                newsletter,
                Some(outcome.extraction_source),
                outcome.extracted,
                outcome.leads.len(),
            ));
            warnings.extend(outcome.warnings);

            // An interrupted newsletter stays unrecorded so the next run retries it.
            if outcome.cancelled {
                all_leads.extend(tag_leads(outcome.leads, &newsletter.id));
                cancelled = true;
                break;
            }

            if let (Some(storage), Some(id)) = (history, run_id.as_deref()) {
                let record = NewsletterRecord {
                    id: newsletter.id.clone(),
                    source: newsletter.source.clone(),
                    subject: newsletter.subject.clone(),
                    extraction_source: outcome.extraction_source.as_str().to_string(),
                    lead_count: count_u32(outcome.leads.len()),
                };
                if let Err(e) = storage.record_newsletter(id, &record).await {
                    history = None;
                    history_failed(&mut warnings, &e);
                }
            }

            all_leads.extend(tag_leads(outcome.leads, &newsletter.id));
        }

        let leads = merge_results(all_leads);
        let mut report = SessionReport {
            run_id,
            min_score: self.options.min_score,
            leads,
            newsletters: summaries,
            warnings,
            cancelled,
        };

        if let (Some(storage), Some(id)) = (history, report.run_id.clone()) {
            if let Err(e) = persist_report(storage, &id, &report).await {
                history_failed(&mut report.warnings, &e);
            }
        }

        info!(
            processed = report.processed_count(),
            leads = report.leads.len(),
            degraded = report.is_degraded(),
            cancelled = report.cancelled,
            "session finished"
        );
        Ok(report)
    }
}

async fn persist_report(storage: &Storage, run_id: &str, report: &SessionReport) -> Result<()> {
    for (i, lead) in report.leads.iter().enumerate() {
        storage
            .insert_lead(
                run_id,
                count_u32(i + 1),
                lead.newsletter_id.as_deref(),
                &lead.company,
                lead.outreach_source.as_str(),
            )
            .await?;
    }
    let stats = RunStats {
        newsletters: count_u32(report.processed_count()),
        leads: count_u32(report.leads.len()),
        degraded: report.is_degraded(),
        cancelled: report.cancelled,
    };
    storage.finish_run(run_id, &stats).await
}

fn history_failed(warnings: &mut Vec<PipelineWarning>, err: &leadscout_shared::LeadScoutError) {
    warn!(error = %err, "run history unavailable, continuing without it");
    warnings.push(PipelineWarning::HistoryUnavailable {
        reason: err.to_string(),
    });
}

fn tag_leads(leads: Vec<Lead>, newsletter_id: &str) -> impl Iterator<Item = Lead> + '_ {
    leads.into_iter().map(move |mut lead| {
        lead.newsletter_id = Some(newsletter_id.to_string());
        lead
    })
}

fn summary(
    newsletter: &Newsletter,
    extraction_source: Option<ExtractionSource>,
    extracted: usize,
    retained: usize,
) -> NewsletterSummary {
    NewsletterSummary {
        id: newsletter.id.clone(),
        source: newsletter.source.clone(),
        subject: newsletter.subject.clone(),
        extraction_source,
        extracted,
        retained,
        skipped: extraction_source.is_none(),
    }
}

fn count_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::SilentProgress;
    use crate::pipeline::tests::{EchoOutreach, FixedExtractor, fintech_icp, pipeline_with, record};

    fn temp_db() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("leadscout-session-{}.db", uuid::Uuid::now_v7()))
    }

    fn acme_pipeline() -> LeadPipeline {
        pipeline_with(
            FixedExtractor(vec![
                record("Acme Inc.", "Seed", "$2M", "FinTech", "Austin, USA", "AI lending"),
                record("Globex", "Series C", "$90M", "Retail", "Paris", ""),
            ]),
            EchoOutreach,
            fintech_icp(),
        )
    }

    fn options(force: bool) -> SessionOptions {
        SessionOptions {
            min_score: 0.5,
            force,
        }
    }

    #[tokio::test]
    async fn duplicates_across_newsletters_are_merged() {
        let pipeline = acme_pipeline();
        let session = BatchSession::new(&pipeline, options(false));
        let newsletters = vec![
            Newsletter::from_text("a.txt", "issue one"),
            Newsletter::from_text("b.txt", "issue two"),
        ];

        let report = session
            .run(&newsletters, &CancelToken::new(), &SilentProgress)
            .await
            .unwrap();

        assert_eq!(report.leads.len(), 1);
        assert_eq!(report.leads[0].company.name, "Acme Inc.");
        assert_eq!(report.leads[0].newsletter_id.as_deref(), Some(newsletters[0].id.as_str()));
        assert_eq!(report.processed_count(), 2);
        assert!(report.run_id.is_none());
        assert!(!report.is_degraded());
    }

    #[tokio::test]
    async fn history_skips_processed_newsletters_unless_forced() {
        let path = temp_db();
        let storage = Storage::open(&path).await.unwrap();
        let pipeline = acme_pipeline();
        let newsletters = vec![Newsletter::from_text("a.txt", "issue one")];
        let cancel = CancelToken::new();

        let first = BatchSession::new(&pipeline, options(false))
            .with_history(&storage)
            .run(&newsletters, &cancel, &SilentProgress)
            .await
            .unwrap();
        assert_eq!(first.leads.len(), 1);
        let run_id = first.run_id.clone().unwrap();
        let stored = storage.list_leads_for_run(&run_id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].rank, 1);
        assert_eq!(stored[0].outreach_source, "model");

        let second = BatchSession::new(&pipeline, options(false))
            .with_history(&storage)
            .run(&newsletters, &cancel, &SilentProgress)
            .await
            .unwrap();
        assert!(second.leads.is_empty());
        assert!(second.newsletters[0].skipped);
        assert_eq!(second.processed_count(), 0);

        let forced = BatchSession::new(&pipeline, options(true))
            .with_history(&storage)
            .run(&newsletters, &cancel, &SilentProgress)
            .await
            .unwrap();
        assert_eq!(forced.leads.len(), 1);

        let runs = storage.list_runs(10).await.unwrap();
        assert_eq!(runs.len(), 3);
        assert!(runs.iter().all(|r| r.finished_at.is_some()));

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn readonly_history_degrades_to_warning() {
        let path = temp_db();
        drop(Storage::open(&path).await.unwrap());
        let storage = Storage::open_readonly(&path).await.unwrap();
        let pipeline = acme_pipeline();

        let report = BatchSession::new(&pipeline, options(false))
            .with_history(&storage)
            .run(
                &[Newsletter::from_text("a.txt", "issue")],
                &CancelToken::new(),
                &SilentProgress,
            )
            .await
            .unwrap();

        assert!(report.run_id.is_none());
        assert_eq!(report.leads.len(), 1);
        assert!(matches!(
            report.warnings[0],
            PipelineWarning::HistoryUnavailable { .. }
        ));

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn cancelled_session_processes_nothing() {
        let pipeline = acme_pipeline();
        let cancel = CancelToken::new();
        cancel.cancel();

        let report = BatchSession::new(&pipeline, options(false))
            .run(&[Newsletter::from_text("a.txt", "issue")], &cancel, &SilentProgress)
            .await
            .unwrap();

        assert!(report.cancelled);
        assert!(report.newsletters.is_empty());
        assert!(report.leads.is_empty());
    }

    #[tokio::test]
    async fn invalid_threshold_aborts_session() {
        let pipeline = acme_pipeline();
        let err = BatchSession::new(
            &pipeline,
            SessionOptions {
                min_score: -0.1,
                force: false,
            },
        )
        .run(&[], &CancelToken::new(), &SilentProgress)
        .await
        .unwrap_err();
        assert!(err.is_fatal());
    }
}
