//! Core orchestration for LeadScout.
//!
//! This crate ties extraction, enrichment, scoring and outreach into the lead
//! pipeline, and layers batch sessions, report rendering and the interval
//! worker on top of it.

pub mod cancel;
pub mod fallback;
pub mod pipeline;
pub mod report;
pub mod session;
pub mod worker;

pub use cancel::CancelToken;
pub use fallback::{TemplateOutreach, demo_companies};
pub use pipeline::{
    ExtractionSource, Lead, LeadPipeline, NewsletterOutcome, OutreachSource, PipelineProgress,
    PipelineWarning, SilentProgress, load_enrichment_index, merge_results, rank_leads,
};
pub use report::{ReportFormat, render, render_html, render_json, render_text};
pub use session::{BatchSession, NewsletterSummary, SessionOptions, SessionReport};
pub use worker::{Schedule, parse_interval, run_worker, schedule_from_config};
