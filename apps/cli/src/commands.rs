//! CLI command definitions, routing, and tracing setup.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use leadscout_core::{
    BatchSession, CancelToken, LeadPipeline, PipelineProgress, PipelineWarning, ReportFormat,
    SessionOptions, SessionReport, TemplateOutreach, load_enrichment_index, render,
    run_worker, schedule_from_config,
};
use leadscout_enrichment::EnrichmentIndex;
use leadscout_newsletter::Newsletter;
use leadscout_oracle::{
    ChatClient, DisabledOracle, ExtractionOracle, LlmExtractor, LlmOutreachWriter, OutreachOracle,
};
use leadscout_shared::{
    AppConfig, Company, PipelineSettings, expand_home, init_config, load_config, resolve_api_key,
};
use leadscout_storage::Storage;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// LeadScout: turn funding newsletters into scored, ready-to-send leads.
#[derive(Parser)]
#[command(
    name = "leadscout",
    version,
    about = "Extract funded companies from newsletters, score them against your ICP and draft outreach.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Report output format.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
    Html,
}

impl From<OutputFormat> for ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => ReportFormat::Text,
            OutputFormat::Json => ReportFormat::Json,
            OutputFormat::Html => ReportFormat::Html,
        }
    }
}

/// Options shared by `run` and `watch`.
#[derive(clap::Args, Debug, Clone)]
pub(crate) struct PipelineArgs {
    /// Minimum ICP score to keep a lead (0 to 1).
    #[arg(long)]
    pub min_score: Option<f64>,

    /// ICP JSON file (overrides config).
    #[arg(long)]
    pub icp: Option<PathBuf>,

    /// Enrichment CSV file (overrides config).
    #[arg(long)]
    pub enrichment: Option<PathBuf>,

    /// Report format.
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Write the report to this file instead of stdout.
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Skip the language model; use demo data and templates.
    #[arg(long)]
    pub offline: bool,

    /// Reprocess newsletters already in the run history.
    #[arg(long)]
    pub force: bool,

    /// Do not read or write the run history.
    #[arg(long)]
    pub no_history: bool,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Process newsletters once and print the ranked leads.
    Run {
        /// Newsletter files (.txt, .md, .eml, .html). Reads stdin when empty.
        files: Vec<PathBuf>,

        /// Process every supported file in this directory.
        #[arg(long)]
        inbox: Option<PathBuf>,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Process an inbox directory on an interval until Ctrl-C.
    Watch {
        /// Inbox directory (defaults to `worker.inbox_dir`).
        #[arg(long)]
        inbox: Option<PathBuf>,

        /// Minutes or HH:MM:SS between runs (defaults to `worker.interval`).
        #[arg(long)]
        interval: Option<String>,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Look a company name up in the enrichment table.
    Resolve {
        /// Company name as it appears in a newsletter.
        name: String,

        /// Enrichment CSV file (overrides config).
        #[arg(long)]
        enrichment: Option<PathBuf>,
    },

    /// Explain the ICP score of a company JSON object.
    Score {
        /// JSON file with one company (export format); `-` reads stdin.
        company: PathBuf,

        /// ICP JSON file (overrides config).
        #[arg(long)]
        icp: Option<PathBuf>,

        /// Enrich from this CSV before scoring.
        #[arg(long)]
        enrichment: Option<PathBuf>,

        /// Print the breakdown as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show recent runs from the history database.
    History {
        /// Number of runs to list.
        #[arg(short, long, default_value = "10")]
        limit: u32,

        /// Show newsletters and leads of one run.
        #[arg(long)]
        run: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
///
/// Logs go to stderr so reports on stdout stay machine-readable.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "leadscout=info",
        1 => "leadscout=debug",
        _ => "leadscout=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run {
            files,
            inbox,
            pipeline,
        } => cmd_run(&files, inbox.as_deref(), &pipeline).await,
        Command::Watch {
            inbox,
            interval,
            pipeline,
        } => cmd_watch(inbox, interval, &pipeline).await,
        Command::Resolve { name, enrichment } => cmd_resolve(&name, enrichment).await,
        Command::Score {
            company,
            icp,
            enrichment,
            json,
        } => cmd_score(&company, icp, enrichment, json).await,
        Command::History { limit, run } => cmd_history(limit, run.as_deref()).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Pipeline assembly
// ---------------------------------------------------------------------------

/// A ready pipeline plus warnings raised while building it.
struct Assembled {
    pipeline: LeadPipeline,
    settings: PipelineSettings,
    warnings: Vec<PipelineWarning>,
}

/// Merge config and flags, load the ICP and enrichment table, pick oracles.
fn assemble(config: &AppConfig, args: &PipelineArgs) -> Result<Assembled> {
    let mut settings = PipelineSettings::from(config);
    if let Some(min_score) = args.min_score {
        settings.min_score = min_score;
    }
    if let Some(icp) = &args.icp {
        settings.icp_path = icp.clone();
    }
    if let Some(enrichment) = &args.enrichment {
        settings.enrichment_path = enrichment.clone();
    }
    settings.validate()?;

    let icp = leadscout_scoring::load_icp(&settings.icp_path)?;

    let mut warnings = Vec::new();
    let (index, warning) = load_enrichment_index(&settings.enrichment_path);
    warnings.extend(warning);
    info!(records = index.len(), "enrichment table ready");

    let (extractor, outreach) = build_oracles(config, &settings, args.offline);

    let pipeline = LeadPipeline::new(
        Arc::new(index),
        Arc::new(icp),
        extractor,
        outreach,
        TemplateOutreach::new(settings.product_name.clone()),
    );

    Ok(Assembled {
        pipeline,
        settings,
        warnings,
    })
}

/// Model-backed oracles, or disabled ones when offline or unconfigured.
fn build_oracles(
    config: &AppConfig,
    settings: &PipelineSettings,
    offline: bool,
) -> (Arc<dyn ExtractionOracle>, Arc<dyn OutreachOracle>) {
    let disabled = |reason: String| -> (Arc<dyn ExtractionOracle>, Arc<dyn OutreachOracle>) {
        (
            Arc::new(DisabledOracle::new(reason.clone())),
            Arc::new(DisabledOracle::new(reason)),
        )
    };

    if offline {
        info!("offline mode: using demo data and templates");
        return disabled("offline mode".to_string());
    }

    let api_key = match resolve_api_key(config) {
        Ok(key) => key,
        Err(e) => {
            warn!(error = %e, "no API key, running in degraded mode");
            return disabled(e.to_string());
        }
    };

    match ChatClient::new(&config.llm, api_key) {
        Ok(client) => {
            info!(model = client.model(), "language model configured");
            (
                Arc::new(LlmExtractor::new(client.clone())),
                Arc::new(LlmOutreachWriter::new(client, settings.product_name.clone())),
            )
        }
        Err(e) => {
            warn!(error = %e, "could not build model client, running in degraded mode");
            disabled(e.to_string())
        }
    }
}

/// Open the history database unless disabled; failures only warn.
async fn open_history(
    config: &AppConfig,
    disabled: bool,
    warnings: &mut Vec<PipelineWarning>,
) -> Option<Storage> {
    if disabled {
        return None;
    }
    let path = expand_home(&config.defaults.history_db);
    match Storage::open(&path).await {
        Ok(storage) => Some(storage),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "run history unavailable");
            warnings.push(PipelineWarning::HistoryUnavailable {
                reason: e.to_string(),
            });
            None
        }
    }
}

/// Cancel `token` on Ctrl-C.
fn cancel_on_ctrl_c(token: &CancelToken) {
    let token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, finishing current step");
            token.cancel();
        }
    });
}

async fn run_session(
    assembled: &Assembled,
    history: Option<&Storage>,
    newsletters: &[Newsletter],
    force: bool,
    cancel: &CancelToken,
) -> leadscout_shared::Result<SessionReport> {
    let options = SessionOptions {
        min_score: assembled.settings.min_score,
        force,
    };
    let mut session = BatchSession::new(&assembled.pipeline, options);
    if let Some(storage) = history {
        session = session.with_history(storage);
    }

    let progress = CliProgress::new();
    let result = session.run(newsletters, cancel, &progress).await;
    progress.finish();

    let mut report = result?;
    let mut warnings = assembled.warnings.clone();
    warnings.append(&mut report.warnings);
    report.warnings = warnings;
    Ok(report)
}

fn write_report(report: &SessionReport, format: OutputFormat, out: Option<&Path>) -> leadscout_shared::Result<()> {
    let rendered = render(report, format.into())?;
    match out {
        Some(path) => {
            std::fs::write(path, rendered).map_err(|e| leadscout_shared::LeadScoutError::io(path, e))?;
            info!(path = %path.display(), "report written");
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(files: &[PathBuf], inbox: Option<&Path>, args: &PipelineArgs) -> Result<()> {
    let config = load_config()?;
    let assembled = assemble(&config, args)?;

    let mut newsletters = Vec::new();
    if let Some(dir) = inbox {
        newsletters.extend(leadscout_newsletter::load_dir(dir)?);
    }
    for file in files {
        newsletters.push(leadscout_newsletter::load_file(file)?);
    }
    if files.is_empty() && inbox.is_none() {
        let mut raw = String::new();
        std::io::stdin()
            .read_to_string(&mut raw)
            .wrap_err("failed to read newsletter from stdin")?;
        newsletters.push(Newsletter::from_raw("stdin", &raw, false)?);
    }
    newsletters.retain(|n| !n.is_empty());

    if newsletters.is_empty() {
        return Err(eyre!("no newsletter content to process"));
    }

    let mut history_warnings = Vec::new();
    let history = open_history(&config, args.no_history, &mut history_warnings).await;

    info!(
        newsletters = newsletters.len(),
        min_score = assembled.settings.min_score,
        "processing newsletters"
    );

    let cancel = CancelToken::new();
    cancel_on_ctrl_c(&cancel);

    let mut report = run_session(&assembled, history.as_ref(), &newsletters, args.force, &cancel).await?;
    history_warnings.append(&mut report.warnings);
    report.warnings = history_warnings;

    write_report(&report, args.format, args.out.as_deref())?;

    if report.cancelled {
        warn!("run cancelled; results are partial");
    }
    Ok(())
}

/// Everything one watch tick needs.
struct WatchContext<'a> {
    assembled: &'a Assembled,
    history: Option<&'a Storage>,
    inbox: &'a Path,
    args: &'a PipelineArgs,
    cancel: &'a CancelToken,
}

async fn watch_tick(ctx: &WatchContext<'_>, tick: u32) -> leadscout_shared::Result<()> {
    info!(tick, inbox = %ctx.inbox.display(), "checking inbox");
    let newsletters = leadscout_newsletter::load_dir(ctx.inbox)?;
    if newsletters.is_empty() {
        info!("inbox empty");
        return Ok(());
    }

    let report = run_session(ctx.assembled, ctx.history, &newsletters, ctx.args.force, ctx.cancel).await?;
    if report.processed_count() == 0 {
        info!("no new newsletters");
        return Ok(());
    }
    write_report(&report, ctx.args.format, ctx.args.out.as_deref())
}

async fn cmd_watch(inbox: Option<PathBuf>, interval: Option<String>, args: &PipelineArgs) -> Result<()> {
    let config = load_config()?;
    let assembled = assemble(&config, args)?;

    let inbox = inbox
        .or_else(|| config.worker.inbox_dir.as_deref().map(expand_home))
        .ok_or_else(|| eyre!("no inbox directory: pass --inbox or set worker.inbox_dir"))?;

    let raw_interval = interval.unwrap_or_else(|| config.worker.interval.clone());
    let schedule = schedule_from_config(Some(raw_interval.as_str()));

    let mut history_warnings = Vec::new();
    let history = open_history(&config, args.no_history, &mut history_warnings).await;
    for warning in &history_warnings {
        warn!(%warning, "watch continues without history");
    }

    let cancel = CancelToken::new();
    cancel_on_ctrl_c(&cancel);

    let ctx = WatchContext {
        assembled: &assembled,
        history: history.as_ref(),
        inbox: &inbox,
        args,
        cancel: &cancel,
    };
    let ctx = &ctx;

    let ticks = run_worker(schedule, &cancel, move |tick| watch_tick(ctx, tick)).await?;
    info!(ticks, "watch finished");
    Ok(())
}

async fn cmd_resolve(name: &str, enrichment: Option<PathBuf>) -> Result<()> {
    let config = load_config()?;
    let path = enrichment.unwrap_or_else(|| expand_home(&config.defaults.enrichment_path));
    let index = EnrichmentIndex::load(&path)?;

    match index.resolve_with_rule(name) {
        Some(resolution) => {
            let record = resolution.record;
            println!("  Match:     {}", record.company_name);
            println!("  Rule:      {}", resolution.rule.as_str());
            println!("  Domain:    {}", record.domain);
            match record.headcount {
                Some(headcount) => println!("  Employees: {headcount}"),
                None => println!("  Employees: unknown"),
            }
        }
        None => println!("  No match for '{name}' among {} records", index.len()),
    }
    Ok(())
}

async fn cmd_score(
    company_path: &Path,
    icp: Option<PathBuf>,
    enrichment: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let config = load_config()?;
    let icp_path = icp.unwrap_or_else(|| expand_home(&config.defaults.icp_path));
    let icp = leadscout_scoring::load_icp(&icp_path)?;

    let raw = if company_path == Path::new("-") {
        let mut raw = String::new();
        std::io::stdin()
            .read_to_string(&mut raw)
            .wrap_err("failed to read company from stdin")?;
        raw
    } else {
        std::fs::read_to_string(company_path)
            .wrap_err_with(|| format!("failed to read {}", company_path.display()))?
    };
    let mut company: Company =
        serde_json::from_str(&raw).wrap_err("company JSON does not match the export format")?;

    if let Some(path) = enrichment {
        let index = EnrichmentIndex::load(&path)?;
        if !index.enrich(&mut company) {
            warn!(company = %company.name, "no enrichment match");
        }
    }

    let breakdown = leadscout_scoring::breakdown(&company, &icp);
    if json {
        println!("{}", serde_json::to_string_pretty(&breakdown)?);
        return Ok(());
    }

    let show = |label: &str, value: Option<f64>| match value {
        Some(v) => println!("  {label:<10} {v:.2}"),
        None => println!("  {label:<10} -"),
    };
    println!("  {}", company.name);
    show("Industry", breakdown.industry);
    show("Stage", breakdown.stage);
    show("Geography", breakdown.geography);
    show("Size", Some(breakdown.size));
    show("Tech", breakdown.tech);
    println!("  {:<10} {:.2}", "Total", breakdown.total);
    Ok(())
}

async fn cmd_history(limit: u32, run_id: Option<&str>) -> Result<()> {
    let config = load_config()?;
    let path = expand_home(&config.defaults.history_db);
    let storage = Storage::open_readonly(&path).await?;

    let Some(run_id) = run_id else {
        let runs = storage.list_runs(limit).await?;
        if runs.is_empty() {
            println!("  No runs recorded yet.");
            return Ok(());
        }
        for run in runs {
            let mut flags = Vec::new();
            if run.stats.degraded {
                flags.push("degraded");
            }
            if run.stats.cancelled {
                flags.push("cancelled");
            }
            if run.finished_at.is_none() {
                flags.push("unfinished");
            }
            println!(
                "  {}  {}  newsletters={} leads={} min_score={:.2} {}",
                run.id,
                run.started_at.format("%Y-%m-%d %H:%M"),
                run.stats.newsletters,
                run.stats.leads,
                run.min_score,
                flags.join(",")
            );
        }
        return Ok(());
    };

    let newsletters = storage.list_newsletters_for_run(run_id).await?;
    let leads = storage.list_leads_for_run(run_id).await?;
    println!("  Newsletters ({}):", newsletters.len());
    for n in &newsletters {
        println!(
            "    {}  {} [{}] leads={}",
            &n.id[..n.id.len().min(12)],
            n.subject,
            n.extraction_source,
            n.lead_count
        );
    }
    println!("  Leads ({}):", leads.len());
    for lead in &leads {
        println!(
            "    #{} {} ({:.2}) [{}]",
            lead.rank, lead.company.name, lead.company.icp_score, lead.outreach_source
        );
    }
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl PipelineProgress for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn company_scored(&self, name: &str, score: f64, kept: bool) {
        let verdict = if kept { "keep" } else { "skip" };
        self.spinner
            .set_message(format!("Scored {name}: {score:.2} ({verdict})"));
    }

    fn outreach_written(&self, name: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Outreach [{current}/{total}] {name}"));
    }
}
