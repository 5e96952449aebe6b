//! libSQL run history.
//!
//! The [`Storage`] struct wraps a local libSQL database recording each batch
//! run, every newsletter it processed (by content hash) and the ranked leads
//! it retained. Batch sessions consult it to skip newsletters already seen.
//!
//! **Access rules:**
//! - `run` / `watch`: read-write via [`Storage::open`]
//! - `history`: read-only via [`Storage::open_readonly`]

mod migrations;

use std::path::Path;

use chrono::{DateTime, Utc};
use leadscout_shared::{Company, LeadScoutError, Result};
use libsql::{Connection, Database, Row, params};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Totals written when a run finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub newsletters: u32,
    pub leads: u32,
    pub degraded: bool,
    pub cancelled: bool,
}

/// One row of the `runs` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRecord {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub min_score: f64,
    pub stats: RunStats,
}

/// A processed newsletter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewsletterRecord {
    /// Content hash of the newsletter text.
    pub id: String,
    pub source: String,
    pub subject: String,
    /// `model` or `demo_fallback`.
    pub extraction_source: String,
    pub lead_count: u32,
}

/// A lead as stored for a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredLead {
    pub rank: u32,
    pub newsletter_id: Option<String>,
    /// `model` or `template`.
    pub outreach_source: String,
    pub company: Company,
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LeadScoutError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| LeadScoutError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| LeadScoutError::Storage(e.to_string()))?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(LeadScoutError::Storage(format!(
                "history database not found: {}",
                path.display()
            )));
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| LeadScoutError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| LeadScoutError::Storage(e.to_string()))?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        LeadScoutError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(LeadScoutError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Runs
    // -----------------------------------------------------------------------

    /// Start a run and return its id.
    pub async fn insert_run(&self, min_score: f64) -> Result<String> {
        self.check_writable()?;
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO runs (id, started_at, min_score) VALUES (?1, ?2, ?3)",
                params![id.as_str(), now.as_str(), min_score],
            )
            .await
            .map_err(|e| LeadScoutError::Storage(e.to_string()))?;
        debug!(run_id = %id, "run started");
        Ok(id)
    }

    /// Mark a run finished and store its totals.
    pub async fn finish_run(&self, run_id: &str, stats: &RunStats) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "UPDATE runs SET finished_at = ?1, newsletters = ?2, leads = ?3,
                 degraded = ?4, cancelled = ?5 WHERE id = ?6",
                params![
                    now.as_str(),
                    i64::from(stats.newsletters),
                    i64::from(stats.leads),
                    i64::from(stats.degraded),
                    i64::from(stats.cancelled),
                    run_id
                ],
            )
            .await
            .map_err(|e| LeadScoutError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Most recent runs first.
    pub async fn list_runs(&self, limit: u32) -> Result<Vec<RunRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, started_at, finished_at, min_score, newsletters, leads, degraded, cancelled
                 FROM runs ORDER BY started_at DESC, id DESC LIMIT ?1",
                params![i64::from(limit)],
            )
            .await
            .map_err(|e| LeadScoutError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_run(&row)?);
        }
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Newsletters
    // -----------------------------------------------------------------------

    /// Whether a newsletter with this content hash was already processed.
    pub async fn is_newsletter_processed(&self, newsletter_id: &str) -> Result<bool> {
        let mut rows = self
            .conn
            .query(
                "SELECT 1 FROM newsletters WHERE id = ?1",
                params![newsletter_id],
            )
            .await
            .map_err(|e| LeadScoutError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(_)) => Ok(true),
            Ok(None) => Ok(false),
            Err(e) => Err(LeadScoutError::Storage(e.to_string())),
        }
    }

    /// Record a processed newsletter; reprocessing replaces the earlier row.
    pub async fn record_newsletter(&self, run_id: &str, record: &NewsletterRecord) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO newsletters (id, run_id, source, subject, extraction_source, lead_count, processed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(id) DO UPDATE SET
                    run_id = excluded.run_id,
                    source = excluded.source,
                    subject = excluded.subject,
                    extraction_source = excluded.extraction_source,
                    lead_count = excluded.lead_count,
                    processed_at = excluded.processed_at",
                params![
                    record.id.as_str(),
                    run_id,
                    record.source.as_str(),
                    record.subject.as_str(),
                    record.extraction_source.as_str(),
                    i64::from(record.lead_count),
                    now.as_str()
                ],
            )
            .await
            .map_err(|e| LeadScoutError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Newsletters processed by a run, in processing order.
    pub async fn list_newsletters_for_run(&self, run_id: &str) -> Result<Vec<NewsletterRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, source, subject, extraction_source, lead_count
                 FROM newsletters WHERE run_id = ?1 ORDER BY processed_at, rowid",
                params![run_id],
            )
            .await
            .map_err(|e| LeadScoutError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(NewsletterRecord {
                id: get_string(&row, 0)?,
                source: get_string(&row, 1)?,
                subject: get_string(&row, 2)?,
                extraction_source: get_string(&row, 3)?,
                lead_count: get_u32(&row, 4)?,
            });
        }
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Leads
    // -----------------------------------------------------------------------

    /// Store one ranked lead of a run.
    pub async fn insert_lead(
        &self,
        run_id: &str,
        rank: u32,
        newsletter_id: Option<&str>,
        company: &Company,
        outreach_source: &str,
    ) -> Result<()> {
        self.check_writable()?;
        let company_json = serde_json::to_string(company)
            .map_err(|e| LeadScoutError::Storage(format!("failed to encode lead: {e}")))?;
        self.conn
            .execute(
                "INSERT INTO leads (run_id, newsletter_id, rank, name, dedup_key, score, outreach_source, company_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    run_id,
                    newsletter_id,
                    i64::from(rank),
                    company.name.as_str(),
                    company.dedup_key(),
                    company.icp_score,
                    outreach_source,
                    company_json
                ],
            )
            .await
            .map_err(|e| LeadScoutError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Leads of a run, best rank first.
    pub async fn list_leads_for_run(&self, run_id: &str) -> Result<Vec<StoredLead>> {
        let mut rows = self
            .conn
            .query(
                "SELECT rank, newsletter_id, outreach_source, company_json
                 FROM leads WHERE run_id = ?1 ORDER BY rank",
                params![run_id],
            )
            .await
            .map_err(|e| LeadScoutError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            let company_json = get_string(&row, 3)?;
            let company: Company = serde_json::from_str(&company_json)
                .map_err(|e| LeadScoutError::Storage(format!("invalid stored lead: {e}")))?;
            results.push(StoredLead {
                rank: get_u32(&row, 0)?,
                newsletter_id: row.get::<String>(1).ok(),
                outreach_source: get_string(&row, 2)?,
                company,
            });
        }
        Ok(results)
    }
}

// ---------------------------------------------------------------------------
// Row helpers
// ---------------------------------------------------------------------------

fn get_string(row: &Row, idx: i32) -> Result<String> {
    row.get::<String>(idx)
        .map_err(|e| LeadScoutError::Storage(e.to_string()))
}

fn get_u32(row: &Row, idx: i32) -> Result<u32> {
    let value = row
        .get::<i64>(idx)
        .map_err(|e| LeadScoutError::Storage(e.to_string()))?;
    u32::try_from(value).map_err(|_| LeadScoutError::Storage(format!("value out of range: {value}")))
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| LeadScoutError::Storage(format!("invalid date: {e}")))
}

fn row_to_run(row: &Row) -> Result<RunRecord> {
    let started_at = parse_timestamp(&get_string(row, 1)?)?;
    let finished_at = match row.get::<String>(2).ok() {
        Some(s) => Some(parse_timestamp(&s)?),
        None => None,
    };

    Ok(RunRecord {
        id: get_string(row, 0)?,
        started_at,
        finished_at,
        min_score: row
            .get::<f64>(3)
            .map_err(|e| LeadScoutError::Storage(e.to_string()))?,
        stats: RunStats {
            newsletters: get_u32(row, 4)?,
            leads: get_u32(row, 5)?,
            degraded: get_u32(row, 6)? != 0,
            cancelled: get_u32(row, 7)? != 0,
        },
    })
}
