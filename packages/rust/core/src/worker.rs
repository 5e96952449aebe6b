//! Interval worker: run a session now, then again on every tick until cancelled.

use std::future::Future;
use std::time::Duration;

use tracing::{error, info, warn};

use leadscout_shared::{LeadScoutError, Result};

use crate::cancel::CancelToken;

/// Longest supported pause between ticks (`i32::MAX` milliseconds, ~24.8 days).
pub const MAX_INTERVAL: Duration = Duration::from_millis(i32::MAX as u64);

/// When the worker runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Run a single session and stop.
    Once,
    /// Run a session, wait, repeat.
    Every(Duration),
}

/// Parse an interval: empty means run once, `"N"` is N minutes, `"HH:MM:SS"`
/// is an explicit duration.
///
/// # Errors
///
/// `Validation` for unparsable, zero or oversize intervals.
pub fn parse_interval(raw: &str) -> Result<Schedule> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Schedule::Once);
    }

    let interval = if raw.contains(':') {
        parse_clock(raw)?
    } else {
        let minutes: u64 = raw.parse().map_err(|_| {
            LeadScoutError::validation(format!(
                "invalid worker interval '{raw}': expected minutes or HH:MM:SS"
            ))
        })?;
        Duration::from_secs(minutes.saturating_mul(60))
    };

    if interval.is_zero() {
        return Err(LeadScoutError::validation(format!(
            "worker interval '{raw}' must be greater than zero"
        )));
    }
    if interval > MAX_INTERVAL {
        return Err(LeadScoutError::validation(format!(
            "worker interval '{raw}' exceeds the maximum of {} seconds",
            MAX_INTERVAL.as_secs()
        )));
    }
    Ok(Schedule::Every(interval))
}

fn parse_clock(raw: &str) -> Result<Duration> {
    let invalid = || {
        LeadScoutError::validation(format!(
            "invalid worker interval '{raw}': expected HH:MM:SS"
        ))
    };

    let parts: Vec<&str> = raw.split(':').collect();
    let [hours, minutes, seconds] = parts.as_slice() else {
        return Err(invalid());
    };
    let hours: u64 = hours.trim().parse().map_err(|_| invalid())?;
    let minutes: u64 = minutes.trim().parse().map_err(|_| invalid())?;
    let seconds: u64 = seconds.trim().parse().map_err(|_| invalid())?;
    if minutes >= 60 || seconds >= 60 {
        return Err(invalid());
    }

    let total = hours
        .saturating_mul(3600)
        .saturating_add(minutes * 60)
        .saturating_add(seconds);
    Ok(Duration::from_secs(total))
}

/// Resolve the configured interval, falling back to a single run when invalid.
pub fn schedule_from_config(raw: Option<&str>) -> Schedule {
    let Some(raw) = raw else {
        info!("no worker interval configured, running once");
        return Schedule::Once;
    };
    match parse_interval(raw) {
        Ok(schedule) => schedule,
        Err(e) => {
            error!(error = %e, "bad worker interval, running once");
            Schedule::Once
        }
    }
}

/// Drive `tick` on `schedule` until it finishes or `cancel` fires.
///
/// Non-fatal tick errors are logged and the loop keeps going; configuration
/// errors stop it. Returns the number of ticks that ran.
pub async fn run_worker<F, Fut>(schedule: Schedule, cancel: &CancelToken, mut tick: F) -> Result<u32>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let mut ticks = 0u32;

    match schedule {
        Schedule::Once => info!("running in single-run mode"),
        Schedule::Every(interval) => info!(interval_secs = interval.as_secs(), "running in interval mode"),
    }

    while !cancel.is_cancelled() {
        ticks += 1;
        if let Err(e) = tick(ticks).await {
            if e.is_fatal() {
                return Err(e);
            }
            warn!(tick = ticks, error = %e, "worker tick failed");
        }

        let Schedule::Every(interval) = schedule else {
            break;
        };
        if cancel.is_cancelled() {
            break;
        }

        info!(interval_secs = interval.as_secs(), "next run scheduled");
        if cancel.run(tokio::time::sleep(interval)).await.is_none() {
            break;
        }
    }

    info!(ticks, "worker stopped");
    Ok(ticks)
}
