//! Background jobs and their scheduling.

pub mod daily_reset;

pub use daily_reset::{DailyResetJob, RunReport, SummaryError};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use std::str::FromStr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Fires at 23:59 every day, app-local time (sec min hour dom month dow).
const DAILY_SCHEDULE: &str = "0 59 23 * * *";

/// Owns the daily timer task. Created at process start, started on boot,
/// aborted on shutdown without waiting for in-flight work.
pub struct DailyScheduler {
    job: Arc<DailyResetJob>,
    timezone: Tz,
    handle: Option<JoinHandle<()>>,
}

impl DailyScheduler {
    pub fn new(job: Arc<DailyResetJob>, timezone: Tz) -> Self {
        Self {
            job,
            timezone,
            handle: None,
        }
    }

    /// Spawn the timer task, replacing any previously started one.
    pub fn start(&mut self) {
        self.stop_timer();

        let job = self.job.clone();
        let tz = self.timezone;
        let schedule = Schedule::from_str(DAILY_SCHEDULE).expect("valid cron expression");

        let handle = tokio::spawn(async move {
            loop {
                let now = Utc::now().with_timezone(&tz);
                let Some(next) = next_fire(&schedule, &now) else {
                    error!("No upcoming fire time for daily schedule; stopping timer");
                    break;
                };
                let wait = (next - now).to_std().unwrap_or(std::time::Duration::ZERO);
                tokio::time::sleep(wait).await;

                let as_of = Utc::now().with_timezone(&tz);
                if let Err(e) = job.run_daily_cycle(as_of).await {
                    error!(error = %e, "Daily cycle failed");
                }
            }
        });

        self.handle = Some(handle);
        info!(timezone = %self.timezone, "Daily summary and purge scheduled for 23:59");
    }

    /// Abort the timer. In-flight work is not awaited.
    pub fn shutdown(&mut self) {
        self.stop_timer();
        info!("Daily scheduler stopped");
    }

    fn stop_timer(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

fn next_fire(schedule: &Schedule, after: &DateTime<Tz>) -> Option<DateTime<Tz>> {
    schedule.after(after).next()
}
