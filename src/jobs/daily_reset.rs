//! Daily lifecycle job
//!
//! Once per day the job summarizes every user's todos over email and then
//! purges the todo store so the next day starts clean. A failed send for one
//! user never affects another user and never blocks the purge; only a failed
//! user fetch (nothing done yet) or a failed purge surface as run errors.

use anyhow::{Context, Result};
use chrono::DateTime;
use chrono_tz::Tz;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::db::{self, User};
use crate::notifications::summary::compose;
use crate::notifications::{MailTransport, SendError};
use crate::DbPool;

/// Per-user failure during summarize-and-send. Caught at exactly this
/// boundary; siblings and the purge continue.
#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("todo store error: {0}")]
    Store(#[from] sqlx::Error),
    #[error(transparent)]
    Send(#[from] SendError),
}

impl SummaryError {
    pub fn kind(&self) -> &'static str {
        match self {
            SummaryError::Store(_) => "store",
            SummaryError::Send(e) => e.kind(),
        }
    }
}

/// Outcome counters for one daily run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub users_processed: u64,
    pub emails_sent: u64,
    pub emails_skipped: u64,
    pub email_failures: u64,
    pub todos_purged: u64,
}

/// Executes the summarize-then-purge cycle.
pub struct DailyResetJob {
    db: DbPool,
    config: Config,
    transport: Arc<dyn MailTransport>,
    run_guard: Mutex<()>,
}

impl DailyResetJob {
    pub fn new(db: DbPool, config: Config, transport: Arc<dyn MailTransport>) -> Self {
        Self {
            db,
            config,
            transport,
            run_guard: Mutex::new(()),
        }
    }

    /// Run one full daily cycle for the given summary date.
    ///
    /// Ordering: all users are attempted (sequentially) before the purge;
    /// the purge is global and unconditional, covering todos whose owner is
    /// absent from the user snapshot.
    pub async fn run_daily_cycle(&self, as_of: DateTime<Tz>) -> Result<RunReport> {
        let mut report = RunReport::default();

        if !self.config.daily_reset.enabled {
            debug!("Daily reset disabled; skipping scheduled cycle");
            return Ok(report);
        }

        let Ok(_guard) = self.run_guard.try_lock() else {
            warn!("Daily cycle already running; ignoring overlapping trigger");
            return Ok(report);
        };

        info!(date = %as_of.format("%Y-%m-%d"), "Running daily summary and purge");

        let users = db::users::find_all(&self.db)
            .await
            .context("Failed to load users for daily cycle")?;

        // Evaluated once per run, not per user. A closed gate skips every
        // send but still lets the purge happen.
        let sending_enabled = self.config.mail.summary_enabled && self.config.mail.is_configured();
        if self.config.mail.summary_enabled && !self.config.mail.is_configured() {
            error!("Summary email enabled but SMTP transport not configured; skipping emails");
        }

        for user in &users {
            report.users_processed += 1;

            if !sending_enabled {
                continue;
            }
            if user.email.is_empty() {
                warn!(user_id = %user.id, "User has no email address; skipping summary");
                report.emails_skipped += 1;
                continue;
            }

            match self.summarize_and_send(user, as_of).await {
                Ok(()) => {
                    report.emails_sent += 1;
                    info!(user_id = %user.id, recipient = %user.email, "Sent daily summary email");
                }
                Err(e) => {
                    report.email_failures += 1;
                    warn!(
                        user_id = %user.id,
                        kind = e.kind(),
                        error = %e,
                        "Failed to send daily summary"
                    );
                }
            }
        }

        report.todos_purged = db::todos::delete_all(&self.db)
            .await
            .context("Daily purge failed")?;

        info!(
            users = report.users_processed,
            sent = report.emails_sent,
            skipped = report.emails_skipped,
            failed = report.email_failures,
            purged = report.todos_purged,
            "Daily purge complete"
        );

        Ok(report)
    }

    async fn summarize_and_send(
        &self,
        user: &User,
        as_of: DateTime<Tz>,
    ) -> Result<(), SummaryError> {
        let todos = db::todos::find_by_owner(&self.db, &user.id).await?;
        let (subject, body) = compose(user, &todos, as_of, &self.config.server.app_name);
        self.transport.send(&subject, &body, &user.email).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, MailConfig};
    use crate::db::Todo;
    use async_trait::async_trait;
    use chrono::TimeZone;

    #[derive(Debug, Clone)]
    struct SentMail {
        subject: String,
        body: String,
        recipient: String,
    }

    /// Records sends; fails for configured recipients.
    #[derive(Default)]
    struct FakeTransport {
        sent: std::sync::Mutex<Vec<SentMail>>,
        fail_for: Vec<String>,
    }

    impl FakeTransport {
        fn failing_for(recipients: &[&str]) -> Self {
            Self {
                sent: std::sync::Mutex::new(Vec::new()),
                fail_for: recipients.iter().map(|r| r.to_string()).collect(),
            }
        }

        fn sent(&self) -> Vec<SentMail> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MailTransport for FakeTransport {
        async fn send(&self, subject: &str, body: &str, recipient: &str) -> Result<(), SendError> {
            if self.fail_for.iter().any(|r| r == recipient) {
                return Err(SendError::Transport("connection refused".to_string()));
            }
            self.sent.lock().unwrap().push(SentMail {
                subject: subject.to_string(),
                body: body.to_string(),
                recipient: recipient.to_string(),
            });
            Ok(())
        }
    }

    fn as_of() -> DateTime<Tz> {
        Tz::UTC.with_ymd_and_hms(2024, 3, 5, 23, 59, 0).unwrap()
    }

    fn mail_configured() -> MailConfig {
        MailConfig {
            summary_enabled: true,
            smtp_host: Some("smtp.example.com".to_string()),
            from_address: Some("bot@example.com".to_string()),
            ..MailConfig::default()
        }
    }

    fn config_with_mail(mail: MailConfig) -> Config {
        let mut config = Config::default();
        config.mail = mail;
        config
    }

    fn user(id: &str, email: &str) -> User {
        User {
            id: id.to_string(),
            username: id.to_string(),
            email: email.to_string(),
            first_name: String::new(),
            last_name: String::new(),
            password_hash: "x".to_string(),
            is_active: 1,
            role: "user".to_string(),
            created_at: "2024-03-05T00:00:00Z".to_string(),
            updated_at: "2024-03-05T00:00:00Z".to_string(),
        }
    }

    fn todo(id: &str, owner: &str, title: &str, priority: i64, complete: bool) -> Todo {
        Todo {
            id: id.to_string(),
            title: title.to_string(),
            description: format!("about {}", title),
            priority,
            complete: complete as i64,
            owner_id: owner.to_string(),
            created_at: "2024-03-05T08:00:00Z".to_string(),
            completed_at: None,
        }
    }

    async fn setup(mail: MailConfig) -> (DbPool, Config) {
        let pool = db::init_with_url("sqlite::memory:").await.unwrap();
        (pool, config_with_mail(mail))
    }

    #[tokio::test]
    async fn test_master_switch_off_is_a_no_op() {
        let (pool, mut config) = setup(mail_configured()).await;
        config.daily_reset.enabled = false;

        db::users::insert(&pool, &user("alice", "alice@example.com"))
            .await
            .unwrap();
        db::todos::insert(&pool, &todo("t1", "alice", "Buy milk", 2, false))
            .await
            .unwrap();

        let transport = Arc::new(FakeTransport::default());
        let job = DailyResetJob::new(pool.clone(), config, transport.clone());

        let report = job.run_daily_cycle(as_of()).await.unwrap();

        assert_eq!(report, RunReport::default());
        assert!(transport.sent().is_empty());
        assert_eq!(db::todos::find_all(&pool).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failure_for_one_user_is_isolated_and_purge_runs() {
        let (pool, config) = setup(mail_configured()).await;

        for name in ["alice", "bob", "carol"] {
            db::users::insert(&pool, &user(name, &format!("{}@example.com", name)))
                .await
                .unwrap();
            db::todos::insert(
                &pool,
                &todo(&format!("t-{}", name), name, "Daily thing", 1, false),
            )
            .await
            .unwrap();
        }

        let transport = Arc::new(FakeTransport::failing_for(&["bob@example.com"]));
        let job = DailyResetJob::new(pool.clone(), config, transport.clone());

        let report = job.run_daily_cycle(as_of()).await.unwrap();

        assert_eq!(report.users_processed, 3);
        assert_eq!(report.emails_sent, 2);
        assert_eq!(report.email_failures, 1);
        assert_eq!(report.todos_purged, 3);
        assert!(db::todos::find_all(&pool).await.unwrap().is_empty());

        let recipients: Vec<String> = transport.sent().iter().map(|m| m.recipient.clone()).collect();
        assert!(recipients.contains(&"alice@example.com".to_string()));
        assert!(recipients.contains(&"carol@example.com".to_string()));
    }

    #[tokio::test]
    async fn test_purge_is_global_including_orphaned_todos() {
        let (pool, config) = setup(mail_configured()).await;

        db::users::insert(&pool, &user("alice", "alice@example.com"))
            .await
            .unwrap();
        db::todos::insert(&pool, &todo("t1", "alice", "Buy milk", 2, false))
            .await
            .unwrap();
        db::todos::insert(&pool, &todo("t2", "ghost", "Orphaned", 3, true))
            .await
            .unwrap();

        let transport = Arc::new(FakeTransport::default());
        let job = DailyResetJob::new(pool.clone(), config, transport.clone());

        let report = job.run_daily_cycle(as_of()).await.unwrap();

        assert_eq!(report.users_processed, 1);
        assert_eq!(report.todos_purged, 2);
        assert!(db::todos::find_all(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unconfigured_transport_skips_sends_but_purges() {
        let mail = MailConfig {
            summary_enabled: true,
            ..MailConfig::default()
        };
        let (pool, config) = setup(mail).await;

        db::users::insert(&pool, &user("alice", "alice@example.com"))
            .await
            .unwrap();
        db::todos::insert(&pool, &todo("t1", "alice", "Buy milk", 2, false))
            .await
            .unwrap();

        let transport = Arc::new(FakeTransport::default());
        let job = DailyResetJob::new(pool.clone(), config, transport.clone());

        let report = job.run_daily_cycle(as_of()).await.unwrap();

        assert_eq!(report.users_processed, 1);
        assert_eq!(report.emails_sent, 0);
        assert_eq!(report.email_failures, 0);
        assert_eq!(report.todos_purged, 1);
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_summaries_disabled_still_purges() {
        let mail = MailConfig {
            summary_enabled: false,
            ..mail_configured()
        };
        let (pool, config) = setup(mail).await;

        db::users::insert(&pool, &user("alice", "alice@example.com"))
            .await
            .unwrap();
        db::todos::insert(&pool, &todo("t1", "alice", "Buy milk", 2, false))
            .await
            .unwrap();

        let transport = Arc::new(FakeTransport::default());
        let job = DailyResetJob::new(pool.clone(), config, transport.clone());

        let report = job.run_daily_cycle(as_of()).await.unwrap();

        assert_eq!(report.emails_sent, 0);
        assert_eq!(report.todos_purged, 1);
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_missing_email_address_is_a_skip_not_a_failure() {
        let (pool, config) = setup(mail_configured()).await;

        db::users::insert(&pool, &user("alice", "alice@example.com"))
            .await
            .unwrap();
        db::users::insert(&pool, &user("bob", "")).await.unwrap();

        let transport = Arc::new(FakeTransport::default());
        let job = DailyResetJob::new(pool.clone(), config, transport.clone());

        let report = job.run_daily_cycle(as_of()).await.unwrap();

        assert_eq!(report.users_processed, 2);
        assert_eq!(report.emails_sent, 1);
        assert_eq!(report.emails_skipped, 1);
        assert_eq!(report.email_failures, 0);
    }

    #[tokio::test]
    async fn test_two_user_scenario_bodies_and_purge() {
        let (pool, config) = setup(mail_configured()).await;

        db::users::insert(&pool, &user("alice", "alice@example.com"))
            .await
            .unwrap();
        db::users::insert(&pool, &user("bob", "bob@example.com"))
            .await
            .unwrap();
        db::todos::insert(&pool, &todo("t1", "alice", "Buy milk", 2, false))
            .await
            .unwrap();

        let transport = Arc::new(FakeTransport::default());
        let job = DailyResetJob::new(pool.clone(), config, transport.clone());

        let report = job.run_daily_cycle(as_of()).await.unwrap();
        assert_eq!(report.emails_sent, 2);
        assert_eq!(report.todos_purged, 1);

        let sent = transport.sent();
        let alice = sent
            .iter()
            .find(|m| m.recipient == "alice@example.com")
            .unwrap();
        assert_eq!(alice.subject, "Your Todo Summary · Mar 05, 2024");
        assert!(alice.body.contains("• Total tasks: 1"));
        assert!(alice.body.contains("• Completed: 0"));
        assert!(alice.body.contains("• Pending: 1"));
        assert!(alice.body.contains("1. Buy milk [Pending] (Priority 2)"));

        let bob = sent
            .iter()
            .find(|m| m.recipient == "bob@example.com")
            .unwrap();
        assert!(bob
            .body
            .contains("Looks like you had a clean slate today. Great job!"));

        assert!(db::todos::find_all(&pool).await.unwrap().is_empty());
    }
}
