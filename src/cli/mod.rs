//! CLI command implementations

pub mod catalog;
pub mod init;
pub mod notifications;
pub mod progress;
pub mod ranking;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use serde::Serialize;

use questline::config::Config;
use questline::domain::{CallerContext, Role};
use questline::notify::{RetryingNotifier, SqliteNotificationSink};
use questline::progression::{Progression, ProgressionError};
use questline::store::{ProgressionDb, SqliteStore};

/// Everything a command needs: config, engine and the acting caller
pub struct CliContext {
    pub config: Config,
    pub engine: Progression<SqliteStore>,
    pub notifier: Arc<RetryingNotifier>,
    pub sink: SqliteNotificationSink,
    pub caller: CallerContext,
    pub json: bool,
}

impl CliContext {
    pub fn open(
        config_override: Option<&Path>,
        user: Option<i64>,
        role: &str,
        json: bool,
    ) -> Result<Self> {
        let config = load_config(config_override)?;
        let db = ProgressionDb::open(&config.database_path())?;

        let sink = SqliteNotificationSink::new(db.clone());
        let notifier = Arc::new(RetryingNotifier::new(
            Arc::new(sink.clone()),
            config.deferred.max_attempts,
        ));
        let engine = Progression::new(SqliteStore::new(db), notifier.clone())
            .with_settings(config.progression_settings());

        Ok(Self {
            caller: caller_context(user, role)?,
            config,
            engine,
            notifier,
            sink,
            json,
        })
    }

    /// Last delivery attempt for notifications that failed during the command
    pub fn flush_notifications(&self) {
        let report = self.notifier.retry_pending();
        if report.requeued > 0 {
            tracing::warn!(
                "{} notification(s) could not be delivered and are discarded on exit",
                report.requeued
            );
        }
    }

    /// Map an engine error to what the user gets to see
    pub fn engine_error(&self, err: ProgressionError) -> anyhow::Error {
        anyhow!(
            "{} ({})",
            err.public_message(self.config.errors.debug),
            err.kind().as_str()
        )
    }

    /// Print as JSON with `--json`, otherwise with `render`
    pub fn print<T: Serialize>(&self, value: &T, render: impl FnOnce(&T)) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            render(value);
        }
        Ok(())
    }
}

pub fn load_config(config_override: Option<&Path>) -> Result<Config> {
    let config = match config_override {
        Some(path) => Config::from_file(path),
        None => Config::load(),
    };
    config.context("Failed to load questline config")
}

fn caller_context(user: Option<i64>, role: &str) -> Result<CallerContext> {
    let role = Role::from_str(role)
        .ok_or_else(|| anyhow!("Unknown role '{role}' (expected student, mentor or admin)"))?;
    Ok(match user {
        Some(user_id) => CallerContext::new(user_id, role),
        None => CallerContext::anonymous(),
    })
}
