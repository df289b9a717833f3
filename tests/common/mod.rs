//! Shared test utilities for progression integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use questline::domain::{
    BadgeInfo, Boss, CallerContext, Character, Difficulty, Level, Mission, NewBoss, NewLevel,
    NewMission, Notification, NotificationKind, UserId,
};
use questline::notify::{NotificationEmitter, NotifyError};
use questline::progression::Progression;
use questline::store::{ProgressionDb, SqliteStore};

pub const MENTOR_ID: UserId = 900;

/// Keeps every emitted notification
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn kinds(&self) -> Vec<NotificationKind> {
        self.sent.lock().unwrap().iter().map(|n| n.kind).collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

impl NotificationEmitter for RecordingNotifier {
    fn emit(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

/// Rejects every notification
pub struct FailingNotifier;

impl NotificationEmitter for FailingNotifier {
    fn emit(&self, _notification: &Notification) -> Result<(), NotifyError> {
        Err(NotifyError::Unavailable("transport down".into()))
    }
}

/// An engine over a fresh SQLite file in a temp directory
pub struct TestWorld {
    pub dir: TempDir,
    pub engine: Progression<SqliteStore>,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestWorld {
    pub fn new() -> Self {
        let notifier = Arc::new(RecordingNotifier::default());
        Self::with_notifier(notifier.clone(), notifier)
    }

    pub fn with_emitter(emitter: Arc<dyn NotificationEmitter>) -> Self {
        Self::with_notifier(Arc::new(RecordingNotifier::default()), emitter)
    }

    fn with_notifier(
        notifier: Arc<RecordingNotifier>,
        emitter: Arc<dyn NotificationEmitter>,
    ) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let db = ProgressionDb::open(&dir.path().join("progress.db")).expect("Failed to open db");
        let engine = Progression::new(SqliteStore::new(db), emitter);
        Self {
            dir,
            engine,
            notifier,
        }
    }

    pub fn writes(&self) -> u64 {
        self.engine.store().write_count()
    }

    /// Levels at the given (order, xp threshold) pairs
    pub fn seed_levels(&self, levels: &[(u32, i64)]) -> Vec<Level> {
        let catalog = self.engine.catalog();
        levels
            .iter()
            .map(|&(order, threshold)| {
                catalog
                    .create_level(
                        &NewLevel::new(order, threshold, format!("Level {order}"))
                            .with_difficulty(Difficulty::Beginner),
                    )
                    .unwrap()
            })
            .collect()
    }

    pub fn add_missions(&self, level: &Level, count: u32, xp_reward: i64) -> Vec<Mission> {
        let catalog = self.engine.catalog();
        (1..=count)
            .map(|n| {
                catalog
                    .create_mission(&NewMission::new(
                        level.id,
                        format!("Mission {n} of level {}", level.order),
                        xp_reward,
                        n,
                    ))
                    .unwrap()
            })
            .collect()
    }

    pub fn add_boss(&self, level: &Level, xp_reward: i64) -> Boss {
        self.engine
            .catalog()
            .create_boss(&NewBoss::new(
                level.id,
                format!("Guardian of level {}", level.order),
                xp_reward,
                BadgeInfo::new(format!("Level {} champion", level.order)).with_icon("trophy"),
            ))
            .unwrap()
    }

    pub fn character(&self, user_id: UserId) -> Character {
        self.engine
            .catalog()
            .create_character(user_id, &format!("hero-{user_id}"))
            .unwrap()
    }

    /// Start, submit and approve a mission for `user_id`
    pub fn complete_mission(&self, user_id: UserId, mission: &Mission) {
        let student = CallerContext::student(user_id);
        let missions = self.engine.missions();
        missions.start(&student, mission.id).unwrap();
        let attempt = missions
            .submit(&student, mission.id, "https://github.com/student/solution", None)
            .unwrap();
        missions
            .evaluate(&mentor(), attempt.id, true, Some("Nice".into()))
            .unwrap();
    }
}

pub fn mentor() -> CallerContext {
    CallerContext::mentor(MENTOR_ID)
}
