//! Integration tests for mission progress, unlock thresholds and XP

mod common;

use std::sync::Arc;
use std::thread;

use common::{FailingNotifier, TestWorld, mentor};
use questline::domain::{BossStatus, CallerContext, MissionStatus, NotificationKind};
use questline::progression::ErrorKind;
use questline::store::ProgressionStore;

#[test]
fn test_eight_of_ten_missions_unlocks_boss_with_one_write() {
    let world = TestWorld::new();
    let level = world.seed_levels(&[(1, 0)]).remove(0);
    let missions = world.add_missions(&level, 10, 10);
    world.add_boss(&level, 100);
    world.character(1);

    for mission in &missions[..8] {
        world.complete_mission(1, mission);
    }
    assert_eq!(
        world
            .engine
            .calculator()
            .level_completion_percentage(level.id, 1)
            .unwrap(),
        80.0
    );

    world.notifier.clear();
    let before = world.writes();
    let progress = world
        .engine
        .bosses()
        .check_unlock(&CallerContext::student(1), level.id)
        .unwrap();

    assert_eq!(world.writes() - before, 1);
    assert_eq!(progress.completion_percentage, 80.0);
    assert_eq!(progress.status, BossStatus::Unlocked);
    assert!(progress.just_unlocked);
    assert_eq!(world.notifier.kinds(), vec![NotificationKind::BossUnlocked]);

    let attempt = world
        .engine
        .store()
        .boss_attempt(progress.attempt_id)
        .unwrap()
        .unwrap();
    assert!(attempt.unlocked_at.is_some());
}

#[test]
fn test_locked_attempt_crossing_threshold_writes_once() {
    let world = TestWorld::new();
    let level = world.seed_levels(&[(1, 0)]).remove(0);
    let missions = world.add_missions(&level, 10, 10);
    world.add_boss(&level, 100);
    world.character(1);
    let student = CallerContext::student(1);

    // Lazy creation in LOCKED
    let before = world.writes();
    let first = world.engine.bosses().check_unlock(&student, level.id).unwrap();
    assert_eq!(world.writes() - before, 1);
    assert_eq!(first.status, BossStatus::Locked);

    for mission in &missions[..8] {
        world.complete_mission(1, mission);
    }

    let before = world.writes();
    let unlocked = world.engine.bosses().check_unlock(&student, level.id).unwrap();
    assert_eq!(world.writes() - before, 1);
    assert_eq!(unlocked.attempt_id, first.attempt_id);
    assert!(unlocked.just_unlocked);

    // Monotone: further checks neither revert nor rewrite
    let before = world.writes();
    let again = world.engine.bosses().check_unlock(&student, level.id).unwrap();
    assert_eq!(world.writes(), before);
    assert_eq!(again.status, BossStatus::Unlocked);
    assert!(!again.just_unlocked);
}

#[test]
fn test_five_of_ten_stays_locked_without_writes() {
    let world = TestWorld::new();
    let level = world.seed_levels(&[(1, 0)]).remove(0);
    let missions = world.add_missions(&level, 10, 10);
    world.add_boss(&level, 100);
    world.character(1);
    let student = CallerContext::student(1);

    world.engine.bosses().check_unlock(&student, level.id).unwrap();
    for mission in &missions[..5] {
        world.complete_mission(1, mission);
    }

    world.notifier.clear();
    let before = world.writes();
    let progress = world.engine.bosses().check_unlock(&student, level.id).unwrap();

    assert_eq!(world.writes(), before);
    assert_eq!(progress.completion_percentage, 50.0);
    assert_eq!(progress.status, BossStatus::Locked);
    assert!(!progress.unlocked);
    assert!(world.notifier.kinds().is_empty());
}

#[test]
fn test_completion_requires_missions_and_known_level() {
    let world = TestWorld::new();
    let level = world.seed_levels(&[(1, 0)]).remove(0);
    let calculator = world.engine.calculator();

    let err = calculator.level_completion_percentage(level.id, 1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RuleViolation);

    let err = calculator.level_completion_percentage(999, 1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_xp_jump_recomputes_level_from_table() {
    let world = TestWorld::new();
    world.seed_levels(&[(1, 0), (2, 20), (3, 50), (4, 80)]);
    let character = world.character(7);
    assert_eq!(character.level, 1);

    let award = world.engine.xp().add_xp(character.id, Some(50)).unwrap();
    assert_eq!(award.character.level, 3);

    world.notifier.clear();
    let award = world.engine.xp().add_xp(character.id, Some(30)).unwrap();
    assert_eq!(award.character.xp, 80);
    assert_eq!(award.character.level, 4);
    let up = award.level_up.unwrap();
    assert_eq!((up.old_level, up.new_level), (3, 4));

    let sent = world.notifier.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, NotificationKind::LevelUp);
    assert_eq!(sent[0].user_id, 7);
    assert!(sent[0].message.contains("Level 4"));
}

#[test]
fn test_xp_below_next_threshold_keeps_level_and_stays_quiet() {
    let world = TestWorld::new();
    world.seed_levels(&[(1, 0), (2, 100)]);
    let character = world.character(3);

    let award = world.engine.xp().add_xp(character.id, Some(99)).unwrap();
    assert_eq!(award.character.level, 1);
    assert!(award.level_up.is_none());
    assert!(world.notifier.kinds().is_empty());
}

#[test]
fn test_add_xp_rejects_non_positive_amounts() {
    let world = TestWorld::new();
    world.seed_levels(&[(1, 0)]);
    let character = world.character(1);
    let ledger = world.engine.xp();

    for amount in [None, Some(0), Some(-5)] {
        let err = ledger.add_xp(character.id, amount).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RuleViolation);
        assert_eq!(err.to_string(), "XP to add must be a positive number");
    }

    // Amount is validated before the character is looked up
    let err = ledger.add_xp(12345, Some(0)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RuleViolation);

    let err = ledger.add_xp(12345, Some(10)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_add_xp_strictly_increases() {
    let world = TestWorld::new();
    world.seed_levels(&[(1, 0), (2, 15), (3, 40)]);
    let character = world.character(1);

    let mut last = 0;
    for amount in [1, 7, 13, 2, 40] {
        let award = world.engine.xp().add_xp(character.id, Some(amount)).unwrap();
        assert_eq!(award.character.xp, last + amount);
        last = award.character.xp;

        let expected = if last >= 40 {
            3
        } else if last >= 15 {
            2
        } else {
            1
        };
        assert_eq!(award.character.level, expected);
    }
}

#[test]
fn test_xp_progress_to_next_level() {
    let world = TestWorld::new();
    world.seed_levels(&[(1, 0), (2, 100), (3, 200)]);
    let calculator = world.engine.calculator();

    assert_eq!(calculator.xp_progress_to_next_level(150, 2).unwrap(), 50.0);
    assert_eq!(calculator.xp_progress_to_next_level(90, 2).unwrap(), 0.0);
    assert_eq!(calculator.xp_progress_to_next_level(200, 3).unwrap(), 100.0);
    assert_eq!(
        calculator.xp_progress_to_next_level(10, 9).unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn test_mission_rejection_then_resubmission() {
    let world = TestWorld::new();
    let level = world.seed_levels(&[(1, 0)]).remove(0);
    let mission = world.add_missions(&level, 1, 25).remove(0);
    let character = world.character(4);
    let student = CallerContext::student(4);
    let missions = world.engine.missions();

    missions.start(&student, mission.id).unwrap();
    let attempt = missions
        .submit(&student, mission.id, "https://github.com/four/first", Some("v1".into()))
        .unwrap();

    let rejected = missions
        .evaluate(&mentor(), attempt.id, false, Some("Add tests".into()))
        .unwrap();
    assert_eq!(rejected.attempt.status(), MissionStatus::Failed);
    assert!(rejected.xp.is_none());
    assert_eq!(rejected.attempt.record.feedback.as_deref(), Some("Add tests"));

    let resubmitted = missions
        .submit(&student, mission.id, "https://github.com/four/second", None)
        .unwrap();
    assert_eq!(resubmitted.status(), MissionStatus::AwaitingEvaluation);
    assert_eq!(resubmitted.id, attempt.id);

    let approved = missions.evaluate(&mentor(), attempt.id, true, None).unwrap();
    assert_eq!(approved.attempt.status(), MissionStatus::Completed);
    assert_eq!(approved.attempt.record.evaluator_id, Some(common::MENTOR_ID));
    assert_eq!(approved.xp.unwrap().character.xp, 25);

    let stored = world.engine.store().character(character.id);
    assert_eq!(stored.unwrap().unwrap().xp, 25);

    assert_eq!(
        world.notifier.kinds(),
        vec![NotificationKind::MissionEvaluated, NotificationKind::MissionEvaluated]
    );
}

#[test]
fn test_second_evaluation_fails() {
    let world = TestWorld::new();
    let level = world.seed_levels(&[(1, 0)]).remove(0);
    let mission = world.add_missions(&level, 1, 10).remove(0);
    world.character(5);
    let student = CallerContext::student(5);
    let missions = world.engine.missions();

    let attempt = missions.start(&student, mission.id).unwrap();
    let err = missions.evaluate(&mentor(), attempt.id, true, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RuleViolation);

    missions
        .submit(&student, mission.id, "https://github.com/five/work", None)
        .unwrap();
    missions.evaluate(&mentor(), attempt.id, true, None).unwrap();

    let err = missions.evaluate(&mentor(), attempt.id, true, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RuleViolation);
    let err = missions.evaluate(&mentor(), attempt.id, false, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RuleViolation);

    // XP was credited exactly once
    let character = world.engine.store().character_for_user(5).unwrap().unwrap();
    assert_eq!(character.xp, 10);
}

#[test]
fn test_identity_and_submission_checks() {
    let world = TestWorld::new();
    let level = world.seed_levels(&[(1, 0)]).remove(0);
    let mission = world.add_missions(&level, 1, 10).remove(0);
    world.character(6);
    let student = CallerContext::student(6);
    let missions = world.engine.missions();

    let err = missions.start(&CallerContext::anonymous(), mission.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);

    // Never started
    let err = missions
        .submit(&student, mission.id, "https://github.com/six/work", None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RuleViolation);

    let attempt = missions.start(&student, mission.id).unwrap();
    let err = missions.start(&student, mission.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RuleViolation);

    let err = missions
        .submit(&student, mission.id, "https://example.com/six/work", None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RuleViolation);

    missions
        .submit(&student, mission.id, "https://github.com/six/work", None)
        .unwrap();
    let err = missions.evaluate(&student, attempt.id, true, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let err = missions.start(&student, 4242).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_failed_notifications_do_not_roll_back() {
    let world = TestWorld::with_emitter(Arc::new(FailingNotifier));
    world.seed_levels(&[(1, 0), (2, 10)]);
    let character = world.character(8);

    let award = world.engine.xp().add_xp(character.id, Some(10)).unwrap();
    assert!(award.level_up.is_some());

    let stored = world.engine.store().character(character.id).unwrap().unwrap();
    assert_eq!(stored.xp, 10);
    assert_eq!(stored.level, 2);
}

#[test]
fn test_overview_reports_levels_and_bosses() {
    let world = TestWorld::new();
    let levels = world.seed_levels(&[(1, 0), (2, 100)]);
    let missions = world.add_missions(&levels[0], 4, 10);
    world.add_boss(&levels[0], 100);
    world.character(9);

    world.complete_mission(9, &missions[0]);
    let overview = world.engine.overview(&CallerContext::student(9)).unwrap();

    assert_eq!(overview.character.xp, 10);
    assert_eq!(overview.level_name.as_deref(), Some("Level 1"));
    assert_eq!(overview.progress_to_next_level, 10.0);
    assert!(overview.badges.is_empty());

    let first = &overview.levels[0];
    assert_eq!((first.completed_missions, first.total_missions), (1, 4));
    assert_eq!(first.completion_percentage, Some(25.0));
    assert_eq!(first.boss.as_ref().unwrap().status, BossStatus::Locked);

    let second = &overview.levels[1];
    assert_eq!(second.completion_percentage, None);
    assert!(second.boss.is_none());

    let err = world.engine.overview(&CallerContext::student(404)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_concurrent_submit_and_evaluate_credit_xp_once() {
    let world = TestWorld::new();
    let level = world.seed_levels(&[(1, 0)]).remove(0);
    let mission = world.add_missions(&level, 1, 30).remove(0);
    let character = world.character(17);
    let student = CallerContext::student(17);

    world.engine.missions().start(&student, mission.id).unwrap();
    let attempt = world
        .engine
        .missions()
        .submit(&student, mission.id, "https://github.com/seventeen/work", None)
        .unwrap();

    let (approvals, submissions) = thread::scope(|s| {
        let evaluators: Vec<_> = (0..6)
            .map(|_| {
                s.spawn(|| {
                    world
                        .engine
                        .missions()
                        .evaluate(&mentor(), attempt.id, true, None)
                })
            })
            .collect();
        let submitters: Vec<_> = (0..6)
            .map(|_| {
                s.spawn(|| {
                    world.engine.missions().submit(
                        &student,
                        mission.id,
                        "https://github.com/seventeen/again",
                        None,
                    )
                })
            })
            .collect();

        let approvals: Vec<_> = evaluators.into_iter().map(|h| h.join().unwrap()).collect();
        let submissions: Vec<_> = submitters.into_iter().map(|h| h.join().unwrap()).collect();
        (approvals, submissions)
    });

    assert_eq!(approvals.iter().filter(|r| r.is_ok()).count(), 1);
    for err in approvals.iter().filter_map(|r| r.as_ref().err()) {
        assert_eq!(err.kind(), ErrorKind::RuleViolation);
    }
    // AWAITING_EVALUATION and COMPLETED both refuse a resubmission
    for result in &submissions {
        assert_eq!(result.as_ref().unwrap_err().kind(), ErrorKind::RuleViolation);
    }

    let stored = world.engine.store().mission_attempt(attempt.id).unwrap().unwrap();
    assert_eq!(stored.status(), MissionStatus::Completed);
    assert_eq!(
        stored.record.submission_url.as_deref(),
        Some("https://github.com/seventeen/work")
    );

    let character = world.engine.store().character(character.id).unwrap().unwrap();
    assert_eq!(character.xp, 30);
}
