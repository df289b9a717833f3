//! Mission, boss, XP and overview commands

use anyhow::Result;

use questline::domain::{BossAttempt, MissionAttempt};
use questline::progression::XpAward;

use super::CliContext;

fn print_xp(award: &XpAward) {
    println!(
        "  +{} XP -> {} XP total (level {})",
        award.amount, award.character.xp, award.character.level
    );
    if let Some(up) = &award.level_up {
        println!("  Level up! {} -> {} ({})", up.old_level, up.new_level, up.level_name);
    }
}

fn print_mission_attempt(attempt: &MissionAttempt) {
    println!(
        "Mission attempt #{} for mission #{}: {}",
        attempt.id,
        attempt.mission_id,
        attempt.status()
    );
}

fn print_boss_attempt(attempt: &BossAttempt) {
    println!(
        "Boss attempt #{} for boss #{}: {}",
        attempt.id,
        attempt.boss_id,
        attempt.status()
    );
}

pub fn xp_add_command(ctx: &CliContext, character_id: i64, amount: i64) -> Result<()> {
    let award = ctx
        .engine
        .xp()
        .add_xp(character_id, Some(amount))
        .map_err(|e| ctx.engine_error(e))?;
    ctx.print(&award, print_xp)
}

pub fn mission_start_command(ctx: &CliContext, mission_id: i64) -> Result<()> {
    let attempt = ctx
        .engine
        .missions()
        .start(&ctx.caller, mission_id)
        .map_err(|e| ctx.engine_error(e))?;
    ctx.print(&attempt, print_mission_attempt)
}

pub fn mission_submit_command(
    ctx: &CliContext,
    mission_id: i64,
    url: &str,
    notes: Option<String>,
) -> Result<()> {
    let attempt = ctx
        .engine
        .missions()
        .submit(&ctx.caller, mission_id, url, notes)
        .map_err(|e| ctx.engine_error(e))?;
    ctx.print(&attempt, print_mission_attempt)
}

pub fn mission_evaluate_command(
    ctx: &CliContext,
    attempt_id: i64,
    approved: bool,
    feedback: Option<String>,
) -> Result<()> {
    let evaluation = ctx
        .engine
        .missions()
        .evaluate(&ctx.caller, attempt_id, approved, feedback)
        .map_err(|e| ctx.engine_error(e))?;

    ctx.print(&evaluation, |ev| {
        print_mission_attempt(&ev.attempt);
        if let Some(award) = &ev.xp {
            print_xp(award);
        }
    })
}

pub fn boss_check_command(ctx: &CliContext, level_id: i64) -> Result<()> {
    let progress = ctx
        .engine
        .bosses()
        .check_unlock(&ctx.caller, level_id)
        .map_err(|e| ctx.engine_error(e))?;

    ctx.print(&progress, |p| {
        println!(
            "{}: {:.1}% of missions completed (unlocks at {:.0}%)",
            p.boss_name, p.completion_percentage, p.unlock_threshold_percent
        );
        if p.just_unlocked {
            println!("  Boss unlocked! Start it with `questline boss start {}`", p.boss_id);
        } else {
            println!("  Status: {}", p.status);
        }
    })
}

pub fn boss_start_command(ctx: &CliContext, boss_id: i64) -> Result<()> {
    let attempt = ctx
        .engine
        .bosses()
        .start(&ctx.caller, boss_id)
        .map_err(|e| ctx.engine_error(e))?;
    ctx.print(&attempt, print_boss_attempt)
}

pub fn boss_submit_command(
    ctx: &CliContext,
    boss_id: i64,
    url: &str,
    notes: Option<String>,
) -> Result<()> {
    let attempt = ctx
        .engine
        .bosses()
        .submit(&ctx.caller, boss_id, url, notes)
        .map_err(|e| ctx.engine_error(e))?;
    ctx.print(&attempt, print_boss_attempt)
}

pub fn boss_evaluate_command(
    ctx: &CliContext,
    attempt_id: i64,
    approved: bool,
    feedback: Option<String>,
) -> Result<()> {
    let evaluation = ctx
        .engine
        .bosses()
        .evaluate(&ctx.caller, attempt_id, approved, feedback)
        .map_err(|e| ctx.engine_error(e))?;

    ctx.print(&evaluation, |ev| {
        print_boss_attempt(&ev.attempt);
        if let Some(award) = &ev.xp {
            print_xp(award);
        }
        if let Some(badge) = &ev.badge {
            println!("  Badge earned: {}", badge.badge.name);
        }
        if let Some(level) = &ev.grimoire {
            println!("  Grimoire unlocked for level {} ({})", level.order, level.name);
        }
    })
}

pub fn overview_command(ctx: &CliContext) -> Result<()> {
    let overview = ctx
        .engine
        .overview(&ctx.caller)
        .map_err(|e| ctx.engine_error(e))?;

    ctx.print(&overview, |o| {
        println!(
            "{} - level {}{} - {} XP ({:.0}% to next level)",
            o.character.name,
            o.character.level,
            o.level_name
                .as_deref()
                .map(|n| format!(" ({n})"))
                .unwrap_or_default(),
            o.character.xp,
            o.progress_to_next_level
        );

        for level in &o.levels {
            let completion = level
                .completion_percentage
                .map(|p| format!("{p:.0}%"))
                .unwrap_or_else(|| "-".to_string());
            print!(
                "  L{} {}: {}/{} missions ({})",
                level.order, level.name, level.completed_missions, level.total_missions, completion
            );
            match &level.boss {
                Some(boss) => println!(", boss {} [{}]", boss.name, boss.status),
                None => println!(),
            }
        }

        if !o.badges.is_empty() {
            let names: Vec<&str> = o.badges.iter().map(|b| b.badge.name.as_str()).collect();
            println!("  Badges: {}", names.join(", "));
        }
    })
}
