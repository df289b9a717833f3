//! Leaderboard commands

use anyhow::Result;

use questline::progression::RankingEntry;

use super::CliContext;

fn print_entries(entries: &[RankingEntry]) {
    if entries.is_empty() {
        println!("No characters ranked yet.");
        return;
    }
    for entry in entries {
        println!(
            "  {:>3}. {} (user {}) - level {}, {} XP",
            entry.position, entry.character_name, entry.user_id, entry.level, entry.xp
        );
    }
}

pub fn ranking_show_command(ctx: &CliContext, limit: usize, level_id: Option<i64>) -> Result<()> {
    let snapshot = ctx.engine.refresh_ranking().map_err(|e| ctx.engine_error(e))?;

    let entries: Vec<RankingEntry> = match level_id {
        Some(level_id) => ctx
            .engine
            .level_ranking(level_id)
            .map_err(|e| ctx.engine_error(e))?
            .into_iter()
            .take(limit)
            .collect(),
        None => snapshot.top(limit).to_vec(),
    };

    ctx.print(&entries, |entries| print_entries(entries))
}

pub fn ranking_position_command(ctx: &CliContext) -> Result<()> {
    let user_id = ctx
        .caller
        .require_user()
        .map_err(|e| ctx.engine_error(e))?;
    ctx.engine.refresh_ranking().map_err(|e| ctx.engine_error(e))?;

    let position = ctx
        .engine
        .ranking()
        .position_of(user_id)
        .map_err(|e| ctx.engine_error(e))?;

    ctx.print(&position, |p| {
        println!(
            "Position {} of {} (ahead of {:.1}% of players)",
            p.position, p.total_players, p.percentile
        )
    })
}
