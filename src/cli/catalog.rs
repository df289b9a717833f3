//! Level, mission, boss and character administration commands

use anyhow::{Result, anyhow};

use questline::domain::{BadgeInfo, Difficulty, NewBoss, NewLevel, NewMission};

use super::CliContext;

pub fn level_list_command(ctx: &CliContext) -> Result<()> {
    let table = ctx
        .engine
        .catalog()
        .levels()
        .map_err(|e| ctx.engine_error(e))?;

    ctx.print(&table.levels(), |levels| {
        if levels.is_empty() {
            println!("No levels. Run `questline init` to seed the default path.");
            return;
        }
        for level in levels.iter() {
            println!(
                "  #{} L{} {} [{}] from {} XP",
                level.id, level.order, level.name, level.difficulty.as_str(), level.xp_threshold
            );
            if let Some(desc) = &level.description {
                println!("    {}", desc);
            }
        }
    })
}

pub fn level_create_command(
    ctx: &CliContext,
    order: u32,
    xp_threshold: i64,
    name: &str,
    difficulty: &str,
    description: Option<String>,
) -> Result<()> {
    let difficulty = Difficulty::from_str(difficulty)
        .ok_or_else(|| anyhow!("Unknown difficulty: {}", difficulty))?;
    let mut level = NewLevel::new(order, xp_threshold, name).with_difficulty(difficulty);
    level.description = description;

    let created = ctx
        .engine
        .catalog()
        .create_level(&level)
        .map_err(|e| ctx.engine_error(e))?;
    ctx.print(&created, |l| println!("Created level #{} (order {})", l.id, l.order))
}

pub fn level_missions_command(ctx: &CliContext, level_id: i64) -> Result<()> {
    let missions = ctx
        .engine
        .catalog()
        .missions_for_level(level_id)
        .map_err(|e| ctx.engine_error(e))?;

    ctx.print(&missions, |missions| {
        if missions.is_empty() {
            println!("No missions found.");
            return;
        }
        for mission in missions {
            println!(
                "  #{} {} (+{} XP)",
                mission.id, mission.title, mission.xp_reward
            );
        }
    })
}

pub fn mission_create_command(
    ctx: &CliContext,
    level_id: i64,
    title: &str,
    xp_reward: i64,
    order_number: u32,
    description: Option<String>,
) -> Result<()> {
    let mut mission = NewMission::new(level_id, title, xp_reward, order_number);
    mission.description = description;

    let created = ctx
        .engine
        .catalog()
        .create_mission(&mission)
        .map_err(|e| ctx.engine_error(e))?;
    ctx.print(&created, |m| println!("Created mission #{} in level #{}", m.id, m.level_id))
}

#[derive(Debug, Clone)]
pub struct BossCreateArgs {
    pub level_id: i64,
    pub name: String,
    pub xp: i64,
    pub badge: String,
    pub badge_description: Option<String>,
    pub badge_icon: Option<String>,
    pub description: Option<String>,
    pub unlocks_next_level: bool,
}

pub fn boss_create_command(ctx: &CliContext, args: BossCreateArgs) -> Result<()> {
    let badge = BadgeInfo {
        name: args.badge,
        description: args.badge_description,
        icon: args.badge_icon,
    };
    let mut boss = NewBoss::new(args.level_id, args.name, args.xp, badge)
        .unlocks_next_level(args.unlocks_next_level);
    boss.description = args.description;

    let created = ctx
        .engine
        .catalog()
        .create_boss(&boss)
        .map_err(|e| ctx.engine_error(e))?;
    ctx.print(&created, |b| {
        println!("Created boss #{} '{}' for level #{}", b.id, b.name, b.level_id)
    })
}

pub fn character_create_command(ctx: &CliContext, name: &str) -> Result<()> {
    let user_id = ctx
        .caller
        .require_user()
        .map_err(|e| ctx.engine_error(e))?;

    let created = ctx
        .engine
        .catalog()
        .create_character(user_id, name)
        .map_err(|e| ctx.engine_error(e))?;
    ctx.print(&created, |c| {
        println!("Created character #{} '{}' at level {}", c.id, c.name, c.level)
    })
}
