use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "questline")]
#[command(about = "Questline - missions, bosses, XP and badges for learning paths")]
#[command(version)]
struct Cli {
    /// Path to the config file (defaults to ~/.questline/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Acting user id
    #[arg(short, long, global = true)]
    user: Option<i64>,

    /// Acting user's role: student, mentor or admin
    #[arg(long, global = true, default_value = "student")]
    role: String,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Verdict {
    Approve,
    Reject,
}

impl Verdict {
    fn approved(self) -> bool {
        matches!(self, Verdict::Approve)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default config and seed the level table
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Inspect and edit levels
    Level {
        #[command(subcommand)]
        command: LevelCommands,
    },

    /// Create characters
    Character {
        #[command(subcommand)]
        command: CharacterCommands,
    },

    /// Grant XP directly
    Xp {
        #[command(subcommand)]
        command: XpCommands,
    },

    /// Mission definitions and attempts
    Mission {
        #[command(subcommand)]
        command: MissionCommands,
    },

    /// Boss definitions and attempts
    Boss {
        #[command(subcommand)]
        command: BossCommands,
    },

    /// XP leaderboard
    Ranking {
        #[command(subcommand)]
        command: RankingCommands,
    },

    /// Show the acting user's progress
    Overview,

    /// The acting user's notifications
    Notifications {
        #[command(subcommand)]
        command: NotificationCommands,
    },
}

#[derive(Subcommand)]
enum LevelCommands {
    /// List all levels
    List,
    /// Add a level
    Create {
        #[arg(long)]
        order: u32,
        #[arg(long)]
        xp_threshold: i64,
        #[arg(long)]
        name: String,
        /// beginner, intermediate, advanced or expert
        #[arg(long, default_value = "beginner")]
        difficulty: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// List the missions of a level
    Missions { level_id: i64 },
}

#[derive(Subcommand)]
enum CharacterCommands {
    /// Create the acting user's character
    Create { name: String },
}

#[derive(Subcommand)]
enum XpCommands {
    /// Add XP to a character
    Add { character_id: i64, amount: i64 },
}

#[derive(Subcommand)]
enum MissionCommands {
    /// Add a mission to a level
    Create {
        #[arg(long)]
        level: i64,
        #[arg(long)]
        title: String,
        #[arg(long)]
        xp: i64,
        #[arg(long, default_value_t = 0)]
        order: u32,
        #[arg(long)]
        description: Option<String>,
    },
    /// Start a mission
    Start { mission_id: i64 },
    /// Submit a GitHub repository for review
    Submit {
        mission_id: i64,
        url: String,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Approve or reject a submitted attempt (mentor/admin)
    Evaluate {
        attempt_id: i64,
        #[arg(value_enum)]
        verdict: Verdict,
        #[arg(long)]
        feedback: Option<String>,
    },
}

#[derive(Subcommand)]
enum BossCommands {
    /// Add the boss of a level
    Create {
        #[arg(long)]
        level: i64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        xp: i64,
        #[arg(long)]
        badge: String,
        #[arg(long)]
        badge_description: Option<String>,
        #[arg(long)]
        badge_icon: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Do not unlock the next level's grimoire on defeat
        #[arg(long)]
        no_grimoire: bool,
    },
    /// Check mission progress and unlock the level's boss
    Check { level_id: i64 },
    /// Start an unlocked boss fight
    Start { boss_id: i64 },
    /// Submit a GitHub repository for review
    Submit {
        boss_id: i64,
        url: String,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Approve or reject a submitted attempt (mentor/admin)
    Evaluate {
        attempt_id: i64,
        #[arg(value_enum)]
        verdict: Verdict,
        #[arg(long)]
        feedback: Option<String>,
    },
}

#[derive(Subcommand)]
enum RankingCommands {
    /// Show the leaderboard
    Show {
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Only characters at or above this level id
        #[arg(long)]
        level: Option<i64>,
    },
    /// Show the acting user's position
    Position,
}

#[derive(Subcommand)]
enum NotificationCommands {
    /// List notifications, newest first
    List {
        #[arg(long)]
        unread: bool,
    },
    /// Mark a notification as read
    Read { notification_id: i64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Init { force } = cli.command {
        return cli::init::init_command(cli.config.as_deref(), force);
    }

    let ctx = cli::CliContext::open(cli.config.as_deref(), cli.user, &cli.role, cli.json)?;
    let sweeper = ctx.notifier.spawn_sweeper(ctx.config.sweep_interval());

    let outcome = match cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Level { command } => match command {
            LevelCommands::List => cli::catalog::level_list_command(&ctx),
            LevelCommands::Create {
                order,
                xp_threshold,
                name,
                difficulty,
                description,
            } => cli::catalog::level_create_command(
                &ctx,
                order,
                xp_threshold,
                &name,
                &difficulty,
                description,
            ),
            LevelCommands::Missions { level_id } => {
                cli::catalog::level_missions_command(&ctx, level_id)
            }
        },
        Commands::Character { command } => match command {
            CharacterCommands::Create { name } => {
                cli::catalog::character_create_command(&ctx, &name)
            }
        },
        Commands::Xp { command } => match command {
            XpCommands::Add {
                character_id,
                amount,
            } => cli::progress::xp_add_command(&ctx, character_id, amount),
        },
        Commands::Mission { command } => match command {
            MissionCommands::Create {
                level,
                title,
                xp,
                order,
                description,
            } => cli::catalog::mission_create_command(&ctx, level, &title, xp, order, description),
            MissionCommands::Start { mission_id } => {
                cli::progress::mission_start_command(&ctx, mission_id)
            }
            MissionCommands::Submit {
                mission_id,
                url,
                notes,
            } => cli::progress::mission_submit_command(&ctx, mission_id, &url, notes),
            MissionCommands::Evaluate {
                attempt_id,
                verdict,
                feedback,
            } => cli::progress::mission_evaluate_command(
                &ctx,
                attempt_id,
                verdict.approved(),
                feedback,
            ),
        },
        Commands::Boss { command } => match command {
            BossCommands::Create {
                level,
                name,
                xp,
                badge,
                badge_description,
                badge_icon,
                description,
                no_grimoire,
            } => cli::catalog::boss_create_command(
                &ctx,
                cli::catalog::BossCreateArgs {
                    level_id: level,
                    name,
                    xp,
                    badge,
                    badge_description,
                    badge_icon,
                    description,
                    unlocks_next_level: !no_grimoire,
                },
            ),
            BossCommands::Check { level_id } => cli::progress::boss_check_command(&ctx, level_id),
            BossCommands::Start { boss_id } => cli::progress::boss_start_command(&ctx, boss_id),
            BossCommands::Submit {
                boss_id,
                url,
                notes,
            } => cli::progress::boss_submit_command(&ctx, boss_id, &url, notes),
            BossCommands::Evaluate {
                attempt_id,
                verdict,
                feedback,
            } => cli::progress::boss_evaluate_command(
                &ctx,
                attempt_id,
                verdict.approved(),
                feedback,
            ),
        },
        Commands::Ranking { command } => match command {
            RankingCommands::Show { limit, level } => {
                cli::ranking::ranking_show_command(&ctx, limit, level)
            }
            RankingCommands::Position => cli::ranking::ranking_position_command(&ctx),
        },
        Commands::Overview => cli::progress::overview_command(&ctx),
        Commands::Notifications { command } => match command {
            NotificationCommands::List { unread } => {
                cli::notifications::notification_list_command(&ctx, unread)
            }
            NotificationCommands::Read { notification_id } => {
                cli::notifications::notification_read_command(&ctx, notification_id)
            }
        },
    };

    sweeper.abort();
    ctx.flush_notifications();
    outcome
}
