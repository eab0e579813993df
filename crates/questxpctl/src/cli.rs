//! CLI - Command-line argument parsing
//!
//! Keeps argument parsing separate from execution logic.

use chrono::NaiveDate;
use clap::{ArgGroup, Parser, Subcommand};
use questxp_common::QuestPriority;
use std::path::PathBuf;

/// Questxp control CLI
#[derive(Parser, Debug)]
#[command(name = "questxpctl")]
#[command(about = "Quest XP - levels, ranks and daily XP pools", long_about = None)]
#[command(version)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// State file (overrides $QUESTXP_STATE and the default location)
    #[arg(long, global = true)]
    pub state: Option<PathBuf>,

    /// Config file (overrides user and system config)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the level curve: daily cap, cumulative XP and rank per level
    Curve {
        #[arg(long, default_value_t = 1)]
        from: u32,

        #[arg(long, default_value_t = 20)]
        to: u32,
    },

    /// Show level progress for an XP total
    Level {
        /// Total XP (negative or fractional values are sanitised)
        #[arg(long, allow_negative_numbers = true)]
        xp: f64,
    },

    /// Show the rank tier for a level
    Rank {
        #[arg(long)]
        level: u32,
    },

    /// Manage users
    User {
        #[command(subcommand)]
        action: UserCommands,
    },

    /// Manage quests
    Quest {
        #[command(subcommand)]
        action: QuestCommands,
    },

    /// Show today's XP pool for a user
    Status {
        #[arg(long)]
        user: String,
    },

    /// Show potential XP for a user's open quests today
    Preview {
        #[arg(long)]
        user: String,
    },

    /// Complete a quest and collect its XP
    Complete {
        #[arg(long)]
        user: String,

        #[arg(long)]
        quest: String,
    },

    /// Show recent awards
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Show or update configuration
    Config {
        /// Set a configuration value (key=value)
        #[arg(long)]
        set: Option<String>,
    },
}

/// User subcommands
#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// Register a user
    Add {
        id: String,

        /// Starting XP
        #[arg(long, default_value_t = 0)]
        xp: u64,

        /// Timezone offset from UTC in minutes
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        utc_offset: i32,
    },

    /// Show a user's level, rank and pool
    Show { id: String },
}

/// Quest subcommands
#[derive(Subcommand, Debug)]
pub enum QuestCommands {
    /// Schedule a quest
    #[command(group(ArgGroup::new("weight").required(true).args(["priority", "points"])))]
    Add {
        #[arg(long)]
        user: String,

        #[arg(long)]
        id: String,

        /// Priority name or tag 1-5 (optional, minor, standard, important, critical)
        #[arg(long)]
        priority: Option<QuestPriority>,

        /// Explicit weight
        #[arg(long, allow_negative_numbers = true)]
        points: Option<i64>,

        /// Local date (YYYY-MM-DD); defaults to the user's today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}
