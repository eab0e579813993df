//! Questxpctl library - exposes modules for testing

pub mod cli;
pub mod commands;
pub mod state;

use anyhow::Result;
use cli::{Cli, Commands, QuestCommands, UserCommands};
use questxp_common::EngineConfig;

/// Run a parsed command line
pub async fn run(cli: Cli) -> Result<()> {
    // Commands that need neither state nor engine
    match &cli.command {
        Commands::Curve { from, to } => return commands::curve(*from, *to),
        Commands::Level { xp } => return commands::level(*xp),
        Commands::Rank { level } => return commands::rank(*level),
        Commands::Config { set } => return commands::config(cli.config.as_deref(), set.clone()),
        _ => {}
    }

    let config = EngineConfig::load(cli.config.as_deref())?;
    let path = state::state_path(cli.state.as_deref())?;
    let session = state::Session::open(path, config)?;

    match cli.command {
        Commands::User { action } => match action {
            UserCommands::Add { id, xp, utc_offset } => {
                commands::user_add(&session, &id, xp, utc_offset)?
            }
            UserCommands::Show { id } => commands::user_show(&session, &id).await?,
        },
        Commands::Quest { action } => match action {
            QuestCommands::Add {
                user,
                id,
                priority,
                points,
                date,
            } => commands::quest_add(&session, &user, &id, priority, points, date).await?,
        },
        Commands::Status { user } => commands::status(&session, &user).await?,
        Commands::Preview { user } => commands::preview(&session, &user).await?,
        Commands::Complete { user, quest } => commands::complete(&session, &user, &quest).await?,
        Commands::History { limit } => commands::history(&session, limit)?,
        Commands::Curve { .. }
        | Commands::Level { .. }
        | Commands::Rank { .. }
        | Commands::Config { .. } => {}
    }

    session.save().await
}
