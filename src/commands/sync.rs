//! Application command registration
//!
//! Pushes local declarations to Discord only when they differ from what is
//! already registered.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.2.0
//!
//! ## Changelog
//! - 2.0.0: Diff against remote commands before pushing
//! - 1.0.0: Unconditional global and guild registration

use anyhow::Result;
use log::{debug, info};
use serenity::http::Http;
use serenity::model::application::command::Command;
use serenity::model::id::GuildId;

use super::definition::{CommandKind, CommandSpec};
use super::registry::CommandManager;

/// Where application commands are registered
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterOptions {
    pub guilds: Vec<GuildId>,
    /// Register globally and clear the listed guilds instead
    pub global: bool,
}

impl RegisterOptions {
    pub fn global() -> Self {
        Self {
            guilds: Vec::new(),
            global: true,
        }
    }

    pub fn guilds(guilds: impl IntoIterator<Item = GuildId>) -> Self {
        Self {
            guilds: guilds.into_iter().collect(),
            global: false,
        }
    }
}

/// True when any kind differs in count or any remote command differs from
/// the local command of the same name
pub fn needs_update(local: &[CommandSpec], remote: &[CommandSpec]) -> bool {
    [CommandKind::ChatInput, CommandKind::User, CommandKind::Message]
        .into_iter()
        .any(|kind| {
            let local: Vec<&CommandSpec> = local.iter().filter(|c| c.kind == kind).collect();
            let remote: Vec<&CommandSpec> = remote.iter().filter(|c| c.kind == kind).collect();

            local.len() != remote.len()
                || remote.iter().any(|theirs| {
                    local
                        .iter()
                        .find(|ours| ours.name == theirs.name)
                        .map_or(true, |ours| ours != theirs)
                })
        })
}

fn to_specs(commands: &[Command]) -> Vec<CommandSpec> {
    commands.iter().filter_map(CommandSpec::from_remote).collect()
}

async fn push_global(http: &Http, specs: &[CommandSpec]) -> Result<()> {
    Command::set_global_application_commands(http, |commands| {
        for spec in specs {
            commands.add_application_command(spec.to_builder());
        }
        commands
    })
    .await?;
    Ok(())
}

async fn push_guild(http: &Http, guild_id: GuildId, specs: &[CommandSpec]) -> Result<()> {
    guild_id
        .set_application_commands(http, |commands| {
            for spec in specs {
                commands.add_application_command(spec.to_builder());
            }
            commands
        })
        .await?;
    Ok(())
}

/// Sync the manager's application commands with Discord
///
/// Invalid declarations abort before anything is pushed.
pub async fn register(http: &Http, manager: &CommandManager, options: &RegisterOptions) -> Result<()> {
    let local = manager.application_commands();
    for spec in &local {
        spec.validate()?;
    }

    if options.global {
        let remote = to_specs(&Command::get_global_application_commands(http).await?);
        if needs_update(&local, &remote) {
            push_global(http, &local).await?;
            info!("✅ Global application commands updated ({} commands)", local.len());
        } else {
            debug!("Global application commands already up to date");
        }

        for guild_id in &options.guilds {
            let remote = guild_id.get_application_commands(http).await?;
            if !remote.is_empty() {
                push_guild(http, *guild_id, &[]).await?;
                info!("🧹 Cleared guild commands in {guild_id}");
            }
        }
        return Ok(());
    }

    for guild_id in &options.guilds {
        let remote = to_specs(&guild_id.get_application_commands(http).await?);
        if needs_update(&local, &remote) {
            push_guild(http, *guild_id, &local).await?;
            info!("✅ Guild application commands updated for {guild_id} ({} commands)", local.len());
        } else {
            debug!("Guild application commands for {guild_id} already up to date");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::definition::{OptionDefinition, OptionKind};

    fn local() -> Vec<CommandSpec> {
        vec![
            CommandSpec::slash("ping", "Pong"),
            CommandSpec::slash("tag", "Manage tags")
                .option(OptionDefinition::subcommand("add", "Add a tag")),
            CommandSpec::user("User Info"),
        ]
    }

    #[test]
    fn test_identical_sets_need_no_update() {
        assert!(!needs_update(&local(), &local()));

        let mut reordered = local();
        reordered.reverse();
        assert!(!needs_update(&local(), &reordered));
    }

    #[test]
    fn test_count_difference_needs_update() {
        let mut remote = local();
        remote.pop();
        assert!(needs_update(&local(), &remote));

        let mut remote = local();
        remote.push(CommandSpec::message("Quote"));
        assert!(needs_update(&local(), &remote));
    }

    #[test]
    fn test_changed_command_needs_update() {
        let mut remote = local();
        remote[0].description = "Old description".to_string();
        assert!(needs_update(&local(), &remote));

        let mut remote = local();
        remote[1].options[0]
            .options
            .push(OptionDefinition::new(OptionKind::String, "name", "Tag name"));
        assert!(needs_update(&local(), &remote));
    }

    #[test]
    fn test_renamed_command_needs_update() {
        let mut remote = local();
        remote[2].name = "Profile".to_string();
        assert!(needs_update(&local(), &remote));
    }

    #[test]
    fn test_same_name_different_kind_is_compared_per_kind() {
        let local = vec![CommandSpec::user("Info")];
        let remote = vec![CommandSpec::message("Info")];
        assert!(needs_update(&local, &remote));
    }

    #[test]
    fn test_register_options_constructors() {
        assert!(RegisterOptions::global().global);
        let options = RegisterOptions::guilds([GuildId(1), GuildId(2)]);
        assert!(!options.global);
        assert_eq!(options.guilds.len(), 2);
    }
}
