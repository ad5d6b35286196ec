//! Handler traits for every command kind
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 2.0.0: Subcommand, context menu, modal, prefix and component handlers
//! - 1.0.0: Initial implementation for modular command handling

use anyhow::Result;
use async_trait::async_trait;
use log::error;
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::model::application::interaction::autocomplete::AutocompleteInteraction;
use serenity::model::application::interaction::message_component::MessageComponentInteraction;
use serenity::model::application::interaction::modal::ModalSubmitInteraction;
use serenity::model::channel::Message;
use serenity::prelude::Context;
use std::collections::HashMap;
use std::sync::Arc;

use super::access::{CommandFlags, PermissionRequirements};
use super::context::CommandContext;
use super::definition::{CommandSpec, OptionDefinition};
use super::prefix::{PrefixCommand, PrefixInvocation};
use crate::core::EXECUTION_FAILED;

/// Trait for slash command handlers
///
/// # Example
///
/// ```ignore
/// pub struct PingHandler;
///
/// #[async_trait]
/// impl SlashCommandHandler for PingHandler {
///     fn spec(&self) -> CommandSpec {
///         CommandSpec::slash("ping", "Check that the bot is alive")
///     }
///
///     async fn handle(
///         &self,
///         ctx: Arc<CommandContext>,
///         serenity_ctx: &Context,
///         command: &ApplicationCommandInteraction,
///     ) -> Result<()> {
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait SlashCommandHandler: Send + Sync {
    /// Declaration pushed to Discord; subcommands are added by the manager
    fn spec(&self) -> CommandSpec;

    fn flags(&self) -> CommandFlags {
        CommandFlags::default()
    }

    fn permissions(&self) -> PermissionRequirements {
        PermissionRequirements::default()
    }

    async fn handle(
        &self,
        ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()>;

    /// Answer an autocomplete request for the `focused` option
    async fn autocomplete(
        &self,
        _ctx: Arc<CommandContext>,
        _serenity_ctx: &Context,
        _interaction: &AutocompleteInteraction,
        focused: &str,
    ) -> Result<()> {
        Err(anyhow::anyhow!("No autocomplete handler for option `{focused}`"))
    }
}

/// A subcommand attached to a registered slash command
#[async_trait]
pub trait SubcommandHandler: Send + Sync {
    /// Name of the slash command this belongs to
    fn parent(&self) -> &str;

    /// Sub-command group inside the parent, if any
    fn group(&self) -> Option<&str> {
        None
    }

    fn spec(&self) -> OptionDefinition;

    fn flags(&self) -> CommandFlags {
        CommandFlags::default()
    }

    fn permissions(&self) -> PermissionRequirements {
        PermissionRequirements::default()
    }

    async fn handle(
        &self,
        ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()>;

    async fn autocomplete(
        &self,
        _ctx: Arc<CommandContext>,
        _serenity_ctx: &Context,
        _interaction: &AutocompleteInteraction,
        focused: &str,
    ) -> Result<()> {
        Err(anyhow::anyhow!("No autocomplete handler for option `{focused}`"))
    }
}

/// User or message context-menu command
#[async_trait]
pub trait ContextMenuHandler: Send + Sync {
    /// Must be a `CommandSpec::user` or `CommandSpec::message` declaration
    fn spec(&self) -> CommandSpec;

    fn flags(&self) -> CommandFlags {
        CommandFlags::default()
    }

    fn permissions(&self) -> PermissionRequirements {
        PermissionRequirements::default()
    }

    async fn handle(
        &self,
        ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()>;
}

#[async_trait]
pub trait ModalHandler: Send + Sync {
    fn custom_id(&self) -> &str;

    /// `fields` maps each text input's custom id to its submitted value
    async fn handle(
        &self,
        ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        modal: &ModalSubmitInteraction,
        fields: &HashMap<String, String>,
    ) -> Result<()>;
}

/// Text command triggered by a prefix
///
/// Dispatch runs `before`, then `handle`, then `on_error` if `handle`
/// failed, and finally `after`.
#[async_trait]
pub trait PrefixCommandHandler: Send + Sync {
    fn command(&self) -> PrefixCommand;

    /// Return `false` to skip the command
    async fn before(
        &self,
        _ctx: Arc<CommandContext>,
        _serenity_ctx: &Context,
        _msg: &Message,
        _invocation: &PrefixInvocation,
    ) -> Result<bool> {
        Ok(true)
    }

    async fn handle(
        &self,
        ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        msg: &Message,
        invocation: &PrefixInvocation,
    ) -> Result<()>;

    async fn on_error(
        &self,
        _ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        msg: &Message,
        err: &anyhow::Error,
    ) -> Result<()> {
        error!("Prefix command failed for message {}: {err:#}", msg.id);
        msg.reply(serenity_ctx, EXECUTION_FAILED).await?;
        Ok(())
    }

    async fn after(
        &self,
        _ctx: Arc<CommandContext>,
        _serenity_ctx: &Context,
        _msg: &Message,
        _invocation: &PrefixInvocation,
    ) -> Result<()> {
        Ok(())
    }
}

/// Button or select menu callback
#[async_trait]
pub trait ComponentHandler: Send + Sync {
    async fn handle(
        &self,
        ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        component: &MessageComponentInteraction,
    ) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn _assert_slash_object_safe(_: &dyn SlashCommandHandler) {}
    fn _assert_subcommand_object_safe(_: &dyn SubcommandHandler) {}
    fn _assert_context_menu_object_safe(_: &dyn ContextMenuHandler) {}
    fn _assert_modal_object_safe(_: &dyn ModalHandler) {}
    fn _assert_prefix_object_safe(_: &dyn PrefixCommandHandler) {}
    fn _assert_component_object_safe(_: &dyn ComponentHandler) {}
}
