//! # Modules
//!
//! Bundles of commands, listeners and hooks installed into a framework in
//! one call.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.4.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.0.0: Initial implementation

use log::warn;
use std::sync::Arc;

use crate::commands::access::BoxedCheck;
use crate::commands::{
    CommandManager, ContextMenuHandler, ModalHandler, PrefixCommandHandler, SlashCommandHandler,
    SubcommandHandler,
};
use crate::events::Listener;
use crate::framework::HookKind;

/// A named group of related handlers
///
/// # Example
///
/// ```ignore
/// let tags = Module::new("tags")
///     .slash(Arc::new(TagCommand))
///     .subcommand(Arc::new(TagAdd(store)))
///     .listener(Arc::new(TagCleanup));
///
/// let framework = Framework::new(CommandManager::new(), context).module(tags);
/// ```
#[derive(Default)]
pub struct Module {
    pub name: String,
    pub(crate) slash: Vec<Arc<dyn SlashCommandHandler>>,
    pub(crate) subcommands: Vec<Arc<dyn SubcommandHandler>>,
    pub(crate) context_menus: Vec<Arc<dyn ContextMenuHandler>>,
    pub(crate) modals: Vec<Arc<dyn ModalHandler>>,
    pub(crate) prefix: Vec<Arc<dyn PrefixCommandHandler>>,
    pub(crate) listeners: Vec<Arc<dyn Listener>>,
    pub(crate) hooks: Vec<(HookKind, BoxedCheck)>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn slash(mut self, handler: Arc<dyn SlashCommandHandler>) -> Self {
        self.slash.push(handler);
        self
    }

    pub fn subcommand(mut self, handler: Arc<dyn SubcommandHandler>) -> Self {
        self.subcommands.push(handler);
        self
    }

    pub fn context_menu(mut self, handler: Arc<dyn ContextMenuHandler>) -> Self {
        self.context_menus.push(handler);
        self
    }

    pub fn modal(mut self, handler: Arc<dyn ModalHandler>) -> Self {
        self.modals.push(handler);
        self
    }

    pub fn prefix(mut self, handler: Arc<dyn PrefixCommandHandler>) -> Self {
        self.prefix.push(handler);
        self
    }

    pub fn listener(mut self, listener: Arc<dyn Listener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn hook(mut self, kind: HookKind, check: BoxedCheck) -> Self {
        self.hooks.push((kind, check));
        self
    }

    /// Register the module's commands
    ///
    /// Slash commands go in before subcommands so parents declared in the
    /// same module are found. Returns how many subcommands were not attached.
    pub fn install_commands(&self, manager: &mut CommandManager) -> usize {
        for handler in &self.slash {
            manager.register_slash(Arc::clone(handler));
        }

        let mut detached = 0;
        for handler in &self.subcommands {
            if !manager.register_subcommand(Arc::clone(handler)) {
                detached += 1;
            }
        }
        if detached > 0 {
            warn!("Module '{}' left {detached} subcommands unattached", self.name);
        }

        for handler in &self.context_menus {
            manager.register_context(Arc::clone(handler));
        }
        for handler in &self.modals {
            manager.register_modal(Arc::clone(handler));
        }
        for handler in &self.prefix {
            manager.register_prefix(Arc::clone(handler));
        }
        detached
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::access::guild_only;
    use crate::commands::{CommandContext, CommandSpec, OptionDefinition, PrefixCommand, PrefixInvocation};
    use crate::events::{Event, EventKind};
    use anyhow::Result;
    use async_trait::async_trait;
    use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
    use serenity::model::channel::Message;
    use serenity::prelude::Context;

    struct Tag;

    #[async_trait]
    impl SlashCommandHandler for Tag {
        fn spec(&self) -> CommandSpec {
            CommandSpec::slash("tag", "Tags")
        }

        async fn handle(
            &self,
            _ctx: Arc<CommandContext>,
            _serenity_ctx: &Context,
            _command: &ApplicationCommandInteraction,
        ) -> Result<()> {
            Ok(())
        }
    }

    struct Sub(&'static str);

    #[async_trait]
    impl SubcommandHandler for Sub {
        fn parent(&self) -> &str {
            self.0
        }

        fn spec(&self) -> OptionDefinition {
            OptionDefinition::subcommand("add", "Add")
        }

        async fn handle(
            &self,
            _ctx: Arc<CommandContext>,
            _serenity_ctx: &Context,
            _command: &ApplicationCommandInteraction,
        ) -> Result<()> {
            Ok(())
        }
    }

    struct Echo;

    #[async_trait]
    impl PrefixCommandHandler for Echo {
        fn command(&self) -> PrefixCommand {
            PrefixCommand::new("echo").alias("say")
        }

        async fn handle(
            &self,
            _ctx: Arc<CommandContext>,
            _serenity_ctx: &Context,
            _msg: &Message,
            _invocation: &PrefixInvocation,
        ) -> Result<()> {
            Ok(())
        }
    }

    struct Joined;

    #[async_trait]
    impl Listener for Joined {
        fn event(&self) -> EventKind {
            EventKind::GuildMemberAddition
        }

        async fn handle(&self, _ctx: Arc<CommandContext>, _serenity_ctx: &Context, _event: &Event) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_install_registers_commands_before_subcommands() {
        // Subcommand listed first still attaches to its parent
        let module = Module::new("tags")
            .subcommand(Arc::new(Sub("tag")))
            .slash(Arc::new(Tag))
            .prefix(Arc::new(Echo));

        let mut manager = CommandManager::new();
        assert_eq!(module.install_commands(&mut manager), 0);

        assert!(manager.resolve_slash("tag").is_some());
        assert!(manager.resolve_subcommand("tag.add").is_some());
        assert!(manager.resolve_prefix("say").is_some());
    }

    #[test]
    fn test_install_counts_orphan_subcommands() {
        let module = Module::new("orphans").subcommand(Arc::new(Sub("missing")));

        let mut manager = CommandManager::new();
        assert_eq!(module.install_commands(&mut manager), 1);
        assert!(manager.is_empty());
    }

    #[test]
    fn test_builder_collects_listeners_and_hooks() {
        let module = Module::new("welcome")
            .listener(Arc::new(Joined))
            .hook(HookKind::Prefix, guild_only());

        assert_eq!(module.name, "welcome");
        assert_eq!(module.listeners.len(), 1);
        assert_eq!(module.hooks.len(), 1);
        assert_eq!(module.hooks[0].0, HookKind::Prefix);
    }
}
