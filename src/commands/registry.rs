//! Command manager
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 2.0.0: One manager for slash, subcommand, context menu, modal and prefix handlers
//! - 1.0.0: Initial implementation for handler dispatch

use log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;

use super::definition::{CommandKind, CommandSpec, OptionKind};
use super::handler::{
    ContextMenuHandler, ModalHandler, PrefixCommandHandler, SlashCommandHandler, SubcommandHandler,
};
use super::prefix::PrefixCommand;

#[derive(Clone)]
struct SlashEntry {
    /// Declaration including attached subcommands
    spec: CommandSpec,
    handler: Arc<dyn SlashCommandHandler>,
    /// Keyed by label: `sub` or `group.sub`
    subcommands: HashMap<String, Arc<dyn SubcommandHandler>>,
}

#[derive(Clone)]
struct ContextEntry {
    spec: CommandSpec,
    handler: Arc<dyn ContextMenuHandler>,
}

/// A prefix handler with its declaration
#[derive(Clone)]
pub struct PrefixEntry {
    pub command: Arc<PrefixCommand>,
    pub handler: Arc<dyn PrefixCommandHandler>,
}

/// Registry of every handler, looked up by name or dotted path
///
/// Build it once at startup, then share it behind an `Arc`.
///
/// # Example
///
/// ```ignore
/// let mut manager = CommandManager::new();
/// manager.register_slash(Arc::new(TagHandler));
/// manager.register_subcommand(Arc::new(TagAddHandler));
///
/// if let Some(handler) = manager.resolve_subcommand("tag.add") {
///     handler.handle(ctx, serenity_ctx, command).await?;
/// }
/// ```
#[derive(Clone, Default)]
pub struct CommandManager {
    slash: HashMap<String, SlashEntry>,
    user: HashMap<String, ContextEntry>,
    message: HashMap<String, ContextEntry>,
    modals: HashMap<String, Arc<dyn ModalHandler>>,
    /// Keyed by name and every alias
    prefix: HashMap<String, PrefixEntry>,
}

impl CommandManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_slash(&mut self, handler: Arc<dyn SlashCommandHandler>) {
        let spec = handler.spec();
        debug!("Registering slash command /{}", spec.name);
        self.slash.insert(
            spec.name.clone(),
            SlashEntry {
                spec,
                handler,
                subcommands: HashMap::new(),
            },
        );
    }

    /// Attach a subcommand to its parent
    ///
    /// Returns false (and logs a warning) when the parent or the named group
    /// is not registered.
    pub fn register_subcommand(&mut self, handler: Arc<dyn SubcommandHandler>) -> bool {
        let option = handler.spec();
        let parent = handler.parent().to_string();

        let Some(entry) = self.slash.get_mut(&parent) else {
            warn!(
                "Slash command '{parent}' not found, subcommand '{}' not attached",
                option.name
            );
            return false;
        };

        let label = match handler.group() {
            Some(group) => {
                let Some(group_option) = entry.spec.find_option_mut(group, OptionKind::SubCommandGroup) else {
                    warn!(
                        "Group '{group}' not found on '/{parent}', subcommand '{}' not attached",
                        option.name
                    );
                    return false;
                };
                let label = format!("{group}.{}", option.name);
                group_option.options.push(option);
                label
            }
            None => {
                let label = option.name.clone();
                entry.spec.options.push(option);
                label
            }
        };

        debug!("Attached subcommand /{parent} {}", label.replace('.', " "));
        entry.subcommands.insert(label, handler);
        true
    }

    /// Register a user or message context-menu command by its spec kind
    pub fn register_context(&mut self, handler: Arc<dyn ContextMenuHandler>) {
        let spec = handler.spec();
        let collection = match spec.kind {
            CommandKind::User => &mut self.user,
            CommandKind::Message => &mut self.message,
            CommandKind::ChatInput => {
                warn!("Context menu '{}' declared as a chat-input command, skipping", spec.name);
                return;
            }
        };
        debug!("Registering {:?} context menu '{}'", spec.kind, spec.name);
        collection.insert(spec.name.clone(), ContextEntry { spec, handler });
    }

    pub fn register_modal(&mut self, handler: Arc<dyn ModalHandler>) {
        self.modals.insert(handler.custom_id().to_string(), handler);
    }

    /// Register a prefix command under its name and every alias
    pub fn register_prefix(&mut self, handler: Arc<dyn PrefixCommandHandler>) {
        let command = Arc::new(handler.command());
        for name in command.names() {
            if self.prefix.contains_key(name) {
                warn!("Prefix command name '{name}' registered twice, last one wins");
            }
            self.prefix.insert(
                name.to_string(),
                PrefixEntry {
                    command: Arc::clone(&command),
                    handler: Arc::clone(&handler),
                },
            );
        }
    }

    /// Base command of a dotted path such as `tag`, `tag.add` or `tag.admin.purge`
    pub fn resolve_slash(&self, path: &str) -> Option<Arc<dyn SlashCommandHandler>> {
        let base = path.split('.').next().unwrap_or(path);
        self.slash.get(base).map(|entry| Arc::clone(&entry.handler))
    }

    /// Subcommand of a dotted path `base.sub` or `base.group.sub`
    pub fn resolve_subcommand(&self, path: &str) -> Option<Arc<dyn SubcommandHandler>> {
        let (base, label) = path.split_once('.')?;
        self.slash.get(base)?.subcommands.get(label).cloned()
    }

    pub fn resolve_user(&self, name: &str) -> Option<Arc<dyn ContextMenuHandler>> {
        self.user.get(name).map(|entry| Arc::clone(&entry.handler))
    }

    pub fn resolve_message(&self, name: &str) -> Option<Arc<dyn ContextMenuHandler>> {
        self.message.get(name).map(|entry| Arc::clone(&entry.handler))
    }

    pub fn resolve_modal(&self, custom_id: &str) -> Option<Arc<dyn ModalHandler>> {
        self.modals.get(custom_id).cloned()
    }

    /// Prefix command by name or alias
    pub fn resolve_prefix(&self, name: &str) -> Option<PrefixEntry> {
        self.prefix.get(name).cloned()
    }

    /// Every application command declaration, sorted by kind then name
    pub fn application_commands(&self) -> Vec<CommandSpec> {
        let mut specs: Vec<CommandSpec> = self
            .slash
            .values()
            .map(|entry| entry.spec.clone())
            .chain(self.user.values().map(|entry| entry.spec.clone()))
            .chain(self.message.values().map(|entry| entry.spec.clone()))
            .collect();
        specs.sort_by(|a, b| (a.kind, &a.name).cmp(&(b.kind, &b.name)));
        specs
    }

    /// Number of application commands plus distinct prefix commands
    pub fn len(&self) -> usize {
        let mut prefix: Vec<&str> = self.prefix.values().map(|entry| entry.command.name.as_str()).collect();
        prefix.sort_unstable();
        prefix.dedup();
        self.slash.len() + self.user.len() + self.message.len() + prefix.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slash.is_empty()
            && self.user.is_empty()
            && self.message.is_empty()
            && self.modals.is_empty()
            && self.prefix.is_empty()
    }
}
