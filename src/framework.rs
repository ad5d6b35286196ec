//! # Framework
//!
//! Serenity event handler that routes messages and interactions to the
//! handlers in a [`CommandManager`].
//!
//! - **Version**: 1.3.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.3.0: Event listener fan-out and modules
//! - 1.2.0: Per-kind hooks and registration sync on ready
//! - 1.1.0: Prefix commands with typed argument parsing
//! - 1.0.0: Slash, context menu, autocomplete, modal and component routing

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, error, info, warn};
use serenity::model::application::component::ActionRowComponent;
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::model::application::interaction::autocomplete::AutocompleteInteraction;
use serenity::model::application::interaction::message_component::MessageComponentInteraction;
use serenity::model::application::interaction::modal::ModalSubmitInteraction;
use serenity::model::application::command::CommandType;
use serenity::model::application::interaction::{Interaction, InteractionResponseType};
use serenity::model::channel::{Channel, Message, Reaction};
use serenity::model::event::MessageUpdateEvent;
use serenity::model::gateway::Ready;
use serenity::model::guild::{Guild, Member};
use serenity::model::id::{ChannelId, GuildId, MessageId, RoleId, UserId};
use serenity::model::user::User;
use serenity::model::permissions::Permissions;
use serenity::prelude::{Context, EventHandler};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::args;
use crate::commands::access::{check_access, BoxedCheck, CommandFlags, Invocation, PermissionRequirements};
use crate::commands::options::{focused_option, subcommand_label};
use crate::commands::prefix::split_invocation;
use crate::commands::{
    sync, CommandContext, CommandManager, ContextMenuHandler, DiscordTransformer, Prefix, PrefixArgs,
    PrefixEntry, PrefixInvocation, RegisterOptions,
};
use crate::core::{truncate_for_message, EXECUTION_FAILED};
use crate::events::{Event, EventManager, Listener};
use crate::module::Module;

/// Dispatch stage a hook guards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    Prefix,
    Slash,
    UserCommand,
    MessageCommand,
    Modal,
}

/// Checks that may veto dispatch before access checks run
///
/// A vetoed invocation is dropped without a reply.
#[derive(Clone, Default)]
pub struct Hooks {
    checks: HashMap<HookKind, Vec<BoxedCheck>>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, kind: HookKind, check: BoxedCheck) -> Self {
        self.checks.entry(kind).or_default().push(check);
        self
    }

    pub async fn allows(&self, kind: HookKind, invocation: &Invocation) -> bool {
        let Some(checks) = self.checks.get(&kind) else {
            return true;
        };
        for check in checks {
            if !check.allows(invocation).await {
                return false;
            }
        }
        true
    }
}

/// Collect modal text inputs into `custom_id -> value`
pub fn modal_fields(modal: &ModalSubmitInteraction) -> HashMap<String, String> {
    modal
        .data
        .components
        .iter()
        .flat_map(|row| row.components.iter())
        .filter_map(|component| match component {
            ActionRowComponent::InputText(input) => Some((input.custom_id.clone(), input.value.clone())),
            _ => None,
        })
        .collect()
}

/// Effective permissions of `user_id` in a cached guild channel
fn cached_permissions(
    ctx: &Context,
    guild_id: GuildId,
    channel_id: ChannelId,
    user_id: UserId,
) -> Option<Permissions> {
    let guild = ctx.cache.guild(guild_id)?;
    let Channel::Guild(channel) = guild.channels.get(&channel_id)? else {
        return None;
    };
    let member = guild.members.get(&user_id)?;
    guild.user_permissions_in(channel, member).ok()
}

/// Guild-level permissions granted by a set of roles
pub fn combine_role_permissions(
    is_guild_owner: bool,
    everyone: Permissions,
    roles: impl IntoIterator<Item = Permissions>,
) -> Permissions {
    if is_guild_owner {
        return Permissions::all();
    }
    let held = roles.into_iter().fold(everyone, |held, role| held | role);
    if held.contains(Permissions::ADMINISTRATOR) {
        Permissions::all()
    } else {
        held
    }
}

/// Permissions from the message's partial member when the member is not
/// cached; channel overwrites are not applied
fn message_member_permissions(ctx: &Context, guild_id: GuildId, msg: &Message) -> Option<Permissions> {
    let member = msg.member.as_ref()?;
    let guild = ctx.cache.guild(guild_id)?;
    let everyone = guild.roles.get(&RoleId(guild_id.0))?.permissions;
    let roles = member
        .roles
        .iter()
        .filter_map(|id| guild.roles.get(id))
        .map(|role| role.permissions);
    Some(combine_role_permissions(guild.owner_id == msg.author.id, everyone, roles))
}

async fn respond_ephemeral(ctx: &Context, command: &ApplicationCommandInteraction, content: &str) {
    let created = command
        .create_interaction_response(&ctx.http, |response| {
            response
                .kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|message| message.content(content).ephemeral(true))
        })
        .await;

    if created.is_err() {
        if let Err(why) = command
            .create_followup_message(&ctx.http, |message| message.content(content).ephemeral(true))
            .await
        {
            error!("Failed to send reply for /{}: {why}", command.data.name);
        }
    }
}

async fn respond_modal_ephemeral(ctx: &Context, modal: &ModalSubmitInteraction, content: &str) {
    let created = modal
        .create_interaction_response(&ctx.http, |response| {
            response
                .kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|message| message.content(content).ephemeral(true))
        })
        .await;

    if created.is_err() {
        if let Err(why) = modal
            .create_followup_message(&ctx.http, |message| message.content(content).ephemeral(true))
            .await
        {
            error!("Failed to send reply for modal '{}': {why}", modal.data.custom_id);
        }
    }
}

async fn respond_component_ephemeral(ctx: &Context, component: &MessageComponentInteraction, content: &str) {
    let created = component
        .create_interaction_response(&ctx.http, |response| {
            response
                .kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|message| message.content(content).ephemeral(true))
        })
        .await;

    if created.is_err() {
        if let Err(why) = component
            .create_followup_message(&ctx.http, |message| message.content(content).ephemeral(true))
            .await
        {
            error!("Failed to send reply for component '{}': {why}", component.data.custom_id);
        }
    }
}

/// Serenity event handler driving every registered command
///
/// Listeners run after the framework's own routing for the same event.
/// Prefix-command permissions are exact when the author is in the cache
/// (`GUILD_MEMBERS` intent); otherwise they fall back to guild-level role
/// permissions from the message.
///
/// # Example
///
/// ```ignore
/// let framework = Framework::new(manager, CommandContext::new(owners))
///     .prefix(Prefix::literal("!"))
///     .register_on_ready(RegisterOptions::guilds([GuildId(1234)]));
///
/// let mut client = Client::builder(&token, intents)
///     .event_handler(framework)
///     .await?;
/// ```
pub struct Framework {
    manager: Arc<CommandManager>,
    context: Arc<CommandContext>,
    prefix: Option<Prefix>,
    hooks: Hooks,
    events: EventManager,
    registration: Option<RegisterOptions>,
}

impl Framework {
    pub fn new(manager: CommandManager, context: CommandContext) -> Self {
        Self {
            manager: Arc::new(manager),
            context: Arc::new(context),
            prefix: None,
            hooks: Hooks::default(),
            events: EventManager::new(),
            registration: None,
        }
    }

    /// Enable prefix commands
    pub fn prefix(mut self, prefix: Prefix) -> Self {
        self.prefix = Some(prefix);
        self
    }

    pub fn hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn listener(mut self, listener: Arc<dyn Listener>) -> Self {
        self.events.add(listener);
        self
    }

    /// Install a module's commands, listeners and hooks
    pub fn module(mut self, module: Module) -> Self {
        let detached = module.install_commands(Arc::make_mut(&mut self.manager));
        info!(
            "📦 Module '{}' loaded ({} listeners, {} hooks, {detached} detached subcommands)",
            module.name,
            module.listeners.len(),
            module.hooks.len()
        );

        let Module { listeners, hooks, .. } = module;
        for listener in listeners {
            self.events.add(listener);
        }
        for (kind, check) in hooks {
            self.hooks = self.hooks.add(kind, check);
        }
        self
    }

    /// Sync application commands every time the gateway reports ready
    pub fn register_on_ready(mut self, options: RegisterOptions) -> Self {
        self.registration = Some(options);
        self
    }

    pub fn context(&self) -> Arc<CommandContext> {
        Arc::clone(&self.context)
    }

    pub fn manager(&self) -> Arc<CommandManager> {
        Arc::clone(&self.manager)
    }

    pub fn listeners(&self) -> &EventManager {
        &self.events
    }

    async fn emit(&self, ctx: &Context, event: Event) {
        if self.events.is_empty() {
            return;
        }
        self.events.dispatch(self.context(), ctx, &event).await;
    }

    async fn route_message(&self, ctx: &Context, msg: &Message) {
        if msg.author.bot {
            return;
        }
        let Some(prefix) = &self.prefix else {
            return;
        };
        let Some(rest) = prefix.strip(&msg.content, ctx.cache.current_user_id()) else {
            return;
        };
        let Some((name, raw)) = split_invocation(rest) else {
            return;
        };
        let Some(entry) = self.manager.resolve_prefix(name) else {
            debug!("Unknown prefix command '{name}'");
            return;
        };

        let request_id = Uuid::new_v4();
        info!(
            "[{request_id}] 💬 Prefix command '{}' from {} ({})",
            entry.command.name, msg.author.name, msg.author.id
        );

        if let Err(e) = self.run_prefix(ctx, msg, entry, raw, request_id).await {
            error!("[{request_id}] Error handling prefix command '{name}': {e:#}");
            if let Err(why) = msg.channel_id.say(&ctx.http, EXECUTION_FAILED).await {
                error!("[{request_id}] Failed to send error message: {why}");
            }
        }
    }

    fn interaction_invocation(&self, ctx: &Context, command: &ApplicationCommandInteraction) -> Invocation {
        let bot_id = ctx.cache.current_user_id();
        Invocation {
            command: command.data.name.clone(),
            user_id: command.user.id,
            guild_id: command.guild_id,
            is_owner: self.context.is_owner(command.user.id),
            member_permissions: command.member.as_ref().and_then(|member| member.permissions),
            bot_permissions: command
                .guild_id
                .and_then(|guild_id| cached_permissions(ctx, guild_id, command.channel_id, bot_id)),
        }
    }

    fn message_invocation(&self, ctx: &Context, msg: &Message, command: &str) -> Invocation {
        let bot_id = ctx.cache.current_user_id();
        let permissions = |user_id| {
            msg.guild_id
                .and_then(|guild_id| cached_permissions(ctx, guild_id, msg.channel_id, user_id))
        };
        // Without the GUILD_MEMBERS intent authors are often missing from the cache
        let member_permissions = permissions(msg.author.id).or_else(|| {
            msg.guild_id
                .and_then(|guild_id| message_member_permissions(ctx, guild_id, msg))
        });
        Invocation {
            command: command.to_string(),
            user_id: msg.author.id,
            guild_id: msg.guild_id,
            is_owner: self.context.is_owner(msg.author.id),
            member_permissions,
            bot_permissions: permissions(bot_id),
        }
    }

    /// Reply with the denial and return false when access is refused
    async fn interaction_allowed(
        &self,
        ctx: &Context,
        command: &ApplicationCommandInteraction,
        flags: CommandFlags,
        requirements: PermissionRequirements,
        invocation: &Invocation,
    ) -> bool {
        match check_access(flags, requirements, invocation) {
            Ok(()) => true,
            Err(denied) => {
                debug!("Access denied for /{} by {}: {denied:?}", command.data.name, invocation.user_id);
                respond_ephemeral(ctx, command, &denied.to_string()).await;
                false
            }
        }
    }

    async fn run_slash(&self, ctx: &Context, command: &ApplicationCommandInteraction, request_id: Uuid) -> Result<()> {
        let name = &command.data.name;
        let Some(handler) = self.manager.resolve_slash(name) else {
            warn!("[{request_id}] No handler registered for /{name}");
            return Ok(());
        };

        let invocation = self.interaction_invocation(ctx, command);
        if !self.hooks.allows(HookKind::Slash, &invocation).await {
            debug!("[{request_id}] Slash hook vetoed /{name}");
            return Ok(());
        }

        if let Some(label) = subcommand_label(&command.data.options) {
            if let Some(sub) = self.manager.resolve_subcommand(&format!("{name}.{label}")) {
                debug!("[{request_id}] Routing /{name} to subcommand {label}");
                if !self
                    .interaction_allowed(ctx, command, sub.flags(), sub.permissions(), &invocation)
                    .await
                {
                    return Ok(());
                }
                return sub.handle(self.context(), ctx, command).await;
            }
            debug!("[{request_id}] No subcommand handler for {name}.{label}, using base command");
        }

        if !self
            .interaction_allowed(ctx, command, handler.flags(), handler.permissions(), &invocation)
            .await
        {
            return Ok(());
        }
        handler.handle(self.context(), ctx, command).await
    }

    async fn run_context_menu(
        &self,
        ctx: &Context,
        command: &ApplicationCommandInteraction,
        handler: Option<Arc<dyn ContextMenuHandler>>,
        kind: HookKind,
        request_id: Uuid,
    ) -> Result<()> {
        let Some(handler) = handler else {
            warn!("[{request_id}] No handler registered for context menu '{}'", command.data.name);
            return Ok(());
        };

        let invocation = self.interaction_invocation(ctx, command);
        if !self.hooks.allows(kind, &invocation).await {
            debug!("[{request_id}] {kind:?} hook vetoed '{}'", command.data.name);
            return Ok(());
        }
        if !self
            .interaction_allowed(ctx, command, handler.flags(), handler.permissions(), &invocation)
            .await
        {
            return Ok(());
        }
        handler.handle(self.context(), ctx, command).await
    }

    async fn handle_application_command(&self, ctx: &Context, command: &ApplicationCommandInteraction) {
        let request_id = Uuid::new_v4();
        info!(
            "[{request_id}] ⚡ {:?} command '{}' from {} ({})",
            command.data.kind, command.data.name, command.user.name, command.user.id
        );

        let name = command.data.name.as_str();
        let result = match command.data.kind {
            CommandType::ChatInput => self.run_slash(ctx, command, request_id).await,
            CommandType::User => {
                let handler = self.manager.resolve_user(name);
                self.run_context_menu(ctx, command, handler, HookKind::UserCommand, request_id)
                    .await
            }
            CommandType::Message => {
                let handler = self.manager.resolve_message(name);
                self.run_context_menu(ctx, command, handler, HookKind::MessageCommand, request_id)
                    .await
            }
            other => {
                warn!("[{request_id}] Unsupported command type {other:?}");
                Ok(())
            }
        };

        if let Err(e) = result {
            error!("[{request_id}] Error handling command '{name}': {e:#}");
            respond_ephemeral(ctx, command, EXECUTION_FAILED).await;
        }
    }

    async fn handle_autocomplete(&self, ctx: &Context, autocomplete: &AutocompleteInteraction) {
        let name = &autocomplete.data.name;
        let Some(handler) = self.manager.resolve_slash(name) else {
            debug!("Autocomplete for unknown command /{name}");
            return;
        };
        let focused = focused_option(&autocomplete.data.options).unwrap_or_default();

        let sub = subcommand_label(&autocomplete.data.options)
            .and_then(|label| self.manager.resolve_subcommand(&format!("{name}.{label}")));
        let result = match sub {
            Some(sub) => sub.autocomplete(self.context(), ctx, autocomplete, focused).await,
            None => handler.autocomplete(self.context(), ctx, autocomplete, focused).await,
        };

        if let Err(e) = result {
            error!("Autocomplete failed for /{name} option '{focused}': {e:#}");
            if let Err(why) = autocomplete
                .create_autocomplete_response(&ctx.http, |response| response)
                .await
            {
                error!("Failed to send empty autocomplete response: {why}");
            }
        }
    }

    async fn handle_modal(&self, ctx: &Context, modal: &ModalSubmitInteraction) {
        let request_id = Uuid::new_v4();
        let custom_id = &modal.data.custom_id;
        let Some(handler) = self.manager.resolve_modal(custom_id) else {
            debug!("[{request_id}] No handler for modal '{custom_id}'");
            return;
        };

        let invocation = Invocation {
            command: custom_id.clone(),
            user_id: modal.user.id,
            guild_id: modal.guild_id,
            is_owner: self.context.is_owner(modal.user.id),
            member_permissions: modal.member.as_ref().and_then(|member| member.permissions),
            bot_permissions: None,
        };
        if !self.hooks.allows(HookKind::Modal, &invocation).await {
            debug!("[{request_id}] Modal hook vetoed '{custom_id}'");
            return;
        }

        let fields = modal_fields(modal);
        info!("[{request_id}] 📝 Modal '{custom_id}' submitted by {} ({} fields)", modal.user.id, fields.len());

        if let Err(e) = handler.handle(self.context(), ctx, modal, &fields).await {
            error!("[{request_id}] Error handling modal '{custom_id}': {e:#}");
            respond_modal_ephemeral(ctx, modal, EXECUTION_FAILED).await;
        }
    }

    async fn handle_component(&self, ctx: &Context, component: &MessageComponentInteraction) {
        let custom_id = &component.data.custom_id;
        let Some(handler) = self.context.components.get(custom_id) else {
            debug!("No handler for component '{custom_id}'");
            return;
        };

        info!("Processing component interaction: {custom_id} from user: {}", component.user.id);
        if let Err(e) = handler.handle(self.context(), ctx, component).await {
            error!("Error handling component interaction '{custom_id}': {e:#}");
            respond_component_ephemeral(ctx, component, EXECUTION_FAILED).await;
        }
    }

    async fn run_prefix(
        &self,
        ctx: &Context,
        msg: &Message,
        entry: PrefixEntry,
        raw: &str,
        request_id: Uuid,
    ) -> Result<()> {
        let command = entry.command.as_ref();
        let invocation = self.message_invocation(ctx, msg, &command.name);

        if !self.hooks.allows(HookKind::Prefix, &invocation).await {
            debug!("[{request_id}] Prefix hook vetoed '{}'", command.name);
            return Ok(());
        }
        if let Err(denied) = check_access(command.flags, command.permissions, &invocation) {
            debug!("[{request_id}] Access denied for '{}': {denied:?}", command.name);
            msg.reply(ctx, denied.to_string()).await?;
            return Ok(());
        }

        let args = if command.takes_arguments() {
            let transformer = DiscordTransformer::new(ctx, msg, command);
            match args::parse(raw, &command.schema(), &transformer).await {
                Ok(parsed) => PrefixArgs::Parsed(parsed),
                Err(e) => {
                    debug!("[{request_id}] Argument error for '{}': {e}", command.name);
                    let reply = format!("{e}\nUsage: `{}`", command.usage());
                    msg.reply(ctx, truncate_for_message(&reply)).await?;
                    return Ok(());
                }
            }
        } else {
            PrefixArgs::words(raw)
        };
        let invocation = PrefixInvocation {
            raw: raw.to_string(),
            args,
        };

        let handler = &entry.handler;
        if !handler.before(self.context(), ctx, msg, &invocation).await? {
            debug!("[{request_id}] '{}' skipped by its before hook", command.name);
            return Ok(());
        }
        if let Err(e) = handler.handle(self.context(), ctx, msg, &invocation).await {
            handler.on_error(self.context(), ctx, msg, &e).await?;
        }
        handler.after(self.context(), ctx, msg, &invocation).await
    }
}

#[async_trait]
impl EventHandler for Framework {
    async fn message(&self, ctx: Context, msg: Message) {
        self.route_message(&ctx, &msg).await;
        self.emit(&ctx, Event::Message(Box::new(msg))).await;
    }

    async fn message_update(
        &self,
        ctx: Context,
        _old_if_available: Option<Message>,
        _new: Option<Message>,
        event: MessageUpdateEvent,
    ) {
        self.emit(&ctx, Event::MessageUpdate(Box::new(event))).await;
    }

    async fn message_delete(
        &self,
        ctx: Context,
        channel_id: ChannelId,
        message_id: MessageId,
        guild_id: Option<GuildId>,
    ) {
        let event = Event::MessageDelete {
            channel_id,
            message_id,
            guild_id,
        };
        self.emit(&ctx, event).await;
    }

    async fn reaction_add(&self, ctx: Context, reaction: Reaction) {
        self.emit(&ctx, Event::ReactionAdd(Box::new(reaction))).await;
    }

    async fn reaction_remove(&self, ctx: Context, reaction: Reaction) {
        self.emit(&ctx, Event::ReactionRemove(Box::new(reaction))).await;
    }

    async fn guild_create(&self, ctx: Context, guild: Guild, is_new: bool) {
        debug!("Guild available: {} ({})", guild.name, guild.id);
        let event = Event::GuildCreate {
            guild: Box::new(guild),
            is_new,
        };
        self.emit(&ctx, event).await;
    }

    async fn guild_member_addition(&self, ctx: Context, member: Member) {
        self.emit(&ctx, Event::GuildMemberAddition(Box::new(member))).await;
    }

    async fn guild_member_removal(
        &self,
        ctx: Context,
        guild_id: GuildId,
        user: User,
        _member_data_if_available: Option<Member>,
    ) {
        let event = Event::GuildMemberRemoval {
            guild_id,
            user: Box::new(user),
        };
        self.emit(&ctx, event).await;
    }

    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🎉 {} is connected and ready!", ready.user.name);
        info!("📡 Connected to {} guilds", ready.guilds.len());
        info!("🤖 Bot ID: {}", ready.user.id);

        if let Some(options) = &self.registration {
            match sync::register(&ctx.http, &self.manager, options).await {
                Ok(()) => info!("✅ Application commands in sync"),
                Err(e) => error!("❌ Failed to register application commands: {e:#}"),
            }
        }
        self.emit(&ctx, Event::Ready(Box::new(ready))).await;
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match &interaction {
            Interaction::ApplicationCommand(command) => {
                self.handle_application_command(&ctx, command).await;
            }
            Interaction::Autocomplete(autocomplete) => {
                self.handle_autocomplete(&ctx, autocomplete).await;
            }
            Interaction::ModalSubmit(modal) => {
                self.handle_modal(&ctx, modal).await;
            }
            Interaction::MessageComponent(component) => {
                self.handle_component(&ctx, component).await;
            }
            Interaction::Ping(_) => {
                debug!("Ping interaction received");
            }
        }
        self.emit(&ctx, Event::InteractionCreate(Box::new(interaction))).await;
    }
}
