use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use dotenvy::dotenv;
use log::{error, info};
use rand::Rng;
use serenity::model::application::component::{ButtonStyle, InputTextStyle};
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::model::application::interaction::autocomplete::AutocompleteInteraction;
use serenity::model::application::interaction::message_component::MessageComponentInteraction;
use serenity::model::application::interaction::modal::ModalSubmitInteraction;
use serenity::model::application::interaction::InteractionResponseType;
use serenity::model::channel::Message;
use serenity::model::id::{GuildId, UserId};
use serenity::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

use cordkit::commands::options::leaf_options;
use cordkit::commands::{
    get_string_option, one_of, ArgumentType, CommandFlags, CommandSpec, ComponentHandler, ContextMenuHandler,
    ModalHandler, OptionDefinition, OptionKind, PrefixArgs, PrefixArgument, PrefixCommand,
    PrefixCommandHandler, PrefixInvocation, PrefixOption, SlashCommandHandler, SubcommandHandler,
};
use cordkit::components::button;
use cordkit::core::{logging, Config};
use cordkit::{
    CommandContext, CommandManager, Event, EventKind, Framework, Listener, Module, Prefix, RegisterOptions,
};

async fn reply(ctx: &Context, command: &ApplicationCommandInteraction, content: &str) -> Result<()> {
    command
        .create_interaction_response(&ctx.http, |response| {
            response
                .kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|message| message.content(content))
        })
        .await?;
    Ok(())
}

const PING_AGAIN: &str = "ping_again";

struct PingCommand;

#[async_trait]
impl SlashCommandHandler for PingCommand {
    fn spec(&self) -> CommandSpec {
        CommandSpec::slash("ping", "Check that the bot is alive")
    }

    async fn handle(
        &self,
        ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        let again = button(PING_AGAIN, "Ping again", ButtonStyle::Secondary);
        let content = format!("🏓 Pong! Up for {}s", ctx.uptime_secs());

        command
            .create_interaction_response(&serenity_ctx.http, |response| {
                response
                    .kind(InteractionResponseType::ChannelMessageWithSource)
                    .interaction_response_data(|message| {
                        message
                            .content(content)
                            .components(|c| c.create_action_row(|row| row.add_button(again)))
                    })
            })
            .await?;
        Ok(())
    }
}

struct PingAgain;

#[async_trait]
impl ComponentHandler for PingAgain {
    async fn handle(
        &self,
        ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        component: &MessageComponentInteraction,
    ) -> Result<()> {
        let content = format!("🏓 Pong again! Up for {}s", ctx.uptime_secs());
        component
            .create_interaction_response(&serenity_ctx.http, |response| {
                response
                    .kind(InteractionResponseType::UpdateMessage)
                    .interaction_response_data(|message| message.content(content))
            })
            .await?;
        Ok(())
    }
}

type TagStore = Arc<DashMap<String, String>>;

struct TagCommand;

#[async_trait]
impl SlashCommandHandler for TagCommand {
    fn spec(&self) -> CommandSpec {
        CommandSpec::slash("tag", "Store and recall short texts")
            .option(OptionDefinition::group("admin", "Tag administration"))
    }

    async fn handle(
        &self,
        _ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        reply(serenity_ctx, command, "Pick a subcommand: add, show or admin purge").await
    }
}

struct TagAdd(TagStore);

#[async_trait]
impl SubcommandHandler for TagAdd {
    fn parent(&self) -> &str {
        "tag"
    }

    fn spec(&self) -> OptionDefinition {
        OptionDefinition::subcommand("add", "Create or replace a tag")
            .option(OptionDefinition::new(OptionKind::String, "name", "Tag name").required())
            .option(OptionDefinition::new(OptionKind::String, "content", "Tag text").required())
    }

    async fn handle(
        &self,
        _ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        let options = leaf_options(&command.data.options);
        let name = get_string_option(options, "name").ok_or_else(|| anyhow::anyhow!("Missing tag name"))?;
        let content = get_string_option(options, "content").unwrap_or_default();
        self.0.insert(name.clone(), content);
        reply(serenity_ctx, command, &format!("Saved tag `{name}`")).await
    }
}

struct TagShow(TagStore);

#[async_trait]
impl SubcommandHandler for TagShow {
    fn parent(&self) -> &str {
        "tag"
    }

    fn spec(&self) -> OptionDefinition {
        OptionDefinition::subcommand("show", "Show a tag")
            .option(OptionDefinition::new(OptionKind::String, "name", "Tag name").required().autocomplete())
    }

    async fn handle(
        &self,
        _ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        let name = get_string_option(leaf_options(&command.data.options), "name").unwrap_or_default();
        let content = match self.0.get(&name) {
            Some(tag) => tag.value().clone(),
            None => format!("No tag named `{name}`"),
        };
        reply(serenity_ctx, command, &content).await
    }

    async fn autocomplete(
        &self,
        _ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        interaction: &AutocompleteInteraction,
        focused: &str,
    ) -> Result<()> {
        if focused != "name" {
            return Err(anyhow::anyhow!("No autocomplete handler for option `{focused}`"));
        }
        let typed = get_string_option(leaf_options(&interaction.data.options), "name").unwrap_or_default();
        let mut names: Vec<String> = self
            .0
            .iter()
            .map(|tag| tag.key().clone())
            .filter(|name| name.starts_with(&typed))
            .collect();
        names.sort();
        names.truncate(25);

        interaction
            .create_autocomplete_response(&serenity_ctx.http, |response| {
                for name in &names {
                    response.add_string_choice(name, name);
                }
                response
            })
            .await?;
        Ok(())
    }
}

struct TagPurge(TagStore);

#[async_trait]
impl SubcommandHandler for TagPurge {
    fn parent(&self) -> &str {
        "tag"
    }

    fn group(&self) -> Option<&str> {
        Some("admin")
    }

    fn spec(&self) -> OptionDefinition {
        OptionDefinition::subcommand("purge", "Delete every tag")
    }

    fn flags(&self) -> CommandFlags {
        CommandFlags::owner_only()
    }

    async fn handle(
        &self,
        _ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        let count = self.0.len();
        self.0.clear();
        reply(serenity_ctx, command, &format!("🧹 Removed {count} tags")).await
    }
}

struct FeedbackCommand;

#[async_trait]
impl SlashCommandHandler for FeedbackCommand {
    fn spec(&self) -> CommandSpec {
        CommandSpec::slash("feedback", "Send feedback to the bot owners")
    }

    async fn handle(
        &self,
        _ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        command
            .create_interaction_response(&serenity_ctx.http, |response| {
                response
                    .kind(InteractionResponseType::Modal)
                    .interaction_response_data(|modal| {
                        modal.custom_id("feedback").title("Feedback").components(|c| {
                            c.create_action_row(|row| {
                                row.create_input_text(|input| {
                                    input
                                        .custom_id("feedback_text")
                                        .label("What should we improve?")
                                        .style(InputTextStyle::Paragraph)
                                        .required(true)
                                })
                            })
                        })
                    })
            })
            .await?;
        Ok(())
    }
}

struct FeedbackModal;

#[async_trait]
impl ModalHandler for FeedbackModal {
    fn custom_id(&self) -> &str {
        "feedback"
    }

    async fn handle(
        &self,
        _ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        modal: &ModalSubmitInteraction,
        fields: &HashMap<String, String>,
    ) -> Result<()> {
        let text = fields.get("feedback_text").map(String::as_str).unwrap_or_default();
        info!("📬 Feedback from {}: {text}", modal.user.id);

        modal
            .create_interaction_response(&serenity_ctx.http, |response| {
                response
                    .kind(InteractionResponseType::ChannelMessageWithSource)
                    .interaction_response_data(|message| message.content("Thanks for the feedback!").ephemeral(true))
            })
            .await?;
        Ok(())
    }
}

struct UserInfoCommand;

#[async_trait]
impl ContextMenuHandler for UserInfoCommand {
    fn spec(&self) -> CommandSpec {
        CommandSpec::user("User Info")
    }

    async fn handle(
        &self,
        _ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        let user = command
            .data
            .resolved
            .users
            .values()
            .next()
            .ok_or_else(|| anyhow::anyhow!("Context menu invoked without a target user"))?;

        let content = format!(
            "**{}** ({})\nAccount created <t:{}:D>",
            user.tag(),
            user.id,
            user.created_at().unix_timestamp()
        );
        reply(serenity_ctx, command, &content).await
    }
}

struct RollCommand;

#[async_trait]
impl PrefixCommandHandler for RollCommand {
    fn command(&self) -> PrefixCommand {
        PrefixCommand::new("roll")
            .alias("dice")
            .description("Roll dice")
            .arg(PrefixArgument::new("sides", ArgumentType::Integer).required())
            .option(
                PrefixOption::new("count")
                    .short('c')
                    .arg(PrefixArgument::new("count", ArgumentType::Integer).required()),
            )
            .option(PrefixOption::new("verbose").short('v'))
    }

    async fn handle(
        &self,
        _ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        msg: &Message,
        invocation: &PrefixInvocation,
    ) -> Result<()> {
        let parsed = invocation
            .args
            .parsed()
            .ok_or_else(|| anyhow::anyhow!("roll expects parsed arguments"))?;

        let sides = parsed.arg("sides").and_then(|v| v.as_i64()).unwrap_or(6);
        if !(2..=1000).contains(&sides) {
            msg.reply(serenity_ctx, "Dice need between 2 and 1000 sides").await?;
            return Ok(());
        }
        let count = parsed
            .option("count")
            .and_then(|v| v.as_value())
            .and_then(|v| v.as_i64())
            .unwrap_or(1)
            .clamp(1, 20);

        let rolls: Vec<i64> = {
            let mut rng = rand::rng();
            (0..count).map(|_| rng.random_range(1..=sides)).collect()
        };
        let total: i64 = rolls.iter().sum();

        let content = if parsed.has_option("verbose") {
            let shown: Vec<String> = rolls.iter().map(i64::to_string).collect();
            format!("🎲 {count}d{sides}: {} = **{total}**", shown.join(" + "))
        } else {
            format!("🎲 **{total}**")
        };
        msg.reply(serenity_ctx, content).await?;
        Ok(())
    }
}

struct WhoisCommand;

#[async_trait]
impl PrefixCommandHandler for WhoisCommand {
    fn command(&self) -> PrefixCommand {
        PrefixCommand::new("whois")
            .description("Look up a user")
            .arg(PrefixArgument::new("user", ArgumentType::Userlike).required())
    }

    async fn handle(
        &self,
        _ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        msg: &Message,
        invocation: &PrefixInvocation,
    ) -> Result<()> {
        let user = invocation
            .args
            .parsed()
            .and_then(|parsed| parsed.arg("user"))
            .and_then(|value| value.as_user())
            .ok_or_else(|| anyhow::anyhow!("whois expects a resolved user"))?;

        msg.reply(serenity_ctx, format!("**{}** ({})", user.tag(), user.id)).await?;
        Ok(())
    }
}

struct EchoCommand;

#[async_trait]
impl PrefixCommandHandler for EchoCommand {
    fn command(&self) -> PrefixCommand {
        PrefixCommand::new("echo").alias("say")
    }

    async fn handle(
        &self,
        _ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        msg: &Message,
        invocation: &PrefixInvocation,
    ) -> Result<()> {
        let PrefixArgs::Words(words) = &invocation.args else {
            return Ok(());
        };
        if words.is_empty() {
            return Ok(());
        }
        msg.channel_id.say(&serenity_ctx.http, words.join(" ")).await?;
        Ok(())
    }
}

struct FlipCommand;

#[async_trait]
impl PrefixCommandHandler for FlipCommand {
    fn command(&self) -> PrefixCommand {
        PrefixCommand::new("flip")
            .description("Flip a coin, optionally calling it")
            .arg(PrefixArgument::new("call", ArgumentType::String).transform(one_of(["heads", "tails"])))
    }

    async fn handle(
        &self,
        _ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        msg: &Message,
        invocation: &PrefixInvocation,
    ) -> Result<()> {
        let call = invocation
            .args
            .parsed()
            .and_then(|parsed| parsed.arg("call"))
            .and_then(|value| value.as_str());
        let side = if rand::rng().random_bool(0.5) { "heads" } else { "tails" };

        let content = match call {
            Some(call) if call == side => format!("🪙 {side}, you win!"),
            Some(_) => format!("🪙 {side}, better luck next time"),
            None => format!("🪙 {side}"),
        };
        msg.reply(serenity_ctx, content).await?;
        Ok(())
    }
}

/// Logs the first ready only; reconnects are ignored
struct FirstReady;

#[async_trait]
impl Listener for FirstReady {
    fn event(&self) -> EventKind {
        EventKind::Ready
    }

    fn name(&self) -> &str {
        "first-ready"
    }

    fn repeat(&self) -> bool {
        false
    }

    async fn handle(&self, ctx: Arc<CommandContext>, _serenity_ctx: &Context, event: &Event) -> Result<()> {
        if let Event::Ready(ready) = event {
            info!("🚀 First ready as {} with {} owners configured", ready.user.name, ctx.owners.len());
        }
        Ok(())
    }
}

struct MemberJoined;

#[async_trait]
impl Listener for MemberJoined {
    fn event(&self) -> EventKind {
        EventKind::GuildMemberAddition
    }

    fn name(&self) -> &str {
        "member-joined"
    }

    async fn handle(&self, _ctx: Arc<CommandContext>, _serenity_ctx: &Context, event: &Event) -> Result<()> {
        if let Event::GuildMemberAddition(member) = event {
            info!("👋 {} joined guild {}", member.user.tag(), member.guild_id);
        }
        Ok(())
    }
}

fn tags_module() -> Module {
    let tags: TagStore = Arc::new(DashMap::new());
    Module::new("tags")
        .slash(Arc::new(TagCommand))
        .subcommand(Arc::new(TagAdd(Arc::clone(&tags))))
        .subcommand(Arc::new(TagShow(Arc::clone(&tags))))
        .subcommand(Arc::new(TagPurge(tags)))
}

fn build_manager() -> CommandManager {
    let mut manager = CommandManager::new();

    manager.register_slash(Arc::new(PingCommand));
    manager.register_slash(Arc::new(FeedbackCommand));
    manager.register_modal(Arc::new(FeedbackModal));
    manager.register_context(Arc::new(UserInfoCommand));
    manager.register_prefix(Arc::new(RollCommand));
    manager.register_prefix(Arc::new(WhoisCommand));
    manager.register_prefix(Arc::new(EchoCommand));
    manager.register_prefix(Arc::new(FlipCommand));

    manager
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::from_env()?;
    logging::init(&config.log_level, config.log_format);

    info!("Starting cordkit demo bot...");

    let manager = build_manager();
    info!("📦 Loaded {} commands", manager.len());

    let owners = config.owners.iter().copied().map(UserId).collect();
    let context = CommandContext::new(owners);
    context.components.register(Some(PING_AGAIN), Arc::new(PingAgain));
    let mut framework = Framework::new(manager, context)
        .module(tags_module())
        .listener(Arc::new(FirstReady))
        .listener(Arc::new(MemberJoined));

    let prefix = match &config.prefix {
        Some(prefix) => Some(Prefix::literal(prefix).with_mention(config.mention_prefix)),
        None if config.mention_prefix => Some(Prefix::mention_only()),
        None => None,
    };
    if let Some(prefix) = prefix {
        framework = framework.prefix(prefix);
    }

    if config.wants_registration() {
        let guilds = config.register_guilds.iter().copied().map(GuildId);
        let options = RegisterOptions {
            guilds: guilds.collect(),
            global: config.register_global,
        };
        framework = framework.register_on_ready(options);
    }

    // GUILD_MEMBERS is privileged; without it member joins are not delivered
    // and prefix permission checks use role-level permissions
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::GUILD_MESSAGE_REACTIONS
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(framework)
        .await
        .map_err(|e| {
            error!("Failed to create Discord client: {e}");
            anyhow::anyhow!("Client creation failed: {}", e)
        })?;

    info!("Bot configured successfully. Connecting to Discord gateway...");

    if let Err(why) = client.start().await {
        error!("Client error: {why:?}");
        return Err(why.into());
    }
    Ok(())
}
