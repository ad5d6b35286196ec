//! Typed prefix-command arguments backed by the Discord API
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.2.0
//!
//! ## Changelog
//! - 1.2.0: Custom per-argument and per-option transforms
//! - 1.1.0: Boolean and userlike argument types
//! - 1.0.0: Scalars, users, members, roles, channels and messages

use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use regex::Regex;
use serenity::model::channel::{Channel, Message};
use serenity::model::guild::{Member, Role};
use serenity::model::id::GuildId;
use serenity::model::user::User;
use serenity::prelude::Context;
use std::fmt;
use std::sync::{Arc, OnceLock};

use super::prefix::PrefixCommand;
use crate::args::Transformer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgumentType {
    String,
    Number,
    Integer,
    Boolean,
    User,
    Member,
    /// Member when resolvable in the guild, otherwise user
    Userlike,
    Role,
    Channel,
    /// Message id in the invoking channel
    Message,
}

#[derive(Debug, Clone)]
pub enum ArgValue {
    String(String),
    Number(f64),
    Integer(i64),
    Boolean(bool),
    User(Box<User>),
    Member(Box<Member>),
    Role(Box<Role>),
    Channel(Box<Channel>),
    Message(Box<Message>),
    /// Value produced by a custom transform
    Json(serde_json::Value),
}

impl ArgValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::String(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ArgValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ArgValue::Number(value) => Some(*value),
            ArgValue::Integer(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ArgValue::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            ArgValue::Json(value) => Some(value),
            _ => None,
        }
    }

    /// The user behind a user or member value
    pub fn as_user(&self) -> Option<&User> {
        match self {
            ArgValue::User(user) => Some(user.as_ref()),
            ArgValue::Member(member) => Some(&member.user),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MentionKind {
    User,
    Role,
    Channel,
}

struct MentionPatterns {
    user: Regex,
    role: Regex,
    channel: Regex,
}

static MENTIONS: OnceLock<MentionPatterns> = OnceLock::new();

fn mentions() -> &'static MentionPatterns {
    MENTIONS.get_or_init(|| {
        let pattern = |source: &str| Regex::new(source).expect("mention pattern must compile");
        MentionPatterns {
            user: pattern(r"^(?:(\d+)|<@!?(\d+)>)$"),
            role: pattern(r"^(?:(\d+)|<@&(\d+)>)$"),
            channel: pattern(r"^(?:(\d+)|<#(\d+)>)$"),
        }
    })
}

/// Extract a snowflake from a raw id or a mention of the given kind
pub fn parse_mention_id(raw: &str, kind: MentionKind) -> Option<u64> {
    let patterns = mentions();
    let pattern = match kind {
        MentionKind::User => &patterns.user,
        MentionKind::Role => &patterns.role,
        MentionKind::Channel => &patterns.channel,
    };
    let captures = pattern.captures(raw.trim())?;
    captures
        .get(1)
        .or_else(|| captures.get(2))
        .and_then(|id| id.as_str().parse().ok())
}

pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// Coerce types that need no API call; `None` for entity types
pub fn coerce_scalar(kind: ArgumentType, raw: &str) -> Option<Result<ArgValue>> {
    let value = match kind {
        ArgumentType::String => Ok(ArgValue::String(raw.to_string())),
        ArgumentType::Number => match raw.trim().parse::<f64>() {
            Ok(number) if number.is_finite() => Ok(ArgValue::Number(number)),
            _ => Err(anyhow::anyhow!("`{raw}` is not a finite number.")),
        },
        ArgumentType::Integer => raw
            .trim()
            .parse::<i64>()
            .map(ArgValue::Integer)
            .map_err(|_| anyhow::anyhow!("`{raw}` is not a valid integer.")),
        ArgumentType::Boolean => parse_bool(raw)
            .map(ArgValue::Boolean)
            .ok_or_else(|| anyhow::anyhow!("`{raw}` is not a valid boolean.")),
        _ => return None,
    };
    Some(value)
}

/// What a custom transform is asked to coerce
#[derive(Debug, Clone, Copy)]
pub struct TransformRequest<'a> {
    pub message: &'a Message,
    pub argument: &'a str,
    /// Option the argument belongs to, if any
    pub option: Option<&'a str>,
}

/// Coercion attached to a single prefix argument or option
///
/// Replaces the built-in [`ArgumentType`] handling for the values it covers,
/// including the empty-value check.
#[async_trait]
pub trait ArgumentTransform: Send + Sync {
    async fn transform(&self, raw: &str, request: TransformRequest<'_>) -> Result<Option<ArgValue>>;
}

/// Shared handle to an [`ArgumentTransform`]
#[derive(Clone)]
pub struct CustomTransform(Arc<dyn ArgumentTransform>);

impl CustomTransform {
    pub fn new(transform: impl ArgumentTransform + 'static) -> Self {
        Self(Arc::new(transform))
    }

    pub async fn transform(&self, raw: &str, request: TransformRequest<'_>) -> Result<Option<ArgValue>> {
        self.0.transform(raw, request).await
    }
}

impl fmt::Debug for CustomTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomTransform")
    }
}

struct FnTransform<F>(F);

#[async_trait]
impl<F> ArgumentTransform for FnTransform<F>
where
    F: Fn(&str, TransformRequest<'_>) -> Result<Option<ArgValue>> + Send + Sync,
{
    async fn transform(&self, raw: &str, request: TransformRequest<'_>) -> Result<Option<ArgValue>> {
        (self.0)(raw, request)
    }
}

/// Wrap a synchronous coercion
pub fn transform_fn<F>(transform: F) -> CustomTransform
where
    F: Fn(&str, TransformRequest<'_>) -> Result<Option<ArgValue>> + Send + Sync + 'static,
{
    CustomTransform::new(FnTransform(transform))
}

/// Accept one of a fixed set of words, case-insensitively
///
/// The value is the choice as declared.
pub fn one_of<I, S>(choices: I) -> CustomTransform
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let choices: Vec<String> = choices.into_iter().map(Into::into).collect();
    transform_fn(move |raw, _request| {
        choices
            .iter()
            .find(|choice| choice.eq_ignore_ascii_case(raw.trim()))
            .map(|choice| Some(ArgValue::String(choice.clone())))
            .ok_or_else(|| anyhow::anyhow!("`{raw}` is not one of: {}.", choices.join(", ")))
    })
}

/// Run the custom transform covering `argument`; `None` when none is declared
pub async fn custom_coerce(
    command: &PrefixCommand,
    message: &Message,
    raw: &str,
    argument: &str,
    option: Option<&str>,
) -> Option<Result<Option<ArgValue>>> {
    let custom = command.custom_transform(argument, option)?;
    let request = TransformRequest {
        message,
        argument,
        option,
    };
    Some(custom.transform(raw, request).await)
}

/// Transformer used for prefix commands
///
/// Custom transforms on the argument, then on its option, take precedence.
/// Otherwise the declared [`ArgumentType`] is coerced and entities are
/// resolved through the HTTP client. Undeclared arguments pass through as
/// strings.
pub struct DiscordTransformer<'a> {
    pub ctx: &'a Context,
    pub message: &'a Message,
    pub command: &'a PrefixCommand,
}

impl<'a> DiscordTransformer<'a> {
    pub fn new(ctx: &'a Context, message: &'a Message, command: &'a PrefixCommand) -> Self {
        Self {
            ctx,
            message,
            command,
        }
    }

    fn guild(&self, what: &str) -> Result<GuildId> {
        self.message
            .guild_id
            .ok_or_else(|| anyhow::anyhow!("A {what} can only be given in a guild."))
    }

    fn id(raw: &str, kind: MentionKind, what: &str) -> Result<u64> {
        parse_mention_id(raw, kind).ok_or_else(|| anyhow::anyhow!("Failed to find {what} `{raw}`"))
    }

    async fn fetch_user(&self, raw: &str) -> Result<User> {
        let id = Self::id(raw, MentionKind::User, "user")?;
        self.ctx
            .http
            .get_user(id)
            .await
            .map_err(|_| anyhow::anyhow!("Failed to find user `{id}`"))
    }

    async fn fetch_member(&self, raw: &str) -> Result<Member> {
        let guild_id = self.guild("member")?;
        let id = Self::id(raw, MentionKind::User, "member")?;
        self.ctx
            .http
            .get_member(guild_id.0, id)
            .await
            .map_err(|_| anyhow::anyhow!("Failed to find member `{id}`"))
    }

    async fn fetch_role(&self, raw: &str) -> Result<Role> {
        let guild_id = self.guild("role")?;
        let id = Self::id(raw, MentionKind::Role, "role")?;
        let roles = self.ctx.http.get_guild_roles(guild_id.0).await?;
        roles
            .into_iter()
            .find(|role| role.id.0 == id)
            .ok_or_else(|| anyhow::anyhow!("Failed to find role `{id}`"))
    }

    async fn fetch_channel(&self, raw: &str) -> Result<Channel> {
        let id = Self::id(raw, MentionKind::Channel, "channel")?;
        self.ctx
            .http
            .get_channel(id)
            .await
            .map_err(|_| anyhow::anyhow!("Failed to find channel `{id}`"))
    }

    async fn fetch_message(&self, raw: &str) -> Result<Message> {
        let id: u64 = raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("Failed to find message `{raw}`"))?;
        self.ctx
            .http
            .get_message(self.message.channel_id.0, id)
            .await
            .map_err(|_| anyhow::anyhow!("Failed to find message `{id}`"))
    }

    async fn resolve(&self, kind: ArgumentType, raw: &str) -> Result<ArgValue> {
        if let Some(value) = coerce_scalar(kind, raw) {
            return value;
        }

        Ok(match kind {
            ArgumentType::User => ArgValue::User(Box::new(self.fetch_user(raw).await?)),
            ArgumentType::Member => ArgValue::Member(Box::new(self.fetch_member(raw).await?)),
            ArgumentType::Userlike => match self.fetch_member(raw).await {
                Ok(member) => ArgValue::Member(Box::new(member)),
                Err(e) => {
                    debug!("Userlike `{raw}` is not a member, trying user: {e}");
                    ArgValue::User(Box::new(self.fetch_user(raw).await?))
                }
            },
            ArgumentType::Role => ArgValue::Role(Box::new(self.fetch_role(raw).await?)),
            ArgumentType::Channel => ArgValue::Channel(Box::new(self.fetch_channel(raw).await?)),
            ArgumentType::Message => ArgValue::Message(Box::new(self.fetch_message(raw).await?)),
            ArgumentType::String
            | ArgumentType::Number
            | ArgumentType::Integer
            | ArgumentType::Boolean => unreachable!("scalars are coerced above"),
        })
    }
}

#[async_trait]
impl Transformer<ArgValue> for DiscordTransformer<'_> {
    async fn transform(
        &self,
        raw: &str,
        argument: &str,
        option: Option<&str>,
    ) -> Result<Option<ArgValue>> {
        let Some(declared) = self.command.declared_argument(argument, option) else {
            return Ok(Some(ArgValue::String(raw.to_string())));
        };
        if let Some(result) = custom_coerce(self.command, self.message, raw, argument, option).await {
            return result;
        }
        if raw.is_empty() {
            return Err(anyhow::anyhow!("Empty argument {argument}"));
        }
        self.resolve(declared.kind, raw).await.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::prefix::{PrefixArgument, PrefixOption};

    fn message() -> Message {
        serde_json::from_value(serde_json::json!({
            "id": "10",
            "channel_id": "20",
            "author": {"id": "30", "avatar": null, "discriminator": "0001", "username": "alice"},
            "content": "!paint red",
            "timestamp": "2024-01-01T00:00:00Z",
            "tts": false,
            "mention_everyone": false,
            "mentions": [],
            "mention_roles": [],
            "attachments": [],
            "embeds": [],
            "pinned": false,
            "type": 0
        }))
        .unwrap()
    }

    fn paint() -> PrefixCommand {
        PrefixCommand::new("paint")
            .arg(PrefixArgument::new("color", ArgumentType::String).transform(one_of(["Red", "Green"])))
            .arg(PrefixArgument::new("times", ArgumentType::Integer))
            .option(
                PrefixOption::new("size")
                    .arg(PrefixArgument::new("size", ArgumentType::Integer))
                    .transform(transform_fn(|raw, request| {
                        Ok(Some(ArgValue::Json(serde_json::json!({
                            "raw": raw,
                            "argument": request.argument,
                            "option": request.option,
                            "author": request.message.author.id.0,
                        }))))
                    })),
            )
            .option(
                PrefixOption::new("brush")
                    .arg(PrefixArgument::new("tip", ArgumentType::String).transform(one_of(["fine"])))
                    .transform(transform_fn(|_raw, _request| Ok(None))),
            )
    }

    #[tokio::test]
    async fn test_argument_transform_takes_precedence() {
        let command = paint();
        let message = message();

        let value = custom_coerce(&command, &message, "red", "color", None).await.unwrap().unwrap();
        assert_eq!(value.and_then(|v| v.as_str().map(str::to_string)), Some("Red".to_string()));

        let err = custom_coerce(&command, &message, "blue", "color", None).await.unwrap().unwrap_err();
        assert_eq!(err.to_string(), "`blue` is not one of: Red, Green.");
    }

    #[tokio::test]
    async fn test_option_transform_covers_its_arguments() {
        let command = paint();
        let message = message();

        let value = custom_coerce(&command, &message, "xl", "size", Some("size"))
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(
            value.as_json(),
            Some(&serde_json::json!({"raw": "xl", "argument": "size", "option": "size", "author": 30}))
        );
    }

    #[tokio::test]
    async fn test_argument_transform_beats_option_transform() {
        let command = paint();
        let message = message();

        let value = custom_coerce(&command, &message, "FINE", "tip", Some("brush"))
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(value.as_str(), Some("fine"));
    }

    #[tokio::test]
    async fn test_plain_arguments_have_no_custom_transform() {
        let command = paint();
        let message = message();

        assert!(custom_coerce(&command, &message, "3", "times", None).await.is_none());
        assert!(custom_coerce(&command, &message, "3", "unknown", None).await.is_none());
    }

    #[tokio::test]
    async fn test_custom_transform_runs_through_parser() {
        let command = paint();
        let message = message();
        let transformer = |raw: String, argument: String, option: Option<String>| {
            let command = command.clone();
            let message = message.clone();
            async move {
                match custom_coerce(&command, &message, &raw, &argument, option.as_deref()).await {
                    Some(result) => result,
                    None => Ok(Some(ArgValue::String(raw))),
                }
            }
        };

        let parsed = crate::args::parse("GREEN 2", &command.schema(), &transformer).await.unwrap();
        assert_eq!(parsed.arg("color").and_then(ArgValue::as_str), Some("Green"));
        assert_eq!(parsed.arg("times").and_then(ArgValue::as_str), Some("2"));

        // A rejected optional colour leaves the word for `times`
        let parsed = crate::args::parse("purple", &command.schema(), &transformer).await.unwrap();
        assert!(parsed.arg("color").is_none());
        assert_eq!(parsed.arg("times").and_then(ArgValue::as_str), Some("purple"));
    }

    #[test]
    fn test_user_mentions() {
        assert_eq!(parse_mention_id("123", MentionKind::User), Some(123));
        assert_eq!(parse_mention_id("<@123>", MentionKind::User), Some(123));
        assert_eq!(parse_mention_id("<@!123>", MentionKind::User), Some(123));
        assert_eq!(parse_mention_id("<@&123>", MentionKind::User), None);
        assert_eq!(parse_mention_id("@someone", MentionKind::User), None);
    }

    #[test]
    fn test_role_and_channel_mentions() {
        assert_eq!(parse_mention_id("<@&55>", MentionKind::Role), Some(55));
        assert_eq!(parse_mention_id("55", MentionKind::Role), Some(55));
        assert_eq!(parse_mention_id("<#77>", MentionKind::Channel), Some(77));
        assert_eq!(parse_mention_id("<#77>", MentionKind::Role), None);
        assert_eq!(parse_mention_id("<@77>", MentionKind::Channel), None);
    }

    #[test]
    fn test_mention_must_be_whole_value() {
        assert_eq!(parse_mention_id("<@123> extra", MentionKind::User), None);
        assert_eq!(parse_mention_id("12a", MentionKind::User), None);
    }

    #[test]
    fn test_coerce_numbers() {
        assert_eq!(coerce_scalar(ArgumentType::Number, "2.5").unwrap().unwrap().as_f64(), Some(2.5));
        let err = coerce_scalar(ArgumentType::Number, "abc").unwrap().unwrap_err();
        assert_eq!(err.to_string(), "`abc` is not a finite number.");
        assert!(coerce_scalar(ArgumentType::Number, "inf").unwrap().is_err());

        assert_eq!(coerce_scalar(ArgumentType::Integer, "-7").unwrap().unwrap().as_i64(), Some(-7));
        let err = coerce_scalar(ArgumentType::Integer, "1.5").unwrap().unwrap_err();
        assert_eq!(err.to_string(), "`1.5` is not a valid integer.");
    }

    #[test]
    fn test_coerce_booleans_and_strings() {
        assert_eq!(coerce_scalar(ArgumentType::Boolean, "Yes").unwrap().unwrap().as_bool(), Some(true));
        assert_eq!(coerce_scalar(ArgumentType::Boolean, "off").unwrap().unwrap().as_bool(), Some(false));
        assert!(coerce_scalar(ArgumentType::Boolean, "maybe").unwrap().is_err());

        let value = coerce_scalar(ArgumentType::String, "hello world").unwrap().unwrap();
        assert_eq!(value.as_str(), Some("hello world"));
    }

    #[test]
    fn test_entity_types_are_not_scalars() {
        for kind in [
            ArgumentType::User,
            ArgumentType::Member,
            ArgumentType::Userlike,
            ArgumentType::Role,
            ArgumentType::Channel,
            ArgumentType::Message,
        ] {
            assert!(coerce_scalar(kind, "1").is_none());
        }
    }
}
