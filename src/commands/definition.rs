//! Declarative application command model
//!
//! Local declarations convert to serenity builders for registration and are
//! rebuilt from remote commands so both sides compare with `==`.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.3.0
//!
//! ## Changelog
//! - 1.1.0: Build from remote commands for registration diffing
//! - 1.0.0: Initial declaration types and builder conversion

use anyhow::Result;
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serenity::builder::{CreateApplicationCommand, CreateApplicationCommandOption};
use serenity::model::application::command::{Command, CommandOption, CommandOptionType, CommandType};

/// Discord limit for command and option names
pub const NAME_LIMIT: usize = 32;
/// Discord limit for command and option descriptions
pub const DESCRIPTION_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    ChatInput,
    User,
    Message,
}

impl CommandKind {
    pub fn to_serenity(self) -> CommandType {
        match self {
            CommandKind::ChatInput => CommandType::ChatInput,
            CommandKind::User => CommandType::User,
            CommandKind::Message => CommandType::Message,
        }
    }

    pub fn from_serenity(kind: CommandType) -> Option<Self> {
        match kind {
            CommandType::ChatInput => Some(CommandKind::ChatInput),
            CommandType::User => Some(CommandKind::User),
            CommandType::Message => Some(CommandKind::Message),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionKind {
    SubCommand,
    SubCommandGroup,
    String,
    Integer,
    Boolean,
    User,
    Channel,
    Role,
    Mentionable,
    Number,
    Attachment,
}

impl OptionKind {
    pub fn to_serenity(self) -> CommandOptionType {
        match self {
            OptionKind::SubCommand => CommandOptionType::SubCommand,
            OptionKind::SubCommandGroup => CommandOptionType::SubCommandGroup,
            OptionKind::String => CommandOptionType::String,
            OptionKind::Integer => CommandOptionType::Integer,
            OptionKind::Boolean => CommandOptionType::Boolean,
            OptionKind::User => CommandOptionType::User,
            OptionKind::Channel => CommandOptionType::Channel,
            OptionKind::Role => CommandOptionType::Role,
            OptionKind::Mentionable => CommandOptionType::Mentionable,
            OptionKind::Number => CommandOptionType::Number,
            OptionKind::Attachment => CommandOptionType::Attachment,
        }
    }

    pub fn from_serenity(kind: CommandOptionType) -> Option<Self> {
        Some(match kind {
            CommandOptionType::SubCommand => OptionKind::SubCommand,
            CommandOptionType::SubCommandGroup => OptionKind::SubCommandGroup,
            CommandOptionType::String => OptionKind::String,
            CommandOptionType::Integer => OptionKind::Integer,
            CommandOptionType::Boolean => OptionKind::Boolean,
            CommandOptionType::User => OptionKind::User,
            CommandOptionType::Channel => OptionKind::Channel,
            CommandOptionType::Role => OptionKind::Role,
            CommandOptionType::Mentionable => OptionKind::Mentionable,
            CommandOptionType::Number => OptionKind::Number,
            CommandOptionType::Attachment => OptionKind::Attachment,
            _ => return None,
        })
    }
}

/// A predefined choice for an option
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub name: String,
    pub value: Value,
}

/// A command option, sub-command or sub-command group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionDefinition {
    pub kind: OptionKind,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub autocomplete: bool,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub options: Vec<OptionDefinition>,
}

impl OptionDefinition {
    pub fn new(kind: OptionKind, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            description: description.into(),
            required: false,
            autocomplete: false,
            choices: Vec::new(),
            options: Vec::new(),
        }
    }

    pub fn subcommand(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(OptionKind::SubCommand, name, description)
    }

    pub fn group(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(OptionKind::SubCommandGroup, name, description)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn autocomplete(mut self) -> Self {
        self.autocomplete = true;
        self
    }

    pub fn choice(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.choices.push(Choice {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn option(mut self, option: OptionDefinition) -> Self {
        self.options.push(option);
        self
    }

    pub fn to_builder(&self) -> CreateApplicationCommandOption {
        let mut option = CreateApplicationCommandOption::default();
        option
            .kind(self.kind.to_serenity())
            .name(&self.name)
            .description(&self.description)
            .required(self.required);

        if self.autocomplete {
            option.set_autocomplete(true);
        }

        for choice in &self.choices {
            match &choice.value {
                Value::String(value) => {
                    option.add_string_choice(&choice.name, value);
                }
                Value::Number(number) if number.is_i64() => match int_choice(number) {
                    Some(value) => {
                        option.add_int_choice(&choice.name, value);
                    }
                    None => warn!(
                        "Skipping choice '{}' on option '{}': {number} does not fit in 32 bits",
                        choice.name, self.name
                    ),
                },
                Value::Number(number) => {
                    option.add_number_choice(&choice.name, number.as_f64().unwrap_or_default());
                }
                other => warn!(
                    "Skipping choice '{}' on option '{}': unsupported value {other}",
                    choice.name, self.name
                ),
            }
        }

        for sub in &self.options {
            option.add_sub_option(sub.to_builder());
        }

        option
    }

    fn from_remote(option: &CommandOption) -> Option<Self> {
        Some(Self {
            kind: OptionKind::from_serenity(option.kind)?,
            name: option.name.clone(),
            description: option.description.clone(),
            required: option.required,
            autocomplete: option.autocomplete,
            choices: option
                .choices
                .iter()
                .map(|choice| Choice {
                    name: choice.name.clone(),
                    value: choice.value.clone(),
                })
                .collect(),
            options: option.options.iter().filter_map(Self::from_remote).collect(),
        })
    }

    fn validate(&self, command: &str) -> Result<()> {
        validate_name(&self.name)
            .map_err(|e| anyhow::anyhow!("{e} (option of command '{command}')"))?;
        if self.description.is_empty() || self.description.len() > DESCRIPTION_LIMIT {
            return Err(anyhow::anyhow!(
                "Option '{}' on command '{command}' needs a description of 1-{DESCRIPTION_LIMIT} chars",
                self.name
            ));
        }
        if self.autocomplete && !self.choices.is_empty() {
            return Err(anyhow::anyhow!(
                "Option '{}' on command '{command}' cannot combine autocomplete with choices",
                self.name
            ));
        }
        if let Some(choice) = self.choices.iter().find(|choice| match &choice.value {
            Value::Number(number) => number.is_i64() && int_choice(number).is_none(),
            _ => false,
        }) {
            return Err(anyhow::anyhow!(
                "Choice '{}' of option '{}' on command '{command}' is outside the 32-bit integer range",
                choice.name,
                self.name
            ));
        }
        for sub in &self.options {
            sub.validate(command)?;
        }
        Ok(())
    }
}

/// Integer choice value as the builder accepts it
fn int_choice(number: &serde_json::Number) -> Option<i32> {
    number.as_i64().and_then(|value| i32::try_from(value).ok())
}

/// An application command as declared locally or fetched from Discord
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub kind: CommandKind,
    #[serde(default)]
    pub options: Vec<OptionDefinition>,
}

impl CommandSpec {
    pub fn slash(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind: CommandKind::ChatInput,
            options: Vec::new(),
        }
    }

    /// User context-menu command
    pub fn user(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            kind: CommandKind::User,
            options: Vec::new(),
        }
    }

    /// Message context-menu command
    pub fn message(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            kind: CommandKind::Message,
            options: Vec::new(),
        }
    }

    pub fn option(mut self, option: OptionDefinition) -> Self {
        self.options.push(option);
        self
    }

    pub fn find_option_mut(&mut self, name: &str, kind: OptionKind) -> Option<&mut OptionDefinition> {
        self.options
            .iter_mut()
            .find(|option| option.kind == kind && option.name == name)
    }

    pub fn to_builder(&self) -> CreateApplicationCommand {
        let mut command = CreateApplicationCommand::default();
        command.name(&self.name).kind(self.kind.to_serenity());

        if self.kind == CommandKind::ChatInput {
            command.description(&self.description);
        }

        for option in &self.options {
            command.add_option(option.to_builder());
        }

        command
    }

    /// Rebuild a declaration from a fetched command; `None` for unknown kinds
    pub fn from_remote(command: &Command) -> Option<Self> {
        Some(Self {
            name: command.name.clone(),
            description: command.description.clone(),
            kind: CommandKind::from_serenity(command.kind)?,
            options: command
                .options
                .iter()
                .filter_map(OptionDefinition::from_remote)
                .collect(),
        })
    }

    pub fn validate(&self) -> Result<()> {
        // Context menu names may contain spaces and capitals
        if self.kind == CommandKind::ChatInput {
            validate_name(&self.name)?;
            if self.description.is_empty() || self.description.len() > DESCRIPTION_LIMIT {
                return Err(anyhow::anyhow!(
                    "Command '{}' needs a description of 1-{DESCRIPTION_LIMIT} chars",
                    self.name
                ));
            }
        } else if self.name.is_empty() || self.name.chars().count() > NAME_LIMIT {
            return Err(anyhow::anyhow!(
                "Context menu name must be 1-{NAME_LIMIT} chars: {}",
                self.name
            ));
        }

        for option in &self.options {
            option.validate(&self.name)?;
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.chars().count() > NAME_LIMIT {
        return Err(anyhow::anyhow!(
            "Name must be 1-{NAME_LIMIT} chars: {name}"
        ));
    }
    if !name
        .chars()
        .all(|c| c.is_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
    {
        return Err(anyhow::anyhow!("Name must be lowercase: {name}"));
    }
    Ok(())
}
