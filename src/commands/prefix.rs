//! Prefix (text) command declarations and message splitting
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.2.0
//!
//! ## Changelog
//! - 1.2.0: Custom transforms on arguments and options
//! - 1.1.0: Regex prefixes and usage lines
//! - 1.0.0: Literal and mention prefixes, argument declarations

use regex::Regex;
use serenity::model::id::UserId;

use super::access::{CommandFlags, PermissionRequirements};
use super::transform::{ArgValue, ArgumentType, CustomTransform};
use crate::args::{ArgumentSpec, OptionSpec, ParseResult, Schema};

#[derive(Debug, Clone)]
enum PrefixPattern {
    Literal(String),
    Pattern(Regex),
}

/// How messages address the bot
#[derive(Debug, Clone)]
pub struct Prefix {
    pattern: Option<PrefixPattern>,
    mention: bool,
}

impl Prefix {
    /// `!ping`-style prefix; the bot mention is accepted as well
    pub fn literal(prefix: impl Into<String>) -> Self {
        Self {
            pattern: Some(PrefixPattern::Literal(prefix.into())),
            mention: true,
        }
    }

    /// Prefix matched by a regex at the start of the message
    pub fn regex(pattern: Regex) -> Self {
        Self {
            pattern: Some(PrefixPattern::Pattern(pattern)),
            mention: true,
        }
    }

    pub fn mention_only() -> Self {
        Self {
            pattern: None,
            mention: true,
        }
    }

    pub fn with_mention(mut self, mention: bool) -> Self {
        self.mention = mention;
        self
    }

    /// Strip the prefix and return the remaining text, left-trimmed
    pub fn strip<'a>(&self, content: &'a str, bot_id: UserId) -> Option<&'a str> {
        if self.mention {
            for mention in [format!("<@{}>", bot_id.0), format!("<@!{}>", bot_id.0)] {
                if let Some(rest) = content.strip_prefix(mention.as_str()) {
                    return Some(rest.trim_start());
                }
            }
        }

        let rest = match self.pattern.as_ref()? {
            PrefixPattern::Literal(prefix) => content.strip_prefix(prefix.as_str())?,
            PrefixPattern::Pattern(pattern) => {
                let found = pattern.find(content).filter(|m| m.start() == 0)?;
                &content[found.end()..]
            }
        };
        Some(rest.trim_start())
    }
}

/// Split stripped content into command name and argument text
///
/// The name ends at the first whitespace; the run of whitespace after it is
/// dropped. Returns `None` when there is no name.
pub fn split_invocation(rest: &str) -> Option<(&str, &str)> {
    let rest = rest.trim_start();
    if rest.is_empty() {
        return None;
    }
    match rest.find(char::is_whitespace) {
        Some(end) => Some((&rest[..end], rest[end..].trim_start())),
        None => Some((rest, "")),
    }
}

/// A positional argument of a prefix command
#[derive(Debug, Clone)]
pub struct PrefixArgument {
    pub name: String,
    pub description: Option<String>,
    pub kind: ArgumentType,
    pub required: bool,
    pub transform: Option<CustomTransform>,
}

impl PrefixArgument {
    pub fn new(name: impl Into<String>, kind: ArgumentType) -> Self {
        Self {
            name: name.into(),
            description: None,
            kind,
            required: false,
            transform: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Coerce this argument with `transform` instead of its type
    pub fn transform(mut self, transform: CustomTransform) -> Self {
        self.transform = Some(transform);
        self
    }

    fn to_spec(&self) -> ArgumentSpec {
        let spec = ArgumentSpec::new(&self.name);
        if self.required {
            spec.required()
        } else {
            spec
        }
    }

    fn usage(&self) -> String {
        if self.required {
            format!("<{}>", self.name)
        } else {
            format!("[{}]", self.name)
        }
    }
}

/// A `--name` / `-n` option of a prefix command
#[derive(Debug, Clone)]
pub struct PrefixOption {
    pub name: String,
    pub short: Option<char>,
    pub description: Option<String>,
    pub required: bool,
    pub args: Vec<PrefixArgument>,
    /// Fallback for nested arguments without their own transform
    pub transform: Option<CustomTransform>,
}

impl PrefixOption {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            short: None,
            description: None,
            required: false,
            args: Vec::new(),
            transform: None,
        }
    }

    pub fn short(mut self, letter: char) -> Self {
        self.short = Some(letter);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn arg(mut self, arg: PrefixArgument) -> Self {
        self.args.push(arg);
        self
    }

    pub fn transform(mut self, transform: CustomTransform) -> Self {
        self.transform = Some(transform);
        self
    }

    fn to_spec(&self) -> OptionSpec {
        let mut spec = OptionSpec::new(&self.name);
        spec.short = self.short;
        spec.required = self.required;
        spec.args = self.args.iter().map(PrefixArgument::to_spec).collect();
        spec
    }

    fn usage(&self) -> String {
        let mut flag = format!("--{}", self.name);
        if let Some(letter) = self.short {
            flag = format!("{flag}|-{letter}");
        }
        for arg in &self.args {
            flag = format!("{flag} {}", arg.usage());
        }
        if self.required {
            flag
        } else {
            format!("[{flag}]")
        }
    }
}

/// Declaration of a prefix command
#[derive(Debug, Clone)]
pub struct PrefixCommand {
    pub name: String,
    pub aliases: Vec<String>,
    pub description: Option<String>,
    pub flags: CommandFlags,
    pub permissions: PermissionRequirements,
    pub args: Vec<PrefixArgument>,
    pub options: Vec<PrefixOption>,
}

impl PrefixCommand {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            description: None,
            flags: CommandFlags::default(),
            permissions: PermissionRequirements::default(),
            args: Vec::new(),
            options: Vec::new(),
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn flags(mut self, flags: CommandFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn permissions(mut self, permissions: PermissionRequirements) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn arg(mut self, arg: PrefixArgument) -> Self {
        self.args.push(arg);
        self
    }

    pub fn option(mut self, option: PrefixOption) -> Self {
        self.options.push(option);
        self
    }

    /// Names the command answers to, primary name first
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    /// False when the handler should get plain whitespace-split words
    pub fn takes_arguments(&self) -> bool {
        !self.args.is_empty() || !self.options.is_empty()
    }

    pub fn schema(&self) -> Schema {
        Schema {
            args: self.args.iter().map(PrefixArgument::to_spec).collect(),
            options: self.options.iter().map(PrefixOption::to_spec).collect(),
        }
    }

    fn find_option(&self, name: &str) -> Option<&PrefixOption> {
        self.options.iter().find(|o| o.name == name)
    }

    /// Declaration of `argument`, inside `option` when given
    pub fn declared_argument(&self, argument: &str, option: Option<&str>) -> Option<&PrefixArgument> {
        let args = match option {
            Some(option) => &self.find_option(option)?.args,
            None => &self.args,
        };
        args.iter().find(|a| a.name == argument)
    }

    pub fn argument_type(&self, argument: &str, option: Option<&str>) -> Option<ArgumentType> {
        self.declared_argument(argument, option).map(|a| a.kind)
    }

    /// The argument's own transform, else its option's
    pub fn custom_transform(&self, argument: &str, option: Option<&str>) -> Option<&CustomTransform> {
        let declared = self.declared_argument(argument, option)?;
        declared
            .transform
            .as_ref()
            .or_else(|| option.and_then(|name| self.find_option(name)?.transform.as_ref()))
    }

    /// One-line usage such as `roll <sides> [--count|-c <count>]`
    pub fn usage(&self) -> String {
        let mut parts = vec![self.name.clone()];
        parts.extend(self.args.iter().map(PrefixArgument::usage));
        parts.extend(self.options.iter().map(PrefixOption::usage));
        parts.join(" ")
    }
}

/// Arguments handed to a prefix handler
#[derive(Debug, Clone)]
pub enum PrefixArgs {
    /// Raw text split on whitespace, for commands without declarations
    Words(Vec<String>),
    Parsed(ParseResult<ArgValue>),
}

/// A resolved prefix invocation
#[derive(Debug, Clone)]
pub struct PrefixInvocation {
    /// Argument text after the command name
    pub raw: String,
    pub args: PrefixArgs,
}

impl PrefixArgs {
    pub fn words(raw: &str) -> Self {
        PrefixArgs::Words(raw.split_whitespace().map(str::to_string).collect())
    }

    pub fn parsed(&self) -> Option<&ParseResult<ArgValue>> {
        match self {
            PrefixArgs::Parsed(result) => Some(result),
            PrefixArgs::Words(_) => None,
        }
    }
}
