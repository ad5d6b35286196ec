//! Declarations consumed by the argument parser
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use std::collections::HashMap;

/// A positional argument, matched in declaration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentSpec {
    pub name: String,
    pub required: bool,
}

impl ArgumentSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// A named option, introduced by `--name` or by its letter inside `-xyz`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionSpec {
    pub name: String,
    pub short: Option<char>,
    pub required: bool,
    pub args: Vec<ArgumentSpec>,
}

impl OptionSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            short: None,
            required: false,
            args: Vec::new(),
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

    pub fn arg(mut self, arg: ArgumentSpec) -> Self {
        self.args.push(arg);
        self
    }

    /// True when the option's value collapses to its single argument
    pub fn collapses(&self) -> bool {
        matches!(self.args.as_slice(), [only] if only.name == self.name)
    }
}

/// Positional arguments and options accepted by one command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    pub args: Vec<ArgumentSpec>,
    pub options: Vec<OptionSpec>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg(mut self, arg: ArgumentSpec) -> Self {
        self.args.push(arg);
        self
    }

    pub fn option(mut self, option: OptionSpec) -> Self {
        self.options.push(option);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty() && self.options.is_empty()
    }

    pub(crate) fn option_by_short(&self, letter: char) -> Option<&OptionSpec> {
        self.options.iter().find(|opt| opt.short == Some(letter))
    }

    pub(crate) fn option_by_name(&self, name: &str) -> Option<&OptionSpec> {
        self.options.iter().find(|opt| opt.name == name)
    }
}

/// Resolved value of an option
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue<T> {
    /// Option declared without arguments
    Flag,
    /// Collapsed single-argument option
    Value(T),
    /// Nested argument values keyed by argument name; empty when a
    /// collapsing option produced no value
    Args(HashMap<String, T>),
}

impl<T> OptionValue<T> {
    pub fn as_value(&self) -> Option<&T> {
        match self {
            OptionValue::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn get(&self, argument: &str) -> Option<&T> {
        match self {
            OptionValue::Args(args) => args.get(argument),
            _ => None,
        }
    }
}

/// Output of a successful parse
#[derive(Debug, Clone, PartialEq)]
pub struct ParseResult<T> {
    pub args: HashMap<String, T>,
    pub options: HashMap<String, OptionValue<T>>,
    pub rest: Option<String>,
}

impl<T> Default for ParseResult<T> {
    fn default() -> Self {
        Self {
            args: HashMap::new(),
            options: HashMap::new(),
            rest: None,
        }
    }
}

impl<T> ParseResult<T> {
    pub fn arg(&self, name: &str) -> Option<&T> {
        self.args.get(name)
    }

    pub fn option(&self, name: &str) -> Option<&OptionValue<T>> {
        self.options.get(name)
    }

    pub fn has_option(&self, name: &str) -> bool {
        self.options.contains_key(name)
    }
}
