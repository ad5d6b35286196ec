//! Helpers for reading interaction options
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.1.0: Subcommand labels, focused option and nested option lookup
//! - 1.0.0: Typed getters for string, integer, number, boolean and snowflake options

use serenity::model::application::command::CommandOptionType;
use serenity::model::application::interaction::application_command::CommandDataOption;

fn find<'a>(options: &'a [CommandDataOption], name: &str) -> Option<&'a serde_json::Value> {
    options
        .iter()
        .find(|opt| opt.name == name)
        .and_then(|opt| opt.value.as_ref())
}

pub fn get_string_option(options: &[CommandDataOption], name: &str) -> Option<String> {
    find(options, name)
        .and_then(|val| val.as_str())
        .map(|s| s.to_string())
}

pub fn get_integer_option(options: &[CommandDataOption], name: &str) -> Option<i64> {
    find(options, name).and_then(|val| val.as_i64())
}

pub fn get_number_option(options: &[CommandDataOption], name: &str) -> Option<f64> {
    find(options, name).and_then(|val| val.as_f64())
}

pub fn get_bool_option(options: &[CommandDataOption], name: &str) -> Option<bool> {
    find(options, name).and_then(|val| val.as_bool())
}

/// User, role, channel or mentionable option as a raw snowflake
pub fn get_snowflake_option(options: &[CommandDataOption], name: &str) -> Option<u64> {
    find(options, name)
        .and_then(|val| val.as_str())
        .and_then(|s| s.parse().ok())
}

/// Label of the invoked subcommand: `sub` or `group.sub`
pub fn subcommand_label(options: &[CommandDataOption]) -> Option<String> {
    let first = options.first()?;
    match first.kind {
        CommandOptionType::SubCommand => Some(first.name.clone()),
        CommandOptionType::SubCommandGroup => {
            let sub = first.options.first()?;
            Some(format!("{}.{}", first.name, sub.name))
        }
        _ => None,
    }
}

/// Options passed to the invoked subcommand, or the top level when there is none
pub fn leaf_options(options: &[CommandDataOption]) -> &[CommandDataOption] {
    match options.first() {
        Some(first)
            if matches!(
                first.kind,
                CommandOptionType::SubCommand | CommandOptionType::SubCommandGroup
            ) =>
        {
            leaf_options(&first.options)
        }
        _ => options,
    }
}

/// Name of the option the user is typing into, searched depth-first
pub fn focused_option(options: &[CommandDataOption]) -> Option<&str> {
    options.iter().find_map(|option| {
        if option.focused {
            Some(option.name.as_str())
        } else {
            focused_option(&option.options)
        }
    })
}
