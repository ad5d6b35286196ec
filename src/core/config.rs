//! Environment configuration
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.1.0: Add LOG_FORMAT and MENTION_PREFIX
//! - 1.0.0: Token, prefix, owners and registration targets

use anyhow::{Context, Result};

use super::logging::LogFormat;

/// Runtime configuration read from the environment (after `.env` is loaded)
#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    /// Text prefix for prefix commands; mention-only when unset
    pub prefix: Option<String>,
    /// Whether `<@bot>` also works as a prefix
    pub mention_prefix: bool,
    pub owners: Vec<u64>,
    /// Guilds to register application commands in
    pub register_guilds: Vec<u64>,
    pub register_global: bool,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let discord_token = lookup("DISCORD_TOKEN")
            .filter(|token| !token.trim().is_empty())
            .context("DISCORD_TOKEN must be set")?;

        let prefix = lookup("BOT_PREFIX").filter(|p| !p.is_empty());
        let mention_prefix = match lookup("MENTION_PREFIX") {
            Some(value) => parse_bool("MENTION_PREFIX", &value)?,
            None => true,
        };
        let register_global = match lookup("REGISTER_GLOBAL") {
            Some(value) => parse_bool("REGISTER_GLOBAL", &value)?,
            None => false,
        };

        let owners = parse_ids("BOT_OWNERS", lookup("BOT_OWNERS").as_deref())?;
        let register_guilds = parse_ids("REGISTER_GUILDS", lookup("REGISTER_GUILDS").as_deref())?;

        let log_level = lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string());
        let log_format = match lookup("LOG_FORMAT") {
            Some(value) => value.parse()?,
            None => LogFormat::Pretty,
        };

        Ok(Self {
            discord_token,
            prefix,
            mention_prefix,
            owners,
            register_guilds,
            register_global,
            log_level,
            log_format,
        })
    }

    /// True when application commands should be synced on ready
    pub fn wants_registration(&self) -> bool {
        self.register_global || !self.register_guilds.is_empty()
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(anyhow::anyhow!("{key} must be a boolean, got `{other}`")),
    }
}

fn parse_ids(key: &str, value: Option<&str>) -> Result<Vec<u64>> {
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| {
            id.parse::<u64>()
                .with_context(|| format!("{key} contains an invalid snowflake: {id}"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_token_is_required() {
        assert!(config_from(&[]).is_err());
        assert!(config_from(&[("DISCORD_TOKEN", "  ")]).is_err());
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[("DISCORD_TOKEN", "abc")]).unwrap();
        assert_eq!(config.prefix, None);
        assert!(config.mention_prefix);
        assert!(config.owners.is_empty());
        assert!(!config.register_global);
        assert!(!config.wants_registration());
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_lists_and_flags() {
        let config = config_from(&[
            ("DISCORD_TOKEN", "abc"),
            ("BOT_PREFIX", "!"),
            ("BOT_OWNERS", "1, 2,,3"),
            ("REGISTER_GUILDS", "42"),
            ("MENTION_PREFIX", "off"),
            ("LOG_FORMAT", "json"),
        ])
        .unwrap();

        assert_eq!(config.prefix.as_deref(), Some("!"));
        assert_eq!(config.owners, vec![1, 2, 3]);
        assert_eq!(config.register_guilds, vec![42]);
        assert!(!config.mention_prefix);
        assert!(config.wants_registration());
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(config_from(&[("DISCORD_TOKEN", "abc"), ("BOT_OWNERS", "me")]).is_err());
        assert!(config_from(&[("DISCORD_TOKEN", "abc"), ("REGISTER_GLOBAL", "maybe")]).is_err());
        assert!(config_from(&[("DISCORD_TOKEN", "abc"), ("LOG_FORMAT", "xml")]).is_err());
    }
}
