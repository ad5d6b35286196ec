//! Invocation access checks
//!
//! Declarative flags and permission requirements are checked before a
//! handler runs; composable [`Check`]s back the framework hooks.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.2.0
//!
//! ## Changelog
//! - 1.1.0: Check combinators and built-in predicates
//! - 1.0.0: Owner/guild flags and permission requirements

use async_trait::async_trait;
use serenity::model::id::{GuildId, UserId};
use serenity::model::permissions::Permissions;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandFlags {
    pub owner_only: bool,
    pub guild_only: bool,
}

impl CommandFlags {
    pub fn owner_only() -> Self {
        Self {
            owner_only: true,
            ..Self::default()
        }
    }

    pub fn guild_only() -> Self {
        Self {
            guild_only: true,
            ..Self::default()
        }
    }
}

/// Permissions the invoking member and the bot must hold in guilds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PermissionRequirements {
    pub user: Permissions,
    pub bot: Permissions,
}

impl PermissionRequirements {
    pub fn user(permissions: Permissions) -> Self {
        Self {
            user: permissions,
            bot: Permissions::empty(),
        }
    }

    pub fn bot(mut self, permissions: Permissions) -> Self {
        self.bot = permissions;
        self
    }
}

/// What is known about a single command invocation
#[derive(Debug, Clone)]
pub struct Invocation {
    pub command: String,
    pub user_id: UserId,
    pub guild_id: Option<GuildId>,
    pub is_owner: bool,
    /// Effective permissions of the invoking member, when in a guild
    pub member_permissions: Option<Permissions>,
    /// Effective permissions of the bot, when in a guild
    pub bot_permissions: Option<Permissions>,
}

impl Invocation {
    pub fn in_guild(&self) -> bool {
        self.guild_id.is_some()
    }
}

/// Reason an invocation was refused; `Display` is the reply text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessDenied {
    #[error("This command can only be used in guilds.")]
    GuildOnly,
    #[error("This command can only be used by the bot owner(s)")]
    OwnerOnly,
    #[error("You are missing permissions:\n{}", permission_lines(.0))]
    MissingUserPermissions(Permissions),
    #[error("I am missing permissions:\n{}", permission_lines(.0))]
    MissingBotPermissions(Permissions),
}

fn permission_lines(permissions: &Permissions) -> String {
    permissions
        .get_permission_names()
        .iter()
        .map(|name| format!("- {name}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Evaluate flags, then user permissions, then bot permissions
///
/// Permission requirements only apply inside guilds. Unknown permissions
/// count as none held.
pub fn check_access(
    flags: CommandFlags,
    requirements: PermissionRequirements,
    invocation: &Invocation,
) -> Result<(), AccessDenied> {
    if flags.guild_only && !invocation.in_guild() {
        return Err(AccessDenied::GuildOnly);
    }
    if flags.owner_only && !invocation.is_owner {
        return Err(AccessDenied::OwnerOnly);
    }
    if !invocation.in_guild() {
        return Ok(());
    }

    let missing = requirements.user - invocation.member_permissions.unwrap_or_else(Permissions::empty);
    if !missing.is_empty() {
        return Err(AccessDenied::MissingUserPermissions(missing));
    }

    let missing = requirements.bot - invocation.bot_permissions.unwrap_or_else(Permissions::empty);
    if !missing.is_empty() {
        return Err(AccessDenied::MissingBotPermissions(missing));
    }

    Ok(())
}

/// A predicate over an invocation
#[async_trait]
pub trait Check: Send + Sync {
    async fn allows(&self, invocation: &Invocation) -> bool;
}

pub type BoxedCheck = Arc<dyn Check>;

struct FnCheck<F>(F);

#[async_trait]
impl<F> Check for FnCheck<F>
where
    F: Fn(&Invocation) -> bool + Send + Sync,
{
    async fn allows(&self, invocation: &Invocation) -> bool {
        (self.0)(invocation)
    }
}

/// Wrap a synchronous predicate
pub fn check_fn<F>(predicate: F) -> BoxedCheck
where
    F: Fn(&Invocation) -> bool + Send + Sync + 'static,
{
    Arc::new(FnCheck(predicate))
}

struct All(Vec<BoxedCheck>);

#[async_trait]
impl Check for All {
    async fn allows(&self, invocation: &Invocation) -> bool {
        for check in &self.0 {
            if !check.allows(invocation).await {
                return false;
            }
        }
        true
    }
}

struct Any(Vec<BoxedCheck>);

#[async_trait]
impl Check for Any {
    async fn allows(&self, invocation: &Invocation) -> bool {
        for check in &self.0 {
            if check.allows(invocation).await {
                return true;
            }
        }
        false
    }
}

struct Not(BoxedCheck);

#[async_trait]
impl Check for Not {
    async fn allows(&self, invocation: &Invocation) -> bool {
        !self.0.allows(invocation).await
    }
}

/// Passes when every check passes; short-circuits in order
pub fn all(checks: Vec<BoxedCheck>) -> BoxedCheck {
    Arc::new(All(checks))
}

/// Passes when at least one check passes; short-circuits in order
pub fn any(checks: Vec<BoxedCheck>) -> BoxedCheck {
    Arc::new(Any(checks))
}

pub fn not(check: BoxedCheck) -> BoxedCheck {
    Arc::new(Not(check))
}

pub fn guild_only() -> BoxedCheck {
    check_fn(Invocation::in_guild)
}

pub fn owner_only() -> BoxedCheck {
    check_fn(|invocation| invocation.is_owner)
}

/// The invoking member holds every permission in `permissions`
pub fn has_permissions(permissions: Permissions) -> BoxedCheck {
    check_fn(move |invocation| {
        invocation
            .member_permissions
            .map_or(false, |held| held.contains(permissions))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invocation(guild: bool, owner: bool, member: Permissions, bot: Permissions) -> Invocation {
        Invocation {
            command: "test".to_string(),
            user_id: UserId(7),
            guild_id: guild.then_some(GuildId(1)),
            is_owner: owner,
            member_permissions: guild.then_some(member),
            bot_permissions: guild.then_some(bot),
        }
    }

    #[test]
    fn test_no_requirements_allow_everything() {
        let inv = invocation(false, false, Permissions::empty(), Permissions::empty());
        assert_eq!(check_access(CommandFlags::default(), PermissionRequirements::default(), &inv), Ok(()));
    }

    #[test]
    fn test_guild_only_in_dm() {
        let inv = invocation(false, true, Permissions::empty(), Permissions::empty());
        let denied = check_access(CommandFlags::guild_only(), PermissionRequirements::default(), &inv).unwrap_err();
        assert_eq!(denied, AccessDenied::GuildOnly);
        assert_eq!(denied.to_string(), "This command can only be used in guilds.");
    }

    #[test]
    fn test_owner_only() {
        let stranger = invocation(true, false, Permissions::all(), Permissions::all());
        let owner = invocation(true, true, Permissions::empty(), Permissions::empty());

        assert_eq!(
            check_access(CommandFlags::owner_only(), PermissionRequirements::default(), &stranger),
            Err(AccessDenied::OwnerOnly)
        );
        assert!(check_access(CommandFlags::owner_only(), PermissionRequirements::default(), &owner).is_ok());
    }

    #[test]
    fn test_missing_user_permissions_lists_only_missing() {
        let inv = invocation(true, false, Permissions::SEND_MESSAGES, Permissions::all());
        let requirements = PermissionRequirements::user(Permissions::SEND_MESSAGES | Permissions::KICK_MEMBERS);

        let denied = check_access(CommandFlags::default(), requirements, &inv).unwrap_err();
        assert_eq!(denied, AccessDenied::MissingUserPermissions(Permissions::KICK_MEMBERS));
        assert!(denied.to_string().starts_with("You are missing permissions:\n"));
        assert!(denied.to_string().contains("Kick Members"));
        assert!(!denied.to_string().contains("Send Messages"));
    }

    #[test]
    fn test_missing_bot_permissions() {
        let inv = invocation(true, false, Permissions::all(), Permissions::empty());
        let requirements = PermissionRequirements::default().bot(Permissions::BAN_MEMBERS);

        let denied = check_access(CommandFlags::default(), requirements, &inv).unwrap_err();
        assert_eq!(denied, AccessDenied::MissingBotPermissions(Permissions::BAN_MEMBERS));
        assert!(denied.to_string().starts_with("I am missing permissions:\n"));
    }

    #[test]
    fn test_permissions_ignored_outside_guilds() {
        let inv = invocation(false, false, Permissions::empty(), Permissions::empty());
        let requirements = PermissionRequirements::user(Permissions::ADMINISTRATOR);
        assert!(check_access(CommandFlags::default(), requirements, &inv).is_ok());
    }

    #[tokio::test]
    async fn test_combinators() {
        let dm = invocation(false, true, Permissions::empty(), Permissions::empty());
        let guild = invocation(true, false, Permissions::MANAGE_GUILD, Permissions::empty());

        let both = all(vec![guild_only(), owner_only()]);
        assert!(!both.allows(&dm).await);
        assert!(!both.allows(&guild).await);

        let either = any(vec![guild_only(), owner_only()]);
        assert!(either.allows(&dm).await);
        assert!(either.allows(&guild).await);

        assert!(not(guild_only()).allows(&dm).await);
        assert!(all(Vec::new()).allows(&dm).await);
        assert!(!any(Vec::new()).allows(&dm).await);
    }

    #[tokio::test]
    async fn test_has_permissions() {
        let guild = invocation(true, false, Permissions::MANAGE_GUILD, Permissions::empty());
        let dm = invocation(false, false, Permissions::empty(), Permissions::empty());

        assert!(has_permissions(Permissions::MANAGE_GUILD).allows(&guild).await);
        assert!(!has_permissions(Permissions::BAN_MEMBERS).allows(&guild).await);
        assert!(!has_permissions(Permissions::MANAGE_GUILD).allows(&dm).await);
    }

    #[tokio::test]
    async fn test_custom_check() {
        let named = check_fn(|invocation| invocation.command == "test");
        let inv = invocation(true, false, Permissions::empty(), Permissions::empty());
        assert!(named.allows(&inv).await);
    }
}
