//! Shared context for command handlers
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 2.0.0: Owners and component registry replace service handles
//! - 1.0.0: Initial implementation with core shared state

use serenity::model::id::UserId;

use crate::components::ComponentRegistry;

/// Shared state handed to every handler
///
/// Cloning is cheap: the component registry is reference-counted.
#[derive(Clone)]
pub struct CommandContext {
    pub owners: Vec<UserId>,
    pub components: ComponentRegistry,
    pub start_time: std::time::Instant,
}

impl CommandContext {
    pub fn new(owners: Vec<UserId>) -> Self {
        Self {
            owners,
            components: ComponentRegistry::new(),
            start_time: std::time::Instant::now(),
        }
    }

    pub fn is_owner(&self, user_id: UserId) -> bool {
        self.owners.contains(&user_id)
    }

    /// Seconds since the context was created
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_context_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<CommandContext>();
    }

    #[test]
    fn test_is_owner() {
        let ctx = CommandContext::new(vec![UserId(1), UserId(2)]);
        assert!(ctx.is_owner(UserId(2)));
        assert!(!ctx.is_owner(UserId(3)));
    }

    #[test]
    fn test_clones_share_components() {
        let ctx = CommandContext::new(Vec::new());
        let copy = ctx.clone();
        let id = ctx.components.register_fn(None, |_ctx, _serenity_ctx, _component| async { anyhow::Ok(()) });
        assert!(copy.components.get(&id).is_some());
    }
}
