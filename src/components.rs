//! # Message Components
//!
//! Buttons and select menus routed to handlers by custom id.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.2.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 2.0.0: Concurrent registry with generated custom ids
//! - 1.0.0: Prefix-matched custom id routing

use anyhow::Result;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rand::Rng;
use serenity::builder::CreateButton;
use serenity::model::application::component::ButtonStyle;
use serenity::model::application::interaction::message_component::MessageComponentInteraction;
use serenity::prelude::Context;
use std::future::Future;
use std::sync::Arc;

use crate::commands::{CommandContext, ComponentHandler};

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_LENGTH: usize = 6;

/// Button whose clicks route to the handler registered under `custom_id`
pub fn button(custom_id: &str, label: &str, style: ButtonStyle) -> CreateButton {
    let mut button = CreateButton::default();
    button.custom_id(custom_id).label(label).style(style);
    button
}

/// Random base-36 custom id
fn random_id() -> String {
    let mut rng = rand::rng();
    (0..ID_LENGTH)
        .map(|_| ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

struct FnComponent<F>(F);

#[async_trait]
impl<F, Fut> ComponentHandler for FnComponent<F>
where
    F: Fn(Arc<CommandContext>, Context, MessageComponentInteraction) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    async fn handle(
        &self,
        ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        component: &MessageComponentInteraction,
    ) -> Result<()> {
        (self.0)(ctx, serenity_ctx.clone(), component.clone()).await
    }
}

/// Component handlers keyed by custom id
///
/// Clones share the same map.
#[derive(Clone, Default)]
pub struct ComponentRegistry {
    handlers: Arc<DashMap<String, Arc<dyn ComponentHandler>>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a handler and return its custom id
    ///
    /// A given id replaces any previous handler; without one a fresh 6-char
    /// id is generated.
    pub fn register(&self, custom_id: Option<&str>, handler: Arc<dyn ComponentHandler>) -> String {
        if let Some(id) = custom_id {
            self.handlers.insert(id.to_string(), handler);
            return id.to_string();
        }

        loop {
            let id = random_id();
            if let Entry::Vacant(slot) = self.handlers.entry(id.clone()) {
                slot.insert(handler);
                return id;
            }
        }
    }

    /// Register a closure as a handler
    pub fn register_fn<F, Fut>(&self, custom_id: Option<&str>, handler: F) -> String
    where
        F: Fn(Arc<CommandContext>, Context, MessageComponentInteraction) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.register(custom_id, Arc::new(FnComponent(handler)))
    }

    /// Register `handler` under a fresh id and build a button wired to it
    ///
    /// The handler stays registered until [`remove`](Self::remove) is called
    /// with the button's custom id. Buttons sent on every invocation of a
    /// command should instead share one handler registered at startup under
    /// a fixed id and be built with [`button`].
    pub fn button(
        &self,
        label: &str,
        style: ButtonStyle,
        handler: Arc<dyn ComponentHandler>,
    ) -> CreateButton {
        let id = self.register(None, handler);
        button(&id, label, style)
    }

    pub fn get(&self, custom_id: &str) -> Option<Arc<dyn ComponentHandler>> {
        self.handlers.get(custom_id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn remove(&self, custom_id: &str) -> bool {
        self.handlers.remove(custom_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(registry: &ComponentRegistry, id: Option<&str>) -> String {
        registry.register_fn(id, |_ctx, _serenity_ctx, _component| async { anyhow::Ok(()) })
    }

    #[test]
    fn test_generated_ids_are_base36() {
        for _ in 0..50 {
            let id = random_id();
            assert_eq!(id.len(), ID_LENGTH);
            assert!(id.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
        }
    }

    #[test]
    fn test_register_generates_unique_ids() {
        let registry = ComponentRegistry::new();
        let ids: std::collections::HashSet<String> = (0..200).map(|_| noop(&registry, None)).collect();
        assert_eq!(ids.len(), 200);
        assert_eq!(registry.len(), 200);
    }

    #[test]
    fn test_register_with_explicit_id() {
        let registry = ComponentRegistry::new();
        assert_eq!(noop(&registry, Some("confirm")), "confirm");
        assert_eq!(noop(&registry, Some("confirm")), "confirm");
        assert_eq!(registry.len(), 1);
        assert!(registry.get("confirm").is_some());
        assert!(registry.get("cancel").is_none());
    }

    #[test]
    fn test_remove() {
        let registry = ComponentRegistry::new();
        let id = noop(&registry, None);
        assert!(registry.remove(&id));
        assert!(!registry.remove(&id));
        assert!(registry.is_empty());
    }

    struct Noop;

    #[async_trait]
    impl ComponentHandler for Noop {
        async fn handle(
            &self,
            _ctx: Arc<CommandContext>,
            _serenity_ctx: &Context,
            _component: &MessageComponentInteraction,
        ) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_fixed_id_button_does_not_grow_registry() {
        let registry = ComponentRegistry::new();
        registry.register(Some("ping_again"), Arc::new(Noop));

        for _ in 0..10 {
            let built = button("ping_again", "Again", ButtonStyle::Secondary);
            assert_eq!(built.0.get("custom_id").and_then(|v| v.as_str()), Some("ping_again"));
        }
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_button_carries_registered_id() {
        let registry = ComponentRegistry::new();
        let button = registry.button("Again", ButtonStyle::Primary, Arc::new(Noop));

        let id = button.0.get("custom_id").and_then(|v| v.as_str()).unwrap().to_string();
        assert!(registry.get(&id).is_some());
        assert_eq!(button.0.get("label").and_then(|v| v.as_str()), Some("Again"));
    }
}
