//! # Event Listeners
//!
//! User listeners for gateway events, fanned out by the framework after its
//! own routing.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.4.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.0.0: Repeating and one-shot listeners

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, error};
use serenity::model::application::interaction::Interaction;
use serenity::model::channel::{Message, Reaction};
use serenity::model::event::MessageUpdateEvent;
use serenity::model::gateway::Ready;
use serenity::model::guild::{Guild, Member};
use serenity::model::id::{ChannelId, GuildId, MessageId};
use serenity::model::user::User;
use serenity::prelude::Context;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::commands::CommandContext;

/// Gateway events a listener can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Ready,
    Message,
    MessageUpdate,
    MessageDelete,
    ReactionAdd,
    ReactionRemove,
    GuildCreate,
    GuildMemberAddition,
    GuildMemberRemoval,
    InteractionCreate,
}

/// Payload handed to listeners
#[derive(Debug, Clone)]
pub enum Event {
    Ready(Box<Ready>),
    Message(Box<Message>),
    MessageUpdate(Box<MessageUpdateEvent>),
    MessageDelete {
        channel_id: ChannelId,
        message_id: MessageId,
        guild_id: Option<GuildId>,
    },
    ReactionAdd(Box<Reaction>),
    ReactionRemove(Box<Reaction>),
    GuildCreate {
        guild: Box<Guild>,
        is_new: bool,
    },
    GuildMemberAddition(Box<Member>),
    GuildMemberRemoval {
        guild_id: GuildId,
        user: Box<User>,
    },
    InteractionCreate(Box<Interaction>),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Ready(_) => EventKind::Ready,
            Event::Message(_) => EventKind::Message,
            Event::MessageUpdate(_) => EventKind::MessageUpdate,
            Event::MessageDelete { .. } => EventKind::MessageDelete,
            Event::ReactionAdd(_) => EventKind::ReactionAdd,
            Event::ReactionRemove(_) => EventKind::ReactionRemove,
            Event::GuildCreate { .. } => EventKind::GuildCreate,
            Event::GuildMemberAddition(_) => EventKind::GuildMemberAddition,
            Event::GuildMemberRemoval { .. } => EventKind::GuildMemberRemoval,
            Event::InteractionCreate(_) => EventKind::InteractionCreate,
        }
    }
}

/// Handler for one kind of gateway event
#[async_trait]
pub trait Listener: Send + Sync {
    fn event(&self) -> EventKind;

    /// Name used in logs
    fn name(&self) -> &str {
        "listener"
    }

    /// False to run only for the first matching event
    fn repeat(&self) -> bool {
        true
    }

    async fn handle(&self, ctx: Arc<CommandContext>, serenity_ctx: &Context, event: &Event) -> Result<()>;
}

struct ListenerEntry {
    listener: Arc<dyn Listener>,
    fired: AtomicBool,
}

/// Registered listeners in registration order
#[derive(Default)]
pub struct EventManager {
    listeners: Vec<ListenerEntry>,
}

impl EventManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, listener: Arc<dyn Listener>) {
        debug!("Registering {} for {:?}", listener.name(), listener.event());
        self.listeners.push(ListenerEntry {
            listener,
            fired: AtomicBool::new(false),
        });
    }

    /// Listeners to run for `kind`
    ///
    /// One-shot listeners are claimed here, so each is returned at most once
    /// even when events arrive concurrently.
    pub fn due(&self, kind: EventKind) -> Vec<Arc<dyn Listener>> {
        self.listeners
            .iter()
            .filter(|entry| entry.listener.event() == kind)
            .filter(|entry| {
                entry.listener.repeat()
                    || entry
                        .fired
                        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
            })
            .map(|entry| Arc::clone(&entry.listener))
            .collect()
    }

    /// Run every due listener in order; errors are logged and do not stop
    /// later listeners
    pub async fn dispatch(&self, ctx: Arc<CommandContext>, serenity_ctx: &Context, event: &Event) {
        for listener in self.due(event.kind()) {
            if let Err(e) = listener.handle(Arc::clone(&ctx), serenity_ctx, event).await {
                error!("Listener {} failed on {:?}: {e:#}", listener.name(), event.kind());
            }
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stub {
        kind: EventKind,
        repeat: bool,
    }

    #[async_trait]
    impl Listener for Stub {
        fn event(&self) -> EventKind {
            self.kind
        }

        fn repeat(&self) -> bool {
            self.repeat
        }

        async fn handle(&self, _ctx: Arc<CommandContext>, _serenity_ctx: &Context, _event: &Event) -> Result<()> {
            Ok(())
        }
    }

    fn listener(kind: EventKind, repeat: bool) -> Arc<dyn Listener> {
        Arc::new(Stub { kind, repeat })
    }

    #[test]
    fn test_due_filters_by_kind() {
        let mut events = EventManager::new();
        events.add(listener(EventKind::Message, true));
        events.add(listener(EventKind::ReactionAdd, true));
        events.add(listener(EventKind::Message, true));

        assert_eq!(events.due(EventKind::Message).len(), 2);
        assert_eq!(events.due(EventKind::ReactionAdd).len(), 1);
        assert!(events.due(EventKind::GuildMemberAddition).is_empty());
        assert_eq!(events.len(), 3);
    }

    #[test]
    fn test_repeating_listener_runs_every_time() {
        let mut events = EventManager::new();
        events.add(listener(EventKind::Message, true));

        for _ in 0..3 {
            assert_eq!(events.due(EventKind::Message).len(), 1);
        }
    }

    #[test]
    fn test_one_shot_listener_runs_once() {
        let mut events = EventManager::new();
        events.add(listener(EventKind::Ready, false));
        events.add(listener(EventKind::Ready, true));

        assert_eq!(events.due(EventKind::Ready).len(), 2);
        assert_eq!(events.due(EventKind::Ready).len(), 1);
        assert_eq!(events.due(EventKind::Ready).len(), 1);
    }

    #[test]
    fn test_one_shot_is_not_claimed_by_other_kinds() {
        let mut events = EventManager::new();
        events.add(listener(EventKind::GuildCreate, false));

        assert!(events.due(EventKind::Message).is_empty());
        assert_eq!(events.due(EventKind::GuildCreate).len(), 1);
        assert!(events.due(EventKind::GuildCreate).is_empty());
    }

    #[tokio::test]
    async fn test_one_shot_claimed_once_across_tasks() {
        let mut events = EventManager::new();
        events.add(listener(EventKind::Ready, false));
        let events = Arc::new(events);

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let events = Arc::clone(&events);
                tokio::spawn(async move { events.due(EventKind::Ready).len() })
            })
            .collect();

        let mut total = 0;
        for task in tasks {
            total += task.await.unwrap();
        }
        assert_eq!(total, 1);
    }

    #[test]
    fn test_event_kind() {
        let event = Event::MessageDelete {
            channel_id: ChannelId(1),
            message_id: MessageId(2),
            guild_id: None,
        };
        assert_eq!(event.kind(), EventKind::MessageDelete);
    }
}
