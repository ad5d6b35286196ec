// Argument parsing - tokenizer and resolver for prefix commands
pub mod args;

// Core layer - configuration, logging and reply helpers
pub mod core;

// Application layer
pub mod commands;
pub mod components;
pub mod events;
pub mod framework;
pub mod module;

// Re-export the pieces most bots need
pub use args::{parse, parse_raw, ArgumentError, ParseResult, Schema, Transformer};
pub use commands::{CommandContext, CommandManager, Prefix, RegisterOptions};
pub use components::ComponentRegistry;
pub use core::Config;
pub use events::{Event, EventKind, Listener};
pub use framework::{Framework, HookKind, Hooks};
pub use module::Module;
