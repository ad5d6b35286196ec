//! # Command System
//!
//! Slash, context menu, modal and prefix command handling.
//!
//! - **Version**: 3.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 3.0.0: Command manager with subcommands, prefix commands and registration sync
//! - 2.1.0: Add modular handler infrastructure (handler trait, context, registry)
//! - 1.0.0: Initial reorganization with modular command structure

pub mod access;
pub mod context;
pub mod definition;
pub mod handler;
pub mod options;
pub mod prefix;
pub mod registry;
pub mod sync;
pub mod transform;

// Re-export handler infrastructure
pub use access::{check_access, AccessDenied, Check, CommandFlags, Invocation, PermissionRequirements};
pub use context::CommandContext;
pub use definition::{Choice, CommandKind, CommandSpec, OptionDefinition, OptionKind};
pub use handler::{
    ComponentHandler, ContextMenuHandler, ModalHandler, PrefixCommandHandler, SlashCommandHandler,
    SubcommandHandler,
};
pub use registry::{CommandManager, PrefixEntry};

// Re-export commonly used items from submodules
pub use options::{
    get_bool_option, get_integer_option, get_number_option, get_snowflake_option, get_string_option,
};
pub use prefix::{
    split_invocation, Prefix, PrefixArgs, PrefixArgument, PrefixCommand, PrefixInvocation, PrefixOption,
};
pub use sync::{needs_update, register, RegisterOptions};
pub use transform::{
    one_of, transform_fn, ArgValue, ArgumentTransform, ArgumentType, CustomTransform, DiscordTransformer,
    TransformRequest,
};
