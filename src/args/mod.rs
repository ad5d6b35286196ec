//! # Argument Parser
//!
//! CLI-style parsing for prefix command arguments: a regex-rule tokenizer
//! followed by a single forward pass that resolves positional arguments,
//! short/long options and a trailing `--` rest capture.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.2.0: Swallow transformer rejections for optional arguments
//! - 1.1.0: Collapsed single-argument options
//! - 1.0.0: Initial tokenizer and resolver

pub mod error;
pub mod lexer;
pub mod parser;
pub mod schema;

pub use error::ArgumentError;
pub use lexer::{tokenize, Token, TokenKind};
pub use parser::{parse, parse_raw, Identity, Transformer};
pub use schema::{ArgumentSpec, OptionSpec, OptionValue, ParseResult, Schema};
