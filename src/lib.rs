//! posix-argv - POSIX/GNU-style command-line argument parsing.
//!
//! Options, operands and shorthands are registered on an [`ArgvParser`];
//! parsing expands shorthands, matches every token in one pass and then runs
//! the (possibly asynchronous) validators, reporting all problems at once.
//! A JSON configuration layer and a shell-export output layer let scripts use
//! the parser through the `posix-argv` binary.

pub mod config;
pub mod entity;
pub mod help;
pub mod output;
pub mod parser;
pub mod registry;
pub mod shorthand;
pub mod types;
pub mod validate;
pub mod validators;

pub use config::{ArgConfig, Config, ConfigError};
pub use entity::{ArgState, Entity, OperandDef, OperandProps, OptionDef, OptionProps, Value};
pub use help::{generate_help, generate_usage, generate_version, HelpSettings};
pub use parser::{match_tokens, MatchError};
pub use registry::{ArgvParser, ParseOutcome, ParseResult, RegistrationError};
pub use shorthand::Shorthand;
pub use validate::{validator, ArgSnapshot, Outcome, Validatable, Validator};
