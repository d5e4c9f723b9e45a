//! The parser facade: registration, and the parse pipeline
//! (shorthand expansion, matching, validation).

use crate::entity::{
    check_trigger, is_flag, ArgState, Entity, OperandDef, OperandProps, OptionDef, OptionProps,
    Value,
};
use crate::help::HelpSettings;
use crate::parser::match_tokens;
use crate::shorthand::{self, Shorthand};
use crate::validate::{panic_message, validate_all};
use futures_util::FutureExt;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;
use std::ops::Index;
use std::panic::AssertUnwindSafe;
use thiserror::Error;
use tracing::debug;

/// Key of the first operand registered without a name.
pub const DEFAULT_OPERAND: &str = "OPD";

/// Malformed declarations, reported when an argument is registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("option must have at least one trigger, e.g. --help")]
    NoTriggers,

    #[error("a short option can only be one dash and one character ({0})")]
    ShortTooLong(String),

    #[error("invalid trigger '{0}': expected -x or --name")]
    InvalidTrigger(String),

    #[error("duplicate option ({0})")]
    DuplicateOption(String),

    #[error("duplicate operand ({0})")]
    DuplicateOperand(String),

    #[error("can not add shorthand '{0}', option already exists")]
    ShorthandCollision(String),

    #[error("duplicate shorthand '{0}'")]
    DuplicateShorthand(String),

    #[error("{0} needs at least one allowed value")]
    EmptyChoices(String),

    #[error("radix must be between 2 and 36, got {0}")]
    InvalidRadix(u32),
}

/// Result of a successful parse: one state per option and operand.
///
/// Entries are keyed by signature in registration order; options can also be
/// looked up by any single trigger.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ParseResult {
    entries: IndexMap<String, ArgState>,
    #[serde(skip)]
    aliases: HashMap<String, String>,
}

impl ParseResult {
    fn new(entities: &[Entity], states: Vec<ArgState>) -> Self {
        let mut result = ParseResult::default();
        for (entity, state) in entities.iter().zip(states) {
            match entity {
                Entity::Option(option) => {
                    for trigger in option.triggers() {
                        result
                            .aliases
                            .insert(trigger.clone(), option.signature().to_string());
                    }
                    result.entries.insert(option.signature().to_string(), state);
                }
                Entity::Operand(operand) => {
                    result.entries.insert(operand.signature().to_string(), state);
                }
                Entity::Shorthand(_) => {}
            }
        }
        result
    }

    /// State for a signature, trigger or operand name.
    pub fn get(&self, key: &str) -> Option<&ArgState> {
        self.entries.get(key).or_else(|| {
            self.aliases
                .get(key)
                .and_then(|signature| self.entries.get(signature))
        })
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn is_set(&self, key: &str) -> bool {
        self.get(key).is_some_and(|s| s.is_set)
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.get(key).and_then(|s| s.value.as_ref())
    }

    /// Entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgState)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Index<&str> for ParseResult {
    type Output = ArgState;

    fn index(&self, key: &str) -> &ArgState {
        self.get(key)
            .unwrap_or_else(|| panic!("no argument registered under '{key}'"))
    }
}

/// Outcome of [`ArgvParser::parse`]: the results, or every error found.
pub type ParseOutcome = Result<ParseResult, Vec<String>>;

/// Registry of options, operands and shorthands.
#[derive(Debug, Clone, Default)]
pub struct ArgvParser {
    entities: Vec<Entity>,
    settings: HelpSettings,
}

impl ArgvParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// A parser whose help output uses `settings`.
    pub fn with_settings(settings: HelpSettings) -> Self {
        Self {
            entities: Vec::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &HelpSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut HelpSettings {
        &mut self.settings
    }

    /// Everything registered so far, in declaration order.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn options(&self) -> impl Iterator<Item = &OptionDef> {
        self.entities.iter().filter_map(Entity::as_option)
    }

    pub fn operands(&self) -> impl Iterator<Item = &OperandDef> {
        self.entities.iter().filter_map(Entity::as_operand)
    }

    pub fn shorthands(&self) -> impl Iterator<Item = &Shorthand> {
        self.entities.iter().filter_map(Entity::as_shorthand)
    }

    /// Registers an option answering to `triggers`.
    pub fn create_option<I, S>(
        &mut self,
        triggers: I,
        props: OptionProps,
    ) -> Result<&OptionDef, RegistrationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let option = OptionDef::new(triggers.into_iter().map(Into::into).collect(), props)?;
        if self.options().any(|other| option.intersects(other))
            || option
                .triggers()
                .iter()
                .any(|t| self.shorthands().any(|s| s.recognizes(t)))
        {
            return Err(RegistrationError::DuplicateOption(
                option.signature().to_string(),
            ));
        }
        if self
            .operands()
            .any(|o| option.triggers().iter().any(|t| t == o.signature()))
        {
            return Err(RegistrationError::DuplicateOption(
                option.signature().to_string(),
            ));
        }

        debug!(signature = option.signature(), "registered option");
        self.entities.push(Entity::Option(option));
        match self.entities.last() {
            Some(Entity::Option(option)) => Ok(option),
            _ => unreachable!("option was just registered"),
        }
    }

    /// Registers an operand; unnamed operands are called `OPD`, `OPD2`, ...
    pub fn create_operand(
        &mut self,
        name: Option<&str>,
        props: OperandProps,
    ) -> Result<&OperandDef, RegistrationError> {
        let signature = match name {
            Some(name) => name.to_string(),
            None => self.next_operand_name(),
        };
        if self.entities.iter().any(|e| e.keys().contains(&signature.as_str())) {
            return Err(RegistrationError::DuplicateOperand(signature));
        }

        debug!(%signature, greedy = props.greedy, "registered operand");
        self.entities
            .push(Entity::Operand(OperandDef::new(signature, props)));
        match self.entities.last() {
            Some(Entity::Operand(operand)) => Ok(operand),
            _ => unreachable!("operand was just registered"),
        }
    }

    /// Registers `trigger` as shorthand for the `expansion` tokens.
    pub fn add_shorthand<I, S>(
        &mut self,
        trigger: &str,
        expansion: I,
    ) -> Result<&Shorthand, RegistrationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if !is_flag(trigger) {
            return Err(RegistrationError::InvalidTrigger(trigger.to_string()));
        }
        check_trigger(trigger)?;
        if self.options().any(|o| o.recognizes(trigger)) {
            return Err(RegistrationError::ShorthandCollision(trigger.to_string()));
        }
        if self.shorthands().any(|s| s.recognizes(trigger)) {
            return Err(RegistrationError::DuplicateShorthand(trigger.to_string()));
        }

        let expansion: Vec<String> = expansion.into_iter().map(Into::into).collect();
        debug!(%trigger, ?expansion, "registered shorthand");
        self.entities.push(Entity::Shorthand(Shorthand::new(
            trigger.to_string(),
            expansion,
        )));
        match self.entities.last() {
            Some(Entity::Shorthand(shorthand)) => Ok(shorthand),
            _ => unreachable!("shorthand was just registered"),
        }
    }

    /// Parses `argv`: expands shorthands, matches tokens, then runs every
    /// validator. Resolves to the results, or to all errors in order.
    pub async fn parse<S: AsRef<str>>(&self, argv: &[S]) -> ParseOutcome {
        let tokens: Vec<String> = argv.iter().map(|s| s.as_ref().to_string()).collect();
        match AssertUnwindSafe(self.run(&tokens)).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(payload) => Err(vec![panic_message(payload)]),
        }
    }

    /// [`parse`](Self::parse), driven to completion on the current thread.
    pub fn parse_blocking<S: AsRef<str>>(&self, argv: &[S]) -> ParseOutcome {
        futures_executor::block_on(self.parse(argv))
    }

    /// Parses `argv` and hands the outcome to `on_finished`, exactly once.
    pub fn parse_with<S, F>(&self, argv: &[S], on_finished: F)
    where
        S: AsRef<str>,
        F: FnOnce(ParseOutcome),
    {
        on_finished(self.parse_blocking(argv));
    }

    async fn run(&self, tokens: &[String]) -> ParseOutcome {
        let tokens = shorthand::expand(tokens, &self.entities);
        debug!(tokens = ?tokens, "matching");
        let (states, errors) = match_tokens(&self.entities, &tokens);
        if !errors.is_empty() {
            return Err(errors.iter().map(ToString::to_string).collect());
        }

        let errors = validate_all(&self.entities, &states).await;
        if !errors.is_empty() {
            debug!(count = errors.len(), "validation failed");
            return Err(errors);
        }
        Ok(ParseResult::new(&self.entities, states))
    }

    fn next_operand_name(&self) -> String {
        let unnamed = self
            .operands()
            .filter(|o| {
                o.signature()
                    .strip_prefix(DEFAULT_OPERAND)
                    .is_some_and(|n| n.is_empty() || n.parse::<usize>().is_ok())
            })
            .count();
        match unnamed {
            0 => DEFAULT_OPERAND.to_string(),
            n => format!("{DEFAULT_OPERAND}{}", n + 1),
        }
    }
}
