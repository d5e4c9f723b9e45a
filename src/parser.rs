//! Token matching: one forward pass over the expanded argv.

use crate::entity::{is_long_flag, is_short_flag, split_short, ArgState, Entity, OptionDef};
use std::iter::Peekable;
use std::slice::Iter;
use thiserror::Error;
use tracing::{debug, trace};

/// Errors found while matching tokens against the registered arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("unknown argument '{0}'")]
    UnknownArgument(String),

    #[error("unknown operand '{0}'")]
    UnknownOperand(String),

    #[error("no value specified for {0}")]
    MissingValue(String),

    #[error("{0} does not take a value")]
    UnexpectedValue(String),

    #[error("value already set for {0}")]
    AlreadySet(String),

    #[error("{0}")]
    Transform(String),
}

type Tokens<'t> = Peekable<Iter<'t, String>>;

/// Matches `tokens` against `entities`.
///
/// Returns one state per entity (aligned by index) and every error found along the way.
pub fn match_tokens(entities: &[Entity], tokens: &[String]) -> (Vec<ArgState>, Vec<MatchError>) {
    let mut matcher = Matcher::new(entities);
    matcher.run(tokens);
    (matcher.states, matcher.errors)
}

/// Internal matcher state.
struct Matcher<'a> {
    entities: &'a [Entity],
    states: Vec<ArgState>,
    errors: Vec<MatchError>,
}

impl<'a> Matcher<'a> {
    fn new(entities: &'a [Entity]) -> Self {
        Self {
            entities,
            states: entities.iter().map(Entity::initial_state).collect(),
            errors: Vec::new(),
        }
    }

    fn run(&mut self, tokens: &[String]) {
        let mut tokens = tokens.iter().peekable();
        let mut parsing_options = true;

        while let Some(token) = tokens.next() {
            if !parsing_options {
                self.operand(token, true);
            } else if token == "--" {
                trace!("operand separator");
                parsing_options = false;
            } else if is_long_flag(token) {
                self.long_option(token, &mut tokens);
            } else if is_short_flag(token) {
                self.short_option(token, &mut tokens);
            } else {
                self.operand(token, false);
            }
        }
        debug!(errors = self.errors.len(), "matching finished");
    }

    fn find_option(&self, trigger: &str) -> Option<usize> {
        self.entities.iter().position(|e| {
            e.as_option()
                .is_some_and(|o| o.triggers().iter().any(|t| t == trigger))
        })
    }

    /// A token that would be taken as an option on its own.
    fn is_recognized(&self, token: &str) -> bool {
        (is_long_flag(token) || is_short_flag(token))
            && self
                .entities
                .iter()
                .filter_map(Entity::as_option)
                .any(|o| o.recognizes(token))
    }

    fn long_option(&mut self, token: &str, tokens: &mut Tokens<'_>) {
        let (name, inline_value) = match token.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (token, None),
        };
        let Some(idx) = self.find_option(name) else {
            self.errors.push(MatchError::UnknownArgument(name.to_string()));
            return;
        };
        trace!(%token, option = name, "long option");
        self.option_value(idx, inline_value, tokens);
    }

    fn short_option(&mut self, token: &str, tokens: &mut Tokens<'_>) {
        let (flag, rest) = split_short(token);
        let Some(idx) = self.find_option(flag) else {
            self.errors.push(MatchError::UnknownArgument(token.to_string()));
            return;
        };
        trace!(%token, option = flag, "short option");

        if let Some(value) = rest.strip_prefix('=') {
            self.option_value(idx, Some(value), tokens);
        } else if !rest.is_empty() && self.option(idx).has_value() {
            // -pfoo
            self.option_value(idx, Some(rest), tokens);
        } else if rest.is_empty() {
            self.option_value(idx, None, tokens);
        } else if self.handle_option(idx, None) {
            // -pz: a grouped flag; the remainder is another short token.
            if rest.starts_with('-') {
                self.errors.push(MatchError::UnknownArgument(rest.to_string()));
            } else {
                self.short_option(&format!("-{rest}"), tokens);
            }
        }
    }

    /// Resolves the value for an option occurrence and records it.
    fn option_value(&mut self, idx: usize, attached: Option<&str>, tokens: &mut Tokens<'_>) {
        let option = self.option(idx);
        if attached.is_some() && !option.has_value() {
            self.errors
                .push(MatchError::UnexpectedValue(option.signature().to_string()));
            return;
        }

        let value = match attached {
            Some(value) => Some(value.to_string()),
            None if option.value_required() => {
                let takes_next = tokens
                    .peek()
                    .is_some_and(|next| *next != "--" && !self.is_recognized(next));
                if !takes_next {
                    self.errors
                        .push(MatchError::MissingValue(option.signature().to_string()));
                    return;
                }
                tokens.next().cloned()
            }
            None => None,
        };
        self.handle_option(idx, value);
    }

    /// Applies the transform and records the occurrence; `false` if either failed.
    fn handle_option(&mut self, idx: usize, value: Option<String>) -> bool {
        let option = self.option(idx);
        let value = match value.map(|v| option.apply_transform(v)).transpose() {
            Ok(value) => value,
            Err(err) => {
                self.errors.push(err);
                return false;
            }
        };
        match option.handle(&mut self.states[idx], value) {
            Ok(()) => true,
            Err(err) => {
                self.errors.push(err);
                false
            }
        }
    }

    /// Hands `token` to the first operand still accepting values.
    fn operand(&mut self, token: &str, after_separator: bool) {
        let entities = self.entities;
        let target = entities.iter().enumerate().find_map(|(idx, entity)| {
            let operand = entity.as_operand()?;
            (!operand.is_satisfied(&self.states[idx])).then_some((idx, operand))
        });
        match target {
            Some((idx, operand)) => {
                trace!(%token, operand = operand.signature(), "operand");
                operand.handle(&mut self.states[idx], token.to_string());
            }
            None if after_separator => {
                self.errors.push(MatchError::UnknownOperand(token.to_string()))
            }
            None => self.errors.push(MatchError::UnknownArgument(token.to_string())),
        }
    }

    fn option(&self, idx: usize) -> &'a OptionDef {
        let entities = self.entities;
        match &entities[idx] {
            Entity::Option(option) => option,
            _ => unreachable!("index {idx} does not refer to an option"),
        }
    }
}
