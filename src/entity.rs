//! Declarative argument records: options, operands and the per-parse state they fill in.

use crate::parser::MatchError;
use crate::registry::RegistrationError;
use crate::shorthand::Shorthand;
use crate::validate::{ArgSnapshot, Validatable, Validator};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Function applied to a raw option value before it is stored.
///
/// An `Err` is reported as a parse error carrying the message verbatim.
pub type Transform = Arc<dyn Fn(&str) -> Result<String, String> + Send + Sync>;

/// Value collected for an argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// One value (plain options and non-greedy operands).
    Single(String),
    /// Values in occurrence order (`allow_multiple` options and greedy operands).
    Multiple(Vec<String>),
}

impl Value {
    /// The scalar value, if this is not a sequence.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Single(s) => Some(s),
            Value::Multiple(_) => None,
        }
    }

    /// All values as a slice; a scalar is a one-element slice.
    pub fn as_slice(&self) -> &[String] {
        match self {
            Value::Single(s) => std::slice::from_ref(s),
            Value::Multiple(v) => v,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Single(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Single(s)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Value::Multiple(v)
    }
}

/// Mutable result state of one argument for a single parse call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArgState {
    pub is_set: bool,
    pub times_set: usize,
    pub value: Option<Value>,
}

impl ArgState {
    /// Scalar value, if any.
    pub fn as_str(&self) -> Option<&str> {
        self.value.as_ref().and_then(Value::as_str)
    }

    /// Every collected value; empty when unset.
    pub fn values(&self) -> &[String] {
        self.value.as_ref().map(Value::as_slice).unwrap_or(&[])
    }
}

/// `-x`: one dash followed by a non-dash character (possibly more, as in `-xyz`).
pub fn is_short_flag(token: &str) -> bool {
    let mut chars = token.chars();
    chars.next() == Some('-') && matches!(chars.next(), Some(c) if c != '-')
}

/// `--name`: two dashes followed by at least one character.
pub fn is_long_flag(token: &str) -> bool {
    token.len() > 2 && token.starts_with("--")
}

/// Whether a token is shaped like an option at all.
pub fn is_flag(token: &str) -> bool {
    is_long_flag(token) || is_short_flag(token)
}

/// Splits a token after its first two characters (`-pfoo` into `-p` and `foo`).
pub(crate) fn split_short(token: &str) -> (&str, &str) {
    let end = token
        .char_indices()
        .nth(2)
        .map(|(i, _)| i)
        .unwrap_or(token.len());
    token.split_at(end)
}

/// Checks a single trigger's syntax.
pub(crate) fn check_trigger(trigger: &str) -> Result<(), RegistrationError> {
    if trigger.contains('=') {
        return Err(RegistrationError::InvalidTrigger(trigger.to_string()));
    }
    if is_short_flag(trigger) {
        if trigger.chars().count() > 2 {
            return Err(RegistrationError::ShortTooLong(trigger.to_string()));
        }
        return Ok(());
    }
    if is_long_flag(trigger) && !trigger[2..].starts_with('-') {
        return Ok(());
    }
    Err(RegistrationError::InvalidTrigger(trigger.to_string()))
}

/// Properties accepted by [`crate::ArgvParser::create_option`].
#[derive(Clone, Default)]
pub struct OptionProps {
    pub has_value: bool,
    /// Defaults to `true` when unset.
    pub requires_value: Option<bool>,
    pub allow_multiple: bool,
    pub allow_override: bool,
    pub default_value: Option<String>,
    pub value_name: Option<String>,
    pub description: Option<String>,
    pub group_name: Option<String>,
    pub hidden: bool,
    pub transform: Option<Transform>,
    pub validators: Vec<Validator>,
}

impl OptionProps {
    pub fn new() -> Self {
        Self::default()
    }

    /// The option takes a value (`-p 80`, `-p80`, `--port=80`).
    pub fn with_value(mut self) -> Self {
        self.has_value = true;
        self
    }

    /// The option takes a value but may also appear without one.
    pub fn optional_value(mut self) -> Self {
        self.has_value = true;
        self.requires_value = Some(false);
        self
    }

    /// Repeats accumulate values instead of failing.
    pub fn multiple(mut self) -> Self {
        self.allow_multiple = true;
        self
    }

    /// Repeats replace the previous value instead of failing.
    pub fn overridable(mut self) -> Self {
        self.allow_override = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn value_name(mut self, name: impl Into<String>) -> Self {
        self.value_name = Some(name.into());
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn group(mut self, name: impl Into<String>) -> Self {
        self.group_name = Some(name.into());
        self
    }

    /// Parsed as usual but left out of help output.
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn transform<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> Result<String, String> + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(f));
        self
    }

    pub fn validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn validators(mut self, validators: impl IntoIterator<Item = Validator>) -> Self {
        self.validators.extend(validators);
        self
    }
}

/// A named flag bound to one or more triggers.
#[derive(Clone)]
pub struct OptionDef {
    triggers: Vec<String>,
    signature: String,
    has_value: bool,
    requires_value: bool,
    allow_multiple: bool,
    allow_override: bool,
    default_value: Option<String>,
    value_name: Option<String>,
    description: Option<String>,
    group_name: Option<String>,
    hidden: bool,
    transform: Option<Transform>,
    validators: Vec<Validator>,
}

impl OptionDef {
    pub(crate) fn new(
        triggers: Vec<String>,
        props: OptionProps,
    ) -> Result<Self, RegistrationError> {
        if triggers.is_empty() {
            return Err(RegistrationError::NoTriggers);
        }
        for (i, trigger) in triggers.iter().enumerate() {
            check_trigger(trigger)?;
            if triggers[i + 1..].contains(trigger) {
                return Err(RegistrationError::DuplicateOption(trigger.clone()));
            }
        }

        let signature = triggers.join("|");
        Ok(Self {
            has_value: props.has_value || props.default_value.is_some(),
            requires_value: props.requires_value.unwrap_or(true),
            allow_multiple: props.allow_multiple,
            allow_override: props.allow_override,
            default_value: props.default_value,
            value_name: props.value_name,
            description: props.description,
            group_name: props.group_name,
            hidden: props.hidden,
            transform: props.transform,
            validators: props.validators,
            triggers,
            signature,
        })
    }

    pub fn triggers(&self) -> &[String] {
        &self.triggers
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn has_value(&self) -> bool {
        self.has_value
    }

    pub fn requires_value(&self) -> bool {
        self.requires_value
    }

    pub fn allow_multiple(&self) -> bool {
        self.allow_multiple
    }

    pub fn allow_override(&self) -> bool {
        self.allow_override
    }

    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    pub fn value_name(&self) -> Option<&str> {
        self.value_name.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn group_name(&self) -> Option<&str> {
        self.group_name.as_deref()
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// A value must accompany every occurrence.
    pub fn value_required(&self) -> bool {
        self.has_value && self.requires_value
    }

    /// Whether `token` names this option, ignoring any `=value` part and,
    /// for short forms, anything after the first flag character.
    pub fn recognizes(&self, token: &str) -> bool {
        let long = token.split('=').next().unwrap_or(token);
        let (short, _) = split_short(long);
        self.triggers.iter().any(|t| t == short || t == long)
    }

    /// Whether any trigger of `self` is recognised by `other`.
    pub fn intersects(&self, other: &OptionDef) -> bool {
        self.triggers.iter().any(|t| other.recognizes(t))
    }

    pub(crate) fn apply_transform(&self, value: String) -> Result<String, MatchError> {
        match &self.transform {
            Some(transform) => transform(&value).map_err(MatchError::Transform),
            None => Ok(value),
        }
    }

    pub(crate) fn initial_state(&self) -> ArgState {
        ArgState {
            value: self.default_value.clone().map(Value::Single),
            ..ArgState::default()
        }
    }

    /// Records one occurrence of the option.
    pub(crate) fn handle(
        &self,
        state: &mut ArgState,
        value: Option<String>,
    ) -> Result<(), MatchError> {
        let sig = || self.signature.clone();
        if value.is_some() && !self.has_value {
            return Err(MatchError::UnexpectedValue(sig()));
        }
        if value.is_none() && self.value_required() {
            return Err(MatchError::MissingValue(sig()));
        }
        if state.is_set && !self.allow_multiple && !self.allow_override {
            return Err(MatchError::AlreadySet(sig()));
        }

        if let Some(value) = value {
            if self.allow_multiple {
                match &mut state.value {
                    // The default never seeds the accumulated list.
                    Some(Value::Multiple(values)) if state.is_set => values.push(value),
                    slot => *slot = Some(Value::Multiple(vec![value])),
                }
            } else {
                state.value = Some(Value::Single(value));
            }
        }
        state.is_set = true;
        state.times_set += 1;
        Ok(())
    }
}

impl fmt::Debug for OptionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionDef")
            .field("signature", &self.signature)
            .field("has_value", &self.has_value)
            .field("requires_value", &self.requires_value)
            .field("allow_multiple", &self.allow_multiple)
            .field("allow_override", &self.allow_override)
            .field("default_value", &self.default_value)
            .field("validators", &self.validators.len())
            .finish_non_exhaustive()
    }
}

impl Validatable for OptionDef {
    fn validators(&self) -> &[Validator] {
        &self.validators
    }

    fn snapshot(&self, state: &ArgState) -> ArgSnapshot {
        ArgSnapshot {
            signature: self.signature.clone(),
            has_value: self.has_value,
            is_set: state.is_set,
            times_set: state.times_set,
            value: state.value.clone(),
        }
    }
}

/// Properties accepted by [`crate::ArgvParser::create_operand`].
#[derive(Clone, Default)]
pub struct OperandProps {
    pub greedy: bool,
    pub value_name: Option<String>,
    pub description: Option<String>,
    pub group_name: Option<String>,
    pub hidden: bool,
    pub validators: Vec<Validator>,
}

impl OperandProps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect every remaining operand token instead of a single one.
    pub fn greedy(mut self) -> Self {
        self.greedy = true;
        self
    }

    pub fn value_name(mut self, name: impl Into<String>) -> Self {
        self.value_name = Some(name.into());
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn group(mut self, name: impl Into<String>) -> Self {
        self.group_name = Some(name.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn validators(mut self, validators: impl IntoIterator<Item = Validator>) -> Self {
        self.validators.extend(validators);
        self
    }
}

/// A positional value.
#[derive(Clone)]
pub struct OperandDef {
    signature: String,
    value_name: String,
    greedy: bool,
    description: Option<String>,
    group_name: Option<String>,
    hidden: bool,
    validators: Vec<Validator>,
}

impl OperandDef {
    pub(crate) fn new(signature: String, props: OperandProps) -> Self {
        Self {
            value_name: props.value_name.unwrap_or_else(|| signature.clone()),
            signature,
            greedy: props.greedy,
            description: props.description,
            group_name: props.group_name,
            hidden: props.hidden,
            validators: props.validators,
        }
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn value_name(&self) -> &str {
        &self.value_name
    }

    pub fn is_greedy(&self) -> bool {
        self.greedy
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn group_name(&self) -> Option<&str> {
        self.group_name.as_deref()
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// A filled non-greedy operand never takes another token.
    pub fn is_satisfied(&self, state: &ArgState) -> bool {
        state.is_set && !self.greedy
    }

    pub(crate) fn initial_state(&self) -> ArgState {
        ArgState {
            value: self.greedy.then(|| Value::Multiple(Vec::new())),
            ..ArgState::default()
        }
    }

    pub(crate) fn handle(&self, state: &mut ArgState, value: String) {
        state.is_set = true;
        state.times_set += 1;
        if self.greedy {
            match &mut state.value {
                Some(Value::Multiple(values)) => values.push(value),
                slot => *slot = Some(Value::Multiple(vec![value])),
            }
        } else {
            state.value = Some(Value::Single(value));
        }
    }
}

impl fmt::Debug for OperandDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperandDef")
            .field("signature", &self.signature)
            .field("greedy", &self.greedy)
            .field("validators", &self.validators.len())
            .finish_non_exhaustive()
    }
}

impl Validatable for OperandDef {
    fn validators(&self) -> &[Validator] {
        &self.validators
    }

    fn snapshot(&self, state: &ArgState) -> ArgSnapshot {
        ArgSnapshot {
            signature: self.signature.clone(),
            has_value: true,
            is_set: state.is_set,
            times_set: state.times_set,
            value: state.value.clone(),
        }
    }
}

/// Anything registered with a parser, in declaration order.
#[derive(Debug, Clone)]
pub enum Entity {
    Option(OptionDef),
    Operand(OperandDef),
    Shorthand(Shorthand),
}

impl Entity {
    pub fn signature(&self) -> &str {
        match self {
            Entity::Option(o) => o.signature(),
            Entity::Operand(o) => o.signature(),
            Entity::Shorthand(s) => s.trigger(),
        }
    }

    /// Every string this entity can be looked up by.
    pub fn keys(&self) -> Vec<&str> {
        match self {
            Entity::Option(o) => o.triggers().iter().map(String::as_str).collect(),
            Entity::Operand(o) => vec![o.signature()],
            Entity::Shorthand(s) => vec![s.trigger()],
        }
    }

    pub fn as_option(&self) -> Option<&OptionDef> {
        match self {
            Entity::Option(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_operand(&self) -> Option<&OperandDef> {
        match self {
            Entity::Operand(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_shorthand(&self) -> Option<&Shorthand> {
        match self {
            Entity::Shorthand(s) => Some(s),
            _ => None,
        }
    }

    pub(crate) fn as_validatable(&self) -> Option<&dyn Validatable> {
        match self {
            Entity::Option(o) => Some(o),
            Entity::Operand(o) => Some(o),
            Entity::Shorthand(_) => None,
        }
    }

    pub(crate) fn initial_state(&self) -> ArgState {
        match self {
            Entity::Option(o) => o.initial_state(),
            Entity::Operand(o) => o.initial_state(),
            Entity::Shorthand(_) => ArgState::default(),
        }
    }
}
