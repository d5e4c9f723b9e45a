//! JSON declarations for a parser.

use crate::entity::{OperandProps, OptionProps};
use crate::help::{HelpSettings, Usage};
use crate::registry::{ArgvParser, RegistrationError};
use crate::types;
use crate::validate::Validator;
use crate::validators;
use serde::Deserialize;
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

/// Default prefix of exported shell variables.
pub const DEFAULT_PREFIX: &str = "ARGV_";

/// Errors that can occur while reading or applying a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse JSON config: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error("'choices' on option '{0}' is empty: must have at least one valid value")]
    EmptyChoices(String),

    #[error("'choices' on option '{0}' has duplicate value: {1}")]
    DuplicateChoice(String, String),

    #[error("'choices' cannot be used on option '{0}', which takes no value")]
    ChoicesOnFlag(String),

    #[error("'value_type' cannot be used on option '{0}', which takes no value")]
    ValueTypeOnFlag(String),

    #[error("'radix' on option '{0}' must be between 2 and 36, got {1}")]
    InvalidRadix(String, u32),

    #[error("'radix' on option '{0}' requires value_type integer")]
    RadixWithoutInteger(String),
}

/// Kind of value an option accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// Any string (default, no checks)
    #[default]
    String,
    /// Integer in `radix`, stored as decimal text
    Integer,
    /// Decimal number
    Number,
}

/// A built-in validator, by name.
///
/// Written as a string (`"required"`) or, when it takes a parameter, as a
/// single-key object (`{"in_enum": ["a", "b"]}`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidatorConfig {
    Required,
    Integer,
    PositiveInteger,
    Number,
    File,
    Directory,
    FileOrDirectory,
    Url,
    UrlOrFile,
    InEnum(Vec<String>),
    MaxTimesSet(usize),
}

impl ValidatorConfig {
    fn build(&self) -> Validator {
        match self {
            ValidatorConfig::Required => validators::required(None),
            ValidatorConfig::Integer => validators::integer(None),
            ValidatorConfig::PositiveInteger => validators::positive_integer(None),
            ValidatorConfig::Number => validators::number(None),
            ValidatorConfig::File => validators::file(None),
            ValidatorConfig::Directory => validators::directory(None),
            ValidatorConfig::FileOrDirectory => validators::file_or_directory(None),
            ValidatorConfig::Url => validators::is_url(None),
            ValidatorConfig::UrlOrFile => validators::is_url_or_file(None),
            ValidatorConfig::InEnum(values) => validators::in_enum(values.clone(), None),
            ValidatorConfig::MaxTimesSet(times) => validators::max_times_set(*times, None),
        }
    }
}

fn build_validators(configs: &[ValidatorConfig]) -> Vec<Validator> {
    configs.iter().map(ValidatorConfig::build).collect()
}

/// An option declaration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptionConfig {
    /// Triggers such as `-p` and `--port`
    pub triggers: Vec<String>,
    #[serde(default)]
    pub has_value: bool,
    /// Defaults to true
    pub requires_value: Option<bool>,
    #[serde(default)]
    pub allow_multiple: bool,
    #[serde(default)]
    pub allow_override: bool,
    /// Default value; implies `has_value`
    pub default: Option<String>,
    pub value_name: Option<String>,
    pub description: Option<String>,
    pub group: Option<String>,
    /// Parsed as usual but left out of help
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub value_type: ValueType,
    /// Radix for integer values (default 10)
    pub radix: Option<u32>,
    /// Allowed values
    pub choices: Option<Vec<String>>,
    #[serde(default)]
    pub validators: Vec<ValidatorConfig>,
}

impl OptionConfig {
    fn label(&self) -> String {
        self.triggers.join("|")
    }

    fn takes_value(&self) -> bool {
        self.has_value || self.default.is_some()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.value_type != ValueType::String && !self.takes_value() {
            return Err(ConfigError::ValueTypeOnFlag(self.label()));
        }
        if let Some(radix) = self.radix {
            if self.value_type != ValueType::Integer {
                return Err(ConfigError::RadixWithoutInteger(self.label()));
            }
            if !(2..=36).contains(&radix) {
                return Err(ConfigError::InvalidRadix(self.label(), radix));
            }
        }
        if let Some(ref choices) = self.choices {
            if !self.takes_value() {
                return Err(ConfigError::ChoicesOnFlag(self.label()));
            }
            if choices.is_empty() {
                return Err(ConfigError::EmptyChoices(self.label()));
            }
            let mut seen = HashSet::new();
            for choice in choices {
                if !seen.insert(choice) {
                    return Err(ConfigError::DuplicateChoice(self.label(), choice.clone()));
                }
            }
        }
        Ok(())
    }

    /// Registration properties; declared validators run before type checks.
    fn props(&self) -> Result<OptionProps, ConfigError> {
        let extra = build_validators(&self.validators);
        let mut props = match (self.value_type, &self.choices) {
            (ValueType::Integer, _) => types::integer(self.radix.unwrap_or(10), extra)?,
            (ValueType::Number, _) => types::number(extra),
            (ValueType::String, Some(choices)) => types::enumeration(choices.clone(), extra)?,
            (ValueType::String, None) => OptionProps::new().validators(extra),
        };
        if let (ValueType::Integer | ValueType::Number, Some(choices)) =
            (self.value_type, &self.choices)
        {
            props = props.validator(validators::in_enum(choices.clone(), None));
        }

        props.has_value |= self.has_value;
        props.requires_value = self.requires_value;
        props.allow_multiple = self.allow_multiple;
        props.allow_override = self.allow_override;
        props.default_value = self.default.clone();
        props.value_name = self.value_name.clone();
        props.description = self.description.clone();
        props.group_name = self.group.clone();
        props.hidden = self.hidden;
        Ok(props)
    }
}

/// An operand declaration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OperandConfig {
    /// Defaults to `OPD`, `OPD2`, ...
    pub name: Option<String>,
    #[serde(default)]
    pub greedy: bool,
    pub value_name: Option<String>,
    pub description: Option<String>,
    pub group: Option<String>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub validators: Vec<ValidatorConfig>,
}

impl OperandConfig {
    fn props(&self) -> OperandProps {
        OperandProps {
            greedy: self.greedy,
            value_name: self.value_name.clone(),
            description: self.description.clone(),
            group_name: self.group.clone(),
            hidden: self.hidden,
            validators: build_validators(&self.validators),
        }
    }
}

/// A shorthand declaration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShorthandConfig {
    pub trigger: String,
    pub expansion: Vec<String>,
}

/// One entry of `args`, tagged by `"type"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ArgConfig {
    Option(OptionConfig),
    Operand(OperandConfig),
    Shorthand(ShorthandConfig),
}

/// Top-level configuration for a script.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Program name shown in help and error output
    pub name: Option<String>,
    pub description: Option<String>,
    pub version: Option<String>,
    /// Text printed after the help body
    pub epilog: Option<String>,
    /// Replaces the generated usage line
    pub usage: Option<String>,
    /// Prefix of exported shell variables (default: "ARGV_")
    pub prefix: Option<String>,
    /// Declarations, in registration order
    #[serde(default)]
    pub args: Vec<ArgConfig>,
}

impl Config {
    /// Parse a JSON string into a Config.
    pub fn from_json(json: &str) -> Result<Config, ConfigError> {
        let config: Config = serde_json::from_str(json)?;
        Ok(config)
    }

    /// Check declaration details the registry does not cover.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for arg in &self.args {
            if let ArgConfig::Option(option) = arg {
                option.validate()?;
            }
        }
        Ok(())
    }

    /// Presentation settings for the parser's help output.
    pub fn help_settings(&self) -> HelpSettings {
        HelpSettings {
            prog: self.name.clone(),
            description: self.description.clone(),
            epilog: self.epilog.clone(),
            usage: self.usage.clone().map(Usage::Text),
            formatter: None,
        }
    }

    /// Validate and register every declaration, in order.
    pub fn build(&self) -> Result<ArgvParser, ConfigError> {
        self.validate()?;
        let mut parser = ArgvParser::with_settings(self.help_settings());
        for arg in &self.args {
            match arg {
                ArgConfig::Option(option) => {
                    parser.create_option(option.triggers.iter().cloned(), option.props()?)?;
                }
                ArgConfig::Operand(operand) => {
                    parser.create_operand(operand.name.as_deref(), operand.props())?;
                }
                ArgConfig::Shorthand(shorthand) => {
                    parser.add_shorthand(&shorthand.trigger, shorthand.expansion.iter().cloned())?;
                }
            }
        }
        debug!(entities = parser.entities().len(), "built parser from config");
        Ok(parser)
    }

    /// Get the effective prefix, using the default if none is set.
    pub fn effective_prefix(&self) -> &str {
        self.prefix.as_deref().unwrap_or(DEFAULT_PREFIX)
    }
}
