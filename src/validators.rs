//! Ready-made validators.
//!
//! Every constructor takes an optional message template. `${1}` is replaced by
//! the argument's signature, `${2}` by the offending value and `${3}` by any
//! extra detail (the allowed values of [`in_enum`]).

use crate::entity::Value;
use crate::validate::{validator, ArgSnapshot, Outcome, Validator};
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

//                          scheme                   authority      path      query      fragment
static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z][-A-Za-z0-9+.]*:)?(//[^/?#]+)?([^#?]*)(\?[^#]*)?(#.*)?$")
        .unwrap_or_else(|e| panic!("invalid URL pattern: {e}"))
});

/// Substitutes `${1}`, `${2}`, ... in `template` with `args`, first occurrence only.
pub fn interpolate(template: &str, args: &[&str]) -> String {
    args.iter().enumerate().fold(template.to_string(), |acc, (i, arg)| {
        acc.replacen(&format!("${{{}}}", i + 1), arg, 1)
    })
}

fn template(custom: Option<&str>, fallback: &str) -> String {
    custom.unwrap_or(fallback).to_string()
}

/// Checks each value with `accept`; failures are joined by newlines.
fn each_value<F>(message: String, accept: F) -> Validator
where
    F: Fn(&str) -> bool + Send + Sync + 'static,
{
    validator(move |arg: ArgSnapshot| {
        let errors: Vec<String> = arg
            .values()
            .iter()
            .filter(|v| !accept(v))
            .map(|v| interpolate(&message, &[&arg.signature, v]))
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.join("\n"))
        }
    })
}

fn is_digits(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

/// Every value is a run of decimal digits.
pub fn integer(message: Option<&str>) -> Validator {
    each_value(template(message, "${1}: ${2} is not an integer"), is_digits)
}

/// Every value is a decimal integer greater than zero, or `Infinity`.
pub fn positive_integer(message: Option<&str>) -> Validator {
    each_value(
        template(message, "${1}: ${2} is not a positive integer."),
        |value| value == "Infinity" || (is_digits(value) && value.bytes().any(|b| b != b'0')),
    )
}

/// Every value is a decimal number with an optional sign and fraction.
pub fn number(message: Option<&str>) -> Validator {
    each_value(template(message, "${1}: ${2} is not a number"), |value| {
        let unsigned = value.strip_prefix(['+', '-']).unwrap_or(value);
        match unsigned.split_once('.') {
            Some((whole, fraction)) => is_digits(whole) && is_digits(fraction),
            None => is_digits(unsigned),
        }
    })
}

/// The argument was given, along with a non-empty value if it takes one.
pub fn required(message: Option<&str>) -> Validator {
    let message = template(message, "${1} is required.");
    validator(move |arg: ArgSnapshot| {
        let has_value = match &arg.value {
            Some(Value::Single(s)) => !s.is_empty(),
            Some(Value::Multiple(_)) => true,
            None => false,
        };
        if arg.is_set && (!arg.has_value || has_value) {
            Ok(())
        } else {
            Err(interpolate(&message, &[&arg.signature]))
        }
    })
}

/// Checks a scalar value against the filesystem; other shapes pass.
fn on_path<F>(message: String, accept: F) -> Validator
where
    F: Fn(&fs::Metadata) -> bool + Send + Sync + Copy + 'static,
{
    validator(move |arg: ArgSnapshot| {
        let Some(path) = arg.as_str().map(str::to_string) else {
            return Outcome::ok();
        };
        let message = interpolate(&message, &[&arg.signature, &path]);
        Outcome::pending(async move {
            match fs::metadata(Path::new(&path)) {
                Ok(meta) if accept(&meta) => Ok(()),
                _ => Err(message),
            }
        })
    })
}

/// The value names an existing regular file.
pub fn file(message: Option<&str>) -> Validator {
    on_path(template(message, "${1}: ${2} is not a file"), fs::Metadata::is_file)
}

/// The value names an existing directory.
pub fn directory(message: Option<&str>) -> Validator {
    on_path(
        template(message, "${1}: ${2} is not a directory"),
        fs::Metadata::is_dir,
    )
}

/// The value names an existing file or directory.
pub fn file_or_directory(message: Option<&str>) -> Validator {
    on_path(
        template(message, "${1}: ${2} is not a file or directory"),
        |meta| meta.is_file() || meta.is_dir(),
    )
}

fn url_parts(value: &str) -> Option<(bool, bool, bool)> {
    let caps = URL_PATTERN.captures(value)?;
    let non_empty = |i| caps.get(i).is_some_and(|m| !m.as_str().is_empty());
    Some((caps.get(1).is_some(), caps.get(2).is_some(), non_empty(3)))
}

/// Every value looks like a URL: it needs a path or an authority part.
pub fn is_url(message: Option<&str>) -> Validator {
    each_value(template(message, "${1}: ${2} is not a valid URL."), |value| {
        url_parts(value).is_some_and(|(_, authority, path)| authority || path)
    })
}

/// The value is a URL with a scheme, or names an existing file.
pub fn is_url_or_file(message: Option<&str>) -> Validator {
    let message = template(message, "${1}: ${2} is neither a file nor a URL.");
    validator(move |arg: ArgSnapshot| {
        let value = match arg.as_str() {
            Some(value) if !value.is_empty() => value.to_string(),
            _ => return Outcome::ok(),
        };
        if url_parts(&value).is_some_and(|(scheme, _, _)| scheme) {
            return Outcome::ok();
        }
        let message = interpolate(&message, &[&arg.signature, &value]);
        Outcome::pending(async move {
            match fs::metadata(&value) {
                Ok(meta) if meta.is_file() => Ok(()),
                _ => Err(message),
            }
        })
    })
}

/// Every value is one of `allowed`.
pub fn in_enum<I, S>(allowed: I, message: Option<&str>) -> Validator
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let allowed: Vec<String> = allowed.into_iter().map(Into::into).collect();
    let message = template(message, "${1}: expected one of [${3}], got ${2}");
    validator(move |arg: ArgSnapshot| {
        let listed = allowed.join(", ");
        let errors: Vec<String> = arg
            .values()
            .iter()
            .filter(|v| !v.is_empty() && !allowed.contains(v))
            .map(|v| interpolate(&message, &[&arg.signature, v, &listed]))
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.join("\n"))
        }
    })
}

/// The argument occurs at most `times` times.
pub fn max_times_set(times: usize, message: Option<&str>) -> Validator {
    let message = template(message, "${1}: can only be set ${2} times.");
    validator(move |arg: ArgSnapshot| {
        if arg.times_set > times {
            Err(interpolate(&message, &[&arg.signature, &times.to_string()]))
        } else {
            Ok(())
        }
    })
}
