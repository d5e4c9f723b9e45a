//! Sourceable shell scripts and JSON documents built from parse outcomes.

use crate::entity::Value;
use crate::registry::ParseResult;
use anyhow::Result;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

/// Heredoc delimiter for help output.
const HELP_DELIMITER: &str = "POSIX_ARGV_HELP";
/// Heredoc delimiter for version output.
const VERSION_DELIMITER: &str = "POSIX_ARGV_VERSION";

/// Escape a string for safe use in a shell double-quoted context.
fn escape_shell_value(value: &str) -> String {
    value
        .chars()
        .fold(String::with_capacity(value.len()), |mut out, c| {
            match c {
                '$' | '`' | '\\' | '"' | '!' => {
                    out.push('\\');
                    out.push(c);
                }
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                _ => out.push(c),
            }
            out
        })
}

/// Shell variable name for a result key.
///
/// Options use their first long trigger (else the first short one) without
/// dashes; operands use their name. Letters are uppercased and anything
/// outside `[A-Z0-9_]` becomes `_`.
fn to_shell_var_name(key: &str) -> String {
    let triggers: Vec<&str> = key.split('|').collect();
    let name = triggers
        .iter()
        .find_map(|t| t.strip_prefix("--"))
        .or_else(|| triggers.first().map(|t| t.trim_start_matches('-')))
        .unwrap_or(key);
    name.chars()
        .map(|c| match c.to_ascii_uppercase() {
            c @ ('A'..='Z' | '0'..='9') => c,
            _ => '_',
        })
        .collect()
}

/// Shell text for a value: scalars as-is, sequences joined by single spaces.
fn shell_value(value: &Value) -> String {
    match value {
        Value::Single(s) => s.clone(),
        Value::Multiple(values) => values.join(" "),
    }
}

/// Generate the export statements for every argument that is set or has a default.
///
/// Flags given on the command line export `true`.
pub fn generate_output_string(result: &ParseResult, prefix: &str) -> String {
    let mut output = String::new();
    for (key, state) in result.iter() {
        let value = match &state.value {
            Some(value) => shell_value(value),
            None if state.is_set => "true".to_string(),
            None => continue,
        };
        output.push_str(&format!(
            "export {}{}=\"{}\"\n",
            prefix,
            to_shell_var_name(key),
            escape_shell_value(&value)
        ));
    }
    output
}

/// Generate a temporary file with shell export statements.
///
/// Returns the path to the file, which outlives the process.
pub fn generate_output(result: &ParseResult, prefix: &str) -> Result<PathBuf> {
    write_temp_file(&generate_output_string(result, prefix))
}

/// Generate an error script: every message on stderr, then `exit 1`.
pub fn generate_error_string(program: &str, errors: &[String]) -> String {
    let mut output = String::new();
    for error in errors {
        output.push_str(&format!(
            "echo \"{}: {}\" >&2\n",
            escape_shell_value(program),
            escape_shell_value(error)
        ));
    }
    output.push_str("exit 1\n");
    output
}

/// Generate an error output file.
pub fn generate_error_output(program: &str, errors: &[String]) -> Result<PathBuf> {
    write_temp_file(&generate_error_string(program, errors))
}

/// Generate a help script that prints the text and exits 0.
pub fn generate_help_output_string(help_text: &str) -> String {
    heredoc(HELP_DELIMITER, help_text)
}

/// Generate a help output file.
pub fn generate_help_output(help_text: &str) -> Result<PathBuf> {
    write_temp_file(&generate_help_output_string(help_text))
}

/// Generate a version script that prints the text and exits 0.
pub fn generate_version_output_string(version_text: &str) -> String {
    heredoc(VERSION_DELIMITER, version_text)
}

/// Generate a version output file.
pub fn generate_version_output(version_text: &str) -> Result<PathBuf> {
    write_temp_file(&generate_version_output_string(version_text))
}

fn heredoc(delimiter: &str, text: &str) -> String {
    let newline = if text.ends_with('\n') { "" } else { "\n" };
    format!("cat <<'{delimiter}'\n{text}{newline}{delimiter}\nexit 0\n")
}

/// Pretty JSON of the results, keyed by signature.
pub fn generate_json(result: &ParseResult) -> Result<String> {
    Ok(serde_json::to_string_pretty(result)?)
}

/// Pretty JSON of an error list: `{"errors": [...]}`.
pub fn generate_error_json(errors: &[String]) -> Result<String> {
    Ok(serde_json::to_string_pretty(&serde_json::json!({ "errors": errors }))?)
}

/// Write content to a temporary file and return its path.
fn write_temp_file(content: &str) -> Result<PathBuf> {
    let mut file = NamedTempFile::new()?;
    file.write_all(content.as_bytes())?;
    let path = file.into_temp_path().keep()?;
    Ok(path)
}
