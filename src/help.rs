//! Help, usage, version and error text for a parser, rendered with Clap.

use crate::entity::{OperandDef, OptionDef};
use crate::registry::ArgvParser;
use crate::shorthand::Shorthand;
use clap::{Arg, ArgAction, Command};
use std::fmt;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

/// Value placeholder for options declared without a `value_name`.
const DEFAULT_VALUE_NAME: &str = "VALUE";

/// Replaces the generated help body.
pub type Formatter = Arc<dyn Fn(&ArgvParser) -> String + Send + Sync>;

/// Custom usage line shown by [`ArgvParser::print_usage`].
#[derive(Clone)]
pub enum Usage {
    Text(String),
    Generate(Arc<dyn Fn() -> String + Send + Sync>),
}

impl Usage {
    fn render(&self) -> String {
        match self {
            Usage::Text(text) => text.clone(),
            Usage::Generate(f) => f(),
        }
    }
}

/// Presentation settings; none of them affect parsing.
#[derive(Clone, Default)]
pub struct HelpSettings {
    /// Program name; defaults to the executable's file name.
    pub prog: Option<String>,
    pub description: Option<String>,
    /// Text printed after everything else.
    pub epilog: Option<String>,
    pub usage: Option<Usage>,
    pub formatter: Option<Formatter>,
}

impl HelpSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prog(mut self, prog: impl Into<String>) -> Self {
        self.prog = Some(prog.into());
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn epilog(mut self, text: impl Into<String>) -> Self {
        self.epilog = Some(text.into());
        self
    }

    pub fn usage(mut self, text: impl Into<String>) -> Self {
        self.usage = Some(Usage::Text(text.into()));
        self
    }

    pub fn usage_fn<F>(mut self, f: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.usage = Some(Usage::Generate(Arc::new(f)));
        self
    }

    pub fn formatter<F>(mut self, f: F) -> Self
    where
        F: Fn(&ArgvParser) -> String + Send + Sync + 'static,
    {
        self.formatter = Some(Arc::new(f));
        self
    }

    /// Effective program name.
    pub fn program_name(&self) -> String {
        if let Some(prog) = &self.prog {
            return prog.clone();
        }
        std::env::args_os()
            .next()
            .as_deref()
            .and_then(|arg0| Path::new(arg0).file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string())
    }
}

impl fmt::Debug for HelpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HelpSettings")
            .field("prog", &self.prog)
            .field("description", &self.description)
            .field("epilog", &self.epilog)
            .field("custom_usage", &self.usage.is_some())
            .field("custom_formatter", &self.formatter.is_some())
            .finish()
    }
}

/// Build a Clap Command mirroring the parser's declarations.
fn build_command(parser: &ArgvParser) -> Command {
    let settings = parser.settings();
    let mut cmd = Command::new(settings.program_name())
        .disable_help_flag(true)
        .disable_version_flag(true)
        .disable_help_subcommand(true);

    if let Some(ref description) = settings.description {
        cmd = cmd.about(description.clone());
    }

    for option in parser.options() {
        cmd = cmd.arg(build_option(option));
    }
    for (index, operand) in parser.operands().enumerate() {
        cmd = cmd.arg(build_operand(operand, index + 1));
    }

    let mut trailer = aliases_section(parser.shorthands());
    if let Some(ref epilog) = settings.epilog {
        if !trailer.is_empty() {
            trailer.push('\n');
        }
        trailer.push_str(epilog);
    }
    if !trailer.is_empty() {
        cmd = cmd.after_help(trailer);
    }

    cmd
}

/// Build a Clap Arg from an option; extra triggers become visible aliases.
fn build_option(option: &OptionDef) -> Arg {
    let mut arg = Arg::new(option.signature().to_string());

    let mut shorts = option
        .triggers()
        .iter()
        .filter(|t| !t.starts_with("--"))
        .filter_map(|t| t.chars().nth(1));
    let mut longs = option
        .triggers()
        .iter()
        .filter_map(|t| t.strip_prefix("--"))
        .map(str::to_string);
    if let Some(short) = shorts.next() {
        arg = arg.short(short).visible_short_aliases(shorts);
    }
    if let Some(long) = longs.next() {
        arg = arg.long(long).visible_aliases(longs.collect::<Vec<_>>());
    }

    if option.has_value() {
        arg = arg
            .action(if option.allow_multiple() {
                ArgAction::Append
            } else {
                ArgAction::Set
            })
            .value_name(option.value_name().unwrap_or(DEFAULT_VALUE_NAME).to_string());
        if !option.requires_value() {
            arg = arg.num_args(0..=1);
        }
    } else {
        arg = arg.action(ArgAction::SetTrue);
    }

    if let Some(default) = option.default_value() {
        arg = arg.default_value(default.to_string());
    }
    if let Some(help) = option.description() {
        arg = arg.help(help.to_string());
    }
    if let Some(group) = option.group_name() {
        arg = arg.help_heading(group.to_string());
    }
    arg.hide(option.is_hidden())
}

/// Build a positional Clap Arg; greedy operands read `NAME+`.
fn build_operand(operand: &OperandDef, index: usize) -> Arg {
    let value_name = if operand.is_greedy() {
        format!("{}+", operand.value_name())
    } else {
        operand.value_name().to_string()
    };
    let mut arg = Arg::new(operand.signature().to_string())
        .index(index)
        .action(ArgAction::Set)
        .value_name(value_name);

    if let Some(help) = operand.description() {
        arg = arg.help(help.to_string());
    }
    if let Some(group) = operand.group_name() {
        arg = arg.help_heading(group.to_string());
    }
    arg.hide(operand.is_hidden())
}

/// `Aliases:` block listing every shorthand next to what it stands for.
fn aliases_section<'a>(shorthands: impl Iterator<Item = &'a Shorthand>) -> String {
    let entries: Vec<(&str, String)> = shorthands
        .map(|sh| {
            let expansion = match sh.expansion() {
                [flag, value] => format!("{flag}={value}"),
                tokens => tokens.join(" "),
            };
            (sh.trigger(), expansion)
        })
        .collect();
    if entries.is_empty() {
        return String::new();
    }

    let width = entries.iter().map(|(t, _)| t.len()).max().unwrap_or(0);
    let mut section = String::from("Aliases:\n");
    for (trigger, expansion) in entries {
        section.push_str(&format!("  {trigger:<width$} => {expansion}\n"));
    }
    section
}

/// Generate the full help text.
pub fn generate_help(parser: &ArgvParser) -> String {
    if let Some(formatter) = &parser.settings().formatter {
        return formatter(parser);
    }
    build_command(parser).render_help().to_string()
}

/// Generate the usage line, honouring a custom usage setting.
pub fn generate_usage(parser: &ArgvParser) -> String {
    match &parser.settings().usage {
        Some(usage) => usage.render(),
        None => build_command(parser).render_usage().to_string(),
    }
}

/// Generate the version line.
pub fn generate_version(parser: &ArgvParser, version: &str) -> String {
    format!("{} version {}\n", parser.settings().program_name(), version)
}

/// Write each error as an `ERROR: <msg>` line.
pub fn write_errors(errors: &[String], out: &mut dyn Write) -> io::Result<()> {
    for error in errors {
        writeln!(out, "ERROR: {error}")?;
    }
    Ok(())
}

impl ArgvParser {
    /// Writes the help text to `out`.
    pub fn print_help(&self, out: &mut dyn Write) -> io::Result<()> {
        write_block(out, &generate_help(self))
    }

    /// Writes `errors`, then the usage line; `verbose` appends the full help
    /// unless a custom usage is configured.
    pub fn print_usage(
        &self,
        errors: &[String],
        verbose: bool,
        out: &mut dyn Write,
    ) -> io::Result<()> {
        write_errors(errors, out)?;
        write_block(out, &generate_usage(self))?;
        if verbose && self.settings().usage.is_none() {
            write_block(out, &generate_help(self))?;
        }
        Ok(())
    }

    pub fn print_version(&self, version: &str, out: &mut dyn Write) -> io::Result<()> {
        out.write_all(generate_version(self, version).as_bytes())
    }
}

fn write_block(out: &mut dyn Write, text: &str) -> io::Result<()> {
    out.write_all(text.as_bytes())?;
    if !text.ends_with('\n') {
        out.write_all(b"\n")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{OperandProps, OptionProps};

    fn parser() -> ArgvParser {
        let mut p = ArgvParser::with_settings(
            HelpSettings::new()
                .prog("myscript")
                .description("My awesome script")
                .epilog("See the manual for more."),
        );
        p.create_option(["-v", "--verbose"], OptionProps::new().description("Be chatty"))
            .unwrap();
        p.create_option(
            ["-o", "--output", "--out"],
            OptionProps::new()
                .default_value("out.txt")
                .value_name("FILE")
                .description("Output file")
                .group("Output"),
        )
        .unwrap();
        p.create_option(["--secret"], OptionProps::new().hidden()).unwrap();
        p.create_operand(Some("INPUT"), OperandProps::new().description("Input file"))
            .unwrap();
        p.create_operand(Some("REST"), OperandProps::new().greedy()).unwrap();
        p.add_shorthand("-O", ["--output", "stdout"]).unwrap();
        p
    }

    fn written(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_generate_help_lists_declarations() {
        let help = generate_help(&parser());

        assert!(help.contains("myscript"), "{help}");
        assert!(help.contains("My awesome script"), "{help}");
        assert!(help.contains("--verbose"), "{help}");
        assert!(help.contains("Be chatty"), "{help}");
        assert!(help.contains("FILE"), "{help}");
        assert!(help.contains("out.txt"), "{help}");
        assert!(help.contains("Output:"), "{help}");
        assert!(help.contains("REST+"), "{help}");
        assert!(help.contains("See the manual for more."), "{help}");
        assert!(!help.contains("--secret"), "{help}");
    }

    #[test]
    fn test_generate_help_lists_aliases() {
        let help = generate_help(&parser());
        assert!(help.contains("Aliases:"), "{help}");
        assert!(help.contains("-O => --output=stdout"), "{help}");
    }

    #[test]
    fn test_custom_formatter_replaces_help() {
        let p = ArgvParser::with_settings(
            HelpSettings::new().formatter(|p: &ArgvParser| format!("{} entries", p.entities().len())),
        );
        assert_eq!(generate_help(&p), "0 entries");
    }

    #[test]
    fn test_usage() {
        let usage = generate_usage(&parser());
        assert!(usage.contains("myscript"), "{usage}");

        let p = ArgvParser::with_settings(HelpSettings::new().usage("use it wisely"));
        assert_eq!(generate_usage(&p), "use it wisely");
        let p = ArgvParser::with_settings(HelpSettings::new().usage_fn(|| "generated".into()));
        assert_eq!(generate_usage(&p), "generated");
    }

    #[test]
    fn test_print_usage_with_errors() {
        let p = ArgvParser::with_settings(HelpSettings::new().usage("usage: x"));
        let text = written(|out| p.print_usage(&["bad thing".to_string()], true, out));
        assert_eq!(text, "ERROR: bad thing\nusage: x\n");
    }

    #[test]
    fn test_print_usage_verbose_appends_help() {
        let p = parser();
        let text = written(|out| p.print_usage(&[], true, out));
        assert!(text.contains("Aliases:"), "{text}");
    }

    #[test]
    fn test_print_version() {
        let p = ArgvParser::with_settings(HelpSettings::new().prog("myapp"));
        let text = written(|out| p.print_version("2.1.0", out));
        assert_eq!(text, "myapp version 2.1.0\n");
    }
}
