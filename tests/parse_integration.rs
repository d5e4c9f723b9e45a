//! End-to-end parsing through the public API.

use posix_argv::validators::{self, interpolate};
use posix_argv::{
    validator, ArgSnapshot, ArgvParser, Config, OperandProps, OptionProps, Outcome, ParseResult,
    RegistrationError, Value,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn parse(parser: &ArgvParser, argv: &[&str]) -> ParseResult {
    parser
        .parse_blocking(argv)
        .unwrap_or_else(|errors| panic!("unexpected errors: {errors:?}"))
}

fn errors(parser: &ArgvParser, argv: &[&str]) -> Vec<String> {
    parser
        .parse_blocking(argv)
        .expect_err("expected parse errors")
}

#[test]
fn test_overlapping_triggers_fail_at_registration() {
    let mut p = ArgvParser::new();
    p.create_option(["-v", "--verbose"], OptionProps::new()).unwrap();
    for triggers in [vec!["-v"], vec!["--verbose"], vec!["-q", "-v"]] {
        assert!(matches!(
            p.create_option(triggers, OptionProps::new()),
            Err(RegistrationError::DuplicateOption(_))
        ));
    }
    assert_eq!(p.options().count(), 1);
}

#[test]
fn test_grouped_shorthands_set_every_option() {
    let mut p = ArgvParser::new();
    p.create_option(["-t"], OptionProps::new()).unwrap();
    p.create_option(["--width"], OptionProps::new().with_value()).unwrap();
    p.create_option(["--depth"], OptionProps::new().with_value()).unwrap();
    p.add_shorthand("-1", ["--width", "1"]).unwrap();
    p.add_shorthand("-2", ["--depth", "2"]).unwrap();

    let result = parse(&p, &["-12t"]);
    assert!(result.is_set("-t"));
    assert_eq!(result.value("--width"), Some(&Value::from("1")));
    assert_eq!(result.value("--depth"), Some(&Value::from("2")));
}

#[test]
fn test_shorthand_needing_value() {
    let mut p = ArgvParser::new();
    p.create_option(["--port"], OptionProps::new().with_value()).unwrap();
    p.add_shorthand("-P", ["--port"]).unwrap();

    assert_eq!(parse(&p, &["-P", "80"])["--port"].as_str(), Some("80"));
    assert_eq!(errors(&p, &["-P"]), vec!["no value specified for --port"]);
}

#[test]
fn test_multiple_and_override() {
    let mut p = ArgvParser::new();
    p.create_option(["-I"], OptionProps::new().with_value().multiple()).unwrap();
    p.create_option(["-o"], OptionProps::new().with_value().overridable()).unwrap();
    p.create_option(["-v"], OptionProps::new().multiple()).unwrap();

    let result = parse(&p, &["-I", "a", "-o", "x", "-Ib", "-vvv"]);
    assert_eq!(result["-I"].values(), ["a", "b"]);
    assert_eq!(result["-o"].as_str(), Some("x"));
    assert_eq!(result["-v"].times_set, 3);

    let result = parse(&p, &["-o", "x", "-o", "y", "-o", "z"]);
    assert_eq!(result["-o"].as_str(), Some("z"));
    assert_eq!(result["-o"].times_set, 3);
}

#[test]
fn test_greedy_operand_boundaries() {
    let mut p = ArgvParser::new();
    p.create_operand(None, OperandProps::new().greedy()).unwrap();

    let empty = parse(&p, &[]);
    assert!(!empty["OPD"].is_set);
    assert_eq!(empty["OPD"].value, Some(Value::Multiple(vec![])));

    let full = parse(&p, &["a", "b", "c"]);
    assert_eq!(full["OPD"].values(), ["a", "b", "c"]);
}

#[test]
fn test_greedy_operand_survives_interleaved_options() {
    let mut p = ArgvParser::new();
    p.create_option(["-l"], OptionProps::new()).unwrap();
    p.create_option(["-n"], OptionProps::new().with_value()).unwrap();
    p.create_operand(Some("files"), OperandProps::new().greedy()).unwrap();

    let result = parse(&p, &["a", "-l", "b", "-n", "3", "c", "--", "-d"]);
    assert_eq!(result["files"].values(), ["a", "b", "c", "-d"]);
    assert_eq!(result["-n"].as_str(), Some("3"));
}

#[test]
fn test_operand_precedence() {
    let mut p = ArgvParser::new();
    p.create_operand(Some("first"), OperandProps::new()).unwrap();
    p.create_operand(Some("rest"), OperandProps::new().greedy()).unwrap();
    let result = parse(&p, &["foo", "bar", "baz"]);
    assert_eq!(result["first"].as_str(), Some("foo"));
    assert_eq!(result["rest"].values(), ["bar", "baz"]);

    let mut p = ArgvParser::new();
    p.create_operand(Some("rest"), OperandProps::new().greedy()).unwrap();
    p.create_operand(Some("last"), OperandProps::new()).unwrap();
    let result = parse(&p, &["foo", "bar", "baz"]);
    assert_eq!(result["rest"].values(), ["foo", "bar", "baz"]);
    assert!(!result["last"].is_set);
}

#[test]
fn test_separator_keeps_option_lookalikes() {
    let mut p = ArgvParser::new();
    p.create_option(["-p"], OptionProps::new()).unwrap();
    p.create_operand(None, OperandProps::new()).unwrap();

    let result = parse(&p, &["-p", "--", "-gocha"]);
    assert_eq!(result["-p"].times_set, 1);
    assert_eq!(result["OPD"].as_str(), Some("-gocha"));

    assert_eq!(
        errors(&p, &["--", "a", "b"]),
        vec!["unknown operand 'b'"]
    );
}

#[test]
fn test_validator_errors_follow_declaration_order() {
    let mut p = ArgvParser::new();
    let fail = || {
        validator(|s: ArgSnapshot| {
            let msg = format!("{} is never valid", s.signature);
            Outcome::pending(async move { Err(msg) })
        })
    };
    p.create_option(["-a"], OptionProps::new().validator(fail())).unwrap();
    p.create_option(["-b"], OptionProps::new().validator(fail())).unwrap();

    let errs = errors(&p, &["-b", "-a"]);
    assert_eq!(errs, vec!["-a is never valid", "-b is never valid"]);
}

#[test]
fn test_equals_sign_is_literal() {
    let mut p = ArgvParser::new();
    p.create_option(["-p"], OptionProps::new().with_value()).unwrap();

    assert_eq!(parse(&p, &["-p", "="])["-p"].as_str(), Some("="));
    assert_eq!(errors(&p, &["-p", "=", "123"]), vec!["unknown argument '123'"]);
}

#[test]
fn test_state_resets_between_parses() {
    let mut p = ArgvParser::new();
    p.create_option(["-v"], OptionProps::new()).unwrap();
    assert!(parse(&p, &["-v"]).is_set("-v"));
    assert!(!parse(&p, &[]).is_set("-v"));
    assert!(parse(&p, &["-v"]).is_set("-v"));
}

#[test]
fn test_every_structural_error_is_reported() {
    let mut p = ArgvParser::new();
    p.create_option(["-p", "--port"], OptionProps::new().with_value()).unwrap();
    p.create_option(["-f"], OptionProps::new()).unwrap();

    let errs = errors(&p, &["-x", "--port", "-f", "-f", "--f", "-f=1"]);
    assert_eq!(
        errs,
        vec![
            "unknown argument '-x'",
            "no value specified for -p|--port",
            "value already set for -f",
            "unknown argument '--f'",
            "-f does not take a value",
        ]
    );
}

#[test]
fn test_validators_see_snapshots_only() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let mut p = ArgvParser::new();
    p.create_option(
        ["-n"],
        OptionProps::new()
            .with_value()
            .multiple()
            .validator(validator(move |mut s: ArgSnapshot| {
                seen.fetch_add(1, Ordering::SeqCst);
                s.value = None;
                s.times_set = 0;
            }))
            .validator(validators::max_times_set(2, None)),
    )
    .unwrap();

    let result = parse(&p, &["-n", "1", "-n", "2"]);
    assert_eq!(result["-n"].values(), ["1", "2"]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    assert_eq!(
        errors(&p, &["-n", "1", "-n", "2", "-n", "3"]),
        vec![interpolate("${1}: can only be set ${2} times.", &["-n", "2"])]
    );
}

#[test]
fn test_panics_become_single_error() {
    let mut p = ArgvParser::new();
    p.create_option(
        ["-p"],
        OptionProps::new()
            .with_value()
            .transform(|_| -> Result<String, String> { panic!("transform exploded") }),
    )
    .unwrap();
    assert_eq!(errors(&p, &["-p", "x"]), vec!["transform exploded"]);
}

#[test]
fn test_filesystem_validator_on_operand() {
    let dir = tempfile::tempdir().unwrap();
    let present = dir.path().join("present.txt");
    std::fs::write(&present, "hi").unwrap();
    let missing = dir.path().join("missing.txt");

    let mut p = ArgvParser::new();
    p.create_operand(Some("FILE"), OperandProps::new().validator(validators::file(None)))
        .unwrap();

    assert!(p.parse_blocking(&[present.to_str().unwrap()]).is_ok());
    let errs = errors(&p, &[missing.to_str().unwrap()]);
    assert_eq!(
        errs,
        vec![format!("FILE: {} is not a file", missing.display())]
    );
}

#[test]
fn test_config_round_trip_through_parser() {
    let config = Config::from_json(
        r#"{
            "name": "deploy",
            "args": [
                {"type": "option", "triggers": ["-e", "--env"], "has_value": true,
                 "choices": ["dev", "prod"], "validators": ["required"]},
                {"type": "option", "triggers": ["-r", "--retries"], "has_value": true,
                 "value_type": "integer", "default": "3"},
                {"type": "option", "triggers": ["-f", "--force"]},
                {"type": "shorthand", "trigger": "-P", "expansion": ["--env", "prod"]},
                {"type": "operand", "name": "TARGETS", "greedy": true}
            ]
        }"#,
    )
    .unwrap();
    let parser = config.build().unwrap();

    let result = parse(&parser, &["-fP", "web", "db"]);
    assert!(result.is_set("--force"));
    assert_eq!(result["--env"].as_str(), Some("prod"));
    assert_eq!(result["--retries"].as_str(), Some("3"));
    assert!(!result["--retries"].is_set);
    assert_eq!(result["TARGETS"].values(), ["web", "db"]);

    assert_eq!(
        errors(&parser, &["-r", "x"]),
        vec!["-e|--env is required.", "-r|--retries: x is not an integer"]
    );
}

#[test]
fn test_parse_future_is_awaitable() {
    let mut p = ArgvParser::new();
    p.create_option(["-q"], OptionProps::new()).unwrap();
    let result = futures_executor::block_on(p.parse(&["-q"])).unwrap();
    assert!(result.is_set("-q"));
}
