//! Typed option presets: value-taking [`OptionProps`] with a type check attached.
//!
//! Validators passed in run before the type's own validator.

use crate::entity::OptionProps;
use crate::registry::RegistrationError;
use crate::validate::Validator;
use crate::validators;

/// An integer option. Values are read in `radix` (2 to 36) and stored as
/// decimal text; unparseable input is kept as typed so the validator can
/// report it.
pub fn integer(radix: u32, extra: Vec<Validator>) -> Result<OptionProps, RegistrationError> {
    if !(2..=36).contains(&radix) {
        return Err(RegistrationError::InvalidRadix(radix));
    }
    Ok(OptionProps::new()
        .with_value()
        .transform(move |raw| {
            Ok(i64::from_str_radix(raw, radix)
                .map(|n| n.to_string())
                .unwrap_or_else(|_| raw.to_string()))
        })
        .validators(extra)
        .validator(validators::integer(None)))
}

/// A decimal number option.
pub fn number(extra: Vec<Validator>) -> OptionProps {
    OptionProps::new()
        .with_value()
        .validators(extra)
        .validator(validators::number(None))
}

/// An option restricted to `allowed`, which must not be empty.
pub fn enumeration<I, S>(
    allowed: I,
    extra: Vec<Validator>,
) -> Result<OptionProps, RegistrationError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let allowed: Vec<String> = allowed.into_iter().map(Into::into).collect();
    if allowed.is_empty() {
        return Err(RegistrationError::EmptyChoices("enumeration".to_string()));
    }
    Ok(OptionProps::new()
        .with_value()
        .validators(extra)
        .validator(validators::in_enum(allowed, None)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::{validator, Outcome};
    use crate::ArgvParser;

    fn parse_one(props: OptionProps, argv: &[&str]) -> Result<String, Vec<String>> {
        let mut parser = ArgvParser::new();
        parser.create_option(["-p"], props).unwrap();
        parser
            .parse_blocking(argv)
            .map(|result| result["-p"].as_str().unwrap_or_default().to_string())
    }

    #[test]
    fn test_integer_rejects_text() {
        let errors = parse_one(integer(10, vec![]).unwrap(), &["-p", "abc"]).unwrap_err();
        assert_eq!(errors, vec!["-p: abc is not an integer"]);
    }

    #[test]
    fn test_integer_normalises_radix() {
        assert_eq!(parse_one(integer(10, vec![]).unwrap(), &["-p", "1111"]).unwrap(), "1111");
        assert_eq!(parse_one(integer(10, vec![]).unwrap(), &["-p", "08"]).unwrap(), "8");
        assert_eq!(parse_one(integer(8, vec![]).unwrap(), &["-p", "10"]).unwrap(), "8");
        assert_eq!(parse_one(integer(16, vec![]).unwrap(), &["-p", "ff"]).unwrap(), "255");
    }

    #[test]
    fn test_user_validators_run_first() {
        let omg = validator(|_| Outcome::fail("OMG"));
        let errors = parse_one(integer(10, vec![omg]).unwrap(), &["-p", "abc"]).unwrap_err();
        assert_eq!(errors[0], "OMG");
        assert_eq!(errors.len(), 2);

        let quiet = validator(|_| ());
        let errors = parse_one(number(vec![quiet]), &["-p", "abc"]).unwrap_err();
        assert_eq!(errors, vec!["-p: abc is not a number"]);
    }

    #[test]
    fn test_integer_rejects_bad_radix() {
        for radix in [0, 1, 37, 40] {
            assert!(matches!(
                integer(radix, vec![]),
                Err(RegistrationError::InvalidRadix(r)) if r == radix
            ));
        }
        assert!(integer(2, vec![]).is_ok());
        assert!(integer(36, vec![]).is_ok());
    }

    #[test]
    fn test_number_keeps_text() {
        assert_eq!(parse_one(number(vec![]), &["-p", "11.1"]).unwrap(), "11.1");
    }

    #[test]
    fn test_enumeration() {
        assert!(matches!(
            enumeration(Vec::<String>::new(), vec![]),
            Err(RegistrationError::EmptyChoices(name)) if name == "enumeration"
        ));

        let mut parser = ArgvParser::new();
        let choices = ["1", "2", "3", "4"];
        parser
            .create_option(["-p"], enumeration(choices, vec![]).unwrap())
            .unwrap();
        parser
            .create_option(["-t"], enumeration(choices, vec![]).unwrap())
            .unwrap();
        let errors = parser.parse_blocking(&["-p", "1", "-t", "5"]).unwrap_err();
        assert_eq!(errors, vec!["-t: expected one of [1, 2, 3, 4], got 5"]);
    }
}
