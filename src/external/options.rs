//! Ingestion-option string collaborator (§6).
//!
//! Grammar: `option ::= name '=' value`; `options ::= option (';' option)*`;
//! whitespace is allowed around tokens. `name` is `[A-Za-z][A-Za-z0-9_]*`;
//! `value` is a run of non-whitespace, non-`;` characters. A later
//! occurrence of a name replaces an earlier one, keeping the name's
//! original position (§9: ASCII-only `isalpha`/`isalnum` preserved by
//! specification, since names are declared ASCII).

use crate::error::{CoreError, ErrorKind};

/// Parses an ingestion-option string into an ordered, name-deduplicated
/// list. `P7`: `parse(serialize(opts)) == opts`.
pub fn parse(input: &str) -> Result<Vec<(String, String)>, CoreError> {
    let mut result: Vec<(String, String)> = Vec::new();
    if input.trim().is_empty() {
        return Ok(result);
    }
    for segment in input.split(';') {
        let opt = segment.trim();
        if opt.is_empty() {
            return Err(CoreError::with_message(ErrorKind::IngestionOptionSyntax, "empty option between separators"));
        }
        let eq_pos = opt
            .find('=')
            .ok_or_else(|| CoreError::with_message(ErrorKind::IngestionOptionSyntax, format!("option '{opt}' is missing '='")))?;
        let name = opt[..eq_pos].trim();
        let value = opt[eq_pos + 1..].trim();

        if name.is_empty() {
            return Err(CoreError::with_message(ErrorKind::IngestionOptionSyntax, "option name is empty"));
        }
        if !is_valid_name(name) {
            return Err(CoreError::with_message(
                ErrorKind::InvalidIngestionOption,
                format!("'{name}' is not a valid option name"),
            ));
        }
        if value.is_empty() {
            return Err(CoreError::with_message(
                ErrorKind::InvalidIngestionOptionValue,
                format!("option '{name}' has an empty value"),
            ));
        }
        if value.chars().any(char::is_whitespace) {
            return Err(CoreError::with_message(
                ErrorKind::IngestionOptionSyntax,
                format!("option '{name}' value contains internal whitespace"),
            ));
        }

        match result.iter_mut().find(|(n, _)| n == name) {
            Some(existing) => existing.1 = value.to_string(),
            None => result.push((name.to_string(), value.to_string())),
        }
    }
    Ok(result)
}

/// Canonical serialization: `name=value` pairs joined by `;`, no padding
/// whitespace, so re-parsing always reproduces the same list (`P7`).
pub fn serialize(opts: &[(String, String)]) -> String {
    opts.iter().map(|(n, v)| format!("{n}={v}")).collect::<Vec<_>>().join(";")
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_1_parses_and_trims_whitespace() {
        let opts = parse("a=1; b = two ;c=3").unwrap();
        assert_eq!(
            opts,
            vec![("a".to_string(), "1".to_string()), ("b".to_string(), "two".to_string()), ("c".to_string(), "3".to_string())]
        );
    }

    #[test]
    fn scenario_1_duplicate_name_keeps_later_value() {
        let opts = parse("a=1;a=2").unwrap();
        assert_eq!(opts, vec![("a".to_string(), "2".to_string())]);
    }

    #[test]
    fn scenario_1_empty_name_is_syntax_error() {
        let err = parse("= 5").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IngestionOptionSyntax);
    }

    #[test]
    fn p7_roundtrips_through_serialize() {
        let opts = parse("a=1;b=two;c=3").unwrap();
        let text = serialize(&opts);
        let reparsed = parse(&text).unwrap();
        assert_eq!(opts, reparsed);
    }
}
