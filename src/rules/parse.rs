//! Strict parser for attribute files.
//!
//! Line grammar (whitespace separated):
//!   `<pattern> -`                     ignore
//!   `-<pattern>`                      ignore
//!   `<pattern> binary [binary]`       binary
//!   `<pattern> <local> [<remote>]`    text with explicit encodings
//!
//! Blank lines and `#` comments are skipped. Any other shape is rejected.

use super::Rule;
use super::encoding::is_known_encoding;

/// A rejected line: 1-based line number plus the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Parse the full text of an attribute file into rules, in file order.
pub fn parse_rules(text: &str) -> Result<Vec<Rule>, RowError> {
    let mut rules = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }
        let rule = parse_row(line).map_err(|message| RowError {
            line: idx + 1,
            message,
        })?;
        rules.push(rule);
    }
    Ok(rules)
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(pos) => &line[..pos],
        None => line,
    }
}

fn parse_row(line: &str) -> Result<Rule, String> {
    let columns: Vec<&str> = line.split_whitespace().collect();
    let (&first, rest) = columns
        .split_first()
        .ok_or_else(|| "empty row".to_string())?;

    if let Some(pattern) = first.strip_prefix('-') {
        if pattern.is_empty() {
            return Err("'-' must be followed by a pattern".into());
        }
        if !rest.is_empty() {
            return Err(format!(
                "excluded pattern '{first}' takes no further columns, found {}",
                rest.len()
            ));
        }
        return Ok(Rule::ignored(pattern));
    }

    match rest {
        [] => Err(format!(
            "pattern '{first}' needs '-', 'binary' or an encoding column"
        )),
        ["-"] => Ok(Rule::ignored(first)),
        [flag] if flag.eq_ignore_ascii_case("binary") => Ok(Rule::binary(first)),
        [flag, remote] if flag.eq_ignore_ascii_case("binary") => {
            if remote.eq_ignore_ascii_case("binary") {
                Ok(Rule::binary(first))
            } else {
                Err(format!(
                    "binary rule '{first}' cannot name a remote encoding ('{remote}')"
                ))
            }
        }
        [local] => Ok(Rule::text(first, Some(encoding(local)?), None)),
        [local, remote] => {
            if remote.eq_ignore_ascii_case("binary") || *remote == "-" {
                return Err(format!(
                    "text rule '{first}' cannot mix encoding '{local}' with '{remote}'"
                ));
            }
            Ok(Rule::text(first, Some(encoding(local)?), Some(encoding(remote)?)))
        }
        _ => Err(format!(
            "expected at most 3 columns, found {}",
            rest.len() + 1
        )),
    }
}

fn encoding(token: &str) -> Result<String, String> {
    if is_known_encoding(token) {
        Ok(token.to_ascii_uppercase())
    } else {
        Err(format!("unknown encoding '{token}'"))
    }
}
