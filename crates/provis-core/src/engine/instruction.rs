//! Touchpoint instruction bodies.
//!
//! Units author per-phase instructions as a `;`-separated list of calls:
//!
//! ```text
//! mkdir(path:${installFolder}/bin); chmod(targetFile:bin/run, permissions:755)
//! ```

use std::collections::BTreeMap;

use super::EngineError;

/// One `name(key:value, ...)` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionCall {
    pub name: String,
    pub arguments: BTreeMap<String, String>,
}

/// Parse an instruction body into its calls, in order.
pub fn parse_instructions(body: &str) -> Result<Vec<ActionCall>, EngineError> {
    body.split(';')
        .map(str::trim)
        .filter(|statement| !statement.is_empty())
        .map(|statement| parse_call(body, statement))
        .collect()
}

fn parse_call(body: &str, statement: &str) -> Result<ActionCall, EngineError> {
    let invalid = |reason: &str| EngineError::InvalidInstruction {
        instruction: body.to_string(),
        reason: format!("{} in '{}'", reason, statement),
    };

    let open = statement.find('(').ok_or_else(|| invalid("missing '('"))?;
    let inner = statement[open + 1..]
        .strip_suffix(')')
        .ok_or_else(|| invalid("missing ')'"))?;
    let name = statement[..open].trim();
    if name.is_empty() {
        return Err(invalid("missing action name"));
    }

    let mut arguments = BTreeMap::new();
    for argument in inner.split(',').map(str::trim).filter(|a| !a.is_empty()) {
        let (key, value) = argument
            .split_once(':')
            .ok_or_else(|| invalid("argument without ':'"))?;
        arguments.insert(key.trim().to_string(), value.trim().to_string());
    }

    Ok(ActionCall {
        name: name.to_string(),
        arguments,
    })
}
