//! Variable interpolation for command templates
//!
//! Tool commands are configured as templates using the `${var}` syntax.

use crate::error::{InterpolationError, InterpolationResult};
use regex::Regex;
use std::collections::HashMap;
use std::env;
use std::sync::OnceLock;

fn var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex"))
}

fn lookup(name: &str, vars: &HashMap<String, String>) -> Option<String> {
    vars.get(name).cloned().or_else(|| env::var(name).ok())
}

/// Interpolate variables in a string
///
/// `${var}` is looked up in `vars`, then in the environment; an unknown
/// variable is an error. Only references written in `s` are replaced.
/// Substituted values are inserted literally, even if they contain `${...}`.
pub fn interpolate(s: &str, vars: &HashMap<String, String>) -> InterpolationResult<String> {
    let mut result = String::with_capacity(s.len());
    let mut last = 0;

    for caps in var_pattern().captures_iter(s) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let value = lookup(&caps[1], vars)
            .ok_or_else(|| InterpolationError::UndefinedVariable(caps[1].to_string()))?;
        result.push_str(&s[last..whole.start()]);
        result.push_str(&value);
        last = whole.end();
    }
    result.push_str(&s[last..]);

    Ok(result)
}
