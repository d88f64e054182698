//! Positional parameter rewriting

use crate::error::{Error, Result, MAX_QUERY_PARAMETERS};
use crate::types::Value;
use regex::Regex;
use std::sync::LazyLock;

/// Regex for matching positional placeholders: $1, $2, ...
static PLACEHOLDER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$(\d+)").unwrap());

/// Rewrite `$N` placeholders into `?` markers
///
/// Returns the rewritten SQL and the parameters in marker order; a
/// placeholder used twice forwards its parameter twice. SQL without `$N`
/// placeholders is returned unchanged along with the parameters as given.
///
/// Fails with [`Error::Parameter`] when a placeholder is `$0`, refers past
/// the supplied parameters, or the engine's parameter ceiling is exceeded.
pub fn rewrite_placeholders(sql: &str, params: &[Value]) -> Result<(String, Vec<Value>)> {
    let mut ordered = Vec::new();
    let mut rewritten = String::with_capacity(sql.len());
    let mut last = 0;

    for caps in PLACEHOLDER_REGEX.captures_iter(sql) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let digits = &caps[1];
        let index: usize = digits
            .parse()
            .map_err(|_| Error::parameter(format!("placeholder ${digits} is not a valid index")))?;

        if index == 0 {
            return Err(Error::parameter("placeholders start at $1, found $0"));
        }
        if index > MAX_QUERY_PARAMETERS {
            return Err(Error::parameter(format!(
                "placeholder ${index} exceeds the parameter ceiling"
            )));
        }
        if index > params.len() {
            return Err(Error::parameter(format!(
                "placeholder ${index} refers to a missing parameter, only {} supplied",
                params.len()
            )));
        }

        rewritten.push_str(&sql[last..whole.start()]);
        rewritten.push('?');
        last = whole.end();
        ordered.push(params[index - 1].clone());
    }

    if ordered.is_empty() {
        if params.len() > MAX_QUERY_PARAMETERS {
            return Err(Error::parameter(format!(
                "{} parameters supplied",
                params.len()
            )));
        }
        return Ok((sql.to_string(), params.to_vec()));
    }

    rewritten.push_str(&sql[last..]);

    if ordered.len() > MAX_QUERY_PARAMETERS {
        return Err(Error::parameter(format!(
            "statement uses {} parameter markers",
            ordered.len()
        )));
    }

    Ok((rewritten, ordered))
}
