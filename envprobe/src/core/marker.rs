//! Marker-line protocol between the probe and its external child.
//!
//! The child prints one line per requested name:
//!
//! ```text
//! *** NAME: 'value' ***
//! *** NAME: <unset> ***
//! ```
//!
//! The second form is the absence sentinel. Build-system children that only
//! know the first form render an absent variable as `''`.

use std::collections::BTreeMap;

use regex::Regex;

use crate::error::{ProbeError, Result};

/// Sentinel emitted in place of a quoted value when a variable is absent.
pub const ABSENT_SENTINEL: &str = "<unset>";

/// Command-line selector prefix understood by every probe child.
pub const VAR_NAME_FLAG: &str = "--var-name";

pub fn selector_arg(name: &str) -> String {
    format!("{VAR_NAME_FLAG}={name}")
}

/// Values are written verbatim, so a value containing a newline spans
/// several output lines; the parser accepts that.
pub fn format_marker(name: &str, value: Option<&str>) -> String {
    match value {
        Some(value) => format!("*** {name}: '{value}' ***"),
        None => format!("*** {name}: {ABSENT_SENTINEL} ***"),
    }
}

/// Extract the value reported for `name`.
///
/// Returns `Ok(None)` when no marker line exists or the sentinel was used.
/// A quoted value ends at the first `' ***` that closes a line and may not
/// run into another marker line.
/// A line that starts like a marker for `name` but does not complete the
/// grammar is a parse failure.
pub fn parse_marker(stdout: &str, name: &str) -> Result<Option<String>> {
    let escaped = regex::escape(name);
    let marker = Regex::new(&format!(
        r"(?msR)^\*\*\* {escaped}: (?:'(.*?)'|{}) \*\*\*$",
        regex::escape(ABSENT_SENTINEL)
    ))
    .map_err(|err| ProbeError::ProbeParseFailure {
        name: name.to_string(),
        line: err.to_string(),
    })?;

    if let Some(caps) = marker.captures(stdout) {
        let value = caps.get(1).map(|value| value.as_str());
        if let Some(value) = value
            && value.contains("\n*** ")
        {
            return Err(ProbeError::ProbeParseFailure {
                name: name.to_string(),
                line: caps[0].lines().next().unwrap_or_default().to_string(),
            });
        }
        return Ok(value.map(str::to_string));
    }

    let prefix = format!("*** {name}:");
    if let Some(line) = stdout
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .find(|line| line.starts_with(&prefix))
    {
        return Err(ProbeError::ProbeParseFailure {
            name: name.to_string(),
            line: line.to_string(),
        });
    }

    Ok(None)
}

/// Parse every requested name out of one probe response.
pub fn parse_markers<S: AsRef<str>>(
    stdout: &str,
    names: &[S],
) -> Result<BTreeMap<String, Option<String>>> {
    let mut values = BTreeMap::new();
    for name in names {
        let name = name.as_ref();
        values.insert(name.to_string(), parse_marker(stdout, name)?);
    }
    Ok(values)
}
