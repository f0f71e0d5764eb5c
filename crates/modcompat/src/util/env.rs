//! Helpers for inspecting the program's environment.

use std::collections::BTreeMap;

/// Returns every environment variable of the current process whose name starts with a given
/// prefix, sorted by name.
pub fn prefixed_vars(prefix: &str) -> BTreeMap<String, String> {
    std::env::vars()
        .filter(|(name, _)| name.starts_with(prefix))
        .collect()
}

/// Returns every environment variable with a given prefix as `NAME=value` lines.
pub fn dump_string(prefix: &str) -> String {
    prefixed_vars(prefix)
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("\n")
}
