//! CLI command implementations.
//!
//! Each submodule corresponds to a top-level CLI command and works on the
//! registries produced by [`crate::loader::load_plugins`].

pub mod agent;
pub mod workflow;

use std::path::Path;

use plugflow_core::models::JsonMap;

use crate::loader::{self, LoadedPlugins};

/// Load the plugins directory, echoing loader warnings to stderr.
pub fn load(plugins_dir: &str) -> Result<LoadedPlugins, String> {
    let loaded = loader::load_plugins(Path::new(plugins_dir))?;
    for warning in &loaded.warnings {
        eprintln!("⚠️  {}", warning);
    }
    Ok(loaded)
}

/// Split a `plugin/name` key.
pub fn parse_key(key: &str) -> Result<(&str, &str), String> {
    match key.split_once('/') {
        Some((plugin, name)) if !plugin.is_empty() && !name.is_empty() => Ok((plugin, name)),
        _ => Err(format!("Expected <plugin>/<name>, got '{}'", key)),
    }
}

/// Parse `key=value` pairs. Values are read as JSON when they parse,
/// otherwise kept as strings.
pub fn parse_vars(pairs: &[String]) -> Result<JsonMap, String> {
    let mut vars = JsonMap::new();
    for pair in pairs {
        let (key, raw) = pair
            .split_once('=')
            .ok_or_else(|| format!("Expected key=value, got '{}'", pair))?;
        let value = serde_json::from_str(raw)
            .unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
        vars.insert(key.to_string(), value);
    }
    Ok(vars)
}

/// Read a JSON object from a file.
pub fn read_json_object(path: &str) -> Result<JsonMap, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read '{}': {}", path, e))?;
    match serde_json::from_str(&text) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(_) => Err(format!("'{}' must contain a JSON object", path)),
        Err(e) => Err(format!("Invalid JSON in '{}': {}", path, e)),
    }
}

/// Pretty-print a JSON value to stdout.
pub fn print_json(value: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
    );
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_vars() {
        let vars = parse_vars(&[
            "env=production".to_string(),
            "replicas=3".to_string(),
            "targets=[\"a\",\"b\"]".to_string(),
            "empty=".to_string(),
        ])
        .unwrap();
        assert_eq!(vars["env"], "production");
        assert_eq!(vars["replicas"], 3);
        assert_eq!(vars["targets"], json!(["a", "b"]));
        assert_eq!(vars["empty"], "");
        assert!(parse_vars(&["novalue".to_string()]).is_err());
    }

    #[test]
    fn test_parse_key() {
        assert_eq!(parse_key("quality/review").unwrap(), ("quality", "review"));
        assert!(parse_key("review").is_err());
        assert!(parse_key("/review").is_err());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
    }
}
