//! Environment variable overrides for configuration sections
//!
//! Variables named `TOLLGATE_<SECTION>__<KEY>[__<SUB>...]` override the
//! matching key of the parsed TOML document before it is deserialized.

use toml::{Table, Value};

/// Prefix shared by every override variable
pub const ENV_PREFIX: &str = "TOLLGATE_";

/// Section names accepted after the prefix and the table path they map to
const SECTIONS: &[(&str, &[&str])] = &[
    ("SERVER", &["server"]),
    ("MCP", &["mcp"]),
    ("LOG", &["telemetry"]),
    ("X402", &["payment"]),
    ("WIKIPEDIA", &["services", "wikipedia"]),
    ("TAVILY", &["services", "tavily"]),
    ("WEATHER", &["services", "weather"]),
    ("TTS", &["services", "tts"]),
    ("QDRANT", &["services", "qdrant"]),
    ("YOUTUBE", &["services", "youtube"]),
    ("POSTGRES", &["services", "postgres"]),
    ("ARXIV", &["services", "arxiv"]),
];

/// Keys whose values stay strings even when they read as numbers or booleans
const STRING_KEYS: &[&str] = &[
    "api_key",
    "url",
    "base_url",
    "transcript_base_url",
    "transcript_cache_path",
    "pay_to",
    "asset",
    "facilitator_url",
    "public_base_url",
    "listen_address",
    "language",
    "model",
    "path",
    "description",
    "instructions",
    "filter",
];

/// Apply matching variables to the document, returning the keys that were set
///
/// Variables with an unknown section or without a `__` separator are
/// ignored, which keeps `TOLLGATE_CONFIG` and similar CLI variables out of
/// the document.
pub fn apply_env_overrides<I>(root: &mut Table, vars: I) -> Vec<String>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut applied = Vec::new();

    let mut vars: Vec<(String, String)> = vars.into_iter().collect();
    // Deterministic application order regardless of environment ordering
    vars.sort();

    for (name, raw) in vars {
        let Some(path) = override_path(&name) else {
            continue;
        };

        let value = parse_value(path.last().map_or("", String::as_str), &raw);

        if insert_path(root, &path, value) {
            applied.push(path.join("."));
        } else {
            tracing::warn!(variable = %name, "ignoring override that conflicts with a non-table value");
        }
    }

    applied
}

/// Translate a variable name into a table path
fn override_path(name: &str) -> Option<Vec<String>> {
    let rest = name.strip_prefix(ENV_PREFIX)?;
    let (section, keys) = rest.split_once("__")?;

    let (_, base) = SECTIONS.iter().find(|(s, _)| *s == section)?;

    let keys: Vec<String> = keys.split("__").map(str::to_ascii_lowercase).collect();
    if keys.iter().any(String::is_empty) {
        return None;
    }

    Some(base.iter().map(|s| (*s).to_string()).chain(keys).collect())
}

/// Interpret a raw variable value
///
/// TOML inline values (`true`, `42`, `1.5`, `["a", "b"]`, `"quoted"`) keep
/// their type; anything else is a plain string. Keys in [`STRING_KEYS`]
/// only honor the quoted form, so a numeric API key stays a string.
fn parse_value(key: &str, raw: &str) -> Value {
    let parsed = toml::from_str::<Table>(&format!("v = {raw}"))
        .ok()
        .and_then(|mut table| table.remove("v"));

    match parsed {
        Some(Value::String(value)) => Value::String(value),
        Some(value) if !STRING_KEYS.contains(&key) => value,
        _ => Value::String(raw.to_string()),
    }
}

/// Insert a value at a dotted path, creating intermediate tables
fn insert_path(root: &mut Table, path: &[String], value: Value) -> bool {
    let Some((last, parents)) = path.split_last() else {
        return false;
    };

    let mut table = root;
    for key in parents {
        let entry = table
            .entry(key.clone())
            .or_insert_with(|| Value::Table(Table::new()));

        match entry {
            Value::Table(next) => table = next,
            _ => return false,
        }
    }

    table.insert(last.clone(), value);
    true
}
