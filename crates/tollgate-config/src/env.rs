use std::sync::OnceLock;

use regex::Regex;

/// Expand `{{ env.VAR }}` placeholders using the process environment
pub fn expand_env(input: &str) -> Result<String, String> {
    expand_with(input, |name| std::env::var(name).ok())
}

/// Expand `{{ env.VAR }}` placeholders in raw TOML text
///
/// `{{ env.VAR | default("fallback") }}` substitutes the fallback when the
/// variable is unset. Lines whose first non-blank character is `#` are
/// copied unchanged so commented-out secrets never fail the load.
pub fn expand_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<String, String> {
    fn re() -> &'static Regex {
        static RE: OnceLock<Regex> = OnceLock::new();
        // Group 1: scoped key, group 2: optional default
        RE.get_or_init(|| {
            Regex::new(r#"\{\{\s*([a-zA-Z0-9_.]+)\s*(?:\|\s*default\("([^"]*)"\))?\s*\}\}"#)
                .expect("must be valid regex")
        })
    }

    let mut output = String::with_capacity(input.len());

    for (i, line) in input.lines().enumerate() {
        if i > 0 {
            output.push('\n');
        }

        if line.trim_start().starts_with('#') {
            output.push_str(line);
            continue;
        }

        let mut last_end = 0;

        for captures in re().captures_iter(line) {
            let (Some(whole), Some(key)) = (captures.get(0), captures.get(1)) else {
                continue;
            };

            output.push_str(&line[last_end..whole.start()]);

            let Some(name) = key.as_str().strip_prefix("env.").filter(|n| !n.contains('.')) else {
                return Err(format!("only variables scoped with 'env.' are supported: `{}`", key.as_str()));
            };

            match (lookup(name), captures.get(2)) {
                (Some(value), _) => output.push_str(&value),
                (None, Some(default)) => output.push_str(default.as_str()),
                (None, None) => return Err(format!("environment variable not found: `{name}`")),
            }

            last_end = whole.end();
        }

        output.push_str(&line[last_end..]);
    }

    if input.ends_with('\n') {
        output.push('\n');
    }

    Ok(output)
}
