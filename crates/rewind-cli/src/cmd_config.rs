use anyhow::{bail, Context};
use rewind_core::{config_path, RewindConfig};
use serde_json::{Map, Value};
use std::path::Path;

/// Read config from `.rewind/config.json`. Returns empty map if file doesn't exist.
fn read_config(path: &Path) -> anyhow::Result<Map<String, Value>> {
    if !path.exists() {
        return Ok(Map::new());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let val: Value = serde_json::from_str(&content)
        .with_context(|| format!("parsing {}", path.display()))?;
    match val {
        Value::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}

fn write_config(path: &Path, config: &Map<String, Value>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&config)?;
    rewind_store::write_atomic(path, json.as_bytes())
}

/// Config keys and their default values, straight from [`RewindConfig`].
fn defaults() -> anyhow::Result<Map<String, Value>> {
    match serde_json::to_value(RewindConfig::default())? {
        Value::Object(map) => Ok(map),
        _ => bail!("config defaults are not an object"),
    }
}

/// Parse `raw` into the JSON shape the key's default has: numbers stay
/// numbers, lists are comma separated, everything else is a string.
fn parse_value(default: &Value, raw: &str) -> anyhow::Result<Value> {
    Ok(match default {
        Value::Number(_) => {
            let n: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("{raw:?} is not a whole number"))?;
            Value::Number(n.into())
        }
        Value::Bool(_) => match raw.trim() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            other => bail!("{other:?} is not true or false"),
        },
        Value::Array(_) => Value::Array(
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| Value::String(s.to_string()))
                .collect(),
        ),
        _ => Value::String(raw.to_string()),
    })
}

/// `rewind config set <key> <value>`
pub fn set(cwd: &Path, key: &str, value: &str) -> anyhow::Result<()> {
    let defaults = defaults()?;
    let Some(default) = defaults.get(key) else {
        let known: Vec<&str> = defaults.keys().map(String::as_str).collect();
        bail!("unknown config key {key:?}; known keys: {}", known.join(", "));
    };
    let path = config_path(cwd);
    let mut config = read_config(&path)?;
    config.insert(key.to_string(), parse_value(default, value)?);

    let candidate: RewindConfig = serde_json::from_value(Value::Object(config.clone()))
        .with_context(|| format!("invalid value for {key}"))?;
    candidate
        .validate()
        .with_context(|| format!("invalid value for {key}"))?;

    write_config(&path, &config)?;
    println!("{key} = {}", config[key]);
    Ok(())
}

/// `rewind config get <key>`
pub fn get(cwd: &Path, key: &str) -> anyhow::Result<()> {
    let config = read_config(&config_path(cwd))?;
    match config.get(key) {
        Some(val) => println!("{val}"),
        None => match defaults()?.get(key) {
            Some(val) => println!("{val} (default)"),
            None => println!("(not set)"),
        },
    }
    Ok(())
}

/// `rewind config list`
pub fn list(cwd: &Path) -> anyhow::Result<()> {
    let config = read_config(&config_path(cwd))?;
    if config.is_empty() {
        println!("(no config set)");
    } else {
        for (k, v) in &config {
            println!("{k} = {v}");
        }
    }
    Ok(())
}
