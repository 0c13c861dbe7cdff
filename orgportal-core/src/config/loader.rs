use std::path::Path;

use super::value::ConfigValue;
use super::{ConfigError, ConfigMap};

/// Load a YAML file into `values` if it exists. A missing file is not an error.
pub(crate) fn merge_yaml_file(
    path: &Path,
    values: &mut ConfigMap,
) -> Result<(), ConfigError> {
    if !path.exists() {
        return Ok(());
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Load(format!("{}: {e}", path.display())))?;
    let yaml = parse(&content).map_err(|e| ConfigError::Load(format!("{}: {e}", path.display())))?;
    flatten_yaml("", &yaml, values);
    Ok(())
}

/// Parse a YAML string and flatten it into `values`.
pub(crate) fn merge_yaml_str(
    content: &str,
    values: &mut ConfigMap,
) -> Result<(), ConfigError> {
    let yaml = parse(content).map_err(ConfigError::Load)?;
    flatten_yaml("", &yaml, values);
    Ok(())
}

fn parse(content: &str) -> Result<serde_yaml::Value, String> {
    serde_yaml::from_str(content).map_err(|e| e.to_string())
}

/// Flatten a YAML tree into dot-separated keys.
///
/// Sequences are stored whole under their parent key and element by element
/// under `key.0`, `key.1`, ... so environment variables can address items.
pub(crate) fn flatten_yaml(
    prefix: &str,
    value: &serde_yaml::Value,
    out: &mut ConfigMap,
) {
    let join = |segment: &str| {
        if prefix.is_empty() {
            segment.to_string()
        } else {
            format!("{prefix}.{segment}")
        }
    };

    match value {
        serde_yaml::Value::Mapping(map) => {
            for (k, v) in map {
                let segment = match k {
                    serde_yaml::Value::String(s) => s.clone(),
                    other => ConfigValue::from_yaml(other).to_string(),
                };
                flatten_yaml(&join(&segment), v, out);
            }
        }
        serde_yaml::Value::Sequence(items) if !prefix.is_empty() => {
            out.insert(
                prefix.to_string(),
                ConfigValue::List(items.iter().map(ConfigValue::from_yaml).collect()),
            );
            for (i, item) in items.iter().enumerate() {
                flatten_yaml(&join(&i.to_string()), item, out);
            }
        }
        leaf if !prefix.is_empty() => {
            out.insert(prefix.to_string(), ConfigValue::from_yaml(leaf));
        }
        _ => {}
    }
}
