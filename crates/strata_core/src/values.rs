//! Assembly of the merged value mapping for one invocation.
//!
//! Merge order, lowest to highest precedence: layered `values.yaml` files
//! (root defaults first, cluster+environment last), explicit value files
//! in the order given, command-line overrides. All reads happen here;
//! after the merge the result is pure data.

use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::layers::{resolve, FindMode, Selector};
use crate::merge::{merge_all, MergePolicy};

/// Values file present at every layer.
pub const VALUES_FILE: &str = "values.yaml";

/// Load one YAML document, treating an empty or comment-only file as an
/// empty mapping. Freshly scaffolded layers start with an empty
/// `values.yaml`.
pub fn load_document(path: &Path) -> CoreResult<Value> {
    debug!(path = %path.display(), "loading value file");
    let content = fs::read_to_string(path)?;

    let doc: Value = if content.trim().is_empty() {
        Value::Null
    } else {
        serde_yaml::from_str(&content)?
    };

    Ok(match doc {
        Value::Null => Value::Mapping(Mapping::new()),
        other => other,
    })
}

/// Load every layered values file for the selection, least specific first.
pub fn load_layered(root: &Path, selector: &Selector) -> CoreResult<Vec<Value>> {
    let layers = resolve(root, selector, VALUES_FILE, FindMode::FILES)?;
    layers
        .iter()
        .map(|layer| load_document(&layer.path))
        .collect()
}

/// Parse one `key=value` override as given on the command line.
pub fn parse_set_value(raw: &str) -> CoreResult<(String, String)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(CoreError::InvalidOverride(raw.to_string())),
    }
}

/// Turn `--set` pairs into the highest-precedence overlay mapping.
pub fn overrides_mapping(pairs: &[(String, String)]) -> Value {
    let mut map = Mapping::new();
    for (key, value) in pairs {
        map.insert(
            Value::String(key.clone()),
            Value::String(value.clone()),
        );
    }
    Value::Mapping(map)
}

/// Build the final variable namespace for one invocation.
pub fn build(
    root: &Path,
    selector: &Selector,
    value_files: &[PathBuf],
    overrides: &[(String, String)],
    policy: MergePolicy,
) -> CoreResult<Value> {
    let mut docs = load_layered(root, selector)?;
    for path in value_files {
        docs.push(load_document(path)?);
    }
    docs.push(overrides_mapping(overrides));
    Ok(merge_all(policy, docs))
}
