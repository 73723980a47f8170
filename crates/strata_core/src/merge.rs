//! Deep merging of value mappings.
//!
//! Mappings combine field by field, later documents overriding earlier
//! ones. Sequences and scalars are replaced entirely, never concatenated.
//! The strategy is selected by policy name; merging itself is a pure
//! function of its inputs with no disk access or caching.

use serde_yaml::{Mapping, Value};

use crate::error::{CoreError, CoreResult};

/// Named strategy for combining two nested mappings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// Mappings merge key by key recursively; any other pair is decided
    /// by the right-hand side replacing the left outright.
    Override,
}

impl MergePolicy {
    /// Every registered policy name, for CLI help and validation.
    pub const NAMES: &'static [&'static str] = &["override"];

    /// Look up a policy by name. An unknown name is a configuration
    /// error, never a silent fallback.
    pub fn by_name(name: &str) -> CoreResult<Self> {
        match name {
            "override" => Ok(Self::Override),
            other => Err(CoreError::UnknownMergePolicy(other.to_string())),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Override => "override",
        }
    }

    /// Combine two values under this policy, `overlay` taking precedence.
    pub fn combine(self, base: Value, overlay: Value) -> Value {
        match self {
            Self::Override => deep_merge(base, overlay),
        }
    }
}

impl std::fmt::Display for MergePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Deep merge two YAML values, with `overlay` taking precedence.
///
/// - Mappings are merged recursively: keys in overlay override keys in base
/// - Sequences, strings, numbers, booleans and nulls replace the base value
///   entirely
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Mapping(mut base_map), Value::Mapping(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.get(&key) {
                    Some(base_value) => deep_merge(base_value.clone(), overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged);
            }
            Value::Mapping(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Fold a sequence of documents into one mapping, later documents
/// winning under the given policy. Starts from an empty mapping, which
/// is the identity of the fold.
pub fn merge_all(policy: MergePolicy, docs: impl IntoIterator<Item = Value>) -> Value {
    docs.into_iter()
        .fold(Value::Mapping(Mapping::new()), |acc, doc| {
            policy.combine(acc, doc)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(source: &str) -> Value {
        serde_yaml::from_str(source).unwrap()
    }

    #[test]
    fn merge_simple_mappings() {
        let base = yaml("{a: 1, b: 2}");
        let overlay = yaml("{b: 3, c: 4}");
        assert_eq!(deep_merge(base, overlay), yaml("{a: 1, b: 3, c: 4}"));
    }

    #[test]
    fn merge_nested_mappings() {
        let base = yaml("{server: {host: localhost, port: 8080}, debug: true}");
        let overlay = yaml("{server: {port: 9000}}");
        assert_eq!(
            deep_merge(base, overlay),
            yaml("{server: {host: localhost, port: 9000}, debug: true}")
        );
    }

    #[test]
    fn sequences_replaced_not_merged() {
        let base = yaml("{items: [1, 2, 3]}");
        let overlay = yaml("{items: [4, 5]}");
        assert_eq!(deep_merge(base, overlay), yaml("{items: [4, 5]}"));
    }

    #[test]
    fn overlay_replaces_scalar_with_mapping() {
        let base = yaml("{value: 42}");
        let overlay = yaml("{value: {nested: true}}");
        assert_eq!(deep_merge(base, overlay), yaml("{value: {nested: true}}"));
    }

    #[test]
    fn overlay_replaces_mapping_with_scalar() {
        let base = yaml("{value: {nested: true}}");
        let overlay = yaml("{value: 42}");
        assert_eq!(deep_merge(base, overlay), yaml("{value: 42}"));
    }

    #[test]
    fn null_overlay_replaces_base() {
        let base = yaml("{a: 1}");
        let overlay = yaml("{a: null}");
        assert_eq!(deep_merge(base, overlay), yaml("{a: null}"));
    }

    #[test]
    fn fold_is_associative() {
        let a = yaml("{a: 1, shared: {x: 1}}");
        let b = yaml("{b: 2, shared: {y: 2}}");
        let c = yaml("{a: 3, shared: {x: 9}}");

        let all_at_once = merge_all(
            MergePolicy::Override,
            vec![a.clone(), b.clone(), c.clone()],
        );
        let pairwise = MergePolicy::Override.combine(
            merge_all(MergePolicy::Override, vec![a, b]),
            c,
        );
        assert_eq!(all_at_once, pairwise);
    }

    #[test]
    fn empty_mapping_is_identity() {
        let a = yaml("{a: 1, nested: {b: 2}}");
        let empty = Value::Mapping(Mapping::new());

        assert_eq!(merge_all(MergePolicy::Override, vec![a.clone()]), a);
        assert_eq!(
            merge_all(MergePolicy::Override, vec![empty.clone(), a.clone()]),
            a
        );
        assert_eq!(merge_all(MergePolicy::Override, vec![a.clone(), empty]), a);
    }

    #[test]
    fn policy_lookup_by_name() {
        assert_eq!(
            MergePolicy::by_name("override").unwrap(),
            MergePolicy::Override
        );
        assert!(MergePolicy::NAMES.contains(&"override"));
    }

    #[test]
    fn unknown_policy_is_an_error() {
        match MergePolicy::by_name("smart") {
            Err(CoreError::UnknownMergePolicy(name)) => assert_eq!(name, "smart"),
            other => panic!("expected UnknownMergePolicy, got {:?}", other),
        }
    }
}
