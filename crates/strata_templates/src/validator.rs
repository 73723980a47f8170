//! Static validation of template references against merged values.
//!
//! Validation is a best-effort pre-check run before any rendering: every
//! extracted path is resolved inside the merged mapping, every failure is
//! collected, and no template stops the pass for the ones after it.
//! Dynamic expressions stay invisible here and surface as render-time
//! missing-value errors instead.

use serde_yaml::Value;

use crate::engine::Engine;
use crate::error::TemplateError;
use crate::extractor;
use crate::syntax::Template;

/// One unresolved reference in one template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Relative template name.
    pub template: String,
    /// Namespace-stripped dotted path that failed to resolve.
    pub path: String,
    /// Which segment was missing, and from where.
    pub reason: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} ({})", self.template, self.path, self.reason)
    }
}

/// Outcome of validating a full template set.
#[derive(Debug, Default)]
pub struct ValidationReport {
    /// Unresolved references, across all templates.
    pub errors: Vec<ValidationError>,
    /// Templates that could not be loaded or parsed at all.
    pub failures: Vec<(String, TemplateError)>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty() && self.failures.is_empty()
    }
}

/// Check every extracted path of one template against the merged values.
///
/// Each unresolved path yields exactly one error, recorded at the first
/// segment that is missing; the remaining paths are still checked.
pub fn validate(template: &Template, values: &Value, namespace: &str) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    for path in extractor::extract(template, namespace) {
        if let Some(reason) = resolve_path(&path, values) {
            errors.push(ValidationError {
                template: template.name.clone(),
                path,
                reason,
            });
        }
    }
    errors
}

/// Validate every template visible to the engine.
///
/// A template that fails to parse is recorded as a failure; validation
/// always proceeds to the next template so one report covers the whole
/// set.
pub fn validate_all(engine: &Engine, values: &Value, namespace: &str) -> ValidationReport {
    let mut report = ValidationReport::default();
    for name in engine.list_templates() {
        match engine.get_template(&name) {
            Ok(template) => report.errors.extend(validate(&template, values, namespace)),
            Err(err) => report.failures.push((name, err)),
        }
    }
    report
}

/// Walk the dotted path one segment at a time through `values`;
/// `Some(reason)` on the first segment that cannot be resolved.
fn resolve_path(path: &str, values: &Value) -> Option<String> {
    let mut scope = values;
    let mut seen: Vec<&str> = Vec::new();

    for segment in path.split('.') {
        if !scope.is_mapping() {
            return Some(format!("'{}' is not a mapping", seen.join(".")));
        }
        match scope.get(segment) {
            Some(next) => scope = next,
            None => {
                return Some(if seen.is_empty() {
                    format!("'{}' missing from scope", segment)
                } else {
                    format!("'{}' missing from scope '{}'", segment, seen.join("."))
                });
            }
        }
        seen.push(segment);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse;
    use crate::VALUES_NAMESPACE;

    fn yaml(source: &str) -> Value {
        serde_yaml::from_str(source).unwrap()
    }

    fn check(template_source: &str, values_source: &str) -> Vec<ValidationError> {
        let template = parse("a.txt", template_source).unwrap();
        validate(&template, &yaml(values_source), VALUES_NAMESPACE)
    }

    #[test]
    fn deep_missing_path_yields_one_error() {
        let errors = check(
            "{{ values.rails.insign.sms.password }}",
            "{rails: {insign: {}}}",
        );

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].template, "a.txt");
        assert_eq!(errors[0].path, "rails.insign.sms.password");
        assert!(errors[0].reason.contains("sms"), "reason: {}", errors[0].reason);
    }

    #[test]
    fn satisfied_path_yields_no_errors() {
        let errors = check(
            "{{ values.rails.insign.sms.password }}",
            "{rails: {insign: {sms: {password: x}}}}",
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn scalar_in_the_middle_of_a_path() {
        let errors = check("{{ values.rails.port.number }}", "{rails: {port: 8080}}");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].reason.contains("not a mapping"));
    }

    #[test]
    fn one_bad_path_does_not_hide_the_others() {
        let errors = check(
            "{{ values.a.x }} {{ values.b.y }} {{ values.present }}",
            "{present: 1}",
        );
        let mut paths: Vec<_> = errors.iter().map(|e| e.path.as_str()).collect();
        paths.sort();
        assert_eq!(paths, vec!["a.x", "b.y"]);
    }

    #[test]
    fn null_leaf_is_still_present() {
        let errors = check("{{ values.feature.flag }}", "{feature: {flag: null}}");
        assert!(errors.is_empty());
    }
}
