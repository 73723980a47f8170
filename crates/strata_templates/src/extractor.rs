//! Static extraction of value references from parsed templates.
//!
//! Extraction walks the parsed tree, never the rendered output, and
//! reconstructs every literal dotted attribute chain rooted at the
//! reserved values namespace. Chains rooted at any other identifier
//! (loop variables, the context names) are not value references and are
//! skipped. A chain hanging off a computed expression cannot be resolved
//! statically; its literal sub-expressions are still collected, and the
//! dynamic part is left to the render-time missing-value check.

use std::collections::BTreeSet;

use crate::syntax::{Expr, Template};

/// Collect every literal dotted attribute chain rooted at `namespace`,
/// namespace-stripped and deduplicated.
pub fn extract(template: &Template, namespace: &str) -> BTreeSet<String> {
    let mut paths = BTreeSet::new();
    template.visit_exprs(&mut |expr| collect(expr, namespace, &mut paths));
    paths
}

fn collect(expr: &Expr, namespace: &str, paths: &mut BTreeSet<String>) {
    match expr {
        Expr::GetAttr { base, .. } => match chain_of(expr) {
            Some((root, attrs)) => {
                if root == namespace {
                    paths.insert(attrs.join("."));
                }
            }
            // Dynamic base; descend to find literal chains inside it.
            None => collect(base, namespace, paths),
        },
        Expr::GetItem { base, index } => {
            collect(base, namespace, paths);
            collect(index, namespace, paths);
        }
        Expr::Call { args, .. } => {
            for arg in args {
                collect(arg, namespace, paths);
            }
        }
        Expr::Filter { base, args, .. } => {
            collect(base, namespace, paths);
            for arg in args {
                collect(arg, namespace, paths);
            }
        }
        Expr::Not(inner) => collect(inner, namespace, paths),
        Expr::Compare { lhs, rhs, .. } | Expr::Logic { lhs, rhs, .. } => {
            collect(lhs, namespace, paths);
            collect(rhs, namespace, paths);
        }
        _ => {}
    }
}

/// Walk a `GetAttr` spine down to its root identifier, rebuilding the
/// dotted chain outside-in. `None` when the spine bottoms out in
/// anything but a bare identifier.
fn chain_of(expr: &Expr) -> Option<(&str, Vec<&str>)> {
    let mut attrs = Vec::new();
    let mut cursor = expr;
    while let Expr::GetAttr { base, attr } = cursor {
        attrs.push(attr.as_str());
        cursor = base;
    }
    match cursor {
        Expr::Name(name) => {
            attrs.reverse();
            Some((name.as_str(), attrs))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse;
    use crate::VALUES_NAMESPACE;

    fn paths_of(source: &str) -> Vec<String> {
        let template = parse("t", source).unwrap();
        extract(&template, VALUES_NAMESPACE).into_iter().collect()
    }

    #[test]
    fn single_literal_reference() {
        assert_eq!(
            paths_of("{{ values.rails.insign.sms.password }}"),
            vec!["rails.insign.sms.password"]
        );
    }

    #[test]
    fn references_are_deduplicated() {
        let source = "{{ values.app.name }}-{{ values.app.name }}";
        assert_eq!(paths_of(source), vec!["app.name"]);
    }

    #[test]
    fn chains_rooted_elsewhere_are_skipped() {
        let source = "{% for item in values.items %}{{ item.name }}{% endfor %}{{ cluster }}";
        assert_eq!(paths_of(source), vec!["items"]);
    }

    #[test]
    fn conditions_and_filter_args_are_walked() {
        let source =
            "{% if values.tls.enabled %}{{ values.cert | hash }}{% else %}{{ env('HOME', values.fallback.home) }}{% endif %}";
        assert_eq!(
            paths_of(source),
            vec!["cert", "fallback.home", "tls.enabled"]
        );
    }

    #[test]
    fn dynamic_subscript_prefix_and_index_are_collected() {
        // The subscript itself cannot be resolved statically; the literal
        // chains on either side of it can.
        let source = "{{ values.zones[values.region.key].name }}";
        assert_eq!(paths_of(source), vec!["region.key", "zones"]);
    }

    #[test]
    fn bare_namespace_reference_contributes_nothing() {
        assert!(paths_of("{% if values %}x{% endif %}").is_empty());
    }
}
