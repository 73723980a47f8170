//! Layered template environment.
//!
//! An [`Engine`] is built once per invocation from a project root and a
//! (cluster, environment) selection. Construction resolves the layered
//! search paths and builds the fixed filter and global-function tables;
//! rendering afterwards does no further discovery.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::Value;
use tracing::debug;
use walkdir::WalkDir;

use strata_core::layers::FindMode;
use strata_core::{layers, project, Config, Selector};

use crate::error::{TemplateError, TemplateResult};
use crate::filters;
use crate::syntax::{self, CmpOp, Expr, LogicOp, Node, Template};

/// Filter function: piped value and arguments in, value out.
pub type FilterFn = fn(&Value, &[Value]) -> TemplateResult<Value>;

/// Global function callable from templates.
pub type GlobalFn = Box<dyn Fn(&[Value]) -> TemplateResult<Value>>;

/// Template environment for one (root, selection) pair.
pub struct Engine {
    /// Template directories, most specific layer first.
    search_path: Vec<PathBuf>,
    filters: HashMap<&'static str, FilterFn>,
    globals: HashMap<&'static str, GlobalFn>,
    cluster: String,
    environment: String,
}

impl Engine {
    /// Build an engine for a project and selection.
    ///
    /// Fails closed when the selection names a cluster or environment
    /// with no directory on disk.
    pub fn new(root: &Path, selector: &Selector, config: &Config) -> TemplateResult<Self> {
        let mut search_path: Vec<PathBuf> =
            layers::resolve(root, selector, project::TEMPLATES_DIR, FindMode::DIRS)?
                .into_iter()
                .map(|layer| layer.path)
                .collect();
        search_path.reverse();

        let mut file_path: Vec<PathBuf> =
            layers::resolve(root, selector, project::FILES_DIR, FindMode::DIRS)?
                .into_iter()
                .map(|layer| layer.path)
                .collect();
        file_path.reverse();

        debug!(?search_path, ?file_path, "built template environment");

        Ok(Self {
            search_path,
            filters: filters::filter_registry(),
            globals: filters::global_registry(config, file_path),
            cluster: selector.cluster_name().to_string(),
            environment: selector.environment_name().to_string(),
        })
    }

    /// Relative names of every template visible through the search path,
    /// sorted. A name present in several layers appears once; lookups
    /// serve it from the most specific layer.
    pub fn list_templates(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        for dir in &self.search_path {
            for entry in WalkDir::new(dir)
                .min_depth(1)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                if !entry.file_type().is_file() {
                    continue;
                }
                let rel = match entry.path().strip_prefix(dir) {
                    Ok(rel) => rel,
                    Err(_) => continue,
                };
                let name = rel.to_string_lossy().replace('\\', "/");
                if name.split('/').any(|part| part.starts_with('.')) {
                    continue;
                }
                seen.insert(name);
            }
        }
        seen.into_iter().collect()
    }

    /// Locate a template by relative name, most specific layer first.
    pub fn find_template(&self, name: &str) -> TemplateResult<PathBuf> {
        for dir in &self.search_path {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
        Err(TemplateError::NotFound(name.to_string()))
    }

    /// Load and parse a template.
    pub fn get_template(&self, name: &str) -> TemplateResult<Template> {
        let path = self.find_template(name)?;
        debug!(name, path = %path.display(), "loading template");
        let source = fs::read_to_string(&path)?;
        syntax::parse(name, &source)
    }

    /// Render a template by name against the merged values.
    pub fn render(&self, name: &str, values: &Value) -> TemplateResult<String> {
        let template = self.get_template(name)?;
        self.render_template(&template, values)
    }

    /// Render an already-parsed template.
    pub fn render_template(&self, template: &Template, values: &Value) -> TemplateResult<String> {
        let mut scope = Scope {
            values,
            locals: Vec::new(),
            engine: self,
        };
        let mut out = String::new();
        render_nodes(&template.nodes, &mut scope, &mut out)?;
        Ok(out)
    }
}

/// Name-resolution scope for one render: the values namespace, the two
/// context names and a stack of loop variables.
struct Scope<'a> {
    values: &'a Value,
    locals: Vec<(String, Value)>,
    engine: &'a Engine,
}

impl Scope<'_> {
    fn lookup(&self, name: &str) -> Option<Value> {
        for (local, value) in self.locals.iter().rev() {
            if local == name {
                return Some(value.clone());
            }
        }
        match name {
            crate::VALUES_NAMESPACE => Some(self.values.clone()),
            "cluster" => Some(Value::String(self.engine.cluster.clone())),
            "environment" => Some(Value::String(self.engine.environment.clone())),
            _ => None,
        }
    }
}

fn render_nodes(nodes: &[Node], scope: &mut Scope<'_>, out: &mut String) -> TemplateResult<()> {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Output(expr) => {
                let value = eval(expr, scope)?;
                out.push_str(&format_value(&value)?);
            }
            Node::If {
                cond,
                then_body,
                else_body,
            } => {
                if truthy(&eval(cond, scope)?) {
                    render_nodes(then_body, scope, out)?;
                } else {
                    render_nodes(else_body, scope, out)?;
                }
            }
            Node::For { var, iter, body } => {
                let iterable = eval(iter, scope)?;
                let items = match iterable {
                    Value::Sequence(items) => items,
                    other => {
                        return Err(TemplateError::Render(format!(
                            "Cannot iterate over {}",
                            type_name(&other)
                        )));
                    }
                };
                for item in items {
                    scope.locals.push((var.clone(), item));
                    let result = render_nodes(body, scope, out);
                    scope.locals.pop();
                    result?;
                }
            }
        }
    }
    Ok(())
}

fn eval(expr: &Expr, scope: &mut Scope<'_>) -> TemplateResult<Value> {
    match expr {
        Expr::Str(s) => Ok(Value::String(s.clone())),
        Expr::Int(n) => Ok(Value::Number((*n).into())),
        Expr::Float(x) => Ok(Value::Number(serde_yaml::Number::from(*x))),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Null => Ok(Value::Null),
        Expr::Name(name) => scope
            .lookup(name)
            .ok_or_else(|| TemplateError::MissingValue(name.clone())),
        Expr::GetAttr { base, attr } => {
            let base_value = eval(base, scope)?;
            if base_value.is_mapping() {
                match base_value.get(attr.as_str()) {
                    Some(value) => Ok(value.clone()),
                    None => Err(TemplateError::MissingValue(expr.to_string())),
                }
            } else {
                Err(TemplateError::Render(format!(
                    "Cannot access '{}' on {}",
                    attr,
                    type_name(&base_value)
                )))
            }
        }
        Expr::GetItem { base, index } => {
            let base_value = eval(base, scope)?;
            let index_value = eval(index, scope)?;
            match &base_value {
                Value::Sequence(items) => {
                    let position = index_value.as_u64().ok_or_else(|| {
                        TemplateError::Render(
                            "Sequence index must be a non-negative integer".to_string(),
                        )
                    })? as usize;
                    items
                        .get(position)
                        .cloned()
                        .ok_or_else(|| TemplateError::MissingValue(expr.to_string()))
                }
                Value::Mapping(_) => base_value
                    .get(&index_value)
                    .cloned()
                    .ok_or_else(|| TemplateError::MissingValue(expr.to_string())),
                other => Err(TemplateError::Render(format!(
                    "Cannot index into {}",
                    type_name(other)
                ))),
            }
        }
        Expr::Call { name, args } => {
            let engine = scope.engine;
            let mut evaluated = Vec::with_capacity(args.len());
            for arg in args {
                evaluated.push(eval(arg, scope)?);
            }
            let function = engine
                .globals
                .get(name.as_str())
                .ok_or_else(|| TemplateError::UnknownFunction(name.clone()))?;
            function(&evaluated)
        }
        Expr::Filter { base, name, args } => {
            let engine = scope.engine;
            let base_value = eval(base, scope)?;
            let mut evaluated = Vec::with_capacity(args.len());
            for arg in args {
                evaluated.push(eval(arg, scope)?);
            }
            let filter = engine
                .filters
                .get(name.as_str())
                .ok_or_else(|| TemplateError::UnknownFilter(name.clone()))?;
            filter(&base_value, &evaluated)
        }
        Expr::Not(inner) => Ok(Value::Bool(!truthy(&eval(inner, scope)?))),
        Expr::Compare { op, lhs, rhs } => {
            let lhs_value = eval(lhs, scope)?;
            let rhs_value = eval(rhs, scope)?;
            let equal = lhs_value == rhs_value;
            Ok(Value::Bool(match op {
                CmpOp::Eq => equal,
                CmpOp::Ne => !equal,
            }))
        }
        Expr::Logic { op, lhs, rhs } => {
            let lhs_value = eval(lhs, scope)?;
            match op {
                LogicOp::And if !truthy(&lhs_value) => Ok(lhs_value),
                LogicOp::Or if truthy(&lhs_value) => Ok(lhs_value),
                _ => eval(rhs, scope),
            }
        }
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|x| x != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Sequence(items) => !items.is_empty(),
        Value::Mapping(map) => !map.is_empty(),
        Value::Tagged(tagged) => truthy(&tagged.value),
    }
}

fn format_value(value: &Value) -> TemplateResult<String> {
    match value {
        Value::Null => Ok("null".to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(s.clone()),
        other => Err(TemplateError::Render(format!(
            "Cannot render {} as output",
            type_name(other)
        ))),
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
