//! # strata_core
//!
//! Layer resolution, value merging and project layout for strata.
//!
//! A strata project is a directory tree in which a base layout can be
//! overlaid by cluster and environment directories:
//!
//! ```text
//! <root>/                      .strata marker, templates/, files/, values.yaml
//! <root>/environments/<env>/                       same sub-layout
//! <root>/clusters/<cluster>/                       same sub-layout
//! <root>/clusters/<cluster>/environments/<env>/    same sub-layout
//! ```
//!
//! This crate answers two questions for one (cluster, environment)
//! selection: which directories contribute a given resource, and what the
//! merged value mapping looks like. Nothing here is cached; every
//! invocation resolves and merges from scratch.

pub mod config;
pub mod error;
pub mod layers;
pub mod merge;
pub mod project;
pub mod values;

pub use config::{Config, SecretsConfig};
pub use error::{CoreError, CoreResult};
pub use layers::{resolve, FindMode, Layer, LayerKind, Selector, DEFAULT_MARKER};
pub use merge::{deep_merge, merge_all, MergePolicy};
