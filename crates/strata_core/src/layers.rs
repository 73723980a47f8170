//! Layered directory resolution.
//!
//! A project root may be overlaid by cluster and environment directories,
//! each of which can contribute a file or subdirectory of a given name.
//! Resolution computes the ordered set of contributing paths for one
//! (cluster, environment) selection, least specific first; callers that
//! want override-first lookup (the template search path) reverse the
//! result at the call site.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, CoreResult};

/// Subdirectory under which clusters live.
pub const CLUSTERS_DIR: &str = "clusters";

/// Subdirectory under which environments live, at the root or inside a
/// cluster.
pub const ENVIRONMENTS_DIR: &str = "environments";

/// Context name used when no cluster or environment is selected.
pub const DEFAULT_MARKER: &str = "default";

/// The (cluster, environment) pair parameterizing one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selector {
    pub cluster: Option<String>,
    pub environment: Option<String>,
}

impl Selector {
    pub fn new(cluster: Option<String>, environment: Option<String>) -> Self {
        Self {
            cluster,
            environment,
        }
    }

    /// Cluster name exposed to templates, [`DEFAULT_MARKER`] if none.
    pub fn cluster_name(&self) -> &str {
        self.cluster.as_deref().unwrap_or(DEFAULT_MARKER)
    }

    /// Environment name exposed to templates, [`DEFAULT_MARKER`] if none.
    pub fn environment_name(&self) -> &str {
        self.environment.as_deref().unwrap_or(DEFAULT_MARKER)
    }
}

/// Provenance of one contributing directory, in increasing specificity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LayerKind {
    Root,
    Environment,
    Cluster,
    ClusterEnvironment,
}

impl std::fmt::Display for LayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayerKind::Root => write!(f, "root"),
            LayerKind::Environment => write!(f, "environment"),
            LayerKind::Cluster => write!(f, "cluster"),
            LayerKind::ClusterEnvironment => write!(f, "cluster environment"),
        }
    }
}

/// One path contributing a resource at a given specificity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    pub kind: LayerKind,
    pub path: PathBuf,
}

/// What kinds of directory entries [`resolve`] should accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FindMode {
    pub file_ok: bool,
    pub dir_ok: bool,
}

impl FindMode {
    /// Plain files only, e.g. a per-layer `values.yaml`.
    pub const FILES: Self = Self {
        file_ok: true,
        dir_ok: false,
    };

    /// Directories only, e.g. a per-layer `templates` root.
    pub const DIRS: Self = Self {
        file_ok: false,
        dir_ok: true,
    };

    fn matches(self, path: &Path) -> bool {
        (self.file_ok && path.is_file()) || (self.dir_ok && path.is_dir())
    }
}

/// Compute the ordered layers contributing `name` for the given selection.
///
/// Candidates are considered root first, cluster+environment last; a
/// candidate is part of the result only if it exists and matches `mode`.
/// A cluster or environment that is named but has no directory anywhere
/// fails with [`CoreError::NoSuchCluster`] /
/// [`CoreError::NoSuchEnvironment`]. An empty result by itself is not an
/// error: a project without e.g. any `files` directory is valid.
///
/// An environment paired with a cluster must be defined inside that
/// cluster; a root-level environment directory neither contributes nor
/// counts as found in that case.
pub fn resolve(
    root: &Path,
    selector: &Selector,
    name: &str,
    mode: FindMode,
) -> CoreResult<Vec<Layer>> {
    debug!(
        name,
        cluster = ?selector.cluster,
        environment = ?selector.environment,
        "resolving layers"
    );

    let mut layers = Vec::new();
    let mut push = |kind: LayerKind, dir: PathBuf| {
        let candidate = dir.join(name);
        if mode.matches(&candidate) {
            layers.push(Layer {
                kind,
                path: candidate,
            });
        }
    };

    let mut cluster_found = selector.cluster.is_none();
    let mut env_found = selector.environment.is_none();

    push(LayerKind::Root, root.to_path_buf());

    if let (Some(environment), None) = (&selector.environment, &selector.cluster) {
        let env_dir = root.join(ENVIRONMENTS_DIR).join(environment);
        env_found = env_dir.is_dir();
        push(LayerKind::Environment, env_dir);
    }

    if let Some(cluster) = &selector.cluster {
        let cluster_dir = root.join(CLUSTERS_DIR).join(cluster);
        cluster_found = cluster_dir.is_dir();
        push(LayerKind::Cluster, cluster_dir.clone());

        if let Some(environment) = &selector.environment {
            let env_dir = cluster_dir.join(ENVIRONMENTS_DIR).join(environment);
            env_found = env_found || env_dir.is_dir();
            push(LayerKind::ClusterEnvironment, env_dir);
        }
    }

    if !cluster_found {
        return Err(CoreError::NoSuchCluster(
            selector.cluster.clone().unwrap_or_default(),
        ));
    }
    if !env_found {
        return Err(CoreError::NoSuchEnvironment(
            selector.environment.clone().unwrap_or_default(),
        ));
    }

    debug!(count = layers.len(), "resolved layers");
    Ok(layers)
}
