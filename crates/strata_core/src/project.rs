//! Project layout: marker checks, scaffolding and enumeration.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tracing::info;

use crate::error::{CoreError, CoreResult};
use crate::layers::{Selector, CLUSTERS_DIR, ENVIRONMENTS_DIR};
use crate::values::VALUES_FILE;

/// Sentinel file marking a valid project root.
pub const MARKER_FILE: &str = ".strata";

/// Default template root inside a project.
pub const TEMPLATES_DIR: &str = "templates";

/// Default raw-file include root inside a project.
pub const FILES_DIR: &str = "files";

/// Per-layer configuration file.
pub const CONFIG_FILE: &str = "config.yaml";

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").unwrap())
}

/// Check that a name is usable as a cluster or environment identifier.
pub fn validate_name(name: &str) -> CoreResult<()> {
    if name_pattern().is_match(name) {
        Ok(())
    } else {
        Err(CoreError::InvalidName {
            name: name.to_string(),
            reason: "letters, digits, '.', '_' and '-' only".to_string(),
        })
    }
}

/// True if `path` carries the project marker.
pub fn is_project_root(path: &Path) -> bool {
    path.join(MARKER_FILE).exists()
}

/// Fail unless `path` is a project root.
pub fn require_project_root(path: &Path) -> CoreResult<()> {
    if is_project_root(path) {
        Ok(())
    } else {
        Err(CoreError::NotAProject(path.to_path_buf()))
    }
}

/// The single most specific layer directory for a selection.
///
/// Used where one concrete file location is needed, such as editing a
/// layer's values or config, rather than the full overlay chain.
pub fn base_dir(root: &Path, selector: &Selector) -> CoreResult<PathBuf> {
    let mut base = root.to_path_buf();

    if let Some(cluster) = &selector.cluster {
        base = base.join(CLUSTERS_DIR).join(cluster);
        if !base.is_dir() {
            return Err(CoreError::NoSuchCluster(cluster.clone()));
        }
    }

    if let Some(environment) = &selector.environment {
        base = base.join(ENVIRONMENTS_DIR).join(environment);
        if !base.is_dir() {
            return Err(CoreError::NoSuchEnvironment(environment.clone()));
        }
    }

    Ok(base)
}

/// Create a new project skeleton at `path`.
pub fn create_project(path: &Path) -> CoreResult<()> {
    fs::create_dir_all(path.join(TEMPLATES_DIR))?;
    fs::create_dir_all(path.join(FILES_DIR))?;
    fs::create_dir_all(path.join(CLUSTERS_DIR))?;
    touch(&path.join(VALUES_FILE))?;
    touch(&path.join(MARKER_FILE))?;
    info!(path = %path.display(), "created project");
    Ok(())
}

/// Create a cluster skeleton inside an existing project.
pub fn create_cluster(root: &Path, name: &str) -> CoreResult<PathBuf> {
    require_project_root(root)?;
    validate_name(name)?;

    let cluster_dir = root.join(CLUSTERS_DIR).join(name);
    fs::create_dir_all(cluster_dir.join(FILES_DIR))?;
    touch(&cluster_dir.join(VALUES_FILE))?;
    info!(cluster = name, "created cluster");
    Ok(cluster_dir)
}

/// Create an environment skeleton, inside a cluster or at the root.
pub fn create_environment(
    root: &Path,
    name: &str,
    cluster: Option<&str>,
) -> CoreResult<PathBuf> {
    require_project_root(root)?;
    validate_name(name)?;

    let parent = match cluster {
        Some(cluster_name) => {
            let dir = root.join(CLUSTERS_DIR).join(cluster_name);
            if !dir.is_dir() {
                return Err(CoreError::NoSuchCluster(cluster_name.to_string()));
            }
            dir
        }
        None => root.to_path_buf(),
    };

    let env_dir = parent.join(ENVIRONMENTS_DIR).join(name);
    fs::create_dir_all(env_dir.join(FILES_DIR))?;
    touch(&env_dir.join(VALUES_FILE))?;
    info!(environment = name, cluster = ?cluster, "created environment");
    Ok(env_dir)
}

/// List cluster names defined in a project, sorted.
pub fn list_clusters(root: &Path) -> CoreResult<Vec<String>> {
    list_dir_names(&root.join(CLUSTERS_DIR))
}

/// List environment names, either root-level or inside one cluster.
pub fn list_environments(root: &Path, cluster: Option<&str>) -> CoreResult<Vec<String>> {
    let parent = match cluster {
        Some(name) => {
            let dir = root.join(CLUSTERS_DIR).join(name);
            if !dir.is_dir() {
                return Err(CoreError::NoSuchCluster(name.to_string()));
            }
            dir
        }
        None => root.to_path_buf(),
    };
    list_dir_names(&parent.join(ENVIRONMENTS_DIR))
}

fn list_dir_names(dir: &Path) -> CoreResult<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.path().is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if !name.starts_with('.') {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

fn touch(path: &Path) -> CoreResult<()> {
    if !path.exists() {
        fs::write(path, "")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn project_scaffold_round_trips() {
        let temp = tempdir().unwrap();
        let root = temp.path().join("deploy");

        create_project(&root).unwrap();

        assert!(is_project_root(&root));
        assert!(root.join(TEMPLATES_DIR).is_dir());
        assert!(root.join(FILES_DIR).is_dir());
        assert!(root.join(CLUSTERS_DIR).is_dir());
        assert!(root.join(VALUES_FILE).is_file());
    }

    #[test]
    fn non_project_is_rejected() {
        let temp = tempdir().unwrap();
        assert!(matches!(
            require_project_root(temp.path()),
            Err(CoreError::NotAProject(_))
        ));
    }

    #[test]
    fn cluster_and_environment_scaffolds() {
        let temp = tempdir().unwrap();
        create_project(temp.path()).unwrap();

        let cluster_dir = create_cluster(temp.path(), "alpha").unwrap();
        assert!(cluster_dir.join(FILES_DIR).is_dir());
        assert!(cluster_dir.join(VALUES_FILE).is_file());

        let env_dir = create_environment(temp.path(), "staging", Some("alpha")).unwrap();
        assert_eq!(
            env_dir,
            temp.path()
                .join("clusters/alpha/environments/staging")
        );
        assert!(env_dir.join(VALUES_FILE).is_file());

        let root_env = create_environment(temp.path(), "sandbox", None).unwrap();
        assert_eq!(root_env, temp.path().join("environments/sandbox"));

        assert_eq!(list_clusters(temp.path()).unwrap(), vec!["alpha"]);
        assert_eq!(
            list_environments(temp.path(), Some("alpha")).unwrap(),
            vec!["staging"]
        );
        assert_eq!(
            list_environments(temp.path(), None).unwrap(),
            vec!["sandbox"]
        );
    }

    #[test]
    fn environment_in_unknown_cluster_fails() {
        let temp = tempdir().unwrap();
        create_project(temp.path()).unwrap();

        assert!(matches!(
            create_environment(temp.path(), "staging", Some("nope")),
            Err(CoreError::NoSuchCluster(_))
        ));
    }

    #[test]
    fn bad_names_are_rejected() {
        let temp = tempdir().unwrap();
        create_project(temp.path()).unwrap();

        assert!(matches!(
            create_cluster(temp.path(), "../evil"),
            Err(CoreError::InvalidName { .. })
        ));
        assert!(validate_name("prod-eu-1").is_ok());
        assert!(validate_name(".hidden").is_err());
        assert!(validate_name("").is_err());
    }

    #[test]
    fn base_dir_walks_to_most_specific_layer() {
        let temp = tempdir().unwrap();
        create_project(temp.path()).unwrap();
        create_cluster(temp.path(), "alpha").unwrap();
        create_environment(temp.path(), "staging", Some("alpha")).unwrap();

        let base = base_dir(
            temp.path(),
            &Selector::new(Some("alpha".into()), Some("staging".into())),
        )
        .unwrap();
        assert_eq!(
            base,
            temp.path().join("clusters/alpha/environments/staging")
        );

        assert!(matches!(
            base_dir(
                temp.path(),
                &Selector::new(Some("missing".into()), None)
            ),
            Err(CoreError::NoSuchCluster(_))
        ));
    }
}
