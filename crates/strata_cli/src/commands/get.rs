//! Get command - enumeration of clusters, environments, templates and
//! merged values.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};

use strata_core::{config, project, MergePolicy, Selector};
use strata_templates::Engine;

use crate::commands::SelectionArgs;

#[derive(Args)]
pub struct GetArgs {
    #[command(subcommand)]
    pub target: GetTarget,
}

#[derive(Subcommand)]
pub enum GetTarget {
    /// List cluster names
    Clusters {
        #[arg(default_value = ".")]
        directory: PathBuf,
    },
    /// List environment names, at the root or inside a cluster
    Environments {
        #[arg(short, long)]
        cluster: Option<String>,
        #[arg(default_value = ".")]
        directory: PathBuf,
    },
    /// List templates visible for a selection
    Templates {
        #[arg(short, long)]
        cluster: Option<String>,
        #[arg(short, long)]
        environment: Option<String>,
        #[arg(default_value = ".")]
        directory: PathBuf,
    },
    /// Print the merged values for a selection as YAML
    Values {
        #[command(flatten)]
        selection: SelectionArgs,
    },
}

pub fn execute(args: GetArgs) -> Result<()> {
    match args.target {
        GetTarget::Clusters { directory } => {
            project::require_project_root(&directory)?;
            for name in project::list_clusters(&directory)? {
                println!("{}", name);
            }
        }
        GetTarget::Environments { cluster, directory } => {
            project::require_project_root(&directory)?;
            for name in project::list_environments(&directory, cluster.as_deref())? {
                println!("{}", name);
            }
        }
        GetTarget::Templates {
            cluster,
            environment,
            directory,
        } => {
            project::require_project_root(&directory)?;
            let selector = Selector::new(cluster, environment);
            let config = config::load(&directory, &selector, MergePolicy::Override)?;
            let engine = Engine::new(&directory, &selector, &config)?;
            for name in engine.list_templates() {
                println!("{}", name);
            }
        }
        GetTarget::Values { selection } => {
            let loaded = selection.load()?;
            print!("{}", serde_yaml::to_string(&loaded.merged)?);
        }
    }
    Ok(())
}
