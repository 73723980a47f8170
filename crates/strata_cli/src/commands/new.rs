//! New command - scaffolding for projects, clusters and environments.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};

use strata_core::project;

#[derive(Args)]
pub struct NewArgs {
    #[command(subcommand)]
    pub target: NewTarget,
}

#[derive(Subcommand)]
pub enum NewTarget {
    /// Create a project skeleton
    Project {
        directory: PathBuf,
    },
    /// Create a cluster inside a project
    Cluster {
        name: String,
        #[arg(default_value = ".")]
        directory: PathBuf,
    },
    /// Create an environment, at the root or inside a cluster
    Environment {
        name: String,
        #[arg(short, long)]
        cluster: Option<String>,
        #[arg(default_value = ".")]
        directory: PathBuf,
    },
}

pub fn execute(args: NewArgs) -> Result<()> {
    match args.target {
        NewTarget::Project { directory } => {
            project::create_project(&directory)?;
            println!("✅ Created project at {}", directory.display());
        }
        NewTarget::Cluster { name, directory } => {
            let path = project::create_cluster(&directory, &name)?;
            println!("✅ Created cluster at {}", path.display());
        }
        NewTarget::Environment {
            name,
            cluster,
            directory,
        } => {
            let path = project::create_environment(&directory, &name, cluster.as_deref())?;
            println!("✅ Created environment at {}", path.display());
        }
    }
    Ok(())
}
