//! Edit command - open a layer's values or config in $EDITOR.

use std::path::PathBuf;
use std::process::Command;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use strata_core::{project, values, Selector};

#[derive(Args)]
pub struct EditArgs {
    #[command(subcommand)]
    pub target: EditTarget,
}

#[derive(Subcommand)]
pub enum EditTarget {
    /// Edit the values file of the selected layer
    Values(EditSelection),
    /// Edit the config file of the selected layer
    Config(EditSelection),
}

#[derive(Args)]
pub struct EditSelection {
    #[arg(short, long)]
    pub cluster: Option<String>,
    #[arg(short, long)]
    pub environment: Option<String>,
    #[arg(default_value = ".")]
    pub directory: PathBuf,
}

pub fn execute(args: EditArgs) -> Result<()> {
    let (selection, file_name) = match &args.target {
        EditTarget::Values(selection) => (selection, values::VALUES_FILE),
        EditTarget::Config(selection) => (selection, project::CONFIG_FILE),
    };

    project::require_project_root(&selection.directory)?;
    let selector = Selector::new(selection.cluster.clone(), selection.environment.clone());
    let file_path = project::base_dir(&selection.directory, &selector)?.join(file_name);

    let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());
    let status = Command::new(&editor)
        .arg(&file_path)
        .status()
        .with_context(|| format!("failed to launch editor '{}'", editor))?;

    if !status.success() {
        anyhow::bail!("editor exited with {}", status);
    }

    Ok(())
}
