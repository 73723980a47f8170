//! Command definitions for the strata CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use strata_core::{config, project, values, Config, MergePolicy, Selector};
use strata_templates::ValidationReport;

pub mod edit;
pub mod get;
pub mod new;
pub mod render;
pub mod validate;

#[derive(Parser)]
#[command(
    name = "strata",
    version,
    about = "Render manifests from layered template overlays"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate and render every template to stdout
    Render(render::RenderArgs),
    /// Check template references against the merged values
    Validate(validate::ValidateArgs),
    /// Scaffold projects, clusters and environments
    New(new::NewArgs),
    /// List clusters, environments, templates or merged values
    Get(get::GetArgs),
    /// Open a layer's values or config in $EDITOR
    Edit(edit::EditArgs),
}

/// Selection and value flags shared by rendering and validation.
#[derive(Args, Debug)]
pub struct SelectionArgs {
    /// Project directory
    #[arg(default_value = ".")]
    pub directory: PathBuf,

    /// Cluster overlay to apply
    #[arg(short, long)]
    pub cluster: Option<String>,

    /// Environment overlay to apply
    #[arg(short, long)]
    pub environment: Option<String>,

    /// Additional value files, merged in the order given
    #[arg(long = "value-file", value_name = "FILE")]
    pub value_files: Vec<PathBuf>,

    /// Top-level value overrides
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// Merge policy for combining value layers
    #[arg(short, long, default_value = "override")]
    pub merge_policy: String,
}

/// Everything resolved up front for a render or validate run.
pub struct LoadedProject {
    pub selector: Selector,
    pub merged: serde_yaml::Value,
    pub config: Config,
}

impl SelectionArgs {
    pub fn selector(&self) -> Selector {
        Selector::new(self.cluster.clone(), self.environment.clone())
    }

    /// Resolve the project root, merge policy and final values.
    ///
    /// Resolution failures abort here, before any template work.
    pub fn load(&self) -> Result<LoadedProject> {
        project::require_project_root(&self.directory)?;

        let selector = self.selector();
        let policy = MergePolicy::by_name(&self.merge_policy)?;

        let mut overrides = Vec::new();
        for raw in &self.set {
            overrides.push(values::parse_set_value(raw)?);
        }

        let merged = values::build(
            &self.directory,
            &selector,
            &self.value_files,
            &overrides,
            policy,
        )?;
        let config = config::load(&self.directory, &selector, policy)?;

        Ok(LoadedProject {
            selector,
            merged,
            config,
        })
    }
}

/// Print one line per problem in a validation report.
pub fn print_report(report: &ValidationReport) {
    for (template, error) in &report.failures {
        eprintln!("❌ {}: {}", template, error);
    }
    for error in &report.errors {
        eprintln!("❌ {}", error);
    }
}

/// Exit code for a failed validation pass: parse failures alone count as
/// template errors, unresolved references as validation failures.
pub fn report_exit_code(report: &ValidationReport) -> u8 {
    if report.errors.is_empty() {
        crate::ExitCodes::TEMPLATE_ERROR
    } else {
        crate::ExitCodes::VALIDATION_FAILURE
    }
}
