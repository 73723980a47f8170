//! Validate command - static check of template references.

use anyhow::Result;
use clap::Args;
use tracing::info;

use strata_templates::{validate_all, Engine, VALUES_NAMESPACE};

use crate::commands::{print_report, report_exit_code, SelectionArgs};

#[derive(Args)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,
}

pub fn execute(args: ValidateArgs) -> Result<()> {
    info!("validating templates in {}", args.selection.directory.display());

    let loaded = args.selection.load()?;
    let engine = Engine::new(&args.selection.directory, &loaded.selector, &loaded.config)?;

    let templates = engine.list_templates();
    let report = validate_all(&engine, &loaded.merged, VALUES_NAMESPACE);

    if report.is_ok() {
        println!("✅ {} template(s) validated", templates.len());
        return Ok(());
    }

    print_report(&report);
    eprintln!("❌ Validation failed");
    std::process::exit(i32::from(report_exit_code(&report)));
}
