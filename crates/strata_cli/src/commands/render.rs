//! Render command - validate every template, then print the rendered set.

use anyhow::Result;
use clap::Args;
use tracing::info;

use strata_templates::{validate_all, Engine, VALUES_NAMESPACE};

use crate::commands::{print_report, report_exit_code, SelectionArgs};
use crate::ExitCodes;

#[derive(Args)]
pub struct RenderArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,
}

pub fn execute(args: RenderArgs) -> Result<()> {
    info!(
        "rendering {} for cluster={} environment={}",
        args.selection.directory.display(),
        args.selection.cluster.as_deref().unwrap_or("-"),
        args.selection.environment.as_deref().unwrap_or("-")
    );

    let loaded = args.selection.load()?;
    let engine = Engine::new(&args.selection.directory, &loaded.selector, &loaded.config)?;

    // Static pre-check over the whole set before anything is printed.
    let report = validate_all(&engine, &loaded.merged, VALUES_NAMESPACE);
    if !report.is_ok() {
        print_report(&report);
        eprintln!("❌ Failed to validate all templates");
        std::process::exit(i32::from(report_exit_code(&report)));
    }

    let mut render_failed = false;
    for name in engine.list_templates() {
        match engine.render(&name, &loaded.merged) {
            Ok(output) => {
                println!("---");
                println!("# Source: {}", name);
                print!("{}", output);
                if !output.ends_with('\n') {
                    println!();
                }
            }
            Err(err) => {
                // Render-time failures cover what static validation
                // cannot see; report them per template and keep going.
                eprintln!("❌ {}: {}", name, err);
                render_failed = true;
            }
        }
    }

    if render_failed {
        std::process::exit(i32::from(ExitCodes::TEMPLATE_ERROR));
    }

    Ok(())
}
