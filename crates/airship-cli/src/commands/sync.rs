//! Sync command implementation

use std::path::{Path, PathBuf};

use airship_core::{
    FileOutcome, FileReport, ItemReport, ItemStatus, Manifest, Reconciler, RunOutcome, RunReport,
    TransformerRegistry,
};
use airship_fs::RobustnessConfig;
use colored::Colorize;

use super::{Output, resolve_manifest};
use crate::error::Result;

/// Run the sync command
///
/// Loads the manifest, reconciles every item and prints the report.
pub fn run_sync(
    cwd: &Path,
    manifest: Option<PathBuf>,
    dry_run: bool,
    json: bool,
    output: Output,
) -> Result<()> {
    let path = resolve_manifest(cwd, manifest)?;
    let manifest = Manifest::load(&path)?;
    let registry = TransformerRegistry::new();
    manifest.validate(&registry)?;

    let items = manifest.to_items(&registry)?;
    let base_dir = path.parent().unwrap_or(cwd);
    let replicas = manifest.build_replicas(base_dir, RobustnessConfig::default());

    let mut options = manifest.options.to_options();
    options.dry_run |= dry_run;

    if !json {
        output.line(format!(
            "{} Reconciling {} item(s) across {} replica(s){}",
            "=>".blue().bold(),
            items.len(),
            replicas.len(),
            if options.dry_run { " (dry run)" } else { "" }
        ));
    }

    let mut reconciler = Reconciler::new(replicas)?.with_options(options);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let report = runtime.block_on(reconciler.run(&items));

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, output);
    }
    Ok(())
}

fn print_report(report: &RunReport, output: Output) {
    for replica in report.replicas.iter().filter(|r| !r.active) {
        output.line(format!(
            "   {} replica {} is unavailable: {}",
            "!".yellow(),
            replica.id.cyan(),
            replica.error.as_deref().unwrap_or("unknown error")
        ));
    }

    if let RunOutcome::InsufficientReplicas { active } = report.outcome {
        output.line(format!(
            "{} Only {} replica(s) available; nothing to reconcile.",
            "SKIP".yellow().bold(),
            active
        ));
        return;
    }

    for item in &report.items {
        print_item(item, output);
    }

    let summary = if report.has_problems() {
        "DONE".yellow().bold()
    } else {
        "OK".green().bold()
    };
    output.line(format!("{} {} write(s)", summary, report.write_count()));
}

fn print_item(item: &ItemReport, output: Output) {
    match &item.status {
        ItemStatus::Skipped { reason } => {
            output.line(format!("{} {}: {}", "SKIP".yellow().bold(), item.name, reason));
            return;
        }
        ItemStatus::Reconciled => {
            output.line(format!("{} {}", "ITEM".green().bold(), item.name));
        }
    }

    for failure in &item.read_failures {
        output.line(format!(
            "   {} {} on {}: {}",
            "!".red(),
            failure.filename.cyan(),
            failure.replica,
            failure.reason
        ));
    }
    for file in &item.files {
        output.line(describe_file(file));
    }
    if let Some(error) = &item.after_error {
        output.line(format!("   {} after hook: {}", "!".red(), error));
    }
}

fn describe_file(file: &FileReport) -> String {
    let name = file.filename.cyan();
    let targets = file.written.join(", ");
    match &file.outcome {
        FileOutcome::InSync => format!("   {} {} in sync", "=".dimmed(), name),
        FileOutcome::Propagated => format!("   {} {} -> {}", "+".green(), name, targets),
        FileOutcome::Planned => format!("   {} {} -> {} (dry run)", "~".blue(), name, targets),
        FileOutcome::Partial | FileOutcome::Failed => {
            let failures: Vec<String> = file
                .failures
                .iter()
                .map(|f| format!("{}: {}", f.replica, f.reason))
                .collect();
            if targets.is_empty() {
                format!("   {} {} not written ({})", "!".red(), name, failures.join("; "))
            } else {
                format!(
                    "   {} {} -> {} ({})",
                    "!".yellow(),
                    name,
                    targets,
                    failures.join("; ")
                )
            }
        }
        FileOutcome::Skipped { reason } => format!("   {} {} skipped: {}", "-".yellow(), name, reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use airship_core::WriteFailure;

    fn file(outcome: FileOutcome) -> FileReport {
        FileReport {
            filename: "save.dat".into(),
            outcome,
            winner: Some("a".into()),
            timestamp: Some(100),
            digest: None,
            written: vec!["b".into()],
            failures: vec![],
        }
    }

    #[test]
    fn describes_planned_writes() {
        colored::control::set_override(false);
        assert_eq!(
            describe_file(&file(FileOutcome::Planned)),
            "   ~ save.dat -> b (dry run)"
        );
    }

    #[test]
    fn describes_partial_failures() {
        colored::control::set_override(false);
        let mut report = file(FileOutcome::Partial);
        report.failures.push(WriteFailure {
            replica: "c".into(),
            reason: "read-only".into(),
        });
        assert_eq!(describe_file(&report), "   ! save.dat -> b (c: read-only)");
    }
}
