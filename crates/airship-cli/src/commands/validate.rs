//! Validate command implementation

use std::path::{Path, PathBuf};

use airship_core::config::{ReplicaBackend, TargetEntry};
use airship_core::{Manifest, TransformerRegistry};
use colored::Colorize;

use super::{Output, resolve_manifest};
use crate::error::Result;

/// Run the validate command
///
/// Parses the manifest, checks cross references and compiles every item
/// pattern without touching any replica.
pub fn run_validate(cwd: &Path, manifest: Option<PathBuf>, output: Output) -> Result<()> {
    let path = resolve_manifest(cwd, manifest)?;
    let manifest = Manifest::load(&path)?;
    let registry = TransformerRegistry::new();
    manifest.validate(&registry)?;
    manifest.to_items(&registry)?;

    output.line(format!("{} {}", "OK".green().bold(), path.display()));

    output.line("Replicas:");
    for replica in &manifest.replicas {
        let backend = match &replica.backend {
            ReplicaBackend::Directory { root } => format!("directory {}", root.display()),
            ReplicaBackend::Memory => "memory".to_string(),
        };
        output.line(format!("   {} {} ({})", "-".dimmed(), replica.id.cyan(), backend));
    }

    output.line("Items:");
    for item in &manifest.items {
        output.line(format!(
            "   {} {} /{}/ via {}",
            "-".dimmed(),
            item.name.cyan(),
            item.pattern,
            item.transformer.as_deref().unwrap_or("identity")
        ));
        for (replica, target) in &item.targets {
            let location = match target {
                TargetEntry::Identifier(identifier) => identifier.clone(),
                TargetEntry::Detailed {
                    identifier,
                    folder: Some(folder),
                } => format!("{identifier}/{folder}"),
                TargetEntry::Detailed {
                    identifier,
                    folder: None,
                } => identifier.clone(),
            };
            output.line(format!("      {replica}: {location}"));
        }
    }

    Ok(())
}
