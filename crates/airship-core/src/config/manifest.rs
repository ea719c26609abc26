//! Manifest parsing and conversion into runtime objects

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use airship_fs::{ConfigFormat, ConfigStore, RobustnessConfig};
use serde::{Deserialize, Serialize};

use super::registry::{IDENTITY, TransformerRegistry};
use crate::item::SyncItem;
use crate::reconcile::ReconcileOptions;
use crate::replica::{DirectoryReplica, MemoryReplica, Replica};
use crate::{Error, Result};

/// Environment variable naming the manifest to use.
pub const MANIFEST_ENV: &str = "AIRSHIP_MANIFEST";

/// Manifest file name looked up in the working directory.
pub const MANIFEST_FILE: &str = "airship.toml";

/// Run-wide options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptionsSection {
    /// Per-call replica timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub io_timeout_secs: Option<u64>,

    #[serde(default)]
    pub dry_run: bool,
}

impl OptionsSection {
    pub fn to_options(&self) -> ReconcileOptions {
        let defaults = ReconcileOptions::default();
        ReconcileOptions {
            io_timeout: self
                .io_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.io_timeout),
            dry_run: self.dry_run,
        }
    }
}

/// Storage behind a declared replica
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReplicaBackend {
    /// A local directory. Relative roots are resolved against the manifest's
    /// directory.
    Directory { root: PathBuf },
    /// A scratch in-memory replica, empty at start.
    Memory,
}

/// One `[[replicas]]` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaSpec {
    pub id: String,
    #[serde(flatten)]
    pub backend: ReplicaBackend,
}

/// Where an item lives on one replica: a bare identifier or a table with a
/// folder override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TargetEntry {
    Identifier(String),
    Detailed {
        identifier: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        folder: Option<String>,
    },
}

/// One `[[items]]` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSpec {
    pub name: String,
    /// Regex searched in native filenames; unanchored unless it uses `^`/`$`.
    pub pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    /// Registered transformer name; `identity` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformer: Option<String>,
    /// Replica id to target. Every listed replica is required.
    #[serde(default)]
    pub targets: BTreeMap<String, TargetEntry>,
}

/// Parsed manifest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub options: OptionsSection,

    #[serde(default)]
    pub replicas: Vec<ReplicaSpec>,

    #[serde(default)]
    pub items: Vec<ItemSpec>,
}

impl Manifest {
    /// Load a manifest, picking the format from the file extension.
    pub fn load(path: &Path) -> Result<Self> {
        let manifest: Manifest = ConfigStore::new().load(path)?;
        tracing::debug!(
            path = %path.display(),
            replicas = manifest.replicas.len(),
            items = manifest.items.len(),
            "Loaded manifest"
        );
        Ok(manifest)
    }

    /// Parse TOML content.
    ///
    /// ```
    /// use airship_core::config::Manifest;
    ///
    /// let manifest = Manifest::parse(r#"
    /// [[replicas]]
    /// id = "a"
    /// kind = "memory"
    /// "#).unwrap();
    ///
    /// assert_eq!(manifest.replicas[0].id, "a");
    /// ```
    pub fn parse(content: &str) -> Result<Self> {
        let manifest: Manifest = toml::from_str(content)?;
        Ok(manifest)
    }

    /// Parse content in an explicit format. `origin` is only used in errors.
    pub fn parse_as(origin: &Path, format: ConfigFormat, content: &str) -> Result<Self> {
        Ok(ConfigStore::new().parse(origin, format, content)?)
    }

    /// Check cross references: unique replica ids, items naming declared
    /// replicas, known transformers, non-empty names.
    pub fn validate(&self, registry: &TransformerRegistry) -> Result<()> {
        let mut ids = HashSet::new();
        for replica in &self.replicas {
            if replica.id.trim().is_empty() {
                return Err(manifest_error("replica id must not be empty"));
            }
            if !ids.insert(replica.id.as_str()) {
                return Err(Error::DuplicateReplica(replica.id.clone()));
            }
        }

        let mut names = HashSet::new();
        for item in &self.items {
            if item.name.trim().is_empty() {
                return Err(manifest_error("item name must not be empty"));
            }
            if !names.insert(item.name.as_str()) {
                return Err(manifest_error(format!("item {} is declared twice", item.name)));
            }
            if item.targets.is_empty() {
                return Err(manifest_error(format!("item {} has no targets", item.name)));
            }
            if let Some(unknown) = item.targets.keys().find(|id| !ids.contains(id.as_str())) {
                return Err(manifest_error(format!(
                    "item {} targets undeclared replica {unknown}",
                    item.name
                )));
            }
            let transformer = item.transformer.as_deref().unwrap_or(IDENTITY);
            if !registry.contains(transformer) {
                return Err(Error::UnknownTransformer {
                    name: transformer.to_string(),
                    item: item.name.clone(),
                });
            }
        }

        Ok(())
    }

    /// Build the declared items, compiling each pattern once.
    pub fn to_items(&self, registry: &TransformerRegistry) -> Result<Vec<SyncItem>> {
        self.items
            .iter()
            .map(|spec| spec.to_item(registry))
            .collect()
    }

    /// Build the declared replicas in declaration order.
    ///
    /// Relative directory roots are taken relative to `base_dir`, normally
    /// the directory holding the manifest.
    pub fn build_replicas(&self, base_dir: &Path, robustness: RobustnessConfig) -> Vec<Box<dyn Replica>> {
        self.replicas
            .iter()
            .map(|spec| -> Box<dyn Replica> {
                match &spec.backend {
                    ReplicaBackend::Directory { root } => {
                        let root = if root.is_absolute() {
                            root.clone()
                        } else {
                            base_dir.join(root)
                        };
                        Box::new(DirectoryReplica::new(&spec.id, root).with_robustness(robustness))
                    }
                    ReplicaBackend::Memory => Box::new(MemoryReplica::new(&spec.id)),
                }
            })
            .collect()
    }
}

impl ItemSpec {
    fn to_item(&self, registry: &TransformerRegistry) -> Result<SyncItem> {
        let name = self.transformer.as_deref().unwrap_or(IDENTITY);
        let transformer = registry.get(name).ok_or_else(|| Error::UnknownTransformer {
            name: name.to_string(),
            item: self.name.clone(),
        })?;

        let mut builder = SyncItem::builder(&self.name, &self.pattern).shared_transformer(transformer);
        if let Some(folder) = &self.folder {
            builder = builder.folder(folder);
        }
        for (replica, target) in &self.targets {
            builder = match target {
                TargetEntry::Identifier(identifier) => builder.target(replica, identifier),
                TargetEntry::Detailed {
                    identifier,
                    folder: Some(folder),
                } => builder.target_in(replica, identifier, folder),
                TargetEntry::Detailed {
                    identifier,
                    folder: None,
                } => builder.target(replica, identifier),
            };
        }
        builder.build()
    }
}

fn manifest_error(message: impl Into<String>) -> Error {
    Error::Manifest {
        message: message.into(),
    }
}

/// Manifest to use when none is given explicitly: `$AIRSHIP_MANIFEST`, then
/// `airship.toml` in `cwd`, then the per-user config directory.
pub fn default_manifest_path(cwd: &Path) -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(MANIFEST_ENV).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(path));
    }

    let local = cwd.join(MANIFEST_FILE);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("airship").join(MANIFEST_FILE))
        .filter(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MANIFEST: &str = r#"
[options]
io_timeout_secs = 5

[[replicas]]
id = "laptop"
kind = "directory"
root = "laptop"

[[replicas]]
id = "scratch"
kind = "memory"

[[items]]
name = "Transistor"
pattern = '^[Pp]rofile[1-5]\.sav$'
folder = "Saves"

[items.targets]
laptop = "Transistor"
scratch = { identifier = "transistor", folder = "Documents" }
"#;

    #[test]
    fn parses_replicas_items_and_options() {
        let manifest = Manifest::parse(MANIFEST).unwrap();

        assert_eq!(
            manifest.replicas[0].backend,
            ReplicaBackend::Directory {
                root: PathBuf::from("laptop")
            }
        );
        assert_eq!(manifest.replicas[1].backend, ReplicaBackend::Memory);
        assert_eq!(manifest.options.to_options().io_timeout, Duration::from_secs(5));
        assert!(!manifest.options.to_options().dry_run);

        let item = &manifest.items[0];
        assert_eq!(item.targets["laptop"], TargetEntry::Identifier("Transistor".into()));
        assert_eq!(
            item.targets["scratch"],
            TargetEntry::Detailed {
                identifier: "transistor".into(),
                folder: Some("Documents".into())
            }
        );
    }

    #[test]
    fn items_resolve_targets_and_folders() {
        let manifest = Manifest::parse(MANIFEST).unwrap();
        let registry = TransformerRegistry::new();
        manifest.validate(&registry).unwrap();

        let items = manifest.to_items(&registry).unwrap();
        let item = &items[0];
        assert!(item.matches("profile3.sav"));
        assert_eq!(
            item.target_for("laptop").unwrap(),
            crate::ReplicaTarget::new("Transistor").with_folder("Saves")
        );
        assert_eq!(
            item.target_for("scratch").unwrap(),
            crate::ReplicaTarget::new("transistor").with_folder("Documents")
        );
    }

    #[test]
    fn validate_rejects_undeclared_replica() {
        let mut manifest = Manifest::parse(MANIFEST).unwrap();
        manifest.items[0]
            .targets
            .insert("phone".into(), TargetEntry::Identifier("x".into()));

        let err = manifest.validate(&TransformerRegistry::new()).unwrap_err();
        assert!(err.to_string().contains("undeclared replica phone"));
    }

    #[test]
    fn validate_rejects_duplicate_replica() {
        let mut manifest = Manifest::parse(MANIFEST).unwrap();
        let duplicate = manifest.replicas[0].clone();
        manifest.replicas.push(duplicate);

        assert!(matches!(
            manifest.validate(&TransformerRegistry::new()),
            Err(Error::DuplicateReplica(id)) if id == "laptop"
        ));
    }

    #[test]
    fn unknown_transformer_is_reported() {
        let mut manifest = Manifest::parse(MANIFEST).unwrap();
        manifest.items[0].transformer = Some("xml-rewrite".into());
        let registry = TransformerRegistry::new();

        assert!(matches!(
            manifest.validate(&registry),
            Err(Error::UnknownTransformer { ref name, .. }) if name == "xml-rewrite"
        ));
        assert!(manifest.to_items(&registry).is_err());
    }

    #[test]
    fn relative_roots_resolve_against_base() {
        let manifest = Manifest::parse(MANIFEST).unwrap();
        let replicas = manifest.build_replicas(Path::new("/srv/airship"), RobustnessConfig::default());
        let ids: Vec<&str> = replicas.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["laptop", "scratch"]);
    }

    #[test]
    fn parses_json() {
        let json = r#"{
            "replicas": [{ "id": "a", "kind": "memory" }],
            "items": [{ "name": "x", "pattern": ".*", "targets": { "a": "x" } }]
        }"#;
        let manifest = Manifest::parse_as(Path::new("m.json"), ConfigFormat::Json, json).unwrap();
        assert_eq!(manifest.items[0].name, "x");
        assert_eq!(manifest.options, OptionsSection::default());
    }
}
