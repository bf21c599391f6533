//! Nivaas Flags — hot-reloadable per-organization feature gates.
//!
//! Flags are read-mostly: every request may consult the gate, while
//! reloads are rare operator actions. The full flag map lives in an
//! immutable [`FlagSet`] snapshot behind an [`ArcSwap`]; readers are
//! lock-free and always observe either the old or the new complete
//! snapshot, never a partially-updated one.
//!
//! Evaluation is closed-by-default: unknown features, disabled flags, and
//! organizations outside a flag's target list all resolve to `false`.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// Target-list entry meaning "enabled for every organization".
pub const WILDCARD_TARGET: &str = "*";

#[derive(Debug, Error)]
pub enum FlagError {
    #[error("failed to read flag configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse flag configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A single flag as it appears in the configuration source: a global kill
/// switch plus a target list (the wildcard marker or explicit organization
/// ids).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlagRule {
    pub enabled: bool,
    #[serde(default)]
    pub targets: Vec<String>,
}

#[derive(Debug, Clone)]
enum TargetList {
    All,
    Orgs(HashSet<Uuid>),
}

#[derive(Debug, Clone)]
struct Flag {
    enabled: bool,
    targets: TargetList,
}

/// Immutable snapshot of the full flag map.
#[derive(Debug, Default)]
pub struct FlagSet {
    flags: HashMap<String, Flag>,
}

impl FlagSet {
    /// Build a snapshot from raw rules. Target entries that are neither the
    /// wildcard nor a valid organization UUID are skipped with a warning.
    pub fn from_rules(rules: HashMap<String, FlagRule>) -> Self {
        let flags = rules
            .into_iter()
            .map(|(name, rule)| {
                let targets = if rule.targets.iter().any(|t| t == WILDCARD_TARGET) {
                    TargetList::All
                } else {
                    let orgs = rule
                        .targets
                        .iter()
                        .filter_map(|t| match Uuid::parse_str(t) {
                            Ok(id) => Some(id),
                            Err(_) => {
                                warn!(flag = %name, target = %t, "ignoring malformed flag target");
                                None
                            }
                        })
                        .collect();
                    TargetList::Orgs(orgs)
                };
                (
                    name,
                    Flag {
                        enabled: rule.enabled,
                        targets,
                    },
                )
            })
            .collect();
        Self { flags }
    }

    /// Closed-by-default evaluation.
    pub fn is_enabled(&self, feature: &str, organization_id: Uuid) -> bool {
        match self.flags.get(feature) {
            None => false,
            Some(flag) if !flag.enabled => false,
            Some(flag) => match &flag.targets {
                TargetList::All => true,
                TargetList::Orgs(orgs) => orgs.contains(&organization_id),
            },
        }
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

/// Source of flag configuration, re-read on every [`FeatureGate::reload`].
pub trait FlagSource: Send + Sync {
    fn load(&self) -> Result<HashMap<String, FlagRule>, FlagError>;
}

/// Flag configuration in a JSON file: a named map of
/// `{"enabled": bool, "targets": [..]}` objects.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FlagSource for JsonFileSource {
    fn load(&self) -> Result<HashMap<String, FlagRule>, FlagError> {
        let raw = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Evaluates whether a named capability is enabled for an organization.
///
/// Reads are lock-free against the current snapshot; [`reload`] is the
/// sole writer and swaps the snapshot pointer wholesale.
///
/// [`reload`]: FeatureGate::reload
pub struct FeatureGate<S: FlagSource> {
    source: S,
    snapshot: ArcSwap<FlagSet>,
}

impl<S: FlagSource> FeatureGate<S> {
    /// Load the initial snapshot from `source`.
    pub fn load(source: S) -> Result<Self, FlagError> {
        let set = FlagSet::from_rules(source.load()?);
        info!(flags = set.len(), "feature flags loaded");
        Ok(Self {
            source,
            snapshot: ArcSwap::from_pointee(set),
        })
    }

    /// `false` for unknown features, disabled flags, and organizations not
    /// targeted; `true` for wildcard targets and explicit members.
    pub fn is_enabled(&self, feature: &str, organization_id: Uuid) -> bool {
        self.snapshot.load().is_enabled(feature, organization_id)
    }

    /// Re-read the configuration source and atomically swap the snapshot.
    ///
    /// On a source error the current snapshot stays in place.
    pub fn reload(&self) -> Result<(), FlagError> {
        let set = FlagSet::from_rules(self.source.load()?);
        info!(flags = set.len(), "feature flags reloaded");
        self.snapshot.store(Arc::new(set));
        Ok(())
    }
}
