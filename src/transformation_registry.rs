use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::{schema_version::SchemaVersion, transformation_rule::VersionedRuleSet};

#[derive(Debug, Clone)]
struct SubsystemEntry {
    current_version: SchemaVersion,
    rule_sets: BTreeMap<SchemaVersion, Arc<VersionedRuleSet>>,
}

/// Mutable registration-time view of the registry.
///
/// Populated once while subsystems are bootstrapped, then frozen with
/// [`publish`](RegistryBuilder::publish).
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    subsystems: HashMap<String, SubsystemEntry>,
}

/// Read-only table of (subsystem, legacy version) → rule set.
///
/// Cloning is cheap and clones share the same snapshot, so the registry can be
/// handed to any number of threads.
#[derive(Debug, Clone, Default)]
pub struct TransformationRegistry {
    subsystems: Arc<HashMap<String, SubsystemEntry>>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Subsystem already registered: {0}")]
    DuplicateSubsystem(String),

    #[error("Subsystem not registered: {0}")]
    UnknownSubsystem(String),

    #[error("Transformation for {subsystem} {version} already registered")]
    DuplicateVersion { subsystem: String, version: SchemaVersion },

    #[error("Version {version} of {subsystem} is not older than the current version {current}")]
    NotALegacyVersion {
        subsystem: String,
        version: SchemaVersion,
        current: SchemaVersion,
    },

    #[error("Rule set built for subsystem {found} registered under {expected}")]
    SubsystemMismatch { expected: String, found: String },
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a subsystem and the model version it currently exposes.
    pub fn register_subsystem(
        &mut self,
        subsystem: impl Into<String>,
        current_version: SchemaVersion,
    ) -> Result<&mut Self, RegistryError> {
        let subsystem = subsystem.into();
        if self.subsystems.contains_key(&subsystem) {
            return Err(RegistryError::DuplicateSubsystem(subsystem));
        }

        info!(subsystem = %subsystem, version = %current_version, "Registered subsystem");
        self.subsystems.insert(
            subsystem,
            SubsystemEntry {
                current_version,
                rule_sets: BTreeMap::new(),
            },
        );
        Ok(self)
    }

    /// Registers the rules transforming `subsystem` trees down to the legacy `version`.
    pub fn register(
        &mut self,
        subsystem: &str,
        version: SchemaVersion,
        rule_set: VersionedRuleSet,
    ) -> Result<&mut Self, RegistryError> {
        if rule_set.subsystem() != subsystem {
            return Err(RegistryError::SubsystemMismatch {
                expected: subsystem.to_string(),
                found: rule_set.subsystem().to_string(),
            });
        }

        let entry = self
            .subsystems
            .get_mut(subsystem)
            .ok_or_else(|| RegistryError::UnknownSubsystem(subsystem.to_string()))?;

        if !version.is_legacy_of(&entry.current_version) {
            return Err(RegistryError::NotALegacyVersion {
                subsystem: subsystem.to_string(),
                version,
                current: entry.current_version,
            });
        }

        if entry.rule_sets.contains_key(&version) {
            return Err(RegistryError::DuplicateVersion {
                subsystem: subsystem.to_string(),
                version,
            });
        }

        info!(subsystem, version = %version, rules = rule_set.rule_count(), "Registered transformation");
        entry.rule_sets.insert(version, Arc::new(rule_set));
        Ok(self)
    }

    /// Freezes the registrations into an immutable, shareable registry.
    pub fn publish(self) -> TransformationRegistry {
        info!(subsystems = self.subsystems.len(), "Published transformation registry");
        TransformationRegistry {
            subsystems: Arc::new(self.subsystems),
        }
    }
}

impl TransformationRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// The rule set for `subsystem` at `version`. `None` means no transformation is registered.
    pub fn lookup(&self, subsystem: &str, version: &SchemaVersion) -> Option<Arc<VersionedRuleSet>> {
        self.subsystems
            .get(subsystem)
            .and_then(|entry| entry.rule_sets.get(version))
            .cloned()
    }

    pub fn current_version(&self, subsystem: &str) -> Option<SchemaVersion> {
        self.subsystems.get(subsystem).map(|entry| entry.current_version)
    }

    /// Legacy versions with a registered transformation, oldest first.
    pub fn legacy_versions(&self, subsystem: &str) -> Vec<SchemaVersion> {
        self.subsystems
            .get(subsystem)
            .map(|entry| entry.rule_sets.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn subsystems(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.subsystems.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
