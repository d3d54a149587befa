//! Plugin manifest declaration and validation.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Declarative identity of one registered plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginManifest {
    /// Stable plugin identifier, e.g. `community.tagger`.
    pub id: String,
    /// Plugin semantic version string (`major.minor.patch`).
    pub version: String,
    pub description: String,
}

impl PluginManifest {
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            description: String::new(),
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Validates declaration-level manifest invariants.
    pub fn validate(&self) -> Result<(), ManifestValidationError> {
        if self.id.trim().is_empty() {
            return Err(ManifestValidationError::EmptyId);
        }
        if !PLUGIN_ID_RE.is_match(self.id.trim()) {
            return Err(ManifestValidationError::InvalidId(self.id.clone()));
        }

        if self.version.trim().is_empty() {
            return Err(ManifestValidationError::EmptyVersion);
        }
        if !VERSION_RE.is_match(self.version.trim()) {
            return Err(ManifestValidationError::InvalidVersion(
                self.version.clone(),
            ));
        }
        Ok(())
    }
}

// Lowercase alphanumeric segments joined by single `.`, `_` or `-`.
static PLUGIN_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9]+(?:[._-][a-z0-9]+)*$").expect("valid plugin id regex")
});

static VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+\.[0-9]+\.[0-9]+$").expect("valid version regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestValidationError {
    EmptyId,
    InvalidId(String),
    EmptyVersion,
    InvalidVersion(String),
}

impl Display for ManifestValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId => write!(f, "plugin id must not be empty"),
            Self::InvalidId(value) => write!(f, "plugin id is invalid: {value}"),
            Self::EmptyVersion => write!(f, "plugin version must not be empty"),
            Self::InvalidVersion(value) => write!(
                f,
                "plugin version is invalid: {value} (expected major.minor.patch)"
            ),
        }
    }
}

impl Error for ManifestValidationError {}

#[cfg(test)]
mod tests {
    use super::{ManifestValidationError, PluginManifest};

    #[test]
    fn validates_well_formed_manifest() {
        let manifest = PluginManifest::new("community.tagger", "1.2.0").describe("auto tags");
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn rejects_empty_and_malformed_ids() {
        let err = PluginManifest::new("  ", "0.1.0").validate().unwrap_err();
        assert_eq!(err, ManifestValidationError::EmptyId);

        for id in ["Tagger", "tagger..x", "tagger.", ".tagger", "tag ger", "tagger-_x"] {
            let err = PluginManifest::new(id, "0.1.0").validate().unwrap_err();
            assert!(
                matches!(err, ManifestValidationError::InvalidId(_)),
                "{id} should be rejected"
            );
        }
    }

    #[test]
    fn accepts_separated_lowercase_ids() {
        for id in ["tagger", "community.tagger", "gallery_store-2", "9lives"] {
            assert!(PluginManifest::new(id, "0.1.0").validate().is_ok(), "{id}");
        }
    }

    #[test]
    fn rejects_non_triplet_versions() {
        let err = PluginManifest::new("tagger", "").validate().unwrap_err();
        assert_eq!(err, ManifestValidationError::EmptyVersion);

        for version in ["1", "1.0", "v1.0.0", "1.0.0-beta", "1..0"] {
            let err = PluginManifest::new("tagger", version).validate().unwrap_err();
            assert!(matches!(err, ManifestValidationError::InvalidVersion(_)));
        }
    }
}
