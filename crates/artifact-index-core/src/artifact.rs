//! The queryable, materialized view of one indexed artifact.
//!
//! An [`ArtifactInfo`] is built by the record producer when a repository is
//! scanned, or reconstructed from a store document when a search hits it.
//! Filters and post-processors may mutate it during a search; it is owned by
//! the search response that produced it and never shared across responses.

use std::cmp::Ordering;
use std::sync::Arc;

use serde::Serialize;

use crate::fields::{join_components, split_components, ArtifactAvailability, Field, NA};
use crate::version::compare_versions;

/// Highlighted fragments for one field of a search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchHighlight {
    pub field: Field,
    pub fragments: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ArtifactInfo {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub classifier: Option<String>,
    pub extension: String,
    pub packaging: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    /// Artifact file modification time (epoch millis).
    pub last_modified: i64,
    /// Artifact file size in bytes, -1 when unknown.
    pub size: i64,
    pub sources_exists: ArtifactAvailability,
    pub javadoc_exists: ArtifactAvailability,
    pub signature_exists: ArtifactAvailability,
    pub sha1: Option<String>,
    pub classnames: Vec<String>,
    pub plugin_prefix: Option<String>,
    pub plugin_goals: Vec<String>,
    pub bundle_symbolic_name: Option<String>,
    pub bundle_version: Option<String>,
    pub bundle_export_package: Option<String>,
    pub bundle_import_package: Option<String>,
    pub bundle_require_capability: Option<String>,
    pub bundle_provide_capability: Option<String>,
    pub sha256: Option<String>,
    /// Time the record was last written to the index (epoch millis).
    pub record_modified: i64,

    // Transient, search-time only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub match_highlights: Vec<MatchHighlight>,
}

impl ArtifactInfo {
    pub fn new(group_id: &str, artifact_id: &str, version: &str, extension: &str) -> Self {
        Self {
            group_id: group_id.to_string(),
            artifact_id: artifact_id.to_string(),
            version: version.to_string(),
            extension: extension.to_string(),
            size: -1,
            ..Default::default()
        }
    }

    pub fn with_classifier(mut self, classifier: &str) -> Self {
        self.classifier = Some(classifier.to_string());
        self
    }

    pub fn with_packaging(mut self, packaging: &str) -> Self {
        self.packaging = Some(packaging.to_string());
        self
    }

    /// The unique key: `groupId|artifactId|version|classifier|extension`.
    pub fn uinfo(&self) -> String {
        uinfo_of(
            &self.group_id,
            &self.artifact_id,
            &self.version,
            self.classifier.as_deref(),
            &self.extension,
        )
    }

    /// `groupId:artifactId:version`.
    pub fn gav(&self) -> String {
        format!("{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }

    /// Packaging, falling back to the file extension.
    pub fn effective_packaging(&self) -> &str {
        self.packaging.as_deref().unwrap_or(&self.extension)
    }

    /// Read a field through the catalog.
    pub fn field_value(&self, field: Field) -> Option<String> {
        let opt = |v: &Option<String>| v.clone();
        match field {
            Field::Uinfo => Some(self.uinfo()),
            Field::GroupId => Some(self.group_id.clone()),
            Field::ArtifactId => Some(self.artifact_id.clone()),
            Field::Version => Some(self.version.clone()),
            Field::Classifier => opt(&self.classifier),
            Field::Extension => Some(self.extension.clone()),
            Field::Packaging => opt(&self.packaging),
            Field::Name => opt(&self.name),
            Field::Description => opt(&self.description),
            Field::Sha1 => opt(&self.sha1),
            Field::Classnames | Field::ClassnamesStored => {
                if self.classnames.is_empty() {
                    None
                } else {
                    Some(self.classnames.join("\n"))
                }
            }
            Field::PluginPrefix => opt(&self.plugin_prefix),
            Field::PluginGoals => {
                if self.plugin_goals.is_empty() {
                    None
                } else {
                    Some(join_components(&self.plugin_goals))
                }
            }
            Field::BundleSymbolicName => opt(&self.bundle_symbolic_name),
            Field::BundleVersion => opt(&self.bundle_version),
            Field::BundleExportPackage => opt(&self.bundle_export_package),
            Field::BundleImportPackage => opt(&self.bundle_import_package),
            Field::BundleRequireCapability => opt(&self.bundle_require_capability),
            Field::BundleProvideCapability => opt(&self.bundle_provide_capability),
            Field::Sha256 => opt(&self.sha256),
            Field::RecordModified => Some(self.record_modified.to_string()),
            Field::Info
            | Field::Deleted
            | Field::Descriptor
            | Field::IdxInfo
            | Field::RootGroups
            | Field::RootGroupsList
            | Field::AllGroups
            | Field::AllGroupsList => None,
        }
    }

    /// Write a field through the catalog. Returns false for fields that are
    /// not settable on an artifact.
    pub fn set_field_value(&mut self, field: Field, value: &str) -> bool {
        let some = || Some(value.to_string());
        match field {
            Field::GroupId => self.group_id = value.to_string(),
            Field::ArtifactId => self.artifact_id = value.to_string(),
            Field::Version => self.version = value.to_string(),
            Field::Classifier => self.classifier = some(),
            Field::Extension => self.extension = value.to_string(),
            Field::Packaging => self.packaging = some(),
            Field::Name => self.name = some(),
            Field::Description => self.description = some(),
            Field::Sha1 => self.sha1 = some(),
            Field::Classnames | Field::ClassnamesStored => {
                self.classnames = value
                    .lines()
                    .filter(|l| !l.is_empty())
                    .map(str::to_string)
                    .collect()
            }
            Field::PluginPrefix => self.plugin_prefix = some(),
            Field::PluginGoals => {
                self.plugin_goals = split_components(value)
                    .into_iter()
                    .filter(|g| !g.is_empty())
                    .collect()
            }
            Field::BundleSymbolicName => self.bundle_symbolic_name = some(),
            Field::BundleVersion => self.bundle_version = some(),
            Field::BundleExportPackage => self.bundle_export_package = some(),
            Field::BundleImportPackage => self.bundle_import_package = some(),
            Field::BundleRequireCapability => self.bundle_require_capability = some(),
            Field::BundleProvideCapability => self.bundle_provide_capability = some(),
            Field::Sha256 => self.sha256 = some(),
            _ => return false,
        }
        true
    }
}

/// Build a unique key from its parts.
pub fn uinfo_of(
    group_id: &str,
    artifact_id: &str,
    version: &str,
    classifier: Option<&str>,
    extension: &str,
) -> String {
    join_components(&[
        group_id,
        artifact_id,
        version,
        classifier.filter(|c| !c.is_empty()).unwrap_or(NA),
        extension,
    ])
}

/// Caller-supplied ordering that also defines set identity in flat search.
pub type ArtifactComparator =
    Arc<dyn Fn(&ArtifactInfo, &ArtifactInfo) -> Ordering + Send + Sync>;

/// `(groupId, artifactId, version desc, classifier, packaging)`.
pub fn version_ordering(a: &ArtifactInfo, b: &ArtifactInfo) -> Ordering {
    a.group_id
        .cmp(&b.group_id)
        .then_with(|| a.artifact_id.cmp(&b.artifact_id))
        .then_with(|| compare_versions(&b.version, &a.version))
        .then_with(|| a.classifier.cmp(&b.classifier))
        .then_with(|| a.effective_packaging().cmp(b.effective_packaging()))
}

/// [`version_ordering`] followed by the owning context id.
pub fn context_version_ordering(a: &ArtifactInfo, b: &ArtifactInfo) -> Ordering {
    version_ordering(a, b).then_with(|| a.context_id.cmp(&b.context_id))
}

/// Default comparator for flat search: GAV identity, newest version first.
pub fn version_comparator() -> ArtifactComparator {
    Arc::new(version_ordering)
}

/// Comparator that keeps the same artifact from different contexts apart.
pub fn context_version_comparator() -> ArtifactComparator {
    Arc::new(context_version_ordering)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uinfo_uses_na_for_missing_classifier() {
        let ai = ArtifactInfo::new("qdox", "qdox", "1.5", "jar");
        assert_eq!(ai.uinfo(), "qdox|qdox|1.5|NA|jar");
        let ai = ai.with_classifier("sources");
        assert_eq!(ai.uinfo(), "qdox|qdox|1.5|sources|jar");
    }

    #[test]
    fn test_version_ordering_newest_first() {
        let old = ArtifactInfo::new("qdox", "qdox", "1.5", "jar");
        let new = ArtifactInfo::new("qdox", "qdox", "1.6.1", "jar");
        assert_eq!(version_ordering(&new, &old), Ordering::Less);
    }

    #[test]
    fn test_context_ordering_separates_contexts() {
        let mut a = ArtifactInfo::new("g", "a", "1", "jar");
        let mut b = a.clone();
        a.context_id = Some("one".into());
        b.context_id = Some("two".into());
        assert_eq!(version_ordering(&a, &b), Ordering::Equal);
        assert_ne!(context_version_ordering(&a, &b), Ordering::Equal);
    }

    #[test]
    fn test_field_accessors_round_trip() {
        let mut ai = ArtifactInfo::new("g", "a", "1", "jar");
        assert!(ai.set_field_value(Field::Name, "Library"));
        assert!(ai.set_field_value(Field::Classnames, "/a/B\n/a/C"));
        assert!(ai.set_field_value(Field::PluginGoals, "compile|test"));
        assert_eq!(ai.field_value(Field::Name).as_deref(), Some("Library"));
        assert_eq!(ai.classnames, vec!["/a/B", "/a/C"]);
        assert_eq!(ai.plugin_goals, vec!["compile", "test"]);
        assert!(!ai.set_field_value(Field::Descriptor, "x"));
    }
}
