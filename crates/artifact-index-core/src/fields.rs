//! Field catalog for indexed artifact documents.
//!
//! Every field the index stores or searches is named by a [`Field`] variant.
//! The wire name returned by [`Field::key`] is what lands in chunk records and
//! store documents, so it must never change for an existing variant.
//!
//! Composite fields (UINFO, INFO, group lists) use `|` as the internal
//! separator. Components are percent-escaped with [`escape_component`] so a
//! `|` inside a value can never shift the columns.

use serde::Serialize;

/// Separator inside composite field values.
pub const FS: &str = "|";

/// Sentinel for an absent classifier inside UINFO.
pub const NA: &str = "NA";

/// Value of the DESCRIPTOR field on the descriptor document.
pub const DESCRIPTOR_VALUE: &str = "ArtifactIndex";

/// Chunk/record format version recorded in the descriptor's IDXINFO.
pub const INDEX_FORMAT_VERSION: &str = "1.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Field {
    Uinfo,
    Deleted,
    Info,
    RecordModified,
    Name,
    Description,
    Sha1,
    /// Stored, newline separated class names.
    ClassnamesStored,
    /// Indexed class names (searchable).
    Classnames,
    PluginPrefix,
    PluginGoals,
    GroupId,
    ArtifactId,
    Version,
    Packaging,
    Classifier,
    Extension,
    BundleSymbolicName,
    BundleVersion,
    BundleExportPackage,
    BundleImportPackage,
    BundleRequireCapability,
    BundleProvideCapability,
    Sha256,
    Descriptor,
    IdxInfo,
    RootGroups,
    RootGroupsList,
    AllGroups,
    AllGroupsList,
}

impl Field {
    pub const ALL: [Field; 30] = [
        Field::Uinfo,
        Field::Deleted,
        Field::Info,
        Field::RecordModified,
        Field::Name,
        Field::Description,
        Field::Sha1,
        Field::ClassnamesStored,
        Field::Classnames,
        Field::PluginPrefix,
        Field::PluginGoals,
        Field::GroupId,
        Field::ArtifactId,
        Field::Version,
        Field::Packaging,
        Field::Classifier,
        Field::Extension,
        Field::BundleSymbolicName,
        Field::BundleVersion,
        Field::BundleExportPackage,
        Field::BundleImportPackage,
        Field::BundleRequireCapability,
        Field::BundleProvideCapability,
        Field::Sha256,
        Field::Descriptor,
        Field::IdxInfo,
        Field::RootGroups,
        Field::RootGroupsList,
        Field::AllGroups,
        Field::AllGroupsList,
    ];

    /// Wire name used in documents and chunks.
    pub fn key(self) -> &'static str {
        match self {
            Field::Uinfo => "u",
            Field::Deleted => "del",
            Field::Info => "i",
            Field::RecordModified => "m",
            Field::Name => "n",
            Field::Description => "d",
            Field::Sha1 => "1",
            Field::ClassnamesStored => "c",
            Field::Classnames => "classnames",
            Field::PluginPrefix => "px",
            Field::PluginGoals => "gx",
            Field::GroupId => "groupId",
            Field::ArtifactId => "artifactId",
            Field::Version => "version",
            Field::Packaging => "packaging",
            Field::Classifier => "classifier",
            Field::Extension => "extension",
            Field::BundleSymbolicName => "Bundle-SymbolicName",
            Field::BundleVersion => "Bundle-Version",
            Field::BundleExportPackage => "Export-Package",
            Field::BundleImportPackage => "Import-Package",
            Field::BundleRequireCapability => "Require-Capability",
            Field::BundleProvideCapability => "Provide-Capability",
            Field::Sha256 => "sha256",
            Field::Descriptor => "DESCRIPTOR",
            Field::IdxInfo => "IDXINFO",
            Field::RootGroups => "rootGroups",
            Field::RootGroupsList => "rootGroupsList",
            Field::AllGroups => "allGroups",
            Field::AllGroupsList => "allGroupsList",
        }
    }

    pub fn from_key(key: &str) -> Option<Field> {
        Field::ALL.iter().copied().find(|f| f.key() == key)
    }

    /// Stored fields travel in chunks; index-only fields are rebuilt on load.
    pub fn is_stored(self) -> bool {
        !matches!(
            self,
            Field::Classnames
                | Field::GroupId
                | Field::ArtifactId
                | Field::Version
                | Field::Packaging
                | Field::Classifier
                | Field::Extension
        )
    }

    /// Searchable fields.
    pub fn is_indexed(self) -> bool {
        !matches!(
            self,
            Field::Info
                | Field::RecordModified
                | Field::ClassnamesStored
                | Field::RootGroupsList
                | Field::AllGroupsList
                | Field::IdxInfo
        )
    }

    /// Tokenized fields are matched term-by-term in scored searches.
    pub fn is_tokenized(self) -> bool {
        matches!(
            self,
            Field::Name
                | Field::Description
                | Field::Classnames
                | Field::PluginGoals
                | Field::BundleExportPackage
                | Field::BundleImportPackage
                | Field::BundleRequireCapability
                | Field::BundleProvideCapability
        )
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Escape a component of a `|` separated composite value.
pub fn escape_component(value: &str) -> String {
    if !value.contains(['|', '%']) {
        return value.to_string();
    }
    value.replace('%', "%25").replace('|', "%7C")
}

pub fn unescape_component(value: &str) -> String {
    if !value.contains('%') {
        return value.to_string();
    }
    value.replace("%7C", "|").replace("%25", "%")
}

/// Join components with [`FS`], escaping each.
pub fn join_components<S: AsRef<str>>(parts: &[S]) -> String {
    parts
        .iter()
        .map(|p| escape_component(p.as_ref()))
        .collect::<Vec<_>>()
        .join(FS)
}

/// Split on [`FS`], unescaping each component.
pub fn split_components(value: &str) -> Vec<String> {
    value.split(FS).map(unescape_component).collect()
}

/// Presence of a side artifact (sources, javadoc, signature).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ArtifactAvailability {
    #[default]
    NotPresent,
    Present,
    NotAvailable,
}

impl ArtifactAvailability {
    pub fn code(self) -> &'static str {
        match self {
            ArtifactAvailability::NotPresent => "0",
            ArtifactAvailability::Present => "1",
            ArtifactAvailability::NotAvailable => "2",
        }
    }

    pub fn from_code(code: &str) -> Self {
        match code {
            "1" => ArtifactAvailability::Present,
            "2" => ArtifactAvailability::NotAvailable,
            _ => ArtifactAvailability::NotPresent,
        }
    }

    pub fn is_present(self) -> bool {
        self == ArtifactAvailability::Present
    }
}

/// Root group of a group id: everything up to the first `.`.
pub fn root_group(group_id: &str) -> &str {
    match group_id.find('.') {
        Some(pos) => &group_id[..pos],
        None => group_id,
    }
}
