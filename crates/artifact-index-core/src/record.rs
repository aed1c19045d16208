//! Typed records and their conversion to and from primitive documents.
//!
//! Chunks carry [`Document`]s (string name → string value). A [`Record`] is
//! the typed view of one such document: it knows what kind of entry it is
//! and exposes each entry with its proper value type. [`RecordExpander`]
//! goes document → record, [`RecordCompactor`] goes back.

use std::collections::{BTreeMap, BTreeSet};

use crate::document::Document;
use crate::error::{IndexError, Result};
use crate::fields::{
    join_components, split_components, ArtifactAvailability, Field, DESCRIPTOR_VALUE,
    INDEX_FORMAT_VERSION, NA,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    Descriptor,
    RootGroups,
    AllGroups,
    ArtifactAdd,
    ArtifactRemove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntryKey {
    RepositoryId,
    FormatVersion,
    Groups,
    GroupId,
    ArtifactId,
    Version,
    Classifier,
    FileExtension,
    Packaging,
    FileModified,
    FileSize,
    HasSources,
    HasJavadoc,
    HasSignature,
    RecordModified,
    Sha1,
    Name,
    Description,
    Classnames,
    PluginPrefix,
    PluginGoals,
    BundleSymbolicName,
    BundleVersion,
    BundleExportPackage,
    BundleImportPackage,
    BundleRequireCapability,
    BundleProvideCapability,
    Sha256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryValue {
    String(String),
    StringList(Vec<String>),
    Long(i64),
    Bool(bool),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub record_type: RecordType,
    entries: BTreeMap<EntryKey, EntryValue>,
}

impl Record {
    pub fn new(record_type: RecordType) -> Self {
        Self {
            record_type,
            entries: BTreeMap::new(),
        }
    }

    pub fn descriptor(repository_id: &str) -> Self {
        Record::new(RecordType::Descriptor)
            .with(EntryKey::RepositoryId, EntryValue::String(repository_id.into()))
            .with(
                EntryKey::FormatVersion,
                EntryValue::String(INDEX_FORMAT_VERSION.into()),
            )
    }

    /// A groups record; the list is sorted and deduplicated.
    pub fn groups<I, S>(record_type: RecordType, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = groups.into_iter().map(Into::into).collect();
        Record::new(record_type).with(EntryKey::Groups, EntryValue::StringList(set.into_iter().collect()))
    }

    pub fn with(mut self, key: EntryKey, value: EntryValue) -> Self {
        self.entries.insert(key, value);
        self
    }

    pub fn put(&mut self, key: EntryKey, value: EntryValue) {
        self.entries.insert(key, value);
    }

    pub fn get(&self, key: EntryKey) -> Option<&EntryValue> {
        self.entries.get(&key)
    }

    pub fn get_string(&self, key: EntryKey) -> Option<&str> {
        match self.entries.get(&key) {
            Some(EntryValue::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn get_list(&self, key: EntryKey) -> Option<&[String]> {
        match self.entries.get(&key) {
            Some(EntryValue::StringList(l)) => Some(l),
            _ => None,
        }
    }

    pub fn get_long(&self, key: EntryKey) -> Option<i64> {
        match self.entries.get(&key) {
            Some(EntryValue::Long(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn get_bool(&self, key: EntryKey) -> Option<bool> {
        match self.entries.get(&key) {
            Some(EntryValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = (&EntryKey, &EntryValue)> {
        self.entries.iter()
    }
}

fn string(s: &str) -> EntryValue {
    EntryValue::String(s.to_string())
}

/// Converts primitive documents into typed records.
#[derive(Debug, Default, Clone, Copy)]
pub struct RecordExpander;

impl RecordExpander {
    pub fn expand(&self, doc: &Document) -> Result<Record> {
        if let Some(descriptor) = doc.get(Field::Descriptor) {
            return self.expand_descriptor(descriptor, doc);
        }
        if doc.has(Field::RootGroups) {
            return Ok(expand_groups(RecordType::RootGroups, doc.get(Field::RootGroupsList)));
        }
        if doc.has(Field::AllGroups) {
            return Ok(expand_groups(RecordType::AllGroups, doc.get(Field::AllGroupsList)));
        }
        if let Some(deleted) = doc.get(Field::Deleted) {
            let mut record = Record::new(RecordType::ArtifactRemove);
            expand_uinfo(&mut record, deleted)?;
            if let Some(m) = doc.record_modified() {
                record.put(EntryKey::RecordModified, EntryValue::Long(m));
            }
            return Ok(record);
        }
        if let Some(uinfo) = doc.get(Field::Uinfo) {
            return self.expand_artifact(uinfo, doc);
        }
        Err(IndexError::format(
            "record",
            "document has no descriptor, groups, uinfo or deletion field",
        ))
    }

    fn expand_descriptor(&self, value: &str, doc: &Document) -> Result<Record> {
        if value != DESCRIPTOR_VALUE {
            return Err(IndexError::format(
                "record",
                format!("unexpected descriptor value '{}'", value),
            ));
        }
        let idxinfo = doc
            .get(Field::IdxInfo)
            .ok_or_else(|| IndexError::format("record", "descriptor without IDXINFO"))?;
        let parts = split_components(idxinfo);
        if parts.len() < 2 {
            return Err(IndexError::format(
                "record",
                format!("malformed IDXINFO '{}'", idxinfo),
            ));
        }
        Ok(Record::new(RecordType::Descriptor)
            .with(EntryKey::FormatVersion, string(&parts[0]))
            .with(EntryKey::RepositoryId, string(&parts[1])))
    }

    fn expand_artifact(&self, uinfo: &str, doc: &Document) -> Result<Record> {
        let mut record = Record::new(RecordType::ArtifactAdd);
        expand_uinfo(&mut record, uinfo)?;

        if let Some(info) = doc.get(Field::Info) {
            let parts = split_components(info);
            if parts.len() < 6 {
                return Err(IndexError::format(
                    "record",
                    format!("malformed INFO '{}' for {}", info, uinfo),
                ));
            }
            if parts[0] != NA {
                record.put(EntryKey::Packaging, string(&parts[0]));
            }
            record.put(
                EntryKey::FileModified,
                EntryValue::Long(parts[1].parse().unwrap_or(0)),
            );
            record.put(
                EntryKey::FileSize,
                EntryValue::Long(parts[2].parse().unwrap_or(-1)),
            );
            record.put(
                EntryKey::HasSources,
                EntryValue::Bool(ArtifactAvailability::from_code(&parts[3]).is_present()),
            );
            record.put(
                EntryKey::HasJavadoc,
                EntryValue::Bool(ArtifactAvailability::from_code(&parts[4]).is_present()),
            );
            record.put(
                EntryKey::HasSignature,
                EntryValue::Bool(ArtifactAvailability::from_code(&parts[5]).is_present()),
            );
            // Four-part UINFO leaves the extension to INFO.
            if record.get(EntryKey::FileExtension).is_none() {
                if let Some(ext) = parts.get(6) {
                    record.put(EntryKey::FileExtension, string(ext));
                }
            }
        }

        if let Some(m) = doc.record_modified() {
            record.put(EntryKey::RecordModified, EntryValue::Long(m));
        }

        let simple = [
            (Field::Sha1, EntryKey::Sha1),
            (Field::Name, EntryKey::Name),
            (Field::Description, EntryKey::Description),
            (Field::PluginPrefix, EntryKey::PluginPrefix),
            (Field::BundleSymbolicName, EntryKey::BundleSymbolicName),
            (Field::BundleVersion, EntryKey::BundleVersion),
            (Field::BundleExportPackage, EntryKey::BundleExportPackage),
            (Field::BundleImportPackage, EntryKey::BundleImportPackage),
            (Field::BundleRequireCapability, EntryKey::BundleRequireCapability),
            (Field::BundleProvideCapability, EntryKey::BundleProvideCapability),
            (Field::Sha256, EntryKey::Sha256),
        ];
        for (field, key) in simple {
            if let Some(v) = doc.get(field) {
                record.put(key, string(v));
            }
        }

        if let Some(c) = doc.get(Field::ClassnamesStored) {
            let names = c.lines().filter(|l| !l.is_empty()).map(str::to_string).collect();
            record.put(EntryKey::Classnames, EntryValue::StringList(names));
        }
        if let Some(gx) = doc.get(Field::PluginGoals) {
            record.put(EntryKey::PluginGoals, EntryValue::StringList(split_components(gx)));
        }
        Ok(record)
    }
}

fn expand_groups(record_type: RecordType, list: Option<&str>) -> Record {
    let groups: Vec<String> = list
        .map(|l| split_components(l).into_iter().filter(|g| !g.is_empty()).collect())
        .unwrap_or_default();
    Record::groups(record_type, groups)
}

fn expand_uinfo(record: &mut Record, uinfo: &str) -> Result<()> {
    let parts = split_components(uinfo);
    if parts.len() < 4 {
        return Err(IndexError::format(
            "record",
            format!("malformed UINFO '{}'", uinfo),
        ));
    }
    record.put(EntryKey::GroupId, string(&parts[0]));
    record.put(EntryKey::ArtifactId, string(&parts[1]));
    record.put(EntryKey::Version, string(&parts[2]));
    if parts[3] != NA {
        record.put(EntryKey::Classifier, string(&parts[3]));
    }
    if let Some(ext) = parts.get(4) {
        record.put(EntryKey::FileExtension, string(ext));
    }
    Ok(())
}

/// Converts typed records back into primitive documents.
#[derive(Debug, Default, Clone, Copy)]
pub struct RecordCompactor;

impl RecordCompactor {
    pub fn compact(&self, record: &Record) -> Document {
        let mut doc = Document::new();
        match record.record_type {
            RecordType::Descriptor => {
                doc.set(Field::Descriptor, DESCRIPTOR_VALUE);
                let version = record
                    .get_string(EntryKey::FormatVersion)
                    .unwrap_or(INDEX_FORMAT_VERSION);
                let repo = record.get_string(EntryKey::RepositoryId).unwrap_or_default();
                doc.set(Field::IdxInfo, join_components(&[version, repo]));
            }
            RecordType::RootGroups => {
                doc.set(Field::RootGroups, Field::RootGroups.key());
                doc.set(Field::RootGroupsList, join_components(record.get_list(EntryKey::Groups).unwrap_or_default()));
            }
            RecordType::AllGroups => {
                doc.set(Field::AllGroups, Field::AllGroups.key());
                doc.set(Field::AllGroupsList, join_components(record.get_list(EntryKey::Groups).unwrap_or_default()));
            }
            RecordType::ArtifactRemove => {
                doc.set(Field::Deleted, compact_uinfo(record));
                if let Some(m) = record.get_long(EntryKey::RecordModified) {
                    doc.set(Field::RecordModified, m.to_string());
                }
            }
            RecordType::ArtifactAdd => self.compact_artifact(record, &mut doc),
        }
        doc
    }

    fn compact_artifact(&self, record: &Record, doc: &mut Document) {
        doc.set(Field::Uinfo, compact_uinfo(record));

        let availability = |key| {
            if record.get_bool(key).unwrap_or(false) {
                ArtifactAvailability::Present.code()
            } else {
                ArtifactAvailability::NotPresent.code()
            }
        };
        let info = join_components(&[
            record.get_string(EntryKey::Packaging).unwrap_or(NA).to_string(),
            record.get_long(EntryKey::FileModified).unwrap_or(0).to_string(),
            record.get_long(EntryKey::FileSize).unwrap_or(-1).to_string(),
            availability(EntryKey::HasSources).to_string(),
            availability(EntryKey::HasJavadoc).to_string(),
            availability(EntryKey::HasSignature).to_string(),
            record.get_string(EntryKey::FileExtension).unwrap_or_default().to_string(),
        ]);
        doc.set(Field::Info, info);

        if let Some(m) = record.get_long(EntryKey::RecordModified) {
            doc.set(Field::RecordModified, m.to_string());
        }

        let simple = [
            (EntryKey::Name, Field::Name),
            (EntryKey::Description, Field::Description),
            (EntryKey::Sha1, Field::Sha1),
            (EntryKey::PluginPrefix, Field::PluginPrefix),
            (EntryKey::BundleSymbolicName, Field::BundleSymbolicName),
            (EntryKey::BundleVersion, Field::BundleVersion),
            (EntryKey::BundleExportPackage, Field::BundleExportPackage),
            (EntryKey::BundleImportPackage, Field::BundleImportPackage),
            (EntryKey::BundleRequireCapability, Field::BundleRequireCapability),
            (EntryKey::BundleProvideCapability, Field::BundleProvideCapability),
            (EntryKey::Sha256, Field::Sha256),
        ];
        for (key, field) in simple {
            if let Some(v) = record.get_string(key) {
                doc.set(field, v);
            }
        }
        if let Some(names) = record.get_list(EntryKey::Classnames) {
            doc.set(Field::ClassnamesStored, names.join("\n"));
        }
        if let Some(goals) = record.get_list(EntryKey::PluginGoals) {
            doc.set(Field::PluginGoals, join_components(goals));
        }
    }
}

fn compact_uinfo(record: &Record) -> String {
    crate::artifact::uinfo_of(
        record.get_string(EntryKey::GroupId).unwrap_or_default(),
        record.get_string(EntryKey::ArtifactId).unwrap_or_default(),
        record.get_string(EntryKey::Version).unwrap_or_default(),
        record.get_string(EntryKey::Classifier),
        record.get_string(EntryKey::FileExtension).unwrap_or_default(),
    )
}
