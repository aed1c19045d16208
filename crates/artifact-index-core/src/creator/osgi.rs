//! The `osgi-metadatas` creator: bundle manifest headers and SHA-256.

use crate::artifact::ArtifactInfo;
use crate::document::Document;
use crate::fields::Field;

use super::IndexCreator;

pub struct OsgiCreator;

const FIELDS: &[Field] = &[
    Field::BundleSymbolicName,
    Field::BundleVersion,
    Field::BundleExportPackage,
    Field::BundleImportPackage,
    Field::BundleRequireCapability,
    Field::BundleProvideCapability,
    Field::Sha256,
];

impl IndexCreator for OsgiCreator {
    fn id(&self) -> &'static str {
        "osgi-metadatas"
    }

    fn dependencies(&self) -> &'static [&'static str] {
        &["min"]
    }

    fn indexer_fields(&self) -> &'static [Field] {
        FIELDS
    }

    fn update_document(&self, info: &ArtifactInfo, doc: &mut Document) {
        for field in FIELDS {
            if let Some(value) = info.field_value(*field) {
                doc.set(*field, value);
            }
        }
    }

    fn update_artifact_info(&self, doc: &Document, info: &mut ArtifactInfo) -> bool {
        let mut any = false;
        for field in FIELDS {
            if let Some(value) = doc.get(*field) {
                any |= info.set_field_value(*field, value);
            }
        }
        any
    }
}
