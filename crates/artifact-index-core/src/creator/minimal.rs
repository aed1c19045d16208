//! The `min` creator: coordinates, file metadata and checksums.

use crate::artifact::ArtifactInfo;
use crate::document::Document;
use crate::fields::{join_components, split_components, ArtifactAvailability, Field, NA};

use super::IndexCreator;

pub struct MinimalCreator;

const FIELDS: &[Field] = &[
    Field::Uinfo,
    Field::Info,
    Field::Name,
    Field::Description,
    Field::Sha1,
    Field::GroupId,
    Field::ArtifactId,
    Field::Version,
    Field::Packaging,
    Field::Classifier,
    Field::Extension,
];

/// `packaging|lastModified|size|sources|javadoc|signature|extension`.
pub fn info_of(info: &ArtifactInfo) -> String {
    join_components(&[
        info.packaging.as_deref().unwrap_or(NA),
        &info.last_modified.to_string(),
        &info.size.to_string(),
        info.sources_exists.code(),
        info.javadoc_exists.code(),
        info.signature_exists.code(),
        &info.extension,
    ])
}

impl IndexCreator for MinimalCreator {
    fn id(&self) -> &'static str {
        "min"
    }

    fn indexer_fields(&self) -> &'static [Field] {
        FIELDS
    }

    fn update_document(&self, info: &ArtifactInfo, doc: &mut Document) {
        doc.set(Field::Uinfo, info.uinfo());
        doc.set(Field::Info, info_of(info));

        if let Some(name) = &info.name {
            doc.set(Field::Name, name.as_str());
        }
        if let Some(description) = &info.description {
            doc.set(Field::Description, description.as_str());
        }
        if let Some(sha1) = &info.sha1 {
            doc.set(Field::Sha1, sha1.as_str());
        }

        doc.set(Field::GroupId, info.group_id.as_str());
        doc.set(Field::ArtifactId, info.artifact_id.as_str());
        doc.set(Field::Version, info.version.as_str());
        doc.set(Field::Packaging, info.effective_packaging());
        if let Some(classifier) = &info.classifier {
            doc.set(Field::Classifier, classifier.as_str());
        }
        doc.set(Field::Extension, info.extension.as_str());
    }

    fn update_artifact_info(&self, doc: &Document, info: &mut ArtifactInfo) -> bool {
        let Some(uinfo) = doc.get(Field::Uinfo) else {
            return false;
        };
        let parts = split_components(uinfo);
        if parts.len() < 4 {
            return false;
        }
        info.group_id = parts[0].clone();
        info.artifact_id = parts[1].clone();
        info.version = parts[2].clone();
        info.classifier = (parts[3] != NA).then(|| parts[3].clone());
        if let Some(ext) = parts.get(4) {
            info.extension = ext.clone();
        }

        info.size = -1;
        if let Some(i) = doc.get(Field::Info) {
            let parts = split_components(i);
            if parts.len() >= 6 {
                info.packaging = (parts[0] != NA).then(|| parts[0].clone());
                info.last_modified = parts[1].parse().unwrap_or(0);
                info.size = parts[2].parse().unwrap_or(-1);
                info.sources_exists = ArtifactAvailability::from_code(&parts[3]);
                info.javadoc_exists = ArtifactAvailability::from_code(&parts[4]);
                info.signature_exists = ArtifactAvailability::from_code(&parts[5]);
                if info.extension.is_empty() {
                    if let Some(ext) = parts.get(6) {
                        info.extension = ext.clone();
                    }
                }
            }
        }

        info.name = doc.get(Field::Name).map(str::to_string);
        info.description = doc.get(Field::Description).map(str::to_string);
        info.sha1 = doc.get(Field::Sha1).map(str::to_string);
        info.record_modified = doc.record_modified().unwrap_or(0);
        true
    }
}
