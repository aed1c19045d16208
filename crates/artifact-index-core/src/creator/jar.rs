//! The `jarContent` creator: class names found in the artifact.

use crate::artifact::ArtifactInfo;
use crate::document::Document;
use crate::fields::Field;

use super::IndexCreator;

pub struct JarContentCreator;

impl IndexCreator for JarContentCreator {
    fn id(&self) -> &'static str {
        "jarContent"
    }

    fn dependencies(&self) -> &'static [&'static str] {
        &["min"]
    }

    fn indexer_fields(&self) -> &'static [Field] {
        &[Field::ClassnamesStored, Field::Classnames]
    }

    fn update_document(&self, info: &ArtifactInfo, doc: &mut Document) {
        if info.classnames.is_empty() {
            return;
        }
        let joined = info.classnames.join("\n");
        doc.set(Field::Classnames, joined.clone());
        doc.set(Field::ClassnamesStored, joined);
    }

    fn update_artifact_info(&self, doc: &Document, info: &mut ArtifactInfo) -> bool {
        match doc.get(Field::ClassnamesStored) {
            Some(names) => info.set_field_value(Field::ClassnamesStored, names),
            None => false,
        }
    }
}
