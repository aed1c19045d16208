//! The `maven-plugin` creator: goal prefix and goals of build plugins.

use crate::artifact::ArtifactInfo;
use crate::document::Document;
use crate::fields::Field;

use super::IndexCreator;

pub struct MavenPluginCreator;

impl IndexCreator for MavenPluginCreator {
    fn id(&self) -> &'static str {
        "maven-plugin"
    }

    fn dependencies(&self) -> &'static [&'static str] {
        &["min"]
    }

    fn indexer_fields(&self) -> &'static [Field] {
        &[Field::PluginPrefix, Field::PluginGoals]
    }

    fn update_document(&self, info: &ArtifactInfo, doc: &mut Document) {
        for field in self.indexer_fields() {
            if let Some(value) = info.field_value(*field) {
                doc.set(*field, value);
            }
        }
    }

    fn update_artifact_info(&self, doc: &Document, info: &mut ArtifactInfo) -> bool {
        let mut any = false;
        for field in self.indexer_fields() {
            if let Some(value) = doc.get(*field) {
                any |= info.set_field_value(*field, value);
            }
        }
        any
    }
}
