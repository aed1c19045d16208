//! Primitive-keyed documents: the form records take inside the store and on
//! the wire.

use crate::fields::Field;

/// Flag bits carried per field on the wire.
pub const FLAG_INDEXED: u8 = 0x01;
pub const FLAG_TOKENIZED: u8 = 0x02;
pub const FLAG_STORED: u8 = 0x04;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocField {
    pub name: String,
    pub value: String,
    pub flags: u8,
}

impl DocField {
    pub fn is_stored(&self) -> bool {
        self.flags & FLAG_STORED != 0
    }
}

/// Flags derived from the catalog; unknown fields are stored verbatim.
pub fn flags_for(name: &str) -> u8 {
    match Field::from_key(name) {
        Some(field) => {
            let mut flags = 0;
            if field.is_indexed() {
                flags |= FLAG_INDEXED;
            }
            if field.is_tokenized() {
                flags |= FLAG_TOKENIZED;
            }
            if field.is_stored() {
                flags |= FLAG_STORED;
            }
            flags
        }
        None => FLAG_STORED,
    }
}

/// An ordered multi-map of named string fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    fields: Vec<DocField>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a catalog field, replacing any previous value.
    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        self.set_raw(field.key(), value);
    }

    /// Add a field by wire name, replacing any previous value.
    pub fn set_raw(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        let flags = flags_for(name);
        if let Some(existing) = self.fields.iter_mut().find(|f| f.name == name) {
            existing.value = value;
            existing.flags = flags;
        } else {
            self.fields.push(DocField {
                name: name.to_string(),
                value,
                flags,
            });
        }
    }

    /// Append a field exactly as read from the wire.
    pub fn push(&mut self, field: DocField) {
        self.fields.push(field);
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.get_raw(field.key())
    }

    pub fn get_raw(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }

    pub fn has(&self, field: Field) -> bool {
        self.get(field).is_some()
    }

    pub fn remove(&mut self, field: Field) {
        self.fields.retain(|f| f.name != field.key());
    }

    pub fn fields(&self) -> &[DocField] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Copy of this document with index-only fields dropped.
    pub fn stored_only(&self) -> Document {
        Document {
            fields: self.fields.iter().filter(|f| f.is_stored()).cloned().collect(),
        }
    }

    pub fn is_descriptor(&self) -> bool {
        self.has(Field::Descriptor)
    }

    pub fn is_groups(&self) -> bool {
        self.has(Field::RootGroups) || self.has(Field::AllGroups)
    }

    pub fn is_deletion_marker(&self) -> bool {
        self.has(Field::Deleted)
    }

    pub fn is_artifact(&self) -> bool {
        self.has(Field::Uinfo)
    }

    /// Record modification time in epoch millis, if present.
    pub fn record_modified(&self) -> Option<i64> {
        self.get(Field::RecordModified).and_then(|m| m.parse().ok())
    }
}

impl FromIterator<(String, String)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut doc = Document::new();
        for (k, v) in iter {
            doc.set_raw(&k, v);
        }
        doc
    }
}
