//! Index creators: the mapping between [`ArtifactInfo`] and store documents.
//!
//! Each creator owns a slice of the field catalog. Writing an artifact runs
//! every creator's [`IndexCreator::update_document`] in dependency order;
//! reading a hit back runs [`IndexCreator::update_artifact_info`] in the same
//! order. The order is resolved once, when a [`CreatorPipeline`] is built,
//! and never per artifact.
//!
//! # Built-in creators
//!
//! | Id | Fields | Depends on |
//! |----|--------|------------|
//! | `min` | `u`, `i`, `m`, `n`, `d`, `1`, indexed coordinates | — |
//! | `jarContent` | `c`, `classnames` | `min` |
//! | `maven-plugin` | `px`, `gx` | `min` |
//! | `osgi-metadatas` | bundle headers, `sha256` | `min` |

pub mod jar;
pub mod minimal;
pub mod osgi;
pub mod plugin;

use std::collections::HashMap;
use std::sync::Arc;

use crate::artifact::ArtifactInfo;
use crate::document::Document;
use crate::error::{IndexError, Result};
use crate::fields::Field;

pub use jar::JarContentCreator;
pub use minimal::MinimalCreator;
pub use osgi::OsgiCreator;
pub use plugin::MavenPluginCreator;

/// A pure mapping between one slice of artifact metadata and document fields.
pub trait IndexCreator: Send + Sync {
    /// Stable identifier, referenced by other creators' dependencies.
    fn id(&self) -> &'static str;

    /// Creators that must run before this one.
    fn dependencies(&self) -> &'static [&'static str] {
        &[]
    }

    /// Fields this creator writes.
    fn indexer_fields(&self) -> &'static [Field];

    /// Copy this creator's fields from the artifact into the document.
    fn update_document(&self, info: &ArtifactInfo, doc: &mut Document);

    /// Copy this creator's fields from the document into the artifact.
    /// Returns true when anything was set.
    fn update_artifact_info(&self, doc: &Document, info: &mut ArtifactInfo) -> bool;
}

/// All built-in creators, in declaration order.
pub fn builtin_creators() -> Vec<Arc<dyn IndexCreator>> {
    vec![
        Arc::new(MinimalCreator),
        Arc::new(JarContentCreator),
        Arc::new(MavenPluginCreator),
        Arc::new(OsgiCreator),
    ]
}

/// Look up built-in creators by id.
pub fn creators_by_id<S: AsRef<str>>(ids: &[S]) -> Result<Vec<Arc<dyn IndexCreator>>> {
    let all = builtin_creators();
    ids.iter()
        .map(|id| {
            let id = id.as_ref();
            all.iter()
                .find(|c| c.id() == id)
                .cloned()
                .ok_or_else(|| IndexError::Validation(format!("unknown index creator '{}'", id)))
        })
        .collect()
}

/// Creators in resolved dependency order.
#[derive(Clone)]
pub struct CreatorPipeline {
    creators: Vec<Arc<dyn IndexCreator>>,
}

impl std::fmt::Debug for CreatorPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.ids()).finish()
    }
}

impl CreatorPipeline {
    /// Order creators so every dependency runs first. Ties keep the input
    /// order. A missing dependency, a duplicate id or a cycle is rejected.
    pub fn resolve(creators: Vec<Arc<dyn IndexCreator>>) -> Result<Self> {
        let mut index: HashMap<&'static str, usize> = HashMap::new();
        for (i, c) in creators.iter().enumerate() {
            if index.insert(c.id(), i).is_some() {
                return Err(IndexError::Validation(format!(
                    "index creator '{}' listed twice",
                    c.id()
                )));
            }
        }

        let mut pending: Vec<usize> = vec![0; creators.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); creators.len()];
        for (i, c) in creators.iter().enumerate() {
            for dep in c.dependencies() {
                let j = *index.get(dep).ok_or_else(|| {
                    IndexError::Validation(format!(
                        "index creator '{}' depends on missing creator '{}'",
                        c.id(),
                        dep
                    ))
                })?;
                pending[i] += 1;
                dependents[j].push(i);
            }
        }

        let mut order = Vec::with_capacity(creators.len());
        let mut done = vec![false; creators.len()];
        while order.len() < creators.len() {
            let next = (0..creators.len()).find(|&i| !done[i] && pending[i] == 0);
            let Some(i) = next else {
                let stuck: Vec<&str> = (0..creators.len())
                    .filter(|&i| !done[i])
                    .map(|i| creators[i].id())
                    .collect();
                return Err(IndexError::Validation(format!(
                    "index creator dependency cycle among {:?}",
                    stuck
                )));
            };
            done[i] = true;
            order.push(i);
            for &d in &dependents[i] {
                pending[d] -= 1;
            }
        }

        Ok(Self {
            creators: order.into_iter().map(|i| creators[i].clone()).collect(),
        })
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.creators.iter().map(|c| c.id()).collect()
    }

    pub fn creators(&self) -> &[Arc<dyn IndexCreator>] {
        &self.creators
    }

    /// Build the store document for an artifact.
    pub fn to_document(&self, info: &ArtifactInfo) -> Document {
        let mut doc = Document::new();
        for creator in &self.creators {
            creator.update_document(info, &mut doc);
        }
        doc
    }

    /// Rebuild an artifact from a store document. `None` when the document
    /// carries no artifact at all.
    pub fn to_artifact_info(&self, doc: &Document) -> Option<ArtifactInfo> {
        let mut info = ArtifactInfo::default();
        let mut any = false;
        for creator in &self.creators {
            any |= creator.update_artifact_info(doc, &mut info);
        }
        if any && !info.group_id.is_empty() {
            Some(info)
        } else {
            None
        }
    }
}
