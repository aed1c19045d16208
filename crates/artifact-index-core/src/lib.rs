//! # Artifact Index Core
//!
//! Record model, chunked publishing protocol, indexing contexts and search
//! for Maven-style artifact indexes.
//!
//! Publishing writes gzip chunk files plus a properties manifest through a
//! [`resource::WritableResourceHandler`]; consumers reconcile against that
//! manifest with [`reader::IndexReader`] and fetch only the chunks they are
//! missing. Everything here is blocking and filesystem-optional: contexts
//! may live entirely in memory.

pub mod artifact;
pub mod codec;
pub mod context;
pub mod creator;
pub mod document;
pub mod error;
pub mod fields;
pub mod groups;
pub mod indexer;
pub mod packer;
pub mod properties;
pub mod query;
pub mod reader;
pub mod record;
pub mod resource;
pub mod search;
pub mod store;
pub mod update;
pub mod version;
pub mod writer;

pub use artifact::ArtifactInfo;
pub use context::IndexingContext;
pub use error::{IndexError, Result};
