//! # Artifact Index
//!
//! Command-line front end for `artifact-index-core`: scans Maven-layout
//! repositories into indexing contexts, publishes them as incremental chunk
//! chains, pulls remote chains and searches across contexts.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌─────────────┐
//! │  Repository │──▶│   Scanner   │──▶│   Context   │──▶ publish (chunks)
//! │  g/a/v/...  │   │ POM+JAR+OSGi│   │  store.gz   │
//! └─────────────┘   └─────────────┘   └──────┬──────┘
//!                                            ▲  │
//!                      update (HTTP/dir) ────┘  ▼
//!                                         ┌──────────┐
//!                                         │  search  │
//!                                         └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`scanner`] | Repository walk and record building |
//! | [`extract`] | JAR, POM and manifest readers |
//! | [`ingest`] | `scan`: incremental diff or full rebuild |
//! | [`publish`] | `publish`: pack a context into chunks |
//! | [`remote`] | `update`: apply a remote chain |
//! | [`http`] | HTTP resource handler |
//! | [`search`] | `search`: flat and grouped queries |
//! | [`repos`] | Context lookup and listing |
//! | [`stats`] | Per-context statistics |
//! | [`progress`] | Scan progress reporting |

pub mod config;
pub mod extract;
pub mod http;
pub mod ingest;
pub mod progress;
pub mod publish;
pub mod remote;
pub mod repos;
pub mod scanner;
pub mod search;
pub mod stats;
