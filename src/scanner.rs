//! Maven-layout repository scanner.
//!
//! Walks `g/r/o/u/p/artifactId/version/` directories and turns the files in
//! each version directory into [`ArtifactInfo`] records:
//!
//! - `artifactId-version[-classifier].ext` is parsed into coordinates;
//!   anything else in the directory is ignored. A `-SNAPSHOT` directory may
//!   also hold timestamped builds (`tool-1.0-20240101.120000-3.jar`); each
//!   build is indexed under its timestamped version.
//! - Checksums, signatures, `maven-metadata*.xml`, resolver bookkeeping and
//!   dot directories are skipped.
//! - A classifier-less POM next to a classifier-less binary is folded into
//!   that binary (packaging, name, description) and not indexed on its own.
//!   A lone POM is indexed with extension `pom`.
//! - `-sources.jar`, `-javadoc.jar` and `.asc` siblings set the availability
//!   flags; a `.sha1` sidecar is trusted, otherwise SHA-1 is computed.
//! - Zip-based binaries are opened for class names, plugin descriptors and
//!   OSGi headers. Unreadable archives are logged and indexed without them.

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use artifact_index_core::fields::{ArtifactAvailability, Field};
use artifact_index_core::ArtifactInfo;

use crate::config::RepositoryConfig;
use crate::extract::{self, PomInfo};
use crate::progress::{ScanProgressEvent, ScanProgressReporter, WALK_REPORT_EVERY};

const IGNORED_SUFFIXES: &[&str] = &[
    ".sha1", ".sha256", ".sha512", ".md5", ".asc", ".lastUpdated", ".part", ".lock",
];
const ARCHIVE_EXTENSIONS: &[&str] = &["jar", "war", "ear", "aar", "rar", "hpi", "jpi"];

/// Coordinates parsed from a repository path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coordinates {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub classifier: Option<String>,
    pub extension: String,
}

#[derive(Debug, Default)]
pub struct ScanReport {
    pub artifacts: Vec<ArtifactInfo>,
    pub files_seen: usize,
    /// Files that did not follow the layout.
    pub skipped: usize,
}

/// Parse `g/r/o/u/p/artifactId/version/file` relative to the repository
/// root. `None` when the path does not follow the layout.
pub fn parse_path(relative: &Path) -> Option<Coordinates> {
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.len() < 4 {
        return None;
    }
    let file = &parts[parts.len() - 1];
    let artifact_id = &parts[parts.len() - 3];
    let group_id = parts[..parts.len() - 3].join(".");

    let (version, rest) = split_version(file, artifact_id, &parts[parts.len() - 2])?;
    let (classifier, extension) = if let Some(ext) = rest.strip_prefix('.') {
        (None, ext)
    } else {
        let (classifier, ext) = rest.strip_prefix('-')?.split_once('.')?;
        if classifier.is_empty() {
            return None;
        }
        (Some(classifier.to_string()), ext)
    };
    if extension.is_empty() {
        return None;
    }
    Some(Coordinates {
        group_id,
        artifact_id: artifact_id.clone(),
        version,
        classifier,
        extension: extension.to_string(),
    })
}

/// Split `file` into its version and whatever follows it.
fn split_version<'f>(
    file: &'f str,
    artifact_id: &str,
    dir_version: &str,
) -> Option<(String, &'f str)> {
    let rest = file.strip_prefix(artifact_id)?.strip_prefix('-')?;
    if let Some(after) = rest.strip_prefix(dir_version) {
        return Some((dir_version.to_string(), after));
    }
    let base = dir_version.strip_suffix("-SNAPSHOT")?;
    let stamped = rest.strip_prefix(base)?.strip_prefix('-')?;
    let len = snapshot_stamp_len(stamped)?;
    Some((format!("{}-{}", base, &stamped[..len]), &stamped[len..]))
}

/// Length of a leading `yyyyMMdd.HHmmss-N` build stamp.
fn snapshot_stamp_len(s: &str) -> Option<usize> {
    let b = s.as_bytes();
    if b.len() < 17
        || !b[..8].iter().all(u8::is_ascii_digit)
        || b[8] != b'.'
        || !b[9..15].iter().all(u8::is_ascii_digit)
        || b[15] != b'-'
    {
        return None;
    }
    let build = b[16..].iter().take_while(|c| c.is_ascii_digit()).count();
    (build > 0).then_some(16 + build)
}

fn is_ignored(file_name: &str) -> bool {
    file_name.starts_with('.')
        || file_name.starts_with("maven-metadata")
        || file_name == "_remote.repositories"
        || file_name == "resolver-status.properties"
        || IGNORED_SUFFIXES.iter().any(|s| file_name.ends_with(s))
}

pub fn scan_repository(
    name: &str,
    repo: &RepositoryConfig,
    progress: &dyn ScanProgressReporter,
) -> Result<ScanReport> {
    let root = &repo.path;
    if !root.exists() {
        anyhow::bail!("Repository root does not exist: {}", root.display());
    }
    let walking = |report: &ScanReport| ScanProgressEvent::Walking {
        repository: name.to_string(),
        files_seen: report.files_seen as u64,
        skipped: report.skipped as u64,
    };

    let include_set = build_globset(&repo.include_globs)?;
    let exclude_set = build_globset(&repo.exclude_globs)?;

    let mut report = ScanReport::default();
    progress.report(walking(&report));
    // Timestamped snapshot builds share a directory but fold separately.
    let mut by_dir: BTreeMap<(PathBuf, String), Vec<(Coordinates, PathBuf)>> = BTreeMap::new();

    let walker = WalkDir::new(root)
        .follow_links(repo.follow_symlinks)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let file_name = entry.file_name().to_string_lossy();
        if is_ignored(&file_name) {
            continue;
        }
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().replace('\\', "/");
        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }
        report.files_seen += 1;
        if report.files_seen as u64 % WALK_REPORT_EVERY == 0 {
            progress.report(walking(&report));
        }
        match parse_path(relative) {
            Some(coords) => {
                let dir = relative.parent().map(Path::to_path_buf).unwrap_or_default();
                by_dir
                    .entry((dir, coords.version.clone()))
                    .or_default()
                    .push((coords, path.to_path_buf()));
            }
            None => {
                debug!(path = %rel_str, "Not a repository artifact; skipped");
                report.skipped += 1;
            }
        }
    }

    progress.report(walking(&report));

    let total = by_dir.len() as u64;
    for (done, ((dir, _), entries)) in by_dir.iter().enumerate() {
        let folded = fold_directory(entries);
        progress.report(ScanProgressEvent::Folded {
            repository: name.to_string(),
            directory: dir.to_string_lossy().replace('\\', "/"),
            artifacts: folded.len() as u64,
            done: done as u64 + 1,
            total,
        });
        report.artifacts.extend(folded);
    }
    progress.report(ScanProgressEvent::Finished {
        repository: name.to_string(),
        artifacts: report.artifacts.len() as u64,
        skipped: report.skipped as u64,
    });
    Ok(report)
}

/// Turn the artifact files of one version directory into records.
fn fold_directory(entries: &[(Coordinates, PathBuf)]) -> Vec<ArtifactInfo> {
    let is_pom = |c: &Coordinates| c.classifier.is_none() && c.extension == "pom";
    let pom = entries.iter().find(|(c, _)| is_pom(c));
    let main = entries
        .iter()
        .find(|(c, _)| c.classifier.is_none() && c.extension != "pom");
    let has_classifier = |name: &str| {
        entries
            .iter()
            .any(|(c, _)| c.classifier.as_deref() == Some(name))
    };
    let sources = availability(has_classifier("sources"));
    let javadoc = availability(has_classifier("javadoc"));

    let pom_info: PomInfo = match pom {
        Some((_, path)) => match std::fs::read(path)
            .map_err(|e| e.to_string())
            .and_then(|bytes| extract::parse_pom(&bytes).map_err(|e| e.to_string()))
        {
            Ok(info) => info,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable POM");
                PomInfo::default()
            }
        },
        None => PomInfo::default(),
    };

    let mut out = Vec::new();
    for (coords, path) in entries {
        if is_pom(coords) && main.is_some() {
            continue;
        }
        let mut info = ArtifactInfo::new(
            &coords.group_id,
            &coords.artifact_id,
            &coords.version,
            &coords.extension,
        );
        info.classifier = coords.classifier.clone();
        if coords.classifier.is_none() {
            info.packaging = pom_info.packaging.clone();
            info.name = pom_info.name.clone();
            info.description = pom_info.description.clone();
            info.sources_exists = sources;
            info.javadoc_exists = javadoc;
            if is_pom(coords) && info.packaging.is_none() {
                info.packaging = Some("pom".to_string());
            }
        }
        if let Err(e) = describe_file(path, &mut info) {
            warn!(path = %path.display(), error = %e, "Could not read artifact file; skipped");
            continue;
        }
        out.push(info);
    }
    out
}

fn availability(present: bool) -> ArtifactAvailability {
    if present {
        ArtifactAvailability::Present
    } else {
        ArtifactAvailability::NotPresent
    }
}

/// Fill file-derived fields: size, mtime, signature, checksums, content.
fn describe_file(path: &Path, info: &mut ArtifactInfo) -> Result<()> {
    let metadata = std::fs::metadata(path)?;
    info.size = metadata.len() as i64;
    info.last_modified = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0);
    info.signature_exists = availability(sidecar(path, "asc").exists());

    let archive = ARCHIVE_EXTENSIONS.contains(&info.extension.as_str());
    if archive {
        let bytes = std::fs::read(path)?;
        info.sha1 = Some(match read_sha1_sidecar(path) {
            Some(sha1) => sha1,
            None => hex::encode(Sha1::digest(&bytes)),
        });
        match extract::read_jar(&bytes) {
            Ok(content) => {
                info.classnames = content.classnames;
                info.plugin_prefix = content.plugin_prefix;
                info.plugin_goals = content.plugin_goals;
                for (header, value) in &content.bundle_headers {
                    if let Some(field) = Field::from_key(header) {
                        info.set_field_value(field, value);
                    }
                }
                if info.bundle_symbolic_name.is_some() {
                    info.sha256 = Some(hex::encode(Sha256::digest(&bytes)));
                }
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Archive content not indexed");
            }
        }
    } else {
        info.sha1 = Some(match read_sha1_sidecar(path) {
            Some(sha1) => sha1,
            None => {
                let mut file = std::fs::File::open(path)?;
                let mut hasher = Sha1::new();
                std::io::copy(&mut file, &mut hasher)?;
                hex::encode(hasher.finalize())
            }
        });
    }
    Ok(())
}

fn sidecar(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

/// The first token of a `.sha1` sidecar, when it looks like a SHA-1.
fn read_sha1_sidecar(path: &Path) -> Option<String> {
    let text = std::fs::read_to_string(sidecar(path, "sha1")).ok()?;
    let token = text.split_whitespace().next()?.to_ascii_lowercase();
    (token.len() == 40 && token.chars().all(|c| c.is_ascii_hexdigit())).then_some(token)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
