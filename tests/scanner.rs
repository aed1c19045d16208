use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use artifact_index::config::RepositoryConfig;
use artifact_index::progress::{NoProgress, ScanProgressEvent, ScanProgressReporter};
use artifact_index::scanner::scan_repository;
use artifact_index_core::fields::ArtifactAvailability;
use artifact_index_core::ArtifactInfo;

fn put(root: &Path, relative: &str, bytes: &[u8]) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, bytes).unwrap();
}

fn jar(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, body) in entries {
        writer
            .start_file(*name, zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(body.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn repo_config(path: &Path) -> RepositoryConfig {
    toml::from_str(&format!("path = \"{}\"", path.display())).unwrap()
}

fn scan(root: &Path) -> Vec<ArtifactInfo> {
    let mut artifacts = scan_repository("test", &repo_config(root), &NoProgress)
        .unwrap()
        .artifacts;
    artifacts.sort_by_key(|a| a.uinfo());
    artifacts
}

#[test]
fn pom_folds_into_binary_sibling() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    put(root, "org/acme/tool/1.0/tool-1.0.jar", &jar(&[("org/acme/Tool.class", "")]));
    put(
        root,
        "org/acme/tool/1.0/tool-1.0.pom",
        b"<project><packaging>maven-plugin</packaging><name>Tool</name></project>",
    );

    let artifacts = scan(root);
    assert_eq!(artifacts.len(), 1);
    let tool = &artifacts[0];
    assert_eq!(tool.extension, "jar");
    assert_eq!(tool.packaging.as_deref(), Some("maven-plugin"));
    assert_eq!(tool.name.as_deref(), Some("Tool"));
    assert_eq!(tool.classnames, vec!["/org/acme/Tool".to_string()]);
}

#[test]
fn lone_pom_is_indexed_with_pom_packaging() {
    let tmp = tempfile::tempdir().unwrap();
    put(tmp.path(), "org/acme/parent/3/parent-3.pom", b"<project/>");

    let artifacts = scan(tmp.path());
    assert_eq!(artifacts.len(), 1);
    assert_eq!(artifacts[0].extension, "pom");
    assert_eq!(artifacts[0].packaging.as_deref(), Some("pom"));
}

#[test]
fn classified_siblings_set_availability() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    put(root, "org/acme/lib/2.0/lib-2.0.jar", &jar(&[]));
    put(root, "org/acme/lib/2.0/lib-2.0-sources.jar", &jar(&[]));
    put(root, "org/acme/lib/2.0/lib-2.0.jar.asc", b"sig");

    let artifacts = scan(root);
    assert_eq!(artifacts.len(), 2);
    let main = artifacts.iter().find(|a| a.classifier.is_none()).unwrap();
    assert_eq!(main.sources_exists, ArtifactAvailability::Present);
    assert_eq!(main.javadoc_exists, ArtifactAvailability::NotPresent);
    assert_eq!(main.signature_exists, ArtifactAvailability::Present);

    let sources = artifacts.iter().find(|a| a.classifier.is_some()).unwrap();
    assert_eq!(sources.classifier.as_deref(), Some("sources"));
    assert_eq!(sources.signature_exists, ArtifactAvailability::NotPresent);
}

#[test]
fn sha1_sidecar_is_trusted_and_computed_otherwise() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    put(root, "org/acme/a/1/a-1.txt", b"hello");
    put(root, "org/acme/b/1/b-1.txt", b"hello");
    put(
        root,
        "org/acme/b/1/b-1.txt.sha1",
        b"0123456789ABCDEF0123456789abcdef01234567  b-1.txt\n",
    );

    let artifacts = scan(root);
    assert_eq!(artifacts.len(), 2);
    assert_eq!(
        artifacts[0].sha1.as_deref(),
        Some("aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d")
    );
    assert_eq!(
        artifacts[1].sha1.as_deref(),
        Some("0123456789abcdef0123456789abcdef01234567")
    );
}

#[test]
fn osgi_bundle_gets_headers_and_sha256() {
    let tmp = tempfile::tempdir().unwrap();
    put(
        tmp.path(),
        "org/acme/bundle/1.0/bundle-1.0.jar",
        &jar(&[(
            "META-INF/MANIFEST.MF",
            "Manifest-Version: 1.0\r\nBundle-SymbolicName: org.acme.bundle\r\nBundle-Version: 1.0.0\r\n\r\n",
        )]),
    );

    let artifacts = scan(tmp.path());
    assert_eq!(artifacts.len(), 1);
    assert_eq!(
        artifacts[0].bundle_symbolic_name.as_deref(),
        Some("org.acme.bundle")
    );
    assert_eq!(artifacts[0].bundle_version.as_deref(), Some("1.0.0"));
    assert_eq!(artifacts[0].sha256.as_ref().map(String::len), Some(64));
}

#[test]
fn excluded_paths_and_corrupt_archives() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    put(root, "org/acme/bad/1/bad-1.jar", b"not a zip");
    put(root, "org/acme/skip/1/skip-1.jar", &jar(&[]));

    let mut config = repo_config(root);
    config.exclude_globs = vec!["org/acme/skip/**".to_string()];
    let report = scan_repository("test", &config, &NoProgress).unwrap();
    assert_eq!(report.artifacts.len(), 1);
    let bad = &report.artifacts[0];
    assert_eq!(bad.artifact_id, "bad");
    assert!(bad.classnames.is_empty());
    assert!(bad.sha1.is_some());
}

#[derive(Default)]
struct Recorder(Mutex<Vec<ScanProgressEvent>>);

impl ScanProgressReporter for Recorder {
    fn report(&self, event: ScanProgressEvent) {
        self.0.lock().unwrap().push(event);
    }
}

#[test]
fn timestamped_snapshot_builds_fold_separately() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    let dir = "org/acme/tool/1.0-SNAPSHOT";
    for build in ["20240101.120000-1", "20240102.090000-2"] {
        put(root, &format!("{dir}/tool-1.0-{build}.jar"), &jar(&[]));
        put(
            root,
            &format!("{dir}/tool-1.0-{build}.pom"),
            b"<project><name>Tool</name></project>",
        );
    }
    put(root, &format!("{dir}/maven-metadata.xml"), b"<metadata/>");
    put(root, "org/acme/tool/README.txt", b"not an artifact");

    let recorder = Recorder::default();
    let report = scan_repository("test", &repo_config(root), &recorder).unwrap();
    let mut versions: Vec<(&str, &str)> = report
        .artifacts
        .iter()
        .map(|a| (a.version.as_str(), a.extension.as_str()))
        .collect();
    versions.sort();
    assert_eq!(
        versions,
        vec![("1.0-20240101.120000-1", "jar"), ("1.0-20240102.090000-2", "jar")]
    );
    assert!(report.artifacts.iter().all(|a| a.name.as_deref() == Some("Tool")));

    let events = recorder.0.into_inner().unwrap();
    assert!(matches!(events.first(), Some(ScanProgressEvent::Walking { files_seen: 0, .. })));
    let folded: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            ScanProgressEvent::Folded { directory, artifacts, done, total, .. } => {
                Some((directory.as_str(), *artifacts, *done, *total))
            }
            _ => None,
        })
        .collect();
    assert_eq!(folded, vec![(dir, 1, 1, 2), (dir, 1, 2, 2)]);
    assert_eq!(
        events.last(),
        Some(&ScanProgressEvent::Finished {
            repository: "test".into(),
            artifacts: 2,
            skipped: 1,
        })
    );
}
