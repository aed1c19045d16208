use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn aidx_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("aidx");
    path
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

fn put(root: &Path, relative: &str, bytes: &[u8]) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, bytes).unwrap();
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let repo = root.join("repo");
    let qdox = "com/thoughtworks/qdox/qdox";
    put(
        &repo,
        &format!("{qdox}/1.5/qdox-1.5.jar"),
        &jar(&[
            ("META-INF/MANIFEST.MF", "Manifest-Version: 1.0\r\n\r\n"),
            ("com/thoughtworks/qdox/JavaDocBuilder.class", "x"),
            ("com/thoughtworks/qdox/model/JavaClass.class", "x"),
        ]),
    );
    put(
        &repo,
        &format!("{qdox}/1.5/qdox-1.5.pom"),
        br#"<project><packaging>jar</packaging><name>QDox</name>
<description>Extracts class and interface definitions from source files.</description></project>"#,
    );
    put(
        &repo,
        &format!("{qdox}/1.6.1/qdox-1.6.1.jar"),
        &jar(&[("com/thoughtworks/qdox/JavaDocBuilder.class", "y")]),
    );
    put(
        &repo,
        "org/acme/parent/1.0/parent-1.0.pom",
        b"<project><name>Acme Parent</name></project>",
    );
    put(&repo, &format!("{qdox}/maven-metadata.xml"), b"<metadata/>");
    put(&repo, "README.txt", b"not an artifact");

    let config_content = format!(
        r#"[index]
dir = "{root}/index"

[repositories.local]
path = "{root}/repo"

[publish]
dir = "{root}/published"
index_id = "idx"

[remotes.mirror]
url = "file://{root}/published"
index_id = "idx"
context = "mirror"
"#,
        root = root.display()
    );

    let config_path = config_dir.join("aidx.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_aidx(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = aidx_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run aidx binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn search_json(config_path: &Path, args: &[&str]) -> serde_json::Value {
    let mut full = vec!["search"];
    full.extend_from_slice(args);
    full.push("--json");
    let (stdout, stderr, success) = run_aidx(config_path, &full);
    assert!(success, "search failed: stdout={}, stderr={}", stdout, stderr);
    serde_json::from_str(&stdout).unwrap_or_else(|e| panic!("bad JSON {}: {}", e, stdout))
}

#[test]
fn test_repos_lists_configured_contexts() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_aidx(&config_path, &["repos"]);
    assert!(success, "repos failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("local"));
    assert!(stdout.contains("mirror"));
    assert!(stdout.contains("never"));
}

#[test]
fn test_scan_indexes_repository() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_aidx(&config_path, &["scan", "local"]);
    assert!(success, "scan failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("artifacts found: 3"), "{}", stdout);
    assert!(stdout.contains("added: 3"), "{}", stdout);
    assert!(stdout.contains("ok"));
    assert!(tmp.path().join("index/local/store.gz").exists());
}

#[test]
fn test_scan_twice_changes_nothing() {
    let (_tmp, config_path) = setup_test_env();

    run_aidx(&config_path, &["scan", "local"]);
    let (stdout, _, success) = run_aidx(&config_path, &["scan", "local"]);
    assert!(success);
    assert!(stdout.contains("added: 0"), "{}", stdout);
    assert!(stdout.contains("updated: 0"), "{}", stdout);
    assert!(stdout.contains("removed: 0"), "{}", stdout);
}

#[test]
fn test_dry_run_writes_nothing() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_aidx(&config_path, &["scan", "local", "--dry-run"]);
    assert!(success);
    assert!(stdout.contains("artifacts found: 3"));
    assert!(!tmp.path().join("index/local/store.gz").exists());
}

#[test]
fn test_scan_unknown_repo_fails() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_aidx(&config_path, &["scan", "nope"]);
    assert!(!success);
    assert!(stderr.contains("Unknown repository"));
}

#[test]
fn test_removed_file_is_dropped_on_rescan() {
    let (tmp, config_path) = setup_test_env();

    run_aidx(&config_path, &["scan", "local"]);
    fs::remove_file(
        tmp.path()
            .join("repo/com/thoughtworks/qdox/qdox/1.6.1/qdox-1.6.1.jar"),
    )
    .unwrap();
    let (stdout, _, success) = run_aidx(&config_path, &["scan", "local"]);
    assert!(success);
    assert!(stdout.contains("removed: 1"), "{}", stdout);

    let json = search_json(&config_path, &["qdox", "--repo", "local"]);
    assert_eq!(json["total_hits"], 1);
}

#[test]
fn test_full_scan_rebuilds_store() {
    let (tmp, config_path) = setup_test_env();

    run_aidx(&config_path, &["scan", "local"]);
    let (stdout, stderr, success) = run_aidx(&config_path, &["scan", "local", "--full"]);
    assert!(success, "full scan failed: {}", stderr);
    assert!(stdout.contains("(full)"));

    let leftovers: Vec<_> = fs::read_dir(tmp.path().join("index"))
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().contains(".rebuild-"))
        .collect();
    assert!(leftovers.is_empty(), "staging directory left behind");

    let json = search_json(&config_path, &["qdox"]);
    assert_eq!(json["total_hits"], 2);
}

#[test]
fn test_search_finds_pom_metadata_and_classes() {
    let (_tmp, config_path) = setup_test_env();
    run_aidx(&config_path, &["scan", "local"]);

    let json = search_json(&config_path, &["interface definitions"]);
    assert_eq!(json["total_hits"], 1);
    assert_eq!(json["results"][0]["version"], "1.5");
    assert_eq!(json["results"][0]["name"], "QDox");

    let json = search_json(&config_path, &["JavaDocBuilder", "--field", "classnames"]);
    assert_eq!(json["total_hits"], 2);

    let json = search_json(
        &config_path,
        &["org.acme", "--field", "groupId", "--exact"],
    );
    assert_eq!(json["total_hits"], 1);
    assert_eq!(json["results"][0]["packaging"], "pom");
}

#[test]
fn test_search_grouped_by_ga() {
    let (_tmp, config_path) = setup_test_env();
    run_aidx(&config_path, &["scan", "local"]);

    let json = search_json(&config_path, &["qdox", "--group-by", "ga"]);
    let groups = json["groups"].as_array().unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0]["key"], "com.thoughtworks.qdox:qdox");
    assert_eq!(groups[0]["artifacts"].as_array().unwrap().len(), 2);
}

#[test]
fn test_search_no_results() {
    let (_tmp, config_path) = setup_test_env();
    run_aidx(&config_path, &["scan", "local"]);

    let (stdout, _, success) = run_aidx(&config_path, &["search", "zzzzzz"]);
    assert!(success);
    assert!(stdout.contains("No results."));
}

#[test]
fn test_publish_writes_full_chunk() {
    let (tmp, config_path) = setup_test_env();
    run_aidx(&config_path, &["scan", "local"]);

    let (stdout, stderr, success) = run_aidx(&config_path, &["publish", "local"]);
    assert!(success, "publish failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("counter: 0"), "{}", stdout);
    assert!(tmp.path().join("published/idx.gz").exists());
    assert!(tmp.path().join("published/idx.properties").exists());
}

#[test]
fn test_publish_update_round_trip() {
    let (tmp, config_path) = setup_test_env();
    run_aidx(&config_path, &["scan", "local"]);
    run_aidx(&config_path, &["publish", "local"]);

    let (stdout, stderr, success) = run_aidx(&config_path, &["update", "mirror"]);
    assert!(success, "update failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("full sync: idx.gz"), "{}", stdout);

    let json = search_json(&config_path, &["qdox", "--repo", "mirror"]);
    assert_eq!(json["total_hits"], 2);

    // Nothing new upstream.
    let (stdout, _, success) = run_aidx(&config_path, &["update", "mirror"]);
    assert!(success);
    assert!(stdout.contains("up to date"), "{}", stdout);

    // A removal travels as an incremental chunk.
    fs::remove_file(
        tmp.path()
            .join("repo/com/thoughtworks/qdox/qdox/1.6.1/qdox-1.6.1.jar"),
    )
    .unwrap();
    run_aidx(&config_path, &["scan", "local"]);
    let (stdout, _, success) = run_aidx(&config_path, &["publish", "local"]);
    assert!(success);
    assert!(stdout.contains("counter: 1"), "{}", stdout);
    assert!(tmp.path().join("published/idx.1.gz").exists());

    let (stdout, stderr, success) = run_aidx(&config_path, &["update", "mirror"]);
    assert!(success, "update failed: {}", stderr);
    assert!(stdout.contains("incremental sync: idx.1.gz"), "{}", stdout);

    let json = search_json(&config_path, &["qdox", "--repo", "mirror"]);
    assert_eq!(json["total_hits"], 1);
}

#[test]
fn test_publish_without_section_fails() {
    let (_tmp, config_path) = setup_test_env();
    let content = fs::read_to_string(&config_path).unwrap();
    let trimmed: String = content
        .split("[publish]")
        .next()
        .unwrap()
        .to_string();
    fs::write(&config_path, trimmed).unwrap();

    let (_, stderr, success) = run_aidx(&config_path, &["publish", "local"]);
    assert!(!success);
    assert!(stderr.contains("[publish]"));
}

#[test]
fn test_stats_reports_contexts() {
    let (_tmp, config_path) = setup_test_env();
    run_aidx(&config_path, &["scan", "local"]);

    let (stdout, stderr, success) = run_aidx(&config_path, &["stats"]);
    assert!(success, "stats failed: {}", stderr);
    assert!(stdout.contains("Artifacts:   3"), "{}", stdout);
    assert!(stdout.contains("local"));
    assert!(stdout.contains("mirror"));
}

#[test]
fn test_rebuild_groups() {
    let (_tmp, config_path) = setup_test_env();
    run_aidx(&config_path, &["scan", "local"]);

    let (stdout, _, success) = run_aidx(&config_path, &["rebuild-groups", "local"]);
    assert!(success);
    assert!(stdout.contains("2 root groups"), "{}", stdout);
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run_aidx(&tmp.path().join("nope.toml"), &["stats"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}
