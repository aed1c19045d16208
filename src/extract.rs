//! Content extraction from artifact files.
//!
//! Reads what the indexers need out of binaries and POMs: class names, Maven
//! plugin descriptors and OSGi manifest headers from zip-based archives, and
//! packaging/name/description from `pom.xml`. Extraction never panics;
//! failures come back as [`ExtractError`] and the scanner indexes the
//! artifact without content fields.

use std::collections::BTreeMap;
use std::io::Read;

use quick_xml::events::Event;

/// Maximum decompressed bytes read from a single archive entry (zip-bomb protection).
const MAX_ENTRY_BYTES: u64 = 16 * 1024 * 1024;
/// Class names collected per archive.
const MAX_CLASSNAMES: usize = 50_000;

pub const PLUGIN_DESCRIPTOR: &str = "META-INF/maven/plugin.xml";
pub const MANIFEST: &str = "META-INF/MANIFEST.MF";

/// Manifest headers copied onto OSGi artifacts.
pub const BUNDLE_HEADERS: &[&str] = &[
    "Bundle-SymbolicName",
    "Bundle-Version",
    "Export-Package",
    "Import-Package",
    "Require-Capability",
    "Provide-Capability",
];

#[derive(Debug)]
pub enum ExtractError {
    Archive(String),
    Xml(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::Archive(e) => write!(f, "archive read failed: {}", e),
            ExtractError::Xml(e) => write!(f, "XML parse failed: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Everything read from one archive.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct JarContent {
    /// `/`-prefixed, slash-separated, top-level classes only.
    pub classnames: Vec<String>,
    pub plugin_prefix: Option<String>,
    pub plugin_goals: Vec<String>,
    /// Bundle headers present in the manifest.
    pub bundle_headers: BTreeMap<String, String>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct PomInfo {
    pub packaging: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
}

pub fn read_jar(bytes: &[u8]) -> Result<JarContent, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Archive(e.to_string()))?;

    let mut content = JarContent::default();
    for name in archive.file_names() {
        if content.classnames.len() >= MAX_CLASSNAMES {
            break;
        }
        if let Some(class) = name.strip_suffix(".class") {
            if !class.contains('$') && !class.ends_with("module-info") {
                content.classnames.push(format!("/{}", class));
            }
        }
    }
    content.classnames.sort();

    if archive.file_names().any(|n| n == PLUGIN_DESCRIPTOR) {
        let xml = read_entry_bounded(&mut archive, PLUGIN_DESCRIPTOR)?;
        let (prefix, goals) = parse_plugin_descriptor(&xml)?;
        content.plugin_prefix = prefix;
        content.plugin_goals = goals;
    }

    if archive.file_names().any(|n| n == MANIFEST) {
        let raw = read_entry_bounded(&mut archive, MANIFEST)?;
        content.bundle_headers = parse_manifest(&String::from_utf8_lossy(&raw))
            .into_iter()
            .filter(|(k, _)| BUNDLE_HEADERS.contains(&k.as_str()))
            .collect();
    }
    Ok(content)
}

fn read_entry_bounded(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
    name: &str,
) -> Result<Vec<u8>, ExtractError> {
    let entry = archive
        .by_name(name)
        .map_err(|e| ExtractError::Archive(e.to_string()))?;
    let mut out = Vec::new();
    entry
        .take(MAX_ENTRY_BYTES)
        .read_to_end(&mut out)
        .map_err(|e| ExtractError::Archive(e.to_string()))?;
    if out.len() as u64 >= MAX_ENTRY_BYTES {
        return Err(ExtractError::Archive(format!(
            "entry {} exceeds size limit ({} bytes)",
            name, MAX_ENTRY_BYTES
        )));
    }
    Ok(out)
}

/// Walk an XML document and hand every text node to `visit` together with
/// the slash-joined path of local element names above it.
fn walk_text(xml: &[u8], mut visit: impl FnMut(&str, String)) -> Result<(), ExtractError> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut path: Vec<String> = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                path.push(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
            }
            Ok(Event::End(_)) => {
                path.pop();
            }
            Ok(Event::Text(te)) => {
                let text = te.unescape().unwrap_or_default().trim().to_string();
                if !text.is_empty() {
                    visit(&path.join("/"), text);
                }
            }
            Ok(Event::CData(cd)) => {
                let text = String::from_utf8_lossy(&cd.into_inner()).trim().to_string();
                if !text.is_empty() {
                    visit(&path.join("/"), text);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}

pub fn parse_plugin_descriptor(xml: &[u8]) -> Result<(Option<String>, Vec<String>), ExtractError> {
    let mut prefix = None;
    let mut goals = Vec::new();
    walk_text(xml, |path, text| match path {
        "plugin/goalPrefix" => prefix = Some(text),
        "plugin/mojos/mojo/goal" => goals.push(text),
        _ => {}
    })?;
    Ok((prefix, goals))
}

pub fn parse_pom(xml: &[u8]) -> Result<PomInfo, ExtractError> {
    let mut pom = PomInfo::default();
    walk_text(xml, |path, text| match path {
        "project/packaging" => pom.packaging = Some(text),
        "project/name" => pom.name = Some(text),
        "project/description" => {
            pom.description = Some(text.split_whitespace().collect::<Vec<_>>().join(" "))
        }
        _ => {}
    })?;
    Ok(pom)
}

/// Parse `Name: value` manifest headers, joining continuation lines.
pub fn parse_manifest(text: &str) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    let mut current: Option<(String, String)> = None;
    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        if let Some(cont) = line.strip_prefix(' ') {
            if let Some((_, value)) = current.as_mut() {
                value.push_str(cont);
            }
            continue;
        }
        if let Some((k, v)) = current.take() {
            headers.insert(k, v);
        }
        if line.is_empty() {
            // Only the main section is of interest.
            break;
        }
        if let Some((k, v)) = line.split_once(':') {
            current = Some((k.trim().to_string(), v.trim_start().to_string()));
        }
    }
    if let Some((k, v)) = current {
        headers.insert(k, v);
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn jar(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();
        for (name, data) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(data.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn classnames_skip_inner_classes() {
        let bytes = jar(&[
            ("com/acme/Parser.class", ""),
            ("com/acme/Parser$Node.class", ""),
            ("com/acme/readme.txt", "hi"),
        ]);
        let content = read_jar(&bytes).unwrap();
        assert_eq!(content.classnames, vec!["/com/acme/Parser"]);
        assert!(content.plugin_prefix.is_none());
    }

    #[test]
    fn plugin_descriptor() {
        let xml = r#"<plugin><goalPrefix>compiler</goalPrefix><mojos>
            <mojo><goal>compile</goal></mojo><mojo><goal>testCompile</goal></mojo>
        </mojos></plugin>"#;
        let bytes = jar(&[(PLUGIN_DESCRIPTOR, xml)]);
        let content = read_jar(&bytes).unwrap();
        assert_eq!(content.plugin_prefix.as_deref(), Some("compiler"));
        assert_eq!(content.plugin_goals, vec!["compile", "testCompile"]);
    }

    #[test]
    fn manifest_bundle_headers() {
        let mf = "Manifest-Version: 1.0\r\nBundle-SymbolicName: org.acme.core\r\nExport-Package: org.acme;ver\r\n sion=\"1.0\"\r\n\r\nName: other\r\nBundle-Version: 9\r\n";
        let bytes = jar(&[(MANIFEST, mf)]);
        let content = read_jar(&bytes).unwrap();
        assert_eq!(
            content.bundle_headers.get("Bundle-SymbolicName").map(String::as_str),
            Some("org.acme.core")
        );
        assert_eq!(
            content.bundle_headers.get("Export-Package").map(String::as_str),
            Some("org.acme;version=\"1.0\"")
        );
        assert!(!content.bundle_headers.contains_key("Bundle-Version"));
        assert!(!content.bundle_headers.contains_key("Manifest-Version"));
    }

    #[test]
    fn pom_top_level_fields_only() {
        let xml = br#"<?xml version="1.0"?>
            <project xmlns="http://maven.apache.org/POM/4.0.0">
              <packaging>maven-plugin</packaging>
              <name>Acme Plugin</name>
              <description>Does
                 things</description>
              <build><plugins><plugin><name>nested</name></plugin></plugins></build>
            </project>"#;
        let pom = parse_pom(xml).unwrap();
        assert_eq!(pom.packaging.as_deref(), Some("maven-plugin"));
        assert_eq!(pom.name.as_deref(), Some("Acme Plugin"));
        assert_eq!(pom.description.as_deref(), Some("Does things"));
    }

    #[test]
    fn invalid_zip_returns_error() {
        let err = read_jar(b"not a zip").unwrap_err();
        assert!(matches!(err, ExtractError::Archive(_)));
    }
}
