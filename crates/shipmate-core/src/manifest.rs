//! Chart manifest updates
//!
//! Both edits only touch keys that already exist, and both replace the file
//! by writing a sibling temporary file and renaming it over the original so a
//! reader never sees a half written manifest.

use serde_yaml::{Mapping, Value};
use std::io::Write;
use std::path::Path;

use crate::error::{CoreError, Result};

/// Chart metadata file name
pub const CHART_FILE: &str = "Chart.yaml";

/// Chart values file name
pub const VALUES_FILE: &str = "values.yaml";

/// Set `appVersion` to the release tag and `version` to the chart version
///
/// Returns the keys that were changed.
pub fn update_chart_metadata(path: &Path, app_version: &str, version: &str) -> Result<Vec<String>> {
    let mut doc = load_mapping(path)?;
    let mut changed = Vec::new();

    if set_existing(&mut doc, "appVersion", app_version) {
        changed.push("appVersion".to_string());
    }
    if set_existing(&mut doc, "version", version) {
        changed.push("version".to_string());
    }

    write_atomic(path, &serde_yaml::to_string(&doc)?)?;
    Ok(changed)
}

/// Point component image tags and the default transformer tag at `tag`
///
/// Returns the dotted keys that were changed.
pub fn update_values(path: &Path, tag: &str, components: &[String]) -> Result<Vec<String>> {
    let mut doc = load_mapping(path)?;
    let mut changed = Vec::new();

    for component in components {
        if let Some(Value::Mapping(section)) = doc.get_mut(component.as_str())
            && set_existing(section, "tag", tag)
        {
            changed.push(format!("{}.tag", component));
        }
    }

    if let Some(Value::Mapping(transformer)) = doc.get_mut("transformer")
        && set_existing(transformer, "defaultTransformerTag", tag)
    {
        changed.push("transformer.defaultTransformerTag".to_string());
    }

    write_atomic(path, &serde_yaml::to_string(&doc)?)?;
    Ok(changed)
}

fn load_mapping(path: &Path) -> Result<Mapping> {
    if !path.is_file() {
        return Err(CoreError::ManifestNotFound {
            path: path.display().to_string(),
        });
    }
    let content = std::fs::read_to_string(path)?;
    match serde_yaml::from_str(&content)? {
        Value::Mapping(map) => Ok(map),
        _ => Err(CoreError::InvalidManifest {
            path: path.display().to_string(),
        }),
    }
}

fn set_existing(map: &mut Mapping, key: &str, value: &str) -> bool {
    match map.get_mut(key) {
        Some(slot) => {
            *slot = Value::String(value.to_string());
            true
        }
        None => false,
    }
}

/// Replace `path` with `content` via a temporary file in the same directory
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    tracing::debug!(path = %path.display(), "replaced manifest");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CHART: &str = "apiVersion: v2\nname: servicex\nversion: 1.0.0\nappVersion: develop\ndescription: ServiceX\n";

    const VALUES: &str = r#"
app:
  image: sslhep/servicex_app
  tag: develop
didFinder:
  rucio:
    enabled: true
  tag: develop
codeGen:
  enabled: true
x509Secrets:
  tag: develop
transformer:
  defaultTransformerTag: develop
  pullPolicy: Always
postgres:
  tag: "14"
"#;

    fn components() -> Vec<String> {
        ["app", "didFinder", "CERNOpenData", "codeGen", "x509Secrets"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn read(path: &Path) -> Value {
        serde_yaml::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_update_chart_metadata() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CHART_FILE);
        std::fs::write(&path, CHART).unwrap();

        let changed = update_chart_metadata(&path, "1.2.0-rc1", "1.2.0").unwrap();
        assert_eq!(changed, vec!["appVersion", "version"]);

        let doc = read(&path);
        assert_eq!(doc["appVersion"].as_str(), Some("1.2.0-rc1"));
        assert_eq!(doc["version"].as_str(), Some("1.2.0"));
        assert_eq!(doc["name"].as_str(), Some("servicex"));
    }

    #[test]
    fn test_chart_metadata_only_touches_existing_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CHART_FILE);
        std::fs::write(&path, "name: servicex\nversion: 0.1.0\n").unwrap();

        let changed = update_chart_metadata(&path, "tag", "0.2.0").unwrap();
        assert_eq!(changed, vec!["version"]);
        assert!(read(&path).get("appVersion").is_none());
    }

    #[test]
    fn test_update_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(VALUES_FILE);
        std::fs::write(&path, VALUES).unwrap();

        let changed = update_values(&path, "20220216-0918-develop1", &components()).unwrap();
        assert_eq!(
            changed,
            vec![
                "app.tag",
                "didFinder.tag",
                "x509Secrets.tag",
                "transformer.defaultTransformerTag"
            ]
        );

        let doc = read(&path);
        assert_eq!(doc["app"]["tag"].as_str(), Some("20220216-0918-develop1"));
        assert_eq!(doc["didFinder"]["tag"].as_str(), Some("20220216-0918-develop1"));
        assert_eq!(
            doc["transformer"]["defaultTransformerTag"].as_str(),
            Some("20220216-0918-develop1")
        );
        // untouched sections
        assert!(doc["codeGen"].get("tag").is_none());
        assert_eq!(doc["postgres"]["tag"].as_str(), Some("14"));
        assert_eq!(doc["transformer"]["pullPolicy"].as_str(), Some("Always"));
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(VALUES_FILE);
        std::fs::write(&path, VALUES).unwrap();
        update_values(&path, "t", &components()).unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_missing_manifest() {
        let dir = TempDir::new().unwrap();
        let err = update_values(&dir.path().join(VALUES_FILE), "t", &components()).unwrap_err();
        assert!(matches!(err, CoreError::ManifestNotFound { .. }));
    }

    #[test]
    fn test_non_mapping_manifest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CHART_FILE);
        std::fs::write(&path, "- a\n- b\n").unwrap();
        let err = update_chart_metadata(&path, "t", "1.0.0").unwrap_err();
        assert!(matches!(err, CoreError::InvalidManifest { .. }));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "- a\n- b\n");
    }
}
