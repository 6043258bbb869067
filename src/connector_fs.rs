//! Filesystem discovery of match records.
//!
//! Walks `[source].root`, applies include/exclude globs relative to the
//! root, and keys every matching file by its match id (the file stem).

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::BTreeMap;
use std::path::PathBuf;
use walkdir::WalkDir;

use crate::config::SourceConfig;
use crate::parser::match_id_from_path;

/// Map of match id → record path, sorted by id.
pub type MatchFiles = BTreeMap<String, PathBuf>;

pub fn scan_matches(source: &SourceConfig) -> Result<MatchFiles> {
    let root = &source.root;
    if !root.exists() {
        bail!("Source root does not exist: {}", root.display());
    }

    let include_set = build_globset(&source.include_globs)?;

    let mut default_excludes = vec!["**/.git/**".to_string()];
    default_excludes.extend(source.exclude_globs.clone());
    let exclude_set = build_globset(&default_excludes)?;

    let mut files = MatchFiles::new();

    let walker = WalkDir::new(root).follow_links(source.follow_symlinks);
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().to_string();

        if exclude_set.is_match(&rel_str) {
            continue;
        }
        if !include_set.is_match(&rel_str) {
            continue;
        }

        let match_id = match_id_from_path(path);
        if match_id.is_empty() {
            continue;
        }
        if let Some(previous) = files.insert(match_id.clone(), path.to_path_buf()) {
            bail!(
                "Duplicate match id '{}': {} and {}",
                match_id,
                previous.display(),
                path.display()
            );
        }
    }

    Ok(files)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn source(root: &std::path::Path) -> SourceConfig {
        SourceConfig {
            root: root.to_path_buf(),
            include_globs: vec!["**/*.json".to_string()],
            exclude_globs: vec![],
            follow_symlinks: false,
        }
    }

    #[test]
    fn test_scan_keys_by_stem() {
        let tmp = tempfile::TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("tests")).unwrap();
        fs::write(tmp.path().join("1082591.json"), "{}").unwrap();
        fs::write(tmp.path().join("tests/64012.json"), "{}").unwrap();
        fs::write(tmp.path().join("README.txt"), "info").unwrap();

        let files = scan_matches(&source(tmp.path())).unwrap();
        let ids: Vec<&str> = files.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["1082591", "64012"]);
        assert!(files["64012"].ends_with("tests/64012.json"));
    }

    #[test]
    fn test_scan_applies_excludes() {
        let tmp = tempfile::TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("odis")).unwrap();
        fs::write(tmp.path().join("1.json"), "{}").unwrap();
        fs::write(tmp.path().join("odis/2.json"), "{}").unwrap();

        let mut config = source(tmp.path());
        config.exclude_globs = vec!["odis/**".to_string()];
        let files = scan_matches(&config).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files.contains_key("1"));
    }

    #[test]
    fn test_duplicate_stems_rejected() {
        let tmp = tempfile::TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("a")).unwrap();
        fs::create_dir_all(tmp.path().join("b")).unwrap();
        fs::write(tmp.path().join("a/7.json"), "{}").unwrap();
        fs::write(tmp.path().join("b/7.json"), "{}").unwrap();

        let err = scan_matches(&source(tmp.path())).unwrap_err();
        assert!(err.to_string().contains("Duplicate match id '7'"));
    }

    #[test]
    fn test_missing_root_is_error() {
        let err = scan_matches(&source(std::path::Path::new("/nope/matches"))).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
