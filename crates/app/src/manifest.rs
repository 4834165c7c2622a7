use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::Path;

use translate_core::model::Manifest;
use translate_core::time::iso_timestamp;

use crate::error::AppError;

/// Manifest listing `file_names` under `prefix`, minus the done ones.
///
/// Only `.csv` names are kept (case-insensitive); order is sorted so
/// regenerating an unchanged directory gives an identical file.
pub fn build_manifest<I>(
    file_names: I,
    prefix: &str,
    done: &HashSet<String>,
    generated_at: DateTime<Utc>,
) -> Manifest
where
    I: IntoIterator<Item = String>,
{
    let mut files: Vec<String> = file_names
        .into_iter()
        .filter(|name| name.to_ascii_lowercase().ends_with(".csv"))
        .filter(|name| !done.contains(name))
        .map(|name| format!("{prefix}{name}"))
        .collect();
    files.sort();

    Manifest {
        last_updated: Some(iso_timestamp(generated_at)),
        files,
    }
}

/// File names in `dir`, non-recursive.
pub fn list_file_names(dir: &Path) -> Result<Vec<String>, AppError> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(AppError::io(dir))? {
        let entry = entry.map_err(AppError::io(dir))?;
        if entry.file_type().map_err(AppError::io(entry.path()))?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(names)
}

/// One name per line, blank lines dropped. A missing file means nothing is
/// done yet.
pub fn read_done_files(path: &Path) -> Result<HashSet<String>, AppError> {
    match std::fs::read_to_string(path) {
        Ok(raw) => Ok(parse_done_files(&raw)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(HashSet::new()),
        Err(err) => Err(AppError::io(path)(err)),
    }
}

fn parse_done_files(raw: &str) -> HashSet<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Prefix used in manifest entries for `dir`, always ending in `/`.
pub fn manifest_prefix(dir: &Path) -> String {
    let raw = dir.to_string_lossy().replace('\\', "/");
    if raw.ends_with('/') {
        raw
    } else {
        format!("{raw}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use translate_core::model::Catalog;
    use translate_core::time::fixed_now;

    #[test]
    fn keeps_unfinished_csv_files() {
        let done = parse_done_files("chat_002.csv\n\n  chat_004.csv \n");
        let manifest = build_manifest(
            [
                "chat_003.csv",
                "chat_002.csv",
                "notes.txt",
                "CHAT_001.CSV",
                "chat_004.csv",
            ]
            .map(String::from),
            "inputs/",
            &done,
            fixed_now(),
        );

        assert_eq!(manifest.files, ["inputs/CHAT_001.CSV", "inputs/chat_003.csv"]);
        assert_eq!(manifest.last_updated.as_deref(), Some("2023-11-14T22:13:20.000Z"));
    }

    #[test]
    fn generated_manifest_loads_as_catalog() {
        let manifest = build_manifest(
            ["a.csv".to_string(), "b.csv".to_string()],
            "inputs/",
            &HashSet::new(),
            fixed_now(),
        );
        let json = manifest.to_json_pretty().unwrap();
        let catalog = Catalog::from_manifest_json(&json).unwrap();
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn prefix_gets_trailing_slash() {
        assert_eq!(manifest_prefix(Path::new("inputs")), "inputs/");
        assert_eq!(manifest_prefix(Path::new("inputs/")), "inputs/");
    }

    #[test]
    fn missing_done_file_is_empty() {
        let done = read_done_files(Path::new("definitely/not/here/done_files.txt")).unwrap();
        assert!(done.is_empty());
    }
}
