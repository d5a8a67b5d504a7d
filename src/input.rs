use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use regex::Regex;
use serde::Deserialize;
use tracing::info;

use crate::roster::RawPage;
use crate::util::{sha256_file, sha256_files};

/// Extracted pages plus a digest of the files they came from.
#[derive(Debug, Clone)]
pub struct LoadedPages {
    pub pages: Vec<RawPage>,
    pub source_sha256: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PagesDocument {
    Wrapped { pages: Vec<RawPage> },
    Bare(Vec<RawPage>),
}

/// Reads `{"pages": [...]}` or a bare array of pages. Cells are strings or
/// `null`.
pub fn load_json_pages(path: &Path) -> Result<LoadedPages> {
    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let document: PagesDocument = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse pages from {}", path.display()))?;
    let pages = match document {
        PagesDocument::Wrapped { pages } | PagesDocument::Bare(pages) => pages,
    };

    info!(path = %path.display(), pages = pages.len(), "loaded json pages");

    Ok(LoadedPages {
        pages,
        source_sha256: sha256_file(path)?,
    })
}

/// Reads one headerless CSV per page from `dir`.
pub fn load_csv_pages(dir: &Path) -> Result<LoadedPages> {
    let paths = discover_page_files(dir)?;
    if paths.is_empty() {
        bail!("no CSV pages found in {}", dir.display());
    }

    let mut pages = Vec::with_capacity(paths.len());
    for path in &paths {
        pages.push(read_csv_page(path)?);
    }

    info!(dir = %dir.display(), pages = pages.len(), "loaded csv pages");

    Ok(LoadedPages {
        pages,
        source_sha256: sha256_files(&paths)?,
    })
}

fn read_csv_page(path: &Path) -> Result<RawPage> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("failed to read row in {}", path.display()))?;
        rows.push(
            record
                .iter()
                .map(|field| Some(field.to_string()))
                .collect::<Vec<Option<String>>>(),
        );
    }

    Ok(rows)
}

/// CSV files in `dir`, ordered by the first number in each file stem and
/// then by name, so `page-2.csv` precedes `page-10.csv`.
fn discover_page_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let number = Regex::new(r"(\d+)").context("failed to compile page number regex")?;

    let entries = fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;

    let mut pages = Vec::<(Option<u64>, String, PathBuf)>::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("failed to read entry in {}", dir.display()))?;
        let path = entry.path();

        if !entry
            .file_type()
            .with_context(|| format!("failed to inspect file type: {}", path.display()))?
            .is_file()
        {
            continue;
        }

        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if !is_csv {
            continue;
        }

        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(ToOwned::to_owned)
            .with_context(|| format!("invalid UTF-8 filename: {}", path.display()))?;
        let page_number = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(|stem| number.captures(stem))
            .and_then(|captures| captures.get(1))
            .and_then(|value| value.as_str().parse::<u64>().ok());

        pages.push((page_number, name, path));
    }

    pages.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    Ok(pages.into_iter().map(|(_, _, path)| path).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_pages_accept_wrapped_and_bare_forms() {
        let dir = tempfile::tempdir().expect("tempdir");
        let wrapped = dir.path().join("wrapped.json");
        let bare = dir.path().join("bare.json");
        fs::write(
            &wrapped,
            r#"{"pages": [[["Delegacia : 1a DP", null, null, null, null]]]}"#,
        )
        .expect("write");
        fs::write(&bare, r#"[[["ANA", "MAE", "01/01/1990", "ART", "02/02/2020"]], []]"#)
            .expect("write");

        let wrapped = load_json_pages(&wrapped).expect("wrapped");
        let bare = load_json_pages(&bare).expect("bare");

        assert_eq!(wrapped.pages.len(), 1);
        assert_eq!(wrapped.pages[0][0][0].as_deref(), Some("Delegacia : 1a DP"));
        assert_eq!(wrapped.pages[0][0][1], None);
        assert_eq!(bare.pages.len(), 2);
        assert_ne!(wrapped.source_sha256, bare.source_sha256);
    }

    #[test]
    fn csv_pages_are_ordered_by_page_number() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("page-10.csv"), "TEN,,,,\n").expect("write");
        fs::write(dir.path().join("page-2.csv"), "TWO,b,c,d,e\nshort,row\n").expect("write");
        fs::write(dir.path().join("notes.txt"), "ignored").expect("write");

        let loaded = load_csv_pages(dir.path()).expect("load");

        assert_eq!(loaded.pages.len(), 2);
        assert_eq!(loaded.pages[0][0][0].as_deref(), Some("TWO"));
        assert_eq!(loaded.pages[0][1].len(), 2);
        assert_eq!(loaded.pages[1][0][0].as_deref(), Some("TEN"));
        assert_eq!(loaded.pages[1][0].len(), 5);
    }

    #[test]
    fn csv_directory_without_pages_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");

        let error = load_csv_pages(dir.path()).expect_err("empty dir");
        assert!(error.to_string().contains("no CSV pages"));
    }
}
