use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::model::RunManifest;
use crate::store::count_rows;

pub fn run(args: StatusArgs) -> Result<()> {
    let manifest_dir = args.cache_root.join("manifests");
    let db_path = args.cache_root.join("escort_roster.sqlite");

    info!(cache_root = %args.cache_root.display(), "status requested");

    match latest_run_manifest(&manifest_dir)? {
        Some(path) => {
            let raw =
                fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
            let manifest: RunManifest = serde_json::from_slice(&raw)
                .with_context(|| format!("failed to parse {}", path.display()))?;

            info!(
                path = %path.display(),
                run_id = %manifest.run_id,
                status = %manifest.status,
                updated_at = %manifest.updated_at,
                routes = %manifest.requested_routes.join(","),
                pages = manifest.counts.page_count,
                records = manifest.counts.record_count,
                entries = manifest.counts.planned_entry_count,
                unclassified = manifest.counts.unclassified_unit_records,
                warnings = manifest.warnings.len(),
                "loaded latest run manifest"
            );
        }
        None => warn!(path = %manifest_dir.display(), "no process run manifest found"),
    }

    if db_path.exists() {
        let conn = Connection::open(&db_path)
            .with_context(|| format!("failed to open {}", db_path.display()))?;
        let runs = count_rows(&conn, "SELECT COUNT(*) FROM runs").unwrap_or(0);
        let records = count_rows(&conn, "SELECT COUNT(*) FROM records").unwrap_or(0);
        let classified = count_rows(&conn, "SELECT COUNT(*) FROM classifications").unwrap_or(0);

        info!(
            path = %db_path.display(),
            runs,
            records,
            classified,
            "database status"
        );
    } else {
        warn!(path = %db_path.display(), "database file missing");
    }

    Ok(())
}

/// Newest `process_run_*.json`; the compact UTC timestamp in the name sorts
/// chronologically.
fn latest_run_manifest(manifest_dir: &Path) -> Result<Option<PathBuf>> {
    if !manifest_dir.exists() {
        return Ok(None);
    }

    let entries = fs::read_dir(manifest_dir)
        .with_context(|| format!("failed to read {}", manifest_dir.display()))?;

    let mut latest: Option<PathBuf> = None;
    for entry in entries {
        let entry = entry
            .with_context(|| format!("failed to read entry in {}", manifest_dir.display()))?;
        let path = entry.path();
        let is_run_manifest = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.starts_with("process_run_") && name.ends_with(".json"))
            .unwrap_or(false);
        if !is_run_manifest {
            continue;
        }
        if latest.as_ref().map(|current| path > *current).unwrap_or(true) {
            latest = Some(path);
        }
    }

    Ok(latest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_run_manifest_picks_newest_timestamp() {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in [
            "process_run_20261016T080000Z.json",
            "process_run_20261017T070000Z.json",
            "other.json",
        ] {
            fs::write(dir.path().join(name), "{}").expect("write");
        }

        let latest = latest_run_manifest(dir.path()).expect("scan");

        assert_eq!(
            latest.and_then(|path| path.file_name().map(|name| name.to_string_lossy().into_owned())),
            Some("process_run_20261017T070000Z.json".to_string())
        );
    }

    #[test]
    fn status_tolerates_an_empty_cache() {
        let dir = tempfile::tempdir().expect("tempdir");

        run(StatusArgs {
            cache_root: dir.path().to_path_buf(),
        })
        .expect("status");
    }
}
