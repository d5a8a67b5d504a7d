use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunPaths {
    pub cache_root: String,
    pub source_path: String,
    pub tables_path: Option<String>,
    pub output_path: Option<String>,
    pub manifest_path: String,
    pub db_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunCounts {
    pub page_count: usize,
    pub rows_seen: usize,
    pub group_start_count: usize,
    pub group_end_count: usize,
    pub header_rows_dropped: usize,
    pub marker_rows_dropped: usize,
    pub unlabeled_rows_dropped: usize,
    pub incomplete_rows_dropped: usize,
    pub carried_rows: usize,
    pub record_count: usize,
    pub unclassified_unit_records: usize,
    pub unrouted_code_records: usize,
    pub route_filtered_records: usize,
    pub planned_group_count: usize,
    pub planned_entry_count: usize,
    pub records_stored: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub db_schema_version: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub command: String,
    pub paths: RunPaths,
    pub source_sha256: String,
    pub requested_routes: Vec<String>,
    pub counts: RunCounts,
    pub unclassified_units: BTreeMap<String, usize>,
    pub unrouted_codes: BTreeMap<String, usize>,
    pub warnings: Vec<String>,
    pub notes: Vec<String>,
}
