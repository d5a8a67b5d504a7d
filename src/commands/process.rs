use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{Local, Utc};
use tracing::{info, warn};

use crate::cli::ProcessArgs;
use crate::input::{LoadedPages, load_csv_pages, load_json_pages};
use crate::model::{RunCounts, RunManifest, RunPaths};
use crate::roster::{
    Classification, Classifier, FileLookup, NoLookup, Reconciliation, RenderDocument,
    RenderHeader, RosterConfig, RoutePlan, RouteSelection, StatusLookup, plan_routes, reconcile,
    render_document,
};
use crate::store::{DB_SCHEMA_VERSION, RunRow, count_rows, open_store, record_run};
use crate::util::{ensure_directory, now_utc_string, utc_compact_string, write_json_pretty};

pub fn run(args: ProcessArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));
    let today = Local::now().date_naive();

    let cache_root = args.cache_root.clone();
    let manifest_dir = cache_root.join("manifests");
    let manifest_path = args.manifest_path.clone().unwrap_or_else(|| {
        manifest_dir.join(format!(
            "process_run_{}.json",
            utc_compact_string(started_ts)
        ))
    });
    let output_path = args.output_path.clone().unwrap_or_else(|| {
        cache_root
            .join("output")
            .join(format!("roster_{}.json", today.format("%d.%m.%Y")))
    });
    let db_path = args
        .db_path
        .clone()
        .unwrap_or_else(|| cache_root.join("escort_roster.sqlite"));

    info!(cache_root = %cache_root.display(), run_id = %run_id, "starting process");

    let config = load_tables(args.tables.as_deref())?;
    let selection = RouteSelection::from_names(&config, &args.routes)?;
    let mut warnings = table_warnings(&config);

    let (source_path, loaded) = load_pages(&args)?;
    let LoadedPages {
        pages,
        source_sha256,
    } = loaded;

    let reconciliation = reconcile(pages, &config)
        .with_context(|| format!("failed to reconcile pages from {}", source_path.display()))?;
    let records = &reconciliation.assembly.records;
    info!(
        pages = reconciliation.page_count,
        records = records.len(),
        carried_rows = reconciliation.assembly.stats.carried_rows,
        "reconciled roster"
    );

    let classification = Classifier::new(&config).classify(records);
    warnings.extend(report_exclusions(&reconciliation, &classification));

    let plan = plan_routes(&config, records, &classification, &selection);
    if plan.filtered_out > 0 {
        info!(
            records = plan.filtered_out,
            routes = %selection.names().join(","),
            "records outside the requested routes left out"
        );
    }

    let lookup: Box<dyn StatusLookup> = match &args.lookup_path {
        Some(path) => Box::new(FileLookup::load(path)?),
        None => Box::new(NoLookup),
    };

    let header = RenderHeader {
        agent_name: args.agent_name.clone(),
        agent_id: args.agent_id.clone(),
        team: args.team.clone(),
        duty_date: args
            .duty_date
            .clone()
            .unwrap_or_else(|| today.format("%d/%m/%Y").to_string()),
    };
    let document = render_document(header, selection.names(), &plan, lookup.as_ref());

    if args.json {
        write_json_stdout(&document)?;
    }

    let mut counts = build_counts(&reconciliation, &classification, &plan);

    if args.dry_run {
        info!(
            groups = counts.planned_group_count,
            entries = counts.planned_entry_count,
            "process dry-run complete"
        );
        return Ok(());
    }

    write_json_pretty(&output_path, &document)?;
    info!(path = %output_path.display(), groups = document.groups.len(), "wrote render plan");

    ensure_directory(&cache_root)?;
    let mut connection = open_store(&db_path)?;
    let requested_routes = selection.names();
    counts.records_stored = record_run(
        &mut connection,
        &RunRow {
            run_id: &run_id,
            started_at: &started_at,
            source_sha256: &source_sha256,
            requested_routes: &requested_routes,
        },
        records,
        &classification,
    )?;
    let records_total = count_rows(&connection, "SELECT COUNT(*) FROM records")?;

    let manifest = RunManifest {
        manifest_version: 1,
        run_id: run_id.clone(),
        db_schema_version: DB_SCHEMA_VERSION.to_string(),
        status: "completed".to_string(),
        started_at,
        updated_at: now_utc_string(),
        command: render_process_command(&args),
        paths: RunPaths {
            cache_root: cache_root.display().to_string(),
            source_path: source_path.display().to_string(),
            tables_path: args.tables.as_ref().map(|path| path.display().to_string()),
            output_path: Some(output_path.display().to_string()),
            manifest_path: manifest_path.display().to_string(),
            db_path: Some(db_path.display().to_string()),
        },
        source_sha256,
        requested_routes,
        counts,
        unclassified_units: classification.unclassified_units.clone(),
        unrouted_codes: classification
            .unrouted_codes
            .iter()
            .map(|(code, count)| (code.to_string(), *count))
            .collect(),
        warnings,
        notes: vec![
            "Unit labels carry across page breaks until a group total marker closes them."
                .to_string(),
            "Records with unknown units or unrouted codes are excluded and counted above."
                .to_string(),
        ],
    };

    write_json_pretty(&manifest_path, &manifest)?;

    info!(path = %manifest_path.display(), "wrote process run manifest");
    info!(
        run_id = %run_id,
        records = manifest.counts.record_count,
        entries = manifest.counts.planned_entry_count,
        records_total,
        "process completed"
    );

    Ok(())
}

fn load_tables(path: Option<&Path>) -> Result<RosterConfig> {
    let Some(path) = path else {
        return Ok(RosterConfig::builtin()?);
    };

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let config = RosterConfig::from_toml_str(&raw)
        .with_context(|| format!("failed to load tables from {}", path.display()))?;
    info!(
        path = %path.display(),
        units = config.units.len(),
        routes = config.routes.len(),
        "loaded classification tables"
    );
    Ok(config)
}

fn load_pages(args: &ProcessArgs) -> Result<(PathBuf, LoadedPages)> {
    match (&args.pages, &args.pages_dir) {
        (Some(path), None) => Ok((path.clone(), load_json_pages(path)?)),
        (None, Some(dir)) => Ok((dir.clone(), load_csv_pages(dir)?)),
        _ => bail!("exactly one of --pages or --pages-dir is required"),
    }
}

fn table_warnings(config: &RosterConfig) -> Vec<String> {
    config
        .unrouted_codes()
        .into_iter()
        .map(|code| {
            warn!(code, "precinct code is not assigned to any route");
            format!("precinct code {code} is not assigned to any route")
        })
        .collect()
}

/// Logs every silent exclusion and returns them as manifest warnings.
fn report_exclusions(
    reconciliation: &Reconciliation,
    classification: &Classification,
) -> Vec<String> {
    let mut warnings = Vec::new();
    let stats = &reconciliation.assembly.stats;

    if stats.unlabeled_rows > 0 {
        warn!(
            rows = stats.unlabeled_rows,
            "rows before a page's first group-start had no open group and were dropped"
        );
        warnings.push(format!(
            "{} rows had no unit label and were dropped",
            stats.unlabeled_rows
        ));
    }
    if stats.incomplete_rows > 0 {
        warn!(rows = stats.incomplete_rows, "rows with missing fields were dropped");
        warnings.push(format!(
            "{} rows had missing fields and were dropped",
            stats.incomplete_rows
        ));
    }
    for (label, count) in &classification.unclassified_units {
        warn!(unit = %label, records = count, "unit label has no precinct code; records excluded");
        warnings.push(format!(
            "unit {label:?} has no precinct code; {count} records excluded"
        ));
    }
    for (code, count) in &classification.unrouted_codes {
        warn!(code = %code, records = count, "precinct code has no route; records excluded");
        warnings.push(format!(
            "precinct code {code} has no route; {count} records excluded"
        ));
    }

    warnings
}

fn build_counts(
    reconciliation: &Reconciliation,
    classification: &Classification,
    plan: &RoutePlan<'_>,
) -> RunCounts {
    let stats = &reconciliation.assembly.stats;
    RunCounts {
        page_count: reconciliation.page_count,
        rows_seen: stats.rows_seen,
        group_start_count: reconciliation.group_start_count,
        group_end_count: reconciliation.group_end_count,
        header_rows_dropped: stats.header_rows,
        marker_rows_dropped: stats.marker_rows,
        unlabeled_rows_dropped: stats.unlabeled_rows,
        incomplete_rows_dropped: stats.incomplete_rows,
        carried_rows: stats.carried_rows,
        record_count: reconciliation.assembly.records.len(),
        unclassified_unit_records: classification.unclassified_unit_count(),
        unrouted_code_records: classification.unrouted_count(),
        route_filtered_records: plan.filtered_out,
        planned_group_count: plan.groups.len(),
        planned_entry_count: plan.entry_count(),
        records_stored: 0,
    }
}

fn write_json_stdout(document: &RenderDocument) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());
    serde_json::to_writer_pretty(&mut output, document)
        .context("failed to serialize render plan")?;
    writeln!(output)?;
    output.flush()?;
    Ok(())
}

fn render_process_command(args: &ProcessArgs) -> String {
    let mut command = vec![
        "escort-roster".to_string(),
        "process".to_string(),
        "--cache-root".to_string(),
        args.cache_root.display().to_string(),
    ];

    if let Some(path) = &args.pages {
        command.push("--pages".to_string());
        command.push(path.display().to_string());
    }
    if let Some(path) = &args.pages_dir {
        command.push("--pages-dir".to_string());
        command.push(path.display().to_string());
    }
    if let Some(path) = &args.tables {
        command.push("--tables".to_string());
        command.push(path.display().to_string());
    }
    for route in &args.routes {
        command.push("--route".to_string());
        command.push(route.clone());
    }
    if let Some(path) = &args.lookup_path {
        command.push("--lookup-path".to_string());
        command.push(path.display().to_string());
    }
    if let Some(date) = &args.duty_date {
        command.push("--duty-date".to_string());
        command.push(date.clone());
    }
    if let Some(path) = &args.output_path {
        command.push("--output-path".to_string());
        command.push(path.display().to_string());
    }
    if let Some(path) = &args.manifest_path {
        command.push("--manifest-path".to_string());
        command.push(path.display().to_string());
    }
    if let Some(path) = &args.db_path {
        command.push("--db-path".to_string());
        command.push(path.display().to_string());
    }

    command.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(cache_root: &Path, pages: PathBuf) -> ProcessArgs {
        ProcessArgs {
            cache_root: cache_root.to_path_buf(),
            pages: Some(pages),
            pages_dir: None,
            tables: None,
            routes: Vec::new(),
            lookup_path: None,
            agent_name: "Agent".to_string(),
            agent_id: "590010".to_string(),
            team: "3".to_string(),
            duty_date: Some("17/10/2026".to_string()),
            output_path: None,
            manifest_path: None,
            db_path: None,
            json: false,
            dry_run: false,
        }
    }

    const PAGES: &str = r#"{"pages": [
        [
            ["Nome do Preso", "Nome da Mãe", "Data Nascimento", "Ocorrência", "Data Cadastro"],
            ["Delegacia : 5a DP", null, null, null, null],
            ["ANA", "MAE A", "01/01/1990", "ART 157", "02/02/2020"]
        ],
        [
            ["BRUNO", "MAE B", "01/01/1991", "ART 155", "02/02/2020"],
            ["Total de presos para escolta na Delegacia: 2", null, null, null, null],
            ["Delegacia : 3a DP", null, null, null, null],
            ["GHOST", "MAE G", "01/01/1992", "ART 33", "02/02/2020"],
            ["Delegacia : 1a DP", null, null, null, null],
            ["CARLA (CACA)", "MAE C", "01/01/1993", "ART 121", "02/02/2020"]
        ]
    ]}"#;

    #[test]
    fn process_writes_plan_manifest_and_store() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pages = dir.path().join("pages.json");
        fs::write(&pages, PAGES).expect("write");
        let mut process_args = args(dir.path(), pages);
        let output_path = dir.path().join("plan.json");
        let manifest_path = dir.path().join("manifest.json");
        process_args.output_path = Some(output_path.clone());
        process_args.manifest_path = Some(manifest_path.clone());
        process_args.routes = vec!["leste".to_string()];

        run(process_args).expect("process");

        let plan: serde_json::Value =
            serde_json::from_slice(&fs::read(&output_path).expect("plan")).expect("json");
        assert_eq!(plan["header"]["date_doc"], "17/10/2026");
        assert_eq!(plan["groups"].as_array().map(Vec::len), Some(1));
        assert_eq!(plan["groups"][0]["code"], "p05");
        assert_eq!(plan["groups"][0]["rows"][1]["nome"], "BRUNO");
        assert_eq!(plan["groups"][0]["rows"][1]["idx"], "02");

        let manifest: RunManifest =
            serde_json::from_slice(&fs::read(&manifest_path).expect("manifest")).expect("json");
        assert_eq!(manifest.counts.page_count, 2);
        assert_eq!(manifest.counts.record_count, 4);
        assert_eq!(manifest.counts.carried_rows, 1);
        assert_eq!(manifest.counts.unclassified_unit_records, 1);
        assert_eq!(manifest.counts.route_filtered_records, 1);
        assert_eq!(manifest.counts.planned_entry_count, 2);
        assert_eq!(manifest.counts.records_stored, 4);
        assert_eq!(manifest.unclassified_units.get("3a DP"), Some(&1));
        assert!(dir.path().join("escort_roster.sqlite").exists());
    }

    #[test]
    fn dry_run_writes_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pages = dir.path().join("pages.json");
        fs::write(&pages, PAGES).expect("write");
        let mut process_args = args(&dir.path().join("cache"), pages);
        process_args.dry_run = true;

        run(process_args).expect("dry run");

        assert!(!dir.path().join("cache").exists());
    }

    #[test]
    fn unknown_route_fails_before_reading_pages() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut process_args = args(dir.path(), dir.path().join("missing.json"));
        process_args.routes = vec!["norte".to_string()];

        let error = run(process_args).expect_err("unknown route");
        assert!(error.to_string().contains("norte"));
    }

    #[test]
    fn render_process_command_lists_routes_and_paths() {
        let mut process_args = args(Path::new(".cache/escort-roster"), PathBuf::from("p.json"));
        process_args.routes = vec!["leste".to_string(), "sul".to_string()];
        process_args.tables = Some(PathBuf::from("tables.toml"));

        let command = render_process_command(&process_args);

        assert!(command.starts_with("escort-roster process --cache-root .cache/escort-roster"));
        assert!(command.contains("--pages p.json"));
        assert!(command.contains("--tables tables.toml"));
        assert!(command.contains("--route leste --route sul"));
    }
}
