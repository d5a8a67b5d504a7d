use std::fs;
use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::TablesArgs;
use crate::roster::{MarkerPatterns, RosterConfig};

pub fn run(args: TablesArgs) -> Result<()> {
    let config = match &args.tables {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            RosterConfig::from_toml_str(&raw)
                .with_context(|| format!("invalid tables in {}", path.display()))?
        }
        None => RosterConfig::builtin()?,
    };
    MarkerPatterns::compile(&config.markers)?;

    let source = args
        .tables
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "built-in".to_string());

    for code in config.unrouted_codes() {
        warn!(code, "precinct code is not assigned to any route");
    }
    for route in &config.routes {
        info!(route = %route.name, codes = %route.codes.join(","), "route");
    }
    info!(
        source = %source,
        units = config.units.len(),
        labels = config.label_count(),
        routes = config.routes.len(),
        "classification tables valid"
    );

    if args.json {
        let mut output = io::BufWriter::new(io::stdout().lock());
        serde_json::to_writer_pretty(&mut output, &config)
            .context("failed to serialize tables json output")?;
        writeln!(output)?;
        output.flush()?;
    }

    Ok(())
}
