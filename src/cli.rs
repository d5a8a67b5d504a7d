use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "escort-roster",
    version,
    about = "Rebuilds the daily escort list from extracted pages and splits it into delivery routes"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Process(ProcessArgs),
    Tables(TablesArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ProcessArgs {
    #[arg(long, default_value = ".cache/escort-roster")]
    pub cache_root: PathBuf,

    /// JSON file holding the extracted pages.
    #[arg(long, required_unless_present = "pages_dir", conflicts_with = "pages_dir")]
    pub pages: Option<PathBuf>,

    /// Directory with one headerless CSV file per page.
    #[arg(long)]
    pub pages_dir: Option<PathBuf>,

    /// TOML file replacing the built-in unit and route tables.
    #[arg(long)]
    pub tables: Option<PathBuf>,

    /// Routes of the day; repeat or separate with commas. Defaults to all.
    #[arg(long = "route", value_delimiter = ',')]
    pub routes: Vec<String>,

    /// JSON object of pre-fetched lookup statuses keyed by name.
    #[arg(long)]
    pub lookup_path: Option<PathBuf>,

    #[arg(long, default_value = "")]
    pub agent_name: String,

    #[arg(long, default_value = "")]
    pub agent_id: String,

    #[arg(long, default_value = "")]
    pub team: String,

    /// Duty date printed in the header, dd/mm/YYYY. Defaults to today.
    #[arg(long)]
    pub duty_date: Option<String>,

    #[arg(long)]
    pub output_path: Option<PathBuf>,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub json: bool,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct TablesArgs {
    #[arg(long)]
    pub tables: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = ".cache/escort-roster")]
    pub cache_root: PathBuf,
}
