//! Rebuilds one ordered, labeled person list from independently extracted
//! pages, then sorts the people into precinct groups and delivery routes.
//!
//! Stages run in order: [`row::normalize_page`], [`scanner::scan_page`],
//! [`propagate::propagate_labels`], [`assemble::assemble`],
//! [`classify::Classifier::classify`], [`plan::plan_routes`] and finally
//! [`render::render_document`].

use tracing::debug;

pub mod assemble;
pub mod classify;
pub mod config;
pub mod enrich;
pub mod error;
pub mod plan;
pub mod propagate;
pub mod render;
pub mod row;
pub mod scanner;

pub use assemble::{Assembly, Record, assemble};
pub use classify::{Classification, Classifier};
pub use config::RosterConfig;
pub use enrich::{FileLookup, NoLookup, StatusLookup};
pub use error::RosterError;
pub use plan::{RoutePlan, RouteSelection, plan_routes};
pub use render::{RenderDocument, RenderHeader, render_document};
pub use row::{RawPage, normalize_page};
pub use scanner::MarkerPatterns;

use propagate::propagate_labels;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub page_count: usize,
    pub group_start_count: usize,
    pub group_end_count: usize,
    pub assembly: Assembly,
}

/// Turns the extractor's pages into the flat record list.
///
/// Every page is shape-checked before any labeling starts, so a malformed
/// page late in the document still aborts without partial output.
pub fn reconcile(
    raw_pages: Vec<RawPage>,
    config: &RosterConfig,
) -> Result<Reconciliation, RosterError> {
    let patterns = MarkerPatterns::compile(&config.markers)?;

    let pages = raw_pages
        .into_iter()
        .enumerate()
        .map(|(index, cells)| normalize_page(index + 1, cells))
        .collect::<Result<Vec<_>, _>>()?;
    let page_count = pages.len();

    let labeled = propagate_labels(pages, &patterns)?;
    let group_start_count = labeled.iter().map(|page| page.group_starts).sum();
    let group_end_count = labeled.iter().map(|page| page.group_ends).sum();
    let assembly = assemble(labeled);

    debug!(
        pages = page_count,
        records = assembly.records.len(),
        "reconciled pages"
    );

    Ok(Reconciliation {
        page_count,
        group_start_count,
        group_end_count,
        assembly,
    })
}
