use serde::Serialize;

use super::enrich::{StatusLookup, lookup_name};
use super::plan::{RouteGroup, RoutePlan};

/// Placeholder the template expects for checks nobody has filled in yet.
pub const UNCHECKED_MARK: &str = "NÃO";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenderHeader {
    #[serde(rename = "nome_agente")]
    pub agent_name: String,
    #[serde(rename = "matr_agente")]
    pub agent_id: String,
    #[serde(rename = "equipe")]
    pub team: String,
    #[serde(rename = "date_doc")]
    pub duty_date: String,
}

/// One template row. Serialized keys are the template's field suffixes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderRow {
    #[serde(rename = "idx")]
    pub position: String,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "ip")]
    pub inquiry: String,
    #[serde(rename = "mp")]
    pub warrant: String,
    #[serde(rename = "mlj")]
    pub legal_record: String,
    #[serde(rename = "cs")]
    pub sexual_offense: String,
    #[serde(rename = "bnmp")]
    pub lookup_status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderGroup {
    pub route: String,
    pub code: String,
    /// Template field whose table row is repeated for this group.
    pub merge_anchor: String,
    pub rows: Vec<RenderRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderDocument {
    pub header: RenderHeader,
    pub requested_routes: Vec<String>,
    pub groups: Vec<RenderGroup>,
}

/// Two-digit position used by the template, counting from 1.
pub fn position_label(position: usize) -> String {
    format!("{position:02}")
}

pub fn render_group(group: &RouteGroup<'_>, lookup: &dyn StatusLookup) -> RenderGroup {
    let rows = group
        .records
        .iter()
        .enumerate()
        .map(|(index, record)| RenderRow {
            position: position_label(index + 1),
            name: record.primary_name.clone(),
            inquiry: String::new(),
            warrant: UNCHECKED_MARK.to_string(),
            legal_record: UNCHECKED_MARK.to_string(),
            sexual_offense: UNCHECKED_MARK.to_string(),
            lookup_status: lookup.lookup(lookup_name(&record.primary_name), &record.secondary_name),
        })
        .collect();

    RenderGroup {
        route: group.route.to_string(),
        code: group.code.to_string(),
        merge_anchor: format!("{}_idx", group.code),
        rows,
    }
}

pub fn render_document(
    header: RenderHeader,
    requested_routes: Vec<String>,
    plan: &RoutePlan<'_>,
    lookup: &dyn StatusLookup,
) -> RenderDocument {
    RenderDocument {
        header,
        requested_routes,
        groups: plan
            .groups
            .iter()
            .map(|group| render_group(group, lookup))
            .collect(),
    }
}
