use serde::Serialize;

use super::propagate::LabeledPage;
use super::scanner::RowKind;

/// A finished person entry. Position in [`Assembly::records`] is its
/// identity; later stages refer to records by that index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub page: usize,
    /// 1-based row within the source page.
    pub row: usize,
    pub primary_name: String,
    pub secondary_name: String,
    pub birth_date: String,
    pub occurrence: String,
    pub registered_on: String,
    pub unit_label: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AssemblyStats {
    pub rows_seen: usize,
    pub marker_rows: usize,
    pub header_rows: usize,
    pub unlabeled_rows: usize,
    pub incomplete_rows: usize,
    pub carried_rows: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assembly {
    pub records: Vec<Record>,
    pub stats: AssemblyStats,
}

/// Flattens labeled pages into records, keeping page order and row order.
///
/// Marker rows, header re-prints, rows left without a unit label and rows
/// missing any field are dropped. Only the primary name is trimmed.
pub fn assemble(pages: Vec<LabeledPage>) -> Assembly {
    let mut assembly = Assembly::default();

    for page in pages {
        assembly.stats.carried_rows += page.carried_rows;

        for labeled in page.rows {
            assembly.stats.rows_seen += 1;

            match labeled.kind {
                RowKind::GroupStart(_) | RowKind::GroupEnd => {
                    assembly.stats.marker_rows += 1;
                    continue;
                }
                RowKind::Header => {
                    assembly.stats.header_rows += 1;
                    continue;
                }
                RowKind::Data => {}
            }

            let Some(unit_label) = labeled.unit_label else {
                assembly.stats.unlabeled_rows += 1;
                continue;
            };

            let row = labeled.row;
            let (
                Some(primary_name),
                Some(secondary_name),
                Some(birth_date),
                Some(occurrence),
                Some(registered_on),
            ) = (
                row.primary_name,
                row.secondary_name,
                row.birth_date,
                row.occurrence,
                row.registered_on,
            )
            else {
                assembly.stats.incomplete_rows += 1;
                continue;
            };

            assembly.records.push(Record {
                page: labeled.page,
                row: labeled.index + 1,
                primary_name: primary_name.trim().to_string(),
                secondary_name,
                birth_date,
                occurrence,
                registered_on,
                unit_label,
            });
        }
    }

    assembly
}
