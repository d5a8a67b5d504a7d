use serde::Serialize;

use super::error::RosterError;

/// Number of positional fields the extractor emits for every row.
pub const FIELD_COUNT: usize = 5;

/// One page as handed over by the table extractor: rows of optional cells.
pub type RawPage = Vec<Vec<Option<String>>>;

/// One extracted row, fields assigned positionally.
///
/// A field is `None` when the extractor produced no text for that cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawRow {
    pub primary_name: Option<String>,
    pub secondary_name: Option<String>,
    pub birth_date: Option<String>,
    pub occurrence: Option<String>,
    pub registered_on: Option<String>,
}

/// A page of rows in document order. `number` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub number: usize,
    pub rows: Vec<RawRow>,
}

/// Assigns the fixed field names to one page of raw cells.
///
/// Blank cells become `None`. Any row whose width differs from
/// [`FIELD_COUNT`] aborts the run.
pub fn normalize_page(number: usize, cells: RawPage) -> Result<Page, RosterError> {
    let mut rows = Vec::with_capacity(cells.len());

    for (index, row) in cells.into_iter().enumerate() {
        if row.len() != FIELD_COUNT {
            return Err(RosterError::MalformedRow {
                page: number,
                row: index + 1,
                expected: FIELD_COUNT,
                found: row.len(),
            });
        }

        let mut fields = row.into_iter().map(blank_to_none);
        rows.push(RawRow {
            primary_name: fields.next().flatten(),
            secondary_name: fields.next().flatten(),
            birth_date: fields.next().flatten(),
            occurrence: fields.next().flatten(),
            registered_on: fields.next().flatten(),
        });
    }

    Ok(Page { number, rows })
}

fn blank_to_none(cell: Option<String>) -> Option<String> {
    cell.filter(|value| !value.trim().is_empty())
}
