use tracing::debug;

use super::error::RosterError;
use super::row::{Page, RawRow};
use super::scanner::{MarkerPatterns, PageScan, RowKind, scan_page};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledRow {
    pub page: usize,
    /// 0-based position within the page.
    pub index: usize,
    pub row: RawRow,
    pub kind: RowKind,
    pub unit_label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledPage {
    pub rows: Vec<LabeledRow>,
    /// Data rows that inherited the group left open by an earlier page.
    pub carried_rows: usize,
    pub group_starts: usize,
    pub group_ends: usize,
}

/// Labels every row of one page.
///
/// `carried` is the label of the last group-start seen on any earlier page.
/// Returns the labeled page and the label to carry into the next page.
pub fn label_page(
    page: Page,
    scan: PageScan,
    carried: Option<&str>,
) -> Result<(LabeledPage, Option<String>), RosterError> {
    let row_count = page.rows.len();
    let mut labels: Vec<Option<String>> = vec![None; row_count];
    let mut carried_rows = 0usize;

    let next_carry = if scan.group_starts.is_empty() {
        match carried {
            Some(label) => {
                labels.fill(Some(label.to_string()));
                carried_rows = count_data(&scan.kinds[..]);
            }
            None if scan.has_data_rows() => {
                return Err(RosterError::UnlabeledLeadingPage { page: page.number });
            }
            None => {}
        }
        carried.map(ToOwned::to_owned)
    } else {
        if let Some(boundary) = scan.carry_boundary() {
            match carried {
                Some(label) => {
                    for slot in &mut labels[..boundary] {
                        *slot = Some(label.to_string());
                    }
                    carried_rows = count_data(&scan.kinds[..boundary]);
                }
                None => debug!(
                    page = page.number,
                    boundary, "group-end marker precedes first group-start with nothing to carry"
                ),
            }
        }

        let ends = scan
            .group_starts
            .iter()
            .skip(1)
            .map(|start| start.index)
            .chain(std::iter::once(row_count));
        for (start, end) in scan.group_starts.iter().zip(ends) {
            for slot in &mut labels[start.index..end] {
                *slot = Some(start.label.clone());
            }
        }

        scan.group_starts.last().map(|start| start.label.clone())
    };

    debug!(
        page = page.number,
        rows = row_count,
        group_starts = scan.group_starts.len(),
        group_ends = scan.group_ends.len(),
        carried_rows,
        "labeled page"
    );

    let group_starts = scan.group_starts.len();
    let group_ends = scan.group_ends.len();
    let rows = page
        .rows
        .into_iter()
        .zip(scan.kinds)
        .zip(labels)
        .enumerate()
        .map(|(index, ((row, kind), unit_label))| LabeledRow {
            page: page.number,
            index,
            row,
            kind,
            unit_label,
        })
        .collect();

    Ok((
        LabeledPage {
            rows,
            carried_rows,
            group_starts,
            group_ends,
        },
        next_carry,
    ))
}

/// Scans and labels pages strictly in document order, threading the last
/// group label from each page into the next.
pub fn propagate_labels(
    pages: Vec<Page>,
    patterns: &MarkerPatterns,
) -> Result<Vec<LabeledPage>, RosterError> {
    let page_count = pages.len();
    let (labeled, _) = pages.into_iter().try_fold(
        (Vec::with_capacity(page_count), None::<String>),
        |(mut labeled, carried), page| {
            let scan = scan_page(&page, patterns)?;
            let (page, next_carry) = label_page(page, scan, carried.as_deref())?;
            labeled.push(page);
            Ok::<_, RosterError>((labeled, next_carry))
        },
    )?;

    Ok(labeled)
}

fn count_data(kinds: &[RowKind]) -> usize {
    kinds
        .iter()
        .filter(|kind| matches!(kind, RowKind::Data))
        .count()
}
