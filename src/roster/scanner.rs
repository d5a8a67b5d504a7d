use regex::Regex;

use super::config::MarkerConfig;
use super::error::RosterError;
use super::row::Page;

/// Structural role of a row. The scanner is the only place that matches
/// marker text; later stages branch on this tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowKind {
    Data,
    /// Column headers re-printed by the extractor at the top of a page.
    Header,
    GroupStart(String),
    GroupEnd,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupStart {
    pub index: usize,
    pub label: String,
}

/// Boundary positions found on one page, indices in row order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageScan {
    pub kinds: Vec<RowKind>,
    pub group_starts: Vec<GroupStart>,
    pub group_ends: Vec<usize>,
}

impl PageScan {
    pub fn has_data_rows(&self) -> bool {
        self.kinds.iter().any(|kind| matches!(kind, RowKind::Data))
    }

    /// The group-end marker that closes a group carried in from the previous
    /// page: the last one strictly before the first group-start.
    pub fn carry_boundary(&self) -> Option<usize> {
        let first_start = self.group_starts.first()?.index;
        self.group_ends
            .iter()
            .copied()
            .filter(|index| *index < first_start)
            .max()
    }
}

#[derive(Debug, Clone)]
pub struct MarkerPatterns {
    group_start: Regex,
    group_end: Regex,
    label_separator: String,
    header_text: String,
}

impl MarkerPatterns {
    pub fn compile(config: &MarkerConfig) -> Result<Self, RosterError> {
        let group_start = Regex::new(&config.group_start_pattern).map_err(|error| {
            RosterError::Tables(format!("group_start_pattern does not compile: {error}"))
        })?;
        let group_end = Regex::new(&config.group_end_pattern).map_err(|error| {
            RosterError::Tables(format!("group_end_pattern does not compile: {error}"))
        })?;
        if config.label_separator.is_empty() {
            return Err(RosterError::Tables(
                "label_separator must not be empty".to_string(),
            ));
        }

        Ok(Self {
            group_start,
            group_end,
            label_separator: config.label_separator.clone(),
            header_text: config.header_text.clone(),
        })
    }

    pub fn classify(&self, primary: Option<&str>) -> RowKind {
        let Some(text) = primary else {
            return RowKind::Data;
        };

        if self.group_start.is_match(text) {
            let label = text
                .split(self.label_separator.as_str())
                .nth(1)
                .map(str::trim)
                .unwrap_or_default();
            return RowKind::GroupStart(label.to_string());
        }
        if self.group_end.is_match(text) {
            return RowKind::GroupEnd;
        }
        if text == self.header_text {
            return RowKind::Header;
        }

        RowKind::Data
    }
}

/// Single pass over a page, tagging every row and collecting the group
/// boundaries.
pub fn scan_page(page: &Page, patterns: &MarkerPatterns) -> Result<PageScan, RosterError> {
    let mut scan = PageScan {
        kinds: Vec::with_capacity(page.rows.len()),
        ..PageScan::default()
    };

    for (index, row) in page.rows.iter().enumerate() {
        let kind = patterns.classify(row.primary_name.as_deref());
        match &kind {
            RowKind::GroupStart(label) if label.is_empty() => {
                return Err(RosterError::MissingGroupLabel {
                    page: page.number,
                    row: index + 1,
                    separator: patterns.label_separator.clone(),
                });
            }
            RowKind::GroupStart(label) => scan.group_starts.push(GroupStart {
                index,
                label: label.clone(),
            }),
            RowKind::GroupEnd => scan.group_ends.push(index),
            RowKind::Data | RowKind::Header => {}
        }
        scan.kinds.push(kind);
    }

    Ok(scan)
}
