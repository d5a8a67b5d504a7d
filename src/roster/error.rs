use thiserror::Error;

/// Fatal conditions raised while rebuilding and classifying the roster.
///
/// Page and row numbers are 1-based so messages line up with the source
/// document.
#[derive(Debug, Error)]
pub enum RosterError {
    #[error("page {page}, row {row}: expected {expected} fields, found {found}")]
    MalformedRow {
        page: usize,
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error(
        "page {page} has data rows but no group-start marker, and no earlier group is open to carry over"
    )]
    UnlabeledLeadingPage { page: usize },

    #[error("page {page}, row {row}: group-start marker has no label after separator {separator:?}")]
    MissingGroupLabel {
        page: usize,
        row: usize,
        separator: String,
    },

    #[error("invalid classification tables: {0}")]
    Tables(String),

    #[error("requested route {route:?} is not defined (known routes: {known})")]
    UnknownRoute { route: String, known: String },
}
