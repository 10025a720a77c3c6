//! Error taxonomy for an extraction run
//!
//! Fatal failures abort the run as [`ExtractionError`]. Non-fatal failures are
//! absorbed where they happen, leave a null field behind and are reported as
//! [`Issue`] values next to the table.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Taxonomy kind, for callers that branch on the class of failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    FieldParse,
    NavigationTimeout,
    NavigationFocus,
    Structural,
    Precondition,
    Cancelled,
    Browser,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::FieldParse => "FieldParseError",
            ErrorKind::NavigationTimeout => "NavigationTimeout",
            ErrorKind::NavigationFocus => "NavigationFocusError",
            ErrorKind::Structural => "StructuralError",
            ErrorKind::Precondition => "PreconditionError",
            ErrorKind::Cancelled => "Cancelled",
            ErrorKind::Browser => "BrowserError",
        };
        f.write_str(name)
    }
}

/// Browser backend failures
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("failed to start browser session: {0}")]
    Session(String),

    #[error("browser command failed: {0}")]
    Command(String),

    #[error("no such window: {0}")]
    NoSuchWindow(String),

    #[error("no window is focused")]
    NoFocusedWindow,

    #[error("invalid selector: {0}")]
    InvalidSelector(String),
}

/// Fatal extraction errors
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("could not return focus to the main window: {0}")]
    NavigationFocus(String),

    #[error("required page element missing: {0}")]
    Structural(String),

    #[error("invalid input: {0}")]
    Precondition(String),

    #[error("extraction cancelled")]
    Cancelled,

    #[error(transparent)]
    Browser(#[from] BrowserError),
}

impl ExtractionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractionError::NavigationFocus(_) => ErrorKind::NavigationFocus,
            ExtractionError::Structural(_) => ErrorKind::Structural,
            ExtractionError::Precondition(_) => ErrorKind::Precondition,
            ExtractionError::Cancelled => ErrorKind::Cancelled,
            ExtractionError::Browser(_) => ErrorKind::Browser,
        }
    }
}

/// Output field a parse failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Field {
    Name,
    Bib,
    SexAge,
    CarriedWeight,
    BodyWeight,
    BodyWeightChange,
    Handler,
    Odds,
    Popularity,
}

impl Field {
    /// Output column(s) the field fills
    pub fn column(&self) -> &'static str {
        match self {
            Field::Name => "馬",
            Field::Bib => "馬番",
            Field::SexAge => "性/齢",
            Field::CarriedWeight => "斤量",
            Field::BodyWeight => "体重",
            Field::BodyWeightChange => "体重変化",
            Field::Handler => "騎手",
            Field::Odds => "オッズ",
            Field::Popularity => "人気",
        }
    }
}

/// A cell whose text could not be turned into a typed value
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("cannot parse {} from {raw:?}: {reason}", .field.column())]
pub struct FieldParseError {
    pub field: Field,
    pub raw: String,
    pub reason: &'static str,
}

impl FieldParseError {
    pub fn new(field: Field, raw: &str, reason: &'static str) -> Self {
        Self {
            field,
            raw: raw.to_string(),
            reason,
        }
    }
}

/// Non-fatal problem recorded during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Issue {
    /// Field left null
    FieldParse { row: usize, error: FieldParseError },
    /// Handler detail page never showed a title; handler left null
    NavigationTimeout { row: usize, link: String },
    /// Detail title lacked the expected suffix; whole title used as the name
    TitleSuffixMissing { row: usize, title: String },
    /// Main window did not report a complete load state after focus returned
    LoadStateTimeout { row: usize },
}

impl Issue {
    pub fn row(&self) -> usize {
        match self {
            Issue::FieldParse { row, .. }
            | Issue::NavigationTimeout { row, .. }
            | Issue::TitleSuffixMissing { row, .. }
            | Issue::LoadStateTimeout { row } => *row,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Issue::FieldParse { .. } => ErrorKind::FieldParse,
            Issue::NavigationTimeout { .. } | Issue::LoadStateTimeout { .. } => {
                ErrorKind::NavigationTimeout
            }
            Issue::TitleSuffixMissing { .. } => ErrorKind::FieldParse,
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Issue::FieldParse { row, error } => write!(f, "row {}: {}", row, error),
            Issue::NavigationTimeout { row, link } => {
                write!(f, "row {}: handler page timed out ({})", row, link)
            }
            Issue::TitleSuffixMissing { row, title } => {
                write!(f, "row {}: unexpected handler page title {:?}", row, title)
            }
            Issue::LoadStateTimeout { row } => {
                write!(f, "row {}: main window did not finish loading", row)
            }
        }
    }
}
