pub mod csv;
#[cfg(feature = "excel")]
pub mod excel;
#[cfg(feature = "pdf")]
pub mod pdf;

use std::path::Path;

use thiserror::Error;

use crate::models::RawRow;
use crate::store::INSTITUTION;

/// Document-level parse outcome. Row-level problems never surface here;
/// they ride along in `ParseOutput::row_failures`.
#[derive(Error, Debug)]
pub enum ParseFailure {
    /// The decoder for this format is not compiled in. Non-fatal to the
    /// batch: the document gets one failed parse event.
    #[error("missing capability: {0}")]
    MissingCapability(String),

    /// The decoder rejected the document as a whole.
    #[error("corrupt document: {0}")]
    Corrupt(String),

    /// The file could not be read. Fatal to this document only.
    #[error("unreadable input: {0}")]
    Unreadable(#[from] std::io::Error),
}

/// What a parser hands back: loosely-typed rows plus the scan-time failures
/// that did not stop the scan (batch isolation).
#[derive(Debug, Default)]
pub struct ParseOutput {
    pub rows: Vec<RawRow>,
    pub row_failures: Vec<String>,
}

// ---------------------------------------------------------------------------
// Format registry — enum dispatch keyed by file extension
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Csv,
    Xls,
    Xlsx,
    Pdf,
}

pub const ALL_FORMATS: &[SourceKind] = &[
    SourceKind::Csv,
    SourceKind::Xls,
    SourceKind::Xlsx,
    SourceKind::Pdf,
];

impl SourceKind {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xls => "xls",
            Self::Xlsx => "xlsx",
            Self::Pdf => "pdf",
        }
    }

    /// Dispatch purely by extension, case-insensitive. Extensions outside
    /// the registry resolve to None; the batch driver skips those files.
    pub fn for_path(path: &Path) -> Option<SourceKind> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        ALL_FORMATS.iter().find(|k| k.key() == ext).copied()
    }

    /// CSV and workbook exports always come from the bank; PDFs can be any
    /// scanned statement, so they carry no hint.
    pub fn institution_hint(&self) -> Option<&'static str> {
        match self {
            Self::Pdf => None,
            _ => Some(INSTITUTION),
        }
    }

    /// Capability probe: whether the decoder for this format was compiled
    /// in. Checked once per document before any file I/O.
    pub fn available(&self) -> bool {
        match self {
            Self::Csv => true,
            Self::Xls | Self::Xlsx => cfg!(feature = "excel"),
            Self::Pdf => cfg!(feature = "pdf"),
        }
    }

    pub fn parse(&self, path: &Path) -> Result<ParseOutput, ParseFailure> {
        match self {
            Self::Csv => csv::parse(path),
            #[cfg(feature = "excel")]
            Self::Xls | Self::Xlsx => excel::parse(path),
            #[cfg(feature = "pdf")]
            Self::Pdf => pdf::parse(path),
            #[allow(unreachable_patterns)]
            other => Err(ParseFailure::MissingCapability(format!(
                "no decoder compiled in for {} documents",
                other.key()
            ))),
        }
    }
}
