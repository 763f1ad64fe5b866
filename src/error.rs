//! Error types for document edits and HTML import.

/// Failure to apply a single edit step or a whole transaction.
///
/// A failed step leaves the document untouched; a transaction that contains
/// a failed step is never committed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EditError {
    /// Range does not cover whole pages, whole blocks of one page, or text of one textblock.
    InvalidRange { from: usize, to: usize },
    /// Position is not a valid insertion point for the node being inserted.
    InvalidPosition { pos: usize, expected: &'static str },
    /// The edit would leave the document without any page.
    EmptyDocument,
    /// Transaction was built against an older document version.
    StaleTransaction { expected: u64, actual: u64 },
}

impl core::fmt::Display for EditError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidRange { from, to } => {
                write!(f, "invalid delete range {}..{}", from, to)
            }
            Self::InvalidPosition { pos, expected } => {
                write!(f, "position {} is not {}", pos, expected)
            }
            Self::EmptyDocument => write!(f, "document must keep at least one page"),
            Self::StaleTransaction { expected, actual } => write!(
                f,
                "stale transaction (built on version {}, document is at {})",
                expected, actual
            ),
        }
    }
}

impl std::error::Error for EditError {}

/// HTML import error.
#[cfg(feature = "html")]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HtmlError {
    /// Markup could not be tokenized.
    Xml(String),
    /// Element nesting exceeded the parser limit.
    Nesting { depth: usize, limit: usize },
}

#[cfg(feature = "html")]
impl core::fmt::Display for HtmlError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Xml(msg) => write!(f, "html parse error: {}", msg),
            Self::Nesting { depth, limit } => write!(
                f,
                "element nesting exceeds limit ({} > {})",
                depth, limit
            ),
        }
    }
}

#[cfg(feature = "html")]
impl std::error::Error for HtmlError {}
