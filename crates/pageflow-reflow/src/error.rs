use pageflow::EditError;

/// Failure of a single relocation or split decision.
///
/// None of these are fatal to a reflow pass: the paginator reports them as
/// diagnostics and moves on.
#[derive(Clone, Debug, PartialEq)]
pub enum ReflowError {
    /// The edit transaction was rejected.
    Edit(EditError),
    /// Page index does not exist in the current document.
    UnknownPage { index: usize },
    /// Block index does not exist on the page.
    UnknownBlock { page: usize, block: usize },
    /// Split offset would leave an empty fragment or the block is not a paragraph.
    InvalidSplit {
        page: usize,
        block: usize,
        offset: usize,
    },
}

impl core::fmt::Display for ReflowError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Edit(err) => write!(f, "reflow edit rejected: {}", err),
            Self::UnknownPage { index } => write!(f, "unknown page {}", index),
            Self::UnknownBlock { page, block } => {
                write!(f, "unknown block {} on page {}", block, page)
            }
            Self::InvalidSplit {
                page,
                block,
                offset,
            } => write!(
                f,
                "cannot split block {} on page {} at offset {}",
                block, page, offset
            ),
        }
    }
}

impl std::error::Error for ReflowError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Edit(err) => Some(err),
            _ => None,
        }
    }
}

impl From<EditError> for ReflowError {
    fn from(value: EditError) -> Self {
        Self::Edit(value)
    }
}
