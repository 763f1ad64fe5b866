//! Document tree: pages, blocks and inline text runs.
//!
//! Every node occupies a contiguous range of the global position space:
//! a text run is as wide as its character count, a textblock or page adds one
//! unit for its opening and one for its closing boundary, and an atom block
//! (page break, image) is a single unit.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Inline formatting attached to a text run.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Mark {
    Bold,
    Italic,
    Underline,
    Strike,
    Code,
    /// Text color (CSS color value).
    Color(String),
    /// Background highlight, optionally colored.
    Highlight(Option<String>),
    /// Font family name.
    FontFamily(String),
}

impl Mark {
    fn same_kind(&self, other: &Mark) -> bool {
        core::mem::discriminant(self) == core::mem::discriminant(other)
    }
}

/// Ordered, de-duplicated set of marks.
///
/// At most one mark of each kind is kept: inserting `Color("red")` replaces
/// an existing `Color`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkSet(SmallVec<[Mark; 2]>);

impl MarkSet {
    /// Create an empty mark set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from arbitrary marks; later marks of the same kind win.
    pub fn from_marks<I>(marks: I) -> Self
    where
        I: IntoIterator<Item = Mark>,
    {
        let mut set = Self::new();
        for mark in marks {
            set.insert(mark);
        }
        set
    }

    /// Insert a mark, replacing any mark of the same kind.
    ///
    /// Returns `false` if the identical mark was already present.
    pub fn insert(&mut self, mark: Mark) -> bool {
        if self.0.contains(&mark) {
            return false;
        }
        self.0.retain(|existing| !existing.same_kind(&mark));
        let idx = self.0.partition_point(|existing| *existing < mark);
        self.0.insert(idx, mark);
        true
    }

    /// Remove a mark. Returns `true` if it was present.
    pub fn remove(&mut self, mark: &Mark) -> bool {
        let before = self.0.len();
        self.0.retain(|existing| existing != mark);
        before != self.0.len()
    }

    pub fn contains(&self, mark: &Mark) -> bool {
        self.0.contains(mark)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mark> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Mark> for MarkSet {
    fn from_iter<T: IntoIterator<Item = Mark>>(iter: T) -> Self {
        Self::from_marks(iter)
    }
}

/// A run of text sharing one mark set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    #[serde(default, skip_serializing_if = "MarkSet::is_empty")]
    pub marks: MarkSet,
}

impl TextRun {
    /// Plain text run without marks.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: MarkSet::new(),
        }
    }

    /// Text run carrying the given marks.
    pub fn with_marks(text: impl Into<String>, marks: MarkSet) -> Self {
        Self {
            text: text.into(),
            marks,
        }
    }

    /// Length in characters (the run's size in the position space).
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Horizontal alignment for paragraphs and headings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

impl TextAlign {
    pub fn as_css(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
            Self::Justify => "justify",
        }
    }

    pub fn from_css(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "left" | "start" => Some(Self::Left),
            "center" => Some(Self::Center),
            "right" | "end" => Some(Self::Right),
            "justify" => Some(Self::Justify),
            _ => None,
        }
    }
}

/// List flavour of a list item block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    #[default]
    Bullet,
    Ordered,
}

/// Structural content unit of a page.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Paragraph {
        #[serde(default)]
        align: TextAlign,
        #[serde(default)]
        runs: Vec<TextRun>,
    },
    Heading {
        level: u8,
        #[serde(default)]
        align: TextAlign,
        #[serde(default)]
        runs: Vec<TextRun>,
    },
    ListItem {
        #[serde(default)]
        list: ListKind,
        #[serde(default)]
        runs: Vec<TextRun>,
    },
    /// Explicit page-break marker; content after it starts on the next page.
    PageBreak,
    /// Non-splittable embedded image.
    Image {
        src: String,
        #[serde(default)]
        alt: String,
        /// Intrinsic rendered height, if known.
        #[serde(default)]
        height: Option<f32>,
    },
}

impl Block {
    /// Paragraph holding a single unmarked run.
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::paragraph_with_runs(vec![TextRun::new(text)])
    }

    /// Paragraph from explicit runs.
    pub fn paragraph_with_runs(runs: Vec<TextRun>) -> Self {
        Self::Paragraph {
            align: TextAlign::Left,
            runs: without_empty_runs(runs),
        }
    }

    /// Paragraph with no text, used to seed new pages.
    pub fn empty_paragraph() -> Self {
        Self::Paragraph {
            align: TextAlign::Left,
            runs: Vec::new(),
        }
    }

    /// Heading of `level` (clamped to 1..=6).
    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        Self::Heading {
            level: level.clamp(1, 6),
            align: TextAlign::Left,
            runs: without_empty_runs(vec![TextRun::new(text)]),
        }
    }

    pub fn list_item(list: ListKind, text: impl Into<String>) -> Self {
        Self::ListItem {
            list,
            runs: without_empty_runs(vec![TextRun::new(text)]),
        }
    }

    pub fn image(src: impl Into<String>, height: Option<f32>) -> Self {
        Self::Image {
            src: src.into(),
            alt: String::new(),
            height,
        }
    }

    pub fn page_break() -> Self {
        Self::PageBreak
    }

    /// Inline runs of a textblock; `None` for atoms.
    pub fn runs(&self) -> Option<&[TextRun]> {
        match self {
            Self::Paragraph { runs, .. }
            | Self::Heading { runs, .. }
            | Self::ListItem { runs, .. } => Some(runs),
            Self::PageBreak | Self::Image { .. } => None,
        }
    }

    pub fn runs_mut(&mut self) -> Option<&mut Vec<TextRun>> {
        match self {
            Self::Paragraph { runs, .. }
            | Self::Heading { runs, .. }
            | Self::ListItem { runs, .. } => Some(runs),
            Self::PageBreak | Self::Image { .. } => None,
        }
    }

    /// Whether the block holds inline text content.
    pub fn is_textblock(&self) -> bool {
        self.runs().is_some()
    }

    pub fn is_atom(&self) -> bool {
        !self.is_textblock()
    }

    pub fn is_paragraph(&self) -> bool {
        matches!(self, Self::Paragraph { .. })
    }

    pub fn is_page_break(&self) -> bool {
        matches!(self, Self::PageBreak)
    }

    /// Paragraph without any text.
    pub fn is_empty_paragraph(&self) -> bool {
        self.is_paragraph() && self.text_len() == 0
    }

    /// Text length in characters (0 for atoms).
    pub fn text_len(&self) -> usize {
        self.runs()
            .map(|runs| runs.iter().map(TextRun::len).sum())
            .unwrap_or(0)
    }

    /// Concatenated text of all runs.
    pub fn text(&self) -> String {
        let mut out = String::new();
        if let Some(runs) = self.runs() {
            for run in runs {
                out.push_str(&run.text);
            }
        }
        out
    }

    /// Size in the global position space.
    pub fn node_size(&self) -> usize {
        if self.is_textblock() {
            2 + self.text_len()
        } else {
            1
        }
    }

    /// Short kind label for logs and diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Paragraph { .. } => "paragraph",
            Self::Heading { .. } => "heading",
            Self::ListItem { .. } => "list_item",
            Self::PageBreak => "page_break",
            Self::Image { .. } => "image",
        }
    }

    /// Same block kind and attributes with different runs.
    fn with_runs(&self, new_runs: Vec<TextRun>) -> Option<Self> {
        match self {
            Self::Paragraph { align, .. } => Some(Self::Paragraph {
                align: *align,
                runs: new_runs,
            }),
            Self::Heading { level, align, .. } => Some(Self::Heading {
                level: *level,
                align: *align,
                runs: new_runs,
            }),
            Self::ListItem { list, .. } => Some(Self::ListItem {
                list: *list,
                runs: new_runs,
            }),
            Self::PageBreak | Self::Image { .. } => None,
        }
    }

    /// Cut a textblock at a character offset.
    ///
    /// Both halves keep the block's kind and attributes. Returns `None` for
    /// atoms or an offset past the end of the text.
    pub fn split_at(&self, offset: usize) -> Option<(Block, Block)> {
        let runs = self.runs()?;
        if offset > self.text_len() {
            return None;
        }
        let (before, after) = split_runs(runs, offset);
        Some((self.with_runs(before)?, self.with_runs(after)?))
    }

    /// Insert text at a character offset inside a textblock.
    pub fn insert_text(&mut self, offset: usize, text: &str, marks: &MarkSet) -> bool {
        let len = self.text_len();
        let Some(runs) = self.runs_mut() else {
            return false;
        };
        if offset > len {
            return false;
        }
        let (mut before, after) = split_runs(runs, offset);
        before.push(TextRun::with_marks(text, marks.clone()));
        before.extend(after);
        *runs = normalize_runs(before);
        true
    }

    /// Remove the characters in `from..to` of a textblock.
    pub fn delete_text(&mut self, from: usize, to: usize) -> bool {
        let len = self.text_len();
        let Some(runs) = self.runs_mut() else {
            return false;
        };
        if from > to || to > len {
            return false;
        }
        let (mut before, rest) = split_runs(runs, from);
        let (_, after) = split_runs(&rest, to - from);
        before.extend(after);
        *runs = normalize_runs(before);
        true
    }
}

/// Cut an inline run sequence at a character offset.
///
/// Runs entirely before the offset go left, runs entirely after go right,
/// and a run straddling the offset is divided into two runs that carry the
/// identical mark set. Empty runs are dropped; no other merging happens.
pub fn split_runs(runs: &[TextRun], offset: usize) -> (Vec<TextRun>, Vec<TextRun>) {
    let mut before = Vec::with_capacity(runs.len());
    let mut after = Vec::with_capacity(runs.len());
    let mut consumed = 0usize;

    for run in runs {
        let len = run.len();
        if consumed + len <= offset {
            before.push(run.clone());
        } else if consumed >= offset {
            after.push(run.clone());
        } else {
            let local = offset - consumed;
            let byte_idx = char_to_byte_idx(&run.text, local);
            let (head, tail) = run.text.split_at(byte_idx);
            before.push(TextRun::with_marks(head, run.marks.clone()));
            after.push(TextRun::with_marks(tail, run.marks.clone()));
        }
        consumed += len;
    }

    (without_empty_runs(before), without_empty_runs(after))
}

/// Drop empty runs and merge neighbours with identical marks.
pub fn normalize_runs(runs: Vec<TextRun>) -> Vec<TextRun> {
    let mut out: Vec<TextRun> = Vec::with_capacity(runs.len());
    for run in runs {
        if run.is_empty() {
            continue;
        }
        match out.last_mut() {
            Some(last) if last.marks == run.marks => last.text.push_str(&run.text),
            _ => out.push(run),
        }
    }
    out
}

fn without_empty_runs(mut runs: Vec<TextRun>) -> Vec<TextRun> {
    runs.retain(|run| !run.is_empty());
    runs
}

/// Byte index of the `char_idx`-th character (or `text.len()` past the end).
pub fn char_to_byte_idx(text: &str, char_idx: usize) -> usize {
    if char_idx == 0 {
        return 0;
    }
    text.char_indices()
        .nth(char_idx)
        .map(|(byte_idx, _)| byte_idx)
        .unwrap_or(text.len())
}

/// Fixed-capacity container of blocks simulating one sheet.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub blocks: Vec<Block>,
}

impl Page {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    /// New page seeded with one empty paragraph.
    pub fn seeded() -> Self {
        Self {
            blocks: vec![Block::empty_paragraph()],
        }
    }

    /// Size in the global position space.
    pub fn node_size(&self) -> usize {
        2 + self.content_size()
    }

    /// Sum of the sizes of this page's blocks.
    pub fn content_size(&self) -> usize {
        self.blocks.iter().map(Block::node_size).sum()
    }

    /// A page with no blocks, or with exactly one paragraph without text.
    pub fn is_effectively_empty(&self) -> bool {
        match self.blocks.as_slice() {
            [] => true,
            [only] => only.is_empty_paragraph(),
            _ => false,
        }
    }

    pub fn text(&self) -> String {
        self.blocks.iter().map(Block::text).collect()
    }
}

/// Root container: an ordered, never-empty sequence of pages.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "DocumentRepr")]
pub struct Document {
    pub pages: Vec<Page>,
}

/// Wire shape of [`Document`]; deserialization goes through [`Document::new`].
#[derive(Deserialize)]
struct DocumentRepr {
    #[serde(default)]
    pages: Vec<Page>,
}

impl From<DocumentRepr> for Document {
    fn from(value: DocumentRepr) -> Self {
        Self::new(value.pages)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self {
            pages: vec![Page::seeded()],
        }
    }
}

impl Document {
    /// Build a document from pages; an empty list yields one seeded page.
    pub fn new(pages: Vec<Page>) -> Self {
        if pages.is_empty() {
            return Self::default();
        }
        Self { pages }
    }

    /// Single-page document holding `blocks`.
    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        Self::new(vec![Page::new(blocks)])
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page(&self, page_index: usize) -> Option<&Page> {
        self.pages.get(page_index)
    }

    pub fn block(&self, page_index: usize, block_index: usize) -> Option<&Block> {
        self.pages.get(page_index)?.blocks.get(block_index)
    }

    /// Total size of all pages; valid positions are `0..=content_size()`.
    pub fn content_size(&self) -> usize {
        self.pages.iter().map(Page::node_size).sum()
    }

    /// All text, ignoring page and block boundaries.
    pub fn text_content(&self) -> String {
        self.pages.iter().map(Page::text).collect()
    }

    /// Number of blocks across all pages.
    pub fn block_count(&self) -> usize {
        self.pages.iter().map(|page| page.blocks.len()).sum()
    }
}
