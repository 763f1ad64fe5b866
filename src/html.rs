//! HTML import and export.
//!
//! Pages map to `<div data-page>` elements, page breaks to
//! `<div data-page-break>` (or `<hr>`). Block content outside any page
//! element is collected into an implicit page. Whitespace inside text is
//! collapsed the way a browser renders it: runs of whitespace become one
//! space, and leading and trailing spaces of a block are dropped.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::HtmlError;
use crate::model::{Block, Document, ListKind, Mark, MarkSet, Page, TextAlign, TextRun};

/// Maximum element nesting accepted by [`parse_html`].
pub const MAX_NESTING: usize = 64;

struct ElementCtx {
    tag: String,
    marks: MarkSet,
    list: Option<ListKind>,
    is_page: bool,
}

#[derive(Default)]
struct ElementAttrs {
    classes: Vec<String>,
    style: Vec<(String, String)>,
    data_page: bool,
    data_page_break: bool,
    data_color: Option<String>,
    src: Option<String>,
    alt: Option<String>,
    height: Option<f32>,
}

impl ElementAttrs {
    fn style_value(&self, key: &str) -> Option<&str> {
        self.style
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn align(&self) -> TextAlign {
        self.style_value("text-align")
            .and_then(TextAlign::from_css)
            .unwrap_or_default()
    }

    fn is_page(&self) -> bool {
        self.data_page
            || self
                .classes
                .iter()
                .any(|class| class == "a4-page" || class == "page")
    }
}

struct OpenBlock {
    block: Block,
    /// Closes once the element stack shrinks below this depth.
    depth: usize,
}

#[derive(Default)]
struct DocBuilder {
    pages: Vec<Page>,
    blocks: Vec<Block>,
    open: Option<OpenBlock>,
}

impl DocBuilder {
    fn close_block(&mut self) {
        if let Some(open) = self.open.take() {
            let mut block = open.block;
            if let Some(runs) = block.runs_mut() {
                trim_trailing_space(runs);
            }
            self.blocks.push(block);
        }
    }

    fn close_if_shallower(&mut self, depth: usize) {
        if self.open.as_ref().is_some_and(|open| depth < open.depth) {
            self.close_block();
        }
    }

    fn push_block(&mut self, block: Block) {
        self.close_block();
        self.blocks.push(block);
    }

    fn open_textblock(&mut self, block: Block, depth: usize) {
        self.close_block();
        self.open = Some(OpenBlock { block, depth });
    }

    fn start_page(&mut self) {
        self.close_block();
        if !self.blocks.is_empty() {
            let blocks = core::mem::take(&mut self.blocks);
            self.pages.push(Page::new(blocks));
        }
    }

    fn end_page(&mut self) {
        self.close_block();
        let blocks = core::mem::take(&mut self.blocks);
        self.pages.push(Page::new(blocks));
    }

    fn push_text(&mut self, text: &str, marks: &MarkSet, depth: usize) {
        let at_soft_start = match &self.open {
            Some(open) => ends_soft(&open.block),
            None => true,
        };
        let collapsed = collapse_whitespace(text, at_soft_start);
        if collapsed.is_empty() {
            return;
        }
        let open = self.open.get_or_insert_with(|| OpenBlock {
            block: Block::empty_paragraph(),
            depth,
        });
        let len = open.block.text_len();
        open.block.insert_text(len, &collapsed, marks);
    }

    fn finish(mut self) -> Document {
        self.close_block();
        if !self.blocks.is_empty() {
            let blocks = core::mem::take(&mut self.blocks);
            self.pages.push(Page::new(blocks));
        }
        Document::new(self.pages)
    }
}

/// Parse an HTML fragment into a [`Document`].
pub fn parse_html(html: &str) -> Result<Document, HtmlError> {
    let mut reader = Reader::from_reader(html.as_bytes());
    reader.config_mut().trim_text(false);
    reader.config_mut().check_end_names = false;

    let mut buf = Vec::with_capacity(64);
    let mut stack: Vec<ElementCtx> = Vec::with_capacity(8);
    let mut builder = DocBuilder::default();
    let mut skip_depth = 0usize;
    let mut entity_buf = String::with_capacity(16);
    let empty_marks = MarkSet::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let tag = decode_tag_name(&reader, e.name().as_ref())?;
                if should_skip_tag(&tag) {
                    skip_depth += 1;
                } else if skip_depth == 0 {
                    let attrs = read_attrs(&reader, &e);
                    if let Some(ctx) = open_element(&mut builder, &stack, tag, &attrs) {
                        if stack.len() >= MAX_NESTING {
                            return Err(HtmlError::Nesting {
                                depth: stack.len() + 1,
                                limit: MAX_NESTING,
                            });
                        }
                        stack.push(ctx);
                        if let Some(block) = textblock_for(&stack, &attrs) {
                            builder.open_textblock(block, stack.len());
                        }
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                let tag = decode_tag_name(&reader, e.name().as_ref())?;
                if skip_depth == 0 && !should_skip_tag(&tag) {
                    let attrs = read_attrs(&reader, &e);
                    if let Some(ctx) = open_element(&mut builder, &stack, tag, &attrs) {
                        let is_page = ctx.is_page;
                        stack.push(ctx);
                        if let Some(block) = textblock_for(&stack, &attrs) {
                            builder.open_textblock(block, stack.len());
                        }
                        stack.pop();
                        builder.close_if_shallower(stack.len());
                        if is_page {
                            builder.end_page();
                        }
                    }
                }
            }
            Ok(Event::End(e)) => {
                let tag = decode_tag_name(&reader, e.name().as_ref())?;
                if should_skip_tag(&tag) {
                    skip_depth = skip_depth.saturating_sub(1);
                } else if skip_depth == 0 {
                    if let Some(idx) = stack.iter().rposition(|ctx| ctx.tag == tag) {
                        let closed_page = stack.drain(idx..).any(|ctx| ctx.is_page);
                        builder.close_if_shallower(stack.len());
                        if closed_page {
                            builder.end_page();
                        }
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if skip_depth == 0 {
                    let text = e
                        .decode()
                        .map_err(|err| HtmlError::Xml(format!("text decode: {}", err)))?;
                    let marks = stack.last().map(|ctx| &ctx.marks).unwrap_or(&empty_marks);
                    builder.push_text(&text, marks, container_depth(&stack));
                }
            }
            Ok(Event::CData(e)) => {
                if skip_depth == 0 {
                    let text = reader
                        .decoder()
                        .decode(&e)
                        .map_err(|err| HtmlError::Xml(format!("cdata decode: {}", err)))?;
                    let marks = stack.last().map(|ctx| &ctx.marks).unwrap_or(&empty_marks);
                    builder.push_text(&text, marks, container_depth(&stack));
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if skip_depth == 0 {
                    let name = e
                        .decode()
                        .map_err(|err| HtmlError::Xml(format!("entity decode: {}", err)))?;
                    entity_buf.clear();
                    entity_buf.push('&');
                    entity_buf.push_str(&name);
                    entity_buf.push(';');
                    let resolved = match quick_xml::escape::unescape(&entity_buf) {
                        Ok(text) => text.into_owned(),
                        Err(_) if &*name == "nbsp" => " ".to_string(),
                        Err(_) => entity_buf.clone(),
                    };
                    let marks = stack.last().map(|ctx| &ctx.marks).unwrap_or(&empty_marks);
                    builder.push_text(&resolved, marks, container_depth(&stack));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                return Err(HtmlError::Xml(format!(
                    "{} at byte {}",
                    err,
                    reader.buffer_position()
                )))
            }
        }
        buf.clear();
    }

    let doc = builder.finish();
    log::debug!(
        "[HTML] parsed pages={} blocks={}",
        doc.page_count(),
        doc.block_count()
    );
    Ok(doc)
}

/// Handle an element start. Returns the context to push, or `None` for
/// void elements that were fully handled here.
fn open_element(
    builder: &mut DocBuilder,
    stack: &[ElementCtx],
    tag: String,
    attrs: &ElementAttrs,
) -> Option<ElementCtx> {
    let parent_marks = stack.last().map(|ctx| ctx.marks.clone()).unwrap_or_default();

    match tag.as_str() {
        "img" => {
            builder.push_block(Block::Image {
                src: attrs.src.clone().unwrap_or_default(),
                alt: attrs.alt.clone().unwrap_or_default(),
                height: attrs.height,
            });
            return None;
        }
        "hr" => {
            builder.push_block(Block::PageBreak);
            return None;
        }
        "br" => {
            builder.push_text(" ", &parent_marks, container_depth(stack));
            return None;
        }
        "meta" | "link" | "input" | "col" | "wbr" => return None,
        _ => {}
    }

    let mut ctx = ElementCtx {
        tag,
        marks: parent_marks,
        list: None,
        is_page: false,
    };

    match ctx.tag.as_str() {
        "div" if attrs.data_page_break => builder.push_block(Block::PageBreak),
        "div" if attrs.is_page() => {
            builder.start_page();
            ctx.is_page = true;
        }
        "ul" => {
            builder.close_block();
            ctx.list = Some(ListKind::Bullet);
        }
        "ol" => {
            builder.close_block();
            ctx.list = Some(ListKind::Ordered);
        }
        "b" | "strong" => {
            ctx.marks.insert(Mark::Bold);
        }
        "i" | "em" => {
            ctx.marks.insert(Mark::Italic);
        }
        "u" | "ins" => {
            ctx.marks.insert(Mark::Underline);
        }
        "s" | "strike" | "del" => {
            ctx.marks.insert(Mark::Strike);
        }
        "code" => {
            ctx.marks.insert(Mark::Code);
        }
        "mark" => {
            let color = attrs
                .data_color
                .clone()
                .or_else(|| attrs.style_value("background-color").map(str::to_string));
            ctx.marks.insert(Mark::Highlight(color));
        }
        "span" | "font" => {
            if let Some(color) = attrs.style_value("color") {
                ctx.marks.insert(Mark::Color(color.to_string()));
            }
            if let Some(family) = attrs.style_value("font-family") {
                ctx.marks.insert(Mark::FontFamily(normalize_family(family)));
            }
        }
        tag if is_inline(tag) || textblock_level(tag).is_some() => {}
        _ => builder.close_block(),
    }
    Some(ctx)
}

fn is_inline(tag: &str) -> bool {
    matches!(
        tag,
        "a" | "b"
            | "strong"
            | "i"
            | "em"
            | "u"
            | "ins"
            | "s"
            | "strike"
            | "del"
            | "code"
            | "mark"
            | "span"
            | "font"
            | "sub"
            | "sup"
            | "small"
            | "big"
            | "abbr"
            | "cite"
            | "q"
            | "kbd"
            | "var"
    )
}

/// Stack depth of the innermost non-inline element; loose text opens an
/// implicit paragraph that lives until that element closes.
fn container_depth(stack: &[ElementCtx]) -> usize {
    stack
        .iter()
        .rposition(|ctx| !is_inline(&ctx.tag))
        .map(|idx| idx + 1)
        .unwrap_or(0)
}

/// Block to open for the element on top of the stack, if it is a textblock.
fn textblock_for(stack: &[ElementCtx], attrs: &ElementAttrs) -> Option<Block> {
    let ctx = stack.last()?;
    let runs = Vec::new();
    match textblock_level(&ctx.tag)? {
        0 => Some(Block::Paragraph {
            align: attrs.align(),
            runs,
        }),
        7 => Some(Block::ListItem {
            list: stack
                .iter()
                .rev()
                .find_map(|ctx| ctx.list)
                .unwrap_or_default(),
            runs,
        }),
        level => Some(Block::Heading {
            level,
            align: attrs.align(),
            runs,
        }),
    }
}

/// 0 for paragraphs, 1..=6 for headings, 7 for list items.
fn textblock_level(tag: &str) -> Option<u8> {
    match tag {
        "p" => Some(0),
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        "li" => Some(7),
        _ => None,
    }
}

fn decode_tag_name(reader: &Reader<&[u8]>, raw: &[u8]) -> Result<String, HtmlError> {
    let decoded = reader
        .decoder()
        .decode(raw)
        .map_err(|err| HtmlError::Xml(format!("tag name decode: {}", err)))?;
    let local_name = decoded.rsplit(':').next().unwrap_or(decoded.as_ref());
    Ok(local_name.to_ascii_lowercase())
}

fn read_attrs(reader: &Reader<&[u8]>, e: &BytesStart<'_>) -> ElementAttrs {
    let mut attrs = ElementAttrs::default();
    for attr in e.html_attributes().flatten() {
        let key = match reader.decoder().decode(attr.key.as_ref()) {
            Ok(v) => v.to_ascii_lowercase(),
            Err(_) => continue,
        };
        let raw = match reader.decoder().decode(&attr.value) {
            Ok(v) => v.into_owned(),
            Err(_) => continue,
        };
        let val = match quick_xml::escape::unescape(&raw) {
            Ok(v) => v.into_owned(),
            Err(_) => raw,
        };
        match key.as_str() {
            "class" => {
                attrs.classes = val.split_whitespace().map(str::to_string).collect();
            }
            "style" => attrs.style = parse_inline_style(&val),
            "data-page" => attrs.data_page = true,
            "data-page-break" => attrs.data_page_break = true,
            "data-color" => attrs.data_color = Some(val),
            "src" => attrs.src = Some(val),
            "alt" => attrs.alt = Some(val),
            "height" => {
                attrs.height = val
                    .trim()
                    .trim_end_matches("px")
                    .parse::<f32>()
                    .ok()
                    .filter(|h| h.is_finite() && *h >= 0.0);
            }
            _ => {}
        }
    }
    attrs
}

fn parse_inline_style(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|decl| {
            let (key, value) = decl.split_once(':')?;
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim();
            if key.is_empty() || value.is_empty() {
                return None;
            }
            Some((key, value.to_string()))
        })
        .collect()
}

fn normalize_family(family: &str) -> String {
    family
        .trim()
        .trim_matches('"')
        .trim_matches('\'')
        .to_string()
}

fn should_skip_tag(tag: &str) -> bool {
    matches!(tag, "script" | "style" | "head" | "noscript" | "title")
}

/// Collapse whitespace runs to single spaces, optionally dropping a leading one.
fn collapse_whitespace(text: &str, strip_leading: bool) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_space = strip_leading;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !prev_space {
                out.push(' ');
                prev_space = true;
            }
        } else {
            out.push(ch);
            prev_space = false;
        }
    }
    out
}

/// Whether the next text should drop its leading whitespace.
fn ends_soft(block: &Block) -> bool {
    match block.runs().and_then(|runs| runs.last()) {
        Some(run) => run.text.ends_with(' '),
        None => true,
    }
}

fn trim_trailing_space(runs: &mut Vec<TextRun>) {
    while let Some(last) = runs.last_mut() {
        let trimmed_len = last.text.trim_end_matches(' ').len();
        last.text.truncate(trimmed_len);
        if last.text.is_empty() {
            runs.pop();
        } else {
            break;
        }
    }
}

/// Serialize a document to HTML that [`parse_html`] reads back.
pub fn to_html(doc: &Document) -> String {
    let mut out = String::with_capacity(doc.content_size() * 2);
    for page in &doc.pages {
        out.push_str("<div data-page=\"true\">\n");
        let mut open_list: Option<ListKind> = None;
        for block in &page.blocks {
            let list = match block {
                Block::ListItem { list, .. } => Some(*list),
                _ => None,
            };
            if open_list != list {
                if let Some(kind) = open_list {
                    out.push_str(list_close(kind));
                }
                if let Some(kind) = list {
                    out.push_str(list_open(kind));
                }
                open_list = list;
            }
            write_block(&mut out, block);
        }
        if let Some(kind) = open_list {
            out.push_str(list_close(kind));
        }
        out.push_str("</div>\n");
    }
    out
}

fn list_open(kind: ListKind) -> &'static str {
    match kind {
        ListKind::Bullet => "<ul>\n",
        ListKind::Ordered => "<ol>\n",
    }
}

fn list_close(kind: ListKind) -> &'static str {
    match kind {
        ListKind::Bullet => "</ul>\n",
        ListKind::Ordered => "</ol>\n",
    }
}

fn write_block(out: &mut String, block: &Block) {
    match block {
        Block::Paragraph { align, runs } => {
            out.push_str("<p");
            push_align(out, *align);
            out.push('>');
            write_runs(out, runs);
            out.push_str("</p>\n");
        }
        Block::Heading { level, align, runs } => {
            out.push_str(&format!("<h{}", level));
            push_align(out, *align);
            out.push('>');
            write_runs(out, runs);
            out.push_str(&format!("</h{}>\n", level));
        }
        Block::ListItem { runs, .. } => {
            out.push_str("<li>");
            write_runs(out, runs);
            out.push_str("</li>\n");
        }
        Block::PageBreak => out.push_str("<div data-page-break=\"true\"></div>\n"),
        Block::Image { src, alt, height } => {
            out.push_str("<img src=\"");
            out.push_str(&quick_xml::escape::escape(src.as_str()));
            out.push_str("\" alt=\"");
            out.push_str(&quick_xml::escape::escape(alt.as_str()));
            out.push('"');
            if let Some(height) = height {
                out.push_str(&format!(" height=\"{}\"", height));
            }
            out.push_str("/>\n");
        }
    }
}

fn push_align(out: &mut String, align: TextAlign) {
    if align != TextAlign::Left {
        out.push_str(" style=\"text-align: ");
        out.push_str(align.as_css());
        out.push('"');
    }
}

fn write_runs(out: &mut String, runs: &[TextRun]) {
    for run in runs {
        for mark in run.marks.iter() {
            out.push_str(&mark_open(mark));
        }
        out.push_str(&quick_xml::escape::escape(run.text.as_str()));
        for mark in run.marks.iter().collect::<Vec<_>>().into_iter().rev() {
            out.push_str(mark_close(mark));
        }
    }
}

fn mark_open(mark: &Mark) -> String {
    match mark {
        Mark::Bold => "<strong>".to_string(),
        Mark::Italic => "<em>".to_string(),
        Mark::Underline => "<u>".to_string(),
        Mark::Strike => "<s>".to_string(),
        Mark::Code => "<code>".to_string(),
        Mark::Highlight(None) => "<mark>".to_string(),
        Mark::Highlight(Some(color)) => format!(
            "<mark data-color=\"{0}\" style=\"background-color: {0}\">",
            quick_xml::escape::escape(color.as_str())
        ),
        Mark::Color(color) => format!(
            "<span style=\"color: {}\">",
            quick_xml::escape::escape(color.as_str())
        ),
        Mark::FontFamily(family) => format!(
            "<span style=\"font-family: {}\">",
            quick_xml::escape::escape(family.as_str())
        ),
    }
}

fn mark_close(mark: &Mark) -> &'static str {
    match mark {
        Mark::Bold => "</strong>",
        Mark::Italic => "</em>",
        Mark::Underline => "</u>",
        Mark::Strike => "</s>",
        Mark::Code => "</code>",
        Mark::Highlight(_) => "</mark>",
        Mark::Color(_) | Mark::FontFamily(_) => "</span>",
    }
}
