//! Markdown → sanitized, line-annotated visual blocks.
//!
//! This module wraps the external converter (comrak): each top-level block
//! of the parsed document is rendered to an HTML fragment, sanitized with
//! ammonia, and annotated with the inclusive source-line span it was
//! produced from. The [`Surface`] holds whatever is currently mounted —
//! annotated blocks, the heading navigation index rebuilt on every render,
//! the base reference for relative resources, and the scroll state the
//! geometry mapper reads on demand.

use comrak::nodes::{AstNode, NodeValue};
use comrak::{Arena, Options, format_html, parse_document};

use crate::error::ViewerError;
use crate::geometry::{
    ScrollExtents, SourceSpan, capture_scroll_ratio, restore_scroll_offset,
};

/// Base reference used when no hint accompanies the document.
const DEFAULT_BASE_HREF: &str = "./";

/// One sanitized top-level block with its source-line annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedBlock {
    /// Sanitized markup, wrapped in an annotated container element.
    pub html: String,
    /// Source lines this block was rendered from.
    pub span: SourceSpan,
}

/// Entry in the heading navigation index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingRef {
    pub level: u8,
    pub text: String,
    /// First source line of the heading (1-indexed).
    pub line: u32,
}

/// Result of one conversion pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOutput {
    pub blocks: Vec<RenderedBlock>,
    pub headings: Vec<HeadingRef>,
}

/// Placeholder content for folder states with nothing to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    /// Folder has entries but none is selected.
    SelectFile,
    /// Folder contains no recognized documents.
    EmptyFolder,
}

impl Placeholder {
    /// User-visible message for this placeholder.
    pub const fn message(self) -> &'static str {
        match self {
            Self::SelectFile => "Select a file to view",
            Self::EmptyFolder => "No documents in this folder",
        }
    }
}

fn converter_options() -> Options {
    let mut options = Options::default();
    options.extension.table = true;
    options.extension.strikethrough = true;
    options.extension.tasklist = true;
    options.extension.autolink = true;
    options.extension.footnotes = true;
    options
}

fn sanitizer() -> ammonia::Builder<'static> {
    // Defaults strip scripts, event handlers, and unsafe attributes.
    ammonia::Builder::new()
}

/// Convert raw markdown into sanitized, annotated blocks plus the heading
/// index collected in the same pass.
///
/// # Errors
///
/// Returns [`ViewerError::Convert`] when the converter fails to format a
/// block; nothing partial is produced.
pub fn render_markdown(text: &str) -> Result<RenderOutput, ViewerError> {
    let arena = Arena::new();
    let options = converter_options();
    let root = parse_document(&arena, text, &options);
    let cleaner = sanitizer();

    let mut blocks = Vec::new();
    let mut headings = Vec::new();

    for node in root.children() {
        let span = block_span(node);
        let mut raw = Vec::new();
        format_html(node, &options, &mut raw)
            .map_err(|err| ViewerError::Convert(err.to_string()))?;
        let fragment =
            String::from_utf8(raw).map_err(|err| ViewerError::Convert(err.to_string()))?;
        let clean = cleaner.clean(&fragment).to_string();
        blocks.push(RenderedBlock {
            html: annotate_block(&clean, span),
            span,
        });
        if let Some(heading) = heading_ref(node, span) {
            headings.push(heading);
        }
    }

    Ok(RenderOutput { blocks, headings })
}

/// Source span of a top-level node, end clamped so single-line blocks from
/// a zero-width position entry still carry a sane range.
fn block_span<'a>(node: &'a AstNode<'a>) -> SourceSpan {
    let sourcepos = node.data.borrow().sourcepos;
    #[allow(clippy::cast_possible_truncation)]
    SourceSpan::new(sourcepos.start.line as u32, sourcepos.end.line as u32)
}

/// Attach the line annotation after sanitization so the cleaner cannot
/// strip it; the wrapper itself carries no user-controlled content.
fn annotate_block(clean_html: &str, span: SourceSpan) -> String {
    format!(
        "<div data-source-start=\"{}\" data-source-end=\"{}\">{}</div>",
        span.start(),
        span.end(),
        clean_html.trim_end()
    )
}

fn heading_ref<'a>(node: &'a AstNode<'a>, span: SourceSpan) -> Option<HeadingRef> {
    let level = match &node.data.borrow().value {
        NodeValue::Heading(heading) => heading.level,
        _ => return None,
    };
    let mut text = String::new();
    extract_text(node, &mut text);
    Some(HeadingRef {
        level,
        text: text.trim().to_string(),
        line: span.start(),
    })
}

fn extract_text<'a>(node: &'a AstNode<'a>, text: &mut String) {
    match &node.data.borrow().value {
        NodeValue::Text(t) => text.push_str(t),
        NodeValue::Code(code) => text.push_str(&code.literal),
        NodeValue::SoftBreak | NodeValue::LineBreak => text.push(' '),
        _ => {}
    }
    for child in node.children() {
        extract_text(child, text);
    }
}

/// The mounted visual content region.
///
/// Owns whatever is currently displayed and the scroll state the embedder
/// reports back after layout. Mounting replaces the entire region.
#[derive(Debug, Default)]
pub struct Surface {
    blocks: Vec<RenderedBlock>,
    headings: Vec<HeadingRef>,
    base_href: String,
    placeholder: Option<Placeholder>,
    scroll: ScrollExtents,
    pending_ratio: Option<f64>,
}

impl Surface {
    pub fn new() -> Self {
        Self {
            base_href: DEFAULT_BASE_HREF.to_string(),
            ..Self::default()
        }
    }

    /// Replace the content region with freshly rendered output.
    ///
    /// Resets the base reference to the supplied hint or the default
    /// current-directory marker, and rebuilds the heading index.
    pub fn mount(&mut self, output: RenderOutput, base_hint: Option<&str>) {
        self.blocks = output.blocks;
        self.headings = output.headings;
        self.base_href = base_hint.unwrap_or(DEFAULT_BASE_HREF).to_string();
        self.placeholder = None;
    }

    /// Replace the content region with a placeholder message.
    pub fn mount_placeholder(&mut self, kind: Placeholder) {
        self.blocks.clear();
        self.headings.clear();
        self.base_href = DEFAULT_BASE_HREF.to_string();
        self.placeholder = Some(kind);
    }

    /// Remember the current fractional scroll position so the next layout
    /// pass can restore it. Used when an on-disk change forces a re-render.
    pub fn remember_scroll_ratio(&mut self) {
        self.pending_ratio = Some(capture_scroll_ratio(self.scroll));
    }

    /// Report post-layout scroll extents back to the surface.
    ///
    /// Must run after the new content has been laid out, since the scroll
    /// extent changes with content. Applies a pending restore ratio, if any,
    /// and returns the effective offset.
    pub fn set_scroll_extents(&mut self, extents: ScrollExtents) -> f64 {
        self.scroll = extents;
        if let Some(ratio) = self.pending_ratio.take() {
            self.scroll.offset = restore_scroll_offset(ratio, extents);
        }
        self.scroll.offset
    }

    pub fn scroll(&self) -> ScrollExtents {
        self.scroll
    }

    pub fn blocks(&self) -> &[RenderedBlock] {
        &self.blocks
    }

    pub fn headings(&self) -> &[HeadingRef] {
        &self.headings
    }

    pub fn base_href(&self) -> &str {
        &self.base_href
    }

    pub const fn placeholder(&self) -> Option<Placeholder> {
        self.placeholder
    }

    /// Full markup of the content region, placeholder included.
    pub fn full_html(&self) -> String {
        if let Some(placeholder) = self.placeholder {
            return format!("<p class=\"placeholder\">{}</p>", placeholder.message());
        }
        let mut html = String::new();
        for block in &self.blocks {
            html.push_str(&block.html);
            html.push('\n');
        }
        html
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line_block_has_sane_span() {
        let output = render_markdown("just one paragraph").unwrap();
        assert_eq!(output.blocks.len(), 1);
        let span = output.blocks[0].span;
        assert_eq!(span.start(), 1);
        assert!(span.end() >= span.start());
    }

    #[test]
    fn test_spans_follow_document_order() {
        let output = render_markdown("# Title\n\npara one\n\npara two\n").unwrap();
        let starts: Vec<_> = output.blocks.iter().map(|b| b.span.start()).collect();
        let mut sorted = starts.clone();
        sorted.sort_unstable();
        assert_eq!(starts, sorted);
        assert_eq!(starts[0], 1);
    }

    #[test]
    fn test_multiline_block_spans_all_lines() {
        let output = render_markdown("- one\n- two\n- three\n").unwrap();
        assert_eq!(output.blocks.len(), 1);
        let span = output.blocks[0].span;
        assert_eq!(span.start(), 1);
        assert_eq!(span.end(), 3);
    }

    #[test]
    fn test_script_tags_are_stripped() {
        let output = render_markdown("hello <script>alert(1)</script> world").unwrap();
        let html = &output.blocks[0].html;
        assert!(!html.contains("<script"));
        assert!(html.contains("hello"));
    }

    #[test]
    fn test_event_handler_attributes_are_stripped() {
        let output =
            render_markdown("<p onclick=\"steal()\">click me</p>\n").unwrap();
        let html: String = output.blocks.iter().map(|b| b.html.as_str()).collect();
        assert!(!html.contains("onclick"));
        assert!(html.contains("click me"));
    }

    #[test]
    fn test_annotation_attributes_survive() {
        let output = render_markdown("# Hi\n").unwrap();
        assert!(output.blocks[0].html.contains("data-source-start=\"1\""));
        assert!(output.blocks[0].html.contains("data-source-end=\"1\""));
    }

    #[test]
    fn test_heading_index_collects_levels_and_lines() {
        let output = render_markdown("# One\n\ntext\n\n## Two\n").unwrap();
        assert_eq!(output.headings.len(), 2);
        assert_eq!(output.headings[0].level, 1);
        assert_eq!(output.headings[0].text, "One");
        assert_eq!(output.headings[0].line, 1);
        assert_eq!(output.headings[1].level, 2);
        assert_eq!(output.headings[1].line, 5);
    }

    #[test]
    fn test_heading_text_includes_inline_code() {
        let output = render_markdown("## The `run` loop\n").unwrap();
        assert_eq!(output.headings[0].text, "The run loop");
    }

    #[test]
    fn test_mount_resets_base_href_to_hint() {
        let mut surface = Surface::new();
        let output = render_markdown("hi").unwrap();
        surface.mount(output, Some("file:///docs/"));
        assert_eq!(surface.base_href(), "file:///docs/");
    }

    #[test]
    fn test_mount_without_hint_uses_default_base() {
        let mut surface = Surface::new();
        surface.mount(render_markdown("hi").unwrap(), Some("file:///docs/"));
        surface.mount(render_markdown("again").unwrap(), None);
        assert_eq!(surface.base_href(), "./");
    }

    #[test]
    fn test_mount_placeholder_clears_blocks_and_headings() {
        let mut surface = Surface::new();
        surface.mount(render_markdown("# Title\n\ntext").unwrap(), None);
        surface.mount_placeholder(Placeholder::EmptyFolder);
        assert!(surface.blocks().is_empty());
        assert!(surface.headings().is_empty());
        assert!(surface.full_html().contains("No documents"));
    }

    #[test]
    fn test_placeholder_messages_are_distinct() {
        assert_ne!(
            Placeholder::SelectFile.message(),
            Placeholder::EmptyFolder.message()
        );
    }

    #[test]
    fn test_pending_ratio_applied_on_next_layout() {
        let mut surface = Surface::new();
        surface.set_scroll_extents(ScrollExtents {
            offset: 150.0,
            scroll_extent: 400.0,
            viewport_extent: 100.0,
        });
        surface.remember_scroll_ratio();

        // New content is twice as tall; the ratio maps to the new extents.
        let offset = surface.set_scroll_extents(ScrollExtents {
            offset: 0.0,
            scroll_extent: 700.0,
            viewport_extent: 100.0,
        });
        assert!((offset - 300.0).abs() < 1.0);
    }

    #[test]
    fn test_layout_without_pending_ratio_keeps_reported_offset() {
        let mut surface = Surface::new();
        let offset = surface.set_scroll_extents(ScrollExtents {
            offset: 42.0,
            scroll_extent: 400.0,
            viewport_extent: 100.0,
        });
        assert!((offset - 42.0).abs() < f64::EPSILON);
    }
}
