//! Pure mapping between viewport geometry and source line numbers.
//!
//! The mapper never reads live layout. Callers describe the currently
//! rendered blocks as rectangles paired with their source-line spans and
//! the functions here compute which source line sits at the visible-top
//! threshold, or capture/restore a fractional scroll position across a
//! re-render.

/// Inclusive 1-indexed source-line range carried by a rendered block.
///
/// The end line is never less than the start line, even for a zero-width
/// entry in the converter's position map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSpan {
    start: u32,
    end: u32,
}

impl SourceSpan {
    /// Build a span, clamping the start to line 1 and the end to the start.
    pub const fn new(start: u32, end: u32) -> Self {
        let start = if start < 1 { 1 } else { start };
        let end = if end < start { start } else { end };
        Self { start, end }
    }

    /// First source line covered by the block (1-indexed).
    pub const fn start(self) -> u32 {
        self.start
    }

    /// Last source line covered by the block (1-indexed, inclusive).
    pub const fn end(self) -> u32 {
        self.end
    }

    /// Number of source lines the block spans.
    pub const fn line_count(self) -> u32 {
        self.end - self.start + 1
    }
}

/// On-screen bounding rectangle of one rendered block, in surface pixels.
///
/// Only the vertical extent matters for line resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockRect {
    pub top: f64,
    pub bottom: f64,
}

impl BlockRect {
    /// Rendered height; zero when the rectangle is degenerate.
    pub fn height(self) -> f64 {
        (self.bottom - self.top).max(0.0)
    }
}

/// A rendered block as the mapper sees it: where it is and what it covers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockGeometry {
    pub rect: BlockRect,
    pub span: SourceSpan,
}

/// Resolve the source line currently sitting at `threshold`.
///
/// Blocks whose bottom edge lies above the threshold have scrolled past and
/// are discarded. Among blocks containing the threshold, the one with the
/// greatest top edge wins (the most recent container in document order).
/// When nothing contains the threshold, the nearest block below it is used,
/// and with no annotated blocks at all the answer is line 1.
///
/// A multi-line container with positive height is interpolated linearly
/// through its span; the estimate assumes uniform line heights inside the
/// block, which misjudges blocks dominated by a single large element.
pub fn resolve_source_line(blocks: &[BlockGeometry], threshold: f64) -> u32 {
    let mut containing: Option<BlockGeometry> = None;
    let mut below: Option<BlockGeometry> = None;

    for block in blocks {
        if block.rect.bottom < threshold {
            continue;
        }
        if block.rect.top <= threshold {
            if containing.is_none_or(|best| block.rect.top >= best.rect.top) {
                containing = Some(*block);
            }
        } else if below.is_none_or(|best| block.rect.top < best.rect.top) {
            below = Some(*block);
        }
    }

    if let Some(block) = containing {
        let span = block.span;
        let height = block.rect.height();
        if span.line_count() > 1 && height > 0.0 {
            let progress = ((threshold - block.rect.top) / height).clamp(0.0, 1.0);
            // Rounded interpolation stays within the span by construction,
            // but clamp anyway so float noise can't escape it.
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let offset = (progress * f64::from(span.end() - span.start())).round() as u32;
            return (span.start() + offset).clamp(span.start(), span.end());
        }
        return span.start();
    }

    below.map_or(1, |block| block.span.start())
}

/// Scroll state of the surface's scrollable container.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollExtents {
    /// Current scroll offset in pixels.
    pub offset: f64,
    /// Total scrollable content height.
    pub scroll_extent: f64,
    /// Visible viewport height.
    pub viewport_extent: f64,
}

impl ScrollExtents {
    /// Greatest reachable offset; zero when content fits without scrolling.
    pub fn max_offset(self) -> f64 {
        (self.scroll_extent - self.viewport_extent).max(0.0)
    }
}

/// Capture the fractional scroll position in `[0, 1]`.
pub fn capture_scroll_ratio(extents: ScrollExtents) -> f64 {
    let max = extents.max_offset();
    if max <= 0.0 {
        return 0.0;
    }
    (extents.offset / max).clamp(0.0, 1.0)
}

/// Map a captured ratio back to an offset under new extents.
///
/// Best-effort: when the content's line count changed radically the result
/// is a nearby plausible position, not an exact line match.
pub fn restore_scroll_offset(ratio: f64, extents: ScrollExtents) -> f64 {
    let max = extents.max_offset();
    if max <= 0.0 {
        return 0.0;
    }
    (ratio * max).clamp(0.0, max)
}
