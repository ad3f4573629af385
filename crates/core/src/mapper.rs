//! Content mapper: assigns slide positions to frame elements.
//!
//! A single forward pass per frame. Each element's height is estimated from
//! its content alone, so mapping is deterministic and re-mapping a document
//! reproduces the same positions. Elements that run past the bottom of the
//! slide are still positioned; overflow is not detected.

use crate::error::{MappingError, Result};
use crate::types::{Content, Document, Element, Frame, Layout, ListItem, Position};

/// Slide width in inches.
pub const SLIDE_WIDTH: f64 = 10.0;
/// Slide height in inches.
pub const SLIDE_HEIGHT: f64 = 7.5;
pub const MARGIN_LEFT: f64 = 1.0;
pub const MARGIN_RIGHT: f64 = 1.0;
/// Top of the content region, below the title.
pub const MARGIN_TOP: f64 = 2.5;
/// Vertical gap between consecutive elements.
pub const ELEMENT_SPACING: f64 = 0.4;
pub const CONTENT_WIDTH: f64 = SLIDE_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;

/// Height of one wrapped line of body text.
pub const TEXT_LINE_HEIGHT: f64 = 0.3;
/// Height of one list item line.
pub const ITEM_LINE_HEIGHT: f64 = 0.4;
/// Height of one table row.
pub const TABLE_ROW_HEIGHT: f64 = 0.4;
pub const IMAGE_HEIGHT: f64 = 4.0;
pub const EQUATION_HEIGHT: f64 = 0.5;

/// Characters that fit in one inch of body text.
const CHARS_PER_INCH: f64 = 12.0;

/// Positions elements for the slide builder.
#[derive(Debug, Clone, Default)]
pub struct ContentMapper;

impl ContentMapper {
    /// Create a new mapper.
    pub fn new() -> Self {
        Self
    }

    /// Position every element of every frame in place.
    pub fn map(&self, document: &mut Document) -> Result<()> {
        for frame in &mut document.frames {
            self.map_frame(frame)?;
        }
        Ok(())
    }

    /// Consume a document and return it with positions assigned.
    pub fn map_document(&self, mut document: Document) -> Result<Document> {
        self.map(&mut document)?;
        Ok(document)
    }

    /// Position the elements of a single frame.
    pub fn map_frame(&self, frame: &mut Frame) -> Result<()> {
        let columns = match frame.layout {
            Layout::TwoColumn => 2,
            _ => 1,
        };
        let column_width = CONTENT_WIDTH / columns as f64;
        let mut cursors = vec![MARGIN_TOP; columns];

        for (index, element) in frame.elements.iter_mut().enumerate() {
            let column = index % columns;
            let height = estimate_height(element)?;

            element.position = Some(Position {
                x: MARGIN_LEFT + column as f64 * column_width,
                y: cursors[column],
                width: column_width,
                height,
            });
            cursors[column] += height + ELEMENT_SPACING;
        }

        if let Some(bottom) = frame
            .elements
            .iter()
            .filter_map(|e| e.position.map(|p| p.bottom()))
            .reduce(f64::max)
        {
            if bottom > SLIDE_HEIGHT {
                log::debug!(
                    "frame {} content extends to {:.2}in, past the slide bottom",
                    frame.number,
                    bottom
                );
            }
        }

        Ok(())
    }
}

/// Estimate the rendered height of an element in inches.
pub fn estimate_height(element: &Element) -> std::result::Result<f64, MappingError> {
    let height = match &element.content {
        Content::Text { text, .. } => text_height(text),
        Content::Itemize { items } | Content::Enumerate { items } => list_height(items),
        Content::Block { title, body, .. } => {
            let title_height = if title.is_some() { TEXT_LINE_HEIGHT } else { 0.0 };
            title_height + text_height(body)
        }
        Content::Image { .. } => element
            .size
            .and_then(|s| s.height)
            .unwrap_or(IMAGE_HEIGHT),
        Content::Table { rows, caption } => {
            let caption_height = if caption.is_some() { TEXT_LINE_HEIGHT } else { 0.0 };
            (rows.len() as f64 * TABLE_ROW_HEIGHT).max(TABLE_ROW_HEIGHT) + caption_height
        }
        Content::Figure { caption, .. } => {
            let image_height = element.size.and_then(|s| s.height).unwrap_or(IMAGE_HEIGHT);
            let caption_height = if caption.is_some() { TEXT_LINE_HEIGHT } else { 0.0 };
            image_height + caption_height
        }
        Content::Equation { .. } => EQUATION_HEIGHT,
    };

    if height.is_finite() && height > 0.0 {
        Ok(height)
    } else {
        Err(MappingError {
            element_kind: element.kind(),
            reason: format!("estimated height {} is not a positive length", height),
        })
    }
}

/// Number of lines `text` wraps to at the fixed content width.
pub fn wrapped_lines(text: &str) -> usize {
    let per_line = (CONTENT_WIDTH * CHARS_PER_INCH) as usize;
    text.lines()
        .map(|line| line.chars().count().div_ceil(per_line).max(1))
        .sum::<usize>()
        .max(1)
}

fn text_height(text: &str) -> f64 {
    (wrapped_lines(text) as f64 * TEXT_LINE_HEIGHT).max(TEXT_LINE_HEIGHT)
}

fn list_height(items: &[ListItem]) -> f64 {
    let total: f64 = items
        .iter()
        .map(|item| {
            let own = wrapped_lines(&item.text) as f64 * ITEM_LINE_HEIGHT;
            let nested: f64 = item
                .children
                .iter()
                .map(|child| match &child.content {
                    Content::Itemize { items } | Content::Enumerate { items } => list_height(items),
                    _ => EQUATION_HEIGHT,
                })
                .sum();
            own + nested
        })
        .sum();

    total.max(ITEM_LINE_HEIGHT)
}
