//! Domain types for the format-agnostic slide document.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// An entire presentation parsed from one source file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Metadata from the preamble.
    pub metadata: Metadata,

    /// Path of the source file, if the document was parsed from disk.
    pub source_path: Option<PathBuf>,

    /// Section headings in source order.
    pub sections: Vec<String>,

    /// Frames in presentation order.
    pub frames: Vec<Frame>,
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a frame to the document.
    pub fn add_frame(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    /// Directory that relative resource paths resolve against.
    pub fn base_dir(&self) -> Option<&Path> {
        self.source_path
            .as_deref()
            .and_then(Path::parent)
            .filter(|p| !p.as_os_str().is_empty())
    }

    /// Total number of top-level elements across all frames.
    pub fn element_count(&self) -> usize {
        self.frames.iter().map(|f| f.elements.len()).sum()
    }
}

/// Document-level metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub author: Option<String>,
    pub date: Option<String>,
    pub institute: Option<String>,
    /// Argument of `\documentclass`, e.g. `beamer`.
    pub document_class: Option<String>,
}

/// A single frame, which becomes one slide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// 1-based frame number in parse order.
    pub number: usize,

    pub title: Option<String>,

    pub subtitle: Option<String>,

    /// Inferred structural role of the frame.
    pub layout: Layout,

    /// Frame options such as `fragile` or `plain`.
    pub options: Vec<String>,

    /// Content in source order.
    pub elements: Vec<Element>,
}

impl Frame {
    /// Create a new empty frame with the given number.
    pub fn new(number: usize) -> Self {
        Self {
            number,
            title: None,
            subtitle: None,
            layout: Layout::TitleAndContent,
            options: Vec::new(),
            elements: Vec::new(),
        }
    }
}

/// Slide layout kinds, inferred from frame content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    TitleSlide,
    TitleAndContent,
    SectionHeader,
    TwoColumn,
    Blank,
}

impl Layout {
    /// Every layout, in the order the builder emits layout templates.
    pub const ALL: [Layout; 5] = [
        Layout::TitleSlide,
        Layout::TitleAndContent,
        Layout::SectionHeader,
        Layout::TwoColumn,
        Layout::Blank,
    ];

    /// Whether the layout template offers a body placeholder.
    pub fn has_body_placeholder(self) -> bool {
        matches!(
            self,
            Layout::TitleAndContent | Layout::SectionHeader | Layout::TwoColumn
        )
    }
}

/// A single typed content item within a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub content: Content,

    /// Assigned by the content mapper.
    pub position: Option<Position>,

    /// Requested size from the source, if any.
    pub size: Option<Size>,
}

impl Element {
    /// Create an unpositioned element.
    pub fn new(content: Content) -> Self {
        Self {
            content,
            position: None,
            size: None,
        }
    }

    /// Plain text element.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(Content::Text {
            text: text.into(),
            color: None,
        })
    }

    /// Equation element with verbatim LaTeX.
    pub fn equation(latex: impl Into<String>, kind: EquationKind) -> Self {
        Self::new(Content::Equation {
            latex: latex.into(),
            kind,
        })
    }

    /// Attach a requested size.
    pub fn with_size(mut self, size: Option<Size>) -> Self {
        self.size = size;
        self
    }

    /// Kind tag of this element.
    pub fn kind(&self) -> ElementKind {
        self.content.kind()
    }

    /// Whether the builder may place this element in a body placeholder.
    pub fn is_text_like(&self) -> bool {
        matches!(
            self.kind(),
            ElementKind::Text | ElementKind::Itemize | ElementKind::Enumerate | ElementKind::Block
        )
    }
}

/// Kind-specific payload of an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Content {
    Text {
        text: String,
        /// RRGGBB color hint from the source.
        color: Option<String>,
    },
    Itemize {
        items: Vec<ListItem>,
    },
    Enumerate {
        items: Vec<ListItem>,
    },
    Block {
        title: Option<String>,
        body: String,
        flavor: BlockFlavor,
    },
    Image {
        path: String,
    },
    Table {
        rows: Vec<Vec<String>>,
        caption: Option<String>,
    },
    Figure {
        path: Option<String>,
        caption: Option<String>,
    },
    Equation {
        /// Raw source between the math delimiters, never escaped.
        latex: String,
        kind: EquationKind,
    },
}

impl Content {
    /// Kind tag of this payload.
    pub fn kind(&self) -> ElementKind {
        match self {
            Content::Text { .. } => ElementKind::Text,
            Content::Itemize { .. } => ElementKind::Itemize,
            Content::Enumerate { .. } => ElementKind::Enumerate,
            Content::Block { .. } => ElementKind::Block,
            Content::Image { .. } => ElementKind::Image,
            Content::Table { .. } => ElementKind::Table,
            Content::Figure { .. } => ElementKind::Figure,
            Content::Equation { .. } => ElementKind::Equation,
        }
    }
}

/// One list item; nested lists live in `children`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    pub text: String,
    pub children: Vec<Element>,
}

impl ListItem {
    /// Create an item without nested content.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            children: Vec::new(),
        }
    }
}

/// Which Beamer block environment a block came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockFlavor {
    Plain,
    Alert,
    Example,
    Theorem,
}

/// Inline (`$...$`) or display (`\[...\]`) math.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquationKind {
    Inline,
    Display,
}

impl EquationKind {
    /// Stable tag used in cache keys and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            EquationKind::Inline => "inline",
            EquationKind::Display => "display",
        }
    }
}

/// Kind tag over the closed element set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Text,
    Itemize,
    Enumerate,
    Block,
    Image,
    Table,
    Figure,
    Equation,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementKind::Text => "text",
            ElementKind::Itemize => "itemize",
            ElementKind::Enumerate => "enumerate",
            ElementKind::Block => "block",
            ElementKind::Image => "image",
            ElementKind::Table => "table",
            ElementKind::Figure => "figure",
            ElementKind::Equation => "equation",
        };
        f.write_str(name)
    }
}

/// Slide-relative placement in inches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Position {
    /// Bottom edge of the box.
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// Requested element size in inches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: Option<f64>,
    pub height: Option<f64>,
}
