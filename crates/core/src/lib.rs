//! Core document model, text cleaning, conversion options and layout mapping
//! for LaTeX Beamer to PowerPoint conversion.

pub mod clean;
pub mod error;
pub mod mapper;
pub mod options;
pub mod types;

pub use clean::{clean_inline, clean_text, color_hint, resolve_color, EscapeTable};
pub use error::{Error, MappingError, ParseError, Result};
pub use mapper::ContentMapper;
pub use options::{ConversionOptions, Theme, ThemeStyle};
pub use types::{
    BlockFlavor, Content, Document, Element, ElementKind, EquationKind, Frame, Layout, ListItem,
    Metadata, Position, Size,
};
