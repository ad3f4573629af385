//! PPTX (Office Open XML) output for converted slide decks.
//!
//! A `.pptx` file is a ZIP archive of XML parts. [`SlideBuilder`] writes one
//! slide per frame on top of a fixed master, five layouts and a theme;
//! [`DeckReader`] reads a generated deck back into a summary; [`Converter`]
//! runs the parse, map and build stages end to end.

pub mod builder;
pub mod convert;
pub mod media;
pub mod package;
pub mod reader;
pub mod slide;
pub mod template;

pub use builder::{BuildReport, SlideBuilder};
pub use convert::{convert_file, convert_str, ConversionReport, Converter};
pub use reader::{DeckReader, DeckSummary, ShapeSummary, SlideSummary};
