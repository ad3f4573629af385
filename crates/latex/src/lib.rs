//! LaTeX Beamer parser.
//!
//! Source text goes through three stages:
//! - [`lexer`] turns it into tokens with spans and line numbers
//! - [`tree`] nests the tokens into environments, groups and options
//! - [`parser`] classifies frame content into document elements
//!
//! ```ignore
//! let document = forge_latex::parse(source, "talk.tex")?;
//! println!("{} frames", document.frames.len());
//! ```

pub mod lexer;
pub mod parser;
pub mod tree;

pub use parser::{parse, parse_file, BeamerParser};
