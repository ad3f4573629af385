//! Error types for Beamer to PowerPoint conversion.

use crate::types::ElementKind;
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can abort a conversion.
///
/// Element-level problems in the builder (missing images, equations that fail
/// to render) are not represented here: they are logged and recovered.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to read the source or write the output.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The source markup is structurally broken.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// An element could not be positioned.
    #[error(transparent)]
    Mapping(#[from] MappingError),

    /// The output deck could not be assembled or written.
    #[error("Build failed: {0}")]
    BuildError(String),

    /// ZIP archive error (for PPTX).
    #[error("ZIP error: {0}")]
    ZipError(String),

    /// XML error (for PPTX).
    #[error("XML error: {0}")]
    XmlError(String),

    /// Invalid conversion options.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Options file could not be decoded.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Unrecoverable structural malformation in the source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("parse error at line {line_number}: {message} (near `{snippet}`)")]
pub struct ParseError {
    /// 1-based line where the broken construct starts.
    pub line_number: usize,
    /// A short excerpt of the source at that line.
    pub snippet: String,
    /// What went wrong.
    pub message: String,
}

impl ParseError {
    /// Maximum length of the excerpt carried by the error.
    const SNIPPET_LEN: usize = 60;

    /// Build an error for `line_number`, taking the snippet from `source`.
    pub fn at_line(source: &str, line_number: usize, message: impl Into<String>) -> Self {
        let line = source
            .lines()
            .nth(line_number.saturating_sub(1))
            .unwrap_or_default()
            .trim();
        let snippet: String = line.chars().take(Self::SNIPPET_LEN).collect();

        Self {
            line_number,
            snippet,
            message: message.into(),
        }
    }
}

/// An element kind lacks a positioning rule.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot position {element_kind} element: {reason}")]
pub struct MappingError {
    /// Kind of the offending element.
    pub element_kind: ElementKind,
    /// Why no position could be computed.
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_snippet() {
        let source = "\\documentclass{beamer}\n   \\begin{frame}{Broken}   \nmore";
        let err = ParseError::at_line(source, 2, "unterminated frame");

        assert_eq!(err.line_number, 2);
        assert_eq!(err.snippet, "\\begin{frame}{Broken}");
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_parse_error_past_end() {
        let err = ParseError::at_line("one line", 9, "eof");
        assert_eq!(err.snippet, "");
    }

    #[test]
    fn test_mapping_error_display() {
        let err = MappingError {
            element_kind: ElementKind::Table,
            reason: "no rule".to_string(),
        };
        assert_eq!(err.to_string(), "cannot position table element: no rule");
    }
}
