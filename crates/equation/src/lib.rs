//! Equation rendering for slide decks.
//!
//! LaTeX math is compiled with `latex`, rasterized with `dvipng`, and stored
//! in a content-addressed [`EquationCache`] so each distinct equation is
//! compiled at most once. Process execution goes through the
//! [`CommandRunner`] trait.

pub mod cache;
pub mod renderer;
pub mod runner;

pub use cache::EquationCache;
pub use renderer::{standalone_document, EquationRenderer, RenderFailure, RendererConfig};
pub use runner::{CommandRunner, ProcessError, ProcessOutput, SystemRunner};
