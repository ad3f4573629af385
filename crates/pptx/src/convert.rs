//! End-to-end conversion: parse, map, build.

use crate::builder::SlideBuilder;
use forge_core::{ContentMapper, ConversionOptions, Document, Result};
use forge_equation::{CommandRunner, EquationCache, EquationRenderer, RendererConfig, SystemRunner};
use forge_latex::BeamerParser;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Outcome of one conversion.
///
/// Recovered problems (missing images, unrendered equations) are listed in
/// `warnings` and do not clear `success`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversionReport {
    pub success: bool,
    pub output: PathBuf,
    pub slides: usize,
    pub warnings: Vec<String>,
    /// Fatal error message when `success` is false.
    pub error: Option<String>,
}

impl ConversionReport {
    fn failed(output: &Path, error: &forge_core::Error) -> Self {
        Self {
            success: false,
            output: output.to_path_buf(),
            error: Some(error.to_string()),
            ..Default::default()
        }
    }
}

/// Runs the whole pipeline with one set of options.
pub struct Converter<R = SystemRunner> {
    options: ConversionOptions,
    parser: BeamerParser,
    runner: R,
}

impl Converter<SystemRunner> {
    /// Converter running the real TeX toolchain.
    pub fn new(options: ConversionOptions) -> Self {
        let runner = SystemRunner::new().with_timeout(options.render_timeout());
        Self::with_runner(options, runner)
    }
}

impl<R: CommandRunner> Converter<R> {
    pub fn with_runner(options: ConversionOptions, runner: R) -> Self {
        Self {
            options,
            parser: BeamerParser::new(),
            runner,
        }
    }

    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Parse a `.tex` file into a positioned document.
    pub fn load_file(&self, input: &Path) -> Result<Document> {
        let document = self.parser.parse_file(input)?;
        ContentMapper::new().map_document(document)
    }

    /// Parse source text into a positioned document.
    pub fn load_str(&self, source: &str) -> Result<Document> {
        let document = self.parser.parse(source, "<string>")?;
        ContentMapper::new().map_document(document)
    }

    /// Convert a `.tex` file to a `.pptx` file.
    pub fn convert_file(&self, input: &Path, output: &Path) -> Result<ConversionReport> {
        log::debug!("converting {} to {}", input.display(), output.display());
        let document = self.load_file(input)?;
        self.write(&document, output)
    }

    /// Convert source text to a `.pptx` file. Relative image paths resolve
    /// against the working directory.
    pub fn convert_str(&self, source: &str, output: &Path) -> Result<ConversionReport> {
        let document = self.load_str(source)?;
        self.write(&document, output)
    }

    /// Build an already parsed document.
    pub fn write(&self, document: &Document, output: &Path) -> Result<ConversionReport> {
        let cache = EquationCache::open(self.options.cache_dir_for(output))?;
        let renderer = EquationRenderer::new(
            cache,
            &self.runner,
            RendererConfig::from_options(&self.options),
        );
        let builder = SlideBuilder::new(self.options.clone(), renderer);
        let report = builder.build(document, output)?;

        Ok(ConversionReport {
            success: true,
            output: output.to_path_buf(),
            slides: report.slides,
            warnings: report.warnings,
            error: None,
        })
    }
}

/// Convert a file with the system toolchain. Errors are folded into the
/// report instead of returned.
pub fn convert_file(input: &Path, output: &Path, options: &ConversionOptions) -> ConversionReport {
    Converter::new(options.clone())
        .convert_file(input, output)
        .unwrap_or_else(|e| {
            log::error!("conversion of {} failed: {}", input.display(), e);
            ConversionReport::failed(output, &e)
        })
}

/// Convert source text with the system toolchain. Errors are folded into
/// the report instead of returned.
pub fn convert_str(source: &str, output: &Path, options: &ConversionOptions) -> ConversionReport {
    Converter::new(options.clone())
        .convert_str(source, output)
        .unwrap_or_else(|e| {
            log::error!("conversion failed: {}", e);
            ConversionReport::failed(output, &e)
        })
}
