//! Equation rendering through `latex` and `dvipng`.

use crate::cache::EquationCache;
use crate::runner::{CommandRunner, ProcessError, SystemRunner};
use forge_core::{ConversionOptions, EquationKind, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use thiserror::Error;

/// Base name of the files produced in the scratch directory.
const JOB_NAME: &str = "eq";

/// Why an equation could not be turned into an image.
///
/// These never abort a conversion: the renderer logs them and the caller
/// falls back to showing the LaTeX source as text.
#[derive(Error, Debug)]
pub enum RenderFailure {
    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("{program} exited with status {status:?}: {detail}")]
    CompileFailed {
        program: String,
        status: Option<i32>,
        detail: String,
    },

    #[error("expected output {0} was not produced")]
    MissingOutput(PathBuf),

    #[error("scratch directory: {0}")]
    Scratch(#[from] io::Error),
}

/// External programs and raster settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendererConfig {
    pub latex_program: String,
    pub dvipng_program: String,
    /// Raster resolution passed to dvipng.
    pub dpi: u32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            latex_program: "latex".to_string(),
            dvipng_program: "dvipng".to_string(),
            dpi: Self::DEFAULT_DPI,
        }
    }
}

impl RendererConfig {
    pub const DEFAULT_DPI: u32 = 300;

    pub fn from_options(options: &ConversionOptions) -> Self {
        Self {
            latex_program: options.latex_program.clone(),
            dvipng_program: options.dvipng_program.clone(),
            dpi: Self::DEFAULT_DPI,
        }
    }
}

/// Renders equations to PNG, consulting the cache before compiling.
#[derive(Debug)]
pub struct EquationRenderer<R = SystemRunner> {
    cache: EquationCache,
    runner: R,
    config: RendererConfig,
}

impl EquationRenderer<SystemRunner> {
    /// Renderer using real processes, configured from conversion options.
    pub fn from_options(options: &ConversionOptions, cache: EquationCache) -> Self {
        let runner = SystemRunner::new().with_timeout(options.render_timeout());
        Self::new(cache, runner, RendererConfig::from_options(options))
    }
}

impl<R: CommandRunner> EquationRenderer<R> {
    pub fn new(cache: EquationCache, runner: R, config: RendererConfig) -> Self {
        Self {
            cache,
            runner,
            config,
        }
    }

    pub fn cache(&self) -> &EquationCache {
        &self.cache
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Render `latex` to a cached PNG.
    ///
    /// Returns `Ok(None)` when the toolchain is missing or compilation fails;
    /// `Err` only when a rendered image cannot be written to the cache.
    pub fn render(
        &self,
        latex: &str,
        kind: EquationKind,
        scratch_dir: &Path,
    ) -> Result<Option<PathBuf>> {
        let key = EquationCache::key(latex, kind);
        if let Some(hit) = self.cache.lookup(&key) {
            log::debug!("equation cache hit {}", key);
            return Ok(Some(hit));
        }

        match self.compile(latex, kind, scratch_dir) {
            Ok((_scratch, image)) => {
                let stored = self.cache.store(&key, &image)?;
                Ok(Some(stored))
            }
            Err(failure) => {
                log::warn!("equation `{}` not rendered: {}", latex, failure);
                Ok(None)
            }
        }
    }

    /// Compile in a fresh scratch directory. The directory is removed when
    /// the returned guard drops.
    fn compile(
        &self,
        latex: &str,
        kind: EquationKind,
        scratch_dir: &Path,
    ) -> std::result::Result<(TempDir, PathBuf), RenderFailure> {
        fs::create_dir_all(scratch_dir)?;
        let scratch = tempfile::Builder::new()
            .prefix("slideforge-eq-")
            .tempdir_in(scratch_dir)?;
        let work = scratch.path();

        let tex_name = format!("{}.tex", JOB_NAME);
        let dvi_name = format!("{}.dvi", JOB_NAME);
        let png_name = format!("{}.png", JOB_NAME);
        fs::write(work.join(&tex_name), standalone_document(latex, kind))?;

        self.run_step(
            &self.config.latex_program,
            &["-interaction=nonstopmode", "-halt-on-error", &tex_name],
            work,
        )?;
        let dvi = work.join(&dvi_name);
        if !dvi.is_file() {
            return Err(RenderFailure::MissingOutput(dvi));
        }

        let dpi = self.config.dpi.to_string();
        self.run_step(
            &self.config.dvipng_program,
            &["-D", &dpi, "-T", "tight", "-bg", "White", "-o", &png_name, &dvi_name],
            work,
        )?;
        let png = work.join(&png_name);
        if !png.is_file() {
            return Err(RenderFailure::MissingOutput(png));
        }

        Ok((scratch, png))
    }

    fn run_step(
        &self,
        program: &str,
        args: &[&str],
        cwd: &Path,
    ) -> std::result::Result<(), RenderFailure> {
        log::debug!("running {} {}", program, args.join(" "));
        let output = self.runner.run(program, args, cwd)?;
        if output.success {
            return Ok(());
        }

        Err(RenderFailure::CompileFailed {
            program: program.to_string(),
            status: output.status,
            detail: failure_detail(&output.stdout, &output.stderr),
        })
    }
}

/// Wrap an equation body in a minimal compilable document.
pub fn standalone_document(latex: &str, kind: EquationKind) -> String {
    let latex = latex.trim();
    let math = match kind {
        EquationKind::Inline => format!("${}$", latex),
        EquationKind::Display if latex.contains('&') || latex.contains("\\\\") => {
            format!("\\[\n\\begin{{aligned}}\n{}\n\\end{{aligned}}\n\\]", latex)
        }
        EquationKind::Display => format!("\\[\n{}\n\\]", latex),
    };

    format!(
        "\\documentclass{{article}}\n\
         \\usepackage{{amsmath}}\n\
         \\usepackage{{amssymb}}\n\
         \\pagestyle{{empty}}\n\
         \\begin{{document}}\n\
         {}\n\
         \\end{{document}}\n",
        math
    )
}

/// First TeX error line (`! ...`), else the last line of stderr.
fn failure_detail(stdout: &str, stderr: &str) -> String {
    stdout
        .lines()
        .find(|line| line.starts_with('!'))
        .or_else(|| stderr.lines().rev().find(|line| !line.trim().is_empty()))
        .unwrap_or("no diagnostic output")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ProcessOutput;
    use std::cell::RefCell;

    /// Pretends to be latex and dvipng, writing placeholder outputs.
    #[derive(Default)]
    struct FakeToolchain {
        calls: RefCell<Vec<String>>,
        fail_latex: bool,
    }

    impl FakeToolchain {
        fn count(&self, program: &str) -> usize {
            self.calls.borrow().iter().filter(|p| *p == program).count()
        }
    }

    impl CommandRunner for FakeToolchain {
        fn run(
            &self,
            program: &str,
            args: &[&str],
            cwd: &Path,
        ) -> std::result::Result<ProcessOutput, ProcessError> {
            self.calls.borrow_mut().push(program.to_string());
            assert!(cwd.is_dir());

            let success = match program {
                "latex" if self.fail_latex => false,
                "latex" => {
                    assert!(cwd.join("eq.tex").is_file());
                    fs::write(cwd.join("eq.dvi"), b"dvi").unwrap();
                    true
                }
                "dvipng" => {
                    assert!(args.contains(&"300"));
                    fs::write(cwd.join("eq.png"), b"\x89PNG fake").unwrap();
                    true
                }
                other => panic!("unexpected program {}", other),
            };

            Ok(ProcessOutput {
                success,
                status: Some(if success { 0 } else { 1 }),
                stdout: if success {
                    String::new()
                } else {
                    "! Undefined control sequence.\nl.6 \\foo".to_string()
                },
                stderr: String::new(),
            })
        }
    }

    struct NoToolchain;

    impl CommandRunner for NoToolchain {
        fn run(
            &self,
            program: &str,
            _args: &[&str],
            _cwd: &Path,
        ) -> std::result::Result<ProcessOutput, ProcessError> {
            Err(ProcessError::NotFound(program.to_string()))
        }
    }

    fn renderer<R: CommandRunner>(dir: &Path, runner: R) -> EquationRenderer<R> {
        let cache = EquationCache::open(dir.join("cache")).unwrap();
        EquationRenderer::new(cache, runner, RendererConfig::default())
    }

    #[test]
    fn test_renders_and_caches() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = renderer(dir.path(), FakeToolchain::default());
        let scratch = dir.path().join("scratch");

        let path = renderer
            .render("E = mc^2", EquationKind::Inline, &scratch)
            .unwrap()
            .unwrap();
        assert!(path.starts_with(renderer.cache().dir()));
        assert_eq!(fs::read(&path).unwrap(), b"\x89PNG fake");
        assert_eq!(renderer.runner().count("latex"), 1);
        assert_eq!(renderer.runner().count("dvipng"), 1);
    }

    #[test]
    fn test_identical_equations_compile_once() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = renderer(dir.path(), FakeToolchain::default());
        let scratch = dir.path().join("scratch");

        let first = renderer
            .render("\\frac{a}{b}", EquationKind::Display, &scratch)
            .unwrap();
        let second = renderer
            .render("\\frac{a}{b}", EquationKind::Display, &scratch)
            .unwrap();

        assert!(first.is_some());
        assert_eq!(first, second);
        assert_eq!(renderer.runner().count("latex"), 1);

        renderer
            .render("\\frac{a}{b}", EquationKind::Inline, &scratch)
            .unwrap();
        assert_eq!(renderer.runner().count("latex"), 2);
    }

    #[test]
    fn test_missing_toolchain_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = renderer(dir.path(), NoToolchain);

        let result = renderer
            .render("E = mc^2", EquationKind::Inline, &dir.path().join("scratch"))
            .unwrap();
        assert_eq!(result, None);
        assert!(renderer.cache().is_empty());
    }

    #[test]
    fn test_compile_error_yields_none_and_cleans_scratch() {
        let dir = tempfile::tempdir().unwrap();
        let runner = FakeToolchain {
            fail_latex: true,
            ..Default::default()
        };
        let renderer = renderer(dir.path(), runner);
        let scratch = dir.path().join("scratch");

        let result = renderer
            .render("\\foo", EquationKind::Display, &scratch)
            .unwrap();
        assert_eq!(result, None);
        assert_eq!(renderer.runner().count("dvipng"), 0);
        assert!(renderer.cache().is_empty());
        assert_eq!(fs::read_dir(&scratch).unwrap().count(), 0);
    }

    #[test]
    fn test_standalone_document() {
        let inline = standalone_document(" x^2 ", EquationKind::Inline);
        assert!(inline.contains("$x^2$"));
        assert!(inline.contains("\\usepackage{amsmath}"));
        assert!(inline.contains("\\pagestyle{empty}"));

        let display = standalone_document("a = b", EquationKind::Display);
        assert!(display.contains("\\[\na = b\n\\]"));
        assert!(!display.contains("aligned"));

        let aligned = standalone_document("a &= b \\\\ c &= d", EquationKind::Display);
        assert!(aligned.contains("\\begin{aligned}"));
    }

    #[test]
    fn test_failure_detail() {
        assert_eq!(
            failure_detail("This is TeX\n! Missing $ inserted.\n", ""),
            "! Missing $ inserted."
        );
        assert_eq!(failure_detail("", "warn\nfatal\n\n"), "fatal");
        assert_eq!(failure_detail("", ""), "no diagnostic output");
    }
}
