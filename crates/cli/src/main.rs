//! CLI tool for converting LaTeX Beamer sources to PowerPoint decks.

use anyhow::{bail, Context, Result};
use clap::Parser;
use forge_core::{ConversionOptions, Theme};
use forge_pptx::{ConversionReport, Converter, DeckReader, DeckSummary};
use std::path::{Path, PathBuf};

/// Convert a LaTeX Beamer presentation to PowerPoint.
#[derive(Parser, Debug)]
#[command(name = "slide-forge")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input Beamer source (.tex)
    #[arg(short, long)]
    input: PathBuf,

    /// Output deck (default: input with a .pptx extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Theme: default, professional, academic or minimal
    #[arg(short, long, value_parser = parse_theme)]
    theme: Option<Theme>,

    /// Keep \textcolor colors from the source
    #[arg(long)]
    preserve_colors: bool,

    /// Do not embed images
    #[arg(long)]
    no_images: bool,

    /// Equation cache directory (default: .slideforge-cache beside the output)
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// JSON file with conversion options; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the parsed document as JSON instead of writing a deck
    #[arg(long)]
    dump_json: bool,

    /// Print a per-slide summary of the written deck
    #[arg(short, long)]
    summary: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    if !args.input.is_file() {
        bail!("input file not found: {}", args.input.display());
    }

    let options = build_options(&args)?;
    let converter = Converter::new(options);

    if args.dump_json {
        let document = converter
            .load_file(&args.input)
            .with_context(|| format!("Failed to parse {}", args.input.display()))?;
        println!("{}", serde_json::to_string_pretty(&document)?);
        return Ok(());
    }

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output(&args.input));
    if args.verbose {
        eprintln!("Converting: {} -> {}", args.input.display(), output.display());
    }

    let report = converter
        .convert_file(&args.input, &output)
        .with_context(|| format!("Failed to convert {}", args.input.display()))?;
    print_report(&report);

    if args.summary {
        let deck = DeckReader::new()
            .read_file(&output)
            .with_context(|| format!("Failed to read back {}", output.display()))?;
        print_summary(&deck);
    }

    Ok(())
}

/// Options from the config file (if any) with command-line flags applied.
fn build_options(args: &Args) -> Result<ConversionOptions> {
    let mut options = match &args.config {
        Some(path) => ConversionOptions::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ConversionOptions::default(),
    };

    if let Some(theme) = args.theme {
        options.theme = theme;
    }
    if args.preserve_colors {
        options.preserve_colors = true;
    }
    if args.no_images {
        options.include_images = false;
    }
    if let Some(dir) = &args.cache_dir {
        options.cache_dir = Some(dir.clone());
    }

    Ok(options)
}

fn parse_theme(value: &str) -> std::result::Result<Theme, String> {
    value.parse().map_err(|e: forge_core::Error| e.to_string())
}

fn default_output(input: &Path) -> PathBuf {
    input.with_extension("pptx")
}

fn print_report(report: &ConversionReport) {
    println!(
        "Wrote {} ({} slides)",
        report.output.display(),
        report.slides
    );
    for warning in &report.warnings {
        eprintln!("warning: {}", warning);
    }
}

fn print_summary(deck: &DeckSummary) {
    for slide in &deck.slides {
        println!(
            "Slide {} [{}]: {} shapes, {} pictures, {} tables",
            slide.number,
            slide.layout.as_deref().unwrap_or("?"),
            slide.shapes.len(),
            slide.picture_count,
            slide.table_count
        );
        for shape in &slide.shapes {
            let first_line = shape.text.lines().next().unwrap_or_default();
            println!("  - {}", first_line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let args = Args::try_parse_from([
            "slide-forge",
            "-i",
            "talk.tex",
            "--theme",
            "academic",
            "--no-images",
            "--preserve-colors",
            "--cache-dir",
            "/tmp/eq",
        ])
        .unwrap();

        let options = build_options(&args).unwrap();
        assert_eq!(options.theme, Theme::Academic);
        assert!(!options.include_images);
        assert!(options.preserve_colors);
        assert_eq!(options.cache_dir, Some(PathBuf::from("/tmp/eq")));
    }

    #[test]
    fn test_unknown_theme_rejected() {
        let result = Args::try_parse_from(["slide-forge", "-i", "talk.tex", "--theme", "neon"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_default_output() {
        assert_eq!(
            default_output(Path::new("decks/talk.tex")),
            PathBuf::from("decks/talk.pptx")
        );
    }
}
