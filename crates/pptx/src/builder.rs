//! Renders a positioned [`Document`] into a `.pptx` package.
//!
//! Element-level problems (missing images, equations that do not render)
//! never fail the build: they are logged, recorded in the
//! [`BuildReport`], and the element is skipped or replaced by text.

use crate::media::{fit, ImageFormat, MediaStore};
use crate::package::PackageWriter;
use crate::slide::{Bullet, Paragraph, PlaceholderKind, Rect, Run, SlideXml};
use crate::template::{self, Relationship};
use forge_core::mapper::{MARGIN_LEFT, TABLE_ROW_HEIGHT, TEXT_LINE_HEIGHT};
use forge_core::{
    BlockFlavor, Content, ContentMapper, ConversionOptions, Document, Element, EquationKind, Error,
    Frame, Layout, ListItem, Position, Result, Size, ThemeStyle,
};
use forge_equation::{CommandRunner, EquationCache, EquationRenderer, SystemRunner};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Seek, Write};
use std::path::{Path, PathBuf};

/// Outcome of a build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    /// Number of slides written.
    pub slides: usize,
    /// Recovered element-level problems, in the order they occurred.
    pub warnings: Vec<String>,
    /// Number of distinct media parts embedded.
    pub images: usize,
}

/// Builds slide decks, rendering equations through an [`EquationRenderer`].
pub struct SlideBuilder<R = SystemRunner> {
    options: ConversionOptions,
    renderer: EquationRenderer<R>,
}

impl SlideBuilder<SystemRunner> {
    /// Builder with a process-backed renderer over `cache`.
    pub fn from_options(options: ConversionOptions, cache: EquationCache) -> Self {
        let renderer = EquationRenderer::from_options(&options, cache);
        Self::new(options, renderer)
    }
}

impl<R: CommandRunner> SlideBuilder<R> {
    pub fn new(options: ConversionOptions, renderer: EquationRenderer<R>) -> Self {
        Self { options, renderer }
    }

    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    pub fn renderer(&self) -> &EquationRenderer<R> {
        &self.renderer
    }

    /// Write `document` to `output_path`.
    ///
    /// Fails only when the package cannot be written. Unpositioned documents
    /// are run through the [`ContentMapper`] first.
    pub fn build(&self, document: &Document, output_path: &Path) -> Result<BuildReport> {
        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(output_path).map_err(|e| {
            Error::BuildError(format!("cannot create {}: {}", output_path.display(), e))
        })?;
        let (mut writer, report) = self.build_to(document, BufWriter::new(file))?;
        writer.flush()?;

        log::debug!(
            "wrote {} ({} slides, {} warnings)",
            output_path.display(),
            report.slides,
            report.warnings.len()
        );
        Ok(report)
    }

    /// Write `document` into any seekable writer and hand the writer back.
    pub fn build_to<W: Write + Seek>(
        &self,
        document: &Document,
        writer: W,
    ) -> Result<(W, BuildReport)> {
        let mapped;
        let document = if needs_mapping(document) {
            mapped = ContentMapper::new().map_document(document.clone())?;
            &mapped
        } else {
            document
        };

        let mut deck = DeckState::default();
        let slides: Vec<SlideContext> = document
            .frames
            .iter()
            .map(|frame| self.build_slide(frame, document, &mut deck))
            .collect();

        let style = self.style();
        let mut package = PackageWriter::new(writer);
        package.add_xml(
            "[Content_Types].xml",
            &template::content_types_xml(slides.len(), &deck.media.content_types()),
        )?;
        package.add_xml("_rels/.rels", &template::root_rels_xml())?;
        package.add_xml("docProps/core.xml", &template::core_props_xml(&document.metadata))?;
        package.add_xml("docProps/app.xml", &template::app_props_xml(slides.len()))?;
        package.add_xml("ppt/presentation.xml", &template::presentation_xml(slides.len()))?;
        package.add_xml(
            "ppt/_rels/presentation.xml.rels",
            &template::presentation_rels_xml(slides.len()),
        )?;
        package.add_xml("ppt/presProps.xml", &template::pres_props_xml())?;
        package.add_xml("ppt/viewProps.xml", &template::view_props_xml())?;
        package.add_xml("ppt/tableStyles.xml", &template::table_styles_xml())?;
        package.add_xml(
            "ppt/theme/theme1.xml",
            &template::theme_xml(self.options.theme.name(), &style),
        )?;
        package.add_xml(
            "ppt/slideMasters/slideMaster1.xml",
            &template::slide_master_xml(&style),
        )?;
        package.add_xml(
            "ppt/slideMasters/_rels/slideMaster1.xml.rels",
            &template::slide_master_rels_xml(),
        )?;
        for (index, layout) in Layout::ALL.iter().enumerate() {
            package.add_xml(
                &format!("ppt/slideLayouts/slideLayout{}.xml", index + 1),
                &template::slide_layout_xml(*layout),
            )?;
            package.add_xml(
                &format!("ppt/slideLayouts/_rels/slideLayout{}.xml.rels", index + 1),
                &template::slide_layout_rels_xml(),
            )?;
        }
        for (index, slide) in slides.iter().enumerate() {
            package.add_xml(
                &format!("ppt/slides/slide{}.xml", index + 1),
                &slide.xml.finish(),
            )?;
            package.add_xml(
                &format!("ppt/slides/_rels/slide{}.xml.rels", index + 1),
                &slide.rels(&deck.media),
            )?;
        }
        for part in deck.media.parts() {
            package.add_bytes(&format!("ppt/media/{}", part.name), &part.bytes)?;
        }

        let writer = package.finish()?;
        let report = BuildReport {
            slides: slides.len(),
            warnings: deck.warnings,
            images: deck.media.len(),
        };
        Ok((writer, report))
    }

    fn style(&self) -> ThemeStyle {
        self.options.theme.style()
    }

    fn build_slide(&self, frame: &Frame, document: &Document, deck: &mut DeckState) -> SlideContext {
        log::debug!(
            "building slide {} ({:?}, {} elements)",
            frame.number,
            frame.layout,
            frame.elements.len()
        );
        let mut slide = SlideContext::new(frame.layout);
        let metadata = &document.metadata;

        match frame.layout {
            Layout::TitleSlide => {
                if let Some(title) = frame.title.as_deref().or(metadata.title.as_deref()) {
                    slide.xml.placeholder(
                        PlaceholderKind::CenteredTitle,
                        None,
                        &[self.title_paragraph(title)],
                    );
                }
                let lines: Vec<Paragraph> = [
                    frame.subtitle.as_deref().or(metadata.subtitle.as_deref()),
                    metadata.author.as_deref(),
                    metadata.institute.as_deref(),
                    metadata.date.as_deref(),
                ]
                .into_iter()
                .flatten()
                .map(|line| Paragraph::plain(self.run(line, None)).centered())
                .collect();
                if !lines.is_empty() {
                    slide.xml.placeholder(PlaceholderKind::Subtitle, None, &lines);
                }
            }
            Layout::Blank => {
                if let Some(title) = &frame.title {
                    slide
                        .xml
                        .text_box(template::title_rect(), &[self.title_paragraph(title)]);
                }
            }
            _ => {
                if let Some(title) = &frame.title {
                    let mut paragraphs = vec![self.title_paragraph(title)];
                    if let Some(subtitle) = &frame.subtitle {
                        paragraphs.push(Paragraph::plain(
                            Run::new(subtitle.as_str())
                                .size(self.style().content_font_size)
                                .color(self.style().title_color),
                        ));
                    }
                    slide
                        .xml
                        .placeholder(PlaceholderKind::Title, None, &paragraphs);
                }
            }
        }

        for element in &frame.elements {
            self.place_element(element, frame, document.base_dir(), &mut slide, deck);
        }
        slide
    }

    fn place_element(
        &self,
        element: &Element,
        frame: &Frame,
        base_dir: Option<&Path>,
        slide: &mut SlideContext,
        deck: &mut DeckState,
    ) {
        let Some(area) = element.position else {
            log::debug!("frame {}: skipping unpositioned {}", frame.number, element.kind());
            return;
        };

        if element.is_text_like() {
            let paragraphs = self.text_paragraphs(&element.content);
            let rect = rect_of(&area);
            match slide.body_slot(&area) {
                Some(idx) => slide
                    .xml
                    .placeholder(PlaceholderKind::Body(idx), Some(rect), &paragraphs),
                None => slide.xml.text_box(rect, &paragraphs),
            }
            return;
        }

        match &element.content {
            Content::Image { path } => {
                if self.options.include_images {
                    self.place_image(path, element.size, area, frame, base_dir, slide, deck);
                } else {
                    log::debug!("frame {}: images disabled, skipping {}", frame.number, path);
                }
            }
            Content::Figure { path, caption } => {
                let caption_height = if caption.is_some() { TEXT_LINE_HEIGHT } else { 0.0 };
                let image_area = Position {
                    height: (area.height - caption_height).max(TEXT_LINE_HEIGHT),
                    ..area
                };
                match path {
                    Some(path) if self.options.include_images => {
                        self.place_image(path, element.size, image_area, frame, base_dir, slide, deck)
                    }
                    Some(path) => {
                        log::debug!("frame {}: images disabled, skipping {}", frame.number, path)
                    }
                    None => {}
                }
                if let Some(caption) = caption {
                    let rect = Rect::inches(area.x, image_area.bottom(), area.width, TEXT_LINE_HEIGHT);
                    slide.xml.text_box(rect, &[self.caption_paragraph(caption)]);
                }
            }
            Content::Table { rows, caption } => {
                let caption_height = if caption.is_some() { TEXT_LINE_HEIGHT } else { 0.0 };
                let table_height = (area.height - caption_height).max(TABLE_ROW_HEIGHT);
                if rows.is_empty() {
                    deck.warn(format!("frame {}: table has no rows, skipped", frame.number));
                } else {
                    let style = self.style();
                    slide.xml.table(
                        Rect::inches(area.x, area.y, area.width, table_height),
                        rows,
                        style.content_font_size,
                        style.content_color,
                    );
                }
                if let Some(caption) = caption {
                    let rect = Rect::inches(area.x, area.y + table_height, area.width, TEXT_LINE_HEIGHT);
                    slide.xml.text_box(rect, &[self.caption_paragraph(caption)]);
                }
            }
            Content::Equation { latex, kind } => {
                self.place_equation(latex, *kind, area, frame, slide, deck);
            }
            Content::Text { .. }
            | Content::Itemize { .. }
            | Content::Enumerate { .. }
            | Content::Block { .. } => {}
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn place_image(
        &self,
        path: &str,
        size: Option<Size>,
        area: Position,
        frame: &Frame,
        base_dir: Option<&Path>,
        slide: &mut SlideContext,
        deck: &mut DeckState,
    ) {
        let Some(resolved) = resolve_image(path, base_dir) else {
            deck.warn(format!("frame {}: image '{}' not found, skipped", frame.number, path));
            return;
        };
        let Some(format) = ImageFormat::from_path(&resolved) else {
            deck.warn(format!(
                "frame {}: image '{}' has an unsupported format, skipped",
                frame.number,
                resolved.display()
            ));
            return;
        };
        let bytes = match fs::read(&resolved) {
            Ok(bytes) => bytes,
            Err(e) => {
                deck.warn(format!(
                    "frame {}: cannot read image '{}': {}",
                    frame.number,
                    resolved.display(),
                    e
                ));
                return;
            }
        };

        let index = deck.media.add(&resolved, format, bytes);
        let max_width = size
            .and_then(|s| s.width)
            .unwrap_or(area.width)
            .min(area.width);
        let (width, height) = match deck.media.get(index).and_then(|p| p.pixels) {
            Some((w, h)) => fit(w as f64 / h as f64, max_width, area.height, None),
            None => (max_width, area.height),
        };

        let x = area.x + (area.width - width) / 2.0;
        let rel_id = slide.image_rel(index);
        slide
            .xml
            .picture(Rect::inches(x, area.y, width, height), &rel_id, path);
    }

    fn place_equation(
        &self,
        latex: &str,
        kind: EquationKind,
        area: Position,
        frame: &Frame,
        slide: &mut SlideContext,
        deck: &mut DeckState,
    ) {
        let scratch = self.options.scratch_dir();
        let rendered = match self.renderer.render(latex, kind, &scratch) {
            Ok(rendered) => rendered,
            Err(e) => {
                log::warn!("equation cache write failed: {}", e);
                None
            }
        };
        let image = rendered.and_then(|path| match fs::read(&path) {
            Ok(bytes) => Some((path, bytes)),
            Err(e) => {
                log::warn!("cannot read rendered equation {}: {}", path.display(), e);
                None
            }
        });

        let Some((path, bytes)) = image else {
            let source = latex.trim();
            deck.warn(format!(
                "frame {}: equation `{}` not rendered, showing LaTeX source",
                frame.number, source
            ));
            slide
                .xml
                .text_box(rect_of(&area), &[Paragraph::plain(self.run(source, None))]);
            return;
        };

        let index = deck.media.add(&path, ImageFormat::Png, bytes);
        let dpi = self.renderer.config().dpi.max(1) as f64;
        let (width, height) = match deck.media.get(index).and_then(|p| p.pixels) {
            Some((w, h)) => fit(
                w as f64 / h as f64,
                area.width,
                area.height,
                Some((w as f64 / dpi, h as f64 / dpi)),
            ),
            None => (area.width, area.height),
        };
        let x = match kind {
            EquationKind::Display => area.x + (area.width - width) / 2.0,
            EquationKind::Inline => area.x,
        };

        let rel_id = slide.image_rel(index);
        slide
            .xml
            .picture(Rect::inches(x, area.y, width, height), &rel_id, latex.trim());
    }

    /// Theme content color, or the source hint when colors are preserved.
    fn run_color(&self, hint: Option<&str>) -> String {
        match hint {
            Some(color) if self.options.preserve_colors => color.to_string(),
            _ => self.style().content_color.to_string(),
        }
    }

    fn run(&self, text: &str, hint: Option<&str>) -> Run {
        Run::new(text)
            .size(self.style().content_font_size)
            .color(self.run_color(hint))
    }

    fn title_paragraph(&self, title: &str) -> Paragraph {
        Paragraph::plain(Run::new(title).color(self.style().title_color))
    }

    fn caption_paragraph(&self, caption: &str) -> Paragraph {
        let style = self.style();
        Paragraph::plain(
            Run::new(caption)
                .italic()
                .size((style.content_font_size - 2.0).max(8.0))
                .color(style.content_color),
        )
        .centered()
    }

    fn text_paragraphs(&self, content: &Content) -> Vec<Paragraph> {
        match content {
            Content::Text { text, color } => text
                .lines()
                .map(|line| Paragraph::plain(self.run(line.trim(), color.as_deref())))
                .collect(),
            Content::Itemize { items } => {
                let mut paragraphs = Vec::new();
                self.list_paragraphs(items, 0, false, &mut paragraphs);
                paragraphs
            }
            Content::Enumerate { items } => {
                let mut paragraphs = Vec::new();
                self.list_paragraphs(items, 0, true, &mut paragraphs);
                paragraphs
            }
            Content::Block {
                title,
                body,
                flavor,
            } => {
                let style = self.style();
                let mut paragraphs = Vec::new();
                if let Some(title) = title {
                    let color = match flavor {
                        BlockFlavor::Alert => "C00000",
                        BlockFlavor::Example => "007A33",
                        BlockFlavor::Plain | BlockFlavor::Theorem => style.accent_color,
                    };
                    paragraphs.push(Paragraph::plain(
                        Run::new(title.as_str())
                            .bold()
                            .size(style.content_font_size)
                            .color(color),
                    ));
                }
                paragraphs.extend(
                    body.lines()
                        .map(|line| Paragraph::plain(self.run(line.trim(), None))),
                );
                paragraphs
            }
            Content::Equation { latex, .. } => {
                vec![Paragraph::plain(self.run(latex.trim(), None))]
            }
            Content::Image { .. } | Content::Table { .. } | Content::Figure { .. } => Vec::new(),
        }
    }

    fn list_paragraphs(
        &self,
        items: &[ListItem],
        level: u32,
        numbered: bool,
        out: &mut Vec<Paragraph>,
    ) {
        let bullet = if numbered {
            Bullet::Number { alpha: level > 0 }
        } else {
            Bullet::Char
        };

        for item in items {
            out.push(Paragraph::plain(self.run(&item.text, None)).with_bullet(bullet, level));
            for child in &item.children {
                match &child.content {
                    Content::Itemize { items } => self.list_paragraphs(items, level + 1, false, out),
                    Content::Enumerate { items } => self.list_paragraphs(items, level + 1, true, out),
                    other => out.extend(
                        self.text_paragraphs(other)
                            .into_iter()
                            .map(|p| p.with_bullet(Bullet::None, level + 1)),
                    ),
                }
            }
        }
    }
}

/// Deck-wide state accumulated while slides are built.
#[derive(Default)]
struct DeckState {
    media: MediaStore,
    warnings: Vec<String>,
}

impl DeckState {
    fn warn(&mut self, message: String) {
        log::warn!("{}", message);
        self.warnings.push(message);
    }
}

/// One slide under construction.
struct SlideContext {
    layout: Layout,
    xml: SlideXml,
    /// Media indices in relationship order (`rId2` onwards).
    media: Vec<usize>,
    body_used: [bool; 2],
}

impl SlideContext {
    fn new(layout: Layout) -> Self {
        Self {
            layout,
            xml: SlideXml::new(),
            media: Vec::new(),
            body_used: [false; 2],
        }
    }

    /// Free body placeholder for an element at `area`: the first text-like
    /// element of each column takes the column's placeholder.
    fn body_slot(&mut self, area: &Position) -> Option<u32> {
        if !self.layout.has_body_placeholder() {
            return None;
        }
        let column = match self.layout {
            Layout::TwoColumn if area.x > MARGIN_LEFT + 0.01 => 1,
            _ => 0,
        };
        if self.body_used[column] {
            return None;
        }
        self.body_used[column] = true;
        Some(column as u32 + 1)
    }

    fn image_rel(&mut self, index: usize) -> String {
        let slot = match self.media.iter().position(|m| *m == index) {
            Some(slot) => slot,
            None => {
                self.media.push(index);
                self.media.len() - 1
            }
        };
        format!("rId{}", slot + 2)
    }

    fn rels(&self, store: &MediaStore) -> String {
        let mut rels = vec![Relationship::new(
            "rId1",
            "slideLayout",
            format!(
                "../slideLayouts/slideLayout{}.xml",
                template::layout_number(self.layout)
            ),
        )];
        for (slot, index) in self.media.iter().enumerate() {
            if let Some(part) = store.get(*index) {
                rels.push(Relationship::new(
                    format!("rId{}", slot + 2),
                    "image",
                    format!("../media/{}", part.name),
                ));
            }
        }
        template::relationships_xml(&rels)
    }
}

fn needs_mapping(document: &Document) -> bool {
    document
        .frames
        .iter()
        .flat_map(|f| &f.elements)
        .any(|e| e.position.is_none())
}

fn rect_of(area: &Position) -> Rect {
    Rect::inches(area.x, area.y, area.width, area.height)
}

/// Locate an image, trying common extensions when the source omits one.
fn resolve_image(path: &str, base_dir: Option<&Path>) -> Option<PathBuf> {
    let requested = Path::new(path);
    let candidate = match base_dir {
        Some(dir) if requested.is_relative() => dir.join(requested),
        _ => requested.to_path_buf(),
    };

    if candidate.extension().is_some() {
        return candidate.is_file().then_some(candidate);
    }
    ["png", "jpg", "jpeg", "gif", "bmp", "svg"]
        .iter()
        .map(|ext| candidate.with_extension(ext))
        .find(|p| p.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_core::Theme;
    use forge_equation::{ProcessError, ProcessOutput, RendererConfig};
    use std::cell::Cell;
    use std::io::Cursor;

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

    /// Writes a 600x150 PNG for every dvipng call.
    #[derive(Default)]
    struct PngToolchain {
        latex_calls: Cell<usize>,
    }

    impl CommandRunner for PngToolchain {
        fn run(
            &self,
            program: &str,
            _args: &[&str],
            cwd: &Path,
        ) -> std::result::Result<ProcessOutput, ProcessError> {
            if program == "latex" {
                self.latex_calls.set(self.latex_calls.get() + 1);
                fs::write(cwd.join("eq.dvi"), b"dvi").unwrap();
            } else {
                fs::write(cwd.join("eq.png"), png(600, 150)).unwrap();
            }
            Ok(ProcessOutput {
                success: true,
                status: Some(0),
                stdout: String::new(),
                stderr: String::new(),
            })
        }
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        image::DynamicImage::new_rgb8(width, height)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn builder<R: CommandRunner>(dir: &Path, options: ConversionOptions, runner: R) -> SlideBuilder<R> {
        let cache = EquationCache::open(dir.join("cache")).unwrap();
        let options = options.with_scratch_dir(dir.join("scratch"));
        let renderer = EquationRenderer::new(cache, runner, RendererConfig::default());
        SlideBuilder::new(options, renderer)
    }

    fn frame(layout: Layout, title: Option<&str>, elements: Vec<Element>) -> Frame {
        let mut frame = Frame::new(1);
        frame.layout = layout;
        frame.title = title.map(str::to_string);
        frame.elements = elements;
        frame
    }

    fn build(builder: &SlideBuilder<impl CommandRunner>, document: &Document) -> (Vec<u8>, BuildReport) {
        let (cursor, report) = builder.build_to(document, Cursor::new(Vec::new())).unwrap();
        (cursor.into_inner(), report)
    }

    fn part(bytes: &[u8], name: &str) -> String {
        use std::io::Read;
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut content = String::new();
        archive.by_name(name).unwrap().read_to_string(&mut content).unwrap();
        content
    }

    #[test]
    fn test_equation_fallback_shows_source() {
        let dir = tempfile::tempdir().unwrap();
        let builder = builder(dir.path(), ConversionOptions::default(), NoToolchain);
        let mut document = Document::new();
        document.add_frame(frame(
            Layout::TitleAndContent,
            Some("Physics"),
            vec![Element::equation("E = mc^2", EquationKind::Inline)],
        ));

        let (bytes, report) = build(&builder, &document);
        assert_eq!(report.slides, 1);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.images, 0);
        assert!(part(&bytes, "ppt/slides/slide1.xml").contains("<a:t>E = mc^2</a:t>"));
        assert!(builder.renderer().cache().is_empty());
    }

    #[test]
    fn test_rendered_equation_is_sized_from_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let builder = builder(dir.path(), ConversionOptions::default(), PngToolchain::default());
        let mut document = Document::new();
        document.add_frame(frame(
            Layout::TitleAndContent,
            None,
            vec![Element::equation("x^2", EquationKind::Inline)],
        ));

        let (bytes, report) = build(&builder, &document);
        assert!(report.warnings.is_empty());
        assert_eq!(report.images, 1);

        // 600x150 px at 300 DPI is 2in x 0.5in
        let slide = part(&bytes, "ppt/slides/slide1.xml");
        assert!(slide.contains(r#"<a:ext cx="1828800" cy="457200"/>"#));
        assert!(slide.contains(r#"r:embed="rId2""#));
        let rels = part(&bytes, "ppt/slides/_rels/slide1.xml.rels");
        assert!(rels.contains("../media/image1.png"));
        assert!(part(&bytes, "[Content_Types].xml").contains(r#"Extension="png""#));
    }

    #[test]
    fn test_first_text_element_fills_body_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let builder = builder(dir.path(), ConversionOptions::default(), NoToolchain);
        let mut document = Document::new();
        document.add_frame(frame(
            Layout::TitleAndContent,
            Some("Agenda"),
            vec![Element::text("first"), Element::text("second")],
        ));

        let (bytes, _) = build(&builder, &document);
        let slide = part(&bytes, "ppt/slides/slide1.xml");
        assert!(slide.contains(r#"<p:ph type="title"/>"#));
        assert!(slide.contains(r#"<p:ph idx="1"/>"#));
        assert_eq!(slide.matches(r#"txBox="1""#).count(), 1);
        // body placeholder sits at the mapped position
        assert!(slide.contains(r#"<a:off x="914400" y="2286000"/>"#));
    }

    #[test]
    fn test_missing_image_is_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let builder = builder(dir.path(), ConversionOptions::default(), NoToolchain);
        let mut document = Document::new();
        document.add_frame(frame(
            Layout::TitleAndContent,
            None,
            vec![Element::new(Content::Image {
                path: "missing/plot.png".into(),
            })],
        ));

        let (_, report) = build(&builder, &document);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("missing/plot.png"));
    }

    #[test]
    fn test_images_disabled_skips_silently() {
        let dir = tempfile::tempdir().unwrap();
        let options = ConversionOptions::default().with_include_images(false);
        let builder = builder(dir.path(), options, NoToolchain);
        let mut document = Document::new();
        document.add_frame(frame(
            Layout::TitleAndContent,
            None,
            vec![Element::new(Content::Figure {
                path: Some("missing.png".into()),
                caption: Some("A plot".into()),
            })],
        ));

        let (bytes, report) = build(&builder, &document);
        assert!(report.warnings.is_empty());
        let slide = part(&bytes, "ppt/slides/slide1.xml");
        assert!(!slide.contains("<p:pic>"));
        assert!(slide.contains("<a:t>A plot</a:t>"));
    }

    #[test]
    fn test_image_is_embedded_relative_to_source() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("talk/img")).unwrap();
        fs::write(dir.path().join("talk/img/plot.png"), png(400, 200)).unwrap();

        let builder = builder(dir.path(), ConversionOptions::default(), NoToolchain);
        let mut document = Document::new();
        document.source_path = Some(dir.path().join("talk/slides.tex"));
        document.add_frame(frame(
            Layout::TitleAndContent,
            None,
            vec![
                Element::new(Content::Image {
                    path: "img/plot".into(),
                }),
                Element::new(Content::Image {
                    path: "img/plot.png".into(),
                }),
            ],
        ));

        let (bytes, report) = build(&builder, &document);
        assert!(report.warnings.is_empty());
        assert_eq!(report.images, 1);
        let slide = part(&bytes, "ppt/slides/slide1.xml");
        assert_eq!(slide.matches("<p:pic>").count(), 2);
        // 2:1 image fitted into an 8in x 4in box
        assert!(slide.contains(r#"<a:ext cx="7315200" cy="3657600"/>"#));
    }

    #[test]
    fn test_colors_follow_preserve_flag() {
        let dir = tempfile::tempdir().unwrap();
        let colored = Element::new(Content::Text {
            text: "warm".into(),
            color: Some("FF0000".into()),
        });
        let mut document = Document::new();
        document.add_frame(frame(Layout::TitleAndContent, None, vec![colored]));

        let plain = builder(dir.path(), ConversionOptions::default(), NoToolchain);
        let (bytes, _) = build(&plain, &document);
        assert!(!part(&bytes, "ppt/slides/slide1.xml").contains("FF0000"));

        let options = ConversionOptions::default()
            .with_preserve_colors(true)
            .with_theme(Theme::Professional);
        let preserving = builder(dir.path(), options, NoToolchain);
        let (bytes, _) = build(&preserving, &document);
        assert!(part(&bytes, "ppt/slides/slide1.xml").contains(r#"<a:srgbClr val="FF0000"/>"#));
    }

    #[test]
    fn test_title_slide_uses_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let builder = builder(dir.path(), ConversionOptions::default(), NoToolchain);
        let mut document = Document::new();
        document.metadata.title = Some("Deck".into());
        document.metadata.author = Some("Ada".into());
        document.add_frame(frame(Layout::TitleSlide, None, Vec::new()));

        let (bytes, _) = build(&builder, &document);
        let slide = part(&bytes, "ppt/slides/slide1.xml");
        assert!(slide.contains(r#"<p:ph type="ctrTitle"/>"#));
        assert!(slide.contains("<a:t>Deck</a:t>"));
        assert!(slide.contains("<a:t>Ada</a:t>"));
        assert!(part(&bytes, "ppt/slides/_rels/slide1.xml.rels").contains("slideLayout1.xml"));
        assert!(part(&bytes, "docProps/core.xml").contains("<dc:creator>Ada</dc:creator>"));
    }

    #[test]
    fn test_nested_lists_indent() {
        let dir = tempfile::tempdir().unwrap();
        let builder = builder(dir.path(), ConversionOptions::default(), NoToolchain);
        let mut outer = ListItem::new("outer");
        outer.children.push(Element::new(Content::Enumerate {
            items: vec![ListItem::new("inner")],
        }));
        let mut document = Document::new();
        document.add_frame(frame(
            Layout::TitleAndContent,
            None,
            vec![Element::new(Content::Itemize { items: vec![outer] })],
        ));

        let (bytes, _) = build(&builder, &document);
        let slide = part(&bytes, "ppt/slides/slide1.xml");
        assert!(slide.contains("buChar"));
        assert!(slide.contains(r#"lvl="1""#));
        assert!(slide.contains("alphaLcParenR"));
    }
}
