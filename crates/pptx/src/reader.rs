//! Reads a `.pptx` back into a per-slide summary.
//!
//! Used to inspect generated decks (the CLI's `--summary` and the
//! integration tests). This is not a reverse converter.

use forge_core::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use zip::ZipArchive;

/// A deck as read back from disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeckSummary {
    pub title: Option<String>,
    pub author: Option<String>,
    pub slides: Vec<SlideSummary>,
}

/// One slide's visible content.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SlideSummary {
    /// 1-based position in the deck.
    pub number: usize,
    /// Layout part the slide uses, e.g. `slideLayout2.xml`.
    pub layout: Option<String>,
    /// Shapes with text, in document order.
    pub shapes: Vec<ShapeSummary>,
    pub picture_count: usize,
    pub table_count: usize,
}

impl SlideSummary {
    /// Text of the title placeholder, if any.
    pub fn title(&self) -> Option<&str> {
        self.shapes
            .iter()
            .find(|s| matches!(s.placeholder.as_deref(), Some("title") | Some("ctrTitle")))
            .map(|s| s.text.as_str())
    }

    /// Whether any shape's text equals `text` exactly.
    pub fn has_text(&self, text: &str) -> bool {
        self.shapes.iter().any(|s| s.text == text)
    }
}

/// Text of one shape and its offset in EMUs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ShapeSummary {
    pub text: String,
    /// Offset from the shape's own transform; `None` when inherited from the layout.
    pub x: Option<i64>,
    pub y: Option<i64>,
    /// Placeholder type (`title`, `ctrTitle`, `subTitle`, `body`).
    pub placeholder: Option<String>,
}

/// Reader for generated PPTX packages.
pub struct DeckReader;

impl DeckReader {
    pub fn new() -> Self {
        Self
    }

    /// Read a deck from a file on disk.
    pub fn read_file(&self, path: &Path) -> Result<DeckSummary> {
        let file = File::open(path)?;
        self.read(BufReader::new(file))
    }

    /// Read a deck from any seekable reader.
    pub fn read<R: Read + Seek>(&self, reader: R) -> Result<DeckSummary> {
        let mut archive = ZipArchive::new(reader)
            .map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;

        let mut deck = DeckSummary::default();
        if let Ok(core) = self.read_file_from_archive(&mut archive, "docProps/core.xml") {
            deck.title = element_text(&core, b"title");
            deck.author = element_text(&core, b"creator");
        }

        for (index, slide_path) in self.slide_order(&mut archive)?.iter().enumerate() {
            let content = self.read_file_from_archive(&mut archive, slide_path)?;
            let mut slide = self.parse_slide(&content)?;
            slide.number = index + 1;
            slide.layout = self.slide_layout(&mut archive, slide_path);
            deck.slides.push(slide);
        }

        Ok(deck)
    }

    /// Slide part paths ordered by slide number.
    fn slide_order<R: Read + Seek>(&self, archive: &mut ZipArchive<R>) -> Result<Vec<String>> {
        let rels = self.read_file_from_archive(archive, "ppt/_rels/presentation.xml.rels")?;
        let mut slides: Vec<(String, Option<usize>)> = relationships(&rels)?
            .into_iter()
            .filter(|(kind, _)| kind.ends_with("/slide"))
            .map(|(_, target)| {
                let order = extract_slide_number(&target);
                let path = match target.strip_prefix('/') {
                    Some(absolute) => absolute.to_string(),
                    None => format!("ppt/{}", target),
                };
                (path, order)
            })
            .collect();

        slides.sort_by(|a, b| match (a.1, b.1) {
            (Some(na), Some(nb)) => na.cmp(&nb),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.0.cmp(&b.0),
        });

        Ok(slides.into_iter().map(|(path, _)| path).collect())
    }

    /// File name of the layout a slide points at.
    fn slide_layout<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        slide_path: &str,
    ) -> Option<String> {
        let (dir, file) = slide_path.rsplit_once('/')?;
        let rels_path = format!("{}/_rels/{}.rels", dir, file);
        let rels = self.read_file_from_archive(archive, &rels_path).ok()?;
        relationships(&rels)
            .ok()?
            .into_iter()
            .find(|(kind, _)| kind.ends_with("/slideLayout"))
            .and_then(|(_, target)| target.rsplit('/').next().map(str::to_string))
    }

    /// Collect text shapes, pictures and tables from slide XML.
    fn parse_slide(&self, xml_content: &str) -> Result<SlideSummary> {
        let mut slide = SlideSummary::default();
        let mut reader = Reader::from_str(xml_content);
        reader.trim_text(true);

        let mut current_shape: Option<ShapeSummary> = None;
        let mut in_paragraph = false;
        let mut current_text = String::new();

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => match local_name(e.name().as_ref()) {
                    b"sp" | b"graphicFrame" => {
                        current_shape = Some(ShapeSummary::default());
                        current_text.clear();
                    }
                    b"pic" => slide.picture_count += 1,
                    b"tbl" => slide.table_count += 1,
                    b"p" if current_shape.is_some() => {
                        in_paragraph = true;
                        if !current_text.is_empty() {
                            current_text.push('\n');
                        }
                    }
                    b"off" => record_offset(e, current_shape.as_mut()),
                    _ => {}
                },
                Ok(Event::Empty(ref e)) => match local_name(e.name().as_ref()) {
                    b"off" => record_offset(e, current_shape.as_mut()),
                    b"ph" => {
                        if let Some(shape) = current_shape.as_mut() {
                            shape.placeholder = Some(
                                attribute(e, b"type").unwrap_or_else(|| "body".to_string()),
                            );
                        }
                    }
                    _ => {}
                },
                Ok(Event::Text(ref e)) => {
                    if in_paragraph {
                        let text = e.unescape().unwrap_or_default();
                        current_text.push_str(&text);
                    }
                }
                Ok(Event::End(ref e)) => match local_name(e.name().as_ref()) {
                    b"sp" | b"graphicFrame" => {
                        if let Some(mut shape) = current_shape.take() {
                            shape.text = current_text.trim().to_string();
                            if !shape.text.is_empty() {
                                slide.shapes.push(shape);
                            }
                        }
                        current_text.clear();
                        in_paragraph = false;
                    }
                    b"p" => in_paragraph = false,
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::XmlError(format!("Error parsing slide: {}", e)));
                }
                _ => {}
            }
        }

        Ok(slide)
    }

    fn read_file_from_archive<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        path: &str,
    ) -> Result<String> {
        let mut file = archive
            .by_name(path)
            .map_err(|e| Error::ZipError(format!("File not found in archive '{}': {}", path, e)))?;

        let mut content = String::new();
        file.read_to_string(&mut content)
            .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", path, e)))?;

        Ok(content)
    }
}

impl Default for DeckReader {
    fn default() -> Self {
        Self::new()
    }
}

/// `(Type, Target)` pairs of a relationships part.
fn relationships(xml: &str) -> Result<Vec<(String, String)>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut rels = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"Relationship" =>
            {
                if let (Some(kind), Some(target)) = (attribute(e, b"Type"), attribute(e, b"Target")) {
                    rels.push((kind, target));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing relationships: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(rels)
}

/// Text content of the first element with local name `name`.
fn element_text(xml: &str, name: &[u8]) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut inside = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if local_name(e.name().as_ref()) == name => inside = true,
            Ok(Event::Text(ref e)) if inside => {
                return e.unescape().ok().map(|t| t.into_owned());
            }
            Ok(Event::End(_)) if inside => return None,
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

fn attribute(element: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}

fn record_offset(element: &BytesStart<'_>, shape: Option<&mut ShapeSummary>) {
    let Some(shape) = shape else {
        return;
    };
    if let Some(x) = attribute(element, b"x").and_then(|v| v.parse().ok()) {
        shape.x = Some(x);
    }
    if let Some(y) = attribute(element, b"y").and_then(|v| v.parse().ok()) {
        shape.y = Some(y);
    }
}

/// Extract the local name from a potentially namespaced XML element name.
fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

/// Extract a slide number from a string like "rId2" or "slides/slide3.xml".
fn extract_slide_number(s: &str) -> Option<usize> {
    let s = s.trim_end_matches(".xml").trim_end_matches(".rels");

    let digits: String = s.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let digits: String = digits.chars().rev().collect();
    digits.parse().ok()
}
