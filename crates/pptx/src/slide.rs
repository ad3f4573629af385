//! Slide part XML: placeholders, text boxes, pictures and tables.

use crate::template::{NS_A, NS_P, NS_R, XML_DECLARATION};
use std::borrow::Cow;

/// EMUs per inch.
pub const EMU_PER_INCH: f64 = 914_400.0;

/// Convert inches to EMUs.
pub fn emu(inches: f64) -> i64 {
    (inches * EMU_PER_INCH).round() as i64
}

/// Escape text for XML content and attribute values.
pub fn escape(text: &str) -> Cow<'_, str> {
    quick_xml::escape::escape(text)
}

/// A shape box in EMUs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i64,
    pub y: i64,
    pub cx: i64,
    pub cy: i64,
}

impl Rect {
    pub fn inches(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x: emu(x),
            y: emu(y),
            cx: emu(width).max(1),
            cy: emu(height).max(1),
        }
    }

    pub fn height_inches(&self) -> f64 {
        self.cy as f64 / EMU_PER_INCH
    }

    /// `a:xfrm` for this box.
    pub fn xfrm(&self) -> String {
        format!(
            r#"<a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm>"#,
            self.x, self.y, self.cx, self.cy
        )
    }

    /// `p:xfrm` used by graphic frames.
    fn frame_xfrm(&self) -> String {
        format!(
            r#"<p:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></p:xfrm>"#,
            self.x, self.y, self.cx, self.cy
        )
    }
}

/// Paragraph bullet style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bullet {
    None,
    Char,
    /// Auto-numbered, `alpha` for nested enumerations.
    Number { alpha: bool },
}

/// One text run.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    /// RRGGBB; `None` inherits from the placeholder or master.
    pub color: Option<String>,
    /// Points; `None` inherits.
    pub size: Option<f64>,
}

impl Run {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
            italic: false,
            color: None,
            size: None,
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn size(mut self, points: f64) -> Self {
        self.size = Some(points);
        self
    }

    fn to_xml(&self) -> String {
        let mut attrs = String::from(r#"lang="en-US""#);
        if let Some(size) = self.size {
            attrs.push_str(&format!(r#" sz="{}""#, (size * 100.0).round() as u32));
        }
        if self.bold {
            attrs.push_str(r#" b="1""#);
        }
        if self.italic {
            attrs.push_str(r#" i="1""#);
        }
        attrs.push_str(r#" dirty="0""#);

        let props = match &self.color {
            Some(color) => format!(
                r#"<a:rPr {}><a:solidFill><a:srgbClr val="{}"/></a:solidFill></a:rPr>"#,
                attrs, color
            ),
            None => format!("<a:rPr {}/>", attrs),
        };
        format!("<a:r>{}<a:t>{}</a:t></a:r>", props, escape(&self.text))
    }
}

/// A paragraph of runs at an indent level.
#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    pub runs: Vec<Run>,
    pub level: u32,
    pub bullet: Bullet,
    pub centered: bool,
}

impl Paragraph {
    pub fn new(runs: Vec<Run>) -> Self {
        Self {
            runs,
            level: 0,
            bullet: Bullet::None,
            centered: false,
        }
    }

    pub fn plain(run: Run) -> Self {
        Self::new(vec![run])
    }

    pub fn with_bullet(mut self, bullet: Bullet, level: u32) -> Self {
        self.bullet = bullet;
        self.level = level;
        self
    }

    pub fn centered(mut self) -> Self {
        self.centered = true;
        self
    }

    fn to_xml(&self) -> String {
        let mut attrs = String::new();
        if self.level > 0 {
            attrs.push_str(&format!(r#" lvl="{}""#, self.level.min(8)));
        }
        let bullet = match self.bullet {
            Bullet::None => {
                attrs.push_str(r#" marL="0" indent="0""#);
                "<a:buNone/>".to_string()
            }
            Bullet::Char => {
                attrs.push_str(&format!(
                    r#" marL="{}" indent="-285750""#,
                    285750 * (self.level as i64 + 1)
                ));
                r#"<a:buFont typeface="Arial"/><a:buChar char="&#8226;"/>"#.to_string()
            }
            Bullet::Number { alpha } => {
                attrs.push_str(&format!(
                    r#" marL="{}" indent="-342900""#,
                    342900 * (self.level as i64 + 1)
                ));
                let scheme = if alpha { "alphaLcParenR" } else { "arabicPeriod" };
                format!(r#"<a:buFont typeface="+mj-lt"/><a:buAutoNum type="{}"/>"#, scheme)
            }
        };
        if self.centered {
            attrs.push_str(r#" algn="ctr""#);
        }

        let mut xml = format!("<a:p><a:pPr{}>{}</a:pPr>", attrs, bullet);
        for run in &self.runs {
            xml.push_str(&run.to_xml());
        }
        xml.push_str("</a:p>");
        xml
    }
}

fn text_body(paragraphs: &[Paragraph], body_pr: &str) -> String {
    let mut xml = format!("<p:txBody>{}<a:lstStyle/>", body_pr);
    if paragraphs.is_empty() {
        xml.push_str(r#"<a:p><a:endParaRPr lang="en-US"/></a:p>"#);
    }
    for paragraph in paragraphs {
        xml.push_str(&paragraph.to_xml());
    }
    xml.push_str("</p:txBody>");
    xml
}

/// Placeholder roles a slide can fill from its layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderKind {
    Title,
    CenteredTitle,
    Subtitle,
    /// Content placeholder with layout index (1 or 2).
    Body(u32),
}

impl PlaceholderKind {
    fn ph(self) -> String {
        match self {
            PlaceholderKind::Title => r#"<p:ph type="title"/>"#.to_string(),
            PlaceholderKind::CenteredTitle => r#"<p:ph type="ctrTitle"/>"#.to_string(),
            PlaceholderKind::Subtitle => r#"<p:ph type="subTitle" idx="1"/>"#.to_string(),
            PlaceholderKind::Body(idx) => format!(r#"<p:ph idx="{}"/>"#, idx),
        }
    }

    fn name(self) -> &'static str {
        match self {
            PlaceholderKind::Title | PlaceholderKind::CenteredTitle => "Title",
            PlaceholderKind::Subtitle => "Subtitle",
            PlaceholderKind::Body(_) => "Content Placeholder",
        }
    }
}

/// Accumulates the shape tree of one slide.
#[derive(Debug)]
pub struct SlideXml {
    shapes: Vec<String>,
    next_id: u32,
}

impl Default for SlideXml {
    fn default() -> Self {
        Self::new()
    }
}

impl SlideXml {
    pub fn new() -> Self {
        Self {
            shapes: Vec::new(),
            // id 1 is the group shape
            next_id: 2,
        }
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Fill a layout placeholder. `rect` overrides the layout's position.
    pub fn placeholder(&mut self, kind: PlaceholderKind, rect: Option<Rect>, paragraphs: &[Paragraph]) {
        let id = self.allocate_id();
        let sp_pr = match rect {
            Some(rect) => format!("<p:spPr>{}</p:spPr>", rect.xfrm()),
            None => "<p:spPr/>".to_string(),
        };
        self.shapes.push(format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{}" name="{} {}"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr>{}</p:nvPr></p:nvSpPr>{}{}</p:sp>"#,
            id,
            kind.name(),
            id - 1,
            kind.ph(),
            sp_pr,
            text_body(paragraphs, "<a:bodyPr><a:normAutofit/></a:bodyPr>")
        ));
    }

    /// Free-standing text box.
    pub fn text_box(&mut self, rect: Rect, paragraphs: &[Paragraph]) {
        let id = self.allocate_id();
        self.shapes.push(format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{}" name="TextBox {}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr>{}<a:prstGeom prst="rect"><a:avLst/></a:prstGeom><a:noFill/></p:spPr>{}</p:sp>"#,
            id,
            id - 1,
            rect.xfrm(),
            text_body(paragraphs, r#"<a:bodyPr wrap="square" rtlCol="0"><a:spAutoFit/></a:bodyPr>"#)
        ));
    }

    /// Picture referencing an image relationship.
    pub fn picture(&mut self, rect: Rect, rel_id: &str, description: &str) {
        let id = self.allocate_id();
        self.shapes.push(format!(
            r#"<p:pic><p:nvPicPr><p:cNvPr id="{}" name="Picture {}" descr="{}"/><p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr><p:nvPr/></p:nvPicPr><p:blipFill><a:blip r:embed="{}"/><a:stretch><a:fillRect/></a:stretch></p:blipFill><p:spPr>{}<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr></p:pic>"#,
            id,
            id - 1,
            escape(description),
            rel_id,
            rect.xfrm()
        ));
    }

    /// Native table; short rows are padded to the widest row.
    pub fn table(&mut self, rect: Rect, rows: &[Vec<String>], font_size: f64, color: &str) {
        let columns = rows.iter().map(Vec::len).max().unwrap_or(0).max(1);
        let row_count = rows.len().max(1) as i64;
        let column_width = rect.cx / columns as i64;
        let row_height = rect.cy / row_count;

        let id = self.allocate_id();
        let mut xml = format!(
            r#"<p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="{}" name="Table {}"/><p:cNvGraphicFramePr><a:graphicFrameLocks noGrp="1"/></p:cNvGraphicFramePr><p:nvPr/></p:nvGraphicFramePr>{}<a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/table"><a:tbl><a:tblPr firstRow="1" bandRow="1"/><a:tblGrid>"#,
            id,
            id - 1,
            rect.frame_xfrm()
        );
        for _ in 0..columns {
            xml.push_str(&format!(r#"<a:gridCol w="{}"/>"#, column_width));
        }
        xml.push_str("</a:tblGrid>");

        for (index, row) in rows.iter().enumerate() {
            xml.push_str(&format!(r#"<a:tr h="{}">"#, row_height));
            for column in 0..columns {
                let text = row.get(column).map(String::as_str).unwrap_or_default();
                let mut run = Run::new(text).size(font_size).color(color);
                if index == 0 {
                    run = run.bold();
                }
                xml.push_str(&format!(
                    "<a:tc><a:txBody><a:bodyPr/><a:lstStyle/>{}</a:txBody><a:tcPr/></a:tc>",
                    Paragraph::plain(run).to_xml()
                ));
            }
            xml.push_str("</a:tr>");
        }
        xml.push_str("</a:tbl></a:graphicData></a:graphic></p:graphicFrame>");
        self.shapes.push(xml);
    }

    /// Complete slide part.
    pub fn finish(&self) -> String {
        let mut xml = format!(
            r#"{}<p:sld xmlns:a="{}" xmlns:r="{}" xmlns:p="{}"><p:cSld><p:spTree>"#,
            XML_DECLARATION, NS_A, NS_R, NS_P
        );
        xml.push_str(r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#);
        for shape in &self.shapes {
            xml.push_str(shape);
        }
        xml.push_str("</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>");
        xml
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emu_conversion() {
        assert_eq!(emu(1.0), 914400);
        assert_eq!(emu(2.5), 2286000);
        assert_eq!(emu(10.0), 9144000);
    }

    #[test]
    fn test_text_box_escapes_and_positions() {
        let mut slide = SlideXml::new();
        slide.text_box(
            Rect::inches(1.0, 2.5, 8.0, 0.5),
            &[Paragraph::plain(Run::new("a < b & c").color("FF0000").size(18.0))],
        );
        let xml = slide.finish();

        assert!(xml.contains("<a:t>a &lt; b &amp; c</a:t>"));
        assert!(xml.contains(r#"<a:off x="914400" y="2286000"/>"#));
        assert!(xml.contains(r#"sz="1800""#));
        assert!(xml.contains(r#"<a:srgbClr val="FF0000"/>"#));
        assert!(xml.contains(r#"txBox="1""#));
    }

    #[test]
    fn test_shape_ids_are_unique() {
        let mut slide = SlideXml::new();
        slide.placeholder(PlaceholderKind::Title, None, &[Paragraph::plain(Run::new("T"))]);
        slide.picture(Rect::inches(0.0, 0.0, 1.0, 1.0), "rId2", "eq");
        slide.text_box(Rect::inches(0.0, 0.0, 1.0, 1.0), &[]);
        let xml = slide.finish();

        assert_eq!(slide.shape_count(), 3);
        assert!(xml.contains(r#"id="2" name="Title 1""#));
        assert!(xml.contains(r#"id="3" name="Picture 2""#));
        assert!(xml.contains(r#"id="4" name="TextBox 3""#));
        assert!(xml.contains(r#"r:embed="rId2""#));
    }

    #[test]
    fn test_bullets() {
        let item = Paragraph::plain(Run::new("x")).with_bullet(Bullet::Char, 1);
        let xml = item.to_xml();
        assert!(xml.contains(r#"lvl="1""#));
        assert!(xml.contains("buChar"));

        let numbered = Paragraph::plain(Run::new("y")).with_bullet(Bullet::Number { alpha: true }, 1);
        assert!(numbered.to_xml().contains("alphaLcParenR"));

        let plain = Paragraph::plain(Run::new("z")).to_xml();
        assert!(plain.contains("<a:buNone/>"));
    }

    #[test]
    fn test_table_pads_rows() {
        let mut slide = SlideXml::new();
        let rows = vec![
            vec!["A".to_string(), "B".to_string()],
            vec!["1".to_string()],
        ];
        slide.table(Rect::inches(1.0, 2.5, 8.0, 0.8), &rows, 18.0, "000000");
        let xml = slide.finish();

        assert_eq!(xml.matches("<a:gridCol").count(), 2);
        assert_eq!(xml.matches("<a:tc>").count(), 4);
        assert!(xml.contains(r#"b="1""#));
    }
}
