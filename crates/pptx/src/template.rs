//! Fixed package parts: content types, relationships, presentation, master,
//! layouts, theme and document properties.
//!
//! The slide is 10" x 7.5" (4:3). Layout placeholder boxes line up with the
//! content mapper's margins so mapped positions and placeholders agree.

use crate::slide::{emu, escape, Rect};
use forge_core::mapper::{CONTENT_WIDTH, MARGIN_LEFT, MARGIN_TOP, SLIDE_HEIGHT, SLIDE_WIDTH};
use forge_core::{Layout, Metadata, ThemeStyle};

pub const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
pub const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub const NS_P: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";

const NS_PACKAGE_RELS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const REL_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const CT_PML: &str = "application/vnd.openxmlformats-officedocument.presentationml";

pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// Application name recorded in document properties.
pub const APPLICATION: &str = "slide-forge";

/// Relationship type URI for `kind`, e.g. `slide` or `image`.
pub fn rel_type(kind: &str) -> String {
    format!("{}/{}", REL_BASE, kind)
}

/// 1-based layout part number for a layout kind.
pub fn layout_number(layout: Layout) -> usize {
    Layout::ALL
        .iter()
        .position(|l| *l == layout)
        .map(|i| i + 1)
        .unwrap_or(2)
}

fn layout_info(layout: Layout) -> (&'static str, &'static str) {
    match layout {
        Layout::TitleSlide => ("title", "Title Slide"),
        Layout::TitleAndContent => ("obj", "Title and Content"),
        Layout::SectionHeader => ("secHead", "Section Header"),
        Layout::TwoColumn => ("twoObj", "Two Content"),
        Layout::Blank => ("blank", "Blank"),
    }
}

/// Title box shared by content layouts.
pub fn title_rect() -> Rect {
    Rect::inches(0.5, 0.5, SLIDE_WIDTH - 1.0, 1.5)
}

/// Body box shared by content layouts.
pub fn body_rect() -> Rect {
    Rect::inches(MARGIN_LEFT, MARGIN_TOP, CONTENT_WIDTH, SLIDE_HEIGHT - MARGIN_TOP - 0.5)
}

/// A single `Relationship` element.
pub struct Relationship {
    pub id: String,
    pub kind: String,
    pub target: String,
}

impl Relationship {
    pub fn new(id: impl Into<String>, kind: &str, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: rel_type(kind),
            target: target.into(),
        }
    }
}

pub fn relationships_xml(rels: &[Relationship]) -> String {
    let mut xml = format!(
        r#"{}<Relationships xmlns="{}">"#,
        XML_DECLARATION, NS_PACKAGE_RELS
    );
    for rel in rels {
        xml.push_str(&format!(
            r#"<Relationship Id="{}" Type="{}" Target="{}"/>"#,
            rel.id,
            rel.kind,
            escape(&rel.target)
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

/// `[Content_Types].xml` for `slide_count` slides and the given media
/// extensions (with their MIME types).
pub fn content_types_xml(slide_count: usize, media: &[(&str, &str)]) -> String {
    let mut xml = format!(
        r#"{}<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
        XML_DECLARATION
    );
    xml.push_str(r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#);
    xml.push_str(r#"<Default Extension="xml" ContentType="application/xml"/>"#);
    for (extension, mime) in media {
        xml.push_str(&format!(
            r#"<Default Extension="{}" ContentType="{}"/>"#,
            extension, mime
        ));
    }

    let mut overrides = vec![
        ("/ppt/presentation.xml".to_string(), format!("{}.presentation.main+xml", CT_PML)),
        ("/ppt/presProps.xml".to_string(), format!("{}.presProps+xml", CT_PML)),
        ("/ppt/viewProps.xml".to_string(), format!("{}.viewProps+xml", CT_PML)),
        ("/ppt/tableStyles.xml".to_string(), format!("{}.tableStyles+xml", CT_PML)),
        (
            "/ppt/slideMasters/slideMaster1.xml".to_string(),
            format!("{}.slideMaster+xml", CT_PML),
        ),
        (
            "/ppt/theme/theme1.xml".to_string(),
            "application/vnd.openxmlformats-officedocument.theme+xml".to_string(),
        ),
        (
            "/docProps/core.xml".to_string(),
            "application/vnd.openxmlformats-package.core-properties+xml".to_string(),
        ),
        (
            "/docProps/app.xml".to_string(),
            "application/vnd.openxmlformats-officedocument.extended-properties+xml".to_string(),
        ),
    ];
    for n in 1..=Layout::ALL.len() {
        overrides.push((
            format!("/ppt/slideLayouts/slideLayout{}.xml", n),
            format!("{}.slideLayout+xml", CT_PML),
        ));
    }
    for n in 1..=slide_count {
        overrides.push((
            format!("/ppt/slides/slide{}.xml", n),
            format!("{}.slide+xml", CT_PML),
        ));
    }

    for (part, content_type) in overrides {
        xml.push_str(&format!(
            r#"<Override PartName="{}" ContentType="{}"/>"#,
            part, content_type
        ));
    }
    xml.push_str("</Types>");
    xml
}

pub fn root_rels_xml() -> String {
    relationships_xml(&[
        Relationship::new("rId1", "officeDocument", "ppt/presentation.xml"),
        Relationship {
            id: "rId2".to_string(),
            kind: "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties"
                .to_string(),
            target: "docProps/core.xml".to_string(),
        },
        Relationship::new("rId3", "extended-properties", "docProps/app.xml"),
    ])
}

/// Relationship id of slide `n` (1-based) in the presentation part.
pub fn slide_rel_id(n: usize) -> String {
    format!("rId{}", n + 1)
}

pub fn presentation_xml(slide_count: usize) -> String {
    let mut xml = format!(
        r#"{}<p:presentation xmlns:a="{}" xmlns:r="{}" xmlns:p="{}" saveSubsetFonts="1">"#,
        XML_DECLARATION, NS_A, NS_R, NS_P
    );
    xml.push_str(r#"<p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst>"#);
    if slide_count > 0 {
        xml.push_str("<p:sldIdLst>");
        for n in 1..=slide_count {
            xml.push_str(&format!(
                r#"<p:sldId id="{}" r:id="{}"/>"#,
                255 + n,
                slide_rel_id(n)
            ));
        }
        xml.push_str("</p:sldIdLst>");
    }
    xml.push_str(&format!(
        r#"<p:sldSz cx="{}" cy="{}" type="screen4x3"/><p:notesSz cx="6858000" cy="9144000"/>"#,
        emu(SLIDE_WIDTH),
        emu(SLIDE_HEIGHT)
    ));
    xml.push_str("</p:presentation>");
    xml
}

pub fn presentation_rels_xml(slide_count: usize) -> String {
    let mut rels = vec![Relationship::new(
        "rId1",
        "slideMaster",
        "slideMasters/slideMaster1.xml",
    )];
    for n in 1..=slide_count {
        rels.push(Relationship::new(
            slide_rel_id(n),
            "slide",
            format!("slides/slide{}.xml", n),
        ));
    }
    let next = slide_count + 2;
    rels.push(Relationship::new(format!("rId{}", next), "presProps", "presProps.xml"));
    rels.push(Relationship::new(format!("rId{}", next + 1), "viewProps", "viewProps.xml"));
    rels.push(Relationship::new(format!("rId{}", next + 2), "theme", "theme/theme1.xml"));
    rels.push(Relationship::new(
        format!("rId{}", next + 3),
        "tableStyles",
        "tableStyles.xml",
    ));
    relationships_xml(&rels)
}

pub fn pres_props_xml() -> String {
    format!(
        r#"{}<p:presentationPr xmlns:a="{}" xmlns:r="{}" xmlns:p="{}"/>"#,
        XML_DECLARATION, NS_A, NS_R, NS_P
    )
}

pub fn view_props_xml() -> String {
    format!(
        r#"{}<p:viewPr xmlns:a="{}" xmlns:r="{}" xmlns:p="{}"><p:gridSpacing cx="76200" cy="76200"/></p:viewPr>"#,
        XML_DECLARATION, NS_A, NS_R, NS_P
    )
}

pub fn table_styles_xml() -> String {
    format!(
        r#"{}<a:tblStyleLst xmlns:a="{}" def="{{5C22544A-7EE6-4342-B048-85BDC9FD1C3A}}"/>"#,
        XML_DECLARATION, NS_A
    )
}

fn group_shape_header() -> &'static str {
    r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#
}

/// Placeholder shape for masters and layouts.
fn placeholder_xml(id: u32, name: &str, ph: &str, rect: Rect) -> String {
    format!(
        concat!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{}" name="{}"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr>"#,
            r#"<p:nvPr><p:ph {}/></p:nvPr></p:nvSpPr>"#,
            r#"<p:spPr>{}</p:spPr>"#,
            r#"<p:txBody><a:bodyPr/><a:lstStyle/><a:p><a:endParaRPr lang="en-US"/></a:p></p:txBody></p:sp>"#
        ),
        id,
        name,
        ph,
        rect.xfrm()
    )
}

pub fn slide_master_xml(style: &ThemeStyle) -> String {
    let mut xml = format!(
        r#"{}<p:sldMaster xmlns:a="{}" xmlns:r="{}" xmlns:p="{}">"#,
        XML_DECLARATION, NS_A, NS_R, NS_P
    );
    xml.push_str(&format!(
        r#"<p:cSld><p:bg><p:bgPr><a:solidFill><a:srgbClr val="{}"/></a:solidFill><a:effectLst/></p:bgPr></p:bg><p:spTree>"#,
        style.background_color
    ));
    xml.push_str(group_shape_header());
    xml.push_str(&placeholder_xml(2, "Title Placeholder 1", r#"type="title""#, title_rect()));
    xml.push_str(&placeholder_xml(
        3,
        "Text Placeholder 2",
        r#"type="body" idx="1""#,
        body_rect(),
    ));
    xml.push_str("</p:spTree></p:cSld>");
    xml.push_str(r#"<p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/>"#);

    xml.push_str("<p:sldLayoutIdLst>");
    for n in 1..=Layout::ALL.len() {
        xml.push_str(&format!(
            r#"<p:sldLayoutId id="{}" r:id="rId{}"/>"#,
            2147483648u64 + n as u64,
            n
        ));
    }
    xml.push_str("</p:sldLayoutIdLst>");

    let title_size = (style.title_font_size * 100.0).round() as u32;
    let body_size = (style.content_font_size * 100.0).round() as u32;
    xml.push_str("<p:txStyles>");
    xml.push_str(&format!(
        r#"<p:titleStyle><a:lvl1pPr algn="l"><a:defRPr sz="{}" b="0"><a:solidFill><a:srgbClr val="{}"/></a:solidFill><a:latin typeface="+mj-lt"/></a:defRPr></a:lvl1pPr></p:titleStyle>"#,
        title_size, style.title_color
    ));
    xml.push_str("<p:bodyStyle>");
    for level in 1..=3u32 {
        let margin = 342900 * level as i64;
        let size = body_size.saturating_sub(200 * (level - 1));
        xml.push_str(&format!(
            r#"<a:lvl{l}pPr marL="{m}" indent="-342900"><a:buFont typeface="Arial"/><a:buChar char="&#8226;"/><a:defRPr sz="{s}"><a:solidFill><a:srgbClr val="{c}"/></a:solidFill><a:latin typeface="+mn-lt"/></a:defRPr></a:lvl{l}pPr>"#,
            l = level,
            m = margin,
            s = size,
            c = style.content_color
        ));
    }
    xml.push_str("</p:bodyStyle>");
    xml.push_str(&format!(
        r#"<p:otherStyle><a:lvl1pPr><a:defRPr sz="{}"><a:solidFill><a:srgbClr val="{}"/></a:solidFill></a:defRPr></a:lvl1pPr></p:otherStyle>"#,
        body_size, style.content_color
    ));
    xml.push_str("</p:txStyles></p:sldMaster>");
    xml
}

pub fn slide_master_rels_xml() -> String {
    let mut rels: Vec<Relationship> = (1..=Layout::ALL.len())
        .map(|n| {
            Relationship::new(
                format!("rId{}", n),
                "slideLayout",
                format!("../slideLayouts/slideLayout{}.xml", n),
            )
        })
        .collect();
    rels.push(Relationship::new(
        format!("rId{}", Layout::ALL.len() + 1),
        "theme",
        "../theme/theme1.xml",
    ));
    relationships_xml(&rels)
}

pub fn slide_layout_xml(layout: Layout) -> String {
    let (kind, name) = layout_info(layout);
    let mut xml = format!(
        r#"{}<p:sldLayout xmlns:a="{}" xmlns:r="{}" xmlns:p="{}" type="{}" preserve="1"><p:cSld name="{}"><p:spTree>"#,
        XML_DECLARATION, NS_A, NS_R, NS_P, kind, name
    );
    xml.push_str(group_shape_header());

    match layout {
        Layout::TitleSlide => {
            xml.push_str(&placeholder_xml(
                2,
                "Title 1",
                r#"type="ctrTitle""#,
                Rect::inches(0.75, 2.33, SLIDE_WIDTH - 1.5, 1.61),
            ));
            xml.push_str(&placeholder_xml(
                3,
                "Subtitle 2",
                r#"type="subTitle" idx="1""#,
                Rect::inches(1.5, 4.25, SLIDE_WIDTH - 3.0, 1.75),
            ));
        }
        Layout::TitleAndContent => {
            xml.push_str(&placeholder_xml(2, "Title 1", r#"type="title""#, title_rect()));
            xml.push_str(&placeholder_xml(3, "Content Placeholder 2", r#"idx="1""#, body_rect()));
        }
        Layout::SectionHeader => {
            xml.push_str(&placeholder_xml(
                2,
                "Title 1",
                r#"type="title""#,
                Rect::inches(0.79, 4.4, SLIDE_WIDTH - 1.5, 1.36),
            ));
            xml.push_str(&placeholder_xml(
                3,
                "Text Placeholder 2",
                r#"type="body" idx="1""#,
                Rect::inches(0.79, 2.9, SLIDE_WIDTH - 1.5, 1.5),
            ));
        }
        Layout::TwoColumn => {
            let half = CONTENT_WIDTH / 2.0;
            let body = body_rect();
            xml.push_str(&placeholder_xml(2, "Title 1", r#"type="title""#, title_rect()));
            xml.push_str(&placeholder_xml(
                3,
                "Content Placeholder 2",
                r#"sz="half" idx="1""#,
                Rect::inches(MARGIN_LEFT, MARGIN_TOP, half, body.height_inches()),
            ));
            xml.push_str(&placeholder_xml(
                4,
                "Content Placeholder 3",
                r#"sz="half" idx="2""#,
                Rect::inches(MARGIN_LEFT + half, MARGIN_TOP, half, body.height_inches()),
            ));
        }
        Layout::Blank => {}
    }

    xml.push_str("</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>");
    xml
}

pub fn slide_layout_rels_xml() -> String {
    relationships_xml(&[Relationship::new(
        "rId1",
        "slideMaster",
        "../slideMasters/slideMaster1.xml",
    )])
}

pub fn theme_xml(theme_name: &str, style: &ThemeStyle) -> String {
    let accents = [style.accent_color, "ED7D31", "A5A5A5", "FFC000", "5B9BD5", "70AD47"];

    let mut xml = format!(
        r#"{}<a:theme xmlns:a="{}" name="{}"><a:themeElements>"#,
        XML_DECLARATION,
        NS_A,
        escape(theme_name)
    );
    xml.push_str(&format!(r#"<a:clrScheme name="{}">"#, escape(theme_name)));
    xml.push_str(&format!(
        r#"<a:dk1><a:srgbClr val="{}"/></a:dk1><a:lt1><a:srgbClr val="{}"/></a:lt1><a:dk2><a:srgbClr val="{}"/></a:dk2><a:lt2><a:srgbClr val="E7E6E6"/></a:lt2>"#,
        style.content_color, style.background_color, style.title_color
    ));
    for (i, accent) in accents.iter().enumerate() {
        xml.push_str(&format!(
            r#"<a:accent{n}><a:srgbClr val="{c}"/></a:accent{n}>"#,
            n = i + 1,
            c = accent
        ));
    }
    xml.push_str(r#"<a:hlink><a:srgbClr val="0563C1"/></a:hlink><a:folHlink><a:srgbClr val="954F72"/></a:folHlink></a:clrScheme>"#);

    xml.push_str(&format!(
        r#"<a:fontScheme name="{}"><a:majorFont><a:latin typeface="{}"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont><a:minorFont><a:latin typeface="{}"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont></a:fontScheme>"#,
        escape(theme_name),
        escape(style.major_font),
        escape(style.minor_font)
    ));

    let fill = r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#;
    let line = r#"<a:ln w="6350"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>"#;
    let effect = "<a:effectStyle><a:effectLst/></a:effectStyle>";
    xml.push_str(&format!(
        r#"<a:fmtScheme name="{}"><a:fillStyleLst>{f}{f}{f}</a:fillStyleLst><a:lnStyleLst>{l}{l}{l}</a:lnStyleLst><a:effectStyleLst>{e}{e}{e}</a:effectStyleLst><a:bgFillStyleLst>{f}{f}{f}</a:bgFillStyleLst></a:fmtScheme>"#,
        escape(theme_name),
        f = fill,
        l = line,
        e = effect
    ));
    xml.push_str("</a:themeElements></a:theme>");
    xml
}

/// `docProps/core.xml` carrying title and author from the document metadata.
pub fn core_props_xml(metadata: &Metadata) -> String {
    let mut xml = format!(
        r#"{}<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:dcmitype="http://purl.org/dc/dcmitype/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#,
        XML_DECLARATION
    );
    if let Some(title) = &metadata.title {
        xml.push_str(&format!("<dc:title>{}</dc:title>", escape(title)));
    }
    if let Some(subtitle) = &metadata.subtitle {
        xml.push_str(&format!("<dc:subject>{}</dc:subject>", escape(subtitle)));
    }
    if let Some(author) = &metadata.author {
        xml.push_str(&format!("<dc:creator>{}</dc:creator>", escape(author)));
    }
    xml.push_str(&format!(
        "<cp:lastModifiedBy>{}</cp:lastModifiedBy></cp:coreProperties>",
        APPLICATION
    ));
    xml
}

pub fn app_props_xml(slide_count: usize) -> String {
    format!(
        r#"{}<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties" xmlns:vt="http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes"><Application>{}</Application><PresentationFormat>On-screen Show (4:3)</PresentationFormat><Slides>{}</Slides></Properties>"#,
        XML_DECLARATION, APPLICATION, slide_count
    )
}
