//! Beamer document parser.
//!
//! Walks the node tree and classifies frame content into typed elements.
//! Preamble commands before the first frame populate the document metadata.

use crate::lexer::tokenize;
use crate::tree::{build_tree, Node};
use forge_core::mapper::{CONTENT_WIDTH, MARGIN_TOP, SLIDE_HEIGHT};
use forge_core::{
    clean_inline, clean_text, color_hint, BlockFlavor, Content, Document, Element, EquationKind,
    EscapeTable, Frame, Layout, ListItem, ParseError, Result, Size,
};
use std::path::Path;

/// List environments.
const LIST_ENVS: &[&str] = &["itemize", "enumerate", "description"];

/// Environments whose body is display math.
const MATH_ENVS: &[&str] = &[
    "equation",
    "align",
    "gather",
    "multline",
    "displaymath",
    "eqnarray",
    "flalign",
];

/// Block environments: name, flavor, title used when none is given.
const BLOCK_ENVS: &[(&str, BlockFlavor, Option<&str>)] = &[
    ("block", BlockFlavor::Plain, None),
    ("alertblock", BlockFlavor::Alert, None),
    ("exampleblock", BlockFlavor::Example, None),
    ("example", BlockFlavor::Example, Some("Example")),
    ("theorem", BlockFlavor::Theorem, Some("Theorem")),
    ("definition", BlockFlavor::Theorem, Some("Definition")),
    ("lemma", BlockFlavor::Theorem, Some("Lemma")),
    ("corollary", BlockFlavor::Theorem, Some("Corollary")),
    ("proposition", BlockFlavor::Theorem, Some("Proposition")),
    ("proof", BlockFlavor::Theorem, Some("Proof")),
];

/// Containers whose content is lifted into the frame, with the number of
/// leading `{..}` arguments to skip.
const TRANSPARENT_ENVS: &[(&str, usize)] = &[
    ("center", 0),
    ("flushleft", 0),
    ("flushright", 0),
    ("minipage", 1),
    ("column", 1),
    ("onlyenv", 0),
    ("uncoverenv", 0),
    ("visibleenv", 0),
    ("overlayarea", 2),
    ("overprint", 0),
    ("actionenv", 0),
];

/// Tabular environments with the number of leading `{..}` arguments.
const TABULAR_ENVS: &[(&str, usize)] = &[
    ("tabular", 1),
    ("tabular*", 2),
    ("tabularx", 2),
    ("longtable", 1),
    ("array", 1),
];

/// Parser for LaTeX Beamer sources.
#[derive(Debug, Clone)]
pub struct BeamerParser {
    table: EscapeTable,
}

impl Default for BeamerParser {
    fn default() -> Self {
        Self::new()
    }
}

impl BeamerParser {
    /// Create a parser with the standard escape table plus Beamer overlay
    /// commands, whose content is kept.
    pub fn new() -> Self {
        let table = EscapeTable::latex()
            .with_passthrough("only", 1)
            .with_passthrough("uncover", 1)
            .with_passthrough("visible", 1)
            .with_passthrough("onslide", 1)
            .with_passthrough("multicolumn", 3)
            .with_passthrough("multirow", 3)
            .with_escape("and", ", ");
        Self { table }
    }

    /// Parse source text. `source_identifier` names the source in logs.
    pub fn parse(
        &self,
        source: &str,
        source_identifier: &str,
    ) -> std::result::Result<Document, ParseError> {
        let tokens = tokenize(source)?;
        log::debug!("{}: {} tokens", source_identifier, tokens.len());
        let nodes = build_tree(source, tokens)?;

        let mut walker = Walker {
            source,
            table: &self.table,
            document: Document::new(),
            current_section: None,
            current_subsection: None,
        };
        walker.walk_top(&nodes);

        let document = walker.document;
        if document.frames.is_empty() {
            log::warn!("{}: no frames found", source_identifier);
        }
        log::info!(
            "parsed {} frame(s) from {}",
            document.frames.len(),
            source_identifier
        );
        Ok(document)
    }

    /// Read and parse a file, recording its path on the document.
    pub fn parse_file(&self, path: &Path) -> Result<Document> {
        let source = std::fs::read_to_string(path)?;
        let mut document = self.parse(&source, &path.display().to_string())?;
        document.source_path = Some(path.to_path_buf());
        Ok(document)
    }
}

/// Parse source text with the default parser.
pub fn parse(source: &str, source_identifier: &str) -> std::result::Result<Document, ParseError> {
    BeamerParser::new().parse(source, source_identifier)
}

/// Parse a file with the default parser.
pub fn parse_file(path: &Path) -> Result<Document> {
    BeamerParser::new().parse_file(path)
}

/// Arguments found after a command.
struct Args<'n> {
    optional: Vec<&'n Node>,
    groups: Vec<&'n Node>,
    /// Index of the first node after the arguments.
    next: usize,
}

/// Per-frame state gathered while walking its body.
#[derive(Default)]
struct FrameBody {
    elements: Vec<Element>,
    title: Option<String>,
    subtitle: Option<String>,
    title_page: bool,
    section_page: Option<SectionPage>,
    two_column: bool,
}

#[derive(Clone, Copy)]
enum SectionPage {
    Part,
    Section,
    Subsection,
}

struct Walker<'a> {
    source: &'a str,
    table: &'a EscapeTable,
    document: Document,
    current_section: Option<String>,
    current_subsection: Option<String>,
}

impl<'a> Walker<'a> {
    fn walk_top(&mut self, nodes: &[Node]) {
        let mut i = 0;
        while i < nodes.len() {
            match &nodes[i] {
                Node::Environment { name, children, .. } if name == "frame" => {
                    let frame = self.parse_frame(children, None);
                    self.document.add_frame(frame);
                }
                Node::Environment { name, .. } if name == "comment" => {}
                Node::Environment { children, .. } | Node::Group { children, .. } => {
                    self.walk_top(children)
                }
                Node::Command { name, .. } => {
                    i = self.top_command(name, nodes, i);
                    continue;
                }
                _ => {}
            }
            i += 1;
        }
    }

    /// Handle a command outside frames, returning the next index.
    fn top_command(&mut self, name: &str, nodes: &[Node], i: usize) -> usize {
        match name {
            "frame" => {
                let args = self.take_args(nodes, i + 1, 1);
                if let Some(group) = args.groups.first() {
                    let frame = self.parse_frame(group.children(), args.optional.first().copied());
                    self.document.add_frame(frame);
                }
                args.next
            }
            "section" | "section*" | "subsection" | "subsection*" => {
                let args = self.take_args(nodes, i + 1, 1);
                if let Some(heading) = args.groups.first().and_then(|g| self.clean_arg(g)) {
                    if name.starts_with("section") {
                        self.current_section = Some(heading.clone());
                        self.current_subsection = None;
                    } else {
                        self.current_subsection = Some(heading.clone());
                    }
                    self.document.sections.push(heading);
                }
                args.next
            }
            "documentclass" | "title" | "subtitle" | "author" | "date" | "institute" => {
                let args = self.take_args(nodes, i + 1, 1);
                if self.document.frames.is_empty() {
                    let value = args.groups.first().and_then(|g| self.metadata_value(name, g));
                    let metadata = &mut self.document.metadata;
                    match name {
                        "documentclass" => metadata.document_class = value,
                        "title" => metadata.title = value,
                        "subtitle" => metadata.subtitle = value,
                        "author" => metadata.author = value,
                        "date" => metadata.date = value,
                        _ => metadata.institute = value,
                    }
                }
                args.next
            }
            _ => i + 1,
        }
    }

    fn metadata_value(&self, name: &str, group: &Node) -> Option<String> {
        if name == "author" || name == "institute" {
            let table = self.table.clone().with_escape("\\", ", ");
            let text = clean_inline(&self.inner_raw(group), &table);
            let tidy = text
                .replace(" ,", ",")
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(", ");
            return (!tidy.is_empty()).then_some(tidy);
        }
        self.clean_arg(group)
    }

    fn parse_frame(&mut self, children: &[Node], options: Option<&Node>) -> Frame {
        let mut frame = Frame::new(self.document.frames.len() + 1);
        let mut start = 0;

        let options = match (options, children.first()) {
            (Some(node), _) => Some(node),
            (None, Some(node @ Node::Optional { .. })) => {
                start = 1;
                Some(node)
            }
            _ => None,
        };
        if let Some(node) = options {
            frame.options = self
                .inner_raw(node)
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }

        let mut title = None;
        let mut subtitle = None;
        if let Some(group @ Node::Group { .. }) = children.get(start) {
            title = self.clean_arg(group);
            start += 1;
            if let Some(group @ Node::Group { .. }) = children.get(start) {
                subtitle = self.clean_arg(group);
                start += 1;
            }
        }

        let mut body = FrameBody::default();
        self.walk_body(&children[start..], &mut body);

        frame.title = body.title.take().or(title);
        frame.subtitle = body.subtitle.take().or(subtitle);
        frame.elements = body.elements;

        frame.layout = if body.title_page {
            let metadata = &self.document.metadata;
            frame.title = metadata.title.clone().or(frame.title);
            frame.subtitle = metadata.subtitle.clone().or(frame.subtitle);
            Layout::TitleSlide
        } else if let Some(page) = body.section_page {
            let heading = match page {
                SectionPage::Subsection => self.current_subsection.clone(),
                _ => self.current_section.clone(),
            };
            frame.title = heading.or(frame.title);
            Layout::SectionHeader
        } else if body.two_column {
            Layout::TwoColumn
        } else if frame.elements.is_empty() {
            if frame.title.is_some() {
                Layout::SectionHeader
            } else {
                Layout::Blank
            }
        } else {
            Layout::TitleAndContent
        };

        log::debug!(
            "frame {}: {:?}, {} element(s)",
            frame.number,
            frame.layout,
            frame.elements.len()
        );
        frame
    }

    fn walk_body<'n>(&self, nodes: &'n [Node], body: &mut FrameBody) {
        let mut run: Vec<&'n Node> = Vec::new();
        let mut i = 0;

        while i < nodes.len() {
            let node = &nodes[i];
            match node {
                Node::ParBreak(_) => self.flush_run(&mut run, body),
                Node::Math {
                    source, display, ..
                } => {
                    self.flush_run(&mut run, body);
                    let latex = source.trim();
                    if !latex.is_empty() {
                        let kind = if *display {
                            EquationKind::Display
                        } else {
                            EquationKind::Inline
                        };
                        body.elements.push(Element::equation(latex, kind));
                    }
                }
                Node::Verbatim { body: text, .. } => {
                    self.flush_run(&mut run, body);
                    let text = text.trim_matches(['\n', '\r']);
                    if !text.trim().is_empty() {
                        body.elements.push(Element::text(text));
                    }
                }
                Node::Environment {
                    name,
                    children,
                    body: inner,
                    ..
                } => {
                    self.flush_run(&mut run, body);
                    self.classify_environment(name, children, &self.source[inner.clone()], body);
                }
                Node::Command { name, .. } => {
                    if let Some(next) = self.frame_command(name, nodes, i, &mut run, body) {
                        i = next;
                        continue;
                    }
                    run.push(node);
                }
                _ => run.push(node),
            }
            i += 1;
        }

        self.flush_run(&mut run, body);
    }

    /// Handle commands with structural meaning inside a frame. Returns the
    /// next index when the command was consumed.
    fn frame_command<'n>(
        &self,
        name: &str,
        nodes: &'n [Node],
        i: usize,
        run: &mut Vec<&'n Node>,
        body: &mut FrameBody,
    ) -> Option<usize> {
        match name {
            "frametitle" | "framesubtitle" => {
                self.flush_run(run, body);
                let args = self.take_args(nodes, i + 1, 1);
                let text = args.groups.first().and_then(|g| self.clean_arg(g));
                if name == "frametitle" {
                    body.title = text;
                } else {
                    body.subtitle = text;
                }
                Some(args.next)
            }
            "titlepage" | "maketitle" => {
                body.title_page = true;
                Some(i + 1)
            }
            "partpage" | "sectionpage" | "subsectionpage" => {
                body.section_page = Some(match name {
                    "partpage" => SectionPage::Part,
                    "sectionpage" => SectionPage::Section,
                    _ => SectionPage::Subsection,
                });
                Some(i + 1)
            }
            "tableofcontents" => {
                self.flush_run(run, body);
                let args = self.take_args(nodes, i + 1, 0);
                let items = self
                    .document
                    .sections
                    .iter()
                    .map(|s| ListItem::new(s.as_str()))
                    .collect();
                body.elements.push(Element::new(Content::Itemize { items }));
                Some(args.next)
            }
            "includegraphics" => {
                self.flush_run(run, body);
                let args = self.take_args(nodes, i + 1, 1);
                if let Some((path, size)) = self.graphic(&args) {
                    body.elements
                        .push(Element::new(Content::Image { path }).with_size(size));
                }
                Some(args.next)
            }
            _ => None,
        }
    }

    fn flush_run(&self, run: &mut Vec<&Node>, body: &mut FrameBody) {
        if run.is_empty() {
            return;
        }
        let raw = self.join_raw(run.iter().copied());
        run.clear();

        let text = clean_text(&raw, self.table);
        if text.is_empty() {
            return;
        }
        body.elements.push(Element::new(Content::Text {
            text,
            color: color_hint(&raw),
        }));
    }

    fn classify_environment(&self, name: &str, children: &[Node], inner: &str, body: &mut FrameBody) {
        let base = name.trim_end_matches('*');

        if LIST_ENVS.contains(&base) {
            let mut nested = FrameBody::default();
            body.elements.push(self.parse_list(base, children, &mut nested));
            self.append_lifted(base, nested, body);
        } else if MATH_ENVS.contains(&base) {
            let latex = inner.trim();
            if !latex.is_empty() {
                body.elements
                    .push(Element::equation(latex, EquationKind::Display));
            }
        } else if let Some((_, flavor, default_title)) =
            BLOCK_ENVS.iter().find(|(block, _, _)| *block == base)
        {
            let mut nested = FrameBody::default();
            body.elements
                .push(self.parse_block(children, *flavor, *default_title, &mut nested));
            self.append_lifted(base, nested, body);
        } else if base == "figure" {
            body.elements.push(self.parse_figure(children));
        } else if base == "table" {
            let rows = find_environment(children, |n| {
                environment_name(n).and_then(tabular_groups).is_some()
            })
            .map(|(env, kids)| {
                let groups = environment_name(env).and_then(tabular_groups).unwrap_or(1);
                self.parse_tabular(kids, groups)
            })
            .unwrap_or_default();
            let caption = self.caption(children);
            body.elements
                .push(Element::new(Content::Table { rows, caption }));
        } else if let Some(groups) = tabular_groups(name) {
            let rows = self.parse_tabular(children, groups);
            body.elements.push(Element::new(Content::Table {
                rows,
                caption: None,
            }));
        } else if base == "columns" {
            body.two_column = true;
            self.walk_body(skip_leading_args(children, 0), body);
        } else if let Some((_, groups)) = TRANSPARENT_ENVS.iter().find(|(env, _)| *env == base) {
            self.walk_body(skip_leading_args(children, *groups), body);
        } else {
            let text = clean_text(inner, self.table);
            if !text.is_empty() {
                body.elements.push(Element::new(Content::Text {
                    text,
                    color: color_hint(inner),
                }));
            }
        }
    }

    /// Elements lifted out of a container follow it in reading order.
    fn append_lifted(&self, container: &str, mut nested: FrameBody, body: &mut FrameBody) {
        if nested.elements.is_empty() {
            return;
        }
        log::debug!(
            "{}: {} nested element(s) placed after it",
            container,
            nested.elements.len()
        );
        body.elements.append(&mut nested.elements);
    }

    fn parse_list(&self, base: &str, children: &[Node], lifted: &mut FrameBody) -> Element {
        let mut items = Vec::new();
        let mut current: Option<(Option<String>, usize)> = None;
        let mut i = 0;

        while i < children.len() {
            if children[i].is_command("item") {
                if let Some((label, start)) = current.take() {
                    items.push(self.list_item(base, label, &children[start..i], lifted));
                }
                let args = self.take_args(children, i + 1, 0);
                let label = args.optional.first().and_then(|o| self.clean_arg(o));
                current = Some((label, args.next));
                i = args.next;
                continue;
            }
            i += 1;
        }
        if let Some((label, start)) = current.take() {
            items.push(self.list_item(base, label, &children[start..], lifted));
        }

        match base {
            "enumerate" => Element::new(Content::Enumerate { items }),
            _ => Element::new(Content::Itemize { items }),
        }
    }

    fn list_item(
        &self,
        base: &str,
        label: Option<String>,
        nodes: &[Node],
        lifted: &mut FrameBody,
    ) -> ListItem {
        let mut children = Vec::new();
        let mut inline = Vec::new();

        for node in self.split_nested(nodes, lifted) {
            match node {
                Node::Environment {
                    name,
                    children: inner,
                    ..
                } if LIST_ENVS.contains(&name.as_str()) => {
                    children.push(self.parse_list(name, inner, lifted));
                }
                _ => inline.push(node),
            }
        }

        let text = self.inline_text(&inline, true);
        let text = match label {
            Some(label) if base == "description" => {
                if text.is_empty() {
                    label
                } else {
                    format!("{}: {}", label, text)
                }
            }
            Some(label) if !text.is_empty() => format!("{} {}", label, text),
            Some(label) => label,
            None => text,
        };

        ListItem { text, children }
    }

    fn parse_block(
        &self,
        children: &[Node],
        flavor: BlockFlavor,
        default_title: Option<&str>,
        lifted: &mut FrameBody,
    ) -> Element {
        let (title, start) = match children.first() {
            Some(node @ (Node::Group { .. } | Node::Optional { .. })) => (self.clean_arg(node), 1),
            _ => (None, 0),
        };
        let title = title.or_else(|| default_title.map(str::to_string));
        let nodes = self.split_nested(&children[start..], lifted);
        let body = self.inline_text(&nodes, false);

        Element::new(Content::Block {
            title,
            body,
            flavor,
        })
    }

    /// Pull graphics, figures, tables and display math out of a list item
    /// or block body into `lifted`. Returns the nodes left as inline content.
    fn split_nested<'n>(&self, nodes: &'n [Node], lifted: &mut FrameBody) -> Vec<&'n Node> {
        let mut inline = Vec::new();
        let mut i = 0;

        while i < nodes.len() {
            let node = &nodes[i];
            match node {
                Node::Command { name, .. } if name == "includegraphics" => {
                    let args = self.take_args(nodes, i + 1, 1);
                    if let Some((path, size)) = self.graphic(&args) {
                        lifted
                            .elements
                            .push(Element::new(Content::Image { path }).with_size(size));
                    }
                    i = args.next;
                    continue;
                }
                Node::Math {
                    source,
                    display: true,
                    ..
                } => {
                    let latex = source.trim();
                    if !latex.is_empty() {
                        lifted
                            .elements
                            .push(Element::equation(latex, EquationKind::Display));
                    }
                }
                Node::Environment {
                    name,
                    children,
                    body: inner,
                    ..
                } if is_liftable(name) => {
                    self.classify_environment(name, children, &self.source[inner.clone()], lifted);
                }
                _ => inline.push(node),
            }
            i += 1;
        }

        inline
    }

    fn parse_figure(&self, children: &[Node]) -> Element {
        let mut path = None;
        let mut size = None;

        if let Some((siblings, index)) = find_command(children, "includegraphics") {
            let args = self.take_args(siblings, index + 1, 1);
            if let Some((p, s)) = self.graphic(&args) {
                path = Some(p);
                size = s;
            }
        }

        Element::new(Content::Figure {
            path,
            caption: self.caption(children),
        })
        .with_size(size)
    }

    fn caption(&self, children: &[Node]) -> Option<String> {
        let (siblings, index) = find_command(children, "caption")?;
        let args = self.take_args(siblings, index + 1, 1);
        args.groups.first().and_then(|g| self.clean_arg(g))
    }

    /// Rows of a tabular body: rows split on `\\`, cells on `&`.
    fn parse_tabular(&self, children: &[Node], leading_groups: usize) -> Vec<Vec<String>> {
        let raw = self.join_raw(skip_leading_args(children, leading_groups).iter());
        let raw = raw.replace("\\tabularnewline", "\\\\");

        split_top_level(&raw, Separator::Row)
            .into_iter()
            .map(|row| {
                split_top_level(strip_row_spacing(&row), Separator::Cell)
                    .iter()
                    .map(|cell| clean_inline(cell, self.table))
                    .collect::<Vec<_>>()
            })
            .filter(|cells| cells.iter().any(|c| !c.is_empty()))
            .collect()
    }

    /// Path and requested size from `\includegraphics` arguments.
    fn graphic(&self, args: &Args<'_>) -> Option<(String, Option<Size>)> {
        let group = args.groups.first()?;
        let path = self.inner_raw(group).trim().to_string();
        if path.is_empty() {
            return None;
        }
        let size = args
            .optional
            .first()
            .and_then(|o| parse_size(&self.inner_raw(o)));
        Some((path, size))
    }

    /// Text of inline content with math kept verbatim.
    fn inline_text(&self, nodes: &[&Node], single_line: bool) -> String {
        let mut segments: Vec<String> = Vec::new();
        let mut run: Vec<&Node> = Vec::new();

        for node in nodes {
            match node {
                Node::Math { source, .. } => {
                    self.flush_segment(&mut run, &mut segments, single_line);
                    segments.push(source.trim().to_string());
                }
                _ => run.push(*node),
            }
        }
        self.flush_segment(&mut run, &mut segments, single_line);

        segments
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn flush_segment(&self, run: &mut Vec<&Node>, segments: &mut Vec<String>, single_line: bool) {
        if run.is_empty() {
            return;
        }
        let raw = self.join_raw(run.iter().copied());
        run.clear();
        let text = if single_line {
            clean_inline(&raw, self.table)
        } else {
            clean_text(&raw, self.table)
        };
        if !text.is_empty() {
            segments.push(text);
        }
    }

    /// Collect optional and group arguments following index `start - 1`.
    ///
    /// Options must be adjacent; whitespace may separate groups.
    fn take_args<'n>(&self, nodes: &'n [Node], start: usize, max_groups: usize) -> Args<'n> {
        let mut args = Args {
            optional: Vec::new(),
            groups: Vec::new(),
            next: start,
        };

        let mut j = start;
        while j < nodes.len() {
            match &nodes[j] {
                node @ Node::Optional { .. } if args.groups.is_empty() && j == args.next => {
                    args.optional.push(node);
                    args.next = j + 1;
                    j += 1;
                }
                node @ Node::Group { .. } if args.groups.len() < max_groups => {
                    args.groups.push(node);
                    args.next = j + 1;
                    j += 1;
                }
                Node::Text(span) if self.source[span.clone()].trim().is_empty() => j += 1,
                _ => break,
            }
        }

        args
    }

    fn clean_arg(&self, node: &Node) -> Option<String> {
        let text = clean_inline(&self.inner_raw(node), self.table);
        (!text.is_empty()).then_some(text)
    }

    /// Raw source inside a group or option list, without its delimiters.
    fn inner_raw(&self, node: &Node) -> String {
        self.join_raw(node.children().iter())
    }

    fn join_raw<'n>(&self, nodes: impl Iterator<Item = &'n Node>) -> String {
        nodes.map(|n| &self.source[n.span()]).collect()
    }
}

/// Environments inside list items and blocks that become elements of their
/// own: display math, figures and tables.
fn is_liftable(name: &str) -> bool {
    let base = name.trim_end_matches('*');
    MATH_ENVS.contains(&base)
        || base == "figure"
        || base == "table"
        || tabular_groups(name).is_some()
}

/// Leading `{..}` argument count when `name` is a tabular environment.
fn tabular_groups(name: &str) -> Option<usize> {
    TABULAR_ENVS
        .iter()
        .find(|(env, _)| *env == name)
        .map(|(_, groups)| *groups)
}

fn environment_name(node: &Node) -> Option<&str> {
    match node {
        Node::Environment { name, .. } => Some(name),
        _ => None,
    }
}

/// Skip leading option lists and up to `groups` brace groups.
fn skip_leading_args(children: &[Node], groups: usize) -> &[Node] {
    let mut start = 0;
    let mut seen = 0;
    while let Some(node) = children.get(start) {
        match node {
            Node::Optional { .. } => start += 1,
            Node::Group { .. } if seen < groups => {
                seen += 1;
                start += 1;
            }
            _ => break,
        }
    }
    &children[start..]
}

/// Depth-first search for a command; returns its sibling slice and index.
fn find_command<'n>(nodes: &'n [Node], name: &str) -> Option<(&'n [Node], usize)> {
    for (index, node) in nodes.iter().enumerate() {
        if node.is_command(name) {
            return Some((nodes, index));
        }
        if let Some(found) = find_command(node.children(), name) {
            return Some(found);
        }
    }
    None
}

/// Depth-first search for an environment matching `wanted`.
fn find_environment<'n>(
    nodes: &'n [Node],
    wanted: impl Fn(&Node) -> bool + Copy,
) -> Option<(&'n Node, &'n [Node])> {
    for node in nodes {
        if wanted(node) {
            return Some((node, node.children()));
        }
        if let Some(found) = find_environment(node.children(), wanted) {
            return Some(found);
        }
    }
    None
}

#[derive(Clone, Copy, PartialEq)]
enum Separator {
    Row,
    Cell,
}

/// Split on `\\` or `&` outside braces, honoring backslash escapes.
fn split_top_level(raw: &str, separator: Separator) -> Vec<String> {
    let chars: Vec<char> = raw.chars().collect();
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '\\' if separator == Separator::Row && depth == 0 && chars.get(i + 1) == Some(&'\\') => {
                parts.push(std::mem::take(&mut current));
                i += 2;
                continue;
            }
            '\\' => {
                current.push('\\');
                if let Some(next) = chars.get(i + 1) {
                    current.push(*next);
                }
                i += 2;
                continue;
            }
            '&' if separator == Separator::Cell && depth == 0 => {
                parts.push(std::mem::take(&mut current));
            }
            '{' => {
                depth += 1;
                current.push('{');
            }
            '}' => {
                depth = depth.saturating_sub(1);
                current.push('}');
            }
            c => current.push(c),
        }
        i += 1;
    }

    parts.push(current);
    parts
}

/// Drop a `[2pt]` spacing argument left over from a `\\[2pt]` row break.
fn strip_row_spacing(row: &str) -> &str {
    let trimmed = row.trim_start();
    if trimmed.starts_with('[') {
        if let Some(end) = trimmed.find(']') {
            return &trimmed[end + 1..];
        }
    }
    row
}

/// Requested size from `\includegraphics` options such as `width=0.5\textwidth`.
fn parse_size(options: &str) -> Option<Size> {
    let mut size = Size {
        width: None,
        height: None,
    };

    for option in options.split(',') {
        let Some((key, value)) = option.split_once('=') else {
            continue;
        };
        match key.trim() {
            "width" => size.width = parse_length(value),
            "height" => size.height = parse_length(value),
            _ => {}
        }
    }

    (size.width.is_some() || size.height.is_some()).then_some(size)
}

/// A TeX length in inches.
fn parse_length(value: &str) -> Option<f64> {
    let value = value.trim();
    let split = value
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+'))
        .unwrap_or(value.len());
    let (number, unit) = value.split_at(split);

    let number = if number.is_empty() {
        1.0
    } else {
        number.parse::<f64>().ok()?
    };

    let factor = match unit.trim() {
        "\\textwidth" | "\\linewidth" | "\\columnwidth" | "\\paperwidth" => CONTENT_WIDTH,
        "\\textheight" | "\\paperheight" => SLIDE_HEIGHT - MARGIN_TOP,
        "in" => 1.0,
        "cm" => 1.0 / 2.54,
        "mm" => 1.0 / 25.4,
        "pt" => 1.0 / 72.27,
        "bp" => 1.0 / 72.0,
        "em" => 1.0 / 6.0,
        "ex" => 1.0 / 14.0,
        _ => return None,
    };

    let inches = number * factor;
    (inches.is_finite() && inches > 0.0).then_some(inches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_core::ElementKind;

    fn doc(source: &str) -> Document {
        parse(source, "test.tex").unwrap()
    }

    fn frame_body(body: &str) -> Frame {
        let source = format!("\\begin{{frame}}\n{}\n\\end{{frame}}", body);
        let mut document = doc(&source);
        assert_eq!(document.frames.len(), 1);
        document.frames.remove(0)
    }

    fn item_texts(element: &Element) -> Vec<String> {
        match &element.content {
            Content::Itemize { items } | Content::Enumerate { items } => {
                items.iter().map(|i| i.text.clone()).collect()
            }
            other => panic!("expected a list, got {:?}", other),
        }
    }

    #[test]
    fn test_title_slide_from_metadata() {
        let document = doc(concat!(
            "\\documentclass{beamer}\n",
            "\\title{Intro}\n",
            "\\author{Ada}\n",
            "\\begin{document}\n",
            "\\begin{frame}\n\\titlepage\n\\end{frame}\n",
            "\\end{document}\n",
        ));

        assert_eq!(document.frames.len(), 1);
        let frame = &document.frames[0];
        assert_eq!(frame.layout, Layout::TitleSlide);
        assert_eq!(frame.title.as_deref(), Some("Intro"));
        assert_eq!(document.metadata.author.as_deref(), Some("Ada"));
        assert_eq!(document.metadata.document_class.as_deref(), Some("beamer"));
    }

    #[test]
    fn test_metadata_fields() {
        let document = doc(concat!(
            "\\documentclass[11pt]{beamer}\n",
            "\\title[Short]{A Long \\emph{Title}}\n",
            "\\subtitle{Sub}\n",
            "\\author{Ada Lovelace \\and Charles Babbage}\n",
            "\\institute{Analytical \\\\ Engines}\n",
            "\\date{\\today}\n",
            "\\begin{document}\\end{document}\n",
        ));
        let m = &document.metadata;
        assert_eq!(m.title.as_deref(), Some("A Long Title"));
        assert_eq!(m.subtitle.as_deref(), Some("Sub"));
        assert_eq!(m.author.as_deref(), Some("Ada Lovelace, Charles Babbage"));
        assert_eq!(m.institute.as_deref(), Some("Analytical, Engines"));
        assert_eq!(m.date, None);
        assert!(document.frames.is_empty());
    }

    #[test]
    fn test_metadata_after_first_frame_ignored() {
        let document = doc(concat!(
            "\\title{First}\n",
            "\\begin{frame}x\\end{frame}\n",
            "\\title{Second}\n",
        ));
        assert_eq!(document.metadata.title.as_deref(), Some("First"));
    }

    #[test]
    fn test_frame_title_forms() {
        let frame = frame_body("\\frametitle{Hello}\\framesubtitle{World}\ntext");
        assert_eq!(frame.title.as_deref(), Some("Hello"));
        assert_eq!(frame.subtitle.as_deref(), Some("World"));

        let document = doc("\\begin{frame}[fragile, t]{Top}{Bottom}\nbody\n\\end{frame}");
        let frame = &document.frames[0];
        assert_eq!(frame.title.as_deref(), Some("Top"));
        assert_eq!(frame.subtitle.as_deref(), Some("Bottom"));
        assert_eq!(frame.options, vec!["fragile", "t"]);
        assert_eq!(frame.layout, Layout::TitleAndContent);
    }

    #[test]
    fn test_frame_shorthand() {
        let document = doc("\\title{Deck}\n\\frame{\\titlepage}\n\\frame{\\frametitle{Two} text}");
        assert_eq!(document.frames.len(), 2);
        assert_eq!(document.frames[0].layout, Layout::TitleSlide);
        assert_eq!(document.frames[0].title.as_deref(), Some("Deck"));
        assert_eq!(document.frames[1].title.as_deref(), Some("Two"));
        assert_eq!(document.frames[1].number, 2);
    }

    #[test]
    fn test_itemize_items() {
        let frame = frame_body(
            "\\begin{itemize}\n\\item First \\textbf{point}\n\\item Second\n\\item Third\n\\end{itemize}",
        );
        assert_eq!(frame.elements.len(), 1);
        assert_eq!(frame.elements[0].kind(), ElementKind::Itemize);
        assert_eq!(
            item_texts(&frame.elements[0]),
            vec!["First point", "Second", "Third"]
        );
    }

    #[test]
    fn test_nested_lists() {
        let frame = frame_body(concat!(
            "\\begin{enumerate}\n",
            "\\item Outer\n",
            "  \\begin{itemize}\\item Inner A \\item Inner B\\end{itemize}\n",
            "\\item Last\n",
            "\\end{enumerate}",
        ));
        assert_eq!(frame.elements.len(), 1);
        assert_eq!(frame.elements[0].kind(), ElementKind::Enumerate);
        match &frame.elements[0].content {
            Content::Enumerate { items } => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[0].text, "Outer");
                assert_eq!(items[0].children.len(), 1);
                assert_eq!(items[0].children[0].kind(), ElementKind::Itemize);
                assert_eq!(item_texts(&items[0].children[0]), vec!["Inner A", "Inner B"]);
                assert!(items[1].children.is_empty());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_description_list() {
        let frame = frame_body(
            "\\begin{description}\\item[Rust] fast \\item[Go] simple\\end{description}",
        );
        assert_eq!(item_texts(&frame.elements[0]), vec!["Rust: fast", "Go: simple"]);
    }

    #[test]
    fn test_list_items_keep_inline_math() {
        let frame = frame_body(
            "\\begin{itemize}\\item Area is $\\pi r^2$ exactly\\item Plain\\end{itemize}",
        );
        assert_eq!(
            item_texts(&frame.elements[0]),
            vec!["Area is \\pi r^2 exactly", "Plain"]
        );
    }

    #[test]
    fn test_inline_math_splits_paragraph() {
        let frame = frame_body("Energy $E = mc^2$ holds.");
        let kinds: Vec<_> = frame.elements.iter().map(|e| e.kind()).collect();
        assert_eq!(
            kinds,
            vec![ElementKind::Text, ElementKind::Equation, ElementKind::Text]
        );
        assert_eq!(
            frame.elements[1].content,
            Content::Equation {
                latex: "E = mc^2".into(),
                kind: EquationKind::Inline
            }
        );
    }

    #[test]
    fn test_display_math_forms() {
        let frame = frame_body(concat!(
            "\\[ a^2 + b^2 = c^2 \\]\n",
            "$$x_1$$\n",
            "\\begin{align*}\na &= b \\\\\nc &= d\n\\end{align*}\n",
            "\\begin{equation}\\int_0^1 f\\end{equation}",
        ));
        let latex: Vec<_> = frame
            .elements
            .iter()
            .filter_map(|e| match &e.content {
                Content::Equation {
                    latex,
                    kind: EquationKind::Display,
                } => Some(latex.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(
            latex,
            vec![
                "a^2 + b^2 = c^2".to_string(),
                "x_1".to_string(),
                "a &= b \\\\\nc &= d".to_string(),
                "\\int_0^1 f".to_string(),
            ]
        );
    }

    #[test]
    fn test_table_of_contents() {
        let document = doc(concat!(
            "\\section{Intro}\n",
            "\\begin{frame}\\tableofcontents\\end{frame}\n",
            "\\section{Method}\n",
            "\\subsection{Data}\n",
            "\\begin{frame}{Outline}\\tableofcontents[currentsection]\\end{frame}\n",
        ));
        assert_eq!(document.sections, vec!["Intro", "Method", "Data"]);
        assert_eq!(item_texts(&document.frames[0].elements[0]), vec!["Intro"]);
        assert_eq!(
            item_texts(&document.frames[1].elements[0]),
            vec!["Intro", "Method", "Data"]
        );
    }

    #[test]
    fn test_section_page_layout() {
        let document = doc("\\section{Results}\n\\begin{frame}\\sectionpage\\end{frame}");
        let frame = &document.frames[0];
        assert_eq!(frame.layout, Layout::SectionHeader);
        assert_eq!(frame.title.as_deref(), Some("Results"));
    }

    #[test]
    fn test_empty_frame_layouts() {
        let document = doc("\\begin{frame}{Only Title}\\end{frame}\\begin{frame}\\end{frame}");
        assert_eq!(document.frames[0].layout, Layout::SectionHeader);
        assert_eq!(document.frames[1].layout, Layout::Blank);
    }

    #[test]
    fn test_blocks() {
        let frame = frame_body(concat!(
            "\\begin{block}{Note}Remember $x$ this\\end{block}\n",
            "\\begin{alertblock}{Warning}Careful\\end{alertblock}\n",
            "\\begin{theorem}[Pythagoras]Right triangles\\end{theorem}\n",
            "\\begin{proof}Trivial\\end{proof}",
        ));
        let blocks: Vec<_> = frame
            .elements
            .iter()
            .map(|e| match &e.content {
                Content::Block {
                    title,
                    body,
                    flavor,
                } => (title.clone(), body.clone(), *flavor),
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(
            blocks,
            vec![
                (Some("Note".into()), "Remember x this".into(), BlockFlavor::Plain),
                (Some("Warning".into()), "Careful".into(), BlockFlavor::Alert),
                (
                    Some("Pythagoras".into()),
                    "Right triangles".into(),
                    BlockFlavor::Theorem
                ),
                (Some("Proof".into()), "Trivial".into(), BlockFlavor::Theorem),
            ]
        );
    }

    #[test]
    fn test_graphics_in_block_follow_it() {
        let frame = frame_body(
            "\\begin{block}{Fig}Look \\includegraphics[width=2in]{plot.png}\\end{block}",
        );
        let kinds: Vec<_> = frame.elements.iter().map(|e| e.kind()).collect();
        assert_eq!(kinds, vec![ElementKind::Block, ElementKind::Image]);
        assert_eq!(
            frame.elements[0].content,
            Content::Block {
                title: Some("Fig".into()),
                body: "Look".into(),
                flavor: BlockFlavor::Plain
            }
        );
        assert_eq!(
            frame.elements[1].content,
            Content::Image {
                path: "plot.png".into()
            }
        );
        assert_eq!(frame.elements[1].size.unwrap().width, Some(2.0));
    }

    #[test]
    fn test_display_math_in_block_becomes_equation() {
        let frame = frame_body(concat!(
            "\\begin{theorem}Area $A$ is\\[ \\int_0^1 f \\]",
            "\\begin{align}x &= y\\end{align}\\end{theorem}\n",
            "After",
        ));
        let kinds: Vec<_> = frame.elements.iter().map(|e| e.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                ElementKind::Block,
                ElementKind::Equation,
                ElementKind::Equation,
                ElementKind::Text
            ]
        );
        match &frame.elements[0].content {
            Content::Block { body, .. } => assert_eq!(body, "Area A is"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            frame.elements[1].content,
            Content::Equation {
                latex: "\\int_0^1 f".into(),
                kind: EquationKind::Display
            }
        );
        assert_eq!(
            frame.elements[2].content,
            Content::Equation {
                latex: "x &= y".into(),
                kind: EquationKind::Display
            }
        );
    }

    #[test]
    fn test_nested_content_in_list_items() {
        let frame = frame_body(concat!(
            "\\begin{itemize}\n",
            "\\item see \\includegraphics{plot.png}\n",
            "\\item sum \\[ a + b \\]\n",
            "\\item inner\n",
            "  \\begin{enumerate}\\item deep \\includegraphics{deep.png}\\end{enumerate}\n",
            "\\item grid \\begin{tabular}{cc} 1 & 2 \\end{tabular}\n",
            "\\end{itemize}",
        ));
        let kinds: Vec<_> = frame.elements.iter().map(|e| e.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                ElementKind::Itemize,
                ElementKind::Image,
                ElementKind::Equation,
                ElementKind::Image,
                ElementKind::Table
            ]
        );
        assert_eq!(
            item_texts(&frame.elements[0]),
            vec!["see", "sum", "inner", "grid"]
        );
        assert_eq!(
            frame.elements[3].content,
            Content::Image {
                path: "deep.png".into()
            }
        );
        assert_eq!(
            frame.elements[4].content,
            Content::Table {
                rows: vec![vec!["1".into(), "2".into()]],
                caption: None
            }
        );
    }

    #[test]
    fn test_figure_inside_block() {
        let frame = frame_body(
            "\\begin{exampleblock}{Demo}\\begin{figure}\\includegraphics{a.png}\\caption{Cap}\\end{figure}\\end{exampleblock}",
        );
        assert_eq!(frame.elements.len(), 2);
        assert_eq!(
            frame.elements[1].content,
            Content::Figure {
                path: Some("a.png".into()),
                caption: Some("Cap".into())
            }
        );
    }

    #[test]
    fn test_columns_keep_graphics_and_math() {
        let frame = frame_body(concat!(
            "\\begin{columns}\n",
            "\\begin{column}{0.5\\textwidth}\\includegraphics{left.png}\\end{column}\n",
            "\\begin{column}{0.5\\textwidth}\\[ e^{i\\pi} = -1 \\]\\end{column}\n",
            "\\end{columns}",
        ));
        assert_eq!(frame.layout, Layout::TwoColumn);
        let kinds: Vec<_> = frame.elements.iter().map(|e| e.kind()).collect();
        assert_eq!(kinds, vec![ElementKind::Image, ElementKind::Equation]);
    }

    #[test]
    fn test_tabular_rows_and_cells() {
        let frame = frame_body(concat!(
            "\\begin{table}\n\\centering\n",
            "\\begin{tabular}{|l|r|}\n\\hline\n",
            "Name & Score \\\\ \\hline\n",
            "\\textbf{Ada} & 10\\% \\\\[2pt]\n",
            "Bob & 9 \\\\\n\\hline\n",
            "\\end{tabular}\n",
            "\\caption{Results}\n",
            "\\end{table}",
        ));
        assert_eq!(frame.elements.len(), 1);
        match &frame.elements[0].content {
            Content::Table { rows, caption } => {
                assert_eq!(
                    rows,
                    &vec![
                        vec!["Name".to_string(), "Score".to_string()],
                        vec!["Ada".to_string(), "10%".to_string()],
                        vec!["Bob".to_string(), "9".to_string()],
                    ]
                );
                assert_eq!(caption.as_deref(), Some("Results"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_bare_tabular() {
        let frame = frame_body("\\begin{tabular}{cc}a & b\\\\ c & {d & e}\\end{tabular}");
        match &frame.elements[0].content {
            Content::Table { rows, caption } => {
                assert_eq!(rows.len(), 2);
                assert_eq!(rows[1], vec!["c".to_string(), "d & e".to_string()]);
                assert_eq!(*caption, None);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_images_and_figures() {
        let frame = frame_body(concat!(
            "\\includegraphics[width=0.5\\textwidth]{img/plot_1.png}\n\n",
            "\\begin{figure}\n\\centering\n",
            "\\includegraphics[height=2in]{diagram.pdf}\n",
            "\\caption{A diagram}\n",
            "\\end{figure}",
        ));
        assert_eq!(frame.elements.len(), 2);
        assert_eq!(
            frame.elements[0].content,
            Content::Image {
                path: "img/plot_1.png".into()
            }
        );
        assert_eq!(frame.elements[0].size.unwrap().width, Some(4.0));
        assert_eq!(
            frame.elements[1].content,
            Content::Figure {
                path: Some("diagram.pdf".into()),
                caption: Some("A diagram".into())
            }
        );
        assert_eq!(frame.elements[1].size.unwrap().height, Some(2.0));
    }

    #[test]
    fn test_columns_are_two_column() {
        let frame = frame_body(concat!(
            "\\begin{columns}[T]\n",
            "\\begin{column}{0.5\\textwidth}Left side\\end{column}\n",
            "\\begin{column}{0.5\\textwidth}Right side\\end{column}\n",
            "\\end{columns}",
        ));
        assert_eq!(frame.layout, Layout::TwoColumn);
        let texts: Vec<_> = frame
            .elements
            .iter()
            .map(|e| match &e.content {
                Content::Text { text, .. } => text.clone(),
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(texts, vec!["Left side", "Right side"]);
    }

    #[test]
    fn test_transparent_center() {
        let frame = frame_body("\\begin{center}\\includegraphics{logo.png}\\end{center}");
        assert_eq!(frame.elements.len(), 1);
        assert_eq!(frame.elements[0].kind(), ElementKind::Image);
    }

    #[test]
    fn test_color_hint_on_text() {
        let frame = frame_body("\\textcolor{blue}{Cool} words");
        assert_eq!(
            frame.elements[0].content,
            Content::Text {
                text: "Cool words".into(),
                color: Some("0000FF".into())
            }
        );
    }

    #[test]
    fn test_overlays_keep_content() {
        let frame = frame_body("First\\pause{} \\only<2>{Second}");
        assert_eq!(
            frame.elements[0].content,
            Content::Text {
                text: "First Second".into(),
                color: None
            }
        );
    }

    #[test]
    fn test_verbatim_kept_literally() {
        let frame = frame_body("\\begin{verbatim}\nlet x = $y;\n\\end{verbatim}");
        assert_eq!(frame.elements.len(), 1);
        assert_eq!(
            frame.elements[0].content,
            Content::Text {
                text: "let x = $y;".into(),
                color: None
            }
        );
    }

    #[test]
    fn test_unknown_environment_becomes_text() {
        let frame = frame_body("\\begin{quote}Stay \\emph{hungry}\\end{quote}");
        assert_eq!(
            frame.elements[0].content,
            Content::Text {
                text: "Stay hungry".into(),
                color: None
            }
        );
    }

    #[test]
    fn test_unclosed_list_recovers() {
        let document = doc(concat!(
            "\\begin{frame}{Recover}\n",
            "\\begin{itemize}\n\\item one\n\\item two\n",
            "\\end{frame}\n",
        ));
        assert_eq!(item_texts(&document.frames[0].elements[0]), vec!["one", "two"]);
    }

    #[test]
    fn test_unterminated_frame_reports_line() {
        let err = parse(
            "\\documentclass{beamer}\n\\begin{document}\n\\begin{frame}{Broken}\n\\item x\n",
            "broken.tex",
        )
        .unwrap_err();
        assert_eq!(err.line_number, 3);
        assert_eq!(err.snippet, "\\begin{frame}{Broken}");
    }

    #[test]
    fn test_comment_environment_skipped() {
        let document = doc("\\begin{comment}\\begin{frame}hidden\\end{frame}\\end{comment}");
        assert!(document.frames.is_empty());
    }

    #[test]
    fn test_parse_file_records_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("talk.tex");
        std::fs::write(&path, "\\begin{frame}{A}x\\end{frame}").unwrap();

        let document = parse_file(&path).unwrap();
        assert_eq!(document.source_path.as_deref(), Some(path.as_path()));
        assert_eq!(document.base_dir(), Some(dir.path()));
    }

    #[test]
    fn test_parse_file_missing() {
        let err = parse_file(Path::new("/nonexistent/deck.tex")).unwrap_err();
        assert!(matches!(err, forge_core::Error::IoError(_)));
    }

    #[test]
    fn test_parse_length_units() {
        assert_eq!(parse_length("2in"), Some(2.0));
        assert!((parse_length("2.54cm").unwrap() - 1.0).abs() < 1e-9);
        assert_eq!(parse_length("\\textwidth"), Some(CONTENT_WIDTH));
        assert_eq!(parse_length("3furlongs"), None);
        assert_eq!(parse_size("scale=0.5"), None);
    }
}
