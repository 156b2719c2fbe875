//! XHTML to DocBook.
//!
//! Walks the cleaned XHTML tree and builds the DocBook equivalent under a placeholder
//! root element. Headings become nested `section`s (the first top-level heading titles
//! the root), block elements map to their DocBook counterparts and inline markup to
//! `emphasis`, `literal`, `link` and friends.

use crate::config::PLACEHOLDER_ROOT;
use crate::headings::{heading_level, normalize_headings};
use crate::xml::{self, Element, XmlNode};
use anyhow::{Context, Result};
use tracing::debug;

const INLINE_ELEMENTS: &[&str] = &[
    "a", "abbr", "b", "big", "br", "cite", "code", "del", "em", "i", "img", "ins", "kbd",
    "q", "s", "samp", "small", "span", "strike", "strong", "sub", "sup", "tt", "u", "var",
];

const IGNORED_ELEMENTS: &[&str] = &["head", "script", "style", "title", "hr"];

/// Converts rendered HTML pages into DocBook fragments. Built once and reused for
/// every page of a run.
#[derive(Debug, Clone)]
pub struct Transformer {
    document_root: String,
}

impl Default for Transformer {
    fn default() -> Self {
        Self::new()
    }
}

impl Transformer {
    pub fn new() -> Self {
        Self::with_document_root(PLACEHOLDER_ROOT)
    }

    pub fn with_document_root(name: impl Into<String>) -> Self {
        Self {
            document_root: name.into(),
        }
    }

    /// Cleans `html`, normalizes its headings and returns the DocBook fragment as a
    /// UTF-8 XML document.
    pub fn transform(&self, html: &str) -> Result<String> {
        let mut xhtml = xml::parse_html(html).context("Failed to clean rendered HTML")?;
        let headings = normalize_headings(&mut xhtml);
        let body = xhtml.find("body").context("Cleaned HTML has no body")?;
        let fragment = self.convert_body(body);
        debug!(headings, "Converted XHTML to DocBook");
        Ok(xml::to_document(&fragment))
    }

    pub fn convert_body(&self, body: &Element) -> Element {
        let mut root = Element::new(self.document_root.as_str());
        let mut sections: Vec<(u8, Element)> = Vec::new();
        let mut inline_run: Vec<&XmlNode> = Vec::new();
        let mut seen_block = false;

        for child in &body.children {
            let element = match child {
                XmlNode::Element(e) if !is_inline(e) => e,
                _ => {
                    inline_run.push(child);
                    continue;
                }
            };
            if let Some(para) = para_from(&inline_run) {
                current(&mut sections, &mut root).push(para);
                seen_block = true;
            }
            inline_run.clear();

            let Some(level) = heading_level(&element.name) else {
                let blocks = convert_block(element);
                if !blocks.is_empty() {
                    seen_block = true;
                }
                let target = current(&mut sections, &mut root);
                for block in blocks {
                    target.push(block);
                }
                continue;
            };

            let mut title = title_from(element);
            if !seen_block && level == 1 {
                // The root's id is the page name, the heading's anchor stays on its title.
                if let Some(id) = element.attr("id") {
                    title.set_attr("id", id);
                }
                root.push(title);
                seen_block = true;
                continue;
            }
            seen_block = true;

            while sections.last().is_some_and(|(open, _)| *open >= level) {
                close_section(&mut sections, &mut root);
            }
            let mut section = Element::new("section");
            if let Some(id) = element.attr("id") {
                section.set_attr("id", id);
            }
            section.push(title);
            sections.push((level, section));
        }

        if let Some(para) = para_from(&inline_run) {
            current(&mut sections, &mut root).push(para);
        }
        while !sections.is_empty() {
            close_section(&mut sections, &mut root);
        }
        root
    }
}

fn current<'a>(sections: &'a mut [(u8, Element)], root: &'a mut Element) -> &'a mut Element {
    match sections.last_mut() {
        Some((_, section)) => section,
        None => root,
    }
}

fn close_section(sections: &mut Vec<(u8, Element)>, root: &mut Element) {
    if let Some((_, section)) = sections.pop() {
        current(sections, root).push(section);
    }
}

fn is_inline(element: &Element) -> bool {
    INLINE_ELEMENTS.contains(&element.name.as_str())
}

fn title_from(heading: &Element) -> Element {
    Element::new("title").with_children(trim_edges(convert_inline_children(heading)))
}

/// Wraps a run of inline nodes into a `para`, or nothing if the run is blank.
fn para_from(run: &[&XmlNode]) -> Option<Element> {
    let mut children = Vec::new();
    for node in run {
        children.extend(convert_inline(node));
    }
    let children = trim_edges(children);
    if children.is_empty() {
        return None;
    }
    Some(Element::new("para").with_children(children))
}

/// Block content that may mix inline runs with block elements, as in `li` or `dd`.
fn convert_flow(element: &Element) -> Vec<XmlNode> {
    let mut out = Vec::new();
    let mut run: Vec<&XmlNode> = Vec::new();
    for child in &element.children {
        match child {
            XmlNode::Element(e) if !is_inline(e) => {
                out.extend(para_from(&run).map(XmlNode::from));
                run.clear();
                out.extend(convert_block(e));
            }
            _ => run.push(child),
        }
    }
    out.extend(para_from(&run).map(XmlNode::from));
    out
}

fn convert_block(element: &Element) -> Vec<XmlNode> {
    let name = element.name.as_str();
    if IGNORED_ELEMENTS.contains(&name) {
        return Vec::new();
    }
    if heading_level(name).is_some() {
        let mut bridgehead =
            Element::new("bridgehead").with_children(trim_edges(convert_inline_children(element)));
        if let Some(id) = element.attr("id") {
            bridgehead.set_attr("id", id);
        }
        return vec![bridgehead.into()];
    }

    match name {
        "p" => {
            let children = trim_edges(convert_inline_children(element));
            if children.is_empty() {
                Vec::new()
            } else {
                vec![Element::new("para").with_children(children).into()]
            }
        }
        "pre" => {
            let text = element.text_content();
            let text = text.strip_prefix('\n').unwrap_or(text.as_str());
            vec![Element::new("programlisting")
                .with_children(vec![XmlNode::text(text)])
                .into()]
        }
        "ul" => vec![convert_list(element, Element::new("itemizedlist")).into()],
        "ol" => {
            let mut list = Element::new("orderedlist");
            if let Some(numeration) = numeration(element) {
                list.set_attr("numeration", numeration);
            }
            vec![convert_list(element, list).into()]
        }
        "li" => vec![listitem(element).into()],
        "dl" => vec![convert_definitions(element).into()],
        "blockquote" => {
            vec![Element::new("blockquote").with_children(convert_flow(element)).into()]
        }
        "table" => convert_table(element).map(XmlNode::from).into_iter().collect(),
        _ => convert_flow(element),
    }
}

fn numeration(list: &Element) -> Option<&'static str> {
    let style = list.attr("class").or_else(|| list.attr("type"))?;
    match style {
        "loweralpha" | "a" => Some("loweralpha"),
        "upperalpha" | "A" => Some("upperalpha"),
        "lowerroman" | "i" => Some("lowerroman"),
        "upperroman" | "I" => Some("upperroman"),
        "arabic" | "1" => Some("arabic"),
        _ => None,
    }
}

fn convert_list(element: &Element, mut list: Element) -> Element {
    for child in element.child_elements() {
        if child.name == "li" {
            list.push(listitem(child));
        } else {
            // Stray content between items stays inside the list as its own item.
            let blocks = convert_block(child);
            if !blocks.is_empty() {
                list.push(Element::new("listitem").with_children(blocks));
            }
        }
    }
    list
}

fn listitem(li: &Element) -> Element {
    let mut content = convert_flow(li);
    if content.is_empty() {
        content.push(Element::new("para").into());
    }
    Element::new("listitem").with_children(content)
}

fn convert_definitions(dl: &Element) -> Element {
    let mut list = Element::new("variablelist");
    let mut entry: Option<Element> = None;

    for child in dl.child_elements() {
        match child.name.as_str() {
            "dt" => {
                if let Some(done) = entry.take() {
                    list.push(finish_entry(done));
                }
                let term = Element::new("term")
                    .with_children(trim_edges(convert_inline_children(child)));
                entry = Some(Element::new("varlistentry").with_children(vec![term.into()]));
            }
            "dd" => {
                let open = entry.get_or_insert_with(|| {
                    Element::new("varlistentry").with_children(vec![Element::new("term").into()])
                });
                open.push(Element::new("listitem").with_children(convert_flow(child)));
            }
            _ => {}
        }
    }
    if let Some(done) = entry.take() {
        list.push(finish_entry(done));
    }
    list
}

/// A `varlistentry` needs a `listitem` even when the term had no definition.
fn finish_entry(mut entry: Element) -> Element {
    if !entry.child_elements().any(|c| c.name == "listitem") {
        entry.push(Element::new("listitem").with_children(vec![Element::new("para").into()]));
    }
    for child in &mut entry.children {
        if let XmlNode::Element(item) = child {
            if item.name == "listitem" && item.children.is_empty() {
                item.push(Element::new("para"));
            }
        }
    }
    entry
}

fn convert_table(table: &Element) -> Option<Element> {
    let mut rows: Vec<&Element> = Vec::new();
    for child in table.child_elements() {
        match child.name.as_str() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => {
                rows.extend(child.child_elements().filter(|r| r.name == "tr"));
            }
            _ => {}
        }
    }
    if rows.is_empty() {
        return None;
    }

    let cells = |row: &Element| -> Vec<Element> {
        row.child_elements()
            .filter(|c| c.name == "td" || c.name == "th")
            .map(|c| Element::new("entry").with_children(trim_edges(convert_inline_children(c))))
            .collect()
    };
    let is_header = |row: &Element| {
        let mut cells = row
            .child_elements()
            .filter(|c| c.name == "td" || c.name == "th")
            .peekable();
        cells.peek().is_some() && cells.all(|c| c.name == "th")
    };

    let cols = rows
        .iter()
        .map(|r| r.child_elements().filter(|c| c.name == "td" || c.name == "th").count())
        .max()
        .unwrap_or(0)
        .max(1);

    let header_rows = rows.iter().take_while(|r| is_header(**r)).count();
    let (head, body) = if header_rows == rows.len() {
        (&rows[..0], &rows[..])
    } else {
        (&rows[..header_rows], &rows[header_rows..])
    };

    let mut tgroup = Element::new("tgroup").with_attr("cols", cols.to_string());
    if !head.is_empty() {
        let mut thead = Element::new("thead");
        for row in head {
            thead.push(row_of(cells(*row)));
        }
        tgroup.push(thead);
    }
    let mut tbody = Element::new("tbody");
    for row in body {
        tbody.push(row_of(cells(*row)));
    }
    tgroup.push(tbody);

    Some(Element::new("informaltable").with_children(vec![tgroup.into()]))
}

fn row_of(entries: Vec<Element>) -> Element {
    Element::new("row").with_children(entries.into_iter().map(XmlNode::from).collect())
}

fn convert_inline_children(element: &Element) -> Vec<XmlNode> {
    element.children.iter().flat_map(convert_inline).collect()
}

fn convert_inline(node: &XmlNode) -> Vec<XmlNode> {
    let element = match node {
        XmlNode::Text(text) => return vec![XmlNode::text(text.as_str())],
        XmlNode::Element(e) => e,
    };
    let children = || convert_inline_children(element);

    let converted = match element.name.as_str() {
        "a" => match element.attr("href") {
            Some(href) if href.starts_with('#') => {
                let target = href.rsplit('#').next().unwrap_or_default();
                Element::new("link").with_attr("linkend", target)
            }
            Some(href) => Element::new("ulink").with_attr("url", href),
            None => return children(),
        },
        "strong" | "b" => Element::new("emphasis").with_attr("role", "bold"),
        "em" | "i" | "cite" => Element::new("emphasis"),
        "u" | "ins" => Element::new("emphasis").with_attr("role", "underline"),
        "del" | "s" | "strike" => Element::new("emphasis").with_attr("role", "strikethrough"),
        "tt" | "code" | "kbd" | "samp" | "var" => Element::new("literal"),
        "sup" => Element::new("superscript"),
        "sub" => Element::new("subscript"),
        "q" => Element::new("quote"),
        "br" => return vec![XmlNode::text("\n")],
        "img" => {
            let Some(src) = element.attr("src") else {
                return Vec::new();
            };
            let data = Element::new("imagedata").with_attr("fileref", src);
            let object = Element::new("imageobject").with_children(vec![data.into()]);
            return vec![Element::new("inlinemediaobject")
                .with_children(vec![object.into()])
                .into()];
        }
        _ => return children(),
    };

    vec![converted.with_children(children()).into()]
}

/// Strips leading whitespace from the first text node and trailing whitespace from the
/// last one, dropping them if nothing is left.
fn trim_edges(mut nodes: Vec<XmlNode>) -> Vec<XmlNode> {
    if let Some(XmlNode::Text(first)) = nodes.first_mut() {
        *first = first.trim_start().to_string();
    }
    if let Some(XmlNode::Text(last)) = nodes.last_mut() {
        *last = last.trim_end().to_string();
    }
    nodes.retain(|n| !matches!(n, XmlNode::Text(t) if t.is_empty()));
    nodes
}
