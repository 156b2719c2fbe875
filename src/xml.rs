//! Minimal owned XML tree on top of `quick_xml`.
//!
//! Two parsing modes share one tree builder: [`parse_html`] tolerates the sloppiness of
//! rendered HTML (void elements, stray or missing end tags, HTML entities) and always
//! yields an `html/body` document, while [`parse_fragment`] expects well-formed XML.

use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use quick_xml::escape::{escape, partial_escape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::{Captures, Regex};

const DOCUMENT: &str = "#document";

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "wbr",
];

/// Elements laid out one child per line when serialized. Everything else is written
/// inline so mixed content keeps its exact whitespace.
const BLOCK_CONTAINERS: &[&str] = &[
    "book",
    "chapter",
    "section",
    "itemizedlist",
    "orderedlist",
    "listitem",
    "variablelist",
    "varlistentry",
    "blockquote",
    "informaltable",
    "tgroup",
    "thead",
    "tbody",
    "row",
    "inlinemediaobject",
    "imageobject",
    crate::config::PLACEHOLDER_ROOT,
];

const PARAGRAPH_CLOSERS: &[&str] = &[
    "p", "ul", "ol", "dl", "pre", "table", "div", "blockquote", "hr", "h1", "h2", "h3",
    "h4", "h5", "h6",
];

static ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z][a-zA-Z0-9]*);").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(Element),
    Text(String),
}

impl XmlNode {
    pub fn text(text: impl Into<String>) -> Self {
        XmlNode::Text(text.into())
    }

    /// Whitespace-only text carries no content of its own.
    pub fn is_blank(&self) -> bool {
        matches!(self, XmlNode::Text(t) if t.trim().is_empty())
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        }
    }
}

impl From<Element> for XmlNode {
    fn from(element: Element) -> Self {
        XmlNode::Element(element)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    pub fn with_children(mut self, children: Vec<XmlNode>) -> Self {
        self.children = children;
        self
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((key, value)),
        }
    }

    /// Appends a child, merging adjacent text nodes.
    pub fn push(&mut self, node: impl Into<XmlNode>) {
        match (self.children.last_mut(), node.into()) {
            (Some(XmlNode::Text(prev)), XmlNode::Text(text)) => prev.push_str(&text),
            (_, node) => self.children.push(node),
        }
    }

    pub fn push_text(&mut self, text: &str) {
        if !text.is_empty() {
            self.push(XmlNode::text(text));
        }
    }

    /// Children other than whitespace-only text.
    pub fn significant_children(&self) -> impl Iterator<Item = &XmlNode> {
        self.children.iter().filter(|c| !c.is_blank())
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(XmlNode::as_element)
    }

    /// First descendant (or self) named `name`, depth first.
    pub fn find(&self, name: &str) -> Option<&Element> {
        if self.name == name {
            return Some(self);
        }
        self.child_elements().find_map(|c| c.find(name))
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        write_element(self, &mut out);
        out
    }
}

fn collect_text(element: &Element, out: &mut String) {
    for child in &element.children {
        match child {
            XmlNode::Text(t) => out.push_str(t),
            XmlNode::Element(e) => collect_text(e, out),
        }
    }
}

/// Serializes `root` as a standalone UTF-8 document.
pub fn to_document(root: &Element) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
    write_element(root, &mut out);
    out.push('\n');
    out
}

fn write_element(element: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&element.name);
    for (key, value) in &element.attrs {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape(value.as_str()));
        out.push('"');
    }
    if element.children.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');

    let block = BLOCK_CONTAINERS.contains(&element.name.as_str());
    if block {
        out.push('\n');
    }
    for child in &element.children {
        match child {
            XmlNode::Text(text) => {
                if block && text.trim().is_empty() {
                    continue;
                }
                out.push_str(&partial_escape(text.as_str()));
            }
            XmlNode::Element(e) => {
                write_element(e, out);
                if block {
                    out.push('\n');
                }
            }
        }
    }

    out.push_str("</");
    out.push_str(&element.name);
    out.push('>');
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Html,
    Xml,
}

/// Parses rendered HTML into a well-formed `html` element with a `body` child.
pub fn parse_html(html: &str) -> Result<Element> {
    let document = build_tree(html, Mode::Html)?;

    let mut html_element = None;
    let mut rest = Vec::new();
    for node in document.children {
        match node {
            XmlNode::Element(e) if e.name == "html" && html_element.is_none() => {
                html_element = Some(e)
            }
            other => rest.push(other),
        }
    }
    let mut root = html_element.unwrap_or_else(|| Element::new("html").with_children(rest));

    if !root.children.iter().any(|n| matches!(n, XmlNode::Element(e) if e.name == "body")) {
        let (head, rest): (Vec<XmlNode>, Vec<XmlNode>) = root
            .children
            .drain(..)
            .partition(|n| matches!(n, XmlNode::Element(e) if e.name == "head"));
        root.children = head;
        root.children
            .push(Element::new("body").with_children(rest).into());
    }

    Ok(root)
}

/// Parses a well-formed XML document and returns its root element.
pub fn parse_fragment(xml: &str) -> Result<Element> {
    let document = build_tree(xml, Mode::Xml)?;
    let mut roots = document.children.into_iter().filter(|n| !n.is_blank());
    match (roots.next(), roots.next()) {
        (Some(XmlNode::Element(root)), None) => Ok(root),
        (None, _) => bail!("XML document has no root element"),
        _ => bail!("XML document must have exactly one root element"),
    }
}

fn build_tree(input: &str, mode: Mode) -> Result<Element> {
    let mut reader = Reader::from_str(input);
    reader.trim_text(false);
    reader.check_end_names(mode == Mode::Xml);

    let mut stack: Vec<Element> = vec![Element::new(DOCUMENT)];

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) => bail!("Malformed markup at byte {}: {}", reader.buffer_position(), e),
        };
        match event {
            Event::Start(e) => {
                let element = start_element(&e, mode)?;
                if mode == Mode::Html {
                    close_implied(&mut stack, &element.name);
                }
                if mode == Mode::Html && VOID_ELEMENTS.contains(&element.name.as_str()) {
                    append(&mut stack, element);
                } else {
                    stack.push(element);
                }
            }
            Event::Empty(e) => {
                let element = start_element(&e, mode)?;
                if mode == Mode::Html {
                    close_implied(&mut stack, &element.name);
                }
                append(&mut stack, element);
            }
            Event::End(e) => {
                let name = decode_name(e.name().as_ref(), mode)?;
                match mode {
                    Mode::Xml => {
                        if stack.len() < 2 {
                            bail!("Unexpected end tag </{}>", name);
                        }
                        close_top(&mut stack);
                    }
                    Mode::Html => {
                        // A stray end tag closes nothing; a skipped one closes its children too.
                        if let Some(pos) = stack.iter().rposition(|el| el.name == name) {
                            if pos > 0 {
                                while stack.len() > pos {
                                    close_top(&mut stack);
                                }
                            }
                        }
                    }
                }
            }
            Event::Text(e) => {
                let raw = std::str::from_utf8(&e).context("Text is not valid UTF-8")?;
                let text = decode_entities(raw);
                if let Some(top) = stack.last_mut() {
                    top.push_text(&text);
                }
            }
            Event::CData(e) => {
                let text = std::str::from_utf8(&e).context("CDATA is not valid UTF-8")?;
                if let Some(top) = stack.last_mut() {
                    top.push_text(text);
                }
            }
            Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
            Event::Eof => break,
        }
    }

    if stack.len() > 1 {
        if mode == Mode::Xml {
            bail!("Unclosed element <{}>", stack[stack.len() - 1].name);
        }
        while stack.len() > 1 {
            close_top(&mut stack);
        }
    }

    stack.pop().context("Tree builder lost its document node")
}

/// Closes elements HTML ends implicitly: an open `li` when the next `li` starts, an
/// open `p` when a block starts.
fn close_implied(stack: &mut Vec<Element>, starting: &str) {
    let (names, scope): (&[&str], &[&str]) = match starting {
        "li" => (&["li"][..], &["ul", "ol"][..]),
        "dt" | "dd" => (&["dt", "dd"][..], &["dl"][..]),
        name if PARAGRAPH_CLOSERS.contains(&name) => (
            &["p"][..],
            &["div", "blockquote", "li", "dd", "td", "th", "body"][..],
        ),
        _ => return,
    };

    let mut target = None;
    for (pos, element) in stack.iter().enumerate().skip(1).rev() {
        if names.contains(&element.name.as_str()) {
            target = Some(pos);
            break;
        }
        if scope.contains(&element.name.as_str()) {
            break;
        }
    }

    if let Some(pos) = target {
        while stack.len() > pos {
            close_top(stack);
        }
    }
}

fn close_top(stack: &mut Vec<Element>) {
    if let Some(element) = stack.pop() {
        append(stack, element);
    }
}

fn append(stack: &mut [Element], element: Element) {
    if let Some(parent) = stack.last_mut() {
        parent.push(element);
    }
}

fn decode_name(raw: &[u8], mode: Mode) -> Result<String> {
    let name = std::str::from_utf8(raw).context("Tag name is not valid UTF-8")?;
    Ok(match mode {
        Mode::Html => name.to_ascii_lowercase(),
        Mode::Xml => name.to_string(),
    })
}

fn start_element(e: &BytesStart<'_>, mode: Mode) -> Result<Element> {
    let mut element = Element::new(decode_name(e.name().as_ref(), mode)?);
    let attributes = match mode {
        Mode::Html => e.html_attributes(),
        Mode::Xml => e.attributes(),
    };
    for attr in attributes {
        let attr = attr.context("Malformed attribute")?;
        let key = decode_name(attr.key.as_ref(), mode)?;
        let value = std::str::from_utf8(&attr.value).context("Attribute is not valid UTF-8")?;
        element.attrs.push((key, decode_entities(value)));
    }
    Ok(element)
}

/// Replaces XML, HTML and numeric character references. Unknown references are kept.
pub fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    ENTITY
        .replace_all(raw, |caps: &Captures| {
            let entity = &caps[1];
            let decoded = match entity.strip_prefix('#') {
                Some(num) => {
                    let code = match num.strip_prefix(['x', 'X']) {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => num.parse().ok(),
                    };
                    code.and_then(char::from_u32).map(String::from)
                }
                None => named_entity(entity).map(String::from),
            };
            decoded.unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn named_entity(name: &str) -> Option<&'static str> {
    Some(match name {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => "\u{00a0}",
        "copy" => "\u{00a9}",
        "reg" => "\u{00ae}",
        "trade" => "\u{2122}",
        "deg" => "\u{00b0}",
        "times" => "\u{00d7}",
        "middot" => "\u{00b7}",
        "laquo" => "\u{00ab}",
        "raquo" => "\u{00bb}",
        "mdash" => "\u{2014}",
        "ndash" => "\u{2013}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "ldquo" => "\u{201c}",
        "rdquo" => "\u{201d}",
        "bull" => "\u{2022}",
        "hellip" => "\u{2026}",
        "rarr" => "\u{2192}",
        "larr" => "\u{2190}",
        _ => return None,
    })
}
