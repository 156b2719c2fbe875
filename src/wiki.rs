//! Trac wiki text to HTML.
//!
//! Covers the WikiFormatting subset used by guide pages: headings, paragraphs, nested
//! bullet and numbered lists, definition lists, tables, preformatted blocks, indented
//! quotes, citations and horizontal rules. Inline markup is handled by
//! [`crate::inline`]. The output is HTML as Trac would render it, not necessarily
//! well-formed XML; [`crate::xml::parse_html`] cleans it up.

use crate::inline::format_inline;
use crate::xml::decode_entities;
use once_cell::sync::Lazy;
use quick_xml::escape::{escape, partial_escape};
use regex::Regex;
use rustc_hash::FxHashSet;

static HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(?P<depth>={1,6})\s+(?P<title>.*?)\s+(?P<close>={1,6})\s*(?:#(?P<anchor>[\w.:-]+))?\s*$",
    )
    .unwrap()
});

static MARKUP_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

static NON_ANCHOR_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w:.-]+").unwrap());

static LIST_ITEM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<indent>[ \t]*)(?P<marker>\*|-|[0-9]+\.|[ivxIVX]{1,5}\.|[a-zA-Z]\.)\s+(?P<body>.*)$")
        .unwrap()
});

static DEFINITION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[ \t]+(?P<term>[^ \t].*?)::(?:\s+(?P<def>.*))?$").unwrap());

static RULE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*-{4,}\s*$").unwrap());

static CITATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^>+\s?(?P<text>.*)$").unwrap());

/// Renders wiki text to HTML. Holds the names of existing pages so CamelCase
/// references to them become links.
#[derive(Debug, Default, Clone)]
pub struct WikiFormatter {
    known_pages: FxHashSet<String>,
}

impl WikiFormatter {
    pub fn new<I, S>(known_pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known_pages: known_pages.into_iter().map(Into::into).collect(),
        }
    }

    pub fn format(&self, text: &str) -> String {
        let mut blocks = BlockFormatter {
            known_pages: &self.known_pages,
            out: String::with_capacity(text.len() * 2),
            paragraph: Vec::new(),
            quote: Vec::new(),
            citation: Vec::new(),
            lists: Vec::new(),
            item: None,
            definitions: Vec::new(),
            table_open: false,
            anchors: FxHashSet::default(),
        };

        let mut lines = text.lines();
        while let Some(line) = lines.next() {
            if line.trim() == "{{{" {
                blocks.close_all();
                blocks.preformatted(&mut lines);
            } else {
                blocks.line(line);
            }
        }
        blocks.close_all();
        blocks.out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ListKind {
    tag: &'static str,
    class: Option<&'static str>,
}

impl ListKind {
    fn from_marker(marker: &str) -> Self {
        let number = marker.trim_end_matches('.');
        let (tag, class) = if marker == "*" || marker == "-" {
            ("ul", None)
        } else if number.bytes().all(|b| b.is_ascii_digit()) {
            ("ol", None)
        } else if number.bytes().all(|b| matches!(b, b'i' | b'v' | b'x')) {
            ("ol", Some("lowerroman"))
        } else if number.bytes().all(|b| matches!(b, b'I' | b'V' | b'X')) {
            ("ol", Some("upperroman"))
        } else if number.bytes().all(|b| b.is_ascii_lowercase()) {
            ("ol", Some("loweralpha"))
        } else {
            ("ol", Some("upperalpha"))
        };
        Self { tag, class }
    }
}

#[derive(Debug)]
struct ListFrame {
    indent: usize,
    kind: ListKind,
}

struct BlockFormatter<'a> {
    known_pages: &'a FxHashSet<String>,
    out: String,
    paragraph: Vec<String>,
    quote: Vec<String>,
    citation: Vec<String>,
    lists: Vec<ListFrame>,
    /// Text of the innermost open list item, emitted when the item ends or nests a list
    item: Option<String>,
    definitions: Vec<(String, Vec<String>)>,
    table_open: bool,
    /// Heading ids handed out so far on this page
    anchors: FxHashSet<String>,
}

impl BlockFormatter<'_> {
    fn inline(&self, text: &str) -> String {
        format_inline(text, self.known_pages)
    }

    fn line(&mut self, line: &str) {
        if line.trim().is_empty() {
            self.close_all();
            return;
        }

        if let Some(caps) = HEADING
            .captures(line)
            .filter(|caps| caps["depth"].len() == caps["close"].len())
        {
            self.close_all();
            let level = caps["depth"].len();
            let title = self.inline(caps["title"].trim());
            let anchor = match caps.name("anchor") {
                Some(anchor) => anchor.as_str().to_string(),
                None => heading_anchor(&title),
            };
            let anchor = self.unique_anchor(anchor);
            self.out.push_str(&format!(
                "<h{level} id=\"{}\">{title}</h{level}>\n",
                escape(anchor.as_str())
            ));
            return;
        }

        if RULE.is_match(line) {
            self.close_all();
            self.out.push_str("<hr />\n");
            return;
        }

        let trimmed = line.trim();
        if trimmed.len() >= 4 && trimmed.starts_with("||") && trimmed.ends_with("||") {
            self.table_row(trimmed);
            return;
        }

        if let Some(caps) = LIST_ITEM.captures(line) {
            let indent = caps["indent"].len();
            let marker = &caps["marker"];
            if indent > 0 || marker == "*" {
                self.list_item(indent, ListKind::from_marker(marker), &caps["body"]);
                return;
            }
        }

        if let Some(caps) = DEFINITION.captures(line) {
            if self.lists.is_empty() {
                self.close_paragraphs();
                self.close_table();
                let def = caps.name("def").map(|m| m.as_str().to_string());
                self.definitions
                    .push((caps["term"].trim().to_string(), def.into_iter().collect()));
                return;
            }
        }

        let indented = line.starts_with([' ', '\t']);

        if indented {
            if let Some((_, def)) = self.definitions.last_mut() {
                def.push(trimmed.to_string());
                return;
            }
            if let Some(item) = self.item.as_mut() {
                item.push('\n');
                item.push_str(trimmed);
                return;
            }
            self.close_lists();
            self.close_table();
            self.close_definitions();
            if !self.paragraph.is_empty() {
                self.close_paragraph();
            }
            if !self.citation.is_empty() {
                self.close_citation();
            }
            self.quote.push(trimmed.to_string());
            return;
        }

        if let Some(caps) = CITATION.captures(line) {
            self.close_lists();
            self.close_table();
            self.close_definitions();
            self.close_paragraph();
            self.close_quote();
            self.citation.push(caps["text"].to_string());
            return;
        }

        self.close_lists();
        self.close_table();
        self.close_definitions();
        self.close_quote();
        self.close_citation();
        self.paragraph.push(line.to_string());
    }

    /// Numbers repeated anchors the way Trac does: `Setup`, `Setup1`, `Setup2`.
    fn unique_anchor(&mut self, base: String) -> String {
        let mut anchor = base.clone();
        let mut n = 1;
        while self.anchors.contains(&anchor) {
            anchor = format!("{base}{n}");
            n += 1;
        }
        self.anchors.insert(anchor.clone());
        anchor
    }

    fn preformatted<'l>(&mut self, lines: &mut impl Iterator<Item = &'l str>) {
        let mut body: Vec<&str> = Vec::new();
        let mut nesting = 1;
        for line in lines {
            match line.trim() {
                "{{{" => nesting += 1,
                "}}}" => {
                    nesting -= 1;
                    if nesting == 0 {
                        break;
                    }
                }
                _ => {}
            }
            body.push(line);
        }
        if body.first().is_some_and(|first| first.starts_with("#!")) {
            body.remove(0);
        }

        self.out.push_str("<pre class=\"wiki\">");
        self.out.push_str(&partial_escape(body.join("\n").as_str()));
        self.out.push_str("</pre>\n");
    }

    fn list_item(&mut self, indent: usize, kind: ListKind, body: &str) {
        self.close_paragraphs();
        self.close_table();
        self.close_definitions();
        self.flush_item();

        while self.lists.last().is_some_and(|top| top.indent > indent) {
            self.close_list();
        }

        let same_kind = self
            .lists
            .last()
            .filter(|top| top.indent == indent)
            .map(|top| top.kind == kind);
        match same_kind {
            Some(true) => self.out.push_str("</li>\n<li>"),
            Some(false) => {
                self.close_list();
                self.open_list(indent, kind);
            }
            None => self.open_list(indent, kind),
        }

        self.item = Some(body.to_string());
    }

    fn open_list(&mut self, indent: usize, kind: ListKind) {
        self.flush_item();
        match kind.class {
            Some(class) => self.out.push_str(&format!("<{} class=\"{class}\">", kind.tag)),
            None => self.out.push_str(&format!("<{}>", kind.tag)),
        }
        self.out.push_str("<li>");
        self.lists.push(ListFrame { indent, kind });
    }

    fn flush_item(&mut self) {
        if let Some(text) = self.item.take() {
            let html = self.inline(&text);
            self.out.push_str(&html);
        }
    }

    fn close_list(&mut self) {
        self.flush_item();
        if let Some(frame) = self.lists.pop() {
            self.out.push_str(&format!("</li></{}>\n", frame.kind.tag));
        }
    }

    fn close_lists(&mut self) {
        while !self.lists.is_empty() {
            self.close_list();
        }
    }

    fn table_row(&mut self, row: &str) {
        self.close_paragraphs();
        self.close_lists();
        self.close_definitions();
        if !self.table_open {
            self.out.push_str("<table class=\"wiki\">\n");
            self.table_open = true;
        }

        self.out.push_str("<tr>");
        for cell in row[2..row.len() - 2].split("||") {
            let trimmed = cell.trim();
            let header = trimmed.len() >= 2 && trimmed.starts_with('=') && trimmed.ends_with('=');
            if header {
                let text = self.inline(trimmed.trim_matches('=').trim());
                self.out.push_str(&format!("<th>{text}</th>"));
            } else {
                let text = self.inline(trimmed);
                self.out.push_str(&format!("<td>{text}</td>"));
            }
        }
        self.out.push_str("</tr>\n");
    }

    fn close_table(&mut self) {
        if self.table_open {
            self.out.push_str("</table>\n");
            self.table_open = false;
        }
    }

    fn close_definitions(&mut self) {
        if self.definitions.is_empty() {
            return;
        }
        let definitions = std::mem::take(&mut self.definitions);
        self.out.push_str("<dl>");
        for (term, def) in definitions {
            let term = self.inline(&term);
            let def = self.inline(&def.join("\n"));
            self.out.push_str(&format!("<dt>{term}</dt><dd>{def}</dd>"));
        }
        self.out.push_str("</dl>\n");
    }

    fn close_paragraph(&mut self) {
        if self.paragraph.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.paragraph).join("\n");
        let html = self.inline(&text);
        if !html.trim().is_empty() {
            self.out.push_str(&format!("<p>\n{html}\n</p>\n"));
        }
    }

    fn close_quote(&mut self) {
        if self.quote.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.quote).join("\n");
        let html = self.inline(&text);
        self.out.push_str(&format!("<blockquote>\n<p>\n{html}\n</p>\n</blockquote>\n"));
    }

    fn close_citation(&mut self) {
        if self.citation.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.citation).join("\n");
        let html = self.inline(&text);
        self.out.push_str(&format!(
            "<blockquote class=\"citation\">\n<p>\n{html}\n</p>\n</blockquote>\n"
        ));
    }

    fn close_paragraphs(&mut self) {
        self.close_paragraph();
        self.close_quote();
        self.close_citation();
    }

    fn close_all(&mut self) {
        self.close_paragraphs();
        self.close_lists();
        self.close_definitions();
        self.close_table();
    }
}

/// Id Trac derives from a heading: its plain text reduced to word characters, `:`,
/// `.` and `-`, with an `a` in front when that would not start a valid id.
fn heading_anchor(title_html: &str) -> String {
    let plain = decode_entities(&MARKUP_TAG.replace_all(title_html, ""));
    let anchor = NON_ANCHOR_CHARS.replace_all(&plain, "");
    match anchor.chars().next() {
        Some(c) if !c.is_ascii_digit() && c != '.' && c != '-' => anchor.into_owned(),
        _ => format!("a{anchor}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(text: &str) -> String {
        WikiFormatter::default().format(text)
    }

    #[test]
    fn paragraph() {
        assert_eq!(format("Hello"), "<p>\nHello\n</p>\n");
        assert_eq!(format("one\ntwo\n\nthree"), "<p>\none\ntwo\n</p>\n<p>\nthree\n</p>\n");
    }

    #[test]
    fn headings() {
        assert_eq!(format("= Title ="), "<h1 id=\"Title\">Title</h1>\n");
        assert_eq!(format("=== Sub ''x'' ==="), "<h3 id=\"Subx\">Sub <em>x</em></h3>\n");
        assert_eq!(format("== Anchored == #here"), "<h2 id=\"here\">Anchored</h2>\n");
    }

    #[test]
    fn generated_anchors() {
        assert_eq!(format("== 2.0 & later =="), "<h2 id=\"a2.0later\">2.0 &amp; later</h2>\n");
        assert_eq!(format("== !!! =="), "<h2 id=\"a\">!!!</h2>\n");
        assert_eq!(
            format("== Setup ==\n== Setup ==\n== Setup =="),
            "<h2 id=\"Setup\">Setup</h2>\n<h2 id=\"Setup1\">Setup</h2>\n<h2 id=\"Setup2\">Setup</h2>\n"
        );
    }

    #[test]
    fn mismatched_heading_is_a_paragraph() {
        assert_eq!(format("== x ==="), "<p>\n== x ===\n</p>\n");
    }

    #[test]
    fn flat_bullet_list() {
        assert_eq!(
            format("  * [wiki:GuideA]\n  * [wiki:GuideB]\n"),
            "<ul><li><a class=\"wiki\" href=\"/wiki/GuideA\">GuideA</a></li>\n\
             <li><a class=\"wiki\" href=\"/wiki/GuideB\">GuideB</a></li></ul>\n"
        );
    }

    #[test]
    fn nested_lists() {
        assert_eq!(
            format(" * a\n   * b\n * c"),
            "<ul><li>a<ul><li>b</li></ul>\n</li>\n<li>c</li></ul>\n"
        );
    }

    #[test]
    fn ordered_list_kinds() {
        assert_eq!(format(" 1. one\n 1. two"), "<ol><li>one</li>\n<li>two</li></ol>\n");
        assert_eq!(format(" a. x"), "<ol class=\"loweralpha\"><li>x</li></ol>\n");
        assert_eq!(format(" i. x"), "<ol class=\"lowerroman\"><li>x</li></ol>\n");
    }

    #[test]
    fn list_kind_change_starts_new_list() {
        assert_eq!(
            format(" * a\n 1. b"),
            "<ul><li>a</li></ul>\n<ol><li>b</li></ol>\n"
        );
    }

    #[test]
    fn list_item_continuation() {
        assert_eq!(
            format(" * first\n   more\nafter"),
            "<ul><li>first\nmore</li></ul>\n<p>\nafter\n</p>\n"
        );
    }

    #[test]
    fn unindented_numbers_are_text() {
        assert_eq!(format("1. not a list"), "<p>\n1. not a list\n</p>\n");
    }

    #[test]
    fn preformatted_block() {
        assert_eq!(
            format("{{{\n#!sh\nls <dir>\n  '''x'''\n}}}\ntext"),
            "<pre class=\"wiki\">ls &lt;dir&gt;\n  '''x'''</pre>\n<p>\ntext\n</p>\n"
        );
    }

    #[test]
    fn nested_preformatted_block() {
        assert_eq!(
            format("{{{\n{{{\ninner\n}}}\n}}}"),
            "<pre class=\"wiki\">{{{\ninner\n}}}</pre>\n"
        );
    }

    #[test]
    fn table() {
        assert_eq!(
            format("||= Key =||= Value =||\n|| a || ''b'' ||"),
            "<table class=\"wiki\">\n<tr><th>Key</th><th>Value</th></tr>\n\
             <tr><td>a</td><td><em>b</em></td></tr>\n</table>\n"
        );
    }

    #[test]
    fn definition_list() {
        assert_eq!(
            format(" term::\n   the definition\n other:: inline"),
            "<dl><dt>term</dt><dd>the definition</dd><dt>other</dt><dd>inline</dd></dl>\n"
        );
    }

    #[test]
    fn indented_text_is_quote() {
        assert_eq!(
            format("  quoted text"),
            "<blockquote>\n<p>\nquoted text\n</p>\n</blockquote>\n"
        );
    }

    #[test]
    fn citation() {
        assert_eq!(
            format("> cited"),
            "<blockquote class=\"citation\">\n<p>\ncited\n</p>\n</blockquote>\n"
        );
    }

    #[test]
    fn horizontal_rule() {
        assert_eq!(format("a\n----\nb"), "<p>\na\n</p>\n<hr />\n<p>\nb\n</p>\n");
    }

    #[test]
    fn macro_only_paragraph_is_dropped() {
        assert_eq!(format("[[PageOutline]]\n\nText"), "<p>\nText\n</p>\n");
    }

    #[test]
    fn known_pages_are_linked() {
        let formatter = WikiFormatter::new(["GuideA"]);
        assert_eq!(
            formatter.format("See GuideA."),
            "<p>\nSee <a class=\"wiki\" href=\"/wiki/GuideA\">GuideA</a>.\n</p>\n"
        );
    }
}
