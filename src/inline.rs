use crate::config::WIKI_LINK_BASE;
use once_cell::sync::Lazy;
use quick_xml::escape::{escape, partial_escape};
use regex::{Captures, Regex};
use rustc_hash::FxHashSet;

static INLINE_MARKUP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?P<escape>!)?(?:",
        r"(?P<bolditalic>''''')",
        r"|(?P<bold>''')",
        r"|(?P<italic>'')",
        r"|(?P<strong>\*\*)",
        r"|(?P<underline>__)",
        r"|(?P<strike>~~)",
        r"|(?P<sup>\^)",
        r"|(?P<sub>,,)",
        r"|\{\{\{(?P<mono>.*?)\}\}\}",
        r"|`(?P<tick>[^`]*)`",
        r"|\[\[(?P<macro>[A-Za-z][A-Za-z0-9_]*)(?:\((?P<args>[^)]*)\))?\]\]",
        r"|\[(?P<target>(?:wiki:|https?://|ftp://|mailto:)[^\s\]]+)(?:\s+(?P<label>[^\]]+))?\]",
        r"|(?P<wiki>\bwiki:[A-Za-z0-9_/#.-]*[A-Za-z0-9_/])",
        r#"|(?P<url>\bhttps?://[^\s<>\[\]"']*[^\s<>\[\]"'.,;:!?)])"#,
        r"|(?P<camel>\b[A-Z][a-z0-9]+(?:[A-Z][a-z0-9]*)+\b)",
        r")"
    ))
    .unwrap()
});

/// Formats one block's worth of inline wiki markup as HTML.
///
/// CamelCase words become wiki links only when they name a page in `known_pages`.
/// Styles left open at the end of the text are closed.
pub fn format_inline(text: &str, known_pages: &FxHashSet<String>) -> String {
    let mut f = InlineFormatter {
        out: String::with_capacity(text.len() + 16),
        open: Vec::new(),
        known_pages,
    };

    let mut last = 0;
    for caps in INLINE_MARKUP.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        f.text(&text[last..whole.start()]);
        last = whole.end();

        if caps.name("escape").is_some() {
            f.text(&whole.as_str()[1..]);
            continue;
        }
        f.token(&caps);
    }
    f.text(&text[last..]);
    f.close_all();
    f.out
}

struct InlineFormatter<'a> {
    out: String,
    open: Vec<&'static str>,
    known_pages: &'a FxHashSet<String>,
}

impl InlineFormatter<'_> {
    fn token(&mut self, caps: &Captures) {
        if caps.name("bolditalic").is_some() {
            if self.is_open("strong") && self.is_open("em") {
                self.toggle("em");
                self.toggle("strong");
            } else {
                self.toggle("strong");
                self.toggle("em");
            }
        } else if caps.name("bold").is_some() || caps.name("strong").is_some() {
            self.toggle("strong");
        } else if caps.name("italic").is_some() {
            self.toggle("em");
        } else if caps.name("underline").is_some() {
            self.toggle("u");
        } else if caps.name("strike").is_some() {
            self.toggle("del");
        } else if caps.name("sup").is_some() {
            self.toggle("sup");
        } else if caps.name("sub").is_some() {
            self.toggle("sub");
        } else if let Some(code) = caps.name("mono").or_else(|| caps.name("tick")) {
            self.out.push_str("<tt>");
            self.text(code.as_str());
            self.out.push_str("</tt>");
        } else if let Some(name) = caps.name("macro") {
            let args = caps.name("args").map_or("", |m| m.as_str());
            self.macro_call(name.as_str(), args);
        } else if let Some(target) = caps.name("target") {
            let target = target.as_str();
            let label = caps.name("label").map(|m| m.as_str().trim());
            match target.strip_prefix("wiki:") {
                Some(page) => self.wiki_link(page, label.unwrap_or(page)),
                None => self.external_link(target, label.unwrap_or(target)),
            }
        } else if let Some(bare) = caps.name("wiki") {
            let bare = bare.as_str();
            self.wiki_link(&bare["wiki:".len()..], bare);
        } else if let Some(url) = caps.name("url") {
            self.external_link(url.as_str(), url.as_str());
        } else if let Some(word) = caps.name("camel") {
            let word = word.as_str();
            if self.known_pages.contains(word) {
                self.wiki_link(word, word);
            } else {
                self.text(word);
            }
        }
    }

    fn text(&mut self, text: &str) {
        self.out.push_str(&partial_escape(text));
    }

    fn is_open(&self, tag: &str) -> bool {
        self.open.iter().any(|t| *t == tag)
    }

    fn toggle(&mut self, tag: &'static str) {
        let Some(pos) = self.open.iter().rposition(|t| *t == tag) else {
            self.out.push('<');
            self.out.push_str(tag);
            self.out.push('>');
            self.open.push(tag);
            return;
        };

        // Close everything opened after `tag` too, then reopen those to keep nesting valid.
        let closed: Vec<&'static str> = self.open.drain(pos..).collect();
        for t in closed.iter().rev() {
            self.out.push_str("</");
            self.out.push_str(t);
            self.out.push('>');
        }
        for t in &closed[1..] {
            self.out.push('<');
            self.out.push_str(t);
            self.out.push('>');
            self.open.push(*t);
        }
    }

    fn close_all(&mut self) {
        while let Some(tag) = self.open.pop() {
            self.out.push_str("</");
            self.out.push_str(tag);
            self.out.push('>');
        }
    }

    fn wiki_link(&mut self, page: &str, label: &str) {
        self.out.push_str("<a class=\"wiki\" href=\"");
        self.out.push_str(&escape(format!("{WIKI_LINK_BASE}{page}").as_str()));
        self.out.push_str("\">");
        self.text(label);
        self.out.push_str("</a>");
    }

    fn external_link(&mut self, url: &str, label: &str) {
        self.out.push_str("<a class=\"ext-link\" href=\"");
        self.out.push_str(&escape(url));
        self.out.push_str("\">");
        self.text(label);
        self.out.push_str("</a>");
    }

    fn macro_call(&mut self, name: &str, args: &str) {
        match name {
            "BR" | "br" => self.out.push_str("<br />"),
            "Image" => {
                let file = args.split(',').next().unwrap_or("").trim();
                if !file.is_empty() {
                    let file = escape(file);
                    self.out.push_str("<img src=\"");
                    self.out.push_str(&file);
                    self.out.push_str("\" alt=\"");
                    self.out.push_str(&file);
                    self.out.push_str("\" />");
                }
            }
            _ => {}
        }
    }
}
