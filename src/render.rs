use crate::config::{GUIDE_PREFIX, WIKI_LINK_BASE};
use crate::filter::filter_out_indirect;
use crate::models::Page;
use crate::wiki::WikiFormatter;
use std::borrow::Cow;

/// Renders a page to HTML with cross-page guide links pointing at in-book anchors.
///
/// Container pages only show their direct children; see [`filter_out_indirect`].
pub fn render_page(formatter: &WikiFormatter, page: &Page) -> String {
    let text: Cow<'_, str> = if page.is_container {
        Cow::Owned(filter_out_indirect(&page.text))
    } else {
        Cow::Borrowed(&page.text)
    };
    let html = formatter.format(&text);
    rewrite_guide_links(&html)
}

/// `/wiki/GuideFoo` becomes `#GuideFoo`, the id the page gets once assembled.
pub fn rewrite_guide_links(html: &str) -> String {
    html.replace(
        &format!("{WIKI_LINK_BASE}{GUIDE_PREFIX}"),
        &format!("#{GUIDE_PREFIX}"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(name: &str, text: &str, is_container: bool) -> Page {
        Page {
            name: name.to_string(),
            text: text.to_string(),
            depth: 1,
            parent: Some("GuideIndex".to_string()),
            is_container,
        }
    }

    #[test]
    fn rewrites_only_guide_links() {
        let html = r##"<a href="/wiki/GuideA">A</a> <a href="/wiki/WikiStart">W</a>"##;
        assert_eq!(
            rewrite_guide_links(html),
            r##"<a href="#GuideA">A</a> <a href="/wiki/WikiStart">W</a>"##
        );
    }

    #[test]
    fn anchored_link_keeps_fragment() {
        let formatter = WikiFormatter::default();
        let html = render_page(&formatter, &page("GuideB", "See [wiki:GuideA#Setup setup].", false));
        assert!(html.contains("<a class=\"wiki\" href=\"#GuideA#Setup\">setup</a>"));
    }

    #[test]
    fn leaf_page_keeps_nested_links() {
        let formatter = WikiFormatter::default();
        let html = render_page(
            &formatter,
            &page("GuideA", "  * [wiki:GuideB]\n    * [wiki:GuideC]\n", false),
        );
        assert!(html.contains("href=\"#GuideB\""));
        assert!(html.contains("href=\"#GuideC\""));
    }

    #[test]
    fn container_page_drops_grandchildren() {
        let formatter = WikiFormatter::default();
        let html = render_page(
            &formatter,
            &page("GuideA", "  * [wiki:GuideB]\n    * [wiki:GuideC]\n", true),
        );
        assert!(html.contains("href=\"#GuideB\""));
        assert!(!html.contains("GuideC"));
    }
}
