use crate::config::{GUIDE_PREFIX, INDENT_WIDTH};
use once_cell::sync::Lazy;
use regex::Regex;

/// A bullet whose text starts with a wiki link to a guide page. Only the line start is
/// anchored, so a label or trailing text after the page name still matches.
static GUIDE_LINK_ITEM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^( *)\* \[wiki:({GUIDE_PREFIX}[a-zA-Z0-9]*)")).unwrap()
});

/// Depth and page name of a bulleted guide link, `None` for any other line.
///
/// Depth is the number of leading spaces divided by [`INDENT_WIDTH`], rounded down, so
/// odd indentation is tolerated.
pub fn guide_link_item(line: &str) -> Option<(usize, &str)> {
    let caps = GUIDE_LINK_ITEM.captures(line)?;
    let depth = caps.get(1).map_or(0, |m| m.as_str().len()) / INDENT_WIDTH;
    let name = caps.get(2)?.as_str();
    Some((depth, name))
}

/// Raw depth of the shallowest guide link bullet in `text`. Bullets at this depth are
/// the direct children of the page.
pub fn shallowest_link_depth(text: &str) -> Option<usize> {
    text.lines()
        .filter_map(guide_link_item)
        .map(|(depth, _)| depth)
        .min()
}

/// Drops guide links nested deeper than the first list level.
///
/// Container pages list their whole subtree; only direct children stay in the rendered
/// body because grandchildren are pulled in by the child's own inclusions. Lines that
/// are not guide links are kept as they are.
pub fn filter_out_indirect(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let base = shallowest_link_depth(text);
    for line in text.lines() {
        let direct = guide_link_item(line).is_none_or(|(depth, _)| Some(depth) == base);
        if direct {
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}
