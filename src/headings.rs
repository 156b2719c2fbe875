use crate::xml::{Element, XmlNode};

/// Level given to the shallowest heading of a page.
pub const TOP_HEADING_LEVEL: u8 = 1;

pub fn heading_level(name: &str) -> Option<u8> {
    match name {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

/// Renumbers the heading levels used under `root` densely from [`TOP_HEADING_LEVEL`].
///
/// A page written with `==` and `====` headings ends up with `h1` and `h2`, so the
/// section nesting built from it does not depend on which levels the author picked.
/// Returns the number of headings seen.
pub fn normalize_headings(root: &mut Element) -> usize {
    let mut used = [false; 7];
    let count = collect_levels(root, &mut used);

    let mut mapping = [0u8; 7];
    let mut next = TOP_HEADING_LEVEL;
    for level in 1..=6 {
        if used[level] {
            mapping[level] = next;
            next += 1;
        }
    }

    rename(root, &mapping);
    count
}

fn collect_levels(element: &Element, used: &mut [bool; 7]) -> usize {
    let mut count = 0;
    if let Some(level) = heading_level(&element.name) {
        used[usize::from(level)] = true;
        count += 1;
    }
    for child in element.child_elements() {
        count += collect_levels(child, used);
    }
    count
}

fn rename(element: &mut Element, mapping: &[u8; 7]) {
    if let Some(level) = heading_level(&element.name) {
        element.name = format!("h{}", mapping[usize::from(level)]);
    }
    for child in &mut element.children {
        if let XmlNode::Element(e) = child {
            rename(e, mapping);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parse_html;

    fn levels(root: &Element) -> Vec<String> {
        let mut out = Vec::new();
        fn walk(e: &Element, out: &mut Vec<String>) {
            if heading_level(&e.name).is_some() {
                out.push(format!("{}:{}", e.name, e.text_content()));
            }
            for c in e.child_elements() {
                walk(c, out);
            }
        }
        walk(root, &mut out);
        out
    }

    #[test]
    fn shifts_to_top_level() {
        let mut root = parse_html("<h2>A</h2><p>x</p><h3>B</h3><h2>C</h2>").unwrap();
        assert_eq!(normalize_headings(&mut root), 3);
        assert_eq!(levels(&root), vec!["h1:A", "h2:B", "h1:C"]);
    }

    #[test]
    fn closes_level_gaps() {
        let mut root = parse_html("<h1>A</h1><h4>B</h4><h6>C</h6>").unwrap();
        normalize_headings(&mut root);
        assert_eq!(levels(&root), vec!["h1:A", "h2:B", "h3:C"]);
    }

    #[test]
    fn already_normal_is_unchanged() {
        let mut root = parse_html("<h1>A</h1><h2>B</h2>").unwrap();
        let before = root.clone();
        normalize_headings(&mut root);
        assert_eq!(root, before);
    }

    #[test]
    fn no_headings() {
        let mut root = parse_html("<p>x</p>").unwrap();
        assert_eq!(normalize_headings(&mut root), 0);
    }

    #[test]
    fn nested_headings_are_found() {
        let mut root = parse_html("<div><h3>A</h3></div><blockquote><h5>B</h5></blockquote>").unwrap();
        normalize_headings(&mut root);
        assert_eq!(levels(&root), vec!["h1:A", "h2:B"]);
    }
}
