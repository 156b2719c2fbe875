use crate::config::{PLACEHOLDER_ROOT, XINCLUDE_NS};
use crate::models::{is_guide_page, Page};
use crate::xml::{self, Element, XmlNode};
use anyhow::{bail, Context, Result};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchedFragment {
    pub xml: String,
    /// Child pages pulled in with `xi:include`, in document order
    pub includes: Vec<String>,
}

/// Finishes a page's DocBook fragment.
///
/// On container pages, list items that only link to a guide page become XInclude
/// directives for that page's output file. Every page then gets its placeholder root
/// renamed to the element for its depth, with the page name as `id`.
pub fn patch_fragment(fragment: &str, page: &Page) -> Result<PatchedFragment> {
    let mut root = xml::parse_fragment(fragment)
        .with_context(|| format!("Failed to parse DocBook fragment of {}", page.name))?;
    if root.name != PLACEHOLDER_ROOT {
        bail!(
            "{}: expected fragment root <{}>, found <{}>",
            page.name,
            PLACEHOLDER_ROOT,
            root.name
        );
    }

    let mut includes = Vec::new();
    if page.is_container {
        let left = replace_child_lists(&mut root, &mut includes);
        if left > 0 {
            warn!(
                page = %page.name,
                items = left,
                "List items kept as-is, they are not a single guide link"
            );
        }
    }

    root.name = page.element().tag().to_string();
    root.set_attr("id", page.name.as_str());
    debug!(page = %page.name, element = %root.name, includes = includes.len(), "Patched fragment");

    Ok(PatchedFragment {
        xml: xml::to_document(&root),
        includes,
    })
}

/// The `xi:include` directive pulling in `page`'s output file.
pub fn include_element(page: &str) -> Element {
    Element::new("xi:include")
        .with_attr("xmlns:xi", XINCLUDE_NS)
        .with_attr("href", format!("{page}.xml"))
}

/// Guide page linked by a list item consisting of exactly one paragraph holding
/// exactly one link with text-only content.
pub fn included_page(item: &Element) -> Option<&str> {
    if item.name != "listitem" {
        return None;
    }
    let para = only_child(item, "para")?;
    let link = only_child(para, "link")?;
    if link.child_elements().next().is_some() {
        return None;
    }
    link.attr("linkend").filter(|name| is_guide_page(name))
}

fn only_child<'a>(element: &'a Element, name: &str) -> Option<&'a Element> {
    let mut children = element.significant_children();
    match (children.next(), children.next()) {
        (Some(XmlNode::Element(child)), None) if child.name == name => Some(child),
        _ => None,
    }
}

/// Rewrites every `itemizedlist` under `element` holding at least one include-able
/// item. Returns how many list items of those lists had to be kept.
fn replace_child_lists(element: &mut Element, includes: &mut Vec<String>) -> usize {
    let mut left = 0;
    for child in std::mem::take(&mut element.children) {
        match child {
            XmlNode::Element(list)
                if list.name == "itemizedlist"
                    && list.child_elements().any(|i| included_page(i).is_some()) =>
            {
                left += splice_list(list, &mut element.children, includes);
            }
            XmlNode::Element(mut other) => {
                left += replace_child_lists(&mut other, includes);
                element.children.push(other.into());
            }
            text => element.children.push(text),
        }
    }
    left
}

/// Emits includes in place of the list's matching items. Runs of remaining items are
/// wrapped in copies of the source list so they keep its attributes.
fn splice_list(list: Element, out: &mut Vec<XmlNode>, includes: &mut Vec<String>) -> usize {
    let Element {
        name,
        attrs,
        children,
    } = list;
    let mut pending: Option<Element> = None;
    let mut left = 0;

    for child in children {
        let target = child
            .as_element()
            .and_then(included_page)
            .map(str::to_string);
        match target {
            Some(page) => {
                if let Some(rest) = pending.take() {
                    out.push(rest.into());
                }
                out.push(include_element(&page).into());
                includes.push(page);
            }
            None if child.is_blank() => {}
            None => {
                let child = match child {
                    XmlNode::Element(mut item) => {
                        if item.name == "listitem" {
                            left += 1;
                        }
                        left += replace_child_lists(&mut item, includes);
                        XmlNode::Element(item)
                    }
                    text => text,
                };
                pending
                    .get_or_insert_with(|| Element {
                        name: name.clone(),
                        attrs: attrs.clone(),
                        children: Vec::new(),
                    })
                    .children
                    .push(child);
            }
        }
    }
    if let Some(rest) = pending {
        out.push(rest.into());
    }
    left
}
