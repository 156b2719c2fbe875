use crate::config::GUIDE_PREFIX;
use once_cell::sync::Lazy;
use regex::Regex;

static GUIDE_PAGE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^{GUIDE_PREFIX}[a-zA-Z0-9]*$")).unwrap());

/// Returns true when `name` is a guide page name (`Guide` followed by alphanumerics).
pub fn is_guide_page(name: &str) -> bool {
    GUIDE_PAGE_NAME.is_match(name)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub name: String,
    pub text: String,
    /// 0 for the index page, otherwise the nesting level in the index list
    pub depth: usize,
    pub parent: Option<String>,
    /// Set when some other page lists this one as its parent
    pub is_container: bool,
}

impl Page {
    pub fn element(&self) -> StructuralElement {
        StructuralElement::for_depth(self.depth)
    }
}

/// DocBook element wrapping a page, chosen by its depth in the index tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuralElement {
    Book,
    Chapter,
    Section,
}

impl StructuralElement {
    pub fn for_depth(depth: usize) -> Self {
        match depth {
            0 => StructuralElement::Book,
            1 => StructuralElement::Chapter,
            _ => StructuralElement::Section,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            StructuralElement::Book => "book",
            StructuralElement::Chapter => "chapter",
            StructuralElement::Section => "section",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_by_depth() {
        assert_eq!(StructuralElement::for_depth(0).tag(), "book");
        assert_eq!(StructuralElement::for_depth(1).tag(), "chapter");
        assert_eq!(StructuralElement::for_depth(2).tag(), "section");
        assert_eq!(StructuralElement::for_depth(7).tag(), "section");
    }

    #[test]
    fn guide_page_names() {
        assert!(is_guide_page("GuideIndex"));
        assert!(is_guide_page("Guide"));
        assert!(is_guide_page("GuideOptions2"));
        assert!(!is_guide_page("WikiStart"));
        assert!(!is_guide_page("GuideMain/Sub"));
        assert!(!is_guide_page("Guide Index"));
    }
}
