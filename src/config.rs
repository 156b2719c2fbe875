use std::path::PathBuf;

/// Reserved prefix marking pages that take part in the guide
pub const GUIDE_PREFIX: &str = "Guide";

/// Root page whose bullet list defines the book structure
pub const DEFAULT_INDEX_PAGE: &str = "GuideIndex";

/// Directory holding the raw wiki pages, one file per page
pub const DEFAULT_WIKI_DIR: &str = "wiki";

/// Directory receiving `<PageName>.xml` files; must already exist
pub const DEFAULT_OUTPUT_DIR: &str = "docbook";

/// Spaces per nesting level in bullet lists
pub const INDENT_WIDTH: usize = 2;

/// Root tag emitted by the DocBook transform, replaced once the page depth is known
pub const PLACEHOLDER_ROOT: &str = "__top_element__";

pub const XINCLUDE_NS: &str = "http://www.w3.org/2001/XInclude";

/// Link base used by the wiki formatter (`/wiki/<Page>`)
pub const WIKI_LINK_BASE: &str = "/wiki/";

#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub wiki_dir: PathBuf,
    pub output_dir: PathBuf,
    pub index_page: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            wiki_dir: PathBuf::from(DEFAULT_WIKI_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            index_page: DEFAULT_INDEX_PAGE.to_string(),
        }
    }
}
