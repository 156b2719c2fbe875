//! wiki2docbook: Trac wiki guide pages to DocBook XML
//!
//! This crate turns a tree of wiki pages into a set of DocBook fragments that a DocBook
//! toolchain assembles into one book through XInclude:
//!
//! 1. **Read Pass** -- Parse the bullet list of the index page (`GuideIndex`) into a page
//!    tree: depth, parent and container flag per page, all page texts loaded up front
//! 2. **Render Pass** -- Format each page's wiki markup as HTML; container pages only keep
//!    links to their direct children, and guide links become in-book anchors
//! 3. **Transform Pass** -- Clean the HTML into an XHTML tree, normalize heading levels
//!    and convert it to DocBook under a placeholder root
//! 4. **Patch Pass** -- Replace child-link lists with `xi:include` directives and name the
//!    root after the page depth (`book`, `chapter`, `section`)
//! 5. **Write Pass** -- Store each fragment as `<output>/<PageName>.xml`
//!
//! # Key Modules
//!
//! - [`index`] -- Index reader building the [`index::BuildContext`]
//! - [`filter`] -- Guide link detection and indirect-link filtering
//! - [`wiki`] / [`inline`] -- Wiki markup formatter (blocks and inline markup)
//! - [`render`] -- Per-page rendering with link rewriting
//! - [`xml`] -- Owned XML tree, tolerant HTML parsing and serialization
//! - [`headings`] -- Heading level normalization
//! - [`docbook`] -- XHTML to DocBook conversion
//! - [`patch`] -- Structural patching of DocBook fragments
//! - [`writer`] -- Output files
//! - [`pipeline`] -- Read and process phases driven from a [`config::BuildConfig`]
//! - [`models`] -- Page records and structural elements
//! - [`config`] -- Constants and run configuration
//!
//! # Example Usage
//!
//! ```bash
//! # Convert wiki/GuideIndex and everything it lists into docbook/
//! wiki2docbook
//!
//! # Other locations, with progress logging
//! wiki2docbook --wiki-dir pages --output out -v
//! ```

pub mod config;
pub mod docbook;
pub mod filter;
pub mod headings;
pub mod index;
pub mod inline;
pub mod models;
pub mod patch;
pub mod pipeline;
pub mod render;
pub mod wiki;
pub mod writer;
pub mod xml;
