use crate::filter::{guide_link_item, shallowest_link_depth};
use crate::models::{is_guide_page, Page};
use anyhow::{bail, Context, Result};
use rustc_hash::FxHashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Every page of one build, in index order, with the tree recorded as per-page depth
/// and parent. Filled once by the read phase and only read afterwards.
#[derive(Debug, Default)]
pub struct BuildContext {
    pages: Vec<Page>,
    positions: FxHashMap<String, usize>,
}

impl BuildContext {
    /// Reads the index page and every page it lists from `wiki_dir`.
    pub fn read_index(wiki_dir: impl AsRef<Path>, index_name: &str) -> Result<Self> {
        let wiki_dir = wiki_dir.as_ref();
        info!("Reading index {} from: {}", index_name, wiki_dir.display());
        Self::read_index_with(index_name, |name| {
            let path = wiki_dir.join(name);
            fs::read_to_string(&path)
                .with_context(|| format!("Failed to read wiki page: {}", path.display()))
        })
    }

    /// Same as [`BuildContext::read_index`] with page text supplied by `load`.
    pub fn read_index_with<F>(index_name: &str, mut load: F) -> Result<Self>
    where
        F: FnMut(&str) -> Result<String>,
    {
        if !is_guide_page(index_name) {
            bail!("Index page {} is not a guide page name", index_name);
        }

        let mut ctx = Self::default();
        let index_text = load(index_name)?;
        ctx.insert(Page {
            name: index_name.to_string(),
            text: index_text.clone(),
            depth: 0,
            parent: None,
            is_container: true,
        });

        // The shallowest bullets are the chapters, whatever their indentation.
        let base = shallowest_link_depth(&index_text).unwrap_or(1);
        // Deeper slots are never cleared, a shallower line only overwrites its own level.
        let mut stack: Vec<String> = vec![index_name.to_string()];

        for (line_no, line) in index_text.lines().enumerate() {
            let Some((raw_depth, name)) = guide_link_item(line) else {
                continue;
            };
            let depth = raw_depth - base + 1;

            let parent = match stack.get(depth - 1) {
                Some(parent) => parent.clone(),
                None => bail!(
                    "{} line {}: {} is nested at depth {} without a parent at depth {}",
                    index_name,
                    line_no + 1,
                    name,
                    depth,
                    depth - 1
                ),
            };

            if depth < stack.len() {
                stack[depth] = name.to_string();
            } else {
                stack.push(name.to_string());
            }

            ctx.mark_container(&parent);
            debug!(page = name, depth, parent = %parent, "Index entry");

            if let Some(&pos) = ctx.positions.get(name) {
                let page = &mut ctx.pages[pos];
                page.depth = depth;
                page.parent = Some(parent);
            } else {
                let text = load(name)?;
                ctx.insert(Page {
                    name: name.to_string(),
                    text,
                    depth,
                    parent: Some(parent),
                    is_container: false,
                });
            }
        }

        info!(
            pages = ctx.pages.len(),
            containers = ctx.pages.iter().filter(|p| p.is_container).count(),
            "Index read"
        );

        Ok(ctx)
    }

    fn insert(&mut self, page: Page) {
        self.positions.insert(page.name.clone(), self.pages.len());
        self.pages.push(page);
    }

    fn mark_container(&mut self, name: &str) {
        if let Some(&pos) = self.positions.get(name) {
            self.pages[pos].is_container = true;
        }
    }

    /// Pages in the order they appear in the index, index page first.
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page(&self, name: &str) -> Option<&Page> {
        self.positions.get(name).map(|&pos| &self.pages[pos])
    }

    pub fn page_names(&self) -> impl Iterator<Item = &str> {
        self.pages.iter().map(|p| p.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}
