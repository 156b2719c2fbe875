use crate::config::BuildConfig;
use crate::docbook::Transformer;
use crate::index::BuildContext;
use crate::models::Page;
use crate::patch::patch_fragment;
use crate::render::render_page;
use crate::wiki::WikiFormatter;
use crate::writer::{ensure_output_dir, write_fragment};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    pub pages: usize,
    pub containers: usize,
    pub includes: usize,
    pub written: Vec<PathBuf>,
}

/// Reads the wiki tree described by `config` and writes one DocBook file per page.
pub fn run(config: &BuildConfig) -> Result<BuildSummary> {
    ensure_output_dir(&config.output_dir)?;
    let ctx = BuildContext::read_index(&config.wiki_dir, &config.index_page)?;
    process_pages(&ctx, &config.output_dir)
}

/// Renders, transforms, patches and writes every page of `ctx`, index page first.
pub fn process_pages(ctx: &BuildContext, out_dir: &Path) -> Result<BuildSummary> {
    ensure_output_dir(out_dir)?;
    info!(pages = ctx.len(), "Processing pages into {}", out_dir.display());

    let formatter = WikiFormatter::new(ctx.page_names());
    let transformer = Transformer::new();
    let pb = make_progress_bar(ctx.len() as u64);

    let mut summary = BuildSummary::default();
    for page in ctx.pages() {
        pb.set_message(page.name.clone());
        let (path, includes) = process_page(&formatter, &transformer, page, out_dir)
            .with_context(|| format!("Failed to process page {}", page.name))?;

        summary.pages += 1;
        if page.is_container {
            summary.containers += 1;
        }
        summary.includes += includes;
        summary.written.push(path);
        pb.inc(1);
    }
    pb.finish_and_clear();

    info!(
        pages = summary.pages,
        containers = summary.containers,
        includes = summary.includes,
        "DocBook output written"
    );
    Ok(summary)
}

fn process_page(
    formatter: &WikiFormatter,
    transformer: &Transformer,
    page: &Page,
    out_dir: &Path,
) -> Result<(PathBuf, usize)> {
    let html = render_page(formatter, page);
    let fragment = transformer.transform(&html)?;
    let patched = patch_fragment(&fragment, page)?;
    debug!(
        page = %page.name,
        depth = page.depth,
        container = page.is_container,
        includes = ?patched.includes,
        "Page converted"
    );
    let path = write_fragment(out_dir, &page.name, &patched.xml)?;
    Ok((path, patched.includes.len()))
}

fn make_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("    {spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} pages {msg}")
    {
        pb.set_style(style.progress_chars("=> "));
    }
    pb
}
