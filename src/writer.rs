use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Fails unless `out_dir` is an existing directory. Nothing here creates it.
pub fn ensure_output_dir(out_dir: &Path) -> Result<()> {
    let meta = fs::metadata(out_dir)
        .with_context(|| format!("Output directory not found: {}", out_dir.display()))?;
    if !meta.is_dir() {
        bail!("Output path is not a directory: {}", out_dir.display());
    }
    Ok(())
}

pub fn output_path(out_dir: &Path, page: &str) -> PathBuf {
    out_dir.join(format!("{page}.xml"))
}

/// Writes `xml` to `<out_dir>/<page>.xml`, replacing any previous file.
pub fn write_fragment(out_dir: &Path, page: &str, xml: &str) -> Result<PathBuf> {
    let path = output_path(out_dir, page);
    fs::write(&path, xml).with_context(|| format!("Failed to write {}", path.display()))?;
    debug!(path = %path.display(), bytes = xml.len(), "Wrote fragment");
    Ok(path)
}
