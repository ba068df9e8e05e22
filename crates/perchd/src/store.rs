use anyhow::{Context, Result};
use perchd_core::item::Item;
use std::path::{Path, PathBuf};
use tracing::info;

/// Persistent layout store: one JSON document holding the strip's visible
/// items with their (container, seat) records. Loaded once at boot, rewritten
/// whole on persist calls. Callers treat writes as fire-and-forget; a failed
/// save is logged and the next sync pass tries again.
pub struct LayoutStore {
    path: PathBuf,
}

impl LayoutStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing file means a fresh layout, not an error.
    pub fn load(&self) -> Result<Vec<Item>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading layout from {}", self.path.display()))?;
        serde_json::from_str(&contents).with_context(|| "parsing layout JSON")
    }

    /// Replace the layout atomically: write a sibling temp file, then rename
    /// over the target so a crash never leaves a half-written layout.
    pub fn save(&self, items: &[Item]) -> Result<()> {
        let json = serde_json::to_string_pretty(items).context("serializing layout")?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .with_context(|| format!("writing {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        info!(path = %self.path.display(), items = items.len(), "layout saved");
        Ok(())
    }
}
