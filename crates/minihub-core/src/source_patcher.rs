//! Source patcher: inserts and removes per-app mount blocks in the host entry-point source.
//!
//! Every call is a full read-modify-write of the entry point, serialized through one lock
//! shared by all clones of the patcher.

use crate::error::{HubError, HubResult};
use crate::registry::{self, MountSnapshot};
use crate::slug;
use regex::Regex;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;

/// What `unmount` found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmountOutcome {
    Removed,
    /// No block for the slug; the entry point was left untouched.
    NotFound,
}

#[derive(Debug, Clone)]
pub struct SourcePatcher {
    entry_point: PathBuf,
    marker: String,
    lock: Arc<Mutex<()>>,
}

/// Mount block for `slug`: static frontend at `/<slug>`, router at `/api/<slug>`.
///
/// Starts and ends with a newline so that removing it restores the surrounding text exactly.
pub fn render_block(slug: &str) -> String {
    let ident = slug::route_ident(slug);
    format!(
        "\n// --- Routes for {slug} ---\n\
         app.use('/{slug}', express.static(path.join(__dirname, 'apps', '{slug}', 'public')));\n\
         const {ident}Routes = require('./apps/{slug}/routes');\n\
         app.use('/api/{slug}', {ident}Routes);\n"
    )
}

/// Byte range of the first block for `slug`, including the padding `render_block` adds.
///
/// The span runs from the slug's tag to the first following `app.use('/api/<slug>', …);`
/// and is rejected if another tag sits in between.
fn find_block(source: &str, slug: &str) -> Option<Range<usize>> {
    let escaped = regex::escape(slug);
    let header = Regex::new(&format!(r"// --- Routes for {escaped} ---[^\n]*")).ok()?;
    let api = Regex::new(&format!(r"app\.use\('/api/{escaped}',[^;]*\);")).ok()?;

    for h in header.find_iter(source) {
        let rest = &source[h.end()..];
        let Some(a) = api.find(rest) else {
            break;
        };
        if registry::is_any_tag(&rest[..a.start()]) {
            continue;
        }
        let mut start = h.start();
        if source[..start].ends_with('\n') {
            start -= 1;
        }
        let mut end = h.end() + a.end();
        for _ in 0..2 {
            if source[end..].starts_with('\n') {
                end += 1;
            }
        }
        return Some(start..end);
    }
    None
}

impl SourcePatcher {
    pub fn new(entry_point: impl Into<PathBuf>, marker: impl Into<String>) -> Self {
        Self {
            entry_point: entry_point.into(),
            marker: marker.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn entry_point(&self) -> &Path {
        &self.entry_point
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    async fn read_source(&self) -> HubResult<String> {
        fs::read_to_string(&self.entry_point)
            .await
            .map_err(|e| HubError::io(&self.entry_point, e))
    }

    async fn write_source(&self, content: &str) -> HubResult<()> {
        fs::write(&self.entry_point, content)
            .await
            .map_err(|e| HubError::io(&self.entry_point, e))
    }

    /// Insert the mount block for `slug` immediately before the marker.
    pub async fn mount(&self, slug: &str) -> HubResult<()> {
        let _guard = self.lock.lock().await;
        let source = self.read_source().await?;
        if !source.contains(&self.marker) {
            return Err(HubError::MarkerNotFound {
                marker: self.marker.clone(),
                path: self.entry_point.clone(),
            });
        }
        if registry::is_mounted(&source, slug) {
            return Err(HubError::AlreadyMounted(slug.to_string()));
        }
        let patched = source.replacen(
            &self.marker,
            &format!("{}\n{}", render_block(slug), self.marker),
            1,
        );
        self.write_source(&patched).await?;
        tracing::info!(target: "minihub::patcher", slug, path = %self.entry_point.display(), "mount block inserted");
        Ok(())
    }

    /// Remove the first mount block for `slug`. A missing block is reported, not an error.
    pub async fn unmount(&self, slug: &str) -> HubResult<UnmountOutcome> {
        let _guard = self.lock.lock().await;
        let source = self.read_source().await?;
        let Some(range) = find_block(&source, slug) else {
            tracing::warn!(target: "minihub::patcher", slug, "no mount block found");
            return Ok(UnmountOutcome::NotFound);
        };
        let mut patched = String::with_capacity(source.len());
        patched.push_str(&source[..range.start]);
        patched.push_str(&source[range.end..]);
        self.write_source(&patched).await?;
        tracing::info!(target: "minihub::patcher", slug, path = %self.entry_point.display(), "mount block removed");
        Ok(UnmountOutcome::Removed)
    }

    /// Slugs with a block in the entry point, in source order.
    pub async fn mounted_slugs(&self) -> HubResult<Vec<String>> {
        let source = self.read_source().await?;
        Ok(registry::scan(&source, &self.marker)
            .into_iter()
            .map(|e| e.slug)
            .collect())
    }

    /// Scan the current entry point into a routing snapshot.
    pub async fn snapshot(&self) -> HubResult<MountSnapshot> {
        let source = self.read_source().await?;
        Ok(MountSnapshot::from_source(&source, &self.marker))
    }
}
