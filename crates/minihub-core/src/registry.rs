//! Mount registry: the set of mounted apps, derived from the entry-point source text.
//!
//! There is no manifest. A slug is mounted when the entry point carries a block tagged
//! `// --- Routes for <slug> ---`; the static and API prefixes are read from the block itself.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

static HEADER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"// --- Routes for ([A-Za-z0-9_-]+) ---").expect("valid regex"));

static STATIC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"app\.use\('/([A-Za-z0-9_-]+)',\s*express\.static\(path\.join\(__dirname,\s*'apps',\s*'([A-Za-z0-9_-]+)',\s*'public'\)\)\)",
    )
    .expect("valid regex")
});

static API_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"app\.use\('/api/([A-Za-z0-9_-]+)',").expect("valid regex"));

/// Infrastructure slugs that user-facing create/edit/delete must never touch.
#[derive(Debug, Clone, Default)]
pub struct ProtectedSet {
    slugs: BTreeSet<String>,
}

impl ProtectedSet {
    pub fn new<I, S>(slugs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            slugs: slugs.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, slug: &str) -> bool {
        self.slugs.contains(slug)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.slugs.iter().map(String::as_str)
    }
}

/// One mounted app as read from the entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MountEntry {
    pub slug: String,
    /// URL prefix of the static frontend, e.g. `/stopwatch`.
    pub static_prefix: String,
    /// Directory name under the apps root whose `public/` is served.
    pub app_dir: String,
    /// URL prefix of the backend router, e.g. `/api/stopwatch`, when the block mounts one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_prefix: Option<String>,
}

/// Parse every tagged mount block in `source`, in order of appearance.
///
/// A block runs from its tag to the next tag or the marker. Blocks without a static-serving
/// statement are skipped. Duplicate tags yield duplicate entries.
pub fn scan(source: &str, marker: &str) -> Vec<MountEntry> {
    let headers: Vec<(usize, usize, &str)> = HEADER_RE
        .captures_iter(source)
        .filter_map(|c| {
            let whole = c.get(0)?;
            let slug = c.get(1)?;
            Some((whole.start(), whole.end(), slug.as_str()))
        })
        .collect();

    let mut entries = Vec::new();
    for (i, (_, body_start, slug)) in headers.iter().enumerate() {
        let mut body_end = headers
            .get(i + 1)
            .map(|(start, _, _)| *start)
            .unwrap_or(source.len());
        if let Some(pos) = source[*body_start..body_end].find(marker) {
            body_end = body_start + pos;
        }
        let body = &source[*body_start..body_end];

        let Some(stat) = STATIC_RE.captures(body) else {
            tracing::debug!(target: "minihub::registry", slug, "block has no static mount, skipped");
            continue;
        };
        let api_prefix = API_RE
            .captures(body)
            .and_then(|c| c.get(1))
            .map(|m| format!("/api/{}", m.as_str()));
        entries.push(MountEntry {
            slug: (*slug).to_string(),
            static_prefix: format!("/{}", &stat[1]),
            app_dir: stat[2].to_string(),
            api_prefix,
        });
    }
    entries
}

/// True when `source` carries a tagged block for `slug`.
pub fn is_mounted(source: &str, slug: &str) -> bool {
    HEADER_RE
        .captures_iter(source)
        .any(|c| c.get(1).map(|m| m.as_str()) == Some(slug))
}

/// True when `text` contains a mount tag for any slug.
pub(crate) fn is_any_tag(text: &str) -> bool {
    HEADER_RE.is_match(text)
}

/// Immutable routing view built from one scan. Rebuilt after every change, never mutated.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MountSnapshot {
    pub entries: Vec<MountEntry>,
    pub scanned_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    by_static: HashMap<String, usize>,
    #[serde(skip)]
    by_api: HashMap<String, usize>,
}

impl MountSnapshot {
    pub fn from_source(source: &str, marker: &str) -> Self {
        Self::from_entries(scan(source, marker))
    }

    pub fn from_entries(entries: Vec<MountEntry>) -> Self {
        let mut by_static = HashMap::new();
        let mut by_api = HashMap::new();
        for (i, e) in entries.iter().enumerate() {
            by_static
                .entry(e.static_prefix.trim_start_matches('/').to_string())
                .or_insert(i);
            if let Some(api) = &e.api_prefix {
                by_api
                    .entry(api.trim_start_matches("/api/").to_string())
                    .or_insert(i);
            }
        }
        Self {
            entries,
            scanned_at: Some(Utc::now()),
            by_static,
            by_api,
        }
    }

    /// Entry whose static prefix is `/<segment>`.
    pub fn by_static_segment(&self, segment: &str) -> Option<&MountEntry> {
        self.by_static.get(segment).map(|i| &self.entries[*i])
    }

    /// Entry whose API prefix is `/api/<segment>`.
    pub fn by_api_segment(&self, segment: &str) -> Option<&MountEntry> {
        self.by_api.get(segment).map(|i| &self.entries[*i])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
