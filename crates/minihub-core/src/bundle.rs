//! The four-file app bundle and its parse-time completeness.

use crate::error::{HubError, HubResult};
use crate::slug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// One of the four files every app is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Routes,
    Html,
    Script,
    Style,
}

impl FileKind {
    pub const ALL: [FileKind; 4] = [
        FileKind::Routes,
        FileKind::Html,
        FileKind::Script,
        FileKind::Style,
    ];

    /// On-disk file name.
    pub fn file_name(self) -> &'static str {
        match self {
            FileKind::Routes => "routes.js",
            FileKind::Html => "index.html",
            FileKind::Script => "script.js",
            FileKind::Style => "style.css",
        }
    }

    /// Path relative to the app root (`public/` for frontend files).
    pub fn relative_path(self) -> &'static str {
        match self {
            FileKind::Routes => "routes.js",
            FileKind::Html => "public/index.html",
            FileKind::Script => "public/script.js",
            FileKind::Style => "public/style.css",
        }
    }

    pub fn from_file_name(name: &str) -> Option<FileKind> {
        FileKind::ALL.into_iter().find(|k| k.file_name() == name)
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// File contents of one app. Field names match the JSON the builder UIs exchange; absent
/// fields deserialize as empty and are reported by [`missing`](Self::missing).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleFiles {
    pub routes: String,
    pub html: String,
    pub script: String,
    pub style: String,
}

impl BundleFiles {
    pub fn get(&self, kind: FileKind) -> &str {
        match kind {
            FileKind::Routes => &self.routes,
            FileKind::Html => &self.html,
            FileKind::Script => &self.script,
            FileKind::Style => &self.style,
        }
    }

    pub fn set(&mut self, kind: FileKind, content: String) {
        match kind {
            FileKind::Routes => self.routes = content,
            FileKind::Html => self.html = content,
            FileKind::Script => self.script = content,
            FileKind::Style => self.style = content,
        }
    }

    /// Kinds whose content is empty or whitespace only.
    pub fn missing(&self) -> BTreeSet<FileKind> {
        FileKind::ALL
            .into_iter()
            .filter(|k| self.get(*k).trim().is_empty())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }
}

/// A named app: display name, normalized slug and its files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppBundle {
    pub slug: String,
    pub name: String,
    pub files: BundleFiles,
}

impl AppBundle {
    /// Derive the slug from `name`; an empty slug is rejected before anything touches disk.
    pub fn from_name(name: &str, files: BundleFiles) -> HubResult<Self> {
        let slug = slug::normalize(name);
        if slug.is_empty() {
            return Err(HubError::InvalidInput(
                "Invalid App Name. Results in empty slug.".to_string(),
            ));
        }
        Ok(Self {
            slug,
            name: name.trim().to_string(),
            files,
        })
    }
}

/// Result of parsing generated text: either all four files or what could be recovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedBundle {
    Complete(BundleFiles),
    Partial {
        files: BundleFiles,
        missing: BTreeSet<FileKind>,
    },
}

impl ParsedBundle {
    pub fn from_files(files: BundleFiles) -> Self {
        let missing = files.missing();
        if missing.is_empty() {
            ParsedBundle::Complete(files)
        } else {
            ParsedBundle::Partial { files, missing }
        }
    }

    pub fn files(&self) -> &BundleFiles {
        match self {
            ParsedBundle::Complete(files) => files,
            ParsedBundle::Partial { files, .. } => files,
        }
    }

    pub fn into_files(self) -> BundleFiles {
        match self {
            ParsedBundle::Complete(files) => files,
            ParsedBundle::Partial { files, .. } => files,
        }
    }

    pub fn missing(&self) -> Vec<FileKind> {
        match self {
            ParsedBundle::Complete(_) => Vec::new(),
            ParsedBundle::Partial { missing, .. } => missing.iter().copied().collect(),
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, ParsedBundle::Complete(_))
    }
}
