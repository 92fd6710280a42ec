//! Parser for generated four-file bundles.
//!
//! Generated text is expected to hold blocks of the form
//!
//! ```text
//! --- START OF FILE apps/<slug>/public/script.js ---
//! ...content...
//! --- END OF FILE apps/<slug>/public/script.js ---
//! ```
//!
//! Blocks are matched by the file-name suffix of their path, so ordering and surrounding
//! prose do not matter. Unknown file names are ignored; the last block for a kind wins.

use crate::bundle::{BundleFiles, FileKind, ParsedBundle};
use once_cell::sync::Lazy;
use regex::Regex;

static BLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"--- START OF FILE ([^\r\n]*?) ---\r?\n([\s\S]*?)\r?\n--- END OF FILE")
        .expect("valid regex")
});

/// Extract whatever bundle files `text` contains. Never fails; check completeness on the result.
pub fn parse(text: &str) -> ParsedBundle {
    let mut files = BundleFiles::default();
    for caps in BLOCK_RE.captures_iter(text) {
        let path = caps[1].trim();
        let file_name = path.rsplit('/').next().unwrap_or(path);
        let Some(kind) = FileKind::from_file_name(file_name) else {
            tracing::debug!(target: "minihub::parser", path, "ignoring unrecognized file block");
            continue;
        };
        files.set(kind, caps[2].trim().to_string());
    }
    ParsedBundle::from_files(files)
}

/// Render `files` in the same delimited format the parser reads.
pub fn render(slug: &str, files: &BundleFiles) -> String {
    let mut out = String::new();
    for (i, kind) in FileKind::ALL.into_iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let path = format!("apps/{}/{}", slug, kind.relative_path());
        out.push_str(&format!(
            "--- START OF FILE {path} ---\n{}\n--- END OF FILE {path} ---\n",
            files.get(kind)
        ));
    }
    out
}
