//! App-context document: the four files of one app in the delimited bundle format,
//! meant to be pasted into an external assistant together with a change request.

use crate::ai_parser;
use crate::bundle::BundleFiles;

pub fn app_context_document(slug: &str, files: &BundleFiles) -> String {
    format!(
        "Below are the complete files for the app named **`{slug}`**.\n\n{}",
        ai_parser::render(slug, files)
    )
}
