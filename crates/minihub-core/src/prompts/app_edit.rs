//! Edit prompt: current files plus the requested change; the model returns all four files.

use crate::ai_parser;
use crate::bundle::BundleFiles;

/// Placeholders: `{slug}`, `{user_request}`, `{files}`.
pub const APP_EDIT_TEMPLATE: &str = r#"You are an expert full-stack developer. Your task is to **modify** an existing self-contained application.

### System Architecture
Each app lives in `apps/<app-slug>/` with a backend `routes.js` and a `public/` folder holding `index.html`, `script.js` and `style.css`. The frontend is served at `/<app-slug>` and the backend at `/api/<app-slug>`, so every `fetch` in `script.js` MUST be prefixed with `/api/{slug}`.

### My Request
For the app named **`{slug}`**, I want to make the following changes:
"{user_request}"

### Provided Files
Here are the complete current files for the app. Modify them according to my request.

{files}
### Output Format
Your response MUST be only the complete, modified files, formatted exactly as shown in the "Provided Files" section. If a file is unchanged, include it as-is."#;

pub fn app_edit_prompt(slug: &str, user_request: &str, current: &BundleFiles) -> String {
    // File content is spliced in, never scanned for placeholders.
    let (head, tail) = APP_EDIT_TEMPLATE
        .split_once("{files}")
        .unwrap_or((APP_EDIT_TEMPLATE, ""));
    let fill = |part: &str| {
        part.replace("{slug}", slug)
            .replace("{user_request}", user_request)
    };
    format!("{}{}{}", fill(head), ai_parser::render(slug, current), fill(tail))
}
