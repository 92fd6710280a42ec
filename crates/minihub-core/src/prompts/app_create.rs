//! Creation prompt: asks the model for a brand-new four-file app.
//!
//! The output-format section is the contract the bundle parser relies on.

/// Placeholders: `{app_name}`, `{slug}`, `{user_request}`.
pub const APP_CREATE_TEMPLATE: &str = r#"You are an expert full-stack developer specializing in Node.js, Express, and vanilla JavaScript. Your task is to **create** a new self-contained application from scratch.

### System Architecture
The server hosts multiple "mini-apps." Each app has a simple structure:
```
apps/
└── <app-slug>/
    ├── routes.js
    └── public/
        ├── index.html
        ├── script.js
        └── style.css
```
The main server mounts the frontend at `/<app-slug>` and the backend at `/api/<app-slug>`. Therefore, any `fetch` request in `script.js` MUST be prefixed with `/api/{slug}`.

### My Request
I want to create a new application named **`{app_name}`** (slug: `{slug}`). Here is my idea:
"{user_request}"

### Output Format
Generate the complete code for all four standard files. Your response MUST be only the code, formatted exactly as shown below.

--- START OF FILE apps/{slug}/routes.js ---
(Your generated code for routes.js here)
--- END OF FILE apps/{slug}/routes.js ---

--- START OF FILE apps/{slug}/public/index.html ---
(Your generated code for index.html here)
--- END OF FILE apps/{slug}/public/index.html ---

--- START OF FILE apps/{slug}/public/script.js ---
(Your generated code for script.js here)
--- END OF FILE apps/{slug}/public/script.js ---

--- START OF FILE apps/{slug}/public/style.css ---
(Your generated code for style.css here)
--- END OF FILE apps/{slug}/public/style.css ---"#;

pub fn app_create_prompt(app_name: &str, slug: &str, user_request: &str) -> String {
    APP_CREATE_TEMPLATE
        .replace("{slug}", slug)
        .replace("{app_name}", app_name)
        .replace("{user_request}", user_request)
}
