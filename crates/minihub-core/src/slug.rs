//! Slug rules: display name → URL-safe app identifier.

/// Trim, lowercase, collapse whitespace runs to a single `-`, then drop everything outside `[a-z0-9-]`.
///
/// An empty result means the name is unusable; callers reject it before touching disk.
pub fn normalize(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut in_space = false;
    for c in lowered.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push('-');
                in_space = true;
            }
            continue;
        }
        in_space = false;
        out.push(c);
    }
    out.retain(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    out
}

/// True when `slug` is non-empty and already in normalized form.
pub fn is_valid(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Identifier used for the router binding in a mount block (`my-app` → `myapp`).
pub fn route_ident(slug: &str) -> String {
    slug.replace('-', "")
}
