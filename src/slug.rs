use std::path::Path;

/// Normalize any name into an application id: lowercase ASCII
/// `[a-z0-9-]+` without leading, trailing or doubled hyphens.
/// Inputs that normalize to nothing become `app`.
///
/// # Example
///
/// ```
/// use vibes::slug::slugify;
///
/// assert_eq!(slugify("My Cool App!"), "my-cool-app");
/// assert_eq!(slugify("---"), "app");
/// ```
#[must_use]
pub fn slugify(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_hyphen = false;

    for c in raw.trim().chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    if out.is_empty() {
        "app".to_string()
    } else {
        out
    }
}

/// Infer an application id from a repository reference: the last
/// path component without its extension.
///
/// `https://example.com/foo/bar-app.git` -> `bar-app`
#[must_use]
pub fn infer_app_id(reference: &str) -> String {
    let trimmed = reference.trim().trim_end_matches('/');
    let last = trimmed.rsplit(['/', ':']).next().unwrap_or(trimmed);
    let stem = Path::new(last)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(last);
    slugify(stem)
}

/// Identifier usable as a proxy router/middleware name.
#[must_use]
pub fn proxy_ident(id: &str) -> String {
    id.replace('-', "_")
}
