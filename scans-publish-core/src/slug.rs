//! URL slugs for blog posts and filesystem-safe names for release files.

use std::sync::OnceLock;

use regex::Regex;

fn disallowed() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new("[^0-9a-zA-Z-]+").expect("static slug pattern is valid"))
}

/// Lowercases `text`, turns spaces into hyphens and strips everything outside `[0-9a-zA-Z-]`.
pub fn slug_component(text: &str) -> String {
    let lowered = text.to_lowercase().replace(' ', "-");
    disallowed().replace_all(&lowered, "").into_owned()
}

/// Slug of a chapter post: `"{title}-{chapter}"` with both parts sanitized.
pub fn post_slug(title: &str, chapter_number: &str) -> String {
    format!("{}-{}", slug_component(title), slug_component(chapter_number))
}

/// Replaces characters that are not allowed in file or folder names with `_`.
///
/// `"Fate/Zero"` becomes `"Fate_Zero"`. Surrounding whitespace is trimmed.
pub fn path_component(part: &str) -> String {
    part.replace(&['/', '\\', ':', '*', '?', '"', '<', '>', '|'][..], "_")
        .trim()
        .to_string()
}
