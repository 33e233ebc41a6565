//! Centralized filename handling for gallery images.
//!
//! Every rendition of one image shares a stem (the slug) and an extension.
//! The full-size file is `{slug}.{ext}`; every other rendition inserts its
//! suffix before the extension:
//!
//! ```text
//! red-cat.jpg                  full-size (primary)
//! red-cat_thumbnail.jpg        thumbnail
//! red-cat_small.jpg            small image
//! red-cat_preview.jpg          preview
//! red-cat_small_preview.jpg    small preview
//! ```
//!
//! ## Stored vs. uploaded names
//!
//! A name persisted in the catalog always carries the storage sub-path
//! (`content_gallery/red-cat.jpg`). A name submitted with fresh bytes is a
//! bare filename (`IMG_0042.JPG`). [`is_stored_name`] is the single place that
//! tells the two apart; callers classify once at the boundary and carry the
//! answer as a type from then on.
//!
//! ## Slugs
//!
//! [`slugify`] transliterates a display title to ASCII and turns it into a
//! lowercase stem made of `[a-z0-9]` runs joined by single dashes.
//! Underscores never appear in a slug, so a stem can never be mistaken for a suffixed rendition name.

use deunicode::deunicode;

/// Fallback stem for titles that contain nothing sluggable.
pub const EMPTY_SLUG_FALLBACK: &str = "image";

/// Returns `true` if `name` is a stored logical name (has a sub-path prefix).
pub fn is_stored_name(name: &str) -> bool {
    name.contains('/')
}

/// The last path component of `name`.
pub fn basename(name: &str) -> &str {
    match name.rfind('/') {
        Some(pos) => &name[pos + 1..],
        None => name,
    }
}

/// Split a filename into `(stem, ext)` where `ext` keeps its leading dot.
///
/// Dots that only lead the final component are part of the stem, so
/// `".hidden"` has no extension. Only the last component is inspected:
/// - `"red-cat.jpg"` → `("red-cat", ".jpg")`
/// - `"archive.tar.gz"` → `("archive.tar", ".gz")`
/// - `"gallery/red-cat.jpg"` → `("gallery/red-cat", ".jpg")`
/// - `"README"` → `("README", "")`
pub fn split_ext(name: &str) -> (&str, &str) {
    let base_start = name.rfind('/').map_or(0, |p| p + 1);
    let base = &name[base_start..];
    let leading_dots = base.len() - base.trim_start_matches('.').len();
    match base.rfind('.') {
        Some(dot) if dot >= leading_dots => {
            let split = base_start + dot;
            (&name[..split], &name[split..])
        }
        _ => (name, ""),
    }
}

/// Filename without its extension.
pub fn stem(name: &str) -> &str {
    split_ext(name).0
}

/// Extension of a filename including the leading dot, or `""`.
pub fn extension(name: &str) -> &str {
    split_ext(name).1
}

/// Insert `_{suffix}` between stem and extension.
pub fn suffixed_filename(name: &str, suffix: &str) -> String {
    let (stem, ext) = split_ext(name);
    format!("{stem}_{suffix}{ext}")
}

/// Normalize a display title into a filename-safe slug.
///
/// The title is transliterated to ASCII first (`Crème` becomes `creme`,
/// `Кот` becomes `kot`, `猫` becomes `mao`). Every character outside
/// `[a-z0-9]` then acts as a separator. Runs of separators collapse to a
/// single dash and leading/trailing dashes are trimmed. A title with nothing
/// left maps to [`EMPTY_SLUG_FALLBACK`].
pub fn slugify(title: &str) -> String {
    let ascii = deunicode(title);
    let mut slug = String::with_capacity(ascii.len());
    let mut pending_dash = false;

    for c in ascii.chars().map(|c| c.to_ascii_lowercase()) {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        EMPTY_SLUG_FALLBACK.to_string()
    } else {
        slug
    }
}
