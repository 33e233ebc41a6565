//! Collision-free slug allocation.
//!
//! A slug is the filename stem shared by every rendition of one image. It is
//! derived from the owner's display title and must not collide with any slug
//! already in use:
//!
//! ```text
//! "Red Cat"  →  red-cat
//! "Red Cat"  →  red-cat-1
//! "Red Cat"  →  red-cat-2
//! ```
//!
//! The allocator holds no state. The caller passes the existence check on
//! every call, usually a closure over the image store that tests the
//! sub-path-qualified stored form of the candidate.
//!
//! Check-then-act is not atomic: two concurrent allocations for titles with
//! the same slug can both see a candidate as free. Callers that save
//! concurrently must serialize allocation through their store.

use crate::naming::slugify;

/// Return the first of `slug`, `slug-1`, `slug-2`, … for which `exists`
/// returns `false`, where `slug = slugify(title)`.
///
/// Terminates for any finite set of taken names: every rejected candidate is
/// occupied by a distinct existing record.
pub fn allocate(title: &str, mut exists: impl FnMut(&str) -> bool) -> String {
    let base = slugify(title);
    if !exists(&base) {
        return base;
    }
    let mut counter: u64 = 1;
    loop {
        let candidate = format!("{base}-{counter}");
        if !exists(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}
