//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Calculate the size of an image after fitting it into a bounding box.
///
/// The aspect ratio is kept and the image is never upscaled. The width is
/// checked first: if it exceeds the box it is clamped and the height scaled
/// down with it. Then the (possibly reduced) height is checked the same way.
/// Scaled values are truncated but never drop below 1px.
///
/// # Arguments
/// * `source` - Original image dimensions (width, height)
/// * `target` - Bounding box (max width, max height)
///
/// # Examples
/// ```
/// # use content_gallery::imaging::calculate_fit_dimensions;
/// // Landscape into a 4:3-ish box: width is the limiting side.
/// assert_eq!(calculate_fit_dimensions((1600, 1200), (752, 608)), (752, 564));
///
/// // Smaller than the box: untouched.
/// assert_eq!(calculate_fit_dimensions((300, 200), (752, 608)), (300, 200));
/// ```
pub fn calculate_fit_dimensions(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (mut x, mut y) = (source.0 as u64, source.1 as u64);
    let (tgt_w, tgt_h) = (target.0 as u64, target.1 as u64);

    if x > tgt_w {
        y = (y * tgt_w / x).max(1);
        x = tgt_w;
    }
    if y > tgt_h {
        x = (x * tgt_h / y).max(1);
        y = tgt_h;
    }
    (x as u32, y as u32)
}
