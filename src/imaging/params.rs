//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the rendition lifecycle (which decides which files to
//! produce) and the [`backend`](super::backend) (which does the pixel work).
//! This separation lets tests swap in a recording mock backend.

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Fit an encoded source image into a bounding box and re-encode it.
///
/// The output keeps the format of the source bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeParams<'a> {
    pub source: &'a [u8],
    /// Bounding box; the output never exceeds it and is never upscaled.
    pub max_width: u32,
    pub max_height: u32,
    pub quality: Quality,
}
