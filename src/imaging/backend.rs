//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the operations the rendition lifecycle
//! needs: identify (read dimensions from the header), verify (decode every
//! pixel before anything on disk changes) and resize (fit into a box,
//! re-encode in the source format).
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Tests use the recording `MockBackend` below.

use super::params::ResizeParams;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("Failed to encode image: {0}")]
    Encode(String),
}

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl From<(u32, u32)> for Dimensions {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

/// Encoded output of a resize, with the dimensions actually produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub dimensions: Dimensions,
}

/// Trait for image processing backends.
pub trait ImageBackend {
    /// Decode the header of `data` and return its dimensions.
    ///
    /// Fails with [`BackendError::Decode`] when the bytes are not an image in
    /// a supported format.
    fn identify(&self, data: &[u8]) -> Result<Dimensions, BackendError>;

    /// Fully decode `data` and return its dimensions.
    ///
    /// Unlike [`identify`](Self::identify), a file whose header is intact but
    /// whose body is truncated or corrupt fails here.
    fn verify(&self, data: &[u8]) -> Result<Dimensions, BackendError>;

    /// Fit the source into the bounding box and re-encode it.
    fn resize(&self, params: &ResizeParams<'_>) -> Result<EncodedImage, BackendError>;
}
