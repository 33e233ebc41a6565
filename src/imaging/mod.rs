//! Image processing in pure Rust, built on the `image` crate.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | header decode via `ImageReader::into_dimensions` |
//! | **Resize** | fit-within-box, Lanczos3, re-encode in the source format |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]

pub mod backend;
mod calculations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, EncodedImage, ImageBackend};
pub use calculations::calculate_fit_dimensions;
pub use params::{Quality, ResizeParams};
pub use rust_backend::{RustBackend, is_supported_extension};
