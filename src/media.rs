//! Everything a rendition needs to read and write its files.
//!
//! [`Media`] bundles the path resolver, the per-rendition bounding boxes, the
//! encoding quality and the image backend. It is built once at startup from
//! the validated [`GalleryConfig`](crate::config::GalleryConfig) and passed by
//! reference into every save and delete.

use crate::config::{ConfigError, GalleryConfig};
use crate::imaging::{Dimensions, ImageBackend, Quality};
use crate::paths::PathResolver;
use serde::Serialize;

/// The role a rendition plays for one image.
///
/// [`RenditionRole::ALL`] is the order renditions are processed in; the
/// full-size image always comes first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenditionRole {
    /// Full-size image, stored without a suffix.
    Image,
    Thumbnail,
    SmallImage,
    Preview,
    SmallPreview,
}

impl RenditionRole {
    pub const ALL: [RenditionRole; 5] = [
        RenditionRole::Image,
        RenditionRole::Thumbnail,
        RenditionRole::SmallImage,
        RenditionRole::Preview,
        RenditionRole::SmallPreview,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RenditionRole::Image => "image",
            RenditionRole::Thumbnail => "thumbnail",
            RenditionRole::SmallImage => "small_image",
            RenditionRole::Preview => "preview",
            RenditionRole::SmallPreview => "small_preview",
        }
    }

    /// Filename suffix, or `None` for the full-size image.
    pub fn suffix(self) -> Option<&'static str> {
        match self {
            RenditionRole::Image => None,
            RenditionRole::Thumbnail => Some("thumbnail"),
            RenditionRole::SmallImage => Some("small"),
            RenditionRole::Preview => Some("preview"),
            RenditionRole::SmallPreview => Some("small_preview"),
        }
    }
}

/// Bounding box of every rendition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RenditionSizes {
    pub image: Dimensions,
    pub small_image: Dimensions,
    pub thumbnail: Dimensions,
    pub preview: Dimensions,
    pub small_preview: Dimensions,
}

impl RenditionSizes {
    pub fn from_config(config: &GalleryConfig) -> Self {
        Self {
            image: (config.image_width, config.image_height).into(),
            small_image: (config.small_image_width, config.small_image_height).into(),
            thumbnail: (config.thumbnail_width, config.thumbnail_height).into(),
            preview: (config.preview_width, config.preview_height).into(),
            small_preview: (config.small_preview_width, config.small_preview_height).into(),
        }
    }

    pub fn for_role(&self, role: RenditionRole) -> Dimensions {
        match role {
            RenditionRole::Image => self.image,
            RenditionRole::Thumbnail => self.thumbnail,
            RenditionRole::SmallImage => self.small_image,
            RenditionRole::Preview => self.preview,
            RenditionRole::SmallPreview => self.small_preview,
        }
    }
}

impl Default for RenditionSizes {
    fn default() -> Self {
        Self::from_config(&GalleryConfig::default())
    }
}

pub struct Media<B> {
    pub resolver: PathResolver,
    pub sizes: RenditionSizes,
    pub quality: Quality,
    pub backend: B,
}

impl<B: ImageBackend> Media<B> {
    pub fn new(resolver: PathResolver, sizes: RenditionSizes, quality: Quality, backend: B) -> Self {
        Self {
            resolver,
            sizes,
            quality,
            backend,
        }
    }

    /// Build from a validated config. Fails if the media tree is not set.
    pub fn from_config(config: &GalleryConfig, backend: B) -> Result<Self, ConfigError> {
        Ok(Self::new(
            config.resolver()?,
            RenditionSizes::from_config(config),
            Quality::new(config.quality),
            backend,
        ))
    }
}
