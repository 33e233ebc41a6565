//! Gallery configuration.
//!
//! Loaded from a TOML file (default `content-gallery.toml`). Every key is
//! optional except the two that locate the media tree, which may instead come
//! from the command line or the environment.
//!
//! ## Layering
//!
//! ```text
//! stock defaults  →  config file  →  --media-root / --media-url (or env)
//! ```
//!
//! Each layer is merged key by key on top of the previous one with
//! [`merge_toml`], then the result is deserialized and validated once.
//!
//! ## Configuration Options
//!
//! ```toml
//! media_root = "/srv/media"     # required, no default
//! media_url = "/media/"         # required, no default
//! path = "content_gallery"      # storage sub-directory below media_root
//! quality = 90                  # JPEG quality (1-100)
//!
//! image_width = 752
//! image_height = 608
//! small_image_width = 564
//! small_image_height = 456
//! thumbnail_width = 94
//! thumbnail_height = 76
//! preview_width = 376
//! preview_height = 304
//! small_preview_width = 141
//! small_preview_height = 114
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::paths::PathResolver;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Missing required setting '{0}'")]
    Missing(&'static str),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Gallery configuration.
///
/// Rendition boxes are maximum sizes: images are scaled down to fit and never
/// scaled up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GalleryConfig {
    /// Filesystem root all media lives under.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_root: Option<PathBuf>,
    /// Public base URL of `media_root`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    /// Storage sub-directory for gallery files, relative to `media_root`.
    pub path: String,
    pub quality: u32,
    pub image_width: u32,
    pub image_height: u32,
    pub small_image_width: u32,
    pub small_image_height: u32,
    pub thumbnail_width: u32,
    pub thumbnail_height: u32,
    pub preview_width: u32,
    pub preview_height: u32,
    pub small_preview_width: u32,
    pub small_preview_height: u32,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            media_root: None,
            media_url: None,
            path: "content_gallery".to_string(),
            quality: 90,
            image_width: 752,
            image_height: 608,
            small_image_width: 564,
            small_image_height: 456,
            thumbnail_width: 94,
            thumbnail_height: 76,
            preview_width: 376,
            preview_height: 304,
            small_preview_width: 141,
            small_preview_height: 114,
        }
    }
}

impl GalleryConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let boxes = [
            ("image", self.image_width, self.image_height),
            ("small_image", self.small_image_width, self.small_image_height),
            ("thumbnail", self.thumbnail_width, self.thumbnail_height),
            ("preview", self.preview_width, self.preview_height),
            ("small_preview", self.small_preview_width, self.small_preview_height),
        ];
        for (name, width, height) in boxes {
            if width == 0 || height == 0 {
                return Err(ConfigError::Validation(format!(
                    "{name}_width and {name}_height must be non-zero"
                )));
            }
        }
        if !(1..=100).contains(&self.quality) {
            return Err(ConfigError::Validation("quality must be 1-100".into()));
        }
        if self.path.trim_matches('/').is_empty() {
            return Err(ConfigError::Validation("path must not be empty".into()));
        }
        Ok(())
    }

    /// Path resolver for the configured media tree.
    ///
    /// Fails with [`ConfigError::Missing`] when `media_root` or `media_url`
    /// was not set by any layer.
    pub fn resolver(&self) -> Result<PathResolver, ConfigError> {
        let root = self
            .media_root
            .as_ref()
            .ok_or(ConfigError::Missing("media_root"))?;
        let url = self
            .media_url
            .as_deref()
            .ok_or(ConfigError::Missing("media_url"))?;
        Ok(PathResolver::new(root, url, &self.path))
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(GalleryConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Overlay built from command-line or environment settings. Unset values
/// leave the lower layers alone.
pub fn media_overlay(media_root: Option<&Path>, media_url: Option<&str>) -> toml::Value {
    let mut table = toml::map::Map::new();
    if let Some(root) = media_root {
        table.insert(
            "media_root".into(),
            toml::Value::String(root.to_string_lossy().into_owned()),
        );
    }
    if let Some(url) = media_url {
        table.insert("media_url".into(), toml::Value::String(url.to_string()));
    }
    toml::Value::Table(table)
}

/// Merge overlays onto a base value in order, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlays: impl IntoIterator<Item = toml::Value>,
) -> Result<GalleryConfig, ConfigError> {
    let merged = overlays.into_iter().fold(base, merge_toml);
    let config: GalleryConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from a TOML file.
///
/// Merges file values on top of stock defaults, rejects unknown keys,
/// and validates the result. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<GalleryConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock config file with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Content Gallery Configuration
# =============================
# All settings except media_root and media_url are optional.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Media tree
# ---------------------------------------------------------------------------
# Filesystem root and public base URL of all media. Required; may also be set
# with --media-root / --media-url or CONTENT_GALLERY_MEDIA_ROOT /
# CONTENT_GALLERY_MEDIA_URL.
# media_root = "/srv/media"
# media_url = "/media/"

# Sub-directory of media_root that holds every gallery file.
path = "content_gallery"

# JPEG encoding quality (1 = worst, 100 = best). Other formats are lossless.
quality = 90

# ---------------------------------------------------------------------------
# Rendition boxes
# ---------------------------------------------------------------------------
# Each rendition is scaled down to fit inside its box, keeping the aspect
# ratio. Images smaller than the box are never enlarged.

# Full-size image: {slug}.{ext}
image_width = 752
image_height = 608

# Small image: {slug}_small.{ext}
small_image_width = 564
small_image_height = 456

# Thumbnail: {slug}_thumbnail.{ext}
thumbnail_width = 94
thumbnail_height = 76

# Preview: {slug}_preview.{ext}
preview_width = 376
preview_height = 304

# Small preview: {slug}_small_preview.{ext}
small_preview_width = 141
small_preview_height = 114
"##
}
