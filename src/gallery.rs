//! Owner-facing read surface: the gallery payload of one owner, the owners a
//! gallery can be attached to, and bulk deletion of an owner's images.
//!
//! Everything here is serializable with `serde_json`. The `list` CLI command
//! prints [`gallery_data`] as-is.

use crate::imaging::{Dimensions, ImageBackend, calculate_fit_dimensions};
use crate::media::Media;
use crate::record::{ImageRecord, ImageUrls, RecordError};
use crate::store::{ImageId, ImageStore, OwnerDirectory, OwnerRef, StoreError};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("Owner {0} not found")]
    OwnerNotFound(OwnerRef),
    #[error("Owner kind '{0}' does not support galleries")]
    GalleryUnsupported(String),
    #[error("Owners of kind '{0}' are hidden from gallery listings")]
    HiddenKind(String),
    #[error("Record error: {0}")]
    Record(#[from] RecordError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// One image in a gallery payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GalleryImage {
    pub id: ImageId,
    pub image: String,
    /// Actual size of the full-size rendition.
    pub image_size: Dimensions,
    pub small_image: String,
    /// Actual size of the small rendition, derived from `image_size`.
    pub small_image_size: Dimensions,
    pub thumbnail: String,
}

/// All images of one owner plus the configured bounding boxes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GalleryData {
    pub images: Vec<GalleryImage>,
    pub image_size: Dimensions,
    pub small_image_size: Dimensions,
    pub thumbnail_size: Dimensions,
}

/// An owner that images can be attached to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnerChoice {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SizedUrl {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

/// Full-size and small URLs of one image with the configured boxes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageData {
    pub image: SizedUrl,
    pub small_image: SizedUrl,
}

fn require_owner<D: OwnerDirectory>(owners: &D, owner: &OwnerRef) -> Result<(), GalleryError> {
    if owners.title(owner).is_none() {
        return Err(GalleryError::OwnerNotFound(owner.clone()));
    }
    Ok(())
}

/// Size of the full-size file of a stored image, or `None` if the file is
/// gone or unreadable.
fn actual_size<B: ImageBackend>(
    media: &Media<B>,
    record: &ImageRecord,
    known: Option<Dimensions>,
) -> Option<Dimensions> {
    let path = record.renditions(&media.sizes).primary().path(&media.resolver);
    if known.is_some() && path.is_file() {
        return known;
    }
    let bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(file = %path.display(), "full-size image missing, skipped");
            return None;
        }
        Err(e) => {
            warn!(file = %path.display(), error = %e, "unreadable full-size image, skipped");
            return None;
        }
    };
    match media.backend.identify(&bytes) {
        Ok(dims) => Some(dims),
        Err(e) => {
            warn!(file = %path.display(), error = %e, "unreadable full-size image, skipped");
            None
        }
    }
}

/// Gallery payload for one owner, images in position order.
///
/// Images whose full-size file is missing are left out.
pub fn gallery_data<B, S>(media: &Media<B>, store: &S, owner: &OwnerRef) -> Result<GalleryData, GalleryError>
where
    B: ImageBackend,
    S: ImageStore + OwnerDirectory,
{
    require_owner(store, owner)?;
    let small_box = media.sizes.small_image;

    let images = store
        .images_for(owner)
        .into_iter()
        .filter_map(|(id, row)| {
            let known = row.dimensions;
            let record = ImageRecord::from_row(id, row);
            let size = actual_size(media, &record, known)?;
            let (width, height) = calculate_fit_dimensions(
                (size.width, size.height),
                (small_box.width, small_box.height),
            );
            let urls = record.urls(&media.resolver, &media.sizes);
            Some(GalleryImage {
                id,
                image: urls.image,
                image_size: size,
                small_image: urls.small_image,
                small_image_size: Dimensions { width, height },
                thumbnail: urls.thumbnail,
            })
        })
        .collect();

    Ok(GalleryData {
        images,
        image_size: media.sizes.image,
        small_image_size: media.sizes.small_image,
        thumbnail_size: media.sizes.thumbnail,
    })
}

/// Owners of `kind` that a gallery can be attached to.
pub fn owner_choices<D: OwnerDirectory>(owners: &D, kind: &str) -> Result<Vec<OwnerChoice>, GalleryError> {
    let info = owners
        .kind_info(kind)
        .filter(|info| info.gallery)
        .ok_or_else(|| GalleryError::GalleryUnsupported(kind.to_string()))?;
    if !info.gallery_visible {
        return Err(GalleryError::HiddenKind(kind.to_string()));
    }
    Ok(owners
        .owners_of(kind)
        .into_iter()
        .map(|(id, name)| OwnerChoice { id, name })
        .collect())
}

/// The owner's image with the lowest position, if any.
pub fn first_image<S: ImageStore>(store: &S, owner: &OwnerRef) -> Option<ImageRecord> {
    store
        .images_for(owner)
        .into_iter()
        .next()
        .map(|(id, row)| ImageRecord::from_row(id, row))
}

pub fn image_data<B: ImageBackend>(media: &Media<B>, record: &ImageRecord) -> ImageData {
    let ImageUrls {
        image, small_image, ..
    } = record.urls(&media.resolver, &media.sizes);
    ImageData {
        image: SizedUrl {
            url: image,
            width: media.sizes.image.width,
            height: media.sizes.image.height,
        },
        small_image: SizedUrl {
            url: small_image,
            width: media.sizes.small_image.width,
            height: media.sizes.small_image.height,
        },
    }
}

/// Delete every image of an owner, files first, then rows.
///
/// Stops at the first failure; images deleted before it stay deleted.
/// Returns the number of images removed.
pub fn delete_owner_images<B, S>(media: &Media<B>, store: &mut S, owner: &OwnerRef) -> Result<usize, GalleryError>
where
    B: ImageBackend,
    S: ImageStore,
{
    let rows = store.images_for(owner);
    if rows.is_empty() {
        debug!(owner = %owner, "no images to delete");
        return Ok(0);
    }
    let count = rows.len();
    for (id, row) in rows {
        ImageRecord::from_row(id, row).delete(media, store)?;
    }
    info!(owner = %owner, count, "deleted owner images");
    Ok(count)
}
