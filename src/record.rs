//! Image records: one uploaded image attached to one owner.
//!
//! A record is either *transient* (never saved, no slug yet) or *persisted*
//! (has an id, a position and a stored name). Saving drives the rendition
//! decision table:
//!
//! - A transient record, or one whose owner changed since it was loaded, gets
//!   a fresh position at the end of its owner's gallery and a fresh slug from
//!   the owner's title.
//! - Any other save passes no slug, so the renditions only change if new
//!   bytes were attached with [`ImageRecord::replace_image`].
//!
//! Positions are never renumbered. Deleting the middle image of a gallery
//! leaves a gap; callers that need contiguous positions resequence them.
//!
//! Slug allocation reads the store and then writes files without any lock.
//! Two processes saving images for identically titled owners at the same
//! time can pick the same slug. The catalog is single-writer, so the CLI
//! never hits this.

use crate::imaging::{Dimensions, ImageBackend, is_supported_extension};
use crate::media::{Media, RenditionRole, RenditionSizes};
use crate::naming::{basename, extension, is_stored_name, stem};
use crate::paths::PathResolver;
use crate::rendition::{RenditionError, RenditionSet, Upload, UploadKind};
use crate::slug;
use crate::store::{ImageId, ImageRow, ImageStore, OwnerDirectory, OwnerRef, StoreError};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Invalid upload: {0}")]
    Validation(String),
    #[error("Owner {0} not found")]
    OwnerNotFound(OwnerRef),
    #[error("Owner kind '{0}' does not support galleries")]
    GalleryUnsupported(String),
    #[error("Rendition error: {0}")]
    Rendition(#[from] RenditionError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Public URLs of every rendition of one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageUrls {
    pub image: String,
    pub small_image: String,
    pub thumbnail: String,
    pub preview: String,
    pub small_preview: String,
}

#[derive(Debug, Clone, Default)]
pub struct ImageRecord {
    id: Option<ImageId>,
    stored_name: String,
    position: u32,
    owner: Option<OwnerRef>,
    dimensions: Option<Dimensions>,
    /// Bytes attached since the last save.
    pending: Option<Upload>,
    /// Owner as of the last load or save.
    prior_owner: Option<OwnerRef>,
    /// Stored name as of the last load or save.
    prior_stored_name: String,
}

impl ImageRecord {
    /// An empty transient record.
    pub fn new() -> Self {
        Self::default()
    }

    /// A transient record for a new upload.
    pub fn with_upload(owner: OwnerRef, upload: Upload) -> Self {
        Self {
            owner: Some(owner),
            pending: Some(upload),
            ..Self::default()
        }
    }

    pub fn from_row(id: ImageId, row: ImageRow) -> Self {
        Self {
            id: Some(id),
            prior_stored_name: row.name.clone(),
            stored_name: row.name,
            position: row.position,
            prior_owner: Some(row.owner.clone()),
            owner: Some(row.owner),
            dimensions: row.dimensions,
            pending: None,
        }
    }

    pub fn load<S: ImageStore>(store: &S, id: ImageId) -> Result<Self, RecordError> {
        let row = store.get(id).ok_or(StoreError::NotFound(id))?;
        Ok(Self::from_row(id, row))
    }

    pub fn id(&self) -> Option<ImageId> {
        self.id
    }

    pub fn owner(&self) -> Option<&OwnerRef> {
        self.owner.as_ref()
    }

    pub fn position(&self) -> u32 {
        self.position
    }

    /// Logical name, `{subdir}/{slug}{ext}`. Empty until first saved.
    pub fn stored_name(&self) -> &str {
        &self.stored_name
    }

    /// Size of the full-size rendition, if known.
    pub fn dimensions(&self) -> Option<Dimensions> {
        self.dimensions
    }

    pub fn slug(&self) -> &str {
        stem(basename(&self.stored_name))
    }

    pub fn extension(&self) -> &str {
        extension(&self.stored_name)
    }

    /// Attach the record to another owner. Takes effect on the next save.
    pub fn set_owner(&mut self, owner: OwnerRef) {
        self.owner = Some(owner);
    }

    /// Replace the image bytes. Takes effect on the next save.
    pub fn replace_image(&mut self, upload: Upload) {
        self.pending = Some(upload);
    }

    /// Returns `true` if the owner differs from the one last persisted,
    /// including a record that never had one.
    pub fn owner_changed(&self) -> bool {
        self.owner != self.prior_owner
    }

    pub fn renditions(&self, sizes: &RenditionSizes) -> RenditionSet {
        RenditionSet::new(sizes, &self.stored_name)
    }

    pub fn urls(&self, resolver: &PathResolver, sizes: &RenditionSizes) -> ImageUrls {
        let set = self.renditions(sizes);
        let url = |role| set.get(role).url(resolver);
        ImageUrls {
            image: url(RenditionRole::Image),
            small_image: url(RenditionRole::SmallImage),
            thumbnail: url(RenditionRole::Thumbnail),
            preview: url(RenditionRole::Preview),
            small_preview: url(RenditionRole::SmallPreview),
        }
    }

    /// Human-readable label, e.g. `Red Cat photo #1`.
    pub fn display<D: OwnerDirectory>(&self, owners: &D) -> String {
        let title = match &self.owner {
            Some(owner) => owners.title(owner).unwrap_or_else(|| owner.to_string()),
            None => String::new(),
        };
        format!("{} photo #{}", title, self.position + 1)
    }

    /// Persist the record, creating, renaming or replacing its renditions as
    /// needed.
    ///
    /// The upload and owner are validated before anything is touched. A
    /// failure after that point may leave some renditions updated; the
    /// record keeps its pending upload and prior state, so saving again
    /// converges on the intended result.
    pub fn save<B, S>(&mut self, media: &Media<B>, store: &mut S) -> Result<ImageId, RecordError>
    where
        B: ImageBackend,
        S: ImageStore + OwnerDirectory,
    {
        let result = self.try_save(media, store);
        if let Err(e) = &result {
            error!(name = %self.prior_stored_name, error = %e, "failed to save image");
        }
        result
    }

    fn try_save<B, S>(&mut self, media: &Media<B>, store: &mut S) -> Result<ImageId, RecordError>
    where
        B: ImageBackend,
        S: ImageStore + OwnerDirectory,
    {
        let (owner, title) = self.validate(media, store)?;

        let mut position = self.position;
        let mut new_slug = None;
        if self.id.is_none() || self.owner_changed() {
            position = store.max_position(&owner).map_or(0, |max| max + 1);
            new_slug = Some(slug::allocate(&title, |candidate| {
                store.name_taken(&media.resolver.name_in_db(candidate))
            }));
        }

        let upload = self.pending.take();
        let kind = match &upload {
            Some(upload) => UploadKind::Fresh(upload),
            None => UploadKind::Stored,
        };
        let mut set = RenditionSet::new(&media.sizes, &self.prior_stored_name);
        let applied = set
            .save(media, kind, new_slug.as_deref(), &self.prior_stored_name)
            .and_then(|()| set.flush_primary(&media.resolver));
        let flushed = match applied {
            Ok(flushed) => flushed,
            Err(e) => {
                self.pending = upload;
                return Err(e.into());
            }
        };

        let stored_name = set.stored_name(&media.resolver);
        let dimensions = flushed.or(self.dimensions);
        let row = ImageRow {
            name: stored_name.clone(),
            position,
            owner: owner.clone(),
            dimensions,
        };
        let id = match self.id {
            Some(id) => {
                store.update(id, row)?;
                id
            }
            None => store.insert(row)?,
        };

        info!(id, name = %stored_name, position, owner = %owner, "saved image");
        self.id = Some(id);
        self.stored_name = stored_name.clone();
        self.prior_stored_name = stored_name;
        self.position = position;
        self.dimensions = dimensions;
        self.prior_owner = Some(owner);
        Ok(id)
    }

    /// Check everything a save needs before any file changes. Returns the
    /// owner and its title.
    fn validate<B, S>(&self, media: &Media<B>, store: &S) -> Result<(OwnerRef, String), RecordError>
    where
        B: ImageBackend,
        S: OwnerDirectory,
    {
        let owner = self
            .owner
            .clone()
            .ok_or_else(|| RecordError::Validation("an owner is required".into()))?;
        let title = store
            .title(&owner)
            .ok_or_else(|| RecordError::OwnerNotFound(owner.clone()))?;
        if !store.kind_info(&owner.kind).is_some_and(|k| k.gallery) {
            return Err(RecordError::GalleryUnsupported(owner.kind));
        }

        match &self.pending {
            Some(upload) => validate_upload(media, upload)?,
            None if self.id.is_none() => {
                return Err(RecordError::Validation("an image file is required".into()));
            }
            None => {}
        }
        Ok((owner, title))
    }

    /// Remove every rendition file, then the stored row.
    ///
    /// Files already gone are skipped. Deleting a transient record does
    /// nothing.
    pub fn delete<B, S>(&mut self, media: &Media<B>, store: &mut S) -> Result<(), RecordError>
    where
        B: ImageBackend,
        S: ImageStore,
    {
        let Some(id) = self.id else {
            return Ok(());
        };
        let result = RenditionSet::new(&media.sizes, &self.prior_stored_name)
            .delete(&media.resolver)
            .map_err(RecordError::from)
            .and_then(|()| store.remove(id).map(|_| ()).map_err(RecordError::from));
        if let Err(e) = &result {
            error!(id, name = %self.prior_stored_name, error = %e, "failed to delete image");
            return result;
        }
        info!(id, name = %self.prior_stored_name, "deleted image");
        self.id = None;
        self.prior_owner = None;
        self.prior_stored_name.clear();
        self.stored_name.clear();
        Ok(())
    }
}

fn validate_upload<B: ImageBackend>(media: &Media<B>, upload: &Upload) -> Result<(), RecordError> {
    let name = upload.name();
    if name.is_empty() || is_stored_name(name) {
        return Err(RecordError::Validation(format!(
            "'{name}' is not a bare filename"
        )));
    }
    if stem(name).is_empty() {
        return Err(RecordError::Validation(format!("'{name}' has no name")));
    }
    let ext = extension(name);
    if !is_supported_extension(ext) {
        return Err(RecordError::Validation(format!(
            "'{name}' is not a supported image type"
        )));
    }
    media
        .backend
        .verify(upload.bytes())
        .map_err(|e| RecordError::Validation(format!("'{name}' is not a valid image: {e}")))?;
    Ok(())
}
