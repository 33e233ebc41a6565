//! Rendition lifecycle: create, rename, replace and delete the resized
//! copies of one image.
//!
//! Each image has one full-size rendition and four suffixed ones. The
//! full-size rendition keeps its resized bytes in memory until the record is
//! persisted ([`RenditionSet::flush_primary`]); the suffixed ones write their
//! files straight away.
//!
//! # The save decision table
//!
//! Every rendition runs the same decision on [`RenditionSet::save`], keyed on
//! whether fresh bytes were uploaded and whether a new slug was allocated:
//!
//! | fresh bytes | new slug | effect |
//! |---|---|---|
//! | no  | no  | nothing |
//! | no  | yes | rename `{old}` → `{slug}{old ext}`, bytes untouched |
//! | yes | no  | delete `{old}`, write `{old stem}{upload ext}` |
//! | yes | yes | delete `{old}`, write `{slug}{upload ext}` |
//!
//! The old file is always located through the *prior* stored name and the
//! new one through the *post-save* slug. The steps run in a fixed order:
//! capture the old name, delete, rename, recompute the extension, create.
//!
//! # Missing files
//!
//! A file that should exist but does not is treated as already gone: delete
//! succeeds and rename skips it. Re-running an interrupted save therefore
//! converges on the same end state.

use crate::imaging::{BackendError, Dimensions, EncodedImage, ImageBackend, ResizeParams};
use crate::media::{Media, RenditionRole, RenditionSizes};
use crate::naming::{basename, extension, stem, suffixed_filename};
use crate::paths::PathResolver;
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum RenditionError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Image processing failed: {0}")]
    Backend(#[from] BackendError),
    #[error("Cannot rename onto existing file {0}")]
    RenameTargetExists(PathBuf),
}

fn io_error(path: PathBuf) -> impl FnOnce(io::Error) -> RenditionError {
    move |source| RenditionError::Io { path, source }
}

/// An uploaded file: the bare filename it was submitted under plus its bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    name: String,
    bytes: Vec<u8>,
}

impl Upload {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Whether a save carries freshly uploaded bytes.
#[derive(Debug, Clone, Copy)]
pub enum UploadKind<'a> {
    Fresh(&'a Upload),
    /// No new bytes; the stored files are the source of truth.
    Stored,
}

impl UploadKind<'_> {
    pub fn is_fresh(&self) -> bool {
        matches!(self, UploadKind::Fresh(_))
    }
}

/// A suffixed rendition that writes its file on create.
#[derive(Debug, Clone)]
pub struct StoredFileRendition {
    role: RenditionRole,
    suffix: &'static str,
    max: Dimensions,
    /// Unsuffixed base name, e.g. `red-cat.jpg`.
    name: String,
}

/// The full-size rendition. Holds resized bytes until the record flushes
/// them; renames and deletes act on its file directly.
#[derive(Debug, Clone)]
pub struct InMemoryPrimaryRendition {
    max: Dimensions,
    name: String,
    data: Option<EncodedImage>,
}

#[derive(Debug, Clone)]
pub enum Rendition {
    StoredFile(StoredFileRendition),
    InMemoryPrimary(InMemoryPrimaryRendition),
}

impl Rendition {
    fn new(role: RenditionRole, max: Dimensions, name: &str) -> Self {
        let name = basename(name).to_string();
        match role.suffix() {
            Some(suffix) => Rendition::StoredFile(StoredFileRendition {
                role,
                suffix,
                max,
                name,
            }),
            None => Rendition::InMemoryPrimary(InMemoryPrimaryRendition {
                max,
                name,
                data: None,
            }),
        }
    }

    pub fn role(&self) -> RenditionRole {
        match self {
            Rendition::StoredFile(r) => r.role,
            Rendition::InMemoryPrimary(_) => RenditionRole::Image,
        }
    }

    /// Bounding box this rendition is resized into.
    pub fn max_size(&self) -> Dimensions {
        match self {
            Rendition::StoredFile(r) => r.max,
            Rendition::InMemoryPrimary(r) => r.max,
        }
    }

    /// Base name shared with the rest of the set (`{slug}{ext}`).
    pub fn name(&self) -> &str {
        match self {
            Rendition::StoredFile(r) => &r.name,
            Rendition::InMemoryPrimary(r) => &r.name,
        }
    }

    fn set_name(&mut self, name: String) {
        match self {
            Rendition::StoredFile(r) => r.name = name,
            Rendition::InMemoryPrimary(r) => r.name = name,
        }
    }

    /// Name of this rendition's file for a given base name.
    fn filename_for(&self, name: &str) -> String {
        match self {
            Rendition::StoredFile(r) => suffixed_filename(name, r.suffix),
            Rendition::InMemoryPrimary(_) => name.to_string(),
        }
    }

    /// Name of this rendition's file in the storage directory.
    pub fn filename(&self) -> String {
        self.filename_for(self.name())
    }

    pub fn path(&self, resolver: &PathResolver) -> PathBuf {
        resolver.path(&self.filename())
    }

    pub fn url(&self, resolver: &PathResolver) -> String {
        resolver.url(&self.filename())
    }

    /// Apply the save decision table to this rendition.
    ///
    /// `slug` is `Some` when the record got a new slug (new record or new
    /// owner). `prior_name` is the stored name before this save, empty for a
    /// record that was never saved.
    pub fn save<B: ImageBackend>(
        &mut self,
        media: &Media<B>,
        kind: UploadKind<'_>,
        slug: Option<&str>,
        prior_name: &str,
    ) -> Result<(), RenditionError> {
        // Anything set since load is discarded in favour of the stored name.
        self.set_name(basename(prior_name).to_string());

        if kind.is_fresh() && !prior_name.is_empty() {
            self.delete(&media.resolver)?;
        }

        if let Some(slug) = slug {
            let ext = match kind {
                UploadKind::Fresh(upload) => extension(upload.name()),
                UploadKind::Stored => extension(prior_name),
            };
            let new_name = format!("{slug}{ext}");
            if !self.name().is_empty() && !kind.is_fresh() {
                self.rename(&media.resolver, &new_name)?;
            }
            self.set_name(new_name);
        }

        match kind {
            UploadKind::Fresh(upload) => {
                if slug.is_none() {
                    let renamed = format!("{}{}", stem(self.name()), extension(upload.name()));
                    self.set_name(renamed);
                }
                self.create(media, upload)
            }
            UploadKind::Stored => {
                if slug.is_none() {
                    debug!(file = %self.filename(), "rendition unchanged");
                }
                Ok(())
            }
        }
    }

    /// Resize the upload into this rendition's box.
    fn create<B: ImageBackend>(
        &mut self,
        media: &Media<B>,
        upload: &Upload,
    ) -> Result<(), RenditionError> {
        let params = ResizeParams {
            source: upload.bytes(),
            max_width: self.max_size().width,
            max_height: self.max_size().height,
            quality: media.quality,
        };
        let encoded = media.backend.resize(&params)?;

        if let Rendition::InMemoryPrimary(primary) = self {
            debug!(file = %primary.name, "prepared full-size image in memory");
            primary.data = Some(encoded);
            return Ok(());
        }

        let path = self.path(&media.resolver);
        media
            .resolver
            .ensure_storage_dir()
            .map_err(io_error(media.resolver.storage_dir()))?;
        std::fs::write(&path, &encoded.bytes).map_err(io_error(path.clone()))?;
        info!(
            file = %self.filename(),
            width = encoded.dimensions.width,
            height = encoded.dimensions.height,
            "created rendition"
        );
        Ok(())
    }

    /// Move this rendition's file to the file for `new_name`.
    ///
    /// A missing source file is skipped. An existing destination is an error;
    /// slug uniqueness keeps that from happening in normal operation.
    pub fn rename(&self, resolver: &PathResolver, new_name: &str) -> Result<(), RenditionError> {
        let from = self.path(resolver);
        let to = resolver.path(&self.filename_for(new_name));
        if from == to {
            return Ok(());
        }
        match std::fs::metadata(&from) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(file = %from.display(), "rendition missing, nothing to rename");
                return Ok(());
            }
            Err(e) => return Err(io_error(from)(e)),
        }
        if to.exists() {
            return Err(RenditionError::RenameTargetExists(to));
        }
        std::fs::rename(&from, &to).map_err(io_error(from.clone()))?;
        info!(from = %from.display(), to = %to.display(), "renamed rendition");
        Ok(())
    }

    /// Remove this rendition's file. Removing a file that is not there
    /// succeeds.
    pub fn delete(&self, resolver: &PathResolver) -> Result<(), RenditionError> {
        if self.name().is_empty() {
            return Ok(());
        }
        let path = self.path(resolver);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                info!(file = %path.display(), "deleted rendition");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(file = %path.display(), "rendition already absent");
                Ok(())
            }
            Err(e) => Err(io_error(path)(e)),
        }
    }
}

/// The full set of renditions of one image, processed together.
///
/// Calls fan out to every member with the same arguments, full-size first.
/// The first failure stops the call and is returned; members processed
/// before it keep their new state. Nothing is rolled back.
#[derive(Debug, Clone)]
pub struct RenditionSet {
    renditions: Vec<Rendition>,
}

impl RenditionSet {
    /// Build the set for an image stored under `stored_name` (may be empty).
    pub fn new(sizes: &RenditionSizes, stored_name: &str) -> Self {
        let renditions = RenditionRole::ALL
            .iter()
            .map(|&role| Rendition::new(role, sizes.for_role(role), stored_name))
            .collect();
        Self { renditions }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rendition> {
        self.renditions.iter()
    }

    pub fn get(&self, role: RenditionRole) -> &Rendition {
        // Built from `RenditionRole::ALL`, which follows declaration order.
        &self.renditions[role as usize]
    }

    pub fn primary(&self) -> &Rendition {
        &self.renditions[0]
    }

    pub fn save<B: ImageBackend>(
        &mut self,
        media: &Media<B>,
        kind: UploadKind<'_>,
        slug: Option<&str>,
        prior_name: &str,
    ) -> Result<(), RenditionError> {
        for rendition in &mut self.renditions {
            rendition.save(media, kind, slug, prior_name)?;
        }
        Ok(())
    }

    /// Write the full-size bytes held in memory, if any.
    ///
    /// Returns the dimensions of the written image, or `None` when the save
    /// carried no fresh upload.
    pub fn flush_primary(
        &mut self,
        resolver: &PathResolver,
    ) -> Result<Option<Dimensions>, RenditionError> {
        let Rendition::InMemoryPrimary(primary) = &mut self.renditions[0] else {
            return Ok(None);
        };
        let Some(data) = primary.data.take() else {
            return Ok(None);
        };
        resolver
            .ensure_storage_dir()
            .map_err(io_error(resolver.storage_dir()))?;
        let path = resolver.path(&primary.name);
        std::fs::write(&path, &data.bytes).map_err(io_error(path.clone()))?;
        info!(
            file = %primary.name,
            width = data.dimensions.width,
            height = data.dimensions.height,
            "stored full-size image"
        );
        Ok(Some(data.dimensions))
    }

    /// The logical name the record persists (`{subdir}/{slug}{ext}`).
    pub fn stored_name(&self, resolver: &PathResolver) -> String {
        resolver.name_in_db(self.primary().name())
    }

    pub fn delete(&self, resolver: &PathResolver) -> Result<(), RenditionError> {
        for rendition in &self.renditions {
            rendition.delete(resolver)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::Quality;
    use crate::imaging::backend::tests::{MockBackend, mock_image};
    use std::fs;
    use tempfile::TempDir;

    const SUBDIR: &str = "content_gallery";

    fn media(tmp: &TempDir, backend: MockBackend) -> Media<MockBackend> {
        Media::new(
            PathResolver::new(tmp.path(), "/media/", SUBDIR),
            RenditionSizes::default(),
            Quality::default(),
            backend,
        )
    }

    fn files_in(tmp: &TempDir) -> Vec<String> {
        let dir = tmp.path().join(SUBDIR);
        let mut names: Vec<String> = match fs::read_dir(&dir) {
            Ok(entries) => entries
                .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
                .collect(),
            Err(_) => Vec::new(),
        };
        names.sort();
        names
    }

    fn read(tmp: &TempDir, filename: &str) -> String {
        fs::read_to_string(tmp.path().join(SUBDIR).join(filename)).unwrap()
    }

    /// Save a brand-new image under `slug` and flush it, returning the set.
    fn create(media: &Media<MockBackend>, slug: &str, upload: &Upload) -> RenditionSet {
        let mut set = RenditionSet::new(&media.sizes, "");
        set.save(media, UploadKind::Fresh(upload), Some(slug), "").unwrap();
        set.flush_primary(&media.resolver).unwrap();
        set
    }

    #[test]
    fn new_image_creates_all_five_files() {
        let tmp = TempDir::new().unwrap();
        let media = media(&tmp, MockBackend::new());
        let upload = Upload::new("IMG_0042.jpg", mock_image(1600, 1200, "a"));

        let set = create(&media, "red-cat", &upload);

        assert_eq!(
            files_in(&tmp),
            [
                "red-cat.jpg",
                "red-cat_preview.jpg",
                "red-cat_small.jpg",
                "red-cat_small_preview.jpg",
                "red-cat_thumbnail.jpg",
            ]
        );
        assert_eq!(set.stored_name(&media.resolver), "content_gallery/red-cat.jpg");
        assert_eq!(read(&tmp, "red-cat.jpg"), "752x564<-1600x1200:a");
        assert_eq!(read(&tmp, "red-cat_thumbnail.jpg"), "94x70<-1600x1200:a");
        assert_eq!(read(&tmp, "red-cat_small.jpg"), "564x423<-1600x1200:a");
    }

    #[test]
    fn primary_is_not_written_before_flush() {
        let tmp = TempDir::new().unwrap();
        let media = media(&tmp, MockBackend::new());
        let upload = Upload::new("a.png", mock_image(100, 100, "a"));

        let mut set = RenditionSet::new(&media.sizes, "");
        set.save(&media, UploadKind::Fresh(&upload), Some("cat"), "")
            .unwrap();

        assert!(!files_in(&tmp).contains(&"cat.png".to_string()));
        let dims = set.flush_primary(&media.resolver).unwrap();
        assert_eq!(dims, Some(Dimensions { width: 100, height: 100 }));
        assert!(files_in(&tmp).contains(&"cat.png".to_string()));
        // Nothing left to flush.
        assert_eq!(set.flush_primary(&media.resolver).unwrap(), None);
    }

    #[test]
    fn no_upload_no_slug_is_a_no_op() {
        let tmp = TempDir::new().unwrap();
        let media = media(&tmp, MockBackend::new());
        let upload = Upload::new("a.jpg", mock_image(800, 600, "a"));
        create(&media, "red-cat", &upload);
        let before = files_in(&tmp);
        let resizes = media.backend.resize_count();

        let mut set = RenditionSet::new(&media.sizes, "content_gallery/red-cat.jpg");
        set.save(&media, UploadKind::Stored, None, "content_gallery/red-cat.jpg")
            .unwrap();

        assert_eq!(files_in(&tmp), before);
        assert_eq!(media.backend.resize_count(), resizes);
        assert_eq!(set.stored_name(&media.resolver), "content_gallery/red-cat.jpg");
    }

    #[test]
    fn new_slug_without_upload_renames_and_keeps_bytes() {
        let tmp = TempDir::new().unwrap();
        let media = media(&tmp, MockBackend::new());
        let upload = Upload::new("a.jpg", mock_image(800, 600, "a"));
        create(&media, "red-cat", &upload);
        let thumb_before = read(&tmp, "red-cat_thumbnail.jpg");
        let resizes = media.backend.resize_count();

        let mut set = RenditionSet::new(&media.sizes, "content_gallery/red-cat.jpg");
        set.save(
            &media,
            UploadKind::Stored,
            Some("blue-cat"),
            "content_gallery/red-cat.jpg",
        )
        .unwrap();

        assert_eq!(
            files_in(&tmp),
            [
                "blue-cat.jpg",
                "blue-cat_preview.jpg",
                "blue-cat_small.jpg",
                "blue-cat_small_preview.jpg",
                "blue-cat_thumbnail.jpg",
            ]
        );
        assert_eq!(read(&tmp, "blue-cat_thumbnail.jpg"), thumb_before);
        assert_eq!(media.backend.resize_count(), resizes);
        assert_eq!(set.flush_primary(&media.resolver).unwrap(), None);
        assert_eq!(set.stored_name(&media.resolver), "content_gallery/blue-cat.jpg");
    }

    #[test]
    fn upload_without_slug_replaces_files_and_takes_new_extension() {
        let tmp = TempDir::new().unwrap();
        let media = media(&tmp, MockBackend::new());
        create(&media, "red-cat", &Upload::new("a.jpg", mock_image(800, 600, "old")));

        let replacement = Upload::new("b.PNG", mock_image(800, 600, "new"));
        let mut set = RenditionSet::new(&media.sizes, "content_gallery/red-cat.jpg");
        set.save(
            &media,
            UploadKind::Fresh(&replacement),
            None,
            "content_gallery/red-cat.jpg",
        )
        .unwrap();
        set.flush_primary(&media.resolver).unwrap();

        assert_eq!(
            files_in(&tmp),
            [
                "red-cat.PNG",
                "red-cat_preview.PNG",
                "red-cat_small.PNG",
                "red-cat_small_preview.PNG",
                "red-cat_thumbnail.PNG",
            ]
        );
        assert_eq!(read(&tmp, "red-cat_thumbnail.PNG"), "94x70<-800x600:new");
        assert_eq!(set.stored_name(&media.resolver), "content_gallery/red-cat.PNG");
    }

    #[test]
    fn upload_with_slug_deletes_old_and_writes_under_new_slug() {
        let tmp = TempDir::new().unwrap();
        let media = media(&tmp, MockBackend::new());
        create(&media, "red-cat", &Upload::new("a.jpg", mock_image(800, 600, "old")));

        let replacement = Upload::new("b.webp", mock_image(400, 400, "new"));
        let mut set = RenditionSet::new(&media.sizes, "content_gallery/red-cat.jpg");
        set.save(
            &media,
            UploadKind::Fresh(&replacement),
            Some("blue-cat"),
            "content_gallery/red-cat.jpg",
        )
        .unwrap();
        set.flush_primary(&media.resolver).unwrap();

        assert_eq!(
            files_in(&tmp),
            [
                "blue-cat.webp",
                "blue-cat_preview.webp",
                "blue-cat_small.webp",
                "blue-cat_small_preview.webp",
                "blue-cat_thumbnail.webp",
            ]
        );
        assert_eq!(read(&tmp, "blue-cat.webp"), "400x400<-400x400:new");
    }

    #[test]
    fn rename_skips_missing_files() {
        let tmp = TempDir::new().unwrap();
        let media = media(&tmp, MockBackend::new());
        create(&media, "red-cat", &Upload::new("a.jpg", mock_image(800, 600, "a")));
        fs::remove_file(tmp.path().join(SUBDIR).join("red-cat_preview.jpg")).unwrap();

        let mut set = RenditionSet::new(&media.sizes, "content_gallery/red-cat.jpg");
        set.save(
            &media,
            UploadKind::Stored,
            Some("blue-cat"),
            "content_gallery/red-cat.jpg",
        )
        .unwrap();

        assert_eq!(
            files_in(&tmp),
            [
                "blue-cat.jpg",
                "blue-cat_small.jpg",
                "blue-cat_small_preview.jpg",
                "blue-cat_thumbnail.jpg",
            ]
        );
    }

    #[test]
    fn rename_onto_existing_file_fails() {
        let tmp = TempDir::new().unwrap();
        let media = media(&tmp, MockBackend::new());
        create(&media, "red-cat", &Upload::new("a.jpg", mock_image(800, 600, "a")));
        create(&media, "blue-cat", &Upload::new("b.jpg", mock_image(800, 600, "b")));

        let set = RenditionSet::new(&media.sizes, "content_gallery/red-cat.jpg");
        let err = set
            .get(RenditionRole::Thumbnail)
            .rename(&media.resolver, "blue-cat.jpg")
            .unwrap_err();

        assert!(matches!(err, RenditionError::RenameTargetExists(p) if p.ends_with("blue-cat_thumbnail.jpg")));
        assert_eq!(read(&tmp, "red-cat_thumbnail.jpg"), "94x70<-800x600:a");
    }

    #[test]
    fn delete_removes_every_file_and_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let media = media(&tmp, MockBackend::new());
        let set = create(&media, "red-cat", &Upload::new("a.jpg", mock_image(800, 600, "a")));

        set.delete(&media.resolver).unwrap();
        assert!(files_in(&tmp).is_empty());

        set.delete(&media.resolver).unwrap();
    }

    #[test]
    fn delete_of_never_saved_set_is_a_no_op() {
        let tmp = TempDir::new().unwrap();
        let media = media(&tmp, MockBackend::new());
        RenditionSet::new(&media.sizes, "").delete(&media.resolver).unwrap();
    }

    #[test]
    fn first_failure_stops_the_set() {
        let tmp = TempDir::new().unwrap();
        let media = media(&tmp, MockBackend::failing());
        let upload = Upload::new("a.jpg", mock_image(800, 600, "a"));

        let mut set = RenditionSet::new(&media.sizes, "");
        let err = set
            .save(&media, UploadKind::Fresh(&upload), Some("red-cat"), "")
            .unwrap_err();

        assert!(matches!(err, RenditionError::Backend(BackendError::Encode(_))));
        // The full-size image failed first; no other rendition was attempted.
        assert_eq!(media.backend.resize_count(), 1);
        assert!(files_in(&tmp).is_empty());
    }

    #[test]
    fn urls_and_paths_follow_the_naming_convention() {
        let tmp = TempDir::new().unwrap();
        let media = media(&tmp, MockBackend::new());
        let set = RenditionSet::new(&media.sizes, "content_gallery/red-cat.jpg");

        assert_eq!(
            set.get(RenditionRole::SmallPreview).url(&media.resolver),
            "/media/content_gallery/red-cat_small_preview.jpg"
        );
        assert_eq!(
            set.primary().path(&media.resolver),
            tmp.path().join(SUBDIR).join("red-cat.jpg")
        );
        assert_eq!(set.get(RenditionRole::Preview).max_size(), (376, 304).into());
    }
}
