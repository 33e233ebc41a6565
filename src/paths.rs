//! Mapping logical filenames to filesystem paths and public URLs.
//!
//! All gallery files live in one storage sub-directory below the media root:
//!
//! ```text
//! path("red-cat.jpg") = {media_root}/{subdir}/red-cat.jpg
//! url("red-cat.jpg")  = {media_url}/{subdir}/red-cat.jpg
//! ```
//!
//! The sub-directory is normalized once on construction, so `"gallery"`,
//! `"/gallery"` and `"gallery/"` all resolve identically.

use std::io;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolver {
    media_root: PathBuf,
    /// Base URL without a trailing slash (may be empty for `"/"`).
    media_url: String,
    /// Sub-directory without leading or trailing slashes.
    subdir: String,
}

impl PathResolver {
    pub fn new(media_root: impl Into<PathBuf>, media_url: &str, subdir: &str) -> Self {
        Self {
            media_root: media_root.into(),
            media_url: media_url.trim_end_matches('/').to_string(),
            subdir: subdir.trim_matches('/').to_string(),
        }
    }

    /// The directory every rendition file is written to.
    pub fn storage_dir(&self) -> PathBuf {
        self.media_root.join(&self.subdir)
    }

    /// Filesystem path of a file in the storage directory.
    pub fn path(&self, filename: &str) -> PathBuf {
        self.storage_dir().join(filename)
    }

    /// Public URL of a file in the storage directory.
    pub fn url(&self, filename: &str) -> String {
        format!("{}/{}/{}", self.media_url, self.subdir, filename)
    }

    /// The logical name a file is persisted under (`{subdir}/{filename}`).
    pub fn name_in_db(&self, filename: &str) -> String {
        format!("{}/{}", self.subdir, filename)
    }

    /// Create the storage directory if it is absent.
    ///
    /// A directory that already exists, including one created concurrently
    /// by another writer, counts as success.
    pub fn ensure_storage_dir(&self) -> io::Result<()> {
        std::fs::create_dir_all(self.storage_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn path_joins_root_subdir_and_filename() {
        let resolver = PathResolver::new("/srv/media", "/media/", "content_gallery");
        assert_eq!(
            resolver.path("red-cat.jpg"),
            PathBuf::from("/srv/media/content_gallery/red-cat.jpg")
        );
    }

    #[test]
    fn url_normalizes_slashes() {
        let expected = "/media/content_gallery/red-cat.jpg";
        for (media_url, subdir) in [
            ("/media/", "content_gallery"),
            ("/media", "/content_gallery/"),
            ("/media//", "content_gallery/"),
        ] {
            let resolver = PathResolver::new("/srv/media", media_url, subdir);
            assert_eq!(resolver.url("red-cat.jpg"), expected, "{media_url} + {subdir}");
        }
    }

    #[test]
    fn url_with_absolute_media_url() {
        let resolver = PathResolver::new("/srv", "https://cdn.example.com/m/", "gallery");
        assert_eq!(
            resolver.url("red-cat_thumbnail.jpg"),
            "https://cdn.example.com/m/gallery/red-cat_thumbnail.jpg"
        );
    }

    #[test]
    fn path_ignores_subdir_slashes() {
        let a = PathResolver::new("/srv/media", "/media/", "/gallery/");
        let b = PathResolver::new("/srv/media", "/media/", "gallery");
        assert_eq!(a.path("x.png"), b.path("x.png"));
    }

    #[test]
    fn name_in_db_prefixes_subdir() {
        let resolver = PathResolver::new("/srv/media", "/media/", "/gallery/");
        assert_eq!(resolver.name_in_db("red-cat.jpg"), "gallery/red-cat.jpg");
    }

    #[test]
    fn ensure_storage_dir_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let resolver = PathResolver::new(tmp.path(), "/media/", "gallery");

        resolver.ensure_storage_dir().unwrap();
        resolver.ensure_storage_dir().unwrap();

        assert!(tmp.path().join("gallery").is_dir());
    }
}
