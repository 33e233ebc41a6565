//! # Content Gallery
//!
//! Ordered image galleries attached to arbitrary owner records. Every image
//! is kept as a full-size rendition plus four resized ones, all named after
//! the owner:
//!
//! ```text
//! content_gallery/
//! ├── red-cat.jpg                 full-size (752x608 box)
//! ├── red-cat_small.jpg           564x456
//! ├── red-cat_preview.jpg         376x304
//! ├── red-cat_small_preview.jpg   141x114
//! └── red-cat_thumbnail.jpg       94x76
//! ```
//!
//! Saving an image creates its renditions, moving it to another owner renames
//! them, replacing its bytes re-creates them, and deleting it removes them.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`record`] | Image record state machine: position and slug assignment, save, delete |
//! | [`rendition`] | The save decision table for one rendition and for the whole set |
//! | [`slug`] | Unique filename stems from owner titles |
//! | [`naming`] | Filename convention: stem/extension split, suffixes, slugify |
//! | [`paths`] | Filesystem paths, public URLs and stored names of gallery files |
//! | [`imaging`] | Fit-within-box math and the `image`-crate resize backend |
//! | [`media`] | Rendition roles, their boxes, and the per-process media context |
//! | [`store`] | Storage traits and the JSON catalog of owners and images |
//! | [`gallery`] | Owner-facing reads: gallery payload, owner choices, bulk delete |
//! | [`audit`] | Storage directory vs. catalog consistency report |
//! | [`config`] | `content-gallery.toml` loading, layering and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Explicit Upload Kind
//!
//! Whether a save carries new bytes is decided once, when the record builds
//! its [`rendition::UploadKind`], instead of being re-derived from the shape
//! of a filename at every step. Upload names are still checked to be bare
//! filenames, since stored names always carry the storage sub-directory.
//!
//! ## Slug Uniqueness Is Injected
//!
//! [`slug::allocate`] takes its existence check as a closure. The record
//! passes a prefix match over stored names in the catalog, which makes slugs
//! unique per storage sub-directory.
//!
//! ## No Rollback
//!
//! A failure part-way through a save leaves the renditions already processed
//! in their new state. Re-running the same save converges, because missing
//! files are treated as already deleted or already renamed.

pub mod audit;
pub mod config;
pub mod gallery;
pub mod imaging;
pub mod media;
pub mod naming;
pub mod output;
pub mod paths;
pub mod record;
pub mod rendition;
pub mod slug;
pub mod store;
