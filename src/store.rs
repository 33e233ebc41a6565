//! Persistence seam for image rows and owning records.
//!
//! The rendition lifecycle needs very little from storage: look up rows,
//! find the highest position within an owner, test whether a stored name
//! prefix is taken, and insert/update/remove rows. [`ImageStore`] captures
//! exactly that. [`OwnerDirectory`] answers the owner-side questions: does
//! the owner exist, what is its display title, does its kind support
//! galleries at all.
//!
//! [`Catalog`] implements both on top of a versioned JSON file:
//!
//! ```json
//! {
//!   "version": 1,
//!   "next_id": 3,
//!   "kinds": {
//!     "product": { "gallery": true, "gallery_visible": true, "owners": { "1": "Red Cat" } }
//!   },
//!   "images": {
//!     "1": { "name": "content_gallery/red-cat.jpg", "position": 0,
//!            "owner": { "kind": "product", "id": 1 },
//!            "dimensions": { "width": 752, "height": 564 } }
//!   }
//! }
//! ```
//!
//! Reads never fail: the whole catalog is loaded up front. Only mutations of
//! missing rows and file I/O produce a [`StoreError`].

use crate::imaging::Dimensions;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Version of the catalog file format.
const CATALOG_VERSION: u32 = 1;

pub type ImageId = u64;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Image #{0} not found")]
    NotFound(ImageId),
    #[error("Unsupported catalog version {0} (expected {CATALOG_VERSION})")]
    UnsupportedVersion(u32),
}

/// Polymorphic reference to an owning record: a kind discriminator plus an
/// identifier within that kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OwnerRef {
    pub kind: String,
    pub id: u64,
}

impl OwnerRef {
    pub fn new(kind: impl Into<String>, id: u64) -> Self {
        Self {
            kind: kind.into(),
            id,
        }
    }
}

impl fmt::Display for OwnerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

impl FromStr for OwnerRef {
    type Err = String;

    /// Parse `KIND:ID`, e.g. `product:42`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .rsplit_once(':')
            .ok_or_else(|| format!("expected KIND:ID, got '{s}'"))?;
        if kind.is_empty() {
            return Err(format!("missing kind in '{s}'"));
        }
        let id = id
            .parse::<u64>()
            .map_err(|e| format!("invalid id in '{s}': {e}"))?;
        Ok(Self::new(kind, id))
    }
}

/// One persisted image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRow {
    /// Stored logical name, `{subdir}/{slug}{ext}`.
    pub name: String,
    pub position: u32,
    pub owner: OwnerRef,
    /// Pixel size of the full-size rendition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
}

/// Storage for image rows.
pub trait ImageStore {
    fn get(&self, id: ImageId) -> Option<ImageRow>;

    /// Images of one owner in ascending position order.
    fn images_for(&self, owner: &OwnerRef) -> Vec<(ImageId, ImageRow)>;

    fn all(&self) -> Vec<(ImageId, ImageRow)>;

    /// Returns `true` if any stored name starts with `prefix`.
    fn name_taken(&self, prefix: &str) -> bool;

    /// Highest position among the owner's images, `None` if it has none.
    fn max_position(&self, owner: &OwnerRef) -> Option<u32>;

    /// Insert a new row and return its assigned id.
    fn insert(&mut self, row: ImageRow) -> Result<ImageId, StoreError>;

    /// Replace an existing row. Returns `Err(StoreError::NotFound)` if the id
    /// is unknown.
    fn update(&mut self, id: ImageId, row: ImageRow) -> Result<(), StoreError>;

    /// Remove a row. Returns `Err(StoreError::NotFound)` if the id is unknown.
    fn remove(&mut self, id: ImageId) -> Result<ImageRow, StoreError>;
}

/// How an owner kind relates to galleries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindInfo {
    /// Images can be attached to owners of this kind.
    pub gallery: bool,
    /// Owners of this kind may be listed as attachment choices.
    pub gallery_visible: bool,
}

/// Lookup of owning records.
pub trait OwnerDirectory {
    /// Display title of an owner, `None` if it does not exist.
    fn title(&self, owner: &OwnerRef) -> Option<String>;

    /// Gallery support of a kind, `None` if the kind is unknown.
    fn kind_info(&self, kind: &str) -> Option<KindInfo>;

    /// All owners of a kind as `(id, title)`, ordered by id.
    fn owners_of(&self, kind: &str) -> Vec<(u64, String)>;
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct KindEntry {
    #[serde(default = "default_true")]
    gallery: bool,
    #[serde(default = "default_true")]
    gallery_visible: bool,
    #[serde(default)]
    owners: BTreeMap<u64, String>,
}

impl Default for KindEntry {
    fn default() -> Self {
        Self {
            gallery: true,
            gallery_visible: true,
            owners: BTreeMap::new(),
        }
    }
}

/// JSON-file backed [`ImageStore`] + [`OwnerDirectory`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    version: u32,
    next_id: ImageId,
    #[serde(default)]
    kinds: BTreeMap<String, KindEntry>,
    #[serde(default)]
    images: BTreeMap<ImageId, ImageRow>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            version: CATALOG_VERSION,
            next_id: 1,
            kinds: BTreeMap::new(),
            images: BTreeMap::new(),
        }
    }
}

impl Catalog {
    /// Load a catalog file. A missing file yields an empty catalog.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        let catalog: Self = serde_json::from_str(&content)?;
        if catalog.version != CATALOG_VERSION {
            return Err(StoreError::UnsupportedVersion(catalog.version));
        }
        Ok(catalog)
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Register an owner kind, or update its flags if it exists.
    pub fn define_kind(&mut self, kind: &str, gallery: bool, gallery_visible: bool) {
        let entry = self.kinds.entry(kind.to_string()).or_default();
        entry.gallery = gallery;
        entry.gallery_visible = gallery_visible;
    }

    /// Add or retitle an owner. Unknown kinds are registered with gallery
    /// support.
    pub fn set_owner(&mut self, owner: &OwnerRef, title: impl Into<String>) {
        self.kinds
            .entry(owner.kind.clone())
            .or_default()
            .owners
            .insert(owner.id, title.into());
    }
}

impl ImageStore for Catalog {
    fn get(&self, id: ImageId) -> Option<ImageRow> {
        self.images.get(&id).cloned()
    }

    fn images_for(&self, owner: &OwnerRef) -> Vec<(ImageId, ImageRow)> {
        let mut rows: Vec<(ImageId, ImageRow)> = self
            .images
            .iter()
            .filter(|(_, row)| &row.owner == owner)
            .map(|(id, row)| (*id, row.clone()))
            .collect();
        rows.sort_by_key(|(id, row)| (row.position, *id));
        rows
    }

    fn all(&self) -> Vec<(ImageId, ImageRow)> {
        self.images
            .iter()
            .map(|(id, row)| (*id, row.clone()))
            .collect()
    }

    fn name_taken(&self, prefix: &str) -> bool {
        self.images.values().any(|row| row.name.starts_with(prefix))
    }

    fn max_position(&self, owner: &OwnerRef) -> Option<u32> {
        self.images
            .values()
            .filter(|row| &row.owner == owner)
            .map(|row| row.position)
            .max()
    }

    fn insert(&mut self, row: ImageRow) -> Result<ImageId, StoreError> {
        let id = self.next_id;
        self.next_id += 1;
        self.images.insert(id, row);
        Ok(id)
    }

    fn update(&mut self, id: ImageId, row: ImageRow) -> Result<(), StoreError> {
        match self.images.get_mut(&id) {
            Some(existing) => {
                *existing = row;
                Ok(())
            }
            None => Err(StoreError::NotFound(id)),
        }
    }

    fn remove(&mut self, id: ImageId) -> Result<ImageRow, StoreError> {
        self.images.remove(&id).ok_or(StoreError::NotFound(id))
    }
}

impl OwnerDirectory for Catalog {
    fn title(&self, owner: &OwnerRef) -> Option<String> {
        self.kinds.get(&owner.kind)?.owners.get(&owner.id).cloned()
    }

    fn kind_info(&self, kind: &str) -> Option<KindInfo> {
        self.kinds.get(kind).map(|entry| KindInfo {
            gallery: entry.gallery,
            gallery_visible: entry.gallery_visible,
        })
    }

    fn owners_of(&self, kind: &str) -> Vec<(u64, String)> {
        self.kinds
            .get(kind)
            .map(|entry| {
                entry
                    .owners
                    .iter()
                    .map(|(id, title)| (*id, title.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}
