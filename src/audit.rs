//! Consistency check between the catalog and the storage directory.
//!
//! Reports rendition files that some image expects but that are absent, and
//! files in the storage directory that no image accounts for. Read-only: a
//! missing rendition is recreated by re-uploading, an orphan is removed by
//! hand.

use crate::media::{Media, RenditionRole};
use crate::rendition::RenditionSet;
use crate::store::{ImageId, ImageStore};
use serde::Serialize;
use std::collections::BTreeSet;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Failed to read storage directory: {0}")]
    Walk(#[from] walkdir::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingRendition {
    pub id: ImageId,
    pub role: RenditionRole,
    pub file: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    pub missing: Vec<MissingRendition>,
    /// Files present in the storage directory that no image owns, sorted.
    pub orphans: Vec<String>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.orphans.is_empty()
    }
}

pub fn audit<B, S: ImageStore>(media: &Media<B>, store: &S) -> Result<AuditReport, AuditError> {
    let dir = media.resolver.storage_dir();
    let mut present = BTreeSet::new();
    if dir.is_dir() {
        for entry in WalkDir::new(&dir).min_depth(1).max_depth(1) {
            let entry = entry?;
            if entry.file_type().is_file() {
                present.insert(entry.file_name().to_string_lossy().to_string());
            }
        }
    }

    let mut report = AuditReport::default();
    let mut expected = BTreeSet::new();
    for (id, row) in store.all() {
        for rendition in RenditionSet::new(&media.sizes, &row.name).iter() {
            let file = rendition.filename();
            if !present.contains(&file) {
                report.missing.push(MissingRendition {
                    id,
                    role: rendition.role(),
                    file: file.clone(),
                });
            }
            expected.insert(file);
        }
    }
    report.orphans = present.difference(&expected).cloned().collect();
    Ok(report)
}
