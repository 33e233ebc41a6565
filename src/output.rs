//! CLI output formatting.
//!
//! Output is information-first: each image is shown by its identity (id and
//! display label) with its files as indented context lines.
//!
//! # Output Format
//!
//! ## Saved image
//!
//! ```text
//! #3 Red Cat photo #1 → content_gallery/red-cat.jpg (752x564)
//!     image: red-cat.jpg
//!     thumbnail: red-cat_thumbnail.jpg
//!     small_image: red-cat_small.jpg
//!     preview: red-cat_preview.jpg
//!     small_preview: red-cat_small_preview.jpg
//! ```
//!
//! ## Gallery
//!
//! ```text
//! Red Cat (2 photos)
//!     001 #3 /media/content_gallery/red-cat.jpg (752x564)
//!     002 #4 /media/content_gallery/red-cat-1.jpg (405x608)
//! ```
//!
//! ## Audit
//!
//! ```text
//! Missing
//!     #3 preview: red-cat_preview.jpg
//! Orphans
//!     stray.jpg
//! ```
//!
//! Each `format_*` function returns `Vec<String>` and does no I/O; the
//! `print_*` wrappers write to stdout.

use crate::audit::AuditReport;
use crate::gallery::GalleryData;
use crate::media::RenditionSizes;
use crate::record::ImageRecord;
use crate::store::OwnerDirectory;

/// Format a 1-based position index as a zero-padded 3-digit string.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn photo_count(count: usize) -> String {
    if count == 1 {
        "1 photo".to_string()
    } else {
        format!("{count} photos")
    }
}

pub fn format_saved_image<D: OwnerDirectory>(
    record: &ImageRecord,
    owners: &D,
    sizes: &RenditionSizes,
) -> Vec<String> {
    let id = record.id().map_or_else(|| "-".to_string(), |id| id.to_string());
    let size = record
        .dimensions()
        .map(|d| format!(" ({}x{})", d.width, d.height))
        .unwrap_or_default();
    let mut lines = vec![format!(
        "#{} {} → {}{}",
        id,
        record.display(owners),
        record.stored_name(),
        size
    )];
    for rendition in record.renditions(sizes).iter() {
        lines.push(format!(
            "{}{}: {}",
            indent(1),
            rendition.role().as_str(),
            rendition.filename()
        ));
    }
    lines
}

pub fn print_saved_image<D: OwnerDirectory>(record: &ImageRecord, owners: &D, sizes: &RenditionSizes) {
    for line in format_saved_image(record, owners, sizes) {
        println!("{}", line);
    }
}

pub fn format_gallery(title: &str, data: &GalleryData) -> Vec<String> {
    let mut lines = vec![format!("{} ({})", title, photo_count(data.images.len()))];
    for (i, image) in data.images.iter().enumerate() {
        lines.push(format!(
            "{}{} #{} {} ({}x{})",
            indent(1),
            format_index(i + 1),
            image.id,
            image.image,
            image.image_size.width,
            image.image_size.height
        ));
    }
    lines
}

pub fn print_gallery(title: &str, data: &GalleryData) {
    for line in format_gallery(title, data) {
        println!("{}", line);
    }
}

pub fn format_audit_report(report: &AuditReport) -> Vec<String> {
    if report.is_clean() {
        return vec!["Storage is consistent".to_string()];
    }
    let mut lines = Vec::new();
    if !report.missing.is_empty() {
        lines.push("Missing".to_string());
        for missing in &report.missing {
            lines.push(format!(
                "{}#{} {}: {}",
                indent(1),
                missing.id,
                missing.role.as_str(),
                missing.file
            ));
        }
    }
    if !report.orphans.is_empty() {
        lines.push("Orphans".to_string());
        for orphan in &report.orphans {
            lines.push(format!("{}{}", indent(1), orphan));
        }
    }
    lines
}

pub fn print_audit_report(report: &AuditReport) {
    for line in format_audit_report(report) {
        println!("{}", line);
    }
}
