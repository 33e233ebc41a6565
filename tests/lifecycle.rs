//! End-to-end rendition lifecycle against the real `image` backend.
//!
//! Uploads synthetic JPEG and PNG files, then checks file names, pixel sizes
//! and byte contents on disk through rename, replace and delete.

use content_gallery::gallery;
use content_gallery::imaging::{Quality, RustBackend};
use content_gallery::media::{Media, RenditionSizes};
use content_gallery::paths::PathResolver;
use content_gallery::record::{ImageRecord, RecordError};
use content_gallery::rendition::Upload;
use content_gallery::store::{Catalog, ImageStore, OwnerRef};
use image::{DynamicImage, ImageFormat, RgbImage};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const SUBDIR: &str = "content_gallery";

fn synthetic(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img).write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

fn media(tmp: &TempDir) -> Media<RustBackend> {
    Media::new(
        PathResolver::new(tmp.path(), "/media/", SUBDIR),
        RenditionSizes::default(),
        Quality::new(85),
        RustBackend::new(),
    )
}

fn red_cat() -> OwnerRef {
    OwnerRef::new("product", 1)
}

fn blue_cat() -> OwnerRef {
    OwnerRef::new("product", 2)
}

fn catalog() -> Catalog {
    let mut catalog = Catalog::default();
    catalog.set_owner(&red_cat(), "Red Cat");
    catalog.set_owner(&blue_cat(), "Blue Cat");
    catalog
}

fn storage(tmp: &TempDir) -> PathBuf {
    tmp.path().join(SUBDIR)
}

fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = match fs::read_dir(dir) {
        Ok(entries) => entries
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    names
}

fn rendition_files(slug: &str, ext: &str) -> Vec<String> {
    let mut names: Vec<String> = ["", "_preview", "_small", "_small_preview", "_thumbnail"]
        .iter()
        .map(|suffix| format!("{slug}{suffix}{ext}"))
        .collect();
    names.sort();
    names
}

#[test]
fn upload_rename_and_delete_red_cat() {
    let tmp = TempDir::new().unwrap();
    let media = media(&tmp);
    let mut catalog = catalog();
    let dir = storage(&tmp);

    // Upload
    let upload = Upload::new("photo.jpg", synthetic(1600, 1200, ImageFormat::Jpeg));
    let mut record = ImageRecord::with_upload(red_cat(), upload);
    record.save(&media, &mut catalog).unwrap();

    assert_eq!(record.stored_name(), "content_gallery/red-cat.jpg");
    assert_eq!(files_in(&dir), rendition_files("red-cat", ".jpg"));
    let expected = [
        ("red-cat.jpg", (752, 564)),
        ("red-cat_small.jpg", (564, 423)),
        ("red-cat_preview.jpg", (376, 282)),
        ("red-cat_small_preview.jpg", (141, 105)),
        ("red-cat_thumbnail.jpg", (94, 70)),
    ];
    for (file, dims) in expected {
        let path = dir.join(file);
        assert_eq!(image::image_dimensions(&path).unwrap(), dims, "{file}");
        assert_eq!(
            image::guess_format(&fs::read(&path).unwrap()).unwrap(),
            ImageFormat::Jpeg
        );
    }

    // Re-parent: stems change, bytes do not.
    let before: Vec<Vec<u8>> = rendition_files("red-cat", ".jpg")
        .iter()
        .map(|f| fs::read(dir.join(f)).unwrap())
        .collect();
    record.set_owner(blue_cat());
    record.save(&media, &mut catalog).unwrap();

    assert_eq!(record.stored_name(), "content_gallery/blue-cat.jpg");
    assert_eq!(files_in(&dir), rendition_files("blue-cat", ".jpg"));
    let after: Vec<Vec<u8>> = rendition_files("blue-cat", ".jpg")
        .iter()
        .map(|f| fs::read(dir.join(f)).unwrap())
        .collect();
    assert_eq!(before, after);

    // Delete
    let id = record.id().unwrap();
    record.delete(&media, &mut catalog).unwrap();
    assert!(files_in(&dir).is_empty());
    assert_eq!(catalog.get(id), None);
}

#[test]
fn replacing_with_png_switches_format_and_extension() {
    let tmp = TempDir::new().unwrap();
    let media = media(&tmp);
    let mut catalog = catalog();
    let dir = storage(&tmp);

    let mut record = ImageRecord::with_upload(
        red_cat(),
        Upload::new("photo.jpg", synthetic(800, 600, ImageFormat::Jpeg)),
    );
    record.save(&media, &mut catalog).unwrap();

    record.replace_image(Upload::new("scan.png", synthetic(300, 900, ImageFormat::Png)));
    record.save(&media, &mut catalog).unwrap();

    assert_eq!(files_in(&dir), rendition_files("red-cat", ".png"));
    let full = dir.join("red-cat.png");
    assert_eq!(
        image::guess_format(&fs::read(&full).unwrap()).unwrap(),
        ImageFormat::Png
    );
    // 300x900 into 752x608 is height-bound.
    assert_eq!(image::image_dimensions(&full).unwrap(), (202, 608));
    assert_eq!(record.dimensions().map(|d| (d.width, d.height)), Some((202, 608)));
}

#[test]
fn small_images_are_never_enlarged() {
    let tmp = TempDir::new().unwrap();
    let media = media(&tmp);
    let mut catalog = catalog();

    let mut record = ImageRecord::with_upload(
        red_cat(),
        Upload::new("tiny.png", synthetic(50, 40, ImageFormat::Png)),
    );
    record.save(&media, &mut catalog).unwrap();

    let dir = storage(&tmp);
    assert_eq!(image::image_dimensions(dir.join("red-cat.png")).unwrap(), (50, 40));
    assert_eq!(
        image::image_dimensions(dir.join("red-cat_small_preview.png")).unwrap(),
        (50, 40)
    );
    // Even the thumbnail box is larger than the source.
    assert_eq!(
        image::image_dimensions(dir.join("red-cat_thumbnail.png")).unwrap(),
        (50, 40)
    );
}

#[test]
fn corrupt_upload_leaves_storage_untouched() {
    let tmp = TempDir::new().unwrap();
    let media = media(&tmp);
    let mut catalog = catalog();

    let mut bytes = synthetic(800, 600, ImageFormat::Jpeg);
    bytes.truncate(20);
    let mut record = ImageRecord::with_upload(red_cat(), Upload::new("broken.jpg", bytes));

    assert!(record.save(&media, &mut catalog).is_err());
    assert!(files_in(&storage(&tmp)).is_empty());
    assert!(catalog.all().is_empty());
}

#[test]
fn replacing_with_a_truncated_body_keeps_the_stored_files() {
    let tmp = TempDir::new().unwrap();
    let media = media(&tmp);
    let mut catalog = catalog();
    let dir = storage(&tmp);

    let mut record = ImageRecord::with_upload(
        red_cat(),
        Upload::new("photo.jpg", synthetic(800, 600, ImageFormat::Jpeg)),
    );
    let id = record.save(&media, &mut catalog).unwrap();
    let before: Vec<Vec<u8>> = rendition_files("red-cat", ".jpg")
        .iter()
        .map(|f| fs::read(dir.join(f)).unwrap())
        .collect();

    // The header still parses; the pixel data stops halfway.
    let png = synthetic(800, 600, ImageFormat::Png);
    record.replace_image(Upload::new("b.png", png[..png.len() / 2].to_vec()));
    let err = record.save(&media, &mut catalog).unwrap_err();

    assert!(matches!(err, RecordError::Validation(_)), "{err}");
    assert_eq!(files_in(&dir), rendition_files("red-cat", ".jpg"));
    let after: Vec<Vec<u8>> = rendition_files("red-cat", ".jpg")
        .iter()
        .map(|f| fs::read(dir.join(f)).unwrap())
        .collect();
    assert_eq!(before, after);
    assert_eq!(catalog.get(id).unwrap().name, "content_gallery/red-cat.jpg");
}

#[test]
fn catalog_survives_a_reload() {
    let tmp = TempDir::new().unwrap();
    let media = media(&tmp);
    let catalog_path = tmp.path().join("content-gallery.json");
    let mut catalog = catalog();

    for _ in 0..2 {
        let mut record = ImageRecord::with_upload(
            red_cat(),
            Upload::new("photo.jpg", synthetic(640, 480, ImageFormat::Jpeg)),
        );
        record.save(&media, &mut catalog).unwrap();
    }
    catalog.save(&catalog_path).unwrap();

    let reloaded = Catalog::load(&catalog_path).unwrap();
    let data = gallery::gallery_data(&media, &reloaded, &red_cat()).unwrap();

    let urls: Vec<&str> = data.images.iter().map(|i| i.image.as_str()).collect();
    assert_eq!(
        urls,
        [
            "/media/content_gallery/red-cat.jpg",
            "/media/content_gallery/red-cat-1.jpg",
        ]
    );
    assert_eq!(
        (data.images[0].image_size.width, data.images[0].image_size.height),
        (640, 480)
    );
    assert_eq!(
        (
            data.images[0].small_image_size.width,
            data.images[0].small_image_size.height
        ),
        (564, 423)
    );
}
