//! Photo grid and appendix image builders
//!
//! Both builders probe each attachment through [`InlineImage::new`]. A file
//! that fails probing is reported as `"name: reason"` and left out; the
//! rest of the block still renders.

use std::path::Path;

use docx_engine::{InlineImage, PhotoGrid};
use tracing::warn;

use crate::upload::UploadedAttachment;

const IMAGE_EXTENSIONS: [&str; 8] = ["png", "jpg", "jpeg", "bmp", "gif", "tif", "tiff", "webp"];

/// Case-insensitive check of the file extension
pub fn is_image_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.iter().any(|known| known.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

fn probe_all<'a>(
    files: impl IntoIterator<Item = &'a UploadedAttachment>,
    width_mm: f64,
) -> (Vec<InlineImage>, Vec<String>) {
    let mut images = Vec::new();
    let mut failures = Vec::new();
    for file in files {
        match InlineImage::new(file.name.as_str(), &file.data, width_mm) {
            Ok(image) => images.push(image),
            Err(e) => {
                warn!("Cannot embed '{}': {}", file.name, e);
                failures.push(format!("{}: {}", file.name, e));
            }
        }
    }
    (images, failures)
}

/// Lay out photos `columns` per row at a fixed width.
///
/// With nothing to show the grid renders `empty_message`.
pub fn build_photo_block(
    files: &[UploadedAttachment],
    columns: usize,
    empty_message: Option<&str>,
    width_mm: f64,
) -> (PhotoGrid, Vec<String>) {
    let (images, failures) = probe_all(files, width_mm);
    let grid = PhotoGrid::new(images, columns, empty_message.map(str::to_string));
    (grid, failures)
}

/// One inline image per attachment with an image extension; other files
/// are skipped without a failure entry.
pub fn build_appendix_entries(
    files: &[UploadedAttachment],
    width_mm: f64,
) -> (Vec<InlineImage>, Vec<String>) {
    probe_all(files.iter().filter(|f| is_image_name(&f.name)), width_mm)
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_image_names() {
        assert!(is_image_name("photo.JPG"));
        assert!(is_image_name("scan.tiff"));
        assert!(is_image_name("a.b.WebP"));
        assert!(!is_image_name("contract.pdf"));
        assert!(!is_image_name("png"));
        assert!(!is_image_name("без названия"));
    }

    #[test]
    fn test_photo_block_reports_bad_image() {
        let files = vec![
            photo("1.png"),
            attachment("2.jpg", b"not really a jpeg".to_vec()),
            photo("3.png"),
        ];
        let (grid, failures) = build_photo_block(&files, 2, Some("Нет фото"), 80.0);
        assert_eq!(grid.images().len(), 2);
        assert_eq!(grid.rows(), 1);
        assert_eq!(failures.len(), 1);
        assert!(failures[0].starts_with("2.jpg: "));
    }

    #[test]
    fn test_empty_photo_block_keeps_message() {
        let (grid, failures) = build_photo_block(&[], 2, Some("Нет фото"), 80.0);
        assert!(grid.is_empty());
        assert_eq!(grid.empty_message(), Some("Нет фото"));
        assert!(failures.is_empty());
    }

    #[test]
    fn test_appendix_skips_non_images_silently() {
        let files = vec![
            photo("page1.png"),
            attachment("contract.pdf", vec![1, 2, 3]),
            photo("page2.PNG"),
        ];
        let (entries, failures) = build_appendix_entries(&files, 160.0);
        let names: Vec<_> = entries.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["page1.png", "page2.PNG"]);
        assert!(failures.is_empty());
    }

    #[test]
    fn test_appendix_embedding_failure_is_recorded() {
        let files = vec![attachment("fake.png", vec![0, 1, 2, 3])];
        let (entries, failures) = build_appendix_entries(&files, 160.0);
        assert!(entries.is_empty());
        assert_eq!(failures.len(), 1);
        assert!(failures[0].starts_with("fake.png: "));
    }

    proptest! {
        #[test]
        fn appendix_count_matches_image_names(kinds in proptest::collection::vec(any::<bool>(), 0..8)) {
            let files: Vec<_> = kinds
                .iter()
                .enumerate()
                .map(|(i, &is_image)| {
                    if is_image {
                        photo(&format!("{}.png", i))
                    } else {
                        attachment(&format!("{}.docx", i), vec![1])
                    }
                })
                .collect();
            let (entries, _) = build_appendix_entries(&files, 100.0);
            prop_assert!(entries.len() <= files.len());
            prop_assert_eq!(entries.len(), kinds.iter().filter(|k| **k).count());
        }

        #[test]
        fn grid_rows_are_ceiling(count in 0usize..9, columns in 1usize..4) {
            let files: Vec<_> = (0..count).map(|i| photo(&format!("{}.png", i))).collect();
            let (grid, _) = build_photo_block(&files, columns, None, 60.0);
            prop_assert_eq!(grid.rows(), (count + columns - 1) / columns);
            prop_assert!(grid.cell_count() >= count);
        }
    }
}
