//! Photo grid sub-document
//!
//! A grid is inserted in place of the paragraph holding its placeholder:
//! a borderless table with images laid out row-major, or a single message
//! paragraph when there is nothing to show.

use crate::inline::InlineImage;
use crate::media::MediaSink;
use crate::xml::escape_text;

const TWIPS_PER_MM: f64 = 1440.0 / 25.4;

/// Horizontal room around each image inside its cell
const CELL_PADDING_MM: f64 = 4.0;

#[derive(Debug, Clone)]
pub struct PhotoGrid {
    columns: usize,
    images: Vec<InlineImage>,
    empty_message: Option<String>,
}

impl PhotoGrid {
    /// `columns` is clamped to at least one
    pub fn new(images: Vec<InlineImage>, columns: usize, empty_message: Option<String>) -> Self {
        Self {
            columns: columns.max(1),
            images,
            empty_message,
        }
    }

    /// A grid that renders to nothing
    pub fn blank() -> Self {
        Self::new(Vec::new(), 1, None)
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn images(&self) -> &[InlineImage] {
        &self.images
    }

    pub fn empty_message(&self) -> Option<&str> {
        self.empty_message.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn rows(&self) -> usize {
        self.images.len().div_ceil(self.columns)
    }

    /// Number of table cells, including trailing blanks
    pub fn cell_count(&self) -> usize {
        self.rows() * self.columns
    }

    pub(crate) fn to_xml(&self, paragraph_properties: &str, media: &mut MediaSink) -> String {
        if self.images.is_empty() {
            return match &self.empty_message {
                Some(message) => format!(
                    r#"<w:p>{}<w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
                    paragraph_properties,
                    escape_text(message)
                ),
                None => String::new(),
            };
        }

        let widest_mm = self
            .images
            .iter()
            .map(InlineImage::width_mm)
            .fold(0.0_f64, f64::max);
        let cell_twips = ((widest_mm + CELL_PADDING_MM) * TWIPS_PER_MM).round() as u64;

        let mut xml = String::from(concat!(
            r#"<w:tbl><w:tblPr><w:tblW w:w="0" w:type="auto"/><w:jc w:val="center"/>"#,
            r#"<w:tblBorders><w:top w:val="nil"/><w:left w:val="nil"/><w:bottom w:val="nil"/>"#,
            r#"<w:right w:val="nil"/><w:insideH w:val="nil"/><w:insideV w:val="nil"/></w:tblBorders>"#,
            r#"<w:tblLayout w:type="fixed"/></w:tblPr><w:tblGrid>"#
        ));
        for _ in 0..self.columns {
            xml.push_str(&format!(r#"<w:gridCol w:w="{}"/>"#, cell_twips));
        }
        xml.push_str("</w:tblGrid>");

        for row in 0..self.rows() {
            xml.push_str("<w:tr>");
            for col in 0..self.columns {
                xml.push_str(&format!(
                    r#"<w:tc><w:tcPr><w:tcW w:w="{}" w:type="dxa"/></w:tcPr>"#,
                    cell_twips
                ));
                match self.images.get(row * self.columns + col) {
                    Some(image) => {
                        xml.push_str(r#"<w:p><w:pPr><w:jc w:val="center"/></w:pPr>"#);
                        xml.push_str(&media.embed(image));
                        xml.push_str("</w:p>");
                    }
                    None => xml.push_str("<w:p/>"),
                }
                xml.push_str("</w:tc>");
            }
            xml.push_str("</w:tr>");
        }

        xml.push_str("</w:tbl><w:p/>");
        xml
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inline::test_images;
    use proptest::prelude::*;

    fn images(count: usize) -> Vec<InlineImage> {
        let bytes = test_images::png(4, 3);
        (0..count)
            .map(|i| InlineImage::new(format!("photo{}.png", i), &bytes, 80.0).unwrap())
            .collect()
    }

    #[test]
    fn test_empty_grid_renders_message() {
        let grid = PhotoGrid::new(vec![], 2, Some("Фото не загружены".into()));
        let mut media = MediaSink::for_tests();
        let xml = grid.to_xml("", &mut media);
        assert!(xml.contains("Фото не загружены"));
        assert!(!xml.contains("<w:tbl>"));
        assert_eq!(grid.rows(), 0);
    }

    #[test]
    fn test_blank_grid_renders_nothing() {
        let mut media = MediaSink::for_tests();
        assert_eq!(PhotoGrid::blank().to_xml("", &mut media), "");
    }

    #[test]
    fn test_odd_count_leaves_trailing_blank_cell() {
        let grid = PhotoGrid::new(images(3), 2, None);
        let mut media = MediaSink::for_tests();
        let xml = grid.to_xml("", &mut media);

        assert_eq!(grid.rows(), 2);
        assert_eq!(xml.matches("<w:tr>").count(), 2);
        assert_eq!(xml.matches("<w:tc>").count(), 4);
        assert_eq!(xml.matches("<w:drawing>").count(), 3);
        assert_eq!(xml.matches("</w:tcPr><w:p/></w:tc>").count(), 1);
        assert!(xml.ends_with("</w:tbl><w:p/>"));
        assert_eq!(media.len(), 3);
    }

    #[test]
    fn test_zero_columns_clamped() {
        let grid = PhotoGrid::new(images(2), 0, None);
        assert_eq!(grid.columns(), 1);
        assert_eq!(grid.rows(), 2);
    }

    proptest! {
        #[test]
        fn rows_are_ceiling_of_count(count in 0usize..12, columns in 1usize..5) {
            let grid = PhotoGrid::new(images(count), columns, None);
            prop_assert_eq!(grid.rows(), (count + columns - 1) / columns);
            prop_assert!(grid.cell_count() >= count);
        }
    }
}
