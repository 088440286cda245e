//! Inline images: probing, sizing and DrawingML markup

use std::io::Cursor;
use std::sync::Arc;

use image::ImageFormat;
use serde::Serialize;

use crate::error::DocxError;
use crate::xml::escape_attr;

/// English Metric Units per millimetre
pub const EMU_PER_MM: f64 = 36_000.0;

/// Image formats Word can embed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Png,
    Jpeg,
    Gif,
    Bmp,
    Tiff,
    WebP,
}

impl ImageKind {
    fn from_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Png => Some(ImageKind::Png),
            ImageFormat::Jpeg => Some(ImageKind::Jpeg),
            ImageFormat::Gif => Some(ImageKind::Gif),
            ImageFormat::Bmp => Some(ImageKind::Bmp),
            ImageFormat::Tiff => Some(ImageKind::Tiff),
            ImageFormat::WebP => Some(ImageKind::WebP),
            _ => None,
        }
    }

    /// Extension used for the media part name
    pub fn extension(&self) -> &'static str {
        match self {
            ImageKind::Png => "png",
            ImageKind::Jpeg => "jpeg",
            ImageKind::Gif => "gif",
            ImageKind::Bmp => "bmp",
            ImageKind::Tiff => "tiff",
            ImageKind::WebP => "webp",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ImageKind::Png => "image/png",
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Gif => "image/gif",
            ImageKind::Bmp => "image/bmp",
            ImageKind::Tiff => "image/tiff",
            ImageKind::WebP => "image/webp",
        }
    }
}

/// Format and pixel size decoded from image bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImageProbe {
    pub kind: ImageKind,
    pub width_px: u32,
    pub height_px: u32,
}

/// Guess the format from magic bytes and decode the pixel dimensions.
///
/// Only the header is decoded, so this is cheap even for large photos.
pub fn probe_image(bytes: &[u8]) -> Result<ImageProbe, DocxError> {
    if bytes.is_empty() {
        return Err(DocxError::Image("empty image payload".into()));
    }

    let reader = image::io::Reader::new(Cursor::new(bytes)).with_guessed_format()?;
    let format = reader
        .format()
        .ok_or_else(|| DocxError::Image("unrecognized image format".into()))?;
    let kind = ImageKind::from_format(format)
        .ok_or_else(|| DocxError::Image(format!("unsupported image format: {:?}", format)))?;

    let (width_px, height_px) = reader.into_dimensions()?;
    if width_px == 0 || height_px == 0 {
        return Err(DocxError::Image(format!(
            "degenerate image size {}x{}",
            width_px, height_px
        )));
    }

    Ok(ImageProbe {
        kind,
        width_px,
        height_px,
    })
}

/// An image ready to embed at a fixed physical width
#[derive(Debug, Clone)]
pub struct InlineImage {
    name: String,
    data: Arc<[u8]>,
    probe: ImageProbe,
    width_mm: f64,
}

impl InlineImage {
    /// Probe `data` and wrap it. This is the only fallible step of
    /// embedding; rendering a constructed `InlineImage` cannot fail.
    pub fn new(name: impl Into<String>, data: &[u8], width_mm: f64) -> Result<Self, DocxError> {
        let probe = probe_image(data)?;
        Ok(Self {
            name: name.into(),
            data: Arc::from(data),
            probe,
            width_mm,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn probe(&self) -> ImageProbe {
        self.probe
    }

    pub fn width_mm(&self) -> f64 {
        self.width_mm
    }

    /// Extent in EMU: fixed width, height following the pixel aspect ratio
    pub fn extent_emu(&self) -> (u64, u64) {
        let cx = (self.width_mm * EMU_PER_MM).round().max(1.0);
        let ratio = self.probe.height_px as f64 / self.probe.width_px as f64;
        let cy = (cx * ratio).round().max(1.0);
        (cx as u64, cy as u64)
    }
}

/// `<w:drawing>` markup for an inline picture bound to relationship `rel_id`
pub(crate) fn drawing_xml(rel_id: &str, doc_pr_id: u32, image: &InlineImage) -> String {
    let (cx, cy) = image.extent_emu();
    let name = escape_attr(image.name());
    format!(
        concat!(
            r#"<w:drawing><wp:inline xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" distT="0" distB="0" distL="0" distR="0">"#,
            r#"<wp:extent cx="{cx}" cy="{cy}"/><wp:effectExtent l="0" t="0" r="0" b="0"/>"#,
            r#"<wp:docPr id="{id}" name="{name}"/>"#,
            r#"<wp:cNvGraphicFramePr><a:graphicFrameLocks xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" noChangeAspect="1"/></wp:cNvGraphicFramePr>"#,
            r#"<a:graphic xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main">"#,
            r#"<a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/picture">"#,
            r#"<pic:pic xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture">"#,
            r#"<pic:nvPicPr><pic:cNvPr id="{id}" name="{name}"/><pic:cNvPicPr/></pic:nvPicPr>"#,
            r#"<pic:blipFill><a:blip xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" r:embed="{rel}"/>"#,
            r#"<a:stretch><a:fillRect/></a:stretch></pic:blipFill>"#,
            r#"<pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm>"#,
            r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr>"#,
            r#"</pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing>"#
        ),
        cx = cx,
        cy = cy,
        id = doc_pr_id,
        name = name,
        rel = rel_id,
    )
}

#[cfg(test)]
pub(crate) mod test_images {
    use std::io::Cursor;

    use image::{DynamicImage, ImageOutputFormat, RgbImage};

    /// Encode a solid image of the given size
    pub fn encoded(width: u32, height: u32, format: ImageOutputFormat) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::new(width, height));
        let mut cursor = Cursor::new(Vec::new());
        img.write_to(&mut cursor, format).unwrap();
        cursor.into_inner()
    }

    pub fn png(width: u32, height: u32) -> Vec<u8> {
        encoded(width, height, ImageOutputFormat::Png)
    }
}
