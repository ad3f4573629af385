//! Embedded media: image formats, pixel sizes and deduplicated parts.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Image formats PowerPoint can embed directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Bmp,
    Svg,
}

impl ImageFormat {
    pub const ALL: [ImageFormat; 5] = [
        ImageFormat::Png,
        ImageFormat::Jpeg,
        ImageFormat::Gif,
        ImageFormat::Bmp,
        ImageFormat::Svg,
    ];

    /// Format for a file extension, case-insensitive.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "png" => Some(ImageFormat::Png),
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "gif" => Some(ImageFormat::Gif),
            "bmp" => Some(ImageFormat::Bmp),
            "svg" => Some(ImageFormat::Svg),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Extension used for the media part name.
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Gif => "gif",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Svg => "svg",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Bmp => "image/bmp",
            ImageFormat::Svg => "image/svg+xml",
        }
    }
}

/// Pixel dimensions read from an image header. `None` for unreadable
/// headers and vector images.
pub fn pixel_size(format: ImageFormat, bytes: &[u8]) -> Option<(u32, u32)> {
    let format = match format {
        ImageFormat::Png => image::ImageFormat::Png,
        ImageFormat::Jpeg => image::ImageFormat::Jpeg,
        ImageFormat::Gif => image::ImageFormat::Gif,
        ImageFormat::Bmp => image::ImageFormat::Bmp,
        ImageFormat::Svg => return None,
    };
    let mut reader = image::ImageReader::new(Cursor::new(bytes));
    reader.set_format(format);
    match reader.into_dimensions() {
        Ok((width, height)) if width > 0 && height > 0 => Some((width, height)),
        Ok(_) => None,
        Err(e) => {
            log::debug!("cannot read {:?} header: {}", format, e);
            None
        }
    }
}

/// Largest box with the image's aspect ratio that fits in `max_width` x
/// `max_height`, never scaled above `natural` when given.
pub fn fit(aspect: f64, max_width: f64, max_height: f64, natural: Option<(f64, f64)>) -> (f64, f64) {
    let (mut width, mut height) = match natural {
        Some((w, h)) => (w, h),
        None => (max_width, max_width / aspect),
    };
    if width > max_width {
        width = max_width;
        height = width / aspect;
    }
    if height > max_height {
        height = max_height;
        width = height * aspect;
    }
    (width, height)
}

/// A media part queued for the package.
#[derive(Debug, Clone)]
pub struct MediaPart {
    /// File name under `ppt/media/`.
    pub name: String,
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
    pub pixels: Option<(u32, u32)>,
}

/// Media parts for a deck, one per distinct source file.
#[derive(Debug, Default)]
pub struct MediaStore {
    parts: Vec<MediaPart>,
    by_source: HashMap<PathBuf, usize>,
}

impl MediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an image file, returning the index of its part. The same
    /// source path is stored once.
    pub fn add(&mut self, source: &Path, format: ImageFormat, bytes: Vec<u8>) -> usize {
        if let Some(&index) = self.by_source.get(source) {
            return index;
        }
        let index = self.parts.len();
        self.parts.push(MediaPart {
            name: format!("image{}.{}", index + 1, format.extension()),
            pixels: pixel_size(format, &bytes),
            format,
            bytes,
        });
        self.by_source.insert(source.to_path_buf(), index);
        index
    }

    pub fn get(&self, index: usize) -> Option<&MediaPart> {
        self.parts.get(index)
    }

    pub fn parts(&self) -> &[MediaPart] {
        &self.parts
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Distinct `(extension, mime)` pairs for the content types part.
    pub fn content_types(&self) -> Vec<(&'static str, &'static str)> {
        ImageFormat::ALL
            .into_iter()
            .filter(|format| self.parts.iter().any(|p| p.format == *format))
            .map(|format| (format.extension(), format.mime_type()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(format: image::ImageFormat, width: u32, height: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        image::DynamicImage::new_rgb8(width, height)
            .write_to(&mut Cursor::new(&mut bytes), format)
            .unwrap();
        bytes
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ImageFormat::from_extension("JPG"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_path(Path::new("a/b.png")), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::from_extension("pdf"), None);
    }

    #[test]
    fn test_pixel_size_per_format() {
        let cases = [
            (ImageFormat::Png, image::ImageFormat::Png),
            (ImageFormat::Jpeg, image::ImageFormat::Jpeg),
            (ImageFormat::Gif, image::ImageFormat::Gif),
            (ImageFormat::Bmp, image::ImageFormat::Bmp),
        ];
        for (format, encoding) in cases {
            let bytes = encoded(encoding, 32, 16);
            assert_eq!(pixel_size(format, &bytes), Some((32, 16)), "{:?}", format);
        }
    }

    #[test]
    fn test_pixel_size_unreadable() {
        assert_eq!(pixel_size(ImageFormat::Png, b"not a png"), None);
        assert_eq!(pixel_size(ImageFormat::Svg, b"<svg/>"), None);
        // declared extension wins over the actual content
        let gif = encoded(image::ImageFormat::Gif, 8, 8);
        assert_eq!(pixel_size(ImageFormat::Png, &gif), None);
    }

    #[test]
    fn test_fit_keeps_aspect() {
        assert_eq!(fit(2.0, 8.0, 4.0, None), (8.0, 4.0));
        assert_eq!(fit(4.0, 8.0, 0.5, Some((2.0, 0.5))), (2.0, 0.5));
        assert_eq!(fit(4.0, 8.0, 0.5, Some((4.0, 1.0))), (2.0, 0.5));
        assert_eq!(fit(1.0, 8.0, 4.0, None), (4.0, 4.0));
    }

    #[test]
    fn test_store_deduplicates_by_source() {
        let png = encoded(image::ImageFormat::Png, 10, 10);
        let gif = encoded(image::ImageFormat::Gif, 1, 1);
        let mut store = MediaStore::new();
        let a = store.add(Path::new("eq.png"), ImageFormat::Png, png.clone());
        let b = store.add(Path::new("eq.png"), ImageFormat::Png, png);
        let c = store.add(Path::new("logo.gif"), ImageFormat::Gif, gif);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(c).unwrap().name, "image2.gif");
        assert_eq!(store.get(a).unwrap().pixels, Some((10, 10)));
        assert_eq!(
            store.content_types(),
            vec![("png", "image/png"), ("gif", "image/gif")]
        );
    }
}
