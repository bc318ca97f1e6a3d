//! Magic-byte image format detection.
//!
//! Identifies a format from the leading bytes of the payload, never from an
//! HTTP header or filename. Recognition is wider than the upload allow-list
//! so that a valid-but-disallowed image (say, a GIF) can be told apart from
//! bytes that are not an image at all.

/// Image formats this service can recognize from a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Bmp,
    Webp,
    Tiff,
}

impl ImageFormat {
    /// Canonical file extension for the format.
    pub fn ext(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::Gif => "gif",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Webp => "webp",
            ImageFormat::Tiff => "tif",
        }
    }
}

/// Detect an image format from leading magic bytes, or None for unknown.
///
/// Longer signatures are checked before the two-byte BMP marker so a short
/// ambiguous prefix cannot shadow a more specific match.
pub fn detect(bytes: &[u8]) -> Option<ImageFormat> {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some(ImageFormat::Png);
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return Some(ImageFormat::Gif);
    }
    if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
        return Some(ImageFormat::Webp);
    }
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some(ImageFormat::Jpeg);
    }
    if bytes.starts_with(&[0x49, 0x49, 0x2A, 0x00]) || bytes.starts_with(&[0x4D, 0x4D, 0x00, 0x2A])
    {
        return Some(ImageFormat::Tiff);
    }
    if bytes.starts_with(b"BM") {
        return Some(ImageFormat::Bmp);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::{ImageFormat, detect};

    #[test]
    fn detects_png() {
        let bytes = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00];
        assert_eq!(detect(&bytes), Some(ImageFormat::Png));
    }

    #[test]
    fn detects_jpeg() {
        let bytes = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
        assert_eq!(detect(&bytes), Some(ImageFormat::Jpeg));
    }

    #[test]
    fn detects_gif_variants() {
        assert_eq!(detect(b"GIF87a..."), Some(ImageFormat::Gif));
        assert_eq!(detect(b"GIF89a..."), Some(ImageFormat::Gif));
    }

    #[test]
    fn detects_bmp() {
        assert_eq!(detect(b"BM\x3a\x00\x00\x00"), Some(ImageFormat::Bmp));
    }

    #[test]
    fn detects_webp() {
        let mut bytes = Vec::from(*b"RIFF");
        bytes.extend_from_slice(&[0x24, 0x00, 0x00, 0x00]);
        bytes.extend_from_slice(b"WEBPVP8 ");
        assert_eq!(detect(&bytes), Some(ImageFormat::Webp));
    }

    #[test]
    fn detects_tiff_both_endians() {
        assert_eq!(
            detect(&[0x49, 0x49, 0x2A, 0x00, 0x08]),
            Some(ImageFormat::Tiff)
        );
        assert_eq!(
            detect(&[0x4D, 0x4D, 0x00, 0x2A, 0x00]),
            Some(ImageFormat::Tiff)
        );
    }

    #[test]
    fn riff_without_webp_tag_is_unknown() {
        let mut bytes = Vec::from(*b"RIFF");
        bytes.extend_from_slice(&[0x24, 0x00, 0x00, 0x00]);
        bytes.extend_from_slice(b"WAVEfmt ");
        assert_eq!(detect(&bytes), None);
    }

    #[test]
    fn unknown_and_short_buffers() {
        assert_eq!(detect(&[]), None);
        assert_eq!(detect(&[0x89]), None);
        assert_eq!(detect(b"hello world, definitely not an image"), None);
    }

    #[test]
    fn extensions() {
        assert_eq!(ImageFormat::Jpeg.ext(), "jpg");
        assert_eq!(ImageFormat::Png.ext(), "png");
        assert_eq!(ImageFormat::Bmp.ext(), "bmp");
        assert_eq!(ImageFormat::Gif.ext(), "gif");
    }
}
