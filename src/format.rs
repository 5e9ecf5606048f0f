// Image signature sniffing. Uploads are never rejected on format; the
// result only goes into the log and the upload receipt.

use std::fmt;

/// Extensions offered by the file dialog filter.
pub const PICKER_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "tif", "tiff"];

const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Bmp,
    Tiff,
    Unknown,
}

impl ImageFormat {
    /// Classify a buffer by its leading bytes. Anything shorter than the
    /// PNG signature is too short to trust and reported as `Unknown`.
    pub fn detect(data: &[u8]) -> ImageFormat {
        if data.len() < PNG_SIGNATURE.len() {
            return ImageFormat::Unknown;
        }
        match data {
            [0xFF, 0xD8, ..] => ImageFormat::Jpeg,
            _ if data.starts_with(&PNG_SIGNATURE) => ImageFormat::Png,
            [b'G', b'I', b'F', ..] => ImageFormat::Gif,
            [b'B', b'M', ..] => ImageFormat::Bmp,
            [b'I', b'I', ..] | [b'M', b'M', ..] => ImageFormat::Tiff,
            _ => ImageFormat::Unknown,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::Gif => "gif",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Tiff => "tiff",
            ImageFormat::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10, b'J', b'F'], ImageFormat::Jpeg)]
    #[case(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0], ImageFormat::Png)]
    #[case(b"GIF89a\x01\x00", ImageFormat::Gif)]
    #[case(b"BM\x36\x00\x00\x00\x00\x00", ImageFormat::Bmp)]
    #[case(b"II*\x00\x08\x00\x00\x00", ImageFormat::Tiff)]
    #[case(b"MM\x00*\x00\x00\x00\x08", ImageFormat::Tiff)]
    #[case(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10], ImageFormat::Unknown)]
    fn detects_signatures(#[case] data: &[u8], #[case] expected: ImageFormat) {
        assert_eq!(ImageFormat::detect(data), expected);
    }

    #[test]
    fn short_buffers_are_unknown() {
        // a valid JPEG prefix, but under eight bytes
        assert_eq!(ImageFormat::detect(&[0xFF, 0xD8, 0xFF]), ImageFormat::Unknown);
        assert_eq!(ImageFormat::detect(&[]), ImageFormat::Unknown);
    }

    #[test]
    fn picker_covers_every_known_format() {
        for format in [
            ImageFormat::Jpeg,
            ImageFormat::Png,
            ImageFormat::Gif,
            ImageFormat::Bmp,
            ImageFormat::Tiff,
        ] {
            assert!(PICKER_EXTENSIONS.contains(&format.extension()));
        }
    }
}
