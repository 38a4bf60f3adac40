//! Native-framework bridge: asks the running-application object (or the
//! shared workspace, for paths) for its icon and decodes the icon's TIFF
//! representation.

#[cfg(target_os = "macos")]
mod appkit;

#[cfg(target_os = "macos")]
pub use appkit::NativeIconProvider;

use image::RgbaImage;
use tracing::debug;

use crate::decode;
use crate::error::{IconError, Result};

/// Copies a framework-owned buffer after checking its reported length.
///
/// `copy` must return the buffer's bytes; the copy is rejected unless it
/// has exactly `reported_len` bytes.
pub fn copy_representation<F>(reported_len: usize, max_len: usize, copy: F) -> Result<Vec<u8>>
where
    F: FnOnce() -> Vec<u8>,
{
    if reported_len == 0 {
        return Err(IconError::ResourceReadError("icon representation is empty".into()));
    }
    if reported_len > max_len {
        return Err(IconError::ResourceReadError(format!(
            "icon representation of {reported_len} bytes exceeds limit of {max_len}"
        )));
    }
    let bytes = copy();
    if bytes.len() != reported_len {
        return Err(IconError::ResourceReadError(format!(
            "icon representation reported {reported_len} bytes, copied {}",
            bytes.len()
        )));
    }
    debug!(bytes = bytes.len(), "copied icon representation");
    Ok(bytes)
}

/// Decodes a copied TIFF representation.
pub fn decode_representation(bytes: &[u8]) -> Result<RgbaImage> {
    decode::decode_tiff(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba};
    use std::io::Cursor;

    #[test]
    fn oversized_representation_is_rejected_without_copying() {
        let mut copied = false;
        let err = copy_representation(300 * 1024 * 1024, 256 * 1024 * 1024, || {
            copied = true;
            Vec::new()
        })
        .unwrap_err();
        assert!(matches!(err, IconError::ResourceReadError(_)));
        assert!(!copied);
    }

    #[test]
    fn short_copy_is_rejected() {
        let err = copy_representation(10, 100, || vec![0; 4]).unwrap_err();
        assert!(matches!(err, IconError::ResourceReadError(_)));
    }

    #[test]
    fn tiff_representation_decodes() {
        let img = RgbaImage::from_pixel(12, 8, Rgba([1, 2, 3, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Tiff).unwrap();
        let tiff = out.into_inner();

        let bytes = copy_representation(tiff.len(), 1 << 20, || tiff.clone()).unwrap();
        let decoded = decode_representation(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (12, 8));
        assert_eq!(decoded.get_pixel(3, 3).0, [1, 2, 3, 255]);
    }

    #[test]
    fn garbage_representation_is_decode_error() {
        let err = decode_representation(b"II*\0garbage").unwrap_err();
        assert!(matches!(err, IconError::DecodeError(_)));
    }
}
