// io.rs -- Bitmap decode/encode at the planar boundary.
//
// The codec is the `image` crate; anything it can decode (BMP being the
// primary case here) is accepted and converted to 8-bit RGB. Dimensions
// always come from the decoded header, never from a caller-supplied size.

use std::fmt;
use std::path::Path;

use crate::planes::PlanarImage;

/// Decode an image file into a `PlanarImage`.
///
/// Non-RGB inputs (grayscale, paletted, RGBA) are converted to 8-bit RGB
/// first, so the planes are always well-formed.
pub fn load_planar<P: AsRef<Path>>(path: P) -> Result<PlanarImage, IoError> {
    let rgb = image::open(path.as_ref())
        .map_err(IoError::Decode)?
        .to_rgb8();
    let (w, h) = rgb.dimensions();
    Ok(PlanarImage::from_interleaved_rgb(
        w as usize,
        h as usize,
        rgb.as_raw(),
    ))
}

/// Encode a `PlanarImage` to a file. The format follows the extension
/// (`.bmp`, `.png`, ...), as the `image` crate resolves it.
pub fn save_planar<P: AsRef<Path>>(path: P, img: &PlanarImage) -> Result<(), IoError> {
    let interleaved = img.to_interleaved_rgb();
    let rgb: image::RgbImage = image::ImageBuffer::from_raw(
        img.width() as u32,
        img.height() as u32,
        interleaved,
    )
    .expect("interleaved buffer length matches dimensions");
    rgb.save(path.as_ref()).map_err(IoError::Encode)
}

/// Errors from image decode/encode.
#[derive(Debug)]
pub enum IoError {
    Decode(image::ImageError),
    Encode(image::ImageError),
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoError::Decode(e) => write!(f, "image decode failed: {e}"),
            IoError::Encode(e) => write!(f, "image encode failed: {e}"),
        }
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IoError::Decode(e) | IoError::Encode(e) => Some(e),
        }
    }
}
