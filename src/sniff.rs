use std::io::Cursor;

use image::ImageReader;

/// Returns true if `contents` starts with a recognised raster image
/// signature and its header decodes. Works on the buffer that was already
/// read, so the caller's copy of the bytes is never consumed.
pub fn is_image(contents: &[u8]) -> bool {
    let Ok(reader) = ImageReader::new(Cursor::new(contents)).with_guessed_format() else {
        return false;
    };
    if reader.format().is_none() {
        return false;
    }
    // A matching magic number is not enough; the header has to parse too.
    reader.into_dimensions().is_ok()
}
