//! Raw camera buffer decoding
//!
//! CARLA delivers 4 bytes per pixel in B, G, R, A order. The cockpit works in
//! packed 3-byte RGB: the fourth byte is dropped and the remaining three are
//! reversed.

use contracts::{ImageData, ImageFormat};

use crate::error::{CaptureError, Result};

/// Decoded frame, packed RGB, row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl RgbFrame {
    /// Byte length of a packed RGB frame with these dimensions
    pub fn byte_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * 3
    }

    /// Pixel at (x, y) as [R, G, B]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 3;
        let px = self.data.get(offset..offset + 3)?;
        Some([px[0], px[1], px[2]])
    }
}

/// Decode a raw camera image into an RGB frame
///
/// # Errors
/// `Decode` if the buffer length does not match the declared geometry.
pub fn decode_image(camera: &str, image: &ImageData) -> Result<RgbFrame> {
    let expected = image.expected_len();
    if image.data.len() != expected {
        return Err(CaptureError::decode(
            camera,
            format!(
                "{}x{} {:?} needs {} bytes, got {}",
                image.width,
                image.height,
                image.format,
                expected,
                image.data.len()
            ),
        ));
    }

    let data = match image.format {
        ImageFormat::Bgra8 => bgra_to_rgb(&image.data),
        ImageFormat::Rgb8 => image.data.to_vec(),
    };

    Ok(RgbFrame {
        width: image.width,
        height: image.height,
        data,
    })
}

/// Drop the fourth channel and reverse the first three
pub fn bgra_to_rgb(bgra: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(bgra.len() / 4 * 3);
    for px in bgra.chunks_exact(4) {
        rgb.extend_from_slice(&[px[2], px[1], px[0]]);
    }
    rgb
}
