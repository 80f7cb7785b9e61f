//! Least-significant-bit bitmap codec.
//!
//! The framed bit stream is written into the low bit of R, G and B of each
//! pixel in row-major order. Alpha is never touched.

use image::RgbaImage;

use crate::config;
use crate::stego::frame::{self, FrameReader};

/// Total carrier bits in an image of the given size.
pub fn capacity_bits(width: u32, height: u32) -> usize {
    width as usize * height as usize * config::LSB_BITS_PER_PIXEL
}

/// Largest payload (in bytes) that fits after the frame header.
pub fn capacity(width: u32, height: u32) -> usize {
    capacity_bits(width, height).saturating_sub(config::FRAME_HEADER_BITS) / 8
}

/// Hide `message` in a copy of `image`. `None` if it does not fit.
pub fn encode(image: &RgbaImage, message: &str) -> Option<RgbaImage> {
    encode_bytes(image, message.as_bytes())
}

pub fn encode_bytes(image: &RgbaImage, payload: &[u8]) -> Option<RgbaImage> {
    let (width, height) = image.dimensions();
    if frame::framed_bit_len(payload.len()) > capacity_bits(width, height) {
        return None;
    }

    let bits = frame::frame_bits(payload);
    let mut output = image.clone();
    let mut remaining = bits.iter();

    'pixels: for pixel in output.pixels_mut() {
        for channel in pixel.0.iter_mut().take(config::LSB_BITS_PER_PIXEL) {
            let Some(&bit) = remaining.next() else {
                break 'pixels;
            };
            *channel = (*channel & 0xFE) | bit;
        }
    }

    Some(output)
}

/// Recover a message hidden by [`encode`]. `None` for images that carry no
/// frame, a truncated frame, or a payload that is not UTF-8.
pub fn decode(image: &RgbaImage) -> Option<String> {
    decode_bytes(image).and_then(|bytes| String::from_utf8(bytes).ok())
}

pub fn decode_bytes(image: &RgbaImage) -> Option<Vec<u8>> {
    let (width, height) = image.dimensions();
    let available = capacity_bits(width, height);
    if available < config::FRAME_HEADER_BITS {
        return None;
    }

    let bits = image.pixels().flat_map(|pixel| {
        let [r, g, b, _] = pixel.0;
        [r & 1, g & 1, b & 1]
    });
    FrameReader::with_capacity_bound(available - config::FRAME_HEADER_BITS).read_from(bits)
}
