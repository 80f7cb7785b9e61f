//! Frequency-domain bitmap codec (Koch-Zhao style).
//!
//! One frame bit per 8x8 block, in row-major block order. A block carries
//! bit 0 when `|C1| > |C2|` and bit 1 otherwise, where C1 and C2 are the luma
//! DCT coefficients at (4,1) and (3,2). The encoder widens the gap to the
//! threshold `P` so the bit survives lossy recompression.
//!
//! Only whole blocks are used; pixels past the last multiple of 8 in either
//! dimension are left as they are.

pub mod transform;

use image::RgbaImage;
use rayon::prelude::*;

use crate::config::{self, GhostConfig, BLOCK_SIZE, DCT_C1, DCT_C2};
use crate::stego::frame::{self, FrameReader};
use transform::{Block, DctTables};

const CHANNELS: usize = 4;

/// Per-worker buffers reused across every block in a band.
struct Scratch {
    luma: Block,
    cb: Block,
    cr: Block,
    coeffs: Block,
    pass: Block,
}

impl Scratch {
    fn new() -> Self {
        let zero = [[0.0; BLOCK_SIZE]; BLOCK_SIZE];
        Self {
            luma: zero,
            cb: zero,
            cr: zero,
            coeffs: zero,
            pass: zero,
        }
    }
}

/// Geometry of the block grid over a row-major RGBA buffer.
#[derive(Clone, Copy)]
struct Grid {
    stride: usize,
    blocks_wide: usize,
    blocks_tall: usize,
}

impl Grid {
    fn of(image: &RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            stride: width as usize * CHANNELS,
            blocks_wide: width as usize / BLOCK_SIZE,
            blocks_tall: height as usize / BLOCK_SIZE,
        }
    }

    fn total_blocks(&self) -> usize {
        self.blocks_wide * self.blocks_tall
    }

    /// Bytes spanned by one row of blocks.
    fn band_len(&self) -> usize {
        self.stride * BLOCK_SIZE
    }

    fn offset(&self, bx: usize, x: usize, y: usize) -> usize {
        y * self.stride + (bx * BLOCK_SIZE + x) * CHANNELS
    }
}

pub struct DctCodec {
    tables: DctTables,
    threshold: f64,
}

impl DctCodec {
    pub fn new(cfg: &GhostConfig) -> Self {
        Self {
            tables: DctTables::new(),
            threshold: cfg.dct_threshold,
        }
    }

    /// Largest payload (in bytes) that fits after the frame header.
    pub fn capacity(width: u32, height: u32) -> usize {
        config::blocks_per_image(width, height).saturating_sub(config::FRAME_HEADER_BITS) / 8
    }

    /// Hide `message` in a copy of `image`. `None` if there are not enough blocks.
    pub fn encode(&self, image: &RgbaImage, message: &str) -> Option<RgbaImage> {
        self.encode_bytes(image, message.as_bytes())
    }

    pub fn encode_bytes(&self, image: &RgbaImage, payload: &[u8]) -> Option<RgbaImage> {
        let grid = Grid::of(image);
        if frame::framed_bit_len(payload.len()) > grid.total_blocks() {
            return None;
        }

        let bits = frame::frame_bits(payload);
        let mut output = image.clone();
        let raw: &mut [u8] = &mut output;

        raw.par_chunks_mut(grid.band_len())
            .take(grid.blocks_tall)
            .enumerate()
            .for_each(|(by, band)| {
                let start = by * grid.blocks_wide;
                if start >= bits.len() {
                    return;
                }
                let end = (start + grid.blocks_wide).min(bits.len());
                let mut scratch = Scratch::new();
                for (bx, &bit) in bits[start..end].iter().enumerate() {
                    self.embed_block(band, &grid, bx, bit, &mut scratch);
                }
            });

        Some(output)
    }

    /// Recover a message hidden by [`DctCodec::encode`].
    pub fn decode(&self, image: &RgbaImage) -> Option<String> {
        self.decode_bytes(image)
            .and_then(|bytes| String::from_utf8(bytes).ok())
    }

    pub fn decode_bytes(&self, image: &RgbaImage) -> Option<Vec<u8>> {
        let grid = Grid::of(image);
        let total = grid.total_blocks();
        if total < config::FRAME_HEADER_BITS {
            return None;
        }

        let raw: &[u8] = image;
        let bands: Vec<Vec<u8>> = raw
            .par_chunks(grid.band_len())
            .take(grid.blocks_tall)
            .map(|band| {
                let mut scratch = Scratch::new();
                (0..grid.blocks_wide)
                    .map(|bx| self.extract_block(band, &grid, bx, &mut scratch))
                    .collect::<Vec<u8>>()
            })
            .collect();

        FrameReader::with_capacity_bound(total - config::FRAME_HEADER_BITS)
            .read_from(bands.into_iter().flatten())
    }

    /// Embed one bit into block (`bx`, `by`) in place.
    pub fn embed_bit(&self, image: &mut RgbaImage, bx: usize, by: usize, bit: u8) {
        let grid = Grid::of(image);
        if bx >= grid.blocks_wide || by >= grid.blocks_tall {
            return;
        }
        let band_len = grid.band_len();
        let raw: &mut [u8] = image;
        let band = &mut raw[by * band_len..(by + 1) * band_len];
        self.embed_block(band, &grid, bx, bit, &mut Scratch::new());
    }

    /// Read the bit carried by block (`bx`, `by`).
    pub fn extract_bit(&self, image: &RgbaImage, bx: usize, by: usize) -> Option<u8> {
        let grid = Grid::of(image);
        if bx >= grid.blocks_wide || by >= grid.blocks_tall {
            return None;
        }
        let band_len = grid.band_len();
        let raw: &[u8] = image;
        let band = &raw[by * band_len..(by + 1) * band_len];
        Some(self.extract_block(band, &grid, bx, &mut Scratch::new()))
    }

    /// Model a lossy re-encode: quantize every luma block with the standard
    /// JPEG luminance table (quality 50) and rebuild the pixels.
    pub fn simulate_recompression(&self, image: &RgbaImage) -> RgbaImage {
        let grid = Grid::of(image);
        let mut output = image.clone();
        if grid.total_blocks() == 0 {
            return output;
        }
        let raw: &mut [u8] = &mut output;

        raw.par_chunks_mut(grid.band_len())
            .take(grid.blocks_tall)
            .for_each(|band| {
                let mut scratch = Scratch::new();
                for bx in 0..grid.blocks_wide {
                    load_block(band, &grid, bx, &mut scratch, true);
                    self.tables
                        .forward(&scratch.luma, &mut scratch.coeffs, &mut scratch.pass);
                    for (i, row) in scratch.coeffs.iter_mut().enumerate() {
                        for (j, c) in row.iter_mut().enumerate() {
                            let q = config::JPEG_LUMA_QUANT[i * BLOCK_SIZE + j];
                            *c = (*c / q).round() * q;
                        }
                    }
                    self.tables
                        .inverse(&scratch.coeffs, &mut scratch.luma, &mut scratch.pass);
                    store_block(band, &grid, bx, &scratch);
                }
            });

        output
    }

    fn embed_block(&self, band: &mut [u8], grid: &Grid, bx: usize, bit: u8, scratch: &mut Scratch) {
        load_block(band, grid, bx, scratch, true);
        self.tables
            .forward(&scratch.luma, &mut scratch.coeffs, &mut scratch.pass);
        force_bit(&mut scratch.coeffs, bit, self.threshold);
        self.tables
            .inverse(&scratch.coeffs, &mut scratch.luma, &mut scratch.pass);
        store_block(band, grid, bx, scratch);
    }

    fn extract_block(&self, band: &[u8], grid: &Grid, bx: usize, scratch: &mut Scratch) -> u8 {
        load_block(band, grid, bx, scratch, false);
        let c1 = self.tables.coefficient(&scratch.luma, DCT_C1.0, DCT_C1.1);
        let c2 = self.tables.coefficient(&scratch.luma, DCT_C2.0, DCT_C2.1);
        if c1.abs() > c2.abs() {
            0
        } else {
            1
        }
    }
}

impl Default for DctCodec {
    fn default() -> Self {
        Self::new(&GhostConfig::default())
    }
}

/// Widen the C1/C2 gap for `bit`, touching only the deficient coefficient and
/// keeping its sign.
fn force_bit(coeffs: &mut Block, bit: u8, threshold: f64) {
    let (c1, c2) = (coeffs[DCT_C1.0][DCT_C1.1], coeffs[DCT_C2.0][DCT_C2.1]);

    if bit == 0 {
        if c1.abs() <= c2.abs() + threshold {
            let target = c2.abs() + threshold + 1.0;
            coeffs[DCT_C1.0][DCT_C1.1] = if c1 >= 0.0 { target } else { -target };
        }
    } else if c2.abs() <= c1.abs() + threshold {
        let target = c1.abs() + threshold + 1.0;
        coeffs[DCT_C2.0][DCT_C2.1] = if c2 >= 0.0 { target } else { -target };
    }
}

/// RGB -> YCbCr (JPEG full range) into the scratch blocks.
fn load_block(band: &[u8], grid: &Grid, bx: usize, scratch: &mut Scratch, with_chroma: bool) {
    for y in 0..BLOCK_SIZE {
        for x in 0..BLOCK_SIZE {
            let o = grid.offset(bx, x, y);
            let r = band[o] as f64;
            let g = band[o + 1] as f64;
            let b = band[o + 2] as f64;

            scratch.luma[y][x] = 0.299 * r + 0.587 * g + 0.114 * b;
            if with_chroma {
                scratch.cb[y][x] = 128.0 - 0.168736 * r - 0.331264 * g + 0.5 * b;
                scratch.cr[y][x] = 128.0 + 0.5 * r - 0.418688 * g - 0.081312 * b;
            }
        }
    }
}

/// YCbCr -> RGB with rounding and clamping. Alpha is left alone.
fn store_block(band: &mut [u8], grid: &Grid, bx: usize, scratch: &Scratch) {
    for y in 0..BLOCK_SIZE {
        for x in 0..BLOCK_SIZE {
            let luma = scratch.luma[y][x];
            let cb = scratch.cb[y][x] - 128.0;
            let cr = scratch.cr[y][x] - 128.0;

            let o = grid.offset(bx, x, y);
            band[o] = to_channel(luma + 1.402 * cr);
            band[o + 1] = to_channel(luma - 0.344136 * cb - 0.714136 * cr);
            band[o + 2] = to_channel(luma + 1.772 * cb);
        }
    }
}

fn to_channel(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    /// Mid-range texture that stays clear of clamping after embedding.
    fn textured(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            let base = 96 + ((x * 3 + y * 2) % 48) as u8;
            Rgba([base, base.saturating_add((x % 7) as u8), base - (y % 5) as u8, 255])
        })
    }

    #[test]
    fn test_single_block_bit_survives_recompression() {
        let codec = DctCodec::default();
        for bit in [0u8, 1] {
            let mut image = textured(8, 8);
            codec.embed_bit(&mut image, 0, 0, bit);
            assert_eq!(codec.extract_bit(&image, 0, 0), Some(bit));

            let recompressed = codec.simulate_recompression(&image);
            assert_eq!(codec.extract_bit(&recompressed, 0, 0), Some(bit));
        }
    }

    #[test]
    fn test_force_bit_only_adjusts_deficient_coefficient() {
        let mut coeffs = [[0.0; BLOCK_SIZE]; BLOCK_SIZE];
        coeffs[4][1] = -10.0;
        coeffs[3][2] = 30.0;

        force_bit(&mut coeffs, 0, 25.0);
        assert_eq!(coeffs[4][1], -56.0);
        assert_eq!(coeffs[3][2], 30.0);

        force_bit(&mut coeffs, 0, 25.0);
        assert_eq!(coeffs[4][1], -56.0);

        force_bit(&mut coeffs, 1, 25.0);
        assert_eq!(coeffs[4][1], -56.0);
        assert_eq!(coeffs[3][2], 82.0);
    }

    #[test]
    fn test_roundtrip() {
        let codec = DctCodec::default();
        let image = textured(256, 256);
        let message = r#"{"v":1,"kid":"8f3a"}"#;
        let encoded = codec.encode(&image, message).unwrap();
        assert_eq!(codec.decode(&encoded).as_deref(), Some(message));
    }

    #[test]
    fn test_roundtrip_survives_recompression() {
        let codec = DctCodec::default();
        let image = textured(256, 256);
        let encoded = codec.encode(&image, "meet at 5").unwrap();
        let recompressed = codec.simulate_recompression(&encoded);
        assert_eq!(codec.decode(&recompressed).as_deref(), Some("meet at 5"));
    }

    #[test]
    fn test_capacity_limit() {
        let codec = DctCodec::default();
        // 16x16 blocks = 256 bits, 208 after the header = 26 bytes
        let image = textured(128, 128);
        assert_eq!(DctCodec::capacity(128, 128), 26);
        assert!(codec.encode(&image, &"x".repeat(27)).is_none());
        let fits = "y".repeat(26);
        let encoded = codec.encode(&image, &fits).unwrap();
        assert_eq!(codec.decode(&encoded), Some(fits));
    }

    #[test]
    fn test_partial_blocks_and_alpha_untouched() {
        let codec = DctCodec::default();
        let mut image = textured(100, 61);
        for (x, _, p) in image.enumerate_pixels_mut() {
            p.0[3] = (x * 2) as u8;
        }
        let encoded = codec.encode(&image, "edge").unwrap();

        for (x, y, p) in encoded.enumerate_pixels() {
            let before = image.get_pixel(x, y);
            assert_eq!(p.0[3], before.0[3]);
            if x >= 96 || y >= 56 {
                assert_eq!(p, before);
            }
        }
        assert_eq!(codec.decode(&encoded).as_deref(), Some("edge"));
    }

    #[test]
    fn test_blocks_past_payload_untouched() {
        let codec = DctCodec::default();
        let image = textured(128, 128);
        let encoded = codec.encode(&image, "a").unwrap();
        // 56 bits -> blocks 0..56 (rows 0..3 of 16 blocks, partially row 3)
        for (x, y, p) in encoded.enumerate_pixels() {
            let block = (y as usize / 8) * 16 + x as usize / 8;
            if block >= frame::framed_bit_len(1) {
                assert_eq!(p, image.get_pixel(x, y));
            }
        }
    }

    #[test]
    fn test_plain_and_tiny_images() {
        let codec = DctCodec::default();
        let gray = RgbaImage::from_pixel(128, 128, Rgba([128, 128, 128, 255]));
        assert_eq!(codec.decode(&gray), None);
        assert_eq!(codec.decode(&textured(7, 7)), None);
        assert!(codec.encode(&textured(7, 7), "").is_none());
        assert_eq!(codec.extract_bit(&textured(7, 7), 0, 0), None);
    }

    #[test]
    fn test_implausible_length_rejected() {
        let codec = DctCodec::default();
        // Hand-craft a header declaring more payload than the image can hold.
        let mut image = textured(64, 64); // 64 blocks, 16 after the header
        let mut header = Vec::new();
        frame::push_bits(&mut header, b"GW");
        frame::push_bits(&mut header, &3u32.to_be_bytes());
        for (i, &bit) in header.iter().enumerate() {
            codec.embed_bit(&mut image, i % 8, i / 8, bit);
        }
        assert_eq!(codec.decode(&image), None);
    }
}
