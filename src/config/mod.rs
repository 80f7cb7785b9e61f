// Symmetric key and AEAD parameters (AES-256-GCM)
pub const KEY_SIZE: usize = 32;
pub const IV_SIZE: usize = 12;
pub const AUTH_TAG_SIZE: usize = 16;

// Channel fingerprint: first 2 bytes of SHA-256(channel name), hex-encoded
pub const FINGERPRINT_BYTES: usize = 2;
pub const FINGERPRINT_LEN: usize = FINGERPRINT_BYTES * 2;

// Password wrapping (PBKDF2-HMAC-SHA256)
pub const PBKDF2_ITERATIONS: u32 = 10_000;
pub const SALT_SIZE: usize = 16;

// Packet
pub const PACKET_VERSION: u32 = 1;

// Bitmap frame header: "GW" + u32 big-endian payload length
pub const FRAME_SIGNATURE: [u8; 2] = *b"GW";
pub const FRAME_LENGTH_SIZE: usize = 4;
pub const FRAME_HEADER_SIZE: usize = FRAME_SIGNATURE.len() + FRAME_LENGTH_SIZE;
pub const FRAME_HEADER_BITS: usize = FRAME_HEADER_SIZE * 8;

// Invisible-text alphabet
pub const ZW_ZERO: char = '\u{200B}'; // zero-width space
pub const ZW_ONE: char = '\u{200C}'; // zero-width non-joiner
pub const ZW_DELIMITER: char = '\u{200D}'; // zero-width joiner

pub const DEFAULT_CHAFF_INTENSITY: usize = 2;

// LSB: one bit in each of R, G, B
pub const LSB_BITS_PER_PIXEL: usize = 3;

// DCT parameters
pub const BLOCK_SIZE: usize = 8;
pub const DEFAULT_DCT_THRESHOLD: f64 = 25.0;

/// Mid-frequency coefficient pair compared by the block embedding rule, as (row, col).
pub const DCT_C1: (usize, usize) = (4, 1);
pub const DCT_C2: (usize, usize) = (3, 2);

/// Standard JPEG luminance quantization table (quality 50), row-major.
pub const JPEG_LUMA_QUANT: [f64; 64] = [
    16.0, 11.0, 10.0, 16.0, 24.0, 40.0, 51.0, 61.0, //
    12.0, 12.0, 14.0, 19.0, 26.0, 58.0, 60.0, 55.0, //
    14.0, 13.0, 16.0, 24.0, 40.0, 57.0, 69.0, 56.0, //
    14.0, 17.0, 22.0, 29.0, 51.0, 87.0, 80.0, 62.0, //
    18.0, 22.0, 37.0, 56.0, 68.0, 109.0, 103.0, 77.0, //
    24.0, 35.0, 55.0, 64.0, 81.0, 104.0, 113.0, 92.0, //
    49.0, 64.0, 78.0, 87.0, 103.0, 121.0, 120.0, 101.0, //
    72.0, 92.0, 95.0, 98.0, 112.0, 100.0, 103.0, 99.0,
];

// GIF application extension
pub const GIF_EXTENSION_INTRODUCER: u8 = 0x21;
pub const GIF_APPLICATION_LABEL: u8 = 0xFF;
pub const GIF_IMAGE_SEPARATOR: u8 = 0x2C;
pub const GIF_TRAILER: u8 = 0x3B;
pub const GIF_APP_BLOCK_SIZE: u8 = 0x0B;
pub const GIF_APP_ID: [u8; 8] = *b"GHOSTWSP";
pub const GIF_AUTH_CODE: [u8; 3] = *b"1.0";
pub const GIF_MAX_SUB_BLOCK: usize = 255;

/// Compute the number of full 8x8 blocks in an image.
pub fn blocks_per_image(width: u32, height: u32) -> usize {
    (width as usize / BLOCK_SIZE) * (height as usize / BLOCK_SIZE)
}

/// Runtime configuration for sealing and revealing.
#[derive(Debug, Clone)]
pub struct GhostConfig {
    /// Robustness margin `P` between the two DCT coefficients.
    pub dct_threshold: f64,
    /// Sprinkle decoy zero-width noise over text covers before injecting.
    pub chaff: bool,
    /// Maximum decoy characters inserted after one visible character.
    pub chaff_intensity: usize,
}

impl Default for GhostConfig {
    fn default() -> Self {
        Self {
            dct_threshold: DEFAULT_DCT_THRESHOLD,
            chaff: false,
            chaff_intensity: DEFAULT_CHAFF_INTENSITY,
        }
    }
}
