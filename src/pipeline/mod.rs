pub mod backup;
pub mod keyring;
pub mod reveal;
pub mod seal;

use image::RgbaImage;
use thiserror::Error;

use crate::crypto::CryptoError;
use crate::packet::PacketError;
use crate::stego::gif::GifError;
use crate::stego::text::TextCodecError;

/// Something that can hide a packet, tagged by how it is embedded.
#[derive(Debug, Clone, PartialEq)]
pub enum Carrier {
    /// Visible cover text; the packet rides as zero-width characters.
    Text(String),
    /// Lossless bitmap; LSB embedding.
    Bitmap(RgbaImage),
    /// Bitmap that may be recompressed on the way; DCT embedding.
    RobustBitmap(RgbaImage),
    /// Raw GIF file bytes; application extension block.
    Gif(Vec<u8>),
}

impl Carrier {
    pub fn kind(&self) -> &'static str {
        match self {
            Carrier::Text(_) => "text",
            Carrier::Bitmap(_) => "bitmap",
            Carrier::RobustBitmap(_) => "robust bitmap",
            Carrier::Gif(_) => "gif",
        }
    }
}

/// A message recovered from a carrier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revealed {
    pub channel_name: String,
    pub plaintext: String,
}

#[derive(Error, Debug)]
pub enum SealError {
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Gif(#[from] GifError),
}

#[derive(Error, Debug)]
pub enum RevealError {
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Packet(#[from] PacketError),
    #[error(transparent)]
    TextCodec(#[from] TextCodecError),
}
