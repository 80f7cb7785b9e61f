use image::RgbaImage;
use log::{debug, info};

use crate::config::GhostConfig;
use crate::crypto;
use crate::packet::GhostPacket;
use crate::stego::dct::DctCodec;
use crate::stego::{gif, lsb, text};

use super::keyring::ChannelKey;
use super::{Carrier, SealError};

/// Encrypt `plaintext` under `channel`'s key and hide the packet in `carrier`.
///
/// Returns `Ok(None)` when the carrier is too small for the packet.
pub fn seal(
    plaintext: &str,
    channel: &ChannelKey,
    carrier: Carrier,
    cfg: &GhostConfig,
) -> Result<Option<Carrier>, SealError> {
    let payload = crypto::encrypt(plaintext, &channel.key)?;
    let packet = GhostPacket::seal(&channel.fingerprint(), &payload).to_bytes();
    debug!(
        "packet for {} carrier: {} bytes",
        carrier.kind(),
        packet.len()
    );

    let sealed = match carrier {
        Carrier::Text(cover) => Some(Carrier::Text(seal_text(&cover, &packet, channel, cfg))),
        Carrier::Bitmap(image) => lsb::encode_bytes(&image, &packet).map(Carrier::Bitmap),
        Carrier::RobustBitmap(image) => seal_robust(&image, &packet, cfg).map(Carrier::RobustBitmap),
        Carrier::Gif(bytes) => Some(Carrier::Gif(gif::embed_bytes(&bytes, &packet)?)),
    };

    match &sealed {
        Some(c) => info!("sealed {} byte packet into {} carrier", packet.len(), c.kind()),
        None => info!("{} byte packet does not fit the carrier", packet.len()),
    }
    Ok(sealed)
}

fn seal_text(cover: &str, packet: &[u8], channel: &ChannelKey, cfg: &GhostConfig) -> String {
    let cover = match (&channel.cover_message, cover.is_empty()) {
        (Some(default_cover), true) => default_cover.as_str(),
        _ => cover,
    };
    let cover = if cfg.chaff {
        text::chaff(cover, cfg.chaff_intensity)
    } else {
        cover.to_string()
    };
    text::inject(&cover, &text::encode(packet))
}

fn seal_robust(image: &RgbaImage, packet: &[u8], cfg: &GhostConfig) -> Option<RgbaImage> {
    let codec = DctCodec::new(cfg);
    let (width, height) = image.dimensions();
    debug!(
        "robust capacity {} bytes for {}x{}",
        DctCodec::capacity(width, height),
        width,
        height
    );
    codec.encode_bytes(image, packet)
}
