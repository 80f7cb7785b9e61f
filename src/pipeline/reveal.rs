use image::RgbaImage;
use log::debug;

use crate::crypto;
use crate::packet::GhostPacket;
use crate::stego::dct::DctCodec;
use crate::stego::{gif, lsb, text};

use super::keyring::KeyStore;
use super::{Carrier, RevealError, Revealed};

/// Pull packet bytes out of a carrier, or `None` if it holds nothing.
fn extract_packet(carrier: &Carrier) -> Result<Option<Vec<u8>>, RevealError> {
    let bytes = match carrier {
        Carrier::Text(message) => {
            if !text::contains_payload(message) {
                return Ok(None);
            }
            match text::extract(message) {
                Some(encoded) => Some(text::decode(&encoded)?),
                None => None,
            }
        }
        Carrier::Bitmap(image) | Carrier::RobustBitmap(image) => scan_bitmap(image),
        Carrier::Gif(bytes) => gif::extract_bytes(bytes),
    };
    Ok(bytes)
}

/// LSB first, then the DCT layout.
fn scan_bitmap(image: &RgbaImage) -> Option<Vec<u8>> {
    lsb::decode_bytes(image).or_else(|| DctCodec::default().decode_bytes(image))
}

/// Recover a hidden message, telling apart "nothing here" (`Ok(None)`) from
/// a payload that was found but could not be opened.
///
/// A packet whose fingerprint `store` does not know is `Ok(None)`.
pub fn try_reveal<S: KeyStore + ?Sized>(
    carrier: &Carrier,
    store: &S,
) -> Result<Option<Revealed>, RevealError> {
    let Some(bytes) = extract_packet(carrier)? else {
        return Ok(None);
    };

    let packet = GhostPacket::from_bytes(&bytes)?;
    let Some(channel) = store.key_for(&packet.key_fingerprint) else {
        return Ok(None);
    };

    let iv = packet.iv_bytes()?;
    let ciphertext = packet.ciphertext_bytes()?;
    let plaintext = crypto::decrypt(&ciphertext, &channel.key, &iv)?;

    Ok(Some(Revealed {
        channel_name: channel.channel_name.clone(),
        plaintext,
    }))
}

/// Like [`try_reveal`], but every failure reads as "nothing here".
///
/// Every `None` outcome logs the same single line, whatever the cause.
pub fn reveal<S: KeyStore + ?Sized>(carrier: &Carrier, store: &S) -> Option<Revealed> {
    let revealed = try_reveal(carrier, store).ok().flatten();
    if revealed.is_none() {
        debug!("{} carrier: nothing revealed", carrier.kind());
    }
    revealed
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::sync::Once;

    use log::{Log, Metadata, Record};

    use super::*;
    use crate::config::GhostConfig;
    use crate::pipeline::keyring::{ChannelKey, Keyring};
    use crate::pipeline::seal::seal;

    thread_local! {
        static LINES: Cell<usize> = const { Cell::new(0) };
    }

    /// Counts records emitted on the current thread.
    struct LineCounter;

    impl Log for LineCounter {
        fn enabled(&self, _: &Metadata) -> bool {
            true
        }

        fn log(&self, _: &Record) {
            LINES.with(|n| n.set(n.get() + 1));
        }

        fn flush(&self) {}
    }

    static COUNTER: LineCounter = LineCounter;
    static INSTALL: Once = Once::new();

    fn lines_logged_by(f: impl FnOnce()) -> usize {
        INSTALL.call_once(|| {
            let _ = log::set_logger(&COUNTER);
            log::set_max_level(log::LevelFilter::Trace);
        });
        LINES.with(|n| n.set(0));
        f();
        LINES.with(|n| n.get())
    }

    #[test]
    fn test_failures_log_identically() {
        let channel = ChannelKey::new("family", crate::crypto::generate_key());
        let sealed = seal("meet at 5", &channel, Carrier::Text("Noted 👍".into()), &GhostConfig::default())
            .unwrap()
            .unwrap();

        let mut impostor = Keyring::new();
        impostor.insert(ChannelKey::new("family", crate::crypto::generate_key()));

        let plain = lines_logged_by(|| {
            assert!(reveal(&Carrier::Text("just words".into()), &impostor).is_none());
        });
        let unknown = lines_logged_by(|| {
            assert!(reveal(&sealed, &Keyring::new()).is_none());
        });
        let wrong_key = lines_logged_by(|| {
            assert!(reveal(&sealed, &impostor).is_none());
        });

        assert_eq!(plain, 1);
        assert_eq!(plain, unknown);
        assert_eq!(unknown, wrong_key);
    }
}
