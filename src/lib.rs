pub mod config;
pub mod crypto;
mod integrity;
pub mod packet;
pub mod pipeline;
pub mod stego;

pub use config::GhostConfig;
pub use packet::GhostPacket;
pub use pipeline::backup::{export_keyring, import_keyring, BackupError};
pub use pipeline::keyring::{ChannelKey, KeyStore, Keyring};
pub use pipeline::reveal::{reveal, try_reveal};
pub use pipeline::seal::seal;
pub use pipeline::{Carrier, RevealError, Revealed, SealError};
pub use stego::dct::DctCodec;
