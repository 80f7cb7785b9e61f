use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use image::RgbaImage;
use log::info;

use ghostwhisper::config::{DEFAULT_CHAFF_INTENSITY, DEFAULT_DCT_THRESHOLD};
use ghostwhisper::crypto;
use ghostwhisper::stego::{lsb, text};
use ghostwhisper::{
    export_keyring, import_keyring, reveal, seal, Carrier, ChannelKey, DctCodec, GhostConfig, Keyring,
};

/// ghostwhisper: hide encrypted messages in text, images and GIFs.
#[derive(Parser)]
#[command(name = "ghostwhisper", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ChannelArgs {
    /// Channel name (its fingerprint selects the key on reveal)
    #[arg(short, long)]
    channel: String,

    /// Channel key, base64url
    #[arg(short, long)]
    key: String,
}

impl ChannelArgs {
    fn channel_key(&self) -> Result<ChannelKey> {
        let key = crypto::key_from_base64(&self.key).context("invalid channel key")?;
        Ok(ChannelKey::new(&self.channel, key))
    }

    fn keyring(&self) -> Result<Keyring> {
        let mut keyring = Keyring::new();
        keyring.insert(self.channel_key()?);
        Ok(keyring)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new channel key
    Keygen {
        /// Channel name
        #[arg(short, long)]
        channel: String,
    },

    /// Print the fingerprint of a channel name
    Fingerprint {
        channel: String,
    },

    /// Hide a message in invisible characters after a cover text
    HideText {
        #[command(flatten)]
        channel: ChannelArgs,

        /// Secret message
        #[arg(short, long)]
        message: String,

        /// Visible cover text
        #[arg(long, default_value = "")]
        cover: String,

        /// Sprinkle decoy invisible characters over the cover
        #[arg(long)]
        chaff: bool,

        /// Maximum decoys after one visible character (default: 2)
        #[arg(long, default_value_t = DEFAULT_CHAFF_INTENSITY)]
        chaff_intensity: usize,
    },

    /// Reveal a message hidden in text (reads stdin if no file is given)
    RevealText {
        #[command(flatten)]
        channel: ChannelArgs,

        /// File holding the text
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Count visible and invisible characters in a text
    InspectText {
        /// File holding the text
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Hide a message in a PNG image
    HideImage {
        #[command(flatten)]
        channel: ChannelArgs,

        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        /// Secret message
        #[arg(short, long)]
        message: String,

        /// Use DCT embedding that survives recompression
        #[arg(long)]
        robust: bool,

        /// DCT robustness margin (default: 25.0)
        #[arg(long, default_value_t = DEFAULT_DCT_THRESHOLD)]
        threshold: f64,

        /// Check the message survives a simulated JPEG re-encode
        #[arg(long, requires = "robust")]
        verify: bool,
    },

    /// Reveal a message hidden in an image
    RevealImage {
        #[command(flatten)]
        channel: ChannelArgs,

        #[arg(short, long)]
        input: PathBuf,
    },

    /// Hide a message in a GIF without touching its frames
    HideGif {
        #[command(flatten)]
        channel: ChannelArgs,

        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        /// Secret message
        #[arg(short, long)]
        message: String,
    },

    /// Reveal a message hidden in a GIF
    RevealGif {
        #[command(flatten)]
        channel: ChannelArgs,

        #[arg(short, long)]
        input: PathBuf,
    },

    /// Write a password-protected backup of channel keys
    Backup {
        /// `channel=key` pair, repeatable
        #[arg(short, long = "entry", required = true)]
        entries: Vec<String>,

        #[arg(short, long)]
        password: String,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print the channel keys stored in a backup
    Restore {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        password: String,
    },
}

fn load_image(path: &Path) -> Result<RgbaImage> {
    let image = image::open(path).with_context(|| format!("failed to open image {}", path.display()))?;
    Ok(image.to_rgba8())
}

fn read_text(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) => fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            // Drop the newline a shell pipe adds.
            Ok(buf.trim_end_matches(['\n', '\r']).to_string())
        }
    }
}

fn print_revealed(carrier: &Carrier, keyring: &Keyring) -> Result<()> {
    match reveal(carrier, keyring) {
        Some(revealed) => {
            println!("{}", revealed.plaintext);
            Ok(())
        }
        None => bail!("no message for this channel"),
    }
}

fn parse_entry(entry: &str) -> Result<ChannelKey> {
    let (channel, key) = entry
        .rsplit_once('=')
        .with_context(|| format!("expected `channel=key`, got `{entry}`"))?;
    let key = crypto::key_from_base64(key).with_context(|| format!("invalid key for channel `{channel}`"))?;
    Ok(ChannelKey::new(channel, key))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Keygen { channel } => {
            let key = crypto::generate_key();
            println!("channel:     {channel}");
            println!("fingerprint: {}", crypto::derive_fingerprint(&channel));
            println!("key:         {}", crypto::key_to_base64(&key));
        }

        Commands::Fingerprint { channel } => {
            println!("{}", crypto::derive_fingerprint(&channel));
        }

        Commands::HideText {
            channel,
            message,
            cover,
            chaff,
            chaff_intensity,
        } => {
            let cfg = GhostConfig {
                chaff,
                chaff_intensity,
                ..Default::default()
            };
            let sealed = seal(&message, &channel.channel_key()?, Carrier::Text(cover), &cfg)?;
            match sealed {
                Some(Carrier::Text(sealed)) => println!("{sealed}"),
                _ => bail!("text carrier rejected the message"),
            }
        }

        Commands::RevealText { channel, input } => {
            let content = read_text(input.as_deref())?;
            print_revealed(&Carrier::Text(content), &channel.keyring()?)?;
        }

        Commands::InspectText { input } => {
            let stats = text::stats(&read_text(input.as_deref())?);
            println!("total characters:     {}", stats.total_length);
            println!("visible characters:   {}", stats.visible_chars);
            println!("invisible characters: {}", stats.invisible_chars);
            println!("estimated bytes:      {}", stats.estimated_bytes);
            println!("byte-aligned payload: {}", stats.has_valid_payload);
        }

        Commands::HideImage {
            channel,
            input,
            output,
            message,
            robust,
            threshold,
            verify,
        } => {
            let cfg = GhostConfig {
                dct_threshold: threshold,
                ..Default::default()
            };
            let image = load_image(&input)?;
            let (width, height) = image.dimensions();
            let capacity = if robust {
                DctCodec::capacity(width, height)
            } else {
                lsb::capacity(width, height)
            };
            info!("{}x{} image holds {} payload bytes", width, height, capacity);

            let carrier = if robust {
                Carrier::RobustBitmap(image)
            } else {
                Carrier::Bitmap(image)
            };
            let sealed = match seal(&message, &channel.channel_key()?, carrier, &cfg)? {
                Some(Carrier::Bitmap(image)) | Some(Carrier::RobustBitmap(image)) => image,
                _ => bail!("message does not fit in a {width}x{height} image ({capacity} bytes available)"),
            };

            if verify {
                let recompressed = DctCodec::new(&cfg).simulate_recompression(&sealed);
                if reveal(&Carrier::RobustBitmap(recompressed), &channel.keyring()?).is_none() {
                    bail!("message did not survive simulated recompression; try a larger --threshold");
                }
                info!("message survives simulated recompression");
            }

            sealed
                .save(&output)
                .with_context(|| format!("failed to write {}", output.display()))?;
            info!("wrote {}", output.display());
        }

        Commands::RevealImage { channel, input } => {
            let image = load_image(&input)?;
            print_revealed(&Carrier::Bitmap(image), &channel.keyring()?)?;
        }

        Commands::HideGif {
            channel,
            input,
            output,
            message,
        } => {
            let bytes = fs::read(&input).with_context(|| format!("failed to read {}", input.display()))?;
            let sealed = match seal(&message, &channel.channel_key()?, Carrier::Gif(bytes), &GhostConfig::default())? {
                Some(Carrier::Gif(bytes)) => bytes,
                _ => bail!("GIF carrier rejected the message"),
            };
            fs::write(&output, sealed).with_context(|| format!("failed to write {}", output.display()))?;
            info!("wrote {}", output.display());
        }

        Commands::RevealGif { channel, input } => {
            let bytes = fs::read(&input).with_context(|| format!("failed to read {}", input.display()))?;
            print_revealed(&Carrier::Gif(bytes), &channel.keyring()?)?;
        }

        Commands::Backup {
            entries,
            password,
            output,
        } => {
            let mut keyring = Keyring::new();
            for entry in &entries {
                keyring.insert(parse_entry(entry)?);
            }
            let blob = export_keyring(&keyring, &password)?;
            fs::write(&output, blob).with_context(|| format!("failed to write {}", output.display()))?;
            info!("backed up {} channels to {}", keyring.len(), output.display());
        }

        Commands::Restore { input, password } => {
            let blob = fs::read_to_string(&input).with_context(|| format!("failed to read {}", input.display()))?;
            let keyring = import_keyring(blob.trim(), &password)?;
            for channel in keyring.channels() {
                println!(
                    "{}\t{}\t{}",
                    channel.fingerprint(),
                    channel.channel_name,
                    crypto::key_to_base64(&channel.key)
                );
            }
        }
    }

    Ok(())
}
