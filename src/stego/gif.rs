//! GIF application-extension codec.
//!
//! The payload rides in an application extension block (`21 FF 0B`,
//! `GHOSTWSP`, `1.0`, data sub-blocks, `00`) inserted right after the logical
//! screen descriptor and global color table. Frame and pixel data are copied
//! through untouched, so animations play back bit for bit.

use thiserror::Error;

use crate::config;

const HEADER_LEN: usize = 6;
const SCREEN_DESCRIPTOR_LEN: usize = 7;
const IMAGE_DESCRIPTOR_LEN: usize = 10;
const COLOR_TABLE_FLAG: u8 = 0x80;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum GifError {
    #[error("not a GIF file")]
    NotAGif,
    #[error("corrupt GIF: {0}")]
    CorruptGif(&'static str),
}

pub fn is_gif(bytes: &[u8]) -> bool {
    bytes.len() >= HEADER_LEN && (&bytes[..HEADER_LEN] == b"GIF87a" || &bytes[..HEADER_LEN] == b"GIF89a")
}

/// Size in bytes of a color table announced by `packed`, or 0 if absent.
fn color_table_len(packed: u8) -> usize {
    if packed & COLOR_TABLE_FLAG == 0 {
        0
    } else {
        3 * (1usize << ((packed & 0x07) + 1))
    }
}

/// Offset of the first block after header, screen descriptor and global color table.
fn block_stream_start(bytes: &[u8]) -> Result<usize, GifError> {
    if !is_gif(bytes) {
        return Err(GifError::NotAGif);
    }
    let lsd_end = HEADER_LEN + SCREEN_DESCRIPTOR_LEN;
    if bytes.len() < lsd_end {
        return Err(GifError::CorruptGif("truncated logical screen descriptor"));
    }
    let packed = bytes[HEADER_LEN + 4];
    let start = lsd_end + color_table_len(packed);
    if bytes.len() < start {
        return Err(GifError::CorruptGif("truncated global color table"));
    }
    Ok(start)
}

/// Insert `message` as a new application extension block.
pub fn embed(bytes: &[u8], message: &str) -> Result<Vec<u8>, GifError> {
    embed_bytes(bytes, message.as_bytes())
}

pub fn embed_bytes(bytes: &[u8], payload: &[u8]) -> Result<Vec<u8>, GifError> {
    let insert_at = block_stream_start(bytes)?;
    let block = application_extension(payload);

    let mut output = Vec::with_capacity(bytes.len() + block.len());
    output.extend_from_slice(&bytes[..insert_at]);
    output.extend_from_slice(&block);
    output.extend_from_slice(&bytes[insert_at..]);
    Ok(output)
}

fn application_extension(payload: &[u8]) -> Vec<u8> {
    let sub_blocks = payload.len().div_ceil(config::GIF_MAX_SUB_BLOCK);
    let mut block = Vec::with_capacity(14 + payload.len() + sub_blocks + 1);

    block.push(config::GIF_EXTENSION_INTRODUCER);
    block.push(config::GIF_APPLICATION_LABEL);
    block.push(config::GIF_APP_BLOCK_SIZE);
    block.extend_from_slice(&config::GIF_APP_ID);
    block.extend_from_slice(&config::GIF_AUTH_CODE);

    for chunk in payload.chunks(config::GIF_MAX_SUB_BLOCK) {
        block.push(chunk.len() as u8);
        block.extend_from_slice(chunk);
    }
    block.push(0x00);
    block
}

/// Skip a chain of length-prefixed sub-blocks starting at `pos`, returning
/// the offset just past the terminator (or the end of input).
fn skip_sub_blocks(bytes: &[u8], mut pos: usize) -> usize {
    while let Some(&size) = bytes.get(pos) {
        pos += 1;
        if size == 0 {
            break;
        }
        pos += size as usize;
    }
    pos
}

fn is_our_extension(bytes: &[u8], pos: usize) -> bool {
    let id_start = pos + 3;
    let auth_start = id_start + config::GIF_APP_ID.len();
    let end = auth_start + config::GIF_AUTH_CODE.len();
    bytes.len() >= end
        && bytes[pos + 2] == config::GIF_APP_BLOCK_SIZE
        && bytes[id_start..auth_start] == config::GIF_APP_ID
        && bytes[auth_start..end] == config::GIF_AUTH_CODE
}

fn read_sub_blocks(bytes: &[u8], mut pos: usize) -> Vec<u8> {
    let mut data = Vec::new();
    while let Some(&size) = bytes.get(pos) {
        pos += 1;
        if size == 0 {
            break;
        }
        let end = pos + size as usize;
        if end > bytes.len() {
            break;
        }
        data.extend_from_slice(&bytes[pos..end]);
        pos = end;
    }
    data
}

/// Find and return the payload of our application extension, if any.
pub fn extract(bytes: &[u8]) -> Option<String> {
    extract_bytes(bytes).and_then(|data| String::from_utf8(data).ok())
}

pub fn extract_bytes(bytes: &[u8]) -> Option<Vec<u8>> {
    let mut pos = block_stream_start(bytes).ok()?;

    while let Some(&introducer) = bytes.get(pos) {
        match introducer {
            config::GIF_TRAILER => break,
            config::GIF_EXTENSION_INTRODUCER => {
                let label = *bytes.get(pos + 1)?;
                if label == config::GIF_APPLICATION_LABEL && is_our_extension(bytes, pos) {
                    let data_start = pos + 3 + config::GIF_APP_BLOCK_SIZE as usize;
                    return Some(read_sub_blocks(bytes, data_start));
                }
                pos = skip_sub_blocks(bytes, pos + 2);
            }
            config::GIF_IMAGE_SEPARATOR => {
                let packed = *bytes.get(pos + IMAGE_DESCRIPTOR_LEN - 1)?;
                pos += IMAGE_DESCRIPTOR_LEN + color_table_len(packed);
                // LZW minimum code size, then the image data sub-blocks.
                pos = skip_sub_blocks(bytes, pos + 1);
            }
            // Out of sync; step forward and hope to land on a block boundary.
            _ => pos += 1,
        }
    }
    None
}
