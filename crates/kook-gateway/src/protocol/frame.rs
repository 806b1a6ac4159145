//! WebSocket frame handling
//!
//! Turns transport frames into signal text, inflating compressed frames.

use crate::error::ProtocolDecodeError;
use flate2::read::ZlibDecoder;
use std::io::Read;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

/// Extract signal text from a frame
///
/// Returns `Ok(None)` for control frames. Binary frames are inflated when
/// `compressed` is set and read as UTF-8 otherwise.
pub fn frame_text(message: Message, compressed: bool) -> Result<Option<String>, ProtocolDecodeError> {
    match message {
        Message::Text(text) => Ok(Some(text)),
        Message::Binary(bytes) if compressed => inflate(&bytes).map(Some),
        Message::Binary(bytes) => Ok(Some(String::from_utf8(bytes)?)),
        Message::Ping(_) | Message::Pong(_) | Message::Close(_) | Message::Frame(_) => Ok(None),
    }
}

/// Inflate a zlib stream into UTF-8 text
pub fn inflate(bytes: &[u8]) -> Result<String, ProtocolDecodeError> {
    let mut decoder = ZlibDecoder::new(bytes);
    let mut inflated = Vec::new();
    decoder
        .read_to_end(&mut inflated)
        .map_err(ProtocolDecodeError::Decompress)?;
    Ok(String::from_utf8(inflated)?)
}

/// Human readable close reason
#[must_use]
pub fn describe_close(frame: Option<&CloseFrame<'_>>) -> String {
    match frame {
        Some(frame) if frame.reason.is_empty() => format!("close code {}", u16::from(frame.code)),
        Some(frame) => format!("close code {}: {}", u16::from(frame.code), frame.reason),
        None => "closed without close frame".to_string(),
    }
}
