use std::borrow::Cow;

use crate::commands::ReturnCommand;
use crate::error::ProtocolError;

/// Wire protocol magic bytes: "GW"
pub const MAGIC: [u8; 2] = [0x47, 0x57];

/// Maximum frame payload size: 64 MB
pub const MAX_FRAME_SIZE: u32 = 64 * 1024 * 1024;

/// Frame header size in bytes: magic(2) + flags(1) + stream_id(4) + length(4) = 11
pub const HEADER_SIZE: usize = 11;

/// Payloads smaller than this are sent uncompressed unless the caller overrides it.
pub const DEFAULT_COMPRESSION_THRESHOLD: usize = 512;

bitflags::bitflags! {
    /// Frame flags byte.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FrameFlags: u8 {
        const COMPRESSED = 0b0000_0001;
        const RESPONSE   = 0b0000_0100;
        const ERROR      = 0b0000_1000;
    }
}

/// Encode a return command into a frame (header + payload), LZ4-compressing
/// payloads longer than `compression_threshold` when that makes them smaller.
pub fn encode_return_command(
    cmd: &ReturnCommand,
    stream_id: u32,
    compression_threshold: usize,
) -> Result<Vec<u8>, WireError> {
    let payload = rkyv::to_bytes::<rkyv::rancor::Error>(cmd)
        .map_err(|e| WireError::Serialization(e.to_string()))?;

    let (final_payload, compression_flag) = if payload.len() > compression_threshold {
        let compressed = lz4_flex::compress_prepend_size(&payload);
        if compressed.len() < payload.len() {
            (Cow::Owned(compressed), FrameFlags::COMPRESSED)
        } else {
            (Cow::Borrowed(payload.as_slice()), FrameFlags::empty())
        }
    } else {
        (Cow::Borrowed(payload.as_slice()), FrameFlags::empty())
    };

    let kind_flag = match cmd {
        ReturnCommand::DeviceUncapturedErrorCallback { .. }
        | ReturnCommand::DeviceLostCallback { .. } => FrameFlags::ERROR,
        _ => FrameFlags::RESPONSE,
    };

    let payload_len = u32::try_from(final_payload.len()).unwrap_or(u32::MAX);
    if payload_len > MAX_FRAME_SIZE {
        return Err(WireError::FrameTooLarge(payload_len));
    }

    let flags = compression_flag | kind_flag;
    let mut frame = Vec::with_capacity(HEADER_SIZE + final_payload.len());
    frame.extend_from_slice(&MAGIC);
    frame.push(flags.bits());
    frame.extend_from_slice(&stream_id.to_le_bytes());
    frame.extend_from_slice(&payload_len.to_le_bytes());
    frame.extend_from_slice(&final_payload);

    Ok(frame)
}

/// Decode a frame header. Returns (flags, stream_id, payload_length).
pub fn decode_header(header: &[u8; HEADER_SIZE]) -> Result<(FrameFlags, u32, u32), WireError> {
    if header[0] != MAGIC[0] || header[1] != MAGIC[1] {
        return Err(WireError::InvalidMagic);
    }

    let flags = FrameFlags::from_bits_truncate(header[2]);
    let stream_id = u32::from_le_bytes([header[3], header[4], header[5], header[6]]);
    let length = u32::from_le_bytes([header[7], header[8], header[9], header[10]]);

    if length > MAX_FRAME_SIZE {
        return Err(WireError::FrameTooLarge(length));
    }

    Ok((flags, stream_id, length))
}

/// Decode a return command from payload bytes, decompressing if the COMPRESSED flag is set.
pub fn decode_return_command(payload: &[u8], flags: FrameFlags) -> Result<ReturnCommand, WireError> {
    let data: Cow<'_, [u8]> = if flags.contains(FrameFlags::COMPRESSED) {
        Cow::Owned(
            lz4_flex::decompress_size_prepended(payload)
                .map_err(|e| WireError::DecompressionError(e.to_string()))?,
        )
    } else {
        Cow::Borrowed(payload)
    };

    // rkyv validates alignment of the archived root
    let mut aligned = rkyv::util::AlignedVec::<16>::with_capacity(data.len());
    aligned.extend_from_slice(&data);
    rkyv::from_bytes::<ReturnCommand, rkyv::rancor::Error>(&aligned)
        .map_err(|e| WireError::Serialization(e.to_string()))
}

/// Decode every frame in a captured outgoing stream, in order.
pub fn decode_stream(mut bytes: &[u8]) -> Result<Vec<ReturnCommand>, ProtocolError> {
    let mut commands = Vec::new();
    while !bytes.is_empty() {
        let header: &[u8; HEADER_SIZE] = bytes
            .get(..HEADER_SIZE)
            .and_then(|h| h.try_into().ok())
            .ok_or(ProtocolError::Truncated {
                needed: HEADER_SIZE,
                available: bytes.len(),
            })?;
        let (flags, _stream_id, length) = decode_header(header)?;
        let end = HEADER_SIZE + length as usize;
        let payload = bytes.get(HEADER_SIZE..end).ok_or(ProtocolError::Truncated {
            needed: end,
            available: bytes.len(),
        })?;
        commands.push(decode_return_command(payload, flags)?);
        bytes = &bytes[end..];
    }
    Ok(commands)
}

#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("invalid magic bytes")]
    InvalidMagic,
    #[error("frame too large: {0} bytes")]
    FrameTooLarge(u32),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("decompression error: {0}")]
    DecompressionError(String),
}
