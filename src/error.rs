//! Error types for the AV1 OBU parser.

use thiserror::Error;

/// Errors produced while parsing an AV1 bitstream or IVF container.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParserError {
    #[error("read past end of buffer at bit offset {offset} (needed {needed} more bits)")]
    BufferExhausted { offset: u64, needed: u32 },

    #[error("OBU header forbidden bit set")]
    Forbidden,

    #[error("invalid LEB128 encoding at byte offset {offset}: {reason}")]
    InvalidLeb128 { offset: u64, reason: &'static str },

    #[error("bitstream conformance violation: {0}")]
    BitstreamError(String),

    #[error("non-standard trailing bits padding in {obu_type} OBU")]
    BadTrailingBits { obu_type: &'static str },

    #[error("{obu_type} OBU parsed without a stored sequence header")]
    MissingSequenceHeader { obu_type: &'static str },

    #[error("frame header OBU seen twice without an intervening clearing event")]
    DuplicateFrameHeader,

    #[error("show_existing_frame referenced stale or invalid reference slot {slot}")]
    StaleReference { slot: u8 },

    #[error("reserved OBU type {obu_type} parsed deeper than its header")]
    UnsupportedFeature { obu_type: u8 },
}

pub type Result<T> = std::result::Result<T, ParserError>;
