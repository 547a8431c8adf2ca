//! OBU dispatch and cross-OBU parser state (AV1 spec section 5.3.1's general OBU
//! syntax / semantics, persisted across calls).

use crate::bitreader::BitReader;
use crate::error::{ParserError, Result};
use crate::obu::frame::{self, Frame};
use crate::obu::frame_header::{self, FrameHeader, FrameHeaderContext, NUM_REF_FRAMES};
use crate::obu::metadata::{self, Metadata};
use crate::obu::sequence_header::{self, SequenceHeader};
use crate::obu::tile_group::{self, TileGroup};
use crate::obu::tile_list::{self, TileList};
use crate::obu::{read_obu_header, ObuHeader, ObuType};
use crate::reference::ReferenceFrameInfo;

/// One decoded OBU, tagged by type, as returned by [`Parser::parse_next_obu`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ParsedObu {
    SequenceHeader(SequenceHeader),
    TemporalDelimiter,
    FrameHeader(FrameHeader),
    RedundantFrameHeader(FrameHeader),
    TileGroup(TileGroup),
    Frame(Frame),
    Metadata(Metadata),
    TileList(TileList),
    Padding,
    /// Dropped per the scalability rule in AV1 spec section 5.3.1 (operating point
    /// selection does not include this OBU's temporal/spatial layer).
    Dropped,
    Reserved(u8),
}

#[derive(Debug, Clone, Default)]
struct ParserState {
    sequence_header: Option<SequenceHeader>,
    reference_frames: [ReferenceFrameInfo; NUM_REF_FRAMES],
    seen_frame_header: bool,
    last_frame_header: Option<FrameHeader>,
    operating_point_idc: u16,
}

/// A single-stream AV1 OBU parser. Holds no I/O state; every call is a pure function
/// of `(state, bytes)`.
#[derive(Debug, Clone, Default)]
pub struct Parser {
    state: ParserState,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sequence_header(&self) -> Option<&SequenceHeader> {
        self.state.sequence_header.as_ref()
    }

    pub fn reference_frame(&self, slot: usize) -> &ReferenceFrameInfo {
        &self.state.reference_frames[slot]
    }

    /// Records a decoded frame's reference info into `slot`, per `refresh_frame_flags`
    /// handling that belongs to the decoder, not this parser.
    pub fn mark_reference_frame(&mut self, slot: usize, info: ReferenceFrameInfo) {
        self.state.reference_frames[slot] = info;
    }

    /// `obu_header()` plus `obu_size`, with no side effects on parser state.
    pub fn parse_obu_header(&mut self, data: &[u8]) -> Result<(ObuHeader, usize)> {
        let mut reader = BitReader::new(data);
        let header = read_obu_header(&mut reader, Some(data.len() as u32))?;
        Ok((header, reader.byte_position()))
    }

    pub fn parse_sequence_header_obu(&mut self, payload: &[u8]) -> Result<SequenceHeader> {
        let mut reader = BitReader::new(payload);
        let seq = sequence_header::parse_sequence_header(&mut reader)?;
        self.state.sequence_header = Some(seq.clone());
        Ok(seq)
    }

    pub fn parse_temporal_delimiter_obu(&mut self) -> Result<()> {
        self.state.seen_frame_header = false;
        Ok(())
    }

    pub fn parse_metadata_obu(&mut self, payload: &[u8]) -> Result<Metadata> {
        let mut reader = BitReader::new(payload);
        let metadata = metadata::parse_metadata(&mut reader, payload.len())?;
        reader.check_trailing_bits("METADATA")?;
        Ok(metadata)
    }

    pub fn parse_tile_list_obu(&mut self, payload: &[u8]) -> Result<TileList> {
        let mut reader = BitReader::new(payload);
        tile_list::parse_tile_list(&mut reader)
    }

    pub fn parse_tile_group_obu(&mut self, payload: &[u8], size: usize) -> Result<TileGroup> {
        let frame_header = self
            .state
            .last_frame_header
            .as_ref()
            .ok_or(ParserError::MissingSequenceHeader {
                obu_type: "TILE_GROUP",
            })?;
        let mut reader = BitReader::new(payload);
        let group = tile_group::parse_tile_group(
            &mut reader,
            size,
            frame_header.tile_info.tile_cols,
            frame_header.tile_info.tile_rows,
        )?;
        let num_tiles = frame_header.tile_info.tile_cols * frame_header.tile_info.tile_rows;
        if group.tg_end + 1 >= num_tiles {
            self.state.seen_frame_header = false;
        }
        Ok(group)
    }

    fn frame_header_context<'a>(
        &'a self,
        sequence_header: &'a SequenceHeader,
        temporal_id: u8,
        spatial_id: u8,
    ) -> FrameHeaderContext<'a> {
        FrameHeaderContext {
            sequence_header,
            reference_frames: &self.state.reference_frames,
            temporal_id,
            spatial_id,
        }
    }

    pub fn parse_frame_header_obu(
        &mut self,
        payload: &[u8],
        temporal_id: u8,
        spatial_id: u8,
    ) -> Result<FrameHeader> {
        let sequence_header = self
            .state
            .sequence_header
            .clone()
            .ok_or(ParserError::MissingSequenceHeader {
                obu_type: "FRAME_HEADER",
            })?;
        if self.state.seen_frame_header {
            return Err(ParserError::DuplicateFrameHeader);
        }
        let mut reader = BitReader::new(payload);
        let ctx = self.frame_header_context(&sequence_header, temporal_id, spatial_id);
        let header = frame_header::parse_frame_header(&mut reader, &ctx)?;
        self.apply_stale_reference_slots(&header);
        self.state.seen_frame_header = !header.show_existing_frame;
        self.state.last_frame_header = Some(header.clone());
        Ok(header)
    }

    /// Clears `valid` on any reference slot `mark_ref_frames` found stale while
    /// decoding `header`'s `current_frame_id`.
    fn apply_stale_reference_slots(&mut self, header: &FrameHeader) {
        for (slot, stale) in self
            .state
            .reference_frames
            .iter_mut()
            .zip(header.stale_reference_slots.iter())
        {
            if *stale {
                slot.valid = false;
            }
        }
    }

    pub fn parse_frame_obu(
        &mut self,
        payload: &[u8],
        temporal_id: u8,
        spatial_id: u8,
    ) -> Result<Frame> {
        let sequence_header = self
            .state
            .sequence_header
            .clone()
            .ok_or(ParserError::MissingSequenceHeader {
                obu_type: "FRAME",
            })?;
        if self.state.seen_frame_header {
            return Err(ParserError::DuplicateFrameHeader);
        }
        let mut reader = BitReader::new(payload);
        let ctx = self.frame_header_context(&sequence_header, temporal_id, spatial_id);
        let frame = frame::parse_frame(&mut reader, payload.len(), &ctx)?;
        self.apply_stale_reference_slots(&frame.header);
        self.state.last_frame_header = Some(frame.header.clone());
        self.state.seen_frame_header = false;
        Ok(frame)
    }

    fn parse_redundant_frame_header_obu(
        &mut self,
        payload: &[u8],
        temporal_id: u8,
        spatial_id: u8,
    ) -> Result<FrameHeader> {
        let sequence_header =
            self.state
                .sequence_header
                .clone()
                .ok_or(ParserError::MissingSequenceHeader {
                    obu_type: "REDUNDANT_FRAME_HEADER",
                })?;
        if !self.state.seen_frame_header {
            return Err(ParserError::MissingSequenceHeader {
                obu_type: "REDUNDANT_FRAME_HEADER",
            });
        }
        let mut reader = BitReader::new(payload);
        let ctx = self.frame_header_context(&sequence_header, temporal_id, spatial_id);
        let header = frame_header::parse_frame_header(&mut reader, &ctx)?;
        if Some(&header) != self.state.last_frame_header.as_ref() {
            return Err(ParserError::BitstreamError(
                "redundant frame header does not match the prior frame header".into(),
            ));
        }
        Ok(header)
    }

    /// Reads one OBU header, dispatches its payload to the matching per-type worker,
    /// and returns the parsed record along with the number of bytes consumed
    /// (header + extension + size field + payload).
    pub fn parse_next_obu(&mut self, data: &[u8]) -> Result<(ParsedObu, usize)> {
        let mut header_reader = BitReader::new(data);
        let header = read_obu_header(&mut header_reader, Some(data.len() as u32))?;
        let header_len = header_reader.byte_position();
        let payload_end = header_len + header.size_bytes as usize;
        if payload_end > data.len() {
            return Err(ParserError::BufferExhausted {
                offset: header_reader.position(),
                needed: header.size_bytes * 8,
            });
        }
        let payload = &data[header_len..payload_end];
        let temporal_id = header.temporal_id();
        let spatial_id = header.spatial_id();

        tracing::trace!(
            obu_type = header.obu_type.as_name(),
            size_bytes = header.size_bytes,
            "dispatching OBU"
        );

        if header.dropped_for_operating_point(self.state.operating_point_idc) {
            return Ok((ParsedObu::Dropped, payload_end));
        }

        if matches!(header.obu_type, ObuType::Reserved(_)) {
            tracing::warn!(raw = ?header.obu_type, "reserved OBU type seen");
        }

        let parsed = match header.obu_type {
            ObuType::SequenceHeader => {
                ParsedObu::SequenceHeader(self.parse_sequence_header_obu(payload)?)
            }
            ObuType::TemporalDelimiter => {
                self.parse_temporal_delimiter_obu()?;
                ParsedObu::TemporalDelimiter
            }
            ObuType::FrameHeader => {
                ParsedObu::FrameHeader(self.parse_frame_header_obu(payload, temporal_id, spatial_id)?)
            }
            ObuType::RedundantFrameHeader => ParsedObu::RedundantFrameHeader(
                self.parse_redundant_frame_header_obu(payload, temporal_id, spatial_id)?,
            ),
            ObuType::TileGroup => {
                ParsedObu::TileGroup(self.parse_tile_group_obu(payload, payload.len())?)
            }
            ObuType::Frame => {
                ParsedObu::Frame(self.parse_frame_obu(payload, temporal_id, spatial_id)?)
            }
            ObuType::Metadata => ParsedObu::Metadata(self.parse_metadata_obu(payload)?),
            ObuType::TileList => ParsedObu::TileList(self.parse_tile_list_obu(payload)?),
            ObuType::Padding => ParsedObu::Padding,
            ObuType::Reserved(raw) => ParsedObu::Reserved(raw),
        };

        Ok((parsed, payload_end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temporal_delimiter_clears_seen_frame_header() {
        let mut parser = Parser::new();
        parser.state.seen_frame_header = true;
        parser.parse_temporal_delimiter_obu().unwrap();
        assert!(!parser.state.seen_frame_header);
    }

    #[test]
    fn frame_header_without_sequence_header_errors() {
        let mut parser = Parser::new();
        let err = parser
            .parse_frame_header_obu(&[0u8; 4], 0, 0)
            .unwrap_err();
        assert_eq!(
            err,
            ParserError::MissingSequenceHeader {
                obu_type: "FRAME_HEADER"
            }
        );
    }

    #[test]
    fn itu_t35_metadata_obu_leaves_room_for_trailing_bits() {
        // metadata_type=4 (ITU-T T.35), country_code=0x01, no extension byte, and a
        // trailing_bits() byte with zero T.35 payload bytes.
        let mut parser = Parser::new();
        let metadata = parser
            .parse_metadata_obu(&[0x04, 0x01, 0x80])
            .expect("conformant ITU-T T.35 metadata must not exhaust the reader");
        assert_eq!(
            metadata,
            Metadata::ItuT35(crate::obu::metadata::ItuT35 {
                country_code: 0x01,
                country_code_extension_byte: None,
                payload_len: 0,
            })
        );
    }

    #[test]
    fn temporal_delimiter_obu_round_trip_through_dispatch() {
        let mut parser = Parser::new();
        let data = [0x12, 0x00];
        let (parsed, consumed) = parser.parse_next_obu(&data).unwrap();
        assert_eq!(parsed, ParsedObu::TemporalDelimiter);
        assert_eq!(consumed, 2);
    }
}
