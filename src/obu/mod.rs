//! OBU type codes and header decoding (AV1 spec sections 5.3.2, 5.3.3, 6.2.2).

pub mod frame;
pub mod frame_header;
pub mod metadata;
pub mod sequence_header;
pub mod tile_group;
pub mod tile_list;

use crate::bitreader::BitReader;
use crate::error::{ParserError, Result};
use crate::leb128::read_leb128;

/// The 4-bit `obu_type` field of an OBU header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ObuType {
    SequenceHeader,
    /// Empty payload; marks a temporal unit boundary.
    TemporalDelimiter,
    FrameHeader,
    TileGroup,
    Metadata,
    Frame,
    RedundantFrameHeader,
    TileList,
    Padding,
    Reserved(u8),
}

impl ObuType {
    pub fn as_name(&self) -> &'static str {
        match self {
            ObuType::SequenceHeader => "SEQUENCE_HEADER",
            ObuType::TemporalDelimiter => "TEMPORAL_DELIMITER",
            ObuType::FrameHeader => "FRAME_HEADER",
            ObuType::TileGroup => "TILE_GROUP",
            ObuType::Metadata => "METADATA",
            ObuType::Frame => "FRAME",
            ObuType::RedundantFrameHeader => "REDUNDANT_FRAME_HEADER",
            ObuType::TileList => "TILE_LIST",
            ObuType::Padding => "PADDING",
            ObuType::Reserved(_) => "RESERVED",
        }
    }
}

impl From<u8> for ObuType {
    fn from(value: u8) -> Self {
        match value {
            1 => ObuType::SequenceHeader,
            2 => ObuType::TemporalDelimiter,
            3 => ObuType::FrameHeader,
            4 => ObuType::TileGroup,
            5 => ObuType::Metadata,
            6 => ObuType::Frame,
            7 => ObuType::RedundantFrameHeader,
            8 => ObuType::TileList,
            15 => ObuType::Padding,
            other => ObuType::Reserved(other),
        }
    }
}

impl From<ObuType> for u8 {
    fn from(value: ObuType) -> Self {
        match value {
            ObuType::Reserved(raw) => raw,
            ObuType::SequenceHeader => 1,
            ObuType::TemporalDelimiter => 2,
            ObuType::FrameHeader => 3,
            ObuType::TileGroup => 4,
            ObuType::Metadata => 5,
            ObuType::Frame => 6,
            ObuType::RedundantFrameHeader => 7,
            ObuType::TileList => 8,
            ObuType::Padding => 15,
        }
    }
}

/// `obu_extension_header()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ObuHeaderExtension {
    pub temporal_id: u8,
    pub spatial_id: u8,
}

impl ObuHeaderExtension {
    fn decode(reader: &mut BitReader) -> Result<Self> {
        let temporal_id = reader.read_bits(3)? as u8;
        let spatial_id = reader.read_bits(2)? as u8;
        reader.skip_bits(3)?; // extension_header_reserved_3bits
        Ok(Self {
            temporal_id,
            spatial_id,
        })
    }
}

/// `obu_header()` plus the trailing `obu_size` field, decoded together since the size
/// field's presence and width depend on the header bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ObuHeader {
    pub obu_type: ObuType,
    pub extension: Option<ObuHeaderExtension>,
    pub has_size_field: bool,
    /// Number of header bytes consumed (1, or 2 with the extension byte).
    pub header_bytes: usize,
    /// Payload size in bytes, excluding the header and any extension byte.
    pub size_bytes: u32,
}

impl ObuHeader {
    pub fn temporal_id(&self) -> u8 {
        self.extension.map(|e| e.temporal_id).unwrap_or(0)
    }

    pub fn spatial_id(&self) -> u8 {
        self.extension.map(|e| e.spatial_id).unwrap_or(0)
    }

    /// Whether this OBU should be dropped under the given `operating_point_idc`, per
    /// the scalability drop rule in AV1 spec section 5.3.1.
    pub fn dropped_for_operating_point(&self, operating_point_idc: u16) -> bool {
        if operating_point_idc == 0 {
            return false;
        }
        if matches!(
            self.obu_type,
            ObuType::SequenceHeader | ObuType::TemporalDelimiter
        ) {
            return false;
        }
        let Some(ext) = self.extension else {
            return false;
        };
        let in_temporal_layer = (operating_point_idc >> ext.temporal_id) & 1;
        let in_spatial_layer = (operating_point_idc >> (ext.spatial_id + 8)) & 1;
        in_temporal_layer == 0 || in_spatial_layer == 0
    }
}

/// Reads an OBU header and its size field from `reader`.
///
/// `external_size`, when the header has no internal size field, is the number of
/// payload bytes supplied by the caller's own framing (IVF frame size, Annex B unit
/// size, or "rest of buffer" for a bare low-overhead stream).
pub fn read_obu_header(reader: &mut BitReader, external_size: Option<u32>) -> Result<ObuHeader> {
    let forbidden = reader.read_bit()?;
    if forbidden != 0 {
        return Err(ParserError::Forbidden);
    }
    let obu_type = ObuType::from(reader.read_bits(4)? as u8);
    let extension_flag = reader.read_flag()?;
    let has_size_field = reader.read_flag()?;
    reader.skip_bits(1)?; // obu_reserved_1bit

    let mut header_bytes = 1;
    let extension = if extension_flag {
        header_bytes += 1;
        Some(ObuHeaderExtension::decode(reader)?)
    } else {
        None
    };

    let size_bytes = if has_size_field {
        let (value, _consumed) = read_leb128(reader)?;
        value
    } else {
        external_size.unwrap_or(0)
    };

    Ok(ObuHeader {
        obu_type,
        extension,
        has_size_field,
        header_bytes,
        size_bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_known_types() {
        for raw in 0u8..=15 {
            let ty = ObuType::from(raw);
            assert_eq!(u8::from(ty), raw);
        }
    }

    #[test]
    fn unknown_types_are_reserved() {
        assert_eq!(ObuType::from(0), ObuType::Reserved(0));
        assert_eq!(ObuType::from(9), ObuType::Reserved(9));
        assert_eq!(ObuType::from(14), ObuType::Reserved(14));
    }

    #[test]
    fn temporal_delimiter_header() {
        let data = [0x12, 0x00];
        let mut r = BitReader::new(&data);
        let header = read_obu_header(&mut r, None).unwrap();
        assert_eq!(header.obu_type, ObuType::TemporalDelimiter);
        assert!(header.has_size_field);
        assert_eq!(header.size_bytes, 0);
    }

    #[test]
    fn forbidden_bit_rejected() {
        let data = [0x80];
        let mut r = BitReader::new(&data);
        assert_eq!(read_obu_header(&mut r, None), Err(ParserError::Forbidden));
    }

    #[test]
    fn extension_header_decoded() {
        // type=FRAME(6), ext=1, has_size=0, reserved=0 -> 0b0_0110_1_0_0 = 0x68
        let data = [0b0_0110_1_0_0u8, 0b010_01_000u8];
        let mut r = BitReader::new(&data);
        let header = read_obu_header(&mut r, Some(10)).unwrap();
        assert_eq!(header.obu_type, ObuType::Frame);
        let ext = header.extension.unwrap();
        assert_eq!(ext.temporal_id, 0b010);
        assert_eq!(ext.spatial_id, 0b01);
        assert_eq!(header.size_bytes, 10);
        assert_eq!(header.header_bytes, 2);
    }

    #[test]
    fn drop_rule_respects_temporal_and_spatial_layers() {
        let header = ObuHeader {
            obu_type: ObuType::TileGroup,
            extension: Some(ObuHeaderExtension {
                temporal_id: 1,
                spatial_id: 0,
            }),
            has_size_field: true,
            header_bytes: 2,
            size_bytes: 0,
        };
        // operating_point_idc selects temporal layer 0 and spatial layer 0 only.
        assert!(header.dropped_for_operating_point(0b0000_0001_0000_0001));
        assert!(!header.dropped_for_operating_point(0b0000_0001_0000_0011));
        assert!(!header.dropped_for_operating_point(0));
    }
}
