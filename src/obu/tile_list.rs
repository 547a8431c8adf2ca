//! Tile List OBU (AV1 spec section 5.11.1).

use crate::bitreader::BitReader;
use crate::error::{ParserError, Result};

const MAX_TILE_COUNT_MINUS_1: u32 = 511;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TileListEntry {
    pub anchor_frame_idx: u8,
    pub anchor_tile_row: u8,
    pub anchor_tile_col: u8,
    pub tile_data_size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TileList {
    pub output_frame_width_in_tiles: u32,
    pub output_frame_height_in_tiles: u32,
    pub entries: Vec<TileListEntry>,
}

pub fn parse_tile_list(r: &mut BitReader) -> Result<TileList> {
    let output_frame_width_in_tiles = r.read_bits(8)? + 1;
    let output_frame_height_in_tiles = r.read_bits(8)? + 1;
    let tile_count = r.read_bits(16)? + 1;
    if tile_count - 1 > MAX_TILE_COUNT_MINUS_1 {
        return Err(ParserError::BitstreamError(format!(
            "tile_count_minus_1 {} exceeds the conformance bound of {MAX_TILE_COUNT_MINUS_1}",
            tile_count - 1
        )));
    }

    let mut entries = Vec::with_capacity(tile_count as usize);
    for _ in 0..tile_count {
        let anchor_frame_idx = r.read_bits(8)? as u8;
        let anchor_tile_row = r.read_bits(8)? as u8;
        let anchor_tile_col = r.read_bits(8)? as u8;
        let tile_data_size = r.read_bits(16)? + 1;
        r.skip_bits(8 * tile_data_size as u64)?;
        entries.push(TileListEntry {
            anchor_frame_idx,
            anchor_tile_row,
            anchor_tile_col,
            tile_data_size,
        });
    }

    Ok(TileList {
        output_frame_width_in_tiles,
        output_frame_height_in_tiles,
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_entry_with_no_payload() {
        let mut bytes = vec![0x00, 0x00, 0x00, 0x00];
        bytes.extend_from_slice(&[0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
        let mut r = BitReader::new(&bytes);
        let list = parse_tile_list(&mut r).unwrap();
        assert_eq!(list.output_frame_width_in_tiles, 1);
        assert_eq!(list.output_frame_height_in_tiles, 1);
        assert_eq!(list.entries.len(), 1);
        assert_eq!(list.entries[0].tile_data_size, 1);
    }

    #[test]
    fn tile_count_over_conformance_bound_errors() {
        // tile_count_minus_1 = 512, one past the spec's 511 bound.
        let bytes = [0x00, 0x00, 0x02, 0x00];
        let mut r = BitReader::new(&bytes);
        assert!(matches!(
            parse_tile_list(&mut r),
            Err(ParserError::BitstreamError(_))
        ));
    }
}
