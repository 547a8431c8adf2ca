//! Tile Group OBU (AV1 spec section 5.11.1). Coded tile data is opaque to this crate;
//! only the framing needed to skip it bit-exactly is parsed.

use crate::bitreader::BitReader;
use crate::error::Result;
use crate::leb128::read_leb128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TileGroupEntry {
    pub tile_row: u32,
    pub tile_col: u32,
    pub size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TileGroup {
    pub tg_start: u32,
    pub tg_end: u32,
    pub tiles: Vec<TileGroupEntry>,
}

fn ceil_log2(n: u32) -> u8 {
    if n < 2 {
        return 0;
    }
    let mut i = 1u8;
    let mut p = 2u32;
    while p < n {
        p <<= 1;
        i += 1;
    }
    i
}

/// `tile_group_obu(sz)`. `sz` is the OBU's declared payload size in bytes; `tile_cols`
/// and `tile_rows` come from the active Frame Header's `TileInfo`.
pub fn parse_tile_group(
    r: &mut BitReader,
    sz: usize,
    tile_cols: u32,
    tile_rows: u32,
) -> Result<TileGroup> {
    let num_tiles = tile_cols * tile_rows;
    let start_byte = r.byte_position();

    let tile_start_and_end_present_flag = if num_tiles > 1 { r.read_flag()? } else { false };
    let (tg_start, tg_end) = if tile_start_and_end_present_flag {
        let bits = ceil_log2(num_tiles);
        (r.read_bits(bits.max(1))?, r.read_bits(bits.max(1))?)
    } else {
        (0, num_tiles - 1)
    };

    r.byte_align();

    let mut tiles = Vec::new();
    for tile_num in tg_start..=tg_end {
        let tile_row = tile_num / tile_cols;
        let tile_col = tile_num % tile_cols;
        let last_tile = tile_num == tg_end;
        let size = if last_tile {
            let consumed = r.byte_position() - start_byte;
            (sz - consumed) as u32
        } else {
            let (value, _) = read_leb128(r)?;
            value + 1
        };
        r.skip_bits(8 * size as u64)?;
        tiles.push(TileGroupEntry {
            tile_row,
            tile_col,
            size,
        });
    }

    Ok(TileGroup {
        tg_start,
        tg_end,
        tiles,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_tile_consumes_rest_of_payload() {
        let data = [0xAA, 0xBB, 0xCC];
        let mut r = BitReader::new(&data);
        let group = parse_tile_group(&mut r, data.len(), 1, 1).unwrap();
        assert_eq!(group.tg_start, 0);
        assert_eq!(group.tg_end, 0);
        assert_eq!(group.tiles.len(), 1);
        assert_eq!(group.tiles[0].size, 3);
    }

    #[test]
    fn ceil_log2_matches_known_values() {
        assert_eq!(ceil_log2(1), 0);
        assert_eq!(ceil_log2(2), 1);
        assert_eq!(ceil_log2(3), 2);
        assert_eq!(ceil_log2(4), 2);
        assert_eq!(ceil_log2(5), 3);
    }
}
