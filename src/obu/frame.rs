//! Frame OBU (AV1 spec section 5.10): a Frame Header immediately followed by a single
//! Tile Group, sharing one OBU payload with no header byte in between.

use crate::bitreader::BitReader;
use crate::error::Result;
use crate::obu::frame_header::{self, FrameHeader, FrameHeaderContext};
use crate::obu::tile_group::{self, TileGroup};

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Frame {
    pub header: FrameHeader,
    pub tile_group: TileGroup,
}

/// `frame_obu(sz)`. `sz` is the OBU's declared total payload size in bytes.
pub fn parse_frame(r: &mut BitReader, sz: usize, ctx: &FrameHeaderContext) -> Result<Frame> {
    let start_byte = r.byte_position();
    let header = frame_header::parse_frame_header(r, ctx)?;
    r.byte_align();
    let consumed = r.byte_position() - start_byte;
    let remaining = sz.saturating_sub(consumed);
    let tile_group = tile_group::parse_tile_group(
        r,
        remaining,
        header.tile_info.tile_cols,
        header.tile_info.tile_rows,
    )?;
    Ok(Frame { header, tile_group })
}
