//! Reference frame info table (AV1 spec section 7.20, `RefFrameType`/`RefValid` etc).
//!
//! The parser only reads this table for conformance checks (`show_existing_frame`,
//! skip-mode order-hint comparisons); it never writes to it implicitly. The decoder
//! that sits on top of this parser owns frame reconstruction and calls
//! [`crate::parser::Parser::mark_reference_frame`] once a frame has been decoded.

use crate::obu::frame_header::FrameType;

/// One of the 8 reference frame slots (AV1 spec `RefValid[i]` and friends).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ReferenceFrameInfo {
    pub valid: bool,
    pub frame_id: u32,
    pub frame_type: FrameType,
    pub upscaled_width: u32,
    pub frame_width: u32,
    pub frame_height: u32,
    pub render_width: u32,
    pub render_height: u32,
    pub mi_cols: u32,
    pub mi_rows: u32,
    pub bit_depth: u8,
    pub subsampling_x: u8,
    pub subsampling_y: u8,
    pub order_hint: u32,
}

impl Default for ReferenceFrameInfo {
    fn default() -> Self {
        Self {
            valid: false,
            frame_id: 0,
            frame_type: FrameType::Key,
            upscaled_width: 0,
            frame_width: 0,
            frame_height: 0,
            render_width: 0,
            render_height: 0,
            mi_cols: 0,
            mi_rows: 0,
            bit_depth: 8,
            subsampling_x: 1,
            subsampling_y: 1,
            order_hint: 0,
        }
    }
}
