//! Frame Header OBU — the uncompressed frame header (AV1 spec section 5.9).
//!
//! Everything from reference-frame selection onward is grounded directly in the AV1
//! bitstream specification's syntax tables rather than in prior art, since no example
//! in this workspace carries a complete implementation past that point.

use crate::bitreader::BitReader;
use crate::error::{ParserError, Result};
use crate::obu::sequence_header::{SequenceHeader, SELECT_INTEGER_MV, SELECT_SCREEN_CONTENT_TOOLS};
use crate::reference::ReferenceFrameInfo;

pub const NUM_REF_FRAMES: usize = 8;
pub const REFS_PER_FRAME: usize = 7;
pub const PRIMARY_REF_NONE: u8 = 7;
const MAX_SEGMENTS: usize = 8;
const SEG_LVL_MAX: usize = 8;
const MAX_TILE_WIDTH: u32 = 4096;
const MAX_TILE_AREA: u32 = 4096 * 2304;
const MAX_TILE_COLS: u32 = 64;
const MAX_TILE_ROWS: u32 = 64;
const MAX_LOOP_FILTER: i32 = 63;
const WARPEDMODEL_PREC_BITS: u32 = 16;
const GM_ABS_ALPHA_BITS: u32 = 12;
const GM_ALPHA_PREC_BITS: u32 = 15;
const GM_ABS_TRANS_ONLY_BITS: u32 = 9;
const GM_TRANS_ONLY_PREC_BITS: u32 = 3;
const GM_ABS_TRANS_BITS: u32 = 12;
const GM_TRANS_PREC_BITS: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FrameType {
    Key,
    Inter,
    IntraOnly,
    Switch,
}

impl From<u8> for FrameType {
    fn from(value: u8) -> Self {
        match value & 0b11 {
            0 => FrameType::Key,
            1 => FrameType::Inter,
            2 => FrameType::IntraOnly,
            _ => FrameType::Switch,
        }
    }
}

impl FrameType {
    fn is_intra(self) -> bool {
        matches!(self, FrameType::Key | FrameType::IntraOnly)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum InterpolationFilter {
    EightTap,
    EightTapSmooth,
    EightTapSharp,
    Bilinear,
    Switchable,
}

impl From<u8> for InterpolationFilter {
    fn from(value: u8) -> Self {
        match value {
            0 => InterpolationFilter::EightTap,
            1 => InterpolationFilter::EightTapSmooth,
            2 => InterpolationFilter::EightTapSharp,
            3 => InterpolationFilter::Bilinear,
            _ => InterpolationFilter::Switchable,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TxMode {
    Only4x4,
    Largest,
    Select,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum RestorationType {
    None,
    Switchable,
    Wiener,
    Sgrproj,
}

impl From<u8> for RestorationType {
    fn from(value: u8) -> Self {
        match value {
            0 => RestorationType::None,
            1 => RestorationType::Switchable,
            2 => RestorationType::Wiener,
            _ => RestorationType::Sgrproj,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum GlobalMotionType {
    Identity,
    Translation,
    Rotzoom,
    Affine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LoopFilterParams {
    pub level: [u8; 4],
    pub sharpness: u8,
    pub delta_enabled: bool,
    pub ref_deltas: [i8; NUM_REF_FRAMES],
    pub mode_deltas: [i8; 2],
}

impl Default for LoopFilterParams {
    fn default() -> Self {
        Self {
            level: [0; 4],
            sharpness: 0,
            delta_enabled: false,
            ref_deltas: [1, 0, 0, 0, -1, 0, -1, -1],
            mode_deltas: [0, 0],
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct QuantizationParams {
    pub base_q_idx: u8,
    pub delta_q_y_dc: i32,
    pub delta_q_u_dc: i32,
    pub delta_q_u_ac: i32,
    pub delta_q_v_dc: i32,
    pub delta_q_v_ac: i32,
    pub using_qmatrix: bool,
    pub qm_y: u8,
    pub qm_u: u8,
    pub qm_v: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SegmentationParams {
    pub enabled: bool,
    pub update_map: bool,
    pub temporal_update: bool,
    pub update_data: bool,
    pub feature_enabled: [[bool; SEG_LVL_MAX]; MAX_SEGMENTS],
    pub feature_data: [[i32; SEG_LVL_MAX]; MAX_SEGMENTS],
    pub seg_id_pre_skip: bool,
    pub last_active_seg_id: u8,
}

impl Default for SegmentationParams {
    fn default() -> Self {
        Self {
            enabled: false,
            update_map: false,
            temporal_update: false,
            update_data: false,
            feature_enabled: [[false; SEG_LVL_MAX]; MAX_SEGMENTS],
            feature_data: [[0; SEG_LVL_MAX]; MAX_SEGMENTS],
            seg_id_pre_skip: false,
            last_active_seg_id: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TileInfo {
    pub tile_cols_log2: u8,
    pub tile_rows_log2: u8,
    pub tile_cols: u32,
    pub tile_rows: u32,
    pub context_update_tile_id: u32,
    pub tile_size_bytes: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CdefParams {
    pub damping: u8,
    pub bits: u8,
    pub y_pri_strength: [u8; 8],
    pub y_sec_strength: [u8; 8],
    pub uv_pri_strength: [u8; 8],
    pub uv_sec_strength: [u8; 8],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LoopRestorationParams {
    pub frame_restoration_type: [RestorationType; 3],
    pub uses_lr: bool,
    pub loop_restoration_size: [u32; 3],
}

impl Default for LoopRestorationParams {
    fn default() -> Self {
        Self {
            frame_restoration_type: [RestorationType::None; 3],
            uses_lr: false,
            loop_restoration_size: [256; 3],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GlobalMotionParams {
    pub gm_type: GlobalMotionType,
    pub params: [i32; 6],
}

impl Default for GlobalMotionParams {
    fn default() -> Self {
        Self {
            gm_type: GlobalMotionType::Identity,
            params: [0, 0, 1 << WARPEDMODEL_PREC_BITS, 0, 0, 1 << WARPEDMODEL_PREC_BITS],
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FilmGrainParams {
    pub apply_grain: bool,
    pub grain_seed: u16,
    pub update_grain: bool,
    pub film_grain_params_ref_idx: u8,
    pub num_y_points: u8,
    pub point_y_value: Vec<u8>,
    pub point_y_scaling: Vec<u8>,
    pub chroma_scaling_from_luma: bool,
    pub num_cb_points: u8,
    pub point_cb_value: Vec<u8>,
    pub point_cb_scaling: Vec<u8>,
    pub num_cr_points: u8,
    pub point_cr_value: Vec<u8>,
    pub point_cr_scaling: Vec<u8>,
    pub grain_scaling_minus_8: u8,
    pub ar_coeff_lag: u8,
    pub ar_coeffs_y_plus_128: Vec<u8>,
    pub ar_coeffs_cb_plus_128: Vec<u8>,
    pub ar_coeffs_cr_plus_128: Vec<u8>,
    pub ar_coeff_shift_minus_6: u8,
    pub grain_scale_shift: u8,
    pub cb_mult: u8,
    pub cb_luma_mult: u8,
    pub cb_offset: u16,
    pub cr_mult: u8,
    pub cr_luma_mult: u8,
    pub cr_offset: u16,
    pub overlap_flag: bool,
    pub clip_to_restricted_range: bool,
}

impl Default for FilmGrainParams {
    fn default() -> Self {
        Self {
            apply_grain: false,
            grain_seed: 0,
            update_grain: true,
            film_grain_params_ref_idx: 0,
            num_y_points: 0,
            point_y_value: Vec::new(),
            point_y_scaling: Vec::new(),
            chroma_scaling_from_luma: false,
            num_cb_points: 0,
            point_cb_value: Vec::new(),
            point_cb_scaling: Vec::new(),
            num_cr_points: 0,
            point_cr_value: Vec::new(),
            point_cr_scaling: Vec::new(),
            grain_scaling_minus_8: 0,
            ar_coeff_lag: 0,
            ar_coeffs_y_plus_128: Vec::new(),
            ar_coeffs_cb_plus_128: Vec::new(),
            ar_coeffs_cr_plus_128: Vec::new(),
            ar_coeff_shift_minus_6: 0,
            grain_scale_shift: 0,
            cb_mult: 128,
            cb_luma_mult: 192,
            cb_offset: 256,
            cr_mult: 128,
            cr_luma_mult: 192,
            cr_offset: 256,
            overlap_flag: false,
            clip_to_restricted_range: false,
        }
    }
}

/// The decoded uncompressed frame header (AV1 spec section 5.9.2).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FrameHeader {
    pub show_existing_frame: bool,
    pub frame_to_show_map_idx: Option<u8>,
    pub frame_type: FrameType,
    pub show_frame: bool,
    pub showable_frame: bool,
    pub error_resilient_mode: bool,
    pub disable_cdf_update: bool,
    pub allow_screen_content_tools: bool,
    pub force_integer_mv: bool,
    pub current_frame_id: Option<u32>,
    pub frame_size_override_flag: bool,
    pub order_hint: u32,
    pub primary_ref_frame: u8,
    pub refresh_frame_flags: u8,
    pub allow_intrabc: bool,

    pub frame_width: u32,
    pub frame_height: u32,
    pub upscaled_width: u32,
    pub superres_denom: u8,
    pub render_width: u32,
    pub render_height: u32,
    pub mi_cols: u32,
    pub mi_rows: u32,

    pub ref_frame_idx: [u8; REFS_PER_FRAME],
    pub allow_high_precision_mv: bool,
    pub interpolation_filter: InterpolationFilter,
    pub is_motion_mode_switchable: bool,
    pub use_ref_frame_mvs: bool,
    pub disable_frame_end_update_cdf: bool,

    pub loop_filter: LoopFilterParams,
    pub quantization: QuantizationParams,
    pub segmentation: SegmentationParams,
    pub tile_info: TileInfo,
    pub cdef: CdefParams,
    pub loop_restoration: LoopRestorationParams,
    pub tx_mode: TxMode,
    pub reference_select: bool,
    pub skip_mode_present: bool,
    pub global_motion: [GlobalMotionParams; NUM_REF_FRAMES],
    pub film_grain: FilmGrainParams,

    /// Reference slots `mark_ref_frames` found too far (by `current_frame_id` delta)
    /// from this frame's id to still be valid.
    pub stale_reference_slots: [bool; NUM_REF_FRAMES],
}

/// `mark_ref_frames(idLen)`: invalidates reference slots whose stored `frame_id` has
/// drifted from `current_frame_id` by more than `1 << diff_len`, the wraparound window
/// the `delta_frame_id_minus_1` field can represent.
fn mark_ref_frames(
    current_frame_id: u32,
    id_len: u32,
    diff_len: u32,
    reference_frames: &[ReferenceFrameInfo; NUM_REF_FRAMES],
) -> [bool; NUM_REF_FRAMES] {
    let mut stale = [false; NUM_REF_FRAMES];
    let threshold = 1u32 << diff_len;
    for (slot, info) in stale.iter_mut().zip(reference_frames.iter()) {
        let ref_id = info.frame_id;
        *slot = if current_frame_id > threshold {
            ref_id > current_frame_id || ref_id < current_frame_id - threshold
        } else {
            ref_id > current_frame_id && ref_id < (1u32 << id_len) + current_frame_id - threshold
        };
    }
    stale
}

fn frame_is_intra(frame_type: FrameType) -> bool {
    frame_type.is_intra()
}

fn floor_log2(x: u32) -> u32 {
    31 - x.max(1).leading_zeros()
}

fn tile_log2(blk_size: u32, target: u32) -> u32 {
    let mut k = 0u32;
    while (blk_size << k) < target {
        k += 1;
    }
    k
}

fn read_ns(r: &mut BitReader, n: u32) -> Result<u32> {
    if n == 0 {
        return Ok(0);
    }
    let w = floor_log2(n) + 1;
    let m = (1u32 << w) - n;
    let v = r.read_bits((w - 1) as u8)?;
    if v < m {
        return Ok(v);
    }
    let extra_bit = r.read_bits(1)?;
    Ok((v << 1) - m + extra_bit)
}

fn read_delta_q(r: &mut BitReader) -> Result<i32> {
    if r.read_flag()? {
        Ok(r.read_su(7)?)
    } else {
        Ok(0)
    }
}

fn decode_subexp(r: &mut BitReader, num_syms: u32) -> Result<u32> {
    let mut i = 0u32;
    let mut mk = 0u32;
    let k = 3u32;
    loop {
        let b2 = if i > 0 { k + i - 1 } else { k };
        let a = 1u32 << b2;
        if num_syms <= mk + 3 * a {
            let v = read_ns(r, num_syms - mk)?;
            return Ok(v + mk);
        } else if r.read_flag()? {
            i += 1;
            mk += a;
        } else {
            let v = r.read_bits(b2 as u8)?;
            return Ok(v + mk);
        }
    }
}

fn inverse_recenter(r: i32, v: u32) -> i32 {
    let v = v as i64;
    let r = r as i64;
    let out = if v > 2 * r {
        v
    } else if v & 1 != 0 {
        r - ((v + 1) >> 1)
    } else {
        r + (v >> 1)
    };
    out as i32
}

fn decode_unsigned_subexp_with_ref(r: &mut BitReader, mx: u32, reference: i32) -> Result<i32> {
    let v = decode_subexp(r, mx)?;
    if (reference << 1) as u32 <= mx {
        Ok(inverse_recenter(reference, v))
    } else {
        let mirrored = inverse_recenter(mx as i32 - 1 - reference, v);
        Ok(mx as i32 - 1 - mirrored)
    }
}

fn decode_signed_subexp_with_ref(
    r: &mut BitReader,
    low: i32,
    high: i32,
    reference: i32,
) -> Result<i32> {
    let x = decode_unsigned_subexp_with_ref(r, (high - low) as u32, reference - low)?;
    Ok(x + low)
}

fn read_global_param(
    r: &mut BitReader,
    gm_type: GlobalMotionType,
    idx: usize,
    allow_high_precision_mv: bool,
    prev: i32,
) -> Result<i32> {
    let (abs_bits, prec_bits) = if idx < 2 {
        if gm_type == GlobalMotionType::Translation {
            let shift = if allow_high_precision_mv { 0 } else { 1 };
            (GM_ABS_TRANS_ONLY_BITS - shift, GM_TRANS_ONLY_PREC_BITS - shift)
        } else {
            (GM_ABS_TRANS_BITS, GM_TRANS_PREC_BITS)
        }
    } else {
        (GM_ABS_ALPHA_BITS, GM_ALPHA_PREC_BITS)
    };
    let prec_diff = WARPEDMODEL_PREC_BITS - prec_bits;
    let round = if idx % 3 == 2 { 1i32 << WARPEDMODEL_PREC_BITS } else { 0 };
    let sub = if idx % 3 == 2 { 1i32 << prec_bits } else { 0 };
    let mx = 1i32 << abs_bits;
    let reference = (prev >> prec_diff) - sub;
    let value = decode_signed_subexp_with_ref(r, -mx, mx + 1, reference)?;
    Ok((value << prec_diff) + round)
}

/// Arguments that must be threaded in from OBU dispatch / ParserState because they are
/// not recoverable from the frame header bits alone.
pub struct FrameHeaderContext<'a> {
    pub sequence_header: &'a SequenceHeader,
    pub reference_frames: &'a [ReferenceFrameInfo; NUM_REF_FRAMES],
    pub temporal_id: u8,
    pub spatial_id: u8,
}

pub fn parse_frame_header(r: &mut BitReader, ctx: &FrameHeaderContext) -> Result<FrameHeader> {
    let seq = ctx.sequence_header;
    let id_len = if seq.frame_id_numbers_present {
        Some(seq.additional_frame_id_len as u32 + seq.delta_frame_id_len as u32 + 3)
    } else {
        None
    };
    let all_frames: u8 = 0xFF;

    if !seq.reduced_still_picture_header && r.read_flag()? {
        let frame_to_show_map_idx = r.read_bits(3)? as u8;
        if seq.decoder_model_info.is_some()
            && !seq
                .timing_info
                .map(|t| t.equal_picture_interval)
                .unwrap_or(true)
        {
            let len = seq
                .decoder_model_info
                .expect("checked is_some above")
                .frame_presentation_time_length();
            r.read_bits(len)?;
        }
        let frame_type = ctx.reference_frames[frame_to_show_map_idx as usize].frame_type;
        if let Some(len) = id_len {
            let display_frame_id = r.read_bits(len as u8)?;
            let slot = &ctx.reference_frames[frame_to_show_map_idx as usize];
            if !slot.valid || display_frame_id != slot.frame_id {
                return Err(ParserError::StaleReference {
                    slot: frame_to_show_map_idx,
                });
            }
        }
        let refresh_frame_flags = if frame_type == FrameType::Key {
            all_frames
        } else {
            0
        };
        let mut header = default_frame_header();
        header.show_existing_frame = true;
        header.frame_to_show_map_idx = Some(frame_to_show_map_idx);
        header.frame_type = frame_type;
        header.refresh_frame_flags = refresh_frame_flags;
        header.show_frame = true;
        return Ok(header);
    }

    let (frame_type, show_frame, showable_frame, error_resilient_mode);
    if seq.reduced_still_picture_header {
        frame_type = FrameType::Key;
        show_frame = true;
        showable_frame = false;
        error_resilient_mode = true;
    } else {
        let ft = FrameType::from(r.read_bits(2)? as u8);
        let sf = r.read_flag()?;
        if sf
            && seq.decoder_model_info.is_some()
            && !seq
                .timing_info
                .map(|t| t.equal_picture_interval)
                .unwrap_or(true)
        {
            let len = seq
                .decoder_model_info
                .expect("checked is_some above")
                .frame_presentation_time_length();
            r.read_bits(len)?;
        }
        let shf = if sf { false } else { r.read_flag()? };
        let erm = if ft == FrameType::Switch || (ft == FrameType::Key && sf) {
            true
        } else {
            r.read_flag()?
        };
        frame_type = ft;
        show_frame = sf;
        showable_frame = shf;
        error_resilient_mode = erm;
    }

    let disable_cdf_update = r.read_flag()?;
    let allow_screen_content_tools = if seq.seq_force_screen_content_tools == SELECT_SCREEN_CONTENT_TOOLS {
        r.read_flag()?
    } else {
        seq.seq_force_screen_content_tools != 0
    };
    let force_integer_mv = if allow_screen_content_tools {
        if seq.seq_force_integer_mv == SELECT_INTEGER_MV {
            r.read_flag()?
        } else {
            seq.seq_force_integer_mv != 0
        }
    } else {
        false
    };
    let force_integer_mv = if frame_is_intra(frame_type) {
        true
    } else {
        force_integer_mv
    };

    let current_frame_id = if seq.frame_id_numbers_present {
        Some(r.read_bits(id_len.expect("frame_id_numbers_present implies id_len") as u8)?)
    } else {
        None
    };

    let stale_reference_slots = match current_frame_id {
        Some(id) => mark_ref_frames(
            id,
            id_len.expect("frame_id_numbers_present implies id_len"),
            seq.delta_frame_id_len as u32,
            ctx.reference_frames,
        ),
        None => [false; NUM_REF_FRAMES],
    };

    let frame_size_override_flag = if frame_type == FrameType::Switch {
        true
    } else if seq.reduced_still_picture_header {
        false
    } else {
        r.read_flag()?
    };

    let order_hint = if seq.order_hint_bits == 0 {
        0
    } else {
        r.read_bits(seq.order_hint_bits)?
    };

    let primary_ref_frame = if frame_is_intra(frame_type) || error_resilient_mode {
        PRIMARY_REF_NONE
    } else {
        r.read_bits(3)? as u8
    };

    if seq.decoder_model_info.is_some() {
        let buffer_removal_time_present_flag = r.read_flag()?;
        if buffer_removal_time_present_flag {
            let dmi = seq.decoder_model_info.expect("checked is_some above");
            for op in &seq.operating_points {
                if op.decoder_model_present_for_this_op {
                    let in_temporal_layer = (op.idc >> ctx.temporal_id) & 1;
                    let in_spatial_layer = (op.idc >> (ctx.spatial_id + 8)) & 1;
                    if op.idc == 0 || (in_temporal_layer != 0 && in_spatial_layer != 0) {
                        r.read_bits(dmi.buffer_removal_time_length())?;
                    }
                }
            }
        }
    }

    let refresh_frame_flags = if frame_type == FrameType::Switch
        || (frame_type == FrameType::Key && show_frame)
    {
        all_frames
    } else {
        r.read_bits(8)? as u8
    };

    if (!frame_is_intra(frame_type) || refresh_frame_flags != all_frames)
        && error_resilient_mode
        && seq.enable_order_hint
    {
        for _ in 0..NUM_REF_FRAMES {
            r.read_bits(seq.order_hint_bits.max(1))?;
        }
    }

    let allow_intrabc = if frame_is_intra(frame_type) && allow_screen_content_tools {
        r.read_flag()?
    } else {
        false
    };

    let mut ref_frame_idx = [0u8; REFS_PER_FRAME];
    let mut allow_high_precision_mv = false;
    let mut interpolation_filter = InterpolationFilter::EightTap;
    let mut is_motion_mode_switchable = false;
    let mut use_ref_frame_mvs = false;

    if !frame_is_intra(frame_type) {
        let frame_refs_short_signaling = if seq.enable_order_hint {
            r.read_flag()?
        } else {
            false
        };
        if frame_refs_short_signaling {
            r.read_bits(3)?; // last_frame_idx
            r.read_bits(3)?; // gold_frame_idx
        }
        for idx in ref_frame_idx.iter_mut() {
            if !frame_refs_short_signaling {
                *idx = r.read_bits(3)? as u8;
            }
            if seq.frame_id_numbers_present {
                r.skip_bits(seq.delta_frame_id_len as u64)?; // delta_frame_id_minus_1
            }
        }

        let (fw, fh, uw, rw, rh, sd) =
            read_frame_and_render_size(r, seq, frame_size_override_flag)?;
        allow_high_precision_mv = if force_integer_mv { false } else { r.read_flag()? };
        let is_filter_switchable = r.read_flag()?;
        interpolation_filter = if is_filter_switchable {
            InterpolationFilter::Switchable
        } else {
            InterpolationFilter::from(r.read_bits(2)? as u8)
        };
        is_motion_mode_switchable = r.read_flag()?;
        use_ref_frame_mvs = if error_resilient_mode || !seq.enable_ref_frame_mvs {
            false
        } else {
            r.read_flag()?
        };

        let disable_frame_end_update_cdf = if disable_cdf_update {
            true
        } else {
            r.read_flag()?
        };

        let mut header = build_header_shell(
            frame_type,
            show_frame,
            showable_frame,
            error_resilient_mode,
            disable_cdf_update,
            allow_screen_content_tools,
            force_integer_mv,
            current_frame_id,
            frame_size_override_flag,
            order_hint,
            primary_ref_frame,
            refresh_frame_flags,
            allow_intrabc,
            fw,
            fh,
            uw,
            sd,
            rw,
            rh,
            ref_frame_idx,
            allow_high_precision_mv,
            interpolation_filter,
            is_motion_mode_switchable,
            use_ref_frame_mvs,
            disable_frame_end_update_cdf,
        );
        header.stale_reference_slots = stale_reference_slots;

        parse_post_reference_blocks(r, seq, ctx, allow_high_precision_mv, &mut header)?;
        return Ok(header);
    }

    // Intra frame path (no reference selection).
    let (fw, fh, uw, rw, rh, sd) =
        read_frame_and_render_size(r, seq, frame_size_override_flag)?;
    let disable_frame_end_update_cdf = if disable_cdf_update {
        true
    } else {
        r.read_flag()?
    };

    let mut header = build_header_shell(
        frame_type,
        show_frame,
        showable_frame,
        error_resilient_mode,
        disable_cdf_update,
        allow_screen_content_tools,
        force_integer_mv,
        current_frame_id,
        frame_size_override_flag,
        order_hint,
        primary_ref_frame,
        refresh_frame_flags,
        allow_intrabc,
        fw,
        fh,
        uw,
        sd,
        rw,
        rh,
        ref_frame_idx,
        allow_high_precision_mv,
        interpolation_filter,
        is_motion_mode_switchable,
        use_ref_frame_mvs,
        disable_frame_end_update_cdf,
    );
    header.stale_reference_slots = stale_reference_slots;
    parse_post_reference_blocks(r, seq, ctx, allow_high_precision_mv, &mut header)?;
    Ok(header)
}

#[allow(clippy::too_many_arguments)]
fn build_header_shell(
    frame_type: FrameType,
    show_frame: bool,
    showable_frame: bool,
    error_resilient_mode: bool,
    disable_cdf_update: bool,
    allow_screen_content_tools: bool,
    force_integer_mv: bool,
    current_frame_id: Option<u32>,
    frame_size_override_flag: bool,
    order_hint: u32,
    primary_ref_frame: u8,
    refresh_frame_flags: u8,
    allow_intrabc: bool,
    frame_width: u32,
    frame_height: u32,
    upscaled_width: u32,
    superres_denom: u8,
    render_width: u32,
    render_height: u32,
    ref_frame_idx: [u8; REFS_PER_FRAME],
    allow_high_precision_mv: bool,
    interpolation_filter: InterpolationFilter,
    is_motion_mode_switchable: bool,
    use_ref_frame_mvs: bool,
    disable_frame_end_update_cdf: bool,
) -> FrameHeader {
    let mi_cols = 2 * ((frame_width + 7) >> 3);
    let mi_rows = 2 * ((frame_height + 7) >> 3);
    FrameHeader {
        show_existing_frame: false,
        frame_to_show_map_idx: None,
        frame_type,
        show_frame,
        showable_frame,
        error_resilient_mode,
        disable_cdf_update,
        allow_screen_content_tools,
        force_integer_mv,
        current_frame_id,
        frame_size_override_flag,
        order_hint,
        primary_ref_frame,
        refresh_frame_flags,
        allow_intrabc,
        frame_width,
        frame_height,
        upscaled_width,
        superres_denom,
        render_width,
        render_height,
        mi_cols,
        mi_rows,
        ref_frame_idx,
        allow_high_precision_mv,
        interpolation_filter,
        is_motion_mode_switchable,
        use_ref_frame_mvs,
        disable_frame_end_update_cdf,
        loop_filter: LoopFilterParams::default(),
        quantization: QuantizationParams::default(),
        segmentation: SegmentationParams::default(),
        tile_info: TileInfo::default(),
        cdef: CdefParams::default(),
        loop_restoration: LoopRestorationParams::default(),
        tx_mode: TxMode::Only4x4,
        reference_select: false,
        skip_mode_present: false,
        global_motion: [GlobalMotionParams::default(); NUM_REF_FRAMES],
        film_grain: FilmGrainParams::default(),
        stale_reference_slots: [false; NUM_REF_FRAMES],
    }
}

fn default_frame_header() -> FrameHeader {
    build_header_shell(
        FrameType::Key,
        true,
        false,
        true,
        false,
        false,
        false,
        None,
        false,
        0,
        PRIMARY_REF_NONE,
        0,
        false,
        0,
        0,
        0,
        8,
        0,
        0,
        [0; REFS_PER_FRAME],
        false,
        InterpolationFilter::EightTap,
        false,
        false,
        false,
    )
}

fn read_frame_and_render_size(
    r: &mut BitReader,
    seq: &SequenceHeader,
    frame_size_override_flag: bool,
) -> Result<(u32, u32, u32, u32, u32, u8)> {
    let (frame_width, frame_height) = if frame_size_override_flag {
        (
            r.read_bits(seq.frame_width_bits)? + 1,
            r.read_bits(seq.frame_height_bits)? + 1,
        )
    } else {
        (seq.max_frame_width, seq.max_frame_height)
    };

    let use_superres = if seq.enable_superres { r.read_flag()? } else { false };
    let superres_denom = if use_superres {
        r.read_bits(3)? as u8 + 9
    } else {
        8
    };
    let upscaled_width = frame_width;
    let frame_width = (upscaled_width * 8 + superres_denom as u32 / 2) / superres_denom as u32;

    let render_and_frame_size_different = r.read_flag()?;
    let (render_width, render_height) = if render_and_frame_size_different {
        (r.read_bits(16)? + 1, r.read_bits(16)? + 1)
    } else {
        (upscaled_width, frame_height)
    };

    Ok((frame_width, frame_height, upscaled_width, render_width, render_height, superres_denom))
}

#[allow(clippy::too_many_lines)]
fn parse_post_reference_blocks(
    r: &mut BitReader,
    seq: &SequenceHeader,
    ctx: &FrameHeaderContext,
    allow_high_precision_mv: bool,
    header: &mut FrameHeader,
) -> Result<()> {
    header.quantization = parse_quantization_params(r, seq)?;
    header.segmentation = parse_segmentation_params(r, header.primary_ref_frame)?;

    let coded_lossless = compute_coded_lossless(&header.segmentation, &header.quantization);
    let all_lossless = coded_lossless && header.frame_width == header.upscaled_width;

    header.loop_filter = parse_loop_filter_params(r, seq, coded_lossless, header.allow_intrabc)?;
    header.tile_info = parse_tile_info(r, seq, header.mi_cols, header.mi_rows)?;
    header.cdef = parse_cdef_params(r, seq, coded_lossless, header.allow_intrabc)?;
    header.loop_restoration =
        parse_loop_restoration_params(r, seq, all_lossless, header.allow_intrabc)?;

    header.tx_mode = if coded_lossless {
        TxMode::Only4x4
    } else if r.read_flag()? {
        TxMode::Select
    } else {
        TxMode::Largest
    };

    header.reference_select = if frame_is_intra(header.frame_type) {
        false
    } else {
        r.read_flag()?
    };

    header.skip_mode_present = parse_skip_mode_params(r, seq, ctx, header)?;

    header.global_motion = parse_global_motion_params(
        r,
        header.frame_type,
        allow_high_precision_mv,
    )?;

    header.film_grain = parse_film_grain_params(r, seq, header)?;

    Ok(())
}

fn parse_quantization_params(r: &mut BitReader, seq: &SequenceHeader) -> Result<QuantizationParams> {
    let base_q_idx = r.read_bits(8)? as u8;
    let delta_q_y_dc = read_delta_q(r)?;
    let (mut delta_q_u_dc, mut delta_q_u_ac, mut delta_q_v_dc, mut delta_q_v_ac) = (0, 0, 0, 0);
    if seq.color_config.num_planes > 1 {
        let diff_uv_delta = if seq.color_config.separate_uv_delta_q {
            r.read_flag()?
        } else {
            false
        };
        delta_q_u_dc = read_delta_q(r)?;
        delta_q_u_ac = read_delta_q(r)?;
        if diff_uv_delta {
            delta_q_v_dc = read_delta_q(r)?;
            delta_q_v_ac = read_delta_q(r)?;
        } else {
            delta_q_v_dc = delta_q_u_dc;
            delta_q_v_ac = delta_q_u_ac;
        }
    }
    let using_qmatrix = r.read_flag()?;
    let (mut qm_y, mut qm_u, mut qm_v) = (0, 0, 0);
    if using_qmatrix {
        qm_y = r.read_bits(4)? as u8;
        qm_u = r.read_bits(4)? as u8;
        qm_v = if !seq.color_config.separate_uv_delta_q {
            qm_u
        } else {
            r.read_bits(4)? as u8
        };
    }
    Ok(QuantizationParams {
        base_q_idx,
        delta_q_y_dc,
        delta_q_u_dc,
        delta_q_u_ac,
        delta_q_v_dc,
        delta_q_v_ac,
        using_qmatrix,
        qm_y,
        qm_u,
        qm_v,
    })
}

const SEG_FEATURE_BITS: [u8; SEG_LVL_MAX] = [8, 6, 6, 6, 6, 3, 0, 0];
const SEG_FEATURE_SIGNED: [bool; SEG_LVL_MAX] = [true, true, true, true, true, false, false, false];
const SEG_FEATURE_MAX: [i32; SEG_LVL_MAX] = [255, MAX_LOOP_FILTER, MAX_LOOP_FILTER, MAX_LOOP_FILTER, MAX_LOOP_FILTER, 7, 0, 0];

fn parse_segmentation_params(r: &mut BitReader, primary_ref_frame: u8) -> Result<SegmentationParams> {
    let mut params = SegmentationParams::default();
    params.enabled = r.read_flag()?;
    if params.enabled {
        if primary_ref_frame == PRIMARY_REF_NONE {
            params.update_map = true;
            params.temporal_update = false;
            params.update_data = true;
        } else {
            params.update_map = r.read_flag()?;
            params.temporal_update = if params.update_map { r.read_flag()? } else { false };
            params.update_data = r.read_flag()?;
        }
        if params.update_data {
            for seg_id in 0..MAX_SEGMENTS {
                for j in 0..SEG_LVL_MAX {
                    let feature_enabled = r.read_flag()?;
                    params.feature_enabled[seg_id][j] = feature_enabled;
                    let mut clipped = 0i32;
                    if feature_enabled {
                        let bits = SEG_FEATURE_BITS[j];
                        let limit = SEG_FEATURE_MAX[j];
                        if SEG_FEATURE_SIGNED[j] {
                            let value = r.read_su(bits + 1)?;
                            clipped = value.clamp(-limit, limit);
                        } else if bits > 0 {
                            let value = r.read_bits(bits)? as i32;
                            clipped = value.clamp(0, limit);
                        }
                    }
                    params.feature_data[seg_id][j] = clipped;
                }
            }
        }
    }

    let mut seg_id_pre_skip = false;
    let mut last_active_seg_id = 0u8;
    for seg_id in 0..MAX_SEGMENTS {
        for j in 0..SEG_LVL_MAX {
            if params.feature_enabled[seg_id][j] {
                last_active_seg_id = seg_id as u8;
                if j >= 5 {
                    seg_id_pre_skip = true;
                }
            }
        }
    }
    params.seg_id_pre_skip = seg_id_pre_skip;
    params.last_active_seg_id = last_active_seg_id;
    Ok(params)
}

fn get_qindex(segmentation: &SegmentationParams, base_q_idx: u8, segment_id: usize) -> i32 {
    if segmentation.enabled && segmentation.feature_enabled[segment_id][0] {
        (base_q_idx as i32 + segmentation.feature_data[segment_id][0]).clamp(0, 255)
    } else {
        base_q_idx as i32
    }
}

fn compute_coded_lossless(segmentation: &SegmentationParams, q: &QuantizationParams) -> bool {
    (0..MAX_SEGMENTS).all(|seg_id| {
        let qindex = get_qindex(segmentation, q.base_q_idx, seg_id);
        qindex == 0
            && q.delta_q_y_dc == 0
            && q.delta_q_u_ac == 0
            && q.delta_q_u_dc == 0
            && q.delta_q_v_ac == 0
            && q.delta_q_v_dc == 0
    })
}

fn parse_loop_filter_params(
    r: &mut BitReader,
    seq: &SequenceHeader,
    coded_lossless: bool,
    allow_intrabc: bool,
) -> Result<LoopFilterParams> {
    if coded_lossless || allow_intrabc {
        return Ok(LoopFilterParams::default());
    }
    let mut params = LoopFilterParams::default();
    params.level[0] = r.read_bits(6)? as u8;
    params.level[1] = r.read_bits(6)? as u8;
    if seq.color_config.num_planes > 1 && (params.level[0] != 0 || params.level[1] != 0) {
        params.level[2] = r.read_bits(6)? as u8;
        params.level[3] = r.read_bits(6)? as u8;
    }
    params.sharpness = r.read_bits(3)? as u8;
    params.delta_enabled = r.read_flag()?;
    if params.delta_enabled && r.read_flag()? {
        for delta in params.ref_deltas.iter_mut() {
            if r.read_flag()? {
                *delta = r.read_su(7)? as i8;
            }
        }
        for delta in params.mode_deltas.iter_mut() {
            if r.read_flag()? {
                *delta = r.read_su(7)? as i8;
            }
        }
    }
    Ok(params)
}

fn parse_tile_info(
    r: &mut BitReader,
    seq: &SequenceHeader,
    mi_cols: u32,
    mi_rows: u32,
) -> Result<TileInfo> {
    let sb_cols = if seq.use_128x128_superblock {
        (mi_cols + 31) >> 5
    } else {
        (mi_cols + 15) >> 4
    };
    let sb_rows = if seq.use_128x128_superblock {
        (mi_rows + 31) >> 5
    } else {
        (mi_rows + 15) >> 4
    };
    let sb_shift = if seq.use_128x128_superblock { 5 } else { 4 };
    let sb_size = sb_shift + 2;
    let max_tile_width_sb = MAX_TILE_WIDTH >> sb_size;
    let max_tile_area_sb = MAX_TILE_AREA >> (2 * sb_size);
    let min_log2_tile_cols = tile_log2(max_tile_width_sb, sb_cols);
    let max_log2_tile_cols = tile_log2(1, sb_cols.min(MAX_TILE_COLS));
    let max_log2_tile_rows = tile_log2(1, sb_rows.min(MAX_TILE_ROWS));
    let min_log2_tiles = min_log2_tile_cols.max(tile_log2(max_tile_area_sb, sb_rows * sb_cols));

    let uniform_tile_spacing_flag = r.read_flag()?;
    let (tile_cols_log2, tile_cols, tile_rows_log2, tile_rows);
    if uniform_tile_spacing_flag {
        let mut cols_log2 = min_log2_tile_cols;
        while cols_log2 < max_log2_tile_cols {
            if r.read_flag()? {
                cols_log2 += 1;
            } else {
                break;
            }
        }
        let tile_width_sb = (sb_cols + (1 << cols_log2) - 1) >> cols_log2;
        let mut cols = 0u32;
        let mut start_sb = 0u32;
        while start_sb < sb_cols {
            cols += 1;
            start_sb += tile_width_sb;
        }

        let min_log2_tile_rows = min_log2_tiles.saturating_sub(cols_log2);
        let mut rows_log2 = min_log2_tile_rows;
        while rows_log2 < max_log2_tile_rows {
            if r.read_flag()? {
                rows_log2 += 1;
            } else {
                break;
            }
        }
        let tile_height_sb = (sb_rows + (1 << rows_log2) - 1) >> rows_log2;
        let mut rows = 0u32;
        let mut start_sb = 0u32;
        while start_sb < sb_rows {
            rows += 1;
            start_sb += tile_height_sb;
        }

        tile_cols_log2 = cols_log2;
        tile_cols = cols;
        tile_rows_log2 = rows_log2;
        tile_rows = rows;
    } else {
        let mut widest_tile_sb = 0u32;
        let mut start_sb = 0u32;
        let mut cols = 0u32;
        while start_sb < sb_cols {
            let width_in_sbs_minus_1 = r.read_uvlc()?;
            let size_sb = width_in_sbs_minus_1 + 1;
            widest_tile_sb = widest_tile_sb.max(size_sb);
            start_sb += size_sb;
            cols += 1;
        }
        let cols_log2 = tile_log2(1, cols);

        let max_tile_area_sb_adj = if min_log2_tiles > 0 {
            (sb_rows * sb_cols) >> (min_log2_tiles + 1)
        } else {
            sb_rows * sb_cols
        };
        let _max_tile_height_sb = (max_tile_area_sb_adj / widest_tile_sb.max(1)).max(1);

        let mut start_sb = 0u32;
        let mut rows = 0u32;
        while start_sb < sb_rows {
            let height_in_sbs_minus_1 = r.read_uvlc()?;
            let size_sb = height_in_sbs_minus_1 + 1;
            start_sb += size_sb;
            rows += 1;
        }
        let rows_log2 = tile_log2(1, rows);

        tile_cols_log2 = cols_log2;
        tile_cols = cols;
        tile_rows_log2 = rows_log2;
        tile_rows = rows;
    }

    let (context_update_tile_id, tile_size_bytes) = if tile_cols_log2 > 0 || tile_rows_log2 > 0 {
        let id = r.read_bits((tile_rows_log2 + tile_cols_log2) as u8)?;
        let size_bytes = r.read_bits(2)? as u8 + 1;
        (id, size_bytes)
    } else {
        (0, 1)
    };

    Ok(TileInfo {
        tile_cols_log2: tile_cols_log2 as u8,
        tile_rows_log2: tile_rows_log2 as u8,
        tile_cols,
        tile_rows,
        context_update_tile_id,
        tile_size_bytes,
    })
}

fn parse_cdef_params(
    r: &mut BitReader,
    seq: &SequenceHeader,
    coded_lossless: bool,
    allow_intrabc: bool,
) -> Result<CdefParams> {
    if coded_lossless || allow_intrabc || !seq.enable_cdef {
        return Ok(CdefParams {
            damping: 3,
            bits: 0,
            ..Default::default()
        });
    }
    let damping = r.read_bits(2)? as u8 + 3;
    let bits = r.read_bits(2)? as u8;
    let mut params = CdefParams {
        damping,
        bits,
        ..Default::default()
    };
    for i in 0..(1usize << bits) {
        params.y_pri_strength[i] = r.read_bits(4)? as u8;
        let sec = r.read_bits(2)? as u8;
        params.y_sec_strength[i] = if sec == 3 { 4 } else { sec };
        if seq.color_config.num_planes > 1 {
            params.uv_pri_strength[i] = r.read_bits(4)? as u8;
            let sec_uv = r.read_bits(2)? as u8;
            params.uv_sec_strength[i] = if sec_uv == 3 { 4 } else { sec_uv };
        }
    }
    Ok(params)
}

fn parse_loop_restoration_params(
    r: &mut BitReader,
    seq: &SequenceHeader,
    all_lossless: bool,
    allow_intrabc: bool,
) -> Result<LoopRestorationParams> {
    if all_lossless || allow_intrabc || !seq.enable_restoration {
        return Ok(LoopRestorationParams::default());
    }
    let mut frame_restoration_type = [RestorationType::None; 3];
    let mut uses_lr = false;
    let mut uses_chroma_lr = false;
    for (plane, ty) in frame_restoration_type.iter_mut().enumerate() {
        if plane == 0 || seq.color_config.num_planes > 1 {
            *ty = RestorationType::from(r.read_bits(2)? as u8);
            if *ty != RestorationType::None {
                uses_lr = true;
                if plane > 0 {
                    uses_chroma_lr = true;
                }
            }
        }
    }

    let mut loop_restoration_size = [256u32; 3];
    if uses_lr {
        let mut lr_unit_shift = r.read_bits(1)?;
        if seq.use_128x128_superblock {
            lr_unit_shift += 1;
        } else if lr_unit_shift != 0 {
            let lr_unit_extra_shift = r.read_bits(1)?;
            lr_unit_shift += lr_unit_extra_shift;
        }
        loop_restoration_size[0] = 256 >> (2 - lr_unit_shift);
        let lr_uv_shift = if seq.color_config.num_planes > 1
            && seq.color_config.subsampling_x != 0
            && seq.color_config.subsampling_y != 0
            && uses_chroma_lr
        {
            r.read_bits(1)?
        } else {
            0
        };
        loop_restoration_size[1] = loop_restoration_size[0] >> lr_uv_shift;
        loop_restoration_size[2] = loop_restoration_size[0] >> lr_uv_shift;
    }

    Ok(LoopRestorationParams {
        frame_restoration_type,
        uses_lr,
        loop_restoration_size,
    })
}

fn parse_skip_mode_params(
    r: &mut BitReader,
    seq: &SequenceHeader,
    ctx: &FrameHeaderContext,
    header: &FrameHeader,
) -> Result<bool> {
    let frame_is_intra = frame_is_intra(header.frame_type);
    let skip_mode_allowed = if frame_is_intra
        || !header.reference_select
        || !seq.enable_order_hint
    {
        false
    } else {
        let mut forward_idx: Option<usize> = None;
        let mut backward_idx: Option<usize> = None;
        let mut forward_hint = 0u32;
        let mut backward_hint = 0u32;
        for (i, &ref_idx) in header.ref_frame_idx.iter().enumerate() {
            let hint = ctx.reference_frames[ref_idx as usize].order_hint;
            if get_relative_dist(seq.order_hint_bits, hint, header.order_hint) < 0 {
                if forward_idx.is_none()
                    || get_relative_dist(seq.order_hint_bits, hint, forward_hint) > 0
                {
                    forward_idx = Some(i);
                    forward_hint = hint;
                }
            } else if get_relative_dist(seq.order_hint_bits, hint, header.order_hint) > 0
                && (backward_idx.is_none()
                    || get_relative_dist(seq.order_hint_bits, hint, backward_hint) < 0)
            {
                backward_idx = Some(i);
                backward_hint = hint;
            }
        }
        forward_idx.is_some() && backward_idx.is_some()
    };

    if skip_mode_allowed {
        r.read_flag()
    } else {
        Ok(false)
    }
}

fn get_relative_dist(order_hint_bits: u8, a: u32, b: u32) -> i32 {
    if order_hint_bits == 0 {
        return 0;
    }
    let diff = a as i64 - b as i64;
    let m = 1i64 << (order_hint_bits - 1);
    (((diff & (m * 2 - 1)) ^ m) - m) as i32
}

fn parse_global_motion_params(
    r: &mut BitReader,
    frame_type: FrameType,
    allow_high_precision_mv: bool,
) -> Result<[GlobalMotionParams; NUM_REF_FRAMES]> {
    let mut gm = [GlobalMotionParams::default(); NUM_REF_FRAMES];
    if frame_is_intra(frame_type) {
        return Ok(gm);
    }
    for ref_frame in 1..NUM_REF_FRAMES {
        let is_global = r.read_flag()?;
        let gm_type = if is_global {
            if r.read_flag()? {
                GlobalMotionType::Rotzoom
            } else if r.read_flag()? {
                GlobalMotionType::Translation
            } else {
                GlobalMotionType::Affine
            }
        } else {
            GlobalMotionType::Identity
        };
        gm[ref_frame].gm_type = gm_type;

        if gm_type == GlobalMotionType::Identity {
            continue;
        }

        let prev = GlobalMotionParams::default().params;
        let mut params = prev;
        if gm_type >= GlobalMotionType::Rotzoom {
            params[2] = read_global_param(r, gm_type, 2, allow_high_precision_mv, prev[2])?;
            params[3] = read_global_param(r, gm_type, 3, allow_high_precision_mv, prev[3])?;
            if gm_type == GlobalMotionType::Affine {
                params[4] = read_global_param(r, gm_type, 4, allow_high_precision_mv, prev[4])?;
                params[5] = read_global_param(r, gm_type, 5, allow_high_precision_mv, prev[5])?;
            } else {
                params[4] = -params[3];
                params[5] = params[2];
            }
        }
        params[0] = read_global_param(r, gm_type, 0, allow_high_precision_mv, prev[0])?;
        params[1] = read_global_param(r, gm_type, 1, allow_high_precision_mv, prev[1])?;
        gm[ref_frame].params = params;
    }
    Ok(gm)
}

impl PartialOrd for GlobalMotionType {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for GlobalMotionType {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        fn rank(t: &GlobalMotionType) -> u8 {
            match t {
                GlobalMotionType::Identity => 0,
                GlobalMotionType::Translation => 1,
                GlobalMotionType::Rotzoom => 2,
                GlobalMotionType::Affine => 3,
            }
        }
        rank(self).cmp(&rank(other))
    }
}

fn parse_film_grain_params(
    r: &mut BitReader,
    seq: &SequenceHeader,
    header: &FrameHeader,
) -> Result<FilmGrainParams> {
    if !seq.film_grain_params_present || (!header.show_frame && !header.showable_frame) {
        return Ok(FilmGrainParams {
            apply_grain: false,
            ..Default::default()
        });
    }
    let apply_grain = r.read_flag()?;
    if !apply_grain {
        return Ok(FilmGrainParams {
            apply_grain: false,
            ..Default::default()
        });
    }

    let grain_seed = r.read_bits(16)? as u16;
    let update_grain = if header.frame_type == FrameType::Inter {
        r.read_flag()?
    } else {
        true
    };
    if !update_grain {
        let film_grain_params_ref_idx = r.read_bits(3)? as u8;
        return Ok(FilmGrainParams {
            apply_grain: true,
            grain_seed,
            update_grain: false,
            film_grain_params_ref_idx,
            ..Default::default()
        });
    }

    let num_y_points = r.read_bits(4)? as u8;
    let mut point_y_value = Vec::with_capacity(num_y_points as usize);
    let mut point_y_scaling = Vec::with_capacity(num_y_points as usize);
    for _ in 0..num_y_points {
        point_y_value.push(r.read_bits(8)? as u8);
        point_y_scaling.push(r.read_bits(8)? as u8);
    }

    let chroma_scaling_from_luma = if seq.color_config.mono_chrome {
        false
    } else {
        r.read_flag()?
    };

    let (num_cb_points, num_cr_points);
    let mut point_cb_value = Vec::new();
    let mut point_cb_scaling = Vec::new();
    let mut point_cr_value = Vec::new();
    let mut point_cr_scaling = Vec::new();
    if seq.color_config.mono_chrome || chroma_scaling_from_luma {
        num_cb_points = 0;
        num_cr_points = 0;
    } else if seq.color_config.subsampling_x == 1
        && seq.color_config.subsampling_y == 1
        && num_y_points == 0
    {
        num_cb_points = 0;
        num_cr_points = 0;
    } else {
        let n_cb = r.read_bits(4)? as u8;
        for _ in 0..n_cb {
            point_cb_value.push(r.read_bits(8)? as u8);
            point_cb_scaling.push(r.read_bits(8)? as u8);
        }
        let n_cr = r.read_bits(4)? as u8;
        for _ in 0..n_cr {
            point_cr_value.push(r.read_bits(8)? as u8);
            point_cr_scaling.push(r.read_bits(8)? as u8);
        }
        num_cb_points = n_cb;
        num_cr_points = n_cr;
    }

    let grain_scaling_minus_8 = r.read_bits(2)? as u8;
    let ar_coeff_lag = r.read_bits(2)? as u8;
    let num_pos_luma = 2 * ar_coeff_lag as usize * (ar_coeff_lag as usize + 1);
    let mut ar_coeffs_y_plus_128 = Vec::new();
    if num_y_points > 0 {
        for _ in 0..num_pos_luma {
            ar_coeffs_y_plus_128.push(r.read_bits(8)? as u8);
        }
    }
    let num_pos_chroma = if num_y_points > 0 {
        num_pos_luma + 1
    } else {
        num_pos_luma
    };
    let mut ar_coeffs_cb_plus_128 = Vec::new();
    if num_cb_points > 0 || chroma_scaling_from_luma {
        for _ in 0..num_pos_chroma {
            ar_coeffs_cb_plus_128.push(r.read_bits(8)? as u8);
        }
    }
    let mut ar_coeffs_cr_plus_128 = Vec::new();
    if num_cr_points > 0 || chroma_scaling_from_luma {
        for _ in 0..num_pos_chroma {
            ar_coeffs_cr_plus_128.push(r.read_bits(8)? as u8);
        }
    }

    let ar_coeff_shift_minus_6 = r.read_bits(2)? as u8;
    let grain_scale_shift = r.read_bits(2)? as u8;

    let (mut cb_mult, mut cb_luma_mult, mut cb_offset) = (128, 192, 256);
    let (mut cr_mult, mut cr_luma_mult, mut cr_offset) = (128, 192, 256);
    if num_cb_points > 0 {
        cb_mult = r.read_bits(8)? as u8;
        cb_luma_mult = r.read_bits(8)? as u8;
        cb_offset = r.read_bits(9)? as u16;
    }
    if num_cr_points > 0 {
        cr_mult = r.read_bits(8)? as u8;
        cr_luma_mult = r.read_bits(8)? as u8;
        cr_offset = r.read_bits(9)? as u16;
    }

    let overlap_flag = r.read_flag()?;
    let clip_to_restricted_range = r.read_flag()?;

    Ok(FilmGrainParams {
        apply_grain: true,
        grain_seed,
        update_grain: true,
        film_grain_params_ref_idx: 0,
        num_y_points,
        point_y_value,
        point_y_scaling,
        chroma_scaling_from_luma,
        num_cb_points,
        point_cb_value,
        point_cb_scaling,
        num_cr_points,
        point_cr_value,
        point_cr_scaling,
        grain_scaling_minus_8,
        ar_coeff_lag,
        ar_coeffs_y_plus_128,
        ar_coeffs_cb_plus_128,
        ar_coeffs_cr_plus_128,
        ar_coeff_shift_minus_6,
        grain_scale_shift,
        cb_mult,
        cb_luma_mult,
        cb_offset,
        cr_mult,
        cr_luma_mult,
        cr_offset,
        overlap_flag,
        clip_to_restricted_range,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_log2_matches_known_values() {
        assert_eq!(floor_log2(1), 0);
        assert_eq!(floor_log2(2), 1);
        assert_eq!(floor_log2(255), 7);
        assert_eq!(floor_log2(256), 8);
    }

    #[test]
    fn tile_log2_matches_known_values() {
        assert_eq!(tile_log2(1, 1), 0);
        assert_eq!(tile_log2(1, 2), 1);
        assert_eq!(tile_log2(1, 5), 3);
    }

    #[test]
    fn inverse_recenter_is_involutive_near_reference() {
        assert_eq!(inverse_recenter(10, 0), 10);
        assert_eq!(inverse_recenter(10, 1), 9);
        assert_eq!(inverse_recenter(10, 2), 11);
    }

    #[test]
    fn coded_lossless_requires_zero_qindex_and_deltas() {
        let seg = SegmentationParams::default();
        let q = QuantizationParams::default();
        assert!(compute_coded_lossless(&seg, &q));

        let q_nonzero = QuantizationParams {
            base_q_idx: 1,
            ..Default::default()
        };
        assert!(!compute_coded_lossless(&seg, &q_nonzero));
    }

    #[test]
    fn frame_type_round_trips_two_bit_values() {
        assert_eq!(FrameType::from(0), FrameType::Key);
        assert_eq!(FrameType::from(1), FrameType::Inter);
        assert_eq!(FrameType::from(2), FrameType::IntraOnly);
        assert_eq!(FrameType::from(3), FrameType::Switch);
    }
}
